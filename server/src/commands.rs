//! Console commands for managing tags
//!
//! | command                   | arguments                                              |
//! |---------------------------|--------------------------------------------------------|
//! | `tags`                    | `<player> <color/rainbow> <label> <permanent>`         |
//! | `ctags`                   | `<player> <color/rainbow> <label> <ms> <permanent>`    |
//! | `settag`, `st`            | `<player> <label> [color/rainbow]`                     |
//! | `removetag`, `rt`         | `<player>`                                             |
//! | `tagsfall`                |                                                        |
//! | `tagcolors`, `tcolors`, `tcl` |                                                    |
//!
//! Arguments are whitespace separated, so labels cannot contain spaces.

use crate::display::PlayerHandle;
use crate::error::TagError;
use crate::service::{TagRequest, TagService};
use shared::{DEFAULT_COLOR, RAINBOW_KEYWORD};
use thiserror::Error;

const TAGS_USAGE: &str = "tags <player> <color/rainbow> <label> <permanent(true/false)>";
const CTAGS_USAGE: &str =
    "ctags <player> <color/rainbow> <label(x separated)> <interval-ms> <permanent(true/false)>";
const SETTAG_USAGE: &str = "settag <player> <label> [color/rainbow]";
const REMOVETAG_USAGE: &str = "removetag <player>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagCommand {
    Tags {
        player: String,
        color: String,
        label: String,
        permanent: bool,
    },
    CarouselTags {
        player: String,
        color: String,
        label: String,
        interval_ms: u64,
        permanent: bool,
    },
    SetTag {
        player: String,
        label: String,
        color: Option<String>,
    },
    RemoveTag {
        player: String,
    },
    ClearAll,
    ListColors,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("{0}")]
    Invalid(String),
}

/// Result reported back to whoever ran the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub response: String,
}

impl CommandOutcome {
    fn ok(response: impl Into<String>) -> Self {
        Self {
            success: true,
            response: response.into(),
        }
    }

    fn fail(response: impl Into<String>) -> Self {
        Self {
            success: false,
            response: response.into(),
        }
    }
}

impl TagCommand {
    /// Parses a console line. `Ok(None)` means the line is not a tag command.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = tokens.collect();

        let command = match name.to_lowercase().as_str() {
            "tags" => {
                if args.len() < 4 {
                    return Err(ParseError::Usage(TAGS_USAGE));
                }
                TagCommand::Tags {
                    player: args[0].to_string(),
                    color: args[1].to_string(),
                    label: args[2].to_string(),
                    permanent: parse_flag(args[3])?,
                }
            }
            "ctags" => {
                if args.len() < 5 {
                    return Err(ParseError::Usage(CTAGS_USAGE));
                }
                let interval_ms = match args[3].parse::<u64>() {
                    Ok(interval) if interval > 0 => interval,
                    _ => {
                        return Err(ParseError::Invalid(
                            "Carousel interval must be a positive integer".to_string(),
                        ))
                    }
                };
                TagCommand::CarouselTags {
                    player: args[0].to_string(),
                    color: args[1].to_string(),
                    label: args[2].to_string(),
                    interval_ms,
                    permanent: parse_flag(args[4])?,
                }
            }
            "settag" | "st" => {
                if args.len() < 2 {
                    return Err(ParseError::Usage(SETTAG_USAGE));
                }
                TagCommand::SetTag {
                    player: args[0].to_string(),
                    label: args[1].to_string(),
                    color: args.get(2).map(|color| color.to_string()),
                }
            }
            "removetag" | "rt" => {
                if args.is_empty() {
                    return Err(ParseError::Usage(REMOVETAG_USAGE));
                }
                TagCommand::RemoveTag {
                    player: args[0].to_string(),
                }
            }
            "tagsfall" => TagCommand::ClearAll,
            "tagcolors" | "tcolors" | "tcl" => TagCommand::ListColors,
            _ => return Ok(None),
        };

        Ok(Some(command))
    }
}

fn parse_flag(value: &str) -> Result<bool, ParseError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ParseError::Invalid(
            "Permanent flag must be true or false".to_string(),
        ))
    }
}

fn is_rainbow(color: &str) -> bool {
    color.eq_ignore_ascii_case(RAINBOW_KEYWORD)
}

fn kind(permanent: bool) -> &'static str {
    if permanent {
        "permanent"
    } else {
        "temporary"
    }
}

/// Parses and runs a console line. Returns `None` when the line is not a
/// tag command.
pub async fn execute(service: &TagService, line: &str) -> Option<CommandOutcome> {
    match TagCommand::parse(line) {
        Ok(Some(command)) => Some(run(service, command).await),
        Ok(None) => None,
        Err(ParseError::Usage(usage)) if usage == SETTAG_USAGE => Some(CommandOutcome::fail(
            format!(
                "Usage: {}\nAvailable colors: {}",
                usage,
                color_names(service).join(", ")
            ),
        )),
        Err(e) => Some(CommandOutcome::fail(e.to_string())),
    }
}

pub async fn run(service: &TagService, command: TagCommand) -> CommandOutcome {
    match command {
        TagCommand::Tags {
            player,
            color,
            label,
            permanent,
        } => {
            let Some(target) = find_player(service, &player) else {
                return unknown_player(&player);
            };
            let rainbow = is_rainbow(&color);
            let request = TagRequest::new(&label, &color)
                .rainbow(rainbow)
                .permanent(permanent);
            let shown_color = if rainbow { RAINBOW_KEYWORD } else { color.as_str() };
            match service.set_tag(target.user_id(), request).await {
                Ok(()) => CommandOutcome::ok(format!(
                    "Set {} tag for {}: {} {}",
                    kind(permanent),
                    target.nickname(),
                    shown_color,
                    label
                )),
                Err(e) => CommandOutcome::fail(format!(
                    "Could not set tag for {}: {}",
                    target.nickname(),
                    e
                )),
            }
        }
        TagCommand::CarouselTags {
            player,
            color,
            label,
            interval_ms,
            permanent,
        } => {
            let Some(target) = find_player(service, &player) else {
                return unknown_player(&player);
            };
            let request = TagRequest::new(&label, &color)
                .rainbow(is_rainbow(&color))
                .permanent(permanent)
                .carousel(interval_ms);
            match service.set_tag(target.user_id(), request).await {
                Ok(()) => CommandOutcome::ok(format!(
                    "Set {} carousel tag for {}: rotating every {} ms",
                    kind(permanent),
                    target.nickname(),
                    interval_ms
                )),
                Err(e) => CommandOutcome::fail(format!(
                    "Could not set carousel tag for {}: {}",
                    target.nickname(),
                    e
                )),
            }
        }
        TagCommand::SetTag {
            player,
            label,
            color,
        } => {
            let Some(target) = find_player(service, &player) else {
                return unknown_player(&player);
            };
            let color = color.unwrap_or_else(|| DEFAULT_COLOR.to_string());
            let rainbow = is_rainbow(&color);
            let request = TagRequest::new(&label, &color)
                .rainbow(rainbow)
                .permanent(true);
            let shown_color = if rainbow { RAINBOW_KEYWORD } else { color.as_str() };
            match service.set_tag(target.user_id(), request).await {
                Ok(()) => CommandOutcome::ok(format!(
                    "Set {} tag for {}: {}",
                    shown_color,
                    target.nickname(),
                    label
                )),
                Err(e) => CommandOutcome::fail(format!(
                    "Failed to set tag, check the server log ({})",
                    e
                )),
            }
        }
        TagCommand::RemoveTag { player } => {
            let Some(target) = find_player(service, &player) else {
                return unknown_player(&player);
            };
            match service.remove_tag(target.user_id()).await {
                Ok(true) => {
                    CommandOutcome::ok(format!("Removed tag of {}", target.nickname()))
                }
                Ok(false) => CommandOutcome::fail(format!("{} has no tag", target.nickname())),
                Err(e) => CommandOutcome::fail(format!(
                    "Removed tag of {}, but saving failed: {}",
                    target.nickname(),
                    e
                )),
            }
        }
        TagCommand::ClearAll => match service.clear_all().await {
            Ok(count) => CommandOutcome::ok(format!(
                "Removed tags of all players ({} players)",
                count
            )),
            Err(e) => CommandOutcome::fail(format!("Cleared all tags, but saving failed: {}", e)),
        },
        TagCommand::ListColors => {
            let lines: Vec<String> = service
                .available_colors()
                .into_iter()
                .map(|(name, value)| format!("{} -> {}", name, value))
                .collect();
            CommandOutcome::ok(format!("Available colors:\n{}", lines.join("\n")))
        }
    }
}

fn find_player(service: &TagService, query: &str) -> Option<PlayerHandle> {
    service.players().find_player(query)
}

fn unknown_player(query: &str) -> CommandOutcome {
    CommandOutcome::fail(TagError::UnknownPlayer(query.to_string()).to_string())
}

fn color_names(service: &TagService) -> Vec<String> {
    service
        .available_colors()
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}
