use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_COLOR: &str = "white";
pub const CLEARED_COLOR: &str = "default";
pub const HEX_PREFIX: char = '#';
pub const HEX_MIN_LEN: usize = 4;
pub const CAROUSEL_DELIMITER: char = 'x';
pub const TICK_INTERVAL_MS: u64 = 100;
pub const DATA_FILE_NAME: &str = "playertags.yml";
pub const RAINBOW_KEYWORD: &str = "rainbow";

/// Label and color a player should currently display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTag {
    pub label: String,
    pub color: String,
}

/// Tag assigned to one player identity.
///
/// Rotation fields (`rainbow_index`, `carousel_index`, `last_carousel_update`)
/// are mutated in place by the update engine on every refresh.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TagAssignment {
    pub label: String,
    #[serde(default)]
    pub color_spec: String,
    #[serde(default)]
    pub is_rainbow: bool,
    #[serde(default)]
    pub rainbow_index: usize,
    #[serde(default)]
    pub is_carousel: bool,
    #[serde(default)]
    pub carousel_labels: Vec<String>,
    #[serde(default)]
    pub carousel_index: usize,
    #[serde(default)]
    pub carousel_interval_ms: u64,
    #[serde(default)]
    pub last_carousel_update: u64,
    #[serde(default = "default_permanent")]
    pub is_permanent: bool,
}

fn default_permanent() -> bool {
    true
}

impl TagAssignment {
    pub fn new(label: &str, color_spec: &str, is_rainbow: bool, is_permanent: bool) -> Self {
        Self {
            label: label.to_string(),
            color_spec: color_spec.to_string(),
            is_rainbow,
            rainbow_index: 0,
            is_carousel: false,
            carousel_labels: Vec::new(),
            carousel_index: 0,
            carousel_interval_ms: 0,
            last_carousel_update: 0,
            is_permanent,
        }
    }

    /// Turns this assignment into a carousel rotating over `labels`.
    ///
    /// Returns `None` when `labels` is empty, since a carousel always needs
    /// at least one entry to display.
    pub fn with_carousel(mut self, labels: Vec<String>, interval_ms: u64, now: u64) -> Option<Self> {
        if labels.is_empty() {
            return None;
        }
        self.is_carousel = true;
        self.carousel_labels = labels;
        self.carousel_index = 0;
        self.carousel_interval_ms = interval_ms;
        self.last_carousel_update = now;
        Some(self)
    }

    /// Repairs rotation state that no longer fits the current palette or label list.
    /// Returns true if anything was changed.
    pub fn normalize(&mut self, palette_len: usize) -> bool {
        let mut changed = false;

        if palette_len > 0 && self.rainbow_index >= palette_len {
            self.rainbow_index %= palette_len;
            changed = true;
        }

        if self.is_carousel {
            if self.carousel_labels.is_empty() {
                self.is_carousel = false;
                self.carousel_index = 0;
                changed = true;
            } else if self.carousel_index >= self.carousel_labels.len() {
                self.carousel_index = 0;
                changed = true;
            }
        }

        changed
    }
}

/// Splits a raw carousel label on `delimiter`.
///
/// Segments are kept verbatim: surrounding whitespace is not trimmed and empty
/// segments between adjacent delimiters survive. Returns an empty list when
/// every segment is empty, so callers can reject the label.
pub fn split_carousel_labels(raw: &str, delimiter: char) -> Vec<String> {
    let segments: Vec<String> = raw.split(delimiter).map(str::to_string).collect();
    if segments.iter().all(|segment| segment.is_empty()) {
        return Vec::new();
    }
    segments
}

/// Name to literal color lookup.
#[derive(Debug, Clone, Default)]
pub struct ColorTable {
    colors: BTreeMap<String, String>,
}

impl ColorTable {
    pub fn new(colors: BTreeMap<String, String>) -> Self {
        // Lookups are case-insensitive, so keys are folded once up front.
        let colors = colors
            .into_iter()
            .map(|(name, value)| (name.to_lowercase(), value))
            .collect();
        Self { colors }
    }

    /// Resolves a color name or literal to the value handed to the display sink.
    ///
    /// Never fails: empty input yields [`DEFAULT_COLOR`], hex literals pass
    /// through, known names map to their literal, and anything else is
    /// returned unchanged.
    pub fn resolve(&self, spec: &str) -> String {
        if spec.is_empty() {
            return DEFAULT_COLOR.to_string();
        }

        if spec.starts_with(HEX_PREFIX) && spec.len() >= HEX_MIN_LEN {
            return spec.to_string();
        }

        match self.colors.get(&spec.to_lowercase()) {
            Some(literal) => literal.clone(),
            None => spec.to_string(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.colors.contains_key(&name.to_lowercase())
    }

    /// All known colors sorted by name.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.colors
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_table() -> ColorTable {
        let mut colors = BTreeMap::new();
        colors.insert("red".to_string(), "#C50000".to_string());
        colors.insert("Light_Green".to_string(), "#32CD32".to_string());
        colors.insert("yellow".to_string(), "yellow".to_string());
        ColorTable::new(colors)
    }

    #[test]
    fn test_resolve_empty_is_white() {
        let table = test_table();
        assert_eq!(table.resolve(""), DEFAULT_COLOR);
    }

    #[test]
    fn test_resolve_hex_literal_passes_through() {
        let table = test_table();
        assert_eq!(table.resolve("#ABC"), "#ABC");
        assert_eq!(table.resolve("#FF96DE"), "#FF96DE");
    }

    #[test]
    fn test_resolve_short_hex_is_not_literal() {
        let table = test_table();
        // Too short for a literal and not a known name, so it falls through unchanged
        assert_eq!(table.resolve("#AB"), "#AB");
    }

    #[test]
    fn test_resolve_name_is_case_insensitive() {
        let table = test_table();
        assert_eq!(table.resolve("RED"), "#C50000");
        assert_eq!(table.resolve("light_green"), "#32CD32");
        assert_eq!(table.resolve("yellow"), "yellow");
    }

    #[test]
    fn test_resolve_unknown_name_returned_unchanged() {
        let table = test_table();
        assert_eq!(table.resolve("RAINBOW"), "RAINBOW");
    }

    #[test]
    fn test_entries_sorted() {
        let table = test_table();
        let names: Vec<String> = table.entries().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["light_green", "red", "yellow"]);
        assert_eq!(table.len(), 3);
        assert!(table.contains("LIGHT_GREEN"));
    }

    #[test]
    fn test_split_carousel_keeps_segments_verbatim() {
        let labels = split_carousel_labels("A x B x C", 'x');
        assert_eq!(labels, vec!["A ", " B ", " C"]);
    }

    #[test]
    fn test_split_carousel_keeps_empty_interior_segments() {
        let labels = split_carousel_labels("AxxB", 'x');
        assert_eq!(labels, vec!["A", "", "B"]);
    }

    #[test]
    fn test_split_carousel_all_empty_is_rejected() {
        assert!(split_carousel_labels("", 'x').is_empty());
        assert!(split_carousel_labels("xx", 'x').is_empty());
    }

    #[test]
    fn test_with_carousel_requires_labels() {
        let base = TagAssignment::new("", "red", false, false);
        assert!(base.clone().with_carousel(Vec::new(), 1000, 0).is_none());

        let tag = base
            .with_carousel(vec!["A".to_string(), "B".to_string()], 1000, 42)
            .unwrap();
        assert!(tag.is_carousel);
        assert_eq!(tag.carousel_index, 0);
        assert_eq!(tag.last_carousel_update, 42);
    }

    #[test]
    fn test_normalize_wraps_indices() {
        let mut tag = TagAssignment::new("A", "red", true, true)
            .with_carousel(vec!["A".to_string()], 500, 0)
            .unwrap();
        tag.rainbow_index = 17;
        tag.carousel_index = 3;

        assert!(tag.normalize(16));
        assert_eq!(tag.rainbow_index, 1);
        assert_eq!(tag.carousel_index, 0);
        assert!(!tag.normalize(16));
    }

    #[test]
    fn test_normalize_disables_empty_carousel() {
        let mut tag = TagAssignment::new("A", "red", false, true);
        tag.is_carousel = true;

        assert!(tag.normalize(16));
        assert!(!tag.is_carousel);
    }

    #[test]
    fn test_assignment_yaml_defaults() {
        let tag: TagAssignment = serde_yaml::from_str("label: VIP\n").unwrap();
        assert_eq!(tag.label, "VIP");
        assert_eq!(tag.color_spec, "");
        assert!(tag.is_permanent);
        assert!(!tag.is_carousel);
    }
}
