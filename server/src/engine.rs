use crate::error::{Result, TagError};
use log::debug;
use shared::{ColorTable, DisplayTag, TagAssignment};

/// Computes what each tag should display right now and advances its
/// rotation state.
#[derive(Debug, Clone)]
pub struct TagEngine {
    palette: Vec<String>,
    colors: ColorTable,
}

impl TagEngine {
    pub fn new(palette: Vec<String>, colors: ColorTable) -> Self {
        Self { palette, colors }
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    pub fn colors(&self) -> &ColorTable {
        &self.colors
    }

    /// Resolves the label and color for `assignment` at clock time `now`.
    ///
    /// Rainbow tags step one palette entry per call, so the caller's cadence
    /// sets the cycling speed. Carousel tags step at most one label per call,
    /// and only once `carousel_interval_ms` has elapsed since the last step.
    pub fn compute(&self, assignment: &mut TagAssignment, now: u64) -> Result<DisplayTag> {
        let mut color = self.colors.resolve(&assignment.color_spec);

        if assignment.is_rainbow {
            if self.palette.is_empty() {
                return Err(TagError::EmptyPalette);
            }
            let index = assignment.rainbow_index % self.palette.len();
            color = self.colors.resolve(&self.palette[index]);
            assignment.rainbow_index = (index + 1) % self.palette.len();
        }

        let mut label = assignment.label.clone();

        if assignment.is_carousel && !assignment.carousel_labels.is_empty() {
            let count = assignment.carousel_labels.len();
            if assignment.carousel_index >= count {
                return Err(TagError::MalformedRecord(format!(
                    "carousel index {} out of range for {} labels",
                    assignment.carousel_index, count
                )));
            }

            let elapsed = now.saturating_sub(assignment.last_carousel_update);
            if elapsed >= assignment.carousel_interval_ms {
                assignment.carousel_index = (assignment.carousel_index + 1) % count;
                assignment.last_carousel_update = now;
                debug!("Carousel advanced to index {}", assignment.carousel_index);
            }
            label = assignment.carousel_labels[assignment.carousel_index].clone();
        }

        Ok(DisplayTag { label, color })
    }
}
