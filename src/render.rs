//! Boundary between the viewer and whatever displays it.

use std::ops::Range;

use crate::error::ViewerError;
use crate::model::{Function, FunctionId};
use crate::sort::SortIndicator;

/// One line of the function list.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: FunctionId,
    pub name: String,
    pub file: String,
    pub coverage: String,
}

impl Row {
    #[must_use]
    pub fn for_function(f: &Function) -> Self {
        Self {
            id: f.id,
            name: f.display_name.clone(),
            file: f.display_file.clone(),
            coverage: f.coverage_string(),
        }
    }
}

/// A function body ready for display. Highlights are character ranges into
/// `text`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceView {
    pub text: String,
    pub highlights: Vec<Range<usize>>,
}

/// Viewport offsets as fractions of the scrollable extent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollPosition {
    pub x: f64,
    pub y: f64,
}

/// Everything the viewer needs from a display.
pub trait RenderSurface {
    /// Remove every row from the function list.
    fn clear_rows(&mut self);

    /// Append rows, already in view order.
    fn insert_rows(&mut self, rows: Vec<Row>);

    fn set_sort_indicator(&mut self, indicator: SortIndicator);

    fn set_selected(&mut self, id: FunctionId);

    /// Replace the source view contents.
    fn set_source(&mut self, view: SourceView);

    fn clear_source(&mut self);

    fn scroll_position(&self) -> ScrollPosition;

    fn restore_scroll(&mut self, position: ScrollPosition);

    /// Set the overall coverage and source directory status strings.
    fn set_status(&mut self, coverage: &str, path: &str);

    fn show_error(&mut self, error: &ViewerError);
}
