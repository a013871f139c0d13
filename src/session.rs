use crate::render::ScrollPosition;
use crate::sort::SortSpec;

/// View state that outlives any single model: the sort order, the function
/// to re-select after a refresh and the scroll position to restore.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewSession {
    pub sort: SortSpec,
    /// Display name of the last function rendered successfully.
    pub previous_selection: Option<String>,
    pub saved_scroll: Option<ScrollPosition>,
}

impl ViewSession {
    #[must_use]
    pub fn new(sort: SortSpec) -> Self {
        Self {
            sort,
            ..Default::default()
        }
    }

    /// Take the saved scroll position. It is applied at most once.
    pub fn take_scroll(&mut self) -> Option<ScrollPosition> {
        self.saved_scroll.take()
    }
}
