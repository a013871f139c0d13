//! View ordering of the function list.
//!
//! Every key is compared in the requested direction. Ties on file and
//! coverage are broken by display name ascending in both directions.

use std::cmp::Ordering;
use std::fmt;

use clap::ValueEnum;

use crate::model::{Function, FunctionId};

/// Sortable list column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    Name,
    File,
    Coverage,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [SortKey::Name, SortKey::File, SortKey::Coverage];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::File => "file",
            SortKey::Coverage => "coverage",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortDirection {
    #[value(name = "asc")]
    Ascending,
    #[value(name = "desc")]
    Descending,
}

impl SortDirection {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::Coverage,
            direction: SortDirection::Descending,
        }
    }
}

impl SortSpec {
    #[must_use]
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// The sort that results from choosing column `key`: the active column
    /// flips its direction, any other column starts ascending.
    #[must_use]
    pub fn toggled(self, key: SortKey) -> Self {
        if key == self.key {
            Self::new(key, self.direction.opposite())
        } else {
            Self::new(key, SortDirection::Ascending)
        }
    }

    #[must_use]
    pub fn indicator(self) -> SortIndicator {
        SortIndicator {
            active: self.key,
            arrow: self.direction.into(),
            next: self.direction.opposite(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrow {
    Up,
    Down,
}

impl From<SortDirection> for Arrow {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Ascending => Arrow::Up,
            SortDirection::Descending => Arrow::Down,
        }
    }
}

impl Arrow {
    pub fn symbol(&self) -> &'static str {
        match self {
            Arrow::Up => "▲",
            Arrow::Down => "▼",
        }
    }
}

/// Column header state after a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortIndicator {
    pub active: SortKey,
    pub arrow: Arrow,
    /// Direction the active column sorts in when chosen again.
    pub next: SortDirection,
}

impl SortIndicator {
    /// Direction a click on `key` will request.
    #[must_use]
    pub fn next_for(&self, key: SortKey) -> SortDirection {
        if key == self.active {
            self.next
        } else {
            SortDirection::Ascending
        }
    }
}

/// Build the ordering function for `spec`.
pub fn comparator(spec: SortSpec) -> impl Fn(&Function, &Function) -> Ordering {
    move |a: &Function, b: &Function| {
        let by_name = || a.display_name.cmp(&b.display_name);
        match spec.key {
            SortKey::Name => spec.direction.apply(by_name()),
            SortKey::File => spec
                .direction
                .apply(a.display_file.cmp(&b.display_file))
                .then_with(by_name),
            SortKey::Coverage => spec
                .direction
                .apply(a.coverage_percent.total_cmp(&b.coverage_percent))
                .then_with(by_name),
        }
    }
}

/// Sort `functions` in place. The sort is stable.
pub fn sort_in_place(functions: &mut [&Function], spec: SortSpec) {
    let cmp = comparator(spec);
    functions.sort_by(|a, b| cmp(a, b));
}

/// The view order of `functions` under `spec`, as ids.
#[must_use]
pub fn sort(functions: &[Function], spec: SortSpec) -> Vec<FunctionId> {
    let mut view: Vec<&Function> = functions.iter().collect();
    sort_in_place(&mut view, spec);
    view.into_iter().map(|f| f.id).collect()
}
