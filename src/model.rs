//! Normalized per-function coverage model built from a collector run.
//!
//! A fresh `Vec<Function>` is built on every refresh and nothing carries over
//! from the previous one, so the lazy character-offset caches can never be
//! used against different file contents.

use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

use crate::error::ViewerError;
use crate::gocov::{CoverageRun, RawFunction, RawStatement};

/// Coverage percentage of a single function. A function without statements
/// has nothing to miss and counts as fully covered.
#[must_use]
pub fn percentage(reached: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        reached as f64 / total as f64 * 100.0
    }
}

/// Position of a function in build order. Rendered as the row token `fi_<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub usize);

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fi_{}", self.0)
    }
}

impl FromStr for FunctionId {
    type Err = ViewerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.strip_prefix("fi_")
            .and_then(|n| n.parse().ok())
            .map(FunctionId)
            .ok_or_else(|| ViewerError::SelectionResolution(format!("malformed row id '{}'", s)))
    }
}

/// Character offsets of a statement within the displayed function body.
/// Filled in the first time the function is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharSpan {
    #[default]
    Unknown,
    Computed { start: usize, end: usize },
}

/// An uncovered statement. Byte offsets are relative to the function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRange {
    pub byte_start: usize,
    pub byte_end: usize,
    pub chars: CharSpan,
}

impl StatementRange {
    /// `None` when the statement starts or ends before `body_start`.
    fn relative_to(statement: &RawStatement, body_start: usize) -> Option<Self> {
        Some(Self {
            byte_start: statement.start.checked_sub(body_start)?,
            byte_end: statement.end.checked_sub(body_start)?,
            chars: CharSpan::Unknown,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub id: FunctionId,
    /// `package.function`
    pub display_name: String,
    /// `package/basename(file)`
    pub display_file: String,
    pub file_path: String,
    pub body_start: usize,
    pub body_end: usize,
    pub statements_total: usize,
    pub statements_reached: usize,
    pub coverage_percent: f64,
    /// Statements never reached, in source order.
    pub uncovered: Vec<StatementRange>,
    /// Unreached statements that lie before the body, as file offsets. A
    /// function with any of these can't be rendered.
    pub outside_body: Vec<Range<usize>>,
}

impl Function {
    fn from_raw(id: FunctionId, package: &str, raw: &RawFunction) -> Self {
        let mut uncovered = Vec::new();
        let mut outside_body = Vec::new();
        for s in raw.statements.iter().filter(|s| s.reached == 0) {
            match StatementRange::relative_to(s, raw.start) {
                Some(range) => uncovered.push(range),
                None => outside_body.push(s.start..s.end),
            }
        }
        let total = raw.statements.len();
        let reached = total - uncovered.len() - outside_body.len();

        let basename = Path::new(&raw.file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| raw.file.clone());

        Self {
            id,
            display_name: format!("{}.{}", package, raw.name),
            display_file: format!("{}/{}", package, basename),
            file_path: raw.file.clone(),
            body_start: raw.start,
            body_end: raw.end,
            statements_total: total,
            statements_reached: reached,
            coverage_percent: percentage(reached, total),
            uncovered,
            outside_body,
        }
    }

    /// The coverage column, e.g. `50.00% (1/2)`.
    #[must_use]
    pub fn coverage_string(&self) -> String {
        format!(
            "{:.2}% ({}/{})",
            self.coverage_percent, self.statements_reached, self.statements_total
        )
    }
}

/// Build the function list from a collector run, preserving package and
/// function order. Ids are assigned sequentially in that order.
#[must_use]
pub fn build(run: &CoverageRun) -> Vec<Function> {
    run.packages
        .iter()
        .flat_map(|pkg| pkg.functions.iter().map(move |f| (pkg.name.as_str(), f)))
        .enumerate()
        .map(|(i, (package, raw))| Function::from_raw(FunctionId(i), package, raw))
        .collect()
}

/// Find the function whose display name is `name`.
#[must_use]
pub fn find_by_name(functions: &[Function], name: &str) -> Option<FunctionId> {
    functions
        .iter()
        .find(|f| f.display_name == name)
        .map(|f| f.id)
}

/// Directory of the first function's source file, shown as the current
/// source directory.
#[must_use]
pub fn source_dir(functions: &[Function]) -> String {
    functions
        .first()
        .and_then(|f| Path::new(&f.file_path).parent())
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

/// Statement totals across a whole model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub reached: usize,
    pub total: usize,
}

impl Summary {
    #[must_use]
    pub fn of(functions: &[Function]) -> Self {
        functions.iter().fold(Self::default(), |acc, f| Self {
            reached: acc.reached + f.statements_reached,
            total: acc.total + f.statements_total,
        })
    }

    /// Overall percentage; 0.0 when there are no statements at all.
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            percentage(self.reached, self.total)
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Overall coverage: {:.2}% ({}/{})",
            self.percent(),
            self.reached,
            self.total
        )
    }
}
