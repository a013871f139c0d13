//! A [`RenderSurface`] for the terminal.
//!
//! The surface only records what the viewer publishes; `render_list` and
//! `render_source` turn that state into text for printing.

use std::fmt::Write;

use console::Style;

use crate::error::ViewerError;
use crate::model::FunctionId;
use crate::render::{RenderSurface, Row, ScrollPosition, SourceView};
use crate::sort::{Arrow, SortIndicator, SortKey};

/// Placeholder shown before the first successful refresh.
pub const NO_COVERAGE: &str = "Overall coverage: 0% (0/0)";

/// Caption and, when available, the full diagnostic text of an error.
pub fn describe_error(error: &ViewerError) -> String {
    match error.detail() {
        Some(detail) => format!("{}\n\n{}", error, detail.trim_end()),
        None => error.to_string(),
    }
}

#[derive(Debug)]
pub struct TerminalSurface {
    rows: Vec<Row>,
    selected: Option<FunctionId>,
    indicator: Option<SortIndicator>,
    source: Option<SourceView>,
    scroll: ScrollPosition,
    coverage_status: String,
    path_status: String,
    errors: Vec<String>,
    /// Number of source lines shown at once; everything when unset.
    height: Option<usize>,
    highlight: Style,
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            selected: None,
            indicator: None,
            source: None,
            scroll: ScrollPosition::default(),
            coverage_status: NO_COVERAGE.to_string(),
            path_status: String::new(),
            errors: Vec::new(),
            height: None,
            highlight: Style::new().black().on_color256(224),
        }
    }

    pub fn with_height(mut self, height: usize) -> Self {
        self.height = Some(height.max(1));
        self
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn selected(&self) -> Option<FunctionId> {
        self.selected
    }

    pub fn indicator(&self) -> Option<SortIndicator> {
        self.indicator
    }

    pub fn source(&self) -> Option<&SourceView> {
        self.source.as_ref()
    }

    pub fn coverage_status(&self) -> &str {
        &self.coverage_status
    }

    pub fn path_status(&self) -> &str {
        &self.path_status
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }

    /// Scroll the source view vertically to fraction `y` of its lines.
    pub fn scroll_to(&mut self, y: f64) {
        self.scroll.y = y.clamp(0.0, 1.0);
    }

    /// Row `n` (1-based) of the list as currently shown.
    pub fn row(&self, n: usize) -> Option<&Row> {
        n.checked_sub(1).and_then(|i| self.rows.get(i))
    }

    pub fn status_line(&self) -> String {
        if self.path_status.is_empty() {
            self.coverage_status.clone()
        } else {
            format!("{}  {}", self.path_status, self.coverage_status)
        }
    }

    /// The direction each column would sort in if chosen next, e.g.
    /// `s name ▲  s file ▲  s coverage ▲`. Empty before the first sort.
    pub fn sort_hint(&self) -> String {
        let Some(indicator) = self.indicator else {
            return String::new();
        };
        SortKey::ALL
            .iter()
            .map(|&key| format!("s {} {}", key, Arrow::from(indicator.next_for(key)).symbol()))
            .collect::<Vec<_>>()
            .join("  ")
    }

    fn heading(&self, key: SortKey, title: &str) -> String {
        match self.indicator {
            Some(ind) if ind.active == key => format!("{} {}", title, ind.arrow.symbol()),
            _ => title.to_string(),
        }
    }

    /// The function list as an aligned table. The selected row is marked
    /// with `>`.
    pub fn render_list(&self) -> String {
        let headings = [
            self.heading(SortKey::Name, "Function"),
            self.heading(SortKey::File, "File"),
            self.heading(SortKey::Coverage, "Coverage"),
        ];
        let name_w = column_width(&headings[0], self.rows.iter().map(|r| r.name.as_str()));
        let file_w = column_width(&headings[1], self.rows.iter().map(|r| r.file.as_str()));
        let num_w = self.rows.len().to_string().len();

        let mut out = String::new();
        writeln!(
            out,
            "  {:>num_w$}  {:<name_w$}  {:<file_w$}  {}",
            "#", headings[0], headings[1], headings[2]
        )
        .unwrap();
        for (i, row) in self.rows.iter().enumerate() {
            let marker = if Some(row.id) == self.selected { ">" } else { " " };
            writeln!(
                out,
                "{} {:>num_w$}  {:<name_w$}  {:<file_w$}  {}",
                marker,
                i + 1,
                row.name,
                row.file,
                row.coverage
            )
            .unwrap();
        }
        out
    }

    /// The source view with uncovered regions styled, windowed by the
    /// vertical scroll position when a height is set.
    pub fn render_source(&self) -> String {
        let Some(view) = &self.source else {
            return String::new();
        };

        let mut marked = vec![false; view.text.chars().count()];
        for range in &view.highlights {
            for m in marked.iter_mut().take(range.end).skip(range.start) {
                *m = true;
            }
        }

        let mut lines: Vec<String> = Vec::new();
        let mut line = String::new();
        let mut run = String::new();
        let mut run_marked = false;
        for (ch, is_marked) in view.text.chars().zip(marked) {
            if ch == '\n' {
                self.flush_run(&mut line, &mut run, run_marked);
                lines.push(std::mem::take(&mut line));
                continue;
            }
            if is_marked != run_marked {
                self.flush_run(&mut line, &mut run, run_marked);
                run_marked = is_marked;
            }
            run.push(ch);
        }
        self.flush_run(&mut line, &mut run, run_marked);
        if !line.is_empty() {
            lines.push(line);
        }

        let (first, count) = match self.height {
            Some(height) => {
                let last_top = lines.len().saturating_sub(height);
                ((self.scroll.y * last_top as f64).round() as usize, height)
            }
            None => (0, lines.len()),
        };

        let mut out = String::new();
        for line in lines.iter().skip(first).take(count) {
            writeln!(out, "{}", line).unwrap();
        }
        out
    }

    fn flush_run(&self, line: &mut String, run: &mut String, marked: bool) {
        if run.is_empty() {
            return;
        }
        if marked {
            write!(line, "{}", self.highlight.apply_to(run.as_str())).unwrap();
        } else {
            line.push_str(run);
        }
        run.clear();
    }
}

fn column_width<'a>(title: &str, cells: impl Iterator<Item = &'a str>) -> usize {
    cells
        .map(|c| c.chars().count())
        .chain(std::iter::once(title.chars().count()))
        .max()
        .unwrap_or(0)
}

impl RenderSurface for TerminalSurface {
    fn clear_rows(&mut self) {
        self.rows.clear();
        self.selected = None;
    }

    fn insert_rows(&mut self, rows: Vec<Row>) {
        self.rows.extend(rows);
    }

    fn set_sort_indicator(&mut self, indicator: SortIndicator) {
        self.indicator = Some(indicator);
    }

    fn set_selected(&mut self, id: FunctionId) {
        self.selected = Some(id);
    }

    fn set_source(&mut self, view: SourceView) {
        self.source = Some(view);
        self.scroll = ScrollPosition::default();
    }

    fn clear_source(&mut self) {
        self.source = None;
        self.scroll = ScrollPosition::default();
    }

    fn scroll_position(&self) -> ScrollPosition {
        self.scroll
    }

    fn restore_scroll(&mut self, position: ScrollPosition) {
        self.scroll = position;
    }

    fn set_status(&mut self, coverage: &str, path: &str) {
        self.coverage_status = coverage.to_string();
        self.path_status = path.to_string();
    }

    fn show_error(&mut self, error: &ViewerError) {
        self.errors.push(describe_error(error));
    }
}
