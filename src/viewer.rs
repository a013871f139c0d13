//! The selection/render controller.
//!
//! A `Viewer` owns the current function list, the view session and a render
//! surface. All of its operations take `&mut self`, so refreshes and renders
//! are serialized by construction and a published list is never read while
//! it is being replaced.

use std::fs;
use std::ops::Range;
use std::path::PathBuf;
use std::time::Instant;

use log::{debug, error, info};

use crate::collector::Collector;
use crate::error::{Result, ViewerError};
use crate::gocov;
use crate::model::{self, CharSpan, Function, FunctionId, StatementRange, Summary};
use crate::offset;
use crate::render::{RenderSurface, Row, SourceView};
use crate::session::ViewSession;
use crate::sort::{self, SortKey, SortSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    /// Nothing rendered since the last refresh started.
    Idle,
    Loading(FunctionId),
    Rendered(FunctionId),
}

pub struct Viewer<C, S> {
    collector: C,
    surface: S,
    session: ViewSession,
    functions: Vec<Function>,
    order: Vec<FunctionId>,
    state: ViewerState,
}

impl<C: Collector, S: RenderSurface> Viewer<C, S> {
    pub fn new(collector: C, surface: S, session: ViewSession) -> Self {
        Self {
            collector,
            surface,
            session,
            functions: Vec::new(),
            order: Vec::new(),
            state: ViewerState::Idle,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn session(&self) -> &ViewSession {
        &self.session
    }

    /// Functions in build order; `functions()[id.0]` has id `id`.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Current view order.
    pub fn order(&self) -> &[FunctionId] {
        &self.order
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn selected(&self) -> Option<&Function> {
        match self.state {
            ViewerState::Rendered(id) => self.functions.get(id.0),
            _ => None,
        }
    }

    /// Run the collector and replace the model with its result.
    ///
    /// Fails only when collecting or decoding fails. Then nothing changes: the
    /// previous rows, selection and source stay on the surface. Once the new
    /// model is published, a failure to render the re-selected row is shown
    /// on the surface and does not fail the refresh.
    pub fn refresh(&mut self) -> Result<()> {
        let scroll = self.surface.scroll_position();
        let started = Instant::now();

        let raw = self.collector.collect()?;
        let run = gocov::parse(&raw)?;
        let functions = model::build(&run);
        info!(
            "Loaded {} functions from {} packages in {:?}",
            functions.len(),
            run.packages.len(),
            started.elapsed()
        );

        self.session.saved_scroll = Some(scroll);
        self.publish(functions);
        Ok(())
    }

    fn publish(&mut self, functions: Vec<Function>) {
        let reselect = self
            .session
            .previous_selection
            .as_deref()
            .and_then(|name| model::find_by_name(&functions, name));

        self.state = ViewerState::Idle;
        self.functions = functions;
        self.order = sort::sort(&self.functions, self.session.sort);

        self.surface.clear_rows();
        self.surface.insert_rows(self.rows());
        self.surface.set_sort_indicator(self.session.sort.indicator());
        self.surface.set_status(
            &Summary::of(&self.functions).to_string(),
            &model::source_dir(&self.functions),
        );

        match reselect.or_else(|| self.order.first().copied()) {
            Some(id) => {
                let result = self.select_id(id);
                if !self.report(result) {
                    self.surface.clear_source();
                }
            }
            None => self.surface.clear_source(),
        }
        // The saved position belongs to this refresh only.
        self.session.saved_scroll = None;
    }

    /// Rows in view order.
    pub fn rows(&self) -> Vec<Row> {
        self.order
            .iter()
            .map(|id| Row::for_function(&self.functions[id.0]))
            .collect()
    }

    /// Choose column `key`, flipping the direction if it is already active.
    pub fn sort_by(&mut self, key: SortKey) {
        self.set_sort(self.session.sort.toggled(key));
    }

    pub fn set_sort(&mut self, spec: SortSpec) {
        debug!("Sorting by {} {:?}", spec.key, spec.direction);
        self.session.sort = spec;
        self.order = sort::sort(&self.functions, spec);

        self.surface.clear_rows();
        self.surface.insert_rows(self.rows());
        self.surface.set_sort_indicator(spec.indicator());
        if let ViewerState::Rendered(id) = self.state {
            self.surface.set_selected(id);
        }
    }

    /// Select the row with token `fi_<n>` and render it.
    pub fn select(&mut self, token: &str) -> Result<()> {
        let id: FunctionId = token.parse()?;
        self.select_id(id)
    }

    pub fn select_by_name(&mut self, name: &str) -> Result<()> {
        let id = model::find_by_name(&self.functions, name).ok_or_else(|| {
            ViewerError::SelectionResolution(format!("no function named '{}'", name))
        })?;
        self.select_id(id)
    }

    pub fn select_id(&mut self, id: FunctionId) -> Result<()> {
        if id.0 >= self.functions.len() {
            return Err(ViewerError::SelectionResolution(format!(
                "row id {} out of range ({} functions)",
                id,
                self.functions.len()
            )));
        }

        let previous = self.state;
        self.state = ViewerState::Loading(id);
        let view = match render_function(&mut self.functions[id.0]) {
            Ok(view) => view,
            Err(e) => {
                self.state = previous;
                return Err(e);
            }
        };

        self.surface.set_source(view);
        self.surface.set_selected(id);
        if let Some(scroll) = self.session.take_scroll() {
            self.surface.restore_scroll(scroll);
        }
        self.session.previous_selection = Some(self.functions[id.0].display_name.clone());
        self.state = ViewerState::Rendered(id);
        Ok(())
    }

    /// Show the error of a failed operation on the surface. Returns whether
    /// the operation succeeded.
    pub fn report(&mut self, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                error!("{}", e);
                self.surface.show_error(&e);
                false
            }
        }
    }
}

/// Read the function's source and build its highlighted view.
fn render_function(function: &mut Function) -> Result<SourceView> {
    if let Some(stray) = function.outside_body.first() {
        return Err(ViewerError::InvalidRange(format!(
            "statement {}..{} starts before the body of {} at {}",
            stray.start, stray.end, function.display_name, function.body_start
        )));
    }
    let data = fs::read(&function.file_path).map_err(|source| ViewerError::SourceRead {
        path: PathBuf::from(&function.file_path),
        source,
    })?;
    let body = data
        .get(function.body_start..function.body_end)
        .ok_or_else(|| {
            ViewerError::InvalidRange(format!(
                "function body {}..{} is outside {} ({} bytes)",
                function.body_start,
                function.body_end,
                function.file_path,
                data.len()
            ))
        })?;

    fill_char_spans(body, &mut function.uncovered)?;

    Ok(SourceView {
        text: String::from_utf8_lossy(body).into_owned(),
        highlights: highlights(body, &function.uncovered),
    })
}

/// Compute the character spans of statements that don't have one yet, in a
/// single pass over `body`. Nothing is stored unless every span resolves.
fn fill_char_spans(body: &[u8], statements: &mut [StatementRange]) -> Result<()> {
    let pending: Vec<usize> = (0..statements.len())
        .filter(|&i| statements[i].chars == CharSpan::Unknown)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let queries: Vec<usize> = pending
        .iter()
        .flat_map(|&i| [statements[i].byte_start, statements[i].byte_end])
        .collect();
    let offsets = offset::char_offsets(body, &queries);

    let spans = pending
        .iter()
        .zip(offsets.chunks(2))
        .map(|(&i, pair)| match (pair[0], pair[1]) {
            (Some(start), Some(end)) if start <= end => Ok((i, CharSpan::Computed { start, end })),
            _ => Err(ViewerError::InvalidRange(format!(
                "statement {}..{} does not match the function body",
                statements[i].byte_start, statements[i].byte_end
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Computed character spans for {} statements", spans.len());
    for (i, span) in spans {
        statements[i].chars = span;
    }
    Ok(())
}

fn highlights(body: &[u8], statements: &[StatementRange]) -> Vec<Range<usize>> {
    statements
        .iter()
        .flat_map(|s| match s.chars {
            CharSpan::Computed { start, .. } => {
                offset::highlight_nicely(&body[s.byte_start..s.byte_end], start)
            }
            CharSpan::Unknown => Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use crate::render::ScrollPosition;
    use crate::sort::SortDirection;
    use crate::term::TerminalSurface;

    /// Hands out queued documents, one per refresh.
    struct Scripted(RefCell<VecDeque<Result<Vec<u8>>>>);

    impl Scripted {
        fn new(docs: Vec<Result<Vec<u8>>>) -> Self {
            Self(RefCell::new(docs.into()))
        }
    }

    impl Collector for Scripted {
        fn collect(&self) -> Result<Vec<u8>> {
            self.0
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(br#"{"Packages": []}"#.to_vec()))
        }
    }

    const SOURCE: &str = "package p\n\nfunc F() {\n\tif x {\n\t\tprintln(\"é\")\n\t}\n}\n\nfunc G() {}\n";

    fn doc(file: &str, g_first: bool) -> Vec<u8> {
        let f_start = SOURCE.find("func F").unwrap();
        let f_end = SOURCE.find("}\n\nfunc G").unwrap() + 1;
        let g_start = SOURCE.find("func G").unwrap();
        let g_end = SOURCE.len() - 1;
        let stmt_start = SOURCE.find("if x").unwrap();
        let stmt_end = SOURCE.find("\")").unwrap() + 2;

        let f = format!(
            r#"{{"Name": "F", "File": "{file}", "Start": {f_start}, "End": {f_end},
               "Statements": [{{"Start": {stmt_start}, "End": {stmt_end}, "Reached": 0}},
                              {{"Start": {f_start}, "End": {stmt_start}, "Reached": 1}}]}}"#
        );
        let g = format!(
            r#"{{"Name": "G", "File": "{file}", "Start": {g_start}, "End": {g_end},
               "Statements": [{{"Start": {g_start}, "End": {g_end}, "Reached": 3}}]}}"#
        );
        let functions = if g_first {
            format!("{g}, {f}")
        } else {
            format!("{f}, {g}")
        };
        format!(r#"{{"Packages": [{{"Name": "p", "Functions": [{functions}]}}]}}"#).into_bytes()
    }

    fn setup(docs: Vec<Result<Vec<u8>>>) -> (Viewer<Scripted, TerminalSurface>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p.go"), SOURCE).unwrap();
        let viewer = Viewer::new(
            Scripted::new(docs),
            TerminalSurface::new(),
            ViewSession::default(),
        );
        (viewer, dir)
    }

    fn file_of(dir: &tempfile::TempDir) -> String {
        dir.path().join("p.go").display().to_string()
    }

    #[test]
    fn test_refresh_selects_first_row() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p.go"), SOURCE).unwrap();
        let file = file_of(&dir);
        let mut viewer = Viewer::new(
            Scripted::new(vec![Ok(doc(&file, false))]),
            TerminalSurface::new(),
            ViewSession::default(),
        );
        viewer.refresh().unwrap();

        // Coverage descending: G (100%) before F (50%).
        let names: Vec<_> = viewer.rows().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["p.G", "p.F"]);
        assert_eq!(viewer.state(), ViewerState::Rendered(FunctionId(1)));
        assert_eq!(viewer.session().previous_selection.as_deref(), Some("p.G"));
        assert_eq!(
            viewer.surface().coverage_status(),
            "Overall coverage: 66.67% (2/3)"
        );
        assert_eq!(viewer.surface().path_status(), dir.path().display().to_string());
    }

    #[test]
    fn test_select_highlights_uncovered_statement() {
        let (mut viewer, dir) = setup(Vec::new());
        let file = file_of(&dir);
        *viewer.collector.0.borrow_mut() = vec![Ok(doc(&file, false))].into();
        viewer.refresh().unwrap();

        viewer.select("fi_0").unwrap();
        let view = viewer.surface().source().unwrap();
        assert!(view.text.starts_with("func F() {"));
        let highlighted: Vec<String> = view
            .highlights
            .iter()
            .map(|r| view.text.chars().skip(r.start).take(r.len()).collect())
            .collect();
        assert_eq!(highlighted, ["if x {", "println(\"é\")"]);

        let f = &viewer.functions()[0];
        assert!(matches!(f.uncovered[0].chars, CharSpan::Computed { .. }));
    }

    #[test]
    fn test_selection_survives_refresh() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p.go"), SOURCE).unwrap();
        let file = file_of(&dir);
        let mut viewer = Viewer::new(
            Scripted::new(vec![Ok(doc(&file, false)), Ok(doc(&file, true))]),
            TerminalSurface::new(),
            ViewSession::default(),
        );
        viewer.refresh().unwrap();
        viewer.select("fi_0").unwrap();
        assert_eq!(viewer.selected().unwrap().display_name, "p.F");

        // The second document lists G first, so F now has id fi_1.
        viewer.refresh().unwrap();
        assert_eq!(viewer.state(), ViewerState::Rendered(FunctionId(1)));
        assert_eq!(viewer.selected().unwrap().display_name, "p.F");
        assert_eq!(viewer.surface().selected(), Some(FunctionId(1)));
    }

    #[test]
    fn test_failed_refresh_keeps_model() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p.go"), SOURCE).unwrap();
        let file = file_of(&dir);
        let mut viewer = Viewer::new(
            Scripted::new(vec![
                Ok(doc(&file, false)),
                Err(ViewerError::Collection {
                    message: "exit status: 1".to_string(),
                    detail: Some("--- FAIL: TestF".to_string()),
                }),
                Ok(b"not json".to_vec()),
            ]),
            TerminalSurface::new(),
            ViewSession::default(),
        );
        viewer.refresh().unwrap();
        let rows = viewer.rows();

        let err = viewer.refresh().unwrap_err();
        assert_eq!(err.detail(), Some("--- FAIL: TestF"));
        assert_eq!(viewer.rows(), rows);
        assert_eq!(viewer.surface().rows(), rows.as_slice());

        let err = viewer.refresh().unwrap_err();
        assert!(matches!(err, ViewerError::Decode(_)));
        assert_eq!(viewer.functions().len(), 2);
        assert_eq!(viewer.session().saved_scroll, None);

        // The previous render is still on screen, so sorting keeps its marker.
        assert_eq!(viewer.state(), ViewerState::Rendered(FunctionId(1)));
        viewer.sort_by(SortKey::Name);
        assert_eq!(viewer.surface().selected(), Some(FunctionId(1)));
        assert!(viewer.surface().source().is_some());
    }

    #[test]
    fn test_scroll_restored_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p.go"), SOURCE).unwrap();
        let file = file_of(&dir);
        let mut viewer = Viewer::new(
            Scripted::new(vec![Ok(doc(&file, false)), Ok(doc(&file, false))]),
            TerminalSurface::new(),
            ViewSession::default(),
        );
        viewer.refresh().unwrap();
        viewer
            .surface_mut()
            .restore_scroll(ScrollPosition { x: 0.0, y: 0.25 });

        viewer.refresh().unwrap();
        assert_eq!(viewer.surface().scroll_position().y, 0.25);
        assert_eq!(viewer.session().saved_scroll, None);

        // A later selection starts at the top instead of jumping back to the
        // position saved for the refresh.
        viewer
            .surface_mut()
            .restore_scroll(ScrollPosition { x: 0.0, y: 0.75 });
        viewer.select("fi_1").unwrap();
        assert_eq!(viewer.surface().scroll_position().y, 0.0);
    }

    #[test]
    fn test_bad_selection_ids() {
        let (mut viewer, dir) = setup(Vec::new());
        let file = file_of(&dir);
        *viewer.collector.0.borrow_mut() = vec![Ok(doc(&file, false))].into();
        viewer.refresh().unwrap();

        for token in ["fi_9", "row_1", "fi_"] {
            let err = viewer.select(token).unwrap_err();
            assert!(matches!(err, ViewerError::SelectionResolution(_)), "{token}");
        }
        assert!(viewer.select_by_name("p.Nope").is_err());
        assert_eq!(viewer.session().previous_selection.as_deref(), Some("p.G"));
    }

    #[test]
    fn test_missing_source_is_local_failure() {
        let (mut viewer, dir) = setup(Vec::new());
        let file = file_of(&dir);
        *viewer.collector.0.borrow_mut() = vec![Ok(doc(&file, false))].into();
        viewer.refresh().unwrap();
        std::fs::remove_file(dir.path().join("p.go")).unwrap();

        let err = viewer.select("fi_0").unwrap_err();
        assert!(matches!(err, ViewerError::SourceRead { .. }));
        // G stays rendered; only the new render failed.
        assert_eq!(viewer.state(), ViewerState::Rendered(FunctionId(1)));
        assert_eq!(viewer.session().previous_selection.as_deref(), Some("p.G"));
        assert_eq!(viewer.functions().len(), 2);

        assert!(!viewer.report(Err(err)));
        assert_eq!(viewer.surface().errors().len(), 1);
    }

    #[test]
    fn test_body_outside_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p.go"), "package p\n").unwrap();
        let file = file_of(&dir);
        let doc = format!(
            r#"{{"Packages": [{{"Name": "p", "Functions": [
                {{"Name": "F", "File": "{file}", "Start": 5, "End": 500, "Statements": []}}]}}]}}"#
        );
        let mut viewer = Viewer::new(
            Scripted::new(vec![Ok(doc.into_bytes())]),
            TerminalSurface::new(),
            ViewSession::default(),
        );
        viewer.refresh().unwrap();
        // The model is published; only the render failed.
        assert_eq!(viewer.rows().len(), 1);
        assert_eq!(viewer.state(), ViewerState::Idle);
        assert!(viewer.surface().source().is_none());
        let errors = viewer.surface().errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Invalid range: function body 5..500"));
    }

    #[test]
    fn test_missing_source_does_not_fail_refresh() {
        let (mut viewer, dir) = setup(Vec::new());
        let file = file_of(&dir);
        *viewer.collector.0.borrow_mut() = vec![Ok(doc(&file, false))].into();
        std::fs::remove_file(dir.path().join("p.go")).unwrap();

        viewer.refresh().unwrap();
        assert_eq!(viewer.surface().rows().len(), 2);
        assert_eq!(
            viewer.surface().coverage_status(),
            "Overall coverage: 66.67% (2/3)"
        );
        assert_eq!(viewer.state(), ViewerState::Idle);
        assert_eq!(viewer.surface().errors().len(), 1);
        assert!(viewer.surface().errors()[0].starts_with("Failed to read source file"));
    }

    #[test]
    fn test_failed_reselect_drops_saved_scroll() {
        let (mut viewer, dir) = setup(Vec::new());
        let file = file_of(&dir);
        *viewer.collector.0.borrow_mut() = vec![Ok(doc(&file, false)), Ok(doc(&file, false))].into();
        viewer.refresh().unwrap();
        viewer
            .surface_mut()
            .restore_scroll(ScrollPosition { x: 0.0, y: 0.4 });

        std::fs::remove_file(dir.path().join("p.go")).unwrap();
        viewer.refresh().unwrap();
        assert_eq!(viewer.state(), ViewerState::Idle);
        assert!(viewer.surface().source().is_none());
        assert_eq!(viewer.session().saved_scroll, None);

        std::fs::write(dir.path().join("p.go"), SOURCE).unwrap();
        viewer.select("fi_0").unwrap();
        assert_eq!(viewer.surface().scroll_position().y, 0.0);
    }

    #[test]
    fn test_statement_before_body_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p.go"), SOURCE).unwrap();
        let file = file_of(&dir);
        let f_start = SOURCE.find("func F").unwrap();
        let doc = format!(
            r#"{{"Packages": [{{"Name": "p", "Functions": [
                {{"Name": "F", "File": "{file}", "Start": {f_start}, "End": {f_end},
                  "Statements": [{{"Start": 0, "End": 7, "Reached": 0}}]}}]}}]}}"#,
            f_end = f_start + 10,
        );
        let mut viewer = Viewer::new(
            Scripted::new(vec![Ok(doc.into_bytes())]),
            TerminalSurface::new(),
            ViewSession::default(),
        );

        viewer.refresh().unwrap();
        assert_eq!(viewer.functions()[0].coverage_string(), "0.00% (0/1)");
        assert!(viewer.surface().source().is_none());
        let errors = viewer.surface().errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Invalid range: statement 0..7 starts before the body"));
    }

    #[test]
    fn test_sort_toggle_updates_rows_and_indicator() {
        let (mut viewer, dir) = setup(Vec::new());
        let file = file_of(&dir);
        *viewer.collector.0.borrow_mut() = vec![Ok(doc(&file, false))].into();
        viewer.refresh().unwrap();

        viewer.sort_by(SortKey::Coverage);
        assert_eq!(viewer.session().sort.direction, SortDirection::Ascending);
        let names: Vec<_> = viewer.surface().rows().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, ["p.F", "p.G"]);

        viewer.sort_by(SortKey::Name);
        let indicator = viewer.surface().indicator().unwrap();
        assert_eq!(indicator.active, SortKey::Name);
        assert_eq!(indicator.next, SortDirection::Descending);
        assert_eq!(viewer.surface().selected(), Some(FunctionId(1)));
    }

    #[test]
    fn test_empty_run() {
        let mut viewer = Viewer::new(
            Scripted::new(vec![Ok(br#"{"Packages": null}"#.to_vec())]),
            TerminalSurface::new(),
            ViewSession::default(),
        );
        viewer.refresh().unwrap();
        assert!(viewer.rows().is_empty());
        assert_eq!(viewer.state(), ViewerState::Idle);
        assert_eq!(
            viewer.surface().coverage_status(),
            "Overall coverage: 0.00% (0/0)"
        );
        assert_eq!(viewer.surface().path_status(), "");
    }
}
