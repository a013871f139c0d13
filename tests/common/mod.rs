use std::path::{Path, PathBuf};

use gocovview::collector::JsonFile;
use gocovview::session::ViewSession;
use gocovview::term::TerminalSurface;
use gocovview::viewer::Viewer;
use tempfile::TempDir;

pub const CALC_GO: &str = include_str!("../fixtures/calc.go");
const CALC_JSON: &str = include_str!("../fixtures/calc.json");

/// The gocov document for `calc.go`, with file paths pointing into `dir`.
pub fn calc_json(dir: &Path) -> String {
    CALC_JSON.replace("@DIR@", &dir.display().to_string())
}

/// Write `calc.go` and its gocov document into a fresh temporary directory,
/// returning the dir handle and the path of the JSON document.
/// The caller must hold onto `TempDir` to keep the temp directory alive.
pub fn setup_calc() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("calc.go"), CALC_GO).unwrap();
    let json = dir.path().join("calc.json");
    std::fs::write(&json, calc_json(dir.path())).unwrap();
    (dir, json)
}

/// A terminal viewer reading `json`, not yet refreshed.
pub fn viewer(json: &Path) -> Viewer<JsonFile, TerminalSurface> {
    Viewer::new(
        JsonFile {
            path: json.to_path_buf(),
        },
        TerminalSurface::new(),
        ViewSession::default(),
    )
}
