//! Finding, and if asked for, installing the gocov binary.
//!
//! Search order:
//!   1. every directory on `$PATH`
//!   2. `$GOROOT/bin`
//!   3. `$GOBIN`
//!   4. `bin` under every `$GOPATH` entry (`$HOME/go` when unset)
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use crate::busy::BusyIndicator;
use crate::error::{Result, ViewerError};

pub const GOCOV_PACKAGE: &str = "github.com/axw/gocov/gocov@latest";

pub const NOT_FOUND_MESSAGE: &str = "gocovview failed to find the gocov tool. It checks \
     $PATH, $GOROOT/bin, $GOBIN and $GOPATH/bin. Pass --gocov <PATH>, or rerun with \
     --install to let gocovview `go install` it for you.";

const GOCOV: &str = "gocov";

/// Go tool directories searched after `$PATH`, in order, reading the
/// environment through `var`.
pub fn go_dirs(var: impl Fn(&str) -> Option<OsString>) -> Vec<PathBuf> {
    let mut out = Vec::new();

    if let Some(goroot) = var("GOROOT").filter(|v| !v.is_empty()) {
        out.push(Path::new(&goroot).join("bin"));
    }
    if let Some(gobin) = var("GOBIN").filter(|v| !v.is_empty()) {
        out.push(PathBuf::from(gobin));
    }
    match var("GOPATH").filter(|v| !v.is_empty()) {
        Some(gopath) => out.extend(env::split_paths(&gopath).map(|dir| dir.join("bin"))),
        None => {
            if let Some(home) = var("HOME").filter(|v| !v.is_empty()) {
                out.push(Path::new(&home).join("go").join("bin"));
            }
        }
    }
    out
}

/// First executable gocov on `$PATH`, then in the Go tool directories.
pub fn find_gocov_with(var: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
    if let Ok(path) = which::which_in(GOCOV, var("PATH"), ".") {
        debug!("Found gocov on $PATH at {}", path.display());
        return Some(path);
    }
    go_dirs(var).into_iter().find_map(|dir| {
        let found = which::which_in(GOCOV, Some(&dir), ".").ok();
        debug!("Looking for gocov in {}: {:?}", dir.display(), found);
        found
    })
}

pub fn find_gocov() -> Option<PathBuf> {
    find_gocov_with(|name| env::var_os(name))
}

/// Install gocov with `go install`, then search for it again. Any failure
/// is terminal for the viewer.
pub fn acquire_gocov() -> Result<PathBuf> {
    info!("Installing {}", GOCOV_PACKAGE);
    let mut busy = BusyIndicator::start("Installing gocov ...");
    let output = Command::new("go")
        .args(["install", GOCOV_PACKAGE])
        .output();
    busy.stop();

    let output = output.map_err(|e| ViewerError::ToolAcquisition(e.to_string()))?;
    if !output.status.success() {
        let detail = if output.stderr.is_empty() {
            output.status.to_string()
        } else {
            String::from_utf8_lossy(&output.stderr).into_owned()
        };
        return Err(ViewerError::ToolAcquisition(detail));
    }

    find_gocov().ok_or_else(|| {
        ViewerError::ToolAcquisition(
            "Unable to find the gocov binary after running \"go install\"".to_string(),
        )
    })
}
