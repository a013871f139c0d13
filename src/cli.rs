//! Command handler functions for the gocovview CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write as _;
use std::io::{BufRead, Write};

use anyhow::{anyhow, Result};
use clap::ValueEnum;

use crate::collector::Collector;
use crate::sort::SortKey;
use crate::term::{describe_error, TerminalSurface};
use crate::viewer::Viewer;

pub type TermViewer<C> = Viewer<C, TerminalSurface>;

const HELP: &str = "\
Commands:
  <n> | fi_<n>            show row n, or the function with id fi_<n>
  r                       rerun gocov test
  s name|file|coverage    sort by a column (again to reverse)
  y <0.0-1.0>             scroll the source view
  l                       show the function list
  h                       show this help
  q                       quit
";

pub fn cmd_list<C: Collector>(viewer: &TermViewer<C>) -> String {
    let surface = viewer.surface();
    let mut out = surface.render_list();
    writeln!(out).unwrap();
    writeln!(out, "{}", surface.status_line()).unwrap();
    out
}

/// Render one function, addressed by its display name.
pub fn cmd_show<C: Collector>(viewer: &mut TermViewer<C>, name: &str) -> Result<String> {
    viewer
        .select_by_name(name)
        .map_err(|e| anyhow!(describe_error(&e)))?;
    Ok(source_text(viewer))
}

pub fn cmd_summary<C: Collector>(viewer: &TermViewer<C>) -> String {
    let functions = viewer.functions();
    let full = functions
        .iter()
        .filter(|f| f.statements_reached == f.statements_total)
        .count();
    let none = functions
        .iter()
        .filter(|f| f.statements_total > 0 && f.statements_reached == 0)
        .count();

    let mut out = String::new();
    let surface = viewer.surface();
    writeln!(out, "{}", surface.coverage_status()).unwrap();
    if !surface.path_status().is_empty() {
        writeln!(out, "Source:     {}", surface.path_status()).unwrap();
    }
    writeln!(out, "Functions:  {}", functions.len()).unwrap();
    writeln!(out, "  fully covered:  {}", full).unwrap();
    writeln!(out, "  never reached:  {}", none).unwrap();
    out
}

fn source_text<C: Collector>(viewer: &TermViewer<C>) -> String {
    let mut out = String::new();
    if let Some(f) = viewer.selected() {
        writeln!(
            out,
            "{}  {}  {}",
            f.display_name,
            f.display_file,
            f.coverage_string()
        )
        .unwrap();
        writeln!(out).unwrap();
    }
    out.push_str(&viewer.surface().render_source());
    out
}

#[derive(Debug, PartialEq)]
enum Command {
    Quit,
    Refresh,
    Sort(SortKey),
    Scroll(f64),
    Select(String),
    Row(usize),
    List,
    Help,
    Unknown(String),
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let first = words.next()?;
    let arg = words.next();

    let command = match (first, arg) {
        ("q" | "quit", _) => Command::Quit,
        ("r" | "refresh", _) => Command::Refresh,
        ("l" | "list", _) => Command::List,
        ("h" | "help" | "?", _) => Command::Help,
        ("s" | "sort", Some(key)) => match SortKey::from_str(key, true) {
            Ok(key) => Command::Sort(key),
            Err(_) => Command::Unknown(line.trim().to_string()),
        },
        ("y" | "scroll", Some(y)) => match y.parse() {
            Ok(y) => Command::Scroll(y),
            Err(_) => Command::Unknown(line.trim().to_string()),
        },
        (token, None) if token.starts_with("fi_") => Command::Select(token.to_string()),
        (n, None) => match n.parse() {
            Ok(n) => Command::Row(n),
            Err(_) => Command::Unknown(line.trim().to_string()),
        },
        _ => Command::Unknown(line.trim().to_string()),
    };
    Some(command)
}

/// Read commands from `input` until `q` or end of input, writing views and
/// errors to `output`.
pub fn run_interactive<C: Collector>(
    viewer: &mut TermViewer<C>,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<()> {
    write!(output, "{}", HELP)?;
    writeln!(output)?;
    write!(output, "{}", cmd_list(viewer))?;

    for line in input.lines() {
        let line = line?;
        let Some(command) = parse_command(&line) else {
            continue;
        };

        match command {
            Command::Quit => break,
            Command::Refresh => {
                let result = viewer.refresh();
                if viewer.report(result) {
                    write!(output, "{}", cmd_list(viewer))?;
                    write!(output, "{}", source_text(viewer))?;
                }
            }
            Command::Sort(key) => {
                viewer.sort_by(key);
                write!(output, "{}", cmd_list(viewer))?;
            }
            Command::Scroll(y) => {
                viewer.surface_mut().scroll_to(y);
                write!(output, "{}", source_text(viewer))?;
            }
            Command::Select(token) => {
                let result = viewer.select(&token);
                if viewer.report(result) {
                    write!(output, "{}", source_text(viewer))?;
                }
            }
            Command::Row(n) => match viewer.surface().row(n).map(|r| r.id) {
                Some(id) => {
                    let result = viewer.select_id(id);
                    if viewer.report(result) {
                        write!(output, "{}", source_text(viewer))?;
                    }
                }
                None => writeln!(output, "No row {}", n)?,
            },
            Command::List => write!(output, "{}", cmd_list(viewer))?,
            Command::Help => {
                write!(output, "{}", HELP)?;
                writeln!(output, "Next sort: {}", viewer.surface().sort_hint())?;
            }
            Command::Unknown(text) => {
                writeln!(output, "Unknown command '{}'. Type h for help.", text)?
            }
        }

        for error in viewer.surface_mut().take_errors() {
            writeln!(output, "error: {}", error)?;
        }
    }
    Ok(())
}
