use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use gocovview::busy::BusyIndicator;
use gocovview::cli;
use gocovview::collector::{Collector, GocovCommand, JsonFile};
use gocovview::locate;
use gocovview::session::ViewSession;
use gocovview::sort::{SortDirection, SortKey, SortSpec};
use gocovview::term::{describe_error, TerminalSurface};
use gocovview::viewer::Viewer;

/// gocovview: browse Go test coverage per function, with uncovered code
/// highlighted.
#[derive(Parser)]
#[command(name = "gocovview", version, about)]
struct Cli {
    /// Package pattern passed to `gocov test` (default: the current package).
    #[arg(long, global = true)]
    target: Option<String>,

    /// Path to the gocov binary. Skips the search of $PATH and the Go dirs.
    #[arg(long, global = true, env = "GOCOV")]
    gocov: Option<PathBuf>,

    /// Read a saved `gocov test` JSON document instead of running gocov.
    #[arg(long, global = true, conflicts_with_all = ["target", "timeout", "install"])]
    from_json: Option<PathBuf>,

    /// Column to sort the function list by.
    #[arg(long, global = true, value_enum, default_value = "coverage")]
    sort: SortKey,

    /// Sort direction.
    #[arg(long, global = true, value_enum, default_value = "desc")]
    order: SortDirection,

    /// Kill `gocov test` after this many seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Install gocov with `go install` when it can't be found.
    #[arg(long, global = true)]
    install: bool,

    /// Source lines shown at once (default: the whole function).
    #[arg(long, global = true)]
    height: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List functions with their coverage (the default).
    List,

    /// Show a function's source with uncovered statements highlighted.
    Show {
        /// Function name as listed, e.g. `pkg.F`.
        name: String,
    },

    /// Show overall coverage.
    Summary,

    /// Browse functions and rerun the tests from a prompt.
    Interactive,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let collector = resolve_collector(&cli)?;
    let mut surface = TerminalSurface::new();
    if let Some(height) = cli.height {
        surface = surface.with_height(height);
    }
    let session = ViewSession::new(SortSpec::new(cli.sort, cli.order));
    let mut viewer = Viewer::new(collector, surface, session);

    match cli.command.unwrap_or(Commands::List) {
        Commands::List => {
            refresh(&mut viewer)?;
            print!("{}", cli::cmd_list(&viewer));
        }
        Commands::Show { name } => {
            refresh(&mut viewer)?;
            print!("{}", cli::cmd_show(&mut viewer, &name)?);
        }
        Commands::Summary => {
            refresh(&mut viewer)?;
            print!("{}", cli::cmd_summary(&viewer));
        }
        Commands::Interactive => {
            // A failed first run is shown like any later one; `r` retries.
            let result = viewer.refresh();
            viewer.report(result);
            for error in viewer.surface_mut().take_errors() {
                eprintln!("error: {}", error);
            }
            cli::run_interactive(&mut viewer, io::stdin().lock(), io::stdout().lock())?;
        }
    }
    Ok(())
}

fn refresh<C: Collector>(viewer: &mut cli::TermViewer<C>) -> Result<()> {
    let mut busy = BusyIndicator::start("Running gocov test ...");
    let result = viewer.refresh();
    busy.stop();
    result.map_err(|e| anyhow!(describe_error(&e)))
}

fn resolve_collector(cli: &Cli) -> Result<Box<dyn Collector>> {
    if let Some(path) = &cli.from_json {
        return Ok(Box::new(JsonFile { path: path.clone() }));
    }

    let program = match cli.gocov.clone().or_else(locate::find_gocov) {
        Some(program) => program,
        None if cli.install => locate::acquire_gocov().context("gocov is required")?,
        None => bail!("{}", locate::NOT_FOUND_MESSAGE),
    };
    log::debug!("Using gocov at {}", program.display());

    let mut command = GocovCommand::new(program);
    command.target = cli.target.clone();
    command.timeout = cli.timeout.map(Duration::from_secs);
    Ok(Box::new(command))
}
