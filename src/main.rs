use std::{
    fs::{self, File},
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{debug, error, info, warn};
use simplelog::{Config, LevelFilter, WriteLogger};

use pagestack::inputs::{HostInput, parse_input};
use pagestack::panic_handler::initialize_panic_handler;
use pagestack::pdf::{DocumentHandle, MupdfBackend, RenderEvent};
use pagestack::settings::{self, Settings};
use pagestack::{UiState, Viewer, ViewerParams};

/// Multi-document PDF viewer driven by line commands.
///
/// Every command prints the resulting viewer state as one JSON line on stdout.
#[derive(Debug, Parser)]
#[command(name = "pagestack", version, about)]
struct Cli {
    /// Documents to open, in display order
    #[arg(value_name = "SOURCE")]
    sources: Vec<String>,

    /// Pipe-delimited list of documents
    #[arg(long, conflicts_with = "sources")]
    files: Option<String>,

    /// Single document, ignored when --files is given
    #[arg(long, conflicts_with = "sources")]
    file: Option<String>,

    /// Viewer address carrying files/file/drive query parameters
    #[arg(long, conflicts_with_all = ["sources", "files", "file"])]
    url: Option<String>,

    /// Link back to where the documents live
    #[arg(long)]
    drive: Option<String>,

    /// Settings file, created with defaults if missing
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "pagestack.log")]
    log_file: PathBuf,

    /// Only log warnings and errors
    #[arg(long, short)]
    quiet: bool,

    /// Write every displayed page as PNG into this directory
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Commands to run instead of reading stdin, separated by ';'
    #[arg(long)]
    script: Option<String>,

    /// Longest time to wait for a page to settle after each command
    #[arg(long, default_value_t = 60_000)]
    wait_ms: u64,
}

impl Cli {
    fn params(&self) -> Result<ViewerParams> {
        if let Some(address) = &self.url {
            let mut params = ViewerParams::from_address(address)?;
            if self.drive.is_some() {
                params.external_link.clone_from(&self.drive);
            }
            return Ok(params);
        }

        if !self.sources.is_empty() {
            return Ok(ViewerParams {
                sources: self.sources.clone(),
                external_link: self.drive.clone(),
            });
        }

        Ok(ViewerParams::from_values(
            self.files.as_deref(),
            self.file.as_deref(),
            self.drive.as_deref(),
        ))
    }

    fn settings(&self) -> Settings {
        match &self.config {
            Some(path) => settings::load_or_create(path),
            None => settings::load_settings(),
        }
    }

    fn commands(&self) -> Box<dyn Iterator<Item = io::Result<String>>> {
        match &self.script {
            Some(script) => Box::new(
                script
                    .split(';')
                    .map(|c| Ok(c.trim().to_string()))
                    .collect::<Vec<_>>()
                    .into_iter(),
            ),
            None => Box::new(io::stdin().lock().lines()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    WriteLogger::init(
        if cli.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Debug
        },
        Config::default(),
        File::create(&cli.log_file)
            .with_context(|| format!("cannot create log file {}", cli.log_file.display()))?,
    )?;
    initialize_panic_handler();

    info!("Starting pagestack");

    if let Some(out) = &cli.out {
        fs::create_dir_all(out)
            .with_context(|| format!("cannot create output directory {}", out.display()))?;
    }

    let params = cli.params()?;
    let settings = cli.settings();
    let backend = MupdfBackend::new();

    let mut viewer = match Viewer::boot(&backend, params.clone(), &settings) {
        Ok(viewer) => viewer,
        Err(e) => {
            error!("Failed to boot viewer: {e}");
            emit(&UiState::load_failed(&e, params.external_link))?;
            bail!(e.framed_message());
        }
    };

    let res = run(&cli, &mut viewer);
    if let Err(err) = &res {
        error!("Application error: {err:?}");
    }

    info!("Shutting down pagestack");
    res
}

fn run<D: DocumentHandle>(cli: &Cli, viewer: &mut Viewer<D>) -> Result<()> {
    let wait = Duration::from_millis(cli.wait_ms);
    settle(cli, viewer, wait)?;

    for line in cli.commands() {
        let line = line?;
        debug!("Command: {line:?}");

        match parse_input(&line) {
            Ok(HostInput::Quit) => break,
            Ok(HostInput::Status) => emit(&viewer.ui_state())?,
            Ok(HostInput::Ignored) => {}
            Ok(HostInput::ZoomIn) => {
                viewer.zoom_in();
                settle(cli, viewer, wait)?;
            }
            Ok(HostInput::ZoomOut) => {
                viewer.zoom_out();
                settle(cli, viewer, wait)?;
            }
            Ok(HostInput::Intent(cmd)) => {
                viewer.apply(cmd);
                settle(cli, viewer, wait)?;
            }
            Err(e) => {
                warn!("Rejected command {line:?}: {e}");
                eprintln!("{e}");
            }
        }
    }

    Ok(())
}

/// Wait for the in-flight render, export what got published and report state
fn settle<D: DocumentHandle>(cli: &Cli, viewer: &mut Viewer<D>, wait: Duration) -> Result<()> {
    for event in viewer.wait_idle(wait) {
        let RenderEvent::Published(page) = event else {
            continue;
        };
        if let Some(out) = &cli.out {
            let path = out.join(format!("page-{:04}.png", page.global_page));
            page.surface
                .write_png(&path)
                .with_context(|| format!("cannot write {}", path.display()))?;
            debug!("Exported page {} to {path:?}", page.global_page);
        }
    }

    emit(&viewer.ui_state())
}

fn emit(state: &UiState) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, state)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
