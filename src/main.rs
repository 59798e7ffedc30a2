// w3mimg-sixel - w3mimgdisplay-compatible image bridge for sixel terminals
//
// w3m (and other w3mimgdisplay clients) send image-placement commands on
// stdin. This bridge turns them into cursor moves and rectangular erases on
// the controlling terminal, and delegates pixel rendering to img2sixel.
//
// Architecture:
// - Protocol: tokenizes `;`-separated lines into typed commands
// - Terminal: /dev/tty handle, geometry detection, SIGWINCH flag
// - Emitter: pixel-to-cell transform and control sequences
// - Encoder: img2sixel call-out and image header reads
// - Dispatcher: the blocking command loop tying them together

mod cli;
mod config;
mod dispatcher;
mod emitter;
mod encoder;
mod logging;
mod protocol;
mod terminal;

use anyhow::{Context, Result};
use cli::{Cli, StartupAction};
use config::Config;
use dispatcher::Dispatcher;
use encoder::Img2Sixel;
use std::io::Write;
use terminal::{geometry, Tty};
use tracing::{debug, info, warn};

fn main() -> Result<()> {
    let mut cli = Cli::parse_args();

    // Config subcommands never touch the terminal
    if let Some(command) = cli.command.take() {
        return cli::handle_command(command);
    }

    let config = Config::load()?;

    // Keep the handle alive until exit so buffered log lines reach the file
    let log = logging::init(&config.logging);
    if let Some(reason) = &log.fallback_reason {
        warn!(reason = %reason, "logging to stderr");
    }

    debug!("--- new instance ---");
    debug!(destination = ?log.destination, "logging initialized");
    for (i, arg) in std::env::args_os().enumerate() {
        debug!("argv[{i}]: {}", arg.to_string_lossy());
    }

    if let Err(e) = terminal::install_resize_handler() {
        warn!(error = %e, "sigaction(SIGWINCH) failed");
    }

    let mut tty = Tty::open_controlling().context("couldn't open controlling terminal")?;
    debug!(ttyname = %tty.path().display(), "opened controlling terminal");

    let (geometry, source) = geometry::detect(&mut tty, &config.geometry);
    info!(
        width = geometry.pixel_width,
        height = geometry.pixel_height,
        cell_width = geometry.cell_width,
        cell_height = geometry.cell_height,
        source = source.as_str(),
        "terminal size"
    );

    let mut backend = Img2Sixel::from(&config.encoder);
    debug!(encoder = backend.program(), "image encoder");
    let stdout = std::io::stdout();

    match cli.startup_action() {
        Some(StartupAction::Test) => {
            let mut out = stdout.lock();
            writeln!(out, "{} {}", geometry.pixel_width, geometry.pixel_height)?;
            out.flush()?;
            debug!(
                width = geometry.pixel_width,
                height = geometry.pixel_height,
                "response"
            );
        }
        Some(StartupAction::Size(path)) => {
            dispatcher::report_size(&mut backend, &mut stdout.lock(), &geometry, &path)?;
        }
        None => {
            let mut dispatcher = Dispatcher::new(tty, backend, stdout.lock(), geometry, &config);
            if let Err(e) = dispatcher.run(std::io::stdin().lock()) {
                warn!(error = %e, "command loop stopped");
            }
        }
    }

    info!("exiting...");
    drop(log);
    Ok(())
}
