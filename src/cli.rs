// CLI module - command-line argument parsing and handlers
//
// w3m invokes the bridge with single-dash flags (`-test`, `-size <path>`), and
// matches them by prefix. Those spellings are rewritten to their `--` forms
// before clap sees them.
//
// Subcommands for configuration management:
// - config --show: Display effective configuration
// - config --path: Show config file path
// - config --reset: Regenerate config file with defaults

use crate::config::{Config, VERSION};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

/// w3mimg-sixel - w3mimgdisplay-compatible image bridge for sixel terminals
#[derive(Debug, Parser)]
#[command(name = "w3mimg-sixel")]
#[command(version = VERSION)]
#[command(about = "w3mimgdisplay-compatible image bridge for sixel terminals", long_about = None)]
#[command(ignore_errors = true)]
pub struct Cli {
    /// Print the terminal size in pixels and exit
    #[arg(long)]
    pub test: bool,

    /// Print the cell-rounded pixel size of an image and exit
    #[arg(long, value_name = "PATH", allow_hyphen_values = true)]
    pub size: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// One-shot work requested on the command line instead of the command loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupAction {
    /// Print `<width> <height>` of the terminal in pixels
    Test,
    /// GETSIZE for a single file
    Size(PathBuf),
}

impl Cli {
    /// Parse the process arguments, accepting w3m's legacy spellings
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// `--test` wins over `--size` when both are given
    pub fn startup_action(&self) -> Option<StartupAction> {
        if self.test {
            return Some(StartupAction::Test);
        }
        self.size.clone().map(StartupAction::Size)
    }
}

/// Rewrite `-test*` to `--test` and `-size*` to `--size`
///
/// The program name is passed through untouched.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut normalized: Vec<OsString> = args.next().into_iter().collect();

    let mut after_size = false;
    for arg in args {
        // the value after -size is a path, even if it looks like a flag
        if after_size {
            after_size = false;
            normalized.push(arg);
            continue;
        }

        if arg.as_bytes().starts_with(b"-test") {
            normalized.push("--test".into());
        } else if arg.as_bytes().starts_with(b"-size") {
            normalized.push("--size".into());
            after_size = true;
        } else {
            normalized.push(arg);
        }
    }
    normalized
}

/// Run a `config` subcommand
pub fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Config { show, reset, path } => {
            if path {
                handle_config_path()
            } else if show {
                handle_config_show()
            } else if reset {
                handle_config_reset()
            } else {
                // No flag provided, show help
                println!("Usage: w3mimg-sixel config [--show|--reset|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --reset   Reset config file to defaults");
                println!("  --path    Show config file path");
                Ok(())
            }
        }
    }
}

fn handle_config_path() -> Result<()> {
    let path = Config::config_path().context("could not determine config path")?;
    println!("{}", path.display());
    Ok(())
}

fn handle_config_show() -> Result<()> {
    let config = Config::load()?;

    println!("# Effective configuration (env > file > defaults)");
    println!();
    print!("{}", config.to_toml());

    // Show source info
    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
    Ok(())
}

fn handle_config_reset() -> Result<()> {
    let path = Config::config_path().context("could not determine config path")?;

    // Confirm if file exists
    if path.exists() {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let Some(parent) = path.parent() else {
        bail!("config path {} has no parent directory", path.display());
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("cannot create directory {}", parent.display()))?;

    // Write the default config (using Config's single source of truth)
    std::fs::write(&path, Config::default().to_toml())
        .with_context(|| format!("cannot write config {}", path.display()))?;

    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    fn parse(list: &[&str]) -> Cli {
        Cli::parse_from(normalize_args(args(list)))
    }

    #[test]
    fn test_normalize_legacy_flags() {
        assert_eq!(
            normalize_args(args(&["w3mimg-sixel", "-test"])),
            args(&["w3mimg-sixel", "--test"])
        );
        assert_eq!(
            normalize_args(args(&["w3mimg-sixel", "-sizes", "/tmp/a.png"])),
            args(&["w3mimg-sixel", "--size", "/tmp/a.png"])
        );
    }

    #[test]
    fn test_normalize_keeps_program_and_other_args() {
        assert_eq!(
            normalize_args(args(&["-test", "--test", "config", "--show"])),
            args(&["-test", "--test", "config", "--show"])
        );
    }

    #[test]
    fn test_size_value_that_looks_like_a_flag() {
        assert_eq!(
            normalize_args(args(&["w3mimg-sixel", "-size", "-test.png"])),
            args(&["w3mimg-sixel", "--size", "-test.png"])
        );
    }

    #[test]
    fn test_parse_startup_actions() {
        assert_eq!(parse(&["w3mimg-sixel"]).startup_action(), None);
        assert_eq!(
            parse(&["w3mimg-sixel", "-test"]).startup_action(),
            Some(StartupAction::Test)
        );
        assert_eq!(
            parse(&["w3mimg-sixel", "-size", "pic.png"]).startup_action(),
            Some(StartupAction::Size(PathBuf::from("pic.png")))
        );
        assert_eq!(
            parse(&["w3mimg-sixel", "-size", "pic.png", "-test"]).startup_action(),
            Some(StartupAction::Test)
        );
    }

    #[test]
    fn test_parse_config_subcommand() {
        let cli = parse(&["w3mimg-sixel", "config", "--path"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                path: true,
                show: false,
                reset: false
            })
        ));
    }
}
