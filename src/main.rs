//! The `benchtable` binary
use std::io::Write;

use clap::Parser;
use colored::{control, Colorize};
use env_logger::Env;
use log::{error, warn};

use benchtable::{Cli, Error};

const BENCHTABLE_COLOR: &str = "BENCHTABLE_COLOR";
const CARGO_TERM_COLOR: &str = "CARGO_TERM_COLOR";
const BENCHTABLE_LOG: &str = "BENCHTABLE_LOG";

/// The main function of the `benchtable` binary.
///
/// Configures color and logging as early as possible, parses arguments, then delegates to the
/// library's [`benchtable::run`] entry point and maps its result to the documented exit-code
/// policy (§6/§7): `0` on success, `1` on any fatal error.
fn main() {
    let color_env = std::env::var(BENCHTABLE_COLOR).ok();
    if let Some(var) = color_env.as_ref().or(std::env::var(CARGO_TERM_COLOR).ok().as_ref()) {
        if var == "never" {
            control::set_override(false);
        } else if var == "always" {
            control::set_override(true);
        }
    }

    let cli = Cli::parse();
    let default_level = if cli.quiet { "error" } else { "info" };

    env_logger::Builder::from_env(Env::default().filter_or(BENCHTABLE_LOG, default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "{}: {:<5}: {}",
                record
                    .module_path()
                    .unwrap_or(record.module_path_static().unwrap_or("???")),
                match record.level() {
                    log::Level::Error => "Error".red().bold(),
                    log::Level::Warn => "Warn".yellow().bold(),
                    log::Level::Info => "Info".green().bold(),
                    log::Level::Debug => "Debug".blue().bold(),
                    log::Level::Trace => "Trace".cyan().bold(),
                },
                record.args()
            )
        })
        .init();

    match benchtable::run(&cli) {
        Ok(()) => {}
        Err(error) => match error.downcast_ref::<Error>() {
            Some(Error::Interrupted) => {
                warn!("{error}");
                std::process::exit(1)
            }
            _ => {
                error!("{error}");
                std::process::exit(1)
            }
        },
    }
}
