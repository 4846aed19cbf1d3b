//! The `benchtable` library: a benchmark-result aggregation engine.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc(test(attr(warn(unused))))]
#![doc(test(attr(allow(unused_extern_crates))))]
#![warn(clippy::pedantic)]
#![warn(clippy::default_numeric_fallback)]
#![warn(clippy::else_if_without_else)]
#![warn(clippy::fn_to_numeric_cast_any)]
#![warn(clippy::get_unwrap)]
#![warn(clippy::if_then_some_else_none)]
#![warn(clippy::mixed_read_write_in_expression)]
#![warn(clippy::partial_pub_fields)]
#![warn(clippy::rest_pat_in_fully_bound_structs)]
#![warn(clippy::str_to_string)]
#![warn(clippy::string_to_string)]
#![warn(clippy::todo)]
#![warn(clippy::try_err)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(clippy::unneeded_field_pattern)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::enum_glob_use)]
#![allow(clippy::module_name_repetitions)]
#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]

pub mod aggregator;
pub mod cli;
pub mod decimal;
pub mod error;
pub mod options;
mod util;

pub use cli::Cli;
pub use error::Error;
pub use options::Options;
pub use util::{write_all_to_stderr, write_all_to_stdout};

/// The library's single pipeline entry point: resolves `cli`'s input files, loads and aggregates
/// them, and writes every requested output format. Thin wrapper around
/// [`aggregator::pipeline::run`] so the binary only has to know about this crate's `Cli`.
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let files = cli.resolve_input_files()?;
    let options = cli.options();
    aggregator::pipeline::run(&options, &files)
}
