//! The module containing the crate main [`Error`] type

use std::fmt::Display;
use std::path::PathBuf;

/// The main `benchtable` error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The result file could not be opened or decoded under any of the supported compressions
    ///
    /// `CorruptResultFile(path, message)`
    CorruptResultFile(PathBuf, String),
    /// A result file or glob named on the command line did not resolve to any file
    ///
    /// `MissingResultFile(pattern)`
    MissingResultFile(String),
    /// The table-definition document's root tag was not `table`, or a child was malformed
    ///
    /// `InvalidTableDefinition(path, message)`
    InvalidTableDefinition(PathBuf, String),
    /// No result files were loaded (all inputs missing, corrupt and ignored, or empty)
    NoResultsLoaded,
    /// An invalid combination or value of command-line arguments
    ///
    /// `InvalidCliArgument(message)`
    InvalidCliArgument(String),
    /// Opening or reading a log-archive zip file failed
    ///
    /// `LogArchiveError(path, message)`
    LogArchiveError(PathBuf, String),
    /// Writing a rendered table to its output path failed
    ///
    /// `OutputError(path, message)`
    OutputError(String, String),
    /// No log-value extractor is registered for a run's tool module; non-fatal, logged by the
    /// extractor registry itself rather than returned up the call stack.
    ///
    /// `ExtractorUnavailable(tool_module)`
    ExtractorUnavailable(String),
    /// The run was interrupted before all output was written
    Interrupted,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CorruptResultFile(path, message) => {
                write!(
                    f,
                    "Failed to read result file '{}': {message}",
                    path.display()
                )
            }
            Self::MissingResultFile(pattern) => {
                write!(f, "No file matches '{pattern}'")
            }
            Self::InvalidTableDefinition(path, message) => {
                write!(
                    f,
                    "Invalid table-definition file '{}': {message}",
                    path.display()
                )
            }
            Self::NoResultsLoaded => {
                write!(f, "No result files could be loaded, nothing to do")
            }
            Self::InvalidCliArgument(message) => {
                write!(f, "Invalid argument: {message}")
            }
            Self::LogArchiveError(path, message) => {
                write!(f, "Error reading log archive '{}': {message}", path.display())
            }
            Self::OutputError(path, message) => {
                write!(f, "Error writing output '{path}': {message}")
            }
            Self::ExtractorUnavailable(tool_module) => {
                write!(f, "No log-value extractor registered for tool module '{tool_module}'")
            }
            Self::Interrupted => {
                write!(f, "Interrupted, no output was written")
            }
        }
    }
}

impl std::error::Error for Error {}
