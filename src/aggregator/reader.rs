//! Result-file reader (C1, spec §4.1)
//!
//! Opens a local result archive, decodes it under each of `{gzip, bzip2, plain}` in turn by
//! trying to parse XML and rewinding on failure, then walks the parsed tree into a small,
//! dynamically-typed [`ResultFileXml`] that the run-set loader (C5) turns into columns and
//! results.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::Error;

#[derive(Debug, Clone, Default)]
pub struct SystemInfo {
    pub os: Option<String>,
    pub cpu: Option<String>,
    pub cores: Option<String>,
    pub freq: Option<String>,
    pub turbo: Option<String>,
    pub ram: Option<String>,
    pub host: Option<String>,
}

#[derive(Debug, Clone)]
pub struct XmlRun {
    pub name: String,
    pub files: Vec<String>,
    pub properties: String,
    pub logfile: Option<String>,
    pub runset: Option<String>,
    pub status: String,
    pub category: String,
    /// `(title, value)` pairs as they appeared as `<column>` children of this run.
    pub columns: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct ResultFileXml {
    pub root_tag: String,
    pub tool: String,
    pub version: String,
    pub date: Option<String>,
    pub benchmarkname: Option<String>,
    pub name: Option<String>,
    pub options: Option<String>,
    pub timelimit: Option<String>,
    pub memlimit: Option<String>,
    pub cpu_cores: Option<String>,
    pub block: Option<String>,
    pub error: Option<String>,
    pub systeminfo: SystemInfo,
    pub runs: Vec<XmlRun>,
    /// `(title, value)` pairs carried directly on the root element rather than on a `run`, used
    /// by the run-set loader to populate [`RunSetAttributes::summary`](crate::aggregator::loader::RunSetAttributes).
    pub summary_columns: Vec<(String, String)>,
}

/// Outcome of reading one result file: either parsed data, or a marker that it was skipped
/// because its root carried an `error` attribute and the caller passed `ignore_errors`.
pub enum ReadOutcome {
    Parsed(ResultFileXml),
    Skipped { reason: String },
}

/// Reads and classifies one result file; see §4.1.
pub fn read_result_file(path: &Path, ignore_errors: bool) -> Result<ReadOutcome> {
    let bytes = decode_bytes(path)?;
    let xml = parse_result_xml(&bytes)
        .map_err(|error| Error::CorruptResultFile(path.to_owned(), error.to_string()))?;

    if !matches!(xml.root_tag.as_str(), "result" | "test") {
        return Err(Error::CorruptResultFile(
            path.to_owned(),
            format!("unexpected root tag '{}'", xml.root_tag),
        )
        .into());
    }

    if let Some(reason) = xml.error.clone() {
        if ignore_errors {
            return Ok(ReadOutcome::Skipped { reason });
        }
        return Err(Error::CorruptResultFile(path.to_owned(), reason).into());
    }

    Ok(ReadOutcome::Parsed(xml))
}

/// Tries gzip, then bzip2, then plain, picking whichever successfully decodes to bytes.
/// Detection is by try-decode, not by file extension.
fn decode_bytes(path: &Path) -> Result<Vec<u8>> {
    let raw = std::fs::read(path).with_context(|| format!("reading '{}'", path.display()))?;

    if let Ok(bytes) = try_gunzip(&raw) {
        return Ok(bytes);
    }
    if let Ok(bytes) = try_bunzip2(&raw) {
        return Ok(bytes);
    }
    Ok(raw)
}

fn try_gunzip(raw: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(Cursor::new(raw));
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

fn try_bunzip2(raw: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = BzDecoder::new(Cursor::new(raw));
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

fn attr_value(e: &quick_xml::events::BytesStart, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())
        .map(|a| a.unescape_value().unwrap_or_default().into_owned())
}

pub(crate) fn parse_result_xml(bytes: &[u8]) -> Result<ResultFileXml> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut result = ResultFileXml::default();
    let mut buf = Vec::new();

    let mut in_systeminfo = false;
    let mut in_run: Option<XmlRun> = None;
    let mut pending_column_title: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "result" | "test" => {
                        result.root_tag = name.clone();
                        result.tool = attr_value(&e, "tool").unwrap_or_default();
                        result.version = attr_value(&e, "version").unwrap_or_default();
                        result.date = attr_value(&e, "date");
                        result.benchmarkname = attr_value(&e, "benchmarkname");
                        result.name = attr_value(&e, "name");
                        result.options = attr_value(&e, "options");
                        result.timelimit = attr_value(&e, "timelimit");
                        result.memlimit = attr_value(&e, "memlimit");
                        result.cpu_cores = attr_value(&e, "cpuCores");
                        result.block = attr_value(&e, "block");
                        result.error = attr_value(&e, "error");
                    }
                    "systeminfo" => in_systeminfo = true,
                    "os" if in_systeminfo => result.systeminfo.os = attr_value(&e, "name"),
                    "cpu" if in_systeminfo => {
                        result.systeminfo.cpu = attr_value(&e, "model");
                        result.systeminfo.cores = attr_value(&e, "cores");
                        result.systeminfo.freq = attr_value(&e, "frequency");
                        result.systeminfo.turbo = attr_value(&e, "turboboostActive");
                    }
                    "ram" if in_systeminfo => result.systeminfo.ram = attr_value(&e, "size"),
                    "run" | "sourcefile" => {
                        let files = attr_value(&e, "files")
                            .map(|raw| {
                                raw.trim_start_matches('[')
                                    .trim_end_matches(']')
                                    .split(',')
                                    .map(|s| s.trim().to_owned())
                                    .filter(|s| !s.is_empty())
                                    .collect()
                            })
                            .unwrap_or_default();
                        in_run = Some(XmlRun {
                            name: attr_value(&e, "name").unwrap_or_default(),
                            files,
                            properties: attr_value(&e, "properties").unwrap_or_default(),
                            logfile: attr_value(&e, "logfile"),
                            runset: attr_value(&e, "runset"),
                            status: String::new(),
                            category: String::new(),
                            columns: Vec::new(),
                        });
                    }
                    "column" => {
                        let title = attr_value(&e, "title").unwrap_or_default();
                        if let Some(value) = attr_value(&e, "value") {
                            if let Some(run) = in_run.as_mut() {
                                match title.as_str() {
                                    "status" => run.status = value,
                                    "category" => run.category = value,
                                    _ => run.columns.push((title, value)),
                                }
                            } else {
                                result.summary_columns.push((title, value));
                            }
                        } else {
                            // element-text pattern column (table-definition context); handled
                            // separately by the table-definition loader.
                            pending_column_title = Some(title);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(text) => {
                if let Some(title) = pending_column_title.take() {
                    let value = text.unescape()?.into_owned();
                    if let Some(run) = in_run.as_mut() {
                        run.columns.push((title, value));
                    }
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "systeminfo" => in_systeminfo = false,
                    "run" | "sourcefile" => {
                        if let Some(run) = in_run.take() {
                            result.runs.push(run);
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(result)
}

/// Computes a run's log-file locator per §4.1: either the `logfile` attribute (resolved relative
/// to the result file) or the conventional `<result-stem>.logfiles/[<runset>.]<task-basename>.log`
/// path.
pub fn logfile_locator(result_path: &Path, run: &XmlRun) -> PathBuf {
    let base_dir = result_path.parent().unwrap_or_else(|| Path::new("."));
    if let Some(logfile) = &run.logfile {
        return crate::util::make_absolute(base_dir, logfile);
    }

    let stem = result_stem(result_path);
    let task_basename = Path::new(&run.name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| run.name.clone());
    let filename = match &run.runset {
        Some(runset) => format!("{runset}.{task_basename}.log"),
        None => format!("{task_basename}.log"),
    };
    base_dir.join(format!("{stem}.logfiles")).join(filename)
}

/// The path of a run's log entry relative to the root of the sibling `<stem>.logfiles.zip`
/// archive, following the same `[<runset>.]<task-basename>.log` convention as
/// [`logfile_locator`]'s default branch. The zip archive always uses this conventional layout,
/// even when the run's XML carries an explicit `logfile` attribute (which only ever names a
/// standalone file next to the result file, not an in-archive path).
pub fn archive_relative_logfile(run: &XmlRun) -> String {
    let task_basename = Path::new(&run.name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| run.name.clone());
    match &run.runset {
        Some(runset) => format!("{runset}.{task_basename}.log"),
        None => format!("{task_basename}.log"),
    }
}

/// The result-file name with its (possible) `.xml`, `.xml.gz`, `.xml.bz2` suffix stripped, used
/// as the prefix for both `<stem>.logfiles/` and `<stem>.logfiles.zip`.
pub fn result_stem(result_path: &Path) -> String {
    let name = result_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    for suffix in [".xml.gz", ".xml.bz2", ".xml"] {
        if let Some(stripped) = name.strip_suffix(suffix) {
            return stripped.to_owned();
        }
    }
    name
}

/// Used by the log-archive cache (C2) to locate the sibling zip archive.
pub fn logfiles_zip_path(result_path: &Path) -> PathBuf {
    let base_dir = result_path.parent().unwrap_or_else(|| Path::new("."));
    base_dir.join(format!("{}.logfiles.zip", result_stem(result_path)))
}
