//! This module provides common utility functions

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use which::which;

/// Make a `path` absolute with the `base_dir` as prefix
pub fn make_absolute<B, T>(base_dir: B, path: T) -> PathBuf
where
    B: AsRef<Path>,
    T: AsRef<Path>,
{
    let (base_dir, path) = (base_dir.as_ref(), path.as_ref());
    if path.is_absolute() {
        path.to_owned()
    } else {
        base_dir.join(path)
    }
}

/// Make a `path` relative to the `base_dir`
pub fn make_relative<B, T>(base_dir: B, path: T) -> PathBuf
where
    B: AsRef<Path>,
    T: AsRef<Path>,
{
    let (base_dir, path) = (base_dir.as_ref(), path.as_ref());
    path.strip_prefix(base_dir).unwrap_or(path).to_owned()
}

/// The longest common prefix, in bytes, shared by every string in `values`.
///
/// Used by the table assembler (§4.9) to compute a short, relative display name per row from
/// the full set of task file names.
pub fn common_prefix<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut iter = values.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };

    let mut prefix_len = first.len();
    for value in iter {
        let shared = first
            .as_bytes()
            .iter()
            .zip(value.as_bytes())
            .take_while(|(a, b)| a == b)
            .count();
        prefix_len = prefix_len.min(shared);
    }

    // don't split a UTF-8 code point
    while prefix_len > 0 && !first.is_char_boundary(prefix_len) {
        prefix_len -= 1;
    }
    first[..prefix_len].to_owned()
}

/// Merge a list of values sharing a common prefix into `{prefix}{a,b,c}`-style compact display,
/// mirroring how the table header collapses per-host attribute lists.
pub fn merge_entries_with_common_prefixes(values: &[String]) -> Vec<String> {
    if values.len() <= 1 {
        return values.to_vec();
    }
    let prefix = common_prefix(values.iter().map(String::as_str));
    if prefix.is_empty() {
        return values.to_vec();
    }
    let suffixes: Vec<&str> = values.iter().map(|v| &v[prefix.len()..]).collect();
    vec![format!("{prefix}{{{}}}", suffixes.join(","))]
}

/// Expands one positional glob or literal path to the concrete files it names. A pattern that is
/// itself an existing file short-circuits glob expansion entirely, so literal filenames containing
/// glob metacharacters (rare, but seen in SV-COMP task names) still resolve. Shared by the CLI
/// front end (C12, for positional arguments) and the table-definition loader (C11, for `<result
/// filename="...">` globs).
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let literal = Path::new(pattern);
    if literal.is_file() {
        return Ok(vec![literal.to_owned()]);
    }

    let mut matched = Vec::new();
    for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern '{pattern}'"))? {
        match entry {
            Ok(path) if path.is_file() => matched.push(path),
            Ok(_) => {}
            Err(error) => warn!("Error resolving glob entry for '{pattern}': {error}"),
        }
    }
    Ok(matched)
}

/// Try to resolve the absolute path of a binary from the `PATH`.
pub fn resolve_binary_path(binary: &str) -> Result<PathBuf> {
    match which(binary) {
        Ok(path) => {
            debug!("Found '{binary}': '{}'", path.display());
            Ok(path)
        }
        Err(error) => Err(
            anyhow! {"{error}: '{binary}' could not be found. Is '{binary}' installed, executable and in the PATH?"},
        ),
    }
}

/// Truncate a utf-8 [`std::str`] to a given `len`, never splitting a code point.
pub fn truncate_str_utf8(string: &str, len: usize) -> &str {
    if let Some((pos, c)) = string
        .char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= len)
        .last()
    {
        &string[..pos + c.len_utf8()]
    } else {
        &string[..0]
    }
}

/// Dump all data to `stderr`
pub fn write_all_to_stderr(bytes: &[u8]) {
    if !bytes.is_empty() {
        let stderr = io::stderr();
        let stderr = stderr.lock();
        let mut writer = BufWriter::new(stderr);
        writer
            .write_all(bytes)
            .and_then(|()| writer.flush())
            .unwrap();
        if !bytes.last().is_some_and(|l| *l == b'\n') {
            eprintln!();
        }
    }
}

/// Dump all data to `stdout`
pub fn write_all_to_stdout(bytes: &[u8]) {
    if !bytes.is_empty() {
        let stdout = io::stdout();
        let stdout = stdout.lock();
        let mut writer = BufWriter::new(stdout);
        writer
            .write_all(bytes)
            .and_then(|()| writer.flush())
            .unwrap();
        if !bytes.last().is_some_and(|l| *l == b'\n') {
            println!();
        }
    }
}
