//! Table-definition loader (C11, spec §4.11)
//!
//! Parses an XML document rooted at `<table>`: `<column>` declarations (at the root, or nested
//! inside `<result>`/`<union>`) become column overrides; `<result>` children name a run-set
//! filename glob; `<union>` children aggregate several `<result>`s into one synthetic run set.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::aggregator::column::Column;
use crate::error::Error;

fn attr_value(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())
        .map(|a| a.unescape_value().unwrap_or_default().into_owned())
}

fn parse_bool(raw: Option<&str>) -> bool {
    matches!(raw, Some("true") | Some("1"))
}

/// The owned attributes of a `<column>` tag, captured up front since its (optional) text
/// content, if any, only arrives in a later event.
#[derive(Debug, Clone, Default)]
struct PendingColumn {
    title: Option<String>,
    number_of_digits: Option<String>,
    href: Option<String>,
    display_unit: Option<String>,
    source_unit: Option<String>,
    scale_factor: Option<String>,
    relevant_for_diff: Option<String>,
    display_title: Option<String>,
    hidden: Option<String>,
}

impl PendingColumn {
    fn from_tag(e: &BytesStart) -> Self {
        Self {
            title: attr_value(e, "title"),
            number_of_digits: attr_value(e, "numberOfDigits"),
            href: attr_value(e, "href"),
            display_unit: attr_value(e, "displayUnit"),
            source_unit: attr_value(e, "sourceUnit"),
            scale_factor: attr_value(e, "scaleFactor"),
            relevant_for_diff: attr_value(e, "relevantForDiff"),
            display_title: attr_value(e, "displayTitle"),
            hidden: attr_value(e, "hidden"),
        }
    }

    fn finish(self, pattern: Option<String>, definition_dir: &Path) -> Column {
        let mut column = Column::new(self.title.unwrap_or_default());
        column.pattern = pattern;
        column.number_of_significant_digits = self.number_of_digits.and_then(|v| v.parse().ok());
        column.href = self.href.map(|href| resolve_href(definition_dir, &href));
        column.display_unit = self.display_unit;
        column.source_unit = self.source_unit;
        column.scale_factor = self.scale_factor.and_then(|v| v.parse().ok());
        column.relevant_for_diff = parse_bool(self.relevant_for_diff.as_deref());
        column.display_title = self.display_title;
        column.hidden = parse_bool(self.hidden.as_deref());
        column
    }
}

/// Resolves a `href` relative to the definition file's directory, unless it is already absolute.
fn resolve_href(definition_dir: &Path, href: &str) -> String {
    let path = Path::new(href);
    if path.is_absolute() {
        href.to_owned()
    } else {
        definition_dir.join(path).to_string_lossy().into_owned()
    }
}

/// One `<result>` entry: a filename glob loaded with the enclosing columns as override.
#[derive(Debug, Clone)]
pub struct ResultEntry {
    pub glob: String,
    pub columns: Vec<Column>,
}

/// One `<union>` entry: several `<result>` children merged into a single synthetic run set.
#[derive(Debug, Clone)]
pub struct UnionEntry {
    pub name: Option<String>,
    pub results: Vec<ResultEntry>,
}

/// The fully parsed contents of a table-definition document.
#[derive(Debug, Clone, Default)]
pub struct TableDefinition {
    pub results: Vec<ResultEntry>,
    pub unions: Vec<UnionEntry>,
}

enum Frame {
    Result { glob: String, columns: Vec<Column> },
    Union { name: Option<String>, results: Vec<ResultEntry> },
}

/// Parses a table-definition file from disk (§4.11).
pub fn load_table_definition(path: &Path) -> Result<TableDefinition> {
    let bytes = std::fs::read(path).with_context(|| format!("reading '{}'", path.display()))?;
    let definition_dir: PathBuf = path.parent().unwrap_or_else(|| Path::new(".")).to_owned();
    parse_table_definition(&bytes, &definition_dir)
        .map_err(|error| Error::InvalidTableDefinition(path.to_owned(), error.to_string()).into())
}

struct Parser<'a> {
    definition_dir: &'a Path,
    saw_root: bool,
    root_columns: Vec<Column>,
    definition: TableDefinition,
    stack: Vec<Frame>,
    pending_column: Option<PendingColumn>,
    pending_text: Option<String>,
}

impl<'a> Parser<'a> {
    fn new(definition_dir: &'a Path) -> Self {
        Self {
            definition_dir,
            saw_root: false,
            root_columns: Vec::new(),
            definition: TableDefinition::default(),
            stack: Vec::new(),
            pending_column: None,
            pending_text: None,
        }
    }

    fn start_or_empty(&mut self, e: &BytesStart, self_closing: bool) {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        match name.as_str() {
            "table" => self.saw_root = true,
            "column" => {
                self.pending_column = Some(PendingColumn::from_tag(e));
                self.pending_text = None;
                if self_closing {
                    self.finish_column();
                }
            }
            "result" => {
                let glob = attr_value(e, "filename").unwrap_or_default();
                self.stack.push(Frame::Result { glob, columns: Vec::new() });
                if self_closing {
                    self.finish_result();
                }
            }
            "union" => {
                let name = attr_value(e, "title").or_else(|| attr_value(e, "name"));
                self.stack.push(Frame::Union { name, results: Vec::new() });
                if self_closing {
                    self.finish_union();
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, value: String) {
        if self.pending_column.is_some() {
            self.pending_text = Some(value);
        }
    }

    fn end(&mut self, name: &str) {
        match name {
            "column" => self.finish_column(),
            "result" => self.finish_result(),
            "union" => self.finish_union(),
            _ => {}
        }
    }

    fn finish_column(&mut self) {
        let Some(pending) = self.pending_column.take() else {
            return;
        };
        let pattern = self.pending_text.take().filter(|t| !t.trim().is_empty());
        let column = pending.finish(pattern, self.definition_dir);
        match self.stack.last_mut() {
            Some(Frame::Result { columns, .. }) => columns.push(column),
            _ => self.root_columns.push(column),
        }
    }

    fn finish_result(&mut self) {
        let Some(Frame::Result { glob, columns }) = ({
            if matches!(self.stack.last(), Some(Frame::Result { .. })) {
                self.stack.pop()
            } else {
                None
            }
        }) else {
            return;
        };
        let mut merged = self.root_columns.clone();
        merged.extend(columns);
        let entry = ResultEntry { glob, columns: merged };
        match self.stack.last_mut() {
            Some(Frame::Union { results, .. }) => results.push(entry),
            _ => self.definition.results.push(entry),
        }
    }

    fn finish_union(&mut self) {
        let Some(Frame::Union { name, results }) = ({
            if matches!(self.stack.last(), Some(Frame::Union { .. })) {
                self.stack.pop()
            } else {
                None
            }
        }) else {
            return;
        };
        if results.is_empty() {
            warn!(
                "Empty <union>{} in table definition; dropping it",
                name.as_deref().map(|n| format!(" '{n}'")).unwrap_or_default()
            );
        } else {
            self.definition.unions.push(UnionEntry { name, results });
        }
    }
}

fn parse_table_definition(bytes: &[u8], definition_dir: &Path) -> anyhow::Result<TableDefinition> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut parser = Parser::new(definition_dir);

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => parser.start_or_empty(&e, false),
            Event::Empty(e) => parser.start_or_empty(&e, true),
            Event::Text(text) => parser.text(text.unescape()?.into_owned()),
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                parser.end(&name);
            }
            _ => {}
        }
        buf.clear();
    }

    if !parser.saw_root {
        anyhow::bail!("missing <table> root element");
    }

    Ok(parser.definition)
}
