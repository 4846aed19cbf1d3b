//! Table renderers (C13, spec §4.13)
//!
//! Two output formats share one input, [`AssembledTable`]: a CSV writer grounded in the `csv`
//! crate's `Writer`/`StringRecord` pattern, and a minimal built-in HTML renderer driven by
//! `minijinja`, matching how the teacher keeps template strings inline rather than in a
//! `templates/` directory when there is only one of them.

use std::io::Write;

use minijinja::{context, Environment};

use crate::aggregator::stats::StatsRow;
use crate::aggregator::table::{AssembledTable, RelevantIdColumns, TableRow};
use crate::error::Error;

/// Writes `table` as CSV to `writer`: one id column per [`RelevantIdColumns`] slot that is
/// relevant, then one column per `(run set, column)` pair, header row first, then one data row
/// per [`TableRow`] and one per footer [`StatsRow`].
pub fn render_csv<W: Write>(table: &AssembledTable, writer: W) -> Result<(), Error> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);

    let mut header = id_header(table.relevant_id_columns);
    for runset in &table.header.runsets {
        for title in &runset.column_titles {
            header.push(format!("{} ({})", title, runset.nice_name));
        }
    }
    csv_writer
        .write_record(&header)
        .map_err(|e| Error::OutputError("csv".to_owned(), e.to_string()))?;

    for row in &table.rows {
        csv_writer
            .write_record(csv_data_row(table.relevant_id_columns, row))
            .map_err(|e| Error::OutputError("csv".to_owned(), e.to_string()))?;
    }

    for footer_kind in &table.footer {
        for stats_row in footer_kind {
            csv_writer
                .write_record(csv_stats_row(table.relevant_id_columns, stats_row))
                .map_err(|e| Error::OutputError("csv".to_owned(), e.to_string()))?;
        }
    }

    csv_writer
        .flush()
        .map_err(|e| Error::OutputError("csv".to_owned(), e.to_string()))
}

fn id_header(relevant: RelevantIdColumns) -> Vec<String> {
    let mut header = Vec::new();
    if relevant.filename {
        header.push("filename".to_owned());
    }
    if relevant.properties {
        header.push("properties".to_owned());
    }
    if relevant.runset {
        header.push("runset".to_owned());
    }
    header
}

fn csv_data_row(relevant: RelevantIdColumns, row: &TableRow) -> Vec<String> {
    let mut record = Vec::new();
    if relevant.filename {
        record.push(row.short_filename.clone());
    }
    if relevant.properties {
        record.push(row.properties.clone());
    }
    if relevant.runset {
        record.push(row.runset.clone().unwrap_or_default());
    }
    for runset_cells in &row.cells {
        for cell in runset_cells {
            record.push(cell.clone().unwrap_or_default());
        }
    }
    record
}

fn csv_stats_row(relevant: RelevantIdColumns, stats_row: &StatsRow) -> Vec<String> {
    let mut record = Vec::new();
    if relevant.filename {
        record.push(stats_row.kind.label().to_owned());
    }
    if relevant.properties {
        record.push(String::new());
    }
    if relevant.runset {
        record.push(String::new());
    }
    for cell in &stats_row.cells {
        record.push(cell.as_ref().map(|v| v.sum.to_string()).unwrap_or_default());
    }
    record
}

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{{ title }}</title></head>
<body>
<h1>{{ title }}</h1>
<table border="1">
<thead>
<tr>
{%- if relevant.filename %}<th>filename</th>{% endif -%}
{%- if relevant.properties %}<th>properties</th>{% endif -%}
{%- if relevant.runset %}<th>runset</th>{% endif -%}
{%- for runset in header.runsets -%}
  {%- for title in runset.column_titles -%}
  <th>{{ title }} ({{ runset.nice_name }})</th>
  {%- endfor -%}
{%- endfor %}
</tr>
</thead>
<tbody>
{%- for row in rows %}
<tr>
{%- if relevant.filename %}<td>{{ row.short_filename }}</td>{% endif -%}
{%- if relevant.properties %}<td>{{ row.properties }}</td>{% endif -%}
{%- if relevant.runset %}<td>{{ row.runset_label }}</td>{% endif -%}
{%- for cell in row.flat_cells -%}
<td>{{ cell }}</td>
{%- endfor %}
</tr>
{%- endfor %}
{%- for footer_kind in footer -%}
  {%- for stats_row in footer_kind %}
<tr class="stats">
{%- if relevant.filename %}<td>{{ stats_row.label }}</td>{% endif -%}
{%- if relevant.properties %}<td></td>{% endif -%}
{%- if relevant.runset %}<td></td>{% endif -%}
{%- for cell in stats_row.cells -%}
<td>{{ cell }}</td>
{%- endfor %}
</tr>
  {%- endfor -%}
{%- endfor %}
</tbody>
</table>
</body>
</html>
"#;

/// Renders `table` to a self-contained HTML document, returned as a `String`.
pub fn render_html(table: &AssembledTable, title: &str) -> Result<String, Error> {
    let mut env = Environment::new();
    env.add_template("table", HTML_TEMPLATE)
        .map_err(|e| Error::OutputError("html".to_owned(), e.to_string()))?;
    let template = env
        .get_template("table")
        .map_err(|e| Error::OutputError("html".to_owned(), e.to_string()))?;

    let rows: Vec<_> = table
        .rows
        .iter()
        .map(|row| {
            context! {
                short_filename => row.short_filename,
                properties => row.properties,
                runset_label => row.runset.clone().unwrap_or_default(),
                flat_cells => row.cells.iter().flatten().map(|c| c.clone().unwrap_or_default()).collect::<Vec<_>>(),
            }
        })
        .collect();

    let footer: Vec<Vec<_>> = table
        .footer
        .iter()
        .map(|kind_rows| {
            kind_rows
                .iter()
                .map(|stats_row| {
                    context! {
                        label => stats_row.kind.label(),
                        cells => stats_row
                            .cells
                            .iter()
                            .map(|c| c.as_ref().map(|v| v.sum.to_string()).unwrap_or_default())
                            .collect::<Vec<_>>(),
                    }
                })
                .collect()
        })
        .collect();

    template
        .render(context! {
            title => title,
            relevant => context! {
                filename => table.relevant_id_columns.filename,
                properties => table.relevant_id_columns.properties,
                runset => table.relevant_id_columns.runset,
            },
            header => context! {
                runsets => table.header.runsets.iter().map(|r| context! {
                    nice_name => r.nice_name,
                    column_titles => r.column_titles,
                }).collect::<Vec<_>>(),
            },
            rows => rows,
            footer => footer,
        })
        .map_err(|e| Error::OutputError("html".to_owned(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use crate::aggregator::stats::{StatRowKind, StatsRow};
    use crate::aggregator::table::{RunSetHeader, TableHeader, TableKind};
    use crate::decimal::StatValue;

    use super::*;

    fn sample_table() -> AssembledTable {
        AssembledTable {
            kind: TableKind::Table,
            header: TableHeader {
                runsets: vec![RunSetHeader {
                    nice_name: "tool-a".to_owned(),
                    tool_version: "tool-a 1.0".to_owned(),
                    timelimit: None,
                    memlimit: None,
                    host: None,
                    os: None,
                    cpu: None,
                    cores: None,
                    freq: None,
                    turbo: None,
                    ram: None,
                    date: None,
                    options: None,
                    column_titles: vec!["status".to_owned()],
                }],
                host_merged: Vec::new(),
            },
            relevant_id_columns: RelevantIdColumns {
                filename: true,
                properties: false,
                runset: false,
            },
            rows: vec![TableRow {
                short_filename: "foo.c".to_owned(),
                properties: String::new(),
                runset: None,
                cells: vec![vec![Some("TRUE".to_owned())]],
            }],
            footer: vec![vec![StatsRow {
                kind: StatRowKind::Total,
                cells: vec![Some(StatValue::count(1))],
            }]],
        }
    }

    #[test]
    fn csv_render_includes_header_data_and_footer_rows() {
        let table = sample_table();
        let mut buffer = Vec::new();
        render_csv(&table, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("filename"));
        assert!(text.contains("foo.c"));
        assert!(text.contains("total"));
    }

    #[test]
    fn html_render_embeds_row_values() {
        let table = sample_table();
        let html = render_html(&table, "bench").unwrap();
        assert!(html.contains("foo.c"));
        assert!(html.contains("TRUE"));
        assert!(html.contains("bench"));
    }
}
