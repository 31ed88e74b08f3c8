use std::{
    io::Write,
    path::{Path, PathBuf},
};

use serde_json::{Value, json};

use crate::{
    error::{Result, SnapshotError},
    model::TIMESTAMP_FORMAT,
    table::OutputTable,
};

use super::write_atomically;

/// The page is regenerated in place on every run.
pub const HTML_FILE_NAME: &str = "index.html";

const TEMPLATE: &str = include_str!("../../templates/index.html");
const PLACEHOLDERS: &[&str] = &["TITLE", "GENERATED", "DATA"];

/// Renders the table into the bundled page. Missing values become `null`.
pub fn render_html(table: &OutputTable, title: &str, generated: &str) -> Result<String> {
    render_with(TEMPLATE, table, title, generated)
}

pub fn write_html_file(
    table: &OutputTable,
    outdir: &Path,
    title: &str,
    generated: &str,
) -> Result<PathBuf> {
    let page = render_html(table, title, generated)?;
    let path = outdir.join(HTML_FILE_NAME);
    write_atomically(&path, |out| {
        out.write_all(page.as_bytes())
            .map_err(|e| SnapshotError::emission(&path, e))
    })?;
    Ok(path)
}

fn render_with(template: &str, table: &OutputTable, title: &str, generated: &str) -> Result<String> {
    if let Some(missing) = PLACEHOLDERS
        .iter()
        .find(|key| !template.contains(&format!("{{{{{key}}}}}")))
    {
        return Err(SnapshotError::Template {
            what: "html",
            reason: format!("template has no {{{{{missing}}}}} placeholder"),
        });
    }

    let data = page_data(table)?;
    let title = escape_html(title);
    let generated = escape_html(generated);

    fill(template, |key| match key {
        "TITLE" => Some(title.as_str()),
        "GENERATED" => Some(generated.as_str()),
        "DATA" => Some(data.as_str()),
        _ => None,
    })
}

/// `{ "columns": [...], "rows": [[time, v | null, ...], ...] }`, safe to
/// inline in a `<script>` element.
fn page_data(table: &OutputTable) -> Result<String> {
    let rows: Vec<Vec<Value>> = table
        .rows()
        .iter()
        .map(|row| {
            std::iter::once(json!(row.time.format(TIMESTAMP_FORMAT).to_string()))
                .chain(row.values.iter().map(|v| json!(v)))
                .collect()
        })
        .collect();

    let data = json!({ "columns": table.header(), "rows": rows });
    let text = serde_json::to_string(&data).map_err(|e| SnapshotError::Template {
        what: "html data",
        reason: e.to_string(),
    })?;

    Ok(text
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

/// Single-pass `{{KEY}}` substitution so inserted values are never rescanned.
fn fill<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| SnapshotError::Template {
            what: "html",
            reason: "unterminated placeholder".to_string(),
        })?;

        let key = &after[..end];
        match lookup(key) {
            Some(value) => out.push_str(value),
            None => {
                // Not ours, e.g. a literal in the page script.
                out.push_str("{{");
                out.push_str(key);
                out.push_str("}}");
            }
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForecastResponse, Sample, parse_timestamp};
    use crate::table::TableBuilder;

    fn table() -> OutputTable {
        let t0 = parse_timestamp("2026-10-16T00:00").unwrap();
        let t1 = parse_timestamp("2026-10-16T00:15").unwrap();
        let mut response = ForecastResponse::new();
        response.insert(
            "wind_speed_10m",
            vec![
                Sample { time: t0, value: Some(7.5) },
                Sample { time: t1, value: None },
            ],
        );
        TableBuilder::new(["wind_speed_10m"]).build(&response)
    }

    #[test]
    fn page_embeds_rows_with_null_sentinel() {
        let page = render_html(&table(), "Campos basin", "2026-10-16 09:00").unwrap();

        assert!(page.contains("<title>Campos basin</title>"));
        assert!(page.contains("Generated 2026-10-16 09:00"));
        assert!(page.contains(r#""columns":["time","wind_speed_10m"]"#));
        assert!(page.contains(r#"["2026-10-16T00:00",7.5]"#));
        assert!(page.contains(r#"["2026-10-16T00:15",null]"#));
        assert!(!page.contains("{{DATA}}"));
    }

    #[test]
    fn title_is_escaped() {
        let page = render_html(&table(), "<b>buoy & co</b>", "now").unwrap();
        assert!(page.contains("&lt;b&gt;buoy &amp; co&lt;/b&gt;"));
    }

    #[test]
    fn inserted_values_are_not_rescanned() {
        let page = render_html(&table(), "{{DATA}}", "now").unwrap();
        assert!(page.contains("<title>{{DATA}}</title>"));
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let err = render_with("<html>{{TITLE}} {{GENERATED}}</html>", &table(), "t", "g")
            .unwrap_err();
        assert!(err.to_string().contains("{{DATA}}"));
    }

    #[test]
    fn script_breakout_is_neutralized() {
        let t0 = parse_timestamp("2026-10-16T00:00").unwrap();
        let mut response = ForecastResponse::new();
        response.insert("</script>", vec![Sample { time: t0, value: Some(1.0) }]);
        let table = TableBuilder::new(Vec::<String>::new()).build(&response);

        let page = render_html(&table, "t", "g").unwrap();
        assert!(page.contains("\\u003c/script\\u003e"));
    }

    #[test]
    fn writes_index_into_outdir() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_html_file(&table(), dir.path(), "t", "g").unwrap();
        assert_eq!(path, dir.path().join(HTML_FILE_NAME));
        assert!(std::fs::read_to_string(path).unwrap().contains("wind_speed_10m"));
    }
}
