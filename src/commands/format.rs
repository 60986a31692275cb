//! Table and document output shared by the commands

use clap::ValueEnum;
use serde::Serialize;

use crate::Result;

/// Output format for structured results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Columnar table
    #[default]
    Table,
    /// JSON
    Json,
    /// YAML
    Yaml,
}

/// Serialize `value` as YAML or pretty JSON.
///
/// `Table` has no generic rendering and falls back to YAML.
pub fn render_document<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml | OutputFormat::Table => Ok(serde_yaml::to_string(value)?),
    }
}

/// Render rows as a column-aligned table under `headers`.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let num_cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(num_cols) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let render_line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:<width$}", cell, width = w)
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render_line(headers.to_vec())];
    for row in rows {
        lines.push(render_line(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}

/// Print rows as a column-aligned table with headers.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", render_table(headers, rows));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_columns_align_to_widest_cell() {
        let rows = vec![
            vec!["Number of Nodes".to_string(), "3".to_string()],
            vec!["Helm Installed".to_string(), "Yes".to_string()],
        ];
        let table = render_table(&["Metric", "Value"], &rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Metric           Value");
        assert_eq!(lines[1], "Number of Nodes  3");
        assert_eq!(lines[2], "Helm Installed   Yes");
    }

    #[test]
    fn empty_table_prints_headers_only() {
        assert_eq!(render_table(&["TYPE", "STATUS"], &[]), "TYPE  STATUS");
    }

    #[test]
    fn documents_render_as_json_or_yaml() {
        #[derive(Serialize)]
        struct Doc {
            name: &'static str,
        }

        let json = render_document(&Doc { name: "my-app" }, OutputFormat::Json).unwrap();
        assert_eq!(json, "{\n  \"name\": \"my-app\"\n}");

        let yaml = render_document(&Doc { name: "my-app" }, OutputFormat::Yaml).unwrap();
        assert_eq!(yaml, "name: my-app\n");
    }
}
