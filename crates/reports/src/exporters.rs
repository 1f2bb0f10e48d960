//! Report exporters - CSV, JSON, Markdown
//!
//! This module provides different export formats for operator reports.

/// Trait for exporting reports to different formats
pub trait ReportExporter {
    /// Export to the target format
    fn export(&self, report: &dyn ReportData) -> String;

    /// Get the file extension for this format
    fn extension(&self) -> &'static str;

    /// Get the MIME type for this format
    fn mime_type(&self) -> &'static str;
}

/// Trait for data that can be exported
pub trait ReportData {
    /// Get the report title
    fn title(&self) -> &str;

    /// Get column headers
    fn headers(&self) -> Vec<String>;

    /// Get data rows
    fn rows(&self) -> Vec<Vec<String>>;

    /// Get summary statistics as key-value pairs
    fn summary(&self) -> Vec<(String, String)>;
}

// ============================================================================
// CSV Exporter
// ============================================================================

/// CSV format exporter
pub struct CsvExporter {
    delimiter: char,
    include_header: bool,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self {
            delimiter: ',',
            include_header: true,
        }
    }
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn without_header(mut self) -> Self {
        self.include_header = false;
        self
    }

    fn escape_csv_field(&self, field: &str) -> String {
        if field.contains(self.delimiter) || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }
}

impl ReportExporter for CsvExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let mut output = String::new();

        if self.include_header {
            let headers: Vec<String> = report
                .headers()
                .iter()
                .map(|h| self.escape_csv_field(h))
                .collect();
            output.push_str(&headers.join(&self.delimiter.to_string()));
            output.push('\n');
        }

        for row in report.rows() {
            let escaped: Vec<String> = row
                .iter()
                .map(|field| self.escape_csv_field(field))
                .collect();
            output.push_str(&escaped.join(&self.delimiter.to_string()));
            output.push('\n');
        }

        output
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> &'static str {
        "text/csv"
    }
}

// ============================================================================
// JSON Exporter
// ============================================================================

/// JSON format exporter
pub struct JsonExporter {
    pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }
}

impl ReportExporter for JsonExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let headers = report.headers();
        let rows = report.rows();
        let summary = report.summary();

        let json_rows: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                for (i, header) in headers.iter().enumerate() {
                    let value = row.get(i).cloned().unwrap_or_default();
                    obj.insert(header.clone(), serde_json::Value::String(value));
                }
                serde_json::Value::Object(obj)
            })
            .collect();

        let summary_obj: serde_json::Map<String, serde_json::Value> = summary
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();

        let output = serde_json::json!({
            "title": report.title(),
            "summary": summary_obj,
            "data": json_rows,
        });

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_default()
        } else {
            serde_json::to_string(&output).unwrap_or_default()
        }
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn mime_type(&self) -> &'static str {
        "application/json"
    }
}

// ============================================================================
// Markdown Exporter
// ============================================================================

/// Markdown format exporter
pub struct MarkdownExporter {
    include_summary: bool,
}

impl Default for MarkdownExporter {
    fn default() -> Self {
        Self {
            include_summary: true,
        }
    }
}

impl MarkdownExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_summary(mut self) -> Self {
        self.include_summary = false;
        self
    }
}

impl ReportExporter for MarkdownExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {}\n\n", report.title()));

        if self.include_summary {
            output.push_str("## Summary\n\n");
            for (key, value) in report.summary() {
                output.push_str(&format!("- **{}**: {}\n", key, value));
            }
            output.push('\n');
        }

        output.push_str("## Data\n\n");

        let headers = report.headers();
        output.push_str(&format!("| {} |\n", headers.join(" | ")));
        output.push_str(&format!(
            "|{}|\n",
            headers.iter().map(|_| "---").collect::<Vec<_>>().join("|")
        ));
        for row in report.rows() {
            output.push_str(&format!("| {} |\n", row.join(" | ")));
        }

        output
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    fn mime_type(&self) -> &'static str {
        "text/markdown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture;

    impl ReportData for Fixture {
        fn title(&self) -> &str {
            "Fixture"
        }
        fn headers(&self) -> Vec<String> {
            vec!["id".into(), "note".into()]
        }
        fn rows(&self) -> Vec<Vec<String>> {
            vec![vec!["1".into(), "has, comma".into()]]
        }
        fn summary(&self) -> Vec<(String, String)> {
            vec![("total".into(), "1".into())]
        }
    }

    #[test]
    fn test_csv_escapes_delimiter() {
        let out = CsvExporter::new().export(&Fixture);
        assert!(out.starts_with("id,note\n"));
        assert!(out.contains("\"has, comma\""));
    }

    #[test]
    fn test_json_structure() {
        let out = JsonExporter::new().compact().export(&Fixture);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["title"], "Fixture");
        assert_eq!(value["summary"]["total"], "1");
        assert_eq!(value["data"][0]["id"], "1");
    }

    #[test]
    fn test_markdown_table() {
        let out = MarkdownExporter::new().export(&Fixture);
        assert!(out.contains("# Fixture"));
        assert!(out.contains("| id | note |"));
        assert!(out.contains("- **total**: 1"));
    }
}
