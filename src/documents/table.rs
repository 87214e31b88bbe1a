//! Tabular documents (CSV, .xlsx) and their text/HTML renderings.

use super::ExtractError;

/// A header row plus records. Records may be shorter or longer than the
/// header; missing cells render empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Parse CSV with the first record as the header row.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, ExtractError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| ExtractError::Table(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ExtractError::Table(e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Parse the first worksheet of an .xlsx workbook, first row as the
    /// header row.
    #[cfg(feature = "format-spreadsheet")]
    pub fn from_spreadsheet(bytes: &[u8]) -> Result<Self, ExtractError> {
        let mut rows = super::xlsx::first_sheet(bytes)?.into_iter();
        let headers = rows.next().unwrap_or_default();
        Ok(Self { headers, rows: rows.collect() })
    }

    fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    fn cell(row: &[String], col: usize) -> &str {
        row.get(col).map(String::as_str).unwrap_or("")
    }

    /// Render the whole table as right-aligned text columns, each record
    /// prefixed with its zero-based index.
    pub fn to_text(&self) -> String {
        if self.rows.is_empty() {
            return format!("Empty table\nColumns: {}", self.headers.join(", "));
        }

        let columns = self.column_count();
        let index_width = (self.rows.len() - 1).to_string().len();
        let widths: Vec<usize> = (0..columns)
            .map(|col| {
                self.rows
                    .iter()
                    .map(|row| Self::cell(row, col).chars().count())
                    .chain(std::iter::once(Self::cell(&self.headers, col).chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let render = |index: &str, row: &[String]| {
            let mut line = format!("{index:>index_width$}");
            for (col, &width) in widths.iter().enumerate() {
                line.push_str(&format!("  {:>width$}", Self::cell(row, col)));
            }
            line
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(render("", &self.headers));
        for (i, row) in self.rows.iter().enumerate() {
            lines.push(render(&i.to_string(), row));
        }
        lines.join("\n")
    }

    /// The first `n` records as an HTML table. All cell text is escaped.
    pub fn head_html(&self, n: usize) -> String {
        let columns = self.column_count();
        let mut html = String::from("<table class=\"preview-table\">\n<thead><tr><th></th>");
        for col in 0..columns {
            html.push_str(&format!("<th>{}</th>", escape_html(Self::cell(&self.headers, col))));
        }
        html.push_str("</tr></thead>\n<tbody>\n");
        for (i, row) in self.rows.iter().take(n).enumerate() {
            html.push_str(&format!("<tr><th>{i}</th>"));
            for col in 0..columns {
                html.push_str(&format!("<td>{}</td>", escape_html(Self::cell(row, col))));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>");
        html
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
