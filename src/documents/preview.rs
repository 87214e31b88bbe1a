//! Short previews shown under the upload box.

use serde::Serialize;

use super::table::Table;
use super::{DocumentKind, ExtractError};

const TEXT_PREVIEW_CHARS: usize = 1000;
const TABLE_PREVIEW_ROWS: usize = 5;

/// What the page renders in the preview expander. `Html` content is
/// already escaped and safe to insert as markup; `Text` is shown verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", content = "content", rename_all = "snake_case")]
pub enum Preview {
    Text(String),
    Html(String),
}

impl Preview {
    pub fn content(&self) -> &str {
        match self {
            Preview::Text(s) | Preview::Html(s) => s,
        }
    }
}

pub fn preview(bytes: &[u8], media_type: &str) -> Preview {
    match build(bytes, DocumentKind::from_media_type(media_type)) {
        Ok(p) => p,
        Err(e) => Preview::Text(format!("Error generating preview: {e}")),
    }
}

fn build(bytes: &[u8], kind: Option<DocumentKind>) -> Result<Preview, ExtractError> {
    Ok(match kind {
        Some(DocumentKind::Pdf) => Preview::Text("PDF Document Preview".into()),
        Some(DocumentKind::Text) => {
            let text = String::from_utf8(bytes.to_vec())?;
            let head: String = text.chars().take(TEXT_PREVIEW_CHARS).collect();
            Preview::Text(format!("{head}..."))
        }
        Some(DocumentKind::Csv) => Preview::Html(Table::from_csv(bytes)?.head_html(TABLE_PREVIEW_ROWS)),
        #[cfg(feature = "format-spreadsheet")]
        Some(DocumentKind::Spreadsheet) => {
            Preview::Html(Table::from_spreadsheet(bytes)?.head_html(TABLE_PREVIEW_ROWS))
        }
        _ => Preview::Text("Preview not available for this file type".into()),
    })
}
