//! Text extraction from uploaded documents.
//!
//! Dispatch is on the media type the browser declared for the upload, never
//! on the bytes themselves. Extraction is best effort: [`extract_text`] and
//! [`preview::preview`] always return a string, turning parser failures into
//! a diagnostic the page shows in place of the text.
//!
//! | Declared type                          | Kind                        |
//! |----------------------------------------|-----------------------------|
//! | `application/pdf`                      | [`DocumentKind::Pdf`]       |
//! | `…wordprocessingml.document`           | [`DocumentKind::Word`]      |
//! | contains `csv`                         | [`DocumentKind::Csv`]       |
//! | contains `excel` or `spreadsheetml`    | [`DocumentKind::Spreadsheet`] |
//! | `text/plain`                           | [`DocumentKind::Text`]      |
//!
//! Formats backed by optional crates disappear from the table when their
//! cargo feature is off.

#[cfg(feature = "format-docx")]
mod docx;
#[cfg(feature = "format-pdf")]
mod pdf;
pub mod preview;
pub mod table;
#[cfg(feature = "format-spreadsheet")]
mod xlsx;

use thiserror::Error;
use tracing::{debug, warn};

/// Returned for media types no extractor handles.
pub const UNSUPPORTED: &str = "Unsupported file type!";

const WORD_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("pdf: {0}")]
    Pdf(String),
    #[error("docx: {0}")]
    Word(String),
    #[error("table: {0}")]
    Table(String),
    #[error("text is not valid UTF-8: {0}")]
    Text(#[from] std::string::FromUtf8Error),
}

/// Formats with an extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Word,
    Csv,
    Spreadsheet,
    Text,
}

impl DocumentKind {
    /// Classify a declared media type. Parameters (`; charset=…`) and case
    /// are ignored.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/pdf" if cfg!(feature = "format-pdf") => Some(Self::Pdf),
            WORD_MEDIA_TYPE if cfg!(feature = "format-docx") => Some(Self::Word),
            t if t.contains("csv") => Some(Self::Csv),
            t if (t.contains("excel") || t.contains("spreadsheetml"))
                && cfg!(feature = "format-spreadsheet") =>
            {
                Some(Self::Spreadsheet)
            }
            "text/plain" => Some(Self::Text),
            _ => None,
        }
    }
}

/// A file attached to a session. Kept as raw bytes and re-extracted on every
/// submission.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::from_media_type(&self.media_type)
    }

    pub fn extract_text(&self) -> String {
        extract_text(&self.bytes, &self.media_type)
    }
}

/// Extract the text of a document, or a diagnostic string if that fails.
pub fn extract_text(bytes: &[u8], media_type: &str) -> String {
    let Some(kind) = DocumentKind::from_media_type(media_type) else {
        debug!(%media_type, "no extractor for media type");
        return UNSUPPORTED.to_string();
    };

    match extract(bytes, kind) {
        Ok(text) => {
            debug!(?kind, bytes = bytes.len(), chars = text.chars().count(), "document text extracted");
            text
        }
        Err(e) => {
            warn!(?kind, error = %e, "document extraction failed");
            format!("Error extracting text: {e}")
        }
    }
}

fn extract(bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractError> {
    match kind {
        #[cfg(feature = "format-pdf")]
        DocumentKind::Pdf => pdf::extract(bytes),
        #[cfg(feature = "format-docx")]
        DocumentKind::Word => docx::extract(bytes),
        DocumentKind::Csv => Ok(table::Table::from_csv(bytes)?.to_text()),
        #[cfg(feature = "format-spreadsheet")]
        DocumentKind::Spreadsheet => Ok(table::Table::from_spreadsheet(bytes)?.to_text()),
        DocumentKind::Text => Ok(String::from_utf8(bytes.to_vec())?),
        // Only reachable when a format feature is off; `from_media_type`
        // never yields those kinds then.
        #[allow(unreachable_patterns)]
        _ => Ok(UNSUPPORTED.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_declared_types() {
        assert_eq!(DocumentKind::from_media_type("text/plain"), Some(DocumentKind::Text));
        assert_eq!(DocumentKind::from_media_type("text/plain; charset=utf-8"), Some(DocumentKind::Text));
        assert_eq!(DocumentKind::from_media_type("text/csv"), Some(DocumentKind::Csv));
        assert_eq!(DocumentKind::from_media_type("application/CSV"), Some(DocumentKind::Csv));
        assert_eq!(DocumentKind::from_media_type("image/png"), None);
        assert_eq!(DocumentKind::from_media_type(""), None);
    }

    #[cfg(all(feature = "format-pdf", feature = "format-docx", feature = "format-spreadsheet"))]
    #[test]
    fn classifies_feature_backed_types() {
        assert_eq!(DocumentKind::from_media_type("application/pdf"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_media_type(WORD_MEDIA_TYPE), Some(DocumentKind::Word));
        assert_eq!(
            DocumentKind::from_media_type("application/vnd.ms-excel"),
            Some(DocumentKind::Spreadsheet)
        );
        assert_eq!(
            DocumentKind::from_media_type(
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            ),
            Some(DocumentKind::Spreadsheet)
        );
    }

    #[test]
    fn plain_text_is_decoded() {
        assert_eq!(extract_text("héllo\nworld".as_bytes(), "text/plain"), "héllo\nworld");
    }

    #[test]
    fn invalid_utf8_becomes_diagnostic() {
        let text = extract_text(&[0x66, 0x6f, 0xff, 0xfe], "text/plain");
        assert!(text.starts_with("Error extracting text:"));
        assert!(text.contains("UTF-8"));
    }

    #[test]
    fn unknown_type_is_unsupported() {
        assert_eq!(extract_text(b"GIF89a", "image/gif"), UNSUPPORTED);
    }

    #[test]
    fn dispatch_ignores_content() {
        // CSV bytes declared as plain text come back verbatim.
        assert_eq!(extract_text(b"a,b\n1,2\n", "text/plain"), "a,b\n1,2\n");
    }

    #[test]
    fn csv_is_rendered_as_table() {
        let text = extract_text(b"name,age\nAnn,31\nBo,7\n", "text/csv");
        assert_eq!(text, "   name  age\n0   Ann   31\n1    Bo    7");
    }

    #[cfg(feature = "format-spreadsheet")]
    #[test]
    fn xlsx_is_rendered_as_table() {
        let text = extract_text(
            &xlsx::tests::people_xlsx(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        );
        assert_eq!(text, "   name  age\n0   Ann   31\n1    Bo    7");
    }

    #[cfg(feature = "format-pdf")]
    #[test]
    fn corrupt_pdf_becomes_diagnostic() {
        let text = extract_text(b"%PDF-1.4 not really", "application/pdf");
        assert!(text.starts_with("Error extracting text: pdf:"));
    }

    #[test]
    fn uploaded_document_delegates() {
        let doc = UploadedDocument {
            name: "notes.txt".into(),
            media_type: "text/plain".into(),
            bytes: b"remember the milk".to_vec(),
        };
        assert_eq!(doc.kind(), Some(DocumentKind::Text));
        assert_eq!(doc.extract_text(), "remember the milk");
    }
}
