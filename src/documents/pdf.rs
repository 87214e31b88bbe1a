//! PDF text via lopdf: every page's text, in page order, joined by newlines.

use lopdf::Document;

use super::ExtractError;

pub(super) fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let mut pages = Vec::new();
    // `get_pages` is keyed by 1-based page number, so iteration is page order.
    for page_number in doc.get_pages().into_keys() {
        let text = doc
            .extract_text(&[page_number])
            .map_err(|e| ExtractError::Pdf(format!("page {page_number}: {e}")))?;
        pages.push(text);
    }
    Ok(pages.join("\n"))
}
