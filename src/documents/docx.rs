//! Word (.docx) text: the paragraphs of `word/document.xml`, one per line.
//!
//! A .docx is a zip archive; the body lives in `word/document.xml` as
//! `<w:p>` paragraphs whose runs carry text in `<w:t>` elements. Tabs and
//! line breaks inside a paragraph are kept as `\t` and `\n`.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::ExtractError;

const DOCUMENT_PART: &str = "word/document.xml";

pub(super) fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Word(e.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractError::Word(format!("{DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Word(format!("{DOCUMENT_PART}: {e}")))?;

    Ok(paragraphs(&xml)?.join("\n"))
}

/// Paragraph texts in document order of their closing tags.
///
/// Paragraphs can nest (a text box inside a run holds its own `<w:p>`), so
/// open paragraphs are kept on a stack; a nested paragraph is emitted on its
/// own and the enclosing one keeps collecting around it.
fn paragraphs(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => open.push(String::new()),
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:p" => out.push(String::new()),
                b"w:tab" => push(&mut open, "\t"),
                b"w:br" | b"w:cr" => push(&mut open, "\n"),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError::Word(format!("{DOCUMENT_PART}: {e}")))?;
                push(&mut open, &text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.extend(open.pop()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::Word(format!(
                    "malformed {DOCUMENT_PART} at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }
    Ok(out)
}

fn push(open: &mut [String], text: &str) {
    if let Some(p) = open.last_mut() {
        p.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use zip::write::SimpleFileOptions;

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Quarterly report</w:t></w:r></w:p>
    <w:p/>
    <w:p>
      <w:r><w:t xml:space="preserve">Revenue &amp; costs </w:t></w:r>
      <w:r><w:tab/><w:t>rose</w:t><w:br/><w:t>again</w:t></w:r>
    </w:p>
  </w:body>
</w:document>"#;

    fn docx_with(document_xml: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file(DOCUMENT_PART, SimpleFileOptions::default()).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn paragraphs_are_joined_by_newlines() {
        let text = extract(&docx_with(BODY)).unwrap();
        assert_eq!(text, "Quarterly report\n\nRevenue & costs \trose\nagain");
    }

    #[test]
    fn whitespace_between_elements_is_ignored() {
        let paras = paragraphs(BODY).unwrap();
        assert_eq!(paras.len(), 3);
        assert!(!paras[2].starts_with(' '));
    }

    #[test]
    fn text_box_keeps_enclosing_paragraph() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Before </w:t></w:r><w:r><w:pict><w:txbxContent><w:p><w:r><w:t>boxed</w:t></w:r></w:p></w:txbxContent></w:pict></w:r><w:r><w:t> after</w:t></w:r></w:p>
            <w:p><w:r><w:t>Next</w:t></w:r></w:p>
        </w:body></w:document>"#;
        assert_eq!(paragraphs(xml).unwrap(), ["boxed", "Before  after", "Next"]);
    }

    #[test]
    fn missing_document_part_errors() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("other.xml", SimpleFileOptions::default()).unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = extract(&buf).unwrap_err();
        assert!(err.to_string().contains(DOCUMENT_PART));
    }

    #[test]
    fn not_a_zip_errors() {
        assert!(matches!(extract(b"plain text"), Err(ExtractError::Word(_))));
    }
}
