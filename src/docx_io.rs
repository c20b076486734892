//! Word document I/O.
//!
//! Reading: a `.docx` is an OPC zip package; the label text lives in
//! `word/document.xml`, one table cell per label. Writing: a minimal
//! package laid out for Avery 5160 sheets (3 columns x 10 rows, 2.625" x 1"
//! cells). Legacy `.doc` support lives in [`crate::doc_io`]; this module
//! owns the shared error type and the extension dispatch.

use std::fs::{self, File};
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use quick_xml::escape::escape;
use roxmltree::{Document, Node};
use thiserror::Error;
use zip::write::SimpleFileOptions;

use crate::contact::Contact;
use crate::doc_io;

#[derive(Debug, Error)]
pub enum DocError {
    #[error("unsupported file format: .{0}. Please use .doc or .docx files")]
    UnsupportedExtension(String),
    #[error("no content found in the document. The file may be empty or corrupted")]
    EmptyDocument,
    #[error("no contacts found in the document. Please check the file format")]
    NoContacts,
    #[error("could not parse the document structure: {0}")]
    Structure(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("xml error: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Read a `.doc` or `.docx` file into raw text blocks, one per label.
pub fn read_blocks(path: &Path) -> Result<Vec<String>, DocError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let blocks = match ext.as_str() {
        "doc" => doc_io::read_doc_blocks(path)?,
        "docx" => read_docx_blocks(File::open(path)?)?,
        other => return Err(DocError::UnsupportedExtension(other.to_string())),
    };

    if blocks.is_empty() {
        return Err(DocError::NoContacts);
    }
    Ok(blocks)
}

// =============================================================================
// .docx reading
// =============================================================================

/// Extract text blocks from a `.docx` package. Table cells become blocks;
/// a table-less document falls back to paragraph groups separated by empty
/// paragraphs.
pub fn read_docx_blocks<R: Read + Seek>(reader: R) -> Result<Vec<String>, DocError> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| DocError::Structure("word/document.xml is missing".to_string()))?
        .read_to_string(&mut xml)?;

    if xml.trim().is_empty() {
        return Err(DocError::EmptyDocument);
    }

    let doc = Document::parse(&xml)?;
    let root = doc.root_element();

    let cells: Vec<Node> = root
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "tc")
        .collect();

    let blocks = if cells.is_empty() {
        paragraph_blocks(root)
    } else {
        cells
            .iter()
            .map(|cell| cell_text(*cell))
            .filter(|text| !text.trim().is_empty())
            .collect()
    };

    Ok(blocks)
}

/// Text of one table cell: paragraphs joined by newline, runs concatenated,
/// explicit breaks and tabs mapped.
fn cell_text(cell: Node) -> String {
    let paragraphs: Vec<String> = cell
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "p")
        .map(paragraph_text)
        .collect();
    paragraphs.join("\n").trim().to_string()
}

fn paragraph_text(paragraph: Node) -> String {
    let mut out = String::new();
    for node in paragraph.descendants() {
        if !node.is_element() {
            continue;
        }
        match node.tag_name().name() {
            "t" => out.push_str(node.text().unwrap_or_default()),
            "br" | "cr" => out.push('\n'),
            "tab" => out.push('\t'),
            _ => {}
        }
    }
    out
}

/// Fallback for documents without tables: group paragraphs into blocks at
/// empty paragraphs.
fn paragraph_blocks(root: Node) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for paragraph in root
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "p")
    {
        let text = paragraph_text(paragraph);
        if text.trim().is_empty() {
            if !current.trim().is_empty() {
                blocks.push(current.trim().to_string());
            }
            current.clear();
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(text.trim());
        }
    }
    if !current.trim().is_empty() {
        blocks.push(current.trim().to_string());
    }
    blocks
}

// =============================================================================
// .docx label-sheet writing (Avery 5160)
// =============================================================================

const LABELS_PER_ROW: usize = 3;
const ROWS_PER_PAGE: usize = 10;
const LABELS_PER_PAGE: usize = LABELS_PER_ROW * ROWS_PER_PAGE;

// Geometry in twips (1 inch = 1440). Labels are 2.625" x 1".
const LABEL_WIDTH: u32 = 3780;
const LABEL_HEIGHT: u32 = 1440;

/// Write the contacts as an Avery 5160 label sheet at `path`. Callers are
/// expected to pass an already-sorted list.
pub fn write_label_file(path: &Path, contacts: &[Contact]) -> Result<(), DocError> {
    let bytes = write_label_docx(contacts)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Build the `.docx` package in memory.
pub fn write_label_docx(contacts: &[Contact]) -> Result<Vec<u8>, DocError> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(RELS_XML.as_bytes())?;

        zip.start_file("word/document.xml", options)?;
        zip.write_all(document_xml(contacts).as_bytes())?;

        zip.finish()?;
    }
    Ok(buffer.into_inner())
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>
"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>
"#;

fn document_xml(contacts: &[Contact]) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    );
    out.push_str("<w:body>");

    let pages: Vec<&[Contact]> = contacts.chunks(LABELS_PER_PAGE).collect();
    for (page_index, page) in pages.iter().enumerate() {
        if page_index > 0 {
            // Each sheet starts on its own page.
            out.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
        }
        page_table_xml(&mut out, page);
    }

    // Letter page, margins matching the Avery 5160 sheet edges.
    out.push_str(concat!(
        r#"<w:sectPr>"#,
        r#"<w:pgSz w:w="12240" w:h="15840"/>"#,
        r#"<w:pgMar w:top="720" w:right="270" w:bottom="0" w:left="270"/>"#,
        r#"</w:sectPr>"#,
    ));
    out.push_str("</w:body></w:document>\n");
    out
}

fn page_table_xml(out: &mut String, page: &[Contact]) {
    out.push_str("<w:tbl>");
    out.push_str(concat!(
        "<w:tblPr>",
        r#"<w:tblLayout w:type="fixed"/>"#,
        r#"<w:tblCellMar><w:top w:w="50" w:type="dxa"/><w:left w:w="100" w:type="dxa"/><w:bottom w:w="50" w:type="dxa"/><w:right w:w="100" w:type="dxa"/></w:tblCellMar>"#,
        "</w:tblPr>",
    ));
    out.push_str("<w:tblGrid>");
    for _ in 0..LABELS_PER_ROW {
        out.push_str(&format!(r#"<w:gridCol w:w="{LABEL_WIDTH}"/>"#));
    }
    out.push_str("</w:tblGrid>");

    let rows_used = page.len().div_ceil(LABELS_PER_ROW);
    for row in 0..rows_used {
        out.push_str("<w:tr>");
        out.push_str(&format!(
            r#"<w:trPr><w:trHeight w:val="{LABEL_HEIGHT}" w:hRule="exact"/></w:trPr>"#
        ));
        for col in 0..LABELS_PER_ROW {
            cell_xml(out, page.get(row * LABELS_PER_ROW + col));
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
}

fn cell_xml(out: &mut String, contact: Option<&Contact>) {
    out.push_str("<w:tc>");
    out.push_str(&format!(
        r#"<w:tcPr><w:tcW w:w="{LABEL_WIDTH}" w:type="dxa"/><w:vAlign w:val="top"/></w:tcPr>"#
    ));
    match contact {
        Some(contact) => {
            for line in contact.full_address.lines() {
                out.push_str(concat!(
                    "<w:p>",
                    r#"<w:pPr><w:spacing w:after="50"/></w:pPr>"#,
                ));
                out.push_str(&format!(
                    r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#,
                    escape(line)
                ));
                out.push_str("</w:p>");
            }
        }
        // OOXML requires at least one paragraph per cell.
        None => out.push_str("<w:p/>"),
    }
    out.push_str("</w:tc>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::parse_blocks;

    fn sample_contacts() -> Vec<Contact> {
        parse_blocks(&[
            "Jane Doe\n123 Main St\nSpringfield IL 62701",
            "The Johnson Family\n9 Oak Ln\nAda OH 45810",
            "Bob & Carol Smith\n<Unit 1 & 2>\nToledo OH 43604",
        ])
    }

    #[test]
    fn write_then_read_round_trips_blocks() {
        let contacts = sample_contacts();
        let bytes = write_label_docx(&contacts).unwrap();
        let blocks = read_docx_blocks(Cursor::new(bytes)).unwrap();
        assert_eq!(blocks.len(), contacts.len());
        for (block, contact) in blocks.iter().zip(&contacts) {
            assert_eq!(block, &contact.full_address);
        }
    }

    #[test]
    fn package_is_a_zip_with_document_part() {
        let bytes = write_label_docx(&sample_contacts()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.by_name("word/document.xml").is_ok());
    }

    #[test]
    fn xml_special_characters_survive() {
        let contacts = parse_blocks(&["A <&> B\n\"Line\" 'two'"]);
        let bytes = write_label_docx(&contacts).unwrap();
        let blocks = read_docx_blocks(Cursor::new(bytes)).unwrap();
        assert_eq!(blocks[0], "A <&> B\n\"Line\" 'two'");
    }

    #[test]
    fn pages_break_every_thirty_labels() {
        let blocks: Vec<String> = (0..31).map(|i| format!("Person {i}\n{i} Elm St")).collect();
        let contacts = parse_blocks(&blocks);
        let xml = document_xml(&contacts);
        assert_eq!(xml.matches("<w:tbl>").count(), 2);
        assert_eq!(xml.matches(r#"<w:br w:type="page"/>"#).count(), 1);
    }

    #[test]
    fn short_rows_are_padded_with_empty_cells() {
        let contacts = parse_blocks(&["Only One\n1 Elm St"]);
        let xml = document_xml(&contacts);
        // One row, three cells, two of them empty.
        assert_eq!(xml.matches("<w:tr>").count(), 1);
        assert_eq!(xml.matches("<w:tc>").count(), 3);
        assert_eq!(xml.matches("<w:p/>").count(), 2);
    }

    #[test]
    fn empty_cells_are_skipped_on_read() {
        let contacts = parse_blocks(&["Only One\n1 Elm St"]);
        let bytes = write_label_docx(&contacts).unwrap();
        let blocks = read_docx_blocks(Cursor::new(bytes)).unwrap();
        assert_eq!(blocks, vec!["Only One\n1 Elm St".to_string()]);
    }

    #[test]
    fn unsupported_extension_is_descriptive() {
        let err = read_blocks(Path::new("contacts.txt")).unwrap_err();
        assert!(err.to_string().contains("unsupported file format"));
    }

    #[test]
    fn garbage_bytes_are_not_a_package() {
        assert!(read_docx_blocks(Cursor::new(b"not a zip".to_vec())).is_err());
    }
}
