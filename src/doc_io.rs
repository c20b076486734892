//! Legacy `.doc` (Word 97 binary) text extraction.
//!
//! A `.doc` is an OLE compound file. The FIB at the start of the
//! `WordDocument` stream points (via `fcClx`/`lcbClx`) into the table
//! stream, where the piece table maps character positions to file offsets.
//! Pieces are either 8-bit Windows-1252 ("compressed") or UTF-16LE. The
//! extracted text is then segmented into one block per label using the tab
//! / blank-line boundaries the label exports of that era carried.

use std::io::Read;
use std::path::Path;

use encoding_rs::WINDOWS_1252;

use crate::docx_io::DocError;

const DOC_MAGIC: u16 = 0xA5EC;

// FibRgFcLcb97 offsets inside the WordDocument stream.
const FIB_FLAGS_OFFSET: usize = 0x000A;
const FIB_FC_CLX_OFFSET: usize = 0x01A2;
const FIB_LCB_CLX_OFFSET: usize = 0x01A6;
const FLAG_WHICH_TBL_STM: u16 = 0x0200;

/// Read a legacy `.doc` file into raw text blocks, one per label.
pub fn read_doc_blocks(path: &Path) -> Result<Vec<String>, DocError> {
    let mut comp = cfb::open(path)
        .map_err(|e| DocError::Structure(format!("not an OLE compound file: {e}")))?;

    let word_stream = read_stream(&mut comp, "WordDocument")?;
    if word_stream.len() < FIB_LCB_CLX_OFFSET + 4 {
        return Err(DocError::EmptyDocument);
    }
    if read_u16(&word_stream, 0)? != DOC_MAGIC {
        return Err(DocError::Structure(
            "WordDocument stream has no FIB signature".to_string(),
        ));
    }

    let flags = read_u16(&word_stream, FIB_FLAGS_OFFSET)?;
    let table_name = if flags & FLAG_WHICH_TBL_STM != 0 {
        "1Table"
    } else {
        "0Table"
    };
    let table_stream = read_stream(&mut comp, table_name)?;

    let fc_clx = read_u32(&word_stream, FIB_FC_CLX_OFFSET)? as usize;
    let lcb_clx = read_u32(&word_stream, FIB_LCB_CLX_OFFSET)? as usize;
    let clx = slice(&table_stream, fc_clx, lcb_clx)?;

    let text = extract_text(&word_stream, clx)?;
    if text.trim().is_empty() {
        return Err(DocError::EmptyDocument);
    }

    Ok(segment_blocks(&text))
}

fn read_stream(
    comp: &mut cfb::CompoundFile<std::fs::File>,
    name: &str,
) -> Result<Vec<u8>, DocError> {
    let mut stream = comp
        .open_stream(name)
        .map_err(|e| DocError::Structure(format!("missing {name} stream: {e}")))?;
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Walk the Clx to the piece table (Pcdt) and decode every piece.
fn extract_text(word_stream: &[u8], clx: &[u8]) -> Result<String, DocError> {
    let mut at = 0;
    // Skip Prc property blocks (clxt = 0x01) preceding the Pcdt.
    while at < clx.len() && clx[at] == 0x01 {
        let cb = read_u16(clx, at + 1)? as usize;
        at += 3 + cb;
    }
    if at >= clx.len() || clx[at] != 0x02 {
        return Err(DocError::Structure("piece table not found".to_string()));
    }
    let lcb = read_u32(clx, at + 1)? as usize;
    let plc = slice(clx, at + 5, lcb)?;
    if lcb < 4 || (lcb - 4) % 12 != 0 {
        return Err(DocError::Structure("malformed piece table".to_string()));
    }
    let pieces = (lcb - 4) / 12;

    let mut text = String::new();
    for i in 0..pieces {
        let cp_start = read_u32(plc, i * 4)? as usize;
        let cp_end = read_u32(plc, (i + 1) * 4)? as usize;
        if cp_end <= cp_start {
            continue;
        }
        let chars = cp_end - cp_start;

        // PCD is 8 bytes; the fc word carries the offset and the
        // compression bit (bit 30).
        let pcd_at = (pieces + 1) * 4 + i * 8;
        let fc = read_u32(plc, pcd_at + 2)?;
        let compressed = fc & 0x4000_0000 != 0;
        let offset = (fc & 0x3FFF_FFFF) as usize;

        if compressed {
            let raw = slice(word_stream, offset / 2, chars)?;
            let (decoded, _, _) = WINDOWS_1252.decode(raw);
            text.push_str(&decoded);
        } else {
            let raw = slice(word_stream, offset, chars * 2)?;
            let units: Vec<u16> = raw
                .chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .collect();
            text.push_str(&String::from_utf16_lossy(&units));
        }
    }

    Ok(normalize_control_chars(&text))
}

/// Map Word's in-band markers to plain text: paragraph and line marks to
/// newline, cell/row marks to tab. Everything else below 0x20 is noise
/// (field delimiters, anchors) and is dropped.
fn normalize_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' | '\u{0B}' | '\u{0C}' => out.push('\n'),
            '\u{07}' | '\t' => out.push('\t'),
            '\n' => out.push('\n'),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

/// Segment extracted label text into one block per contact.
///
/// Lines are accumulated into a running buffer. A tab marks a column
/// boundary: the text before it completes the current contact, each
/// complete middle column becomes its own block, and the text after the
/// last tab starts the next contact. Blank lines flush; the trailing
/// buffer flushes at end of input.
pub fn segment_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, blocks: &mut Vec<String>| {
        if !current.trim().is_empty() {
            blocks.push(current.trim().to_string());
        }
        current.clear();
    };

    for line in text.lines() {
        if line.contains('\t') {
            let parts: Vec<&str> = line.split('\t').collect();
            if !parts[0].trim().is_empty() {
                if !current.is_empty() {
                    current.push('\n');
                }
                current.push_str(parts[0].trim());
            }
            flush(&mut current, &mut blocks);

            if let Some((&last, middle)) = parts[1..].split_last() {
                for part in middle {
                    let part = part.trim();
                    if !part.is_empty() {
                        blocks.push(part.to_string());
                    }
                }
                let last = last.trim();
                if !last.is_empty() {
                    current.push_str(last);
                }
            }
        } else if !line.trim().is_empty() {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line.trim());
        } else {
            flush(&mut current, &mut blocks);
        }
    }
    flush(&mut current, &mut blocks);

    blocks
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16, DocError> {
    slice(bytes, at, 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32, DocError> {
    slice(bytes, at, 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn slice(bytes: &[u8], at: usize, len: usize) -> Result<&[u8], DocError> {
    bytes
        .get(at..at.checked_add(len).ok_or_else(truncated)?)
        .ok_or_else(truncated)
}

fn truncated() -> DocError {
    DocError::Structure("document stream is truncated".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_accumulate_until_blank() {
        let text = "Jane Doe\n123 Main St\n\nBob Smith\n9 Oak Ln\n";
        assert_eq!(
            segment_blocks(text),
            vec!["Jane Doe\n123 Main St", "Bob Smith\n9 Oak Ln"]
        );
    }

    #[test]
    fn tab_completes_current_and_starts_next() {
        // One label row: the first column's last line, then the second
        // column's first line.
        let text = "Jane Doe\nSpringfield IL\tBob Smith\nToledo OH\n";
        assert_eq!(
            segment_blocks(text),
            vec!["Jane Doe\nSpringfield IL", "Bob Smith\nToledo OH"]
        );
    }

    #[test]
    fn middle_columns_become_their_own_blocks() {
        let text = "A One\tB Two\tC Three\n";
        assert_eq!(segment_blocks(text), vec!["A One", "B Two", "C Three"]);
    }

    #[test]
    fn empty_columns_are_skipped() {
        let text = "A One\t\tC Three\n\n";
        assert_eq!(segment_blocks(text), vec!["A One", "C Three"]);
    }

    #[test]
    fn trailing_buffer_flushes_at_eof() {
        assert_eq!(segment_blocks("Last Contact\n1 End Rd"), vec!["Last Contact\n1 End Rd"]);
    }

    #[test]
    fn control_chars_map_to_boundaries() {
        let text = normalize_control_chars("Jane Doe\rMain St\u{07}Bob\u{01}Smith\u{0B}Oak Ln");
        assert_eq!(text, "Jane Doe\nMain St\tBobSmith\nOak Ln");
    }

    #[test]
    fn non_ole_file_is_a_structure_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fake.doc");
        std::fs::write(&path, b"plain text, not OLE").unwrap();
        let err = read_doc_blocks(&path).unwrap_err();
        assert!(err.to_string().contains("OLE"));
    }
}
