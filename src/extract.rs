//! Multi-format content extraction for uploaded documents.
//!
//! The walker and the HTTP upload path both hand this module raw bytes plus
//! the original filename; it returns plain UTF-8 text (PDF, OOXML, text/CSV,
//! DXF) or a base64 image payload for formats the vision model reads
//! directly. Legacy binary Office formats and DWG have no local parser and
//! yield empty text; downstream stages fall back to filename clues.

use base64::Engine;
use std::io::Read;
use std::path::Path;

/// Maximum sheets to process in an xlsx.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum cells to process per sheet (avoids unbounded memory).
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction failure. Unsupported extensions propagate to the caller;
/// the walker filters them out before this module is reached.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedExtension(String),
    Pdf(String),
    Ooxml(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedExtension(ext) => {
                write!(f, "unsupported file extension: {}", ext)
            }
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ooxml(e) => write!(f, "OOXML extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// What the extractor produced for one file.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub text: String,
    pub content_type: String,
    /// Base64-encoded bytes for image formats, consumed by the vision
    /// transcription call.
    pub image_base64: Option<String>,
}

/// Lowercased extension of a path, without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

pub fn is_image_extension(ext: &str) -> bool {
    matches!(
        ext,
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tiff" | "webp"
    )
}

pub fn is_archive_extension(ext: &str) -> bool {
    ext == "zip"
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "doc" => "application/msword",
        "xls" => "application/vnd.ms-excel",
        "ppt" => "application/vnd.ms-powerpoint",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "rtf" => "application/rtf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tiff" => "image/tiff",
        "webp" => "image/webp",
        "dxf" => "image/vnd.dxf",
        "dwg" => "image/vnd.dwg",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Extract searchable content from one file's bytes.
pub fn extract_document(bytes: &[u8], file_name: &str) -> Result<ExtractedContent, ExtractError> {
    let ext = extension_of(Path::new(file_name)).unwrap_or_default();
    let content_type = content_type_for(&ext).to_string();

    let content = match ext.as_str() {
        "pdf" => ExtractedContent {
            text: extract_pdf(bytes)?,
            content_type,
            image_base64: None,
        },
        "docx" => ExtractedContent {
            text: extract_docx(bytes)?,
            content_type,
            image_base64: None,
        },
        "pptx" => ExtractedContent {
            text: extract_pptx(bytes)?,
            content_type,
            image_base64: None,
        },
        "xlsx" => ExtractedContent {
            text: extract_xlsx(bytes)?,
            content_type,
            image_base64: None,
        },
        // Legacy binary Office formats have no local parser.
        "doc" | "xls" | "ppt" | "dwg" => ExtractedContent {
            text: String::new(),
            content_type,
            image_base64: None,
        },
        "txt" | "csv" | "rtf" | "dxf" => ExtractedContent {
            text: String::from_utf8_lossy(bytes).into_owned(),
            content_type,
            image_base64: None,
        },
        ext if is_image_extension(ext) => ExtractedContent {
            text: String::new(),
            content_type,
            image_base64: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
        },
        other => return Err(ExtractError::UnsupportedExtension(other.to_string())),
    };

    Ok(content)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn open_ooxml(bytes: &[u8]) -> Result<zip::ZipArchive<std::io::Cursor<&[u8]>>, ExtractError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ExtractError::Ooxml(e.to_string()))
}

fn read_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(out)
}

/// Numerically-sorted entry names matching `prefix<N>suffix`, e.g.
/// `ppt/slides/slide3.xml`.
fn numbered_entries(
    archive: &zip::ZipArchive<std::io::Cursor<&[u8]>>,
    prefix: &str,
    suffix: &str,
) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(suffix))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(suffix)
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Collect the text of every `<t>` element (WordprocessingML `w:t` and
/// DrawingML `a:t` share the local name).
fn collect_t_text(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                in_t = e.local_name().as_ref() == b"t";
            }
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(_)) => {
                in_t = false;
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_ooxml(bytes)?;
    let xml = read_entry_bounded(&mut archive, "word/document.xml")?;
    collect_t_text(&xml)
}

fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_ooxml(bytes)?;
    let slides = numbered_entries(&archive, "ppt/slides/slide", ".xml");
    let mut out = String::new();
    for name in slides {
        let xml = read_entry_bounded(&mut archive, &name)?;
        let text = collect_t_text(&xml)?;
        if !out.is_empty() && !text.is_empty() {
            out.push(' ');
        }
        out.push_str(&text);
    }
    Ok(out)
}

fn extract_xlsx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_ooxml(bytes)?;
    let shared_strings = read_shared_strings(&mut archive)?;
    let sheets = numbered_entries(&archive, "xl/worksheets/sheet", ".xml");
    let mut out = String::new();
    for name in sheets.into_iter().take(XLSX_MAX_SHEETS) {
        let xml = read_entry_bounded(&mut archive, &name)?;
        let cells = collect_sheet_cells(&xml, &shared_strings)?;
        if !out.is_empty() && !cells.is_empty() {
            out.push(' ');
        }
        out.push_str(&cells);
    }
    Ok(out)
}

fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<String>, ExtractError> {
    let xml = read_entry_bounded(archive, "xl/sharedStrings.xml")?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_si = false;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => in_si = true,
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                strings.push(te.unescape().unwrap_or_default().into_owned());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"si" => in_si = false,
                b"t" => in_t = false,
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn collect_sheet_cells(xml: &[u8], shared_strings: &[String]) -> Result<String, ExtractError> {
    let mut cells: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_v = false;
    let mut cell_is_shared_str = false;
    loop {
        if cells.len() >= XLSX_MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"c" {
                    cell_is_shared_str = e.attributes().any(|a| {
                        a.as_ref()
                            .map(|a| a.key.as_ref() == b"t" && a.value.as_ref() == b"s")
                            .unwrap_or(false)
                    });
                } else if e.local_name().as_ref() == b"v" {
                    in_v = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_v => {
                let v = te.unescape().unwrap_or_default();
                let s = v.trim();
                if !s.is_empty() {
                    if cell_is_shared_str {
                        if let Ok(i) = s.parse::<usize>() {
                            if i < shared_strings.len() {
                                cells.push(shared_strings[i].clone());
                            }
                        }
                    } else {
                        cells.push(s.to_string());
                    }
                }
                in_v = false;
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"v" {
                    in_v = false;
                } else if e.local_name().as_ref() == b"c" {
                    cell_is_shared_str = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(cells.join(" "))
}
