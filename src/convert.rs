//! Converting plain text and images into PDF and EPUB files
//!
//! Every converter writes to a temporary file next to the destination and
//! moves it into place only once the whole document has been written.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use mupdf::{Document, DocumentWriter, Matrix};
use tempfile::{NamedTempFile, TempPath};
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

use crate::error::{FolioError, Result};

/// A4 in points
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const PAGE_MARGIN: f32 = 50.0;
const TEXT_FONT_SIZE: f32 = 11.0;

const EPUB_DIR: &str = "EPUB";
const CHAPTER_FILE: &str = "chap_1.xhtml";

/// Lay `input` out as text on as many A4 pages as it needs
pub fn text_to_pdf(input: &Path, output: &Path, password: Option<&str>) -> Result<()> {
    let options = pdf_writer_options(password)?;
    let text = read_text(input)?;

    let html = format!(
        "<!DOCTYPE html><html><head><style>\
         @page {{ margin: {PAGE_MARGIN}pt; }}\
         body {{ margin: 0; font-size: {TEXT_FONT_SIZE}pt; }}\
         pre {{ white-space: pre-wrap; font-family: sans-serif; margin: 0; }}\
         </style></head><body><pre>{}</pre></body></html>",
        escape_markup(&text)
    );
    let mut source = Document::from_bytes(html.as_bytes(), "text/html")?;
    source.layout(PAGE_WIDTH, PAGE_HEIGHT, TEXT_FONT_SIZE)?;

    let pages = write_pdf(output, &options, |writer| copy_pages(writer, &source))?;
    info!("Converted {input:?} to {output:?} ({pages} pages)");
    Ok(())
}

/// One PDF page per image, each page the size of its image
pub fn images_to_pdf(inputs: &[PathBuf], output: &Path, password: Option<&str>) -> Result<()> {
    if inputs.is_empty() {
        return Err(FolioError::NoFile);
    }
    let options = pdf_writer_options(password)?;

    let pages = write_pdf(output, &options, |writer| {
        let mut total = 0;
        for input in inputs {
            let image = Document::open(input.to_string_lossy().as_ref())
                .map_err(|e| FolioError::load(input, e))?;
            total += copy_pages(writer, &image)?;
            debug!("Added image {input:?}");
        }
        Ok(total)
    })?;
    info!("Converted {} images to {output:?} ({pages} pages)", inputs.len());
    Ok(())
}

/// Wrap `input` in a single-chapter EPUB 3 book
pub fn text_to_epub(input: &Path, output: &Path) -> Result<()> {
    let text = read_text(input)?;
    let title = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled".to_string());
    let identifier = format!("folio-convert-{:x}", md5::compute(text.as_bytes()));

    let mut staged = stage_output(output)?;
    {
        let mut zip = ZipWriter::new(staged.as_file_mut());
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

        // must be the first entry, uncompressed
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(container_xml().as_bytes())?;

        zip.start_file(format!("{EPUB_DIR}/content.opf"), deflated)?;
        zip.write_all(package_document(&identifier, &title).as_bytes())?;

        zip.start_file(format!("{EPUB_DIR}/nav.xhtml"), deflated)?;
        zip.write_all(nav_document(&title).as_bytes())?;

        zip.start_file(format!("{EPUB_DIR}/toc.ncx"), deflated)?;
        zip.write_all(ncx_document(&identifier, &title).as_bytes())?;

        zip.start_file(format!("{EPUB_DIR}/{CHAPTER_FILE}"), deflated)?;
        zip.write_all(chapter_document(&text).as_bytes())?;

        zip.finish()?;
    }
    staged.as_file().sync_all()?;
    commit(staged.into_temp_path(), output)?;
    info!("Converted {input:?} to {output:?}");
    Ok(())
}

/// Read a text file, dropping bytes that are not valid UTF-8
fn read_text(input: &Path) -> Result<String> {
    let bytes = fs::read(input)?;
    Ok(String::from_utf8_lossy(&bytes).replace('\u{FFFD}', ""))
}

/// Writer options for an optionally encrypted PDF
fn pdf_writer_options(password: Option<&str>) -> Result<String> {
    match password.filter(|pw| !pw.is_empty()) {
        None => Ok(String::new()),
        Some(pw) if pw.contains(',') => Err(FolioError::invalid(
            "PDF passwords must not contain ','",
        )),
        Some(pw) => Ok(format!(
            "encrypt=aes-128,owner-password={pw},user-password={pw}"
        )),
    }
}

fn write_pdf(
    output: &Path,
    options: &str,
    fill: impl FnOnce(&mut DocumentWriter) -> Result<usize>,
) -> Result<usize> {
    let staged = stage_output(output)?.into_temp_path();
    // the writer closes the file when dropped, before the rename
    let pages = {
        let mut writer = DocumentWriter::new(&*staged.to_string_lossy(), "pdf", options)?;
        fill(&mut writer)?
    };
    commit(staged, output)?;
    Ok(pages)
}

fn copy_pages(writer: &mut DocumentWriter, source: &Document) -> Result<usize> {
    let count = source.page_count()?;
    for index in 0..count {
        let page = source.load_page(index)?;
        let device = writer.begin_page(page.bounds()?)?;
        page.run(&device, &Matrix::new_scale(1.0, 1.0))?;
        writer.end_page(device)?;
    }
    Ok(usize::try_from(count).unwrap_or(0))
}

fn stage_output(output: &Path) -> Result<NamedTempFile> {
    let dir = output
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(tempfile::Builder::new()
        .prefix(".folio-")
        .suffix(".part")
        .tempfile_in(dir)?)
}

fn commit(staged: TempPath, output: &Path) -> Result<()> {
    staged.persist(output).map_err(|e| FolioError::Io(e.error))?;
    Ok(())
}

/// Escape text for use inside XHTML element content or attribute values,
/// dropping characters XML cannot carry.
fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c < ' ' => {}
            c => out.push(c),
        }
    }
    out
}

fn container_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{EPUB_DIR}/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#
    )
}

fn package_document(identifier: &str, title: &str) -> String {
    let modified = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let title = escape_markup(title);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="id">{identifier}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:language>en</dc:language>
    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
    <item id="chapter_1" href="{CHAPTER_FILE}" media-type="application/xhtml+xml"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="chapter_1"/>
  </spine>
</package>
"#
    )
}

fn nav_document(title: &str) -> String {
    let title = escape_markup(title);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="en" xml:lang="en">
<head><title>{title}</title></head>
<body>
  <nav epub:type="toc" id="id"><h2>{title}</h2>
    <ol><li><a href="{CHAPTER_FILE}">Chapter 1</a></li></ol>
  </nav>
</body>
</html>
"#
    )
}

fn ncx_document(identifier: &str, title: &str) -> String {
    let title = escape_markup(title);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{identifier}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>
    <navPoint id="chapter_1" playOrder="1">
      <navLabel><text>Chapter 1</text></navLabel>
      <content src="{CHAPTER_FILE}"/>
    </navPoint>
  </navMap>
</ncx>
"#
    )
}

fn chapter_document(text: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" lang="en" xml:lang="en">
<head><title>Chapter 1</title></head>
<body><pre>{}</pre></body>
</html>
"#,
        escape_markup(text)
    )
}
