//! Fixtures shared by unit and integration tests

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

use crate::pdf::{EngineFault, PageSize, PdfEngine, PdfHandle, PixelBuffer};

/// In-memory PDF engine with configurable pages, password and failures
#[derive(Clone, Debug, Default)]
pub struct FakePdfEngine {
    pages: Vec<PageSize>,
    password: Option<String>,
    failing_pages: Vec<usize>,
    fail_open: bool,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    renders: Arc<AtomicUsize>,
}

impl FakePdfEngine {
    /// `count` pages of `width` x `height` points
    pub fn with_pages(count: usize, width: f32, height: f32) -> Self {
        Self {
            pages: vec![PageSize { width, height }; count],
            ..Self::default()
        }
    }

    pub fn with_page_sizes(pages: Vec<PageSize>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn failing_page(mut self, index: usize) -> Self {
        self.failing_pages.push(index);
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Handles opened and not yet dropped
    pub fn open_handles(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Page rasterizations requested across all handles
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl PdfEngine for FakePdfEngine {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfHandle>, EngineFault> {
        if self.fail_open {
            return Err(EngineFault::generic(format!(
                "cannot open {}: no objects found",
                path.display()
            )));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            pages: self.pages.clone(),
            password: self.password.clone(),
            unlocked: self.password.is_none(),
            failing_pages: self.failing_pages.clone(),
            closed: Arc::clone(&self.closed),
            renders: Arc::clone(&self.renders),
        }))
    }
}

struct FakeHandle {
    pages: Vec<PageSize>,
    password: Option<String>,
    unlocked: bool,
    failing_pages: Vec<usize>,
    closed: Arc<AtomicUsize>,
    renders: Arc<AtomicUsize>,
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl PdfHandle for FakeHandle {
    fn needs_password(&self) -> Result<bool, EngineFault> {
        Ok(!self.unlocked)
    }

    fn authenticate(&mut self, password: &str) -> Result<bool, EngineFault> {
        self.unlocked = self.password.as_deref() == Some(password);
        Ok(self.unlocked)
    }

    fn page_count(&self) -> Result<usize, EngineFault> {
        Ok(self.pages.len())
    }

    fn page_size(&self, index: usize) -> Result<PageSize, EngineFault> {
        self.pages
            .get(index)
            .copied()
            .ok_or_else(|| EngineFault::generic(format!("no page {index}")))
    }

    fn render_page(
        &self,
        index: usize,
        scale_x: f32,
        scale_y: f32,
    ) -> Result<PixelBuffer, EngineFault> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if !self.unlocked {
            return Err(EngineFault::generic("document is locked"));
        }
        if self.failing_pages.contains(&index) {
            return Err(EngineFault::generic(format!("corrupt page {index}")));
        }
        let size = self.page_size(index)?;
        let width = ((size.width * scale_x).round() as u32).max(1);
        let height = ((size.height * scale_y).round() as u32).max(1);
        // padded rows, like real rasterizers produce
        let stride = width as usize * 4 + 4;
        let shade = (index * 20 % 256) as u8;
        let mut samples = vec![0u8; stride * height as usize];
        for row in samples.chunks_mut(stride) {
            for pixel in row[..width as usize * 4].chunks_mut(4) {
                pixel.copy_from_slice(&[shade, shade, shade, 255]);
            }
        }
        Ok(PixelBuffer {
            width,
            height,
            stride,
            samples,
        })
    }
}

/// Builds small EPUB files on disk
#[derive(Clone, Debug, Default)]
pub struct EpubFixture {
    title: Option<String>,
    /// (archive path, media type, content, in spine)
    items: Vec<(String, String, Vec<u8>, bool)>,
}

impl EpubFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Add an XHTML document to the manifest and the spine
    pub fn chapter(mut self, path: &str, html: &str) -> Self {
        self.items.push((
            path.to_string(),
            "application/xhtml+xml".to_string(),
            html.as_bytes().to_vec(),
            true,
        ));
        self
    }

    /// Add a manifest item that is not in the spine
    pub fn resource(mut self, path: &str, media_type: &str, bytes: &[u8]) -> Self {
        self.items
            .push((path.to_string(), media_type.to_string(), bytes.to_vec(), false));
        self
    }

    /// Add a non-HTML manifest item that is referenced from the spine
    pub fn spine_resource(mut self, path: &str, media_type: &str, bytes: &[u8]) -> Self {
        self.items
            .push((path.to_string(), media_type.to_string(), bytes.to_vec(), true));
        self
    }

    pub fn write(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        let file = std::fs::File::create(&path).expect("create epub fixture");
        let mut zip = ZipWriter::new(file);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        zip.start_file("META-INF/container.xml", stored).unwrap();
        zip.write_all(
            br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#,
        )
        .unwrap();

        let mut manifest = String::new();
        let mut spine = String::new();
        for (i, (item_path, media_type, bytes, in_spine)) in self.items.iter().enumerate() {
            manifest.push_str(&format!(
                "<item id=\"item{i}\" href=\"{item_path}\" media-type=\"{media_type}\"/>\n"
            ));
            if *in_spine {
                spine.push_str(&format!("<itemref idref=\"item{i}\"/>\n"));
            }
            zip.start_file(item_path.as_str(), stored).unwrap();
            zip.write_all(bytes).unwrap();
        }

        let title = self.title.as_deref().unwrap_or("Fixture");
        zip.start_file("content.opf", stored).unwrap();
        zip.write_all(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="id">fixture</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine>
{spine}  </spine>
</package>"#
            )
            .as_bytes(),
        )
        .unwrap();

        zip.finish().unwrap();
        path
    }
}

/// A tiny opaque PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 30, 30, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}
