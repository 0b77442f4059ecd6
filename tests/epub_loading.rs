use std::path::Path;

use folio::epub::{NO_CONTENT_PAGE, file_url, html_to_text, load_epub};
use folio::navigation::{Command, DocumentKind};
use folio::session::{Frame, Session, SessionOptions};
use folio::test_utils::{EpubFixture, FakePdfEngine, png_bytes};
use tempfile::TempDir;

fn illustrated_book(dir: &Path) -> std::path::PathBuf {
    EpubFixture::new()
        .title("Illustrated")
        .chapter(
            "text/ch1.xhtml",
            r#"<html xmlns="http://www.w3.org/1999/xhtml"><head><title>One</title></head>
<body><h1>Chapter One</h1><p>Hello there.</p><img src="../images/cover.png" alt="cover"/></body></html>"#,
        )
        .chapter(
            "text/ch2.xhtml",
            r#"<html xmlns="http://www.w3.org/1999/xhtml"><body><p>Second page.</p>
<img src="https://example.com/remote.png"/></body></html>"#,
        )
        .resource("images/cover.png", "image/png", &png_bytes(4, 4))
        .write(dir, "illustrated.epub")
}

#[test]
fn images_resolve_into_staging_directory() {
    let dir = TempDir::new().unwrap();
    let path = illustrated_book(dir.path());

    let book = load_epub(&path).unwrap();
    assert_eq!(book.page_count(), 2);
    assert_eq!(book.title.as_deref(), Some("Illustrated"));

    let cover = book.staging_path().join("images").join("cover.png");
    assert!(cover.is_file());
    assert!(book.pages[0].contains(&file_url(&cover)));
    assert!(!book.pages[0].contains("../images/cover.png"));

    // remote references are left alone
    assert!(book.pages[1].contains("https://example.com/remote.png"));
    book.release();
}

#[test]
fn non_html_spine_items_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = EpubFixture::new()
        .spine_resource("images/plate.png", "image/png", &png_bytes(2, 2))
        .chapter("a.xhtml", "<html><body><p>Only text</p></body></html>")
        .write(dir.path(), "mixed.epub");

    let book = load_epub(&path).unwrap();
    assert_eq!(book.page_count(), 1);
    assert!(html_to_text(&book.pages[0]).contains("Only text"));
}

#[test]
fn book_without_readable_pages_gets_placeholder() {
    let dir = TempDir::new().unwrap();
    let path = EpubFixture::new()
        .spine_resource("images/plate.png", "image/png", &png_bytes(2, 2))
        .write(dir.path(), "empty.epub");

    let book = load_epub(&path).unwrap();
    assert_eq!(book.pages, vec![NO_CONTENT_PAGE.to_string()]);
}

#[test]
fn session_shows_html_and_scales_font() {
    let dir = TempDir::new().unwrap();
    let path = illustrated_book(dir.path());
    let mut session = Session::new(
        Box::new(FakePdfEngine::default()),
        SessionOptions::default(),
    );

    let info = session.open(&path, None).unwrap();
    assert_eq!(info.kind, DocumentKind::Epub);
    assert_eq!(info.title, "illustrated.epub");
    assert_eq!(info.display_title.as_deref(), Some("Illustrated"));

    let _ = session.apply(Command::ZoomIn);
    match session.frame() {
        Frame::Html { markup, font_size } => {
            assert!(markup.contains("Chapter One"));
            assert_eq!(font_size, 18);
        }
        _ => panic!("expected an HTML page"),
    }
    assert_eq!(session.navigator().zoom_percent(), 113);

    let _ = session.apply(Command::Next);
    match session.frame() {
        Frame::Html { markup, .. } => assert!(markup.contains("Second page.")),
        _ => panic!("expected an HTML page"),
    }
}

#[test]
fn staging_directory_goes_away_when_switching_documents() {
    let dir = TempDir::new().unwrap();
    let path = illustrated_book(dir.path());
    let engine = FakePdfEngine::with_pages(1, 100.0, 100.0);
    let mut session = Session::new(Box::new(engine), SessionOptions::default());

    session.open(&path, None).unwrap();
    let staging = session.staging_path().unwrap().to_path_buf();
    assert!(staging.is_dir());

    session.open(Path::new("next.pdf"), None).unwrap();
    assert!(!staging.exists());
    assert!(session.staging_path().is_none());
}

#[test]
fn staging_directory_goes_away_on_drop() {
    let dir = TempDir::new().unwrap();
    let path = illustrated_book(dir.path());
    let mut session = Session::new(
        Box::new(FakePdfEngine::default()),
        SessionOptions::default(),
    );
    session.open(&path, None).unwrap();
    let staging = session.staging_path().unwrap().to_path_buf();

    drop(session);
    assert!(!staging.exists());
}
