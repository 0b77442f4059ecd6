use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use folio::cli::{Cli, execute};
use folio::test_utils::{EpubFixture, FakePdfEngine};
use serde_json::Value;
use tempfile::TempDir;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// An empty file with a PDF extension; the fake engine supplies pages
    fn pdf(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, b"").unwrap();
        path
    }

    fn run_with(&self, engine: FakePdfEngine, args: &[&str]) -> anyhow::Result<String> {
        let config = self.path("settings.toml");
        let store = self.path("annotations.json");
        let mut argv = vec![
            "folio".to_string(),
            "--config".to_string(),
            config.display().to_string(),
            "--store".to_string(),
            store.display().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));

        let cli = Cli::try_parse_from(argv)?;
        let mut out = Vec::new();
        execute(cli, Box::new(engine), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<String> {
        self.run_with(FakePdfEngine::with_pages(3, 100.0, 100.0), args)
    }
}

fn arg(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn info_prints_json() {
    let env = Env::new();
    let pdf = env.pdf("report.pdf");

    let out = env.run(&["info", &arg(&pdf)]).unwrap();
    let json: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["kind"], "pdf");
    assert_eq!(json["title"], "report.pdf");
    assert_eq!(json["page_count"], 3);
}

#[test]
fn info_on_missing_file_fails() {
    let env = Env::new();
    let err = env.run(&["info", &arg(&env.path("nope.pdf"))]).unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn render_single_page_at_zoom() {
    let env = Env::new();
    let pdf = env.pdf("doc.pdf");
    let png = env.path("out/p2.png");

    let out = env
        .run(&["render", &arg(&pdf), "--page", "2", "--zoom", "100", "-o", &arg(&png)])
        .unwrap();
    assert_eq!(out.trim(), arg(&png));

    let image = image::open(&png).unwrap();
    assert_eq!((image.width(), image.height()), (100, 100));
}

#[test]
fn render_continuous_stacks_pages() {
    let env = Env::new();
    let pdf = env.pdf("doc.pdf");
    let png = env.path("all.png");

    env.run(&[
        "render",
        &arg(&pdf),
        "--zoom",
        "100",
        "--continuous",
        "--output",
        &arg(&png),
    ])
    .unwrap();

    let image = image::open(&png).unwrap();
    assert_eq!(image.width(), 100);
    assert_eq!(image.height(), 3 * 100 + 2 * 16);
}

#[test]
fn render_rejects_out_of_range_page() {
    let env = Env::new();
    let pdf = env.pdf("doc.pdf");
    let err = env.run(&["render", &arg(&pdf), "--page", "9"]).unwrap_err();
    assert!(err.to_string().contains("between 1 and 3"));
}

#[test]
fn wrong_password_is_reported() {
    let env = Env::new();
    let pdf = env.pdf("locked.pdf");
    let engine = FakePdfEngine::with_pages(2, 100.0, 100.0).password("right");

    let err = env
        .run_with(engine.clone(), &["info", &arg(&pdf), "--password", "wrong"])
        .unwrap_err();
    assert_eq!(err.to_string(), "incorrect password");
    assert_eq!(engine.open_handles(), 0);

    let out = env
        .run_with(engine, &["info", &arg(&pdf), "--password", "right"])
        .unwrap();
    assert!(out.contains("\"page_count\": 2"));
}

#[test]
fn text_prints_epub_page() {
    let env = Env::new();
    let book = EpubFixture::new()
        .chapter("a.xhtml", "<html><body><p>Alpha</p></body></html>")
        .chapter("b.xhtml", "<html><body><p>Beta</p></body></html>")
        .write(env.dir.path(), "book.epub");

    let out = env.run(&["text", &arg(&book), "--page", "2"]).unwrap();
    assert_eq!(out.trim(), "Beta");

    let err = env.run(&["text", &arg(&env.pdf("doc.pdf"))]).unwrap_err();
    assert!(err.to_string().contains("EPUB"));
}

#[test]
fn bookmarks_round_trip_through_the_store() {
    let env = Env::new();
    let pdf = env.pdf("doc.pdf");

    env.run(&["bookmark", "add", &arg(&pdf), "chapter two", "--page", "3"])
        .unwrap();
    let out = env.run(&["bookmark", "list", &arg(&pdf)]).unwrap();
    let list: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(list[0]["name"], "chapter two");
    assert_eq!(list[0]["page"], 3);
    assert!(env.path("annotations.json").is_file());

    env.run(&["bookmark", "remove", &arg(&pdf), "chapter two"])
        .unwrap();
    assert!(env.run(&["bookmark", "remove", &arg(&pdf), "chapter two"]).is_err());

    let err = env
        .run(&["bookmark", "add", &arg(&pdf), "a/b"])
        .unwrap_err();
    assert!(err.to_string().contains("'/'"));
}

#[test]
fn highlights_are_listed_per_page() {
    let env = Env::new();
    env.run(&["highlight", "add", "book.epub", "--page", "2", "9", "3"])
        .unwrap();

    let out = env
        .run(&["highlight", "list", "book.epub", "--page", "2"])
        .unwrap();
    let list: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(list[0]["start"], 3);
    assert_eq!(list[0]["end"], 9);

    let other = env
        .run(&["highlight", "list", "book.epub", "--page", "1"])
        .unwrap();
    assert_eq!(other.trim(), "[]");
}

#[test]
fn settings_set_and_show() {
    let env = Env::new();
    env.run(&["settings", "set", "font_size", "20"]).unwrap();
    env.run(&["settings", "set", "theme", "dark"]).unwrap();

    let out = env.run(&["settings", "show"]).unwrap();
    assert!(out.contains("font_size = 20"));
    assert!(out.contains("theme = dark"));

    assert!(env.run(&["settings", "set", "font_size", "99"]).is_err());
    assert!(env.run(&["settings", "set", "colour", "red"]).is_err());
}

#[test]
fn convert_text_to_epub_then_inspect() {
    let env = Env::new();
    let input = env.path("notes.txt");
    fs::write(&input, "remember the milk").unwrap();
    let output = env.path("notes.epub");

    env.run(&["convert", "text-epub", &arg(&input), &arg(&output)])
        .unwrap();
    let out = env.run(&["info", &arg(&output)]).unwrap();
    let json: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["kind"], "epub");
    assert_eq!(json["page_count"], 1);

    let text = env.run(&["text", &arg(&output)]).unwrap();
    assert!(text.contains("remember the milk"));
}
