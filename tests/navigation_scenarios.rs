use std::path::Path;

use folio::FolioError;
use folio::navigation::{Command, DocumentKind, Effect, Orientation, ViewMode};
use folio::pdf::{PageSize, Viewport};
use folio::session::{Frame, Session, SessionOptions};
use folio::settings::InitialZoom;
use folio::test_utils::FakePdfEngine;

fn session_with(engine: &FakePdfEngine) -> Session {
    Session::new(Box::new(engine.clone()), SessionOptions::default())
}

fn page_width(session: &mut Session) -> u32 {
    match session.frame() {
        Frame::Page(Some(bitmap)) => bitmap.width(),
        _ => panic!("expected a rendered page"),
    }
}

#[test]
fn spread_navigation_visits_left_pages() {
    let engine = FakePdfEngine::with_pages(10, 500.0, 700.0);
    let mut session = session_with(&engine);
    session.open(Path::new("book.pdf"), None).unwrap();

    let _ = session.apply(Command::SetOrientation(Orientation::Spread));
    let mut visited = vec![session.navigator().current_index()];
    for _ in 0..5 {
        let _ = session.apply(Command::Next);
        visited.push(session.navigator().current_index());
    }
    assert_eq!(visited, vec![0, 2, 4, 6, 8, 8]);

    // left and right page side by side at the fitted zoom (1000 / 500)
    assert_eq!(page_width(&mut session), 2000);
}

#[test]
fn fit_page_policy_uses_the_smaller_ratio() {
    let engine = FakePdfEngine::with_pages(2, 500.0, 700.0);
    let mut session = Session::new(
        Box::new(engine.clone()),
        SessionOptions {
            viewport: Viewport::new(1000, 700),
            initial_zoom: InitialZoom::FitPage,
            base_font_size: 16,
        },
    );
    session.open(Path::new("book.pdf"), None).unwrap();
    assert_eq!(session.navigator().zoom_percent(), 100);
    assert_eq!(page_width(&mut session), 500);
}

#[test]
fn encrypted_pdf_without_prompt_releases_handle() {
    let engine = FakePdfEngine::with_pages(3, 100.0, 100.0).password("pw");
    let mut session = session_with(&engine);

    let err = session.open(Path::new("secret.pdf"), None).unwrap_err();
    assert!(matches!(err, FolioError::PasswordRequired));
    assert_eq!(engine.opened(), 1);
    assert_eq!(engine.open_handles(), 0);
    assert!(session.document().is_none());
}

#[test]
fn cancelled_and_wrong_passwords() {
    let engine = FakePdfEngine::with_pages(3, 100.0, 100.0).password("pw");
    let mut session = session_with(&engine);

    let mut cancel = || None;
    let err = session
        .open(Path::new("secret.pdf"), Some(&mut cancel))
        .unwrap_err();
    assert!(matches!(err, FolioError::PasswordRequired));

    let mut wrong = || Some("nope".to_string());
    let err = session
        .open(Path::new("secret.pdf"), Some(&mut wrong))
        .unwrap_err();
    assert!(matches!(err, FolioError::IncorrectPassword));
    assert_eq!(engine.open_handles(), 0);

    let mut right = || Some("pw".to_string());
    let info = session
        .open(Path::new("secret.pdf"), Some(&mut right))
        .unwrap();
    assert_eq!(info.page_count, 3);
    assert_eq!(engine.open_handles(), 1);
}

#[test]
fn failing_page_renders_blank_and_navigation_continues() {
    let engine = FakePdfEngine::with_pages(4, 100.0, 100.0).failing_page(1);
    let mut session = session_with(&engine);
    session.open(Path::new("broken.pdf"), None).unwrap();

    let _ = session.apply(Command::Next);
    assert!(matches!(session.frame(), Frame::Page(None)));

    let _ = session.apply(Command::Next);
    assert_eq!(session.navigator().current_index(), 2);
    assert!(matches!(session.frame(), Frame::Page(Some(_))));
}

#[test]
fn continuous_view_skips_failed_pages_and_pairs_in_spread() {
    let engine = FakePdfEngine::with_pages(5, 100.0, 100.0).failing_page(3);
    let mut session = session_with(&engine);
    session.open(Path::new("doc.pdf"), None).unwrap();

    let _ = session.apply(Command::SetViewMode(ViewMode::Continuous));
    match session.frame() {
        Frame::Continuous(frames) => assert_eq!(frames.len(), 4),
        _ => panic!("expected continuous frames"),
    }

    // pairs (0,1) (2,3) (4); the failing right page leaves its left page alone
    let _ = session.apply(Command::SetOrientation(Orientation::Spread));
    match session.frame() {
        Frame::Continuous(frames) => {
            assert_eq!(frames.len(), 3);
            assert_eq!(frames[0].width(), 2 * frames[2].width());
            assert_eq!(frames[1].width(), frames[2].width());
        }
        _ => panic!("expected continuous frames"),
    }
}

#[test]
fn zoom_in_continuous_mode_rebuilds_at_new_scale() {
    let engine = FakePdfEngine::with_pages(2, 100.0, 100.0);
    let mut session = session_with(&engine);
    session.open(Path::new("doc.pdf"), None).unwrap();
    let _ = session.apply(Command::SetZoomPercent(100));
    let _ = session.apply(Command::SetViewMode(ViewMode::Continuous));

    let before = match session.frame() {
        Frame::Continuous(frames) => frames[0].width(),
        _ => panic!("expected continuous frames"),
    };
    let _ = session.apply(Command::SetZoomPercent(200));
    let after = match session.frame() {
        Frame::Continuous(frames) => frames[0].width(),
        _ => panic!("expected continuous frames"),
    };
    assert_eq!(before, 100);
    assert_eq!(after, 200);
}

#[test]
fn continuous_layout_waits_for_the_next_frame() {
    let engine = FakePdfEngine::with_pages(4, 100.0, 100.0);
    let mut session = session_with(&engine);
    session.open(Path::new("doc.pdf"), None).unwrap();
    let _ = session.apply(Command::SetViewMode(ViewMode::Continuous));
    assert_eq!(engine.renders(), 0);

    let _ = session.frame();
    assert_eq!(engine.renders(), 4);

    for cmd in [
        Command::ZoomIn,
        Command::ZoomIn,
        Command::SetOrientation(Orientation::Spread),
        Command::SetZoomPercent(150),
    ] {
        let effects = session.apply(cmd);
        assert!(effects.contains(&Effect::ContinuousStale));
    }
    assert_eq!(engine.renders(), 4);

    // one rebuild covers every change since the last frame
    match session.frame() {
        Frame::Continuous(frames) => {
            assert_eq!(frames.len(), 2);
            assert_eq!(frames[0].width(), 300);
        }
        _ => panic!("expected continuous frames"),
    }
    assert_eq!(engine.renders(), 8);

    let _ = session.frame();
    assert_eq!(engine.renders(), 8);
}

#[test]
fn unreadable_pdf_leaves_session_empty() {
    let engine = FakePdfEngine::with_pages(2, 100.0, 100.0).failing_open();
    let mut session = session_with(&engine);

    let err = session.open(Path::new("broken.pdf"), None).unwrap_err();
    assert!(matches!(err, FolioError::Load { .. }));
    assert!(session.document().is_none());
    assert_eq!(engine.opened(), 0);
}

#[test]
fn mixed_page_sizes_in_spread_share_a_height() {
    let engine = FakePdfEngine::with_page_sizes(vec![
        PageSize {
            width: 100.0,
            height: 200.0,
        },
        PageSize {
            width: 100.0,
            height: 100.0,
        },
    ]);
    let mut session = session_with(&engine);
    session.open(Path::new("mixed.pdf"), None).unwrap();
    let _ = session.apply(Command::SetZoomPercent(100));
    let _ = session.apply(Command::SetOrientation(Orientation::Spread));

    match session.frame() {
        Frame::Page(Some(bitmap)) => {
            assert_eq!(bitmap.height(), 200);
            assert_eq!(bitmap.width(), 300);
        }
        _ => panic!("expected a spread"),
    }
}

#[test]
fn unsupported_file_keeps_current_document() {
    let engine = FakePdfEngine::with_pages(2, 100.0, 100.0);
    let mut session = session_with(&engine);
    session.open(Path::new("doc.pdf"), None).unwrap();

    let err = session.open(Path::new("notes.txt"), None).unwrap_err();
    assert!(matches!(err, FolioError::UnsupportedFormat { .. }));
    assert_eq!(session.document().unwrap().title, "doc.pdf");
    assert_eq!(engine.open_handles(), 1);
}

#[test]
fn failed_load_leaves_session_empty() {
    let good = FakePdfEngine::with_pages(2, 100.0, 100.0);
    let mut session = session_with(&good);
    session.open(Path::new("doc.pdf"), None).unwrap();

    let err = session.open(Path::new("missing.epub"), None).unwrap_err();
    assert!(!err.is_user_error());
    assert!(session.document().is_none());
    assert!(matches!(session.frame(), Frame::Empty));
    assert_eq!(good.open_handles(), 0);

    assert!(session.apply(Command::Next).is_empty());
}

#[test]
fn reopening_resets_view_state() {
    let engine = FakePdfEngine::with_pages(6, 100.0, 100.0);
    let mut session = session_with(&engine);
    session.open(Path::new("a.pdf"), None).unwrap();
    let _ = session.apply(Command::GoToPage(5));
    let _ = session.apply(Command::SetViewMode(ViewMode::Continuous));

    let info = session.open(Path::new("b.pdf"), None).unwrap();
    assert_eq!(info.kind, DocumentKind::Pdf);
    assert_eq!(session.navigator().current_index(), 0);
    assert_eq!(session.navigator().view_mode(), ViewMode::Single);
    assert_eq!(engine.open_handles(), 1);

    drop(session);
    assert_eq!(engine.open_handles(), 0);
}
