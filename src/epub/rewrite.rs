//! Rewriting `<img src>` references of EPUB chapters to unpacked files

use std::io;
use std::path::Path;
use std::rc::Rc;

use html5ever::parse_document;
use html5ever::serialize::{SerializeOpts, serialize};
use html5ever::tendril::TendrilSink;
use log::trace;
use markup5ever_rcdom::{Node, NodeData, RcDom, SerializableHandle};

use super::staging::contained_join;

/// Parse `html`, point every resolvable `<img src>` at the staged copy of the
/// image and serialize the result.
///
/// `doc_path` is the chapter's path inside the archive (`/`-separated); image
/// references are resolved against its directory.
pub fn rewrite_image_sources(html: &str, doc_path: &str, staging: &Path) -> io::Result<String> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())?;

    let base_dir = parent_dir(doc_path);
    let mut rewritten = 0usize;
    visit(&dom.document, &mut |node| {
        if let NodeData::Element {
            ref name,
            ref attrs,
            ..
        } = node.data
        {
            if name.local.as_ref() != "img" {
                return;
            }
            for attr in attrs.borrow_mut().iter_mut() {
                if attr.name.local.as_ref() != "src" {
                    continue;
                }
                let Some(archive_path) = resolve_reference(base_dir, &attr.value) else {
                    continue;
                };
                let Some(local) = contained_join(staging, Path::new(&archive_path)) else {
                    continue;
                };
                attr.value = file_url(&local).as_str().into();
                rewritten += 1;
            }
        }
    });
    trace!("Rewrote {rewritten} image references in {doc_path}");

    let mut out = Vec::new();
    let document: SerializableHandle = dom.document.clone().into();
    serialize(&mut out, &document, SerializeOpts::default())?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn visit(node: &Rc<Node>, f: &mut dyn FnMut(&Rc<Node>)) {
    f(node);
    for child in node.children.borrow().iter() {
        visit(child, f);
    }
}

fn parent_dir(path: &str) -> &str {
    path.rfind('/').map_or("", |idx| &path[..idx])
}

/// Resolve `src` relative to `base_dir` inside the archive.
///
/// Returns `None` for references that are not archive paths: empty values,
/// fragment-only links, and anything carrying a URL scheme.
pub fn resolve_reference(base_dir: &str, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.starts_with('#') || src.starts_with("//") || has_scheme(src) {
        return None;
    }
    let src = src.split(['#', '?']).next().unwrap_or_default();
    let src = percent_decode(src);

    let (start, rest) = match src.strip_prefix('/') {
        Some(absolute) => ("", absolute),
        None => (base_dir, src.as_str()),
    };

    let mut parts: Vec<&str> = start.split('/').filter(|p| !p.is_empty()).collect();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            // Clamped at the archive root
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

fn has_scheme(src: &str) -> bool {
    let Some(colon) = src.find(':') else {
        return false;
    };
    let scheme = &src[..colon];
    !scheme.is_empty()
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        // a single letter is a Windows drive, not a scheme
        && scheme.len() > 1
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// `file://` URL for an absolute local path
pub fn file_url(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let mut url = String::from("file://");
    if !raw.starts_with('/') {
        url.push('/');
    }
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'/' | b'-' | b'_' | b'.' | b'~' | b':')
        {
            url.push(byte as char);
        } else {
            url.push_str(&format!("%{byte:02X}"));
        }
    }
    url
}
