use std::fs;
use std::path::Path;

use vertex_viz::site::{bust_dir, bust_html};
use vertex_viz::EditorError;

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("style.css"), "body {}").unwrap();
    fs::write(dir.path().join("main.js"), "").unwrap();
    fs::create_dir(dir.path().join("demos")).unwrap();
    fs::write(dir.path().join("demos/local.js"), "").unwrap();
    dir
}

#[test]
fn local_links_get_version() {
    let dir = site();
    let html = r#"<link rel="stylesheet" href="style.css"><script src='main.js'></script>"#;
    let out = bust_html(html, dir.path(), dir.path(), Some("42"));
    assert_eq!(
        out,
        r#"<link rel="stylesheet" href="style.css?v=42"><script src='main.js?v=42'></script>"#
    );
}

#[test]
fn existing_query_is_replaced() {
    let dir = site();
    let out = bust_html(r#"<script SRC="main.js?v=1&x=2"></script>"#, dir.path(), dir.path(), Some("7"));
    assert_eq!(out, r#"<script SRC="main.js?v=7"></script>"#);
}

#[test]
fn remote_missing_and_other_links_are_untouched() {
    let dir = site();
    let html = concat!(
        r#"<script src="https://cdn.example.com/lib.js"></script>"#,
        r#"<script src="//cdn.example.com/lib.js"></script>"#,
        r#"<script src="missing.js"></script>"#,
        r#"<img src="logo.png">"#,
        r#"<a href=main.js>unquoted</a>"#,
    );
    assert_eq!(bust_html(html, dir.path(), dir.path(), Some("1")), html);
}

#[test]
fn targets_resolve_from_page_then_root() {
    let dir = site();
    let page_dir = dir.path().join("demos");
    let html = r#"<script src="local.js"></script><link href="style.css">"#;
    let out = bust_html(html, &page_dir, dir.path(), Some("3"));
    assert_eq!(out, r#"<script src="local.js?v=3"></script><link href="style.css?v=3">"#);
}

#[test]
fn root_absolute_links_are_not_rebased_on_site_root() {
    let dir = site();
    // `/style.css` exists under the site root but not at the filesystem root.
    let html = r#"<link href="/style.css"><script src="/demos/local.js"></script>"#;
    assert_eq!(bust_html(html, dir.path(), dir.path(), Some("3")), html);
}

#[test]
fn default_version_is_mtime() {
    let dir = site();
    let out = bust_html(r#"<link href="style.css">"#, dir.path(), dir.path(), None);
    let version = out
        .trim_start_matches(r#"<link href="style.css?v="#)
        .trim_end_matches(r#"">"#);
    assert!(!version.is_empty() && version.chars().all(|c| c.is_ascii_digit()), "{out}");
}

#[test]
fn bust_dir_rewrites_only_changed_pages() {
    let dir = site();
    let root: &Path = dir.path();
    fs::write(root.join("index.html"), r#"<script src="main.js"></script>"#).unwrap();
    fs::write(root.join("demos/page.html"), r#"<script src="local.js"></script>"#).unwrap();
    fs::write(root.join("plain.html"), "<p>nothing to do</p>").unwrap();

    let updated = bust_dir(root, Some("9")).unwrap();
    assert_eq!(updated.len(), 2);
    assert_eq!(
        fs::read_to_string(root.join("index.html")).unwrap(),
        r#"<script src="main.js?v=9"></script>"#
    );
    assert_eq!(
        fs::read_to_string(root.join("demos/page.html")).unwrap(),
        r#"<script src="local.js?v=9"></script>"#
    );

    // second pass is stable
    assert!(bust_dir(root, Some("9")).unwrap().is_empty());
}

#[test]
fn bust_dir_skips_non_html_files() {
    let dir = site();
    let root = dir.path();
    fs::write(root.join("notes.txt"), r#"<script src="main.js"></script>"#).unwrap();
    fs::write(root.join("demos/INDEX.HTML"), r#"<script src="local.js"></script>"#).unwrap();

    let updated = bust_dir(root, Some("2")).unwrap();
    assert_eq!(updated, vec![root.join("demos/INDEX.HTML")]);
    assert_eq!(
        fs::read_to_string(root.join("notes.txt")).unwrap(),
        r#"<script src="main.js"></script>"#
    );
}

#[test]
fn bust_dir_reports_missing_root() {
    let dir = site();
    let err = bust_dir(&dir.path().join("no-such-dir"), None).unwrap_err();
    assert!(matches!(err, EditorError::Walk(_)), "unexpected error: {err}");
}
