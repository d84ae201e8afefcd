//! Cache busting for the static site.
//!
//! Local `.css` and `.js` references in HTML (`href="..."` / `src="..."`)
//! get a `?v=<version>` query so browsers refetch them after a deploy. The
//! version defaults to the referenced file's modification time.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;
use walkdir::WalkDir;

use crate::error::Result;

const ATTRS: [&str; 2] = ["href=", "src="];

/// Seconds since the epoch at which `path` was last modified, or the
/// current time when that is unavailable.
pub fn mtime_version(path: &Path) -> String {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or_else(|_| SystemTime::now());
    modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
        .to_string()
}

/// Rewrite the links in one HTML document.
///
/// `html_dir` is the directory holding the document and `root` the site
/// root; link targets are looked up in that order. Remote links and links
/// to missing files are left untouched.
pub fn bust_html(text: &str, html_dir: &Path, root: &Path, version: Option<&str>) -> String {
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len() + 64);
    let mut copied = 0;
    let mut cursor = 0;

    while let Some((at, attr)) = next_attr(&lower, cursor) {
        let value_start = at + attr.len() + 1;
        cursor = at + attr.len();
        let quote = match text.as_bytes().get(at + attr.len()) {
            Some(&q @ (b'"' | b'\'')) => q as char,
            _ => continue,
        };
        let Some(len) = text[value_start..].find(quote) else {
            continue;
        };
        let value = &text[value_start..value_start + len];
        if let Some(busted) = bust_link(value, html_dir, root, version) {
            out.push_str(&text[copied..value_start]);
            out.push_str(&busted);
            copied = value_start + len;
        }
        cursor = value_start + len;
    }
    out.push_str(&text[copied..]);
    out
}

/// Rewrite every `*.html` file under `root`. Returns the files changed.
pub fn bust_dir(root: &Path, version: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut updated = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_html(entry.path()) {
            continue;
        }

        let page = entry.into_path();
        let text = fs::read_to_string(&page)?;
        let html_dir = page.parent().unwrap_or(root);
        let busted = bust_html(&text, html_dir, root, version);
        if busted != text {
            fs::write(&page, busted)?;
            info!("updated {}", page.display());
            updated.push(page);
        }
    }
    Ok(updated)
}

fn next_attr(lower: &str, from: usize) -> Option<(usize, &'static str)> {
    ATTRS
        .iter()
        .filter_map(|attr| lower[from..].find(attr).map(|i| (from + i, *attr)))
        .min_by_key(|(at, _)| *at)
}

fn bust_link(value: &str, html_dir: &Path, root: &Path, version: Option<&str>) -> Option<String> {
    let path = value.split('?').next().unwrap_or(value);
    let lower = path.to_ascii_lowercase();
    if !(lower.ends_with(".css") || lower.ends_with(".js")) {
        return None;
    }
    if ["http://", "https://", "//"].iter().any(|p| lower.starts_with(p)) {
        return None;
    }
    // A leading `/` makes `join` yield a filesystem-absolute path, so
    // root-absolute links only resolve if that file exists on the host.
    let target = [html_dir.join(path), root.join(path)]
        .into_iter()
        .find(|candidate| candidate.exists())?;
    let version = version.map_or_else(|| mtime_version(&target), str::to_string);
    Some(format!("{path}?v={version}"))
}

fn is_html(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
}
