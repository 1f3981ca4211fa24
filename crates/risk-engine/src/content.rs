/// Content-significance classification.
///
/// Login and signup pages are never actionable, and very short pages only
/// count once they pass a minimum length.
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ContentThresholds;
use crate::model::{PageMode, PageSnapshot};

static AUTH_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)/(?:login|log-in|signin|sign-in|signup|sign-up|register|auth|oauth|sso|forgot-password|reset-password)(?:[/?#.]|$)",
    )
    .expect("valid regex")
});

/// Path portion of a URL (no query or fragment), or the whole string when it
/// has no scheme.
fn url_path(url: &str) -> &str {
    let url = url.trim();
    let url = url.find(['?', '#']).map_or(url, |end| &url[..end]);
    match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            rest.find('/').map_or("", |slash| &rest[slash..])
        }
        None => url,
    }
}

pub fn is_auth_url(url: &str) -> bool {
    AUTH_PATH.is_match(url_path(url))
}

pub fn classify_page(snapshot: &PageSnapshot, thresholds: &ContentThresholds) -> PageMode {
    if is_auth_url(&snapshot.url) {
        PageMode::Auth
    } else if snapshot.text_len() < thresholds.low_content_chars {
        PageMode::LowContent
    } else {
        PageMode::ContentRich
    }
}

pub fn has_meaningful_content(
    mode: PageMode,
    text_len: usize,
    thresholds: &ContentThresholds,
) -> bool {
    match mode {
        PageMode::Auth => false,
        PageMode::LowContent => text_len >= thresholds.meaningful_min_chars,
        PageMode::ContentRich => true,
    }
}
