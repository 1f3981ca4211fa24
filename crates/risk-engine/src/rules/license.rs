use std::sync::LazyLock;

use regex::Regex;

use super::{pattern, select, RuleContext, Signal};
use crate::model::{DetectedRisk, PageSnapshot};

static BROAD_TERMS_LICENSE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\b(?:perpetual|irrevocable|royalty[\s-]free|sublicensable|transferable|worldwide)\b[^.!?]{0,80}?\blicen[cs]e\b[^.!?]{0,80}?\b(?:content|submissions?|uploads?|posts?|photos?|materials?|user[\s-]generated)\b",
    )
});

static GRANT_US: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\bgrant\s+(?:to\s+)?(?:us|the\s+company)\b[^.!?]{0,60}?\b(?:perpetual|irrevocable|royalty[\s-]free|sublicensable)\b",
    )
});

static WAIVE_MORAL_RIGHTS: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\bwaiv\w*\b[^.!?]{0,40}?\bmoral\s+rights\b"));

static CONTENT_LICENSE: &[Signal] = &[
    Signal {
        card: "broad_content_license",
        tag: "broad_license",
        phrases: &[],
        patterns: &[&BROAD_TERMS_LICENSE, &GRANT_US],
        negatable: false,
    },
    Signal {
        card: "moral_rights_waiver",
        tag: "moral_rights",
        phrases: &["waiver of moral rights", "moral rights waiver"],
        patterns: &[&WAIVE_MORAL_RIGHTS],
        negatable: false,
    },
];

pub(crate) fn detect_content_license(
    snapshot: &PageSnapshot,
    cx: &RuleContext<'_>,
) -> Option<DetectedRisk> {
    let (signal, hits) = select(CONTENT_LICENSE, &snapshot.normalized_text)?;
    cx.finding(snapshot, signal.card, &hits, signal.tags())
}
