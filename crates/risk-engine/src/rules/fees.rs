use std::sync::LazyLock;

use regex::Regex;

use super::{is_negated, pattern, push_unique, select, RuleContext, Signal};
use crate::model::{DetectedRisk, PageSnapshot};

const RESORT_ROW: usize = 0;
const HIDDEN_ROW: usize = 1;

static FEES: &[Signal] = &[
    Signal {
        card: "resort_or_facility_fee",
        tag: "resort_fee",
        phrases: &[
            "resort fee",
            "resort charge",
            "facility fee",
            "facilities fee",
            "destination fee",
            "amenity fee",
            "amenities fee",
            "urban fee",
        ],
        patterns: &[],
        negatable: true,
    },
    Signal {
        card: "hidden_or_mandatory_fees",
        tag: "mandatory_fee",
        phrases: &[
            "mandatory fee",
            "service fee",
            "booking fee",
            "processing fee",
            "convenience fee",
            "handling fee",
            "cleaning fee",
            "administrative fee",
            "admin fee",
            "additional fees",
            "additional charges",
            "fees may apply",
            "fees are not included",
            "not included in the price",
            "excluding taxes and fees",
            "plus taxes and fees",
            "payable at the property",
            "due at the property",
            "payable on arrival",
            "surcharge",
        ],
        patterns: &[],
        negatable: true,
    },
];

/// A resort-style fee noun phrase; the bare word "resort" is usually part of
/// a property or room name.
static RESORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"(?i)\b(?:resort|facilit(?:y|ies)|destination|amenit(?:y|ies)|urban)\s+(?:fees?|charges?|surcharges?)\b",
    )
});

/// Any other fee. "Charge" alone names the room charge, so it only counts
/// with a qualifier.
static HIDDEN_LINE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"(?i)\b(?:fees?|surcharges?)\b|\b(?:service|booking|processing|convenience|handling|cleaning|admin\w*|mandatory|additional|extra)\s+charges?\b",
    )
});

fn names_fee(re: &Regex, line: &str) -> bool {
    re.find_iter(line).any(|m| !is_negated(line, m.start()))
}

/// Which row a structured fee line belongs to, if it names a fee at all.
fn classify_fee_line(line: &str) -> Option<usize> {
    if names_fee(&RESORT_LINE, line) {
        Some(RESORT_ROW)
    } else if names_fee(&HIDDEN_LINE, line) {
        Some(HIDDEN_ROW)
    } else {
        None
    }
}

/// Fee lines extracted from the page's price breakdown take priority over
/// keywords found in running text, and are listed first as evidence.
pub(crate) fn detect_mandatory_fees(
    snapshot: &PageSnapshot,
    cx: &RuleContext<'_>,
) -> Option<DetectedRisk> {
    let mut line_row: Option<usize> = None;
    let mut line_hits: Vec<String> = Vec::new();
    for line in snapshot.fee_lines() {
        let Some(row) = classify_fee_line(line) else {
            continue;
        };
        line_row = Some(line_row.map_or(row, |current| current.min(row)));
        push_unique(&mut line_hits, line);
    }

    let text_hit = select(FEES, &snapshot.normalized_text);
    let text_row = text_hit
        .as_ref()
        .and_then(|(signal, _)| FEES.iter().position(|row| std::ptr::eq(row, *signal)));

    let row = match (line_row, text_row) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    let signal = &FEES[row];

    let mut hits = line_hits;
    let from_lines = !hits.is_empty();
    if let Some((_, text_hits)) = &text_hit {
        for hit in text_hits {
            push_unique(&mut hits, hit);
        }
    }
    let mut tags = signal.tags();
    if from_lines {
        tags.push("fee_lines".to_string());
    }
    cx.signal_finding(snapshot, signal, &hits, tags)
}
