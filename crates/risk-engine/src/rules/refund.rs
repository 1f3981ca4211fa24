use std::sync::LazyLock;

use regex::Regex;

use super::{parse_count, pattern, push_unique, select, RuleContext, Signal};
use crate::model::{DetectedRisk, PageSnapshot};

static NON_REFUNDABLE: &[Signal] = &[Signal {
    card: "non_refundable_or_final_sale",
    tag: "non_refundable",
    phrases: &[
        "non-refundable",
        "nonrefundable",
        "non refundable",
        "all sales are final",
        "all sales final",
        "final sale",
        "no refunds",
        "no refund will be",
        "not eligible for a refund",
        "not eligible for refund",
        "cannot be refunded",
        "will not be refunded",
    ],
    patterns: &[],
    negatable: false,
}];

pub(crate) fn detect_non_refundable(
    snapshot: &PageSnapshot,
    cx: &RuleContext<'_>,
) -> Option<DetectedRisk> {
    let (signal, hits) = select(NON_REFUNDABLE, &snapshot.normalized_text)?;
    cx.finding(snapshot, signal.card, &hits, signal.tags())
}

const COUNT: &str = r"(?P<n>\d{1,3}|one|two|three|four|five|six|seven|ten|fourteen|thirty|twenty[- ]?four|forty[- ]?eight|seventy[- ]?two)";
const WINDOW_UNIT: &str = r"(?P<unit>hours?|hrs?|h\b|days?|weeks?)";

/// Wording that grants the right to cancel or return, as opposed to wording
/// about how fast a refund is paid or a request is answered.
const ELIGIBILITY: &str = r"(?:cancel\w*|request\s+(?:a\s+|your\s+)?refund|eligible\s+for\s+(?:a\s+)?(?:full\s+)?refund|returns?\s+(?:the\s+|your\s+|any\s+|an\s+)?(?:items?|products?|orders?|purchases?|goods)\b|returned|returns\s+(?:are|will\s+be)\s+accepted)";

/// "cancel ... within 24 hours"
static WINDOW_AFTER_VERB: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"\b{ELIGIBILITY}[^.!?]{{0,60}}?\bwithin\s+(?:the\s+first\s+)?{COUNT}\s*-?\s*{WINDOW_UNIT}"
    ))
});

/// "within 48 hours of booking you may cancel"
static WINDOW_BEFORE_VERB: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"\bwithin\s+(?:the\s+first\s+)?{COUNT}\s*-?\s*{WINDOW_UNIT}[^.!?]{{0,60}}?\b{ELIGIBILITY}"
    ))
});

/// Processing and support-response wording; a window stated alongside it is
/// a service time, not an eligibility window.
static SERVICE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\b(?:issued|processed|credited|paid\s+out|respond\w*|repl(?:y|ies|ied)|answer\w*|requests)\b",
    )
});

/// How tight a cancellation or return window is. Windows longer than two
/// weeks are not considered restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationWindow {
    /// 48 hours or less.
    UltraShort { hours: u32 },
    /// Three days up to two weeks.
    Short { days: u32 },
}

impl CancellationWindow {
    pub fn from_hours(hours: u32) -> Option<Self> {
        match hours {
            0 => None,
            1..=48 => Some(CancellationWindow::UltraShort { hours }),
            49..=336 => Some(CancellationWindow::Short {
                days: hours.div_ceil(24),
            }),
            _ => None,
        }
    }

    pub fn card_id(&self) -> &'static str {
        match self {
            CancellationWindow::UltraShort { .. } => "ultra_short_cancellation_window",
            CancellationWindow::Short { .. } => "short_cancellation_window",
        }
    }

    fn hours(&self) -> u32 {
        match *self {
            CancellationWindow::UltraShort { hours } => hours,
            CancellationWindow::Short { days } => days * 24,
        }
    }

    fn tag(&self) -> String {
        match self {
            CancellationWindow::UltraShort { hours } => format!("window_hours:{hours}"),
            CancellationWindow::Short { days } => format!("window_days:{days}"),
        }
    }
}

fn window_hours(count: &str, unit: &str) -> Option<u32> {
    let n = parse_count(count)?;
    let per_unit = if unit.starts_with('h') {
        1
    } else if unit.starts_with('w') {
        24 * 7
    } else {
        24
    };
    n.checked_mul(per_unit)
}

pub(crate) fn detect_cancellation_window(
    snapshot: &PageSnapshot,
    cx: &RuleContext<'_>,
) -> Option<DetectedRisk> {
    let text = &snapshot.normalized_text;
    let mut windows: Vec<(CancellationWindow, String)> = Vec::new();
    for re in [&WINDOW_AFTER_VERB, &WINDOW_BEFORE_VERB] {
        for caps in re.captures_iter(text) {
            let (Some(n), Some(unit), Some(whole)) = (caps.name("n"), caps.name("unit"), caps.get(0))
            else {
                continue;
            };
            if SERVICE_TIME.is_match(whole.as_str()) {
                continue;
            }
            if let Some(window) =
                window_hours(n.as_str(), unit.as_str()).and_then(CancellationWindow::from_hours)
            {
                windows.push((window, whole.as_str().to_string()));
            }
        }
    }

    // The tightest window decides the card.
    let tightest = windows.iter().map(|(w, _)| *w).min_by_key(|w| w.hours())?;
    let mut hits: Vec<String> = Vec::new();
    for (window, matched) in &windows {
        if window.card_id() == tightest.card_id() {
            push_unique(&mut hits, matched);
        }
    }
    cx.finding(
        snapshot,
        tightest.card_id(),
        &hits,
        vec!["cancellation_window".to_string(), tightest.tag()],
    )
}

static PERCENT_REFUND: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\b\d{1,2}\s?%\s+(?:refund|of\s+(?:the|your)\s+(?:booking|purchase|order|total|amount|fare|price|ticket)|(?:cancellation|restocking)\s+fee)",
    )
});

static REFUND_OF_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\brefund\s+of\s+(?:up\s+to\s+)?\d{1,2}\s?%"));

static PARTIAL_REFUND: &[Signal] = &[Signal {
    card: "partial_refund_only",
    tag: "partial_refund",
    phrases: &[
        "partial refund",
        "restocking fee",
        "cancellation fee will be deducted",
        "less a cancellation fee",
        "less any cancellation fee",
        "minus a cancellation fee",
        "refund minus",
    ],
    patterns: &[&PERCENT_REFUND, &REFUND_OF_PERCENT],
    negatable: false,
}];

const SPAN: &str = r"(?:(?P<lo>\d{1,3})\s*(?:-|to)\s*)?(?P<n>\d{1,3})\s+(?:business\s+|working\s+|calendar\s+)?(?P<unit>days?|weeks?|months?)";

/// "refunds may take up to 30 business days"
static SLOW_AFTER_REFUND: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"\brefunds?\b[^.!?]{{0,80}}?\b(?:take|takes|taking|allow|processed\s+(?:in|within)|issued\s+(?:in|within)|credited\s+(?:in|within))\s+(?:up\s+to\s+)?{SPAN}"
    ))
});

/// "allow 4-6 weeks for your refund"
static SLOW_BEFORE_REFUND: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"\ballow\s+(?:up\s+to\s+)?{SPAN}\s+for\s+(?:your\s+|the\s+|a\s+)?refund"
    ))
});

const SLOW_PHRASES: &[&str] = &[
    "refunds may take several weeks",
    "refund may take several weeks",
    "allow several weeks for",
    "several weeks to process",
];

/// Refund timelines of at least ten days, two weeks, or any number of months.
fn is_slow(count: u32, unit: &str) -> bool {
    if unit.starts_with('m') {
        count >= 1
    } else if unit.starts_with('w') {
        count >= 2
    } else {
        count >= 10
    }
}

fn slow_processing_hits(text: &str) -> Vec<String> {
    let mut hits: Vec<String> = Vec::new();
    for phrase in SLOW_PHRASES {
        if text.contains(phrase) {
            push_unique(&mut hits, phrase);
        }
    }
    for re in [&SLOW_AFTER_REFUND, &SLOW_BEFORE_REFUND] {
        for caps in re.captures_iter(text) {
            let (Some(n), Some(unit), Some(whole)) = (caps.name("n"), caps.name("unit"), caps.get(0))
            else {
                continue;
            };
            let Ok(count) = n.as_str().parse::<u32>() else {
                continue;
            };
            if is_slow(count, unit.as_str()) {
                push_unique(&mut hits, whole.as_str());
            }
        }
    }
    hits
}

/// Partial-refund language wins over slow-processing language.
pub(crate) fn detect_refund_terms(
    snapshot: &PageSnapshot,
    cx: &RuleContext<'_>,
) -> Option<DetectedRisk> {
    let text = &snapshot.normalized_text;
    if let Some((signal, hits)) = select(PARTIAL_REFUND, text) {
        let mut tags = signal.tags();
        if PERCENT_REFUND.is_match(text) || REFUND_OF_PERCENT.is_match(text) {
            tags.push("percentage".to_string());
        }
        return cx.finding(snapshot, signal.card, &hits, tags);
    }

    let hits = slow_processing_hits(text);
    if hits.is_empty() {
        return None;
    }
    cx.finding(
        snapshot,
        "slow_refund_processing",
        &hits,
        vec!["slow_processing".to_string()],
    )
}
