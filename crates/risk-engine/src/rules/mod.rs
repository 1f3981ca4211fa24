/// Rule catalog.
///
/// A catalog is an ordered list of independent detectors. Each detector maps a
/// snapshot to at most one finding, resolving its card through the registry and
/// its evidence through the extractor. Detectors share no state, so a fault in
/// one (a panic) is caught, logged and treated as "no finding" without
/// affecting the others.
///
/// Detectors that choose between several cards do so through a decision table:
/// an ordered slice of [`Signal`] rows where the first row whose keyword subset
/// is present wins.
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{error, warn};

use crate::evidence::extract_evidence_where;
use crate::model::{DetectedRisk, PageSnapshot};
use crate::registry::RiskCardRegistry;

mod currency;
mod fees;
mod legal;
mod license;
mod privacy;
mod refund;
mod subscription;

pub use refund::CancellationWindow;

pub type DetectFn = fn(&PageSnapshot, &RuleContext<'_>) -> Option<DetectedRisk>;

/// A named detector function.
#[derive(Clone, Copy)]
pub struct Detector {
    pub name: &'static str,
    pub evaluate: DetectFn,
}

impl Detector {
    pub const fn new(name: &'static str, evaluate: DetectFn) -> Self {
        Self { name, evaluate }
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector").field("name", &self.name).finish()
    }
}

/// Read-only collaborators handed to every detector.
pub struct RuleContext<'a> {
    pub registry: &'a RiskCardRegistry,
    pub max_evidence: usize,
}

impl RuleContext<'_> {
    /// Build a finding for `card_id`, with evidence for `phrases`.
    ///
    /// An unknown card is a catalog misconfiguration: it is logged and the
    /// finding is dropped.
    pub fn finding<S: AsRef<str>>(
        &self,
        snapshot: &PageSnapshot,
        card_id: &str,
        phrases: &[S],
        tags: Vec<String>,
    ) -> Option<DetectedRisk> {
        self.build(snapshot, card_id, phrases, tags, |_, _| true)
    }

    /// Like `finding`, but for a decision-table row: when the row is
    /// negatable, denied occurrences are never quoted as evidence.
    pub(crate) fn signal_finding<S: AsRef<str>>(
        &self,
        snapshot: &PageSnapshot,
        signal: &Signal,
        phrases: &[S],
        tags: Vec<String>,
    ) -> Option<DetectedRisk> {
        if signal.negatable {
            self.build(snapshot, signal.card, phrases, tags, |text, pos| {
                !is_negated(text, pos)
            })
        } else {
            self.finding(snapshot, signal.card, phrases, tags)
        }
    }

    fn build<S, F>(
        &self,
        snapshot: &PageSnapshot,
        card_id: &str,
        phrases: &[S],
        tags: Vec<String>,
        keep: F,
    ) -> Option<DetectedRisk>
    where
        S: AsRef<str>,
        F: Fn(&str, usize) -> bool,
    {
        let Some(card) = self.registry.lookup(card_id) else {
            warn!(card_id, "unknown risk card, dropping finding");
            return None;
        };
        let evidence = extract_evidence_where(
            &snapshot.normalized_text,
            &snapshot.raw_text,
            phrases,
            self.max_evidence,
            keep,
        );
        Some(DetectedRisk::from_card(card, evidence, tags))
    }
}

/// Ordered, frozen set of detectors.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    detectors: Vec<Detector>,
}

impl RuleCatalog {
    pub fn new(detectors: Vec<Detector>) -> Self {
        Self { detectors }
    }

    /// The built-in detectors, in evaluation order.
    pub fn builtin() -> Self {
        Self::new(vec![
            Detector::new("non_refundable", refund::detect_non_refundable),
            Detector::new("cancellation_window", refund::detect_cancellation_window),
            Detector::new("refund_terms", refund::detect_refund_terms),
            Detector::new("currency_markup", currency::detect_currency_markup),
            Detector::new("arbitration", legal::detect_arbitration),
            Detector::new("class_action_waiver", legal::detect_class_action_waiver),
            Detector::new("auto_renewal", subscription::detect_auto_renewal),
            Detector::new("trial_conversion", subscription::detect_trial_conversion),
            Detector::new("unilateral_changes", legal::detect_unilateral_changes),
            Detector::new("mandatory_fees", fees::detect_mandatory_fees),
            Detector::new("data_sharing", privacy::detect_data_sharing),
            Detector::new("content_license", license::detect_content_license),
        ])
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Run every detector against `snapshot`, in catalog order.
    pub fn run(&self, snapshot: &PageSnapshot, cx: &RuleContext<'_>) -> Vec<DetectedRisk> {
        self.detectors
            .iter()
            .filter_map(|detector| run_isolated(detector, snapshot, cx))
            .collect()
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn run_isolated(
    detector: &Detector,
    snapshot: &PageSnapshot,
    cx: &RuleContext<'_>,
) -> Option<DetectedRisk> {
    match panic::catch_unwind(AssertUnwindSafe(|| (detector.evaluate)(snapshot, cx))) {
        Ok(finding) => finding,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(detector = detector.name, message, "detector failed, skipping");
            None
        }
    }
}

/// One decision-table row: the card selected when any of its phrases or
/// patterns is present in the normalized text.
pub(crate) struct Signal {
    pub card: &'static str,
    pub tag: &'static str,
    pub phrases: &'static [&'static str],
    pub patterns: &'static [&'static LazyLock<Regex>],
    /// Ignore hits preceded by a negation ("we do not sell ...").
    pub negatable: bool,
}

impl Signal {
    /// Distinct matched phrases and pattern matches, in priority order.
    pub(crate) fn hits(&self, text: &str) -> Vec<String> {
        let mut hits: Vec<String> = Vec::new();
        for phrase in self.phrases {
            let present = text
                .match_indices(phrase)
                .any(|(pos, _)| !(self.negatable && is_negated(text, pos)));
            if present {
                hits.push(phrase.to_string());
            }
        }
        for pattern in self.patterns {
            for m in pattern.find_iter(text) {
                if self.negatable && is_negated(text, m.start()) {
                    continue;
                }
                push_unique(&mut hits, m.as_str());
            }
        }
        hits
    }

    pub(crate) fn tags(&self) -> Vec<String> {
        vec![self.tag.to_string()]
    }
}

/// First row of `table` with any hit, together with its hits.
pub(crate) fn select<'t>(table: &'t [Signal], text: &str) -> Option<(&'t Signal, Vec<String>)> {
    table.iter().find_map(|row| {
        let hits = row.hits(text);
        (!hits.is_empty()).then_some((row, hits))
    })
}

pub(crate) fn push_unique(hits: &mut Vec<String>, hit: &str) {
    let hit = hit.trim();
    if !hit.is_empty() && !hits.iter().any(|h| h == hit) {
        hits.push(hit.to_string());
    }
}

const NEGATION_WINDOW: usize = 24;
/// Cues that must start a word ("no " is not the tail of "casino ").
const NEGATIONS: &[&str] = &[
    "not ",
    "never ",
    "no longer ",
    "no ",
    "cannot ",
    "without ",
    "free of ",
    "zero ",
];
/// Contracted cues, matched anywhere ("don't", "won’t").
const CONTRACTIONS: &[&str] = &["n't ", "n’t "];
const CLAUSE_BREAKS: &[char] = &[';', ':', ',', '.', '!', '?'];

/// Whether the hit at byte offset `pos` is denied by a cue shortly before it
/// in the same clause.
pub(crate) fn is_negated(text: &str, pos: usize) -> bool {
    let mut from = pos.saturating_sub(NEGATION_WINDOW);
    while !text.is_char_boundary(from) {
        from -= 1;
    }
    if let Some(cut) = text[from..pos].rfind(CLAUSE_BREAKS) {
        from += cut + 1;
    }

    let window: String = text[from..pos]
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    if CONTRACTIONS.iter().any(|cue| window.contains(cue)) {
        return true;
    }
    NEGATIONS.iter().any(|cue| {
        window.match_indices(cue).any(|(i, _)| {
            let before = if i == 0 {
                text[..from].chars().next_back()
            } else {
                window[..i].chars().next_back()
            };
            !before.is_some_and(char::is_alphanumeric)
        })
    })
}

/// Compile a built-in pattern.
pub(crate) fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("valid regex")
}

/// Parse a small count written as digits or as an English word.
pub(crate) fn parse_count(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    let n = match raw.replace(['-', ' '], "").as_str() {
        "one" | "a" | "an" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "ten" => 10,
        "fourteen" => 14,
        "thirty" => 30,
        "twentyfour" => 24,
        "fortyeight" => 48,
        "seventytwo" => 72,
        _ => return None,
    };
    Some(n)
}
