use std::sync::LazyLock;

use regex::Regex;

use super::{pattern, push_unique, select, RuleContext, Signal};
use crate::model::{DetectedRisk, PageSnapshot};

static JURY_WAIVER: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\bwaiv\w*\b[^.!?]{0,40}?\b(?:jury\s+trial|trial\s+by\s+(?:a\s+)?jury)\b")
});

static ARBITRATION: &[Signal] = &[Signal {
    card: "mandatory_arbitration",
    tag: "arbitration",
    phrases: &[
        "binding arbitration",
        "mandatory arbitration",
        "individual arbitration",
        "resolved by arbitration",
        "resolved through arbitration",
        "settled by arbitration",
        "submitted to arbitration",
        "agree to arbitrate",
        "arbitration agreement",
    ],
    patterns: &[],
    negatable: false,
}];

static JURY: &[Signal] = &[Signal {
    card: "mandatory_arbitration",
    tag: "jury_waiver",
    phrases: &["jury trial waiver", "waiver of jury trial"],
    patterns: &[&JURY_WAIVER],
    negatable: false,
}];

/// Arbitration clauses, optionally with a jury-trial waiver. A jury waiver on
/// its own is enough to raise the card.
pub(crate) fn detect_arbitration(
    snapshot: &PageSnapshot,
    cx: &RuleContext<'_>,
) -> Option<DetectedRisk> {
    let text = &snapshot.normalized_text;
    let arbitration = select(ARBITRATION, text);
    let jury = select(JURY, text);

    let mut hits: Vec<String> = Vec::new();
    let mut tags: Vec<String> = Vec::new();
    for (signal, found) in arbitration.iter().chain(jury.iter()) {
        tags.push(signal.tag.to_string());
        for hit in found {
            push_unique(&mut hits, hit);
        }
    }
    if hits.is_empty() {
        return None;
    }
    cx.finding(snapshot, "mandatory_arbitration", &hits, tags)
}

static WAIVE_CLASS_ACTION: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\bwaiv\w*\b[^.!?]{0,60}?\b(?:class(?:\s+|-)action|class(?:\s+|-)wide|collective\s+action|representative\s+action)",
    )
});

static CLASS_ACTION_WAIVED: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\bclass(?:\s+|-)action\w*\b[^.!?]{0,60}?\b(?:are|is)\s+(?:hereby\s+)?(?:waived|not\s+permitted|prohibited)",
    )
});

static INDIVIDUAL_BASIS: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\b(?:only\s+)?(?:on\s+an\s+|in\s+(?:your|their)\s+)individual(?:\s+basis|\s+capacity)\b[^.!?]{0,60}?\bnot\s+as\s+a\s+(?:plaintiff|class\s+member|representative)",
    )
});

static CLASS_ACTION: &[Signal] = &[Signal {
    card: "class_action_waiver",
    tag: "class_action_waiver",
    phrases: &[
        "class action waiver",
        "no class actions",
        "no class action",
        "not participate in a class action",
    ],
    patterns: &[&WAIVE_CLASS_ACTION, &CLASS_ACTION_WAIVED, &INDIVIDUAL_BASIS],
    negatable: false,
}];

pub(crate) fn detect_class_action_waiver(
    snapshot: &PageSnapshot,
    cx: &RuleContext<'_>,
) -> Option<DetectedRisk> {
    let (signal, hits) = select(CLASS_ACTION, &snapshot.normalized_text)?;
    cx.finding(snapshot, signal.card, &hits, signal.tags())
}

static PARTY_MAY_CHANGE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\b(?:we|the\s+company|company)\s+(?:may|can|will|reserves?\s+the\s+right\s+to)\s+(?:at\s+any\s+time\s+)?(?:change|modify|update|amend|revise|alter)\b[^.!?]{0,60}?\b(?:terms|agreement|prices?|pricing|fees?|polic(?:y|ies)|rates?)\b",
    )
});

static RESERVES_RIGHT: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\breserves?\s+the\s+right\s+to\s+(?:change|modify|update|amend|revise|alter)\b[^.!?]{0,60}?\b(?:terms|agreement|prices?|pricing|fees?|polic(?:y|ies)|rates?)\b",
    )
});

static TERMS_SUBJECT_TO_CHANGE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\b(?:terms|prices?|fees?|rates?)\b[^.!?]{0,30}?\bsubject\s+to\s+change\b")
});

static UNILATERAL_CHANGES: &[Signal] = &[Signal {
    card: "unilateral_terms_changes",
    tag: "unilateral_changes",
    phrases: &[],
    patterns: &[&PARTY_MAY_CHANGE, &RESERVES_RIGHT, &TERMS_SUBJECT_TO_CHANGE],
    negatable: true,
}];

pub(crate) fn detect_unilateral_changes(
    snapshot: &PageSnapshot,
    cx: &RuleContext<'_>,
) -> Option<DetectedRisk> {
    let text = &snapshot.normalized_text;
    let (signal, hits) = select(UNILATERAL_CHANGES, text)?;
    let mut tags = signal.tags();
    if text.contains("without notice") || text.contains("without prior notice") {
        tags.push("without_notice".to_string());
    }
    if text.contains("sole discretion") {
        tags.push("sole_discretion".to_string());
    }
    cx.signal_finding(snapshot, signal, &hits, tags)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{page, run_one};
    use super::*;
    use crate::model::{Category, Severity};

    #[test]
    fn arbitration_with_jury_waiver() {
        let risk = run_one(
            detect_arbitration,
            &page(
                "Any dispute will be resolved by binding arbitration. You waive your right to a jury trial.",
            ),
        )
        .unwrap();
        assert_eq!(risk.id, "mandatory_arbitration");
        assert_eq!(risk.category, Category::LegalRights);
        assert_eq!(risk.severity, Severity::High);
        assert_eq!(risk.tags, vec!["arbitration", "jury_waiver"]);
        assert_eq!(risk.evidence.len(), 2);
    }

    #[test]
    fn jury_waiver_alone_raises_arbitration_card() {
        let risk = run_one(
            detect_arbitration,
            &page("Both parties waive any right to trial by jury."),
        )
        .unwrap();
        assert_eq!(risk.tags, vec!["jury_waiver"]);
    }

    #[test]
    fn court_language_is_quiet() {
        assert!(run_one(
            detect_arbitration,
            &page("Disputes are heard by the courts of Ontario.")
        )
        .is_none());
    }

    #[test]
    fn class_action_waiver_variants() {
        for text in [
            "You agree to waive any right to bring a class action.",
            "Class actions are not permitted under these terms.",
            "Claims may be brought only on an individual basis and not as a plaintiff in any class.",
            "CLASS ACTION WAIVER. Read carefully.",
        ] {
            let risk = run_one(detect_class_action_waiver, &page(text))
                .unwrap_or_else(|| panic!("no finding for {text:?}"));
            assert_eq!(risk.id, "class_action_waiver");
        }
    }

    #[test]
    fn unilateral_changes_with_notice_tags() {
        let risk = run_one(
            detect_unilateral_changes,
            &page("We may modify these Terms at any time, without notice, at our sole discretion."),
        )
        .unwrap();
        assert_eq!(risk.id, "unilateral_terms_changes");
        assert_eq!(
            risk.tags,
            vec!["unilateral_changes", "without_notice", "sole_discretion"]
        );
    }

    #[test]
    fn reserves_the_right_to_change_prices() {
        let risk = run_one(
            detect_unilateral_changes,
            &page("The Company reserves the right to change prices."),
        )
        .unwrap();
        assert_eq!(risk.id, "unilateral_terms_changes");
    }

    #[test]
    fn negated_change_clause_is_quiet() {
        assert!(run_one(
            detect_unilateral_changes,
            &page("We will not change the terms of an existing booking.")
        )
        .is_none());
    }
}
