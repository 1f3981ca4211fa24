use std::sync::LazyLock;

use regex::Regex;

use super::{pattern, select, RuleContext, Signal};
use crate::model::{DetectedRisk, PageSnapshot};

static MAY_SELL: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\b(?:we|company)\s+(?:may|can|will|might)\s+(?:also\s+)?sell\b[^.!?]{0,40}?\b(?:data|information)\b",
    )
});

static SHARED_WITH: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\b(?:share|shared|disclose|disclosed|transfer|transferred)\b[^.!?]{0,60}?\bwith\s+(?:our\s+|selected\s+|trusted\s+)*(?:third[\s-]part(?:y|ies)|partners|advertisers|affiliates|vendors)\b",
    )
});

static DATA_PRACTICES: &[Signal] = &[
    Signal {
        card: "personal_data_sale",
        tag: "data_sale",
        phrases: &[
            "sell your personal information",
            "sell your personal data",
            "sell your data",
            "sell your information",
            "sale of your personal information",
            "sale of personal information",
            "sale of your personal data",
            "sale of personal data",
            "sold to third parties",
        ],
        patterns: &[&MAY_SELL],
        negatable: true,
    },
    Signal {
        card: "data_sharing_third_parties",
        tag: "data_sharing",
        phrases: &[
            "share your personal information",
            "share your personal data",
            "share your information",
            "share your data",
            "shared with third parties",
            "share with third parties",
            "disclose your personal information",
            "third-party partners",
            "advertising partners",
            "marketing partners",
        ],
        patterns: &[&SHARED_WITH],
        negatable: true,
    },
];

/// Sale of personal data outranks sharing; denials ("we do not sell") are
/// skipped, so a page that only denies selling can still raise sharing.
pub(crate) fn detect_data_sharing(
    snapshot: &PageSnapshot,
    cx: &RuleContext<'_>,
) -> Option<DetectedRisk> {
    let (signal, hits) = select(DATA_PRACTICES, &snapshot.normalized_text)?;
    cx.signal_finding(snapshot, signal, &hits, signal.tags())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{page, run_one};
    use super::*;
    use crate::model::{Category, Severity};

    #[test]
    fn sale_outranks_sharing() {
        let risk = run_one(
            detect_data_sharing,
            &page("We share your information with partners. We may sell your personal data."),
        )
        .unwrap();
        assert_eq!(risk.id, "personal_data_sale");
        assert_eq!(risk.category, Category::DataPrivacy);
        assert_eq!(risk.severity, Severity::High);
    }

    #[test]
    fn denial_of_sale_falls_back_to_sharing() {
        let risk = run_one(
            detect_data_sharing,
            &page(
                "We do not sell your personal information. We share data with our advertising partners.",
            ),
        )
        .unwrap();
        assert_eq!(risk.id, "data_sharing_third_parties");
        assert_eq!(risk.evidence.len(), 1);
        assert!(risk.evidence[0].contains("advertising partners"));
    }

    #[test]
    fn full_denial_is_quiet() {
        assert!(run_one(
            detect_data_sharing,
            &page("We never sell your data and we don't share your data with anyone.")
        )
        .is_none());
    }

    #[test]
    fn evidence_skips_the_denial() {
        let risk = run_one(
            detect_data_sharing,
            &page("We do not sell your data. We may sell your data to partners."),
        )
        .unwrap();
        assert_eq!(risk.id, "personal_data_sale");
        assert_eq!(risk.evidence, vec!["We may sell your data to partners."]);
    }
}
