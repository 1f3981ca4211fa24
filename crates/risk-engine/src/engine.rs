/// Engine facade.
///
/// Wires the card registry, the rule catalog and the configuration together,
/// and reduces the detectors' findings into a single `RiskResult`. The engine
/// holds no mutable state: the same snapshot always yields the same result.
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::content;
use crate::error::EngineError;
use crate::merge;
use crate::model::{PageSnapshot, RiskResult};
use crate::popup;
use crate::registry::RiskCardRegistry;
use crate::rules::{RuleCatalog, RuleContext};
use crate::scoring;

/// Results for a main page and its policy pages.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSet {
    pub documents: Vec<RiskResult>,
    pub merged: RiskResult,
}

#[derive(Clone)]
pub struct RiskEngine {
    registry: Arc<RiskCardRegistry>,
    catalog: RuleCatalog,
    config: EngineConfig,
}

impl RiskEngine {
    pub fn new(registry: Arc<RiskCardRegistry>, catalog: RuleCatalog, config: EngineConfig) -> Self {
        Self {
            registry,
            catalog,
            config,
        }
    }

    /// Build an engine with the built-in detectors, loading the card catalog
    /// from `config.risk_cards_path` when set.
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        let registry = match &config.risk_cards_path {
            Some(path) => {
                let registry = RiskCardRegistry::load(path)?;
                info!(path = %path.display(), cards = registry.len(), "loaded risk card catalog");
                registry
            }
            None => RiskCardRegistry::builtin(),
        };
        Ok(Self::new(Arc::new(registry), RuleCatalog::builtin(), config))
    }

    pub fn registry(&self) -> &RiskCardRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every detector against `snapshot` and score the findings.
    pub fn evaluate(&self, snapshot: &PageSnapshot) -> RiskResult {
        let snapshot = snapshot.prepared();
        let cx = RuleContext {
            registry: &self.registry,
            max_evidence: self.config.max_evidence,
        };
        let risks = self.catalog.run(&snapshot, &cx);

        let category_scores = scoring::category_scores(&risks);
        let risk_score = scoring::risk_score(&category_scores);
        let overall_level = scoring::overall_level(risk_score);
        #[allow(deprecated)]
        let legacy_score = scoring::legacy_score(&risks);

        let page_mode = content::classify_page(&snapshot, &self.config.content);
        let has_meaningful_content =
            content::has_meaningful_content(page_mode, snapshot.text_len(), &self.config.content);

        debug!(
            url = %snapshot.url,
            findings = risks.len(),
            risk_score,
            ?overall_level,
            ?page_mode,
            has_meaningful_content,
            "evaluated page"
        );

        RiskResult {
            risks,
            category_scores,
            risk_score,
            overall_level,
            has_meaningful_content,
            page_mode,
            legacy_score,
        }
    }

    /// Reject page text longer than `max_input_chars`.
    pub fn check_input(&self, snapshot: &PageSnapshot) -> Result<(), EngineError> {
        let max = self.config.max_input_chars;
        let chars = snapshot.raw_text.chars().count();
        if chars > max {
            warn!(url = %snapshot.url, chars, max, "page text over size limit");
            return Err(EngineError::InputTooLarge { chars, max });
        }
        Ok(())
    }

    /// Evaluate a main page together with its policy pages. Per-document
    /// results are kept in input order, main page first; the merged page mode
    /// is the main page's.
    pub fn evaluate_document_set(
        &self,
        main: &PageSnapshot,
        policies: &[PageSnapshot],
    ) -> DocumentSet {
        let documents: Vec<RiskResult> = std::iter::once(main)
            .chain(policies)
            .map(|snapshot| self.evaluate(snapshot))
            .collect();
        let merged = merge::merge_results(&documents);
        DocumentSet { documents, merged }
    }

    /// Merged result of `evaluate_document_set`.
    pub fn evaluate_documents(&self, main: &PageSnapshot, policies: &[PageSnapshot]) -> RiskResult {
        self.evaluate_document_set(main, policies).merged
    }

    /// Popup gate using the configured minimum score.
    pub fn should_auto_popup(&self, result: &RiskResult) -> bool {
        popup::should_auto_popup(result, result.page_mode, self.config.popup_min_score)
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(
            Arc::new(RiskCardRegistry::builtin()),
            RuleCatalog::builtin(),
            EngineConfig::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{collapse_whitespace, MAX_SNIPPET_CHARS};
    use crate::model::{Category, OverallLevel, PageMode, Severity};

    const FILLER: &str = "Welcome to our store. We sell handmade goods shipped worldwide. \
        Orders are packed with care and sent with tracking. Contact support any time. ";

    fn padded(text: &str) -> String {
        format!("{}{text} {}", FILLER.repeat(5), FILLER.repeat(5))
    }

    #[test]
    fn empty_text_is_a_zero_risk_result() {
        let engine = RiskEngine::default();
        let result = engine.evaluate(&PageSnapshot::new("https://shop.test/", ""));
        assert!(result.risks.is_empty());
        assert_eq!(result.risk_score, 0);
        assert_eq!(result.overall_level, OverallLevel::Low);
        assert!(!result.has_meaningful_content);
        assert_eq!(result.legacy_score, 0);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["risks"], serde_json::json!([]));
        assert_eq!(json["riskScore"], 0);
        assert_eq!(json["overallLevel"], "LOW");
        assert_eq!(json["hasMeaningfulContent"], false);
    }

    #[test]
    fn non_refundable_booking_scores_high() {
        let engine = RiskEngine::default();
        let result = engine.evaluate(&PageSnapshot::new(
            "https://hotel.test/checkout",
            "This booking is strictly NON-REFUNDABLE",
        ));
        let risk = result.find("non_refundable_or_final_sale").unwrap();
        assert_eq!(risk.severity, Severity::High);
        assert_eq!(result.category_scores.financial, 80);
        assert_eq!(result.risk_score, 80);
        assert_eq!(result.overall_level, OverallLevel::High);
    }

    #[test]
    fn arbitration_scenario() {
        let engine = RiskEngine::default();
        let result = engine.evaluate(&PageSnapshot::new(
            "https://shop.test/terms",
            "All disputes are subject to binding arbitration. You waive your right to a jury trial.",
        ));
        let risk = result.find("mandatory_arbitration").unwrap();
        assert_eq!(risk.category, Category::LegalRights);
        assert_eq!(risk.severity, Severity::High);
        assert_eq!(result.category_scores.legal_rights, 80);
    }

    #[test]
    fn currency_markers_without_conversion_language() {
        let engine = RiskEngine::default();
        let snapshot = PageSnapshot::new(
            "https://shop.test/cart",
            "Subtotal USD 40.00. Also shown as CAD 54.00 for reference.",
        )
        .with_currency_markers(["USD", "CAD"]);
        let result = engine.evaluate(&snapshot);
        assert!(result.find("dcc_or_fx_markup").is_none());
    }

    #[test]
    fn login_page_is_auth_and_not_meaningful() {
        let engine = RiskEngine::default();
        let snapshot = PageSnapshot::new(
            "https://shop.test/login",
            "Sign in. All sales are final. Binding arbitration.",
        );
        assert_eq!(snapshot.text_len(), 50);
        let result = engine.evaluate(&snapshot);
        assert_eq!(result.page_mode, PageMode::Auth);
        assert!(!result.has_meaningful_content);
        assert!(!result.risks.is_empty());
        assert!(!engine.should_auto_popup(&result));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let engine = RiskEngine::default();
        let snapshot = PageSnapshot::new(
            "https://shop.test/terms",
            padded("Your plan renews automatically. We may sell your personal data."),
        );
        assert_eq!(engine.evaluate(&snapshot), engine.evaluate(&snapshot));
    }

    #[test]
    fn evidence_is_bounded_and_verbatim() {
        let engine = RiskEngine::default();
        let raw = padded(
            "Tickets are NON-REFUNDABLE.\nYou may cancel within 24 hours of purchase.   A 50% refund \
             of the booking applies after that. Your membership renews automatically each year at \
             the regular price. A resort fee of $35.00 per night is payable at the property. We \
             may modify these terms at any time. You waive all moral rights in your submissions.",
        );
        let snapshot = PageSnapshot::new("https://shop.test/terms", raw.clone());
        let result = engine.evaluate(&snapshot);
        assert!(result.risks.len() >= 6, "{:#?}", result.risks);

        let haystack = collapse_whitespace(&raw);
        for risk in &result.risks {
            assert!(!risk.evidence.is_empty(), "no evidence for {}", risk.id);
            assert!(risk.evidence.len() <= engine.config().max_evidence);
            for snippet in &risk.evidence {
                assert!(!snippet.is_empty());
                assert!(snippet.chars().count() <= MAX_SNIPPET_CHARS);
                let core = collapse_whitespace(snippet.trim_matches('…'));
                assert!(haystack.contains(&core), "{snippet:?} not in page text");
            }
        }
    }

    #[test]
    fn scores_follow_findings() {
        let engine = RiskEngine::default();
        let result = engine.evaluate(&PageSnapshot::new(
            "https://shop.test/terms",
            padded("We may share your data with third parties. Refunds take up to 6 weeks."),
        ));
        for (category, score) in result.category_scores.iter() {
            let expected = result
                .risks
                .iter()
                .filter(|r| r.category == category)
                .map(|r| r.score())
                .max()
                .unwrap_or(0);
            assert_eq!(score, expected);
        }
        assert_eq!(result.risk_score, result.category_scores.max());
        assert_eq!(result.overall_level, OverallLevel::from_score(result.risk_score));
        assert!(result.has_meaningful_content);
        assert_eq!(result.page_mode, PageMode::ContentRich);
    }

    #[test]
    fn popup_for_meaningful_page_with_worthy_finding() {
        let engine = RiskEngine::default();
        let result = engine.evaluate(&PageSnapshot::new(
            "https://shop.test/checkout",
            padded("All sales are final."),
        ));
        assert!(result.has_meaningful_content);
        assert!(engine.should_auto_popup(&result));

        let quiet = engine.evaluate(&PageSnapshot::new(
            "https://shop.test/checkout",
            padded("Refunds take up to 6 weeks."),
        ));
        assert!(!engine.should_auto_popup(&quiet));
    }

    #[test]
    fn documents_are_merged_with_main_page_mode() {
        let engine = RiskEngine::default();
        let main = PageSnapshot::new("https://shop.test/checkout", "Pay now. Total $20.");
        let policies = vec![PageSnapshot::new(
            "https://shop.test/terms",
            padded("Disputes are resolved by binding arbitration."),
        )];
        let merged = engine.evaluate_documents(&main, &policies);
        assert_eq!(merged.page_mode, PageMode::LowContent);
        assert!(merged.has_meaningful_content);
        assert!(merged.find("mandatory_arbitration").is_some());
        assert_eq!(merged.overall_level, OverallLevel::High);
    }

    #[test]
    fn document_set_keeps_each_result() {
        let engine = RiskEngine::default();
        let main = PageSnapshot::new("https://shop.test/checkout", "All sales are final.");
        let policies = vec![
            PageSnapshot::new("https://shop.test/terms", "Disputes go to binding arbitration."),
            PageSnapshot::new("https://shop.test/about", "We love our customers."),
        ];
        let set = engine.evaluate_document_set(&main, &policies);
        assert_eq!(set.documents.len(), 3);
        assert!(set.documents[0].find("non_refundable_or_final_sale").is_some());
        assert!(set.documents[1].find("mandatory_arbitration").is_some());
        assert!(set.documents[2].risks.is_empty());
        assert_eq!(set.merged.risks.len(), 2);
        assert_eq!(set.merged, engine.evaluate_documents(&main, &policies));
    }

    #[test]
    fn oversize_text_is_rejected() {
        let engine = RiskEngine::new(
            Arc::new(RiskCardRegistry::builtin()),
            RuleCatalog::builtin(),
            EngineConfig {
                max_input_chars: 10,
                ..Default::default()
            },
        );
        assert!(engine
            .check_input(&PageSnapshot::new("https://shop.test/", "Final sale"))
            .is_ok());
        let err = engine
            .check_input(&PageSnapshot::new("https://shop.test/", "All sales are final."))
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::InputTooLarge { chars: 20, max: 10 }));
    }

    #[test]
    fn missing_normalized_text_is_derived() {
        let engine = RiskEngine::default();
        let snapshot: PageSnapshot =
            serde_json::from_value(serde_json::json!({ "rawText": "All sales are FINAL." }))
                .unwrap();
        assert!(snapshot.normalized_text.is_empty());
        let result = engine.evaluate(&snapshot);
        assert!(result.find("non_refundable_or_final_sale").is_some());
    }

    #[test]
    fn custom_catalog_from_config() {
        let dir = std::env::temp_dir().join(format!("risk-engine-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cards.json");
        std::fs::write(
            &path,
            r#"[{"id":"class_action_waiver","category":"legal_rights","title":"Class actions",
                "defaultDescription":"Custom.","severity":"low"}]"#,
        )
        .unwrap();

        let engine = RiskEngine::from_config(EngineConfig {
            risk_cards_path: Some(path.clone()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(engine.registry().len(), 1);
        let result = engine.evaluate(&PageSnapshot::new(
            "https://shop.test/terms",
            "Class action waiver. All sales are final.",
        ));
        let ids: Vec<&str> = result.risks.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["class_action_waiver"]);
        assert_eq!(result.risk_score, 25);

        std::fs::remove_dir_all(&dir).ok();
    }
}
