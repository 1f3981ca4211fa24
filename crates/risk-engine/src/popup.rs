use crate::model::{PageMode, RiskResult};

/// Whether a result justifies surfacing the risk panel without the user
/// asking for it.
///
/// Auth pages and pages without meaningful content never pop up. Otherwise
/// the score must reach `min_score` and at least one finding must come from
/// an auto-popup-worthy card.
pub fn should_auto_popup(result: &RiskResult, page_mode: PageMode, min_score: u8) -> bool {
    if page_mode == PageMode::Auth || !result.is_actionable() {
        return false;
    }
    result.risk_score >= min_score && result.risks.iter().any(|risk| risk.auto_popup_worthy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, DetectedRisk, Severity};

    fn result(score: u8, popup_worthy: bool) -> RiskResult {
        RiskResult {
            risks: vec![DetectedRisk {
                id: "x".to_string(),
                category: Category::Financial,
                title: "X".to_string(),
                description: String::new(),
                severity: Severity::High,
                auto_popup_worthy: popup_worthy,
                evidence: vec![],
                tags: vec![],
            }],
            risk_score: score,
            has_meaningful_content: true,
            page_mode: PageMode::ContentRich,
            ..Default::default()
        }
    }

    #[test]
    fn popup_needs_score_and_worthy_finding() {
        assert!(should_auto_popup(&result(80, true), PageMode::ContentRich, 50));
        assert!(should_auto_popup(&result(50, true), PageMode::ContentRich, 50));
        assert!(!should_auto_popup(&result(49, true), PageMode::ContentRich, 50));
        assert!(!should_auto_popup(&result(80, false), PageMode::ContentRich, 50));
    }

    #[test]
    fn auth_and_meaningless_pages_never_pop_up() {
        assert!(!should_auto_popup(&result(80, true), PageMode::Auth, 0));

        let mut quiet = result(80, true);
        quiet.has_meaningful_content = false;
        assert!(!should_auto_popup(&quiet, PageMode::LowContent, 0));
    }

    #[test]
    fn empty_result_never_pops_up() {
        assert!(!should_auto_popup(&RiskResult::default(), PageMode::ContentRich, 0));
    }
}
