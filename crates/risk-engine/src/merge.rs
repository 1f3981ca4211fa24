/// Merging of per-document results.
///
/// A purchase page is often evaluated together with its linked policy pages
/// (terms, refund policy, privacy policy). The merged result reads as if all
/// documents were one page, except that the page mode stays that of the main
/// document.
use crate::model::RiskResult;
use crate::scoring;

pub fn merge_results(results: &[RiskResult]) -> RiskResult {
    let Some(main) = results.first() else {
        return RiskResult::default();
    };

    let risks: Vec<_> = results.iter().flat_map(|r| r.risks.iter().cloned()).collect();

    let mut category_scores = main.category_scores;
    for result in &results[1..] {
        for (category, score) in result.category_scores.iter() {
            category_scores.raise(category, score);
        }
    }
    let risk_score = results.iter().map(|r| r.risk_score).max().unwrap_or(0);
    let overall_level = results
        .iter()
        .map(|r| r.overall_level)
        .max()
        .unwrap_or_default();

    #[allow(deprecated)]
    let legacy_score = scoring::legacy_score(&risks);

    RiskResult {
        risks,
        category_scores,
        risk_score,
        overall_level,
        has_meaningful_content: results.iter().any(|r| r.has_meaningful_content),
        page_mode: main.page_mode,
        legacy_score,
    }
}
