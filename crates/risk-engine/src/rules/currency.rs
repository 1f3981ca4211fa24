use super::{select, RuleContext, Signal};
use crate::model::{DetectedRisk, PageSnapshot};

static CONVERSION_LANGUAGE: &[Signal] = &[Signal {
    card: "dcc_or_fx_markup",
    tag: "conversion_language",
    phrases: &[
        "dynamic currency conversion",
        "currency conversion",
        "conversion fee",
        "conversion rate",
        "conversion markup",
        "currency markup",
        "exchange rate",
        "foreign exchange",
        "foreign transaction fee",
        "converted at",
        "converted into",
        "pay in your local currency",
        "pay in your currency",
        "fx fee",
        "fx markup",
        "cross-border fee",
        "cross border fee",
    ],
    patterns: &[],
    negatable: false,
}];

/// Fires only when the page shows prices in at least two currencies and also
/// talks about converting between them.
pub(crate) fn detect_currency_markup(
    snapshot: &PageSnapshot,
    cx: &RuleContext<'_>,
) -> Option<DetectedRisk> {
    let markers = snapshot.distinct_currency_markers();
    if markers < 2 {
        return None;
    }
    let (signal, hits) = select(CONVERSION_LANGUAGE, &snapshot.normalized_text)?;
    cx.finding(
        snapshot,
        signal.card,
        &hits,
        vec![
            "multi_currency".to_string(),
            signal.tag.to_string(),
            format!("markers:{markers}"),
        ],
    )
}
