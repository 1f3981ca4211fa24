use super::{push_unique, select, RuleContext, Signal};
use crate::model::{DetectedRisk, PageSnapshot};

static AUTO_RENEWAL: &[Signal] = &[Signal {
    card: "auto_renewal_subscription",
    tag: "auto_renewal",
    phrases: &[
        "auto-renew",
        "auto renew",
        "autorenew",
        "automatically renew",
        "renews automatically",
        "renew automatically",
        "automatic renewal",
        "recurring billing",
        "recurring charge",
        "recurring payment",
        "billed automatically",
        "charged automatically",
        "automatically charged",
        "automatically billed",
        "continuous subscription",
    ],
    patterns: &[],
    negatable: true,
}];

pub(crate) fn detect_auto_renewal(
    snapshot: &PageSnapshot,
    cx: &RuleContext<'_>,
) -> Option<DetectedRisk> {
    let (signal, hits) = select(AUTO_RENEWAL, &snapshot.normalized_text)?;
    cx.signal_finding(snapshot, signal, &hits, signal.tags())
}

static TRIAL: &[Signal] = &[Signal {
    card: "trial_converts_to_paid",
    tag: "trial",
    phrases: &[
        "free trial",
        "trial period",
        "trial ends",
        "trial expires",
        "introductory offer",
        "introductory price",
        "promotional period",
        "after the trial",
    ],
    patterns: &[],
    negatable: false,
}];

static CONVERSION: &[Signal] = &[Signal {
    card: "trial_converts_to_paid",
    tag: "converts_to_paid",
    phrases: &[
        "will be charged",
        "automatically convert",
        "converts to a paid",
        "convert to a paid",
        "charged the full",
        "charged the regular",
        "regular price",
        "full price",
        "then $",
        "after your trial",
        "at the end of your trial",
        "when your trial ends",
        "unless you cancel before",
    ],
    patterns: &[],
    negatable: true,
}];

/// A trial offer alone is not a risk; it needs language saying it turns into
/// a paid plan.
pub(crate) fn detect_trial_conversion(
    snapshot: &PageSnapshot,
    cx: &RuleContext<'_>,
) -> Option<DetectedRisk> {
    let text = &snapshot.normalized_text;
    let (trial, trial_hits) = select(TRIAL, text)?;
    let (conversion, conversion_hits) = select(CONVERSION, text)?;

    let mut hits = trial_hits;
    for hit in &conversion_hits {
        push_unique(&mut hits, hit);
    }
    cx.signal_finding(
        snapshot,
        conversion,
        &hits,
        vec![trial.tag.to_string(), conversion.tag.to_string()],
    )
}
