/// Risk card registry.
///
/// The registry is the static catalog every detector resolves its findings
/// against. It is built once (from the built-in table or from a JSON catalog
/// named in configuration), validated, and then shared read-only.
use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::warn;

use crate::error::EngineError;
use crate::model::{Category, RiskCardDefinition, Severity};

pub struct RiskCardRegistry {
    cards: Vec<RiskCardDefinition>,
    index: HashMap<String, usize>,
}

impl RiskCardRegistry {
    /// Build a registry from explicit definitions.
    ///
    /// Empty IDs, empty titles and duplicate IDs are rejected.
    pub fn from_definitions(cards: Vec<RiskCardDefinition>) -> Result<Self, EngineError> {
        let mut index = HashMap::with_capacity(cards.len());
        for (pos, card) in cards.iter().enumerate() {
            if card.id.trim().is_empty() {
                return Err(EngineError::InvalidCatalog(format!(
                    "card at position {pos} has an empty id"
                )));
            }
            if card.title.trim().is_empty() {
                return Err(EngineError::InvalidCatalog(format!(
                    "card '{}' has an empty title",
                    card.id
                )));
            }
            if index.insert(card.id.clone(), pos).is_some() {
                return Err(EngineError::InvalidCatalog(format!(
                    "duplicate card id '{}'",
                    card.id
                )));
            }
        }
        Ok(Self { cards, index })
    }

    /// Parse a JSON array of card definitions.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let cards: Vec<RiskCardDefinition> = serde_json::from_str(json)?;
        let registry = Self::from_definitions(cards)?;
        registry.warn_missing_builtin_ids();
        Ok(registry)
    }

    /// Load a JSON catalog from disk.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path).map_err(|source| EngineError::CatalogIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The built-in catalog.
    pub fn builtin() -> Self {
        let cards = BUILTIN_CARDS
            .iter()
            .map(|&(id, category, severity, auto_popup_worthy, title, description)| {
                RiskCardDefinition {
                    id: id.to_string(),
                    category,
                    title: title.to_string(),
                    default_description: description.to_string(),
                    severity,
                    auto_popup_worthy,
                }
            })
            .collect::<Vec<_>>();
        let index = cards
            .iter()
            .enumerate()
            .map(|(pos, card)| (card.id.clone(), pos))
            .collect();
        Self { cards, index }
    }

    pub fn lookup(&self, id: &str) -> Option<&RiskCardDefinition> {
        self.index.get(id).map(|&pos| &self.cards[pos])
    }

    /// Case-insensitive lookup, for IDs typed by people rather than detectors.
    pub fn lookup_ignore_case(&self, id: &str) -> Option<&RiskCardDefinition> {
        let id = id.trim();
        self.cards.iter().find(|card| card.id.eq_ignore_ascii_case(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RiskCardDefinition> {
        self.cards.iter()
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &RiskCardDefinition> {
        self.cards.iter().filter(move |card| card.category == category)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// A loaded catalog that drops built-in IDs silently disables the detectors
    /// that reference them; say so once at load time.
    fn warn_missing_builtin_ids(&self) {
        let present: HashSet<&str> = self.cards.iter().map(|c| c.id.as_str()).collect();
        for &(id, ..) in BUILTIN_CARDS {
            if !present.contains(id) {
                warn!(card_id = id, "catalog has no card for a built-in detector");
            }
        }
    }
}

impl Default for RiskCardRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

type CardRow = (&'static str, Category, Severity, bool, &'static str, &'static str);

const BUILTIN_CARDS: &[CardRow] = &[
    (
        "non_refundable_or_final_sale",
        Category::Financial,
        Severity::High,
        true,
        "Non-refundable or final sale",
        "Payments are non-refundable or all sales are final. You may not get your money back if plans change.",
    ),
    (
        "ultra_short_cancellation_window",
        Category::Financial,
        Severity::High,
        true,
        "Very short cancellation window",
        "Cancellations are only accepted within a window of a day or two. Missing it may forfeit your payment.",
    ),
    (
        "short_cancellation_window",
        Category::Financial,
        Severity::Med,
        false,
        "Short cancellation window",
        "Cancellations or returns are only accepted within a short period after purchase.",
    ),
    (
        "partial_refund_only",
        Category::Financial,
        Severity::Med,
        false,
        "Partial refund only",
        "Refunds may be limited to a percentage of what you paid, or reduced by cancellation fees.",
    ),
    (
        "slow_refund_processing",
        Category::Financial,
        Severity::Low,
        false,
        "Slow refund processing",
        "Refunds may take weeks to be processed and returned to you.",
    ),
    (
        "dcc_or_fx_markup",
        Category::Financial,
        Severity::Med,
        true,
        "Currency conversion markup",
        "Prices may be converted into another currency with an added exchange-rate markup or conversion fee.",
    ),
    (
        "auto_renewal_subscription",
        Category::Financial,
        Severity::Med,
        true,
        "Auto-renewing subscription",
        "Charges continue automatically each billing period unless you cancel in time.",
    ),
    (
        "trial_converts_to_paid",
        Category::Financial,
        Severity::Med,
        true,
        "Free trial converts to paid plan",
        "A free trial turns into a paid subscription and charges your payment method unless cancelled.",
    ),
    (
        "hidden_or_mandatory_fees",
        Category::Financial,
        Severity::Med,
        false,
        "Additional mandatory fees",
        "Extra fees may be added on top of the advertised price.",
    ),
    (
        "resort_or_facility_fee",
        Category::Financial,
        Severity::High,
        true,
        "Resort or facility fee",
        "A mandatory resort, facility or destination fee is charged in addition to the room rate.",
    ),
    (
        "data_sharing_third_parties",
        Category::DataPrivacy,
        Severity::Med,
        false,
        "Data shared with third parties",
        "Your personal information may be shared with partners, advertisers or other third parties.",
    ),
    (
        "personal_data_sale",
        Category::DataPrivacy,
        Severity::High,
        true,
        "Personal data may be sold",
        "The provider states it may sell your personal information.",
    ),
    (
        "broad_content_license",
        Category::ContentIp,
        Severity::Med,
        false,
        "Broad licence to your content",
        "You grant the provider a wide, often perpetual or irrevocable licence to content you upload.",
    ),
    (
        "moral_rights_waiver",
        Category::ContentIp,
        Severity::Low,
        false,
        "Moral rights waiver",
        "You waive moral rights such as attribution over content you submit.",
    ),
    (
        "mandatory_arbitration",
        Category::LegalRights,
        Severity::High,
        true,
        "Mandatory arbitration",
        "Disputes must go to binding arbitration instead of court, and you may give up a jury trial.",
    ),
    (
        "class_action_waiver",
        Category::LegalRights,
        Severity::High,
        true,
        "Class action waiver",
        "You give up the right to join a class action or collective lawsuit.",
    ),
    (
        "unilateral_terms_changes",
        Category::LegalRights,
        Severity::Med,
        false,
        "Provider can change terms",
        "The provider can change the terms, prices or fees at any time without your consent.",
    ),
];
