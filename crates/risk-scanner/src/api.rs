/// Tool parameter and response types.
///
/// Every page-shaped parameter collapses into one `PageSnapshot` before it
/// reaches the engine.
use risk_engine::{PageSnapshot, RiskCardDefinition, RiskResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const MAX_POLICY_PAGES: usize = 10;

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct PageParams {
    /// Page URL; used to recognise login and signup pages.
    pub url: Option<String>,
    /// Visible page text, original casing preserved. May be empty.
    #[serde(default)]
    pub text: String,
    /// Currency codes or symbols found on the page (e.g. ["USD", "CAD"]).
    pub currency_markers: Option<Vec<String>>,
    /// Fee lines pulled from the page's price breakdown, if any.
    pub fee_lines: Option<Vec<String>>,
    /// Label echoed back in the response (e.g. "terms", "refund policy").
    pub doc_name: Option<String>,
}

impl PageParams {
    pub fn to_snapshot(&self) -> PageSnapshot {
        let mut snapshot = PageSnapshot::new(self.url.clone().unwrap_or_default(), self.text.clone());
        if let Some(markers) = &self.currency_markers {
            snapshot = snapshot.with_currency_markers(markers.iter().cloned());
        }
        if let Some(lines) = &self.fee_lines {
            snapshot = snapshot.with_fee_lines(lines.clone());
        }
        snapshot
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AnalyzeDocumentsParams {
    /// The page the user is looking at (checkout, booking, signup).
    pub main: PageParams,
    /// Linked policy pages such as terms of service or refund policy (max 10).
    #[serde(default)]
    pub policy_pages: Vec<PageParams>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetRiskCardParams {
    /// Risk card ID such as "mandatory_arbitration" (case-insensitive).
    pub risk_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListRiskCardsParams {
    /// Optional category filter: financial, data_privacy, content_ip or legal_rights.
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AnalyzePageResponse {
    pub doc_name: Option<String>,
    pub result: RiskResult,
    pub should_auto_popup: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DocumentSummary {
    pub doc_name: Option<String>,
    pub url: String,
    pub risk_ids: Vec<String>,
    pub risk_score: u8,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AnalyzeDocumentsResponse {
    /// Per-document breakdown, main page first.
    pub documents: Vec<DocumentSummary>,
    pub result: RiskResult,
    pub should_auto_popup: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RiskCardResponse {
    pub card: RiskCardDefinition,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RiskCardListResponse {
    pub category: Option<String>,
    pub cards: Vec<RiskCardDefinition>,
}
