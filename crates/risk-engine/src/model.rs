use std::borrow::Cow;
use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One of the four fixed groupings used for scoring.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Financial,
    DataPrivacy,
    ContentIp,
    LegalRights,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Financial,
        Category::DataPrivacy,
        Category::ContentIp,
        Category::LegalRights,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Financial => "financial",
            Category::DataPrivacy => "data_privacy",
            Category::ContentIp => "content_ip",
            Category::LegalRights => "legal_rights",
        }
    }

    /// Parse a category key, accepting `-` or `_` separators in any case
    /// (e.g. "data-privacy", "LEGAL_RIGHTS").
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase().replace('-', "_");
        Category::ALL.into_iter().find(|c| c.as_str() == key)
    }
}

/// Card severity. Maps to a fixed score: low=25, med=50, high=80.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Med,
    High,
}

impl Severity {
    pub fn score(&self) -> u8 {
        match self {
            Severity::Low => 25,
            Severity::Med => 50,
            Severity::High => 80,
        }
    }
}

/// Overall level derived from the 0–100 risk score.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl OverallLevel {
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            OverallLevel::High
        } else if score >= 40 {
            OverallLevel::Medium
        } else {
            OverallLevel::Low
        }
    }
}

/// Classification of a page's purpose, used to suppress noise.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum PageMode {
    Auth,
    #[default]
    LowContent,
    ContentRich,
}

/// Text extracted from a page, plus whatever metadata the page scanner found.
///
/// Every field defaults when absent, and malformed values (wrong JSON type)
/// degrade to empty rather than failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PageSnapshot {
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    /// Text as it appeared on the page, original casing preserved.
    #[serde(deserialize_with = "lenient_string")]
    pub raw_text: String,
    /// Lowercased, whitespace-collapsed copy of `raw_text`.
    #[serde(deserialize_with = "lenient_string")]
    pub normalized_text: String,
    /// Currency codes or symbols seen on the page (e.g. "USD", "€").
    #[serde(deserialize_with = "lenient_string_set")]
    pub currency_markers: BTreeSet<String>,
    /// Site-specific fee lines pulled out of price breakdowns, when available.
    #[serde(deserialize_with = "lenient_string_list")]
    pub fee_lines: Option<Vec<String>>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let normalized_text = normalize_text(&raw_text);
        Self {
            url: url.into(),
            raw_text,
            normalized_text,
            currency_markers: BTreeSet::new(),
            fee_lines: None,
        }
    }

    pub fn with_currency_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.currency_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fee_lines(mut self, lines: Vec<String>) -> Self {
        self.fee_lines = Some(lines);
        self
    }

    /// Returns a snapshot whose `normalized_text` is populated, deriving it from
    /// `raw_text` when the caller left it empty.
    pub fn prepared(&self) -> Cow<'_, PageSnapshot> {
        if self.normalized_text.is_empty() && !self.raw_text.trim().is_empty() {
            let mut owned = self.clone();
            owned.normalized_text = normalize_text(&owned.raw_text);
            Cow::Owned(owned)
        } else {
            Cow::Borrowed(self)
        }
    }

    /// Number of distinct, non-empty currency markers (trimmed, case-insensitive).
    pub fn distinct_currency_markers(&self) -> usize {
        self.currency_markers
            .iter()
            .map(|m| m.trim().to_uppercase())
            .filter(|m| !m.is_empty())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Character length of the trimmed raw text.
    pub fn text_len(&self) -> usize {
        self.raw_text.trim().chars().count()
    }

    pub fn fee_lines(&self) -> &[String] {
        self.fee_lines.as_deref().unwrap_or_default()
    }
}

/// Lowercase and collapse whitespace runs to a single space.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_string_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(strings_from(Value::deserialize(deserializer)?)
        .unwrap_or_default()
        .into_iter()
        .collect())
}

fn lenient_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(strings_from(Value::deserialize(deserializer)?))
}

fn strings_from(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Static catalog definition of a risk type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskCardDefinition {
    /// Stable identifier, e.g. "mandatory_arbitration".
    pub id: String,
    pub category: Category,
    pub title: String,
    pub default_description: String,
    pub severity: Severity,
    /// Significant enough to justify surfacing the result proactively.
    #[serde(default)]
    pub auto_popup_worthy: bool,
}

/// A finding produced by one detector for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetectedRisk {
    pub id: String,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub auto_popup_worthy: bool,
    /// Ordered, deduplicated snippets from the page text.
    pub evidence: Vec<String>,
    pub tags: Vec<String>,
}

impl DetectedRisk {
    pub fn from_card(card: &RiskCardDefinition, evidence: Vec<String>, tags: Vec<String>) -> Self {
        Self {
            id: card.id.clone(),
            category: card.category,
            title: card.title.clone(),
            description: card.default_description.clone(),
            severity: card.severity,
            auto_popup_worthy: card.auto_popup_worthy,
            evidence,
            tags,
        }
    }

    pub fn score(&self) -> u8 {
        self.severity.score()
    }
}

/// Per-category severity scores, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryScores {
    pub financial: u8,
    pub data_privacy: u8,
    pub content_ip: u8,
    pub legal_rights: u8,
}

impl CategoryScores {
    pub fn get(&self, category: Category) -> u8 {
        match category {
            Category::Financial => self.financial,
            Category::DataPrivacy => self.data_privacy,
            Category::ContentIp => self.content_ip,
            Category::LegalRights => self.legal_rights,
        }
    }

    fn slot(&mut self, category: Category) -> &mut u8 {
        match category {
            Category::Financial => &mut self.financial,
            Category::DataPrivacy => &mut self.data_privacy,
            Category::ContentIp => &mut self.content_ip,
            Category::LegalRights => &mut self.legal_rights,
        }
    }

    /// Raise a category to `score` if it is currently lower.
    pub fn raise(&mut self, category: Category, score: u8) {
        let slot = self.slot(category);
        *slot = (*slot).max(score.min(100));
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, u8)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    pub fn max(&self) -> u8 {
        self.iter().map(|(_, score)| score).max().unwrap_or(0)
    }
}

/// The engine's sole output for one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskResult {
    pub risks: Vec<DetectedRisk>,
    pub category_scores: CategoryScores,
    /// Authoritative 0–100 score: the highest category score.
    pub risk_score: u8,
    pub overall_level: OverallLevel,
    /// When false the result is non-actionable, whatever `risks` contains.
    pub has_meaningful_content: bool,
    pub page_mode: PageMode,
    /// Deprecated additive 0–10 score kept for older consumers.
    pub legacy_score: u8,
}

impl RiskResult {
    pub fn is_actionable(&self) -> bool {
        self.has_meaningful_content && self.page_mode != PageMode::Auth
    }

    pub fn find(&self, id: &str) -> Option<&DetectedRisk> {
        self.risks.iter().find(|r| r.id == id)
    }
}
