use std::path::PathBuf;
use std::str::FromStr;

use crate::error::EngineError;
use crate::evidence::DEFAULT_MAX_SNIPPETS;

pub const DEFAULT_MAX_INPUT_CHARS: usize = 50_000;

/// Page-length thresholds used by the content-significance classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentThresholds {
    /// Pages shorter than this (in chars) are classified `low-content`.
    pub low_content_chars: usize,
    /// A `low-content` page still counts as meaningful from this length on.
    pub meaningful_min_chars: usize,
}

impl Default for ContentThresholds {
    fn default() -> Self {
        Self {
            low_content_chars: 800,
            meaningful_min_chars: 600,
        }
    }
}

/// Engine configuration.
///
/// All values have defaults; `from_env` overrides them from environment
/// variables so thresholds can be tuned without a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub content: ContentThresholds,
    /// Minimum risk score before the auto-popup gate considers a result.
    pub popup_min_score: u8,
    /// Maximum evidence snippets per finding.
    pub max_evidence: usize,
    /// Longest page text (in chars) a caller may submit for evaluation.
    pub max_input_chars: usize,
    /// Optional JSON catalog replacing the built-in risk cards.
    pub risk_cards_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            content: ContentThresholds::default(),
            popup_min_score: 50,
            max_evidence: DEFAULT_MAX_SNIPPETS,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            risk_cards_path: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `RISK_LOW_CONTENT_CHARS`: low-content threshold (default 800)
    /// - `RISK_MEANINGFUL_MIN_CHARS`: meaningful floor for low-content pages (default 600)
    /// - `RISK_POPUP_MIN_SCORE`: auto-popup score gate, 0–100 (default 50)
    /// - `RISK_MAX_EVIDENCE`: snippets per finding (default 3)
    /// - `RISK_MAX_INPUT_CHARS`: longest accepted page text (default 50000)
    /// - `RISK_CARDS_PATH`: JSON risk card catalog; must exist when set
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let low_content_chars = parse_var(
            &lookup,
            "RISK_LOW_CONTENT_CHARS",
            defaults.content.low_content_chars,
        )?;
        let meaningful_min_chars = parse_var(
            &lookup,
            "RISK_MEANINGFUL_MIN_CHARS",
            defaults.content.meaningful_min_chars,
        )?;
        if meaningful_min_chars > low_content_chars {
            return Err(EngineError::Config(format!(
                "RISK_MEANINGFUL_MIN_CHARS ({meaningful_min_chars}) must not exceed \
                 RISK_LOW_CONTENT_CHARS ({low_content_chars})"
            )));
        }

        let popup_min_score: u8 =
            parse_var(&lookup, "RISK_POPUP_MIN_SCORE", defaults.popup_min_score)?;
        if popup_min_score > 100 {
            return Err(EngineError::Config(format!(
                "RISK_POPUP_MIN_SCORE must be between 0 and 100, got {popup_min_score}"
            )));
        }

        let max_evidence = parse_var(&lookup, "RISK_MAX_EVIDENCE", defaults.max_evidence)?;
        if max_evidence == 0 {
            return Err(EngineError::Config(
                "RISK_MAX_EVIDENCE must be at least 1".to_string(),
            ));
        }

        let max_input_chars =
            parse_var(&lookup, "RISK_MAX_INPUT_CHARS", defaults.max_input_chars)?;
        if max_input_chars == 0 {
            return Err(EngineError::Config(
                "RISK_MAX_INPUT_CHARS must be at least 1".to_string(),
            ));
        }

        let risk_cards_path = lookup("RISK_CARDS_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        if let Some(path) = &risk_cards_path {
            if !path.exists() {
                return Err(EngineError::Config(format!(
                    "risk card catalog not found at {}",
                    path.display()
                )));
            }
        }

        Ok(Self {
            content: ContentThresholds {
                low_content_chars,
                meaningful_min_chars,
            },
            popup_min_score,
            max_evidence,
            max_input_chars,
            risk_cards_path,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, EngineError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            EngineError::Config(format!("{key} must be a non-negative integer, got '{raw}'"))
        }),
        _ => Ok(default),
    }
}
