/// MCP server exposing the risk engine.
///
/// Exposes four tools:
/// - `analyze_page`: Evaluate one page's text
/// - `analyze_documents`: Evaluate a page with its policy pages and merge
/// - `get_risk_card`: Look up a risk card by ID
/// - `list_risk_cards`: List risk cards, optionally by category
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use risk_engine::{Category, PageSnapshot, RiskEngine};

use crate::api::{
    AnalyzeDocumentsParams, AnalyzeDocumentsResponse, AnalyzePageResponse, DocumentSummary,
    GetRiskCardParams, ListRiskCardsParams, PageParams, RiskCardListResponse, RiskCardResponse,
    MAX_POLICY_PAGES,
};
use crate::error::AppError;

#[derive(Clone)]
pub struct RiskScannerServer {
    engine: Arc<RiskEngine>,
    tool_router: ToolRouter<RiskScannerServer>,
}

impl RiskScannerServer {
    pub fn new(engine: Arc<RiskEngine>) -> Self {
        Self {
            engine,
            tool_router: Self::tool_router(),
        }
    }

    fn analyze(&self, page: &PageParams) -> Result<AnalyzePageResponse, AppError> {
        let snapshot = page.to_snapshot();
        self.engine.check_input(&snapshot)?;
        let result = self.engine.evaluate(&snapshot);
        let should_auto_popup = self.engine.should_auto_popup(&result);
        Ok(AnalyzePageResponse {
            doc_name: page.doc_name.clone(),
            result,
            should_auto_popup,
        })
    }

    fn analyze_all(&self, params: &AnalyzeDocumentsParams) -> Result<AnalyzeDocumentsResponse, AppError> {
        if params.policy_pages.len() > MAX_POLICY_PAGES {
            return Err(AppError::TooManyDocuments {
                count: params.policy_pages.len(),
                max: MAX_POLICY_PAGES,
            });
        }

        let main = params.main.to_snapshot();
        let policies: Vec<PageSnapshot> =
            params.policy_pages.iter().map(PageParams::to_snapshot).collect();
        for snapshot in std::iter::once(&main).chain(&policies) {
            self.engine.check_input(snapshot)?;
        }

        let set = self.engine.evaluate_document_set(&main, &policies);
        let documents = std::iter::once(&params.main)
            .chain(&params.policy_pages)
            .zip(&set.documents)
            .map(|(page, single)| DocumentSummary {
                doc_name: page.doc_name.clone(),
                url: page.url.clone().unwrap_or_default(),
                risk_ids: single.risks.iter().map(|r| r.id.clone()).collect(),
                risk_score: single.risk_score,
            })
            .collect();

        // The merged page mode is the main page's, which the popup gate reads.
        let should_auto_popup = self.engine.should_auto_popup(&set.merged);

        Ok(AnalyzeDocumentsResponse {
            documents,
            result: set.merged,
            should_auto_popup,
        })
    }

    fn find_card(&self, risk_id: &str) -> Result<RiskCardResponse, AppError> {
        let risk_id = risk_id.trim();
        self.engine
            .registry()
            .lookup_ignore_case(risk_id)
            .map(|card| RiskCardResponse { card: card.clone() })
            .ok_or_else(|| AppError::NotFound(risk_id.to_string()))
    }

    fn list_cards(&self, category: Option<&str>) -> Result<RiskCardListResponse, AppError> {
        let registry = self.engine.registry();
        match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(key) => {
                let category = Category::parse(key).ok_or_else(|| {
                    let valid: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
                    AppError::UnknownCategory(format!("{key} (valid: {})", valid.join(", ")))
                })?;
                Ok(RiskCardListResponse {
                    category: Some(category.as_str().to_string()),
                    cards: registry.by_category(category).cloned().collect(),
                })
            }
            None => Ok(RiskCardListResponse {
                category: None,
                cards: registry.iter().cloned().collect(),
            }),
        }
    }
}

#[tool_router]
impl RiskScannerServer {
    #[tool(description = "Scan one page's text for consumer-risk language (non-refundable terms, short cancellation windows, hidden fees, auto-renewal, arbitration, data sale). Returns findings with evidence, category scores, an overall level and whether the result warrants an automatic popup.")]
    async fn analyze_page(
        &self,
        Parameters(params): Parameters<PageParams>,
    ) -> Result<Json<AnalyzePageResponse>, String> {
        let response = self.analyze(&params).map_err(|e| e.to_string())?;
        info!(
            url = params.url.as_deref().unwrap_or(""),
            findings = response.result.risks.len(),
            risk_score = response.result.risk_score,
            "analyzed page"
        );
        Ok(Json(response))
    }

    #[tool(description = "Scan a main page together with its linked policy pages (terms, refund, privacy; at most 10) and merge the findings into one result. The popup decision uses the merged result and the main page's mode.")]
    async fn analyze_documents(
        &self,
        Parameters(params): Parameters<AnalyzeDocumentsParams>,
    ) -> Result<Json<AnalyzeDocumentsResponse>, String> {
        let response = self.analyze_all(&params).map_err(|e| e.to_string())?;
        info!(
            documents = response.documents.len(),
            findings = response.result.risks.len(),
            risk_score = response.result.risk_score,
            "analyzed documents"
        );
        Ok(Json(response))
    }

    #[tool(description = "Get a risk card definition by ID (e.g. 'mandatory_arbitration', 'resort_or_facility_fee').")]
    async fn get_risk_card(
        &self,
        Parameters(params): Parameters<GetRiskCardParams>,
    ) -> Result<Json<RiskCardResponse>, String> {
        if params.risk_id.trim().is_empty() {
            return Err("risk_id must not be empty".to_string());
        }
        self.find_card(&params.risk_id)
            .map(Json)
            .map_err(|e| e.to_string())
    }

    #[tool(description = "List risk card definitions, optionally filtered by category (financial, data_privacy, content_ip, legal_rights).")]
    async fn list_risk_cards(
        &self,
        Parameters(params): Parameters<ListRiskCardsParams>,
    ) -> Result<Json<RiskCardListResponse>, String> {
        self.list_cards(params.category.as_deref())
            .map(Json)
            .map_err(|e| e.to_string())
    }
}

#[tool_handler]
impl ServerHandler for RiskScannerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "risk-scanner".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Consumer-risk scanner. Detects risky terms in page text and scores them \
                 by category (financial, data privacy, content/IP, legal rights). Use \
                 analyze_page for a single page, analyze_documents for a page plus its \
                 policy pages, and get_risk_card or list_risk_cards to browse the catalog."
                    .to_string(),
            ),
        }
    }
}
