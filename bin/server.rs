// Transaction Insights - Web Server
// REST API with Axum over one dataset loaded at start-up

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use transaction_insights::{
    init_tracing, load_transactions, AggregationError, InsightsReport, ReportOptions, Settings,
    TopSender, Transaction, TransactionAggregator,
};

/// Serve aggregate statistics over a transaction dataset
#[derive(Parser, Debug)]
#[command(name = "insights-server", version)]
struct Cli {
    /// Settings file (defaults to ./insights.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset to load (.json or .csv)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(short, long)]
    bind: Option<String>,
}

impl Cli {
    /// Load settings, then let command-line flags win over every other source
    fn settings(&self) -> Result<Settings> {
        let mut settings =
            Settings::new(self.config.as_deref()).context("Failed to load settings")?;

        if let Some(input) = &self.input {
            settings.input.path = input.clone();
        }
        if let Some(bind) = &self.bind {
            settings.server.bind = bind.clone();
        }

        Ok(settings)
    }
}

/// Shared application state (read-only after start-up)
#[derive(Clone)]
struct AppState {
    transactions: Arc<Vec<Transaction>>,
    report_options: Arc<ReportOptions>,
    engine: TransactionAggregator,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Aggregation failures become 422 responses
struct ApiError(AggregationError);

impl From<AggregationError> for ApiError {
    fn from(err: AggregationError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self.0, "aggregation failed");
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::<()>::err(self.0.to_string())),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Serialize)]
struct AmountResponse {
    amount: f64,
}

#[derive(Serialize)]
struct SenderTotalResponse {
    sender: String,
    total: f64,
}

#[derive(Serialize)]
struct ClientCountResponse {
    unique_clients: usize,
}

#[derive(Serialize)]
struct ComplianceResponse {
    client: String,
    has_no_open_issues: bool,
    open_issues: Vec<Transaction>,
}

#[derive(Deserialize)]
struct TopQuery {
    n: Option<usize>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/report - Every aggregate with the configured options
async fn get_report(State(state): State<AppState>) -> ApiResult<InsightsReport> {
    let report = InsightsReport::build(&state.transactions, &state.report_options)?;
    Ok(Json(ApiResponse::ok(report)))
}

/// GET /api/total - Sum of all amounts
async fn get_total(State(state): State<AppState>) -> ApiResult<AmountResponse> {
    let amount = state.engine.total_amount(&state.transactions)?;
    Ok(Json(ApiResponse::ok(AmountResponse { amount })))
}

/// GET /api/senders/:name/total - Sum sent by one sender (case-insensitive)
async fn get_sender_total(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<SenderTotalResponse> {
    let total = state.engine.total_amount_sent_by(&name, &state.transactions)?;
    Ok(Json(ApiResponse::ok(SenderTotalResponse { sender: name, total })))
}

/// GET /api/max - Highest single amount
async fn get_max(State(state): State<AppState>) -> ApiResult<AmountResponse> {
    let amount = state.engine.max_amount(&state.transactions)?;
    Ok(Json(ApiResponse::ok(AmountResponse { amount })))
}

/// GET /api/clients/count - Distinct senders and beneficiaries
async fn get_client_count(State(state): State<AppState>) -> ApiResult<ClientCountResponse> {
    let unique_clients = state.engine.count_unique_clients(&state.transactions)?;
    Ok(Json(ApiResponse::ok(ClientCountResponse { unique_clients })))
}

/// GET /api/clients/:name/compliance - Open compliance issues of one client
async fn get_client_compliance(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<ComplianceResponse> {
    let open_issues: Vec<Transaction> = state
        .engine
        .open_compliance_issues(&name, &state.transactions)?
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(ApiResponse::ok(ComplianceResponse {
        client: name,
        has_no_open_issues: open_issues.is_empty(),
        open_issues,
    })))
}

/// GET /api/beneficiaries - Transactions grouped by beneficiary
async fn get_beneficiaries(
    State(state): State<AppState>,
) -> ApiResult<BTreeMap<String, Vec<Transaction>>> {
    let groups: BTreeMap<String, Vec<Transaction>> = state
        .engine
        .transactions_by_beneficiary(&state.transactions)?
        .into_iter()
        .map(|(name, group)| (name.to_string(), group.into_iter().cloned().collect()))
        .collect();

    Ok(Json(ApiResponse::ok(groups)))
}

/// GET /api/issues/unsolved - Transfer numbers with open issues
async fn get_unsolved_issues(State(state): State<AppState>) -> ApiResult<BTreeSet<i64>> {
    let ids = state.engine.unsolved_issue_ids(&state.transactions)?;
    Ok(Json(ApiResponse::ok(ids)))
}

/// GET /api/issues/solved-messages - Messages of solved issues
async fn get_solved_messages(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let messages: Vec<String> = state
        .engine
        .solved_issue_messages(&state.transactions)?
        .into_iter()
        .map(str::to_string)
        .collect();

    Ok(Json(ApiResponse::ok(messages)))
}

/// GET /api/top-transactions?n=3 - Largest transactions by amount
async fn get_top_transactions(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> ApiResult<Vec<Transaction>> {
    let n = query.n.unwrap_or(state.report_options.top_n);
    let top: Vec<Transaction> = state
        .engine
        .top_transactions_by_amount(n, &state.transactions)?
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(ApiResponse::ok(top)))
}

/// GET /api/top-sender - Sender with the largest total
async fn get_top_sender(State(state): State<AppState>) -> ApiResult<TopSender> {
    let top = state.engine.top_sender(&state.transactions)?;
    Ok(Json(ApiResponse::ok(top)))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Cli::parse().settings()?;
    init_tracing(&settings.log.level);

    let transactions = load_transactions(&settings.input.path)?;

    let state = AppState {
        transactions: Arc::new(transactions),
        report_options: Arc::new(settings.report.clone()),
        engine: TransactionAggregator::new(),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/report", get(get_report))
        .route("/total", get(get_total))
        .route("/senders/:name/total", get(get_sender_total))
        .route("/max", get(get_max))
        .route("/clients/count", get(get_client_count))
        .route("/clients/:name/compliance", get(get_client_compliance))
        .route("/beneficiaries", get(get_beneficiaries))
        .route("/issues/unsolved", get(get_unsolved_issues))
        .route("/issues/solved-messages", get(get_solved_messages))
        .route("/top-transactions", get(get_top_transactions))
        .route("/top-sender", get(get_top_sender))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&settings.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.server.bind))?;

    info!(bind = %settings.server.bind, dataset = %settings.input.path.display(), "server running");

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
