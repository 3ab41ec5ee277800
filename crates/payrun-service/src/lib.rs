//! REST surface for the payrun custody engine.
//!
//! The service owns the in-memory world (native ledger, token reference,
//! code registry) and exposes the engine's operations plus the funding paths
//! external collaborators would otherwise drive directly.

#![deny(unsafe_code)]

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use payrun_core::{
    AccountBalances, Address, CodeRegistry, CostSchedule, EngineConfig, EngineError, LocalToken,
    NativeLedger, PayoutReceipt, PayoutRequest, PayrollEngine, SharedToken, SweepReceipt,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// World construction parameters for one service instance.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub owner: Address,
    pub engine_address: Address,
    pub costs: CostSchedule,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let mut owner = [0u8; 20];
        owner[19] = 0xaa;
        let mut engine_address = [0u8; 20];
        engine_address[19] = 0xee;
        Self {
            owner: Address::from_bytes(owner),
            engine_address: Address::from_bytes(engine_address),
            costs: CostSchedule::default(),
        }
    }
}

/// Shared handles for the engine and the world it mutates.
#[derive(Clone)]
pub struct ServiceState {
    pub engine: Arc<PayrollEngine>,
    pub native: Arc<RwLock<NativeLedger>>,
    pub token: Arc<RwLock<LocalToken>>,
    pub registry: Arc<CodeRegistry>,
}

impl ServiceState {
    pub fn bootstrap(config: ServiceConfig) -> Self {
        let native = Arc::new(RwLock::new(NativeLedger::new()));
        let token = Arc::new(RwLock::new(LocalToken::new(config.engine_address)));
        let registry = Arc::new(CodeRegistry::new());

        let shared: SharedToken = token.clone();
        let engine = Arc::new(PayrollEngine::new(
            EngineConfig {
                owner: config.owner,
                address: config.engine_address,
                costs: config.costs,
            },
            native.clone(),
            shared,
            registry.clone(),
        ));

        Self {
            engine,
            native,
            token,
            registry,
        }
    }
}

pub fn build_router(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/balance/:address", get(balance))
        .route("/v1/payout", post(payout))
        .route("/v1/kill", post(kill))
        .route("/v1/fund", post(fund))
        .route("/v1/token/issue", post(issue))
        .route(
            "/v1/contracts/:address",
            post(register_contract).delete(clear_contract),
        )
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(err) => match err {
                EngineError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
                EngineError::Terminated => StatusCode::GONE,
                EngineError::InsufficientFunds { .. } | EngineError::ReentrantCall => {
                    StatusCode::CONFLICT
                }
                EngineError::TransferRejected { .. } => StatusCode::BAD_GATEWAY,
                EngineError::LockPoisoned(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    engine_live: bool,
    cumulative_cost: u64,
}

async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "payrun-service",
        engine_live: state.engine.is_live(),
        cumulative_cost: state.engine.cumulative_cost(),
    })
}

async fn balance(
    State(state): State<ServiceState>,
    Path(address): Path<String>,
) -> Result<Json<AccountBalances>, ApiError> {
    Ok(Json(state.engine.balance_of(&parse_address(&address)?)?))
}

#[derive(Debug, Deserialize)]
struct PayoutApiRequest {
    caller: Address,
    #[serde(flatten)]
    request: PayoutRequest,
}

async fn payout(
    State(state): State<ServiceState>,
    Json(body): Json<PayoutApiRequest>,
) -> Result<Json<PayoutReceipt>, ApiError> {
    Ok(Json(state.engine.payout(body.caller, &body.request)?))
}

#[derive(Debug, Deserialize)]
struct KillApiRequest {
    caller: Address,
    beneficiary: Address,
}

async fn kill(
    State(state): State<ServiceState>,
    Json(body): Json<KillApiRequest>,
) -> Result<Json<SweepReceipt>, ApiError> {
    Ok(Json(state.engine.kill(body.caller, body.beneficiary)?))
}

#[derive(Debug, Deserialize)]
struct FundApiRequest {
    amount: u64,
}

/// External funding source: credit the engine's native custody directly.
async fn fund(
    State(state): State<ServiceState>,
    Json(body): Json<FundApiRequest>,
) -> Result<Json<AccountBalances>, ApiError> {
    let engine_address = state.engine.address();
    state
        .native
        .write()
        .map_err(|_| ApiError::Engine(EngineError::LockPoisoned("native ledger")))?
        .deposit(engine_address, body.amount)?;
    Ok(Json(state.engine.balance_of(&engine_address)?))
}

#[derive(Debug, Deserialize)]
struct IssueApiRequest {
    amount: u64,
}

/// External funding source: have the token reference issue to the engine.
async fn issue(
    State(state): State<ServiceState>,
    Json(body): Json<IssueApiRequest>,
) -> Result<Json<AccountBalances>, ApiError> {
    let engine_address = state.engine.address();
    state
        .token
        .write()
        .map_err(|_| ApiError::Engine(EngineError::LockPoisoned("token reference")))?
        .issue(engine_address, body.amount);
    Ok(Json(state.engine.balance_of(&engine_address)?))
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.parse()
        .map_err(|err: payrun_core::AddressParseError| ApiError::BadRequest(err.to_string()))
}

/// Mark an address as contract-like (the deployment analog). Payouts refuse
/// native transfers to it from the next invocation on.
async fn register_contract(
    State(state): State<ServiceState>,
    Path(address): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.registry.register_contract(parse_address(&address)?);
    Ok(StatusCode::NO_CONTENT)
}

/// Clear an address's contract classification (the destruction analog).
async fn clear_contract(
    State(state): State<ServiceState>,
    Path(address): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.registry.clear_contract(&parse_address(&address)?);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const OWNER: &str = "0x00000000000000000000000000000000000000aa";
    const ENGINE: &str = "0x00000000000000000000000000000000000000ee";
    const RECIPIENT: &str = "0x1111111111111111111111111111111111111111";

    fn router() -> Router {
        build_router(ServiceState::bootstrap(ServiceConfig::default()))
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_a_live_engine() {
        let app = router();
        let (status, body) = send(&app, get_request("/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["engine_live"], json!(true));
    }

    #[tokio::test]
    async fn unknown_address_reads_as_zero_balances() {
        let app = router();
        let (status, body) = send(&app, get_request(&format!("/v1/balance/{RECIPIENT}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "native": 0, "token": 0 }));
    }

    #[tokio::test]
    async fn malformed_address_is_a_bad_request() {
        let app = router();
        let (status, _) = send(&app, get_request("/v1/balance/nonsense")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn funded_payout_flows_through_the_api() {
        let app = router();

        let (status, body) = send(&app, post_json("/v1/fund", json!({ "amount": 300 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["native"], json!(300));

        let (status, _) = send(&app, post_json("/v1/token/issue", json!({ "amount": 30 }))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, receipt) = send(
            &app,
            post_json(
                "/v1/payout",
                json!({
                    "caller": OWNER,
                    "native_recipients": [RECIPIENT],
                    "native_amounts": [300],
                    "token_recipients": [RECIPIENT],
                    "token_amounts": [30],
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["total_native"], json!(300));
        assert_eq!(receipt["total_token"], json!(30));

        let (_, balances) = send(&app, get_request(&format!("/v1/balance/{RECIPIENT}"))).await;
        assert_eq!(balances, json!({ "native": 300, "token": 30 }));

        let (_, custody) = send(&app, get_request(&format!("/v1/balance/{ENGINE}"))).await;
        assert_eq!(custody, json!({ "native": 0, "token": 0 }));
    }

    #[tokio::test]
    async fn non_owner_payout_is_forbidden() {
        let app = router();
        send(&app, post_json("/v1/fund", json!({ "amount": 100 })))
            .await;

        let (status, body) = send(
            &app,
            post_json(
                "/v1/payout",
                json!({
                    "caller": RECIPIENT,
                    "native_recipients": [RECIPIENT],
                    "native_amounts": [100],
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("not the engine owner"));
    }

    #[tokio::test]
    async fn underfunded_payout_is_a_conflict() {
        let app = router();
        let (status, _) = send(
            &app,
            post_json(
                "/v1/payout",
                json!({
                    "caller": OWNER,
                    "native_recipients": [RECIPIENT],
                    "native_amounts": [1],
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn registered_contract_is_refused_native_payout() {
        let app = router();
        send(&app, post_json("/v1/fund", json!({ "amount": 100 }))).await;

        let register = Request::builder()
            .method("POST")
            .uri(format!("/v1/contracts/{RECIPIENT}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, register).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(
            &app,
            post_json(
                "/v1/payout",
                json!({
                    "caller": OWNER,
                    "native_recipients": [RECIPIENT],
                    "native_amounts": [100],
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("contract-like"));
    }

    #[tokio::test]
    async fn killed_engine_reports_gone() {
        let app = router();
        send(&app, post_json("/v1/fund", json!({ "amount": 100 }))).await;

        let (status, receipt) = send(
            &app,
            post_json(
                "/v1/kill",
                json!({ "caller": OWNER, "beneficiary": RECIPIENT }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["native_swept"], json!(100));

        let (status, _) = send(&app, get_request(&format!("/v1/balance/{RECIPIENT}"))).await;
        assert_eq!(status, StatusCode::GONE);

        let (status, _) = send(
            &app,
            post_json("/v1/payout", json!({ "caller": OWNER })),
        )
        .await;
        assert_eq!(status, StatusCode::GONE);

        let (_, body) = send(&app, get_request("/v1/health")).await;
        assert_eq!(body["engine_live"], json!(false));
    }
}
