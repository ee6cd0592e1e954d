//! REST API handlers for engagement webhooks, user stats, leaderboards,
//! rewards, and the level configuration surface.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use quest_core::config::IntegrationsConfig;
use quest_core::levels::{Level, LevelStore};
use quest_core::types::{EngagementSummary, LeaderboardEntry, Reward, User, Window};
use quest_core::QuestError;
use quest_ingest::{InboundEvent, IngestOutcome, Ingestor, ScoringQueue};
use quest_leaderboard::LeaderboardAggregator;
use quest_ledger::EngagementLedger;
use quest_rewards::{ClaimOutcome, RewardCatalog, RewardProgress};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

/// Maximum string field length (user ID, event type, app ID).
const MAX_FIELD_LEN: usize = 256;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<EngagementLedger>,
    pub ingestor: Arc<Ingestor>,
    pub queue: Arc<ScoringQueue>,
    pub rewards: Arc<RewardCatalog>,
    pub leaderboard: Arc<LeaderboardAggregator>,
    pub levels: Arc<LevelStore>,
    pub integrations: IntegrationsConfig,
    pub node_id: String,
    pub start_time: Instant,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

fn bad_request(error: &str, message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

// ─── Webhook boundary ───────────────────────────────────────────────────────

/// Inbound webhook delivery. Fields are optional so a malformed delivery
/// can still be acknowledged; authenticity verification happens upstream.
#[derive(Debug, Deserialize)]
pub struct WebhookDelivery {
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub app_secret: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// POST /v1/webhooks — at-least-once delivery boundary.
///
/// Acknowledges immediately and defers scoring to the background queue;
/// a slow ledger never blocks the delivering platform. Unknown event
/// types are logged by the worker, not surfaced here.
pub async fn handle_webhook(
    State(state): State<AppState>,
    Json(delivery): Json<WebhookDelivery>,
) -> (StatusCode, &'static str) {
    metrics::counter!("api.webhooks_received").increment(1);

    match (delivery.event_type, delivery.user_id) {
        (Some(event_type), Some(user_id)) => {
            state.queue.submit(InboundEvent::new(
                delivery.app_id.unwrap_or_else(|| "webhook".to_string()),
                event_type,
                user_id,
                delivery.data.unwrap_or(serde_json::Value::Null),
            ));
        }
        _ => {
            warn!("Webhook delivery without event_type or user_id");
            metrics::counter!("api.webhooks_incomplete").increment(1);
        }
    }

    // Return a 2xx quickly; anything else triggers a redelivery storm.
    (StatusCode::OK, "OK")
}

// ─── Integration events ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IntegrationRequest {
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub app_secret: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct IntegrationResponse {
    pub success: bool,
    pub recorded: bool,
    pub activity_kind: String,
    pub points: i64,
}

fn validate_integration_request(
    request: &IntegrationRequest,
) -> Result<(&str, &str, &str, &str), &'static str> {
    let (Some(app_id), Some(app_secret), Some(event_type), Some(user_id)) = (
        request.app_id.as_deref(),
        request.app_secret.as_deref(),
        request.event_type.as_deref(),
        request.user_id.as_deref(),
    ) else {
        return Err("Missing required fields: app_id, app_secret, event_type, user_id");
    };
    for field in [app_id, event_type, user_id] {
        if field.is_empty() {
            return Err("Required fields must not be empty");
        }
        if field.len() > MAX_FIELD_LEN {
            return Err("Field exceeds maximum length");
        }
    }
    Ok((app_id, app_secret, event_type, user_id))
}

/// POST /v1/events — synchronous integration endpoint for source apps.
pub async fn handle_event(
    State(state): State<AppState>,
    Json(request): Json<IntegrationRequest>,
) -> Response {
    let (app_id, app_secret, event_type, user_id) =
        match validate_integration_request(&request) {
            Ok(fields) => fields,
            Err(msg) => {
                metrics::counter!("api.validation_errors").increment(1);
                return bad_request("invalid_request", msg);
            }
        };

    if !state.integrations.verify(app_id, app_secret) {
        metrics::counter!("api.auth_failures").increment(1);
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "invalid_credentials".to_string(),
                message: "Invalid app credentials".to_string(),
            }),
        )
            .into_response();
    }

    let payload = request.data.clone().unwrap_or(serde_json::Value::Null);
    match state.ingestor.ingest(app_id, event_type, user_id, &payload) {
        Ok(IngestOutcome::Recorded(activity)) => Json(IntegrationResponse {
            success: true,
            recorded: true,
            activity_kind: activity.kind.as_str().to_string(),
            points: activity.points,
        })
        .into_response(),
        Ok(IngestOutcome::Ineligible(kind)) => Json(IntegrationResponse {
            success: true,
            recorded: false,
            activity_kind: kind.as_str().to_string(),
            points: 0,
        })
        .into_response(),
        Err(QuestError::UnknownEvent(name)) => {
            bad_request("unknown_event_type", format!("Unknown event type: {name}"))
        }
        Err(e) => {
            error!(error = %e, event_type, "Event processing failed");
            metrics::counter!("api.errors").increment(1);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "event_processing_failed".to_string(),
                    message: "Internal processing error".to_string(),
                }),
            )
                .into_response()
        }
    }
}

// ─── User stats ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub current_level: u32,
    pub total_points: i64,
    pub weekly_points: i64,
    pub monthly_points: i64,
    pub join_date: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl UserResponse {
    fn from_user(user: User, ledger: &EngagementLedger) -> Self {
        Self {
            total_points: ledger.display_points(user.total_points),
            weekly_points: ledger.display_points(user.weekly_points),
            monthly_points: ledger.display_points(user.monthly_points),
            id: user.id,
            display_name: user.display_name,
            avatar: user.avatar,
            current_level: user.current_level,
            join_date: user.join_date,
            last_active: user.last_active,
        }
    }
}

fn user_or_not_found(state: &AppState, user_id: &str) -> Result<User, Response> {
    state.ledger.user(user_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "unknown_user".to_string(),
                message: format!("No engagement recorded for user {user_id}"),
            }),
        )
            .into_response()
    })
}

/// GET /v1/users/:user_id — profile with level and clamped point totals.
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    match user_or_not_found(&state, &user_id) {
        Ok(user) => Json(UserResponse::from_user(user, &state.ledger)).into_response(),
        Err(response) => response,
    }
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    #[serde(default)]
    pub window: Option<Window>,
}

/// GET /v1/users/:user_id/engagement?window=week|month|all — windowed
/// summary recomputed from the log.
pub async fn get_engagement(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Json<EngagementSummary> {
    let window = query.window.unwrap_or(Window::AllTime);
    Json(state.ledger.query(&user_id, window))
}

// ─── Leaderboard ────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct LeaderboardResponse {
    pub window: Window,
    pub entries: Vec<LeaderboardEntry>,
    pub last_updated: DateTime<Utc>,
}

/// GET /v1/leaderboard?window=week|month|all — ranked users. An empty
/// list is a valid response, not an error.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Json<LeaderboardResponse> {
    let window = query.window.unwrap_or(Window::AllTime);
    Json(LeaderboardResponse {
        window,
        entries: state.leaderboard.rank(window),
        last_updated: Utc::now(),
    })
}

// ─── Rewards ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct UserRewardsResponse {
    pub available: Vec<Reward>,
    pub claimed: Vec<Reward>,
    pub discount_percentage: u32,
    pub progress: RewardProgress,
}

/// GET /v1/users/:user_id/rewards — unlocked, claimed, and upcoming.
pub async fn get_user_rewards(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    let user = match user_or_not_found(&state, &user_id) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let table = state.levels.snapshot();
    Json(UserRewardsResponse {
        available: state.rewards.available_for(&user),
        claimed: state.rewards.claimed_for(&user),
        discount_percentage: state.rewards.discount_for(&user),
        progress: state.rewards.progress_to_next_reward(&user, &table),
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub user_id: String,
    pub reward_id: String,
}

#[derive(Serialize)]
pub struct ClaimResponse {
    pub status: ClaimOutcome,
}

/// POST /v1/rewards/claim — idempotent-rejecting claim.
pub async fn claim_reward(
    State(state): State<AppState>,
    Json(request): Json<ClaimRequest>,
) -> Response {
    let outcome = state.rewards.claim(&request.user_id, &request.reward_id);
    let status = match outcome {
        ClaimOutcome::Claimed => StatusCode::OK,
        ClaimOutcome::AlreadyClaimed => StatusCode::CONFLICT,
        ClaimOutcome::Inactive => StatusCode::BAD_REQUEST,
        ClaimOutcome::NotFound => StatusCode::NOT_FOUND,
    };
    (status, Json(ClaimResponse { status: outcome })).into_response()
}

#[derive(Serialize)]
pub struct DiscountResponse {
    pub user_id: String,
    pub discount_percentage: u32,
}

/// GET /v1/users/:user_id/discount — best applicable discount.
pub async fn get_discount(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    match user_or_not_found(&state, &user_id) {
        Ok(user) => Json(DiscountResponse {
            discount_percentage: state.rewards.discount_for(&user),
            user_id: user.id,
        })
        .into_response(),
        Err(response) => response,
    }
}

// ─── Level configuration ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct LevelsResponse {
    pub success: bool,
    pub levels: Vec<Level>,
}

/// GET /v1/levels — current level table.
pub async fn list_levels(State(state): State<AppState>) -> Json<LevelsResponse> {
    Json(LevelsResponse {
        success: true,
        levels: state.levels.snapshot().levels().to_vec(),
    })
}

/// PUT /v1/levels — replace the whole table. Entries are re-sorted and
/// validated; a failed write leaves the current table untouched.
pub async fn put_levels(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let levels = match parse_levels(body.get("levels").cloned()) {
        Ok(levels) => levels,
        Err(message) => return bad_request("invalid_level_configuration", message),
    };
    match state.levels.replace(levels) {
        Ok(table) => Json(LevelsResponse {
            success: true,
            levels: table.levels().to_vec(),
        })
        .into_response(),
        Err(e) => bad_request("invalid_level_configuration", e.to_string()),
    }
}

/// POST /v1/levels — add one level; duplicates are rejected.
pub async fn add_level(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let entry = match body.get("level").cloned() {
        Some(value) => match serde_json::from_value::<Level>(value) {
            Ok(entry) => entry,
            Err(e) => {
                return bad_request(
                    "invalid_level_configuration",
                    format!("Invalid level entry: {e}"),
                )
            }
        },
        None => return bad_request("invalid_level_configuration", "Missing 'level' field"),
    };
    match state.levels.add(entry) {
        Ok(table) => Json(LevelsResponse {
            success: true,
            levels: table.levels().to_vec(),
        })
        .into_response(),
        Err(e) => bad_request("invalid_level_configuration", e.to_string()),
    }
}

/// DELETE /v1/levels/:level — remove one level by number.
pub async fn delete_level(
    State(state): State<AppState>,
    Path(level): Path<u32>,
) -> Response {
    match state.levels.remove(level) {
        Ok(table) => Json(LevelsResponse {
            success: true,
            levels: table.levels().to_vec(),
        })
        .into_response(),
        Err(e) => bad_request("invalid_level_configuration", e.to_string()),
    }
}

fn parse_levels(value: Option<serde_json::Value>) -> Result<Vec<Level>, String> {
    let Some(value) = value else {
        return Err("Missing 'levels' field".to_string());
    };
    if !value.is_array() {
        return Err("'levels' must be an array".to_string());
    }
    serde_json::from_value(value).map_err(|e| format!("Invalid level entry: {e}"))
}

// ─── Operational endpoints ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

/// GET /health — health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — readiness probe for Kubernetes.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.start_time.elapsed().as_secs() > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live — liveness probe for Kubernetes.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
