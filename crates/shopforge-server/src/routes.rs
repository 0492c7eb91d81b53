//! Route definitions and request handlers.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use shopforge_core::error::Error;
use shopforge_provisioner::OperationKind;
use shopforge_registry::{generate_store_id, AuditAction, AuditEntry, NewStore, Store, StoreStatus};

use crate::error::HttpResult;
use crate::extract::ApiJson;
use crate::middleware::{self, client_ip};
use crate::state::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/stores", get(list_stores).post(create_store))
        .route("/stores/:id", get(get_store).delete(delete_store))
        .route("/stores/:id/retry", post(retry_store))
        .route("/stores/:id/operation", get(store_operation))
        .route("/audit", get(list_audit))
        .route("/metrics", get(metrics))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ));

    Router::new()
        .nest("/api", api)
        .layer(axum::middleware::from_fn(middleware::request_logging))
        .layer(middleware::cors_layer())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    environment: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        environment: state.config.server.environment.clone(),
    })
}

#[derive(Serialize)]
struct StoresResponse {
    stores: Vec<Store>,
}

async fn list_stores(State(state): State<AppState>) -> HttpResult<Json<StoresResponse>> {
    let stores = state.registry.list().await.map_err(|e| state.fail(e))?;
    Ok(Json(StoresResponse { stores }))
}

#[derive(Serialize)]
struct StoreResponse {
    store: Store,
}

async fn get_store(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HttpResult<Json<StoreResponse>> {
    let store = state.registry.require(&id).await.map_err(|e| state.fail(e))?;
    Ok(Json(StoreResponse { store }))
}

#[derive(Debug, Deserialize)]
struct CreateStoreRequest {
    name: Option<String>,
    engine: Option<String>,
}

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;

fn validated_name(raw: Option<&str>) -> Result<String, Error> {
    let trimmed = raw.unwrap_or("").trim();
    if trimmed.is_empty() {
        return Err(Error::MissingStoreName);
    }
    if trimmed.len() < NAME_MIN || trimmed.len() > NAME_MAX {
        return Err(Error::invalid_store_name(format!(
            "name must be between {NAME_MIN} and {NAME_MAX} characters"
        )));
    }
    Ok(trimmed.to_string())
}

async fn create_store(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<CreateStoreRequest>,
) -> HttpResult<impl IntoResponse> {
    let client = client_ip(&headers);
    if !state.rate_limiter.check_create(&client) {
        return Err(state.fail(Error::RateLimitExceeded));
    }

    let name = validated_name(request.name.as_deref()).map_err(|e| state.fail(e))?;

    let engine_tag = request
        .engine
        .clone()
        .unwrap_or_else(|| "woocommerce".to_string());
    let engine = state
        .engines
        .resolve_tag(&engine_tag)
        .map_err(|e| state.fail(e))?;

    let validation = engine.validate();
    if !validation.valid {
        return Err(state.fail(Error::EngineUnavailable {
            engine: engine_tag,
            message: validation
                .error
                .unwrap_or_else(|| "engine reported itself unavailable".to_string()),
        }));
    }

    let active = state
        .registry
        .active_count()
        .await
        .map_err(|e| state.fail(e))?;
    let max_stores = state.config.stores.max_stores;
    if active >= max_stores {
        return Err(state.fail(Error::QuotaExceeded { limit: max_stores }));
    }

    let store = state
        .registry
        .create(NewStore {
            id: generate_store_id(),
            name,
            engine: engine_tag,
        })
        .await
        .map_err(|e| state.fail(e))?;

    state.rate_limiter.record_create(&client);
    spawn_provision(&state, store.id.clone());

    Ok((StatusCode::CREATED, Json(StoreResponse { store })))
}

#[derive(Serialize)]
struct OperationAccepted {
    message: String,
    #[serde(rename = "storeId")]
    store_id: String,
}

async fn delete_store(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HttpResult<impl IntoResponse> {
    let store = state.registry.require(&id).await.map_err(|e| state.fail(e))?;

    if matches!(store.status, StoreStatus::Deleted | StoreStatus::Deleting) {
        return Err(state.fail(Error::invalid_transition("delete", store.status.as_str())));
    }
    if state.provisioner.operation(&id) == Some(OperationKind::Deleting) {
        return Err(state.fail(Error::operation_in_progress(&id, "deleting")));
    }

    let provisioner = state.provisioner.clone();
    let store_id = id.clone();
    tokio::spawn(async move {
        if let Err(e) = provisioner.delete(&store_id).await {
            tracing::error!(store_id = %store_id, error = %e, "Delete workflow failed");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(OperationAccepted {
            message: "Store deletion started".to_string(),
            store_id: id,
        }),
    ))
}

async fn retry_store(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HttpResult<impl IntoResponse> {
    let store = state.registry.require(&id).await.map_err(|e| state.fail(e))?;

    if let Some(operation) = state.provisioner.operation(&id) {
        return Err(state.fail(Error::operation_in_progress(&id, operation.to_string())));
    }
    if store.status != StoreStatus::Failed {
        return Err(state.fail(Error::invalid_transition("retry", store.status.as_str())));
    }

    state
        .registry
        .audit()
        .append_best_effort(
            Some(&id),
            AuditAction::Retry,
            serde_json::json!({ "previous_error": store.error_message }),
        )
        .await;

    spawn_provision(&state, id.clone());

    Ok((
        StatusCode::ACCEPTED,
        Json(OperationAccepted {
            message: "Retry started".to_string(),
            store_id: id,
        }),
    ))
}

#[derive(Serialize)]
struct OperationStatusResponse {
    #[serde(rename = "storeId")]
    store_id: String,
    operation: Option<OperationKind>,
}

async fn store_operation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HttpResult<Json<OperationStatusResponse>> {
    // 404 for unknown stores, even though the lock itself is keyed loosely
    state.registry.require(&id).await.map_err(|e| state.fail(e))?;
    Ok(Json(OperationStatusResponse {
        operation: state.provisioner.operation(&id),
        store_id: id,
    }))
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<u32>,
}

#[derive(Serialize)]
struct AuditResponse {
    audit: Vec<AuditEntry>,
}

async fn list_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> HttpResult<Json<AuditResponse>> {
    let audit = state
        .registry
        .audit()
        .list(query.limit)
        .await
        .map_err(|e| state.fail(e))?;
    Ok(Json(AuditResponse { audit }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricsResponse {
    stores: StoreMetrics,
    provisioning: ProvisioningMetrics,
    recent_failures: Vec<Store>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreMetrics {
    total: u64,
    by_status: BTreeMap<String, u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProvisioningMetrics {
    total_provisioned: u64,
    avg_duration_seconds: Option<f64>,
    min_duration_seconds: Option<f64>,
    max_duration_seconds: Option<f64>,
}

async fn metrics(State(state): State<AppState>) -> HttpResult<Json<MetricsResponse>> {
    let by_status = state
        .registry
        .status_histogram()
        .await
        .map_err(|e| state.fail(e))?;
    let stats = state
        .registry
        .provisioning_stats()
        .await
        .map_err(|e| state.fail(e))?;
    let recent_failures = state
        .registry
        .recent_failures(5)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(MetricsResponse {
        stores: StoreMetrics {
            total: by_status.values().sum(),
            by_status,
        },
        provisioning: ProvisioningMetrics {
            total_provisioned: stats.total_provisioned,
            avg_duration_seconds: stats.avg_duration_seconds,
            min_duration_seconds: stats.min_duration_seconds,
            max_duration_seconds: stats.max_duration_seconds,
        },
        recent_failures,
    }))
}

/// Fire-and-forget provisioning: the handler returns before the workflow
/// finishes, and errors land on the store record, not the response.
fn spawn_provision(state: &AppState, store_id: String) {
    let provisioner = state.provisioner.clone();
    tokio::spawn(async move {
        if let Err(e) = provisioner.provision(&store_id).await {
            tracing::error!(store_id = %store_id, error = %e, "Provision workflow failed");
        }
    });
}
