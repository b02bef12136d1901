use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub memory: bool,
}

#[derive(Serialize)]
pub struct BannerResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct PoliciesResponse {
    pub policies: Vec<String>,
}

pub async fn root() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "Data Governance QnA API is running".into(),
    })
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        memory: state.qna.memory_enabled(),
    })
}

pub async fn list_policies(State(state): State<AppState>) -> Json<PoliciesResponse> {
    Json(PoliciesResponse {
        policies: state.config.config.policies.catalog.clone(),
    })
}
