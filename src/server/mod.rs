//! HTTP 서버 모듈 - 쿼리 엔드포인트
//!
//! 프론트엔드가 사용하는 단일 질의 API를 제공합니다:
//! `POST /home` `{"message": ...}` -> `{"response": ...}`.
//! 코어 경계는 텍스트 입출력뿐이므로 핸들러는 리졸버 호출을
//! JSON으로 감싸는 역할만 합니다.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::engine::QueryResolver;

// ============================================================================
// State & Router
// ============================================================================

/// 서버 공유 상태
///
/// 리졸버는 구축 후 불변이므로 핸들러 간 Arc 공유로 충분합니다.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<QueryResolver>,
}

/// 라우터 구성
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/home", post(ask))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// 서버 실행 (블로킹)
pub async fn run(resolver: Arc<QueryResolver>, host: &str, port: u16) -> Result<()> {
    let app = build_router(AppState { resolver });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Serving on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// 질의 핸들러
///
/// `message` 필드가 없으면 400을 반환합니다.
async fn ask(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let message = body.get("message").and_then(|m| m.as_str());

    match message {
        Some(message) => {
            let response = state.resolver.resolve(message).await;
            (StatusCode::OK, Json(json!({ "response": response })))
        }
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid request" })),
        ),
    }
}

/// 상태 확인 핸들러
async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats = state.resolver.stats();
    Json(json!({
        "ok": true,
        "records": stats.record_count,
        "indexed": stats.indexed_count,
    }))
}

// ============================================================================
// Tests
// ============================================================================
