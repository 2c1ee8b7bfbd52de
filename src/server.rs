//! HTTP surface: `POST /api` and its CORS preflight

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router, middleware};
use log::{error, info, warn};
use serde::Serialize;

use crate::config::{Locale, Settings};
use crate::error::NoteError;
use crate::pipeline::Pipeline;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    error_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommendation_text: Option<&'static str>,
}

fn error_response(e: NoteError, locale: Locale) -> Response {
    let body = ErrorBody {
        error: e.to_string(),
        error_type: e.error_type(),
        recommendation_text: e.recommendation(locale),
    };
    (e.status(), Json(body)).into_response()
}

pub fn router(pipeline: Pipeline) -> Router {
    Router::new()
        .route("/api", post(create_note).options(preflight))
        .layer(middleware::map_response(add_cors_headers))
        .with_state(Arc::new(pipeline))
}

/// Bind and serve until ctrl-c
pub async fn serve(settings: &Settings) -> eyre::Result<()> {
    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(Pipeline::from_settings(settings)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}

async fn create_note(State(pipeline): State<Arc<Pipeline>>, body: Bytes) -> Response {
    let locale = pipeline.locale();
    // A panic inside the pipeline only takes down this task
    let task = tokio::spawn(async move { pipeline.run(&body).await });

    match task.await {
        Ok(Ok(note)) => (StatusCode::OK, Json(note)).into_response(),
        Ok(Err(e)) => {
            warn!("Request failed: {} ({e})", e.error_type());
            error_response(e, locale)
        }
        Err(e) => {
            error!("Pipeline task aborted: {e}");
            let e = NoteError::Internal("unexpected failure while generating the note".to_string());
            error_response(e, locale)
        }
    }
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn add_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}
