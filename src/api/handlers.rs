use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;

use super::context::RequestContext;
use super::HealthResponse;
use crate::api::routes::AppState;
use crate::error::AppError;
use crate::tts::CACHE_SUBDIR;

/// `?action=random[&dir=...]` streams one clip, `?action=list` returns the catalog.
pub async fn audio(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Response, AppError> {
    match ctx.param("action") {
        Some("random") => {
            let track = state.audio.pick_random(ctx.param("dir").unwrap_or(""))?;
            let bytes = tokio::fs::read(&track).await?;

            tracing::info!("Serving {} ({} bytes)", track.display(), bytes.len());

            Ok((
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg")),
                    (header::CONTENT_LENGTH, HeaderValue::from(bytes.len())),
                ],
                bytes,
            )
                .into_response())
        }
        Some("list") => {
            let json = state.audio.list_json()?;
            Ok(([(header::CONTENT_TYPE, "application/json")], json).into_response())
        }
        _ => Err(AppError::BadRequest("Invalid action".into())),
    }
}

/// Rejects callers outside the allow-list before the request body is touched.
pub async fn allow_listed(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    state.access.check_address(remote_addr)?;

    Ok(next.run(request).await)
}

/// Synthesize (or reuse) a clip and answer with its absolute URL.
pub async fn speak(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<String, AppError> {
    state.access.check_credentials(&ctx.headers)?;

    let text = ctx
        .param("text")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Text is missing".into()))?;

    let voice = ctx
        .param("voice")
        .filter(|v| !v.is_empty())
        .unwrap_or(state.speech.default_voice());

    let entry = state.speech.fetch_or_synthesize(voice, text).await?;
    tracing::debug!(
        "Key {} at {} (synthesized: {})",
        entry.key,
        entry.path.display(),
        entry.synthesized
    );

    let base_url = ctx.base_url(&state.public.scheme, &state.host, state.port);
    Ok(format!(
        "{}{}/{}/{}",
        base_url,
        state.public.media_route.trim_end_matches('/'),
        CACHE_SUBDIR,
        entry.file_name
    ))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
