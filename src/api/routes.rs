use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::handlers;
use crate::access::AccessPolicy;
use crate::audio::AudioLibrary;
use crate::config::PublicConfig;
use crate::tts::SpeechService;

pub struct AppState {
    pub audio: AudioLibrary,
    pub access: AccessPolicy,
    pub speech: SpeechService,
    pub public: PublicConfig,
    pub host: String,
    pub port: u16,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let media = ServeDir::new(state.audio.base_dir());

    let router = Router::new()
        .route("/audio", get(handlers::audio))
        .route(
            "/tts",
            get(handlers::speak)
                .post(handlers::speak)
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    handlers::allow_listed,
                )),
        )
        .route("/health", get(handlers::health));

    // axum refuses to nest at the root
    let router = if state.public.media_route == "/" {
        router.fallback_service(media)
    } else {
        router.nest_service(&state.public.media_route, media)
    };

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
