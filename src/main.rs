use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod access;
mod api;
mod audio;
mod config;
mod error;
mod tts;

use access::AccessPolicy;
use api::routes::{create_router, AppState};
use audio::AudioLibrary;
use config::Config;
use tts::{PollySynthesizer, SpeechService};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid listen address {}:{}: {}", config.host, config.port, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Voice companion server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Starting server on http://{}", addr);
    tracing::info!("Audio directory: {}", config.audio.base_dir.display());
    tracing::info!(
        "Speech provider region: {} (default voice {})",
        config.speech.region,
        config.speech.default_voice
    );
    if config.access.authorized_ips.is_empty() {
        tracing::warn!("TTS_AUTHORIZED_IPS is empty: any caller address may request synthesis");
    }

    let synthesizer = PollySynthesizer::new(&config.speech).await;

    let Config {
        host,
        port,
        audio,
        public,
        access,
        speech,
    } = config;

    let state = Arc::new(AppState {
        audio: AudioLibrary::new(&audio, &public.media_route),
        access: AccessPolicy::new(access),
        speech: SpeechService::new(&audio.base_dir, &speech, Arc::new(synthesizer)),
        public,
        host,
        port,
    });

    tracing::info!("Speech cache: {}", state.speech.cache_dir().display());

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("Server error");
}
