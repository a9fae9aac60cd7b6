use std::net::IpAddr;
use std::path::PathBuf;

use secrecy::SecretString;

/// Sample rates the provider accepts for MP3 output.
const SUPPORTED_SAMPLE_RATES: [u32; 4] = [8000, 16000, 22050, 24000];

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is not a valid port: {value}")]
    InvalidPort { name: &'static str, value: String },

    #[error("TTS_AUTHORIZED_IPS contains an invalid address: {0}")]
    InvalidAddress(String),

    #[error("TTS_SAMPLE_RATE must be one of 8000, 16000, 22050, 24000 (got {0})")]
    InvalidSampleRate(String),
}

#[derive(Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub audio: AudioConfig,
    pub public: PublicConfig,
    pub access: AccessConfig,
    pub speech: SpeechConfig,
}

#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub base_dir: PathBuf,
    pub default_random_dir: String,
}

/// How URLs handed back to callers are built.
#[derive(Debug, Clone)]
pub struct PublicConfig {
    pub scheme: String,
    pub media_route: String,
}

#[derive(Debug)]
pub struct AccessConfig {
    pub authorized_ips: Vec<IpAddr>,
    pub username: String,
    pub password: SecretString,
    pub realm: String,
    pub fallback_header: String,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub default_voice: String,
    pub sample_rate: u32,
    pub region: String,
    pub profile: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let require = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let port_raw = get("PORT", "3000");
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort {
                name: "PORT",
                value: port_raw.clone(),
            })?;

        let authorized_ips = parse_ip_list(&get("TTS_AUTHORIZED_IPS", ""))?;

        let sample_rate_raw = get("TTS_SAMPLE_RATE", "16000");
        let sample_rate = sample_rate_raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|rate| SUPPORTED_SAMPLE_RATES.contains(rate))
            .ok_or(ConfigError::InvalidSampleRate(sample_rate_raw))?;

        Ok(Self {
            host: get("HOST", "0.0.0.0"),
            port,
            audio: AudioConfig {
                base_dir: PathBuf::from(get("AUDIO_BASE_DIR", "./mp3")),
                default_random_dir: get("DEFAULT_RANDOM_DIR", "famous_movies_dialogs"),
            },
            public: PublicConfig {
                scheme: get("PUBLIC_SCHEME", "http"),
                media_route: normalize_route(&get("MEDIA_ROUTE", "/mp3")),
            },
            access: AccessConfig {
                authorized_ips,
                username: require("TTS_AUTH_USER")?,
                password: SecretString::from(require("TTS_AUTH_PASSWORD")?),
                realm: get("TTS_AUTH_REALM", "Speech Synthesis"),
                fallback_header: get("TTS_AUTH_FALLBACK_HEADER", "X-Forwarded-Authorization"),
            },
            speech: SpeechConfig {
                default_voice: get("TTS_DEFAULT_VOICE", "Matthew"),
                sample_rate,
                region: get("AWS_REGION", "us-west-1"),
                profile: lookup("AWS_PROFILE").filter(|p| !p.is_empty()),
            },
        })
    }
}

fn parse_ip_list(raw: &str) -> Result<Vec<IpAddr>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpAddr>()
                .map(|ip| ip.to_canonical())
                .map_err(|_| ConfigError::InvalidAddress(s.to_string()))
        })
        .collect()
}

/// `/mp3/` and `mp3` both become `/mp3`.
fn normalize_route(route: &str) -> String {
    let trimmed = route.trim().trim_matches('/');
    format!("/{}", trimmed)
}
