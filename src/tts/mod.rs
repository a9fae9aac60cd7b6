pub mod polly;
pub mod provider;

#[cfg(test)]
pub mod mock;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, SecondsFormat};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::SpeechConfig;
use crate::error::AppError;

pub use polly::PollySynthesizer;
pub use provider::{SpeechSynthesizer, SynthesisRequest};

/// Cache location relative to the audio base directory.
pub const CACHE_SUBDIR: &str = "tts";
const CATALOG_FILE: &str = "catalog.csv";

/// One synthesized clip on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub file_name: String,
    pub path: PathBuf,
    /// False when the clip was already cached.
    pub synthesized: bool,
}

/// Synthesizes speech once per (voice, text) and keeps the MP3 forever.
pub struct SpeechService {
    cache_dir: PathBuf,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    default_voice: String,
    sample_rate: u32,
    catalog_lock: Mutex<()>,
}

impl SpeechService {
    pub fn new(base_dir: &Path, config: &SpeechConfig, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            cache_dir: base_dir.join(CACHE_SUBDIR),
            synthesizer,
            default_voice: config.default_voice.clone(),
            sample_rate: config.sample_rate,
            catalog_lock: Mutex::new(()),
        }
    }

    pub fn default_voice(&self) -> &str {
        &self.default_voice
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub async fn fetch_or_synthesize(&self, voice: &str, text: &str) -> Result<CacheEntry, AppError> {
        let key = cache_key(voice, text);
        let file_name = format!("{}.mp3", key);
        let path = self.cache_dir.join(&file_name);

        let cached = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.is_file(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        if cached {
            tracing::info!("Cache hit: {}", file_name);
            return Ok(CacheEntry {
                key,
                file_name,
                path,
                synthesized: false,
            });
        }

        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let request = SynthesisRequest::new(text, voice, self.sample_rate);
        tracing::info!(
            "Synthesizing {} with voice {} via {}",
            file_name,
            voice,
            self.synthesizer.name()
        );
        tracing::debug!("Text type {:?}, {} chars", request.text_type, text.len());

        let audio = self.synthesizer.synthesize(&request).await?;
        self.store(&path, &audio).await?;

        // An empty clip is kept on disk but never catalogued.
        if !audio.is_empty() {
            if let Err(e) = self.append_catalog(&file_name, voice, text).await {
                tracing::error!("Failed to append {} to catalog: {}", file_name, e);
            }
        }

        Ok(CacheEntry {
            key,
            file_name,
            path,
            synthesized: true,
        })
    }

    /// Write under a temporary name, then rename, so the final path only ever holds a complete clip.
    async fn store(&self, path: &Path, audio: &[u8]) -> Result<(), AppError> {
        let mut staging = path.as_os_str().to_owned();
        staging.push(format!(".{:016x}.tmp", rand::random::<u64>()));
        let staging = PathBuf::from(staging);

        let written = match tokio::fs::write(&staging, audio).await {
            Ok(()) => tokio::fs::rename(&staging, path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
                tracing::debug!("No staging file to remove at {}: {}", staging.display(), cleanup);
            }
            return Err(e.into());
        }

        Ok(())
    }

    async fn append_catalog(&self, file_name: &str, voice: &str, text: &str) -> Result<(), AppError> {
        let timestamp = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
        let line = format!("{}\t{}\t{}\t{}\n", timestamp, file_name, voice, text);

        let _guard = self.catalog_lock.lock().await;
        let mut catalog = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.cache_dir.join(CATALOG_FILE))
            .await?;
        catalog.write_all(line.as_bytes()).await?;
        catalog.flush().await?;

        Ok(())
    }
}

/// MD5 of the ASCII-uppercased voice followed by the text, as lowercase hex.
pub fn cache_key(voice: &str, text: &str) -> String {
    let normalized = format!("{}{}", voice, text).to_ascii_uppercase();
    format!("{:x}", md5::compute(normalized.as_bytes()))
}
