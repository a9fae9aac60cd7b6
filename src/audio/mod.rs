use std::path::{Path, PathBuf};

use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::config::AudioConfig;
use crate::error::AppError;

const AUDIO_EXTENSION: &str = "mp3";

/// Audio files organised as `<base>/<category>/<file>.mp3`.
pub struct AudioLibrary {
    base_dir: PathBuf,
    default_dir: String,
    /// Prefix for paths reported by [`AudioLibrary::list`], e.g. `mp3`.
    public_prefix: String,
}

impl AudioLibrary {
    pub fn new(config: &AudioConfig, media_route: &str) -> Self {
        Self {
            base_dir: config.base_dir.clone(),
            default_dir: sanitize_dir(&config.default_random_dir),
            public_prefix: media_route.trim_matches('/').to_string(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Every audio file one level below the base directory, sorted by category then name.
    pub fn list(&self) -> Result<Vec<String>, AppError> {
        let mut tracks = Vec::new();

        if !self.base_dir.is_dir() {
            return Ok(tracks);
        }

        let mut categories = Vec::new();
        for entry in std::fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.is_dir() && !is_hidden(&path) {
                categories.push(path);
            }
        }
        categories.sort();

        for category in categories {
            let Some(category_name) = file_name(&category) else {
                continue;
            };
            for track in audio_files(&category)? {
                if let Some(track_name) = file_name(&track) {
                    tracks.push(self.public_path(&[category_name.as_str(), track_name.as_str()]));
                }
            }
        }

        Ok(tracks)
    }

    /// The catalog as a pretty-printed JSON array.
    pub fn list_json(&self) -> Result<String, AppError> {
        let tracks = self.list()?;

        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        tracks.serialize(&mut serializer)?;

        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Resolve a caller-supplied directory below the base directory.
    pub fn resolve_dir(&self, requested: &str) -> PathBuf {
        let dir = sanitize_dir(requested);
        if dir.is_empty() {
            self.base_dir.join(&self.default_dir)
        } else {
            self.base_dir.join(dir)
        }
    }

    /// Pick one audio file from the requested directory (non-recursive).
    pub fn pick_random(&self, requested: &str) -> Result<PathBuf, AppError> {
        let dir = self.resolve_dir(requested);

        let tracks = if dir.is_dir() {
            audio_files(&dir)?
        } else {
            Vec::new()
        };

        let track = tracks
            .choose(&mut rand::rng())
            .cloned()
            .ok_or_else(|| AppError::NotFound("No MP3 found".into()))?;

        tracing::debug!("Picked {} out of {} tracks", track.display(), tracks.len());
        Ok(track)
    }

    fn public_path(&self, segments: &[&str]) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(segments.len() + 1);
        if !self.public_prefix.is_empty() {
            parts.push(&self.public_prefix);
        }
        parts.extend_from_slice(segments);
        parts.join("/")
    }
}

/// Strip every `.` and any leading `/`, so the result can never climb out of the base.
pub fn sanitize_dir(requested: &str) -> String {
    requested
        .replace('.', "")
        .trim_start_matches('/')
        .to_string()
}

fn audio_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && !is_hidden(&path)
            && path.extension().map(|e| e == AUDIO_EXTENSION).unwrap_or(false)
        {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Dot-entries are skipped, as shell globbing does.
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}
