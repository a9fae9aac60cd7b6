use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::provider::{SpeechSynthesizer, SynthesisRequest};
use crate::error::AppError;

/// Canned synthesizer that records every call.
pub struct MockSynthesizer {
    audio: Vec<u8>,
    failure: Option<String>,
    calls: AtomicUsize,
    last_request: Mutex<Option<SynthesisRequest>>,
}

impl MockSynthesizer {
    pub fn returning(audio: &[u8]) -> Self {
        Self {
            audio: audio.to_vec(),
            failure: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::returning(&[])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<SynthesisRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        match &self.failure {
            Some(message) => Err(AppError::Provider(message.clone())),
            None => Ok(self.audio.clone()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
