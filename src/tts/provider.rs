use async_trait::async_trait;

use crate::error::AppError;

/// How the provider should interpret the submitted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextType {
    Plain,
    Ssml,
}

impl TextType {
    /// Text opening with a `<speak>` root element is SSML.
    pub fn detect(text: &str) -> Self {
        if text.starts_with("<speak>") || text.starts_with("<speak ") {
            TextType::Ssml
        } else {
            TextType::Plain
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub text_type: TextType,
    pub sample_rate: u32,
}

impl SynthesisRequest {
    pub fn new(text: &str, voice: &str, sample_rate: u32) -> Self {
        Self {
            text: text.to_string(),
            voice: voice.to_string(),
            text_type: TextType::detect(text),
            sample_rate,
        }
    }
}

/// A remote text-to-speech backend producing MP3 audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, AppError>;

    fn name(&self) -> &str;
}
