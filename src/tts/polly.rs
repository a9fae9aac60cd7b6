//! Amazon Polly backend

use async_trait::async_trait;
use aws_sdk_polly::config::Region;
use aws_sdk_polly::error::DisplayErrorContext;
use aws_sdk_polly::types::{OutputFormat, TextType as PollyTextType, VoiceId};
use aws_sdk_polly::Client;

use super::provider::{SpeechSynthesizer, SynthesisRequest, TextType};
use crate::config::SpeechConfig;
use crate::error::AppError;

pub struct PollySynthesizer {
    client: Client,
}

impl PollySynthesizer {
    /// Credentials come from the standard AWS provider chain.
    pub async fn new(config: &SpeechConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }

        loader = loader.region(Region::new(config.region.clone()));

        let aws_config = loader.load().await;
        Self {
            client: Client::new(&aws_config),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for PollySynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, AppError> {
        let text_type = match request.text_type {
            TextType::Ssml => PollyTextType::Ssml,
            TextType::Plain => PollyTextType::Text,
        };

        let response = self
            .client
            .synthesize_speech()
            .text(&request.text)
            .text_type(text_type)
            .voice_id(VoiceId::from(request.voice.as_str()))
            .output_format(OutputFormat::Mp3)
            .sample_rate(request.sample_rate.to_string())
            .send()
            .await
            .map_err(|e| AppError::Provider(DisplayErrorContext(&e).to_string()))?;

        let audio = response
            .audio_stream
            .collect()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to read audio stream: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(audio)
    }

    fn name(&self) -> &str {
        "polly"
    }
}
