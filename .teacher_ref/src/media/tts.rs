//! Text-to-speech support.
//!
//! Provides a trait-based abstraction for TTS providers, with an
//! OpenAI TTS API implementation. Supports multiple audio output
//! formats and voice configurations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MediaError;

/// Supported TTS audio output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TtsFormat {
    /// MPEG Audio Layer III.
    Mp3,
    /// Waveform Audio File Format.
    Wav,
    /// Ogg Vorbis container.
    Ogg,
    /// Opus audio codec.
    Opus,
}

impl std::fmt::Display for TtsFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mp3 => write!(f, "mp3"),
            Self::Wav => write!(f, "wav"),
            Self::Ogg => write!(f, "ogg"),
            Self::Opus => write!(f, "opus"),
        }
    }
}

impl TtsFormat {
    /// Get the MIME type for this audio format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::Ogg => "audio/ogg",
            Self::Opus => "audio/opus",
        }
    }

    /// Get the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Opus => "opus",
        }
    }

    /// Parse from a format string.
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mp3" => Some(Self::Mp3),
            "wav" => Some(Self::Wav),
            "ogg" => Some(Self::Ogg),
            "opus" => Some(Self::Opus),
            _ => None,
        }
    }
}

/// Voice configuration for TTS synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsVoice {
    /// Voice identifier (provider-specific, e.g., "alloy", "echo", "nova").
    pub name: String,
    /// Language code (e.g., "en", "es", "fr").
    pub language: String,
    /// Gender of the voice.
    pub gender: VoiceGender,
}

/// Gender classification for TTS voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceGender {
    /// Male voice.
    Male,
    /// Female voice.
    Female,
    /// Neutral or unspecified gender.
    Neutral,
}

impl std::fmt::Display for VoiceGender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

impl TtsVoice {
    /// Create a new voice configuration.
    pub fn new(name: impl Into<String>, language: impl Into<String>, gender: VoiceGender) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            gender,
        }
    }
}

/// Trait for text-to-speech providers.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesize speech from text.
    ///
    /// # Arguments
    /// * `text` - The text to convert to speech
    /// * `voice` - Voice configuration to use
    /// * `format` - Desired audio output format
    ///
    /// # Returns
    /// Raw audio bytes in the requested format.
    async fn synthesize(
        &self,
        text: &str,
        voice: &TtsVoice,
        format: TtsFormat,
    ) -> Result<Vec<u8>, MediaError>;

    /// Get the provider name.
    fn name(&self) -> &str;

    /// Check if the provider is available and configured.
    fn is_available(&self) -> bool;

    /// List available voices for this provider.
    fn available_voices(&self) -> Vec<TtsVoice>;
}

/// OpenAI TTS API provider.
///
/// Uses the OpenAI `/v1/audio/speech` endpoint to synthesize speech.
/// Supports voices: alloy, echo, fable, onyx, nova, shimmer.
pub struct OpenAiTtsProvider {
    api_key: String,
    base_url: String,
    model: String,
    max_text_length: usize,
}

impl OpenAiTtsProvider {
    /// Create a new OpenAI TTS provider.
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "tts-1".to_string(),
            max_text_length: 4096,
        }
    }

    /// Use a custom base URL (for OpenAI-compatible endpoints).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Set the TTS model to use (e.g., "tts-1" or "tts-1-hd").
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Set the maximum text length for a single request.
    pub fn with_max_text_length(mut self, max: usize) -> Self {
        self.max_text_length = max;
        self
    }

    /// Map TtsFormat to the OpenAI API response_format parameter.
    fn format_to_api_param(format: TtsFormat) -> &'static str {
        match format {
            TtsFormat::Mp3 => "mp3",
            TtsFormat::Wav => "wav",
            TtsFormat::Ogg => "opus", // OpenAI uses "opus" for Ogg container
            TtsFormat::Opus => "opus",
        }
    }

    /// Get the default available voices for the OpenAI TTS API.
    fn default_voices() -> Vec<TtsVoice> {
        vec![
            TtsVoice::new("alloy", "en", VoiceGender::Neutral),
            TtsVoice::new("echo", "en", VoiceGender::Male),
            TtsVoice::new("fable", "en", VoiceGender::Neutral),
            TtsVoice::new("onyx", "en", VoiceGender::Male),
            TtsVoice::new("nova", "en", VoiceGender::Female),
            TtsVoice::new("shimmer", "en", VoiceGender::Female),
        ]
    }
}

#[async_trait]
impl TtsProvider for OpenAiTtsProvider {
    async fn synthesize(
        &self,
        text: &str,
        voice: &TtsVoice,
        format: TtsFormat,
    ) -> Result<Vec<u8>, MediaError> {
        if text.is_empty() {
            return Err(MediaError::ProcessingFailed {
                reason: "Cannot synthesize empty text".to_string(),
            });
        }

        if text.len() > self.max_text_length {
            return Err(MediaError::ProcessingFailed {
                reason: format!(
                    "Text length {} exceeds maximum {} characters",
                    text.len(),
                    self.max_text_length
                ),
            });
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": voice.name,
            "response_format": Self::format_to_api_param(format),
        });

        let client = reqwest::Client::new();
        let response = client
            .post(format!("{}/audio/speech", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| MediaError::ProcessingFailed {
                reason: format!("TTS HTTP request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::ProcessingFailed {
                reason: format!("OpenAI TTS API returned {}: {}", status, body),
            });
        }

        let audio_bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::ProcessingFailed {
                reason: format!("Failed to read TTS response body: {}", e),
            })?;

        Ok(audio_bytes.to_vec())
    }

    fn name(&self) -> &str {
        "openai_tts"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn available_voices(&self) -> Vec<TtsVoice> {
        Self::default_voices()
    }
}
