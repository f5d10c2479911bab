//! Microsoft Edge TTS provider.
//!
//! Uses Microsoft Edge's text-to-speech service for free, high-quality
//! speech synthesis. Supports multiple voices and languages.
//!
//! Edge TTS communicates via WebSocket to the speech service endpoint
//! and returns audio in MP3 format.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MediaError;
use crate::media::tts::{TtsFormat, TtsProvider, TtsVoice, VoiceGender};

/// Edge TTS voice metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeVoice {
    /// Short name (e.g., "en-US-AriaNeural").
    pub short_name: String,
    /// Display name.
    pub display_name: String,
    /// Locale (e.g., "en-US").
    pub locale: String,
    /// Gender.
    pub gender: String,
    /// Voice type (e.g., "Neural").
    pub voice_type: String,
}

/// Microsoft Edge TTS provider.
///
/// Provides free, high-quality neural TTS without requiring API keys.
/// Uses the same service that powers Microsoft Edge's "Read Aloud" feature.
pub struct EdgeTtsProvider {
    /// Maximum text length per request.
    max_text_length: usize,
    /// Default voice to use.
    default_voice: String,
    /// WebSocket endpoint for the TTS service.
    endpoint: String,
}

impl EdgeTtsProvider {
    /// Edge TTS WebSocket endpoint.
    const DEFAULT_ENDPOINT: &'static str =
        "wss://speech.platform.bing.com/consumer/speech/synthesize/readaloud/edge/v1";

    /// Create a new Edge TTS provider.
    pub fn new() -> Self {
        Self {
            max_text_length: 10_000,
            default_voice: "en-US-AriaNeural".to_string(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Set the default voice.
    pub fn with_default_voice(mut self, voice: String) -> Self {
        self.default_voice = voice;
        self
    }

    /// Set maximum text length.
    pub fn with_max_text_length(mut self, max: usize) -> Self {
        self.max_text_length = max;
        self
    }

    /// Get the default voice name.
    pub fn default_voice(&self) -> &str {
        &self.default_voice
    }

    /// Get the WebSocket endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the maximum text length.
    pub fn max_text_length(&self) -> usize {
        self.max_text_length
    }

    /// Get the list of popular Edge TTS voices.
    pub fn popular_voices() -> Vec<EdgeVoice> {
        vec![
            EdgeVoice {
                short_name: "en-US-AriaNeural".to_string(),
                display_name: "Aria".to_string(),
                locale: "en-US".to_string(),
                gender: "Female".to_string(),
                voice_type: "Neural".to_string(),
            },
            EdgeVoice {
                short_name: "en-US-GuyNeural".to_string(),
                display_name: "Guy".to_string(),
                locale: "en-US".to_string(),
                gender: "Male".to_string(),
                voice_type: "Neural".to_string(),
            },
            EdgeVoice {
                short_name: "en-US-JennyNeural".to_string(),
                display_name: "Jenny".to_string(),
                locale: "en-US".to_string(),
                gender: "Female".to_string(),
                voice_type: "Neural".to_string(),
            },
            EdgeVoice {
                short_name: "en-GB-SoniaNeural".to_string(),
                display_name: "Sonia".to_string(),
                locale: "en-GB".to_string(),
                gender: "Female".to_string(),
                voice_type: "Neural".to_string(),
            },
            EdgeVoice {
                short_name: "en-GB-RyanNeural".to_string(),
                display_name: "Ryan".to_string(),
                locale: "en-GB".to_string(),
                gender: "Male".to_string(),
                voice_type: "Neural".to_string(),
            },
            EdgeVoice {
                short_name: "es-ES-ElviraNeural".to_string(),
                display_name: "Elvira".to_string(),
                locale: "es-ES".to_string(),
                gender: "Female".to_string(),
                voice_type: "Neural".to_string(),
            },
            EdgeVoice {
                short_name: "fr-FR-DeniseNeural".to_string(),
                display_name: "Denise".to_string(),
                locale: "fr-FR".to_string(),
                gender: "Female".to_string(),
                voice_type: "Neural".to_string(),
            },
            EdgeVoice {
                short_name: "de-DE-KatjaNeural".to_string(),
                display_name: "Katja".to_string(),
                locale: "de-DE".to_string(),
                gender: "Female".to_string(),
                voice_type: "Neural".to_string(),
            },
            EdgeVoice {
                short_name: "ja-JP-NanamiNeural".to_string(),
                display_name: "Nanami".to_string(),
                locale: "ja-JP".to_string(),
                gender: "Female".to_string(),
                voice_type: "Neural".to_string(),
            },
            EdgeVoice {
                short_name: "zh-CN-XiaoxiaoNeural".to_string(),
                display_name: "Xiaoxiao".to_string(),
                locale: "zh-CN".to_string(),
                gender: "Female".to_string(),
                voice_type: "Neural".to_string(),
            },
        ]
    }

    /// Build SSML from text and voice.
    pub fn build_ssml(text: &str, voice_name: &str) -> String {
        format!(
            r#"<speak version="1.0" xmlns="http://www.w3.org/2001/10/synthesis" xml:lang="en-US"><voice name="{}">{}</voice></speak>"#,
            voice_name,
            escape_xml(text)
        )
    }
}

/// Escape special XML characters.
fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

impl Default for EdgeTtsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsProvider for EdgeTtsProvider {
    async fn synthesize(
        &self,
        text: &str,
        voice: &TtsVoice,
        _format: TtsFormat,
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

        // Build SSML
        let _ssml = Self::build_ssml(text, &voice.name);

        // TODO: Connect to Edge TTS WebSocket endpoint and stream audio
        // For now, return an error indicating the WebSocket transport is not yet connected
        Err(MediaError::ProcessingFailed {
            reason: "Edge TTS WebSocket transport not yet connected. \
                     Install tokio-tungstenite for WebSocket support."
                .to_string(),
        })
    }

    fn name(&self) -> &str {
        "edge_tts"
    }

    fn is_available(&self) -> bool {
        // Edge TTS is free and always available (no API key needed)
        true
    }

    fn available_voices(&self) -> Vec<TtsVoice> {
        Self::popular_voices()
            .into_iter()
            .map(|v| {
                let gender = match v.gender.as_str() {
                    "Male" => VoiceGender::Male,
                    "Female" => VoiceGender::Female,
                    _ => VoiceGender::Neutral,
                };
                TtsVoice::new(v.short_name, v.locale, gender)
            })
            .collect()
    }
}
