use serde::{Deserialize, Serialize};
use tracing::debug;

/// Messages sent to the recording server over the duplex channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Start a session against an existing topic.
    #[serde(rename = "init")]
    Init {
        title_id: String,
        title_name: String,
        stt_language: String,
        translate_source: String,
        translate_target: String,
    },

    /// One batch of little-endian 16-bit PCM samples, base64-encoded.
    #[serde(rename = "audio.chunk")]
    AudioChunk { pcm16_b64: String },

    /// Request finalization of the session.
    #[serde(rename = "stop")]
    Stop,
}

/// Messages pushed by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Revised draft of the current source-language utterance. Replaces the
    /// previous draft wholesale.
    #[serde(rename = "stt.delta")]
    SttDelta {
        #[serde(default)]
        text: String,
    },

    /// A finalized source-language segment.
    #[serde(rename = "stt.commit")]
    SttCommit {
        #[serde(default)]
        text: String,
    },

    /// Streamed translation fragment for the segment currently being
    /// translated. Older servers send `text_delta`.
    #[serde(rename = "translation.delta")]
    TranslationDelta {
        #[serde(default, alias = "text_delta")]
        delta: String,
    },

    /// A finalized target-language segment.
    #[serde(rename = "translation.commit")]
    TranslationCommit {
        #[serde(default)]
        text: String,
    },

    /// Authoritative full transcripts, sent once the server has flushed
    /// everything. Supersedes all accumulated state.
    #[serde(rename = "final.result")]
    FinalResult {
        #[serde(default)]
        source: String,
        #[serde(default)]
        target: String,
    },

    /// Server-side failure. Either field may carry the description.
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

impl ServerMessage {
    /// Parse one raw channel payload. Malformed JSON is dropped silently;
    /// well-formed messages of an unhandled type are logged and dropped.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        match serde_json::from_value(value.clone()) {
            Ok(msg) => Some(msg),
            Err(_) => {
                let kind = value
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("<untagged>");
                debug!("Ignoring server message of type {}", kind);
                None
            }
        }
    }

    /// Human-readable reason for an `error` message.
    pub fn error_reason(error: &Option<String>, message: &Option<String>) -> String {
        error
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| message.clone().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "unknown".to_string())
    }
}
