use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub languages: LanguageConfig,
    pub audio: AudioConfig,
    pub session: SessionTuning,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP base URL of the recording server.
    pub base_url: String,
    /// Path of the streaming endpoint on that server.
    pub ws_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Rate audio is decimated to before upload.
    pub sample_rate: u32,
    /// How often queued frames are flushed into one channel message.
    /// Deployments have run anywhere between 500 and 2000.
    pub send_interval_ms: u64,
    /// When set, keep a local WAV copy of each session under this directory.
    pub archive_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    /// Delay before re-opening a dropped channel.
    pub reconnect_delay_ms: u64,
    /// Soft wait for the final result after a stop; only affects status.
    pub stop_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            ws_path: "/ws/virecord/".to_string(),
        }
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            source: "zh".to_string(),
            target: "vi".to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            send_interval_ms: 500,
            archive_dir: None,
        }
    }
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 600,
            stop_grace_secs: 30,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// The streaming endpoint, derived from the HTTP base URL the way the
    /// server expects it (http -> ws, https -> wss).
    pub fn ws_url(&self) -> String {
        let base = self.server.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{base}")
        };
        format!("{}{}", ws_base, self.server.ws_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_mirrors_http_scheme() {
        let mut cfg = Config::default();
        assert_eq!(cfg.ws_url(), "ws://127.0.0.1:8000/ws/virecord/");

        cfg.server.base_url = "https://record.example.com/".to_string();
        assert_eq!(cfg.ws_url(), "wss://record.example.com/ws/virecord/");
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.audio.sample_rate, 16_000);
        assert_eq!(cfg.audio.send_interval_ms, 500);
        assert_eq!(cfg.session.reconnect_delay_ms, 600);
        assert_eq!(cfg.session.stop_grace_secs, 30);
        assert_eq!(cfg.languages.source, "zh");
        assert_eq!(cfg.languages.target, "vi");
    }
}
