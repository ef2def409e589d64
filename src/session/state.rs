use anyhow::{bail, Result};
use base64::Engine;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::reconnect::ReconnectPolicy;
use super::transcript::TranscriptBuffer;
use crate::protocol::{ClientMessage, ServerMessage};

/// Duplex channel lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

/// Displayed session status.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Idle,
    Connecting,
    Recording,
    Committing,
    WaitingFinal,
    Disconnected,
    Error(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Idle => write!(f, "Idle"),
            Status::Connecting => write!(f, "Connecting..."),
            Status::Recording => write!(f, "Recording..."),
            Status::Committing => write!(f, "Committing..."),
            Status::WaitingFinal => write!(f, "Waiting for translation..."),
            Status::Disconnected => write!(f, "Disconnected"),
            Status::Error(e) => write!(f, "Err: {e}"),
        }
    }
}

/// Parameters fixed when the session starts and re-sent verbatim in the
/// `init` message after every reconnect.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub title_id: String,
    pub title_name: String,
    pub source_language: String,
    pub target_language: String,
}

impl SessionParams {
    fn init_message(&self) -> ClientMessage {
        ClientMessage::Init {
            title_id: self.title_id.clone(),
            title_name: self.title_name.clone(),
            stt_language: self.source_language.clone(),
            translate_source: self.source_language.clone(),
            translate_target: self.target_language.clone(),
        }
    }
}

/// Everything that can happen to a session, as one closed set so the whole
/// machine is driven through a single dispatch and unit-testable without a
/// transport.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The channel handshake completed.
    ChannelOpen,
    /// A parsed server message arrived.
    ChannelMessage(ServerMessage),
    /// The channel closed.
    ChannelClosed,
    /// Transport-level failure; treated like an unexpected close.
    ChannelError,
    /// The send tick drained a non-empty batch of PCM bytes.
    AudioReady(Vec<u8>),
    /// The reconnect delay elapsed.
    ReconnectElapsed,
    /// The bounded wait after a stop ran out.
    StopTimeout,
}

/// Effects the driver must carry out. The machine never touches the socket
/// or the microphone itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    OpenChannel,
    Send(ClientMessage),
    CloseChannel,
    StartCapture,
    StopCapture,
    ScheduleReconnect(Duration),
    ScheduleStopTimeout(Duration),
    SetStatus(Status),
    SessionEnded,
}

/// One logical recording session: owns the channel lifecycle, both
/// transcript tracks and the stop/reconnect bookkeeping.
///
/// `is_recording` and `is_stopping` are never both true: `stop()` flips the
/// first off before raising the second.
pub struct Session {
    params: SessionParams,
    channel: ChannelState,
    is_recording: bool,
    is_stopping: bool,
    reconnect: ReconnectPolicy,
    stop_grace: Duration,
    source: TranscriptBuffer,
    target: TranscriptBuffer,
}

impl Session {
    pub fn new(params: SessionParams, reconnect_delay: Duration, stop_grace: Duration) -> Self {
        Self {
            params,
            channel: ChannelState::Disconnected,
            is_recording: false,
            is_stopping: false,
            reconnect: ReconnectPolicy::new(reconnect_delay),
            stop_grace,
            source: TranscriptBuffer::new(),
            target: TranscriptBuffer::new(),
        }
    }

    /// Begin recording. Requires a topic and a channel that is neither
    /// connecting nor open; failure is reported to the caller, not fatal.
    pub fn start(&mut self) -> Result<Vec<Action>> {
        if self.params.title_id.trim().is_empty() {
            bail!("No active topic; create or select one before recording");
        }
        if matches!(self.channel, ChannelState::Connecting | ChannelState::Open) {
            bail!("Channel is already open");
        }
        if self.is_recording {
            // Disconnected but still recording: a reconnect is pending and
            // owns the next connect attempt.
            bail!("Session is already recording");
        }
        if self.is_stopping {
            bail!("Previous session is still finalizing");
        }

        info!(
            "Starting session: topic={} {} -> {}",
            self.params.title_id, self.params.source_language, self.params.target_language
        );

        self.is_recording = true;
        self.source.clear_live();
        self.target.clear_live();
        self.channel = ChannelState::Connecting;

        Ok(vec![
            Action::SetStatus(Status::Connecting),
            Action::OpenChannel,
        ])
    }

    /// Stop recording: release the microphone right away but keep the
    /// channel open so the server can push the final result, bounded by a
    /// soft status-only timeout.
    pub fn stop(&mut self) -> Vec<Action> {
        if !self.is_recording {
            return Vec::new();
        }

        info!("Stopping session: topic={}", self.params.title_id);

        self.is_recording = false;
        self.is_stopping = true;
        self.reconnect.cancel();

        vec![
            Action::StopCapture,
            Action::Send(ClientMessage::Stop),
            Action::SetStatus(Status::Committing),
            Action::ScheduleStopTimeout(self.stop_grace),
        ]
    }

    /// Single dispatch for every event the driver observes.
    pub fn handle_event(&mut self, event: SessionEvent) -> Vec<Action> {
        match event {
            SessionEvent::ChannelOpen => self.on_open(),
            SessionEvent::ChannelMessage(msg) => self.on_message(msg),
            SessionEvent::ChannelClosed | SessionEvent::ChannelError => self.on_drop(),
            SessionEvent::AudioReady(payload) => self.on_audio(payload),
            SessionEvent::ReconnectElapsed => self.on_reconnect_elapsed(),
            SessionEvent::StopTimeout => self.on_stop_timeout(),
        }
    }

    fn on_open(&mut self) -> Vec<Action> {
        if self.channel != ChannelState::Connecting {
            debug!("Spurious channel-open in state {:?}", self.channel);
            return Vec::new();
        }
        self.channel = ChannelState::Open;

        vec![
            Action::SetStatus(Status::Recording),
            Action::Send(self.params.init_message()),
            Action::StartCapture,
        ]
    }

    fn on_message(&mut self, msg: ServerMessage) -> Vec<Action> {
        match msg {
            ServerMessage::SttDelta { text } => {
                self.source.replace_live(text);
                Vec::new()
            }
            ServerMessage::SttCommit { text } => {
                self.source.commit(&text);
                Vec::new()
            }
            ServerMessage::TranslationDelta { delta } => {
                if !delta.is_empty() {
                    self.target.append_live(&delta);
                }
                Vec::new()
            }
            ServerMessage::TranslationCommit { text } => {
                self.target.commit(&text);
                Vec::new()
            }
            ServerMessage::FinalResult { source, target } => {
                self.source.replace_committed(&source);
                self.target.replace_committed(&target);
                self.source.clear_live();
                self.target.clear_live();

                if self.is_stopping {
                    self.finish()
                } else {
                    vec![Action::SetStatus(Status::Idle)]
                }
            }
            ServerMessage::Error { error, message } => {
                let reason = ServerMessage::error_reason(&error, &message);
                warn!("Server error: {}", reason);

                // Shown in the target track as well, so the failure is
                // visible next to the transcript it interrupted.
                self.target.replace_live(format!("[SERVER ERROR] {reason}"));

                let mut actions = vec![Action::SetStatus(Status::Error(reason))];
                if self.is_stopping {
                    actions.extend(self.finish());
                }
                actions
            }
        }
    }

    fn on_drop(&mut self) -> Vec<Action> {
        self.channel = ChannelState::Disconnected;

        if !self.is_recording || self.is_stopping {
            // Deliberate teardown or idle churn; resources are already on
            // their way out.
            return Vec::new();
        }

        warn!("Channel dropped while recording");
        let mut actions = vec![
            Action::StopCapture,
            Action::CloseChannel,
            Action::SetStatus(Status::Disconnected),
        ];
        if self.reconnect.request(self.is_recording, self.is_stopping) {
            actions.push(Action::ScheduleReconnect(self.reconnect.delay()));
        }
        actions
    }

    fn on_audio(&mut self, payload: Vec<u8>) -> Vec<Action> {
        if self.channel != ChannelState::Open || !self.is_recording {
            // Fire-and-forget: frames that miss an open channel are lost.
            debug!("Dropping {} audio bytes, channel not open", payload.len());
            return Vec::new();
        }
        let pcm16_b64 = base64::engine::general_purpose::STANDARD.encode(&payload);
        vec![Action::Send(ClientMessage::AudioChunk { pcm16_b64 })]
    }

    fn on_reconnect_elapsed(&mut self) -> Vec<Action> {
        if !self
            .reconnect
            .fire(self.is_recording, self.is_stopping, self.channel)
        {
            debug!("Reconnect suppressed");
            return Vec::new();
        }

        info!("Reconnecting: topic={}", self.params.title_id);
        self.channel = ChannelState::Connecting;
        vec![
            Action::SetStatus(Status::Connecting),
            Action::OpenChannel,
        ]
    }

    fn on_stop_timeout(&mut self) -> Vec<Action> {
        if self.is_stopping {
            vec![Action::SetStatus(Status::WaitingFinal)]
        } else {
            Vec::new()
        }
    }

    fn finish(&mut self) -> Vec<Action> {
        self.is_stopping = false;
        self.channel = ChannelState::Closing;
        vec![
            Action::CloseChannel,
            Action::SetStatus(Status::Idle),
            Action::SessionEnded,
        ]
    }

    pub fn channel(&self) -> ChannelState {
        self.channel
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn is_stopping(&self) -> bool {
        self.is_stopping
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.is_pending()
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn source(&self) -> &TranscriptBuffer {
        &self.source
    }

    pub fn target(&self) -> &TranscriptBuffer {
        &self.target
    }

    /// Seed the committed tracks from a previously stored topic detail.
    pub fn preload(&mut self, original_text: &str, translated_text: &str) {
        self.source.replace_committed(original_text);
        self.target.replace_committed(translated_text);
    }
}
