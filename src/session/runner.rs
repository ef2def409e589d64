use anyhow::Result;
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{interval, sleep, MissedTickBehavior, Sleep};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::state::{Action, Session, SessionEvent, SessionParams};
use crate::audio::{CaptureConfig, FrameQueue, MicCapture};
use crate::protocol::{ClientMessage, ServerMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Tunables the driver needs beyond the session parameters.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub ws_url: String,
    pub send_interval: Duration,
    pub reconnect_delay: Duration,
    pub stop_grace: Duration,
    pub sample_rate: u32,
    pub archive_dir: Option<PathBuf>,
}

/// Final transcripts once the session has wound down.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub source: String,
    pub target: String,
}

enum Step {
    SendTick,
    Channel(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
    ReconnectElapsed,
    StopTimeout,
    Interrupt,
}

/// Drives one [`Session`] against a live WebSocket: owns the socket, the
/// microphone handle and the timers, feeds observations into the state
/// machine and carries out the actions it returns.
pub struct SessionRunner {
    config: RunnerConfig,
    session: Session,
    ws: Option<WsStream>,
    capture: Option<MicCapture>,
    queue: Arc<Mutex<FrameQueue>>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    stop_timer: Option<Pin<Box<Sleep>>>,
    done: bool,
}

impl SessionRunner {
    pub fn new(params: SessionParams, config: RunnerConfig) -> Self {
        let session = Session::new(params, config.reconnect_delay, config.stop_grace);
        Self {
            config,
            session,
            ws: None,
            capture: None,
            queue: Arc::new(Mutex::new(FrameQueue::new())),
            reconnect_timer: None,
            stop_timer: None,
            done: false,
        }
    }

    /// Record one session end to end. Returns when the server delivers the
    /// final result after a stop, or on a second interrupt.
    pub async fn run(
        params: SessionParams,
        config: RunnerConfig,
        preload: Option<(String, String)>,
    ) -> Result<SessionOutcome> {
        let mut runner = Self::new(params, config);
        if let Some((original, translated)) = preload {
            runner.session.preload(&original, &translated);
        }
        runner.run_loop().await
    }

    async fn run_loop(&mut self) -> Result<SessionOutcome> {
        let actions = self.session.start()?;
        self.execute(actions).await;

        let mut tick = interval(self.config.send_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.done {
            let step = tokio::select! {
                _ = tick.tick() => Step::SendTick,
                msg = next_message(&mut self.ws) => Step::Channel(msg),
                Some(()) = fire(&mut self.reconnect_timer) => Step::ReconnectElapsed,
                Some(()) = fire(&mut self.stop_timer) => Step::StopTimeout,
                _ = tokio::signal::ctrl_c() => Step::Interrupt,
            };

            match step {
                Step::SendTick => {
                    let payload = self.queue.lock().ok().and_then(|mut q| q.drain());
                    if let Some(payload) = payload {
                        self.dispatch(SessionEvent::AudioReady(payload)).await;
                    }
                }
                Step::Channel(msg) => self.on_channel(msg).await,
                Step::ReconnectElapsed => self.dispatch(SessionEvent::ReconnectElapsed).await,
                Step::StopTimeout => self.dispatch(SessionEvent::StopTimeout).await,
                Step::Interrupt => {
                    if self.session.is_stopping() {
                        info!("Interrupted again, abandoning wait for final result");
                        break;
                    }
                    let actions = self.session.stop();
                    self.execute(actions).await;
                }
            }
        }

        // Whatever is left gets released here regardless of how we exited.
        if let Some(mut capture) = self.capture.take() {
            capture.close();
        }
        if let Some(mut ws) = self.ws.take() {
            let _ = ws.close(None).await;
        }

        Ok(SessionOutcome {
            source: self.session.source().display(),
            target: self.session.target().display(),
        })
    }

    async fn on_channel(
        &mut self,
        msg: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
    ) {
        match msg {
            Some(Ok(Message::Text(text))) => {
                if let Some(server_msg) = ServerMessage::parse(&text) {
                    self.render(&server_msg);
                    self.dispatch(SessionEvent::ChannelMessage(server_msg)).await;
                }
            }
            Some(Ok(Message::Close(frame))) => {
                debug!("Channel close frame: {:?}", frame);
                self.ws = None;
                self.dispatch(SessionEvent::ChannelClosed).await;
            }
            Some(Ok(_)) => {
                // Ping/pong handled by the library; binary is not part of
                // the server protocol.
            }
            Some(Err(e)) => {
                warn!("Channel error: {}", e);
                self.ws = None;
                self.dispatch(SessionEvent::ChannelError).await;
            }
            None => {
                self.ws = None;
                self.dispatch(SessionEvent::ChannelClosed).await;
            }
        }
    }

    async fn dispatch(&mut self, event: SessionEvent) {
        let actions = self.session.handle_event(event);
        self.execute(actions).await;
    }

    /// Carry out actions in order. Failures feed back into the machine as
    /// further events, queued rather than recursed.
    async fn execute(&mut self, actions: Vec<Action>) {
        let mut pending: VecDeque<Action> = actions.into();

        while let Some(action) = pending.pop_front() {
            match action {
                Action::OpenChannel => {
                    let url = self.config.ws_url.clone();
                    match connect_async(url.as_str()).await {
                        Ok((stream, _)) => {
                            info!("Channel open: {}", url);
                            self.ws = Some(stream);
                            pending.extend(self.session.handle_event(SessionEvent::ChannelOpen));
                        }
                        Err(e) => {
                            warn!("Failed to open channel {}: {}", url, e);
                            self.ws = None;
                            pending.extend(self.session.handle_event(SessionEvent::ChannelError));
                        }
                    }
                }
                Action::Send(msg) => {
                    if !self.send(msg).await {
                        pending.extend(self.session.handle_event(SessionEvent::ChannelError));
                    }
                }
                Action::CloseChannel => {
                    if let Some(mut ws) = self.ws.take() {
                        let _ = ws.close(None).await;
                    }
                }
                Action::StartCapture => {
                    if let Err(e) = self.start_capture() {
                        // Permission/device problems are surfaced, never
                        // retried; wind the session down cleanly.
                        error!("Microphone unavailable: {e:#}");
                        pending.extend(self.session.stop());
                    }
                }
                Action::StopCapture => {
                    if let Some(mut capture) = self.capture.take() {
                        capture.close();
                    }
                }
                Action::ScheduleReconnect(delay) => {
                    self.reconnect_timer = Some(Box::pin(sleep(delay)));
                }
                Action::ScheduleStopTimeout(delay) => {
                    self.stop_timer = Some(Box::pin(sleep(delay)));
                }
                Action::SetStatus(status) => {
                    info!("Status: {}", status);
                }
                Action::SessionEnded => {
                    self.done = true;
                }
            }
        }
    }

    /// Send one control or audio message. Returns false on transport
    /// failure; messages without an open channel are dropped silently.
    async fn send(&mut self, msg: ClientMessage) -> bool {
        let Some(ws) = self.ws.as_mut() else {
            debug!("Dropping outbound message, channel not open");
            return true;
        };
        let json = match serde_json::to_string(&msg) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode message: {}", e);
                return true;
            }
        };
        match ws.send(Message::Text(json)).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Send failed: {}", e);
                self.ws = None;
                false
            }
        }
    }

    fn start_capture(&mut self) -> Result<()> {
        if self.capture.is_some() {
            return Ok(());
        }
        let capture_config = CaptureConfig {
            target_sample_rate: self.config.sample_rate,
            archive_dir: self.config.archive_dir.clone(),
            session_label: self.session.params().title_id.clone(),
        };
        self.capture = Some(MicCapture::open(capture_config, Arc::clone(&self.queue))?);
        Ok(())
    }

    /// Console rendering of incremental results, before the buffers mutate.
    fn render(&self, msg: &ServerMessage) {
        match msg {
            ServerMessage::SttDelta { text } => {
                print!("\r{}", text);
                std::io::stdout().flush().ok();
            }
            ServerMessage::SttCommit { text } => {
                let text = text.trim();
                if !text.is_empty() {
                    println!("\r{}", text);
                }
            }
            ServerMessage::TranslationCommit { text } => {
                let text = text.trim();
                if !text.is_empty() {
                    println!("  -> {}", text);
                }
            }
            _ => {}
        }
    }
}

async fn next_message(
    ws: &mut Option<WsStream>,
) -> Option<Result<Message, tokio_tungstenite::tungstenite::Error>> {
    match ws {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// Await an armed one-shot timer; disarmed slots never resolve.
async fn fire(slot: &mut Option<Pin<Box<Sleep>>>) -> Option<()> {
    match slot {
        Some(timer) => {
            timer.as_mut().await;
            *slot = None;
            Some(())
        }
        None => std::future::pending().await,
    }
}
