//! Read-only playback of a recorded session.
//!
//! The recorded-session endpoint streams the same `config`/`state`
//! messages as a live game, one per recorded step, plus per-frame
//! metadata (step index and the recorded intent). The only outbound
//! traffic is pause/resume control frames, always JSON text regardless
//! of the live protocol generation.

use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use macroquad::prelude::{is_key_pressed, next_frame, KeyCode};
use shared::{ReplayCommand, ServerMessage, WireCodec, WireFrame, REPLAY_PATH};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::interval;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::audio::AudioEngine;
use crate::effects::EffectTimeline;
use crate::rendering::Renderer;
use crate::session::SessionState;
use crate::state::{ClientState, ConnectionStatus};
use crate::storage::Store;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct ReplaySession {
    conn: Option<WsStream>,
    paused: bool,

    state: ClientState,
    session: SessionState,
    effects: EffectTimeline,
    audio: AudioEngine,
    renderer: Renderer,
}

impl ReplaySession {
    /// Connects to the recorded-session endpoint for one named recording.
    pub async fn connect(
        server: &str,
        file: &str,
        muted: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let url = format!("ws://{}{}?file={}", server, REPLAY_PATH, file);
        info!("Opening recording {}", url);
        let (ws, _) = connect_async(&url).await?;

        let store = Store::in_memory(); // playback never touches the real store
        let session = SessionState::new(&store);
        let mut state = ClientState::new();
        state.connection = ConnectionStatus::Connected;

        Ok(ReplaySession {
            conn: Some(ws),
            paused: false,
            state,
            session,
            effects: EffectTimeline::new(),
            audio: AudioEngine::new(!muted),
            renderer: Renderer::new(),
        })
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut frame_interval = interval(Duration::from_millis(16));

        loop {
            tokio::select! {
                inbound = next_inbound(&mut self.conn) => {
                    let now = Instant::now();
                    match inbound {
                        Some(Ok(message)) => self.handle_message(message, now).await,
                        Some(Err(e)) => {
                            warn!("Playback connection error: {}", e);
                            self.finish(now);
                        }
                        None => self.finish(now),
                    }
                },

                _ = frame_interval.tick() => {
                    let now = Instant::now();
                    if is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q) {
                        break;
                    }
                    if is_key_pressed(KeyCode::Space) || is_key_pressed(KeyCode::P) {
                        self.toggle_pause(now).await;
                    }
                    let game_over = self
                        .state
                        .snapshot
                        .as_ref()
                        .map(|s| s.game_over)
                        .unwrap_or(false);
                    self.effects.tick(now, game_over);
                    self.renderer
                        .draw_frame(&self.state, &self.session, &self.effects, now);
                    next_frame().await;
                },
            }
        }

        Ok(())
    }

    async fn toggle_pause(&mut self, now: Instant) {
        let Some(ws) = self.conn.as_mut() else {
            return;
        };
        self.paused = !self.paused;
        let cmd = if self.paused {
            ReplayCommand::Pause
        } else {
            ReplayCommand::Resume
        };
        match serde_json::to_string(&cmd) {
            Ok(text) => {
                if let Err(e) = ws.send(Message::Text(text)).await {
                    warn!("Pause command failed: {}", e);
                    self.finish(now);
                    return;
                }
            }
            Err(e) => warn!("Failed to encode {:?}: {}", cmd, e),
        }
        let label = if self.paused {
            "Playback paused"
        } else {
            "Playback resumed"
        };
        self.state.local_banner(label, now);
    }

    /// End of the recording. The window stays up on the final frame
    /// until the viewer quits.
    fn finish(&mut self, now: Instant) {
        if self.conn.take().is_some() {
            info!("Recording finished");
            self.state.connection = ConnectionStatus::Down;
            self.state.local_banner("Replay ended - press Q to quit", now);
        }
    }

    async fn handle_message(&mut self, message: Message, now: Instant) {
        if let Message::Close(_) = message {
            self.finish(now);
            return;
        }
        let frame = match message {
            Message::Text(text) => WireFrame::Text(text),
            Message::Binary(bytes) => WireFrame::Binary(bytes),
            _ => return,
        };
        let msg = match WireCodec::decode_server(&frame) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Dropping undecodable playback frame: {}", e);
                return;
            }
        };
        match msg {
            ServerMessage::Config { config } => self.state.config = config,
            ServerMessage::State {
                state: snap, meta, ..
            } => {
                let cues = self.effects.ingest(&snap, &self.state.config, now);
                for cue in cues {
                    self.audio.play(cue).await;
                }
                self.state.apply_message(&snap.message, &snap.message_type, now);
                self.state.replay = meta;
                self.state.snapshot = Some(snap);
            }
            // Recordings only carry config and state; anything else is
            // left over from the live protocol and ignored.
            _ => {}
        }
    }
}

async fn next_inbound(
    conn: &mut Option<WsStream>,
) -> Option<Result<Message, tokio_tungstenite::tungstenite::Error>> {
    match conn {
        Some(ws) => ws.next().await,
        None => std::future::pending().await,
    }
}
