//! The live-session transport and the client run loop.
//!
//! One task owns everything: the WebSocket connection, the input
//! controller, the effect timeline, and the render pass all run inside a
//! single `tokio::select!` loop, so no state ever needs a lock. Losing
//! the connection never stops the loop; rendering continues against the
//! last snapshot while reconnect attempts fire on a fixed delay.

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use macroquad::prelude::{is_key_pressed, next_frame, KeyCode};
use shared::{
    ClientCommand, ProtocolVersion, ServerMessage, WireCodec, WireFrame, LIVE_PATH,
};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::{interval, sleep_until, Instant as TokioInstant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::audio::{AudioEngine, Cue};
use crate::effects::EffectTimeline;
use crate::input::InputController;
use crate::rendering::Renderer;
use crate::session::{AuthPhase, SessionState};
use crate::state::{ClientState, ConnectionStatus};
use crate::storage::Store;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Fixed delay before a reconnect attempt after the connection drops.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);
/// Cadence of the latency probe.
pub const PING_INTERVAL: Duration = Duration::from_secs(5);

/// Credentials supplied on the command line, sent once connected.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub register: bool,
    pub remember: bool,
}

pub struct Client {
    server: String,
    codec: WireCodec,
    login: Option<LoginRequest>,

    conn: Option<WsStream>,
    reconnect_at: Option<TokioInstant>,
    ping_sent: Option<Instant>,

    state: ClientState,
    session: SessionState,
    effects: EffectTimeline,
    audio: AudioEngine,
    input: InputController,
    renderer: Renderer,
    store: Store,
}

impl Client {
    pub fn new(
        server: String,
        version: ProtocolVersion,
        store: Store,
        muted: bool,
        login: Option<LoginRequest>,
    ) -> Self {
        let session = SessionState::new(&store);
        Client {
            server,
            codec: WireCodec::new(version),
            login,
            conn: None,
            reconnect_at: None,
            ping_sent: None,
            state: ClientState::new(),
            session,
            effects: EffectTimeline::new(),
            audio: AudioEngine::new(!muted),
            input: InputController::new(),
            renderer: Renderer::new(),
            store,
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await;

        let mut frame_interval = interval(Duration::from_millis(16));
        let mut ping_interval = interval(PING_INTERVAL);

        loop {
            let reconnect_at = self.reconnect_at;
            tokio::select! {
                inbound = next_inbound(&mut self.conn) => {
                    let now = Instant::now();
                    match inbound {
                        Some(Ok(message)) => self.handle_message(message, now).await,
                        Some(Err(e)) => {
                            warn!("Connection error: {}", e);
                            self.mark_down();
                        }
                        None => {
                            warn!("Server closed the connection");
                            self.mark_down();
                        }
                    }
                },

                _ = ping_interval.tick() => {
                    if self.conn.is_some() {
                        self.ping_sent = Some(Instant::now());
                        self.send(ClientCommand::Ping).await;
                    }
                },

                _ = reconnect_due(reconnect_at) => {
                    self.connect().await;
                },

                _ = frame_interval.tick() => {
                    let now = Instant::now();
                    if self.frame(now).await {
                        break;
                    }
                    next_frame().await;
                },
            }
        }

        if self.conn.is_some() {
            self.send(ClientCommand::Quit).await;
        }

        Ok(())
    }

    /// One render tick: sample input, flush the resulting commands, age
    /// the effect timeline, draw. Returns true when the player quit.
    async fn frame(&mut self, now: Instant) -> bool {
        if is_key_pressed(KeyCode::Escape) {
            return true;
        }

        let authenticated = self.session.phase() == AuthPhase::Authenticated;
        let sampled = self.input.sample(&mut self.state, authenticated, now);
        if sampled.toggle_mute {
            let enabled = self.audio.toggle();
            let text = if enabled { "Sound on" } else { "Sound muted" };
            self.state.local_banner(text, now);
        }
        for cmd in sampled.commands {
            self.dispatch_command(cmd, now).await;
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
        false
    }

    async fn connect(&mut self) {
        self.reconnect_at = None;
        self.state.connection = ConnectionStatus::Connecting;

        let url = format!(
            "ws://{}{}?proto={}",
            self.server,
            LIVE_PATH,
            self.codec.version().as_query()
        );
        info!("Connecting to {}", url);

        match connect_async(&url).await {
            Ok((ws, _)) => {
                info!("Connected with {:?} framing", self.codec.version());
                self.conn = Some(ws);
                self.state.connection = ConnectionStatus::Connected;
                // Immediate latency probe; the timer catches up later.
                self.ping_sent = Some(Instant::now());
                self.send(ClientCommand::Ping).await;
                self.sign_in().await;
            }
            Err(e) => {
                warn!("Connect to {} failed: {}", url, e);
                self.mark_down();
            }
        }
    }

    /// Remembered credentials win over command-line ones, so a reconnect
    /// restores the same account the last session used.
    async fn sign_in(&mut self) {
        if let Some((username, password)) = self.store.credentials() {
            self.session.begin_auth(&username, &password, false);
            self.send(ClientCommand::Login { username, password }).await;
        } else if let Some(req) = self.login.clone() {
            self.session.begin_auth(&req.username, &req.password, req.remember);
            let cmd = if req.register {
                ClientCommand::Register {
                    username: req.username,
                    password: req.password,
                }
            } else {
                ClientCommand::Login {
                    username: req.username,
                    password: req.password,
                }
            };
            self.send(cmd).await;
        }
    }

    fn mark_down(&mut self) {
        self.conn = None;
        self.ping_sent = None;
        self.state.connection = ConnectionStatus::Down;
        self.state.ping_ms = None;
        self.session.on_disconnect();
        self.reconnect_at = Some(TokioInstant::now() + RECONNECT_DELAY);
    }

    /// Side effects that belong to the command itself, then the send.
    async fn dispatch_command(&mut self, cmd: ClientCommand, now: Instant) {
        match &cmd {
            ClientCommand::Up | ClientCommand::Down | ClientCommand::Left | ClientCommand::Right => {
                self.audio.play(Cue::Move).await;
            }
            ClientCommand::Fire => {
                self.audio.play(Cue::Attack(self.input.attack_timbre())).await;
            }
            ClientCommand::FindMatch => {
                if !self.session.begin_search() {
                    return;
                }
                self.state.local_banner("Searching for an opponent...", now);
            }
            ClientCommand::CancelMatch => self.session.cancel_search(),
            ClientCommand::Restart => self.state.alert = None,
            _ => {}
        }
        self.send(cmd).await;
    }

    async fn send(&mut self, cmd: ClientCommand) {
        let frame = match self.codec.encode_command(&cmd) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode {:?}: {}", cmd, e);
                return;
            }
        };
        let Some(ws) = self.conn.as_mut() else {
            return;
        };
        if let Err(e) = ws.send(to_message(frame)).await {
            warn!("Send failed: {}", e);
            self.mark_down();
        }
    }

    async fn handle_message(&mut self, message: Message, now: Instant) {
        if let Message::Close(_) = message {
            warn!("Server sent close");
            self.mark_down();
            return;
        }
        let Some(frame) = from_message(message) else {
            return; // ping/pong control frames, answered by the library
        };
        match WireCodec::decode_server(&frame) {
            Ok(msg) => self.dispatch(msg, now).await,
            Err(e) => debug!("Dropping undecodable frame: {}", e),
        }
    }

    async fn dispatch(&mut self, msg: ServerMessage, now: Instant) {
        match msg {
            ServerMessage::Config { config } => {
                self.input.set_attack_cooldown(Duration::from_millis(
                    config.fireball_cooldown.max(0) as u64,
                ));
                self.state.config = config;
            }

            ServerMessage::State {
                state: snap,
                leaderboard,
                win_rates,
                user,
                meta,
            } => {
                // Effects diff against the outgoing snapshot, so ingest
                // runs before the replacement below.
                let cues = self.effects.ingest(&snap, &self.state.config, now);
                for cue in cues {
                    self.audio.play(cue).await;
                }
                self.state.apply_message(&snap.message, &snap.message_type, now);
                self.session
                    .on_state(&snap, user, leaderboard, win_rates, &mut self.store);
                self.state.replay = meta;
                self.state.snapshot = Some(snap);
            }

            ServerMessage::Leaderboard { entries, win_rates } => {
                self.session.set_leaderboards(entries, win_rates);
            }

            ServerMessage::AuthSuccess { user, success } => {
                self.session.on_auth_success(user, &mut self.store);
                if let Some(text) = success {
                    self.state.local_banner(&text, now);
                }
            }

            ServerMessage::AuthError { error } => {
                self.session.on_auth_error(error);
            }

            ServerMessage::UpdateCounts { session_count } => {
                self.state.session_count = session_count;
            }

            ServerMessage::Pong => {
                if let Some(sent) = self.ping_sent.take() {
                    self.state
                        .set_latency(now.duration_since(sent).as_millis() as u64);
                }
            }

            ServerMessage::Error { error } => {
                error!("Server error: {}", error);
                self.state.alert = Some(error);
            }
        }
    }
}

/// Pends while disconnected, so the select loop's inbound branch never
/// spins on a missing stream.
async fn next_inbound(
    conn: &mut Option<WsStream>,
) -> Option<Result<Message, tokio_tungstenite::tungstenite::Error>> {
    match conn {
        Some(ws) => ws.next().await,
        None => std::future::pending().await,
    }
}

async fn reconnect_due(at: Option<TokioInstant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn to_message(frame: WireFrame) -> Message {
    match frame {
        WireFrame::Text(text) => Message::Text(text),
        WireFrame::Binary(bytes) => Message::Binary(bytes),
    }
}

fn from_message(message: Message) -> Option<WireFrame> {
    match message {
        Message::Text(text) => Some(WireFrame::Text(text)),
        Message::Binary(bytes) => Some(WireFrame::Binary(bytes)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{GameConfig, Point, ScoreEvent, Snapshot, User};

    fn client() -> Client {
        Client::new(
            "127.0.0.1:8080".to_string(),
            ProtocolVersion::V2,
            Store::in_memory(),
            true, // muted; cues are counted, not played
            None,
        )
    }

    #[tokio::test]
    async fn config_message_sets_board_and_attack_cooldown() {
        let mut c = client();
        let config = GameConfig {
            width: 40,
            height: 30,
            game_duration: 90,
            fireball_cooldown: 150,
        };
        c.dispatch(ServerMessage::Config { config }, Instant::now()).await;
        assert_eq!(c.state.config.width, 40);

        // The new cooldown gates the attack control.
        let t0 = Instant::now();
        assert!(c.input.try_attack(t0));
        assert!(!c.input.try_attack(t0 + Duration::from_millis(149)));
        assert!(c.input.try_attack(t0 + Duration::from_millis(150)));
    }

    #[tokio::test]
    async fn state_message_feeds_effects_banner_and_store() {
        let mut c = client();
        let now = Instant::now();
        let snap = Snapshot {
            score: 120,
            message: "Bonus food!".into(),
            message_type: "bonus".into(),
            score_events: vec![ScoreEvent {
                pos: Point::new(4, 4),
                amount: 20,
                label: String::new(),
            }],
            ..Snapshot::default()
        };
        c.dispatch(
            ServerMessage::State {
                state: snap,
                leaderboard: Vec::new(),
                win_rates: Vec::new(),
                user: None,
                meta: None,
            },
            now,
        )
        .await;

        assert_eq!(c.state.snapshot.as_ref().unwrap().score, 120);
        assert_eq!(c.effects.floating_text_count(), 1);
        assert_eq!(c.state.banner.as_ref().unwrap().text, "Bonus food!");
        // New high score persisted straight away.
        assert_eq!(c.store.best_score(), 120);
    }

    #[tokio::test]
    async fn pong_measures_round_trip_latency() {
        let mut c = client();
        let now = Instant::now();
        c.ping_sent = Some(now - Duration::from_millis(80));
        c.dispatch(ServerMessage::Pong, now).await;
        assert_eq!(c.state.ping_ms, Some(80));
        // A stray second pong has nothing to measure against.
        c.dispatch(ServerMessage::Pong, now + Duration::from_millis(10)).await;
        assert_eq!(c.state.ping_ms, Some(80));
    }

    #[tokio::test]
    async fn auth_messages_drive_the_session() {
        let mut c = client();
        let now = Instant::now();
        c.session.begin_auth("bee", "hunter2", false);
        c.dispatch(
            ServerMessage::AuthSuccess {
                user: Some(User {
                    username: "bee".into(),
                    best_score: 50,
                    total_games: 1,
                    total_wins: 0,
                    created_at: String::new(),
                }),
                success: Some("Welcome back!".into()),
            },
            now,
        )
        .await;
        assert_eq!(c.session.phase(), AuthPhase::Authenticated);
        assert_eq!(c.state.banner.as_ref().unwrap().text, "Welcome back!");

        c.dispatch(
            ServerMessage::AuthError {
                error: "name taken".into(),
            },
            now,
        )
        .await;
        assert_eq!(c.session.phase(), AuthPhase::Anonymous);
        assert_eq!(c.session.auth_error(), Some("name taken"));
    }

    #[tokio::test]
    async fn server_error_raises_blocking_alert() {
        let mut c = client();
        c.dispatch(
            ServerMessage::Error {
                error: "room is full".into(),
            },
            Instant::now(),
        )
        .await;
        assert_eq!(c.state.alert.as_deref(), Some("room is full"));
    }

    #[tokio::test]
    async fn update_counts_message() {
        let mut c = client();
        c.dispatch(
            ServerMessage::UpdateCounts { session_count: 7 },
            Instant::now(),
        )
        .await;
        assert_eq!(c.state.session_count, 7);
    }

    #[tokio::test]
    async fn mark_down_resets_and_schedules_reconnect() {
        let mut c = client();
        c.session.begin_auth("bee", "hunter2", false);
        c.session.on_auth_success(None, &mut c.store);
        c.session.begin_search();

        c.mark_down();
        assert_eq!(c.state.connection, ConnectionStatus::Down);
        assert_eq!(c.state.ping_ms, None);
        assert!(!c.session.searching());
        assert!(c.reconnect_at.is_some());
    }
}
