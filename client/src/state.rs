//! The shared client state aggregate read by the render pass and mutated
//! by the transport dispatcher and the input controller. Owning it in one
//! place keeps the UI flags out of the individual components.

use shared::{GameConfig, ReplayMeta, Snapshot};
use std::time::{Duration, Instant};

/// How long a transient banner stays on screen.
pub const BANNER_WINDOW: Duration = Duration::from_millis(3000);
/// Final fraction of the banner window spent fading and drifting upward.
pub const BANNER_FADE_FRACTION: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyTier {
    Good,
    Medium,
    Bad,
}

impl LatencyTier {
    pub fn classify(rtt_ms: u64) -> Self {
        if rtt_ms < 50 {
            LatencyTier::Good
        } else if rtt_ms < 100 {
            LatencyTier::Medium
        } else {
            LatencyTier::Bad
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub text: String,
    pub class: String,
    pub shown_at: Instant,
}

impl Banner {
    /// Progress through the display window in [0, 1], or `None` once the
    /// window has elapsed.
    pub fn progress(&self, now: Instant) -> Option<f32> {
        let elapsed = now.duration_since(self.shown_at);
        if elapsed >= BANNER_WINDOW {
            return None;
        }
        Some(elapsed.as_secs_f32() / BANNER_WINDOW.as_secs_f32())
    }

    /// Opacity for the current frame: full until the fade fraction, then
    /// linear to zero.
    pub fn alpha(&self, now: Instant) -> f32 {
        match self.progress(now) {
            Some(p) if p > 1.0 - BANNER_FADE_FRACTION => {
                (1.0 - p) / BANNER_FADE_FRACTION
            }
            Some(_) => 1.0,
            None => 0.0,
        }
    }
}

#[derive(Debug)]
pub struct ClientState {
    /// The one current authoritative snapshot; `None` until the first
    /// `state` message arrives.
    pub snapshot: Option<Snapshot>,
    pub config: GameConfig,
    pub connection: ConnectionStatus,
    pub ping_ms: Option<u64>,
    pub session_count: u32,
    pub banner: Option<Banner>,
    /// Blocking alert raised by an explicit server `error` message.
    pub alert: Option<String>,
    /// Step/intent overlay when driving a recorded session.
    pub replay: Option<ReplayMeta>,
    last_message: String,
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            config: GameConfig::default(),
            connection: ConnectionStatus::Connecting,
            ping_ms: None,
            session_count: 0,
            banner: None,
            alert: None,
            replay: None,
            last_message: String::new(),
        }
    }

    /// Applies the snapshot's transient message field. The authority
    /// resends the same string on every tick while it is active, so a
    /// banner is (re)started only when the value actually changes.
    pub fn apply_message(&mut self, message: &str, class: &str, now: Instant) {
        if !message.is_empty() && message != self.last_message {
            self.banner = Some(Banner {
                text: message.to_string(),
                class: class.to_string(),
                shown_at: now,
            });
        }
        self.last_message = message.to_string();
    }

    /// Raises a locally generated banner (rate-limit rejections and the
    /// like); bypasses server-message de-duplication.
    pub fn local_banner(&mut self, text: &str, now: Instant) {
        self.banner = Some(Banner {
            text: text.to_string(),
            class: "important".to_string(),
            shown_at: now,
        });
    }

    pub fn set_latency(&mut self, rtt_ms: u64) {
        self.ping_ms = Some(rtt_ms);
    }

    pub fn latency_tier(&self) -> Option<LatencyTier> {
        self.ping_ms.map(LatencyTier::classify)
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}
