//! The effect timeline: client-only, time-bounded artifacts derived from
//! snapshot deltas and aged on the render clock, independent of snapshot
//! arrival rate.
//!
//! The protocol carries no event identifiers, so one-shot arrays are
//! de-duplicated by field equality against the previously ingested
//! snapshot: a batch triggers only when it is non-empty and different
//! from the last one. A server that resends an identical batch verbatim
//! produces nothing.

use macroquad::color::Color;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{GameConfig, Point, Snapshot};
use std::time::{Duration, Instant};

use crate::audio::Cue;
use crate::rendering::CELL_PX;

pub const EXPLOSION_DURATION: Duration = Duration::from_millis(600);
pub const FLOATING_TEXT_DURATION: Duration = Duration::from_millis(1000);
/// Upward drift of floating score text, px/s.
pub const TEXT_RISE_SPEED: f32 = 30.0;

pub const CONFETTI_PER_ORIGIN: usize = 80;
pub const CONFETTI_ORIGINS: usize = 3;
pub const CONFETTI_SECOND_WAVE: usize = 100;
pub const CONFETTI_WAVE_DELAY: Duration = Duration::from_millis(500);

const CONFETTI_GRAVITY: f32 = 400.0; // px/s^2
const CONFETTI_DRAG: f32 = 0.985; // horizontal damping per 60Hz step
const MAX_TICK_DT: f32 = 0.1; // clamp after a stall so physics stays sane

const CONFETTI_PALETTE: [Color; 5] = [
    Color::new(1.00, 0.84, 0.25, 1.0),
    Color::new(0.96, 0.40, 0.40, 1.0),
    Color::new(0.30, 0.82, 0.88, 1.0),
    Color::new(0.62, 0.48, 0.92, 1.0),
    Color::new(0.41, 0.84, 0.57, 1.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfettiShape {
    Rect,
    Circle,
}

#[derive(Debug, Clone)]
pub struct ConfettiParticle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub rot: f32,
    pub spin: f32,
    pub color: Color,
    pub shape: ConfettiShape,
    pub life: f32,
    pub decay: f32,
}

/// One live effect. Explosions are time-gated, floating text drifts and
/// fades, confetti integrates simple rigid-body-like motion.
#[derive(Debug, Clone)]
pub enum Effect {
    Explosion {
        cell: Point,
        started: Instant,
    },
    FloatingText {
        x: f32,
        y: f32,
        label: String,
        color: Color,
        started: Instant,
    },
    Confetti(ConfettiParticle),
}

pub struct EffectTimeline {
    effects: Vec<Effect>,
    rng: StdRng,
    last_tick: Option<Instant>,
    pending_wave: Option<Instant>,
    // Last-seen values per one-shot channel, for redelivery suppression.
    last_score_events: Vec<shared::ScoreEvent>,
    last_hit_points: Vec<Point>,
    last_game_over: bool,
    last_player_stunned: bool,
    last_ai_score: i32,
    board_px: (f32, f32),
}

impl EffectTimeline {
    pub fn new() -> Self {
        Self {
            effects: Vec::new(),
            rng: StdRng::from_entropy(),
            last_tick: None,
            pending_wave: None,
            last_score_events: Vec::new(),
            last_hit_points: Vec::new(),
            last_game_over: false,
            last_player_stunned: false,
            last_ai_score: 0,
            board_px: (
                GameConfig::default().width as f32 * CELL_PX,
                GameConfig::default().height as f32 * CELL_PX,
            ),
        }
    }

    /// Derives new effects from a freshly arrived snapshot and returns
    /// the audio cues it implies. Must run before the snapshot replaces
    /// the current one.
    pub fn ingest(&mut self, snap: &Snapshot, config: &GameConfig, now: Instant) -> Vec<Cue> {
        let mut cues = Vec::new();
        self.board_px = (
            config.width as f32 * CELL_PX,
            config.height as f32 * CELL_PX,
        );

        if !snap.score_events.is_empty() && snap.score_events != self.last_score_events {
            for ev in &snap.score_events {
                let label = if ev.label.is_empty() {
                    format!("+{}", ev.amount)
                } else {
                    ev.label.clone()
                };
                let color = if ev.amount >= 30 {
                    Color::new(1.00, 0.84, 0.25, 1.0)
                } else {
                    Color::new(1.00, 1.00, 1.00, 1.0)
                };
                self.effects.push(Effect::FloatingText {
                    x: ev.pos.x as f32 * CELL_PX + CELL_PX / 2.0,
                    y: ev.pos.y as f32 * CELL_PX,
                    label,
                    color,
                    started: now,
                });
            }
            // Food tiers award 10/20/30/40; pitch the eat cue accordingly.
            let tier = (snap.score_events[0].amount / 10 - 1).clamp(0, 3) as u8;
            cues.push(Cue::Eat(tier));
        }
        self.last_score_events = snap.score_events.clone();

        if !snap.hit_points.is_empty() && snap.hit_points != self.last_hit_points {
            for p in &snap.hit_points {
                self.effects.push(Effect::Explosion {
                    cell: *p,
                    started: now,
                });
            }
            // One cue per batch; per-point cues blur into noise.
            cues.push(Cue::Explosion);
        }
        self.last_hit_points = snap.hit_points.clone();

        if snap.player_stunned && !self.last_player_stunned {
            cues.push(Cue::Stun);
        }
        self.last_player_stunned = snap.player_stunned;

        if snap.ai_score > self.last_ai_score {
            cues.push(Cue::AiConsume);
        }
        self.last_ai_score = snap.ai_score;

        if snap.game_over && !self.last_game_over {
            if snap.winner == "player" {
                cues.push(Cue::Win);
                self.burst_confetti();
                self.pending_wave = Some(now + CONFETTI_WAVE_DELAY);
            } else {
                cues.push(Cue::Crash);
            }
        }
        self.last_game_over = snap.game_over;

        cues
    }

    fn burst_confetti(&mut self) {
        let (w, h) = self.board_px;
        let origins = [
            (w * 0.25, h * 0.35),
            (w * 0.50, h * 0.30),
            (w * 0.75, h * 0.35),
        ];
        for (x, y) in origins {
            self.spawn_confetti(x, y, CONFETTI_PER_ORIGIN);
        }
    }

    fn spawn_confetti(&mut self, x: f32, y: f32, count: usize) {
        for i in 0..count {
            let particle = ConfettiParticle {
                x,
                y,
                vx: self.rng.gen_range(-140.0..140.0),
                vy: self.rng.gen_range(-280.0..-80.0),
                rot: self.rng.gen_range(0.0..std::f32::consts::TAU),
                spin: self.rng.gen_range(-6.0..6.0),
                color: CONFETTI_PALETTE[i % CONFETTI_PALETTE.len()],
                shape: if i % 2 == 0 {
                    ConfettiShape::Rect
                } else {
                    ConfettiShape::Circle
                },
                life: 1.0,
                decay: self.rng.gen_range(0.45..1.1),
            };
            self.effects.push(Effect::Confetti(particle));
        }
    }

    /// Advances every live effect and removes the expired ones. Runs on
    /// the render clock, immediately before drawing. `game_over` is the
    /// current snapshot's flag; a scheduled second confetti wave fires
    /// only if the game is still over when it comes due — a fast restart
    /// suppresses stale confetti.
    pub fn tick(&mut self, now: Instant, game_over: bool) {
        let dt = match self.last_tick {
            Some(prev) => now
                .saturating_duration_since(prev)
                .as_secs_f32()
                .min(MAX_TICK_DT),
            None => 0.0,
        };
        self.last_tick = Some(now);

        if let Some(due) = self.pending_wave {
            if now >= due {
                self.pending_wave = None;
                if game_over {
                    let (w, _) = self.board_px;
                    self.spawn_confetti(w / 2.0, CELL_PX * 4.0, CONFETTI_SECOND_WAVE);
                }
            }
        }

        self.effects.retain_mut(|effect| match effect {
            Effect::Explosion { started, .. } => {
                now.saturating_duration_since(*started) < EXPLOSION_DURATION
            }
            Effect::FloatingText { y, started, .. } => {
                *y -= TEXT_RISE_SPEED * dt;
                now.saturating_duration_since(*started) < FLOATING_TEXT_DURATION
            }
            Effect::Confetti(p) => {
                p.vy += CONFETTI_GRAVITY * dt;
                p.vx *= CONFETTI_DRAG.powf(dt * 60.0);
                p.x += p.vx * dt;
                p.y += p.vy * dt;
                p.rot += p.spin * dt;
                p.life -= p.decay * dt;
                p.life > 0.0
            }
        });
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn explosion_count(&self) -> usize {
        self.effects
            .iter()
            .filter(|e| matches!(e, Effect::Explosion { .. }))
            .count()
    }

    pub fn floating_text_count(&self) -> usize {
        self.effects
            .iter()
            .filter(|e| matches!(e, Effect::FloatingText { .. }))
            .count()
    }

    pub fn confetti_count(&self) -> usize {
        self.effects
            .iter()
            .filter(|e| matches!(e, Effect::Confetti(_)))
            .count()
    }
}

impl Default for EffectTimeline {
    fn default() -> Self {
        Self::new()
    }
}
