//! Procedural audio cues. Every discrete game event maps to a pure
//! [`CuePlan`] of tone bursts; the plan is rendered to 16-bit PCM against
//! a shared 44.1 kHz clock, wrapped as WAV, and handed to macroquad for
//! fire-and-forget playback. Nothing waits for a cue to finish.

use log::debug;
use macroquad::audio::{load_sound_from_bytes, play_sound_once};

pub const SAMPLE_RATE: u32 = 44_100;

/// Discrete game events with an audible cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Move,
    /// Food tier 0..=3 (purple, blue, orange, red).
    Eat(u8),
    AiConsume,
    Crash,
    Win,
    Stun,
    Explosion,
    Attack(AttackTimbre),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackTimbre {
    Classic,
    Plasma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// One short tone: frequency, shape, peak amplitude, duration, and onset
/// relative to the start of the cue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneBurst {
    pub freq: f32,
    pub wave: Waveform,
    pub amp: f32,
    pub duration_ms: u32,
    pub onset_ms: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CuePlan {
    pub bursts: Vec<ToneBurst>,
}

fn burst(freq: f32, wave: Waveform, amp: f32, duration_ms: u32, onset_ms: u32) -> ToneBurst {
    ToneBurst {
        freq,
        wave,
        amp,
        duration_ms,
        onset_ms,
    }
}

/// Maps a cue to its tone bursts. Pure; the playback path and the tests
/// share it.
pub fn plan(cue: Cue) -> CuePlan {
    use Waveform::*;
    let bursts = match cue {
        Cue::Move => vec![burst(220.0, Triangle, 0.08, 25, 0)],
        Cue::Eat(tier) => {
            // Higher food tiers chirp higher.
            let base = 440.0 + 110.0 * f32::from(tier.min(3));
            vec![
                burst(base, Sine, 0.25, 70, 0),
                burst(base * 1.5, Sine, 0.18, 60, 60),
            ]
        }
        Cue::AiConsume => vec![burst(330.0, Sine, 0.12, 60, 0)],
        Cue::Crash => vec![
            burst(220.0, Square, 0.30, 120, 0),
            burst(110.0, Square, 0.30, 220, 100),
        ],
        // Four-note ascending arpeggio: C5 E5 G5 C6.
        Cue::Win => vec![
            burst(523.25, Sine, 0.30, 130, 0),
            burst(659.25, Sine, 0.30, 130, 110),
            burst(783.99, Sine, 0.30, 130, 220),
            burst(1046.50, Sine, 0.32, 200, 330),
        ],
        Cue::Stun => vec![burst(150.0, Square, 0.22, 200, 0)],
        Cue::Explosion => vec![
            burst(80.0, Sawtooth, 0.35, 250, 0),
            burst(55.0, Sawtooth, 0.25, 180, 60),
        ],
        Cue::Attack(AttackTimbre::Classic) => vec![burst(880.0, Square, 0.20, 70, 0)],
        Cue::Attack(AttackTimbre::Plasma) => vec![
            burst(1200.0, Sawtooth, 0.18, 50, 0),
            burst(600.0, Sawtooth, 0.14, 60, 40),
        ],
    };
    CuePlan { bursts }
}

fn sample_wave(wave: Waveform, phase: f32) -> f32 {
    // phase in cycles
    let frac = phase - phase.floor();
    match wave {
        Waveform::Sine => (frac * std::f32::consts::TAU).sin(),
        Waveform::Square => {
            if frac < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => 2.0 * frac - 1.0,
        Waveform::Triangle => {
            if frac < 0.5 {
                4.0 * frac - 1.0
            } else {
                3.0 - 4.0 * frac
            }
        }
    }
}

/// Mixes a plan into a mono PCM buffer. Each burst carries a linear
/// decay envelope; overlapping bursts sum and clip at full scale.
pub fn render(plan: &CuePlan) -> Vec<i16> {
    let total_ms = plan
        .bursts
        .iter()
        .map(|b| b.onset_ms + b.duration_ms)
        .max()
        .unwrap_or(0);
    let total_samples = (u64::from(total_ms) * u64::from(SAMPLE_RATE) / 1000) as usize;
    let mut mix = vec![0.0f32; total_samples];

    for b in &plan.bursts {
        let start = (u64::from(b.onset_ms) * u64::from(SAMPLE_RATE) / 1000) as usize;
        let len = (u64::from(b.duration_ms) * u64::from(SAMPLE_RATE) / 1000) as usize;
        for i in 0..len {
            let t = i as f32 / SAMPLE_RATE as f32;
            let envelope = 1.0 - i as f32 / len.max(1) as f32;
            let v = sample_wave(b.wave, b.freq * t) * b.amp * envelope;
            if let Some(slot) = mix.get_mut(start + i) {
                *slot += v;
            }
        }
    }

    mix.into_iter()
        .map(|v| (v.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)
        .collect()
}

/// Wraps mono 16-bit samples in a minimal RIFF/WAVE container.
pub fn encode_wav(samples: &[i16]) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + samples.len() * 2);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // PCM chunk size
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    out.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes()); // byte rate
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// Playback gate. Toggling only affects future cues; whatever macroquad
/// is already playing runs out on its own.
pub struct AudioEngine {
    enabled: bool,
}

impl AudioEngine {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    pub async fn play(&self, cue: Cue) {
        if !self.enabled {
            return;
        }
        let wav = encode_wav(&render(&plan(cue)));
        match load_sound_from_bytes(&wav).await {
            Ok(sound) => play_sound_once(&sound),
            Err(e) => debug!("Audio cue {:?} dropped: {}", cue, e),
        }
    }
}
