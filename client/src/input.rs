//! Input controller: raw key events become discrete, throttled intent
//! commands. Held directions repeat on a fixed interval with one timer
//! per control (teacher-style edge detection over sampled key state);
//! the attack action is cooldown-gated client-side so bursts never reach
//! the transport.

use macroquad::prelude::{is_key_down, is_mouse_button_pressed, KeyCode, MouseButton};
use shared::ClientCommand;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::audio::AttackTimbre;
use crate::state::ClientState;

/// Repeat cadence for a held directional control.
pub const REPEAT_INTERVAL: Duration = Duration::from_millis(80);
/// Attack cooldown until the `config` message overrides it.
pub const DEFAULT_ATTACK_COOLDOWN: Duration = Duration::from_millis(300);

pub const DIFFICULTY_LOCKED_BANNER: &str = "Can't change difficulty during game!";
pub const MODE_LOCKED_BANNER: &str = "Can't change mode during game!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn command(self) -> ClientCommand {
        match self {
            Direction::Up => ClientCommand::Up,
            Direction::Down => ClientCommand::Down,
            Direction::Left => ClientCommand::Left,
            Direction::Right => ClientCommand::Right,
        }
    }

    fn keys(self) -> &'static [KeyCode] {
        match self {
            Direction::Up => &[KeyCode::Up, KeyCode::W],
            Direction::Down => &[KeyCode::Down, KeyCode::S],
            Direction::Left => &[KeyCode::Left, KeyCode::A],
            Direction::Right => &[KeyCode::Right, KeyCode::D],
        }
    }
}

const DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

/// What one sampling pass produced.
#[derive(Debug, Default)]
pub struct SampledInput {
    pub commands: Vec<ClientCommand>,
    pub toggle_mute: bool,
}

pub struct InputController {
    /// Next repeat deadline per held direction.
    held: HashMap<Direction, Instant>,
    attack_cooldown: Duration,
    last_attack: Option<Instant>,
    timbre: AttackTimbre,
    // Previous key states for edge detection
    prev: HashMap<KeyCode, bool>,
    prev_dir: HashMap<Direction, bool>,
}

impl InputController {
    pub fn new() -> Self {
        Self {
            held: HashMap::new(),
            attack_cooldown: DEFAULT_ATTACK_COOLDOWN,
            last_attack: None,
            timbre: AttackTimbre::Classic,
            prev: HashMap::new(),
            prev_dir: HashMap::new(),
        }
    }

    /// The `config` message carries the authoritative cooldown.
    pub fn set_attack_cooldown(&mut self, cooldown: Duration) {
        self.attack_cooldown = cooldown;
    }

    pub fn attack_timbre(&self) -> AttackTimbre {
        self.timbre
    }

    /// Registers a direction press. Returns true when the press is new
    /// and an immediate send is due; the repeat timer starts now.
    pub fn press_direction(&mut self, dir: Direction, now: Instant) -> bool {
        if self.held.contains_key(&dir) {
            return false;
        }
        self.held.insert(dir, now + REPEAT_INTERVAL);
        true
    }

    /// Releasing cancels all pending repeats for that control.
    pub fn release_direction(&mut self, dir: Direction) {
        self.held.remove(&dir);
    }

    /// Directions whose repeat deadline has passed; each emission
    /// advances its own deadline by one interval.
    pub fn due_repeats(&mut self, now: Instant) -> Vec<Direction> {
        let mut due = Vec::new();
        for (dir, deadline) in self.held.iter_mut() {
            while now >= *deadline {
                due.push(*dir);
                *deadline += REPEAT_INTERVAL;
            }
        }
        due
    }

    /// Attack gate: at most one accepted invocation per cooldown window.
    /// An invocation exactly at the boundary is accepted.
    pub fn try_attack(&mut self, now: Instant) -> bool {
        let allowed = match self.last_attack {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.attack_cooldown,
        };
        if allowed {
            self.last_attack = Some(now);
        }
        allowed
    }

    fn edge(&mut self, key: KeyCode) -> bool {
        let down = is_key_down(key);
        let was = self.prev.insert(key, down).unwrap_or(false);
        down && !was
    }

    /// Samples the keyboard once. Mutates `state` only to raise local
    /// rejection banners; everything outbound goes through the returned
    /// command list.
    pub fn sample(
        &mut self,
        state: &mut ClientState,
        authenticated: bool,
        now: Instant,
    ) -> SampledInput {
        let mut out = SampledInput::default();

        // Directions: immediate send on press, repeats while held.
        for dir in DIRECTIONS {
            let down = dir.keys().iter().any(|k| is_key_down(*k));
            let was = self.prev_dir.insert(dir, down).unwrap_or(false);
            if down && !was {
                if self.press_direction(dir, now) {
                    out.commands.push(dir.command());
                }
            } else if !down && was {
                self.release_direction(dir);
            }
        }
        for dir in self.due_repeats(now) {
            out.commands.push(dir.command());
        }

        // Attack, cooldown-gated before it ever reaches the transport.
        // A pointer click fires through the same gate as the key.
        if (self.edge(KeyCode::F) || is_mouse_button_pressed(MouseButton::Left))
            && self.try_attack(now)
        {
            out.commands.push(ClientCommand::Fire);
        }

        // Discrete one-shot actions.
        if self.edge(KeyCode::Space) || self.edge(KeyCode::P) {
            out.commands.push(ClientCommand::Pause);
        }
        if self.edge(KeyCode::Enter) {
            out.commands.push(ClientCommand::Start);
        }
        if self.edge(KeyCode::R) {
            out.commands.push(ClientCommand::Restart);
        }
        if self.edge(KeyCode::Q) {
            out.commands.push(ClientCommand::Quit);
        }
        if self.edge(KeyCode::T) {
            out.commands.push(ClientCommand::Auto);
        }
        if self.edge(KeyCode::B) {
            out.commands.push(ClientCommand::ToggleBerserker);
        }
        if self.edge(KeyCode::M) {
            out.toggle_mute = true;
        }
        if self.edge(KeyCode::V) {
            self.timbre = match self.timbre {
                AttackTimbre::Classic => AttackTimbre::Plasma,
                AttackTimbre::Plasma => AttackTimbre::Classic,
            };
        }

        // Difficulty and mode switches are rejected locally mid-round;
        // no point asking the server just to be told no.
        let locked = round_live(state);
        for (key, cmd) in [
            (KeyCode::Key1, ClientCommand::DiffLow),
            (KeyCode::Key2, ClientCommand::DiffMid),
            (KeyCode::Key3, ClientCommand::DiffHigh),
        ] {
            if self.edge(key) {
                if locked {
                    state.local_banner(DIFFICULTY_LOCKED_BANNER, now);
                } else {
                    out.commands.push(cmd);
                }
            }
        }
        for (key, cmd) in [
            (KeyCode::Z, ClientCommand::ModeZen),
            (KeyCode::X, ClientCommand::ModeBattle),
            (KeyCode::C, ClientCommand::ModePvp),
        ] {
            if self.edge(key) {
                if locked {
                    state.local_banner(MODE_LOCKED_BANNER, now);
                } else {
                    out.commands.push(cmd);
                }
            }
        }

        // Matchmaking is only reachable once authenticated.
        if self.edge(KeyCode::G) && authenticated {
            out.commands.push(ClientCommand::FindMatch);
        }
        if self.edge(KeyCode::H) {
            out.commands.push(ClientCommand::CancelMatch);
        }

        out
    }
}

impl Default for InputController {
    fn default() -> Self {
        Self::new()
    }
}

/// A round is live (and mode/difficulty locked) once started and until
/// game over.
pub fn round_live(state: &ClientState) -> bool {
    state
        .snapshot
        .as_ref()
        .map(|s| s.started && !s.game_over)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Snapshot;

    #[test]
    fn press_sends_immediately_then_repeats_on_interval() {
        let mut input = InputController::new();
        let t0 = Instant::now();

        assert!(input.press_direction(Direction::Right, t0));
        // Still inside the first interval: nothing due.
        assert!(input
            .due_repeats(t0 + REPEAT_INTERVAL - Duration::from_millis(1))
            .is_empty());
        // Exactly one repeat per elapsed interval.
        assert_eq!(input.due_repeats(t0 + REPEAT_INTERVAL).len(), 1);
        assert_eq!(input.due_repeats(t0 + REPEAT_INTERVAL * 2).len(), 1);
    }

    #[test]
    fn holding_does_not_resend_the_press() {
        let mut input = InputController::new();
        let t0 = Instant::now();
        assert!(input.press_direction(Direction::Up, t0));
        assert!(!input.press_direction(Direction::Up, t0 + Duration::from_millis(10)));
    }

    #[test]
    fn release_cancels_pending_repeats() {
        let mut input = InputController::new();
        let t0 = Instant::now();
        input.press_direction(Direction::Left, t0);
        input.release_direction(Direction::Left);
        assert!(input.due_repeats(t0 + REPEAT_INTERVAL * 5).is_empty());
    }

    #[test]
    fn each_held_control_repeats_independently() {
        let mut input = InputController::new();
        let t0 = Instant::now();
        input.press_direction(Direction::Up, t0);
        input.press_direction(Direction::Left, t0 + Duration::from_millis(40));

        let due = input.due_repeats(t0 + REPEAT_INTERVAL);
        assert_eq!(due, vec![Direction::Up]);

        let due = input.due_repeats(t0 + Duration::from_millis(40) + REPEAT_INTERVAL);
        assert_eq!(due, vec![Direction::Left]);

        input.release_direction(Direction::Up);
        let due = input.due_repeats(t0 + Duration::from_millis(40) + REPEAT_INTERVAL * 2);
        assert_eq!(due, vec![Direction::Left]);
    }

    #[test]
    fn attack_cooldown_drops_burst_invocations() {
        let mut input = InputController::new();
        let t0 = Instant::now();

        assert!(input.try_attack(t0));
        assert!(!input.try_attack(t0 + Duration::from_millis(100)));
        assert!(!input.try_attack(t0 + Duration::from_millis(299)));
        // Exactly at the boundary: accepted.
        assert!(input.try_attack(t0 + DEFAULT_ATTACK_COOLDOWN));
    }

    #[test]
    fn rejected_attacks_do_not_extend_the_window() {
        let mut input = InputController::new();
        let t0 = Instant::now();
        assert!(input.try_attack(t0));
        // Spam inside the window.
        for ms in [50u64, 120, 250] {
            assert!(!input.try_attack(t0 + Duration::from_millis(ms)));
        }
        assert!(input.try_attack(t0 + DEFAULT_ATTACK_COOLDOWN));
    }

    #[test]
    fn config_overrides_attack_cooldown() {
        let mut input = InputController::new();
        input.set_attack_cooldown(Duration::from_millis(100));
        let t0 = Instant::now();
        assert!(input.try_attack(t0));
        assert!(!input.try_attack(t0 + Duration::from_millis(99)));
        assert!(input.try_attack(t0 + Duration::from_millis(100) + Duration::from_millis(1)));
    }

    #[test]
    fn round_live_requires_started_and_not_over() {
        let mut state = ClientState::new();
        assert!(!round_live(&state));

        let mut snap = Snapshot::default();
        snap.started = true;
        state.snapshot = Some(snap.clone());
        assert!(round_live(&state));

        snap.game_over = true;
        state.snapshot = Some(snap);
        assert!(!round_live(&state));
    }
}
