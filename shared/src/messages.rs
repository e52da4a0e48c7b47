//! Wire message types shared between the client and the game authority.
//!
//! Field names are serialized in camelCase to stay compatible with the
//! text (JSON) protocol generation; the binary generation reuses the same
//! serde definitions through bincode.

use serde::{Deserialize, Serialize};

/// A coordinate on the game board, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Battle,
    Zen,
    Pvp,
}

/// A food item as reported by the authority. `food_type` indexes the four
/// food tiers (purple, blue, orange, red); `remaining_seconds` counts down
/// to despawn and drives the countdown ring on the client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodInfo {
    pub pos: Point,
    pub food_type: u8,
    pub remaining_seconds: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Obstacle {
    pub points: Vec<Point>,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fireball {
    pub pos: Point,
    pub dir: Point,
    pub owner: String,
}

/// A point-earning event, rendered once as floating score text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEvent {
    pub pos: Point,
    pub amount: i32,
    #[serde(default)]
    pub label: String,
}

/// The full authoritative world state. Replaced wholesale on every `state`
/// message; the client never diffs individual server fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub snake: Vec<Point>,
    #[serde(default)]
    pub foods: Vec<FoodInfo>,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub food_eaten: i32,
    #[serde(default)]
    pub eating_speed: f64,
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub game_over: bool,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub boosting: bool,
    #[serde(default)]
    pub auto_play: bool,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub crash_point: Option<Point>,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    #[serde(default)]
    pub fireballs: Vec<Fireball>,
    #[serde(default)]
    pub hit_points: Vec<Point>,
    #[serde(default)]
    pub ai_snake: Vec<Point>,
    #[serde(default)]
    pub ai_score: i32,
    #[serde(default)]
    pub time_remaining: i32,
    #[serde(default)]
    pub winner: String,
    #[serde(default)]
    pub ai_stunned: bool,
    #[serde(default)]
    pub player_stunned: bool,
    #[serde(default)]
    pub mode: GameMode,
    #[serde(default)]
    pub score_events: Vec<ScoreEvent>,
    #[serde(default)]
    pub berserker: bool,
    #[serde(default)]
    pub is_pvp: bool,
    #[serde(default)]
    pub p1_name: String,
    #[serde(default)]
    pub p2_name: String,
}

/// Board dimensions and tunables pushed once by the authority on connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub width: i32,
    pub height: i32,
    pub game_duration: i32,
    pub fireball_cooldown: i32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 25,
            height: 25,
            game_duration: 60,
            fireball_cooldown: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: i32,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinRateEntry {
    pub name: String,
    pub win_rate: f64,
    pub total_wins: i32,
    pub total_games: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub best_score: i32,
    #[serde(default)]
    pub total_games: i32,
    #[serde(default)]
    pub total_wins: i32,
    #[serde(default)]
    pub created_at: String,
}

/// Replay-only frame metadata: step index and the recorded intent label.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplayMeta {
    pub step: u32,
    #[serde(default)]
    pub intent: String,
}

/// Player intent sent to the authority. Adjacent tagging keeps the
/// `action` discriminator on the wire in both protocol generations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    Up,
    Down,
    Left,
    Right,
    Pause,
    Restart,
    Quit,
    Auto,
    Fire,
    Start,
    DiffLow,
    DiffMid,
    DiffHigh,
    ModeBattle,
    ModeZen,
    ModePvp,
    FindMatch,
    CancelMatch,
    Login {
        username: String,
        password: String,
    },
    Register {
        username: String,
        password: String,
    },
    Ping,
    #[serde(rename = "toggleBerserker")]
    ToggleBerserker,
    SubmitFeedback {
        text: String,
    },
}

/// Everything the authority can push at the client. Unknown `type` tags
/// fail decoding and are dropped by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Config {
        config: GameConfig,
    },
    State {
        state: Snapshot,
        #[serde(default)]
        leaderboard: Vec<LeaderboardEntry>,
        #[serde(default)]
        win_rates: Vec<WinRateEntry>,
        #[serde(default)]
        user: Option<User>,
        #[serde(default)]
        meta: Option<ReplayMeta>,
    },
    Leaderboard {
        #[serde(default)]
        entries: Vec<LeaderboardEntry>,
        #[serde(default)]
        win_rates: Vec<WinRateEntry>,
    },
    AuthSuccess {
        #[serde(default)]
        user: Option<User>,
        #[serde(default)]
        success: Option<String>,
    },
    AuthError {
        error: String,
    },
    UpdateCounts {
        session_count: u32,
    },
    Pong,
    Error {
        error: String,
    },
}

/// Control frames for the read-only replay connection. Always sent as
/// JSON text regardless of the live protocol generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ReplayCommand {
    Pause,
    Resume,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_action_tag_on_the_wire() {
        let json = serde_json::to_string(&ClientCommand::Up).unwrap();
        assert_eq!(json, r#"{"action":"up"}"#);

        let json = serde_json::to_string(&ClientCommand::ToggleBerserker).unwrap();
        assert_eq!(json, r#"{"action":"toggleBerserker"}"#);

        let json = serde_json::to_string(&ClientCommand::Login {
            username: "bee".into(),
            password: "hunter2".into(),
        })
        .unwrap();
        assert!(json.contains(r#""action":"login""#));
        assert!(json.contains(r#""username":"bee""#));
    }

    #[test]
    fn snapshot_tolerates_sparse_json() {
        // The authority omits empty fields; every array and flag defaults.
        let snap: Snapshot =
            serde_json::from_str(r#"{"score":30,"gameOver":true,"eatingSpeed":1.25}"#).unwrap();
        assert_eq!(snap.score, 30);
        assert!(snap.game_over);
        assert_approx_eq::assert_approx_eq!(snap.eating_speed, 1.25);
        assert!(snap.snake.is_empty());
        assert_eq!(snap.mode, GameMode::Battle);
    }

    #[test]
    fn server_message_type_tag_dispatch() {
        let msg: ServerMessage = serde_json::from_str(
            r#"{"type":"config","data":{"config":{"width":25,"height":25,"gameDuration":60,"fireballCooldown":300}}}"#,
        )
        .unwrap();
        match msg {
            ServerMessage::Config { config } => assert_eq!(config.width, 25),
            _ => panic!("wrong message kind"),
        }

        let msg: ServerMessage = serde_json::from_str(r#"{"type":"pong"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Pong);
    }

    #[test]
    fn unknown_message_kind_fails_decode() {
        let result = serde_json::from_str::<ServerMessage>(r#"{"type":"telemetry","data":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn messages_round_trip_through_bincode() {
        let snap = Snapshot {
            snake: vec![Point::new(3, 4), Point::new(3, 5)],
            score: 40,
            hit_points: vec![Point::new(7, 7)],
            winner: "player".into(),
            game_over: true,
            ..Snapshot::default()
        };
        let msg = ServerMessage::State {
            state: snap.clone(),
            leaderboard: Vec::new(),
            win_rates: Vec::new(),
            user: None,
            meta: None,
        };
        let bytes = bincode::serialize(&msg).unwrap();
        let back: ServerMessage = bincode::deserialize(&bytes).unwrap();
        match back {
            ServerMessage::State { state, .. } => assert_eq!(state, snap),
            _ => panic!("wrong message kind"),
        }

        let cmd = ClientCommand::Register {
            username: "bee".into(),
            password: "hunter2".into(),
        };
        let bytes = bincode::serialize(&cmd).unwrap();
        let back: ClientCommand = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn replay_command_wire_shape() {
        assert_eq!(
            serde_json::to_string(&ReplayCommand::Pause).unwrap(),
            r#"{"command":"pause"}"#
        );
    }
}
