//! Protocol definitions shared by the live client and the replay viewer:
//! message types, the authoritative snapshot shape, and the wire codec
//! covering both protocol generations.

pub mod codec;
pub mod messages;

pub use codec::{CodecError, ProtocolVersion, WireCodec, WireFrame};
pub use messages::{
    ClientCommand, Fireball, FoodInfo, GameConfig, GameMode, LeaderboardEntry, Obstacle, Point,
    ReplayCommand, ReplayMeta, ScoreEvent, ServerMessage, Snapshot, User, WinRateEntry,
};

/// WebSocket path of the live game endpoint.
pub const LIVE_PATH: &str = "/ws";
/// WebSocket path of the recorded-session endpoint.
pub const REPLAY_PATH: &str = "/ws/replay";
