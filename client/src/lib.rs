//! # Snake Arcade Client Library
//!
//! The complete presentation client for the snake arcade: it connects to
//! the authoritative game server over a WebSocket, turns keyboard input
//! into throttled intent commands, and renders whatever the server says
//! the world looks like. The client simulates nothing; every gameplay
//! decision is the server's.
//!
//! ## Architecture Overview
//!
//! One tokio task owns the whole client. The transport loop in
//! [`network`] multiplexes the socket, the input sampler, the latency
//! probe, and the render tick through a single `select!`, so no state is
//! ever shared across threads and nothing needs a lock.
//!
//! ### Snapshot-Driven Presentation
//! The server streams full world snapshots; each one wholesale replaces
//! the last. Anything with client-side lifetime (explosions, floating
//! score text, confetti) lives in the [`effects`] timeline, which diffs
//! consecutive snapshots to detect events and then ages its artifacts on
//! the render clock, independent of snapshot arrival rate.
//!
//! ### Protocol Generations
//! Two wire framings coexist: self-describing JSON text and compact
//! bincode binary. The generation is picked once at connect time and
//! hidden behind the shared codec; decode follows the frame kind, so a
//! version-skewed server still parses.
//!
//! ### Graceful Degradation
//! A dropped connection never stops the loop: the last snapshot keeps
//! rendering with a status indicator while reconnects fire on a fixed
//! delay, and the session state (including an authenticated login) is
//! rebuilt automatically once the server comes back.
//!
//! ## Module Organization
//!
//! - [`network`]: the live-session transport and run loop
//! - [`input`]: key sampling, repeat timers, and the attack cooldown
//! - [`effects`]: time-bounded visual artifacts derived from snapshots
//! - [`audio`]: procedurally synthesized sound cues
//! - [`rendering`]: the back-to-front draw pass
//! - [`session`]: authentication and matchmaking state
//! - [`state`]: the shared client state aggregate
//! - [`storage`]: local best-score and credential persistence
//! - [`replay`]: read-only playback of recorded sessions

pub mod audio;
pub mod effects;
pub mod input;
pub mod network;
pub mod rendering;
pub mod replay;
pub mod session;
pub mod state;
pub mod storage;
