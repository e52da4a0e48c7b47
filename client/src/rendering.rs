//! The draw pass: composites the current snapshot, the live effect
//! timeline, and the session/UI overlay in a fixed back-to-front order.
//! Runs every render tick for the life of the process and never blocks
//! on network or storage I/O.

use macroquad::prelude::*;
use shared::{FoodInfo, Point, Snapshot};
use std::time::Instant;

use crate::effects::{
    ConfettiShape, Effect, EffectTimeline, EXPLOSION_DURATION, FLOATING_TEXT_DURATION,
};
use crate::session::{AuthPhase, SessionState};
use crate::state::{ClientState, ConnectionStatus, LatencyTier};

/// Pixels per board cell.
pub const CELL_PX: f32 = 20.0;

const BACKGROUND: Color = Color::new(0.10, 0.10, 0.18, 1.0);
const WALL: Color = Color::new(0.29, 0.33, 0.41, 1.0);
const OBSTACLE: Color = Color::new(0.45, 0.42, 0.38, 1.0);
const SNAKE_HEAD: Color = Color::new(0.28, 0.73, 0.47, 1.0);
const SNAKE_BODY: Color = Color::new(0.41, 0.83, 0.57, 1.0);
const SNAKE_STUNNED: Color = Color::new(0.55, 0.55, 0.60, 1.0);
const AI_HEAD: Color = Color::new(0.91, 0.44, 0.32, 1.0);
const AI_BODY: Color = Color::new(0.96, 0.60, 0.48, 1.0);

const FOOD_COLORS: [Color; 4] = [
    Color::new(0.62, 0.48, 0.92, 1.0), // purple
    Color::new(0.26, 0.60, 0.88, 1.0), // blue
    Color::new(0.93, 0.54, 0.21, 1.0), // orange
    Color::new(0.96, 0.40, 0.40, 1.0), // red
];

pub struct Renderer {
    started_at: Instant,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    /// One full pass. The caller has already ticked the effect timeline
    /// for this frame, so physics and visuals agree.
    pub fn draw_frame(
        &self,
        state: &ClientState,
        session: &SessionState,
        effects: &EffectTimeline,
        now: Instant,
    ) {
        clear_background(BACKGROUND);

        let Some(snap) = &state.snapshot else {
            self.draw_connecting(state);
            return;
        };

        self.draw_walls(state);
        self.draw_obstacles(snap);
        for food in &snap.foods {
            self.draw_food(food, now);
        }
        self.draw_snake(&snap.snake, snap.player_stunned, SNAKE_HEAD, SNAKE_BODY);
        self.draw_snake(&snap.ai_snake, snap.ai_stunned, AI_HEAD, AI_BODY);
        self.draw_fireballs(snap);
        if let Some(cp) = snap.crash_point {
            self.draw_crash_marker(cp);
        }
        self.draw_effects(effects, now);
        self.draw_banner(state, now);
        self.draw_hud(state, session, snap);
        self.draw_overlay(snap, session);
        self.draw_alert(state);
        self.draw_replay_meta(state);
    }

    fn board_px(&self, state: &ClientState) -> (f32, f32) {
        (
            state.config.width as f32 * CELL_PX,
            state.config.height as f32 * CELL_PX,
        )
    }

    fn draw_connecting(&self, state: &ClientState) {
        let (w, h) = self.board_px(state);
        let label = match state.connection {
            ConnectionStatus::Down => "Connection lost - retrying...",
            _ => "Connecting to server...",
        };
        let dims = measure_text(label, None, 20, 1.0);
        draw_text(label, (w - dims.width) / 2.0, h / 2.0, 20.0, WHITE);
    }

    fn cell_rect(&self, p: Point) -> (f32, f32, f32, f32) {
        (
            p.x as f32 * CELL_PX + 1.0,
            p.y as f32 * CELL_PX + 1.0,
            CELL_PX - 2.0,
            CELL_PX - 2.0,
        )
    }

    fn draw_cell(&self, p: Point, color: Color) {
        let (x, y, w, h) = self.cell_rect(p);
        draw_rectangle(x, y, w, h, color);
    }

    fn draw_walls(&self, state: &ClientState) {
        let bw = state.config.width;
        let bh = state.config.height;
        for x in 0..bw {
            self.draw_cell(Point::new(x, 0), WALL);
            self.draw_cell(Point::new(x, bh - 1), WALL);
        }
        for y in 0..bh {
            self.draw_cell(Point::new(0, y), WALL);
            self.draw_cell(Point::new(bw - 1, y), WALL);
        }
    }

    fn draw_obstacles(&self, snap: &Snapshot) {
        for obstacle in &snap.obstacles {
            for p in &obstacle.points {
                self.draw_cell(*p, OBSTACLE);
            }
        }
    }

    fn draw_food(&self, food: &FoodInfo, now: Instant) {
        let color = FOOD_COLORS[usize::from(food.food_type.min(3))];
        let cx = food.pos.x as f32 * CELL_PX + CELL_PX / 2.0;
        let cy = food.pos.y as f32 * CELL_PX + CELL_PX / 2.0;

        // Gentle pulse on the shared render clock.
        let t = now.duration_since(self.started_at).as_secs_f32();
        let pulse = 1.0 + 0.12 * (t * 4.0).sin();
        draw_circle(cx, cy, (CELL_PX / 2.0 - 3.0) * pulse, color);

        // Radial countdown ring once despawn is close.
        if food.remaining_seconds > 0 && food.remaining_seconds <= 5 {
            let fraction = food.remaining_seconds as f32 / 5.0;
            draw_arc(
                cx,
                cy,
                24,
                CELL_PX / 2.0 - 1.0,
                -90.0,
                2.0,
                fraction * 360.0,
                WHITE,
            );
        }
    }

    fn draw_snake(&self, body: &[Point], stunned: bool, head: Color, body_color: Color) {
        for (index, segment) in body.iter().enumerate() {
            if index == 0 {
                let color = if stunned { SNAKE_STUNNED } else { head };
                self.draw_cell(*segment, color);
                self.draw_eyes(*segment, stunned);
            } else {
                let color = if stunned { SNAKE_STUNNED } else { body_color };
                self.draw_cell(*segment, color);
            }
        }
    }

    fn draw_eyes(&self, head: Point, stunned: bool) {
        let cx = head.x as f32 * CELL_PX + CELL_PX / 2.0;
        let cy = head.y as f32 * CELL_PX + CELL_PX / 2.0;
        if stunned {
            // X-shaped eyes while stunned.
            for dx in [-4.0f32, 4.0] {
                draw_line(cx + dx - 2.0, cy - 6.0, cx + dx + 2.0, cy - 2.0, 1.5, BLACK);
                draw_line(cx + dx + 2.0, cy - 6.0, cx + dx - 2.0, cy - 2.0, 1.5, BLACK);
            }
        } else {
            draw_circle(cx - 4.0, cy - 4.0, 2.0, BLACK);
            draw_circle(cx + 4.0, cy - 4.0, 2.0, BLACK);
        }
    }

    fn draw_fireballs(&self, snap: &Snapshot) {
        for fb in &snap.fireballs {
            let cx = fb.pos.x as f32 * CELL_PX + CELL_PX / 2.0;
            let cy = fb.pos.y as f32 * CELL_PX + CELL_PX / 2.0;
            let color = if fb.owner == "ai" { ORANGE } else { YELLOW };
            draw_circle(cx, cy, CELL_PX / 3.0, color);
            // Short motion streak opposite the travel direction.
            draw_line(
                cx,
                cy,
                cx - fb.dir.x as f32 * CELL_PX * 0.6,
                cy - fb.dir.y as f32 * CELL_PX * 0.6,
                2.0,
                Color::new(1.0, 0.8, 0.2, 0.5),
            );
        }
    }

    fn draw_crash_marker(&self, cell: Point) {
        let x = cell.x as f32 * CELL_PX;
        let y = cell.y as f32 * CELL_PX;
        draw_line(x + 3.0, y + 3.0, x + CELL_PX - 3.0, y + CELL_PX - 3.0, 3.0, RED);
        draw_line(x + CELL_PX - 3.0, y + 3.0, x + 3.0, y + CELL_PX - 3.0, 3.0, RED);
    }

    fn draw_effects(&self, effects: &EffectTimeline, now: Instant) {
        for effect in effects.effects() {
            match effect {
                Effect::Explosion { cell, started } => {
                    let progress = now.duration_since(*started).as_secs_f32()
                        / EXPLOSION_DURATION.as_secs_f32();
                    let progress = progress.clamp(0.0, 1.0);
                    let cx = cell.x as f32 * CELL_PX + CELL_PX / 2.0;
                    let cy = cell.y as f32 * CELL_PX + CELL_PX / 2.0;
                    let radius = CELL_PX * (0.3 + progress * 1.2);
                    let alpha = 1.0 - progress;
                    draw_circle(cx, cy, radius * 0.5, Color::new(1.0, 0.6, 0.1, alpha));
                    draw_circle_lines(cx, cy, radius, 2.0, Color::new(1.0, 0.3, 0.1, alpha));
                }
                Effect::Confetti(p) => {
                    let mut color = p.color;
                    color.a = p.life.clamp(0.0, 1.0);
                    match p.shape {
                        ConfettiShape::Rect => draw_rectangle_ex(
                            p.x,
                            p.y,
                            6.0,
                            3.0,
                            DrawRectangleParams {
                                rotation: p.rot,
                                color,
                                ..Default::default()
                            },
                        ),
                        ConfettiShape::Circle => draw_circle(p.x, p.y, 2.5, color),
                    }
                }
                Effect::FloatingText {
                    x,
                    y,
                    label,
                    color,
                    started,
                } => {
                    let progress = now.duration_since(*started).as_secs_f32()
                        / FLOATING_TEXT_DURATION.as_secs_f32();
                    let mut color = *color;
                    color.a = (1.0 - progress).clamp(0.0, 1.0);
                    draw_text(label, *x, *y, 16.0, color);
                }
            }
        }
    }

    fn draw_banner(&self, state: &ClientState, now: Instant) {
        let Some(banner) = &state.banner else {
            return;
        };
        if banner.progress(now).is_none() {
            return;
        }
        let (w, _) = self.board_px(state);
        let alpha = banner.alpha(now);
        let drift = if alpha < 1.0 { (1.0 - alpha) * 12.0 } else { 0.0 };
        let color = match banner.class.as_str() {
            "bonus" => Color::new(1.0, 0.84, 0.25, alpha),
            "important" => Color::new(1.0, 0.45, 0.45, alpha),
            _ => Color::new(1.0, 1.0, 1.0, alpha),
        };
        let dims = measure_text(&banner.text, None, 18, 1.0);
        draw_text(
            &banner.text,
            (w - dims.width) / 2.0,
            60.0 - drift,
            18.0,
            color,
        );
    }

    fn draw_hud(&self, state: &ClientState, session: &SessionState, snap: &Snapshot) {
        let (w, h) = self.board_px(state);
        let hud_y = h + 16.0;

        let line = format!(
            "Score {}   Best {}   Eaten {}   Speed {:.2}",
            snap.score,
            session.best_score(),
            snap.food_eaten,
            snap.eating_speed
        );
        draw_text(&line, 8.0, hud_y, 16.0, WHITE);

        let opponent = if snap.is_pvp && !snap.p2_name.is_empty() {
            format!("{} vs {}", snap.p1_name, snap.p2_name)
        } else {
            "AI".to_string()
        };
        let mut second = format!("{} {}   Time {}s", opponent, snap.ai_score, snap.time_remaining);
        if snap.boosting {
            second.push_str("   BOOST");
        }
        if snap.berserker {
            second.push_str("   BERSERKER");
        }
        draw_text(&second, 8.0, hud_y + 18.0, 16.0, GRAY);

        // Connection and latency indicators, teacher-style ping bars.
        let status_color = match state.connection {
            ConnectionStatus::Connected => GREEN,
            ConnectionStatus::Connecting => YELLOW,
            ConnectionStatus::Down => RED,
        };
        draw_rectangle(w - 90.0, hud_y - 10.0, 8.0, 8.0, status_color);
        if let (Some(ping), Some(tier)) = (state.ping_ms, state.latency_tier()) {
            let bar_color = match tier {
                LatencyTier::Good => GREEN,
                LatencyTier::Medium => YELLOW,
                LatencyTier::Bad => RED,
            };
            let bars = ((ping / 20).min(10)) as i32;
            for i in 0..10i32 {
                let color = if i < bars {
                    bar_color
                } else {
                    Color::new(0.2, 0.2, 0.2, 1.0)
                };
                draw_rectangle(w - 76.0 + i as f32 * 3.0, hud_y - 10.0, 2.0, 8.0, color);
            }
            draw_text(&format!("{}ms", ping), w - 42.0, hud_y - 2.0, 12.0, WHITE);
        }

        let who = match (session.phase(), session.user()) {
            (AuthPhase::Authenticated, Some(user)) => format!("{} online", user.username),
            (AuthPhase::Authenticating, _) => "signing in...".to_string(),
            _ => "anonymous".to_string(),
        };
        let mut third = format!("{}   {} players connected", who, state.session_count);
        if session.searching() {
            third.push_str("   searching for opponent...");
        }
        if let Some(err) = session.auth_error() {
            third = format!("login failed: {}", err);
        }
        draw_text(&third, 8.0, hud_y + 36.0, 14.0, LIGHTGRAY);
    }

    fn draw_overlay(&self, snap: &Snapshot, session: &SessionState) {
        let (title, subtitle) = if snap.game_over {
            let title = match snap.winner.as_str() {
                "player" => "YOU WIN!",
                "ai" => "GAME OVER",
                "draw" => "DRAW",
                _ => "GAME OVER",
            };
            (Some(title), "Press R to restart")
        } else if snap.paused {
            (Some("PAUSED"), "Press P to continue")
        } else {
            (None, "")
        };
        let Some(title) = title else { return };

        let w = screen_width();
        let h = screen_height();
        draw_rectangle(0.0, 0.0, w, h, Color::new(0.0, 0.0, 0.0, 0.55));
        let dims = measure_text(title, None, 36, 1.0);
        draw_text(title, (w - dims.width) / 2.0, h / 2.0 - 12.0, 36.0, WHITE);
        let dims = measure_text(subtitle, None, 18, 1.0);
        draw_text(
            subtitle,
            (w - dims.width) / 2.0,
            h / 2.0 + 18.0,
            18.0,
            LIGHTGRAY,
        );

        // Standings under the game-over card.
        if snap.game_over {
            for (i, line) in standings_lines(session, 5).iter().enumerate() {
                let dims = measure_text(line, None, 14, 1.0);
                draw_text(
                    line,
                    (w - dims.width) / 2.0,
                    h / 2.0 + 48.0 + i as f32 * 18.0,
                    14.0,
                    GRAY,
                );
            }
        }
    }

    fn draw_alert(&self, state: &ClientState) {
        let Some(alert) = &state.alert else { return };
        let w = screen_width();
        let h = screen_height();
        draw_rectangle(0.0, 0.0, w, h, Color::new(0.0, 0.0, 0.0, 0.7));
        draw_rectangle(w / 2.0 - 160.0, h / 2.0 - 50.0, 320.0, 100.0, DARKGRAY);
        let dims = measure_text(alert, None, 16, 1.0);
        draw_text(alert, (w - dims.width) / 2.0, h / 2.0, 16.0, RED);
    }

    fn draw_replay_meta(&self, state: &ClientState) {
        let Some(meta) = &state.replay else { return };
        let label = format!("REPLAY  step {}  intent {}", meta.step, meta.intent);
        draw_text(&label, 8.0, 16.0, 14.0, SKYBLUE);
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats the cached leaderboard into ranked rows for the game-over
/// overlay. Appends the player's win rate line when one is cached.
fn standings_lines(session: &SessionState, limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = session
        .leaderboard()
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, entry)| format!("{}. {}  {}", i + 1, entry.name, entry.score))
        .collect();
    if let Some(user) = session.user() {
        if let Some(rate) = session
            .win_rates()
            .iter()
            .find(|r| r.name == user.username)
        {
            lines.push(format!(
                "{}: {} wins / {} games ({:.0}%)",
                rate.name,
                rate.total_wins,
                rate.total_games,
                rate.win_rate * 100.0
            ));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use shared::{LeaderboardEntry, User, WinRateEntry};

    fn entry(name: &str, score: i32) -> LeaderboardEntry {
        LeaderboardEntry {
            name: name.into(),
            score,
            date: String::new(),
            difficulty: String::new(),
            mode: String::new(),
        }
    }

    #[test]
    fn standings_rank_and_truncate_the_cached_leaderboard() {
        let store = Store::in_memory();
        let mut session = SessionState::new(&store);
        session.set_leaderboards(
            (0..8).map(|i| entry(&format!("p{}", i), 100 - i)).collect(),
            Vec::new(),
        );

        let lines = standings_lines(&session, 5);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "1. p0  100");
        assert_eq!(lines[4], "5. p4  96");
    }

    #[test]
    fn standings_include_the_signed_in_players_win_rate() {
        let mut store = Store::in_memory();
        let mut session = SessionState::new(&store);
        session.begin_auth("bee", "hunter2", false);
        session.on_auth_success(
            Some(User {
                username: "bee".into(),
                best_score: 10,
                total_games: 5,
                total_wins: 2,
                created_at: String::new(),
            }),
            &mut store,
        );
        session.set_leaderboards(
            vec![entry("bee", 10)],
            vec![WinRateEntry {
                name: "bee".into(),
                win_rate: 0.4,
                total_wins: 2,
                total_games: 5,
            }],
        );

        let lines = standings_lines(&session, 5);
        assert_eq!(lines.last().unwrap(), "bee: 2 wins / 5 games (40%)");
    }

    #[test]
    fn empty_caches_produce_no_standings() {
        let store = Store::in_memory();
        let session = SessionState::new(&store);
        assert!(standings_lines(&session, 5).is_empty());
    }
}
