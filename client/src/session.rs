//! Session and matchmaking state: a small state machine over the
//! authentication phase and the match-search flag, plus the leaderboard
//! caches, driven entirely by discrete server message types.

use log::info;
use shared::{LeaderboardEntry, Snapshot, User, WinRateEntry};

use crate::storage::Store;

/// Banner text the authority embeds in a state message when matchmaking
/// pairs two players; seeing it means we stopped searching. Matched
/// case-insensitively: the wire banner arrives decorated
/// ("⚔️ MATCH FOUND!").
const MATCH_FOUND_MARKER: &str = "MATCH FOUND";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Anonymous,
    Authenticating,
    Authenticated,
}

pub struct SessionState {
    phase: AuthPhase,
    user: Option<User>,
    searching: bool,
    auth_error: Option<String>,
    leaderboard: Vec<LeaderboardEntry>,
    win_rates: Vec<WinRateEntry>,
    best_score: i32,
    /// Credentials of the in-flight login attempt, held until the
    /// authority confirms; the bool is the remember-me opt-in.
    pending: Option<(String, String, bool)>,
}

impl SessionState {
    pub fn new(store: &Store) -> Self {
        Self {
            phase: AuthPhase::Anonymous,
            user: None,
            searching: false,
            auth_error: None,
            leaderboard: Vec::new(),
            win_rates: Vec::new(),
            best_score: store.best_score(),
            pending: None,
        }
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn searching(&self) -> bool {
        self.searching
    }

    pub fn best_score(&self) -> i32 {
        self.best_score
    }

    pub fn auth_error(&self) -> Option<&str> {
        self.auth_error.as_deref()
    }

    pub fn leaderboard(&self) -> &[LeaderboardEntry] {
        &self.leaderboard
    }

    pub fn win_rates(&self) -> &[WinRateEntry] {
        &self.win_rates
    }

    /// A login or register command went out.
    pub fn begin_auth(&mut self, username: &str, password: &str, remember: bool) {
        self.phase = AuthPhase::Authenticating;
        self.auth_error = None;
        self.pending = Some((username.to_string(), password.to_string(), remember));
    }

    pub fn on_auth_success(&mut self, user: Option<User>, store: &mut Store) {
        self.phase = AuthPhase::Authenticated;
        self.auth_error = None;

        if let Some((username, password, remember)) = self.pending.take() {
            if remember {
                store.set_credentials(&username, &password);
            }
        }

        if let Some(user) = user {
            info!("Authenticated as {}", user.username);
            // Never regress a higher locally cached best score.
            if user.best_score > self.best_score {
                self.best_score = user.best_score;
                store.set_best_score(self.best_score);
            }
            self.user = Some(user);
        }
    }

    pub fn on_auth_error(&mut self, error: String) {
        self.phase = AuthPhase::Anonymous;
        self.pending = None;
        self.auth_error = Some(error);
    }

    pub fn logout(&mut self, store: &mut Store) {
        self.phase = AuthPhase::Anonymous;
        self.user = None;
        self.searching = false;
        store.clear_credentials();
    }

    /// Matchmaking is only reachable once authenticated.
    pub fn begin_search(&mut self) -> bool {
        if self.phase != AuthPhase::Authenticated {
            return false;
        }
        self.searching = true;
        true
    }

    pub fn cancel_search(&mut self) {
        self.searching = false;
    }

    /// Connection dropped: searching stops immediately (no server message
    /// required) and everything but the persisted subset resets. The
    /// transport replays a stored-credential login on reconnect.
    pub fn on_disconnect(&mut self) {
        self.searching = false;
        self.phase = AuthPhase::Anonymous;
        self.user = None;
        self.pending = None;
        self.leaderboard.clear();
        self.win_rates.clear();
    }

    pub fn set_leaderboards(
        &mut self,
        entries: Vec<LeaderboardEntry>,
        win_rates: Vec<WinRateEntry>,
    ) {
        if !entries.is_empty() {
            self.leaderboard = entries;
        }
        if !win_rates.is_empty() {
            self.win_rates = win_rates;
        }
    }

    /// Reacts to a freshly applied snapshot: new high scores persist
    /// immediately, embedded payloads merge, and a match-found banner
    /// ends the search.
    pub fn on_state(
        &mut self,
        snap: &Snapshot,
        user: Option<User>,
        leaderboard: Vec<LeaderboardEntry>,
        win_rates: Vec<WinRateEntry>,
        store: &mut Store,
    ) {
        if snap.score > self.best_score {
            self.best_score = snap.score;
            store.set_best_score(self.best_score);
        }
        if self.searching && snap.message.to_uppercase().contains(MATCH_FOUND_MARKER) {
            self.searching = false;
        }
        if let Some(user) = user {
            if self.phase == AuthPhase::Authenticated {
                self.user = Some(user);
            }
        }
        self.set_leaderboards(leaderboard, win_rates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::in_memory()
    }

    fn user(name: &str, best: i32) -> User {
        User {
            username: name.into(),
            best_score: best,
            total_games: 10,
            total_wins: 4,
            created_at: String::new(),
        }
    }

    #[test]
    fn login_flow_reaches_authenticated() {
        let mut st = store();
        let mut session = SessionState::new(&st);
        assert_eq!(session.phase(), AuthPhase::Anonymous);

        session.begin_auth("bee", "hunter2", false);
        assert_eq!(session.phase(), AuthPhase::Authenticating);

        session.on_auth_success(Some(user("bee", 120)), &mut st);
        assert_eq!(session.phase(), AuthPhase::Authenticated);
        assert_eq!(session.user().unwrap().username, "bee");
    }

    #[test]
    fn auth_error_surfaces_inline_and_resets_phase() {
        let mut st = store();
        let mut session = SessionState::new(&st);
        session.begin_auth("bee", "wrong", false);
        session.on_auth_error("invalid password".into());
        assert_eq!(session.phase(), AuthPhase::Anonymous);
        assert_eq!(session.auth_error(), Some("invalid password"));
    }

    #[test]
    fn remember_opt_in_persists_credentials() {
        let mut st = store();
        let mut session = SessionState::new(&st);
        session.begin_auth("bee", "hunter2", true);
        session.on_auth_success(Some(user("bee", 0)), &mut st);
        assert_eq!(
            st.credentials(),
            Some(("bee".to_string(), "hunter2".to_string()))
        );

        session.logout(&mut st);
        assert!(st.credentials().is_none());
    }

    #[test]
    fn opt_out_never_persists_credentials() {
        let mut st = store();
        let mut session = SessionState::new(&st);
        session.begin_auth("bee", "hunter2", false);
        session.on_auth_success(Some(user("bee", 0)), &mut st);
        assert!(st.credentials().is_none());
    }

    #[test]
    fn server_best_score_merges_by_max() {
        let mut st = store();
        st.set_best_score(200);
        let mut session = SessionState::new(&st);
        session.begin_auth("bee", "hunter2", false);
        // Server reports a lower best; the local cache must not regress.
        session.on_auth_success(Some(user("bee", 150)), &mut st);
        assert_eq!(session.best_score(), 200);
        assert_eq!(st.best_score(), 200);

        // A higher server best does win.
        session.on_auth_success(Some(user("bee", 400)), &mut st);
        assert_eq!(session.best_score(), 400);
    }

    #[test]
    fn find_match_requires_authentication() {
        let mut st = store();
        let mut session = SessionState::new(&st);
        assert!(!session.begin_search());
        assert!(!session.searching());

        session.begin_auth("bee", "hunter2", false);
        session.on_auth_success(Some(user("bee", 0)), &mut st);
        assert!(session.begin_search());
        assert!(session.searching());

        session.cancel_search();
        assert!(!session.searching());
    }

    #[test]
    fn disconnect_clears_searching_without_server_message() {
        let mut st = store();
        let mut session = SessionState::new(&st);
        session.begin_auth("bee", "hunter2", false);
        session.on_auth_success(Some(user("bee", 77)), &mut st);
        session.begin_search();

        session.on_disconnect();
        assert!(!session.searching());
        assert_eq!(session.phase(), AuthPhase::Anonymous);
        // The persisted subset survives.
        assert_eq!(session.best_score(), 77);
    }

    #[test]
    fn match_found_banner_ends_search() {
        let mut st = store();
        let mut session = SessionState::new(&st);
        session.begin_auth("bee", "hunter2", false);
        session.on_auth_success(Some(user("bee", 0)), &mut st);
        session.begin_search();

        // The exact banner the authority sends when it pairs players.
        let mut snap = Snapshot::default();
        snap.message = "⚔️ MATCH FOUND!".into();
        session.on_state(&snap, None, Vec::new(), Vec::new(), &mut st);
        assert!(!session.searching());
    }

    #[test]
    fn match_found_marker_is_case_insensitive() {
        let mut st = store();
        let mut session = SessionState::new(&st);
        session.begin_auth("bee", "hunter2", false);
        session.on_auth_success(Some(user("bee", 0)), &mut st);
        session.begin_search();

        let mut snap = Snapshot::default();
        snap.message = "Match found: bee vs wasp".into();
        session.on_state(&snap, None, Vec::new(), Vec::new(), &mut st);
        assert!(!session.searching());

        // Unrelated banners never end the search.
        session.begin_search();
        snap.message = "Bonus food spawned!".into();
        session.on_state(&snap, None, Vec::new(), Vec::new(), &mut st);
        assert!(session.searching());
    }

    #[test]
    fn new_high_score_persists_immediately() {
        let mut st = store();
        let mut session = SessionState::new(&st);
        let mut snap = Snapshot::default();
        snap.score = 90;
        session.on_state(&snap, None, Vec::new(), Vec::new(), &mut st);
        assert_eq!(st.best_score(), 90);

        // Lower scores leave the stored best alone.
        snap.score = 10;
        session.on_state(&snap, None, Vec::new(), Vec::new(), &mut st);
        assert_eq!(st.best_score(), 90);
    }
}
