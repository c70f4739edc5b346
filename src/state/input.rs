//! Per-player input machine: the rotating key-prompt queue, hearts and
//! lockouts.
//!
//! The machine is purely local and deterministic given its RNG: feeding it a
//! key press returns the signed score delta to submit, and every timed
//! behavior (lockout release, transient flashes) is modeled as a deadline the
//! session loop sleeps on, not as a detached timer. Tests drive it with
//! synthetic instants.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::state::game::Team;

/// The four symbols a prompt can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKey {
    /// The `D` key.
    D,
    /// The `F` key.
    F,
    /// The `K` key.
    K,
    /// The `J` key.
    J,
}

/// The full prompt alphabet, in display order.
pub const ALPHABET: [PromptKey; 4] = [PromptKey::D, PromptKey::F, PromptKey::K, PromptKey::J];

impl PromptKey {
    /// Display form of the key.
    pub fn as_str(self) -> &'static str {
        match self {
            PromptKey::D => "D",
            PromptKey::F => "F",
            PromptKey::K => "K",
            PromptKey::J => "J",
        }
    }

    /// Classify raw client input, case-insensitively.
    ///
    /// Anything that is not exactly one of the four prompt symbols yields
    /// `None` and must be ignored by callers, in every state.
    pub fn from_input(raw: &str) -> Option<Self> {
        match raw {
            "d" | "D" => Some(PromptKey::D),
            "f" | "F" => Some(PromptKey::F),
            "k" | "K" => Some(PromptKey::K),
            "j" | "J" => Some(PromptKey::J),
            _ => None,
        }
    }
}

/// Lockout duration classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockClass {
    /// Regular wrong-key lockout.
    Short,
    /// Extended lockout entered when the last heart is lost.
    Long,
}

/// Phase of the input machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPhase {
    /// Not on a team; all gameplay input is ignored.
    NoTeam,
    /// On a team and accepting key presses.
    Idle,
    /// Penalized; input is ignored until the deadline passes.
    Locked {
        /// Which lockout duration applies.
        class: LockClass,
        /// When the lockout releases.
        until: Instant,
    },
}

/// Sizes and timing windows governing the input machine.
#[derive(Debug, Clone, Copy)]
pub struct InputSettings {
    /// Prompt queue length, head included.
    pub queue_len: usize,
    /// How many consumed-correct symbols the trailing history keeps.
    pub history_len: usize,
    /// Error budget before the long lockout triggers.
    pub max_hearts: u8,
    /// How long the success pulse stays visible.
    pub bump_flash: Duration,
    /// How long the wrong-key flash stays visible.
    pub wrong_key_flash: Duration,
    /// Lockout after a wrong key with hearts remaining.
    pub short_lockout: Duration,
    /// Lockout after the last heart is lost.
    pub long_lockout: Duration,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            queue_len: 5,
            history_len: 2,
            max_hearts: 3,
            bump_flash: Duration::from_millis(100),
            wrong_key_flash: Duration::from_millis(200),
            short_lockout: Duration::from_millis(1000),
            long_lockout: Duration::from_millis(2500),
        }
    }
}

/// Immediate outcome of feeding one key press to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The press changed nothing (no team, locked, or suppressed).
    Ignored,
    /// The press matched the prompt head; submit `delta` to the score.
    Pull {
        /// Signed score delta for the player's team.
        delta: i64,
    },
    /// The press missed; submit the penalty `delta` and show the lockout.
    Penalty {
        /// Signed score delta toward the opposing team.
        delta: i64,
        /// Lockout class the machine entered.
        lock: LockClass,
    },
}

/// Lock details as seen by a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSnapshot {
    /// Which lockout duration applies.
    pub class: LockClass,
    /// Time left until input resumes, zero if already due.
    pub remaining: Duration,
}

/// Point-in-time view of the machine, ready to push to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSnapshot {
    /// Team the player is on, if any.
    pub team: Option<Team>,
    /// Upcoming prompts; the first entry is the required key.
    pub queue: Vec<PromptKey>,
    /// Recently consumed-correct symbols, oldest first.
    pub history: Vec<PromptKey>,
    /// Hearts remaining; zero while the long lockout runs.
    pub hearts: u8,
    /// Present while locked.
    pub locked: Option<LockSnapshot>,
    /// Success pulse currently visible.
    pub bump: bool,
    /// Wrong-key flash currently visible.
    pub wrong_key: bool,
}

/// Per-player input machine.
#[derive(Debug, Clone)]
pub struct InputMachine {
    settings: InputSettings,
    rng: SmallRng,
    phase: InputPhase,
    team: Option<Team>,
    queue: VecDeque<PromptKey>,
    history: VecDeque<PromptKey>,
    hearts: u8,
    bump_until: Option<Instant>,
    wrong_until: Option<Instant>,
}

impl InputMachine {
    /// Create a detached machine with an OS-seeded RNG.
    pub fn new(settings: InputSettings) -> Self {
        Self::with_rng(settings, SmallRng::from_os_rng())
    }

    /// Create a detached machine over the given RNG; tests seed it.
    pub fn with_rng(settings: InputSettings, rng: SmallRng) -> Self {
        Self {
            settings,
            rng,
            phase: InputPhase::NoTeam,
            team: None,
            queue: VecDeque::new(),
            history: VecDeque::new(),
            hearts: settings.max_hearts,
            bump_until: None,
            wrong_until: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> InputPhase {
        self.phase
    }

    /// Team the player is currently pulling for.
    pub fn team(&self) -> Option<Team> {
        self.team
    }

    /// Attach to a team: fills the prompt queue and restores hearts.
    pub fn join(&mut self, team: Team) {
        self.team = Some(team);
        self.phase = InputPhase::Idle;
        self.hearts = self.settings.max_hearts;
        self.queue.clear();
        self.history.clear();
        self.bump_until = None;
        self.wrong_until = None;
        while self.queue.len() < self.settings.queue_len {
            let key = self.random_key();
            self.queue.push_back(key);
        }
    }

    /// Detach from the team and clear all per-player state.
    ///
    /// Used both for an explicit leave and when the player's roster entry
    /// vanished under them; the caller handles any store-side deletion.
    pub fn detach(&mut self) {
        self.team = None;
        self.phase = InputPhase::NoTeam;
        self.hearts = self.settings.max_hearts;
        self.queue.clear();
        self.history.clear();
        self.bump_until = None;
        self.wrong_until = None;
    }

    /// Apply every deadline crossed at `now`; returns whether anything a
    /// snapshot would show has changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let InputPhase::Locked { class, until } = self.phase
            && now >= until
        {
            self.phase = InputPhase::Idle;
            if class == LockClass::Long {
                self.hearts = self.settings.max_hearts;
            }
            changed = true;
        }
        if self.bump_until.is_some_and(|until| now >= until) {
            self.bump_until = None;
            changed = true;
        }
        if self.wrong_until.is_some_and(|until| now >= until) {
            self.wrong_until = None;
            changed = true;
        }
        changed
    }

    /// The next instant at which [`poll`](Self::poll) would change something.
    pub fn next_deadline(&self) -> Option<Instant> {
        let mut deadline: Option<Instant> = None;
        if let InputPhase::Locked { until, .. } = self.phase {
            deadline = Some(until);
        }
        for flag in [self.bump_until, self.wrong_until] {
            if let Some(until) = flag {
                deadline = Some(deadline.map_or(until, |d| d.min(until)));
            }
        }
        deadline
    }

    /// Feed one key press to the machine at `now`.
    ///
    /// Expired deadlines are applied first, so a press arriving after a
    /// lockout's release instant is processed normally.
    pub fn handle_key(&mut self, key: PromptKey, now: Instant) -> KeyOutcome {
        self.poll(now);

        if self.phase != InputPhase::Idle {
            return KeyOutcome::Ignored;
        }
        let Some(team) = self.team else {
            return KeyOutcome::Ignored;
        };
        let Some(required) = self.queue.front().copied() else {
            return KeyOutcome::Ignored;
        };

        // The head is consumed either way; a missed prompt is discarded,
        // not retried.
        self.advance_queue(required, key == required);

        if key == required {
            self.bump_until = Some(now + self.settings.bump_flash);
            KeyOutcome::Pull {
                delta: team.pull_sign(),
            }
        } else {
            self.wrong_until = Some(now + self.settings.wrong_key_flash);
            self.hearts = self.hearts.saturating_sub(1);
            let lock = if self.hearts == 0 {
                LockClass::Long
            } else {
                LockClass::Short
            };
            let duration = match lock {
                LockClass::Short => self.settings.short_lockout,
                LockClass::Long => self.settings.long_lockout,
            };
            self.phase = InputPhase::Locked {
                class: lock,
                until: now + duration,
            };
            KeyOutcome::Penalty {
                delta: -team.pull_sign(),
                lock,
            }
        }
    }

    /// Point-in-time view of the machine for pushing to the client.
    pub fn snapshot(&self, now: Instant) -> InputSnapshot {
        let locked = match self.phase {
            InputPhase::Locked { class, until } => Some(LockSnapshot {
                class,
                remaining: until.saturating_duration_since(now),
            }),
            _ => None,
        };
        InputSnapshot {
            team: self.team,
            queue: self.queue.iter().copied().collect(),
            history: self.history.iter().copied().collect(),
            hearts: self.hearts,
            locked,
            bump: self.bump_until.is_some_and(|until| now < until),
            wrong_key: self.wrong_until.is_some_and(|until| now < until),
        }
    }

    fn random_key(&mut self) -> PromptKey {
        ALPHABET[self.rng.random_range(0..ALPHABET.len())]
    }

    fn advance_queue(&mut self, consumed: PromptKey, correct: bool) {
        self.queue.pop_front();
        let key = self.random_key();
        self.queue.push_back(key);
        if correct && self.settings.history_len > 0 {
            self.history.push_back(consumed);
            while self.history.len() > self.settings.history_len {
                self.history.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> InputMachine {
        InputMachine::with_rng(InputSettings::default(), SmallRng::seed_from_u64(7))
    }

    fn joined(team: Team) -> InputMachine {
        let mut m = machine();
        m.join(team);
        m
    }

    fn head(m: &InputMachine, now: Instant) -> PromptKey {
        m.snapshot(now).queue[0]
    }

    fn not_head(m: &InputMachine, now: Instant) -> PromptKey {
        let required = head(m, now);
        ALPHABET
            .into_iter()
            .find(|candidate| *candidate != required)
            .unwrap()
    }

    #[test]
    fn starts_detached_with_an_empty_queue() {
        let m = machine();
        assert_eq!(m.phase(), InputPhase::NoTeam);
        let snap = m.snapshot(Instant::now());
        assert!(snap.queue.is_empty());
        assert_eq!(snap.team, None);
        assert_eq!(snap.hearts, 3);
    }

    #[test]
    fn join_fills_the_queue_and_restores_hearts() {
        let m = joined(Team::Right);
        let snap = m.snapshot(Instant::now());
        assert_eq!(snap.team, Some(Team::Right));
        assert_eq!(snap.queue.len(), 5);
        assert_eq!(snap.hearts, 3);
        assert!(snap.history.is_empty());
        assert!(snap.queue.iter().all(|key| ALPHABET.contains(key)));
    }

    #[test]
    fn same_seed_yields_the_same_queue() {
        let a = joined(Team::Left);
        let b = joined(Team::Left);
        assert_eq!(
            a.snapshot(Instant::now()).queue,
            b.snapshot(Instant::now()).queue
        );
    }

    #[test]
    fn correct_press_pulls_for_the_team() {
        let now = Instant::now();
        for (team, expected) in [(Team::Right, 1), (Team::Left, -1)] {
            let mut m = joined(team);
            let required = head(&m, now);
            assert_eq!(
                m.handle_key(required, now),
                KeyOutcome::Pull { delta: expected }
            );
        }
    }

    #[test]
    fn correct_press_advances_the_queue_by_one() {
        let now = Instant::now();
        let mut m = joined(Team::Right);
        let before = m.snapshot(now).queue;
        m.handle_key(before[0], now);
        let after = m.snapshot(now).queue;

        assert_eq!(after.len(), before.len());
        assert_eq!(&after[..before.len() - 1], &before[1..]);
        assert!(ALPHABET.contains(after.last().unwrap()));
    }

    #[test]
    fn correct_press_shows_a_transient_bump() {
        let now = Instant::now();
        let mut m = joined(Team::Right);
        let required = head(&m, now);
        m.handle_key(required, now);

        assert!(m.snapshot(now).bump);
        let later = now + Duration::from_millis(100);
        m.poll(later);
        assert!(!m.snapshot(later).bump);
        assert_eq!(m.phase(), InputPhase::Idle);
    }

    #[test]
    fn history_keeps_the_last_consumed_symbols() {
        let now = Instant::now();
        let mut m = joined(Team::Right);
        let mut consumed = Vec::new();
        for _ in 0..4 {
            let required = head(&m, now);
            consumed.push(required);
            m.handle_key(required, now);
        }
        assert_eq!(m.snapshot(now).history, &consumed[2..]);
    }

    #[test]
    fn wrong_press_penalizes_and_locks_short() {
        let now = Instant::now();
        let mut m = joined(Team::Right);
        let before = m.snapshot(now).queue;
        let outcome = m.handle_key(not_head(&m, now), now);

        assert_eq!(
            outcome,
            KeyOutcome::Penalty {
                delta: -1,
                lock: LockClass::Short
            }
        );
        let snap = m.snapshot(now);
        assert_eq!(snap.hearts, 2);
        assert!(snap.wrong_key);
        assert_eq!(
            snap.locked.map(|lock| lock.class),
            Some(LockClass::Short)
        );
        // The missed prompt is discarded, not retried.
        assert_eq!(&snap.queue[..before.len() - 1], &before[1..]);
        assert!(snap.history.is_empty());
    }

    #[test]
    fn left_team_penalty_moves_the_score_right() {
        let now = Instant::now();
        let mut m = joined(Team::Left);
        let outcome = m.handle_key(not_head(&m, now), now);
        assert_eq!(
            outcome,
            KeyOutcome::Penalty {
                delta: 1,
                lock: LockClass::Short
            }
        );
    }

    #[test]
    fn input_is_ignored_while_locked() {
        let now = Instant::now();
        let mut m = joined(Team::Right);
        m.handle_key(not_head(&m, now), now);

        let during = now + Duration::from_millis(500);
        let required = head(&m, during);
        assert_eq!(m.handle_key(required, during), KeyOutcome::Ignored);
        assert_eq!(m.snapshot(during).hearts, 2);
    }

    #[test]
    fn short_lockout_releases_on_schedule() {
        let now = Instant::now();
        let mut m = joined(Team::Right);
        m.handle_key(not_head(&m, now), now);

        // The wrong-key flash expires first; past it, the lockout is the
        // next pending deadline.
        m.poll(now + Duration::from_millis(200));
        let release = now + Duration::from_millis(1000);
        assert_eq!(m.next_deadline(), Some(release));
        assert!(m.poll(release));
        assert_eq!(m.phase(), InputPhase::Idle);
        // Hearts lost to the short lockout stay lost.
        assert_eq!(m.snapshot(release).hearts, 2);

        let required = head(&m, release);
        assert!(matches!(
            m.handle_key(required, release),
            KeyOutcome::Pull { .. }
        ));
    }

    #[test]
    fn losing_every_heart_triggers_the_long_lockout() {
        let mut now = Instant::now();
        let mut m = joined(Team::Right);

        for expected_hearts in [2, 1] {
            let outcome = m.handle_key(not_head(&m, now), now);
            assert_eq!(
                outcome,
                KeyOutcome::Penalty {
                    delta: -1,
                    lock: LockClass::Short
                }
            );
            assert_eq!(m.snapshot(now).hearts, expected_hearts);
            now += Duration::from_millis(1000);
            m.poll(now);
        }

        let outcome = m.handle_key(not_head(&m, now), now);
        assert_eq!(
            outcome,
            KeyOutcome::Penalty {
                delta: -1,
                lock: LockClass::Long
            }
        );
        let snap = m.snapshot(now);
        assert_eq!(snap.hearts, 0);
        assert_eq!(snap.locked.map(|lock| lock.class), Some(LockClass::Long));
    }

    #[test]
    fn long_lockout_restores_hearts_on_release() {
        let mut now = Instant::now();
        let mut m = joined(Team::Right);
        for _ in 0..3 {
            m.handle_key(not_head(&m, now), now);
            now += Duration::from_millis(2500);
            m.poll(now);
        }
        // After the third wrong press the long lockout ran and released.
        assert_eq!(m.phase(), InputPhase::Idle);
        assert_eq!(m.snapshot(now).hearts, 3);
    }

    #[test]
    fn press_at_the_release_instant_is_processed() {
        let now = Instant::now();
        let mut m = joined(Team::Right);
        m.handle_key(not_head(&m, now), now);

        let release = now + Duration::from_millis(1000);
        let required = head(&m, release);
        assert!(matches!(
            m.handle_key(required, release),
            KeyOutcome::Pull { .. }
        ));
    }

    #[test]
    fn keys_are_ignored_without_a_team() {
        let mut m = machine();
        assert_eq!(
            m.handle_key(PromptKey::D, Instant::now()),
            KeyOutcome::Ignored
        );
        assert_eq!(m.phase(), InputPhase::NoTeam);
    }

    #[test]
    fn detach_clears_all_per_player_state() {
        let now = Instant::now();
        let mut m = joined(Team::Left);
        m.handle_key(not_head(&m, now), now);
        m.detach();

        assert_eq!(m.phase(), InputPhase::NoTeam);
        let snap = m.snapshot(now);
        assert_eq!(snap.team, None);
        assert!(snap.queue.is_empty());
        assert!(snap.history.is_empty());
        assert_eq!(snap.hearts, 3);
        assert!(snap.locked.is_none());
        assert!(!snap.wrong_key);
        assert_eq!(m.next_deadline(), None);
    }

    #[test]
    fn next_deadline_tracks_the_earliest_pending_expiry() {
        let now = Instant::now();
        let mut m = joined(Team::Right);
        assert_eq!(m.next_deadline(), None);

        let required = head(&m, now);
        m.handle_key(required, now);
        assert_eq!(m.next_deadline(), Some(now + Duration::from_millis(100)));

        let later = now + Duration::from_millis(100);
        m.poll(later);
        m.handle_key(not_head(&m, later), later);
        // Wrong-key flash expires before the lockout does.
        assert_eq!(
            m.next_deadline(),
            Some(later + Duration::from_millis(200))
        );
    }

    #[test]
    fn poll_reports_no_change_when_nothing_is_due() {
        let now = Instant::now();
        let mut m = joined(Team::Right);
        assert!(!m.poll(now));
        m.handle_key(not_head(&m, now), now);
        assert!(!m.poll(now + Duration::from_millis(10)));

        let release = now + Duration::from_millis(1000);
        assert!(m.poll(release));
        assert!(!m.poll(release));
    }

    #[test]
    fn raw_input_classification_covers_both_cases() {
        assert_eq!(PromptKey::from_input("d"), Some(PromptKey::D));
        assert_eq!(PromptKey::from_input("F"), Some(PromptKey::F));
        assert_eq!(PromptKey::from_input("k"), Some(PromptKey::K));
        assert_eq!(PromptKey::from_input("J"), Some(PromptKey::J));

        for raw in ["x", "", " ", "dd", "1", "Enter"] {
            assert_eq!(PromptKey::from_input(raw), None, "{raw:?}");
        }
    }
}
