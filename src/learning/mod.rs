//! Tabular Q-learning over response strategies.
//!
//! The engine asks [`QLearner::select_action`] which [`Strategy`] to use for a
//! think, then feeds the observed outcome back through [`QLearner::update`].
//! Per-entry updates are atomic on the [`DashMap`] and never wait on
//! maintenance; [`QLearner::evolve`] and [`QLearner::replay_batch`] serialize
//! on a tokio mutex so the two heavyweight passes never interleave.

pub mod state;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::LearningConfig;

pub use state::{StateKey, Strategy};

#[derive(Debug, Clone, Copy, Default)]
pub struct QEntry {
    pub value: f64,
    pub visits: u32,
}

/// Observable signals a reward is derived from.
#[derive(Debug, Clone, Copy)]
pub struct RewardSignals {
    /// Confidence of the resulting thought, in [0, 1].
    pub confidence: f64,
    /// Fraction of the recall limit that was actually used, in [0, 1].
    pub memory_reuse: f64,
}

/// Pluggable reward function. The default is a weighted sum of the two
/// signals with weights from `[learning]` config.
pub type RewardFn = Arc<dyn Fn(&RewardSignals) -> f64 + Send + Sync>;

pub fn weighted_reward(confidence_weight: f64, reuse_weight: f64) -> RewardFn {
    Arc::new(move |signals: &RewardSignals| {
        confidence_weight * signals.confidence + reuse_weight * signals.memory_reuse
    })
}

/// One recorded transition for experience replay.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub state: StateKey,
    pub action: Strategy,
    pub reward: f64,
    pub next_state: StateKey,
}

/// What an `evolve()` pass changed.
#[derive(Debug, Clone, Serialize)]
pub struct EvolveSummary {
    pub reward_trend: f64,
    pub exploration_before: f64,
    pub exploration_after: f64,
    pub pruned_entries: usize,
    pub q_entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearnerStats {
    pub q_entries: usize,
    pub total_updates: u64,
    pub avg_reward: f64,
    pub reward_trend: f64,
    pub exploration_rate: f64,
}

const RECENT_REWARD_WINDOW: usize = 100;

pub struct QLearner {
    q_table: DashMap<(StateKey, Strategy), QEntry>,
    replay: Mutex<VecDeque<Transition>>,
    recent_rewards: Mutex<VecDeque<f64>>,
    exploration_rate: RwLock<f64>,
    /// Held by evolve and replay passes, never by per-think updates.
    maintenance: tokio::sync::Mutex<()>,
    reward_fn: RewardFn,
    total_updates: AtomicU64,
    config: LearningConfig,
}

impl QLearner {
    pub fn new(config: LearningConfig) -> Self {
        let reward_fn = weighted_reward(
            config.reward_confidence_weight,
            config.reward_reuse_weight,
        );
        Self::with_reward_fn(config, reward_fn)
    }

    pub fn with_reward_fn(config: LearningConfig, reward_fn: RewardFn) -> Self {
        Self {
            q_table: DashMap::new(),
            replay: Mutex::new(VecDeque::with_capacity(config.replay_capacity)),
            recent_rewards: Mutex::new(VecDeque::with_capacity(RECENT_REWARD_WINDOW)),
            exploration_rate: RwLock::new(config.exploration_rate),
            maintenance: tokio::sync::Mutex::new(()),
            reward_fn,
            total_updates: AtomicU64::new(0),
            config,
        }
    }

    pub fn reward(&self, signals: &RewardSignals) -> f64 {
        (self.reward_fn)(signals)
    }

    pub fn exploration_rate(&self) -> f64 {
        *self.exploration_rate.read()
    }

    /// Epsilon-greedy strategy selection. Exploitation picks the highest
    /// Q-value; among equal values the least-visited action wins, so fresh
    /// actions get tried before the table ossifies.
    pub fn select_action(&self, state: StateKey) -> Strategy {
        let mut rng = rand::rng();
        if rng.random::<f64>() < *self.exploration_rate.read() {
            return Strategy::ALL[rng.random_range(0..Strategy::ALL.len())];
        }

        let mut best = Strategy::ALL[0];
        let mut best_entry = self.entry(state, best);
        for &strategy in &Strategy::ALL[1..] {
            let entry = self.entry(state, strategy);
            let better = entry.value > best_entry.value
                || (entry.value == best_entry.value && entry.visits < best_entry.visits);
            if better {
                best = strategy;
                best_entry = entry;
            }
        }
        best
    }

    /// One Q-learning step:
    /// `value += α · (reward + γ · max_a' Q(next_state, a') − value)`.
    /// Returns the TD error. Also decays the exploration rate one notch.
    pub fn update(
        &self,
        state: StateKey,
        action: Strategy,
        reward: f64,
        next_state: StateKey,
    ) -> f64 {
        // missing entries default to 0.0, so an untouched next state
        // contributes nothing either way
        let next_max = Strategy::ALL
            .iter()
            .map(|&a| self.entry(next_state, a).value)
            .fold(f64::NEG_INFINITY, f64::max);

        let mut entry = self.q_table.entry((state, action)).or_default();
        let td_target = reward + self.config.discount_factor * next_max;
        let td_error = td_target - entry.value;
        entry.value += self.config.learning_rate * td_error;
        entry.visits += 1;
        drop(entry);

        self.decay_exploration();
        self.total_updates.fetch_add(1, Ordering::Relaxed);
        td_error
    }

    /// Append a transition to the bounded replay buffer and track its reward
    /// for trend analysis.
    pub fn record(&self, transition: Transition) {
        {
            let mut replay = self.replay.lock();
            if replay.len() >= self.config.replay_capacity {
                replay.pop_front();
            }
            replay.push_back(transition);
        }
        let mut rewards = self.recent_rewards.lock();
        if rewards.len() >= RECENT_REWARD_WINDOW {
            rewards.pop_front();
        }
        rewards.push_back(transition.reward);
    }

    /// Replay a random batch of stored transitions through `update`.
    /// Serialized against `evolve`; returns how many were replayed.
    pub async fn replay_batch(&self) -> usize {
        let _guard = self.maintenance.lock().await;

        let batch: Vec<Transition> = {
            let replay = self.replay.lock();
            if replay.is_empty() {
                return 0;
            }
            let amount = self.config.replay_batch.min(replay.len());
            let mut rng = rand::rng();
            rand::seq::index::sample(&mut rng, replay.len(), amount)
                .into_iter()
                .map(|i| replay[i])
                .collect()
        };

        for t in &batch {
            self.update(t.state, t.action, t.reward, t.next_state);
        }
        debug!(count = batch.len(), "replayed experience batch");
        batch.len()
    }

    /// Meta-learning pass: fit a trend to recent rewards, widen exploration
    /// when rewards are falling and tighten it when they are rising, and
    /// prune Q-entries that were barely visited. Exclusive with replay.
    pub async fn evolve(&self) -> EvolveSummary {
        let _guard = self.maintenance.lock().await;

        let trend = {
            let rewards = self.recent_rewards.lock();
            let values: Vec<f64> = rewards.iter().copied().collect();
            linear_trend(&values)
        };

        let before = *self.exploration_rate.read();
        let after = if trend < -0.01 {
            (before * 1.1).min(self.config.exploration_max)
        } else if trend > 0.01 {
            (before * 0.9).max(self.config.exploration_min)
        } else {
            before
        };
        *self.exploration_rate.write() = after;

        let floor = self.config.prune_visit_floor;
        let before_len = self.q_table.len();
        self.q_table.retain(|_, entry| entry.visits >= floor);
        let pruned = before_len - self.q_table.len();

        if pruned > 0 || (after - before).abs() > f64::EPSILON {
            info!(
                trend,
                exploration_before = before,
                exploration_after = after,
                pruned,
                "evolve adjusted learner"
            );
        }

        EvolveSummary {
            reward_trend: trend,
            exploration_before: before,
            exploration_after: after,
            pruned_entries: pruned,
            q_entries: self.q_table.len(),
        }
    }

    pub fn stats(&self) -> LearnerStats {
        let rewards = self.recent_rewards.lock();
        let avg_reward = if rewards.is_empty() {
            0.0
        } else {
            rewards.iter().sum::<f64>() / rewards.len() as f64
        };
        let values: Vec<f64> = rewards.iter().copied().collect();
        LearnerStats {
            q_entries: self.q_table.len(),
            total_updates: self.total_updates.load(Ordering::Relaxed),
            avg_reward,
            reward_trend: linear_trend(&values),
            exploration_rate: *self.exploration_rate.read(),
        }
    }

    /// Export the Q-table as (state, action, value, visits) rows.
    pub fn export(&self) -> Vec<(String, String, f64, u32)> {
        self.q_table
            .iter()
            .map(|entry| {
                let (state, action) = entry.key();
                (
                    state.encode(),
                    action.as_str().to_string(),
                    entry.value().value,
                    entry.value().visits,
                )
            })
            .collect()
    }

    /// Restore previously exported rows. Rows that no longer decode (schema
    /// drift) are logged and skipped.
    pub fn import(&self, rows: Vec<(String, String, f64, u32)>) {
        for (state_str, action_str, value, visits) in rows {
            let (Some(state), Ok(action)) =
                (StateKey::decode(&state_str), action_str.parse::<Strategy>())
            else {
                warn!(state = %state_str, action = %action_str, "skipping undecodable q-table row");
                continue;
            };
            self.q_table.insert((state, action), QEntry { value, visits });
        }
    }

    fn entry(&self, state: StateKey, action: Strategy) -> QEntry {
        self.q_table
            .get(&(state, action))
            .map(|e| *e.value())
            .unwrap_or_default()
    }

    fn decay_exploration(&self) {
        let mut rate = self.exploration_rate.write();
        *rate = (*rate * self.config.exploration_decay)
            .clamp(self.config.exploration_min, self.config.exploration_max);
    }
}

/// Least-squares slope of a reward series; 0.0 when too short or flat.
fn linear_trend(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }
    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < 1e-10 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greedy_config() -> LearningConfig {
        LearningConfig {
            exploration_rate: 0.0,
            exploration_min: 0.0,
            ..LearningConfig::default()
        }
    }

    fn key(c: u8, r: u8, h: u8) -> StateKey {
        StateKey {
            confidence_bucket: c,
            recall_bucket: r,
            hour_bucket: h,
        }
    }

    #[test]
    fn single_update_matches_the_bellman_step() {
        let learner = QLearner::new(greedy_config());
        let state = key(2, 1, 0);
        let next = key(3, 1, 0);

        // empty table: next-state max is 0, so new value = α·r
        let td = learner.update(state, Strategy::MemoryOnly, 0.8, next);
        assert!((td - 0.8).abs() < 1e-9);
        let value = learner.entry(state, Strategy::MemoryOnly).value;
        assert!((value - 0.1 * 0.8).abs() < 1e-9);
    }

    #[test]
    fn negative_next_state_values_lower_the_target() {
        let learner = QLearner::new(greedy_config());
        let state = key(1, 1, 1);
        let next = key(2, 2, 2);
        for strategy in Strategy::ALL {
            learner
                .q_table
                .insert((next, strategy), QEntry { value: -1.0, visits: 3 });
        }

        // target = r + γ · max_a' Q(next, a') = 0 + 0.9 · (-1.0)
        let td = learner.update(state, Strategy::MemoryOnly, 0.0, next);
        assert!((td - (-0.9)).abs() < 1e-9);
        assert!(learner.entry(state, Strategy::MemoryOnly).value < 0.0);
    }

    #[test]
    fn greedy_selection_prefers_the_learned_action() {
        let learner = QLearner::new(greedy_config());
        let state = key(1, 1, 1);
        for _ in 0..20 {
            learner.update(state, Strategy::WidenRecall, 1.0, state);
        }
        assert_eq!(learner.select_action(state), Strategy::WidenRecall);
    }

    #[test]
    fn unvisited_state_ties_break_toward_least_visited() {
        let learner = QLearner::new(greedy_config());
        let state = key(0, 0, 0);
        // all four actions are at value 0 / visits 0; the first wins the tie
        assert_eq!(learner.select_action(state), Strategy::MemoryOnly);

        // after visiting the first at equal value, a fresh action wins
        learner.q_table.insert(
            (state, Strategy::MemoryOnly),
            QEntry { value: 0.0, visits: 5 },
        );
        assert_ne!(learner.select_action(state), Strategy::MemoryOnly);
    }

    #[test]
    fn replay_buffer_is_bounded() {
        let config = LearningConfig {
            replay_capacity: 10,
            ..greedy_config()
        };
        let learner = QLearner::new(config);
        let state = key(0, 0, 0);
        for i in 0..50 {
            learner.record(Transition {
                state,
                action: Strategy::MemoryOnly,
                reward: i as f64,
                next_state: state,
            });
        }
        assert_eq!(learner.replay.lock().len(), 10);
        // oldest entries were dropped
        assert!((learner.replay.lock()[0].reward - 40.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn replay_batch_updates_the_table() {
        let learner = QLearner::new(greedy_config());
        let state = key(1, 2, 3);
        learner.record(Transition {
            state,
            action: Strategy::BlendAi,
            reward: 1.0,
            next_state: state,
        });

        let replayed = learner.replay_batch().await;
        assert_eq!(replayed, 1);
        assert!(learner.entry(state, Strategy::BlendAi).value > 0.0);
    }

    #[tokio::test]
    async fn evolve_widens_exploration_on_falling_rewards() {
        let config = LearningConfig {
            exploration_rate: 0.1,
            ..LearningConfig::default()
        };
        let learner = QLearner::new(config);
        let state = key(0, 0, 0);
        for i in 0..60 {
            learner.record(Transition {
                state,
                action: Strategy::MemoryOnly,
                reward: 1.0 - (i as f64) * 0.05,
                next_state: state,
            });
        }

        let summary = learner.evolve().await;
        assert!(summary.reward_trend < -0.01);
        assert!(summary.exploration_after > summary.exploration_before);
    }

    #[tokio::test]
    async fn evolve_prunes_low_visit_entries() {
        let learner = QLearner::new(greedy_config());
        let state = key(4, 3, 3);
        learner.q_table.insert(
            (state, Strategy::MemoryOnly),
            QEntry { value: 0.1, visits: 1 },
        );
        learner.q_table.insert(
            (state, Strategy::BlendAi),
            QEntry { value: 0.5, visits: 10 },
        );

        let summary = learner.evolve().await;
        assert_eq!(summary.pruned_entries, 1);
        assert_eq!(summary.q_entries, 1);
    }

    #[test]
    fn export_import_round_trip() {
        let learner = QLearner::new(greedy_config());
        let state = key(2, 2, 2);
        learner.update(state, Strategy::NarrowRecall, 0.5, state);

        let rows = learner.export();
        let restored = QLearner::new(greedy_config());
        restored.import(rows);
        let entry = restored.entry(state, Strategy::NarrowRecall);
        assert!((entry.value - 0.05).abs() < 1e-9);
        assert_eq!(entry.visits, 1);
    }

    #[test]
    fn default_reward_weights_signals() {
        let learner = QLearner::new(LearningConfig::default());
        let reward = learner.reward(&RewardSignals {
            confidence: 1.0,
            memory_reuse: 0.0,
        });
        assert!((reward - 0.7).abs() < 1e-9);
    }

    #[test]
    fn trend_of_rising_series_is_positive() {
        let values: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        assert!(linear_trend(&values) > 0.0);
        assert_eq!(linear_trend(&[]), 0.0);
        assert_eq!(linear_trend(&[1.0]), 0.0);
        assert!(linear_trend(&[0.5; 30]).abs() < 1e-9);
    }
}
