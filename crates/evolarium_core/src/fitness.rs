//! Best-individual tracking across ticks and epochs.

use crate::brain::{DecisionPolicy, PolicyParameters};
use crate::config::AppConfig;
use crate::creature::Creature;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestRecord {
    pub score: f64,
    pub creature_id: Uuid,
    pub generation: u32,
    pub parameters: PolicyParameters,
}

#[derive(Debug, Clone, Default)]
pub struct FitnessTracker {
    epoch_best: Option<BestRecord>,
    historical_best: Option<BestRecord>,
}

impl FitnessTracker {
    #[must_use]
    pub fn epoch_best(&self) -> Option<&BestRecord> {
        self.epoch_best.as_ref()
    }

    #[must_use]
    pub fn historical_best(&self) -> Option<&BestRecord> {
        self.historical_best.as_ref()
    }

    #[must_use]
    pub fn epoch_best_score(&self) -> f64 {
        self.epoch_best.as_ref().map_or(0.0, |r| r.score)
    }

    #[must_use]
    pub fn historical_best_score(&self) -> f64 {
        self.historical_best.as_ref().map_or(0.0, |r| r.score)
    }

    /// Scores the population and records any new best.
    ///
    /// The epoch record only considers creatures still alive this tick;
    /// the historical record also counts those that died during it.
    /// Parameters are only exported when a record is actually beaten.
    /// Returns true if the historical record moved.
    pub fn observe<P: DecisionPolicy>(
        &mut self,
        creatures: &[Creature<P>],
        config: &AppConfig,
        generation: u32,
    ) -> bool {
        let record = |score: f64, leader: &Creature<P>| BestRecord {
            score,
            creature_id: leader.id,
            generation,
            parameters: leader.policy.export_parameters(),
        };

        let mut beats_history = false;
        if let Some((score, leader)) = top_scorer(creatures.iter(), config) {
            if self.historical_best.is_none() || score > self.historical_best_score() {
                self.historical_best = Some(record(score, leader));
                beats_history = true;
            }
        }
        let alive = creatures.iter().filter(|c| c.is_alive());
        if let Some((score, leader)) = top_scorer(alive, config) {
            if self.epoch_best.is_none() || score > self.epoch_best_score() {
                self.epoch_best = Some(record(score, leader));
            }
        }
        beats_history
    }

    /// Forgets the epoch record; the historical one survives.
    pub fn reset_epoch(&mut self) {
        self.epoch_best = None;
    }
}

fn top_scorer<'a, P: DecisionPolicy + 'a>(
    creatures: impl Iterator<Item = &'a Creature<P>>,
    config: &AppConfig,
) -> Option<(f64, &'a Creature<P>)> {
    creatures
        .map(|c| {
            (
                c.fitness_score(&config.fitness, config.creature.initial_energy),
                c,
            )
        })
        .fold(None, |acc, (score, c)| match acc {
            Some((s, _)) if s >= score => acc,
            _ => Some((score, c)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::{PolicyHandle, RandomPolicy, TrainerSettings};
    use crate::creature::DeathCause;
    use evolarium_data::{CreatureColor, Vec2};

    fn creature(food: u32, config: &AppConfig) -> Creature<RandomPolicy> {
        let mut c = Creature::new(
            Vec2::new(1.0, 1.0),
            11.0,
            CreatureColor::Red,
            &config.creature,
            PolicyHandle::new(RandomPolicy, TrainerSettings::from(&config.policy)),
        );
        c.food_eaten = food;
        c
    }

    #[test]
    fn test_tracks_best_and_survives_epoch_reset() {
        let config = AppConfig::default();
        let mut tracker = FitnessTracker::default();
        let creatures = vec![creature(1, &config), creature(5, &config)];
        assert!(tracker.observe(&creatures, &config, 0));
        assert_eq!(tracker.epoch_best().map(|r| r.creature_id), Some(creatures[1].id));
        let best = tracker.historical_best_score();
        assert!(best > 0.0);

        tracker.reset_epoch();
        assert_eq!(tracker.epoch_best_score(), 0.0);
        assert_eq!(tracker.historical_best_score(), best);

        let weaker = vec![creature(2, &config)];
        assert!(!tracker.observe(&weaker, &config, 1));
        assert!(tracker.epoch_best_score() > 0.0);
        assert_eq!(tracker.historical_best_score(), best);
    }

    #[test]
    fn test_dead_creatures_only_count_towards_history() {
        let config = AppConfig::default();
        let mut tracker = FitnessTracker::default();
        let mut creatures = vec![creature(1, &config), creature(9, &config)];
        creatures[1].mark_dead(DeathCause::Starvation);

        assert!(tracker.observe(&creatures, &config, 1));
        assert_eq!(
            tracker.epoch_best().map(|r| r.creature_id),
            Some(creatures[0].id)
        );
        assert_eq!(
            tracker.historical_best().map(|r| r.creature_id),
            Some(creatures[1].id)
        );
        assert!(tracker.historical_best_score() > tracker.epoch_best_score());
    }

    #[test]
    fn test_empty_population_records_nothing() {
        let config = AppConfig::default();
        let mut tracker = FitnessTracker::default();
        let none: Vec<Creature<RandomPolicy>> = Vec::new();
        assert!(!tracker.observe(&none, &config, 0));
        assert!(tracker.historical_best().is_none());
    }
}
