//! Food consumption, predation and the policy feedback they generate.
//!
//! Nothing is removed here. Eaten food is flagged in a mask and victims are
//! marked dead; the world compacts both once the tick is resolved.

use crate::brain::{DecisionPolicy, Experience, FeedbackOutcome, PolicyError};
use crate::config::FoodConfig;
use crate::creature::{Creature, DeathCause};
use crate::sensing::{sense, SensingContext};
use evolarium_data::{Food, FoodKind};

/// Feedback owed to a creature's policy once the tick's outcomes are known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingFeedback {
    pub creature: usize,
    pub reward: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedingReport {
    pub foods_eaten: usize,
    pub kills: usize,
    pub pending: Vec<PendingFeedback>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackStats {
    pub stored: usize,
    pub trained: usize,
    pub dispatched: usize,
    pub busy: usize,
    pub malformed: usize,
}

/// Each live creature eats at most one pellet: the first one within its own
/// size found scanning the food list from the back.
pub fn resolve_feeding<P: DecisionPolicy>(
    creatures: &mut [Creature<P>],
    food: &[Food],
    eaten: &mut [bool],
    config: &FoodConfig,
    report: &mut FeedingReport,
) {
    for (ci, creature) in creatures.iter_mut().enumerate() {
        if !creature.is_alive() {
            continue;
        }
        let hit = (0..food.len())
            .rev()
            .find(|&fi| !eaten[fi] && creature.pos.dist(&food[fi].pos) < creature.size);
        let Some(fi) = hit else {
            continue;
        };
        eaten[fi] = true;
        let (size_gain, energy_gain) = match food[fi].kind {
            FoodKind::Normal => (config.normal_size_gain, config.normal_energy_gain),
            FoodKind::Growth => (config.growth_size_gain, config.growth_energy_gain),
        };
        creature.set_size(creature.size + size_gain);
        creature.energy += energy_gain;
        creature.time_since_last_meal = 0;
        creature.food_eaten += 1;
        report.foods_eaten += 1;
        report.pending.push(PendingFeedback {
            creature: ci,
            reward: (energy_gain / 100.0) as f32,
        });
    }
}

/// Predation pass.
///
/// The attacker loop runs from the back of the list. An attacker eats the
/// first victim (also scanned from the back) that is closer than the
/// attacker's size, strictly smaller, and of a different color. Each attacker
/// kills at most once per tick, and a creature eaten earlier in the pass can
/// no longer attack.
pub fn resolve_predation<P: DecisionPolicy>(
    creatures: &mut [Creature<P>],
    config: &FoodConfig,
    report: &mut FeedingReport,
) {
    for ai in (0..creatures.len()).rev() {
        if !creatures[ai].is_alive() {
            continue;
        }
        let attacker = &creatures[ai];
        let victim = (0..creatures.len()).rev().find(|&vi| {
            let v = &creatures[vi];
            vi != ai
                && v.is_alive()
                && attacker.size > v.size
                && attacker.color != v.color
                && attacker.pos.dist(&v.pos) < attacker.size
        });
        let Some(vi) = victim else {
            continue;
        };

        let victim_size = creatures[vi].size;
        let attacker_id = creatures[ai].id;
        creatures[vi].mark_dead(DeathCause::Predation { by: attacker_id });

        let attacker = &mut creatures[ai];
        attacker.set_size(attacker.size + victim_size / 2.0);
        attacker.energy += victim_size * config.predation_energy_per_size;
        attacker.time_since_last_meal = 0;
        attacker.prey_eaten += 1;
        report.kills += 1;
        report.pending.push(PendingFeedback {
            creature: ai,
            reward: (2.0 + victim_size / 10.0) as f32,
        });
        report.pending.push(PendingFeedback {
            creature: vi,
            reward: -1.0,
        });
    }
}

/// Hands every pending reward to the owning policy.
///
/// The next state is sensed after the tick's consumption has been applied;
/// creatures that died this tick receive a terminal transition. A policy
/// that is still training rejects the round, which is counted and skipped.
pub fn deliver_feedback<P: DecisionPolicy>(
    creatures: &mut [Creature<P>],
    pending: &[PendingFeedback],
    food: &[Food],
    ctx: &SensingContext<'_>,
) -> FeedbackStats {
    let mut stats = FeedbackStats::default();
    for fb in pending {
        let Some(creature) = creatures.get(fb.creature) else {
            continue;
        };
        let (Some(state), Some(action)) = (creature.last_inputs, creature.last_action) else {
            continue;
        };
        let next_state = sense(fb.creature, creatures, food, ctx).to_inputs(ctx);
        let creature = &mut creatures[fb.creature];
        let exp = Experience {
            state,
            action,
            reward: fb.reward,
            next_state,
            terminal: !creature.is_alive(),
        };
        match creature.policy.ingest_feedback(exp) {
            Ok(FeedbackOutcome::Stored) => stats.stored += 1,
            Ok(FeedbackOutcome::Trained) => stats.trained += 1,
            Ok(FeedbackOutcome::Dispatched) => stats.dispatched += 1,
            Err(PolicyError::Busy) => {
                stats.busy += 1;
                tracing::debug!(creature = %creature.id, "Policy busy, feedback not trained");
            }
            Err(e) => {
                stats.malformed += 1;
                tracing::warn!(creature = %creature.id, error = %e, "Feedback rejected");
            }
        }
    }
    stats
}
