use crate::brain::{Action, DecisionPolicy, PolicyHandle, SensedInputs};
use crate::config::{CreatureConfig, FitnessConfig};
use evolarium_data::{map_range, CreatureColor, CreatureView, Vec2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Version 4 UUID drawn from `rng`, so seeded worlds get reproducible ids.
pub fn random_id<R: Rng>(rng: &mut R) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DeathCause {
    Starvation,
    Wasting,
    Predation { by: Uuid },
    Border,
    Corner,
    Immobile,
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeathCause::Starvation => f.write_str("starvation"),
            DeathCause::Wasting => f.write_str("wasting"),
            DeathCause::Predation { by } => write!(f, "eaten by {by}"),
            DeathCause::Border => f.write_str("border"),
            DeathCause::Corner => f.write_str("corner"),
            DeathCause::Immobile => f.write_str("immobile"),
        }
    }
}

/// A living agent.
///
/// `size` never drops below `min_size`; a creature whose size reaches the
/// floor is marked dead and disappears at the end of the tick.
#[derive(Debug)]
pub struct Creature<P: DecisionPolicy> {
    pub id: Uuid,
    pub pos: Vec2,
    pub vel: Vec2,
    pub acc: Vec2,
    pub size: f64,
    pub min_size: f64,
    pub color: CreatureColor,
    pub speed_multiplier: f64,
    pub energy: f64,
    pub age_counter: u64,
    pub food_eaten: u32,
    pub prey_eaten: u32,
    pub reproductions: u32,
    pub time_since_last_meal: u64,
    pub corner_timer: u32,
    pub immobile_timer: u32,
    pub border_timer: u32,
    pub generation: u32,
    pub parent_id: Option<Uuid>,
    pub policy: PolicyHandle<P>,
    pub death: Option<DeathCause>,
    /// Inputs and action of the current tick, kept for policy feedback.
    pub(crate) last_inputs: Option<SensedInputs>,
    pub(crate) last_action: Option<Action>,
}

impl<P: DecisionPolicy> Creature<P> {
    #[must_use]
    pub fn new(
        pos: Vec2,
        size: f64,
        color: CreatureColor,
        config: &CreatureConfig,
        policy: PolicyHandle<P>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pos,
            vel: Vec2::ZERO,
            acc: Vec2::ZERO,
            size: size.max(config.min_size),
            min_size: config.min_size,
            color,
            speed_multiplier: config.speed_multiplier,
            energy: config.initial_energy,
            age_counter: 0,
            food_eaten: 0,
            prey_eaten: 0,
            reproductions: 0,
            time_since_last_meal: 0,
            corner_timer: 0,
            immobile_timer: 0,
            border_timer: 0,
            generation: 0,
            parent_id: None,
            policy,
            death: None,
            last_inputs: None,
            last_action: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.death.is_none()
    }

    /// Records the first cause of death; later causes in the same tick are ignored.
    pub fn mark_dead(&mut self, cause: DeathCause) {
        if self.death.is_none() {
            self.death = Some(cause);
        }
    }

    pub fn set_size(&mut self, size: f64) {
        self.size = size.max(self.min_size);
    }

    #[must_use]
    pub fn olfactory_range(&self, config: &CreatureConfig) -> f64 {
        map_range(
            self.size,
            self.min_size,
            config.olfactory_size_cap,
            config.olfactory_min_range,
            config.olfactory_max_range,
        )
    }

    #[must_use]
    pub fn fitness_score(&self, fitness: &FitnessConfig, initial_energy: f64) -> f64 {
        let raw = fitness.age_weight * self.age_counter as f64
            + fitness.food_weight * f64::from(self.food_eaten)
            + fitness.prey_multiplier * fitness.food_weight * f64::from(self.prey_eaten)
            + fitness.reproduction_weight * f64::from(self.reproductions);
        if fitness.scale_by_energy {
            let fraction = (self.energy / initial_energy).clamp(0.0, 1.0);
            raw * (0.5 + 0.5 * fraction)
        } else {
            raw
        }
    }

    #[must_use]
    pub fn to_view(&self) -> CreatureView {
        CreatureView {
            id: self.id,
            pos: self.pos,
            size: self.size,
            color: self.color,
            energy: self.energy,
            food_eaten: self.food_eaten,
            prey_eaten: self.prey_eaten,
            age_counter: self.age_counter,
        }
    }
}
