//! Nearest-neighbour perception.
//!
//! Every query is a single forward linear scan, O(n) per creature. The first
//! strict minimum wins ties, which makes the result depend only on slice order.

use crate::brain::{DecisionPolicy, SensedInputs, SENSED_INPUTS};
use crate::config::CreatureConfig;
use crate::creature::Creature;
use evolarium_data::{Food, FoodKind, Vec2};
use rayon::prelude::*;

/// Something seen within olfactory range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    pub index: usize,
    /// Target position minus observer position.
    pub offset: Vec2,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensedState {
    pub range: f64,
    pub nearest_food: Option<Sighting>,
    pub nearest_growth_food: Option<Sighting>,
    pub prey: Option<Sighting>,
    pub predator: Option<Sighting>,
    pub size: f64,
    pub energy: f64,
    pub velocity: Vec2,
    /// Position scaled to `[-1, 1]` on both axes.
    pub arena_position: Vec2,
}

/// Arena-wide constants needed to normalise sensed values.
#[derive(Debug, Clone, Copy)]
pub struct SensingContext<'a> {
    pub width: f64,
    pub height: f64,
    pub creature: &'a CreatureConfig,
}

impl SensedState {
    #[must_use]
    pub fn to_inputs(&self, ctx: &SensingContext<'_>) -> SensedInputs {
        let mut out = [0.0f32; SENSED_INPUTS];
        let range = self.range.max(f64::EPSILON);
        let mut put = |slot: usize, sighting: Option<Sighting>| {
            if let Some(s) = sighting {
                out[slot] = (s.offset.x / range) as f32;
                out[slot + 1] = (s.offset.y / range) as f32;
            }
        };
        put(0, self.nearest_food);
        put(2, self.nearest_growth_food);
        put(4, self.prey);
        put(6, self.predator);
        let max_speed = ctx.creature.max_speed().max(f64::EPSILON);
        out[8] = (self.size / ctx.creature.olfactory_size_cap) as f32;
        out[9] = (self.energy / ctx.creature.initial_energy).clamp(-1.0, 5.0) as f32;
        out[10] = (self.velocity.x / max_speed) as f32;
        out[11] = (self.velocity.y / max_speed) as f32;
        out[12] = self.arena_position.x as f32;
        out[13] = self.arena_position.y as f32;
        out
    }
}

fn closer(best: &mut Option<Sighting>, index: usize, offset: Vec2, distance: f64, range: f64) {
    if distance >= range {
        return;
    }
    if best.map_or(true, |b| distance < b.distance) {
        *best = Some(Sighting {
            index,
            offset,
            distance,
        });
    }
}

/// Perception of the creature at `index`.
#[must_use]
pub fn sense<P: DecisionPolicy>(
    index: usize,
    creatures: &[Creature<P>],
    food: &[Food],
    ctx: &SensingContext<'_>,
) -> SensedState {
    let me = &creatures[index];
    let range = me.olfactory_range(ctx.creature);
    let mut state = SensedState {
        range,
        nearest_food: None,
        nearest_growth_food: None,
        prey: None,
        predator: None,
        size: me.size,
        energy: me.energy,
        velocity: me.vel,
        arena_position: Vec2::new(
            me.pos.x / ctx.width * 2.0 - 1.0,
            me.pos.y / ctx.height * 2.0 - 1.0,
        ),
    };

    for (i, f) in food.iter().enumerate() {
        let offset = f.pos - me.pos;
        let d = offset.length();
        closer(&mut state.nearest_food, i, offset, d, range);
        if f.kind == FoodKind::Growth {
            closer(&mut state.nearest_growth_food, i, offset, d, range);
        }
    }

    for (i, other) in creatures.iter().enumerate() {
        if i == index || !other.is_alive() || other.color == me.color {
            continue;
        }
        let offset = other.pos - me.pos;
        let d = offset.length();
        if other.size < me.size {
            closer(&mut state.prey, i, offset, d, range);
        } else if other.size > me.size {
            closer(&mut state.predator, i, offset, d, range);
        }
    }

    state
}

/// Perception for every creature, computed in parallel and returned in creature order.
#[must_use]
pub fn sense_all<P: DecisionPolicy>(
    creatures: &[Creature<P>],
    food: &[Food],
    ctx: &SensingContext<'_>,
) -> Vec<SensedState> {
    (0..creatures.len())
        .into_par_iter()
        .map(|i| sense(i, creatures, food, ctx))
        .collect()
}
