//! Physics integration, dwell timers, metabolism and aging.

use crate::brain::{Action, DecisionPolicy};
use crate::config::{AppConfig, BorderPolicy, FoodConfig};
use crate::creature::{Creature, DeathCause};
use evolarium_data::{clamp, Food, FoodKind, Vec2};
use rand::Rng;

/// Random pellet somewhere in the arena.
pub fn spawn_food<R: Rng>(config: &FoodConfig, width: f64, height: f64, rng: &mut R) -> Food {
    let kind = if rng.gen_bool(config.growth_chance) {
        FoodKind::Growth
    } else {
        FoodKind::Normal
    };
    let pos = Vec2::new(rng.gen::<f64>() * width, rng.gen::<f64>() * height);
    let mut food = Food::new(pos, kind, config.lifetime);
    food.vel = Vec2::new(
        (rng.gen::<f64>() - 0.5) * config.initial_speed,
        (rng.gen::<f64>() - 0.5) * config.initial_speed,
    );
    food
}

/// Drift, bounce and age a pellet by one tick.
pub fn step_food<R: Rng>(
    food: &mut Food,
    config: &FoodConfig,
    width: f64,
    height: f64,
    rng: &mut R,
) {
    food.pos += food.vel;
    food.vel.x += (rng.gen::<f64>() - 0.5) * config.drift;
    food.vel.y += (rng.gen::<f64>() - 0.5) * config.drift;
    food.vel = food.vel.clamp_each(config.max_speed);
    if food.pos.x < 0.0 || food.pos.x > width {
        food.vel.x = -food.vel.x;
    }
    if food.pos.y < 0.0 || food.pos.y > height {
        food.vel.y = -food.vel.y;
    }
    food.lifetime -= 1;
}

/// Adds the action's smoothed force to the accumulator.
pub fn apply_action<P: DecisionPolicy>(
    creature: &mut Creature<P>,
    action: &Action,
    config: &AppConfig,
) {
    creature.acc += action.force() * config.creature.force_smoothing;
}

/// Keeps `pos` inside `[0, limit]`, reporting whether it had to.
fn confine(pos: &mut f64, vel: &mut f64, limit: f64, policy: BorderPolicy) -> bool {
    if (0.0..=limit).contains(pos) {
        return false;
    }
    *pos = clamp(*pos, 0.0, limit);
    match policy {
        BorderPolicy::Reflect => *vel = -*vel,
        BorderPolicy::Clamp | BorderPolicy::Lethal => *vel = 0.0,
    }
    true
}

fn in_corner(pos: Vec2, margin: f64, width: f64, height: f64) -> bool {
    let near_x = pos.x <= margin || pos.x >= width - margin;
    let near_y = pos.y <= margin || pos.y >= height - margin;
    near_x && near_y
}

/// Advances one creature by a tick. Returns the cause if it died.
///
/// Order: velocity and position integration, border handling, dwell timers,
/// energy drain, aging and hunger, then the death check. A creature already
/// marked dead is left untouched.
pub fn step_creature<P: DecisionPolicy>(
    creature: &mut Creature<P>,
    config: &AppConfig,
) -> Option<DeathCause> {
    if !creature.is_alive() {
        return creature.death;
    }
    let width = config.world.width;
    let height = config.world.height;
    let border = &config.border;

    let previous = creature.pos;
    let max_speed = creature.speed_multiplier * config.creature.frame_rate_multiplier;
    creature.vel = (creature.vel + creature.acc).clamp_each(max_speed);
    creature.pos += creature.vel;
    creature.acc = Vec2::ZERO;

    if border.policy == BorderPolicy::Lethal
        && !((0.0..=width).contains(&creature.pos.x) && (0.0..=height).contains(&creature.pos.y))
    {
        creature.mark_dead(DeathCause::Border);
        return creature.death;
    }
    let hit_x = confine(&mut creature.pos.x, &mut creature.vel.x, width, border.policy);
    let hit_y = confine(&mut creature.pos.y, &mut creature.vel.y, height, border.policy);
    let touching = hit_x
        || hit_y
        || creature.pos.x <= 0.0
        || creature.pos.x >= width
        || creature.pos.y <= 0.0
        || creature.pos.y >= height;

    creature.corner_timer = if in_corner(creature.pos, border.corner_margin, width, height) {
        creature.corner_timer + 1
    } else {
        0
    };
    let moved = creature.pos - previous;
    creature.immobile_timer =
        if moved.x.abs() < border.immobile_epsilon && moved.y.abs() < border.immobile_epsilon {
            creature.immobile_timer + 1
        } else {
            0
        };
    creature.border_timer = if touching {
        creature.border_timer + 1
    } else {
        0
    };

    if creature.corner_timer >= border.corner_timeout {
        creature.mark_dead(DeathCause::Corner);
    } else if creature.immobile_timer >= border.immobile_timeout {
        creature.mark_dead(DeathCause::Immobile);
    } else if creature.border_timer >= border.border_timeout {
        creature.mark_dead(DeathCause::Border);
    }

    creature.energy -= creature.vel.length() * config.creature.energy_drain_per_speed;

    creature.age_counter += 1;
    creature.time_since_last_meal += 1;
    if creature.time_since_last_meal > config.creature.hunger_threshold {
        creature.set_size(creature.size - config.creature.hunger_size_loss);
        creature.time_since_last_meal = 0;
    }

    if creature.energy <= 0.0 {
        creature.mark_dead(DeathCause::Starvation);
    } else if creature.size <= creature.min_size {
        creature.mark_dead(DeathCause::Wasting);
    }
    creature.death
}
