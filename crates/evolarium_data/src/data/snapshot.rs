//! Redacted, observer-facing view of the world.
//!
//! Views carry only what a renderer needs; decision-policy parameters never
//! appear here.

use super::color::CreatureColor;
use super::environment::Season;
use super::food::FoodKind;
use super::math::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatureView {
    pub id: Uuid,
    pub pos: Vec2,
    pub size: f64,
    pub color: CreatureColor,
    pub energy: f64,
    pub food_eaten: u32,
    pub prey_eaten: u32,
    pub age_counter: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodView {
    pub id: Uuid,
    pub pos: Vec2,
    pub kind: FoodKind,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub tick: u64,
    pub width: f64,
    pub height: f64,
    pub creatures: Vec<CreatureView>,
    pub food: Vec<FoodView>,
    pub season: Season,
    pub generation: u32,
    pub total_days: u64,
    pub best_score: f64,
    pub historical_best_score: f64,
}

impl WorldSnapshot {
    #[must_use]
    pub fn population(&self) -> usize {
        self.creatures.len()
    }
}
