use super::math::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodKind {
    Normal,
    Growth,
}

/// A drifting food pellet.
///
/// `lifetime` counts down by one per tick; the pellet is gone once it reaches
/// zero or is eaten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Food {
    pub id: Uuid,
    pub pos: Vec2,
    pub vel: Vec2,
    pub kind: FoodKind,
    pub lifetime: i64,
}

impl Food {
    #[must_use]
    pub fn new(pos: Vec2, kind: FoodKind, lifetime: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            pos,
            vel: Vec2::ZERO,
            kind,
            lifetime,
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.lifetime <= 0
    }
}
