use crate::error::NetError;
use evolarium_data::WorldSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Server-side counters reported by `/api/stats` and pushed on request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatsPayload {
    pub tick: u64,
    pub population: usize,
    pub food: usize,
    pub generation: u32,
    pub observers: usize,
    pub running: bool,
    pub best_score: f64,
    pub historical_best_score: f64,
    pub tick_failures: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ControlCommand {
    Start,
    Stop,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum NetMessage {
    Handshake { client_id: Uuid },
    Snapshot(WorldSnapshot),
    TickError { tick: u64, message: String },
    EpochReset { generation: u32 },
    Stats(StatsPayload),
    Control { command: ControlCommand },
}

impl NetMessage {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            NetMessage::Handshake { .. } => "Handshake",
            NetMessage::Snapshot(_) => "Snapshot",
            NetMessage::TickError { .. } => "TickError",
            NetMessage::EpochReset { .. } => "EpochReset",
            NetMessage::Stats(_) => "Stats",
            NetMessage::Control { .. } => "Control",
        }
    }

    /// Structural checks on decoded input.
    ///
    /// A snapshot must have finite positions, positive sizes and no
    /// creature listed twice.
    pub fn validate(&self) -> Result<(), NetError> {
        let NetMessage::Snapshot(snapshot) = self else {
            return Ok(());
        };
        let mut seen = HashSet::with_capacity(snapshot.creatures.len());
        for c in &snapshot.creatures {
            if !seen.insert(c.id) {
                return Err(NetError::validation(format!("creature {} listed twice", c.id)));
            }
            if !c.pos.is_finite() || !c.size.is_finite() || c.size <= 0.0 {
                return Err(NetError::validation(format!(
                    "creature {} has invalid geometry",
                    c.id
                )));
            }
        }
        if let Some(f) = snapshot.food.iter().find(|f| !f.pos.is_finite()) {
            return Err(NetError::validation(format!(
                "food {} has invalid position",
                f.id
            )));
        }
        Ok(())
    }
}
