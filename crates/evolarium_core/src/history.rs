//! Structured simulation events and a bounded log of recent ones.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event")]
pub enum LiveEvent {
    Birth {
        id: Uuid,
        parent_id: Option<Uuid>,
        gen: u32,
        tick: u64,
        timestamp: String,
    },
    Death {
        id: Uuid,
        age: u64,
        offspring: u32,
        tick: u64,
        timestamp: String,
        cause: String,
    },
    SeasonChanged {
        from: String,
        to: String,
        tick: u64,
        timestamp: String,
    },
    Extinction {
        generation: u32,
        tick: u64,
        timestamp: String,
    },
    EpochReset {
        generation: u32,
        seeded_from_best: bool,
        population: usize,
        tick: u64,
        timestamp: String,
    },
}

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl LiveEvent {
    #[must_use]
    pub fn tick(&self) -> u64 {
        match self {
            LiveEvent::Birth { tick, .. }
            | LiveEvent::Death { tick, .. }
            | LiveEvent::SeasonChanged { tick, .. }
            | LiveEvent::Extinction { tick, .. }
            | LiveEvent::EpochReset { tick, .. } => *tick,
        }
    }

    /// One-line human readable summary.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            LiveEvent::Birth { id, gen, .. } => format!("born {} (gen {gen})", short(id)),
            LiveEvent::Death {
                id, age, cause, ..
            } => format!("{} died at age {age}: {cause}", short(id)),
            LiveEvent::SeasonChanged { from, to, .. } => format!("season {from} -> {to}"),
            LiveEvent::Extinction { generation, .. } => {
                format!("generation {generation} went extinct")
            }
            LiveEvent::EpochReset {
                generation,
                seeded_from_best,
                population,
                ..
            } => format!(
                "generation {generation} seeded with {population} creatures{}",
                if *seeded_from_best {
                    " from the best policy"
                } else {
                    ""
                }
            ),
        }
    }
}

fn short(id: &Uuid) -> String {
    id.simple().to_string().chars().take(8).collect()
}

/// Ring buffer of the most recent events.
#[derive(Debug, Clone)]
pub struct EventLog {
    capacity: usize,
    events: VecDeque<LiveEvent>,
}

impl EventLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, event: LiveEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = LiveEvent>) {
        for e in events {
            self.push(e);
        }
    }

    /// Up to `n` newest events, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<LiveEvent> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn season(tick: u64) -> LiveEvent {
        LiveEvent::SeasonChanged {
            from: "spring".into(),
            to: "summer".into(),
            tick,
            timestamp: now(),
        }
    }

    #[test]
    fn test_event_tagged_serialization() {
        let json = serde_json::to_value(season(4)).unwrap();
        assert_eq!(json["event"], "SeasonChanged");
        assert_eq!(json["tick"], 4);
    }

    #[test]
    fn test_log_keeps_newest() {
        let mut log = EventLog::new(3);
        log.extend((0..5).map(season));
        assert_eq!(log.len(), 3);
        let ticks: Vec<u64> = log.recent(2).iter().map(LiveEvent::tick).collect();
        assert_eq!(ticks, vec![3, 4]);
    }
}
