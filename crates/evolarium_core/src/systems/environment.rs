//! Seasons, calendar and the food respawn timer.

use crate::config::SeasonConfig;
use evolarium_data::Season;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonClock {
    pub season: Season,
    pub season_counter: u64,
    pub respawn_counter: u64,
    pub time_counter: u64,
    pub total_days: u64,
}

/// What the clock asks of the world this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockTick {
    pub season_changed: Option<(Season, Season)>,
    pub spawn_food: bool,
}

#[must_use]
pub fn respawn_interval(season: Season, config: &SeasonConfig) -> u64 {
    match season {
        Season::Spring => config.respawn_spring,
        Season::Summer => config.respawn_summer,
        Season::Autumn => config.respawn_autumn,
        Season::Winter => config.respawn_winter,
    }
}

impl SeasonClock {
    pub fn advance(&mut self, config: &SeasonConfig) -> ClockTick {
        let mut tick = ClockTick::default();
        self.time_counter += 1;
        self.total_days = self.time_counter * config.days_per_year / config.year_ticks;

        self.respawn_counter += 1;
        if self.respawn_counter >= respawn_interval(self.season, config) {
            self.respawn_counter = 0;
            tick.spawn_food = true;
        }

        self.season_counter += 1;
        if self.season_counter >= config.season_length {
            self.season_counter = 0;
            let from = self.season;
            self.season = from.next();
            tick.season_changed = Some((from, self.season));
        }
        tick
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spring_spawns_every_ten_ticks() {
        let config = SeasonConfig::default();
        let mut clock = SeasonClock::default();
        let spawns = (0..100).filter(|_| clock.advance(&config).spawn_food).count();
        assert_eq!(spawns, 10);
    }

    #[test]
    fn test_season_changes_after_season_length() {
        let config = SeasonConfig::default();
        let mut clock = SeasonClock::default();
        for _ in 0..3599 {
            assert!(clock.advance(&config).season_changed.is_none());
        }
        assert_eq!(
            clock.advance(&config).season_changed,
            Some((Season::Spring, Season::Summer))
        );
        assert_eq!(clock.season, Season::Summer);
    }

    #[test]
    fn test_calendar_days() {
        let config = SeasonConfig::default();
        let mut clock = SeasonClock::default();
        for _ in 0..14400 {
            clock.advance(&config);
        }
        assert_eq!(clock.total_days, 365);
        clock.reset();
        assert_eq!(clock, SeasonClock::default());
    }
}
