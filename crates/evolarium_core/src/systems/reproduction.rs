//! Mitosis with color genetics.
//!
//! A mature creature splits into a litter. Children inherit the parent's
//! color unless a mutation fires; the chance grows with the parent color's
//! share of the population, so dominant colors fragment. Mutant children
//! draw from a shared window so that a new color founds a small cluster
//! rather than appearing once.

use crate::brain::DecisionPolicy;
use crate::config::{AppConfig, OffspringRule};
use crate::creature::{random_id, Creature};
use evolarium_data::{clamp, CreatureColor, Season, Vec2};
use rand::Rng;
use std::collections::HashMap;

/// Population count per color, taken once per tick before reproduction.
#[derive(Debug, Clone, Default)]
pub struct ColorCensus {
    counts: HashMap<CreatureColor, usize>,
    total: usize,
}

impl ColorCensus {
    pub fn from_creatures<P: DecisionPolicy>(creatures: &[Creature<P>]) -> Self {
        let mut census = Self::default();
        for c in creatures.iter().filter(|c| c.is_alive()) {
            *census.counts.entry(c.color).or_insert(0) += 1;
            census.total += 1;
        }
        census
    }

    #[must_use]
    pub fn count(&self, color: CreatureColor) -> usize {
        self.counts.get(&color).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn share(&self, color: CreatureColor) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(color) as f64 / self.total as f64
        }
    }

    #[must_use]
    pub fn distinct_colors(&self) -> usize {
        self.counts.len()
    }
}

/// Probability that a child of a color holding `share` of the population mutates.
#[must_use]
pub fn mutation_probability(share: f64, k: f64, cap: f64) -> f64 {
    (k * share).clamp(0.0, cap)
}

/// Mutant color currently handed to mutating children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationWindow {
    current: Option<CreatureColor>,
    handed_out: u32,
}

impl MutationWindow {
    pub fn next_color<R: Rng>(&mut self, window: u32, rng: &mut R) -> CreatureColor {
        let color = match self.current {
            Some(color) if self.handed_out < window => color,
            _ => {
                let fresh = CreatureColor::Rgb(rng.gen(), rng.gen(), rng.gen());
                self.current = Some(fresh);
                self.handed_out = 0;
                fresh
            }
        };
        self.handed_out += 1;
        color
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub fn offspring_count<R: Rng>(rule: OffspringRule, season: Season, rng: &mut R) -> u32 {
    match rule {
        OffspringRule::Fixed(n) => n,
        OffspringRule::Seasonal => match season {
            Season::Spring => 5,
            Season::Summer => 4,
            Season::Autumn => {
                if rng.gen_bool(0.5) {
                    4
                } else {
                    3
                }
            }
            Season::Winter => 3,
        },
    }
}

/// Splits every mature live creature, pushing children into `births`.
/// Returns the number of parents that split.
pub fn reproduce<P: DecisionPolicy, R: Rng>(
    creatures: &mut [Creature<P>],
    births: &mut Vec<Creature<P>>,
    census: &ColorCensus,
    window: &mut MutationWindow,
    season: Season,
    config: &AppConfig,
    rng: &mut R,
) -> usize {
    let repro = &config.reproduction;
    let mut parents = 0;
    for parent in creatures.iter_mut() {
        if !parent.is_alive() || parent.size < repro.maturity_size {
            continue;
        }
        let litter = offspring_count(repro.offspring, season, rng).max(1);
        let pre_split = parent.size;
        let child_size = pre_split * repro.child_size_fraction / f64::from(litter);
        let p_mutate = mutation_probability(
            census.share(parent.color),
            repro.color_mutation_k,
            repro.color_mutation_cap,
        );

        for _ in 0..litter {
            let color = if rng.gen_bool(p_mutate) {
                window.next_color(repro.mutation_window, rng)
            } else {
                parent.color
            };
            let angle = rng.gen::<f64>() * std::f64::consts::TAU;
            let offset = Vec2::from_angle(angle) * pre_split;
            let pos = Vec2::new(
                clamp(parent.pos.x + offset.x, 0.0, config.world.width),
                clamp(parent.pos.y + offset.y, 0.0, config.world.height),
            );
            let rate = rng.gen_range(repro.mutation_rate_min..repro.mutation_rate_max);
            let policy = parent.policy.offspring(rate, rng);
            let mut child = Creature::new(pos, child_size, color, &config.creature, policy)
                .with_id(random_id(rng));
            child.generation = parent.generation + 1;
            child.parent_id = Some(parent.id);
            births.push(child);
        }

        parent.set_size(pre_split / repro.parent_shrink_divisor);
        parent.reproductions += 1;
        parents += 1;
        tracing::debug!(
            parent = %parent.id,
            litter,
            child_size,
            season = %season,
            "Creature split"
        );
    }
    parents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::{PolicyHandle, RandomPolicy, TrainerSettings};
    use crate::config::PolicyConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn creature(size: f64, color: CreatureColor, config: &AppConfig) -> Creature<RandomPolicy> {
        Creature::new(
            Vec2::new(900.0, 400.0),
            size,
            color,
            &config.creature,
            PolicyHandle::new(RandomPolicy, TrainerSettings::from(&PolicyConfig::default())),
        )
    }

    #[test]
    fn test_spring_split_scenario() {
        let config = AppConfig::default();
        let mut creatures = vec![creature(37.5, CreatureColor::Red, &config)];
        let census = ColorCensus::from_creatures(&creatures);
        let mut births = Vec::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let parents = reproduce(
            &mut creatures,
            &mut births,
            &census,
            &mut MutationWindow::default(),
            Season::Spring,
            &config,
            &mut rng,
        );
        assert_eq!(parents, 1);
        assert_eq!(births.len(), 5);
        for child in &births {
            assert!((child.size - 6.75).abs() < 1e-12);
            assert_eq!(child.generation, 1);
            assert_eq!(child.parent_id, Some(creatures[0].id));
            assert!((child.pos.dist(&creatures[0].pos) - 37.5).abs() < 1e-9);
        }
        assert!((creatures[0].size - 12.5).abs() < 1e-12);
        assert_eq!(creatures[0].reproductions, 1);
    }

    #[test]
    fn test_immature_does_not_split() {
        let config = AppConfig::default();
        let mut creatures = vec![creature(37.4, CreatureColor::Red, &config)];
        let census = ColorCensus::from_creatures(&creatures);
        let mut births = Vec::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        reproduce(
            &mut creatures,
            &mut births,
            &census,
            &mut MutationWindow::default(),
            Season::Winter,
            &config,
            &mut rng,
        );
        assert!(births.is_empty());
    }

    #[test]
    fn test_seasonal_litter_sizes() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(offspring_count(OffspringRule::Seasonal, Season::Spring, &mut rng), 5);
        assert_eq!(offspring_count(OffspringRule::Seasonal, Season::Summer, &mut rng), 4);
        assert_eq!(offspring_count(OffspringRule::Seasonal, Season::Winter, &mut rng), 3);
        assert_eq!(offspring_count(OffspringRule::Fixed(3), Season::Spring, &mut rng), 3);
        let autumn: Vec<u32> = (0..200)
            .map(|_| offspring_count(OffspringRule::Seasonal, Season::Autumn, &mut rng))
            .collect();
        assert!(autumn.contains(&3) && autumn.contains(&4));
        assert!(autumn.iter().all(|n| *n == 3 || *n == 4));
    }

    #[test]
    fn test_mutation_window_shares_color_then_rotates() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut window = MutationWindow::default();
        let first = window.next_color(3, &mut rng);
        assert_eq!(window.next_color(3, &mut rng), first);
        assert_eq!(window.next_color(3, &mut rng), first);
        let fourth = window.next_color(3, &mut rng);
        assert!(!fourth.is_founder());
        // Three draws share a color; the fourth opens a new window.
        assert_eq!(window.handed_out, 1);
    }

    #[test]
    fn test_monoculture_mutates_at_cap() {
        let config = AppConfig::default();
        let mut creatures = vec![creature(37.5, CreatureColor::Green, &config)];
        let census = ColorCensus::from_creatures(&creatures);
        assert_eq!(census.share(CreatureColor::Green), 1.0);
        assert_eq!(mutation_probability(1.0, 2.0, 0.9), 0.9);
        let mut births = Vec::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut window = MutationWindow::default();
        for _ in 0..20 {
            creatures[0].set_size(37.5);
            reproduce(
                &mut creatures,
                &mut births,
                &census,
                &mut window,
                Season::Spring,
                &config,
                &mut rng,
            );
        }
        let mutated = births.iter().filter(|c| c.color != CreatureColor::Green).count();
        assert!(mutated > births.len() / 2, "{mutated} of {}", births.len());
    }

    #[test]
    fn test_children_placed_inside_arena() {
        let config = AppConfig::default();
        let mut creatures = vec![creature(60.0, CreatureColor::Red, &config)];
        creatures[0].pos = Vec2::new(1.0, 1.0);
        let census = ColorCensus::from_creatures(&creatures);
        let mut births = Vec::new();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        reproduce(
            &mut creatures,
            &mut births,
            &census,
            &mut MutationWindow::default(),
            Season::Summer,
            &config,
            &mut rng,
        );
        for child in &births {
            assert!((0.0..=1900.0).contains(&child.pos.x));
            assert!((0.0..=800.0).contains(&child.pos.y));
        }
    }
}
