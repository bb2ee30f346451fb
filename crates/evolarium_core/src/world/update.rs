use super::World;
use crate::brain::{DecisionPolicy, PolicyHandle, PolicyParameters};
use crate::creature::{random_id, Creature};
use crate::error::{Result, SimError};
use crate::history::{now, LiveEvent};
use crate::sensing::{sense_all, SensingContext};
use crate::systems::feeding::{
    deliver_feedback, resolve_feeding, resolve_predation, FeedbackStats, FeedingReport,
};
use crate::systems::lifecycle::{apply_action, step_creature, step_food};
use crate::systems::reproduction::{reproduce, ColorCensus};
use evolarium_data::{CreatureColor, Vec2};
use rand::Rng;

/// Counts describing what the last tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub births: usize,
    pub deaths: usize,
    pub foods_eaten: usize,
    pub kills: usize,
    pub decision_errors: usize,
    pub feedback: FeedbackStats,
    pub epoch_reset: bool,
}

impl<P: DecisionPolicy> World<P> {
    /// Advances the simulation by one tick.
    ///
    /// Calendar and food first, then perception and decisions, movement,
    /// feeding and predation, reproduction, fitness, and finally removal of
    /// the dead. If that removal empties a populated world, a new epoch is
    /// seeded before returning.
    ///
    /// # Returns
    /// Births, deaths and calendar events that happened this tick.
    pub fn update(&mut self) -> Result<Vec<LiveEvent>> {
        self.tick += 1;
        let mut events = Vec::new();
        let mut report = TickReport::default();
        let population_before = self.creatures.len();

        self.pass_environment(&mut events);
        self.pass_decisions(&mut report);
        for creature in &mut self.creatures {
            step_creature(creature, &self.config);
        }
        self.pass_feeding(&mut report);

        let census = ColorCensus::from_creatures(&self.creatures);
        let mut births = Vec::new();
        reproduce(
            &mut self.creatures,
            &mut births,
            &census,
            &mut self.color_mutation,
            self.clock.season,
            &self.config,
            &mut self.rng,
        );
        if self
            .fitness
            .observe(&self.creatures, &self.config, self.generation)
        {
            tracing::debug!(
                tick = self.tick,
                score = self.fitness.historical_best_score(),
                "New historical best"
            );
        }

        self.pass_compaction(births, &mut events, &mut report);

        if population_before > 0 && self.creatures.is_empty() {
            events.push(LiveEvent::Extinction {
                generation: self.generation,
                tick: self.tick,
                timestamp: now(),
            });
            events.push(self.reset_epoch());
            report.epoch_reset = true;
        }

        self.last_report = report;
        self.check_invariants()?;
        Ok(events)
    }

    fn pass_environment(&mut self, events: &mut Vec<LiveEvent>) {
        let clock = self.clock.advance(&self.config.season);
        if clock.spawn_food {
            self.spawn_random_food();
        }
        if let Some((from, to)) = clock.season_changed {
            tracing::debug!(tick = self.tick, %from, %to, "Season changed");
            events.push(LiveEvent::SeasonChanged {
                from: from.to_string(),
                to: to.to_string(),
                tick: self.tick,
                timestamp: now(),
            });
        }

        let (width, height) = (self.config.world.width, self.config.world.height);
        for food in &mut self.food {
            step_food(food, &self.config.food, width, height, &mut self.rng);
        }
        self.food.retain(|f| !f.is_expired());
    }

    fn pass_decisions(&mut self, report: &mut TickReport) {
        let inputs: Vec<_> = {
            let ctx = SensingContext {
                width: self.config.world.width,
                height: self.config.world.height,
                creature: &self.config.creature,
            };
            sense_all(&self.creatures, &self.food, &ctx)
                .iter()
                .map(|s| s.to_inputs(&ctx))
                .collect()
        };

        for (creature, input) in self.creatures.iter_mut().zip(inputs) {
            match creature.policy.act(&input, &mut self.rng) {
                Ok(action) => {
                    apply_action(creature, &action, &self.config);
                    creature.last_inputs = Some(input);
                    creature.last_action = Some(action);
                }
                Err(e) => {
                    report.decision_errors += 1;
                    tracing::debug!(creature = %creature.id, error = %e, "Decision skipped");
                    creature.last_inputs = None;
                    creature.last_action = None;
                }
            }
        }
    }

    fn pass_feeding(&mut self, report: &mut TickReport) {
        let mut feeding = FeedingReport::default();
        let mut eaten = vec![false; self.food.len()];
        resolve_feeding(
            &mut self.creatures,
            &self.food,
            &mut eaten,
            &self.config.food,
            &mut feeding,
        );
        resolve_predation(&mut self.creatures, &self.config.food, &mut feeding);

        let mut mask = eaten.into_iter();
        self.food.retain(|_| !mask.next().unwrap_or(false));

        let ctx = SensingContext {
            width: self.config.world.width,
            height: self.config.world.height,
            creature: &self.config.creature,
        };
        report.feedback =
            deliver_feedback(&mut self.creatures, &feeding.pending, &self.food, &ctx);
        report.foods_eaten = feeding.foods_eaten;
        report.kills = feeding.kills;
    }

    fn pass_compaction(
        &mut self,
        mut births: Vec<Creature<P>>,
        events: &mut Vec<LiveEvent>,
        report: &mut TickReport,
    ) {
        for dead in self.creatures.iter().filter(|c| !c.is_alive()) {
            events.push(LiveEvent::Death {
                id: dead.id,
                age: dead.age_counter,
                offspring: dead.reproductions,
                tick: self.tick,
                timestamp: now(),
                cause: dead.death.map(|d| d.to_string()).unwrap_or_default(),
            });
            report.deaths += 1;
        }
        self.creatures.retain(Creature::is_alive);

        for child in &births {
            events.push(LiveEvent::Birth {
                id: child.id,
                parent_id: child.parent_id,
                gen: child.generation,
                tick: self.tick,
                timestamp: now(),
            });
        }
        report.births = births.len();
        self.creatures.append(&mut births);
    }

    /// Starts a new epoch after extinction.
    ///
    /// The calendar, food and color window start over. Founders carry mutated
    /// copies of the historical best policy when one exists and imports
    /// cleanly; otherwise they start from scratch. When the epoch that just
    /// ended had a different champion, founders are a crossover of the two.
    pub fn reset_epoch(&mut self) -> LiveEvent {
        let last_epoch = self.fitness.epoch_best().cloned();
        self.generation += 1;
        self.fitness.reset_epoch();
        self.clock.reset();
        self.color_mutation.reset();
        self.creatures.clear();
        self.food.clear();
        self.seed_food();

        let historical = self.fitness.historical_best().cloned();
        let best = historical
            .as_ref()
            .and_then(|record| self.restore_policy(&record.parameters));
        // A distinct champion from the epoch that just ended is crossed in.
        let partner = match (&historical, &last_epoch) {
            (Some(h), Some(e)) if h.creature_id != e.creature_id => {
                self.restore_policy(&e.parameters)
            }
            _ => None,
        };
        let settings = self.trainer_settings();
        let repro = self.config.reproduction.clone();
        let seeded_from_best = best.is_some();

        for _ in 0..self.config.world.initial_population {
            let policy = match &best {
                Some(best) => {
                    let rate = self
                        .rng
                        .gen_range(repro.mutation_rate_min..repro.mutation_rate_max);
                    let base = match &partner {
                        Some(partner) => best.crossover_with_rng(partner, &mut self.rng),
                        None => best.clone(),
                    };
                    base.clone_with_mutation(rate, &mut self.rng)
                }
                None => P::new_random_with_rng(&self.config.policy, &mut self.rng),
            };
            let handle = PolicyHandle::new(policy, settings);

            let pos = Vec2::new(
                self.rng.gen::<f64>() * self.config.world.width,
                self.rng.gen::<f64>() * self.config.world.height,
            );
            let color =
                CreatureColor::FOUNDERS[self.rng.gen_range(0..CreatureColor::FOUNDERS.len())];
            let mut creature = Creature::new(
                pos,
                self.config.creature.initial_size,
                color,
                &self.config.creature,
                handle,
            )
            .with_id(random_id(&mut self.rng));
            creature.generation = self.generation;
            self.creatures.push(creature);
        }

        tracing::info!(
            generation = self.generation,
            seeded_from_best,
            population = self.creatures.len(),
            "Epoch reset"
        );
        LiveEvent::EpochReset {
            generation: self.generation,
            seeded_from_best,
            population: self.creatures.len(),
            tick: self.tick,
            timestamp: now(),
        }
    }

    /// Rebuilds a policy from an exported record, or `None` if it no longer fits.
    fn restore_policy(&mut self, params: &PolicyParameters) -> Option<P> {
        let mut policy = P::new_random_with_rng(&self.config.policy, &mut self.rng);
        match policy.import_parameters(params) {
            Ok(()) => Some(policy),
            Err(e) => {
                tracing::warn!(error = %e, "Recorded policy could not be restored");
                None
            }
        }
    }

    fn check_invariants(&self) -> Result<()> {
        for c in &self.creatures {
            if !c.pos.is_finite() || !c.vel.is_finite() || !c.energy.is_finite() {
                return Err(SimError::invalid_state(format!(
                    "creature {} has non-finite state",
                    c.id
                )));
            }
            if c.size < c.min_size {
                return Err(SimError::invalid_state(format!(
                    "creature {} is below its minimum size",
                    c.id
                )));
            }
        }
        Ok(())
    }
}
