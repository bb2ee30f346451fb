//! The world aggregate: every creature and pellet, the calendar and the
//! fitness records. One owner mutates it through [`World::update`]; everyone
//! else reads [`WorldSnapshot`] copies.

mod update;

pub use update::TickReport;

use crate::brain::{DecisionPolicy, PolicyHandle, TrainerSettings};
use crate::config::{AppConfig, TrainingMode};
use crate::creature::{random_id, Creature};
use crate::error::{Result, SimError};
use crate::fitness::FitnessTracker;
use crate::sensing::SensingContext;
use crate::systems::environment::SeasonClock;
use crate::systems::lifecycle::spawn_food;
use crate::systems::reproduction::MutationWindow;
use evolarium_data::{CreatureColor, Food, Season, Vec2, WorldSnapshot};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub struct World<P: DecisionPolicy> {
    pub creatures: Vec<Creature<P>>,
    pub food: Vec<Food>,
    pub clock: SeasonClock,
    pub generation: u32,
    pub tick: u64,
    pub fitness: FitnessTracker,
    pub color_mutation: MutationWindow,
    pub config: AppConfig,
    pub last_report: TickReport,
    seed: u64,
    rng: ChaCha8Rng,
}

impl<P: DecisionPolicy> World<P> {
    /// Builds a world and seeds it with the configured population and food.
    pub fn new(config: AppConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| SimError::config(e.to_string()))?;
        let seed = config.world.seed.unwrap_or_else(rand::random);
        let mut world = Self {
            creatures: Vec::with_capacity(config.world.initial_population),
            food: Vec::with_capacity(config.world.initial_food),
            clock: SeasonClock::default(),
            generation: 1,
            tick: 0,
            fitness: FitnessTracker::default(),
            color_mutation: MutationWindow::default(),
            last_report: TickReport::default(),
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
        };
        world.seed_food();
        for _ in 0..world.config.world.initial_population {
            let policy = P::new_random_with_rng(&world.config.policy, &mut world.rng);
            world.spawn_founder(policy);
        }
        tracing::info!(
            seed,
            population = world.creatures.len(),
            food = world.food.len(),
            config = %world.config.fingerprint(),
            "World created"
        );
        Ok(world)
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn season(&self) -> Season {
        self.clock.season
    }

    #[must_use]
    pub fn population(&self) -> usize {
        self.creatures.len()
    }

    #[must_use]
    pub fn food_count(&self) -> usize {
        self.food.len()
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub(crate) fn sensing_context(&self) -> SensingContext<'_> {
        SensingContext {
            width: self.config.world.width,
            height: self.config.world.height,
            creature: &self.config.creature,
        }
    }

    /// Training settings for new handles. Deterministic runs never train on
    /// a background thread, since publication timing would leak into results.
    #[must_use]
    pub fn trainer_settings(&self) -> TrainerSettings {
        let mut settings = TrainerSettings::from(&self.config.policy);
        if self.config.world.deterministic && settings.mode == TrainingMode::Background {
            settings.mode = TrainingMode::Inline;
        }
        settings
    }

    fn random_position(&mut self) -> Vec2 {
        Vec2::new(
            self.rng.gen::<f64>() * self.config.world.width,
            self.rng.gen::<f64>() * self.config.world.height,
        )
    }

    /// Adds a generation-zero creature with a founder color at a random spot.
    pub fn spawn_founder(&mut self, policy: P) -> uuid::Uuid {
        let pos = self.random_position();
        let color =
            CreatureColor::FOUNDERS[self.rng.gen_range(0..CreatureColor::FOUNDERS.len())];
        let handle = PolicyHandle::new(policy, self.trainer_settings());
        let creature = Creature::new(
            pos,
            self.config.creature.initial_size,
            color,
            &self.config.creature,
            handle,
        )
        .with_id(random_id(&mut self.rng));
        let id = creature.id;
        self.creatures.push(creature);
        id
    }

    /// Adds a fully specified creature; returns its id.
    pub fn insert_creature(&mut self, mut creature: Creature<P>) -> uuid::Uuid {
        creature.set_size(creature.size);
        let id = creature.id;
        self.creatures.push(creature);
        id
    }

    pub fn insert_food(&mut self, food: Food) -> uuid::Uuid {
        let id = food.id;
        self.food.push(food);
        id
    }

    pub(crate) fn spawn_random_food(&mut self) {
        if self.food.len() >= self.config.food.max_food {
            return;
        }
        let mut food = spawn_food(
            &self.config.food,
            self.config.world.width,
            self.config.world.height,
            &mut self.rng,
        );
        food.id = random_id(&mut self.rng);
        self.food.push(food);
    }

    fn seed_food(&mut self) {
        for _ in 0..self.config.world.initial_food {
            self.spawn_random_food();
        }
    }

    #[must_use]
    pub fn find_creature(&self, id: uuid::Uuid) -> Option<&Creature<P>> {
        self.creatures.iter().find(|c| c.id == id)
    }

    /// Redacted point-in-time copy for observers.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            width: self.config.world.width,
            height: self.config.world.height,
            creatures: self.creatures.iter().map(Creature::to_view).collect(),
            food: self
                .food
                .iter()
                .map(|f| evolarium_data::FoodView {
                    id: f.id,
                    pos: f.pos,
                    kind: f.kind,
                })
                .collect(),
            season: self.clock.season,
            generation: self.generation,
            total_days: self.clock.total_days,
            best_score: self.fitness.epoch_best_score(),
            historical_best_score: self.fitness.historical_best_score(),
        }
    }

    /// Hash of the observable state, for reproducibility checks.
    #[must_use]
    pub fn deterministic_hash(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.tick.to_le_bytes());
        hasher.update(self.generation.to_le_bytes());
        for c in &self.creatures {
            hasher.update(c.id.as_bytes());
            hasher.update(c.pos.x.to_bits().to_le_bytes());
            hasher.update(c.pos.y.to_bits().to_le_bytes());
            hasher.update(c.size.to_bits().to_le_bytes());
            hasher.update(c.energy.to_bits().to_le_bytes());
            hasher.update(c.color.to_string().as_bytes());
        }
        for f in &self.food {
            hasher.update(f.id.as_bytes());
            hasher.update(f.pos.x.to_bits().to_le_bytes());
            hasher.update(f.pos.y.to_bits().to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }
}
