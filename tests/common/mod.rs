pub mod macros;

use evolarium_lib::model::brain::{PolicyHandle, RandomPolicy, TrainerSettings};
use evolarium_lib::model::config::{AppConfig, TrainingMode};
use evolarium_lib::model::creature::Creature;
use evolarium_lib::model::data::{CreatureColor, Food, FoodKind, Vec2};
use evolarium_lib::model::world::World;
use uuid::Uuid;

type WorldMod = Box<dyn FnOnce(&mut World<RandomPolicy>)>;

/// Builds an empty, seeded world and places hand-made creatures and food.
#[allow(dead_code)]
pub struct WorldBuilder {
    config: AppConfig,
    creatures: Vec<CreatureBuilder>,
    mods: Vec<WorldMod>,
}

#[allow(dead_code)]
impl WorldBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.world.initial_population = 0;
        config.world.initial_food = 0;
        config.world.seed = Some(0);
        config.world.deterministic = true;
        Self {
            config,
            creatures: Vec::new(),
            mods: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.world.seed = Some(seed);
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    pub fn with_creature(mut self, creature: CreatureBuilder) -> Self {
        self.creatures.push(creature);
        self
    }

    pub fn with_food(mut self, x: f64, y: f64, kind: FoodKind) -> Self {
        self.mods.push(Box::new(move |world| {
            let lifetime = world.config.food.lifetime;
            world.insert_food(Food::new(Vec2::new(x, y), kind, lifetime));
        }));
        self
    }

    /// Keeps respawned food out of scenarios that count pellets.
    pub fn without_respawn(mut self) -> Self {
        self.config.food.max_food = 0;
        self
    }

    pub fn build(self) -> World<RandomPolicy> {
        let mut world =
            World::new(self.config).expect("Failed to create world in test builder");
        for modifier in self.mods {
            modifier(&mut world);
        }
        for creature in self.creatures {
            let creature = creature.build(&world.config);
            world.insert_creature(creature);
        }
        world
    }
}

#[allow(dead_code)]
pub struct CreatureBuilder {
    x: f64,
    y: f64,
    size: f64,
    energy: Option<f64>,
    color: CreatureColor,
    id: Option<Uuid>,
}

#[allow(dead_code)]
impl CreatureBuilder {
    pub fn new() -> Self {
        Self {
            x: 950.0,
            y: 400.0,
            size: 11.0,
            energy: None,
            color: CreatureColor::Red,
            id: None,
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn energy(mut self, amount: f64) -> Self {
        self.energy = Some(amount);
        self
    }

    pub fn color(mut self, color: CreatureColor) -> Self {
        self.color = color;
        self
    }

    pub fn build(self, config: &AppConfig) -> Creature<RandomPolicy> {
        let mut settings = TrainerSettings::from(&config.policy);
        settings.mode = TrainingMode::Disabled;
        let mut creature = Creature::new(
            Vec2::new(self.x, self.y),
            self.size,
            self.color,
            &config.creature,
            PolicyHandle::new(RandomPolicy, settings),
        );
        if let Some(id) = self.id {
            creature = creature.with_id(id);
        }
        if let Some(energy) = self.energy {
            creature.energy = energy;
        }
        creature
    }
}
