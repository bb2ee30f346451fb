pub mod handle;
pub mod qnet;
pub mod random;

pub use crate::error::PolicyError;
pub use handle::{FeedbackOutcome, PolicyHandle, TrainerSettings};
pub use qnet::QBrain;
pub use random::RandomPolicy;

use crate::config::PolicyConfig;
use evolarium_data::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of features in a sensed-state vector.
pub const SENSED_INPUTS: usize = 14;
/// Number of discrete thrust directions a policy scores.
pub const ACTION_COUNT: usize = 4;

pub type SensedInputs = [f32; SENSED_INPUTS];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heading {
    East,
    West,
    South,
    North,
}

impl Heading {
    pub const ALL: [Heading; ACTION_COUNT] =
        [Heading::East, Heading::West, Heading::South, Heading::North];

    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Heading::East => 0,
            Heading::West => 1,
            Heading::South => 2,
            Heading::North => 3,
        }
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Heading> {
        Self::ALL.get(index).copied()
    }

    /// Unit vector in arena coordinates (y grows downward).
    #[must_use]
    pub fn unit(&self) -> Vec2 {
        match self {
            Heading::East => Vec2::new(1.0, 0.0),
            Heading::West => Vec2::new(-1.0, 0.0),
            Heading::South => Vec2::new(0.0, 1.0),
            Heading::North => Vec2::new(0.0, -1.0),
        }
    }
}

/// A movement decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Thrust(Heading),
    /// Free force vector, each component limited to `[-1, 1]`.
    Steer(Vec2),
    Rest,
}

impl Action {
    #[must_use]
    pub fn force(&self) -> Vec2 {
        match self {
            Action::Thrust(heading) => heading.unit(),
            Action::Steer(v) if v.is_finite() => v.clamp_each(1.0),
            Action::Steer(_) | Action::Rest => Vec2::ZERO,
        }
    }

    /// Output slot scored by a discrete policy, if any.
    #[must_use]
    pub fn slot(&self) -> Option<usize> {
        match self {
            Action::Thrust(heading) => Some(heading.index()),
            Action::Steer(_) | Action::Rest => None,
        }
    }
}

/// One transition fed back to a policy after a feeding or predation event.
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub state: SensedInputs,
    pub action: Action,
    pub reward: f32,
    pub next_state: SensedInputs,
    pub terminal: bool,
}

impl Experience {
    pub fn validate(&self) -> Result<(), PolicyError> {
        validate_inputs(&self.state)?;
        validate_inputs(&self.next_state)?;
        if !self.reward.is_finite() {
            return Err(PolicyError::MalformedInput(format!(
                "non-finite reward {}",
                self.reward
            )));
        }
        Ok(())
    }
}

pub fn validate_inputs(inputs: &SensedInputs) -> Result<(), PolicyError> {
    match inputs.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(PolicyError::MalformedInput(format!(
            "feature {i} is {}",
            inputs[i]
        ))),
        None => Ok(()),
    }
}

/// Opaque, serializable dump of a policy's learnable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyParameters {
    pub kind: String,
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

/// Trait defining the contract between the simulation and a decision policy.
///
/// The core only ever selects actions, hands over experience batches, and
/// clones/mutates/exports policies; it never looks inside one.
pub trait DecisionPolicy: Clone + Send + Sync + 'static {
    fn kind(&self) -> &'static str;

    fn new_random_with_rng<R: Rng>(config: &PolicyConfig, rng: &mut R) -> Self;

    fn select_action<R: Rng>(&self, inputs: &SensedInputs, rng: &mut R) -> Action;

    /// One learning round over `batch`. May be slow; never called on the tick lane
    /// unless training runs inline.
    fn train_batch(&mut self, batch: &[Experience]);

    #[must_use]
    fn clone_with_mutation<R: Rng>(&self, rate: f32, rng: &mut R) -> Self;

    #[must_use]
    fn crossover_with_rng<R: Rng>(&self, other: &Self, rng: &mut R) -> Self;

    fn export_parameters(&self) -> PolicyParameters;

    fn import_parameters(&mut self, params: &PolicyParameters) -> Result<(), PolicyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_index_roundtrip() {
        for h in Heading::ALL {
            assert_eq!(Heading::from_index(h.index()), Some(h));
        }
        assert_eq!(Heading::from_index(ACTION_COUNT), None);
    }

    #[test]
    fn test_action_force_mapping() {
        assert_eq!(Action::Thrust(Heading::North).force(), Vec2::new(0.0, -1.0));
        assert_eq!(Action::Rest.force(), Vec2::ZERO);
        assert_eq!(
            Action::Steer(Vec2::new(3.0, -0.5)).force(),
            Vec2::new(1.0, -0.5)
        );
        assert_eq!(Action::Steer(Vec2::new(f64::NAN, 0.0)).force(), Vec2::ZERO);
    }

    #[test]
    fn test_validate_inputs_rejects_nan() {
        let mut inputs = [0.0; SENSED_INPUTS];
        assert!(validate_inputs(&inputs).is_ok());
        inputs[3] = f32::NAN;
        assert!(matches!(
            validate_inputs(&inputs),
            Err(PolicyError::MalformedInput(_))
        ));
    }
}
