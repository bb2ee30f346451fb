use super::{
    Action, DecisionPolicy, Experience, Heading, PolicyError, PolicyParameters, SensedInputs,
    ACTION_COUNT,
};
use crate::config::PolicyConfig;
use rand::Rng;

const KIND: &str = "random";

/// Picks a uniformly random thrust every tick and never learns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomPolicy;

impl DecisionPolicy for RandomPolicy {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn new_random_with_rng<R: Rng>(_config: &PolicyConfig, _rng: &mut R) -> Self {
        RandomPolicy
    }

    fn select_action<R: Rng>(&self, _inputs: &SensedInputs, rng: &mut R) -> Action {
        let i = rng.gen_range(0..ACTION_COUNT);
        Action::Thrust(Heading::from_index(i).unwrap_or(Heading::East))
    }

    fn train_batch(&mut self, _batch: &[Experience]) {}

    fn clone_with_mutation<R: Rng>(&self, _rate: f32, _rng: &mut R) -> Self {
        RandomPolicy
    }

    fn crossover_with_rng<R: Rng>(&self, _other: &Self, _rng: &mut R) -> Self {
        RandomPolicy
    }

    fn export_parameters(&self) -> PolicyParameters {
        PolicyParameters {
            kind: KIND.to_string(),
            shape: Vec::new(),
            values: Vec::new(),
        }
    }

    fn import_parameters(&mut self, params: &PolicyParameters) -> Result<(), PolicyError> {
        if params.kind == KIND {
            Ok(())
        } else {
            Err(PolicyError::Parameters(format!(
                "expected {KIND}, got {}",
                params.kind
            )))
        }
    }
}
