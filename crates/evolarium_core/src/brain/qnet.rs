//! Small feed-forward Q network with epsilon-greedy action selection.

use super::{
    Action, DecisionPolicy, Experience, Heading, PolicyError, PolicyParameters, SensedInputs,
    ACTION_COUNT, SENSED_INPUTS,
};
use crate::config::PolicyConfig;
use rand::Rng;

const KIND: &str = "q_network";

#[derive(Debug, Clone, PartialEq)]
struct DenseLayer {
    inputs: usize,
    outputs: usize,
    /// Row-major, one row per output.
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl DenseLayer {
    fn new_random_with_rng<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let bound = (6.0 / (inputs + outputs) as f32).sqrt();
        Self {
            inputs,
            outputs,
            weights: (0..inputs * outputs)
                .map(|_| rng.gen_range(-bound..bound))
                .collect(),
            biases: vec![0.0; outputs],
        }
    }

    fn forward(&self, input: &[f32], hidden: bool) -> Vec<f32> {
        (0..self.outputs)
            .map(|o| {
                let row = &self.weights[o * self.inputs..(o + 1) * self.inputs];
                let sum = self.biases[o] + row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>();
                if hidden {
                    sum.tanh()
                } else {
                    sum
                }
            })
            .collect()
    }

    fn params_mut(&mut self) -> impl Iterator<Item = &mut f32> {
        self.weights.iter_mut().chain(self.biases.iter_mut())
    }

    fn params(&self) -> impl Iterator<Item = &f32> {
        self.weights.iter().chain(self.biases.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QBrain {
    layers: Vec<DenseLayer>,
    epsilon: f32,
    epsilon_decay: f32,
    epsilon_min: f32,
    gamma: f32,
    learning_rate: f32,
    mutation_scale: f32,
}

impl QBrain {
    #[must_use]
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Layer widths from input to output.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = vec![SENSED_INPUTS];
        shape.extend(self.layers.iter().map(|l| l.outputs));
        shape
    }

    #[must_use]
    pub fn q_values(&self, inputs: &SensedInputs) -> [f32; ACTION_COUNT] {
        let trace = self.forward_trace(inputs);
        let mut out = [0.0; ACTION_COUNT];
        if let Some(last) = trace.last() {
            for (slot, v) in out.iter_mut().zip(last) {
                *slot = *v;
            }
        }
        out
    }

    /// Activations of every layer, input first.
    fn forward_trace(&self, inputs: &[f32]) -> Vec<Vec<f32>> {
        let last = self.layers.len().saturating_sub(1);
        let mut trace = Vec::with_capacity(self.layers.len() + 1);
        trace.push(inputs.to_vec());
        for (i, layer) in self.layers.iter().enumerate() {
            let next = layer.forward(&trace[i], i != last);
            trace.push(next);
        }
        trace
    }

    fn backward(&mut self, trace: &[Vec<f32>], mut grad: Vec<f32>) {
        let last = self.layers.len().saturating_sub(1);
        let lr = self.learning_rate;
        for (li, layer) in self.layers.iter_mut().enumerate().rev() {
            let input = &trace[li];
            if li != last {
                for (g, out) in grad.iter_mut().zip(&trace[li + 1]) {
                    *g *= 1.0 - out * out;
                }
            }
            let mut grad_in = vec![0.0; layer.inputs];
            for (o, g) in grad.iter().enumerate() {
                let row = &mut layer.weights[o * layer.inputs..(o + 1) * layer.inputs];
                for (i, w) in row.iter_mut().enumerate() {
                    grad_in[i] += *w * g;
                    *w -= lr * g * input[i];
                }
                layer.biases[o] -= lr * g;
            }
            grad = grad_in;
        }
    }

    fn greedy(&self, inputs: &SensedInputs) -> Heading {
        let q = self.q_values(inputs);
        let best = q
            .iter()
            .enumerate()
            .fold(0, |best, (i, v)| if *v > q[best] { i } else { best });
        Heading::from_index(best).unwrap_or(Heading::East)
    }
}

impl DecisionPolicy for QBrain {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn new_random_with_rng<R: Rng>(config: &PolicyConfig, rng: &mut R) -> Self {
        let mut widths = vec![SENSED_INPUTS];
        widths.extend(config.hidden_layers.iter().copied());
        widths.push(ACTION_COUNT);
        let layers = widths
            .windows(2)
            .map(|w| DenseLayer::new_random_with_rng(w[0], w[1], rng))
            .collect();
        Self {
            layers,
            epsilon: config.epsilon_start,
            epsilon_decay: config.epsilon_decay,
            epsilon_min: config.epsilon_min,
            gamma: config.gamma,
            learning_rate: config.learning_rate,
            mutation_scale: config.mutation_scale,
        }
    }

    fn select_action<R: Rng>(&self, inputs: &SensedInputs, rng: &mut R) -> Action {
        if rng.gen::<f32>() < self.epsilon {
            let i = rng.gen_range(0..ACTION_COUNT);
            return Action::Thrust(Heading::from_index(i).unwrap_or(Heading::East));
        }
        Action::Thrust(self.greedy(inputs))
    }

    fn train_batch(&mut self, batch: &[Experience]) {
        for exp in batch {
            let Some(slot) = exp.action.slot() else {
                continue;
            };
            let target = if exp.terminal {
                exp.reward
            } else {
                let next = self.q_values(&exp.next_state);
                let best = next.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                exp.reward + self.gamma * best
            };
            let trace = self.forward_trace(&exp.state);
            let Some(q) = trace.last() else {
                continue;
            };
            let mut grad = vec![0.0; ACTION_COUNT];
            grad[slot] = (q[slot] - target).clamp(-1.0, 1.0);
            self.backward(&trace, grad);
        }
        self.epsilon = (self.epsilon * self.epsilon_decay).max(self.epsilon_min);
    }

    fn clone_with_mutation<R: Rng>(&self, rate: f32, rng: &mut R) -> Self {
        let mut child = self.clone();
        let amplitude = rate * self.mutation_scale;
        if amplitude > 0.0 {
            for layer in &mut child.layers {
                for p in layer.params_mut() {
                    *p += rng.gen_range(-amplitude..amplitude);
                }
            }
        }
        child
    }

    fn crossover_with_rng<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let mut child = self.clone();
        if self.shape() != other.shape() {
            return child;
        }
        for (mine, theirs) in child.layers.iter_mut().zip(&other.layers) {
            for (p, q) in mine.params_mut().zip(theirs.params()) {
                if rng.gen_bool(0.5) {
                    *p = *q;
                }
            }
        }
        child
    }

    fn export_parameters(&self) -> PolicyParameters {
        PolicyParameters {
            kind: KIND.to_string(),
            shape: self.shape(),
            values: self.layers.iter().flat_map(|l| l.params().copied()).collect(),
        }
    }

    fn import_parameters(&mut self, params: &PolicyParameters) -> Result<(), PolicyError> {
        if params.kind != KIND {
            return Err(PolicyError::Parameters(format!(
                "expected {KIND}, got {}",
                params.kind
            )));
        }
        if params.shape != self.shape() {
            return Err(PolicyError::Parameters(format!(
                "shape {:?} does not match {:?}",
                params.shape,
                self.shape()
            )));
        }
        let expected: usize = self.layers.iter().map(|l| l.weights.len() + l.biases.len()).sum();
        if params.values.len() != expected {
            return Err(PolicyError::Parameters(format!(
                "expected {expected} values, got {}",
                params.values.len()
            )));
        }
        let mut values = params.values.iter();
        for layer in &mut self.layers {
            for (p, v) in layer.params_mut().zip(&mut values) {
                *p = *v;
            }
        }
        Ok(())
    }
}
