//! Per-creature owner of a decision policy and its training lifecycle.
//!
//! Acting always reads the most recently published parameters. Training runs
//! on a private clone which is swapped in when the round finishes, so the
//! tick never waits on a learner. A handle is in one of two states, idle or
//! training; a round that comes due while the previous one is still running
//! is rejected with [`PolicyError::Busy`].

use super::{
    validate_inputs, Action, DecisionPolicy, Experience, PolicyError, PolicyParameters,
    SensedInputs,
};
use crate::config::{PolicyConfig, TrainingMode};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

const IDLE: u8 = 0;
const TRAINING: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainerSettings {
    pub mode: TrainingMode,
    pub batch_size: usize,
    pub memory_size: usize,
    pub train_every: u64,
}

impl From<&PolicyConfig> for TrainerSettings {
    fn from(config: &PolicyConfig) -> Self {
        Self {
            mode: config.training,
            batch_size: config.batch_size,
            memory_size: config.memory_size,
            train_every: config.train_every,
        }
    }
}

/// What happened to a piece of feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Stored in replay memory; no training round was due.
    Stored,
    /// A training round finished on the calling thread.
    Trained,
    /// A training round was handed to the background pool.
    Dispatched,
}

/// Resets the state flag even if a training round panics.
struct TrainingGuard(Arc<AtomicU8>);

impl Drop for TrainingGuard {
    fn drop(&mut self) {
        self.0.store(IDLE, Ordering::Release);
    }
}

pub struct PolicyHandle<P: DecisionPolicy> {
    published: Arc<RwLock<Arc<P>>>,
    state: Arc<AtomicU8>,
    memory: VecDeque<Experience>,
    feedback_count: u64,
    settings: TrainerSettings,
}

impl<P: DecisionPolicy> std::fmt::Debug for PolicyHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyHandle")
            .field("kind", &self.policy().kind())
            .field("training", &self.is_training())
            .field("memory", &self.memory.len())
            .finish()
    }
}

impl<P: DecisionPolicy> PolicyHandle<P> {
    #[must_use]
    pub fn new(policy: P, settings: TrainerSettings) -> Self {
        Self {
            published: Arc::new(RwLock::new(Arc::new(policy))),
            state: Arc::new(AtomicU8::new(IDLE)),
            memory: VecDeque::with_capacity(settings.batch_size),
            feedback_count: 0,
            settings,
        }
    }

    /// Currently published policy.
    #[must_use]
    pub fn policy(&self) -> Arc<P> {
        let guard = self.published.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    #[must_use]
    pub fn is_training(&self) -> bool {
        self.state.load(Ordering::Acquire) == TRAINING
    }

    #[must_use]
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn act<R: Rng>(&self, inputs: &SensedInputs, rng: &mut R) -> Result<Action, PolicyError> {
        validate_inputs(inputs)?;
        Ok(self.policy().select_action(inputs, rng))
    }

    /// Independent handle for a child: mutated copy, empty memory.
    #[must_use]
    pub fn offspring<R: Rng>(&self, rate: f32, rng: &mut R) -> Self {
        Self::new(self.policy().clone_with_mutation(rate, rng), self.settings)
    }

    #[must_use]
    pub fn export_parameters(&self) -> PolicyParameters {
        self.policy().export_parameters()
    }

    pub fn ingest_feedback(&mut self, exp: Experience) -> Result<FeedbackOutcome, PolicyError> {
        exp.validate()?;
        if self.memory.len() >= self.settings.memory_size {
            self.memory.pop_front();
        }
        self.memory.push_back(exp);
        self.feedback_count += 1;

        if self.settings.mode == TrainingMode::Disabled
            || self.feedback_count % self.settings.train_every != 0
        {
            return Ok(FeedbackOutcome::Stored);
        }

        if self
            .state
            .compare_exchange(IDLE, TRAINING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PolicyError::Busy);
        }

        let skip = self.memory.len().saturating_sub(self.settings.batch_size);
        let batch: Vec<Experience> = self.memory.iter().skip(skip).cloned().collect();
        let guard = TrainingGuard(Arc::clone(&self.state));

        match self.settings.mode {
            TrainingMode::Inline => {
                train_and_publish(&self.published, &batch);
                drop(guard);
                Ok(FeedbackOutcome::Trained)
            }
            _ => {
                let published = Arc::clone(&self.published);
                rayon::spawn(move || {
                    let _guard = guard;
                    train_and_publish(&published, &batch);
                });
                Ok(FeedbackOutcome::Dispatched)
            }
        }
    }
}

fn train_and_publish<P: DecisionPolicy>(published: &RwLock<Arc<P>>, batch: &[Experience]) {
    let mut next = {
        let current = published.read().unwrap_or_else(|e| e.into_inner());
        P::clone(&current)
    };
    next.train_batch(batch);
    let mut slot = published.write().unwrap_or_else(|e| e.into_inner());
    *slot = Arc::new(next);
    tracing::trace!(batch = batch.len(), "Policy training round published");
}
