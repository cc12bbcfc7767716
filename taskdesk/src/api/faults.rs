//! Fault-decision strategies for the simulated API.
//!
//! The repository asks a [`FaultInjector`] once per call whether that call
//! should fail. Production wiring uses [`RandomFaults`]; tests plug in a
//! deterministic strategy ([`NoFaults`], [`FailOn`], [`ScriptedFaults`] or
//! any `Fn(Operation) -> bool` closure).

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Operation;

/// Decides whether a single API call fails.
pub trait FaultInjector: Send + Sync {
    /// Returns `true` if this call of `operation` should fail.
    fn should_fail(&self, operation: Operation) -> bool;
}

impl<F> FaultInjector for F
where
    F: Fn(Operation) -> bool + Send + Sync,
{
    fn should_fail(&self, operation: Operation) -> bool {
        self(operation)
    }
}

/// Per-operation failure probabilities in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailureRates {
    /// Rate for [`Operation::FetchAll`].
    pub fetch_all: f64,
    /// Rate for [`Operation::CreateOne`].
    pub create_one: f64,
    /// Rate for [`Operation::CreateMany`].
    pub create_many: f64,
    /// Rate for [`Operation::UpdateOne`].
    pub update_one: f64,
    /// Rate for [`Operation::DeleteOne`].
    pub delete_one: f64,
}

impl Default for FailureRates {
    fn default() -> Self {
        Self {
            fetch_all: Operation::FetchAll.default_failure_rate(),
            create_one: Operation::CreateOne.default_failure_rate(),
            create_many: Operation::CreateMany.default_failure_rate(),
            update_one: Operation::UpdateOne.default_failure_rate(),
            delete_one: Operation::DeleteOne.default_failure_rate(),
        }
    }
}

impl FailureRates {
    /// All rates zero.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            fetch_all: 0.0,
            create_one: 0.0,
            create_many: 0.0,
            update_one: 0.0,
            delete_one: 0.0,
        }
    }

    /// Rate of a single roll for `operation`.
    #[must_use]
    pub const fn rate(&self, operation: Operation) -> f64 {
        match operation {
            Operation::FetchAll => self.fetch_all,
            Operation::CreateOne => self.create_one,
            Operation::CreateMany => self.create_many,
            Operation::UpdateOne => self.update_one,
            Operation::DeleteOne => self.delete_one,
        }
    }

    /// Probability that a whole call of `operation` fails with a simulated
    /// fault, including the nested fetch of mutating operations.
    ///
    /// The two rolls are independent, so this is `1 - (1 - p_op)(1 - p_fetch)`.
    #[must_use]
    pub fn effective_rate(&self, operation: Operation) -> f64 {
        let own = self.rate(operation);
        if operation.is_mutation() {
            1.0 - (1.0 - own) * (1.0 - self.fetch_all)
        } else {
            own
        }
    }
}

/// Fails calls at random according to [`FailureRates`].
pub struct RandomFaults {
    rates: FailureRates,
    rng: Mutex<StdRng>,
}

impl RandomFaults {
    /// Creates an injector seeded from the operating system.
    #[must_use]
    pub fn new(rates: FailureRates) -> Self {
        Self {
            rates,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Creates an injector with a fixed seed for reproducible runs.
    #[must_use]
    pub fn seeded(rates: FailureRates, seed: u64) -> Self {
        Self {
            rates,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl FaultInjector for RandomFaults {
    fn should_fail(&self, operation: Operation) -> bool {
        let roll: f64 = self.rng.lock().random();
        roll < self.rates.rate(operation)
    }
}

/// Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaults;

impl FaultInjector for NoFaults {
    fn should_fail(&self, _operation: Operation) -> bool {
        false
    }
}

/// Always fails the listed operations and never fails the others.
#[derive(Debug, Clone, Default)]
pub struct FailOn {
    operations: HashSet<Operation>,
}

impl FailOn {
    /// Fails every call of the given operations.
    pub fn new(operations: impl IntoIterator<Item = Operation>) -> Self {
        Self {
            operations: operations.into_iter().collect(),
        }
    }
}

impl FaultInjector for FailOn {
    fn should_fail(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }
}

/// Replays a fixed sequence of decisions, then stops failing.
///
/// Decisions are consumed in call order regardless of operation. Every
/// roll is recorded so tests can assert which operations were rolled.
#[derive(Debug, Default)]
pub struct ScriptedFaults {
    script: Mutex<VecDeque<bool>>,
    rolls: Mutex<Vec<Operation>>,
}

impl ScriptedFaults {
    /// Creates an injector that answers with `decisions` in order.
    pub fn new(decisions: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: Mutex::new(decisions.into_iter().collect()),
            rolls: Mutex::new(Vec::new()),
        }
    }

    /// Appends another decision to the script.
    pub fn push(&self, fail: bool) {
        self.script.lock().push_back(fail);
    }

    /// Operations rolled so far, in call order.
    #[must_use]
    pub fn rolls(&self) -> Vec<Operation> {
        self.rolls.lock().clone()
    }
}

impl FaultInjector for ScriptedFaults {
    fn should_fail(&self, operation: Operation) -> bool {
        self.rolls.lock().push(operation);
        self.script.lock().pop_front().unwrap_or(false)
    }
}
