//! generator
//!
//! Seeded, token-based trace synthesis over a validated process.
//!
//! # Semantics
//!
//! A trace starts by firing one start event. Tokens then sit on sequences;
//! a node is enabled when it can consume them:
//! - A parallel gateway with several incoming sequences (a join) needs a
//!   token on every incoming sequence
//! - Every other node needs a token on any incoming sequence
//!
//! One enabled node fires per step, chosen at random. Firing produces:
//! - Nothing at an end event
//! - A token on every outgoing sequence at a parallel gateway
//! - A token on exactly one outgoing sequence anywhere else
//!
//! Tasks record an event when they fire. A trace ends when no tokens remain,
//! when it reaches the maximum length, or when tokens remain but nothing is
//! enabled.
//!
//! # Determinism
//!
//! All choices come from one [`StdRng`]. The same process, seed, and epoch
//! produce the same log.

pub mod log;

pub use log::{Event, EventLog, LogFormat, LogHeader, LogWriteError, Trace, TraceOutcome};

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::core::config::{DEFAULT_LOOP_EXIT_BIAS, DEFAULT_MAX_TRACE_LENGTH};
use crate::core::graph;
use crate::core::model::FlowObject;
use crate::core::process::Process;
use crate::core::types::{GatewayKind, Role, SequenceId};

/// Errors from setting up the generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("process '{name}' is not valid; run the model check first")]
    InvalidProcess { name: String },

    #[error("invalid simulation setting: {0}")]
    InvalidConfig(String),
}

/// Simulation settings.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Number of traces to generate
    pub traces: usize,
    /// RNG seed; drawn from the OS when unset
    pub seed: Option<u64>,
    /// Maximum number of events per trace
    pub max_trace_length: usize,
    /// Probability of leaving a loop at a choice that can loop back
    pub loop_exit_bias: f64,
    /// Timestamp of the first trace
    pub epoch: DateTime<Utc>,
}

impl SimulationConfig {
    pub fn new(traces: usize) -> Self {
        Self {
            traces,
            seed: None,
            max_trace_length: DEFAULT_MAX_TRACE_LENGTH,
            loop_exit_bias: DEFAULT_LOOP_EXIT_BIAS,
            epoch: Utc::now(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_trace_length(mut self, max: usize) -> Self {
        self.max_trace_length = max;
        self
    }

    pub fn with_loop_exit_bias(mut self, bias: f64) -> Self {
        self.loop_exit_bias = bias;
        self
    }

    pub fn with_epoch(mut self, epoch: DateTime<Utc>) -> Self {
        self.epoch = epoch;
        self
    }

    fn validate(&self) -> Result<(), GeneratorError> {
        if self.max_trace_length == 0 {
            return Err(GeneratorError::InvalidConfig(
                "max_trace_length must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.loop_exit_bias) {
            return Err(GeneratorError::InvalidConfig(format!(
                "loop_exit_bias must be between 0 and 1, got {}",
                self.loop_exit_bias
            )));
        }
        Ok(())
    }
}

/// Token markings: number of tokens per sequence. Empty entries are removed.
type Marking = BTreeMap<SequenceId, usize>;

/// Generates event logs from a read-only process.
#[derive(Debug)]
pub struct LogGenerator<'p> {
    process: &'p Process,
    config: SimulationConfig,
    seed: u64,
    rng: StdRng,
    /// Sequences whose sink can reach their source again
    loop_back: BTreeSet<SequenceId>,
}

impl<'p> LogGenerator<'p> {
    /// Create a generator for `process`.
    ///
    /// # Errors
    ///
    /// - [`GeneratorError::InvalidProcess`] if the process is not valid
    /// - [`GeneratorError::InvalidConfig`] for out-of-range settings
    pub fn new(process: &'p Process, config: SimulationConfig) -> Result<Self, GeneratorError> {
        if !process.evaluate_validity() {
            return Err(GeneratorError::InvalidProcess {
                name: process.name().to_string(),
            });
        }
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let loop_back = process
            .sequences()
            .filter(|s| graph::reachable_from(process, s.sink()).contains(&s.source()))
            .map(|s| s.id())
            .collect();

        Ok(Self {
            process,
            config,
            seed,
            rng: StdRng::seed_from_u64(seed),
            loop_back,
        })
    }

    /// The seed in use, whether configured or drawn.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate the configured number of traces.
    pub fn generate_log(&mut self) -> EventLog {
        let traces = (0..self.config.traces)
            .map(|number| self.generate_trace(number))
            .collect();

        EventLog {
            header: LogHeader {
                process: self.process.name().to_string(),
                fingerprint: self.process.fingerprint(),
                seed: self.seed,
            },
            traces,
        }
    }

    /// Simulate one trace. `number` offsets its start time from the epoch.
    pub fn generate_trace(&mut self, number: usize) -> Trace {
        let process = self.process;
        let id = uuid::Builder::from_random_bytes(self.rng.random()).into_uuid();
        let offset = i64::try_from(number)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or_default();
        let mut clock = self
            .config
            .epoch
            .checked_add_signed(offset)
            .unwrap_or(self.config.epoch);

        let mut events = Vec::new();
        let mut marking = Marking::new();

        let starts: Vec<&FlowObject> = process.start_events().collect();
        if let Some(start) = self.pick(&starts).copied() {
            self.produce(start, &mut marking);
        }

        // Gateway-only cycles emit no events, so steps are bounded separately.
        let step_limit = self
            .config
            .max_trace_length
            .saturating_mul(process.flow_objects().count().max(1));
        let mut steps = 0;

        let outcome = loop {
            if marking.is_empty() {
                break TraceOutcome::Complete;
            }
            if steps >= step_limit {
                break TraceOutcome::Truncated;
            }

            let enabled = self.enabled(&marking);
            let Some(node) = self.pick(&enabled).copied() else {
                break TraceOutcome::Deadlocked;
            };
            if node.role() == Role::Task && events.len() >= self.config.max_trace_length {
                break TraceOutcome::Truncated;
            }

            self.consume(node, &mut marking);
            if node.role() == Role::Task {
                clock += Duration::minutes(self.rng.random_range(1..=60));
                events.push(Event {
                    activity: node.name().unwrap_or_default().to_string(),
                    timestamp: clock,
                });
            }
            self.produce(node, &mut marking);
            steps += 1;
        };

        Trace {
            id,
            outcome,
            events,
        }
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.rng.random_range(0..items.len()))
    }

    /// Nodes that can fire under `marking`, in id order.
    fn enabled(&self, marking: &Marking) -> Vec<&'p FlowObject> {
        let process = self.process;
        let candidates: BTreeSet<_> = marking
            .keys()
            .filter_map(|id| process.sequence(*id))
            .map(|s| s.sink())
            .collect();

        candidates
            .into_iter()
            .filter_map(|id| process.node(id))
            .filter(|node| {
                !is_join(node) || node.incoming().iter().all(|s| marking.contains_key(s))
            })
            .collect()
    }

    fn consume(&self, node: &FlowObject, marking: &mut Marking) {
        if is_join(node) {
            for sequence in node.incoming() {
                take(marking, *sequence);
            }
        } else if let Some(sequence) = node.incoming().iter().find(|s| marking.contains_key(s)) {
            take(marking, *sequence);
        }
    }

    fn produce(&mut self, node: &FlowObject, marking: &mut Marking) {
        match (node.role(), node.gateway_kind()) {
            (Role::EndEvent, _) => {}
            (_, Some(GatewayKind::Parallel)) => {
                for sequence in node.outgoing() {
                    *marking.entry(*sequence).or_default() += 1;
                }
            }
            _ => {
                if let Some(sequence) = self.choose_exit(node) {
                    *marking.entry(sequence).or_default() += 1;
                }
            }
        }
    }

    /// Pick one outgoing sequence, biased towards leaving loops.
    fn choose_exit(&mut self, node: &FlowObject) -> Option<SequenceId> {
        let (loops, exits): (Vec<SequenceId>, Vec<SequenceId>) = node
            .outgoing()
            .iter()
            .copied()
            .partition(|s| self.loop_back.contains(s));

        let pool = if loops.is_empty() || exits.is_empty() {
            node.outgoing().iter().copied().collect()
        } else if self.rng.random_bool(self.config.loop_exit_bias) {
            exits
        } else {
            loops
        };
        self.pick(&pool).copied()
    }
}

fn is_join(node: &FlowObject) -> bool {
    node.gateway_kind() == Some(GatewayKind::Parallel) && node.incoming().len() > 1
}

fn take(marking: &mut Marking, sequence: SequenceId) {
    if let Some(count) = marking.get_mut(&sequence) {
        *count -= 1;
        if *count == 0 {
            marking.remove(&sequence);
        }
    }
}
