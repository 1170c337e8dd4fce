// Copyright 2015-2020 Parity Technologies (UK) Ltd.
// This file is part of OpenEthereum.

// OpenEthereum is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// OpenEthereum is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with OpenEthereum.  If not, see <http://www.gnu.org/licenses/>.

//! The replay executor: drives a Markov walk over encoded operations and
//! dispatches each step against a StateDB under test.

use crate::{
    arguments::{
        self, EmpiricalRandomizer, ReusableSet, ScalarSampler, SingleUseSet, SnapshotSampler,
    },
    distribution,
    markov::{self, MarkovChain},
    operations::{self, decode_label, to_address, to_hash, ArgKind, Operation, NUM_OPS},
    profile::{self, Profile},
    statedb::StateDb,
};
use ethereum_types::U256;
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use std::{
    collections::BTreeSet,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering as AtomicOrdering},
        Arc,
    },
};

/// Contract code payloads never exceed the EIP-170 limit.
pub const MAX_CODE_SIZE: i64 = 24_576;

/// One StateDB failure, located by the lifecycle counters at the time it
/// was harvested.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendFailure {
    /// Block counter when the failure surfaced.
    pub block: u64,
    /// Transaction counter when the failure surfaced.
    pub transaction: u32,
    /// The backend's message.
    pub message: String,
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "block {} tx {}: {}",
            self.block, self.transaction, self.message
        )
    }
}

/// Replay errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The profile failed validation.
    Profile(profile::Error),
    /// Markov sampling failed.
    Markov(markov::Error),
    /// A distribution failed validation.
    Distribution(distribution::Error),
    /// Argument selection failed.
    Argument(arguments::Error),
    /// Opcode encoding or index conversion failed.
    Codec(operations::Error),
    /// The initial Markov state label is missing from the profile.
    MissingInitialState(String),
    /// The entropy source failed while filling a code payload.
    Rng(String),
    /// One or more StateDB failures, joined.
    Backend(Vec<BackendFailure>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Error::*;
        match self {
            Profile(e) => write!(f, "invalid profile: {e}"),
            Markov(e) => write!(f, "markov sampling failed: {e}"),
            Distribution(e) => write!(f, "invalid distribution: {e}"),
            Argument(e) => write!(f, "argument selection failed: {e}"),
            Codec(e) => write!(f, "operation codec failed: {e}"),
            MissingInitialState(label) => {
                write!(f, "profile has no state labeled {label}")
            }
            Rng(e) => write!(f, "entropy source failed: {e}"),
            Backend(failures) => {
                write!(f, "{} StateDB failure(s):", failures.len())?;
                for failure in failures {
                    write!(f, " [{failure}]")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<profile::Error> for Error {
    fn from(e: profile::Error) -> Self {
        Error::Profile(e)
    }
}

impl From<markov::Error> for Error {
    fn from(e: markov::Error) -> Self {
        Error::Markov(e)
    }
}

impl From<distribution::Error> for Error {
    fn from(e: distribution::Error) -> Self {
        Error::Distribution(e)
    }
}

impl From<arguments::Error> for Error {
    fn from(e: arguments::Error) -> Self {
        Error::Argument(e)
    }
}

impl From<operations::Error> for Error {
    fn from(e: operations::Error) -> Self {
        Error::Codec(e)
    }
}

/// Chooses the successor Markov state; implemented by the plain chain walk
/// and by the coverage-guided bias.
pub trait TransitionSampler {
    /// Returns the next state given the chain, the current state and a
    /// uniform draw in [0,1).
    fn next_state(
        &mut self,
        chain: &MarkovChain,
        current: usize,
        u: f64,
    ) -> Result<usize, markov::Error>;
}

/// The unbiased walk.
#[derive(Debug, Default)]
pub struct DefaultSampler;

impl TransitionSampler for DefaultSampler {
    fn next_state(
        &mut self,
        chain: &MarkovChain,
        current: usize,
        u: f64,
    ) -> Result<usize, markov::Error> {
        chain.sample(current, u)
    }
}

/// Replay parameters supplied by the driver.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Seed of the single pseudo-random entropy source.
    pub seed: u64,
    /// Number of blocks to synthesise.
    pub blocks: u64,
    /// Upper bound of sampled balance increments.
    pub balance_range: i64,
    /// Upper bound of sampled nonces.
    pub nonce_range: i64,
    /// Keep replaying after a harvested StateDB failure.
    pub continue_on_failure: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        ReplayConfig {
            seed: 0,
            blocks: 1,
            balance_range: 1_000_000,
            nonce_range: 1_000_000,
            continue_on_failure: false,
        }
    }
}

/// Completion report of a replay run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    /// Completed sync periods.
    pub sync_periods: u64,
    /// Completed blocks.
    pub blocks: u64,
    /// Completed transactions.
    pub transactions: u64,
    /// Dispatched operations.
    pub operations: u64,
    /// Dispatch count per operation id.
    pub frequencies: Vec<u64>,
}

impl ReplaySummary {
    /// Dispatch count of one operation.
    pub fn count(&self, op: Operation) -> u64 {
        self.frequencies[op.id() as usize]
    }
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "replayed {} sync period(s), {} block(s), {} transaction(s), {} operation(s)",
            self.sync_periods, self.blocks, self.transactions, self.operations
        )?;
        for (id, &count) in self.frequencies.iter().enumerate() {
            if count > 0 {
                let op = Operation::from_id(id as u32).expect("id enumerates NUM_OPS; qed");
                writeln!(f, "    {} {:<18} {}", op.mnemonic(), op.name(), count)?;
            }
        }
        Ok(())
    }
}

/// The replay executor.
///
/// Owns every piece of mutable run state: argument sets, samplers, the
/// snapshot stack, the per-block self-destruct set and the lifecycle
/// counters. The StateDB is an injected dependency.
pub struct Replayer<'a, D: StateDb + ?Sized> {
    db: &'a mut D,
    config: ReplayConfig,
    chain: MarkovChain,
    decoded: Vec<(Operation, ArgKind, ArgKind, ArgKind)>,
    contracts: SingleUseSet,
    keys: ReusableSet,
    values: ReusableSet,
    snapshot_sampler: SnapshotSampler,
    balance_sampler: ScalarSampler,
    nonce_sampler: ScalarSampler,
    code_size_sampler: ScalarSampler,
    code_size_range: i64,
    rng: XorShiftRng,
    state: usize,
    snapshots: Vec<i32>,
    self_destructed: BTreeSet<i64>,
    block: u64,
    transaction: u32,
    sync_period: u64,
    blocks_done: u64,
    sync_periods_done: u64,
    transactions_done: u64,
    operations_done: u64,
    frequencies: Vec<u64>,
    failures: Vec<BackendFailure>,
    primed: bool,
    abort: Arc<AtomicBool>,
}

impl<'a, D: StateDb + ?Sized> Replayer<'a, D> {
    /// Builds an executor from a validated profile.
    ///
    /// Fails on any configuration defect: invalid matrix or labels, invalid
    /// distributions, or a profile without the initial sync-period state.
    pub fn new(db: &'a mut D, profile: &Profile, config: ReplayConfig) -> Result<Self, Error> {
        profile.check()?;
        let chain = profile.markov_chain().map_err(profile::Error::from)?;
        let decoded = profile
            .operations
            .iter()
            .map(|label| decode_label(label))
            .collect::<Result<Vec<_>, _>>()?;
        let initial = Operation::BeginSyncPeriod.mnemonic();
        let state = chain
            .find(initial)
            .ok_or_else(|| Error::MissingInitialState(initial.to_owned()))?;

        let seed = config.seed;
        let contracts = SingleUseSet::new(
            profile.contracts.counting.n,
            Box::new(EmpiricalRandomizer::new(
                seed,
                profile.contracts.counting.ecdf.clone(),
                &profile.contracts.queuing.distribution,
            )?),
        );
        let keys = ReusableSet::new(
            profile.keys.counting.n,
            Box::new(EmpiricalRandomizer::new(
                seed.wrapping_add(1),
                profile.keys.counting.ecdf.clone(),
                &profile.keys.queuing.distribution,
            )?),
        );
        let values = ReusableSet::new(
            profile.values.counting.n,
            Box::new(EmpiricalRandomizer::new(
                seed.wrapping_add(2),
                profile.values.counting.ecdf.clone(),
                &profile.values.queuing.distribution,
            )?),
        );
        let snapshot_sampler = SnapshotSampler::new(profile.snapshot_ecdf.0.clone())?;
        let balance_sampler = ScalarSampler::new(profile.balance.ecdf.0.clone())?;
        let nonce_sampler = ScalarSampler::new(profile.nonce.ecdf.0.clone())?;
        let code_size_sampler = ScalarSampler::new(profile.code_size.ecdf.0.clone())?;

        Ok(Replayer {
            db,
            chain,
            decoded,
            contracts,
            keys,
            values,
            snapshot_sampler,
            balance_sampler,
            nonce_sampler,
            code_size_sampler,
            code_size_range: profile.code_size.max.max(1),
            rng: XorShiftRng::seed_from_u64(seed.wrapping_add(3)),
            state,
            snapshots: Vec::new(),
            self_destructed: BTreeSet::new(),
            block: 0,
            transaction: 0,
            sync_period: 0,
            blocks_done: 0,
            sync_periods_done: 0,
            transactions_done: 0,
            operations_done: 0,
            frequencies: vec![0; NUM_OPS],
            failures: Vec::new(),
            primed: false,
            abort: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// A handle the driver may set to stop the run between transitions.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    /// The current Markov state index.
    pub fn current_state(&self) -> usize {
        self.state
    }

    /// The chain the walk runs over.
    pub fn chain(&self) -> &MarkovChain {
        &self.chain
    }

    /// Creates and funds the initial account population inside a dedicated
    /// sync period, block and transaction.
    pub fn prime(&mut self) -> Result<(), Error> {
        self.db.begin_sync_period(0);
        self.db.begin_block(0);
        self.db.begin_transaction(0);
        for index in 0..=self.contracts.size() {
            let address = to_address(index)?;
            self.db.create_account(&address);
            let amount = self
                .balance_sampler
                .sample(&mut self.rng, self.config.balance_range);
            self.db.add_balance(&address, U256::from(amount as u64));
        }
        self.db.end_transaction();
        self.db.end_block();
        self.db.end_sync_period();
        if let Some(message) = self.db.error() {
            return Err(Error::Backend(vec![BackendFailure {
                block: 0,
                transaction: 0,
                message,
            }]));
        }
        self.block = 1;
        self.sync_period = 1;
        self.transaction = 0;
        self.primed = true;
        Ok(())
    }

    /// Runs the walk to completion with the unbiased sampler.
    pub fn run(&mut self) -> Result<ReplaySummary, Error> {
        self.run_with(&mut DefaultSampler)
    }

    /// Runs the walk to completion, advancing through `sampler`.
    pub fn run_with(&mut self, sampler: &mut dyn TransitionSampler) -> Result<ReplaySummary, Error> {
        if !self.primed {
            self.prime()?;
        }
        while !self.abort.load(AtomicOrdering::Relaxed) {
            if self.step(sampler)? {
                break;
            }
        }
        if !self.failures.is_empty() {
            return Err(Error::Backend(std::mem::take(&mut self.failures)));
        }
        Ok(self.summary())
    }

    /// Executes one operation and advances the Markov state.
    ///
    /// Returns `true` once the requested number of blocks has completed.
    pub fn step(&mut self, sampler: &mut dyn TransitionSampler) -> Result<bool, Error> {
        let (op, addr_kind, key_kind, value_kind) = self.decoded[self.state];

        let addr_index = match addr_kind {
            ArgKind::NoArg => 0,
            kind => self.contracts.choose(kind)?,
        };
        let key_index = match key_kind {
            ArgKind::NoArg => 0,
            kind => self.keys.choose(kind)?,
        };
        let value_index = match value_kind {
            ArgKind::NoArg => 0,
            kind => self.values.choose(kind)?,
        };

        self.dispatch(op, addr_index, key_index, value_index)?;
        self.operations_done += 1;
        self.frequencies[op.id() as usize] += 1;

        if let Some(message) = self.db.error() {
            let failure = BackendFailure {
                block: self.block,
                transaction: self.transaction,
                message,
            };
            debug!(target: "replay", "harvested StateDB failure: {failure}");
            self.failures.push(failure);
            if !self.config.continue_on_failure {
                return Err(Error::Backend(std::mem::take(&mut self.failures)));
            }
        }

        if op == Operation::EndBlock && self.blocks_done >= self.config.blocks {
            return Ok(true);
        }

        let u = self.rng.gen_range(0.0, 1.0);
        self.state = sampler.next_state(&self.chain, self.state, u)?;
        Ok(false)
    }

    /// The completion report at the current point of the run.
    pub fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            sync_periods: self.sync_periods_done,
            blocks: self.blocks_done,
            transactions: self.transactions_done,
            operations: self.operations_done,
            frequencies: self.frequencies.clone(),
        }
    }

    fn dispatch(
        &mut self,
        op: Operation,
        addr_index: i64,
        key_index: i64,
        value_index: i64,
    ) -> Result<(), Error> {
        use self::Operation::*;
        match op {
            BeginSyncPeriod => self.db.begin_sync_period(self.sync_period),
            EndSyncPeriod => {
                self.db.end_sync_period();
                self.sync_period += 1;
                self.sync_periods_done += 1;
            }
            BeginBlock => {
                self.db.begin_block(self.block);
                self.self_destructed.clear();
                self.transaction = 0;
            }
            EndBlock => {
                self.db.end_block();
                self.block += 1;
                self.blocks_done += 1;
                let doomed: Vec<i64> = std::mem::take(&mut self.self_destructed)
                    .into_iter()
                    .collect();
                for index in doomed {
                    self.contracts.remove(index)?;
                }
            }
            BeginTransaction => {
                self.db.begin_transaction(self.transaction);
                self.snapshots.clear();
            }
            EndTransaction => {
                self.db.end_transaction();
                self.transaction += 1;
                self.transactions_done += 1;
            }
            CreateAccount => self.db.create_account(&to_address(addr_index)?),
            CreateContract => self.db.create_contract(&to_address(addr_index)?),
            Empty => {
                self.db.is_empty(&to_address(addr_index)?);
            }
            Exist => {
                self.db.exists(&to_address(addr_index)?);
            }
            HasSelfDestructed => {
                self.db.has_self_destructed(&to_address(addr_index)?);
            }
            SelfDestruct => {
                self.db.self_destruct(&to_address(addr_index)?);
                self.self_destructed.insert(addr_index);
            }
            SelfDestruct6780 => {
                self.db.self_destruct_6780(&to_address(addr_index)?);
                self.self_destructed.insert(addr_index);
            }
            AddBalance => {
                let amount = self
                    .balance_sampler
                    .sample(&mut self.rng, self.config.balance_range);
                self.db
                    .add_balance(&to_address(addr_index)?, U256::from(amount as u64));
            }
            SubBalance => {
                let address = to_address(addr_index)?;
                let balance = self.db.balance(&address);
                if !balance.is_zero() {
                    let amount = random_below(&mut self.rng, balance);
                    self.db.sub_balance(&address, amount);
                }
            }
            GetBalance => {
                self.db.balance(&to_address(addr_index)?);
            }
            GetNonce => {
                self.db.nonce(&to_address(addr_index)?);
            }
            SetNonce => {
                let nonce = self
                    .nonce_sampler
                    .sample(&mut self.rng, self.config.nonce_range);
                self.db.set_nonce(&to_address(addr_index)?, nonce as u64);
            }
            GetCode => {
                self.db.code(&to_address(addr_index)?);
            }
            GetCodeHash => {
                self.db.code_hash(&to_address(addr_index)?);
            }
            GetCodeSize => {
                self.db.code_size(&to_address(addr_index)?);
            }
            SetCode => {
                let sampled = self
                    .code_size_sampler
                    .sample(&mut self.rng, self.code_size_range);
                let size = (sampled % MAX_CODE_SIZE).max(1) as usize;
                let mut code = vec![0u8; size];
                self.rng
                    .try_fill(&mut code[..])
                    .map_err(|e| Error::Rng(e.to_string()))?;
                self.db.set_code(&to_address(addr_index)?, code);
            }
            GetState => {
                self.db
                    .storage_at(&to_address(addr_index)?, &to_hash(key_index)?);
            }
            SetState => {
                self.db.set_storage(
                    &to_address(addr_index)?,
                    &to_hash(key_index)?,
                    &to_hash(value_index)?,
                );
            }
            GetCommittedState => {
                self.db
                    .committed_storage_at(&to_address(addr_index)?, &to_hash(key_index)?);
            }
            GetTransientState => {
                self.db
                    .transient_storage_at(&to_address(addr_index)?, &to_hash(key_index)?);
            }
            SetTransientState => {
                self.db.set_transient_storage(
                    &to_address(addr_index)?,
                    &to_hash(key_index)?,
                    &to_hash(value_index)?,
                );
            }
            GetStorageRoot => {
                self.db.storage_root(&to_address(addr_index)?);
            }
            Snapshot => {
                let id = self.db.snapshot();
                self.snapshots.push(id);
            }
            RevertToSnapshot => {
                let depth = self.snapshots.len();
                if depth > 0 {
                    let position = self.snapshot_sampler.sample_depth(&mut self.rng, depth);
                    let index = depth
                        .saturating_sub(position)
                        .saturating_sub(1)
                        .min(depth - 1);
                    self.db.revert_to_snapshot(self.snapshots[index]);
                    self.snapshots.truncate(index);
                }
            }
        }
        Ok(())
    }
}

/// Uniform draw in `[0, bound)`; `bound` must be positive.
fn random_below(rng: &mut XorShiftRng, bound: U256) -> U256 {
    if bound <= U256::from(u64::MAX) {
        U256::from(rng.gen_range(0, bound.low_u64()))
    } else {
        let words: [u64; 4] = rng.gen();
        U256(words) % bound
    }
}
