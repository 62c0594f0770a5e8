//! In-memory collaborators
//!
//! Deterministic stand-ins for the external systems behind
//! [`Collaborators`], used by tests, benchmarks and local tooling.
//! [`InMemoryEnvironment`] wires a full set together with a manual clock.

use crate::config::EngineConfig;
use crate::election::collaborators::{
    Authorizer, BeneficiaryRegistry, BondEscrow, Clock, FundsError, IncentiveLedger,
    RandomnessSource, RequestId, RewardVault, VaultError, VoiceCreditOracle,
};
use crate::election::registry::{Collaborators, GrantElections};
use crate::types::{
    Address, Amount, ElectionId, MerkleRoot, RandomNumber, Role, Timestamp, VaultId, tokens,
};
use crate::{Result, internal_error};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

/// Clock moved by hand
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) -> Timestamp {
        self.now.fetch_add(seconds, Ordering::SeqCst) + seconds
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBeneficiaryRegistry {
    members: RwLock<HashSet<Address>>,
}

impl InMemoryBeneficiaryRegistry {
    pub fn add(&self, beneficiary: Address) {
        self.members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(beneficiary);
    }

    pub fn remove(&self, beneficiary: &Address) {
        self.members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(beneficiary);
    }
}

impl BeneficiaryRegistry for InMemoryBeneficiaryRegistry {
    fn beneficiary_exists(&self, address: &Address) -> bool {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(address)
    }
}

/// Fixed voice-credit balances, independent of time
#[derive(Debug, Default)]
pub struct StaticVoiceCredits {
    credits: RwLock<HashMap<Address, Amount>>,
    default_credits: RwLock<Amount>,
}

impl StaticVoiceCredits {
    pub fn set_credits(&self, voter: &Address, credits: Amount) {
        self.credits
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(*voter, credits);
    }

    /// Balance reported for voters without an explicit entry
    pub fn set_default(&self, credits: Amount) {
        *self
            .default_credits
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credits;
    }
}

impl VoiceCreditOracle for StaticVoiceCredits {
    fn credits_for(&self, voter: &Address, _at: Timestamp) -> Amount {
        let explicit = self
            .credits
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(voter)
            .copied();
        explicit.unwrap_or_else(|| *self.default_credits.read().unwrap_or_else(PoisonError::into_inner))
    }
}

#[derive(Debug, Clone, Copy)]
struct RandomnessRequest {
    seed: u64,
    number: Option<RandomNumber>,
}

/// Randomness source fulfilled by the test or from a local secret
pub struct InMemoryRandomness {
    requests: RwLock<HashMap<RequestId, RandomnessRequest>>,
    order: RwLock<Vec<RequestId>>,
    secret: Zeroizing<Vec<u8>>,
}

impl InMemoryRandomness {
    pub fn new(secret: Zeroizing<Vec<u8>>) -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
            secret,
        }
    }

    /// Source keyed by the engine's configured randomness secret
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(config.randomness_secret_bytes()?))
    }

    /// Deliver `number` for `request`; each request is fulfilled once
    pub fn fulfill(&self, request: &RequestId, number: RandomNumber) -> Result<()> {
        let mut requests = self
            .requests
            .write()
            .map_err(|_| internal_error!("Randomness requests write error"))?;
        let entry = requests
            .get_mut(request)
            .ok_or_else(|| internal_error!("unknown randomness request {}", request))?;
        if entry.number.is_some() {
            return Err(internal_error!("randomness request {} already fulfilled", request));
        }

        entry.number = Some(number);
        debug!(%request, number, "randomness request fulfilled");
        Ok(())
    }

    /// Fulfil every open request with a number derived from the secret
    pub fn fulfill_pending(&self) -> Result<Vec<(RequestId, RandomNumber)>> {
        let mut requests = self
            .requests
            .write()
            .map_err(|_| internal_error!("Randomness requests write error"))?;
        let order = self
            .order
            .read()
            .map_err(|_| internal_error!("Randomness order read error"))?;

        let mut fulfilled = Vec::new();
        for request_id in order.iter() {
            let Some(entry) = requests.get_mut(request_id) else {
                continue;
            };
            if entry.number.is_some() {
                continue;
            }

            let number = self.derive_number(request_id, entry.seed);
            entry.number = Some(number);
            fulfilled.push((*request_id, number));
        }

        Ok(fulfilled)
    }

    /// Requests still waiting for a number, oldest first
    pub fn pending_requests(&self) -> Vec<RequestId> {
        let requests = self.requests.read().unwrap_or_else(PoisonError::into_inner);
        self.order
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|id| requests.get(*id).is_some_and(|entry| entry.number.is_none()))
            .copied()
            .collect()
    }

    fn derive_number(&self, request_id: &RequestId, seed: u64) -> RandomNumber {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.secret);
        hasher.update(request_id.as_bytes());
        hasher.update(&seed.to_le_bytes());

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl RandomnessSource for InMemoryRandomness {
    fn request_number(&self, seed: u64) -> Result<RequestId> {
        let request_id = Uuid::new_v4();
        self.requests
            .write()
            .map_err(|_| internal_error!("Randomness requests write error"))?
            .insert(request_id, RandomnessRequest { seed, number: None });
        self.order
            .write()
            .map_err(|_| internal_error!("Randomness order write error"))?
            .push(request_id);

        debug!(%request_id, seed, "randomness requested");
        Ok(request_id)
    }

    fn fulfilled_number(&self, request: &RequestId) -> Option<RandomNumber> {
        self.requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(request)
            .and_then(|entry| entry.number)
    }
}

#[derive(Debug, Clone)]
struct VaultRecord {
    vault_id: VaultId,
    closed: bool,
    released_root: Option<MerkleRoot>,
}

#[derive(Debug)]
struct VaultBook {
    budget: Amount,
    vaults: HashMap<ElectionId, VaultRecord>,
}

/// Reward vault drawing each opening's cost from a fixed budget
#[derive(Debug)]
pub struct InMemoryRewardVault {
    cost_per_awardee: Amount,
    book: Mutex<VaultBook>,
}

impl InMemoryRewardVault {
    pub fn new(budget: Amount, cost_per_awardee: Amount) -> Self {
        Self {
            cost_per_awardee,
            book: Mutex::new(VaultBook {
                budget,
                vaults: HashMap::new(),
            }),
        }
    }

    pub fn remaining_budget(&self) -> Amount {
        self.book.lock().unwrap_or_else(PoisonError::into_inner).budget
    }

    pub fn is_closed(&self, election_id: ElectionId) -> bool {
        self.book
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .vaults
            .get(&election_id)
            .is_some_and(|vault| vault.closed)
    }

    /// Root the vault was released against, if any
    pub fn released_root(&self, vault_id: &VaultId) -> Option<MerkleRoot> {
        self.book
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .vaults
            .values()
            .find(|vault| vault.vault_id == *vault_id)
            .and_then(|vault| vault.released_root)
    }
}

impl RewardVault for InMemoryRewardVault {
    fn open(
        &self,
        election_id: ElectionId,
        size_hint: usize,
    ) -> std::result::Result<VaultId, VaultError> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let required = self.cost_per_awardee.saturating_mul(size_hint as Amount);
        if required > book.budget {
            return Err(VaultError::InsufficientBudget {
                required,
                available: book.budget,
            });
        }

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"reward-vault");
        hasher.update(&election_id.to_le_bytes());
        let vault_id: VaultId = *hasher.finalize().as_bytes();

        book.budget -= required;
        book.vaults.insert(
            election_id,
            VaultRecord {
                vault_id,
                closed: false,
                released_root: None,
            },
        );
        Ok(vault_id)
    }

    fn close(&self, election_id: ElectionId) -> Result<()> {
        let mut book = self
            .book
            .lock()
            .map_err(|_| internal_error!("Reward vault lock error"))?;
        let vault = book
            .vaults
            .get_mut(&election_id)
            .ok_or_else(|| internal_error!("no vault for election {}", election_id))?;
        vault.closed = true;
        Ok(())
    }

    fn release(&self, vault_id: &VaultId, merkle_root: &MerkleRoot) -> Result<()> {
        let mut book = self
            .book
            .lock()
            .map_err(|_| internal_error!("Reward vault lock error"))?;
        let vault = book
            .vaults
            .values_mut()
            .find(|vault| vault.vault_id == *vault_id)
            .ok_or_else(|| internal_error!("unknown vault {}", hex::encode(vault_id)))?;
        vault.released_root = Some(*merkle_root);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct LedgerBook {
    balances: HashMap<Address, Amount>,
    escrow: HashMap<ElectionId, Amount>,
    incentive_pool: Amount,
}

/// Token balances backing bonds and finalization incentives
#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    book: Mutex<LedgerBook>,
}

impl InMemoryTokenLedger {
    pub fn mint(&self, to: &Address, amount: Amount) {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let balance = book.balances.entry(*to).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.book
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .balances
            .get(account)
            .copied()
            .unwrap_or(0)
    }

    /// Bonds held for `election_id`
    pub fn escrowed(&self, election_id: ElectionId) -> Amount {
        self.book
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .escrow
            .get(&election_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn fund_incentives(&self, amount: Amount) {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.incentive_pool = book.incentive_pool.saturating_add(amount);
    }

    pub fn incentive_pool(&self) -> Amount {
        self.book.lock().unwrap_or_else(PoisonError::into_inner).incentive_pool
    }

    pub fn drain_incentive_pool(&self) -> Amount {
        std::mem::take(&mut self.book.lock().unwrap_or_else(PoisonError::into_inner).incentive_pool)
    }
}

impl BondEscrow for InMemoryTokenLedger {
    fn collect_bond(
        &self,
        from: &Address,
        election_id: ElectionId,
        amount: Amount,
    ) -> std::result::Result<(), FundsError> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let available = book.balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(FundsError::InsufficientFunds {
                required: amount,
                available,
            });
        }

        book.balances.insert(*from, available - amount);
        let escrow = book.escrow.entry(election_id).or_default();
        *escrow = escrow.saturating_add(amount);
        Ok(())
    }
}

impl IncentiveLedger for InMemoryTokenLedger {
    fn pay_incentive(
        &self,
        recipient: &Address,
        amount: Amount,
    ) -> std::result::Result<(), FundsError> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        if book.incentive_pool < amount {
            return Err(FundsError::InsufficientFunds {
                required: amount,
                available: book.incentive_pool,
            });
        }

        book.incentive_pool -= amount;
        let balance = book.balances.entry(*recipient).or_default();
        *balance = balance.saturating_add(amount);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RoleTable {
    grants: RwLock<HashSet<(Address, Role)>>,
}

impl RoleTable {
    pub fn grant(&self, account: &Address, role: Role) {
        self.grants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((*account, role));
    }

    pub fn revoke(&self, account: &Address, role: Role) {
        self.grants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(*account, role));
    }
}

impl Authorizer for RoleTable {
    fn has_role(&self, caller: &Address, role: Role) -> bool {
        self.grants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(*caller, role))
    }
}

/// Reward budget of a default environment
pub const DEFAULT_VAULT_BUDGET: Amount = tokens(1_000_000);

/// Cost charged per awardee when a vault opens
pub const VAULT_COST_PER_AWARDEE: Amount = tokens(100);

/// Incentive pool of a default environment
pub const DEFAULT_INCENTIVE_POOL: Amount = tokens(1_000_000);

/// A complete set of in-memory collaborators sharing one manual clock
pub struct InMemoryEnvironment {
    pub clock: Arc<ManualClock>,
    pub beneficiary_registry: Arc<InMemoryBeneficiaryRegistry>,
    pub voice_credits: Arc<StaticVoiceCredits>,
    pub randomness: Arc<InMemoryRandomness>,
    pub reward_vault: Arc<InMemoryRewardVault>,
    pub ledger: Arc<InMemoryTokenLedger>,
    pub roles: Arc<RoleTable>,
    pub governance: Address,
    pub proposer: Address,
    pub approver: Address,
}

impl InMemoryEnvironment {
    pub fn new(now: Timestamp) -> Self {
        Self::with_vault_budget(now, DEFAULT_VAULT_BUDGET)
    }

    pub fn with_vault_budget(now: Timestamp, budget: Amount) -> Self {
        let governance = Address::from_label("governance");
        let proposer = Address::from_label("proposer");
        let approver = Address::from_label("approver");

        let roles = RoleTable::default();
        roles.grant(&governance, Role::Governance);
        roles.grant(&proposer, Role::Proposer);
        roles.grant(&approver, Role::Approver);

        let ledger = InMemoryTokenLedger::default();
        ledger.fund_incentives(DEFAULT_INCENTIVE_POOL);

        Self {
            clock: Arc::new(ManualClock::new(now)),
            beneficiary_registry: Arc::new(InMemoryBeneficiaryRegistry::default()),
            voice_credits: Arc::new(StaticVoiceCredits::default()),
            randomness: Arc::new(InMemoryRandomness::new(Zeroizing::new(
                rand::random::<[u8; 32]>().to_vec(),
            ))),
            reward_vault: Arc::new(InMemoryRewardVault::new(budget, VAULT_COST_PER_AWARDEE)),
            ledger: Arc::new(ledger),
            roles: Arc::new(roles),
            governance,
            proposer,
            approver,
        }
    }

    /// Register `label`'s address with the beneficiary registry
    pub fn add_beneficiary(&self, label: &str) -> Address {
        let beneficiary = Address::from_label(label);
        self.beneficiary_registry.add(beneficiary);
        beneficiary
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            beneficiary_registry: self.beneficiary_registry.clone(),
            voice_credits: self.voice_credits.clone(),
            randomness: self.randomness.clone(),
            reward_vault: self.reward_vault.clone(),
            bond_escrow: self.ledger.clone(),
            incentives: self.ledger.clone(),
            authorizer: self.roles.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn engine(&self) -> GrantElections {
        self.engine_with(EngineConfig::for_testing())
    }

    pub fn engine_with(&self, config: EngineConfig) -> GrantElections {
        GrantElections::new(config, self.collaborators())
    }
}
