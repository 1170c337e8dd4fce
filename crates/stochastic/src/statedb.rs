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

//! The StateDB contract consumed by the replayer, and a small in-memory
//! reference implementation used by tests and smoke runs.

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use keccak_hash::{keccak, KECCAK_EMPTY};
use std::collections::HashMap;

/// The narrow StateDB surface the replayer drives.
///
/// Implementations accumulate failures internally; the replayer harvests
/// them through [`StateDb::error`] between operations and never interprets
/// return values beyond pass-through.
pub trait StateDb {
    /// Opens a sync period.
    fn begin_sync_period(&mut self, number: u64);
    /// Closes the current sync period.
    fn end_sync_period(&mut self);
    /// Opens a block.
    fn begin_block(&mut self, number: u64);
    /// Closes the current block.
    fn end_block(&mut self);
    /// Opens a transaction.
    fn begin_transaction(&mut self, number: u32);
    /// Closes the current transaction.
    fn end_transaction(&mut self);

    /// Creates an account.
    fn create_account(&mut self, address: &Address);
    /// Creates a contract account.
    fn create_contract(&mut self, address: &Address);
    /// Whether the account exists.
    fn exists(&mut self, address: &Address) -> bool;
    /// Whether the account is empty.
    fn is_empty(&mut self, address: &Address) -> bool;
    /// Schedules the account for destruction.
    fn self_destruct(&mut self, address: &Address);
    /// EIP-6780 destruction: only effective for accounts created in the
    /// current transaction.
    fn self_destruct_6780(&mut self, address: &Address);
    /// Whether the account is scheduled for destruction.
    fn has_self_destructed(&mut self, address: &Address) -> bool;

    /// Account balance.
    fn balance(&mut self, address: &Address) -> U256;
    /// Credits the account balance.
    fn add_balance(&mut self, address: &Address, amount: U256);
    /// Debits the account balance.
    fn sub_balance(&mut self, address: &Address, amount: U256);
    /// Account nonce.
    fn nonce(&mut self, address: &Address) -> u64;
    /// Writes the account nonce.
    fn set_nonce(&mut self, address: &Address, nonce: u64);
    /// Account code.
    fn code(&mut self, address: &Address) -> Bytes;
    /// Installs account code.
    fn set_code(&mut self, address: &Address, code: Bytes);
    /// Account code hash.
    fn code_hash(&mut self, address: &Address) -> H256;
    /// Account code size.
    fn code_size(&mut self, address: &Address) -> usize;

    /// Reads a storage slot.
    fn storage_at(&mut self, address: &Address, key: &H256) -> H256;
    /// Writes a storage slot.
    fn set_storage(&mut self, address: &Address, key: &H256, value: &H256);
    /// Reads the slot value as committed at the start of the transaction.
    fn committed_storage_at(&mut self, address: &Address, key: &H256) -> H256;
    /// Reads a transient storage slot.
    fn transient_storage_at(&mut self, address: &Address, key: &H256) -> H256;
    /// Writes a transient storage slot.
    fn set_transient_storage(&mut self, address: &Address, key: &H256, value: &H256);
    /// The account storage root.
    fn storage_root(&mut self, address: &Address) -> H256;

    /// Takes a snapshot, returning its handle.
    fn snapshot(&mut self) -> i32;
    /// Reverts to an outstanding snapshot handle.
    fn revert_to_snapshot(&mut self, id: i32);

    /// The cumulative error recorded so far, if any.
    fn error(&self) -> Option<String>;
}

#[derive(Debug, Clone, Default, PartialEq)]
struct MemAccount {
    balance: U256,
    nonce: u64,
    code: Bytes,
    storage: HashMap<H256, H256>,
    self_destructed: bool,
    created_this_tx: bool,
}

/// An in-memory [`StateDb`] with full snapshot support.
///
/// Snapshots clone the world state; adequate for a test double, not for a
/// production backend.
#[derive(Debug, Default)]
pub struct InMemoryStateDb {
    accounts: HashMap<Address, MemAccount>,
    committed: HashMap<(Address, H256), H256>,
    transient: HashMap<(Address, H256), H256>,
    snapshots: Vec<HashMap<Address, MemAccount>>,
    error: Option<String>,
}

impl InMemoryStateDb {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    fn account_mut(&mut self, address: &Address) -> &mut MemAccount {
        self.accounts.entry(*address).or_default()
    }

    fn record_error(&mut self, message: String) {
        match &mut self.error {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(&message);
            }
            None => self.error = Some(message),
        }
    }
}

impl StateDb for InMemoryStateDb {
    fn begin_sync_period(&mut self, _number: u64) {}

    fn end_sync_period(&mut self) {}

    fn begin_block(&mut self, _number: u64) {}

    fn end_block(&mut self) {
        let doomed: Vec<Address> = self
            .accounts
            .iter()
            .filter(|(_, acc)| acc.self_destructed)
            .map(|(addr, _)| *addr)
            .collect();
        for address in doomed {
            self.accounts.remove(&address);
        }
    }

    fn begin_transaction(&mut self, _number: u32) {
        self.committed.clear();
        for (address, account) in &self.accounts {
            for (key, value) in &account.storage {
                self.committed.insert((*address, *key), *value);
            }
        }
        for account in self.accounts.values_mut() {
            account.created_this_tx = false;
        }
        self.snapshots.clear();
    }

    fn end_transaction(&mut self) {
        self.transient.clear();
        self.snapshots.clear();
    }

    fn create_account(&mut self, address: &Address) {
        let account = self.account_mut(address);
        *account = MemAccount {
            created_this_tx: true,
            ..MemAccount::default()
        };
    }

    fn create_contract(&mut self, address: &Address) {
        self.account_mut(address).created_this_tx = true;
    }

    fn exists(&mut self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    fn is_empty(&mut self, address: &Address) -> bool {
        match self.accounts.get(address) {
            Some(acc) => acc.balance.is_zero() && acc.nonce == 0 && acc.code.is_empty(),
            None => true,
        }
    }

    fn self_destruct(&mut self, address: &Address) {
        let account = self.account_mut(address);
        account.self_destructed = true;
        account.balance = U256::zero();
    }

    fn self_destruct_6780(&mut self, address: &Address) {
        let account = self.account_mut(address);
        if account.created_this_tx {
            account.self_destructed = true;
            account.balance = U256::zero();
        }
    }

    fn has_self_destructed(&mut self, address: &Address) -> bool {
        self.accounts
            .get(address)
            .map_or(false, |acc| acc.self_destructed)
    }

    fn balance(&mut self, address: &Address) -> U256 {
        self.accounts
            .get(address)
            .map_or_else(U256::zero, |acc| acc.balance)
    }

    fn add_balance(&mut self, address: &Address, amount: U256) {
        let account = self.account_mut(address);
        account.balance = account.balance.saturating_add(amount);
    }

    fn sub_balance(&mut self, address: &Address, amount: U256) {
        let balance = self.balance(address);
        if amount > balance {
            self.record_error(format!(
                "balance underflow at {address:?}: {amount} > {balance}"
            ));
            return;
        }
        self.account_mut(address).balance = balance - amount;
    }

    fn nonce(&mut self, address: &Address) -> u64 {
        self.accounts.get(address).map_or(0, |acc| acc.nonce)
    }

    fn set_nonce(&mut self, address: &Address, nonce: u64) {
        self.account_mut(address).nonce = nonce;
    }

    fn code(&mut self, address: &Address) -> Bytes {
        self.accounts
            .get(address)
            .map_or_else(Bytes::new, |acc| acc.code.clone())
    }

    fn set_code(&mut self, address: &Address, code: Bytes) {
        self.account_mut(address).code = code;
    }

    fn code_hash(&mut self, address: &Address) -> H256 {
        self.accounts
            .get(address)
            .map_or(KECCAK_EMPTY, |acc| keccak(&acc.code))
    }

    fn code_size(&mut self, address: &Address) -> usize {
        self.accounts.get(address).map_or(0, |acc| acc.code.len())
    }

    fn storage_at(&mut self, address: &Address, key: &H256) -> H256 {
        self.accounts
            .get(address)
            .and_then(|acc| acc.storage.get(key))
            .copied()
            .unwrap_or_default()
    }

    fn set_storage(&mut self, address: &Address, key: &H256, value: &H256) {
        self.account_mut(address).storage.insert(*key, *value);
    }

    fn committed_storage_at(&mut self, address: &Address, key: &H256) -> H256 {
        self.committed
            .get(&(*address, *key))
            .copied()
            .unwrap_or_default()
    }

    fn transient_storage_at(&mut self, address: &Address, key: &H256) -> H256 {
        self.transient
            .get(&(*address, *key))
            .copied()
            .unwrap_or_default()
    }

    fn set_transient_storage(&mut self, address: &Address, key: &H256, value: &H256) {
        self.transient.insert((*address, *key), *value);
    }

    fn storage_root(&mut self, address: &Address) -> H256 {
        // order-independent digest over the account storage
        let account = match self.accounts.get(address) {
            Some(acc) => acc,
            None => return KECCAK_EMPTY,
        };
        let mut entries: Vec<(&H256, &H256)> = account.storage.iter().collect();
        entries.sort();
        let mut blob = Vec::with_capacity(entries.len() * 64);
        for (key, value) in entries {
            blob.extend_from_slice(key.as_bytes());
            blob.extend_from_slice(value.as_bytes());
        }
        keccak(&blob)
    }

    fn snapshot(&mut self) -> i32 {
        self.snapshots.push(self.accounts.clone());
        self.snapshots.len() as i32 - 1
    }

    fn revert_to_snapshot(&mut self, id: i32) {
        let index = id as usize;
        if id < 0 || index >= self.snapshots.len() {
            self.record_error(format!("unknown snapshot handle {id}"));
            return;
        }
        self.accounts = self.snapshots[index].clone();
        self.snapshots.truncate(index);
    }

    fn error(&self) -> Option<String> {
        self.error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryStateDb, StateDb};
    use ethereum_types::{Address, H256, U256};

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn hash(byte: u8) -> H256 {
        H256::repeat_byte(byte)
    }

    #[test]
    fn account_lifecycle() {
        let mut db = InMemoryStateDb::new();
        let a = addr(1);
        assert!(!db.exists(&a));
        db.create_account(&a);
        assert!(db.exists(&a));
        assert!(db.is_empty(&a));
        db.add_balance(&a, U256::from(100));
        assert!(!db.is_empty(&a));
        db.sub_balance(&a, U256::from(40));
        assert_eq!(db.balance(&a), U256::from(60));
        assert_eq!(db.error(), None);
    }

    #[test]
    fn balance_underflow_is_recorded_not_fatal() {
        let mut db = InMemoryStateDb::new();
        let a = addr(1);
        db.create_account(&a);
        db.sub_balance(&a, U256::from(1));
        assert!(db.error().unwrap().contains("underflow"));
    }

    #[test]
    fn snapshot_revert_restores_state() {
        let mut db = InMemoryStateDb::new();
        let a = addr(1);
        db.create_account(&a);
        db.set_storage(&a, &hash(1), &hash(2));
        let snap = db.snapshot();
        db.set_storage(&a, &hash(1), &hash(3));
        db.set_nonce(&a, 9);
        db.revert_to_snapshot(snap);
        assert_eq!(db.storage_at(&a, &hash(1)), hash(2));
        assert_eq!(db.nonce(&a), 0);
        assert_eq!(db.error(), None);
    }

    #[test]
    fn revert_to_unknown_snapshot_records_error() {
        let mut db = InMemoryStateDb::new();
        db.revert_to_snapshot(3);
        assert!(db.error().unwrap().contains("snapshot"));
    }

    #[test]
    fn transient_storage_clears_at_transaction_end() {
        let mut db = InMemoryStateDb::new();
        let a = addr(1);
        db.begin_transaction(0);
        db.set_transient_storage(&a, &hash(1), &hash(5));
        assert_eq!(db.transient_storage_at(&a, &hash(1)), hash(5));
        db.end_transaction();
        assert_eq!(db.transient_storage_at(&a, &hash(1)), H256::zero());
    }

    #[test]
    fn committed_storage_is_transaction_start_view() {
        let mut db = InMemoryStateDb::new();
        let a = addr(1);
        db.create_account(&a);
        db.set_storage(&a, &hash(1), &hash(2));
        db.begin_transaction(0);
        db.set_storage(&a, &hash(1), &hash(7));
        assert_eq!(db.storage_at(&a, &hash(1)), hash(7));
        assert_eq!(db.committed_storage_at(&a, &hash(1)), hash(2));
    }

    #[test]
    fn self_destructed_accounts_vanish_at_block_end() {
        let mut db = InMemoryStateDb::new();
        let a = addr(1);
        db.create_account(&a);
        db.add_balance(&a, U256::from(5));
        db.self_destruct(&a);
        assert!(db.has_self_destructed(&a));
        assert_eq!(db.balance(&a), U256::zero());
        db.end_block();
        assert!(!db.exists(&a));
    }

    #[test]
    fn self_destruct_6780_only_kills_fresh_accounts() {
        let mut db = InMemoryStateDb::new();
        let old = addr(1);
        db.create_account(&old);
        db.begin_transaction(0);
        let fresh = addr(2);
        db.create_account(&fresh);
        db.self_destruct_6780(&old);
        db.self_destruct_6780(&fresh);
        assert!(!db.has_self_destructed(&old));
        assert!(db.has_self_destructed(&fresh));
    }
}
