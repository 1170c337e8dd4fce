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

//! StateDB operation symbols and the opcode codec.
//!
//! An encoded opcode packs an operation id together with the argument kind
//! of each of its (address, key, value) slots, either as a positional
//! base-6 integer or as a short string label used for Markov state names.

use ethereum_types::{Address, H256};
use keccak_hash::keccak;
use std::fmt;

/// Codec errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Unknown operation mnemonic.
    UnknownMnemonic(String),
    /// Unknown operation id.
    UnknownOperation(u32),
    /// Unknown argument kind id or code character.
    UnknownArgKind(u32),
    /// The (op, kinds) combination violates the operation's arity.
    IllegalCombination {
        /// The operation.
        op: Operation,
        /// Supplied kinds in slot order.
        kinds: [ArgKind; 3],
    },
    /// A malformed opcode label.
    BadLabel(String),
    /// A negative index cannot be converted to an address or hash.
    NegativeIndex(i64),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Error::*;
        match *self {
            UnknownMnemonic(ref m) => write!(f, "unknown operation mnemonic {m}"),
            UnknownOperation(id) => write!(f, "unknown operation id {id}"),
            UnknownArgKind(id) => write!(f, "unknown argument kind {id}"),
            IllegalCombination { op, kinds } => write!(
                f,
                "argument kinds {:?} are illegal for {}-ary operation {}",
                kinds,
                op.arity(),
                op.name()
            ),
            BadLabel(ref l) => write!(f, "malformed opcode label {l}"),
            NegativeIndex(i) => write!(f, "negative argument index {i}"),
        }
    }
}

impl std::error::Error for Error {}

/// The operations issued against a StateDB under test.
///
/// Variants are ordered alphabetically; the discriminant is the stable
/// operation id.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    /// Credit an account balance.
    AddBalance,
    /// Open a block.
    BeginBlock,
    /// Open a sync period.
    BeginSyncPeriod,
    /// Open a transaction.
    BeginTransaction,
    /// Create an account.
    CreateAccount,
    /// Create a contract account.
    CreateContract,
    /// Query account emptiness.
    Empty,
    /// Close the current block.
    EndBlock,
    /// Close the current sync period.
    EndSyncPeriod,
    /// Close the current transaction.
    EndTransaction,
    /// Query account existence.
    Exist,
    /// Read an account balance.
    GetBalance,
    /// Read account code.
    GetCode,
    /// Read the account code hash.
    GetCodeHash,
    /// Read the account code size.
    GetCodeSize,
    /// Read a committed storage slot.
    GetCommittedState,
    /// Read an account nonce.
    GetNonce,
    /// Read a storage slot.
    GetState,
    /// Read the account storage root.
    GetStorageRoot,
    /// Read a transient storage slot.
    GetTransientState,
    /// Query the self-destruct flag.
    HasSelfDestructed,
    /// Revert to an outstanding snapshot.
    RevertToSnapshot,
    /// Schedule an account for destruction.
    SelfDestruct,
    /// EIP-6780 constrained destruction.
    SelfDestruct6780,
    /// Install account code.
    SetCode,
    /// Write an account nonce.
    SetNonce,
    /// Write a storage slot.
    SetState,
    /// Write a transient storage slot.
    SetTransientState,
    /// Take a state snapshot.
    Snapshot,
    /// Debit an account balance.
    SubBalance,
}

/// Number of operations.
pub const NUM_OPS: usize = 30;

/// All operations in id order.
pub const ALL_OPS: [Operation; NUM_OPS] = [
    Operation::AddBalance,
    Operation::BeginBlock,
    Operation::BeginSyncPeriod,
    Operation::BeginTransaction,
    Operation::CreateAccount,
    Operation::CreateContract,
    Operation::Empty,
    Operation::EndBlock,
    Operation::EndSyncPeriod,
    Operation::EndTransaction,
    Operation::Exist,
    Operation::GetBalance,
    Operation::GetCode,
    Operation::GetCodeHash,
    Operation::GetCodeSize,
    Operation::GetCommittedState,
    Operation::GetNonce,
    Operation::GetState,
    Operation::GetStorageRoot,
    Operation::GetTransientState,
    Operation::HasSelfDestructed,
    Operation::RevertToSnapshot,
    Operation::SelfDestruct,
    Operation::SelfDestruct6780,
    Operation::SetCode,
    Operation::SetNonce,
    Operation::SetState,
    Operation::SetTransientState,
    Operation::Snapshot,
    Operation::SubBalance,
];

impl Operation {
    /// Stable integer id.
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Looks an operation up by id.
    pub fn from_id(id: u32) -> Result<Operation, Error> {
        ALL_OPS
            .get(id as usize)
            .copied()
            .ok_or(Error::UnknownOperation(id))
    }

    /// The canonical two-letter mnemonic used in Markov state labels.
    pub fn mnemonic(self) -> &'static str {
        use self::Operation::*;
        match self {
            AddBalance => "AB",
            BeginBlock => "BB",
            BeginSyncPeriod => "BS",
            BeginTransaction => "BT",
            CreateAccount => "CA",
            CreateContract => "CC",
            Empty => "EM",
            EndBlock => "EB",
            EndSyncPeriod => "ES",
            EndTransaction => "ET",
            Exist => "EX",
            GetBalance => "GB",
            GetCode => "GC",
            GetCodeHash => "GH",
            GetCodeSize => "GZ",
            GetCommittedState => "GM",
            GetNonce => "GN",
            GetState => "GS",
            GetStorageRoot => "GR",
            GetTransientState => "GT",
            HasSelfDestructed => "HS",
            RevertToSnapshot => "RS",
            SelfDestruct => "SD",
            SelfDestruct6780 => "SX",
            SetCode => "SC",
            SetNonce => "SO",
            SetState => "SS",
            SetTransientState => "ST",
            Snapshot => "SN",
            SubBalance => "SB",
        }
    }

    /// Looks an operation up by mnemonic.
    pub fn from_mnemonic(mnemonic: &str) -> Result<Operation, Error> {
        ALL_OPS
            .iter()
            .copied()
            .find(|op| op.mnemonic() == mnemonic)
            .ok_or_else(|| Error::UnknownMnemonic(mnemonic.to_owned()))
    }

    /// Human-readable operation name.
    pub fn name(self) -> &'static str {
        use self::Operation::*;
        match self {
            AddBalance => "AddBalance",
            BeginBlock => "BeginBlock",
            BeginSyncPeriod => "BeginSyncPeriod",
            BeginTransaction => "BeginTransaction",
            CreateAccount => "CreateAccount",
            CreateContract => "CreateContract",
            Empty => "Empty",
            EndBlock => "EndBlock",
            EndSyncPeriod => "EndSyncPeriod",
            EndTransaction => "EndTransaction",
            Exist => "Exist",
            GetBalance => "GetBalance",
            GetCode => "GetCode",
            GetCodeHash => "GetCodeHash",
            GetCodeSize => "GetCodeSize",
            GetCommittedState => "GetCommittedState",
            GetNonce => "GetNonce",
            GetState => "GetState",
            GetStorageRoot => "GetStorageRoot",
            GetTransientState => "GetTransientState",
            HasSelfDestructed => "HasSelfDestructed",
            RevertToSnapshot => "RevertToSnapshot",
            SelfDestruct => "SelfDestruct",
            SelfDestruct6780 => "SelfDestruct6780",
            SetCode => "SetCode",
            SetNonce => "SetNonce",
            SetState => "SetState",
            SetTransientState => "SetTransientState",
            Snapshot => "Snapshot",
            SubBalance => "SubBalance",
        }
    }

    /// Number of leading (address, key, value) slots the operation takes.
    pub fn arity(self) -> usize {
        use self::Operation::*;
        match self {
            BeginBlock | BeginSyncPeriod | BeginTransaction | EndBlock | EndSyncPeriod
            | EndTransaction | RevertToSnapshot | Snapshot => 0,
            AddBalance | CreateAccount | CreateContract | Empty | Exist | GetBalance | GetCode
            | GetCodeHash | GetCodeSize | GetNonce | GetStorageRoot | HasSelfDestructed
            | SelfDestruct | SelfDestruct6780 | SetCode | SetNonce | SubBalance => 1,
            GetCommittedState | GetState | GetTransientState => 2,
            SetState | SetTransientState => 3,
        }
    }
}

/// How an operation argument is produced.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// The argument slot is absent.
    NoArg = 0,
    /// The literal zero argument.
    Zero = 1,
    /// Reuse the most recently chosen argument.
    Prev = 2,
    /// Reuse an argument from the recency queue, excluding the most recent.
    Recent = 3,
    /// A uniform draw from the population, avoiding the queue.
    Rand = 4,
    /// Extend the population by a fresh argument.
    New = 5,
}

/// Number of argument kinds; the base of the positional opcode encoding.
pub const NUM_ARG_KINDS: u32 = 6;

/// All argument kinds in id order.
pub const ALL_ARG_KINDS: [ArgKind; 6] = [
    ArgKind::NoArg,
    ArgKind::Zero,
    ArgKind::Prev,
    ArgKind::Recent,
    ArgKind::Rand,
    ArgKind::New,
];

impl ArgKind {
    /// Stable integer id.
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Looks a kind up by id.
    pub fn from_id(id: u32) -> Result<ArgKind, Error> {
        ALL_ARG_KINDS
            .get(id as usize)
            .copied()
            .ok_or(Error::UnknownArgKind(id))
    }

    /// Single-character code used in opcode labels; `None` for an absent
    /// slot.
    pub fn code(self) -> Option<char> {
        match self {
            ArgKind::NoArg => None,
            ArgKind::Zero => Some('z'),
            ArgKind::Prev => Some('p'),
            ArgKind::Recent => Some('q'),
            ArgKind::Rand => Some('r'),
            ArgKind::New => Some('n'),
        }
    }

    /// Looks a kind up by its label character.
    pub fn from_code(c: char) -> Result<ArgKind, Error> {
        match c {
            'z' => Ok(ArgKind::Zero),
            'p' => Ok(ArgKind::Prev),
            'q' => Ok(ArgKind::Recent),
            'r' => Ok(ArgKind::Rand),
            'n' => Ok(ArgKind::New),
            _ => Err(Error::UnknownArgKind(c as u32)),
        }
    }
}

/// Checks that the kinds fill exactly the operation's leading slots.
fn check_legal(op: Operation, kinds: [ArgKind; 3]) -> Result<(), Error> {
    let arity = op.arity();
    for (slot, kind) in kinds.iter().enumerate() {
        let filled = *kind != ArgKind::NoArg;
        if filled != (slot < arity) {
            return Err(Error::IllegalCombination { op, kinds });
        }
    }
    Ok(())
}

/// Encodes `(op, addr, key, value)` into a positional base-6 opcode.
pub fn encode_opcode(
    op: Operation,
    addr: ArgKind,
    key: ArgKind,
    value: ArgKind,
) -> Result<u32, Error> {
    check_legal(op, [addr, key, value])?;
    Ok(((op.id() * NUM_ARG_KINDS + addr.id()) * NUM_ARG_KINDS + key.id()) * NUM_ARG_KINDS
        + value.id())
}

/// Decodes a positional base-6 opcode.
pub fn decode_opcode(code: u32) -> Result<(Operation, ArgKind, ArgKind, ArgKind), Error> {
    let value = ArgKind::from_id(code % NUM_ARG_KINDS)?;
    let key = ArgKind::from_id(code / NUM_ARG_KINDS % NUM_ARG_KINDS)?;
    let addr = ArgKind::from_id(code / (NUM_ARG_KINDS * NUM_ARG_KINDS) % NUM_ARG_KINDS)?;
    let op = Operation::from_id(code / (NUM_ARG_KINDS * NUM_ARG_KINDS * NUM_ARG_KINDS))?;
    check_legal(op, [addr, key, value])?;
    Ok((op, addr, key, value))
}

/// Renders an opcode as its label: the mnemonic followed by one kind
/// character per filled slot.
pub fn encode_label(
    op: Operation,
    addr: ArgKind,
    key: ArgKind,
    value: ArgKind,
) -> Result<String, Error> {
    check_legal(op, [addr, key, value])?;
    let mut label = String::with_capacity(5);
    label.push_str(op.mnemonic());
    for kind in [addr, key, value] {
        if let Some(c) = kind.code() {
            label.push(c);
        }
    }
    Ok(label)
}

/// Parses an opcode label back into `(op, addr, key, value)`.
pub fn decode_label(label: &str) -> Result<(Operation, ArgKind, ArgKind, ArgKind), Error> {
    if label.len() < 2 || !label.is_char_boundary(2) {
        return Err(Error::BadLabel(label.to_owned()));
    }
    let (mnemonic, suffix) = label.split_at(2);
    let op = Operation::from_mnemonic(mnemonic)?;
    if suffix.len() != op.arity() {
        return Err(Error::BadLabel(label.to_owned()));
    }
    let mut kinds = [ArgKind::NoArg; 3];
    for (slot, c) in suffix.chars().enumerate() {
        kinds[slot] = ArgKind::from_code(c)?;
    }
    check_legal(op, kinds)?;
    Ok((op, kinds[0], kinds[1], kinds[2]))
}

/// Maps a non-negative argument index to its canonical 20-byte address.
///
/// Index zero is the reserved sentinel and maps to the zero address; any
/// other index hashes its decimal rendering.
pub fn to_address(index: i64) -> Result<Address, Error> {
    if index < 0 {
        return Err(Error::NegativeIndex(index));
    }
    if index == 0 {
        return Ok(Address::zero());
    }
    let hash = keccak(index.to_string().as_bytes());
    Ok(Address::from_slice(&hash[12..]))
}

/// Maps a non-negative argument index to its canonical 32-byte hash.
///
/// Index zero maps to the zero hash.
pub fn to_hash(index: i64) -> Result<H256, Error> {
    if index < 0 {
        return Err(Error::NegativeIndex(index));
    }
    if index == 0 {
        return Ok(H256::zero());
    }
    Ok(keccak(index.to_string().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_round_trip() {
        for (i, op) in ALL_OPS.iter().enumerate() {
            assert_eq!(op.id() as usize, i);
            assert_eq!(Operation::from_id(op.id()).unwrap(), *op);
        }
        assert!(Operation::from_id(NUM_OPS as u32).is_err());
    }

    #[test]
    fn mnemonics_are_unique_two_letter_codes() {
        let mut seen = HashSet::new();
        for op in &ALL_OPS {
            let m = op.mnemonic();
            assert_eq!(m.len(), 2);
            assert!(seen.insert(m), "duplicate mnemonic {m}");
            assert_eq!(Operation::from_mnemonic(m).unwrap(), *op);
        }
        assert!(Operation::from_mnemonic("??").is_err());
    }

    fn legal_kinds(slot: usize, arity: usize) -> Vec<ArgKind> {
        if slot < arity {
            vec![
                ArgKind::Zero,
                ArgKind::Prev,
                ArgKind::Recent,
                ArgKind::Rand,
                ArgKind::New,
            ]
        } else {
            vec![ArgKind::NoArg]
        }
    }

    #[test]
    fn codec_round_trips_every_legal_combination() {
        for op in &ALL_OPS {
            let arity = op.arity();
            for &a in &legal_kinds(0, arity) {
                for &k in &legal_kinds(1, arity) {
                    for &v in &legal_kinds(2, arity) {
                        let code = encode_opcode(*op, a, k, v).unwrap();
                        assert_eq!(decode_opcode(code).unwrap(), (*op, a, k, v));
                        let label = encode_label(*op, a, k, v).unwrap();
                        assert_eq!(decode_label(&label).unwrap(), (*op, a, k, v));
                    }
                }
            }
        }
    }

    #[test]
    fn codec_rejects_illegal_combinations() {
        // unary operation with an empty leading slot
        assert!(encode_opcode(
            Operation::AddBalance,
            ArgKind::NoArg,
            ArgKind::NoArg,
            ArgKind::NoArg
        )
        .is_err());
        // nullary operation with a filled slot
        assert!(encode_opcode(
            Operation::BeginBlock,
            ArgKind::Rand,
            ArgKind::NoArg,
            ArgKind::NoArg
        )
        .is_err());
        // filled slot after a hole
        assert!(encode_opcode(
            Operation::SetState,
            ArgKind::Rand,
            ArgKind::NoArg,
            ArgKind::Rand
        )
        .is_err());
        // encoded form of an illegal combination fails to decode
        let illegal = Operation::BeginBlock.id() * 216 + ArgKind::Rand.id() * 36;
        assert!(decode_opcode(illegal).is_err());
    }

    #[test]
    fn labels_use_mnemonic_and_kind_codes() {
        let label = encode_label(
            Operation::SetState,
            ArgKind::Rand,
            ArgKind::New,
            ArgKind::Zero,
        )
        .unwrap();
        assert_eq!(label, "SSrnz");
        assert_eq!(
            encode_label(
                Operation::BeginSyncPeriod,
                ArgKind::NoArg,
                ArgKind::NoArg,
                ArgKind::NoArg
            )
            .unwrap(),
            "BS"
        );
        assert!(decode_label("SSrn").is_err());
        assert!(decode_label("S").is_err());
        assert!(decode_label("??r").is_err());
    }

    #[test]
    fn index_conversions() {
        assert_eq!(to_address(0).unwrap(), Address::zero());
        assert_eq!(to_hash(0).unwrap(), H256::zero());
        assert!(to_address(-1).is_err());
        assert!(to_hash(-1).is_err());

        let hash = keccak(b"10");
        assert_eq!(to_hash(10).unwrap(), hash);
        assert_eq!(to_address(10).unwrap(), Address::from_slice(&hash[12..]));
        // distinct indices map to distinct addresses
        assert_ne!(to_address(1).unwrap(), to_address(2).unwrap());
    }
}
