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

//! JSON deserialization of Ethereum test formats.

#[macro_use]
extern crate serde_derive;

pub mod bytes;
pub mod hash;
pub mod maybe;
pub mod state;
pub mod uint;

pub use self::{
    bytes::Bytes,
    hash::{Address, H256},
    maybe::MaybeEmpty,
    uint::Uint,
};
