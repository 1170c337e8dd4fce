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

//! The closed, ordered set of recognised protocol forks.

use std::fmt;

/// A protocol upgrade level, ordered from genesis onward.
///
/// `Paris` and `Merge` name the same point; parsing accepts both and the
/// public label is `Merge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Fork {
    /// Frontier.
    Frontier,
    /// Homestead.
    Homestead,
    /// Tangerine Whistle.
    EIP150,
    /// Spurious Dragon.
    EIP158,
    /// Byzantium.
    Byzantium,
    /// Constantinople.
    Constantinople,
    /// Petersburg.
    ConstantinopleFix,
    /// Istanbul.
    Istanbul,
    /// Berlin.
    Berlin,
    /// London.
    London,
    /// Paris, the merge.
    Merge,
    /// Shanghai.
    Shanghai,
    /// Cancun.
    Cancun,
    /// Prague.
    Prague,
}

/// Every recognised fork, oldest first.
pub const ALL_FORKS: [Fork; 14] = [
    Fork::Frontier,
    Fork::Homestead,
    Fork::EIP150,
    Fork::EIP158,
    Fork::Byzantium,
    Fork::Constantinople,
    Fork::ConstantinopleFix,
    Fork::Istanbul,
    Fork::Berlin,
    Fork::London,
    Fork::Merge,
    Fork::Shanghai,
    Fork::Cancun,
    Fork::Prague,
];

impl Fork {
    /// Parses a fork name; `Paris` is accepted as an alias of `Merge`.
    pub fn from_name(name: &str) -> Option<Fork> {
        match name {
            "Frontier" => Some(Fork::Frontier),
            "Homestead" => Some(Fork::Homestead),
            "EIP150" => Some(Fork::EIP150),
            "EIP158" => Some(Fork::EIP158),
            "Byzantium" => Some(Fork::Byzantium),
            "Constantinople" => Some(Fork::Constantinople),
            "ConstantinopleFix" => Some(Fork::ConstantinopleFix),
            "Istanbul" => Some(Fork::Istanbul),
            "Berlin" => Some(Fork::Berlin),
            "London" => Some(Fork::London),
            "Paris" | "Merge" => Some(Fork::Merge),
            "Shanghai" => Some(Fork::Shanghai),
            "Cancun" => Some(Fork::Cancun),
            "Prague" => Some(Fork::Prague),
            _ => None,
        }
    }

    /// The public fork label.
    pub fn name(self) -> &'static str {
        match self {
            Fork::Frontier => "Frontier",
            Fork::Homestead => "Homestead",
            Fork::EIP150 => "EIP150",
            Fork::EIP158 => "EIP158",
            Fork::Byzantium => "Byzantium",
            Fork::Constantinople => "Constantinople",
            Fork::ConstantinopleFix => "ConstantinopleFix",
            Fork::Istanbul => "Istanbul",
            Fork::Berlin => "Berlin",
            Fork::London => "London",
            Fork::Merge => "Merge",
            Fork::Shanghai => "Shanghai",
            Fork::Cancun => "Cancun",
            Fork::Prague => "Prague",
        }
    }

    /// Whether EIP-1559 fee semantics apply.
    pub fn is_london(self) -> bool {
        self >= Fork::London
    }

    /// Whether EIP-4844 blob semantics apply.
    pub fn is_cancun(self) -> bool {
        self >= Fork::Cancun
    }

    /// EIP-4844 blob base-fee update fraction.
    pub fn blob_base_fee_update_fraction(self) -> u64 {
        if self >= Fork::Prague {
            5_007_716
        } else {
            3_338_477
        }
    }
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Expands user-supplied fork names to the recognised set.
///
/// `"all"` expands to every fork; unknown names are dropped with a
/// warning.
pub fn expand_forks(names: &[String]) -> Vec<Fork> {
    let mut forks = Vec::new();
    for name in names {
        if name.eq_ignore_ascii_case("all") {
            for fork in ALL_FORKS {
                if !forks.contains(&fork) {
                    forks.push(fork);
                }
            }
            continue;
        }
        match Fork::from_name(name) {
            Some(fork) if !forks.contains(&fork) => forks.push(fork),
            Some(_) => {}
            None => warn!(target: "statetests", "dropping unknown fork name {name}"),
        }
    }
    forks
}

#[cfg(test)]
mod tests {
    use super::{expand_forks, Fork, ALL_FORKS};

    #[test]
    fn names_round_trip() {
        for fork in ALL_FORKS {
            assert_eq!(Fork::from_name(fork.name()), Some(fork));
        }
    }

    #[test]
    fn paris_normalises_to_merge() {
        assert_eq!(Fork::from_name("Paris"), Some(Fork::Merge));
        assert_eq!(Fork::from_name("Paris").unwrap().name(), "Merge");
        assert_eq!(Fork::Merge.to_string(), "Merge");
    }

    #[test]
    fn ordering_matches_history() {
        assert!(Fork::Frontier < Fork::Homestead);
        assert!(Fork::Berlin < Fork::London);
        assert!(Fork::London < Fork::Merge);
        assert!(!Fork::Berlin.is_london());
        assert!(Fork::London.is_london());
        assert!(Fork::Merge.is_london());
        assert!(!Fork::Shanghai.is_cancun());
        assert!(Fork::Cancun.is_cancun());
    }

    #[test]
    fn blob_fee_fraction_steps_at_prague() {
        assert_eq!(Fork::Cancun.blob_base_fee_update_fraction(), 3_338_477);
        assert_eq!(Fork::Prague.blob_base_fee_update_fraction(), 5_007_716);
    }

    #[test]
    fn expand_handles_all_and_unknown_names() {
        let forks = expand_forks(&[
            "London".to_owned(),
            "NotAFork".to_owned(),
            "Paris".to_owned(),
        ]);
        assert_eq!(forks, vec![Fork::London, Fork::Merge]);

        let all = expand_forks(&["all".to_owned()]);
        assert_eq!(all.len(), ALL_FORKS.len());

        // duplicates collapse
        let twice = expand_forks(&["London".to_owned(), "London".to_owned()]);
        assert_eq!(twice, vec![Fork::London]);
    }
}
