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

//! Filesystem discovery of state-test files.

use crate::error::Error;
use ethjson::state::{StateTest, Test};
use std::{fs, path::Path};
use walkdir::WalkDir;

/// The test category a path is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCategory {
    /// General state tests.
    StateTests,
    /// Blockchain tests — not served by this crate.
    BlockchainTests,
}

/// Subdirectory holding general state tests inside a test-suite checkout.
const STATE_TEST_DIRS: [&str; 2] = ["GeneralStateTests", "LegacyTests"];

/// Loads every test case reachable from `path`.
///
/// A single JSON file is parsed as one container; a directory is walked
/// for `GeneralStateTests/**.json` (and analogous directories), falling
/// back to every JSON file beneath the path when no such directory
/// exists. Requesting a non-state-test category is an error.
pub fn discover(path: &Path, category: TestCategory) -> Result<Vec<(String, StateTest)>, Error> {
    match category {
        TestCategory::StateTests => {}
        TestCategory::BlockchainTests => {
            return Err(Error::UnsupportedCategory("blockchain"));
        }
    }
    if path.is_file() {
        return parse_file(path);
    }
    let mut roots: Vec<_> = STATE_TEST_DIRS
        .iter()
        .map(|dir| path.join(dir))
        .filter(|dir| dir.is_dir())
        .collect();
    if roots.is_empty() {
        roots.push(path.to_path_buf());
    }
    let mut cases = Vec::new();
    for root in roots {
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if entry.file_type().is_file()
                && entry.path().extension().map_or(false, |ext| ext == "json")
            {
                cases.extend(parse_file(entry.path())?);
            }
        }
    }
    Ok(cases)
}

fn parse_file(path: &Path) -> Result<Vec<(String, StateTest)>, Error> {
    let content = fs::read_to_string(path)?;
    let container: Test = serde_json::from_str(&content).map_err(|error| Error::Json {
        file: path.display().to_string(),
        error,
    })?;
    Ok(container.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::{discover, TestCategory};
    use crate::error::Error;
    use std::fs;
    use tempdir::TempDir;

    const CASE: &str = r#"{
        "CASENAME": {
            "env": {
                "currentCoinbase": "0x2adc25665018aa1fe0e6bc666dac8fc2697ff9ba",
                "currentGasLimit": "0x05f5e100",
                "currentNumber": "0x01",
                "currentTimestamp": "0x03e8"
            },
            "pre": {},
            "transaction": {
                "data": [""],
                "gasLimit": ["0x061a80"],
                "gasPrice": "0x0a",
                "nonce": "0x00",
                "secretKey": "0x45a915e4d060149eb4365960e6a7a45f334393093061116b197e3240065ff2d8",
                "to": "095e7baea6a6c7c4c2dfeb977efac326af552d87",
                "value": ["0x00"]
            },
            "post": {}
        }
    }"#;

    fn write_case(path: &std::path::Path, name: &str) {
        fs::write(path, CASE.replace("CASENAME", name)).unwrap();
    }

    #[test]
    fn single_file_parses_as_one_container() {
        let dir = TempDir::new("statetests").unwrap();
        let file = dir.path().join("one.json");
        write_case(&file, "case_a");
        let cases = discover(&file, TestCategory::StateTests).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].0, "case_a");
    }

    #[test]
    fn directory_walk_aggregates_general_state_tests() {
        let dir = TempDir::new("statetests").unwrap();
        let root = dir.path().join("GeneralStateTests");
        fs::create_dir_all(root.join("stExample")).unwrap();
        write_case(&root.join("stExample").join("a.json"), "case_a");
        write_case(&root.join("b.json"), "case_b");
        // files outside the recognised directory are ignored
        write_case(&dir.path().join("stray.json"), "stray");

        let cases = discover(dir.path(), TestCategory::StateTests).unwrap();
        let names: Vec<&str> = cases.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["case_b", "case_a"]);
    }

    #[test]
    fn plain_directory_falls_back_to_full_walk() {
        let dir = TempDir::new("statetests").unwrap();
        write_case(&dir.path().join("a.json"), "case_a");
        let cases = discover(dir.path(), TestCategory::StateTests).unwrap();
        assert_eq!(cases.len(), 1);
    }

    #[test]
    fn non_state_category_is_an_error() {
        let dir = TempDir::new("statetests").unwrap();
        assert!(matches!(
            discover(dir.path(), TestCategory::BlockchainTests),
            Err(Error::UnsupportedCategory(_))
        ));
    }

    #[test]
    fn malformed_json_names_the_file() {
        let dir = TempDir::new("statetests").unwrap();
        let file = dir.path().join("bad.json");
        fs::write(&file, "{ not json").unwrap();
        match discover(&file, TestCategory::StateTests) {
            Err(Error::Json { file: name, .. }) => assert!(name.ends_with("bad.json")),
            other => panic!("expected a json error, got {other:?}"),
        }
    }
}
