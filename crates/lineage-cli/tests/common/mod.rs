//! Shared test utilities for lineage-cli integration tests.

// Helpers are used by different test files; each is compiled separately.
#![allow(dead_code)]

use std::io::Write;

use lineage_cli::CliConfig;

/// Builds a well-formed person hash from a small number.
pub fn hash(n: u32) -> String {
    format!("0x{:064x}", n)
}

/// Writes a fixture where every `(parent, children)` pair becomes an entry.
pub fn write_fixture(families: &[(u32, Option<&str>, &[u32])]) -> tempfile::NamedTempFile {
    let people: Vec<String> = families
        .iter()
        .map(|(parent, tag, children)| {
            let children: Vec<String> = children
                .iter()
                .map(|c| format!(r#"{{"hash": "{}"}}"#, hash(*c)))
                .collect();
            let tag = tag.map_or("null".to_string(), |t| format!("\"{}\"", t));
            format!(
                r#"{{"hash": "{}", "tag": {}, "children": [{}]}}"#,
                hash(*parent),
                tag,
                children.join(", ")
            )
        })
        .collect();

    let mut file = tempfile::NamedTempFile::new().expect("create fixture file");
    write!(file, r#"{{"people": [{}]}}"#, people.join(", ")).expect("write fixture");
    file
}

/// Default configuration pointing at `fixture`.
pub fn config_for(fixture: &tempfile::NamedTempFile) -> CliConfig {
    let mut config = CliConfig::default();
    config.store.fixture = Some(fixture.path().display().to_string());
    config
}
