//! Integration tests for the labeldex import, export and query commands

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Test environment with an isolated config and contact store
struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
    data_dir: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let data_dir = temp_dir.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(&config_path, "").unwrap();
        Self {
            temp_dir,
            config_path,
            data_dir,
        }
    }

    /// Run labeldex against this test env's config and store
    fn labeldex(&self) -> AssertCommand {
        let mut cmd = labeldex_cmd();
        cmd.args(["--config", self.config_path.to_str().unwrap()]);
        cmd.args(["--data-dir", self.data_dir.to_str().unwrap()]);
        cmd
    }

    fn store_file(&self) -> PathBuf {
        self.data_dir.join("contacts.json")
    }

    /// Seed the store directly, bypassing import.
    fn seed_store(&self, contacts_json: &str) {
        fs::write(self.store_file(), contacts_json).unwrap();
    }

    fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}

fn labeldex_cmd() -> AssertCommand {
    AssertCommand::cargo_bin("labeldex").unwrap()
}

const TWO_CONTACTS: &str = r#"[
  {
    "name": "John Doe",
    "address_lines": ["John Doe", "1 Main St", "Springfield, IL 62701"],
    "full_address": "John Doe\n1 Main St\nSpringfield, IL 62701",
    "sort_key": "DOE"
  },
  {
    "name": "Dr. Jane Zürcher",
    "address_lines": ["Dr. Jane Zürcher", "5 Oak Ave", "Portland, OR 97201"],
    "full_address": "Dr. Jane Zürcher\n5 Oak Ave\nPortland, OR 97201",
    "sort_key": "ZÜRCHER"
  }
]"#;

// =============================================================================
// Export
// =============================================================================

#[test]
fn export_writes_a_docx_package() {
    let env = TestEnv::new();
    env.seed_store(TWO_CONTACTS);
    let out = env.path("labels.docx");

    env.labeldex()
        .args(["export", "-o", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 label(s)"));

    let bytes = fs::read(&out).unwrap();
    // ZIP local file header magic
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn export_fails_when_the_store_is_empty() {
    let env = TestEnv::new();
    let out = env.path("labels.docx");

    env.labeldex()
        .args(["export", "-o", out.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no contacts in store"));
    assert!(!out.exists());
}

// =============================================================================
// Import
// =============================================================================

#[test]
fn export_then_import_round_trips_contacts() {
    let env = TestEnv::new();
    env.seed_store(TWO_CONTACTS);
    let out = env.path("labels.docx");

    env.labeldex()
        .args(["export", "-o", out.to_str().unwrap()])
        .assert()
        .success();

    // Import into a fresh store
    let env2 = TestEnv::new();
    env2.labeldex()
        .args(["import", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 contact(s)"));

    let stored = fs::read_to_string(env2.store_file()).unwrap();
    assert!(stored.contains("1 Main St"));
    assert!(stored.contains("Zürcher"));
}

#[test]
fn import_merges_unless_replace_is_given() {
    let env = TestEnv::new();
    env.seed_store(TWO_CONTACTS);
    let out = env.path("labels.docx");
    env.labeldex()
        .args(["export", "-o", out.to_str().unwrap()])
        .assert()
        .success();

    // Merging doubles the store
    env.labeldex()
        .args(["import", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 in store"));

    // --replace resets it
    env.labeldex()
        .args(["import", out.to_str().unwrap(), "--replace"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 in store"));
}

#[test]
fn import_rejects_a_missing_file() {
    let env = TestEnv::new();
    env.labeldex()
        .args(["import", "/nonexistent/addresses.docx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn import_rejects_an_unsupported_extension() {
    let env = TestEnv::new();
    let input = env.path("addresses.txt");
    fs::write(&input, "John Doe\n1 Main St\n").unwrap();

    env.labeldex()
        .args(["import", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported"));
}

// =============================================================================
// Query
// =============================================================================

#[test]
fn query_matches_across_the_whole_address() {
    let env = TestEnv::new();
    env.seed_store(TWO_CONTACTS);

    env.labeldex()
        .args(["query", "springfield"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 contact(s)"))
        .stdout(predicate::str::contains("DOE\tJohn Doe, 1 Main St"));
}

#[test]
fn query_is_accent_insensitive() {
    let env = TestEnv::new();
    env.seed_store(TWO_CONTACTS);

    env.labeldex()
        .args(["query", "zurcher"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Jane Zürcher"));
}

#[test]
fn query_reports_when_nothing_matches() {
    let env = TestEnv::new();
    env.seed_store(TWO_CONTACTS);

    env.labeldex()
        .args(["query", "gotham"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No matches for \"gotham\""));
}
