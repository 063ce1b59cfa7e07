//! Indexes the checked-in Rust fixture tree and queries across nested
//! modules, exercising the Rust backend's scope/parent attribution
//! through the real CLI rather than the unit-level visitor tests.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn indexing_the_fixture_tree_surfaces_nested_definitions() {
    let fixture_root = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/rust_repo");
    let work = tempdir().expect("tempdir");
    let db = work.path().join("code-index.db");

    Command::cargo_bin("ic")
        .expect("ic binary")
        .env("HOME", work.path())
        .arg(fixture_root)
        .arg("--once")
        .arg("--db-file")
        .arg(&db)
        .assert()
        .success();

    Command::cargo_bin("qi")
        .expect("qi binary")
        .env("HOME", work.path())
        .arg("depth")
        .arg("--db-file")
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("depth"));

    Command::cargo_bin("qi")
        .expect("qi binary")
        .env("HOME", work.path())
        .arg("greeter")
        .arg("--db-file")
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("greeter"));
}
