//! End-to-end coverage of the literal scenarios in spec.md §8: index a
//! small C file with `ic`, then query and inspect the store with `qi`.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn write_foo_c(dir: &Path) {
    fs::write(
        dir.join("foo.c"),
        "int main(int argc, char **argv){ return 0; }\n",
    )
    .expect("write foo.c");
}

#[test]
fn indexing_foo_c_then_querying_main_returns_one_row() {
    let dir = tempdir().expect("tempdir");
    write_foo_c(dir.path());
    let db = dir.path().join("code-index.db");

    Command::cargo_bin("ic")
        .expect("ic binary")
        .env("HOME", dir.path())
        .arg(dir.path())
        .arg("--once")
        .arg("--db-file")
        .arg(&db)
        .assert()
        .success();

    Command::cargo_bin("qi")
        .expect("qi binary")
        .env("HOME", dir.path())
        .arg("main")
        .arg("--db-file")
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("main"));
}

#[test]
fn reindexing_after_appending_a_function_keeps_earlier_records() {
    let dir = tempdir().expect("tempdir");
    write_foo_c(dir.path());
    let db = dir.path().join("code-index.db");

    Command::cargo_bin("ic")
        .expect("ic binary")
        .env("HOME", dir.path())
        .arg(dir.path().join("foo.c"))
        .arg("--once")
        .arg("--db-file")
        .arg(&db)
        .assert()
        .success();

    fs::write(
        dir.path().join("foo.c"),
        "int main(int argc, char **argv){ return 0; }\n\nint helper(){return 1;}\n",
    )
    .expect("append helper");

    Command::cargo_bin("ic")
        .expect("ic binary")
        .env("HOME", dir.path())
        .arg(dir.path().join("foo.c"))
        .arg("--once")
        .arg("--db-file")
        .arg(&db)
        .assert()
        .success();

    Command::cargo_bin("qi")
        .expect("qi binary")
        .env("HOME", dir.path())
        .arg("%")
        .arg("-f")
        .arg("foo.c")
        .arg("--toc")
        .arg("--db-file")
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("main").and(predicate::str::contains("helper")));
}

#[test]
fn toc_rejects_context_tags_outside_the_closed_set() {
    let dir = tempdir().expect("tempdir");
    write_foo_c(dir.path());
    let db = dir.path().join("code-index.db");

    Command::cargo_bin("ic")
        .expect("ic binary")
        .env("HOME", dir.path())
        .arg(dir.path())
        .arg("--once")
        .arg("--db-file")
        .arg(&db)
        .assert()
        .success();

    // argc/argv are `argument` records, outside the TOC's closed tag set.
    Command::cargo_bin("qi")
        .expect("qi binary")
        .env("HOME", dir.path())
        .arg("argc")
        .arg("--toc")
        .arg("--db-file")
        .arg(&db)
        .assert()
        .success()
        .stderr(predicate::str::contains("not supported in --toc mode"));
}

#[test]
fn proximity_search_requires_every_secondary_pattern_within_window() {
    let dir = tempdir().expect("tempdir");
    write_foo_c(dir.path());
    let db = dir.path().join("code-index.db");

    Command::cargo_bin("ic")
        .expect("ic binary")
        .env("HOME", dir.path())
        .arg(dir.path())
        .arg("--once")
        .arg("--db-file")
        .arg(&db)
        .assert()
        .success();

    Command::cargo_bin("qi")
        .expect("qi binary")
        .env("HOME", dir.path())
        .args(["argc", "argv", "--and", "5", "--db-file"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("argc"));

    Command::cargo_bin("qi")
        .expect("qi binary")
        .env("HOME", dir.path())
        .args(["argc", "nosuch", "--and", "5", "--db-file"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("no rows matched"));
}
