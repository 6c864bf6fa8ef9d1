// tests/cli_test.rs
mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use support::TestRepo;

/// The binary run inside `repo` with a clean SEMVER_* environment
fn git_semver(repo: &TestRepo) -> Command {
    let mut cmd = Command::cargo_bin("git-semver").expect("binary");
    cmd.current_dir(repo.path());
    for var in [
        "SEMVER_REMOTE_NAME",
        "SEMVER_PRE_PREFIX",
        "SEMVER_USER_NAME",
        "SEMVER_USER_EMAIL",
        "SEMVER_BRANCH",
        "SEMVER_DEBUG",
        "GIT_BRANCH",
        "BRANCH_NAME",
        "GIT_DIR",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help() {
    Command::cargo_bin("git-semver")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("semver"));
}

#[test]
fn test_version_flag() {
    Command::cargo_bin("git-semver")
        .expect("binary")
        .arg("--version")
        .assert()
        .success()
        .stdout(contains(concat!("git-semver ", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_missing_ledger_exits_with_one() {
    let repo = TestRepo::init().unwrap();

    git_semver(&repo)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(contains("git-semver init"));
}

#[test]
fn test_not_a_repository() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("git-semver")
        .expect("binary")
        .arg("-C")
        .arg(dir.path())
        .env_remove("GIT_DIR")
        .assert()
        .code(1)
        .stderr(contains("Not a git repository"));
}

#[test]
fn test_init_bump_show() {
    let repo = TestRepo::init().unwrap();

    git_semver(&repo)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    git_semver(&repo).assert().success().stdout("0.0.0\n");

    git_semver(&repo).args(["bump", "minor"]).assert().success();
    git_semver(&repo).assert().success().stdout("0.1.0\n");

    git_semver(&repo)
        .args(["bump", "pre", "--pre", "rc"])
        .assert()
        .success();
    git_semver(&repo).assert().success().stdout("0.1.1-rc.1\n");

    git_semver(&repo).args(["bump", "final"]).assert().success();
    git_semver(&repo).assert().success().stdout("0.1.1\n");
}

#[test]
fn test_init_with_version_and_force() {
    let repo = TestRepo::init().unwrap();

    git_semver(&repo)
        .args(["init", "--version", "v1.4.0"])
        .assert()
        .success();
    git_semver(&repo)
        .args(["init", "--version", "9.9.9"])
        .assert()
        .success();
    git_semver(&repo).assert().success().stdout("1.4.0\n");

    git_semver(&repo)
        .args(["init", "--version", "9.9.9", "--force"])
        .assert()
        .success();
    git_semver(&repo).assert().success().stdout("9.9.9\n");
}

#[test]
fn test_invalid_axis() {
    let repo = TestRepo::init().unwrap();
    git_semver(&repo).arg("init").assert().success();

    git_semver(&repo)
        .args(["bump", "sideways"])
        .assert()
        .code(1)
        .stderr(contains("sideways"));
}

#[test]
fn test_invalid_init_version() {
    let repo = TestRepo::init().unwrap();

    git_semver(&repo)
        .args(["init", "--version", "1.2"])
        .assert()
        .code(1)
        .stderr(contains("Invalid version"));
    assert!(!repo.ledger_path().exists());
}

#[test]
fn test_tag_twice_fails() {
    let repo = TestRepo::init().unwrap();
    git_semver(&repo).arg("init").assert().success();

    git_semver(&repo).arg("tag").assert().success();
    git_semver(&repo)
        .arg("tag")
        .assert()
        .code(1)
        .stderr(contains("is already tagged: v0.0.0"));
}

#[test]
fn test_branch_from_environment() {
    let repo = TestRepo::init().unwrap();

    git_semver(&repo)
        .env("BRANCH_NAME", "release/2.x")
        .args(["init", "--version", "2.0.0"])
        .assert()
        .success();

    assert_eq!(repo.ledger_record("release/2.x").as_deref(), Some("2.0.0\n"));
    git_semver(&repo)
        .env("SEMVER_BRANCH", "release/2.x")
        .assert()
        .success()
        .stdout("2.0.0\n");
    git_semver(&repo).assert().code(1);
}

#[test]
fn test_pre_prefix_from_environment() {
    let repo = TestRepo::init().unwrap();
    git_semver(&repo).arg("init").assert().success();

    git_semver(&repo)
        .env("SEMVER_PRE_PREFIX", "alpha")
        .args(["bump", "pre"])
        .assert()
        .success();
    git_semver(&repo).assert().success().stdout("0.0.1-alpha.1\n");
}

#[test]
fn test_config_file() {
    let repo = TestRepo::init().unwrap();
    let config = repo.path().join("semver.toml");
    std::fs::write(&config, "init_version = \"3.0.0\"\npre_prefix = \"dev\"\n").unwrap();

    git_semver(&repo)
        .arg("--config")
        .arg(&config)
        .arg("init")
        .assert()
        .success();
    git_semver(&repo)
        .arg("--config")
        .arg(&config)
        .args(["bump", "pre"])
        .assert()
        .success();
    git_semver(&repo).assert().success().stdout("3.0.1-dev.1\n");
}

#[test]
fn test_debug_logging_goes_to_stderr() {
    let repo = TestRepo::init().unwrap();
    git_semver(&repo).arg("init").assert().success();

    git_semver(&repo)
        .env("SEMVER_DEBUG", "1")
        .assert()
        .success()
        .stdout("0.0.0\n")
        .stderr(contains("read version"));
}

#[test]
fn test_config_file_found_in_target_directory() {
    let repo = TestRepo::init().unwrap();
    std::fs::write(repo.path().join("gitsemver.toml"), "init_version = \"4.2.0\"\n").unwrap();
    let elsewhere = tempfile::tempdir().unwrap();

    git_semver(&repo)
        .current_dir(elsewhere.path())
        .arg("-C")
        .arg(repo.path())
        .arg("init")
        .assert()
        .success();
    git_semver(&repo).assert().success().stdout("4.2.0\n");
}
