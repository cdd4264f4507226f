use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const REQUIRED: [&str; 7] = [
    "DISCORD_BOT_TOKEN",
    "DISCORD_GUILD_ID",
    "DISCORD_ROLE_ID",
    "DB_USER",
    "DB_HOST",
    "DB_NAME",
    "DB_PASSWORD",
];

/// A `roster` command with an empty environment, run from `dir`.
fn roster_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("roster"));
    cmd.env_clear().current_dir(dir.path());
    cmd
}

fn with_full_env(cmd: &mut Command) -> &mut Command {
    cmd.env("DISCORD_BOT_TOKEN", "t0ken")
        .env("DISCORD_GUILD_ID", "111")
        .env("DISCORD_ROLE_ID", "222")
        .env("DB_USER", "camp")
        .env("DB_HOST", "127.0.0.1")
        .env("DB_NAME", "camp")
        .env("DB_PASSWORD", "pw")
}

#[test]
fn help_lists_subcommands() {
    let dir = TempDir::new().expect("tempdir");
    roster_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("check"))
        .stdout(contains("members"))
        .stdout(contains("--dry-run"));
}

#[test]
fn missing_configuration_names_every_key() {
    let dir = TempDir::new().expect("tempdir");
    let mut assert = roster_cmd(&dir).assert().failure();
    for key in REQUIRED {
        assert = assert.stderr(contains(key));
    }
}

#[test]
fn partial_configuration_names_only_missing_keys() {
    let dir = TempDir::new().expect("tempdir");
    roster_cmd(&dir)
        .env("DISCORD_BOT_TOKEN", "t0ken")
        .env("DISCORD_GUILD_ID", "111")
        .env("DB_USER", "camp")
        .env("DB_HOST", "127.0.0.1")
        .env("DB_NAME", "camp")
        .assert()
        .failure()
        .stderr(contains(
            "missing required environment variables: DISCORD_ROLE_ID, DB_PASSWORD",
        ));
}

#[test]
fn check_without_configuration_fails() {
    let dir = TempDir::new().expect("tempdir");
    roster_cmd(&dir)
        .arg("check")
        .assert()
        .failure()
        .stderr(contains("DB_PASSWORD"));
}

#[test]
fn missing_roster_file_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let mut cmd = roster_cmd(&dir);
    with_full_env(&mut cmd)
        .arg("absent.csv")
        .assert()
        .failure()
        .stderr(contains("roster file not found"))
        .stdout(predicates::str::is_empty());
}

#[test]
fn default_roster_path_is_used() {
    let dir = TempDir::new().expect("tempdir");
    let mut cmd = roster_cmd(&dir);
    with_full_env(&mut cmd)
        .assert()
        .failure()
        .stderr(contains("for MC Tool.csv"));
}

#[test]
fn env_file_supplies_configuration() {
    let dir = TempDir::new().expect("tempdir");
    let env_path = dir.path().join("run.env");
    let body: String = REQUIRED.iter().map(|key| format!("{key}=value\n")).collect();
    std::fs::write(&env_path, body).expect("write env file");

    roster_cmd(&dir)
        .arg("--env-file")
        .arg(&env_path)
        .arg("absent.csv")
        .assert()
        .failure()
        .stderr(contains("roster file not found"));
}

#[test]
fn banner_never_prints_the_token() {
    let dir = TempDir::new().expect("tempdir");
    let mut cmd = roster_cmd(&dir);
    with_full_env(&mut cmd)
        .arg("absent.csv")
        .assert()
        .failure()
        .stderr(contains("Bot token:"))
        .stderr(contains("t0ken").not());
}
