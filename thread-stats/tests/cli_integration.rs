//! CLI integration tests for thread-stats

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const STATS: &str = "\
name,timestamp,permalink,id,favorite_count,retweet_count,reply_count
launch2,2024-03-02T10:00:00Z,https://example.social/@bot/2,2,,,
launch1,2024-03-02T09:59:00Z,https://example.social/@bot/1,1,4,2,1
older,2024-02-20T08:00:00Z,https://example.social/@bot/0,5,10,0,3
";

fn setup_stats(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let stats = temp_dir.path().join("tweet-statistics.csv");
    fs::write(&stats, contents).unwrap();
    (temp_dir, stats)
}

fn thread_stats(temp_dir: &TempDir, stats: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("thread-stats").unwrap();
    cmd.env("THREADCAST_CONFIG", temp_dir.path().join("missing.toml"))
        .arg("--statistics")
        .arg(stats);
    cmd
}

#[test]
fn test_help_flag_output() {
    Command::cargo_bin("thread-stats")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--refresh"))
        .stdout(predicate::str::contains("--limit"))
        .stdout(predicate::str::contains("OUTPUT FORMATS"));
}

#[test]
fn test_text_report_with_totals() {
    let (temp_dir, stats) = setup_stats(STATS);

    thread_stats(&temp_dir, &stats)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "2024-03-02 10:00:00 | launch2 | fav - rt - re - | https://example.social/@bot/2",
        ))
        .stdout(predicate::str::contains("launch1 | fav 4 rt 2 re 1"))
        .stdout(predicate::str::contains(
            "3 items (1 open): 14 favorites, 2 shares, 4 replies",
        ));
}

#[test]
fn test_limit_keeps_most_recent_and_full_totals() {
    let (temp_dir, stats) = setup_stats(STATS);

    thread_stats(&temp_dir, &stats)
        .args(["--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("launch2"))
        .stdout(predicate::str::contains("older").not())
        .stdout(predicate::str::contains("3 items"));
}

#[test]
fn test_json_report() {
    let (temp_dir, stats) = setup_stats(STATS);

    let output = thread_stats(&temp_dir, &stats)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["items"].as_array().unwrap().len(), 3);
    assert_eq!(value["items"][0]["favorite_count"], serde_json::Value::Null);
    assert_eq!(value["totals"]["favorites"], 14);
    assert_eq!(value["totals"]["open"], 1);
}

#[test]
fn test_jsonl_report() {
    let (temp_dir, stats) = setup_stats(STATS);

    let output = thread_stats(&temp_dir, &stats)
        .args(["--format", "jsonl", "--limit", "2"])
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["name"], "launch2");
}

#[test]
fn test_csv_report_matches_file_columns() {
    let (temp_dir, stats) = setup_stats(STATS);

    thread_stats(&temp_dir, &stats)
        .args(["--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "name,timestamp,permalink,id,favorite_count,retweet_count,reply_count\n",
        ))
        .stdout(predicate::str::contains(
            "launch1,2024-03-02T09:59:00Z,https://example.social/@bot/1,1,4,2,1",
        ));
}

#[test]
fn test_missing_file_is_empty_report() {
    let temp_dir = TempDir::new().unwrap();
    let stats = temp_dir.path().join("none.csv");

    thread_stats(&temp_dir, &stats)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_duplicate_ids_are_rejected() {
    let (temp_dir, stats) = setup_stats(
        "name,timestamp,permalink,id,favorite_count,retweet_count,reply_count\n\
         a,2024-03-02T10:00:00Z,https://x/1,1,,,\n\
         b,2024-03-02T11:00:00Z,https://x/1,1,,,\n",
    );

    thread_stats(&temp_dir, &stats)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_refresh_requires_credentials() {
    let (temp_dir, stats) = setup_stats(STATS);
    let before = fs::read(&stats).unwrap();

    let mut cmd = thread_stats(&temp_dir, &stats);
    for var in [
        "THREADCAST_CONSUMER_KEY",
        "THREADCAST_CONSUMER_SECRET",
        "THREADCAST_ACCESS_TOKEN",
        "THREADCAST_ACCESS_TOKEN_SECRET",
    ] {
        cmd.env_remove(var);
    }

    cmd.args(["--refresh", "--instance", "https://mastodon.example"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing required field"));

    assert_eq!(fs::read(&stats).unwrap(), before);
}

#[test]
fn test_verbose_logging_hides_credentials() {
    let (temp_dir, stats) = setup_stats(STATS);

    thread_stats(&temp_dir, &stats)
        .env_remove("RUST_LOG")
        .env_remove("THREADCAST_LOG_FORMAT")
        .args(["-v", "--access-token", "token-abc-123", "--consumer-secret", "cs-xyz-789"])
        .assert()
        .success()
        .stderr(predicate::str::contains("thread-stats started"))
        .stderr(predicate::str::contains("token-abc-123").not())
        .stderr(predicate::str::contains("cs-xyz-789").not());
}
