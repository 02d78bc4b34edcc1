use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `kontext` isolated from the user's home config and working directory.
fn kontext(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kontext-cli").unwrap();
    cmd.current_dir(temp_dir.path())
        .env("HOME", temp_dir.path())
        .env_remove("REPLICATE_API_TOKEN")
        .env_remove("SUPABASE_SERVICE_KEY")
        .env_remove("SUPABASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("kontext-cli").unwrap();
    cmd.arg("--version").assert().success().stdout(predicate::str::contains("kontext 0.1.0"));
}

#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin("kontext-cli").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("FLUX LoRA training pipeline"))
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("upload"));
}

#[test]
fn test_no_command_prints_help() {
    let temp_dir = TempDir::new().unwrap();
    kontext(&temp_dir).assert().success().stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_missing_source_dir_fails_without_network() {
    let temp_dir = TempDir::new().unwrap();
    kontext(&temp_dir)
        .env("REPLICATE_API_TOKEN", "r8_dummy")
        .args(["train", "--source", "no-such-photos"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("source directory not found"));

    // Logs are mirrored to the log file in the working directory.
    let log = std::fs::read_to_string(temp_dir.path().join("training.log")).unwrap();
    assert!(log.contains("Starting training pipeline"));
    assert!(!temp_dir.path().join("training_data.zip").exists());
}

#[test]
fn test_submit_rejects_missing_archive() {
    let temp_dir = TempDir::new().unwrap();
    kontext(&temp_dir)
        .env("REPLICATE_API_TOKEN", "r8_dummy")
        .args(["submit", "missing.zip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot use archive"));
}

#[test]
fn test_log_file_from_config() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("kontext.toml"), "log_file = \"logs/kontext.log\"\n").unwrap();

    kontext(&temp_dir)
        .env("REPLICATE_API_TOKEN", "r8_dummy")
        .args(["train", "--source", "nowhere"])
        .assert()
        .failure();

    assert!(temp_dir.path().join("logs/kontext.log").exists());
    assert!(!temp_dir.path().join("training.log").exists());
}

#[test]
fn test_invalid_explicit_config() {
    let temp_dir = TempDir::new().unwrap();
    kontext(&temp_dir)
        .args(["--config", "absent.toml", "version"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_invalid_training_config_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir(temp_dir.path().join("photos")).unwrap();
    std::fs::write(temp_dir.path().join("kontext.toml"), "[training]\nmax_train_steps = 0\n").unwrap();

    kontext(&temp_dir)
        .env("REPLICATE_API_TOKEN", "r8_dummy")
        .args(["train", "--source", "photos"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_train_steps"));
}

#[test]
fn test_zero_poll_interval_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("kontext.toml"), "[replicate]\npoll_interval_secs = 0\n").unwrap();

    kontext(&temp_dir)
        .env("REPLICATE_API_TOKEN", "r8_dummy")
        .args(["predict", "--prompt", "DANI portrait"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_secs"));
}

#[test]
fn test_zero_training_poll_interval_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir(temp_dir.path().join("photos")).unwrap();
    std::fs::write(temp_dir.path().join("kontext.toml"), "[pipeline]\npoll_interval_secs = 0\n").unwrap();

    kontext(&temp_dir)
        .env("REPLICATE_API_TOKEN", "r8_dummy")
        .args(["train", "--source", "photos"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_secs"));
    assert!(!temp_dir.path().join("training_data.zip").exists());
}

#[test]
fn test_rust_log_filters_log_file() {
    let temp_dir = TempDir::new().unwrap();
    kontext(&temp_dir)
        .env("REPLICATE_API_TOKEN", "r8_dummy")
        .env("RUST_LOG", "error")
        .args(["train", "--source", "no-such-photos"])
        .assert()
        .failure();

    let log = std::fs::read_to_string(temp_dir.path().join("training.log")).unwrap();
    assert!(log.contains("Training pipeline failed"));
    assert!(!log.contains("Starting training pipeline"));
}

#[test]
fn test_log_level_flag_overrides_rust_log() {
    let temp_dir = TempDir::new().unwrap();
    kontext(&temp_dir)
        .env("REPLICATE_API_TOKEN", "r8_dummy")
        .env("RUST_LOG", "error")
        .args(["-l", "info", "train", "--source", "no-such-photos"])
        .assert()
        .failure();

    let log = std::fs::read_to_string(temp_dir.path().join("training.log")).unwrap();
    assert!(log.contains("Starting training pipeline"));
}
