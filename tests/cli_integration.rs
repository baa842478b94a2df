use assert_cmd::Command;
use tempfile::TempDir;

fn keydash(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("keydash").unwrap();
    // Isolate config and state dirs from the host machine.
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("XDG_DATA_HOME", home.path().join(".local/share"));
    cmd
}

#[test]
fn seeded_exhibition_reports_stats() {
    let home = TempDir::new().unwrap();
    let output = keydash(&home)
        .args(["-t", "hello world", "--seed", "7", "--quiet"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("keys"), "missing summary line: {stdout}");
    assert!(stdout.contains("wpm"), "missing wpm: {stdout}");
}

#[test]
fn seeded_runs_are_reproducible_end_to_end() {
    let home = TempDir::new().unwrap();
    let run = || {
        keydash(&home)
            .args(["-t", "determinism in action", "--seed", "99"])
            .output()
            .unwrap()
    };

    let first = run();
    let second = run();
    assert!(first.status.success());
    assert_eq!(
        String::from_utf8_lossy(&first.stdout),
        String::from_utf8_lossy(&second.stdout)
    );
}

#[test]
fn stream_marks_mistakes_in_brackets() {
    let home = TempDir::new().unwrap();
    // Force constant fumbling so the stream visibly brackets mistakes.
    let output = keydash(&home)
        .args([
            "-t",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "--seed",
            "3",
            "--mistake-rate",
            "1.0",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains('['), "expected bracketed mistakes: {stdout}");
}

#[test]
fn duel_declares_a_winner() {
    let home = TempDir::new().unwrap();
    let output = keydash(&home)
        .args([
            "-t",
            "a short duel text",
            "--seed",
            "11",
            "-p",
            "careful",
            "--duel",
            "aggressive",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("wins by") || stdout.contains("dead heat"),
        "no verdict in: {stdout}"
    );
}

#[test]
fn history_lists_recorded_runs() {
    let home = TempDir::new().unwrap();

    keydash(&home)
        .args(["-t", "for the record", "--seed", "5", "--quiet"])
        .assert()
        .success();

    let output = keydash(&home).arg("--history").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("rival"), "run not listed: {stdout}");
    assert!(stdout.contains("ago"), "no humanized age: {stdout}");
}

#[test]
fn history_export_writes_csv() {
    let home = TempDir::new().unwrap();

    keydash(&home)
        .args(["-t", "csv bound", "--seed", "5", "--quiet"])
        .assert()
        .success();

    let csv_path = home.path().join("runs.csv");
    keydash(&home)
        .args(["--export", csv_path.to_str().unwrap()])
        .assert()
        .success();

    let text = std::fs::read_to_string(&csv_path).unwrap();
    assert!(text.starts_with("timestamp,mode"));
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn save_defaults_round_trips_through_the_config_file() {
    let home = TempDir::new().unwrap();

    keydash(&home)
        .args([
            "-t",
            "tiny",
            "--seed",
            "2",
            "--quiet",
            "-p",
            "aggressive",
            "--save-defaults",
        ])
        .assert()
        .success();

    let config_path = home.path().join(".config/keydash/config.json");
    let text = std::fs::read_to_string(&config_path).unwrap();
    assert!(text.contains("aggressive"), "config not saved: {text}");
}
