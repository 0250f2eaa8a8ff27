//! CLI smoke tests: drive the `msim` binary and check its output contract.

mod common;

use std::fs;

use serde_json::Value;

fn is_time_label(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 8
        && bytes[2] == b':'
        && bytes[5] == b':'
        && s.split(':').all(|p| p.len() == 2 && p.bytes().all(|b| b.is_ascii_digit()))
}

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: msim [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn version_command_prints_version() {
    let result = common::run_cli_case("version_command_prints_version", &["--version"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(
        result.stdout.contains("msim"),
        "missing version output; log: {}",
        result.log_path.display()
    );
}

#[test]
fn subcommand_help_flags_work() {
    for sub in ["run", "view", "snapshot", "fields", "config", "completions"] {
        let result = common::run_cli_case(&format!("help_{sub}"), &[sub, "--help"]);
        assert!(
            result.status.success(),
            "{sub} --help failed; log: {}",
            result.log_path.display()
        );
    }
}

#[test]
fn fields_json_lists_all_seven() {
    let result = common::run_cli_case("fields_json", &["fields", "--json"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let lines = result.json_lines();
    assert_eq!(lines.len(), 1);
    let names: Vec<&str> = lines[0]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        [
            "cpu_usage",
            "memory_usage",
            "disk_usage",
            "network_in",
            "network_out",
            "active_connections",
            "response_time"
        ]
    );
    assert!(
        lines[0]["fields"][0]["color"]
            .as_str()
            .unwrap()
            .starts_with("rgba(")
    );
}

#[test]
fn view_xy_pairs_projects_requested_field() {
    let result = common::run_cli_case(
        "view_xy_pairs",
        &[
            "view",
            "xy-pairs",
            "--field",
            "cpu_usage",
            "--capacity",
            "5",
            "--seed",
            "42",
            "--json",
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let lines = result.json_lines();
    let payload = &lines[0];
    assert_eq!(payload["shape"], "xy-pairs");
    assert_eq!(payload["field"], "cpu_usage");
    let points = payload["view"].as_array().unwrap();
    assert_eq!(points.len(), 5);
    for p in points {
        assert!(is_time_label(p["x"].as_str().unwrap()), "bad label: {p}");
        let y = p["y"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&y));
    }
}

#[test]
fn every_view_shape_has_window_length() {
    for shape in [
        "label-series",
        "axis-series",
        "point-list",
        "xy-pairs",
        "xy-named-pairs",
    ] {
        let result = common::run_cli_case(
            &format!("view_{shape}"),
            &["view", shape, "--capacity", "4", "--json"],
        );
        assert!(result.status.success(), "log: {}", result.log_path.display());
        let view = &result.json_lines()[0]["view"];
        let len = match shape {
            "label-series" => view["labels"].as_array().unwrap().len(),
            "axis-series" => view["xAxis"].as_array().unwrap().len(),
            _ => view.as_array().unwrap().len(),
        };
        assert_eq!(len, 4, "shape {shape}; log: {}", result.log_path.display());
    }
}

#[test]
fn unknown_field_exits_with_user_error() {
    let result = common::run_cli_case(
        "unknown_field",
        &["view", "xy-pairs", "--field", "latency", "--json"],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("MSIM-2001"), "log: {}", result.log_path.display());
}

#[test]
fn unknown_shape_exits_with_user_error() {
    let result = common::run_cli_case("unknown_shape", &["view", "pie-chart", "--json"]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("MSIM-2002"), "log: {}", result.log_path.display());
}

#[test]
fn snapshot_is_ordered_and_bounded() {
    let result = common::run_cli_case("snapshot", &["snapshot", "--capacity", "3", "--json"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = &result.json_lines()[0];
    assert_eq!(payload["capacity"], 3);
    let samples = payload["samples"].as_array().unwrap();
    assert_eq!(samples.len(), 3);
    let stamps: Vec<_> = samples
        .iter()
        .map(|s| chrono::DateTime::parse_from_rfc3339(s["timestamp"].as_str().unwrap()).unwrap())
        .collect();
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    assert!(samples[0]["activeConnections"].is_number());
}

#[test]
fn zero_capacity_override_rejected() {
    let result = common::run_cli_case("zero_capacity", &["snapshot", "--capacity", "0"]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("MSIM-1001"));
}

#[test]
fn config_validate_defaults_when_file_missing() {
    let result = common::run_cli_case("config_validate_default", &["config", "validate", "--json"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = &result.json_lines()[0];
    assert_eq!(payload["valid"], true);
    assert_eq!(payload["hash"].as_str().unwrap().len(), 16);
}

#[test]
fn config_validate_rejects_explicit_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let result = common::run_cli_case(
        "config_validate_missing",
        &["--config", missing.to_str().unwrap(), "config", "validate", "--json"],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    let payload = &result.json_lines()[0];
    assert_eq!(payload["valid"], false);
    assert_eq!(payload["code"], "MSIM-1002");
}

#[test]
fn config_validate_rejects_bad_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[stress]\nretain_batches = 80\nprune_threshold = 50\n").unwrap();
    let result = common::run_cli_case(
        "config_validate_bad",
        &["--config", path.to_str().unwrap(), "config", "validate", "--json"],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert_eq!(result.json_lines()[0]["code"], "MSIM-1001");
}

#[test]
fn config_show_applies_env_overrides() {
    let result = common::run_cli_case_with_env(
        "config_show_env",
        &["config", "show", "--json"],
        &[("MSIM_SIMULATOR_CAPACITY", "12")],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let config = &result.json_lines()[0]["config"];
    assert_eq!(config["simulator"]["capacity"], 12);
    assert_eq!(config["stress"]["prune_threshold"], 50);
}

#[test]
fn config_diff_reports_file_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("msim.toml");
    fs::write(&path, "[simulator]\ncapacity = 30\n").unwrap();
    let result = common::run_cli_case(
        "config_diff",
        &["--config", path.to_str().unwrap(), "config", "diff", "--json"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = &result.json_lines()[0];
    assert_eq!(payload["has_differences"], true);
    assert_eq!(payload["effective"]["simulator"]["capacity"], 30);
    assert_eq!(payload["defaults"]["simulator"]["capacity"], 60);
}

#[test]
fn completions_command_generates_shell_script() {
    let result = common::run_cli_case("completions_bash", &["completions", "bash"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("msim"));
}

#[test]
fn run_streams_status_and_logs_activity() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("activity.jsonl");
    let result = common::run_cli_case_with_env(
        "run_short",
        &[
            "run",
            "--duration",
            "2",
            "--poll-ms",
            "250",
            "--stress-after",
            "1",
            "--json",
        ],
        &[
            ("MSIM_ACTIVITY_LOG", log.to_str().unwrap()),
            ("MSIM_SIMULATOR_TICK_INTERVAL_MS", "100"),
            ("MSIM_STRESS_CPU_ITERATIONS", "10000"),
            ("MSIM_STRESS_BATCH_OBJECTS", "50"),
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let lines = result.json_lines();
    let (statuses, rest): (Vec<&Value>, Vec<&Value>) =
        lines.iter().partition(|l| l.get("status").is_some());
    assert!(statuses.len() >= 4, "log: {}", result.log_path.display());
    assert!(statuses.iter().all(|l| l["status"]["running"] == true));
    assert!(statuses.iter().any(|l| l["status"]["stressed"] == true));

    assert_eq!(rest.len(), 1);
    let summary = &rest[0]["summary"];
    assert_eq!(summary["interrupted"], false);
    assert!(summary["samples_generated"].as_u64().unwrap() >= 5);

    let events: Vec<String> = fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(|l| {
            let v: Value = serde_json::from_str(l).unwrap();
            v["event"].as_str().unwrap().to_string()
        })
        .collect();
    for expected in [
        "config_load",
        "simulator_start",
        "stress_enter",
        "stress_exit",
        "simulator_stop",
    ] {
        assert!(
            events.iter().any(|e| e == expected),
            "missing {expected} in {events:?}"
        );
    }
}
