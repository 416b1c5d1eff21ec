use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const ISSUEDESK_VARS: [&str; 7] = [
    "ISSUEDESK_ENV",
    "ISSUEDESK_ISSUE_NUMBER_PADDING",
    "ISSUEDESK_MAX_ISSUE_NUMBER",
    "ISSUEDESK_DATABASE_PATH",
    "ISSUEDESK_LOG_LEVEL",
    "ISSUEDESK_LOG_FILE",
    "ISSUEDESK_EXTENDED_ACTIVITY_TYPES",
];

/// Command isolated in `temp`: its own store, no user configuration, fixed actor
fn issuedesk(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("issuedesk").unwrap();
    cmd.current_dir(temp.path())
        .env("HOME", temp.path())
        .env("NO_COLOR", "1")
        .env("ISSUEDESK_ACTOR", "adam@example.com")
        .env_remove("RUST_LOG");
    for var in ISSUEDESK_VARS {
        cmd.env_remove(var);
    }
    cmd.arg("--database").arg(temp.path().join("store.json"));
    cmd
}

fn create_bug(temp: &TempDir, summary: &str) {
    issuedesk(temp)
        .args([
            "issue",
            "create",
            "--project",
            "DWB",
            "--type",
            "BUG",
            "--priority",
            "2",
            "--story-points",
            "3",
            "--summary",
            summary,
        ])
        .assert()
        .success();
}

fn json_reply(cmd: &mut Command) -> (i32, Value) {
    let output = cmd.arg("--format").arg("json").output().unwrap();
    let reply = serde_json::from_slice(&output.stdout).expect("stdout holds one JSON reply");
    (output.status.code().unwrap_or(-1), reply)
}

#[test]
fn test_create_allocates_sequential_names() {
    let temp = TempDir::new().unwrap();
    issuedesk(&temp).args(["db", "create"]).assert().success();

    issuedesk(&temp)
        .args([
            "issue", "create", "--project", "DWB", "--type", "BUG", "--priority", "2",
            "--story-points", "3", "--summary", "Login fails",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created DWB-0001"));
    issuedesk(&temp)
        .args(["issue", "create", "--payload"])
        .arg(r#"{"issue_project": "DWB", "type": "TASK", "priority": 1, "story_points": 1, "summary": "Second"}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created DWB-0002"));

    issuedesk(&temp)
        .args(["issue", "list", "--project", "DWB"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DWB-0001"))
        .stdout(predicate::str::contains("DWB-0002"))
        .stdout(predicate::str::contains("Total: 2 issues"));
}

#[test]
fn test_json_reply_envelope() {
    let temp = TempDir::new().unwrap();
    create_bug(&temp, "Login fails");

    let (code, reply) = json_reply(issuedesk(&temp).args(["issue", "show", "DWB-0001"]));
    assert_eq!(code, 0);
    assert_eq!(reply["status"], "success");
    assert_eq!(reply["response"], 200);
    assert_eq!(reply["data"]["issue_name"], "DWB-0001");
    assert_eq!(reply["data"]["issue_status"], "OPEN");
    assert!(reply["timestamp"].is_string());
    assert!(reply["duration"].is_number());
}

#[test]
fn test_invalid_priority_is_rejected_without_gap() {
    let temp = TempDir::new().unwrap();

    let (code, reply) = json_reply(issuedesk(&temp).args([
        "issue", "create", "--project", "DWB", "--type", "BUG", "--priority", "6",
        "--story-points", "1", "--summary", "Too urgent",
    ]));
    assert_eq!(code, 2);
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["response"], 400);
    assert_eq!(reply["data"]["violations"][0]["field"], "issue_priority");

    create_bug(&temp, "Real bug");
    issuedesk(&temp)
        .args(["issue", "show", "DWB-0001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Real bug"));
}

#[test]
fn test_missing_issue_exit_code() {
    let temp = TempDir::new().unwrap();
    issuedesk(&temp)
        .args(["issue", "show", "DWB-0042"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("issue not found: DWB-0042"));

    let (code, reply) = json_reply(issuedesk(&temp).args(["issue", "history", "DWB-0042"]));
    assert_eq!(code, 3);
    assert_eq!(reply["status"], "missing");
    assert_eq!(reply["response"], 404);
}

#[test]
fn test_update_records_only_changed_fields() {
    let temp = TempDir::new().unwrap();
    create_bug(&temp, "Login fails");

    issuedesk(&temp)
        .env("ISSUEDESK_ACTOR", "bill@example.com")
        .args([
            "issue", "update", "DWB-0001", "--set", "priority=4", "--set", "status=OPEN",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated DWB-0001: priority"));

    issuedesk(&temp)
        .args(["issue", "update", "DWB-0001", "--set", "priority=4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes to DWB-0001"));

    let (code, reply) = json_reply(issuedesk(&temp).args(["issue", "history", "DWB-0001"]));
    assert_eq!(code, 0);
    let entries = reply["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["activity_type"], "UPDATE");
    assert_eq!(entries[0]["created_by"], "bill@example.com");
    let text = entries[0]["activity_text"].as_str().unwrap();
    assert!(text.contains("priority"));
    assert!(!text.contains("status"));
}

#[test]
fn test_activity_add_and_delete_conflict() {
    let temp = TempDir::new().unwrap();
    create_bug(&temp, "Login fails");

    issuedesk(&temp)
        .args(["activity", "add", "DWB-0001", "--text", "Reproduced on staging"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added COMMENT"));

    issuedesk(&temp)
        .args(["activity", "add", "DWB-0001", "--type", "UPDATE", "--text", "forged"])
        .assert()
        .code(2);

    let (code, reply) = json_reply(issuedesk(&temp).args(["issue", "delete", "DWB-0001"]));
    assert_eq!(code, 4);
    assert_eq!(reply["status"], "conflict");
    assert_eq!(reply["response"], 409);

    issuedesk(&temp)
        .args(["activity", "list", "--issue", "DWB-0001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reproduced on staging"));
}

#[test]
fn test_delete_issue_without_activity() {
    let temp = TempDir::new().unwrap();
    create_bug(&temp, "Typo");

    issuedesk(&temp)
        .args(["issue", "delete", "DWB-0001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted DWB-0001"));
    issuedesk(&temp)
        .args(["issue", "show", "DWB-0001"])
        .assert()
        .code(3);
}

#[test]
fn test_writes_require_an_actor() {
    let temp = TempDir::new().unwrap();
    issuedesk(&temp)
        .env_remove("ISSUEDESK_ACTOR")
        .args([
            "issue", "create", "--project", "DWB", "--type", "BUG", "--priority", "2",
            "--story-points", "3", "--summary", "Nobody",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No actor given"));
}

#[test]
fn test_seed_and_drop() {
    let temp = TempDir::new().unwrap();
    let issues = temp.path().join("issues.json");
    let activity = temp.path().join("activity.json");
    fs::write(
        &issues,
        r#"[
            {"issue_project": "DWB", "issue_type": "BUG", "issue_priority": 2,
             "issue_story_points": 3, "issue_summary": "Login fails", "created_by": "carol@example.com"},
            {"issue_project": "DWB", "issue_type": "FEATURE", "issue_priority": 3,
             "issue_story_points": 5, "issue_summary": "Export to CSV"},
            {"issue_project": "DWB", "issue_type": "BUG", "issue_priority": 9,
             "issue_story_points": 1, "issue_summary": "Rejected"}
        ]"#,
    )
    .unwrap();
    fs::write(
        &activity,
        r#"[
            {"issue_name": "DWB-0001", "activity_type": "COMMENT", "activity_text": "Seen it"},
            {"issue_name": "DWB-0099", "activity_type": "COMMENT", "activity_text": "Orphan"}
        ]"#,
    )
    .unwrap();

    let (code, reply) = json_reply(
        issuedesk(&temp)
            .args(["db", "seed", "--issues"])
            .arg(&issues)
            .arg("--activity")
            .arg(&activity),
    );
    assert_eq!(code, 0);
    assert_eq!(reply["data"]["issues_created"], 2);
    assert_eq!(reply["data"]["issues_rejected"], 1);
    assert_eq!(reply["data"]["activity_created"], 1);
    assert_eq!(reply["data"]["activity_rejected"], 1);

    let (_, reply) = json_reply(issuedesk(&temp).args(["issue", "show", "DWB-0001"]));
    assert_eq!(reply["data"]["created_by"], "carol@example.com");

    issuedesk(&temp).args(["db", "drop"]).assert().success();
    issuedesk(&temp)
        .args(["issue", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues found."));
}

#[test]
fn test_fake_generates_issues() {
    let temp = TempDir::new().unwrap();
    issuedesk(&temp)
        .args(["db", "fake", "--count", "3", "--project", "OPS"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated 3 issues in OPS"));

    let (_, reply) = json_reply(issuedesk(&temp).args(["issue", "list", "--project", "OPS"]));
    let names: Vec<&str> = reply["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["issue_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["OPS-0001", "OPS-0002", "OPS-0003"]);
}

#[test]
fn test_settings_and_profiles() {
    let temp = TempDir::new().unwrap();
    issuedesk(&temp)
        .args(["-c", "testing", "settings"])
        .assert()
        .success()
        .stdout(predicate::str::contains("testing"))
        .stdout(predicate::str::contains("issue_number_padding"));

    issuedesk(&temp)
        .args(["-c", "testing", "db", "create"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("in memory"));

    issuedesk(&temp)
        .args(["-c", "staging", "settings"])
        .assert()
        .code(2);
}

#[test]
fn test_list_rejects_unknown_status() {
    let temp = TempDir::new().unwrap();
    issuedesk(&temp)
        .args(["issue", "list", "--status", "CLOSED"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("IN_PROGRESS"));
}

#[test]
fn test_parallel_processes_get_distinct_names() {
    use assert_cmd::cargo::CommandCargoExt;

    let temp = TempDir::new().unwrap();
    let children: Vec<_> = (0..6)
        .map(|n| {
            let mut cmd = std::process::Command::cargo_bin("issuedesk").unwrap();
            cmd.current_dir(temp.path())
                .env("HOME", temp.path())
                .env("NO_COLOR", "1")
                .env("ISSUEDESK_ACTOR", "adam@example.com")
                .env_remove("RUST_LOG");
            for var in ISSUEDESK_VARS {
                cmd.env_remove(var);
            }
            cmd.arg("--database")
                .arg(temp.path().join("store.json"))
                .args([
                    "issue", "create", "--project", "DWB", "--type", "TASK", "--priority", "3",
                    "--story-points", "1", "--summary",
                ])
                .arg(format!("Parallel {}", n))
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .spawn()
                .unwrap()
        })
        .collect();
    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    let (_, reply) = json_reply(issuedesk(&temp).args(["issue", "list", "--project", "DWB"]));
    let mut names: Vec<&str> = reply["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["issue_name"].as_str().unwrap())
        .collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec!["DWB-0001", "DWB-0002", "DWB-0003", "DWB-0004", "DWB-0005", "DWB-0006"]
    );
}
