use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const THREAD_ID: &str = "0b7f5c1e-8d7a-4f35-9d55-2f6f3d1c2a11";
const OTHER_THREAD_ID: &str = "5e0c2d9a-1f4b-4c7e-8a3d-6b2f9e1c0d47";

fn stateview(root: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("stateview").expect("binary");
    cmd.env("STATEVIEW_HOME", root);
    cmd.env_remove("STATEVIEW_LOG");
    cmd
}

fn setup_thread_tree() -> tempfile::TempDir {
    let temp = tempdir().expect("tempdir");
    let threads = temp.path().join("threads");
    fs::create_dir_all(&threads).expect("mkdir");
    fs::write(
        threads.join(format!("{THREAD_ID}.json")),
        r##"{"values":{"messages":[{"type":"human","content":"research rust"}],"todos":[{"content":"Collect sources","status":"completed"},{"content":"Write report","status":"in_progress"},{"content":"broken","status":"unknown"}],"files":{"report.md":"# Report\n\nRust is a systems language.","notes.txt":"scratch","bad":7}}}"##,
    )
    .expect("write thread");
    fs::write(
        threads.join(format!("{OTHER_THREAD_ID}.json")),
        r#"{"values":{"messages":[]}}"#,
    )
    .expect("write other thread");
    temp
}

fn setup_run(temp: &tempfile::TempDir, thread_id: &str) {
    let runs = temp.path().join("runs");
    fs::create_dir_all(&runs).expect("mkdir");
    fs::write(
        runs.join(format!("{thread_id}.jsonl")),
        concat!(
            "{\"event\":\"metadata\",\"data\":{\"run_id\":\"run-1\"}}\n",
            "{\"event\":\"updates\",\"data\":{\"planner\":{\"todos\":[{\"content\":\"Plan\",\"status\":\"completed\"},{\"content\":\"Draft\",\"status\":\"pending\"}]}}}\n",
            "{\"event\":\"messages/partial\",\"data\":[{\"content\":\"working\"}]}\n",
            "{\"event\":\"updates\",\"data\":{\"writer\":{\"files\":{\"draft.md\":\"first draft\"},\"messages\":[{\"files\":{\"ignored.md\":\"x\"}}]}}}\n",
        ),
    )
    .expect("write run");
}

#[test]
fn show_renders_tasks_and_files() {
    let temp = setup_thread_tree();

    stateview(temp.path())
        .args(["show", THREAD_ID])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Agent State"))
        .stdout(predicate::str::contains(format!("- Thread: `{THREAD_ID}`")))
        .stdout(predicate::str::contains("- Progress: 1 of 2 completed"))
        .stdout(predicate::str::contains("- Status: 1/2 complete"))
        .stdout(predicate::str::contains("1. [x] Collect sources"))
        .stdout(predicate::str::contains("2. [~] Write report"))
        .stdout(predicate::str::contains("broken").not())
        .stdout(predicate::str::contains("## Files (2)"))
        .stdout(predicate::str::contains("> # Report Rust is a systems language."))
        .stdout(predicate::str::contains("### bad").not());
}

#[test]
fn show_raw_outputs_json_snapshots() {
    let temp = setup_thread_tree();

    let output = stateview(temp.path())
        .args(["show", THREAD_ID, "--raw"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["threadId"], THREAD_ID);
    assert_eq!(value["todos"]["todos"][1]["status"], "in_progress");
    assert_eq!(value["files"]["files"]["notes.txt"], "scratch");
    assert!(value["todos"]["lastUpdatedAt"].as_i64().expect("timestamp") > 0);
}

#[test]
fn show_thread_without_state_renders_placeholders() {
    let temp = setup_thread_tree();

    stateview(temp.path())
        .args(["show", OTHER_THREAD_ID])
        .assert()
        .success()
        .stdout(predicate::str::contains("_No tasks._"))
        .stdout(predicate::str::contains("## Files (0)"));
}

#[test]
fn show_missing_thread_fails() {
    let temp = setup_thread_tree();

    stateview(temp.path())
        .args(["show", "missing-thread"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: thread not found"));
}

#[test]
fn show_rejects_path_like_thread_id() {
    let temp = setup_thread_tree();

    stateview(temp.path())
        .args(["show", "../threads/x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid thread id"));
}

#[test]
fn root_flag_overrides_environment() {
    let temp = setup_thread_tree();
    let empty = tempdir().expect("tempdir");

    stateview(empty.path())
        .args(["--root"])
        .arg(temp.path())
        .args(["show", THREAD_ID])
        .assert()
        .success()
        .stdout(predicate::str::contains("Collect sources"));
}

#[test]
fn list_prints_sorted_thread_ids() {
    let temp = setup_thread_tree();

    stateview(temp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(format!("{THREAD_ID}\n{OTHER_THREAD_ID}\n"));
}

#[test]
fn new_creates_listable_thread() {
    let temp = tempdir().expect("tempdir");

    let output = stateview(temp.path()).arg("new").output().expect("run");
    assert!(output.status.success());
    let thread_id = String::from_utf8(output.stdout).expect("utf8");
    let thread_id = thread_id.trim();
    assert_eq!(thread_id.len(), 36);

    stateview(temp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(format!("{thread_id}\n"));

    stateview(temp.path())
        .args(["show", thread_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("_No tasks._"));
}

#[test]
fn run_applies_streamed_updates() {
    let temp = setup_thread_tree();
    setup_run(&temp, OTHER_THREAD_ID);

    stateview(temp.path())
        .args(["run", "--thread", OTHER_THREAD_ID, "--message", "go", "--events"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "event: metadata\nevent: updates\nevent: messages/partial\nevent: updates\n",
        ))
        .stdout(predicate::str::contains("1. [x] Plan"))
        .stdout(predicate::str::contains("2. [ ] Draft"))
        .stdout(predicate::str::contains("### draft.md"))
        .stdout(predicate::str::contains("ignored.md").not());
}

#[test]
fn run_on_existing_thread_keeps_fields_the_stream_does_not_touch() {
    let temp = setup_thread_tree();
    let runs = temp.path().join("runs");
    fs::create_dir_all(&runs).expect("mkdir");
    fs::write(
        runs.join(format!("{THREAD_ID}.jsonl")),
        "{\"event\":\"updates\",\"data\":{\"todos\":[{\"content\":\"Collect sources\",\"status\":\"completed\"},{\"content\":\"Write report\",\"status\":\"completed\"}]}}\n",
    )
    .expect("write run");

    stateview(temp.path())
        .args(["run", "--thread", THREAD_ID])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Status: Complete"))
        .stdout(predicate::str::contains("### report.md"));
}

#[test]
fn run_without_thread_creates_one() {
    let temp = tempdir().expect("tempdir");

    stateview(temp.path())
        .args(["run", "--message", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Thread: `"))
        .stdout(predicate::str::contains("_No tasks._"));

    let threads = fs::read_dir(temp.path().join("threads"))
        .expect("threads dir")
        .count();
    assert_eq!(threads, 1);
}

#[test]
fn run_with_malformed_stream_fails() {
    let temp = setup_thread_tree();
    let runs = temp.path().join("runs");
    fs::create_dir_all(&runs).expect("mkdir");
    fs::write(runs.join(format!("{OTHER_THREAD_ID}.jsonl")), "{not json}\n").expect("write run");

    stateview(temp.path())
        .args(["run", "--thread", OTHER_THREAD_ID])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid json line"))
        .stderr(predicate::str::contains("at line 1"));
}

#[test]
fn file_prints_full_content() {
    let temp = setup_thread_tree();

    stateview(temp.path())
        .args(["file", THREAD_ID, "report.md"])
        .assert()
        .success()
        .stdout("# Report\n\nRust is a systems language.\n");
}

#[test]
fn file_missing_name_fails() {
    let temp = setup_thread_tree();

    stateview(temp.path())
        .args(["file", THREAD_ID, "bad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file not found in thread state"));
}
