#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const STATE_REL: &str = ".claude/review/context.json";

/// Run the hook binary with `stdin` as input. `project_dir` is passed via
/// `CLAUDE_PROJECT_DIR`; when `None` the variable is cleared. The process
/// runs from a scratch directory so the test crate's own checkout is never
/// mistaken for the project.
pub fn run_cli(stdin: &str, project_dir: Option<&Path>) -> (i32, String, String) {
    let scratch = tempfile::tempdir().unwrap();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_review-gate"));
    cmd.current_dir(scratch.path())
        .env_remove("REVIEW_GATE_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    match project_dir {
        Some(dir) => cmd.env("CLAUDE_PROJECT_DIR", dir),
        None => cmd.env_remove("CLAUDE_PROJECT_DIR"),
    };
    let mut child = cmd.spawn().expect("failed to spawn binary");

    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();

    let output = child.wait_with_output().unwrap();
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// A Stop payload for `cwd`.
pub fn stop_input(cwd: &Path) -> String {
    serde_json::json!({
        "session_id": "test-session",
        "transcript_path": "/tmp/t.jsonl",
        "cwd": cwd.to_str().unwrap(),
        "permission_mode": "default",
        "hook_event_name": "Stop",
        "stop_hook_active": false
    })
    .to_string()
}

/// Create a temp dir containing a git repo whose initial commit holds `files`.
/// The `TempDir` must be kept alive for the duration of the test.
pub fn temp_git_repo(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = git2::Repository::init(dir.path()).unwrap();

    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test").unwrap();
    config.set_str("user.email", "test@test.com").unwrap();

    for (path, contents) in files {
        write_file(dir.path(), path, contents);
    }
    commit_all(dir.path());
    dir
}

/// Stage everything (except the state directory) and commit on HEAD.
pub fn commit_all(repo_path: &Path) {
    let repo = git2::Repository::open(repo_path).unwrap();
    let mut index = repo.index().unwrap();
    index
        .add_all(
            ["*"].iter(),
            git2::IndexAddOption::DEFAULT,
            Some(&mut |path: &Path, _matched: &[u8]| {
                if path.starts_with(".claude") { 1 } else { 0 }
            }),
        )
        .unwrap();
    index.write().unwrap();
    let tree_oid = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_oid).unwrap();
    let sig = repo.signature().unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, "commit", &tree, &parents)
        .unwrap();
}

pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_REL)
}

pub fn read_state(root: &Path) -> serde_json::Value {
    let raw = fs::read_to_string(state_path(root)).unwrap();
    serde_json::from_str(&raw).unwrap()
}

pub fn write_state(root: &Path, value: &serde_json::Value) {
    write_file(root, STATE_REL, &serde_json::to_string_pretty(value).unwrap());
}

/// Edit the persisted document in place, the way the agent would.
pub fn edit_state(root: &Path, edit: impl FnOnce(&mut serde_json::Value)) {
    let mut value = read_state(root);
    edit(&mut value);
    write_state(root, &value);
}

/// Parse stdout as the hook output object.
pub fn output(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout.trim()).unwrap_or_else(|e| panic!("bad stdout {stdout:?}: {e}"))
}

/// The block reason, panicking if the stop was allowed.
pub fn block_reason(stdout: &str) -> String {
    let out = output(stdout);
    assert_eq!(out["decision"], "block", "expected a block, got: {out}");
    out["reason"].as_str().unwrap().to_string()
}
