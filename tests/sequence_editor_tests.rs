/// End-to-end tests for the sequence-editor re-entry protocol: a real
/// `git rebase -i` invokes the built binary's hidden subcommands as its
/// sequence editor, exactly as the orchestrator wires it up.
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn git(repo_path: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn create_test_repo_with_remote() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let remote_path = temp_dir.path().join("remote.git");
    let repo_path = temp_dir.path().join("repo");

    Command::new("git")
        .args(["init", "--bare", remote_path.to_str().unwrap()])
        .output()
        .unwrap();
    Command::new("git")
        .args(["clone", remote_path.to_str().unwrap(), repo_path.to_str().unwrap()])
        .output()
        .unwrap();
    git(&repo_path, &["config", "user.name", "Test"]);
    git(&repo_path, &["config", "user.email", "tester@example.com"]);

    std::fs::write(repo_path.join("README.md"), "# Test").unwrap();
    git(&repo_path, &["add", "."]);
    git(&repo_path, &["commit", "-m", "Initial commit"]);
    git(&repo_path, &["push", "origin", "HEAD"]);

    (temp_dir, repo_path)
}

fn create_commit(repo_path: &Path, message: &str, filename: &str) -> String {
    std::fs::write(repo_path.join(filename), format!("Content for {filename}\n")).unwrap();
    git(repo_path, &["add", filename]);
    git(repo_path, &["commit", "-m", message]);
    git(repo_path, &["rev-parse", "HEAD"])
}

fn rebase_with_editor(repo_path: &Path, upstream: &str, subcommand: &str, ids: &[&str]) {
    let mut editor = format!("'{}' {subcommand}", env!("CARGO_BIN_EXE_sd"));
    for id in ids {
        editor.push(' ');
        editor.push_str(id);
    }
    let output = Command::new("git")
        .args(["rebase", "-i", upstream])
        .env("GIT_SEQUENCE_EDITOR", &editor)
        .current_dir(repo_path)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "rebase -i failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn subjects_since(repo_path: &Path, upstream: &str) -> Vec<String> {
    git(repo_path, &["log", "--format=%s", &format!("{upstream}..HEAD")])
        .lines()
        .map(|l| l.to_string())
        .collect()
}

#[test]
fn test_drop_already_merged_removes_commit_from_history() {
    let (_temp_dir, repo_path) = create_test_repo_with_remote();

    let merged = create_commit(&repo_path, "Already merged feature", "merged.txt");
    create_commit(&repo_path, "Still in review", "pending.txt");
    let merged_short = git(&repo_path, &["rev-parse", "--short", &merged]);

    let upstream = format!("origin/{}", git(&repo_path, &["rev-parse", "--abbrev-ref", "HEAD"]));
    rebase_with_editor(&repo_path, &upstream, "drop-already-merged", &[&merged_short]);

    let subjects = subjects_since(&repo_path, &upstream);
    assert_eq!(subjects, vec!["Still in review".to_string()]);
    assert!(!repo_path.join("merged.txt").exists());
    assert!(repo_path.join("pending.txt").exists());
}

#[test]
fn test_mark_as_fixup_squashes_into_target() {
    let (_temp_dir, repo_path) = create_test_repo_with_remote();

    let target = create_commit(&repo_path, "Add the widget", "widget.txt");
    create_commit(&repo_path, "Unrelated work", "unrelated.txt");
    std::fs::write(repo_path.join("widget.txt"), "Improved widget\n").unwrap();
    git(&repo_path, &["add", "widget.txt"]);
    git(&repo_path, &["commit", "-m", "Widget fix"]);
    let fixup_short = git(&repo_path, &["rev-parse", "--short", "HEAD"]);
    let target_short = git(&repo_path, &["rev-parse", "--short", &target]);

    let upstream = format!("origin/{}", git(&repo_path, &["rev-parse", "--abbrev-ref", "HEAD"]));
    rebase_with_editor(
        &repo_path,
        &upstream,
        "mark-as-fixup",
        &[&target_short, &fixup_short],
    );

    // The fixup disappears into the target; the unrelated commit survives.
    let subjects = subjects_since(&repo_path, &upstream);
    assert_eq!(
        subjects,
        vec!["Unrelated work".to_string(), "Add the widget".to_string()]
    );
    let contents = std::fs::read_to_string(repo_path.join("widget.txt")).unwrap();
    assert_eq!(contents, "Improved widget\n");
}

#[test]
fn test_mark_as_fixup_missing_commit_aborts_rebase() {
    let (_temp_dir, repo_path) = create_test_repo_with_remote();

    let target = create_commit(&repo_path, "Only commit", "only.txt");
    let head_before = git(&repo_path, &["rev-parse", "HEAD"]);
    let target_short = git(&repo_path, &["rev-parse", "--short", &target]);

    let upstream = format!("origin/{}", git(&repo_path, &["rev-parse", "--abbrev-ref", "HEAD"]));
    let editor = format!(
        "'{}' mark-as-fixup {target_short} ffffffff",
        env!("CARGO_BIN_EXE_sd")
    );
    let output = Command::new("git")
        .args(["rebase", "-i", &upstream])
        .env("GIT_SEQUENCE_EDITOR", &editor)
        .current_dir(&repo_path)
        .output()
        .unwrap();

    // The plan rewriter exits non-zero, so git refuses to start the rebase
    // and history is untouched.
    assert!(!output.status.success());
    assert_eq!(git(&repo_path, &["rev-parse", "HEAD"]), head_before);
}
