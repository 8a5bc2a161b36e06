use crate::errors::{StackError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Outcome of a git invocation whose failure is an expected control-flow
/// branch (cherry-pick conflicts, fast-forward refusals) rather than an
/// environment problem.
#[derive(Debug)]
pub struct GitExit {
    pub success: bool,
    pub output: String,
}

/// Runs the system `git` binary against one repository.
///
/// All mutating stacked-diff steps go through the real binary: the
/// interactive-rebase sequence-editor protocol, stashes, and cherry-pick
/// state files only exist at that level.
pub struct GitBackend {
    root: PathBuf,
}

impl GitBackend {
    /// Open the repository containing the current working directory.
    pub fn discover() -> Result<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .map_err(|e| StackError::tool(format!("could not run git: {e}")))?;
        if !output.status.success() {
            return Err(StackError::user("not inside a git repository"));
        }
        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Self {
            root: PathBuf::from(root),
        })
    }

    /// Open the repository at a known path (used by tests).
    pub fn at(path: &Path) -> Self {
        Self {
            root: path.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.root);
        cmd
    }

    fn collect(output: std::process::Output) -> String {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(stderr.trim_end());
        }
        combined
    }

    /// Run git, requiring success. Failure is an external-tool error
    /// carrying the combined output.
    pub fn run(&self, args: &[&str]) -> Result<String> {
        debug!("git {}", args.join(" "));
        let output = self
            .command(args)
            .output()
            .map_err(|e| StackError::tool(format!("could not run git {}: {e}", args.join(" "))))?;
        let combined = Self::collect(output.clone());
        if !output.status.success() {
            return Err(StackError::tool(format!(
                "git {} failed: {}",
                args.join(" "),
                combined.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    /// Run git, reporting success or failure with combined output instead
    /// of erroring on a non-zero exit.
    pub fn run_status(&self, args: &[&str]) -> Result<GitExit> {
        debug!("git {}", args.join(" "));
        let output = self
            .command(args)
            .output()
            .map_err(|e| StackError::tool(format!("could not run git {}: {e}", args.join(" "))))?;
        Ok(GitExit {
            success: output.status.success(),
            output: Self::collect(output),
        })
    }

    /// Run git with an extra environment variable set.
    pub fn run_status_with_env(&self, args: &[&str], key: &str, value: &str) -> Result<GitExit> {
        debug!("git {} ({key}={value})", args.join(" "));
        let output = self
            .command(args)
            .env(key, value)
            .output()
            .map_err(|e| StackError::tool(format!("could not run git {}: {e}", args.join(" "))))?;
        Ok(GitExit {
            success: output.status.success(),
            output: Self::collect(output),
        })
    }

    /// Run git with raw bytes fed to stdin (used for `git apply`).
    pub fn run_with_stdin(&self, args: &[&str], input: &[u8]) -> Result<GitExit> {
        debug!("git {} (stdin: {} bytes)", args.join(" "), input.len());
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StackError::tool(format!("could not run git {}: {e}", args.join(" "))))?;
        child
            .stdin
            .take()
            .ok_or_else(|| StackError::tool("git stdin unavailable"))?
            .write_all(input)?;
        let output = child
            .wait_with_output()
            .map_err(|e| StackError::tool(format!("git {} did not finish: {e}", args.join(" "))))?;
        Ok(GitExit {
            success: output.status.success(),
            output: Self::collect(output),
        })
    }

    /// Run git and return raw stdout bytes (`git diff --binary` output must
    /// not pass through lossy UTF-8 conversion).
    pub fn run_raw(&self, args: &[&str]) -> Result<Vec<u8>> {
        debug!("git {}", args.join(" "));
        let output = self
            .command(args)
            .output()
            .map_err(|e| StackError::tool(format!("could not run git {}: {e}", args.join(" "))))?;
        if !output.status.success() {
            return Err(StackError::tool(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }

    // --- revision queries ---------------------------------------------------

    /// Resolve a revision to a full commit hash.
    pub fn rev_parse(&self, rev: &str) -> Result<String> {
        self.run(&["rev-parse", rev])
    }

    /// Resolve a revision to an abbreviated commit hash.
    pub fn short_hash(&self, rev: &str) -> Result<String> {
        self.run(&["rev-parse", "--short", rev])
    }

    pub fn head_commit(&self) -> Result<String> {
        self.rev_parse("HEAD")
    }

    pub fn current_branch(&self) -> Result<String> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Whether a revision names an existing commit object.
    pub fn commit_exists(&self, rev: &str) -> Result<bool> {
        let spec = format!("{rev}^{{commit}}");
        Ok(self.run_status(&["cat-file", "-e", &spec])?.success)
    }

    /// Whether `ancestor` is an ancestor of `descendant`.
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        Ok(self
            .run_status(&["merge-base", "--is-ancestor", ancestor, descendant])?
            .success)
    }

    pub fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        self.run(&["merge-base", a, b])
    }

    pub fn subject_of(&self, rev: &str) -> Result<String> {
        self.run(&["log", "-1", "--format=%s", rev])
    }

    pub fn body_of(&self, rev: &str) -> Result<String> {
        self.run(&["log", "-1", "--format=%b", rev])
    }

    pub fn parent_of(&self, rev: &str) -> Result<String> {
        let spec = format!("{rev}^");
        self.rev_parse(&spec)
    }

    /// Full hashes in `from..to`, oldest first.
    pub fn commits_between(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let range = format!("{from}..{to}");
        let out = self.run(&["log", "--reverse", "--format=%H", &range])?;
        Ok(out.lines().map(|l| l.to_string()).collect())
    }

    /// Names of files touched by a single commit.
    pub fn changed_files(&self, rev: &str) -> Result<Vec<String>> {
        let parent = format!("{rev}^");
        let out = self.run(&["diff", "--name-only", &parent, rev])?;
        Ok(out
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect())
    }

    pub fn config_get(&self, key: &str) -> Result<Option<String>> {
        let exit = self.run_status(&["config", "--get", key])?;
        if exit.success {
            Ok(Some(exit.output.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    // --- branches -----------------------------------------------------------

    pub fn local_branch_exists(&self, name: &str) -> Result<bool> {
        let out = self.run(&["branch", "-l", name])?;
        Ok(!out.trim().is_empty())
    }

    pub fn remote_branch_exists(&self, remote: &str, name: &str) -> Result<bool> {
        let spec = format!("{remote}/{name}");
        let out = self.run(&["branch", "-r", "-l", &spec])?;
        Ok(!out.trim().is_empty())
    }

    pub fn create_branch(&self, name: &str, at: &str) -> Result<()> {
        self.run(&["branch", name, at])?;
        Ok(())
    }

    pub fn delete_branch(&self, name: &str) -> Result<()> {
        self.run(&["branch", "-D", name])?;
        Ok(())
    }

    pub fn switch(&self, name: &str) -> Result<()> {
        self.run(&["switch", name])?;
        Ok(())
    }

    // --- working tree -------------------------------------------------------

    /// Whether the working tree or index has any changes, including
    /// untracked files.
    pub fn is_dirty(&self) -> Result<bool> {
        let out = self.run(&["status", "--porcelain"])?;
        Ok(!out.trim().is_empty())
    }

    /// Stash everything, including untracked files. Returns false when
    /// there was nothing to stash.
    pub fn stash_push(&self, message: &str) -> Result<bool> {
        if !self.is_dirty()? {
            return Ok(false);
        }
        self.run(&["stash", "push", "--include-untracked", "-m", message])?;
        Ok(true)
    }

    pub fn stash_pop(&self) -> Result<()> {
        self.run(&["stash", "pop"])?;
        Ok(())
    }

    pub fn reset_hard(&self, rev: &str) -> Result<()> {
        self.run(&["reset", "--hard", rev])?;
        Ok(())
    }

    pub fn add_all(&self) -> Result<()> {
        self.run(&["add", "-A"])?;
        Ok(())
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "-m", message])?;
        Ok(())
    }

    /// Restore the working tree contents of every path from another ref.
    pub fn checkout_paths_from(&self, rev: &str) -> Result<()> {
        self.run(&["checkout", rev, "--", "."])?;
        Ok(())
    }

    // --- cherry-pick / rebase -----------------------------------------------

    pub fn cherry_pick(&self, rev: &str) -> Result<GitExit> {
        self.run_status(&["cherry-pick", rev])
    }

    pub fn cherry_pick_ff(&self, rev: &str) -> Result<GitExit> {
        self.run_status(&["cherry-pick", "--ff", rev])
    }

    pub fn cherry_pick_abort(&self) -> Result<GitExit> {
        self.run_status(&["cherry-pick", "--abort"])
    }

    pub fn cherry_pick_skip(&self) -> Result<GitExit> {
        self.run_status(&["cherry-pick", "--skip"])
    }

    pub fn rebase(&self, upstream: &str) -> Result<GitExit> {
        self.run_status(&["rebase", upstream])
    }

    /// Interactive rebase with the sequence editor pointed at this program's
    /// hidden plan-rewriting subcommand. Git appends the plan file path to
    /// the editor command line.
    pub fn rebase_interactive(&self, upstream: &str, sequence_editor: &str) -> Result<GitExit> {
        self.run_status_with_env(&["rebase", "-i", upstream], "GIT_SEQUENCE_EDITOR", sequence_editor)
    }

    pub fn rebase_abort(&self) -> Result<GitExit> {
        self.run_status(&["rebase", "--abort"])
    }

    pub fn rebase_continue(&self) -> Result<GitExit> {
        // GIT_EDITOR=true keeps git from opening an editor for the
        // continued commit's message.
        self.run_status_with_env(&["rebase", "--continue"], "GIT_EDITOR", "true")
    }

    pub fn merge_abort(&self) -> Result<GitExit> {
        self.run_status(&["merge", "--abort"])
    }

    /// Whether an interactive or am-style rebase is currently in progress.
    pub fn rebase_in_progress(&self) -> Result<bool> {
        for dir in ["rebase-merge", "rebase-apply"] {
            let path = self.run(&["rev-parse", "--git-path", dir])?;
            if self.root.join(path.trim()).exists() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The commit the in-progress rebase stopped on.
    pub fn rebase_head(&self) -> Result<String> {
        self.rev_parse("REBASE_HEAD")
    }

    pub fn merge_ff_only(&self, rev: &str) -> Result<GitExit> {
        self.run_status(&["merge", "--ff-only", rev])
    }

    // --- remote -------------------------------------------------------------

    pub fn fetch(&self, remote: &str, refspec: &str) -> Result<GitExit> {
        self.run_status(&["fetch", remote, refspec])
    }

    pub fn push(&self, remote: &str, branch: &str, force: bool) -> Result<GitExit> {
        if force {
            self.run_status(&["push", "-f", "--set-upstream", remote, branch])
        } else {
            self.run_status(&["push", "--set-upstream", remote, branch])
        }
    }

    pub fn delete_remote_branch(&self, remote: &str, branch: &str) -> Result<GitExit> {
        self.run_status(&["push", remote, "--delete", branch])
    }

    // --- diff / apply -------------------------------------------------------

    /// Binary-safe patch between two revisions.
    pub fn diff_binary(&self, from: &str, to: &str) -> Result<Vec<u8>> {
        self.run_raw(&["diff", "--binary", from, to])
    }

    /// Apply a patch to the working tree and index.
    pub fn apply_index(&self, patch: &[u8]) -> Result<GitExit> {
        self.run_with_stdin(&["apply", "--index"], patch)
    }
}
