use crate::cli::output::Output;
use crate::config::{templates, RepoContext, Template};
use crate::errors::{StackError, Result};
use crate::git::{log, GitBackend, GitLog, RollbackManager};
use crate::host::{is_draft_rejection, CodeHostingService, CreatePullRequest};
use crate::stack::merged::{merged_candidates, DropCandidate};
use crate::stack::{BranchInfo, BranchNamer};
use tracing::{debug, info, warn};

/// Drives the multi-step state machines behind new/update/replace/rebase.
///
/// Every operation is a sequence of external-process steps. Once mutation
/// has begun, any operational failure funnels through
/// `RollbackManager::restore` so the trunk comes out exactly as it went in.
pub struct StackedDiffOrchestrator<'a> {
    git: &'a GitBackend,
    host: &'a dyn CodeHostingService,
    ctx: &'a RepoContext,
    namer: &'a BranchNamer,
}

impl<'a> StackedDiffOrchestrator<'a> {
    pub fn new(
        git: &'a GitBackend,
        host: &'a dyn CodeHostingService,
        ctx: &'a RepoContext,
        namer: &'a BranchNamer,
    ) -> Self {
        Self {
            git,
            host,
            ctx,
            namer,
        }
    }

    fn new_commits(&self) -> Result<Vec<GitLog>> {
        let upstream = self.ctx.remote_trunk(self.git)?;
        log::new_commits(self.git, self.namer, &upstream)
    }

    fn require_on_trunk(&self) -> Result<String> {
        let trunk = self.ctx.trunk(self.git)?;
        let current = self.git.current_branch()?;
        if current != trunk {
            return Err(StackError::user(format!(
                "must be run from {trunk} (currently on {current})"
            )));
        }
        Ok(trunk)
    }

    /// Fail fast when another stacked commit sanitizes to the same branch
    /// name; continuing would let two commits fight over one branch.
    fn require_unique_branch(&self, info: &BranchInfo) -> Result<()> {
        let clashes = self
            .new_commits()?
            .iter()
            .filter(|c| c.branch == info.branch_name)
            .count();
        if clashes > 1 {
            return Err(StackError::invariant(format!(
                "multiple stacked commits resolve to branch {:?}; reword one of the subjects",
                info.branch_name
            )));
        }
        Ok(())
    }

    /// The sequence-editor command line for an interactive rebase. Git
    /// appends the plan file path as the final argument when it invokes it.
    fn sequence_editor(subcommand: &str, args: &[String]) -> Result<String> {
        // STACKDIFF_SEQUENCE_EDITOR_BIN overrides the re-entry binary when
        // the orchestrator is not running from the installed executable
        // (the test harness, notably).
        let exe = match std::env::var_os("STACKDIFF_SEQUENCE_EDITOR_BIN") {
            Some(path) => std::path::PathBuf::from(path),
            None => std::env::current_exe()
                .map_err(|e| StackError::tool(format!("could not locate own executable: {e}")))?,
        };
        let mut editor = format!("'{}' {subcommand}", exe.display());
        for arg in args {
            editor.push(' ');
            editor.push_str(arg);
        }
        Ok(editor)
    }

    fn render_pr_title(&self, subject: &str, branch: &str) -> String {
        templates::render(
            &Template::PrTitle.load(),
            &[("summary", subject), ("branch", branch)],
        )
    }

    fn render_pr_body(&self, subject: &str, body: &str, branch: &str) -> String {
        templates::render(
            &Template::PrDescription.load(),
            &[("summary", subject), ("body", body), ("branch", branch)],
        )
    }

    /// Create a branch and pull request for one stacked commit.
    ///
    /// require-on-trunk → stash → create branch → switch → cherry-pick →
    /// push → create PR (draft retried once as non-draft) → open in
    /// browser → switch back → pop stash. Everything up to PR creation is
    /// rolled back on failure; afterwards failures are only warnings.
    pub async fn new_branch(
        &self,
        info: &BranchInfo,
        base: Option<&str>,
        draft: bool,
    ) -> Result<()> {
        let trunk = self.require_on_trunk()?;
        self.require_unique_branch(info)?;
        if self.git.local_branch_exists(&info.branch_name)? {
            return Err(StackError::user(format!(
                "branch {:?} already exists; use update instead",
                info.branch_name
            )));
        }

        let remote_trunk = self.ctx.remote_trunk(self.git)?;
        let base = base.unwrap_or(&remote_trunk);
        let subject = self.git.subject_of(&info.commit_hash)?;
        let body = self.git.body_of(&info.commit_hash)?;

        let mut rollback = RollbackManager::new();
        let stashed = self.git.stash_push("stackdiff new")?;
        if stashed {
            rollback.stash_taken();
        }
        rollback.save_state(self.git)?;

        let result = self
            .new_branch_steps(&mut rollback, info, base, draft, &subject, &body)
            .await;
        let pr_url = match result {
            Ok(url) => url,
            Err(err) => {
                rollback.restore(self.git, &err.to_string());
                return Err(err);
            }
        };
        rollback.clear();

        // The PR exists from here on; later failures warn, never roll back.
        if let Err(e) = open::that_detached(&pr_url) {
            warn!("could not open {pr_url} in a browser: {e}");
        }
        if let Err(e) = self.git.switch(&trunk) {
            Output::warning(format!("could not switch back to {trunk}: {e}"));
        } else if stashed {
            if let Err(e) = self.git.stash_pop() {
                Output::warning(format!("could not restore stashed changes: {e}"));
            }
        }

        Output::success(format!("created {} → {pr_url}", info.branch_name));
        Ok(())
    }

    async fn new_branch_steps(
        &self,
        rollback: &mut RollbackManager,
        info: &BranchInfo,
        base: &str,
        draft: bool,
        subject: &str,
        body: &str,
    ) -> Result<String> {
        let trunk = self.ctx.trunk(self.git)?;
        let remote = self.ctx.remote();

        self.git.create_branch(&info.branch_name, base)?;
        rollback.created_branch(&info.branch_name);
        self.git.switch(&info.branch_name)?;

        let exit = self.git.cherry_pick(&info.commit_hash)?;
        if !exit.success {
            return Err(StackError::operation(format!(
                "cherry-pick of {} onto {base} failed: {}",
                info.commit_hash,
                exit.output.trim()
            )));
        }

        let exit = self.git.push(remote, &info.branch_name, false)?;
        if !exit.success {
            return Err(StackError::operation(format!(
                "push of {} failed: {}",
                info.branch_name,
                exit.output.trim()
            )));
        }

        let request = CreatePullRequest {
            title: self.render_pr_title(subject, &info.branch_name),
            body: self.render_pr_body(subject, body, &info.branch_name),
            head: info.branch_name.clone(),
            base: trunk,
            draft,
        };
        let pr = match self.host.create_pr(&request).await {
            Ok(pr) => pr,
            Err(err) if draft && is_draft_rejection(&err) => {
                info!("host rejected draft PRs, retrying as ready");
                let retry = CreatePullRequest {
                    draft: false,
                    ..request
                };
                self.host.create_pr(&retry).await?
            }
            Err(err) => return Err(err),
        };
        info!("created PR #{} for {}", pr.number, info.branch_name);
        Ok(pr.url)
    }

    /// Fold fixup commits from the trunk into a tracked commit's branch,
    /// then rewrite the trunk so the fixups disappear into their target.
    pub async fn update(&self, target: &BranchInfo, fixups: &[GitLog]) -> Result<()> {
        let trunk = self.require_on_trunk()?;
        if fixups.is_empty() {
            return Err(StackError::user("no fixup commits to apply"));
        }
        if !self.git.commit_exists(&target.commit_hash)?
            || !self.git.is_ancestor(&target.commit_hash, "HEAD")?
        {
            return Err(StackError::user(format!(
                "target commit {} is not on {trunk}",
                target.commit_hash
            )));
        }

        let remote = self.ctx.remote();
        let remote_trunk = self.ctx.remote_trunk(self.git)?;
        let branch = &target.branch_name;

        let mut rollback = RollbackManager::new();
        let stashed = self.git.stash_push("stackdiff update")?;
        if stashed {
            rollback.stash_taken();
        }
        rollback.save_state(self.git)?;

        if !self.git.local_branch_exists(branch)? {
            let exit = self.git.fetch(remote, branch)?;
            if !exit.success {
                rollback.restore(self.git, "branch unavailable");
                return Err(StackError::operation(format!(
                    "branch {branch} exists neither locally nor on {remote}: {}",
                    exit.output.trim()
                )));
            }
        }
        if let Err(err) = self.git.switch(branch) {
            rollback.restore(self.git, "could not switch to branch");
            return Err(err);
        }

        let mut force_push = false;
        if self.git.remote_branch_exists(remote, branch)? {
            self.git.fetch(remote, branch)?;
            let remote_ref = format!("{remote}/{branch}");
            let ff = self.git.merge_ff_only(&remote_ref)?;
            if !ff.success {
                debug!("fast-forward to {remote_ref} failed, rebasing instead");
                let exit = self.git.rebase(&remote_ref)?;
                if !exit.success {
                    rollback.restore(self.git, "rebase onto remote branch failed");
                    return Err(StackError::operation(format!(
                        "could not reconcile {branch} with {remote_ref}: {}",
                        exit.output.trim()
                    )));
                }
                force_push = true;
            }
        }

        for fixup in fixups {
            let exit = self.git.cherry_pick(&fixup.full_commit)?;
            if exit.success {
                continue;
            }
            // First conflict: the branch may be anchored on a stale version
            // of the trunk. Re-anchor on the current first-diverging trunk
            // commit and retry once.
            self.git.cherry_pick_abort()?;
            let diverging = self.git.commits_between(&remote_trunk, &trunk)?;
            let anchor = diverging.first().cloned().ok_or_else(|| {
                StackError::operation("no diverging trunk commit to re-anchor on")
            })?;
            info!("re-anchoring {branch} on {anchor}");
            let rebase = self.git.rebase(&anchor)?;
            if !rebase.success {
                self.git.rebase_abort()?;
                rollback.restore(self.git, "re-anchoring rebase failed");
                return Err(StackError::operation(format!(
                    "could not re-anchor {branch} on {anchor}: {}",
                    rebase.output.trim()
                )));
            }
            force_push = true;

            let retry = self.git.cherry_pick(&fixup.full_commit)?;
            if !retry.success {
                // No rollback: the conflict markers are the user's
                // starting point for manual resolution.
                Output::warning(format!(
                    "cherry-pick of {} conflicts even after re-anchoring; resolve it on {branch}",
                    fixup.short_commit
                ));
                return Err(StackError::operation(format!(
                    "unresolved conflict applying {} to {branch}: {}",
                    fixup.short_commit,
                    retry.output.trim()
                )));
            }
        }

        let exit = self.git.push(remote, branch, force_push)?;
        if !exit.success {
            rollback.restore(self.git, "push failed");
            return Err(StackError::operation(format!(
                "push of {branch} failed: {}",
                exit.output.trim()
            )));
        }
        if let Err(err) = self.git.switch(&trunk) {
            rollback.restore(self.git, "could not switch back to trunk");
            return Err(err);
        }

        // Rewrite the trunk so each fixup sits squashed behind its target.
        let target_short = self.git.short_hash(&target.commit_hash)?;
        let mut editor_args = vec![target_short];
        editor_args.extend(fixups.iter().map(|f| f.short_commit.clone()));
        let editor = Self::sequence_editor("mark-as-fixup", &editor_args)?;
        let exit = self.git.rebase_interactive(&remote_trunk, &editor)?;
        if !exit.success {
            rollback.restore(self.git, "interactive rebase failed");
            return Err(StackError::operation(format!(
                "interactive rebase marking fixups failed: {}",
                exit.output.trim()
            )));
        }

        rollback.clear();
        if stashed {
            if let Err(e) = self.git.stash_pop() {
                Output::warning(format!("could not restore stashed changes: {e}"));
            }
        }

        // Keep the PR's face in sync with the (possibly amended) commit.
        let subject = self.git.subject_of(&target.commit_hash).unwrap_or_default();
        if !subject.is_empty() {
            let title = self.render_pr_title(&subject, branch);
            if let Err(e) = self.host.edit_pr(branch, Some(&title), None).await {
                warn!("could not refresh PR title for {branch}: {e}");
            }
        }

        Output::success(format!(
            "folded {} fixup(s) into {branch}",
            fixups.len()
        ));
        Ok(())
    }

    /// Fold CI-only fixes made on a commit's isolated branch back into the
    /// trunk, replacing the commit in place and replaying everything
    /// stacked after it.
    pub fn replace_commit(&self, target: &BranchInfo) -> Result<()> {
        let trunk = self.require_on_trunk()?;
        if self.git.is_dirty()? {
            return Err(StackError::user(
                "working tree has uncommitted changes; commit or stash them first",
            ));
        }
        if !self.git.local_branch_exists(&target.branch_name)? {
            return Err(StackError::user(format!(
                "branch {:?} does not exist locally",
                target.branch_name
            )));
        }

        let branch = &target.branch_name;
        let subject = self.git.subject_of(&target.commit_hash)?;
        let parent = self.git.parent_of(&target.commit_hash)?;
        let divergence = self.git.merge_base(branch, &trunk)?;
        let replay = self.git.commits_between(&target.commit_hash, "HEAD")?;
        let patch = self.git.diff_binary(&divergence, branch)?;
        if patch.is_empty() {
            return Err(StackError::user(format!(
                "branch {branch} has no changes relative to its divergence point"
            )));
        }

        let mut rollback = RollbackManager::new();
        rollback.save_state(self.git)?;

        if let Err(err) = self.replace_commit_steps(&subject, &parent, &patch, &replay) {
            rollback.restore(self.git, &err.to_string());
            return Err(err);
        }
        rollback.clear();

        Output::success(format!(
            "replaced {} with the contents of {branch}",
            target.commit_hash
        ));
        Ok(())
    }

    fn replace_commit_steps(
        &self,
        subject: &str,
        parent: &str,
        patch: &[u8],
        replay: &[String],
    ) -> Result<()> {
        self.git.reset_hard(parent)?;

        let exit = self.git.apply_index(patch)?;
        if !exit.success {
            return Err(StackError::operation(format!(
                "could not apply branch diff: {}",
                exit.output.trim()
            )));
        }
        self.git.commit(subject)?;

        for commit in replay {
            let exit = self.git.cherry_pick_ff(commit)?;
            if exit.success {
                continue;
            }
            if exit.output.contains("is now empty") || exit.output.contains("--allow-empty") {
                // The replayed commit's changes are already part of the
                // branch diff; skipping keeps the rest of the stack intact.
                debug!("skipping now-empty commit {commit}");
                let skip = self.git.cherry_pick_skip()?;
                if skip.success {
                    continue;
                }
                return Err(StackError::operation(format!(
                    "could not skip empty commit {commit}: {}",
                    skip.output.trim()
                )));
            }
            return Err(StackError::operation(format!(
                "could not replay {commit}: {}",
                exit.output.trim()
            )));
        }
        Ok(())
    }

    /// Resolve an in-progress rebase conflict by taking the conflicted
    /// commit's branch contents wholesale, then continue the rebase.
    pub fn replace_conflicts(&self) -> Result<()> {
        if !self.git.rebase_in_progress()? {
            return Err(StackError::user(
                "no rebase in progress; nothing to replace conflicts in",
            ));
        }
        let stopped = self.git.rebase_head()?;
        let subject = self.git.subject_of(&stopped)?;
        let branch = self
            .namer
            .branch_name(&BranchNamer::sanitize_subject(&subject));
        if !self.git.local_branch_exists(&branch)? {
            return Err(StackError::user(format!(
                "no branch {branch:?} to take conflict resolutions from"
            )));
        }

        info!("resolving conflicts on {stopped} from {branch}");
        self.git.checkout_paths_from(&branch)?;
        self.git.add_all()?;
        let exit = self.git.rebase_continue()?;
        if !exit.success {
            return Err(StackError::operation(format!(
                "rebase --continue failed: {}",
                exit.output.trim()
            )));
        }
        Output::success(format!("continued rebase using {branch}"));
        Ok(())
    }

    /// Rebase the trunk onto its remote, dropping local commits whose pull
    /// requests already merged and deleting their branches.
    pub async fn rebase_main(&self) -> Result<()> {
        let trunk = self.require_on_trunk()?;
        let remote = self.ctx.remote();
        let remote_trunk = self.ctx.remote_trunk(self.git)?;

        let exit = self.git.fetch(remote, &trunk)?;
        if !exit.success {
            return Err(StackError::tool(format!(
                "fetch of {trunk} failed: {}",
                exit.output.trim()
            )));
        }

        let new_commits = self.new_commits()?;
        let merged = self.host.merged_prs().await?;
        let candidates = merged_candidates(self.git, &new_commits, &merged)?;

        if candidates.is_empty() {
            debug!("no merged commits to drop, plain rebase");
            let exit = self.git.rebase(&remote_trunk)?;
            if !exit.success {
                // A failed rebase stays in progress; conflicts are the
                // user's to resolve.
                Output::warning("rebase stopped; resolve conflicts and run git rebase --continue");
            Output::tip("if the conflicted commit has a branch with the fix, run: sd replace-conflicts");
                return Err(StackError::operation(format!(
                    "rebase onto {remote_trunk} failed: {}",
                    exit.output.trim()
                )));
            }
            Output::success(format!("rebased {trunk} onto {remote_trunk}"));
            return Ok(());
        }

        // Record branch tips before the rebase rewrites anything so the
        // unchanged-remote check still has the original hashes.
        let mut tips = Vec::new();
        for candidate in &candidates {
            let tip = self.git.rev_parse(&candidate.log.branch).ok();
            tips.push(tip);
        }

        let drops: Vec<String> = candidates
            .iter()
            .map(|c| c.log.short_commit.clone())
            .collect();
        for candidate in &candidates {
            Output::sub_item(format!(
                "dropping {} ({})",
                candidate.log.subject, candidate.log.branch
            ));
        }
        let editor = Self::sequence_editor("drop-already-merged", &drops)?;
        let exit = self.git.rebase_interactive(&remote_trunk, &editor)?;
        if !exit.success {
            Output::warning("rebase stopped; resolve conflicts and run git rebase --continue");
            Output::tip("if the conflicted commit has a branch with the fix, run: sd replace-conflicts");
            return Err(StackError::operation(format!(
                "rebase onto {remote_trunk} failed: {}",
                exit.output.trim()
            )));
        }

        self.delete_dropped_branches(&candidates, &tips);
        Output::success(format!(
            "rebased {trunk}, dropped {} merged commit(s)",
            candidates.len()
        ));
        Ok(())
    }

    /// Branch cleanup after a drop rebase: local branches always go; remote
    /// branches only when the remote tip still matches the local tip we
    /// recorded (an unexpected remote change means someone else pushed).
    fn delete_dropped_branches(&self, candidates: &[DropCandidate], tips: &[Option<String>]) {
        let remote = self.ctx.remote();
        for (candidate, tip) in candidates.iter().zip(tips) {
            let branch = &candidate.log.branch;
            match self.git.delete_branch(branch) {
                Ok(()) => debug!("deleted local branch {branch}"),
                Err(e) => warn!("could not delete local branch {branch}: {e}"),
            }

            let remote_ref = format!("{remote}/{branch}");
            let remote_tip = match self.git.run_status(&["rev-parse", &remote_ref]) {
                Ok(exit) if exit.success => Some(exit.output.lines().next().unwrap_or("").to_string()),
                _ => None,
            };
            match (remote_tip, tip) {
                (Some(remote_tip), Some(local_tip)) if remote_tip == *local_tip => {
                    if let Ok(exit) = self.git.delete_remote_branch(remote, branch) {
                        if exit.success {
                            debug!("deleted remote branch {branch}");
                        } else {
                            warn!("could not delete remote branch {branch}: {}", exit.output.trim());
                        }
                    }
                }
                (Some(_), _) => {
                    warn!("remote branch {branch} changed since merge; leaving it alone");
                }
                (None, _) => {}
            }
        }
    }
}
