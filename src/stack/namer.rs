use crate::config::{templates, Template};

/// Branch names may not exceed this many bytes; the limit keeps derived
/// names well under ref-name limits on common hosts.
const MAX_BRANCH_BYTES: usize = 120;

/// Deterministic branch-name derivation from commit metadata.
///
/// Determinism is load-bearing: nothing persists the commit↔branch mapping,
/// so every component re-derives a commit's branch from its sanitized
/// subject and the configured username. Identical inputs must always
/// produce byte-identical output.
pub struct BranchNamer {
    template: String,
    username: String,
}

impl BranchNamer {
    pub fn new(template: String, username: String) -> Self {
        Self { template, username }
    }

    /// Use the user-overridable branch-name template from the config
    /// directory, falling back to the built-in default.
    pub fn from_config(username: String) -> Self {
        Self::new(Template::BranchName.load(), username)
    }

    /// Built-in default template only; used by tests and anything that must
    /// not read the user's config directory.
    pub fn with_default_template(username: String) -> Self {
        Self::new("{username-dashed}/{summary}".to_string(), username)
    }

    /// Render the branch name for a sanitized commit subject.
    pub fn branch_name(&self, sanitized_subject: &str) -> String {
        let dashed = self.username.replace('.', "-");
        let rendered = templates::render(
            &self.template,
            &[
                ("username", &self.username),
                ("username-dashed", &dashed),
                ("summary", sanitized_subject),
            ],
        );
        truncate_on_char_boundary(rendered, MAX_BRANCH_BYTES)
    }

    /// Transform a commit subject into a branch-name-safe token: lowercase,
    /// non-alphanumerics collapsed to single dashes, no leading or trailing
    /// dash.
    pub fn sanitize_subject(subject: &str) -> String {
        let mut out = String::with_capacity(subject.len());
        let mut last_dash = true;
        for c in subject.chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash {
                out.push('-');
                last_dash = true;
            }
        }
        while out.ends_with('-') {
            out.pop();
        }
        out
    }
}

/// Truncate to at most `max` bytes without splitting a multi-byte
/// character.
fn truncate_on_char_boundary(mut s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    s
}
