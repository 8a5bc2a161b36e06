use crate::config;
use std::fs;

/// The three user-overridable text templates. Each is resolved from the
/// per-user config directory, falling back to a built-in default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    BranchName,
    PrTitle,
    PrDescription,
}

impl Template {
    fn file_name(self) -> &'static str {
        match self {
            Template::BranchName => "branch-name.tmpl",
            Template::PrTitle => "pr-title.tmpl",
            Template::PrDescription => "pr-description.tmpl",
        }
    }

    fn default_text(self) -> &'static str {
        match self {
            Template::BranchName => "{username-dashed}/{summary}",
            Template::PrTitle => "{summary}",
            Template::PrDescription => "{body}",
        }
    }

    /// Load the template text, preferring the user override.
    pub fn load(self) -> String {
        if let Ok(dir) = config::config_dir() {
            let path = dir.join(self.file_name());
            if let Ok(text) = fs::read_to_string(&path) {
                let trimmed = text.trim_end_matches('\n');
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
        self.default_text().to_string()
    }
}

/// Substitute `{field}` placeholders. Unknown placeholders are left in
/// place so a typo in a user template stays visible instead of silently
/// vanishing.
pub fn render(template: &str, fields: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in fields {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}
