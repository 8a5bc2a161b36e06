use crate::cli::commands::CommandEnv;
use crate::cli::output::Output;
use crate::errors::Result;
use crate::stack::IndicatorResolver;
use console::style;
use std::fs;
use std::path::Path;

/// Show the code owners for the files each stacked commit touches.
pub async fn run() -> Result<()> {
    let env = CommandEnv::discover()?;
    let namer = env.namer()?;
    let resolver = IndicatorResolver::new(&env.git, &env.host, &env.ctx, &namer);

    let rules = match load_rules(env.git.root()) {
        Some(rules) => rules,
        None => {
            Output::info("no CODEOWNERS file found");
            return Ok(());
        }
    };

    let commits = resolver.new_commits()?;
    if commits.is_empty() {
        Output::info("no commits stacked on top of the remote trunk");
        return Ok(());
    }

    for commit in &commits {
        let files = env.git.changed_files(&commit.full_commit)?;
        let mut owners: Vec<String> = Vec::new();
        for file in &files {
            for owner in owners_for(&rules, file) {
                if !owners.contains(owner) {
                    owners.push(owner.clone());
                }
            }
        }
        let owner_list = if owners.is_empty() {
            style("(no owners)").dim().to_string()
        } else {
            owners.join(", ")
        };
        println!(
            "{} {} · {}",
            style(&commit.short_commit).yellow(),
            commit.subject,
            owner_list
        );
    }
    Ok(())
}

/// One CODEOWNERS rule: a path pattern and the owners it assigns.
#[derive(Debug, Clone)]
struct OwnerRule {
    pattern: String,
    owners: Vec<String>,
}

const CODEOWNERS_LOCATIONS: [&str; 3] = [".github/CODEOWNERS", "CODEOWNERS", "docs/CODEOWNERS"];

fn load_rules(root: &Path) -> Option<Vec<OwnerRule>> {
    for location in CODEOWNERS_LOCATIONS {
        let path = root.join(location);
        if let Ok(content) = fs::read_to_string(&path) {
            return Some(parse_rules(&content));
        }
    }
    None
}

fn parse_rules(content: &str) -> Vec<OwnerRule> {
    let mut rules = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let pattern = match parts.next() {
            Some(p) => p.to_string(),
            None => continue,
        };
        let owners: Vec<String> = parts.map(|p| p.to_string()).collect();
        rules.push(OwnerRule { pattern, owners });
    }
    rules
}

/// The owners for a path: the last matching rule wins, as on the hosts
/// that consume CODEOWNERS.
fn owners_for<'a>(rules: &'a [OwnerRule], path: &str) -> &'a [String] {
    for rule in rules.iter().rev() {
        if pattern_matches(&rule.pattern, path) {
            return &rule.owners;
        }
    }
    &[]
}

/// CODEOWNERS-style matching: `*` catches everything, a leading `/`
/// anchors at the repository root, a trailing `/` matches a directory
/// subtree, and a bare name matches at any depth. `*` inside a pattern
/// never crosses a `/`.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(anchored) = pattern.strip_prefix('/') {
        return segment_match(anchored, path);
    }
    if segment_match(pattern, path) {
        return true;
    }
    // Unanchored patterns can also match below any directory.
    path.match_indices('/')
        .any(|(i, _)| segment_match(pattern, &path[i + 1..]))
}

fn segment_match(pattern: &str, path: &str) -> bool {
    if let Some(dir) = pattern.strip_suffix('/') {
        return path.starts_with(&format!("{dir}/"));
    }
    if pattern.contains('*') {
        return glob_match(pattern, path);
    }
    path == pattern || path.starts_with(&format!("{pattern}/"))
}

fn glob_match(pattern: &str, path: &str) -> bool {
    let p_parts: Vec<&str> = pattern.split('/').collect();
    let s_parts: Vec<&str> = path.split('/').collect();
    if p_parts.len() != s_parts.len() {
        return false;
    }
    p_parts
        .iter()
        .zip(&s_parts)
        .all(|(p, s)| glob_segment(p, s))
}

fn glob_segment(pattern: &str, segment: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == segment,
        Some((prefix, suffix)) => {
            segment.len() >= prefix.len() + suffix.len()
                && segment.starts_with(prefix)
                && segment.ends_with(suffix)
                && !suffix.contains('*')
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<OwnerRule> {
        parse_rules(
            "# comment\n\
             * @org/everyone\n\
             /src/parser/ @org/parsers\n\
             *.rs @org/rustaceans\n\
             /docs/ @org/writers\n",
        )
    }

    #[test]
    fn test_last_matching_rule_wins() {
        let rules = rules();
        assert_eq!(owners_for(&rules, "src/parser/lexer.rs"), &["@org/rustaceans".to_string()]);
        assert_eq!(owners_for(&rules, "docs/guide.md"), &["@org/writers".to_string()]);
        assert_eq!(owners_for(&rules, "Makefile"), &["@org/everyone".to_string()]);
    }

    #[test]
    fn test_anchored_directory_patterns() {
        let rules = rules();
        assert_eq!(
            owners_for(&rules, "src/parser/grammar.y"),
            &["@org/parsers".to_string()]
        );
        // Not under /src/parser/ at the root
        assert_eq!(
            owners_for(&rules, "vendor/src/parser/grammar.y"),
            &["@org/everyone".to_string()]
        );
    }

    #[test]
    fn test_extension_glob_matches_any_depth() {
        let rules = rules();
        assert_eq!(owners_for(&rules, "main.rs"), &["@org/rustaceans".to_string()]);
        assert_eq!(
            owners_for(&rules, "deep/nested/module.rs"),
            &["@org/rustaceans".to_string()]
        );
    }

    #[test]
    fn test_comments_and_blanks_are_skipped() {
        let rules = parse_rules("\n# only comments\n\n");
        assert!(rules.is_empty());
    }
}
