use serde::Deserialize;

/// Decides whether a comment author is an automated reviewer.
///
/// Closures `Fn(&str) -> bool` implement this too, which keeps tests free of
/// pattern configuration.
pub trait AuthorClassifier: Send + Sync {
    fn is_bot(&self, author: &str) -> bool;
}

impl<F> AuthorClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_bot(&self, author: &str) -> bool {
        self(author)
    }
}

/// One case-insensitive rule over an author's display name.
///
/// In TOML: `{ contains = "coderabbit" }`, `{ ends_with = "bot" }`,
/// `{ starts_with = "ci-" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotPattern {
    Contains(String),
    StartsWith(String),
    EndsWith(String),
}

impl BotPattern {
    fn matches(&self, lowered: &str) -> bool {
        match self {
            BotPattern::Contains(p) => lowered.contains(&p.to_lowercase()),
            BotPattern::StartsWith(p) => lowered.starts_with(&p.to_lowercase()),
            BotPattern::EndsWith(p) => lowered.ends_with(&p.to_lowercase()),
        }
    }
}

/// Ordered pattern list; any match marks the author as a bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotPatterns {
    patterns: Vec<BotPattern>,
}

impl BotPatterns {
    pub fn new(patterns: Vec<BotPattern>) -> Self {
        Self { patterns }
    }

    /// Configured patterns, or the built-in set when none are configured.
    pub fn from_config(patterns: Option<Vec<BotPattern>>) -> Self {
        patterns.map(Self::new).unwrap_or_default()
    }

    pub fn patterns(&self) -> &[BotPattern] {
        &self.patterns
    }
}

impl Default for BotPatterns {
    /// CodeRabbit, `*bot` accounts and GitHub-style `[bot]` apps.
    fn default() -> Self {
        Self::new(vec![
            BotPattern::Contains("coderabbit".to_string()),
            BotPattern::EndsWith("bot".to_string()),
            BotPattern::Contains("[bot]".to_string()),
        ])
    }
}

impl AuthorClassifier for BotPatterns {
    fn is_bot(&self, author: &str) -> bool {
        let lowered = author.to_lowercase();
        self.patterns.iter().any(|p| p.matches(&lowered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_detect_bots() {
        let bots = BotPatterns::default();
        assert!(bots.is_bot("coderabbitai"));
        assert!(bots.is_bot("CodeRabbit Reviewer"));
        assert!(bots.is_bot("Renovate Bot"));
        assert!(bots.is_bot("dependaBOT"));
        assert!(bots.is_bot("github-actions[bot]"));
        assert!(bots.is_bot("Snyk [BOT] scanner"));
    }

    #[test]
    fn test_default_patterns_leave_humans_alone() {
        let bots = BotPatterns::default();
        assert!(!bots.is_bot("Alice Smith"));
        assert!(!bots.is_bot("Bottom Line"));
        assert!(!bots.is_bot("robot arm fan club member"));
        assert!(!bots.is_bot(""));
    }

    #[test]
    fn test_configured_patterns_replace_defaults() {
        let bots = BotPatterns::from_config(Some(vec![BotPattern::StartsWith("CI-".to_string())]));
        assert!(bots.is_bot("ci-runner"));
        assert!(!bots.is_bot("coderabbitai"));
        assert_eq!(bots.patterns().len(), 1);

        assert_eq!(BotPatterns::from_config(None), BotPatterns::default());
    }

    #[test]
    fn test_closure_classifier() {
        let classifier = |name: &str| name == "Jenkins";
        assert!(classifier.is_bot("Jenkins"));
        assert!(!classifier.is_bot("Alice"));
    }
}
