use std::{fmt, future::Future, sync::Arc};

use futures::future::BoxFuture;
use regex::{Regex, RegexBuilder};

use crate::{dispatch::Framework, model::Message, model::UserId};

pub type PrefixFuture = BoxFuture<'static, anyhow::Result<Prefix>>;
pub type DynamicPrefixFn = Arc<dyn Fn(Framework, Arc<Message>) -> PrefixFuture + Send + Sync>;
pub type DeferredPrefixFn = Arc<dyn Fn(&Framework) -> Prefix + Send + Sync>;

/// How many times a prefix function may return another function.
const MAX_NESTING: usize = 1;

/// The prefix configuration of a framework.
#[derive(Clone)]
pub enum Prefix {
    Static(String),
    /// Any of these, tried in order
    List(Vec<String>),
    /// Computed per message
    Dynamic(DynamicPrefixFn),
    /// Computed from the framework alone; can be bound once with
    /// [`Framework::bind_prefix`] and reused for every message afterwards
    Deferred(DeferredPrefixFn),
}

impl Prefix {
    pub fn dynamic<F, Fut>(resolver: F) -> Self
    where
        F: Fn(Framework, Arc<Message>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Prefix>> + Send + 'static,
    {
        Self::Dynamic(Arc::new(move |framework, message| {
            Box::pin(resolver(framework, message))
        }))
    }

    pub fn deferred<F>(resolver: F) -> Self
    where
        F: Fn(&Framework) -> Prefix + Send + Sync + 'static,
    {
        Self::Deferred(Arc::new(resolver))
    }

    /// Matches mentions of the application user.
    pub fn when_mentioned() -> Self {
        Self::when_mentioned_or(Vec::<String>::new())
    }

    /// Matches mentions of the application user, then any of `base`.
    pub fn when_mentioned_or<I, S>(base: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let base: Vec<String> = base.into_iter().map(Into::into).collect();
        Self::deferred(move |framework| {
            let mut literals = framework
                .platform()
                .current_user()
                .map(|me| mention_forms(&me.id))
                .unwrap_or_default();
            literals.extend(base.iter().cloned());
            Prefix::List(literals)
        })
    }

    /// True when this prefix can never match anything.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Static(prefix) => prefix.is_empty(),
            Self::List(prefixes) => prefixes.iter().all(String::is_empty),
            Self::Dynamic(_) | Self::Deferred(_) => false,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_) | Self::List(_))
    }

    /// Evaluates functions until a string or list comes out.
    pub(crate) async fn literals(
        &self,
        framework: &Framework,
        message: &Arc<Message>,
    ) -> anyhow::Result<Vec<String>> {
        let mut current = self.clone();
        let mut invocations = 0;
        loop {
            current = match current {
                Self::Static(prefix) => return Ok(vec![prefix]),
                Self::List(prefixes) => return Ok(prefixes),
                _ if invocations > MAX_NESTING => {
                    anyhow::bail!("prefix functions nested too deeply")
                }
                Self::Dynamic(resolver) => {
                    invocations += 1;
                    resolver(framework.clone(), message.clone()).await?
                }
                Self::Deferred(resolver) => {
                    invocations += 1;
                    resolver(framework)
                }
            };
        }
    }
}

impl From<&str> for Prefix {
    fn from(prefix: &str) -> Self {
        Self::Static(prefix.to_string())
    }
}

impl From<String> for Prefix {
    fn from(prefix: String) -> Self {
        Self::Static(prefix)
    }
}

impl From<Vec<String>> for Prefix {
    fn from(prefixes: Vec<String>) -> Self {
        Self::List(prefixes)
    }
}

impl From<&[&str]> for Prefix {
    fn from(prefixes: &[&str]) -> Self {
        Self::List(prefixes.iter().map(|p| p.to_string()).collect())
    }
}

impl fmt::Debug for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(prefix) => f.debug_tuple("Static").field(prefix).finish(),
            Self::List(prefixes) => f.debug_tuple("List").field(prefixes).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// `<@id> `, `<@!id> `, `<@id>`, `<@!id>`
pub fn mention_forms(id: &UserId) -> Vec<String> {
    vec![
        format!("<@{id}> "),
        format!("<@!{id}> "),
        format!("<@{id}>"),
        format!("<@!{id}>"),
    ]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixMatch {
    /// The prefix as it appears in the message
    pub prefix: String,
    /// Bytes to skip to reach the command token, including any permitted
    /// whitespace
    pub len: usize,
}

/// A compiled, case-insensitive alternation over literal prefixes.
#[derive(Debug)]
pub struct PrefixMatcher {
    regex: Option<Regex>,
}

impl PrefixMatcher {
    pub fn new(literals: &[String], allow_spaces: bool) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = literals
            .iter()
            .filter(|l| !l.is_empty())
            .map(|l| regex::escape(l))
            .collect();
        if alternatives.is_empty() {
            return Ok(Self { regex: None });
        }

        let mut pattern = format!("^({})", alternatives.join("|"));
        if allow_spaces {
            pattern.push_str(r"\s*");
        }
        let regex = RegexBuilder::new(&pattern).case_insensitive(true).build()?;
        Ok(Self { regex: Some(regex) })
    }

    pub fn find(&self, content: &str) -> Option<PrefixMatch> {
        let captures = self.regex.as_ref()?.captures(content)?;
        let whole = captures.get(0)?;
        let prefix = captures.get(1)?;
        Some(PrefixMatch {
            prefix: prefix.as_str().to_string(),
            len: whole.end(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literals(prefixes: &[&str]) -> Vec<String> {
        prefixes.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_matches_any_literal_case_insensitively() {
        let matcher = PrefixMatcher::new(&literals(&["hey bot ", "?"]), false).unwrap();
        assert_eq!(
            matcher.find("HEY BOT ping"),
            Some(PrefixMatch {
                prefix: "HEY BOT ".into(),
                len: 8
            })
        );
        assert_eq!(matcher.find("?ping").map(|m| m.len), Some(1));
        assert_eq!(matcher.find("ping?"), None);
    }

    #[test]
    fn test_literals_are_escaped() {
        let matcher = PrefixMatcher::new(&literals(&["$."]), false).unwrap();
        assert!(matcher.find("$.ping").is_some());
        assert!(matcher.find("$xping").is_none());
    }

    #[test]
    fn test_prefix_spaces() {
        let strict = PrefixMatcher::new(&literals(&["!"]), false).unwrap();
        assert_eq!(strict.find("!   ping").map(|m| m.len), Some(1));

        let loose = PrefixMatcher::new(&literals(&["!"]), true).unwrap();
        let found = loose.find("!   ping").unwrap();
        assert_eq!(found.prefix, "!");
        assert_eq!(found.len, 4);
    }

    #[test]
    fn test_empty_literals_never_match() {
        let matcher = PrefixMatcher::new(&literals(&["", ""]), true).unwrap();
        assert!(matcher.find("anything").is_none());
        assert!(Prefix::List(literals(&[""])).is_empty());
        assert!(!Prefix::when_mentioned().is_empty());
    }

    #[test]
    fn test_mention_forms_prefer_trailing_space() {
        let forms = mention_forms(&UserId::new("150000000000000009"));
        let matcher = PrefixMatcher::new(&forms, false).unwrap();
        let found = matcher.find("<@!150000000000000009> ping").unwrap();
        assert_eq!(found.len, "<@!150000000000000009> ".len());
    }
}
