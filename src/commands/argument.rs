use std::collections::HashMap;

use crate::{
    context::Context,
    converter,
    error::CommandError,
    model::{Channel, Member, User},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgumentKind {
    String,
    Number,
    Member,
    User,
    Channel,
}

/// One positional parameter of a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub name: String,
    pub kind: ArgumentKind,
    pub required: bool,
    /// Absorbs every remaining token, rejoined with single spaces
    pub rest: bool,
}

impl ArgumentSpec {
    pub fn required(name: impl Into<String>, kind: ArgumentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            rest: false,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ArgumentKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    pub fn rest(mut self) -> Self {
        self.rest = true;
        self
    }

    fn usage(&self) -> String {
        if self.required {
            format!("<{}>", self.name)
        } else {
            format!("[{}]", self.name)
        }
    }
}

/// A converted argument value.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgumentValue {
    String(String),
    Number(f64),
    Member(Member),
    User(User),
    Channel(Channel),
}

/// Parsed arguments of one invocation, keyed by parameter name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments(HashMap<String, ArgumentValue>);

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&ArgumentValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ArgumentValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            ArgumentValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        match self.get(name)? {
            ArgumentValue::Member(m) => Some(m),
            _ => None,
        }
    }

    pub fn user(&self, name: &str) -> Option<&User> {
        match self.get(name)? {
            ArgumentValue::User(u) => Some(u),
            ArgumentValue::Member(m) => Some(&m.user),
            _ => None,
        }
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        match self.get(name)? {
            ArgumentValue::Channel(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn insert(&mut self, name: &str, value: ArgumentValue) {
        self.0.insert(name.to_string(), value);
    }
}

/// Renders `<required> [optional]` for every parameter.
pub(crate) fn usage(specs: &[ArgumentSpec]) -> String {
    specs
        .iter()
        .map(ArgumentSpec::usage)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Matches `tokens` against `specs` in order, converting each value.
pub(crate) fn parse(
    ctx: &Context,
    specs: &[ArgumentSpec],
    tokens: &[String],
) -> Result<Arguments, CommandError> {
    let mut arguments = Arguments::default();
    if specs.is_empty() && tokens.is_empty() {
        return Ok(arguments);
    }

    let required = specs.iter().filter(|s| s.required).count();
    if tokens.len() < required {
        return Err(CommandError::MissingArguments {
            required,
            received: tokens.len(),
        });
    }

    let takes_rest = specs.last().is_some_and(|s| s.rest);
    if tokens.len() > specs.len() && !takes_rest {
        return Err(CommandError::TooManyArguments {
            accepted: specs.len(),
            received: tokens.len(),
        });
    }

    for (i, spec) in specs.iter().enumerate() {
        let raw = if spec.rest {
            (i < tokens.len()).then(|| tokens[i..].join(" "))
        } else {
            tokens.get(i).cloned()
        };

        let Some(raw) = raw else {
            if spec.required {
                return Err(CommandError::MissingArguments {
                    required,
                    received: tokens.len(),
                });
            }
            continue;
        };

        match convert(ctx, spec.kind, &raw) {
            Some(value) => arguments.insert(&spec.name, value),
            None if spec.required => {
                return Err(CommandError::InvalidArgument {
                    name: spec.name.clone(),
                });
            }
            None => {}
        }

        if spec.rest {
            break;
        }
    }

    Ok(arguments)
}

fn convert(ctx: &Context, kind: ArgumentKind, raw: &str) -> Option<ArgumentValue> {
    match kind {
        ArgumentKind::String => {
            (!raw.is_empty()).then(|| ArgumentValue::String(raw.to_string()))
        }
        ArgumentKind::Number => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(ArgumentValue::Number),
        ArgumentKind::Member => converter::member(ctx, raw)
            .ok()
            .flatten()
            .map(ArgumentValue::Member),
        ArgumentKind::User => converter::user(ctx, raw).map(ArgumentValue::User),
        ArgumentKind::Channel => converter::channel(ctx, raw)
            .ok()
            .flatten()
            .map(ArgumentValue::Channel),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn tokens(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn test_number_must_parse() {
        let ctx = testing::guild_context("!add abc").await;
        let specs = [ArgumentSpec::required("amount", ArgumentKind::Number)];

        let err = parse(&ctx, &specs, &tokens("abc")).unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgument { ref name } if name == "amount"));

        let args = parse(&ctx, &specs, &tokens("2.5")).unwrap();
        assert_eq!(args.number("amount"), Some(2.5));

        for raw in ["inf", "-infinity", "1e999", "NaN"] {
            assert!(
                matches!(parse(&ctx, &specs, &tokens(raw)), Err(CommandError::InvalidArgument { .. })),
                "{raw}"
            );
        }
    }

    #[tokio::test]
    async fn test_argument_counts() {
        let ctx = testing::guild_context("!cmd").await;
        let specs = [
            ArgumentSpec::required("a", ArgumentKind::String),
            ArgumentSpec::required("b", ArgumentKind::String),
        ];

        assert!(matches!(
            parse(&ctx, &specs, &tokens("one")),
            Err(CommandError::MissingArguments {
                required: 2,
                received: 1
            })
        ));
        assert!(matches!(
            parse(&ctx, &specs, &tokens("one two three")),
            Err(CommandError::TooManyArguments {
                accepted: 2,
                received: 3
            })
        ));
    }

    #[tokio::test]
    async fn test_rest_joins_remaining_tokens() {
        let ctx = testing::guild_context("!say").await;
        let specs = [
            ArgumentSpec::required("target", ArgumentKind::String),
            ArgumentSpec::required("text", ArgumentKind::String).rest(),
        ];

        let args = parse(&ctx, &specs, &tokens("here   hello    there world")).unwrap();
        assert_eq!(args.str("target"), Some("here"));
        assert_eq!(args.str("text"), Some("hello there world"));
    }

    #[tokio::test]
    async fn test_optional_failures_are_omitted() {
        let ctx = testing::guild_context("!cmd").await;
        let specs = [
            ArgumentSpec::required("name", ArgumentKind::String),
            ArgumentSpec::optional("count", ArgumentKind::Number),
        ];

        let args = parse(&ctx, &specs, &tokens("x y")).unwrap();
        assert_eq!(args.str("name"), Some("x"));
        assert!(!args.contains("count"));

        let args = parse(&ctx, &specs, &tokens("x")).unwrap();
        assert_eq!(args.len(), 1);
    }

    #[tokio::test]
    async fn test_member_argument_resolves() {
        let ctx = testing::guild_context("!whois").await;
        let specs = [ArgumentSpec::required("who", ArgumentKind::Member)];

        let args = parse(&ctx, &specs, &tokens(&format!("<@!{}>", testing::ALICE_ID))).unwrap();
        assert_eq!(args.member("who").map(|m| m.user.name.as_str()), Some("alice"));

        let err = parse(&ctx, &specs, &tokens("nobody")).unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgument { .. }));
    }

    #[test]
    fn test_usage() {
        let specs = [
            ArgumentSpec::required("who", ArgumentKind::User),
            ArgumentSpec::optional("reason", ArgumentKind::String).rest(),
        ];
        assert_eq!(usage(&specs), "<who> [reason]");
    }
}
