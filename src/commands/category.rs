use std::{fmt, sync::Arc};

use super::{Check, Command, Source};

/// A named collection of commands sharing checks that run before each
/// command's own checks.
#[derive(Clone)]
pub struct Category {
    pub name: String,
    pub commands: Vec<Command>,
    pub checks: Vec<Check>,
    pub source: Option<Arc<dyn Source>>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: vec![],
            checks: vec![],
            source: None,
        }
    }

    pub fn command(mut self, mut command: Command) -> Self {
        command.category = Some(self.name.clone());
        self.commands.push(command);
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn checks(mut self, checks: Vec<Check>) -> Self {
        self.checks = checks;
        self
    }

    pub fn source(mut self, source: Arc<dyn Source>) -> Self {
        self.source = Some(source);
        self
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Category")
            .field("name", &self.name)
            .field("commands", &self.commands)
            .field("checks", &self.checks)
            .field("source", &self.source.as_ref().map(|s| s.location().to_string()))
            .finish()
    }
}
