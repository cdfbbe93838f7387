use super::{standard_commands, Command};
use crate::error::CommandError;
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::Arc;

const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Name-keyed command table. Populated once at startup, then shared read-only.
#[derive(Clone, Default)]
pub struct Registry {
    commands: HashMap<&'static str, Arc<dyn Command>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding [`standard_commands`].
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for command in standard_commands() {
            // Names in the standard set are unique; a duplicate is a build-time bug.
            if let Err(err) = registry.register(command) {
                tracing::error!(%err, "standard command set contains a duplicate");
            }
        }
        registry
    }

    /// # Errors
    /// Returns `CommandError::Duplicate` if the name is already taken.
    pub fn register(&mut self, command: Arc<dyn Command>) -> Result<(), CommandError> {
        let name = command.name();
        if self.commands.contains_key(name) {
            return Err(CommandError::Duplicate(name.to_string()));
        }
        self.commands.insert(name, command);
        Ok(())
    }

    /// # Errors
    /// Returns `CommandError::Unknown`, with close matches, if no command has this name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Command>, CommandError> {
        self.commands
            .get(name)
            .cloned()
            .ok_or_else(|| CommandError::Unknown {
                name: name.to_string(),
                suggestions: self.suggest(name),
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().sorted_unstable().collect()
    }

    #[must_use]
    pub fn suggest(&self, typo: &str) -> Vec<String> {
        self.names()
            .into_iter()
            .map(|name| (name, strsim::levenshtein(typo, name)))
            .filter(|(_, dist)| *dist <= MAX_SUGGESTION_DISTANCE)
            .min_by_key(|(_, dist)| *dist)
            .map(|(name, _)| vec![name.to_string()])
            .unwrap_or_default()
    }

    /// One line per command, sorted by name.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.names()
            .into_iter()
            .filter_map(|name| self.commands.get(name))
            .map(|command| command.summary().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;
    use crate::command::Plain;
    use crate::error::CommandError;
    use std::sync::Arc;

    #[test]
    fn standard_registry_resolves_every_builtin() {
        let registry = Registry::standard();
        for name in ["show", "add", "update", "remove_by_id", "execute_script", "exit", "save"] {
            assert!(registry.resolve(name).is_ok(), "{name} should resolve");
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = Registry::new();
        assert!(registry.register(Arc::new(Plain::new("show", ""))).is_ok());
        assert_eq!(
            registry
                .register(Arc::new(Plain::new("show", "")))
                .err(),
            Some(CommandError::Duplicate("show".to_string()))
        );
    }

    #[test]
    fn unknown_command_suggests_closest_name() {
        let registry = Registry::standard();
        match registry.resolve("shwo") {
            Err(CommandError::Unknown { name, suggestions }) => {
                assert_eq!(name, "shwo");
                assert_eq!(suggestions, vec!["show".to_string()]);
            }
            _ => panic!("expected unknown command"),
        }
    }

    #[test]
    fn unrelated_typo_has_no_suggestion() {
        assert!(Registry::standard().suggest("zzzzzzzzzzzz").is_empty());
    }
}
