use super::command::PrefixedCommand;
use herald_core::RegistrationError;
use indexmap::IndexMap;
use std::sync::Arc;

/// Top-level prefixed commands, reachable by name and by alias.
#[derive(Debug, Default)]
pub struct PrefixedRegistry {
    commands: IndexMap<String, Arc<PrefixedCommand>>,
}

impl PrefixedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command under its name and every alias.
    ///
    /// Fails without registering anything if any of them is taken.
    pub fn add(&mut self, command: PrefixedCommand) -> Result<Arc<PrefixedCommand>, RegistrationError> {
        if let Some(taken) = command.names().find(|n| self.commands.contains_key(*n)) {
            return Err(RegistrationError::DuplicatePrefixed(taken.to_owned()));
        }
        let command = Arc::new(command);
        for name in command.names() {
            self.commands.insert(name.to_owned(), Arc::clone(&command));
        }
        Ok(command)
    }

    /// Looks up a command by name or alias.
    pub fn get(&self, word: &str) -> Option<Arc<PrefixedCommand>> {
        self.commands.get(word).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Distinct commands, in registration order.
    pub fn commands(&self) -> Vec<Arc<PrefixedCommand>> {
        let mut unique: Vec<Arc<PrefixedCommand>> = Vec::new();
        for command in self.commands.values() {
            if !unique.iter().any(|seen| Arc::ptr_eq(seen, command)) {
                unique.push(Arc::clone(command));
            }
        }
        unique
    }

    /// Removes every command attributed to `extension`. Returns how many
    /// commands were removed.
    pub fn remove_extension(&mut self, extension: &str) -> usize {
        let doomed: Vec<Arc<PrefixedCommand>> = self
            .commands()
            .into_iter()
            .filter(|cmd| cmd.extension().is_some_and(|ext| ext.name() == extension))
            .collect();
        self.commands
            .retain(|_, cmd| !doomed.iter().any(|gone| Arc::ptr_eq(gone, cmd)));
        doomed.len()
    }
}
