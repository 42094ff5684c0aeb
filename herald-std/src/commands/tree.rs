//! Registry of structured commands.

use super::interaction::InteractionCommand;
use herald_core::{RegistrationError, Scope, Snowflake};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// A node of the per-scope command tree.
#[derive(Debug, Clone)]
pub enum TreeNode {
    Command(Arc<InteractionCommand>),
    Group(IndexMap<String, TreeNode>),
}

impl TreeNode {
    fn as_group_mut(&mut self, scope: Scope, path: &str) -> &mut IndexMap<String, TreeNode> {
        if let TreeNode::Command(previous) = self {
            warn!(
                %scope,
                command = previous.name(),
                "`{path}` is now a group; the command previously registered under it is unreachable"
            );
            *self = TreeNode::Group(IndexMap::new());
        }
        match self {
            TreeNode::Group(children) => children,
            TreeNode::Command(_) => unreachable!("node was just replaced by a group"),
        }
    }
}

/// Structured commands, keyed by scope and resolved name, plus the
/// remote-id-to-scope map filled in by the cache and sync passes.
#[derive(Debug, Default)]
pub struct CommandTree {
    commands: IndexMap<Scope, IndexMap<String, Arc<InteractionCommand>>>,
    tree: IndexMap<Scope, IndexMap<String, TreeNode>>,
    scopes_by_id: HashMap<String, Scope>,
}

impl CommandTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a command into every scope it declares.
    ///
    /// Fails without modifying anything if the resolved name is already taken
    /// in any of those scopes.
    pub fn insert(&mut self, command: Arc<InteractionCommand>) -> Result<(), RegistrationError> {
        for scope in command.scopes() {
            if self
                .commands
                .get(scope)
                .is_some_and(|names| names.contains_key(command.name()))
            {
                return Err(RegistrationError::DuplicateCommand {
                    scope: *scope,
                    name: command.name().to_owned(),
                });
            }
        }

        for &scope in command.scopes() {
            self.commands
                .entry(scope)
                .or_default()
                .insert(command.name().to_owned(), Arc::clone(&command));
            self.insert_node(scope, &command);
        }
        Ok(())
    }

    fn insert_node(&mut self, scope: Scope, command: &Arc<InteractionCommand>) {
        let root = self.tree.entry(scope).or_default();
        let node = TreeNode::Command(Arc::clone(command));

        let Some(group) = command.group() else {
            root.insert(command.name().to_owned(), node);
            return;
        };
        let base = command.base();
        let children = root
            .entry(base.to_owned())
            .or_insert_with(|| TreeNode::Group(IndexMap::new()))
            .as_group_mut(scope, base);

        match command.sub() {
            None => {
                children.insert(group.to_owned(), node);
            }
            Some(sub) => {
                let path = format!("{base} {group}");
                children
                    .entry(group.to_owned())
                    .or_insert_with(|| TreeNode::Group(IndexMap::new()))
                    .as_group_mut(scope, &path)
                    .insert(sub.to_owned(), node);
            }
        }
    }

    /// Looks up a command by resolved name.
    pub fn get(&self, scope: Scope, name: &str) -> Option<&Arc<InteractionCommand>> {
        self.commands.get(&scope)?.get(name)
    }

    /// The top-level tree node for `base` in `scope`.
    pub fn node(&self, scope: Scope, base: &str) -> Option<&TreeNode> {
        self.tree.get(&scope)?.get(base)
    }

    /// Scopes holding at least one command, in first-registration order.
    pub fn scopes(&self) -> impl Iterator<Item = Scope> + '_ {
        self.commands.keys().copied()
    }

    /// Commands of `scope`, in registration order.
    pub fn commands_in(&self, scope: Scope) -> impl Iterator<Item = &Arc<InteractionCommand>> {
        self.commands.get(&scope).into_iter().flat_map(|names| names.values())
    }

    pub fn is_empty(&self) -> bool {
        self.commands.values().all(IndexMap::is_empty)
    }

    /// Records the scope of a remote command id.
    pub fn record_scope(&mut self, id: Snowflake, scope: Scope) {
        self.scopes_by_id.insert(id.to_string(), scope);
    }

    /// The scope a remote command id was last seen in.
    pub fn scope_of(&self, id: Snowflake) -> Option<Scope> {
        self.scopes_by_id.get(&id.to_string()).copied()
    }

    /// Finds the local command bound to a remote id.
    pub fn command_by_id(&self, id: Snowflake) -> Option<Arc<InteractionCommand>> {
        let scope = self.scope_of(id)?;
        self.commands_in(scope)
            .find(|command| command.cmd_id(scope) == Some(id))
            .cloned()
    }

    /// Removes every command attributed to `extension` and rebuilds the tree.
    /// Returns how many registrations were removed.
    pub fn remove_extension(&mut self, extension: &str) -> usize {
        let mut removed = 0;
        for names in self.commands.values_mut() {
            let before = names.len();
            names.retain(|_, command| command.extension().is_none_or(|ext| ext.name() != extension));
            removed += before - names.len();
        }
        self.commands.retain(|_, names| !names.is_empty());

        self.tree.clear();
        let remaining: Vec<(Scope, Arc<InteractionCommand>)> = self
            .commands
            .iter()
            .flat_map(|(scope, names)| names.values().map(|command| (*scope, Arc::clone(command))))
            .collect();
        for (scope, command) in remaining {
            self.insert_node(scope, &command);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::Extension;
    use herald_core::{InteractionContext, Outcome};

    fn cmd(name: &str) -> InteractionCommand {
        InteractionCommand::slash(name, "test")
            .with_callback(|_ctx: Arc<InteractionContext>| async { Outcome::Ok(()) })
    }

    #[test]
    fn test_duplicate_rejected_without_replacing() {
        let mut tree = CommandTree::new();
        let first = Arc::new(cmd("ping"));
        tree.insert(Arc::clone(&first)).unwrap();

        let err = tree.insert(Arc::new(cmd("ping"))).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::DuplicateCommand {
                scope: Scope::Global,
                name: "ping".into()
            }
        );
        assert!(Arc::ptr_eq(tree.get(Scope::Global, "ping").unwrap(), &first));
    }

    #[test]
    fn test_duplicate_in_one_scope_applies_nowhere() {
        let guild = Scope::Guild(Snowflake(1));
        let mut tree = CommandTree::new();
        tree.insert(Arc::new(cmd("ping").with_scopes([guild]))).unwrap();

        let both = Arc::new(cmd("ping").with_scopes([Scope::Global, guild]));
        assert!(tree.insert(both).is_err());
        assert!(tree.get(Scope::Global, "ping").is_none());
    }

    #[test]
    fn test_nested_insertion() {
        let mut tree = CommandTree::new();
        tree.insert(Arc::new(cmd("mod user ban"))).unwrap();
        tree.insert(Arc::new(cmd("mod user kick"))).unwrap();
        tree.insert(Arc::new(cmd("mod purge"))).unwrap();

        let Some(TreeNode::Group(base)) = tree.node(Scope::Global, "mod") else {
            panic!("expected group");
        };
        assert!(matches!(base.get("purge"), Some(TreeNode::Command(_))));
        let Some(TreeNode::Group(user)) = base.get("user") else {
            panic!("expected group");
        };
        assert_eq!(user.len(), 2);
    }

    #[test]
    fn test_leaf_replaced_by_group() {
        let mut tree = CommandTree::new();
        tree.insert(Arc::new(cmd("config"))).unwrap();
        tree.insert(Arc::new(cmd("config show"))).unwrap();

        assert!(matches!(tree.node(Scope::Global, "config"), Some(TreeNode::Group(_))));
        // The flat map still knows both.
        assert!(tree.get(Scope::Global, "config").is_some());
        assert!(tree.get(Scope::Global, "config show").is_some());
    }

    #[test]
    fn test_remove_extension() {
        let ext = Arc::new(Extension::new("moderation"));
        let mut tree = CommandTree::new();
        tree.insert(Arc::new(cmd("mod ban").with_extension(Arc::clone(&ext)))).unwrap();
        tree.insert(Arc::new(cmd("ping"))).unwrap();

        assert_eq!(tree.remove_extension("moderation"), 1);
        assert!(tree.node(Scope::Global, "mod").is_none());
        assert!(tree.get(Scope::Global, "ping").is_some());
    }

    #[test]
    fn test_command_by_id() {
        let mut tree = CommandTree::new();
        let ping = Arc::new(cmd("ping"));
        tree.insert(Arc::clone(&ping)).unwrap();
        ping.set_cmd_id(Scope::Global, Snowflake(77));
        tree.record_scope(Snowflake(77), Scope::Global);

        assert!(Arc::ptr_eq(&tree.command_by_id(Snowflake(77)).unwrap(), &ping));
        assert!(tree.command_by_id(Snowflake(78)).is_none());
    }
}
