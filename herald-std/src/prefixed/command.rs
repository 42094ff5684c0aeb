use crate::extension::{ErrorCallback, Extension};
use herald_core::{
    BoxError, Callback, Check, CommandError, Handler, InvokeContext, Outcome, PrefixedContext,
    RegistrationError, SharedError,
};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A text command invoked by a message starting with one of the client's
/// prefixes.
///
/// Subcommands form a tree walked word by word. A command without a callback
/// is a pure group: it can be descended through but never executed.
pub struct PrefixedCommand {
    name: String,
    aliases: Vec<String>,
    help: Option<String>,
    enabled: AtomicBool,
    hierarchical_checking: bool,
    callback: Option<Callback<Arc<PrefixedContext>>>,
    checks: Vec<Check<InvokeContext>>,
    error_callback: Option<ErrorCallback>,
    extension: Option<Arc<Extension>>,
    subcommands: IndexMap<String, Arc<PrefixedCommand>>,
}

impl PrefixedCommand {
    /// An executable command.
    pub fn new<H>(name: impl Into<String>, handler: H) -> Self
    where
        H: Handler<Arc<PrefixedContext>, Output = Outcome>,
    {
        let mut command = Self::group(name);
        command.callback = Some(Arc::new(handler));
        command
    }

    /// A command that only holds subcommands.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            help: None,
            enabled: AtomicBool::new(true),
            hierarchical_checking: true,
            callback: None,
            checks: Vec::new(),
            error_callback: None,
            extension: None,
            subcommands: IndexMap::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        if alias != self.name && !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_check<H>(mut self, check: H) -> Self
    where
        H: Handler<InvokeContext, Output = Result<bool, BoxError>>,
    {
        self.checks.push(Arc::new(check));
        self
    }

    /// Whether this command's checks gate access to its subcommands.
    /// Enabled by default.
    pub fn with_hierarchical_checking(mut self, enabled: bool) -> Self {
        self.hierarchical_checking = enabled;
        self
    }

    /// Handles a failed hierarchical check of this command in place of the
    /// `command_error` event.
    pub fn with_error_callback<H>(mut self, handler: H) -> Self
    where
        H: Handler<(SharedError, InvokeContext), Output = Outcome>,
    {
        self.error_callback = Some(Arc::new(handler));
        self
    }

    pub fn with_extension(mut self, extension: Arc<Extension>) -> Self {
        self.extension = Some(extension);
        self
    }

    /// Adds a subcommand under its name and aliases.
    pub fn add_subcommand(&mut self, command: PrefixedCommand) -> Result<(), RegistrationError> {
        if let Some(taken) = command.names().find(|n| self.subcommands.contains_key(*n)) {
            return Err(RegistrationError::DuplicatePrefixed(format!("{} {taken}", self.name)));
        }
        let command = Arc::new(command);
        for name in command.names() {
            self.subcommands.insert(name.to_owned(), Arc::clone(&command));
        }
        Ok(())
    }

    /// Builder form of [`add_subcommand`](Self::add_subcommand).
    pub fn with_subcommand(mut self, command: PrefixedCommand) -> Result<Self, RegistrationError> {
        self.add_subcommand(command)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Disabled commands are invisible to resolution.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn hierarchical_checking(&self) -> bool {
        self.hierarchical_checking
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub fn has_subcommands(&self) -> bool {
        !self.subcommands.is_empty()
    }

    /// Looks up a subcommand by name or alias.
    pub fn subcommand(&self, word: &str) -> Option<&Arc<PrefixedCommand>> {
        self.subcommands.get(word)
    }

    pub fn error_callback(&self) -> Option<&ErrorCallback> {
        self.error_callback.as_ref()
    }

    pub fn extension(&self) -> Option<&Arc<Extension>> {
        self.extension.as_ref()
    }

    /// Runs every check in order, failing on the first that rejects.
    pub async fn can_run(&self, ctx: &InvokeContext) -> Outcome {
        for check in &self.checks {
            if !check.call_dyn(ctx.clone()).await? {
                return Err(Box::new(CommandError::CheckFailure(self.name.clone())));
            }
        }
        Ok(())
    }

    /// Runs the checks, then the callback.
    pub async fn invoke(&self, ctx: Arc<PrefixedContext>) -> Outcome {
        self.can_run(&InvokeContext::Prefixed(Arc::clone(&ctx))).await?;
        match &self.callback {
            Some(callback) => callback.call_dyn(ctx).await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for PrefixedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefixedCommand")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("enabled", &self.enabled())
            .field("subcommands", &self.subcommands.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
