//! Component and modal callbacks, keyed by custom id.

use crate::extension::Extension;
use herald_core::{Callback, Handler, InteractionContext, Outcome, RegistrationError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A callback bound to one or more custom ids.
#[derive(Clone)]
pub struct InteractionCallback {
    custom_ids: Vec<String>,
    callback: Callback<Arc<InteractionContext>>,
    extension: Option<Arc<Extension>>,
}

impl InteractionCallback {
    pub fn new<H, I, S>(custom_ids: I, handler: H) -> Self
    where
        H: Handler<Arc<InteractionContext>, Output = Outcome>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            custom_ids: custom_ids.into_iter().map(Into::into).collect(),
            callback: Arc::new(handler),
            extension: None,
        }
    }

    pub fn with_extension(mut self, extension: Arc<Extension>) -> Self {
        self.extension = Some(extension);
        self
    }

    pub fn custom_ids(&self) -> &[String] {
        &self.custom_ids
    }

    pub fn extension(&self) -> Option<&Arc<Extension>> {
        self.extension.as_ref()
    }

    pub async fn call(&self, ctx: Arc<InteractionContext>) -> Outcome {
        self.callback.call_dyn(ctx).await
    }
}

impl fmt::Debug for InteractionCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionCallback")
            .field("custom_ids", &self.custom_ids)
            .field("extension", &self.extension.as_ref().map(|ext| ext.name()))
            .finish()
    }
}

/// Component and modal callback tables.
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    components: HashMap<String, Arc<InteractionCallback>>,
    modals: HashMap<String, Arc<InteractionCallback>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a component callback to each of its custom ids.
    pub fn add_component(&mut self, callback: InteractionCallback) -> Result<(), RegistrationError> {
        insert_all(&mut self.components, callback, RegistrationError::DuplicateComponent)
    }

    /// Binds a modal callback to each of its custom ids.
    pub fn add_modal(&mut self, callback: InteractionCallback) -> Result<(), RegistrationError> {
        insert_all(&mut self.modals, callback, RegistrationError::DuplicateModal)
    }

    pub fn component(&self, custom_id: &str) -> Option<Arc<InteractionCallback>> {
        self.components.get(custom_id).cloned()
    }

    pub fn modal(&self, custom_id: &str) -> Option<Arc<InteractionCallback>> {
        self.modals.get(custom_id).cloned()
    }

    /// Removes every callback attributed to `extension`. Returns how many
    /// custom ids were freed.
    pub fn remove_extension(&mut self, extension: &str) -> usize {
        let owned_by = |callback: &Arc<InteractionCallback>| {
            callback.extension().is_some_and(|ext| ext.name() == extension)
        };
        let before = self.components.len() + self.modals.len();
        self.components.retain(|_, callback| !owned_by(callback));
        self.modals.retain(|_, callback| !owned_by(callback));
        before - self.components.len() - self.modals.len()
    }
}

fn insert_all(
    table: &mut HashMap<String, Arc<InteractionCallback>>,
    callback: InteractionCallback,
    duplicate: fn(String) -> RegistrationError,
) -> Result<(), RegistrationError> {
    let mut seen = Vec::with_capacity(callback.custom_ids.len());
    for id in &callback.custom_ids {
        if table.contains_key(id) || seen.contains(&id) {
            return Err(duplicate(id.clone()));
        }
        seen.push(id);
    }
    let callback = Arc::new(callback);
    for id in &callback.custom_ids {
        table.insert(id.clone(), Arc::clone(&callback));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(ids: &[&str]) -> InteractionCallback {
        InteractionCallback::new(ids.to_vec(), |_ctx: Arc<InteractionContext>| async {
            Outcome::Ok(())
        })
    }

    #[test]
    fn test_duplicate_component_rejected_atomically() {
        let mut registry = CallbackRegistry::new();
        registry.add_component(noop(&["confirm"])).unwrap();

        let err = registry.add_component(noop(&["cancel", "confirm"])).unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateComponent("confirm".into()));
        assert!(registry.component("cancel").is_none());

        // Modals live in their own namespace.
        registry.add_modal(noop(&["confirm"])).unwrap();
        assert_eq!(
            registry.add_modal(noop(&["confirm"])).unwrap_err(),
            RegistrationError::DuplicateModal("confirm".into())
        );
    }

    #[test]
    fn test_remove_extension() {
        let ext = Arc::new(Extension::new("polls"));
        let mut registry = CallbackRegistry::new();
        registry
            .add_component(noop(&["vote_yes", "vote_no"]).with_extension(Arc::clone(&ext)))
            .unwrap();
        registry.add_component(noop(&["other"])).unwrap();

        assert_eq!(registry.remove_extension("polls"), 2);
        assert!(registry.component("vote_yes").is_none());
        assert!(registry.component("other").is_some());
    }
}
