//! Lifecycle hooks around save and delete
//!
//! Callbacks register per event and run in registration order. Each receives
//! a mutable [`HookContext`] and may rewrite the in-flight data or veto the
//! operation by returning an error message; a veto inside the write path
//! rolls the transaction back.

use std::collections::HashMap;

use crate::crud::FormData;
use crate::error::{DynCrudError, Result};

/// Named lifecycle events, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Before schema validation, after sanitizing
    BeforeValidate,
    /// After validation passed
    AfterValidate,
    /// Before any write, create or update
    BeforeSave,
    /// After the write, inside the transaction
    AfterSave,
    /// Before an INSERT
    BeforeCreate,
    /// After an INSERT, inside the transaction
    AfterCreate,
    /// Before an UPDATE
    BeforeUpdate,
    /// After an UPDATE, inside the transaction
    AfterUpdate,
    /// Before a DELETE
    BeforeDelete,
    /// After a DELETE, inside the transaction
    AfterDelete,
}

impl HookEvent {
    /// Event name as used in registration APIs and messages
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeValidate => "beforeValidate",
            Self::AfterValidate => "afterValidate",
            Self::BeforeSave => "beforeSave",
            Self::AfterSave => "afterSave",
            Self::BeforeCreate => "beforeCreate",
            Self::AfterCreate => "afterCreate",
            Self::BeforeUpdate => "beforeUpdate",
            Self::AfterUpdate => "afterUpdate",
            Self::BeforeDelete => "beforeDelete",
            Self::AfterDelete => "afterDelete",
        }
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State handed to each hook callback
#[derive(Debug)]
pub struct HookContext<'a> {
    /// Event being dispatched
    pub event: HookEvent,
    /// Record id, when known (updates, deletes, after-create)
    pub id: Option<i64>,
    /// In-flight submission data; mutations are visible downstream
    pub data: &'a mut FormData,
}

/// Outcome of a single hook callback; `Err` vetoes the operation
pub type HookResult = std::result::Result<(), String>;

type HookFn = Box<dyn Fn(&mut HookContext<'_>) -> HookResult + Send + Sync>;

/// Ordered callbacks per event
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<HookEvent, Vec<HookFn>>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<String> = self
            .hooks
            .iter()
            .map(|(event, callbacks)| format!("{event}×{}", callbacks.len()))
            .collect();
        counts.sort();
        f.debug_struct("HookRegistry").field("hooks", &counts).finish()
    }
}

impl HookRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for an event
    pub fn on<F>(&mut self, event: HookEvent, callback: F)
    where
        F: Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.entry(event).or_default().push(Box::new(callback));
    }

    /// Number of callbacks registered for an event
    #[must_use]
    pub fn count(&self, event: HookEvent) -> usize {
        self.hooks.get(&event).map_or(0, Vec::len)
    }

    /// Run every callback for an event, in registration order
    ///
    /// The first veto stops the chain.
    pub fn run(&self, event: HookEvent, id: Option<i64>, data: &mut FormData) -> Result<()> {
        let Some(callbacks) = self.hooks.get(&event) else {
            return Ok(());
        };
        tracing::debug!(%event, count = callbacks.len(), "running hooks");
        let mut ctx = HookContext { event, id, data };
        for callback in callbacks {
            callback(&mut ctx).map_err(|message| DynCrudError::HookVeto { event, message })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_hooks_fire_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            registry.on(HookEvent::BeforeSave, move |_| {
                order.lock().unwrap().push(tag);
                Ok(())
            });
        }

        let mut data = FormData::new();
        registry.run(HookEvent::BeforeSave, None, &mut data).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_hook_mutations_accumulate() {
        let mut registry = HookRegistry::new();
        registry.on(HookEvent::BeforeSave, |ctx| {
            ctx.data.insert("slug".into(), "hello-world".into());
            Ok(())
        });
        registry.on(HookEvent::BeforeSave, |ctx| {
            let slug = ctx.data.get("slug").cloned().unwrap_or_default();
            ctx.data.insert("slug".into(), format!("{slug}-2"));
            Ok(())
        });

        let mut data = FormData::new();
        registry.run(HookEvent::BeforeSave, None, &mut data).unwrap();
        assert_eq!(data.get("slug").map(String::as_str), Some("hello-world-2"));
    }

    #[test]
    fn test_veto_stops_chain() {
        let ran_after = Arc::new(Mutex::new(false));
        let mut registry = HookRegistry::new();
        registry.on(HookEvent::BeforeDelete, |_| Err("protected row".into()));
        {
            let ran_after = ran_after.clone();
            registry.on(HookEvent::BeforeDelete, move |_| {
                *ran_after.lock().unwrap() = true;
                Ok(())
            });
        }

        let mut data = FormData::new();
        let err = registry
            .run(HookEvent::BeforeDelete, Some(7), &mut data)
            .unwrap_err();
        assert!(matches!(err, DynCrudError::HookVeto { event: HookEvent::BeforeDelete, .. }));
        assert!(!*ran_after.lock().unwrap());
    }

    #[test]
    fn test_unregistered_event_is_noop() {
        let registry = HookRegistry::new();
        let mut data = FormData::new();
        assert!(registry.run(HookEvent::AfterSave, None, &mut data).is_ok());
    }
}
