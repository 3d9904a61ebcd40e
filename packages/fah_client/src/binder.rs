use std::any::type_name;
use std::sync::Arc;
use tracing::warn;

use crate::cache::MessageCache;
use crate::error::{BindError, MaterializeError};
use crate::kind::MessageKind;
use crate::registry::{DynMessage, MessageRegistry, TypedMessage};

/// Resolves "current value of type `T`" against the cache.
///
/// Typed messages are rebuilt from the cached payload on every call and never
/// cached themselves.
#[derive(Debug, Clone)]
pub struct Binder {
    cache: Arc<MessageCache>,
    registry: Arc<MessageRegistry>,
}

impl Binder {
    pub fn new(cache: Arc<MessageCache>) -> Self {
        let registry = cache.registry().clone();
        Self { cache, registry }
    }

    /// Kind registered for `T`.
    pub fn resolve<T: TypedMessage>(&self) -> Result<MessageKind, BindError> {
        self.registry
            .kind_of::<T>()
            .ok_or(BindError::Unresolved {
                type_name: type_name::<T>(),
            })
    }

    /// Strict form of `get`: unregistered types are an error.
    pub fn try_get<T: TypedMessage>(&self) -> Result<Option<T>, BindError> {
        let kind = self.resolve::<T>()?;
        Ok(self.materialize::<T>(kind)?)
    }

    /// Current value of `T`, or `None` if nothing has been received yet.
    ///
    /// An unregistered `T` also yields `None` and is logged.
    pub fn get<T: TypedMessage>(&self) -> Result<Option<T>, MaterializeError> {
        match self.try_get::<T>() {
            Ok(value) => Ok(value),
            Err(BindError::Unresolved { type_name }) => {
                warn!(type_name, "Requested message type is not registered");
                Ok(None)
            }
            Err(BindError::Materialize(e)) => Err(e),
        }
    }

    /// Elements of the collection message registered with item type `I`.
    ///
    /// Built through the registered collection type, so items read this way
    /// always agree with `get` on that collection.
    pub fn get_items<I: 'static>(&self) -> Result<Option<Vec<I>>, MaterializeError> {
        let Some(kind) = self.registry.kind_of_item::<I>() else {
            warn!(
                type_name = type_name::<I>(),
                "Requested item type is not registered"
            );
            return Ok(None);
        };
        let (Some(registration), Some(raw)) = (self.registry.get(kind), self.cache.get(kind)) else {
            return Ok(None);
        };
        registration
            .materialize_items::<I>(raw.payload())
            .transpose()
            .inspect_err(|e| {
                warn!(%kind, field = %e.field, error = %e, "Failed to materialize items");
            })
    }

    /// Materialize whatever type is registered for `kind`.
    pub fn get_dyn(&self, kind: MessageKind) -> Result<Option<DynMessage>, BindError> {
        let registration = self.registry.get(kind).ok_or(BindError::Unresolved {
            type_name: "<unregistered kind>",
        })?;
        match self.cache.get(kind) {
            Some(raw) => Ok(Some(registration.materialize(raw.payload())?)),
            None => Ok(None),
        }
    }

    fn materialize<T: TypedMessage>(&self, kind: MessageKind) -> Result<Option<T>, MaterializeError> {
        let Some(raw) = self.cache.get(kind) else {
            return Ok(None);
        };
        T::from_payload(raw.payload()).map(Some).inspect_err(|e| {
            warn!(%kind, field = %e.field, error = %e, "Failed to materialize message");
        })
    }
}
