//! Static mapping between message kinds and the Rust types that project them.
//!
//! Built once at startup and shared read-only. Lookups are by `MessageKind` or
//! by `TypeId`; there is no runtime inspection of the types themselves.

use serde::Serialize;
use serde_json::Value;
use std::any::{Any, TypeId, type_name};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::MaterializeError;
use crate::kind::MessageKind;
use crate::messages::{
    Heartbeat, Info, LogRestart, LogUpdate, Options, SimulationInfo, SlotCollection, SlotOptions,
    UnitCollection,
};

/// A strongly-typed projection of one message kind's payload.
pub trait TypedMessage: fmt::Debug + Serialize + Send + Sync + Sized + 'static {
    fn from_payload(payload: &Value) -> Result<Self, MaterializeError>;
}

/// A typed message whose payload is a list of `Item`.
pub trait MessageCollection: TypedMessage {
    type Item: 'static;

    fn into_items(self) -> Vec<Self::Item>;
}

/// Type-erased materialized message, for consumers that only know the kind.
pub trait AnyMessage: fmt::Debug + Send + Sync {
    fn to_json(&self) -> Value;
}

impl<T: TypedMessage> AnyMessage for T {
    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub type DynMessage = Box<dyn AnyMessage>;

type Factory = fn(&Value) -> Result<DynMessage, MaterializeError>;

fn materialize_erased<T: TypedMessage>(payload: &Value) -> Result<DynMessage, MaterializeError> {
    T::from_payload(payload).map(|message| Box::new(message) as DynMessage)
}

/// Boxed `Vec<C::Item>`.
type ItemsFactory = fn(&Value) -> Result<Box<dyn Any>, MaterializeError>;

fn items_erased<C: MessageCollection>(payload: &Value) -> Result<Box<dyn Any>, MaterializeError> {
    C::from_payload(payload).map(|collection| Box::new(collection.into_items()) as Box<dyn Any>)
}

#[derive(Clone, Copy)]
struct ItemBinding {
    type_id: TypeId,
    factory: ItemsFactory,
}

/// One kind-to-type entry.
#[derive(Clone, Copy)]
pub struct Registration {
    kind: MessageKind,
    type_id: TypeId,
    type_name: &'static str,
    items: Option<ItemBinding>,
    factory: Factory,
}

impl Registration {
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn materialize(&self, payload: &Value) -> Result<DynMessage, MaterializeError> {
        (self.factory)(payload)
    }

    /// Elements of a collection registration, built through the collection
    /// type. `None` if this is not a collection of `I`.
    pub fn materialize_items<I: 'static>(
        &self,
        payload: &Value,
    ) -> Option<Result<Vec<I>, MaterializeError>> {
        let items = self.items.filter(|b| b.type_id == TypeId::of::<I>())?;
        Some((items.factory)(payload).map(|boxed| {
            boxed
                .downcast::<Vec<I>>()
                .map(|items| *items)
                .unwrap_or_default()
        }))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("kind", &self.kind)
            .field("type_name", &self.type_name)
            .field("collection", &self.items.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageRegistry {
    by_kind: BTreeMap<MessageKind, Registration>,
}

impl MessageRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every kind the peer sends, mapped to this crate's message types.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            .register::<Heartbeat>(MessageKind::Heartbeat)
            .register::<Info>(MessageKind::Info)
            .register::<Options>(MessageKind::Options)
            .register::<SimulationInfo>(MessageKind::SimulationInfo)
            .register_collection::<SlotCollection>(MessageKind::Slots)
            .register::<SlotOptions>(MessageKind::SlotOptions)
            .register_collection::<UnitCollection>(MessageKind::Units)
            .register::<LogRestart>(MessageKind::LogRestart)
            .register::<LogUpdate>(MessageKind::LogUpdate);
        registry
    }

    /// Map `kind` to `T`, replacing any earlier registration for `kind`.
    pub fn register<T: TypedMessage>(&mut self, kind: MessageKind) -> &mut Self {
        self.insert::<T>(kind, None)
    }

    /// Like `register`, and also resolve requests for the element type.
    pub fn register_collection<C: MessageCollection>(&mut self, kind: MessageKind) -> &mut Self {
        let items = ItemBinding {
            type_id: TypeId::of::<C::Item>(),
            factory: items_erased::<C>,
        };
        self.insert::<C>(kind, Some(items))
    }

    fn insert<T: TypedMessage>(
        &mut self,
        kind: MessageKind,
        items: Option<ItemBinding>,
    ) -> &mut Self {
        self.by_kind.insert(
            kind,
            Registration {
                kind,
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                items,
                factory: materialize_erased::<T>,
            },
        );
        self
    }

    pub fn get(&self, kind: MessageKind) -> Option<&Registration> {
        self.by_kind.get(&kind)
    }

    /// Best-matching type name for `kind`, used as the notification type hint.
    pub fn type_name(&self, kind: MessageKind) -> Option<&'static str> {
        self.get(kind).map(Registration::type_name)
    }

    /// Kind registered for exactly `T`.
    pub fn kind_of<T: 'static>(&self) -> Option<MessageKind> {
        let id = TypeId::of::<T>();
        self.by_kind
            .values()
            .find(|r| r.type_id == id)
            .map(Registration::kind)
    }

    /// Kind of the collection message whose element type is `I`.
    pub fn kind_of_item<I: 'static>(&self) -> Option<MessageKind> {
        let id = TypeId::of::<I>();
        self.by_kind
            .values()
            .find(|r| r.items.is_some_and(|b| b.type_id == id))
            .map(Registration::kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = MessageKind> + '_ {
        self.by_kind.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}
