//! Custom flag types: the one extension point open to user code.
//!
//! A type opts in by implementing [`CustomFlag`] (or by handing a conversion
//! closure to [`CustomHandler::new`]) and registering itself in a
//! [`CustomFlagRegistry`]. The flag factory consults the registry by
//! `TypeId` before it looks at primitive kinds.

use crate::flag::FlagValue;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Conversion protocol for parameter types that are not primitives.
///
/// `Default` supplies the zero value used when the flag is not given;
/// override [`CustomFlag::flag_zero`] to pick another one.
pub trait CustomFlag: Clone + Default + Send + Sync + 'static {
    type Err: Into<anyhow::Error>;

    /// Convert one raw command-line value into an instance.
    fn unmarshal_flag(raw: &str) -> Result<Self, Self::Err>;

    fn flag_zero() -> Self {
        Self::default()
    }
}

/// Parsed value of a custom flag, shared until it is handed to the function.
#[derive(Clone)]
pub struct CustomValue(Arc<dyn Any + Send + Sync>);

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomValue(..)")
    }
}

type Unmarshal = dyn Fn(&str) -> anyhow::Result<CustomValue> + Send + Sync;
type Extract = dyn Fn(&CustomValue) -> Option<FlagValue> + Send + Sync;
type Zero = dyn Fn() -> FlagValue + Send + Sync;

/// Type-erased conversion for one custom type.
pub struct CustomHandler {
    type_id: TypeId,
    type_name: &'static str,
    zero_value: Box<Zero>,
    unmarshal: Box<Unmarshal>,
    extract: Box<Extract>,
}

impl fmt::Debug for CustomHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomHandler")
            .field("type_name", &self.type_name)
            .finish()
    }
}

impl CustomHandler {
    pub fn of<T: CustomFlag>() -> Self {
        Self::new(T::unmarshal_flag, T::flag_zero())
    }

    /// Handler for `T` built from a conversion function and a zero value.
    pub fn new<T, F, E>(unmarshal: F, zero: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            zero_value: Box::new(move || Box::new(zero.clone()) as FlagValue),
            unmarshal: Box::new(move |raw: &str| {
                let value = unmarshal(raw).map_err(Into::<anyhow::Error>::into)?;
                Ok(CustomValue(Arc::new(value)))
            }),
            extract: Box::new(|value: &CustomValue| {
                value
                    .0
                    .downcast_ref::<T>()
                    .map(|v| Box::new(v.clone()) as FlagValue)
            }),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn unmarshal(&self, raw: &str) -> anyhow::Result<CustomValue> {
        (self.unmarshal)(raw)
    }

    /// The zero value as the concrete type.
    pub fn zero_value(&self) -> FlagValue {
        (self.zero_value)()
    }

    /// Clone the concrete value out, or `None` if it belongs to another type.
    pub fn extract(&self, value: &CustomValue) -> Option<FlagValue> {
        (self.extract)(value)
    }
}

/// Custom handlers keyed by the type they convert to.
#[derive(Debug, Clone, Default)]
pub struct CustomFlagRegistry {
    handlers: HashMap<TypeId, Arc<CustomHandler>>,
}

impl CustomFlagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: CustomFlag>(&mut self) -> &mut Self {
        self.insert(CustomHandler::of::<T>())
    }

    /// Add `handler`, replacing any previous one for the same type.
    pub fn insert(&mut self, handler: CustomHandler) -> &mut Self {
        self.handlers.insert(handler.type_id(), Arc::new(handler));
        self
    }

    pub fn get(&self, id: TypeId) -> Option<Arc<CustomHandler>> {
        self.handlers.get(&id).cloned()
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.handlers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
