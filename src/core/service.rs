use compact_str::CompactString;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("no provider registered for {0}")]
    MissingProvider(String),
    #[error("circular dependency while constructing {0}")]
    CircularDependency(String),
    #[error("provider already registered for {0}")]
    AlreadyRegistered(String),
    #[error("cached instance of {0} has an unexpected type")]
    TypeMismatch(String),
    #[error("failed to construct {service}: {reason}")]
    Construction { service: String, reason: String },
}

impl GraphError {
    pub fn construction(service: impl Into<String>, reason: impl fmt::Display) -> Self {
        GraphError::Construction {
            service: service.into(),
            reason: reason.to_string(),
        }
    }
}

/// Anything the object graph can create, cache and dispose.
///
/// `on_created` runs once after the factory builds the instance, `on_disposed`
/// once when the last reference is released.
pub trait Service: Any + Send + Sync {
    fn name(&self) -> &'static str;

    fn on_created(&self) {}

    fn on_disposed(&self) {}
}

/// Cache key: concrete type plus optional qualifier.
#[derive(Clone)]
pub struct ServiceKey {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<CompactString>,
}

impl ServiceKey {
    pub fn of<T: Any>(qualifier: Option<&str>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            qualifier: qualifier.map(CompactString::from),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.qualifier == other.qualifier
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.qualifier.hash(state);
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}@{}", self.type_name, q),
            None => f.write_str(self.type_name),
        }
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/core/service.rs"]
mod tests;
