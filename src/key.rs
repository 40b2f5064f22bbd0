//! Contract identities and type-erased instance storage.

use std::any::{Any, TypeId};
use std::sync::Arc;
use crate::error::{DiError, DiResult};

/// Type-erased shared instance as stored by lifestyles and burdens.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Identity of a service contract or implementation type.
///
/// Contracts may be concrete types or trait objects (`dyn Trait`); both are
/// identified by their `TypeId`, the name is kept for diagnostics only.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{contract_of, Contract};
///
/// trait Clock: Send + Sync {}
///
/// let clock = contract_of::<dyn Clock>();
/// assert!(clock.name().contains("Clock"));
/// assert_eq!(clock, contract_of::<dyn Clock>());
/// assert_ne!(clock, contract_of::<String>());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Contract {
    id: TypeId,
    name: &'static str,
}

impl Contract {
    /// Contract for type `T`, sized or not.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` of the contract.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The type name, as reported by `std::any::type_name`.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// Hash and equality use the TypeId only
impl PartialEq for Contract {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Contract {}

impl std::hash::Hash for Contract {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Helper for creating contracts.
#[inline]
pub fn contract_of<T: ?Sized + 'static>() -> Contract {
    Contract::of::<T>()
}

/// What a resolution request targets: a contract or a component key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentRef {
    /// Any component registered for the contract
    Contract(Contract),
    /// The component registered under this key
    Key(String),
}

impl ComponentRef {
    /// Human-readable name of the request.
    pub fn display_name(&self) -> &str {
        match self {
            ComponentRef::Contract(contract) => contract.name(),
            ComponentRef::Key(key) => key,
        }
    }
}

impl From<Contract> for ComponentRef {
    fn from(contract: Contract) -> Self {
        ComponentRef::Contract(contract)
    }
}

impl From<&str> for ComponentRef {
    fn from(key: &str) -> Self {
        ComponentRef::Key(key.to_string())
    }
}

impl From<String> for ComponentRef {
    fn from(key: String) -> Self {
        ComponentRef::Key(key)
    }
}

/// Wraps a service in the container's storage form.
///
/// Services are stored as `Arc<Arc<S>>` erased to [`AnyArc`], which lets
/// trait-object contracts share the same path as concrete types.
#[inline]
pub fn service_value<S: ?Sized + Send + Sync + 'static>(service: Arc<S>) -> AnyArc {
    Arc::new(service)
}

/// Recovers a typed service from its storage form.
#[inline]
pub fn downcast_service<S: ?Sized + Send + Sync + 'static>(value: AnyArc) -> DiResult<Arc<S>> {
    value
        .downcast::<Arc<S>>()
        .map(|boxed| (*boxed).clone())
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<S>().to_string()))
}

/// Address identifying a service instance, independent of its static type.
#[inline]
pub(crate) fn instance_address<S: ?Sized>(service: &Arc<S>) -> usize {
    Arc::as_ptr(service) as *const () as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn area(&self) -> f64;
    }

    struct Square(f64);

    impl Shape for Square {
        fn area(&self) -> f64 {
            self.0 * self.0
        }
    }

    #[test]
    fn trait_object_round_trips_through_storage() {
        let square: Arc<dyn Shape> = Arc::new(Square(3.0));
        let stored = service_value(square.clone());
        let restored = downcast_service::<dyn Shape>(stored).unwrap();
        assert!(Arc::ptr_eq(&square, &restored));
        assert_eq!(restored.area(), 9.0);
    }

    #[test]
    fn wrong_contract_is_type_mismatch() {
        let stored = service_value(Arc::new(7u32));
        match downcast_service::<u64>(stored) {
            Err(DiError::TypeMismatch(name)) => assert_eq!(name, "u64"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn address_ignores_static_type() {
        let concrete = Arc::new(Square(1.0));
        let erased: Arc<dyn Shape> = concrete.clone();
        assert_eq!(instance_address(&concrete), instance_address(&erased));
    }

    #[test]
    fn component_ref_display() {
        assert_eq!(ComponentRef::from("cache").display_name(), "cache");
        assert_eq!(ComponentRef::from(contract_of::<u8>()).display_name(), "u8");
    }
}
