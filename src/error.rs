//! Error types for the inversion-of-control container.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by user-supplied constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Container errors
///
/// Every failure surfaced by registration, resolution, release or an
/// intercepted call is one of these variants. Resolution failures name the
/// component and dependency that caused them, so a mis-registration can be
/// diagnosed from the error alone.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, DiError, Resolver};
///
/// let container = Container::new();
/// match container.resolve::<String>() {
///     Err(DiError::NoComponentFound { requested, .. }) => {
///         assert_eq!(requested, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
///
/// let circular = DiError::CircularDependency {
///     path: vec!["a".into(), "b".into(), "a".into()],
/// };
/// assert_eq!(circular.to_string(), "Circular dependency: a -> b -> a");
/// ```
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// No registered component satisfies a request or dependency
    #[error("No component found for {requested}{}", consumer_suffix(.consumer))]
    NoComponentFound {
        /// Contract name or component key that was requested
        requested: String,
        /// Component whose dependency could not be satisfied, if any
        consumer: Option<String>,
    },
    /// The resolution stack revisited a component (includes path)
    #[error("Circular dependency: {}", .path.join(" -> "))]
    CircularDependency { path: Vec<String> },
    /// No constructor candidate can be satisfied
    #[error("No eligible constructor for component '{component}' (unresolvable: {})", .missing.join(", "))]
    NoEligibleConstructor {
        component: String,
        missing: Vec<String>,
    },
    /// Several components match and strict uniqueness is configured
    #[error("Ambiguous dependency {requested}: candidates {}", .candidates.join(", "))]
    AmbiguousDependency {
        requested: String,
        candidates: Vec<String>,
    },
    /// A constructor failed while building the raw instance
    #[error("Failed to activate component '{component}': {source}")]
    ActivationError {
        component: String,
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
    /// Pooled lifestyle at capacity and the wait timed out
    #[error("Pool for component '{component}' exhausted ({max} instances) after waiting {waited:?}")]
    PoolExhausted {
        component: String,
        max: usize,
        waited: Duration,
    },
    /// An interceptor or the proxied target could not complete a call
    #[error("Intercepted call {component}::{method} failed: {reason}")]
    InterceptedCallFailure {
        component: String,
        method: String,
        reason: String,
    },
    /// A component with the same key is already registered
    #[error("Component '{0}' is already registered")]
    DuplicateComponent(String),
    /// The descriptor is structurally unusable
    #[error("Component '{component}' is invalid: {reason}")]
    InvalidComponent { component: String, reason: String },
    /// A per-scope component was requested outside of a scope
    #[error("Component '{0}' requires an active scope")]
    NoActiveScope(String),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(String),
    /// Maximum resolution depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// A raw parameter could not be converted
    #[error("Cannot convert parameter '{parameter}' to {target}: {reason}")]
    Conversion {
        parameter: String,
        target: String,
        reason: String,
    },
}

fn consumer_suffix(consumer: &Option<String>) -> String {
    match consumer {
        Some(consumer) => format!(" (required by '{}')", consumer),
        None => String::new(),
    }
}

impl DiError {
    /// Creates an [`DiError::InterceptedCallFailure`]; intended for interceptors
    /// that need to abort a call.
    pub fn intercepted(
        component: impl Into<String>,
        method: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DiError::InterceptedCallFailure {
            component: component.into(),
            method: method.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn activation(component: &str, source: BoxError) -> Self {
        DiError::ActivationError {
            component: component.to_string(),
            source: Arc::from(source),
        }
    }

    pub(crate) fn not_found(requested: impl Into<String>, consumer: Option<&str>) -> Self {
        DiError::NoComponentFound {
            requested: requested.into(),
            consumer: consumer.map(str::to_string),
        }
    }
}

/// Result type for container operations
pub type DiResult<T> = Result<T, DiError>;
