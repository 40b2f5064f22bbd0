use std::any::Any;
use std::sync::Arc;

use tracing::trace;

use crate::error::{DiError, DiResult};

use super::Interceptor;

/// A boxed call argument or return value.
pub type CallArgument = Box<dyn Any + Send>;

pub(crate) type TargetCall<'a> = &'a (dyn Fn(&[CallArgument]) -> DiResult<CallArgument> + 'a);

/// One intercepted call.
///
/// Holds the call's arguments and return value slot, the interceptors that
/// apply to the method, and a cursor into that chain. The last step of the
/// chain performs the real call with the current arguments.
pub struct Invocation<'a> {
    component: &'a str,
    method: &'static str,
    arguments: Vec<CallArgument>,
    return_value: Option<CallArgument>,
    interceptors: &'a [Arc<dyn Interceptor>],
    chain: &'a [usize],
    cursor: usize,
    target: TargetCall<'a>,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        component: &'a str,
        method: &'static str,
        arguments: Vec<CallArgument>,
        interceptors: &'a [Arc<dyn Interceptor>],
        chain: &'a [usize],
        target: TargetCall<'a>,
    ) -> Self {
        Self {
            component,
            method,
            arguments,
            return_value: None,
            interceptors,
            chain,
            cursor: 0,
            target,
        }
    }

    /// Key of the intercepted component.
    pub fn component(&self) -> &str {
        self.component
    }

    /// Name of the contract method being called.
    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }

    /// The argument at `index`, if it has type `T`.
    pub fn argument<T: Any>(&self, index: usize) -> Option<&T> {
        let argument: &(dyn Any + Send) = &**self.arguments.get(index)?;
        argument.downcast_ref::<T>()
    }

    pub fn argument_mut<T: Any>(&mut self, index: usize) -> Option<&mut T> {
        let argument: &mut (dyn Any + Send) = &mut **self.arguments.get_mut(index)?;
        argument.downcast_mut::<T>()
    }

    /// Replaces the argument at `index`; the type must stay the same.
    pub fn set_argument<T: Any + Send>(&mut self, index: usize, value: T) -> DiResult<()> {
        match self.argument_mut::<T>(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(DiError::intercepted(
                self.component,
                self.method,
                format!("argument {} is not a {}", index, std::any::type_name::<T>()),
            )),
        }
    }

    /// Continues with the next interceptor, or performs the real call when
    /// the chain is exhausted.
    ///
    /// The cursor is restored afterwards, so an interceptor may proceed more
    /// than once (to retry, for instance).
    pub fn proceed(&mut self) -> DiResult<()> {
        let interceptors = self.interceptors;
        match self.chain.get(self.cursor) {
            Some(&index) => {
                let interceptor = &interceptors[index];
                self.cursor += 1;
                let result = interceptor.intercept(self);
                self.cursor -= 1;
                result
            }
            None => {
                trace!(component = self.component, method = self.method, "calling target");
                let value = (self.target)(&self.arguments)?;
                self.return_value = Some(value);
                Ok(())
            }
        }
    }

    pub fn has_return_value(&self) -> bool {
        self.return_value.is_some()
    }

    /// The return value, if one was produced and has type `T`.
    pub fn return_value<T: Any>(&self) -> Option<&T> {
        let value: &(dyn Any + Send) = &**self.return_value.as_ref()?;
        value.downcast_ref::<T>()
    }

    pub fn return_value_mut<T: Any>(&mut self) -> Option<&mut T> {
        let value: &mut (dyn Any + Send) = &mut **self.return_value.as_mut()?;
        value.downcast_mut::<T>()
    }

    /// Sets or replaces the return value; also used to short-circuit a call
    /// without proceeding.
    pub fn set_return_value<T: Any + Send>(&mut self, value: T) {
        self.return_value = Some(Box::new(value));
    }

    pub(crate) fn into_return<R: Any>(self) -> DiResult<R> {
        let value: Box<dyn Any> = match self.return_value {
            Some(value) => value,
            // Only a unit return can be produced without a value
            None => Box::new(()),
        };
        value.downcast::<R>().map(|value| *value).map_err(|_| {
            DiError::intercepted(
                self.component,
                self.method,
                format!("no return value of type {}", std::any::type_name::<R>()),
            )
        })
    }
}

impl std::fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("component", &self.component)
            .field("method", &self.method)
            .field("arguments", &self.arguments.len())
            .field("cursor", &self.cursor)
            .field("chain", &self.chain.len())
            .finish()
    }
}
