//! Dependency resolution.
//!
//! A dependency is satisfied from, in order: the overrides supplied with the
//! request (root component only), a raw parameter the converters understand,
//! and finally the registry. Registry lookups by reference are strict; lookups
//! by contract prefer a component whose key equals the dependency name, then
//! valid handlers, then apply the container's ambiguity policy.

use std::sync::Arc;

use tracing::debug;

use crate::arguments::DependencyValue;
use crate::config::AmbiguityPolicy;
use crate::container::ResolutionContext;
use crate::descriptors::{ComponentDescriptor, DependencyModel};
use crate::error::{DiError, DiResult};
use crate::handler::{Handler, HandlerState};
use crate::interception::Interceptor;
use crate::key::{AnyArc, ComponentRef, Contract};

/// Finds the handler for a top-level request.
pub(crate) fn select_root(
    ctx: &ResolutionContext<'_>,
    request: &ComponentRef,
    expected: Contract,
) -> DiResult<Arc<Handler>> {
    let registry = ctx.kernel().registry();
    match request {
        ComponentRef::Key(key) => {
            let handler = registry
                .by_key(key)
                .ok_or_else(|| DiError::not_found(format!("'{}'", key), None))?;
            let provided = handler.descriptor().contract();
            if provided != expected {
                return Err(DiError::TypeMismatch(format!(
                    "component '{}' provides {}, not {}",
                    key, provided, expected
                )));
            }
            Ok(handler)
        }
        ComponentRef::Contract(contract) => {
            choose(ctx, registry.by_contract(*contract), None, contract.name(), None)
        }
    }
}

/// Resolves one dependency of `consumer` inside the current activation.
pub(crate) fn resolve_dependency(
    ctx: &ResolutionContext<'_>,
    consumer: &ComponentDescriptor,
    dependency: &DependencyModel,
) -> DiResult<DependencyValue> {
    let _frame = ctx.enter_dependency(consumer.key(), dependency)?;

    if let Some(overrides) = ctx.overrides_for(consumer.key()) {
        if let Some(value) = overrides.lookup(dependency) {
            debug!(component = %consumer.key(), dependency = %dependency.name(), "using override");
            return Ok(value);
        }
    }

    if let Some(raw) = consumer.parameter(dependency.name()) {
        let converters = ctx.kernel().converters();
        let target = dependency.target();
        if converters.can_convert(&target) {
            return converters
                .convert(dependency.name(), raw, &target)
                .map(DependencyValue::One);
        }
    }

    resolve_from_registry(ctx, consumer, dependency)
}

/// Resolves an interceptor registered as a component under `key`.
pub(crate) fn resolve_interceptor(
    ctx: &ResolutionContext<'_>,
    consumer: &ComponentDescriptor,
    key: &str,
) -> DiResult<Arc<dyn Interceptor>> {
    let dependency =
        DependencyModel::on::<dyn Interceptor>(format!("interceptor:{}", key)).with_reference(key);
    let _frame = ctx.enter_dependency(consumer.key(), &dependency)?;
    resolve_from_registry(ctx, consumer, &dependency)?.single::<dyn Interceptor>()
}

fn resolve_from_registry(
    ctx: &ResolutionContext<'_>,
    consumer: &ComponentDescriptor,
    dependency: &DependencyModel,
) -> DiResult<DependencyValue> {
    let registry = ctx.kernel().registry();

    if dependency.is_collection() {
        let mut values = Vec::new();
        for handler in registry.by_contract(dependency.target()) {
            if handler.key() == consumer.key() {
                continue;
            }
            if handler.state() != HandlerState::Valid {
                debug!(component = %handler.key(), consumer = %consumer.key(), "skipping handler that is not valid");
                continue;
            }
            values.push(resolve_handler(ctx, &handler)?);
        }
        return Ok(DependencyValue::Many(values));
    }

    if let Some(reference) = dependency.reference() {
        let handler = registry
            .by_key(reference)
            .ok_or_else(|| DiError::not_found(dependency.requested(), Some(consumer.key())))?;
        let provided = handler.descriptor().contract();
        if provided != dependency.target() {
            return Err(DiError::TypeMismatch(format!(
                "component '{}' provides {}, but '{}' of '{}' expects {}",
                reference,
                provided,
                dependency.name(),
                consumer.key(),
                dependency.target()
            )));
        }
        return resolve_handler(ctx, &handler).map(DependencyValue::One);
    }

    let candidates: Vec<Arc<Handler>> = registry
        .by_contract(dependency.target())
        .into_iter()
        .filter(|handler| handler.key() != consumer.key())
        .collect();
    let handler = choose(
        ctx,
        candidates,
        Some(dependency.name()),
        &dependency.requested(),
        Some(consumer.key()),
    )?;
    resolve_handler(ctx, &handler).map(DependencyValue::One)
}

/// Picks one handler among the candidates for a contract.
fn choose(
    ctx: &ResolutionContext<'_>,
    candidates: Vec<Arc<Handler>>,
    name_hint: Option<&str>,
    requested: &str,
    consumer: Option<&str>,
) -> DiResult<Arc<Handler>> {
    if let Some(name) = name_hint {
        if let Some(handler) = candidates.iter().find(|handler| handler.key() == name) {
            return Ok(handler.clone());
        }
    }

    let valid: Vec<Arc<Handler>> = candidates
        .iter()
        .filter(|handler| handler.state() == HandlerState::Valid)
        .cloned()
        .collect();
    // Without a valid match, resolving an invalid one reports why it is not valid
    let pool = if valid.is_empty() { candidates } else { valid };

    if pool.len() > 1 && ctx.kernel().config().ambiguity == AmbiguityPolicy::Strict {
        return Err(DiError::AmbiguousDependency {
            requested: requested.to_string(),
            candidates: pool.iter().map(|handler| handler.key().to_string()).collect(),
        });
    }

    pool.last()
        .cloned()
        .ok_or_else(|| DiError::not_found(requested, consumer))
}

/// Resolves through the handler's lifestyle; fresh instances become children
/// of the activation in progress.
fn resolve_handler(ctx: &ResolutionContext<'_>, handler: &Arc<Handler>) -> DiResult<AnyArc> {
    let burden = handler.resolve(ctx)?;
    let service = burden.service().clone();
    if !handler.descriptor().lifestyle().is_shared() {
        ctx.attach_child(burden);
    }
    Ok(service)
}
