//! Activation of component instances.
//!
//! `activate` selects a constructor, resolves its arguments, constructs the
//! raw instance (through the interception engine when interceptors are
//! declared), injects settable properties, runs commission hooks and records
//! the resulting burden. A failure before construction releases every
//! dependency created for it, so nothing is left half built.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::arguments::Arguments;
use crate::burden::{Burden, BurdenParts};
use crate::container::ResolutionContext;
use crate::descriptors::{ComponentDescriptor, RawInstance};
use crate::error::{DiError, DiResult};
use crate::handler::Handler;
use crate::lifestyle::Lifestyle;
use crate::{resolver, selector};

pub(crate) fn activate(handler: &Arc<Handler>, ctx: &ResolutionContext<'_>) -> DiResult<Arc<Burden>> {
    let descriptor = handler.descriptor();
    let children = ctx.collect_children();

    let index = selector::select(handler, ctx)?;
    let candidate = descriptor.constructors().get(index).ok_or_else(|| DiError::InvalidComponent {
        component: descriptor.key().to_string(),
        reason: format!("constructor {} does not exist", index),
    })?;

    let mut arguments = Arguments::with_capacity(candidate.dependencies().len());
    for dependency in candidate.dependencies() {
        let value = resolver::resolve_dependency(ctx, descriptor, dependency)?;
        arguments.push(dependency.name(), value);
    }

    let (mut raw, dispatcher) = if descriptor.interceptors().is_empty() {
        let raw = (candidate.construct)(&arguments)
            .map_err(|source| DiError::activation(descriptor.key(), source))?;
        (raw, None)
    } else {
        let (raw, dispatcher) = ctx
            .kernel()
            .engine()
            .create_intercepted(ctx, descriptor, candidate, &arguments)?;
        (raw, Some(dispatcher))
    };

    inject_properties(ctx, descriptor, &mut raw);

    for hook in &descriptor.commission {
        hook(&mut raw);
    }

    let published = (descriptor.publish)(raw, dispatcher)?;
    let scope = match descriptor.lifestyle() {
        Lifestyle::PerScope => ctx.scope(),
        _ => None,
    };
    let children = children.finish();
    debug!(
        component = %descriptor.key(),
        constructor = index,
        children = children.len(),
        "activated"
    );
    let burden = Burden::new(
        handler,
        BurdenParts {
            target: published.target,
            service: published.service,
            address: published.address,
            children,
            scope,
        },
    );
    selector::commit(handler, index);
    Ok(Arc::new(burden))
}

/// Properties are optional: whatever cannot be resolved or injected is
/// logged and left unset.
fn inject_properties(ctx: &ResolutionContext<'_>, descriptor: &ComponentDescriptor, raw: &mut RawInstance) {
    for property in descriptor.properties() {
        let dependency = property.dependency();
        match resolver::resolve_dependency(ctx, descriptor, dependency) {
            Ok(value) => {
                if let Err(error) = (property.inject)(raw, value) {
                    warn!(
                        component = %descriptor.key(),
                        property = %dependency.name(),
                        %error,
                        "property injection failed"
                    );
                }
            }
            Err(error) => warn!(
                component = %descriptor.key(),
                property = %dependency.name(),
                %error,
                "skipping unresolvable property"
            ),
        }
    }
}
