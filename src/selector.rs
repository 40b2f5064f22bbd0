//! Constructor selection.
//!
//! Each candidate scores +2 per dependency that could be satisfied right now
//! and -2 per dependency that could not. Probing only looks at the registry,
//! the converters and the overrides; nothing is activated. The highest score
//! wins, ties go to the candidate with fewer parameters, then to the one
//! declared first.

use std::cmp::Ordering;

use tracing::debug;

use crate::arguments::Overrides;
use crate::container::registry::dependency_satisfiable;
use crate::container::ResolutionContext;
use crate::descriptors::{ComponentDescriptor, ConstructorCandidate};
use crate::error::{DiError, DiResult};
use crate::handler::{ConstructorChoice, Handler, HandlerState};
use crate::key::Contract;

#[derive(Debug)]
struct Score {
    index: usize,
    points: i64,
    parameters: usize,
    missing: Vec<String>,
}

fn compare(a: &Score, b: &Score) -> Ordering {
    a.points
        .cmp(&b.points)
        .then_with(|| b.parameters.cmp(&a.parameters))
        .then_with(|| b.index.cmp(&a.index))
}

fn score(
    ctx: &ResolutionContext<'_>,
    descriptor: &ComponentDescriptor,
    index: usize,
    candidate: &ConstructorCandidate,
    overrides: Option<&Overrides>,
) -> Score {
    let kernel = ctx.kernel();
    let registry = kernel.registry();
    let reference = |key: &str| -> Option<(Contract, bool)> {
        registry
            .by_key(key)
            .map(|h| (h.descriptor().contract(), h.state() == HandlerState::Valid))
    };
    let providers = |contract: Contract| -> Vec<(String, bool)> {
        registry
            .by_contract(contract)
            .iter()
            .map(|h| (h.key().to_string(), h.state() == HandlerState::Valid))
            .collect()
    };

    let mut points = 0;
    let mut missing = Vec::new();
    for dependency in candidate.dependencies() {
        let satisfiable = overrides.map_or(false, |o| o.lookup(dependency).is_some())
            || dependency_satisfiable(descriptor, dependency, kernel.converters(), &reference, &providers);
        if satisfiable {
            points += 2;
        } else {
            points -= 2;
            missing.push(format!("{} ({})", dependency.name(), dependency.requested()));
        }
    }
    Score {
        index,
        points,
        parameters: candidate.dependencies().len(),
        missing,
    }
}

/// Picks the constructor to activate `handler` with.
///
/// The winner is memoized. Until an activation with it succeeds, the memo
/// is only trusted while the registry is unchanged. Requests with overrides
/// for this component are always scored afresh and never memoized.
pub(crate) fn select(handler: &Handler, ctx: &ResolutionContext<'_>) -> DiResult<usize> {
    let descriptor = handler.descriptor();
    let candidates = descriptor.constructors();
    match candidates.len() {
        0 => {
            return Err(DiError::InvalidComponent {
                component: descriptor.key().to_string(),
                reason: "no constructor candidates".to_string(),
            })
        }
        1 => return Ok(0),
        _ => {}
    }

    let overrides = ctx.overrides_for(descriptor.key());
    let memoize = !ctx.has_overrides_for(descriptor.key());
    let generation = ctx.kernel().registry().generation();
    if memoize {
        if let Some(choice) = *handler.constructor_choice().lock() {
            if choice.committed || choice.generation == generation {
                return Ok(choice.index);
            }
        }
    }

    let scores: Vec<Score> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| score(ctx, descriptor, index, candidate, overrides))
        .collect();
    let Some(best) = scores.iter().max_by(|a, b| compare(a, b)) else {
        return Err(DiError::InvalidComponent {
            component: descriptor.key().to_string(),
            reason: "no constructor candidates".to_string(),
        });
    };

    if best.points < 0 && !scores.iter().any(|score| score.missing.is_empty()) {
        return Err(DiError::NoEligibleConstructor {
            component: descriptor.key().to_string(),
            missing: best.missing.clone(),
        });
    }

    debug!(
        component = %descriptor.key(),
        constructor = best.index,
        score = best.points,
        "constructor selected"
    );
    if memoize {
        *handler.constructor_choice().lock() = Some(ConstructorChoice {
            index: best.index,
            generation,
            committed: false,
        });
    }
    Ok(best.index)
}

/// Marks the memoized choice as proven by a successful activation.
pub(crate) fn commit(handler: &Handler, index: usize) {
    if let Some(choice) = handler.constructor_choice().lock().as_mut() {
        if choice.index == index {
            choice.committed = true;
        }
    }
}
