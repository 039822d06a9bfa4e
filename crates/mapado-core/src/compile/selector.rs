//! Strategy contract and adapter selection
//!
//! Every mapping strategy - built-in or user-registered - implements
//! [`MapStrategy`]. The selector probes each registered strategy for a
//! (source, destination, kind) triple and picks the highest-scoring
//! applicable one; ties go to the first-registered strategy, which is
//! observable, documented behavior.
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::compile::{CompileContext, CompileRequest};
use crate::config::AdapterConfig;
use crate::error::{Error, Result};
use crate::plan::{Expr, Instantiation, MapKind, MemberCopy};
use crate::registry::TypeRef;
use std::fmt;
use std::sync::Arc;

/// Statement-form core produced by a strategy: how to obtain the destination
/// instance and which member copies to run against it.
#[derive(Debug)]
pub struct BlockParts {
    pub instantiation: Instantiation,
    pub copies: Vec<MemberCopy>,
}

/// A pluggable mapping strategy
///
/// Strategies claim applicability through [`MapStrategy::can_map`] and a
/// numeric [`MapStrategy::score`]; user strategies default to score 0, which
/// outranks every built-in on concrete type pairs.
pub trait MapStrategy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Selection priority; higher wins, first-registered breaks ties
    fn score(&self) -> i32 {
        0
    }

    /// Whether this strategy participates in the explicit-mapping policy
    fn enforce_explicit(&self) -> bool {
        true
    }

    /// Applicability for a (source, destination, kind) triple
    fn can_map(
        &self,
        source: &TypeRef,
        dest: &TypeRef,
        kind: MapKind,
        config: &AdapterConfig,
    ) -> bool;

    /// Whether the pure-expression form is eligible for this request
    fn can_inline(&self, request: &CompileRequest) -> bool {
        default_can_inline(request)
    }

    /// Build the pure-form body; `Expr::Source` stands for the source value
    fn inline_expr(
        &self,
        config: &AdapterConfig,
        request: &CompileRequest,
        ctx: &mut CompileContext,
    ) -> Result<Expr>;

    /// Build the statement-form core for this request
    fn block_parts(
        &self,
        config: &AdapterConfig,
        request: &CompileRequest,
        ctx: &mut CompileContext,
    ) -> Result<BlockParts>;
}

/// Baseline pure-form eligibility
///
/// Projections always inline; otherwise reference preservation between two
/// reference types, after-mapping hooks, and derived-type entries each force
/// the statement form.
pub fn default_can_inline(request: &CompileRequest) -> bool {
    if request.kind == MapKind::Projection {
        return true;
    }
    if request.settings.preserve_reference == Some(true)
        && request.source.is_reference_type()
        && request.dest.is_reference_type()
    {
        return false;
    }
    if !request.settings.after_hooks.is_empty() {
        return false;
    }
    if !request.settings.includes.is_empty() {
        return false;
    }
    true
}

/// Pick the highest-scoring applicable strategy
pub(crate) fn select_strategy<'a>(
    strategies: &'a [Arc<dyn MapStrategy>],
    source: &TypeRef,
    dest: &TypeRef,
    kind: MapKind,
    config: &AdapterConfig,
) -> Result<&'a Arc<dyn MapStrategy>> {
    let mut best: Option<(&'a Arc<dyn MapStrategy>, i32)> = None;
    for strategy in strategies {
        if !strategy.can_map(source, dest, kind, config) {
            continue;
        }
        let score = strategy.score();
        match best {
            // strictly greater keeps the first-registered winner on ties
            Some((_, top)) if score <= top => {}
            _ => best = Some((strategy, score)),
        }
    }
    best.map(|(strategy, _)| strategy).ok_or_else(|| {
        Error::configuration(format!(
            "no mapping strategy applies to {} -> {} ({:?})",
            source, dest, kind
        ))
    })
}
