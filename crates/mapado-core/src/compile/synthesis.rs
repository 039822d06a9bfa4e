//! Expression synthesis: pure-form and statement-form body assembly
//!
//! The synthesis driver turns a selected strategy's building blocks into a
//! complete mapping body. The pure form is chosen whenever the request is
//! eligible and inlining is not disabled; otherwise the statement form is
//! assembled, but only at the top of a compile - one level of statement-form
//! expansion per compiled function. A nested request that would need the
//! statement form yields no body here and is rewritten by the configuration
//! into an invocation of that pair's own cached mapping.
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::compile::selector::MapStrategy;
use crate::compile::{CompileContext, CompileRequest};
use crate::config::AdapterConfig;
use crate::error::{Error, Result};
use crate::plan::{BlockPlan, Constant, DerivedBranch, Expr, MapKey, MapKind, Plan, TypedExpr};
use crate::registry::TypeRef;

/// Synthesize the mapping body for a request
///
/// Returns `Ok(None)` when the request needs the statement form but the
/// recursion bound forbids a second expansion within this compile.
pub(crate) fn expression_body(
    strategy: &dyn MapStrategy,
    config: &AdapterConfig,
    request: &CompileRequest,
    ctx: &mut CompileContext,
) -> Result<Option<Plan>> {
    if strategy.enforce_explicit() && config.requires_explicit_mapping() && !request.explicit {
        return Err(Error::configuration(format!(
            "explicit mapping is required and no configuration exists for {} -> {}",
            request.source, request.dest
        )));
    }

    if strategy.can_inline(request) && request.settings.avoid_inline_mapping != Some(true) {
        let expr = strategy.inline_expr(config, request, ctx)?;
        return Ok(Some(Plan::Inline(guard_inline(expr, request))));
    }

    if ctx.depth() > 1 {
        return Ok(None);
    }

    block_body(strategy, config, request, ctx).map(Some)
}

/// Wrap a pure-form body in the null guard its source type requires
fn guard_inline(expr: Expr, request: &CompileRequest) -> Expr {
    if request.source.is_nullable() {
        Expr::NullGuard {
            subject: Box::new(Expr::Source),
            body: Box::new(expr),
            fallback: Box::new(Expr::Constant(Constant::default_of(&request.dest))),
        }
    } else {
        expr
    }
}

/// Assemble the statement form: instantiation, member copies, hooks, and the
/// derived-dispatch and reference-preservation wrapping
fn block_body(
    strategy: &dyn MapStrategy,
    config: &AdapterConfig,
    request: &CompileRequest,
    ctx: &mut CompileContext,
) -> Result<Plan> {
    if request.kind == MapKind::Projection {
        return Err(Error::configuration(format!(
            "statement-form mapping is invalid for projection: {} -> {}",
            request.source, request.dest
        )));
    }

    let parts = strategy.block_parts(config, request, ctx)?;

    let preserve = request.settings.preserve_reference == Some(true)
        && request.source.is_reference_type()
        && request.dest.is_reference_type();

    let mut derived = Vec::new();
    for pair in &request.settings.includes {
        let derived_source = TypeRef::named(&pair.source);
        // same type: no redirect, it would dispatch to itself forever
        if derived_source == request.source {
            continue;
        }
        if !config.registry().is_assignable(&request.source, &derived_source) {
            log::warn!(
                "skipping derived mapping {} -> {}: {} is not a subtype of {}",
                pair.source,
                pair.dest,
                pair.source,
                request.source
            );
            continue;
        }
        let key = MapKey::new(derived_source, TypeRef::named(&pair.dest), request.kind);
        ctx.defer(key.clone());
        derived.push(DerivedBranch {
            source_ty: pair.source.clone(),
            dest_ty: pair.dest.clone(),
            key,
        });
    }

    Ok(Plan::Block(BlockPlan {
        null_guard: request.source.is_nullable(),
        dest_ty: request.dest.clone(),
        derived,
        preserve_reference: preserve,
        instantiation: parts.instantiation,
        copies: parts.copies,
        hooks: request.settings.after_hooks.clone(),
    }))
}

/// Build the expression converting one resolved getter to a destination type
///
/// Same-type values read through under ShallowCopyForSameType or in
/// projections; everything else maps through the configuration, picking up
/// any destination post-transform registered for the produced type.
pub(crate) fn adapt_expr(
    config: &AdapterConfig,
    getter: TypedExpr,
    dest_ty: &TypeRef,
    request: &CompileRequest,
    ctx: &mut CompileContext,
) -> Result<Expr> {
    let TypedExpr {
        expr,
        ty: source_ty,
    } = getter;

    if source_ty == *dest_ty
        && (request.settings.shallow_copy_for_same_type == Some(true)
            || request.kind == MapKind::Projection)
    {
        return Ok(expr);
    }

    let mapped = config.inline_map_expr(&source_ty, dest_ty, request.kind, ctx, expr)?;
    Ok(match request.settings.transforms.get(dest_ty) {
        Some(transform) => Expr::Transform {
            func: transform.clone(),
            value: Box::new(mapped),
        },
        None => mapped,
    })
}
