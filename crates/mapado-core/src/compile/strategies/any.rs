//! Identity/boxing strategy for the untyped "any value" type
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::compile::selector::{BlockParts, MapStrategy};
use crate::compile::{CompileContext, CompileRequest};
use crate::config::AdapterConfig;
use crate::error::Result;
use crate::plan::{Expr, Instantiation, MapKind};
use crate::registry::TypeRef;

/// Applies when either side is `TypeRef::Any`
#[derive(Debug, Default)]
pub struct AnyAdapter;

impl MapStrategy for AnyAdapter {
    fn name(&self) -> &'static str {
        "any"
    }

    // must outrank the record adapter so untyped sides never go through
    // member resolution
    fn score(&self) -> i32 {
        -111
    }

    fn enforce_explicit(&self) -> bool {
        false
    }

    fn can_map(
        &self,
        source: &TypeRef,
        dest: &TypeRef,
        _kind: MapKind,
        _config: &AdapterConfig,
    ) -> bool {
        *source == TypeRef::Any || *dest == TypeRef::Any
    }

    fn inline_expr(
        &self,
        _config: &AdapterConfig,
        request: &CompileRequest,
        _ctx: &mut CompileContext,
    ) -> Result<Expr> {
        if request.source == request.dest || request.dest == TypeRef::Any {
            Ok(Expr::Source)
        } else {
            Ok(Expr::Convert {
                value: Box::new(Expr::Source),
                to: request.dest.clone(),
            })
        }
    }

    fn block_parts(
        &self,
        config: &AdapterConfig,
        request: &CompileRequest,
        ctx: &mut CompileContext,
    ) -> Result<BlockParts> {
        Ok(BlockParts {
            instantiation: Instantiation::Expr(self.inline_expr(config, request, ctx)?),
            copies: Vec::new(),
        })
    }
}
