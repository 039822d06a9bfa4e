//! Scalar conversion strategy
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::compile::selector::{BlockParts, MapStrategy};
use crate::compile::{CompileContext, CompileRequest};
use crate::config::AdapterConfig;
use crate::error::Result;
use crate::plan::{Expr, Instantiation, MapKind};
use crate::registry::TypeRef;

/// Conversions between scalar values (bool, int, float, str)
#[derive(Debug, Default)]
pub struct ScalarAdapter;

impl MapStrategy for ScalarAdapter {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn score(&self) -> i32 {
        -200
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
        source.is_scalar() && dest.is_scalar()
    }

    fn inline_expr(
        &self,
        _config: &AdapterConfig,
        request: &CompileRequest,
        _ctx: &mut CompileContext,
    ) -> Result<Expr> {
        if request.source.unwrap_optional() == request.dest.unwrap_optional() {
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
