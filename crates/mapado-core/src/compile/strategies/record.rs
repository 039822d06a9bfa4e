//! Class-like record mapping strategy
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::compile::class_model::{build_class_mapping, class_model, ClassMapping, ClassModel};
use crate::compile::selector::{default_can_inline, BlockParts, MapStrategy};
use crate::compile::synthesis::adapt_expr;
use crate::compile::{CompileContext, CompileRequest};
use crate::config::AdapterConfig;
use crate::error::{Error, Result};
use crate::plan::{Constant, Expr, Instantiation, MapKind, MemberCopy};
use crate::registry::{TypeKind, TypeRef};

/// Member-by-member mapping between registered class-like types
#[derive(Debug, Default)]
pub struct RecordAdapter;

impl RecordAdapter {
    /// Resolve the class mapping and turn it into constructor arguments and
    /// member copies
    fn converter(
        &self,
        config: &AdapterConfig,
        request: &CompileRequest,
        ctx: &mut CompileContext,
    ) -> Result<(ClassModel, Vec<Expr>, Vec<MemberCopy>)> {
        let model = class_model(config, &request.dest)?;
        let mapping = build_class_mapping(config, &Expr::Source, &model, request)?;

        let args = self.constructor_args(config, request, ctx, &mapping)?;

        let mut copies = Vec::new();
        for member in &mapping.members {
            if mapping
                .constructor
                .as_ref()
                .is_some_and(|ctor| ctor.params.iter().any(|p| p.name == member.member.name))
            {
                continue;
            }
            let Some(getter) = member.getter.clone() else {
                continue;
            };
            if !member.member.is_settable() {
                continue;
            }
            copies.push(MemberCopy {
                member: member.member.name.clone(),
                value: adapt_expr(config, getter, &member.member.ty, request, ctx)?,
                condition: member.condition.clone(),
            });
        }

        Ok((model, args, copies))
    }

    /// One argument per constructor parameter: the matching member's adapted
    /// getter, or the parameter type's default
    fn constructor_args(
        &self,
        config: &AdapterConfig,
        request: &CompileRequest,
        ctx: &mut CompileContext,
        mapping: &ClassMapping,
    ) -> Result<Vec<Expr>> {
        let Some(ctor) = &mapping.constructor else {
            return Ok(Vec::new());
        };
        let mut args = Vec::new();
        for param in &ctor.params {
            let getter = mapping
                .members
                .iter()
                .find(|m| m.member.name == param.name)
                .and_then(|m| m.getter.clone());
            let arg = match getter {
                Some(getter) => adapt_expr(config, getter, &param.ty, request, ctx)?,
                None => Expr::Constant(Constant::default_of(&param.ty)),
            };
            args.push(arg);
        }
        Ok(args)
    }
}

impl MapStrategy for RecordAdapter {
    fn name(&self) -> &'static str {
        "record"
    }

    fn score(&self) -> i32 {
        -150
    }

    fn can_map(
        &self,
        source: &TypeRef,
        dest: &TypeRef,
        _kind: MapKind,
        config: &AdapterConfig,
    ) -> bool {
        let dest_ok = match dest.unwrap_optional() {
            TypeRef::Named(name) => config
                .registry()
                .get(name)
                .is_some_and(|model| matches!(model.kind, TypeKind::Class)),
            _ => false,
        };
        let source_ok = match source.unwrap_optional() {
            TypeRef::Named(name) => config.registry().contains(name),
            _ => false,
        };
        dest_ok && source_ok
    }

    fn can_inline(&self, request: &CompileRequest) -> bool {
        // the pure form cannot assign onto an existing instance
        request.kind != MapKind::OntoExisting && default_can_inline(request)
    }

    fn inline_expr(
        &self,
        config: &AdapterConfig,
        request: &CompileRequest,
        ctx: &mut CompileContext,
    ) -> Result<Expr> {
        let (model, args, inits) = self.converter(config, request, ctx)?;
        if model.is_abstract && request.settings.construct_with.is_none() {
            return Err(Error::configuration(format!(
                "cannot instantiate abstract destination type {}: no derived mapping is configured",
                model.type_name
            )));
        }
        Ok(Expr::Construct {
            ty: model.type_name,
            subject: Box::new(Expr::Source),
            factory: request.settings.construct_with.clone(),
            args,
            inits,
        })
    }

    fn block_parts(
        &self,
        config: &AdapterConfig,
        request: &CompileRequest,
        ctx: &mut CompileContext,
    ) -> Result<BlockParts> {
        let (model, args, copies) = self.converter(config, request, ctx)?;

        let instantiation = if let Some(factory) = &request.settings.construct_with {
            Instantiation::Factory(factory.clone())
        } else if model.is_abstract {
            if request.settings.includes.is_empty() {
                return Err(Error::configuration(format!(
                    "cannot instantiate abstract destination type {}: no derived mapping is configured",
                    model.type_name
                )));
            }
            // reached only when no derived branch matched at runtime
            Instantiation::Abstract {
                ty: model.type_name,
            }
        } else {
            Instantiation::Construct {
                ty: model.type_name,
                args,
            }
        };

        Ok(BlockParts {
            instantiation,
            copies,
        })
    }
}
