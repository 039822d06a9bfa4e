//! Tree-walking evaluation of compiled mapping plans
//!
//! The evaluator interprets a plan against a source value. It is the only
//! code that touches the reference-preservation scope: the root call creates
//! one scope and every nested invocation reuses it, so cross-references
//! anywhere in the same graph resolve to the same destination instance.
//! Evaluation reads configuration and writes newly allocated destinations
//! only; nothing here consults settings.
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::config::AdapterConfig;
use crate::error::{Error, Result};
use crate::plan::{BlockPlan, Constant, DerivedBranch, Expr, Instantiation, MapKey, MapKind, Plan};
use crate::registry::{ScalarKind, TypeRef};
use crate::scope::MapScope;
use crate::value::{Record, Value};

/// Plan interpreter bound to one configuration
pub(crate) struct Evaluator<'a> {
    config: &'a AdapterConfig,
}

impl<'a> Evaluator<'a> {
    pub fn new(config: &'a AdapterConfig) -> Self {
        Self { config }
    }

    /// Run a plan as a root mapping call, owning a fresh scope
    pub fn run(&self, plan: &Plan, source: &Value, existing: Option<&Value>) -> Result<Value> {
        let mut scope = MapScope::new();
        self.eval_plan(plan, source, existing, &mut scope)
    }

    fn eval_plan(
        &self,
        plan: &Plan,
        source: &Value,
        existing: Option<&Value>,
        scope: &mut MapScope,
    ) -> Result<Value> {
        match plan {
            Plan::Inline(expr) => self.eval_expr(expr, source, existing, scope),
            Plan::Block(block) => self.eval_block(block, source, existing, scope),
        }
    }

    fn eval_block(
        &self,
        block: &BlockPlan,
        source: &Value,
        existing: Option<&Value>,
        scope: &mut MapScope,
    ) -> Result<Value> {
        if block.null_guard && source.is_null() {
            return Ok(match existing {
                Some(dest) if !dest.is_null() => dest.clone(),
                _ => block.dest_ty.default_value(),
            });
        }

        for branch in &block.derived {
            if self.branch_matches(branch, source, existing) {
                return self.invoke(&branch.key, source, existing, scope);
            }
        }

        let identity = if block.preserve_reference {
            source.identity()
        } else {
            None
        };
        if let Some(id) = identity {
            if let Some(hit) = scope.lookup(id) {
                return Ok(hit);
            }
        }

        let result = match existing {
            Some(dest) if !dest.is_null() => dest.clone(),
            _ => self.instantiate(&block.instantiation, source, existing, scope)?,
        };

        if let Some(id) = identity {
            scope.register(id, result.clone());
        }

        for copy in &block.copies {
            if let Some(condition) = &copy.condition {
                if condition.check(source, Some(&result)) {
                    continue;
                }
            }
            let value = self.eval_expr(&copy.value, source, existing, scope)?;
            result.set_member(&copy.member, value)?;
        }

        for hook in &block.hooks {
            hook.call(source, &result);
        }

        Ok(result)
    }

    /// Runtime test for one derived-dispatch branch
    fn branch_matches(
        &self,
        branch: &DerivedBranch,
        source: &Value,
        existing: Option<&Value>,
    ) -> bool {
        let Some(tag) = source.type_tag() else {
            return false;
        };
        if !self.config.registry().is_instance(&tag, &branch.source_ty) {
            return false;
        }
        if branch.key.kind == MapKind::OntoExisting {
            // the existing destination must itself be the derived type
            match existing {
                Some(dest) if !dest.is_null() => match dest.type_tag() {
                    Some(dest_tag) => {
                        self.config.registry().is_instance(&dest_tag, &branch.dest_ty)
                    }
                    None => false,
                },
                _ => false,
            }
        } else {
            true
        }
    }

    fn instantiate(
        &self,
        instantiation: &Instantiation,
        source: &Value,
        existing: Option<&Value>,
        scope: &mut MapScope,
    ) -> Result<Value> {
        match instantiation {
            Instantiation::Construct { ty, args } => {
                self.fresh_record(ty, args, source, existing, scope)
            }
            Instantiation::Factory(factory) => Ok(factory.call(source)),
            Instantiation::Expr(expr) => self.eval_expr(expr, source, existing, scope),
            Instantiation::Abstract { ty } => Err(Error::execution(format!(
                "cannot instantiate abstract type {}",
                ty
            ))),
        }
    }

    /// Build a destination record: every declared member at its default,
    /// constructor parameters filled from their argument expressions
    fn fresh_record(
        &self,
        ty: &str,
        args: &[Expr],
        source: &Value,
        existing: Option<&Value>,
        scope: &mut MapScope,
    ) -> Result<Value> {
        let model = self.config.registry().expect(ty)?;
        let mut record = Record::new(ty);
        for member in &model.members {
            record.set(member.name.clone(), member.ty.default_value());
        }
        let result = record.into_value();
        if let Some(ctor) = &model.constructor {
            for (param, arg) in ctor.params.iter().zip(args) {
                let value = self.eval_expr(arg, source, existing, scope)?;
                result.set_member(&param.name, value)?;
            }
        }
        Ok(result)
    }

    fn invoke(
        &self,
        key: &MapKey,
        source: &Value,
        existing: Option<&Value>,
        scope: &mut MapScope,
    ) -> Result<Value> {
        let plan = self.config.plan_for(key)?;
        self.eval_plan(&plan, source, existing, scope)
    }

    fn eval_expr(
        &self,
        expr: &Expr,
        source: &Value,
        existing: Option<&Value>,
        scope: &mut MapScope,
    ) -> Result<Value> {
        match expr {
            Expr::Source => Ok(source.clone()),
            Expr::Existing => Ok(existing.cloned().unwrap_or(Value::Null)),
            Expr::Constant(constant) => Ok(constant.to_value()),
            Expr::Member { object, name } => {
                let object = self.eval_expr(object, source, existing, scope)?;
                match object {
                    Value::Null => Ok(Value::Null),
                    Value::Record(_) => Ok(object.get_member(name).unwrap_or(Value::Null)),
                    other => Err(Error::execution(format!(
                        "cannot read member '{}' of non-record value {:?}",
                        name, other
                    ))),
                }
            }
            Expr::Key { object, name, ty } => {
                let object = self.eval_expr(object, source, existing, scope)?;
                match object {
                    Value::Null => Ok(ty.default_value()),
                    Value::Record(_) => Ok(object
                        .get_member(name)
                        .unwrap_or_else(|| ty.default_value())),
                    other => Err(Error::execution(format!(
                        "cannot read key '{}' of non-record value {:?}",
                        name, other
                    ))),
                }
            }
            Expr::Convert { value, to } => {
                let value = self.eval_expr(value, source, existing, scope)?;
                self.coerce(value, to)
            }
            Expr::NullGuard {
                subject,
                body,
                fallback,
            } => {
                if self.eval_expr(subject, source, existing, scope)?.is_null() {
                    self.eval_expr(fallback, source, existing, scope)
                } else {
                    self.eval_expr(body, source, existing, scope)
                }
            }
            Expr::Construct {
                ty,
                subject,
                factory,
                args,
                inits,
            } => {
                let subject = self.eval_expr(subject, source, existing, scope)?;
                let result = match factory {
                    Some(factory) => factory.call(&subject),
                    None => self.fresh_record(ty, args, source, existing, scope)?,
                };
                for init in inits {
                    if let Some(condition) = &init.condition {
                        if condition.check(&subject, None) {
                            continue;
                        }
                    }
                    let value = self.eval_expr(&init.value, source, existing, scope)?;
                    result.set_member(&init.member, value)?;
                }
                Ok(result)
            }
            Expr::Invoke { key, source: arg } => {
                let value = self.eval_expr(arg, source, existing, scope)?;
                self.invoke(key, &value, None, scope)
            }
            Expr::Transform { func, value } => {
                let value = self.eval_expr(value, source, existing, scope)?;
                Ok(func.call(value))
            }
        }
    }

    fn coerce(&self, value: Value, to: &TypeRef) -> Result<Value> {
        match to.unwrap_optional() {
            TypeRef::Any => Ok(value),
            TypeRef::Scalar(kind) => coerce_scalar(value, *kind),
            TypeRef::Named(name) => match &value {
                Value::Null => Ok(Value::Null),
                Value::Record(_) => {
                    let tag = value.type_tag().unwrap_or_default();
                    if self.config.registry().is_instance(&tag, name) {
                        Ok(value)
                    } else {
                        Err(Error::execution(format!(
                            "cannot cast record of type {} to {}",
                            tag, name
                        )))
                    }
                }
                other => Err(Error::execution(format!(
                    "cannot cast {:?} to {}",
                    other, name
                ))),
            },
            TypeRef::List(_) => match value {
                Value::Null | Value::List(_) => Ok(value),
                other => Err(Error::execution(format!("cannot cast {:?} to a list", other))),
            },
            TypeRef::Optional(_) => unreachable!("optionals are unwrapped above"),
        }
    }
}

/// Scalar coercion grid; null coerces to the target's default
fn coerce_scalar(value: Value, kind: ScalarKind) -> Result<Value> {
    match (value, kind) {
        (Value::Null, kind) => Ok(TypeRef::Scalar(kind).default_value()),
        (value @ Value::Bool(_), ScalarKind::Bool) => Ok(value),
        (value @ Value::Int(_), ScalarKind::Int) => Ok(value),
        (value @ Value::Float(_), ScalarKind::Float) => Ok(value),
        (value @ Value::Str(_), ScalarKind::Str) => Ok(value),
        (Value::Int(i), ScalarKind::Float) => Ok(Value::Float(i as f64)),
        (Value::Float(f), ScalarKind::Int) => Ok(Value::Int(f.round() as i64)),
        (Value::Int(i), ScalarKind::Str) => Ok(Value::Str(i.to_string())),
        (Value::Float(f), ScalarKind::Str) => Ok(Value::Str(f.to_string())),
        (Value::Bool(b), ScalarKind::Str) => Ok(Value::Str(b.to_string())),
        (Value::Bool(b), ScalarKind::Int) => Ok(Value::Int(i64::from(b))),
        (Value::Bool(b), ScalarKind::Float) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
        (Value::Int(i), ScalarKind::Bool) => Ok(Value::Bool(i != 0)),
        (Value::Str(s), ScalarKind::Int) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            Error::execution(format!("cannot convert string '{}' to an integer", s))
        }),
        (Value::Str(s), ScalarKind::Float) => {
            s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                Error::execution(format!("cannot convert string '{}' to a float", s))
            })
        }
        (Value::Str(s), ScalarKind::Bool) => match s.to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(Value::Bool(true)),
            "false" | "no" | "0" | "off" => Ok(Value::Bool(false)),
            _ => Err(Error::execution(format!(
                "cannot convert string '{}' to a boolean",
                s
            ))),
        },
        (other, kind) => Err(Error::execution(format!(
            "cannot convert {:?} to {:?}",
            other, kind
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;

    #[test]
    fn test_existing_expression_reads_the_destination_argument() {
        let config = AdapterConfig::new(TypeRegistry::new());
        let evaluator = Evaluator::new(&config);
        let plan = Plan::Inline(Expr::Existing);

        let existing = Value::record("Dto", [("Id", Value::Int(1))]);
        let result = evaluator
            .run(&plan, &Value::Null, Some(&existing))
            .unwrap();
        assert!(Value::same_instance(&result, &existing));

        let absent = evaluator.run(&plan, &Value::Null, None).unwrap();
        assert_eq!(absent, Value::Null);
    }

    #[test]
    fn test_null_guard_short_circuits() {
        let config = AdapterConfig::new(TypeRegistry::new());
        let evaluator = Evaluator::new(&config);
        let plan = Plan::Inline(Expr::NullGuard {
            subject: Box::new(Expr::Source),
            body: Box::new(Expr::Member {
                object: Box::new(Expr::Source),
                name: "Name".into(),
            }),
            fallback: Box::new(Expr::Constant(Constant::Str("fallback".into()))),
        });

        let result = evaluator.run(&plan, &Value::Null, None).unwrap();
        assert_eq!(result, Value::Str("fallback".into()));

        let source = Value::record("Poco", [("Name", Value::Str("set".into()))]);
        let result = evaluator.run(&plan, &source, None).unwrap();
        assert_eq!(result, Value::Str("set".into()));
    }

    #[test]
    fn test_coerce_scalar_grid() {
        assert_eq!(
            coerce_scalar(Value::Int(3), ScalarKind::Float).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(
            coerce_scalar(Value::Float(2.6), ScalarKind::Int).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            coerce_scalar(Value::Str("42".into()), ScalarKind::Int).unwrap(),
            Value::Int(42)
        );
        assert_eq!(
            coerce_scalar(Value::Str("on".into()), ScalarKind::Bool).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            coerce_scalar(Value::Bool(true), ScalarKind::Str).unwrap(),
            Value::Str("true".into())
        );
    }

    #[test]
    fn test_coerce_null_yields_default() {
        assert_eq!(
            coerce_scalar(Value::Null, ScalarKind::Int).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            coerce_scalar(Value::Null, ScalarKind::Str).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_coerce_rejects_unparsable_strings() {
        let err = coerce_scalar(Value::Str("not a number".into()), ScalarKind::Int).unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
    }
}
