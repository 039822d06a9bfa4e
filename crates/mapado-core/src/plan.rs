//! Compiled mapping plans
//!
//! A compiled mapping is a typed plan tree interpreted by the evaluator. The
//! two plan shapes mirror the two code shapes a synthesized mapping body may
//! take: `Plan::Inline` is the pure-expression form, `Plan::Block` the
//! statement-sequence form with instantiation, ordered member copies, hooks,
//! and the optional reference-preservation and derived-dispatch wrapping.
//!
//! Nested mappings that could not be inlined appear as `Expr::Invoke` nodes
//! referencing their own cache entry by key; the owning configuration
//! guarantees every referenced key is compiled before a plan is handed out.
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::registry::{ScalarKind, TypeRef};
use crate::settings::{AfterHook, ConstructWith, MapCondition, ValueTransform};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// The call shape a mapping is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapKind {
    /// source -> fresh destination
    NewInstance,
    /// (source, existing destination) -> destination
    OntoExisting,
    /// Pure-expression form for query/transform pipelines
    Projection,
}

/// Cache key of one compiled mapping within a configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapKey {
    pub source: TypeRef,
    pub dest: TypeRef,
    pub kind: MapKind,
}

impl MapKey {
    pub fn new(source: TypeRef, dest: TypeRef, kind: MapKind) -> Self {
        Self { source, dest, kind }
    }
}

impl std::fmt::Display for MapKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {} ({:?})", self.source, self.dest, self.kind)
    }
}

/// An expression together with the type it evaluates to
#[derive(Debug, Clone)]
pub struct TypedExpr {
    pub expr: Expr,
    pub ty: TypeRef,
}

/// Scalar constant embedded in a plan
///
/// Plans are shared across threads, so constants carry no record cells; a
/// resolver that needs a structured constant builds it through a factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Constant {
    /// The constant a destination of `ty` is left at when unmapped
    pub fn default_of(ty: &TypeRef) -> Constant {
        match ty {
            TypeRef::Scalar(ScalarKind::Bool) => Constant::Bool(false),
            TypeRef::Scalar(ScalarKind::Int) => Constant::Int(0),
            TypeRef::Scalar(ScalarKind::Float) => Constant::Float(0.0),
            _ => Constant::Null,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Constant::Null => Value::Null,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Int(i) => Value::Int(*i),
            Constant::Float(f) => Value::Float(*f),
            Constant::Str(s) => Value::Str(s.clone()),
        }
    }
}

/// Pure-form expression nodes
#[derive(Debug, Clone)]
pub enum Expr {
    /// The mapping call's source value
    Source,
    /// The pre-existing destination of an onto-existing call
    Existing,
    Constant(Constant),
    /// Read a declared member; null objects propagate null
    Member { object: Box<Expr>, name: String },
    /// Read a dictionary entry; absent keys yield the entry type's default
    Key {
        object: Box<Expr>,
        name: String,
        ty: TypeRef,
    },
    /// Coerce to a target type
    Convert { value: Box<Expr>, to: TypeRef },
    /// `subject` null -> `fallback`, otherwise `body`
    NullGuard {
        subject: Box<Expr>,
        body: Box<Expr>,
        fallback: Box<Expr>,
    },
    /// Construct a destination record: constructor arguments by position,
    /// then member initializers in order. `subject` is the mapping's own
    /// source, consulted by factories and initializer conditions.
    Construct {
        ty: String,
        subject: Box<Expr>,
        factory: Option<ConstructWith>,
        args: Vec<Expr>,
        inits: Vec<MemberCopy>,
    },
    /// Invoke the separately compiled mapping for `key`
    Invoke { key: MapKey, source: Box<Expr> },
    /// Apply a destination post-transform
    Transform {
        func: ValueTransform,
        value: Box<Expr>,
    },
}

impl Expr {
    /// Substitute every `Source` node with `arg`
    ///
    /// Inlining a nested mapping body into a member position rebinds the
    /// nested body's source to the member's read expression.
    pub fn apply(self, arg: &Expr) -> Expr {
        match self {
            Expr::Source => arg.clone(),
            Expr::Existing => Expr::Existing,
            Expr::Constant(v) => Expr::Constant(v),
            Expr::Member { object, name } => Expr::Member {
                object: Box::new(object.apply(arg)),
                name,
            },
            Expr::Key { object, name, ty } => Expr::Key {
                object: Box::new(object.apply(arg)),
                name,
                ty,
            },
            Expr::Convert { value, to } => Expr::Convert {
                value: Box::new(value.apply(arg)),
                to,
            },
            Expr::NullGuard {
                subject,
                body,
                fallback,
            } => Expr::NullGuard {
                subject: Box::new(subject.apply(arg)),
                body: Box::new(body.apply(arg)),
                fallback: Box::new(fallback.apply(arg)),
            },
            Expr::Construct {
                ty,
                subject,
                factory,
                args,
                inits,
            } => Expr::Construct {
                ty,
                subject: Box::new(subject.apply(arg)),
                factory,
                args: args.into_iter().map(|a| a.apply(arg)).collect(),
                inits: inits
                    .into_iter()
                    .map(|init| MemberCopy {
                        member: init.member,
                        value: init.value.apply(arg),
                        condition: init.condition,
                    })
                    .collect(),
            },
            Expr::Invoke { key, source } => Expr::Invoke {
                key,
                source: Box::new(source.apply(arg)),
            },
            Expr::Transform { func, value } => Expr::Transform {
                func,
                value: Box::new(value.apply(arg)),
            },
        }
    }
}

/// One member assignment or initializer
#[derive(Debug, Clone)]
pub struct MemberCopy {
    pub member: String,
    pub value: Expr,
    /// Conditional-ignore guard; a `true` result skips the assignment
    pub condition: Option<MapCondition>,
}

/// How the statement form produces its fresh destination
#[derive(Debug, Clone)]
pub enum Instantiation {
    /// Registered constructor (or field-default construction when `args` is
    /// empty and no constructor is declared)
    Construct { ty: String, args: Vec<Expr> },
    /// User construction factory
    Factory(ConstructWith),
    /// Expression-producing strategies (scalar and any-type conversions)
    Expr(Expr),
    /// Abstract fall-through: no derived branch matched at runtime
    Abstract { ty: String },
}

/// One derived-type dispatch branch
#[derive(Debug, Clone)]
pub struct DerivedBranch {
    pub source_ty: String,
    pub dest_ty: String,
    pub key: MapKey,
}

/// Statement-sequence form of a compiled mapping
#[derive(Debug, Clone)]
pub struct BlockPlan {
    /// Short-circuit to the destination default on a null source
    pub null_guard: bool,
    pub dest_ty: TypeRef,
    /// Derived-type dispatch branches, in configuration order
    pub derived: Vec<DerivedBranch>,
    pub preserve_reference: bool,
    pub instantiation: Instantiation,
    pub copies: Vec<MemberCopy>,
    /// After-mapping hooks, in registration order
    pub hooks: Vec<AfterHook>,
}

/// A compiled mapping body
#[derive(Debug, Clone)]
pub enum Plan {
    /// Pure-expression form
    Inline(Expr),
    /// Statement-sequence form
    Block(BlockPlan),
}

impl Plan {
    /// The pure expression of this plan, when it has one
    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Plan::Inline(expr) => Some(expr),
            Plan::Block(_) => None,
        }
    }
}
