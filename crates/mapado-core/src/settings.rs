//! Per-pair mapping settings and rule-based configuration
//!
//! An `AdapterSettings` value carries everything the compiler consults for
//! one (source, destination) pair: ignore rules, the value-accessor chain,
//! after-mapping hooks, the derived-type table, construction strategy, flags,
//! and destination post-transforms. Settings layer: the explicitly registered
//! pair settings first, then every matching rule block in registration order,
//! then the configuration's global defaults. Layering never overwrites an
//! already-resolved flag and appends to ordered lists.
//!
//! User-supplied behavior (hooks, factories, predicates) is held behind small
//! `Arc` wrappers so settings stay cheap to clone and shareable across
//! threads.
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::compile::accessors::ValueAccessor;
use crate::plan::{Expr, MapKind, TypedExpr};
use crate::registry::{MemberModel, TypeRef};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Which side of a mapping a member belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberSide {
    Source,
    Destination,
}

/// An after-mapping hook: runs after all member assignments
#[derive(Clone)]
pub struct AfterHook(Arc<dyn Fn(&Value, &Value) + Send + Sync>);

impl AfterHook {
    pub fn new(f: impl Fn(&Value, &Value) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, source: &Value, destination: &Value) {
        (self.0)(source, destination)
    }
}

impl fmt::Debug for AfterHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AfterHook")
    }
}

/// Explicit construction strategy: source value to destination instance
#[derive(Clone)]
pub struct ConstructWith(Arc<dyn Fn(&Value) -> Value + Send + Sync>);

impl ConstructWith {
    pub fn new(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, source: &Value) -> Value {
        (self.0)(source)
    }
}

impl fmt::Debug for ConstructWith {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConstructWith")
    }
}

/// Destination post-transform applied after a nested conversion
#[derive(Clone)]
pub struct ValueTransform(Arc<dyn Fn(Value) -> Value + Send + Sync>);

impl ValueTransform {
    pub fn new(f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, value: Value) -> Value {
        (self.0)(value)
    }
}

impl fmt::Debug for ValueTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueTransform")
    }
}

/// Runtime condition attached to a conditional ignore
///
/// Receives the mapping's source and, when one exists yet, the destination
/// being filled; in pure-expression position the destination is `None`. A
/// `true` result suppresses the member assignment.
#[derive(Clone)]
pub struct MapCondition(Arc<dyn Fn(&Value, Option<&Value>) -> bool + Send + Sync>);

impl MapCondition {
    pub fn new(f: impl Fn(&Value, Option<&Value>) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn check(&self, source: &Value, destination: Option<&Value>) -> bool {
        (self.0)(source, destination)
    }
}

impl fmt::Debug for MapCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MapCondition")
    }
}

/// Custom read-expression factory for one destination member
#[derive(Clone)]
pub struct MemberResolver(Arc<dyn Fn(&Expr) -> TypedExpr + Send + Sync>);

impl MemberResolver {
    pub fn new(f: impl Fn(&Expr) -> TypedExpr + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Resolve a source member by name, declaring the produced type
    pub fn source_member(name: impl Into<String>, ty: TypeRef) -> Self {
        let name = name.into();
        Self::new(move |source| TypedExpr {
            expr: Expr::Member {
                object: Box::new(source.clone()),
                name: name.clone(),
            },
            ty: ty.clone(),
        })
    }

    pub(crate) fn resolve(&self, source: &Expr) -> TypedExpr {
        (self.0)(source)
    }
}

impl fmt::Debug for MemberResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MemberResolver")
    }
}

/// Should-map predicate: first decisive answer wins
#[derive(Clone)]
pub struct ShouldMapPredicate(Arc<dyn Fn(&MemberModel, MemberSide) -> Option<bool> + Send + Sync>);

impl ShouldMapPredicate {
    pub fn new(f: impl Fn(&MemberModel, MemberSide) -> Option<bool> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn evaluate(&self, member: &MemberModel, side: MemberSide) -> Option<bool> {
        (self.0)(member, side)
    }
}

impl fmt::Debug for ShouldMapPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShouldMapPredicate")
    }
}

/// A custom resolver registration for one destination member
#[derive(Debug, Clone)]
pub struct ResolverEntry {
    pub member: String,
    pub resolver: MemberResolver,
}

/// One derived-type table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedPair {
    pub source: String,
    pub dest: String,
}

/// Settings for one source/destination type pair
#[derive(Debug, Clone, Default)]
pub struct AdapterSettings {
    /// Destination member name -> optional condition; `None` ignores
    /// unconditionally, `Some` guards the assignment at runtime
    pub ignores: HashMap<String, Option<MapCondition>>,
    /// Should-map predicates, most specific first
    pub should_map: Vec<ShouldMapPredicate>,
    /// Custom member resolvers, in registration order
    pub resolvers: Vec<ResolverEntry>,
    /// Value-accessor strategy chain, in resolution order
    pub accessors: Vec<ValueAccessor>,
    /// After-mapping hooks, in registration order
    pub after_hooks: Vec<AfterHook>,
    /// Derived-type table, in configuration order; first runtime match wins,
    /// including in diamond-shaped hierarchies
    pub includes: Vec<DerivedPair>,
    /// Explicit construction strategy
    pub construct_with: Option<ConstructWith>,
    /// Destination type -> post-transform
    pub transforms: HashMap<TypeRef, ValueTransform>,
    pub preserve_reference: Option<bool>,
    pub require_destination_member_source: Option<bool>,
    pub shallow_copy_for_same_type: Option<bool>,
    pub avoid_inline_mapping: Option<bool>,
    /// Restrict the accessor chain to custom resolvers
    pub ignore_non_mapped: Option<bool>,
}

impl AdapterSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore a destination member unconditionally
    pub fn ignore(mut self, member: impl Into<String>) -> Self {
        self.ignores.insert(member.into(), None);
        self
    }

    /// Ignore a destination member when the condition holds at runtime
    pub fn ignore_if(mut self, member: impl Into<String>, condition: MapCondition) -> Self {
        self.ignores.insert(member.into(), Some(condition));
        self
    }

    pub fn should_map(mut self, predicate: ShouldMapPredicate) -> Self {
        self.should_map.push(predicate);
        self
    }

    /// Register a custom resolver for a destination member
    pub fn map_member(mut self, member: impl Into<String>, resolver: MemberResolver) -> Self {
        self.resolvers.push(ResolverEntry {
            member: member.into(),
            resolver,
        });
        self
    }

    pub fn accessor(mut self, accessor: ValueAccessor) -> Self {
        self.accessors.push(accessor);
        self
    }

    pub fn after_mapping(mut self, hook: AfterHook) -> Self {
        self.after_hooks.push(hook);
        self
    }

    /// Add a derived-type table entry
    pub fn include_derived(mut self, source: impl Into<String>, dest: impl Into<String>) -> Self {
        self.includes.push(DerivedPair {
            source: source.into(),
            dest: dest.into(),
        });
        self
    }

    pub fn construct_with(mut self, factory: ConstructWith) -> Self {
        self.construct_with = Some(factory);
        self
    }

    /// Register a destination post-transform for a type
    pub fn transform(mut self, ty: TypeRef, transform: ValueTransform) -> Self {
        self.transforms.entry(ty).or_insert(transform);
        self
    }

    pub fn preserve_reference(mut self, value: bool) -> Self {
        self.preserve_reference = Some(value);
        self
    }

    pub fn require_destination_member_source(mut self, value: bool) -> Self {
        self.require_destination_member_source = Some(value);
        self
    }

    pub fn shallow_copy_for_same_type(mut self, value: bool) -> Self {
        self.shallow_copy_for_same_type = Some(value);
        self
    }

    pub fn avoid_inline_mapping(mut self, value: bool) -> Self {
        self.avoid_inline_mapping = Some(value);
        self
    }

    pub fn ignore_non_mapped(mut self, value: bool) -> Self {
        self.ignore_non_mapped = Some(value);
        self
    }

    /// Layer less-specific settings underneath this value
    ///
    /// Resolved flags and existing map entries are kept; ordered lists are
    /// appended so earlier (more specific) registrations run first.
    pub fn apply(&mut self, other: &AdapterSettings) {
        for (name, condition) in &other.ignores {
            self.ignores
                .entry(name.clone())
                .or_insert_with(|| condition.clone());
        }
        self.should_map.extend(other.should_map.iter().cloned());
        self.resolvers.extend(other.resolvers.iter().cloned());
        self.accessors.extend(other.accessors.iter().cloned());
        self.after_hooks.extend(other.after_hooks.iter().cloned());
        self.includes.extend(other.includes.iter().cloned());
        if self.construct_with.is_none() {
            self.construct_with = other.construct_with.clone();
        }
        for (ty, transform) in &other.transforms {
            self.transforms
                .entry(ty.clone())
                .or_insert_with(|| transform.clone());
        }
        self.preserve_reference = self.preserve_reference.or(other.preserve_reference);
        self.require_destination_member_source = self
            .require_destination_member_source
            .or(other.require_destination_member_source);
        self.shallow_copy_for_same_type = self
            .shallow_copy_for_same_type
            .or(other.shallow_copy_for_same_type);
        self.avoid_inline_mapping = self.avoid_inline_mapping.or(other.avoid_inline_mapping);
        self.ignore_non_mapped = self.ignore_non_mapped.or(other.ignore_non_mapped);
    }
}

/// Predicate selecting the pairs a settings rule applies to
#[derive(Clone)]
pub struct RulePredicate(Arc<dyn Fn(&TypeRef, &TypeRef, MapKind) -> bool + Send + Sync>);

impl RulePredicate {
    pub fn new(f: impl Fn(&TypeRef, &TypeRef, MapKind) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn matches(&self, source: &TypeRef, dest: &TypeRef, kind: MapKind) -> bool {
        (self.0)(source, dest, kind)
    }
}

impl fmt::Debug for RulePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RulePredicate")
    }
}

/// Rule-based settings: applied to every pair the predicate matches
#[derive(Debug, Clone)]
pub struct SettingsRule {
    pub predicate: RulePredicate,
    pub settings: AdapterSettings,
}

impl SettingsRule {
    pub fn new(predicate: RulePredicate, settings: AdapterSettings) -> Self {
        Self {
            predicate,
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_keeps_resolved_flags() {
        let mut specific = AdapterSettings::new().preserve_reference(true);
        let general = AdapterSettings::new()
            .preserve_reference(false)
            .require_destination_member_source(true);
        specific.apply(&general);

        assert_eq!(specific.preserve_reference, Some(true));
        assert_eq!(specific.require_destination_member_source, Some(true));
    }

    #[test]
    fn test_apply_keeps_existing_ignores() {
        let mut specific = AdapterSettings::new()
            .ignore_if("Id", MapCondition::new(|_, _| false));
        let general = AdapterSettings::new().ignore("Id").ignore("Name");
        specific.apply(&general);

        assert!(specific.ignores.get("Id").unwrap().is_some());
        assert!(specific.ignores.get("Name").unwrap().is_none());
    }

    #[test]
    fn test_apply_appends_ordered_lists() {
        let mut specific = AdapterSettings::new().include_derived("Dog", "DogDto");
        let general = AdapterSettings::new().include_derived("Cat", "CatDto");
        specific.apply(&general);

        assert_eq!(
            specific.includes,
            vec![
                DerivedPair {
                    source: "Dog".into(),
                    dest: "DogDto".into()
                },
                DerivedPair {
                    source: "Cat".into(),
                    dest: "CatDto".into()
                },
            ]
        );
    }

    #[test]
    fn test_transforms_do_not_overwrite() {
        let mut specific =
            AdapterSettings::new().transform(TypeRef::STR, ValueTransform::new(|v| v));
        let doubled = ValueTransform::new(|v| match v {
            Value::Int(i) => Value::Int(i * 2),
            other => other,
        });
        let general = AdapterSettings::new()
            .transform(TypeRef::STR, doubled.clone())
            .transform(TypeRef::INT, doubled);
        specific.apply(&general);

        assert_eq!(
            specific.transforms[&TypeRef::STR].call(Value::Int(3)),
            Value::Int(3)
        );
        assert_eq!(
            specific.transforms[&TypeRef::INT].call(Value::Int(3)),
            Value::Int(6)
        );
    }

    #[test]
    fn test_rule_predicate() {
        let rule = SettingsRule::new(
            RulePredicate::new(|src, dest, _| src == dest),
            AdapterSettings::new().ignore("Id"),
        );
        let poco = TypeRef::named("Poco");
        assert!(rule.predicate.matches(&poco, &poco, MapKind::NewInstance));
        assert!(!rule
            .predicate
            .matches(&poco, &TypeRef::named("Dto"), MapKind::NewInstance));
    }
}
