//! Type registry: member and constructor descriptors for mappable types
//!
//! The engine has no runtime reflection to lean on, so every mappable type is
//! described up front by a `TypeModel`: its members, accessibility, optional
//! constructor, base type, and whether it is abstract. Registries are plain
//! serde data and can be loaded from JSON documents shipped next to the
//! application.
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scalar kinds carried by the value model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    Str,
}

/// Reference to a type as it appears in member and parameter declarations
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// The untyped "any value" type
    Any,
    Scalar(ScalarKind),
    Optional(Box<TypeRef>),
    List(Box<TypeRef>),
    /// A registered record type
    Named(String),
}

impl TypeRef {
    /// Shorthand for a named type reference
    pub fn named(name: impl Into<String>) -> TypeRef {
        TypeRef::Named(name.into())
    }

    pub const BOOL: TypeRef = TypeRef::Scalar(ScalarKind::Bool);
    pub const INT: TypeRef = TypeRef::Scalar(ScalarKind::Int);
    pub const FLOAT: TypeRef = TypeRef::Scalar(ScalarKind::Float);
    pub const STR: TypeRef = TypeRef::Scalar(ScalarKind::Str);

    /// Whether a value of this type may be null
    ///
    /// Strings follow the original reference-type semantics: their default is
    /// null, not empty.
    pub fn is_nullable(&self) -> bool {
        !matches!(
            self,
            TypeRef::Scalar(ScalarKind::Bool)
                | TypeRef::Scalar(ScalarKind::Int)
                | TypeRef::Scalar(ScalarKind::Float)
        )
    }

    /// Whether this is a scalar (optionally wrapped) type
    pub fn is_scalar(&self) -> bool {
        match self {
            TypeRef::Scalar(_) => true,
            TypeRef::Optional(inner) => inner.is_scalar(),
            _ => false,
        }
    }

    /// Whether values of this type carry identity, for reference preservation
    pub fn is_reference_type(&self) -> bool {
        matches!(self, TypeRef::Any | TypeRef::List(_) | TypeRef::Named(_))
    }

    /// The default a destination of this type is left at when unmapped
    pub fn default_value(&self) -> Value {
        match self {
            TypeRef::Scalar(ScalarKind::Bool) => Value::Bool(false),
            TypeRef::Scalar(ScalarKind::Int) => Value::Int(0),
            TypeRef::Scalar(ScalarKind::Float) => Value::Float(0.0),
            _ => Value::Null,
        }
    }

    /// Strip optional wrappers
    pub fn unwrap_optional(&self) -> &TypeRef {
        match self {
            TypeRef::Optional(inner) => inner.unwrap_optional(),
            other => other,
        }
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeRef::Any => write!(f, "any"),
            TypeRef::Scalar(ScalarKind::Bool) => write!(f, "bool"),
            TypeRef::Scalar(ScalarKind::Int) => write!(f, "int"),
            TypeRef::Scalar(ScalarKind::Float) => write!(f, "float"),
            TypeRef::Scalar(ScalarKind::Str) => write!(f, "str"),
            TypeRef::Optional(inner) => write!(f, "{}?", inner),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Accessibility of a member accessor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessModifier {
    None,
    Private,
    Protected,
    #[default]
    Public,
}

/// Where a member descriptor came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberOrigin {
    Field,
    #[default]
    Property,
    ConstructorParameter,
}

/// Uniform description of a gettable/settable member of a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberModel {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub getter: AccessModifier,
    #[serde(default)]
    pub setter: AccessModifier,
    #[serde(default)]
    pub origin: MemberOrigin,
}

impl MemberModel {
    /// A public read/write property member
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            getter: AccessModifier::Public,
            setter: AccessModifier::Public,
            origin: MemberOrigin::Property,
        }
    }

    pub fn with_setter(mut self, setter: AccessModifier) -> Self {
        self.setter = setter;
        self
    }

    pub fn with_origin(mut self, origin: MemberOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Readable from mapping code
    pub fn is_readable(&self) -> bool {
        matches!(
            self.getter,
            AccessModifier::Public | AccessModifier::Protected
        )
    }

    /// Settable: has a non-private setter
    pub fn is_settable(&self) -> bool {
        matches!(
            self.setter,
            AccessModifier::Public | AccessModifier::Protected
        )
    }
}

/// A single constructor parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

/// Constructor descriptor: an ordered parameter list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstructorModel {
    pub params: Vec<ConstructorParam>,
}

impl ConstructorModel {
    pub fn new<I, K>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, TypeRef)>,
        K: Into<String>,
    {
        Self {
            params: params
                .into_iter()
                .map(|(name, ty)| ConstructorParam {
                    name: name.into(),
                    ty,
                })
                .collect(),
        }
    }

    /// Whether a destination member is structurally satisfied by a parameter
    pub fn matches_member(&self, member: &MemberModel) -> bool {
        self.params
            .iter()
            .any(|p| p.name == member.name && p.ty == member.ty)
    }
}

/// Structural kind of a registered type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    #[default]
    Class,
    /// Open string-keyed type; reads fall back to the value type's default
    Dictionary { value_type: TypeRef },
}

/// Registered description of a mappable type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeModel {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub is_abstract: bool,
    /// Base type name for reference-compatibility checks
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberModel>,
    #[serde(default)]
    pub constructor: Option<ConstructorModel>,
}

impl TypeModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
            is_abstract: false,
            base: None,
            members: Vec::new(),
            constructor: None,
        }
    }

    /// Add a public read/write member
    pub fn member(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.members.push(MemberModel::new(name, ty));
        self
    }

    pub fn member_model(mut self, member: MemberModel) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_constructor(mut self, constructor: ConstructorModel) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn dictionary(name: impl Into<String>, value_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Dictionary { value_type },
            is_abstract: false,
            base: None,
            members: Vec::new(),
            constructor: None,
        }
    }
}

/// Catalog of registered type models
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeRegistry {
    types: HashMap<String, TypeModel>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type model, replacing any previous registration
    pub fn register(&mut self, model: TypeModel) -> &mut Self {
        self.types.insert(model.name.clone(), model);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeModel> {
        self.types.get(name)
    }

    pub fn expect(&self, name: &str) -> Result<&TypeModel> {
        self.get(name).ok_or_else(|| Error::UnknownType {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Whether `derived` is `base` or a registered subtype of it
    pub fn is_instance(&self, derived: &str, base: &str) -> bool {
        let mut current = Some(derived.to_string());
        while let Some(name) = current {
            if name == base {
                return true;
            }
            current = self.get(&name).and_then(|m| m.base.clone());
        }
        false
    }

    /// Reference-compatibility between type references
    ///
    /// `Any` accepts every value; named types accept registered subtypes.
    pub fn is_assignable(&self, dest: &TypeRef, src: &TypeRef) -> bool {
        if dest == src {
            return true;
        }
        match (dest, src) {
            (TypeRef::Any, _) => true,
            (TypeRef::Named(d), TypeRef::Named(s)) => self.is_instance(s, d),
            _ => false,
        }
    }

    /// Load a registry from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeModel::new("Animal")
                .abstract_type()
                .member("Name", TypeRef::STR),
        );
        registry.register(
            TypeModel::new("Dog")
                .with_base("Animal")
                .member("Name", TypeRef::STR)
                .member("BarkVolume", TypeRef::INT),
        );
        registry.register(
            TypeModel::new("Puppy")
                .with_base("Dog")
                .member("Name", TypeRef::STR),
        );
        registry
    }

    #[test]
    fn test_instance_checks_walk_base_chain() {
        let registry = create_test_registry();
        assert!(registry.is_instance("Dog", "Animal"));
        assert!(registry.is_instance("Puppy", "Animal"));
        assert!(registry.is_instance("Dog", "Dog"));
        assert!(!registry.is_instance("Animal", "Dog"));
    }

    #[test]
    fn test_assignability() {
        let registry = create_test_registry();
        assert!(registry.is_assignable(&TypeRef::Any, &TypeRef::INT));
        assert!(registry.is_assignable(&TypeRef::named("Animal"), &TypeRef::named("Dog")));
        assert!(!registry.is_assignable(&TypeRef::named("Dog"), &TypeRef::named("Animal")));
        assert!(registry.is_assignable(&TypeRef::INT, &TypeRef::INT));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(TypeRef::INT.default_value(), Value::Int(0));
        assert_eq!(TypeRef::BOOL.default_value(), Value::Bool(false));
        assert_eq!(TypeRef::STR.default_value(), Value::Null);
        assert_eq!(TypeRef::named("Poco").default_value(), Value::Null);
    }

    #[test]
    fn test_nullability() {
        assert!(!TypeRef::INT.is_nullable());
        assert!(TypeRef::STR.is_nullable());
        assert!(TypeRef::named("Poco").is_nullable());
        assert!(TypeRef::Optional(Box::new(TypeRef::INT)).is_nullable());
    }

    #[test]
    fn test_constructor_matches_member() {
        let ctor = ConstructorModel::new([("Id", TypeRef::INT), ("Name", TypeRef::STR)]);
        assert!(ctor.matches_member(&MemberModel::new("Id", TypeRef::INT)));
        assert!(!ctor.matches_member(&MemberModel::new("Id", TypeRef::STR)));
        assert!(!ctor.matches_member(&MemberModel::new("Other", TypeRef::INT)));
    }

    #[test]
    fn test_registry_json_round_trip() {
        let registry = create_test_registry();
        let json = registry.to_json().unwrap();
        let loaded = TypeRegistry::from_json(&json).unwrap();
        assert_eq!(loaded.get("Dog"), registry.get("Dog"));
        assert!(loaded.get("Animal").unwrap().is_abstract);
    }
}
