//! Class-model construction and destination member resolution
//!
//! For a class-like destination the builder walks declared members in order,
//! applies ignore rules and should-map predicates, and runs the
//! value-accessor chain to find each member's getter. Members with no getter
//! but a structurally matching constructor parameter are satisfied through
//! construction; remaining settable members are unmapped and either tolerated
//! (left at their default) or rejected when RequireDestinationMemberSource is
//! enabled.
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::compile::accessors::AccessorContext;
use crate::compile::CompileRequest;
use crate::config::AdapterConfig;
use crate::error::{Error, Result};
use crate::plan::{Expr, TypedExpr};
use crate::registry::{
    AccessModifier, ConstructorModel, MemberModel, MemberOrigin, TypeKind, TypeRef,
};
use crate::settings::{AdapterSettings, MapCondition, MemberSide};

/// Resolved description of a destination type's mappable surface
#[derive(Debug, Clone)]
pub struct ClassModel {
    pub type_name: String,
    pub is_abstract: bool,
    pub members: Vec<MemberModel>,
    pub constructor: Option<ConstructorModel>,
}

/// One destination member with its resolved getter
#[derive(Debug, Clone)]
pub struct MemberMapping {
    pub member: MemberModel,
    /// `None` when the member is satisfied through a constructor argument
    pub getter: Option<TypedExpr>,
    pub condition: Option<MapCondition>,
}

/// The class model joined with resolved getters
#[derive(Debug, Clone)]
pub struct ClassMapping {
    pub constructor: Option<ConstructorModel>,
    pub members: Vec<MemberMapping>,
}

/// Build the class model for a destination type
pub(crate) fn class_model(config: &AdapterConfig, dest: &TypeRef) -> Result<ClassModel> {
    let TypeRef::Named(name) = dest.unwrap_optional() else {
        return Err(Error::configuration(format!(
            "destination {} is not a class-like type",
            dest
        )));
    };
    let model = config.registry().expect(name)?;
    if !matches!(model.kind, TypeKind::Class) {
        return Err(Error::configuration(format!(
            "destination {} is not a class-like type",
            name
        )));
    }
    Ok(ClassModel {
        type_name: model.name.clone(),
        is_abstract: model.is_abstract,
        members: model.members.clone(),
        constructor: model.constructor.clone(),
    })
}

/// Resolve getters for every mappable destination member
pub(crate) fn build_class_mapping(
    config: &AdapterConfig,
    source: &Expr,
    model: &ClassModel,
    request: &CompileRequest,
) -> Result<ClassMapping> {
    let cx = AccessorContext { config, request };
    let custom_only = request.settings.ignore_non_mapped == Some(true);

    let mut members = Vec::new();
    let mut unmapped = Vec::new();

    for dest_member in &model.members {
        let (ignored, condition) = process_ignores(&request.settings, dest_member);
        if ignored {
            continue;
        }

        let getter = request
            .settings
            .accessors
            .iter()
            .filter(|accessor| !custom_only || accessor.is_custom())
            .find_map(|accessor| accessor.resolve(source, dest_member, &cx));

        if let Some(getter) = getter {
            members.push(MemberMapping {
                member: dest_member.clone(),
                getter: Some(getter),
                condition,
            });
        } else if model
            .constructor
            .as_ref()
            .is_some_and(|ctor| ctor.matches_member(dest_member))
        {
            members.push(MemberMapping {
                member: dest_member.clone(),
                getter: None,
                condition,
            });
        } else if dest_member.is_settable() {
            unmapped.push(dest_member.name.clone());
        }
    }

    if request.settings.require_destination_member_source == Some(true) && !unmapped.is_empty() {
        return Err(Error::Validation {
            type_name: model.type_name.clone(),
            members: unmapped.join(","),
        });
    }

    Ok(ClassMapping {
        constructor: model.constructor.clone(),
        members,
    })
}

/// Evaluate ignore rules for a destination member
///
/// Returns whether the member is excluded outright, and the runtime condition
/// guarding its assignment otherwise.
fn process_ignores(
    settings: &AdapterSettings,
    member: &MemberModel,
) -> (bool, Option<MapCondition>) {
    if !should_map(settings, member, MemberSide::Destination) {
        return (true, None);
    }
    match settings.ignores.get(&member.name) {
        Some(None) => (true, None),
        Some(Some(condition)) => (false, Some(condition.clone())),
        None => (false, None),
    }
}

/// First decisive should-map predicate wins; the default admits public
/// members and constructor parameters
fn should_map(settings: &AdapterSettings, member: &MemberModel, side: MemberSide) -> bool {
    for predicate in &settings.should_map {
        if let Some(decision) = predicate.evaluate(member, side) {
            return decision;
        }
    }
    member.getter == AccessModifier::Public
        || member.setter == AccessModifier::Public
        || member.origin == MemberOrigin::ConstructorParameter
}
