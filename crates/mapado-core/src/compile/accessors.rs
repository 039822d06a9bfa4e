//! Value-accessor strategy chain
//!
//! Given a destination member, each accessor in the chain attempts to produce
//! a typed read expression from the source; the first non-null result supplies
//! the member's getter. The default chain resolves custom resolvers first,
//! then an exact source member name, then a flattened nested path, then a
//! dictionary key.
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::compile::CompileRequest;
use crate::config::AdapterConfig;
use crate::plan::{Expr, TypedExpr};
use crate::registry::{MemberModel, TypeKind, TypeModel, TypeRef};
use std::fmt;
use std::sync::Arc;

/// Context handed to accessor strategies
pub struct AccessorContext<'a> {
    pub config: &'a AdapterConfig,
    pub request: &'a CompileRequest,
}

type AccessorFn =
    dyn Fn(&Expr, &MemberModel, &AccessorContext<'_>) -> Option<TypedExpr> + Send + Sync;

/// One pluggable value-accessor strategy
#[derive(Clone)]
pub struct ValueAccessor {
    name: &'static str,
    custom: bool,
    func: Arc<AccessorFn>,
}

impl ValueAccessor {
    pub fn new(
        name: &'static str,
        f: impl Fn(&Expr, &MemberModel, &AccessorContext<'_>) -> Option<TypedExpr>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name,
            custom: false,
            func: Arc::new(f),
        }
    }

    /// A custom-resolver accessor: still runs when IgnoreNonMapped is set
    pub fn custom(
        name: &'static str,
        f: impl Fn(&Expr, &MemberModel, &AccessorContext<'_>) -> Option<TypedExpr>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name,
            custom: true,
            func: Arc::new(f),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_custom(&self) -> bool {
        self.custom
    }

    pub(crate) fn resolve(
        &self,
        source: &Expr,
        member: &MemberModel,
        cx: &AccessorContext<'_>,
    ) -> Option<TypedExpr> {
        (self.func)(source, member, cx)
    }
}

impl fmt::Debug for ValueAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueAccessor")
            .field("name", &self.name)
            .field("custom", &self.custom)
            .finish()
    }
}

/// The default accessor chain, in resolution order
pub fn default_chain() -> Vec<ValueAccessor> {
    vec![
        custom_resolvers(),
        exact_name(),
        flattened_path(),
        dictionary_key(),
    ]
}

/// Resolvers registered for the destination member, in registration order
pub fn custom_resolvers() -> ValueAccessor {
    ValueAccessor::custom("custom-resolvers", |source, member, cx| {
        cx.request
            .settings
            .resolvers
            .iter()
            .find(|entry| entry.member == member.name)
            .map(|entry| entry.resolver.resolve(source))
    })
}

/// A readable source member with the same name
pub fn exact_name() -> ValueAccessor {
    ValueAccessor::new("exact-name", |source, member, cx| {
        let model = named_model(cx, &cx.request.source)?;
        let found = model
            .members
            .iter()
            .find(|m| m.name == member.name && m.is_readable())?;
        Some(TypedExpr {
            expr: Expr::Member {
                object: Box::new(source.clone()),
                name: found.name.clone(),
            },
            ty: found.ty.clone(),
        })
    })
}

/// Flattened nested path: `CustomerName` reads `.Customer.Name`
pub fn flattened_path() -> ValueAccessor {
    ValueAccessor::new("flattened-path", |source, member, cx| {
        resolve_flattened(cx.config, &cx.request.source, source, &member.name)
    })
}

/// Dictionary sources: read the member name as a key
pub fn dictionary_key() -> ValueAccessor {
    ValueAccessor::new("dictionary-key", |source, member, cx| {
        let model = named_model(cx, &cx.request.source)?;
        let TypeKind::Dictionary { value_type } = &model.kind else {
            return None;
        };
        Some(TypedExpr {
            expr: Expr::Key {
                object: Box::new(source.clone()),
                name: member.name.clone(),
                ty: value_type.clone(),
            },
            ty: value_type.clone(),
        })
    })
}

fn named_model<'a>(cx: &AccessorContext<'a>, ty: &TypeRef) -> Option<&'a TypeModel> {
    match ty.unwrap_optional() {
        TypeRef::Named(name) => cx.config.registry().get(name),
        _ => None,
    }
}

/// Walk nested source members whose concatenated names spell `target`
fn resolve_flattened(
    config: &AdapterConfig,
    source_ty: &TypeRef,
    source: &Expr,
    target: &str,
) -> Option<TypedExpr> {
    let TypeRef::Named(name) = source_ty.unwrap_optional() else {
        return None;
    };
    let model = config.registry().get(name)?;
    for member in &model.members {
        if !member.is_readable() {
            continue;
        }
        let read = Expr::Member {
            object: Box::new(source.clone()),
            name: member.name.clone(),
        };
        if member.name == target {
            return Some(TypedExpr {
                expr: read,
                ty: member.ty.clone(),
            });
        }
        if let Some(rest) = target.strip_prefix(member.name.as_str()) {
            // only split on a member-name boundary, e.g. Customer|Name
            if rest.chars().next().is_some_and(|c| c.is_uppercase()) {
                if let Some(found) = resolve_flattened(config, &member.ty, &read, rest) {
                    return Some(found);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterConfig;
    use crate::plan::MapKind;
    use crate::registry::{TypeModel, TypeRegistry};
    use crate::settings::{AdapterSettings, MemberResolver};
    use std::sync::Arc;

    fn create_test_config() -> AdapterConfig {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeModel::new("Customer")
                .member("Name", TypeRef::STR)
                .member("Address", TypeRef::named("Address")),
        );
        registry.register(TypeModel::new("Address").member("City", TypeRef::STR));
        registry.register(
            TypeModel::new("Order")
                .member("Customer", TypeRef::named("Customer"))
                .member("Total", TypeRef::FLOAT),
        );
        registry.register(TypeModel::dictionary("Bag", TypeRef::STR));
        AdapterConfig::new(registry)
    }

    fn create_test_request(source: TypeRef, settings: AdapterSettings) -> CompileRequest {
        CompileRequest {
            source,
            dest: TypeRef::named("Dto"),
            kind: MapKind::NewInstance,
            explicit: false,
            settings: Arc::new(settings),
        }
    }

    #[test]
    fn test_exact_name_resolves_member() {
        let config = create_test_config();
        let request = create_test_request(TypeRef::named("Order"), AdapterSettings::new());
        let cx = AccessorContext {
            config: &config,
            request: &request,
        };
        let member = MemberModel::new("Total", TypeRef::FLOAT);

        let resolved = exact_name().resolve(&Expr::Source, &member, &cx).unwrap();
        assert_eq!(resolved.ty, TypeRef::FLOAT);
        assert!(matches!(resolved.expr, Expr::Member { ref name, .. } if name == "Total"));
    }

    #[test]
    fn test_flattened_path_walks_nested_members() {
        let config = create_test_config();
        let request = create_test_request(TypeRef::named("Order"), AdapterSettings::new());
        let cx = AccessorContext {
            config: &config,
            request: &request,
        };
        let member = MemberModel::new("CustomerAddressCity", TypeRef::STR);

        let resolved = flattened_path()
            .resolve(&Expr::Source, &member, &cx)
            .unwrap();
        assert_eq!(resolved.ty, TypeRef::STR);
        // innermost read is City
        assert!(matches!(resolved.expr, Expr::Member { ref name, .. } if name == "City"));
    }

    #[test]
    fn test_flattened_path_requires_boundary() {
        let config = create_test_config();
        let request = create_test_request(TypeRef::named("Order"), AdapterSettings::new());
        let cx = AccessorContext {
            config: &config,
            request: &request,
        };
        let member = MemberModel::new("Customerish", TypeRef::STR);

        assert!(flattened_path()
            .resolve(&Expr::Source, &member, &cx)
            .is_none());
    }

    #[test]
    fn test_dictionary_key_applies_to_dictionary_sources_only() {
        let config = create_test_config();
        let member = MemberModel::new("Anything", TypeRef::STR);

        let request = create_test_request(TypeRef::named("Bag"), AdapterSettings::new());
        let cx = AccessorContext {
            config: &config,
            request: &request,
        };
        let resolved = dictionary_key()
            .resolve(&Expr::Source, &member, &cx)
            .unwrap();
        assert!(matches!(resolved.expr, Expr::Key { ref name, .. } if name == "Anything"));

        let request = create_test_request(TypeRef::named("Order"), AdapterSettings::new());
        let cx = AccessorContext {
            config: &config,
            request: &request,
        };
        assert!(dictionary_key()
            .resolve(&Expr::Source, &member, &cx)
            .is_none());
    }

    #[test]
    fn test_custom_resolver_wins_for_its_member() {
        let config = create_test_config();
        let settings = AdapterSettings::new().map_member(
            "Display",
            MemberResolver::source_member("Name", TypeRef::STR),
        );
        let request = create_test_request(TypeRef::named("Customer"), settings);
        let cx = AccessorContext {
            config: &config,
            request: &request,
        };

        let member = MemberModel::new("Display", TypeRef::STR);
        let resolved = custom_resolvers()
            .resolve(&Expr::Source, &member, &cx)
            .unwrap();
        assert!(matches!(resolved.expr, Expr::Member { ref name, .. } if name == "Name"));

        let other = MemberModel::new("Other", TypeRef::STR);
        assert!(custom_resolvers()
            .resolve(&Expr::Source, &other, &cx)
            .is_none());
    }
}
