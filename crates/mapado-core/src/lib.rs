//! Mapado Core - adapter engine for declarative record mapping
//!
//! This crate compiles a declarative description of how to transform values
//! of one record type into another into a directly invocable mapping
//! function, so applications converting between layered representations
//! (persistence records, transport records) never hand-write per-field copy
//! code.
//!
//! # Main Components
//!
//! - **Error Handling**: compile-time-first error taxonomy using `thiserror`
//!   and `anyhow`
//! - **Type Registry**: explicit member/constructor descriptors for every
//!   mappable type, loadable from JSON
//! - **Settings**: per-pair configuration with rule-based blocks layered
//!   under it
//! - **Compile Engine**: strategy selection, class-model resolution, and
//!   pure-form / statement-form synthesis into cached plans
//! - **Evaluation**: tree-walking execution with identity-preserving,
//!   cycle-safe graph traversal
//!
//! # Example
//!
//! ```no_run
//! use mapado_core::{AdapterConfig, MapKind, TypeModel, TypeRef, TypeRegistry, Value};
//!
//! fn example() -> mapado_core::Result<()> {
//!     let mut registry = TypeRegistry::new();
//!     registry.register(TypeModel::new("Poco").member("Name", TypeRef::STR));
//!     registry.register(TypeModel::new("Dto").member("Name", TypeRef::STR));
//!
//!     let config = AdapterConfig::new(registry);
//!     let mapping = config.compile("Poco", "Dto", MapKind::NewInstance)?;
//!
//!     let poco = Value::record("Poco", [("Name", Value::Str("TestName".into()))]);
//!     let dto = mapping.map(&poco)?;
//!     assert_eq!(dto.get_member("Name"), Some(Value::Str("TestName".into())));
//!     Ok(())
//! }
//! ```

pub mod compile;
pub mod config;
pub mod error;
pub mod plan;
pub mod registry;
pub mod settings;
pub mod value;

mod execute;
mod scope;

// Re-export main types for convenience
pub use compile::{CompileContext, CompileRequest, MapStrategy};
pub use config::{AdapterConfig, MappingFn};
pub use error::{Error, Result};
pub use plan::{Constant, Expr, MapKey, MapKind, Plan, TypedExpr};
pub use registry::{
    AccessModifier, ConstructorModel, MemberModel, MemberOrigin, ScalarKind, TypeKind, TypeModel,
    TypeRef, TypeRegistry,
};
pub use settings::{
    AdapterSettings, AfterHook, ConstructWith, MapCondition, MemberResolver, MemberSide,
    RulePredicate, SettingsRule, ShouldMapPredicate, ValueTransform,
};
pub use value::{Record, RecordId, RecordRef, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_creation() {
        let err = Error::configuration("test error");
        assert!(err.to_string().contains("test error"));
    }
}
