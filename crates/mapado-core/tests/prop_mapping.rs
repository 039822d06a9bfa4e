//! Property-based tests for the mapping engine
//!
//! These tests verify invariants that should hold for all valid inputs:
//! mapped members always carry the source value, unmapped members always end
//! at their type's default, and recompilation never changes observable
//! behavior.

use mapado_core::{
    AdapterConfig, AdapterSettings, MapKind, RulePredicate, TypeModel, TypeRef, TypeRegistry, Value,
};
use proptest::prelude::*;

fn create_test_config() -> AdapterConfig {
    let mut registry = TypeRegistry::new();
    registry.register(
        TypeModel::new("SimplePoco")
            .member("Id", TypeRef::STR)
            .member("Name", TypeRef::STR)
            .member("Count", TypeRef::INT)
            .member("Ratio", TypeRef::FLOAT)
            .member("Active", TypeRef::BOOL),
    );
    registry.register(
        TypeModel::new("SimpleDto")
            .member("Id", TypeRef::STR)
            .member("Name", TypeRef::STR)
            .member("Count", TypeRef::INT)
            .member("Ratio", TypeRef::FLOAT)
            .member("Active", TypeRef::BOOL)
            .member("UnmappedMember", TypeRef::STR)
            .member("UnmappedMember2", TypeRef::INT),
    );
    AdapterConfig::new(registry)
}

fn poco_strategy() -> impl Strategy<Value = Value> {
    (
        "[a-zA-Z0-9-]{0,40}",      // id
        "[a-zA-Z0-9 .,!?]{0,60}",  // name
        any::<i32>(),              // count
        -1.0e6f64..1.0e6,          // ratio
        any::<bool>(),             // active
    )
        .prop_map(|(id, name, count, ratio, active)| {
            Value::record(
                "SimplePoco",
                [
                    ("Id", Value::Str(id)),
                    ("Name", Value::Str(name)),
                    ("Count", Value::Int(i64::from(count))),
                    ("Ratio", Value::Float(ratio)),
                    ("Active", Value::Bool(active)),
                ],
            )
        })
}

proptest! {
    #[test]
    fn prop_mapped_members_copy_and_unmapped_members_default(poco in poco_strategy()) {
        let config = create_test_config();
        let dto = config.map("SimplePoco", "SimpleDto", &poco).unwrap();

        for member in ["Id", "Name", "Count", "Ratio", "Active"] {
            prop_assert_eq!(dto.get_member(member), poco.get_member(member));
        }
        prop_assert_eq!(dto.get_member("UnmappedMember"), Some(Value::Null));
        prop_assert_eq!(dto.get_member("UnmappedMember2"), Some(Value::Int(0)));
    }

    #[test]
    fn prop_recompilation_is_observationally_identical(poco in poco_strategy()) {
        let config = create_test_config();
        let first = config.map("SimplePoco", "SimpleDto", &poco).unwrap();
        config.rebuild();
        let second = config.map("SimplePoco", "SimpleDto", &poco).unwrap();

        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_rule_based_ignore_only_affects_named_member(poco in poco_strategy()) {
        let mut config = create_test_config();
        config.when(
            RulePredicate::new(|source, dest, _| source == dest),
            AdapterSettings::new().ignore("Id"),
        );

        let dto = config.map("SimplePoco", "SimplePoco", &poco).unwrap();
        prop_assert_eq!(dto.get_member("Id"), Some(Value::Null));
        for member in ["Name", "Count", "Ratio", "Active"] {
            prop_assert_eq!(dto.get_member(member), poco.get_member(member));
        }
    }

    #[test]
    fn prop_projection_and_new_instance_agree(poco in poco_strategy()) {
        let config = create_test_config();
        let projected = config
            .compile("SimplePoco", "SimpleDto", MapKind::Projection)
            .unwrap()
            .map(&poco)
            .unwrap();
        let mapped = config.map("SimplePoco", "SimpleDto", &poco).unwrap();

        prop_assert_eq!(projected, mapped);
    }

    #[test]
    fn prop_mapping_never_mutates_the_source(poco in poco_strategy()) {
        let config = create_test_config();
        let snapshot = Value::from_json("SimplePoco", &poco.to_json());
        config.map("SimplePoco", "SimpleDto", &poco).unwrap();

        prop_assert_eq!(poco, snapshot);
    }
}
