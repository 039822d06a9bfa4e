//! Adapter configuration, compiled-function cache, and compile entry points
//!
//! An `AdapterConfig` owns everything a mapping needs: the type registry, the
//! strategy list, global and per-pair settings, rule-based settings blocks,
//! and the cache of compiled plans. Configurations are explicit values passed
//! to every entry point - there is no process-wide registry. A configuration
//! is its own cache-key namespace: compiled plans are immutable until
//! [`AdapterConfig::rebuild`] clears them.
//!
//! Compilation is where every configuration error surfaces. Nested pairs a
//! plan refers to by key are compiled before the top-level compile returns,
//! so executing a compiled mapping never triggers compilation of a pair that
//! could fail.
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::compile::selector::{select_strategy, MapStrategy};
use crate::compile::strategies::default_strategies;
use crate::compile::synthesis;
use crate::compile::{accessors, CompileContext, CompileRequest};
use crate::error::{Error, Result};
use crate::execute::Evaluator;
use crate::plan::{Expr, MapKey, MapKind, Plan};
use crate::registry::{TypeModel, TypeRef, TypeRegistry};
use crate::settings::{AdapterSettings, RulePredicate, SettingsRule};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Owner of mapping configuration and compiled plans
#[derive(Debug)]
pub struct AdapterConfig {
    registry: TypeRegistry,
    strategies: Vec<Arc<dyn MapStrategy>>,
    /// Global settings layered under every pair
    global: AdapterSettings,
    /// Engine defaults (the accessor chain) layered under everything
    defaults: AdapterSettings,
    rules: Vec<SettingsRule>,
    pairs: HashMap<(TypeRef, TypeRef), AdapterSettings>,
    require_explicit: bool,
    cache: RwLock<HashMap<MapKey, Arc<Plan>>>,
}

impl AdapterConfig {
    /// Create a configuration over a type registry with the built-in
    /// strategies and the default accessor chain
    pub fn new(registry: TypeRegistry) -> Self {
        let mut defaults = AdapterSettings::new();
        defaults.accessors = accessors::default_chain();
        Self {
            registry,
            strategies: default_strategies(),
            global: AdapterSettings::new(),
            defaults,
            rules: Vec::new(),
            pairs: HashMap::new(),
            require_explicit: false,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Register or replace a type model
    pub fn register_type(&mut self, model: TypeModel) -> &mut Self {
        self.registry.register(model);
        self
    }

    /// Register settings for one (source, destination) pair
    ///
    /// A registered pair counts as an explicit mapping for the
    /// explicit-mapping policy.
    pub fn register_pair(
        &mut self,
        source: TypeRef,
        dest: TypeRef,
        settings: AdapterSettings,
    ) -> &mut Self {
        self.pairs.insert((source, dest), settings);
        self
    }

    /// Replace the global settings layered under every pair
    pub fn set_global(&mut self, settings: AdapterSettings) -> &mut Self {
        self.global = settings;
        self
    }

    /// Add a rule-based settings block applied to every matching pair
    pub fn when(&mut self, predicate: RulePredicate, settings: AdapterSettings) -> &mut Self {
        self.rules.push(SettingsRule::new(predicate, settings));
        self
    }

    /// Register a mapping strategy; user strategies default to score 0 and
    /// outrank every built-in on concrete pairs
    pub fn add_strategy(&mut self, strategy: Arc<dyn MapStrategy>) -> &mut Self {
        self.strategies.push(strategy);
        self
    }

    /// Demand a registered pair configuration for strategies that enforce it
    pub fn require_explicit_mapping(&mut self, value: bool) -> &mut Self {
        self.require_explicit = value;
        self
    }

    pub(crate) fn requires_explicit_mapping(&self) -> bool {
        self.require_explicit
    }

    pub(crate) fn strategies(&self) -> &[Arc<dyn MapStrategy>] {
        &self.strategies
    }

    pub(crate) fn default_settings(&self) -> &AdapterSettings {
        &self.defaults
    }

    /// Drop every compiled plan; the next use recompiles against the current
    /// configuration
    pub fn rebuild(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Compile (or fetch) the mapping for two registered type names
    pub fn compile(&self, source: &str, dest: &str, kind: MapKind) -> Result<MappingFn<'_>> {
        self.compile_ref(TypeRef::named(source), TypeRef::named(dest), kind)
    }

    /// Compile (or fetch) the mapping for arbitrary type references
    pub fn compile_ref(
        &self,
        source: TypeRef,
        dest: TypeRef,
        kind: MapKind,
    ) -> Result<MappingFn<'_>> {
        let key = MapKey::new(source, dest, kind);
        let plan = self.plan_for(&key)?;
        Ok(MappingFn {
            config: self,
            key,
            plan,
        })
    }

    /// Map a value to a new destination instance, compiling on first use
    pub fn map(&self, source: &str, dest: &str, value: &Value) -> Result<Value> {
        self.compile(source, dest, MapKind::NewInstance)?.map(value)
    }

    /// Map a value onto an existing destination instance
    pub fn map_onto(
        &self,
        source: &str,
        dest: &str,
        value: &Value,
        existing: &Value,
    ) -> Result<Value> {
        self.compile(source, dest, MapKind::OntoExisting)?
            .map_onto(value, existing)
    }

    /// Fetch a cached plan, compiling it and everything it references on miss
    pub(crate) fn plan_for(&self, key: &MapKey) -> Result<Arc<Plan>> {
        if let Some(plan) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(plan.clone());
        }

        log::debug!("compiling mapping plan for {}", key);
        let mut ctx = CompileContext::default();
        let plan = Arc::new(self.compile_key(key, &mut ctx)?);
        // concurrent first-use compiles produce equivalent plans; last write
        // wins
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), plan.clone());

        while let Some(pending) = ctx.take_pending() {
            if self
                .cache
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(&pending)
            {
                continue;
            }
            let mut nested_ctx = CompileContext::default();
            let compiled = Arc::new(self.compile_key(&pending, &mut nested_ctx)?);
            self.cache
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(pending, compiled);
            ctx.absorb(nested_ctx);
        }

        Ok(plan)
    }

    /// Run a full compile for one key
    fn compile_key(&self, key: &MapKey, ctx: &mut CompileContext) -> Result<Plan> {
        self.verify_types(key)?;
        let (strategy, request) = self.prepare_request(key)?;
        ctx.enter(key.clone());
        let result = synthesis::expression_body(strategy.as_ref(), self, &request, ctx);
        ctx.exit();
        match result? {
            Some(plan) => Ok(plan),
            None => Err(Error::SynthesisLimit {
                source_type: key.source.to_string(),
                dest: key.dest.to_string(),
                kind: key.kind,
                message: "a second nested statement-form expansion is required within one compiled function"
                    .to_string(),
            }),
        }
    }

    /// Build the nested mapping expression for a member pair
    ///
    /// Pairs already being compiled, and pairs whose body cannot be inlined
    /// at this depth, become an invocation of their own cache entry; the pair
    /// is queued so it is compiled before the top-level compile returns.
    pub(crate) fn inline_map_expr(
        &self,
        source: &TypeRef,
        dest: &TypeRef,
        kind: MapKind,
        ctx: &mut CompileContext,
        arg: Expr,
    ) -> Result<Expr> {
        let key = MapKey::new(source.clone(), dest.clone(), kind);

        if ctx.is_running(&key) {
            if kind == MapKind::Projection {
                return Err(Error::SynthesisLimit {
                    source_type: key.source.to_string(),
                    dest: key.dest.to_string(),
                    kind,
                    message: "projection does not support circular references".to_string(),
                });
            }
            ctx.defer(key.clone());
            return Ok(Expr::Invoke {
                key,
                source: Box::new(arg),
            });
        }

        self.verify_types(&key)?;
        let (strategy, request) = self.prepare_request(&key)?;
        ctx.enter(key.clone());
        let result = synthesis::expression_body(strategy.as_ref(), self, &request, ctx);
        ctx.exit();

        match result? {
            Some(Plan::Inline(expr)) => Ok(expr.apply(&arg)),
            _ => {
                ctx.defer(key.clone());
                Ok(Expr::Invoke {
                    key,
                    source: Box::new(arg),
                })
            }
        }
    }

    /// Resolve effective settings and select the strategy for a key
    fn prepare_request(&self, key: &MapKey) -> Result<(Arc<dyn MapStrategy>, CompileRequest)> {
        let (settings, explicit) = self.effective_settings(&key.source, &key.dest, key.kind);
        let strategy =
            select_strategy(&self.strategies, &key.source, &key.dest, key.kind, self)?.clone();
        let request = CompileRequest {
            source: key.source.clone(),
            dest: key.dest.clone(),
            kind: key.kind,
            explicit,
            settings: Arc::new(settings),
        };
        Ok((strategy, request))
    }

    /// Layer pair settings, matching rules, global settings, and engine
    /// defaults into one effective value
    pub(crate) fn effective_settings(
        &self,
        source: &TypeRef,
        dest: &TypeRef,
        kind: MapKind,
    ) -> (AdapterSettings, bool) {
        let mut settings = AdapterSettings::new();
        let explicit = match self.pairs.get(&(source.clone(), dest.clone())) {
            Some(pair) => {
                settings.apply(pair);
                true
            }
            None => false,
        };
        for rule in &self.rules {
            if rule.predicate.matches(source, dest, kind) {
                settings.apply(&rule.settings);
            }
        }
        settings.apply(&self.global);
        settings.apply(&self.defaults);
        (settings, explicit)
    }

    /// Reject keys naming unregistered types before synthesis starts
    fn verify_types(&self, key: &MapKey) -> Result<()> {
        for ty in [&key.source, &key.dest] {
            if let TypeRef::Named(name) = ty.unwrap_optional() {
                self.registry.expect(name)?;
            }
        }
        Ok(())
    }
}

/// A compiled, invocable mapping
///
/// Handles borrow their configuration; the underlying plan stays valid even
/// across [`AdapterConfig::rebuild`] because the handle pins it.
pub struct MappingFn<'a> {
    config: &'a AdapterConfig,
    key: MapKey,
    plan: Arc<Plan>,
}

impl MappingFn<'_> {
    pub fn key(&self) -> &MapKey {
        &self.key
    }

    /// The compiled plan; `Plan::Inline` bodies are usable as pure
    /// expressions inside larger pipelines
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Map a source value to a new destination instance
    pub fn map(&self, source: &Value) -> Result<Value> {
        Evaluator::new(self.config).run(&self.plan, source, None)
    }

    /// Map a source value onto an existing destination instance
    ///
    /// Meaningful for plans compiled with [`MapKind::OntoExisting`]; other
    /// plans ignore the existing instance.
    pub fn map_onto(&self, source: &Value, existing: &Value) -> Result<Value> {
        Evaluator::new(self.config).run(&self.plan, source, Some(existing))
    }
}

impl fmt::Debug for MappingFn<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingFn").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeModel;

    fn create_test_config() -> AdapterConfig {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeModel::new("Poco")
                .member("Id", TypeRef::INT)
                .member("Name", TypeRef::STR),
        );
        registry.register(
            TypeModel::new("Dto")
                .member("Id", TypeRef::INT)
                .member("Name", TypeRef::STR),
        );
        AdapterConfig::new(registry)
    }

    #[test]
    fn test_cache_returns_same_plan() {
        let config = create_test_config();
        let first = config.compile("Poco", "Dto", MapKind::NewInstance).unwrap();
        let second = config.compile("Poco", "Dto", MapKind::NewInstance).unwrap();
        assert!(Arc::ptr_eq(&first.plan, &second.plan));
    }

    #[test]
    fn test_rebuild_clears_cache() {
        let config = create_test_config();
        let first = config.compile("Poco", "Dto", MapKind::NewInstance).unwrap();
        config.rebuild();
        let second = config.compile("Poco", "Dto", MapKind::NewInstance).unwrap();
        assert!(!Arc::ptr_eq(&first.plan, &second.plan));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let config = create_test_config();
        let err = config
            .compile("Poco", "Missing", MapKind::NewInstance)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownType { .. }));
    }

    #[test]
    fn test_kinds_cache_separately() {
        let config = create_test_config();
        let new_instance = config.compile("Poco", "Dto", MapKind::NewInstance).unwrap();
        let onto = config.compile("Poco", "Dto", MapKind::OntoExisting).unwrap();
        assert!(!Arc::ptr_eq(&new_instance.plan, &onto.plan));
    }

    #[test]
    fn test_config_and_plans_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AdapterConfig>();
        assert_send_sync::<Arc<Plan>>();
    }

    #[test]
    fn test_explicit_mapping_policy() {
        let mut config = create_test_config();
        config.require_explicit_mapping(true);
        let err = config
            .compile("Poco", "Dto", MapKind::NewInstance)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));

        config.register_pair(
            TypeRef::named("Poco"),
            TypeRef::named("Dto"),
            AdapterSettings::new(),
        );
        assert!(config.compile("Poco", "Dto", MapKind::NewInstance).is_ok());
    }
}
