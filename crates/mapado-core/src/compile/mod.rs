//! Mapping-plan compilation engine
//!
//! This module implements the compile side of the engine: strategy selection,
//! class-model construction, the value-accessor chain, and expression
//! synthesis. Compilation is where every configuration problem surfaces;
//! plans that leave this module execute without consulting settings again.
//!
//! # Module Organization
//!
//! - [`selector`] - the `MapStrategy` contract and highest-score selection
//! - [`class_model`] - destination member resolution and validation
//! - [`accessors`] - the value-accessor strategy chain
//! - [`synthesis`] - pure-form / statement-form body synthesis
//! - [`strategies`] - built-in record, scalar, and any-type strategies
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

pub mod accessors;
pub mod class_model;
pub mod selector;
pub mod strategies;
pub(crate) mod synthesis;

pub use selector::MapStrategy;

use crate::plan::{MapKey, MapKind};
use crate::registry::TypeRef;
use crate::settings::AdapterSettings;
use std::sync::Arc;

/// One compilation request: the triple being compiled plus its resolved
/// settings. Created per compile and discarded once the plan is produced.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub source: TypeRef,
    pub dest: TypeRef,
    pub kind: MapKind,
    /// Whether an explicit pair configuration was registered
    pub explicit: bool,
    pub settings: Arc<AdapterSettings>,
}

impl CompileRequest {
    pub fn key(&self) -> MapKey {
        MapKey::new(self.source.clone(), self.dest.clone(), self.kind)
    }
}

/// Compilation context: the "currently compiling" stack that bounds nested
/// statement-form expansion, plus the queue of pairs that must be compiled
/// separately before the top-level compile is complete.
#[derive(Debug, Default)]
pub struct CompileContext {
    running: Vec<MapKey>,
    pending: Vec<MapKey>,
}

impl CompileContext {
    pub fn depth(&self) -> usize {
        self.running.len()
    }

    pub fn is_running(&self, key: &MapKey) -> bool {
        self.running.contains(key)
    }

    pub(crate) fn enter(&mut self, key: MapKey) {
        self.running.push(key);
    }

    pub(crate) fn exit(&mut self) {
        self.running.pop();
    }

    /// Queue a pair for separate compilation
    pub(crate) fn defer(&mut self, key: MapKey) {
        if !self.pending.contains(&key) {
            self.pending.push(key);
        }
    }

    pub(crate) fn take_pending(&mut self) -> Option<MapKey> {
        self.pending.pop()
    }

    pub(crate) fn absorb(&mut self, other: CompileContext) {
        for key in other.pending {
            self.defer(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_tracks_running_stack() {
        let key = MapKey::new(
            TypeRef::named("Poco"),
            TypeRef::named("Dto"),
            MapKind::NewInstance,
        );
        let mut ctx = CompileContext::default();
        assert_eq!(ctx.depth(), 0);

        ctx.enter(key.clone());
        assert_eq!(ctx.depth(), 1);
        assert!(ctx.is_running(&key));

        ctx.exit();
        assert_eq!(ctx.depth(), 0);
        assert!(!ctx.is_running(&key));
    }

    #[test]
    fn test_defer_deduplicates() {
        let key = MapKey::new(
            TypeRef::named("Poco"),
            TypeRef::named("Dto"),
            MapKind::NewInstance,
        );
        let mut ctx = CompileContext::default();
        ctx.defer(key.clone());
        ctx.defer(key.clone());

        assert_eq!(ctx.take_pending(), Some(key));
        assert_eq!(ctx.take_pending(), None);
    }
}
