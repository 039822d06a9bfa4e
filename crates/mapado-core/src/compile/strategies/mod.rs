//! Built-in mapping strategies
//!
//! All built-ins carry negative scores so user-registered strategies
//! (default score 0) win whenever both sides are concrete types.
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

mod any;
mod record;
mod scalar;

pub use any::AnyAdapter;
pub use record::RecordAdapter;
pub use scalar::ScalarAdapter;

use crate::compile::selector::MapStrategy;
use std::sync::Arc;

/// The default strategy set, in registration order
pub fn default_strategies() -> Vec<Arc<dyn MapStrategy>> {
    vec![
        Arc::new(ScalarAdapter),
        Arc::new(RecordAdapter),
        Arc::new(AnyAdapter),
    ]
}
