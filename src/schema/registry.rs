//! Holder for the current schema snapshot.

use std::sync::{Arc, PoisonError, RwLock};

use super::SchemaSnapshot;

/// The current schema, replaceable while queries run.
///
/// Readers get an `Arc` to the snapshot that was current when they asked;
/// a later [`SchemaRegistry::replace`] does not affect them.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    current: RwLock<Arc<SchemaSnapshot>>,
}

impl SchemaRegistry {
    pub fn new(snapshot: SchemaSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, snapshot: SchemaSnapshot) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(snapshot);
        tracing::debug!(aspects = current.len(), "schema snapshot replaced");
    }
}
