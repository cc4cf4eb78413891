//! Process-wide registry populated on first use

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::ToolRegistry;

type Populate = dyn Fn() -> ToolRegistry + Send + Sync;

/// Registry that is filled exactly once, by whichever request touches it first
///
/// Concurrent first callers wait on the cell while a single thread runs the
/// populate function, so no caller ever sees a partially built registry.
pub struct LazyRegistry {
    cell: OnceCell<Arc<ToolRegistry>>,
    populate: Box<Populate>,
}

impl LazyRegistry {
    pub fn new<F>(populate: F) -> Self
    where
        F: Fn() -> ToolRegistry + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            populate: Box::new(populate),
        }
    }

    /// Wrap a registry that is already built
    pub fn ready(registry: ToolRegistry) -> Self {
        let lazy = Self::new(ToolRegistry::new);
        // a fresh cell is always empty
        let _ = lazy.cell.set(Arc::new(registry));
        lazy
    }

    pub fn get(&self) -> Arc<ToolRegistry> {
        Arc::clone(self.cell.get_or_init(|| {
            let registry = (self.populate)();
            tracing::info!(tools = registry.len(), "tool registry populated");
            Arc::new(registry)
        }))
    }

    pub fn is_populated(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for LazyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRegistry")
            .field("populated", &self.is_populated())
            .finish()
    }
}
