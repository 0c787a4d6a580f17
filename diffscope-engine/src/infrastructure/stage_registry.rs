//! Stage registry for managing pipeline stage implementations

use std::collections::HashMap;
use std::sync::Arc;

use diffscope_core::domain::stage::{Stage, StageName};

/// Registry mapping stage names to their implementations
///
/// The engine validates at construction that every stage the transition
/// table can route to is registered, so lookups never miss at scan time.
pub struct StageRegistry {
    stages: HashMap<StageName, Arc<dyn Stage>>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self {
            stages: HashMap::new(),
        }
    }

    /// Register a stage under its own name.
    pub fn register(&mut self, stage: Arc<dyn Stage>) {
        self.stages.insert(stage.name(), stage);
    }

    /// Get a stage by name
    pub fn get(&self, name: StageName) -> Option<Arc<dyn Stage>> {
        self.stages.get(&name).cloned()
    }

    /// Get all registered stage names
    pub fn registered(&self) -> Vec<StageName> {
        self.stages.keys().copied().collect()
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
