//! Tool registry
//!
//! Name-keyed, insertion-ordered collection of tool definitions. Registering
//! a name that already exists replaces the earlier definition in place, so
//! listing order stays that of the first registration.

mod bridge;
mod lazy;
mod tool;

use std::collections::HashMap;
use std::time::Duration;

pub use bridge::run_to_completion;
pub use lazy::LazyRegistry;
pub use tool::{
    describe_from_doc, Annotation, Arguments, InputSchema, OutputSchema, ParamDecl, ParamType,
    PropertySchema, ToolDef, ToolFn, ToolOutput, ToolParam, ToolSchema,
};

use crate::error::{McpServerError, Result};
use crate::types::CallContext;

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable and return the name it was stored under
    pub fn register(
        &mut self,
        tool: ToolFn,
        name: Option<&str>,
        description: Option<&str>,
    ) -> String {
        self.insert(ToolDef::new(tool, name, description))
    }

    /// Store a prepared definition, replacing any entry with the same name
    pub fn insert(&mut self, def: ToolDef) -> String {
        let name = def.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                tracing::warn!(tool = %name, "replacing previously registered tool");
                self.tools[slot] = def;
            }
            None => {
                self.index.insert(name.clone(), self.tools.len());
                self.tools.push(def);
                tracing::debug!(tool = %name, "registered tool");
            }
        }
        name
    }

    /// Schemas of all tools in registration order
    pub fn list(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|def| def.schema().clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(ToolDef::name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name
    pub async fn execute_by_name(
        &self,
        name: &str,
        arguments: Arguments,
        ctx: &CallContext,
        timeout: Duration,
    ) -> Result<ToolOutput> {
        let def = self.lookup(name)?;
        Ok(def.execute(arguments, ctx, timeout).await)
    }

    /// Execute a tool by name from synchronous code
    pub fn execute_by_name_blocking(
        &self,
        name: &str,
        arguments: Arguments,
        ctx: &CallContext,
    ) -> Result<ToolOutput> {
        let def = self.lookup(name)?;
        Ok(def.execute_blocking(arguments, ctx))
    }

    fn lookup(&self, name: &str) -> Result<&ToolDef> {
        self.get(name)
            .ok_or_else(|| McpServerError::ToolNotFound(name.to_string()))
    }
}
