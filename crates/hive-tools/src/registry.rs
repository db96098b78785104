use std::collections::HashMap;
use std::sync::Arc;

use hive_core::traits::Tool;
use tracing::warn;

/// Registry of available tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: impl Tool) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Look up declared tool names in order. Unknown names are dropped.
    pub fn resolve(&self, names: &[String]) -> Vec<Arc<dyn Tool>> {
        names
            .iter()
            .filter_map(|name| {
                let tool = self.get(name);
                if tool.is_none() {
                    warn!(tool = %name, "Unknown tool ignored");
                }
                tool
            })
            .collect()
    }

    /// Create a registry with all built-in tools registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(crate::builtin::file_reader::FileReaderTool);
        registry.register(crate::builtin::firecrawl::FirecrawlTool::from_env());
        registry.register(crate::builtin::serializer::SerializerTool);
        registry.register(crate::builtin::web_scraper::WebScraperTool);
        registry
    }
}
