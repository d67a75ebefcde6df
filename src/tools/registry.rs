use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use super::ToolResolver;
use crate::types::tool::{ToolDefinition, ToolOutcome};

type Handler =
    Arc<dyn Fn(Map<String, Value>) -> BoxFuture<'static, anyhow::Result<ToolOutcome>> + Send + Sync>;

/// Name-keyed async tool handlers.
///
/// Registration order is kept so [`definitions`](Self::definitions) is stable.
/// Registering a name twice replaces the earlier handler.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    handlers: HashMap<String, Handler>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&mut self, definition: ToolDefinition, handler: F) -> &mut Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolOutcome>> + Send + 'static,
    {
        let name = definition.name.clone();
        match self.definitions.iter_mut().find(|d| d.name == name) {
            Some(existing) => *existing = definition,
            None => self.definitions.push(definition),
        }
        self.handlers
            .insert(name, Arc::new(move |params| handler(params).boxed()));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions to advertise to the provider, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field(
                "tools",
                &self.definitions.iter().map(|d| &d.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[async_trait]
impl ToolResolver for ToolRegistry {
    async fn on_tool_call(
        &self,
        name: &str,
        parameters: &Map<String, Value>,
    ) -> anyhow::Result<Option<ToolOutcome>> {
        let Some(handler) = self.handlers.get(name).cloned() else {
            return Ok(None);
        };
        handler(parameters.clone()).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolDefinition::new("echo", "Echo back"), |params| async move {
                let text = params
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                anyhow::Ok(ToolOutcome::success(text))
            })
            .register(ToolDefinition::new("broken", "Always fails"), |_| async {
                Err::<ToolOutcome, _>(anyhow::anyhow!("disk on fire"))
            });
        registry
    }

    #[tokio::test]
    async fn test_registered_tool_is_resolved() {
        let registry = registry();
        let mut params = Map::new();
        params.insert("text".into(), json!("hi"));
        let outcome = registry.on_tool_call("echo", &params).await.unwrap();
        assert_eq!(outcome, Some(ToolOutcome::success("hi")));
    }

    #[tokio::test]
    async fn test_unknown_tool_resolves_to_none() {
        let registry = registry();
        assert_eq!(registry.on_tool_call("nope", &Map::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_handler_error_is_passed_through() {
        let err = registry()
            .on_tool_call("broken", &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "disk on fire");
    }

    #[test]
    fn test_definitions_keep_registration_order_and_replace_duplicates() {
        let mut registry = registry();
        registry.register(
            ToolDefinition::new("echo", "Echo, version two"),
            |_| async { anyhow::Ok(ToolOutcome::success("")) },
        );
        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[0].description.as_deref(), Some("Echo, version two"));
        assert!(registry.contains("broken"));
    }
}
