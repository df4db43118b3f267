//! Tool declarations and the name → handler registry.

use crate::error::ToolError;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

/// Declaration of a callable tool, as sent to the completion API.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON-schema `properties` object, keyed by parameter name
    pub properties: Map<String, Value>,
    /// Names of required parameters, in declaration order
    pub required: Vec<String>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }

    /// Declare a required parameter.
    pub fn arg_required(mut self, name: &str, ty: &str, description: &str) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": ty, "description": description }),
        );
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
        self
    }

    /// Declare an optional parameter.
    pub fn arg_optional(mut self, name: &str, ty: &str, description: &str) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": ty, "description": description }),
        );
        self.required.retain(|r| r != name);
        self
    }

    /// The JSON-schema object describing the parameters.
    pub fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }

    /// Function-tool declaration in the chat-completions format.
    pub fn to_function_declaration(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters(),
            }
        })
    }
}

/// An asynchronous tool implementation.
///
/// Handlers are adapters to external collaborators; their errors are
/// opaque to the runtime.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Value) -> std::result::Result<Value, ToolError>;
}

/// A [`ToolHandler`] backed by an async closure. See [`handler_fn`].
pub struct FnHandler<F>(F);

/// Wrap an async closure as a tool handler.
///
/// ```ignore
/// runtime.register("web_search", handler_fn(|args| async move {
///     Ok(json!(format!("results for {}", args["query"])))
/// }));
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Value, ToolError>> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Value, ToolError>> + Send + 'static,
{
    async fn call(&self, args: Value) -> std::result::Result<Value, ToolError> {
        (self.0)(args).await
    }
}

/// Name → handler lookup for one agent runtime.
///
/// Registration takes `&self`, so handlers can be bound late (for example
/// a delivery handler chosen after configuration is loaded).
#[derive(Default)]
pub struct ToolRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn ToolHandler>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Re-registering a name replaces the handler.
    pub fn register<H: ToolHandler + 'static>(&self, name: impl Into<String>, handler: H) {
        self.register_shared(name, Arc::new(handler));
    }

    /// Register an already shared handler.
    pub fn register_shared(&self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        let mut map = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.insert(name.into(), handler);
    }

    /// Look up a handler by name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let map = self
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build an opaque tool error from a message.
pub fn tool_error(message: impl Into<String>) -> ToolError {
    let message: String = message.into();
    message.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> impl ToolHandler {
        handler_fn(|args: Value| async move { Ok(args) })
    }

    #[test]
    fn test_spec_parameters() {
        let spec = ToolSpec::new("send_email", "Send an email")
            .arg_required("subject", "string", "The email subject line")
            .arg_required("htmlBody", "string", "The HTML content of the email")
            .arg_optional("cc", "string", "Copy recipient");

        let params = spec.parameters();
        assert_eq!(params["type"], "object");
        assert_eq!(params["required"], json!(["subject", "htmlBody"]));
        assert_eq!(params["properties"]["cc"]["type"], "string");
    }

    #[test]
    fn test_optional_overrides_required() {
        let spec = ToolSpec::new("t", "d")
            .arg_required("q", "string", "query")
            .arg_optional("q", "string", "query");
        assert!(spec.required.is_empty());
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register("echo", echo());
        let handler = registry.resolve("echo").expect("registered");
        let out = handler.call(json!({"q": 1})).await.unwrap();
        assert_eq!(out, json!({"q": 1}));
        assert!(registry.resolve("missing").is_none());
    }

    #[tokio::test]
    async fn test_reregister_replaces() {
        let registry = ToolRegistry::new();
        registry.register("tool", echo());
        registry.register(
            "tool",
            handler_fn(|_args| async move { Ok(json!("replaced")) }),
        );

        assert_eq!(registry.len(), 1);
        let out = registry.resolve("tool").unwrap().call(json!({})).await.unwrap();
        assert_eq!(out, json!("replaced"));
    }

    #[tokio::test]
    async fn test_handler_errors_are_opaque() {
        let registry = ToolRegistry::new();
        registry.register(
            "boom",
            handler_fn(|_args| async move { Err(tool_error("provider down")) }),
        );

        let err = registry.resolve("boom").unwrap().call(json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "provider down");
    }

    #[test]
    fn test_names_sorted() {
        let registry = ToolRegistry::new();
        registry.register("web_search", echo());
        registry.register("send_email", echo());
        assert_eq!(registry.names(), vec!["send_email", "web_search"]);
        assert!(registry.contains("web_search"));
    }
}
