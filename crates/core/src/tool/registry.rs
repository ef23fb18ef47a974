use std::collections::BTreeMap;
use std::sync::Arc;

use tertulia_model::{ModelTool, ToolCallRequest, ToolCallResult};

use super::object::{ToolObject, ToolObjectImpl};
use super::{Error, Tool};

/// A set of uniquely named tools.
///
/// A registry is built once and then shared immutably, usually behind an
/// `Arc`, by every agent that offers its tools to the model.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolObject>>,
}

impl ToolRegistry {
    /// Registers a tool.
    ///
    /// Fails if a tool with the same name is already registered.
    pub fn add_tool<T: Tool>(&mut self, tool: T) -> Result<(), Error> {
        let name = tool.name().to_owned();
        if self.tools.contains_key(&name) {
            return Err(Error::already_registered().with_reason(name));
        }
        debug!("registered tool: {name}");
        self.tools.insert(name, Arc::new(ToolObjectImpl(tool)));
        Ok(())
    }

    /// Registers a tool, consuming and returning the registry.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Result<Self, Error> {
        self.add_tool(tool)?;
        Ok(self)
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the definitions sent to the model, ordered by name.
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .values()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }

    /// Runs the requested tool and renders its outcome for the model.
    ///
    /// The returned future never fails. Unknown tools, invalid arguments and
    /// execution errors all become an `Error: ...` text, which is what the
    /// model sees as the tool result.
    pub fn execute(
        &self,
        req: ToolCallRequest,
    ) -> impl Future<Output = ToolCallResult> + Send + 'static {
        let tool = self.tools.get(&req.name).map(Arc::clone);
        let ToolCallRequest {
            id,
            name,
            arguments,
        } = req;
        trace!("executing a tool ({id}) with args: {arguments:?}");

        async move {
            let result = match tool {
                Some(tool) => tool.execute(arguments).await,
                None => {
                    warn!("tool not found: {name}");
                    Err(Error::not_found().with_reason(format!(
                        "no tool named `{name}` is available"
                    )))
                }
            };
            let content = match result {
                Ok(content) => content,
                Err(err) => {
                    warn!("tool `{name}` failed: {err}");
                    format!("Error: {}", err.reason())
                }
            };
            ToolCallResult { id, name, content }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;
    use std::sync::LazyLock;

    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;
    use crate::tool::{ToolResult, parameter_schema_for};

    #[derive(Deserialize, schemars::JsonSchema)]
    struct Input {
        text: String,
    }

    static INPUT_SCHEMA: LazyLock<Value> =
        LazyLock::new(parameter_schema_for::<Input>);
    static EMPTY_SCHEMA: &Value = &Value::Null;

    struct Shout;

    impl Tool for Shout {
        type Input = Input;

        fn name(&self) -> &str {
            "shout"
        }

        fn description(&self) -> &str {
            "Upper-cases the text."
        }

        fn parameter_schema(&self) -> &Value {
            &INPUT_SCHEMA
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(input.text.to_uppercase()))
        }
    }

    struct Broken;

    impl Tool for Broken {
        type Input = Value;

        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always fails."
        }

        fn parameter_schema(&self) -> &Value {
            EMPTY_SCHEMA
        }

        fn execute(
            &self,
            _input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Err(Error::execution_error().with_reason("HTTP 401")))
        }
    }

    fn request(name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: "tool:1".to_owned(),
            name: name.to_owned(),
            arguments,
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = ToolRegistry::default();
        registry.add_tool(Shout).unwrap();
        let err = registry.add_tool(Shout).unwrap_err();
        assert_eq!(err.kind(), crate::tool::ErrorKind::AlreadyRegistered);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_definitions_sorted_by_name() {
        let registry = ToolRegistry::default()
            .with_tool(Shout)
            .and_then(|r| r.with_tool(Broken))
            .unwrap();
        let names: Vec<_> =
            registry.definitions().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["broken", "shout"]);
    }

    #[tokio::test]
    async fn test_execute_outcomes() {
        let registry = ToolRegistry::default()
            .with_tool(Shout)
            .and_then(|r| r.with_tool(Broken))
            .unwrap();

        let result = registry
            .execute(request("shout", json!({ "text": "hola" })))
            .await;
        assert_eq!(result.id, "tool:1");
        assert_eq!(result.content, "HOLA");

        let result = registry.execute(request("shout", json!({ "n": 1 }))).await;
        assert!(result.content.starts_with("Error: "));

        let result = registry.execute(request("broken", json!({}))).await;
        assert_eq!(result.content, "Error: HTTP 401");

        let result = registry.execute(request("missing", json!({}))).await;
        assert_eq!(result.content, "Error: no tool named `missing` is available");
    }
}
