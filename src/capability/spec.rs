//! Capability specifications
//!
//! A capability is a named, described unit of external functionality that a
//! reasoning provider may ask to run. Only the invocation contract lives here:
//! arguments arrive as a JSON string, output leaves as a string.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::core::{CohortError, Result};

/// One typed argument of a capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Argument name
    pub name: String,
    /// JSON-schema type (string, integer, boolean, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// What the argument means
    pub description: String,
}

impl FieldSpec {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            description: description.into(),
        }
    }

    /// Shorthand for a string-typed field
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, "string", description)
    }

    pub fn builder() -> FieldBuilder {
        FieldBuilder::default()
    }
}

/// Builder for `FieldSpec` that insists on every part being present
#[derive(Debug, Default)]
pub struct FieldBuilder {
    name: Option<String>,
    kind: Option<String>,
    description: Option<String>,
}

impl FieldBuilder {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn build(self) -> Result<FieldSpec> {
        match (self.name, self.kind, self.description) {
            (Some(name), Some(kind), Some(description)) => Ok(FieldSpec {
                name,
                kind,
                description,
            }),
            _ => Err(CohortError::invalid(
                "a field needs a name, a type and a description",
            )),
        }
    }
}

/// Executes a capability
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    /// Run with JSON-encoded arguments. Each handler validates its own input.
    async fn invoke(&self, arguments: &str) -> Result<String>;
}

/// Handler backed by a synchronous closure
pub struct FnHandler<F>(F);

impl<F> FnHandler<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> CapabilityHandler for FnHandler<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    async fn invoke(&self, arguments: &str) -> Result<String> {
        (self.0)(arguments)
    }
}

/// A registered, invocable capability
#[derive(Clone)]
pub struct CapabilitySpec {
    id: String,
    display_name: String,
    description: String,
    fields: Vec<FieldSpec>,
    handler: Arc<dyn CapabilityHandler>,
}

impl fmt::Debug for CapabilitySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitySpec")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Provider-neutral function declaration derived from a `CapabilitySpec`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDeclaration {
    /// Capability id, before any provider-specific escaping
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

impl CapabilitySpec {
    pub fn builder() -> CapabilityBuilder {
        CapabilityBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Run the capability
    pub async fn invoke(&self, arguments: &str) -> Result<String> {
        self.handler.invoke(arguments).await
    }

    /// JSON schema of the arguments, properties in field order.
    ///
    /// A repeated field name keeps its first definition.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            if properties.contains_key(&field.name) {
                continue;
            }
            properties.insert(
                field.name.clone(),
                json!({ "type": field.kind, "description": field.description }),
            );
        }
        let required: Vec<Value> = properties.keys().cloned().map(Value::String).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn declaration(&self) -> CapabilityDeclaration {
        CapabilityDeclaration {
            name: self.id.clone(),
            description: self.description.clone(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Builder for `CapabilitySpec`
#[derive(Default)]
pub struct CapabilityBuilder {
    id: Option<String>,
    display_name: Option<String>,
    description: Option<String>,
    fields: Vec<FieldSpec>,
    handler: Option<Arc<dyn CapabilityHandler>>,
}

impl CapabilityBuilder {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn CapabilityHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Use a synchronous closure as the handler
    pub fn with_fn<F>(self, f: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        self.with_handler(Arc::new(FnHandler::new(f)))
    }

    pub fn build(self) -> Result<CapabilitySpec> {
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CohortError::invalid("a capability needs a non-empty id"))?;

        match (self.display_name, self.description, self.handler) {
            (Some(display_name), Some(description), Some(handler)) => Ok(CapabilitySpec {
                id,
                display_name,
                description,
                fields: self.fields,
                handler,
            }),
            _ => Err(CohortError::invalid(format!(
                "capability '{}' needs a name, a description and a handler",
                id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_spec(fields: Vec<FieldSpec>) -> CapabilitySpec {
        let mut builder = CapabilitySpec::builder()
            .with_id("fetch")
            .with_name("Fetch")
            .with_description("Fetch a page")
            .with_fn(|args| Ok(args.to_string()));
        for field in fields {
            builder = builder.with_field(field);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_single_field_declaration() {
        let spec = fetch_spec(vec![FieldSpec::string("url", "Page to fetch")]);
        let decl = spec.declaration();
        let properties = decl.parameters["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 1);
        assert_eq!(properties.keys().next().unwrap(), "url");
        assert_eq!(properties["url"]["type"], "string");
        assert_eq!(decl.parameters["required"], json!(["url"]));
    }

    #[test]
    fn test_field_order_and_uniqueness() {
        let spec = fetch_spec(vec![
            FieldSpec::string("url", "first"),
            FieldSpec::new("depth", "integer", "crawl depth"),
            FieldSpec::string("url", "duplicate"),
            FieldSpec::new("follow", "boolean", "follow links"),
        ]);
        let schema = spec.parameters_schema();
        let keys: Vec<&String> = schema["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["url", "depth", "follow"]);
        assert_eq!(schema["properties"]["url"]["description"], "first");
    }

    #[test]
    fn test_builder_requires_all_parts() {
        let missing_handler = CapabilitySpec::builder()
            .with_id("x")
            .with_name("X")
            .with_description("does x")
            .build();
        assert!(matches!(missing_handler, Err(CohortError::InvalidCapability(_))));

        let missing_type = FieldSpec::builder().with_name("a").with_description("b").build();
        assert!(missing_type.is_err());

        let field = FieldSpec::builder()
            .with_name("task")
            .with_type("string")
            .with_description("the task")
            .build()
            .unwrap();
        assert_eq!(field, FieldSpec::string("task", "the task"));
    }

    #[tokio::test]
    async fn test_invoke_runs_handler() {
        let spec = fetch_spec(vec![]);
        let out = spec.invoke(r#"{"url":"x"}"#).await.unwrap();
        assert_eq!(out, r#"{"url":"x"}"#);
    }
}
