//! Tool descriptors and their wire-format declarations.
//!
//! Host tools describe their parameters with a JSON-schema-like document.
//! [`format_tool`] turns a [`ToolDescriptor`] into the
//! [`ChatCompletionTool`] the chat-completion API expects, patching the
//! `required` field into a shape the provider accepts.

use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::ToolError;

/// Renders host-specific schema leaves (selectors and the like) into JSON
/// schema. Returning `None` keeps the leaf unchanged.
pub type SchemaSerializer = dyn Fn(&Value) -> Option<Value> + Send + Sync;

/// A tool exposed to the model by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Parameter schema. `null` or `{}` means the tool takes no arguments.
    #[serde(default)]
    pub parameters: Value,
}

impl ToolDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            parameters,
        }
    }

    fn has_empty_schema(&self) -> bool {
        match &self.parameters {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

/// Formats a tool for the chat-completion API.
///
/// # Errors
///
/// Returns [`ToolError::InvalidSchema`] if the parameter schema is not a
/// JSON object, or a nested `properties` entry is not one.
pub fn format_tool(
    tool: &ToolDescriptor,
    custom_serializer: Option<&SchemaSerializer>,
) -> Result<ChatCompletionTool, ToolError> {
    let parameters = if tool.has_empty_schema() {
        json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    } else {
        let mut params = convert_schema(&tool.name, &tool.parameters, custom_serializer)?;
        if params.get("type").and_then(Value::as_str) == Some("object") {
            normalize_required(&mut params);
        }
        Value::Object(params)
    };

    Ok(ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: tool.name.clone(),
            description: tool.description.clone().filter(|d| !d.is_empty()),
            parameters: Some(parameters),
            strict: None,
        },
    })
}

/// Converts a parameter schema, applying the custom serializer to every
/// property schema.
fn convert_schema(
    tool_name: &str,
    schema: &Value,
    custom_serializer: Option<&SchemaSerializer>,
) -> Result<Map<String, Value>, ToolError> {
    let Value::Object(map) = schema else {
        return Err(invalid_schema(tool_name, "schema must be a JSON object"));
    };

    let mut converted = map.clone();
    if let Some(properties) = converted.get_mut("properties") {
        let Value::Object(properties) = properties else {
            return Err(invalid_schema(tool_name, "'properties' must be a JSON object"));
        };
        for property in properties.values_mut() {
            *property = convert_leaf(tool_name, property, custom_serializer)?;
        }
    }
    Ok(converted)
}

fn convert_leaf(
    tool_name: &str,
    property: &Value,
    custom_serializer: Option<&SchemaSerializer>,
) -> Result<Value, ToolError> {
    if let Some(rendered) = custom_serializer.and_then(|serialize| serialize(property)) {
        return Ok(rendered);
    }

    let Value::Object(map) = property else {
        return Ok(property.clone());
    };

    if map.contains_key("properties") {
        return convert_schema(tool_name, property, custom_serializer).map(Value::Object);
    }

    let mut converted = map.clone();
    if let Some(items) = map.get("items") {
        converted.insert(
            "items".to_string(),
            convert_leaf(tool_name, items, custom_serializer)?,
        );
    }
    Ok(Value::Object(converted))
}

/// Normalizes `required` on an object schema.
///
/// Empty values are removed, a mapping becomes the list of its keys and any
/// other truthy non-list becomes a one-element list.
fn normalize_required(params: &mut Map<String, Value>) {
    let Some(required) = params.remove("required") else {
        return;
    };

    let normalized = match required {
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => Some(items),
        Value::Object(fields) if fields.is_empty() => None,
        Value::Object(fields) => Some(fields.into_iter().map(|(k, _)| Value::String(k)).collect()),
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(vec![other]),
    };

    if let Some(list) = normalized {
        params.insert("required".to_string(), Value::Array(list));
    }
}

fn invalid_schema(name: &str, message: &str) -> ToolError {
    ToolError::InvalidSchema {
        name: name.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn parameters_of(tool: &ChatCompletionTool) -> &Value {
        tool.function
            .parameters
            .as_ref()
            .unwrap_or_else(|| panic!("parameters missing"))
    }

    fn format(schema: Value) -> ChatCompletionTool {
        let tool = ToolDescriptor::new("light_on", "Turn on a light", schema);
        format_tool(&tool, None).unwrap_or_else(|e| panic!("format_tool failed: {e}"))
    }

    #[test_case(Value::Null ; "null schema")]
    #[test_case(json!({}) ; "empty object schema")]
    fn test_empty_schema_is_minimal_object(schema: Value) {
        let tool = format(schema);
        assert_eq!(
            parameters_of(&tool),
            &json!({"type": "object", "properties": {}, "additionalProperties": false})
        );
    }

    #[test_case(json!([]), None ; "empty list removed")]
    #[test_case(json!({}), None ; "empty map removed")]
    #[test_case(json!(null), None ; "null removed")]
    #[test_case(json!({"name": {"type": "string"}}), Some(json!(["name"])) ; "map becomes keys")]
    #[test_case(json!("name"), Some(json!(["name"])) ; "truthy scalar coerced")]
    #[test_case(json!(["name"]), Some(json!(["name"])) ; "list kept")]
    fn test_required_normalization(required: Value, expected: Option<Value>) {
        let tool = format(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}, "area": {"type": "string"}},
            "required": required
        }));
        assert_eq!(parameters_of(&tool).get("required"), expected.as_ref());
    }

    #[test]
    fn test_required_absent_stays_absent() {
        let tool = format(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}}
        }));
        assert!(parameters_of(&tool).get("required").is_none());
    }

    #[test]
    fn test_non_object_type_left_alone() {
        let tool = format(json!({"type": "string", "required": []}));
        assert_eq!(parameters_of(&tool).get("required"), Some(&json!([])));
    }

    #[test]
    fn test_custom_serializer_renders_leaves() {
        let serializer = |property: &Value| {
            property.get("selector")
                .map(|_| json!({"type": "string", "format": "entity_id"}))
        };
        let tool = ToolDescriptor::new(
            "get_state",
            "Read an entity",
            json!({
                "type": "object",
                "properties": {
                    "entity": {"selector": {"entity": {}}},
                    "targets": {"type": "array", "items": {"selector": {"area": {}}}}
                }
            }),
        );
        let formatted = format_tool(&tool, Some(&serializer))
            .unwrap_or_else(|e| panic!("format_tool failed: {e}"));
        let params = parameters_of(&formatted);
        assert_eq!(params["properties"]["entity"]["format"], "entity_id");
        assert_eq!(params["properties"]["targets"]["items"]["format"], "entity_id");
    }

    #[test]
    fn test_invalid_schema_propagates() {
        let tool = ToolDescriptor::new("broken", "", json!({"properties": [1, 2]}));
        let err = format_tool(&tool, None);
        assert!(matches!(err, Err(ToolError::InvalidSchema { .. })));

        let tool = ToolDescriptor::new("broken", "", json!("nope"));
        assert!(format_tool(&tool, None).is_err());
    }

    #[test]
    fn test_description_omitted_when_empty() {
        let tool = ToolDescriptor::new("noop", "", Value::Null);
        let formatted = format_tool(&tool, None).unwrap_or_else(|e| panic!("{e}"));
        assert!(formatted.function.description.is_none());
        assert_eq!(formatted.function.name, "noop");
        assert_eq!(formatted.r#type, ChatCompletionToolType::Function);
    }
}
