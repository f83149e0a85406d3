use std::collections::HashMap;

use serde_json::Value;

use crate::chat::{FunctionTool, ParameterProperty, ParametersSchema, Tool};

use super::definition::{ToolDefinition, ToolHandler};

/// Builder for one property of a tool's argument object.
pub struct ParamBuilder {
    name: String,
    property_type: String,
    description: String,
    items: Option<Box<ParameterProperty>>,
    enum_list: Option<Vec<String>>,
}

impl ParamBuilder {
    /// Creates a `string` parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_type: "string".to_string(),
            description: String::new(),
            items: None,
            enum_list: None,
        }
    }

    pub fn type_of(mut self, type_str: impl Into<String>) -> Self {
        self.property_type = type_str.into();
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Item schema, for `array` parameters.
    pub fn items(mut self, item_property: ParameterProperty) -> Self {
        self.items = Some(Box::new(item_property));
        self
    }

    pub fn enum_values(mut self, values: Vec<String>) -> Self {
        self.enum_list = Some(values);
        self
    }

    fn into_property(self) -> (String, ParameterProperty) {
        (
            self.name,
            ParameterProperty {
                property_type: self.property_type,
                description: self.description,
                items: self.items,
                enum_list: self.enum_list,
            },
        )
    }
}

/// Builds a tool's name, description and parameter schema without hand-written JSON.
pub struct FunctionBuilder {
    name: String,
    description: String,
    parameters: Vec<ParamBuilder>,
    required: Vec<String>,
    raw_schema: Option<Value>,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            required: Vec::new(),
            raw_schema: None,
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn param(mut self, param: ParamBuilder) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn required(mut self, param_names: Vec<String>) -> Self {
        self.required = param_names;
        self
    }

    /// Uses `schema` verbatim, ignoring any `param` calls.
    pub fn json_schema(mut self, schema: Value) -> Self {
        self.raw_schema = Some(schema);
        self
    }

    /// The wire description only, with no handler attached.
    pub fn build(self) -> Tool {
        let (name, description, parameters) = self.into_parts();
        Tool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name,
                description,
                parameters,
            },
        }
    }

    /// Binds a handler, producing a definition ready for registration.
    pub fn handler(self, handler: impl ToolHandler + 'static) -> ToolDefinition {
        let (name, description, parameters) = self.into_parts();
        ToolDefinition::new(name, description, parameters, handler)
    }

    fn into_parts(self) -> (String, String, Value) {
        let FunctionBuilder {
            name,
            description,
            parameters,
            required,
            raw_schema,
        } = self;
        let parameters = raw_schema.unwrap_or_else(|| build_parameters(parameters, required));
        (name, description, parameters)
    }
}

fn build_parameters(parameters: Vec<ParamBuilder>, required: Vec<String>) -> Value {
    let properties: HashMap<_, _> = parameters
        .into_iter()
        .map(ParamBuilder::into_property)
        .collect();

    serde_json::to_value(ParametersSchema {
        schema_type: "object".to_string(),
        properties,
        required,
    })
    .unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}
