use serde::Serialize;

use crate::chat::{ChatMessage, Tool};

/// Request payload for the chat-completions endpoint.
#[derive(Serialize, Debug)]
pub(super) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<&'a [Tool]>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{FunctionCall, ToolCall};
    use crate::tools::{FunctionBuilder, ParamBuilder};

    #[test]
    fn serializes_conversation_and_tools() {
        let call = ToolCall {
            id: "call_1".to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: "weather".to_string(),
                arguments: "{\"city\":\"Paris\"}".to_string(),
            },
        };
        let messages = vec![
            ChatMessage::system().content("be brief").build(),
            ChatMessage::user().content("weather?").build(),
            ChatMessage::assistant().tool_calls(vec![call]).build(),
            ChatMessage::tool("call_1").content("sunny").build(),
        ];
        let tools = vec![FunctionBuilder::new("weather")
            .description("Current weather")
            .param(ParamBuilder::new("city").description("City name"))
            .required(vec!["city".to_string()])
            .build()];
        let body = ChatCompletionRequest {
            model: "m",
            messages: &messages,
            tools: Some(&tools),
            stream: true,
            temperature: None,
            max_tokens: Some(64),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["max_tokens"], 64);
        assert!(json.get("temperature").is_none());
        assert_eq!(json["messages"][2]["tool_calls"][0]["function"]["name"], "weather");
        assert_eq!(json["messages"][3]["tool_call_id"], "call_1");
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(
            json["tools"][0]["function"]["parameters"]["properties"]["city"]["type"],
            "string"
        );
        assert_eq!(json["tools"][0]["function"]["parameters"]["required"][0], "city");
    }

    #[test]
    fn omits_empty_tools() {
        let body = ChatCompletionRequest {
            model: "m",
            messages: &[],
            tools: None,
            stream: true,
            temperature: Some(0.5),
            max_tokens: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("tools").is_none());
        assert_eq!(json["temperature"], 0.5);
    }
}
