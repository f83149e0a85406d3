use std::collections::BTreeMap;

use uuid::Uuid;

use crate::chat::{FunctionCall, ToolCall, ToolCallFragment};

const EMPTY_ARGUMENTS: &str = "{}";

#[derive(Debug, Default, Clone)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Reassembles streamed tool calls.
///
/// Fragments are keyed by stream position: providers send the call id only on the
/// first fragment of each index, so the id cannot be used to join them.
#[derive(Debug, Default)]
pub(crate) struct ToolCallAccumulator {
    calls: BTreeMap<usize, PartialToolCall>,
}

impl ToolCallAccumulator {
    pub(crate) fn push(&mut self, fragment: &ToolCallFragment) {
        let call = self.calls.entry(fragment.index).or_default();
        if let Some(id) = fragment.id.as_deref().filter(|id| !id.is_empty()) {
            call.id = Some(id.to_string());
        }
        if let Some(function) = &fragment.function {
            // some providers repeat the full name on every fragment
            if let Some(name) = function.name.as_deref().filter(|name| *name != call.name) {
                call.name.push_str(name);
            }
            if let Some(arguments) = function.arguments.as_deref() {
                call.arguments.push_str(arguments);
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Produces the finished calls in stream-index order.
    ///
    /// Empty argument strings become `{}`. Arguments that are not valid JSON are
    /// kept verbatim so the registry can report the problem back to the model.
    pub(crate) fn finalize(&self) -> Vec<ToolCall> {
        self.calls
            .iter()
            .map(|(index, call)| finalize_call(*index, call))
            .collect()
    }
}

fn finalize_call(index: usize, call: &PartialToolCall) -> ToolCall {
    let id = call.id.clone().unwrap_or_else(|| {
        let generated = format!("call_{}", Uuid::new_v4().simple());
        log::warn!("tool call at index {index} arrived without an id, using {generated}");
        generated
    });
    let arguments = if call.arguments.trim().is_empty() {
        EMPTY_ARGUMENTS.to_string()
    } else {
        call.arguments.clone()
    };
    if let Err(err) = serde_json::from_str::<serde_json::Value>(&arguments) {
        log::warn!(
            "tool call {id} ({}) has arguments that are not valid JSON: {err}",
            call.name
        );
    }
    ToolCall {
        id,
        call_type: "function".to_string(),
        function: FunctionCall {
            name: call.name.clone(),
            arguments,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::FunctionFragment;

    fn fragment(index: usize, id: Option<&str>, name: Option<&str>, args: &str) -> ToolCallFragment {
        ToolCallFragment {
            index,
            id: id.map(str::to_string),
            function: Some(FunctionFragment {
                name: name.map(str::to_string),
                arguments: Some(args.to_string()),
            }),
        }
    }

    #[test]
    fn joins_fragments_by_index_not_id() {
        let mut acc = ToolCallAccumulator::default();
        acc.push(&fragment(0, Some("call_a"), Some("add"), ""));
        acc.push(&fragment(1, Some("call_b"), Some("mul"), "{\"x\":"));
        acc.push(&fragment(0, None, None, "{\"a\":"));
        acc.push(&fragment(0, None, None, "1,\"b\":2}"));
        acc.push(&fragment(1, None, None, "3}"));

        let calls = acc.finalize();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].function.name, "add");
        assert_eq!(calls[0].function.arguments, "{\"a\":1,\"b\":2}");
        assert_eq!(calls[1].id, "call_b");
        assert_eq!(calls[1].function.arguments, "{\"x\":3}");

        for call in calls {
            serde_json::from_str::<serde_json::Value>(&call.function.arguments).unwrap();
        }
    }

    #[test]
    fn orders_by_index_even_when_out_of_order() {
        let mut acc = ToolCallAccumulator::default();
        acc.push(&fragment(2, Some("late"), Some("b"), "{}"));
        acc.push(&fragment(0, Some("early"), Some("a"), "{}"));

        let ids: Vec<_> = acc.finalize().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn empty_arguments_become_empty_object() {
        let mut acc = ToolCallAccumulator::default();
        acc.push(&fragment(0, Some("call_1"), Some("now"), ""));
        assert_eq!(acc.finalize()[0].function.arguments, "{}");
    }

    #[test]
    fn missing_id_gets_generated() {
        let mut acc = ToolCallAccumulator::default();
        acc.push(&fragment(0, None, Some("now"), "{}"));
        let call = &acc.finalize()[0];
        assert!(call.id.starts_with("call_"));
    }
}
