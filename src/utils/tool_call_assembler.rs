use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A tool call whose arguments parsed into a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledToolCall {
    pub id: String,
    pub name: String,
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Default)]
struct PendingToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
    seed: Option<Map<String, Value>>,
}

/// Collects tool-call argument fragments keyed by the vendor's tool index.
///
/// Fragments are kept as raw text and parsed only in [`finalize`](Self::finalize).
/// Unlike a tolerant collector this one refuses arguments that are not a JSON
/// object: those cannot be dispatched to a resolver.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    pending: BTreeMap<u32, PendingToolCall>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: u32) -> bool {
        self.pending.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Register (or update) the call at `key`. Later non-empty ids/names win.
    pub fn on_started(&mut self, key: u32, id: Option<String>, name: Option<String>) {
        let entry = self.pending.entry(key).or_default();
        if let Some(id) = id.filter(|s| !s.is_empty()) {
            entry.id = Some(id);
        }
        if let Some(name) = name.filter(|s| !s.is_empty()) {
            entry.name = Some(name);
        }
    }

    /// Arguments already known when the call opened; used when no fragment follows.
    pub fn on_seed(&mut self, key: u32, seed: Map<String, Value>) {
        self.pending.entry(key).or_default().seed = Some(seed);
    }

    pub fn on_partial(&mut self, key: u32, fragment: &str) {
        self.pending
            .entry(key)
            .or_default()
            .arguments
            .push_str(fragment);
    }

    pub fn id(&self, key: u32) -> Option<&str> {
        self.pending.get(&key).and_then(|p| p.id.as_deref())
    }

    pub fn name(&self, key: u32) -> Option<&str> {
        self.pending.get(&key).and_then(|p| p.name.as_deref())
    }

    /// Remove the call at `key` and parse its buffered arguments.
    ///
    /// Empty arguments mean "no parameters". A missing id is replaced with a
    /// generated one; a missing name is an error.
    pub fn finalize(&mut self, key: u32) -> Result<AssembledToolCall, String> {
        let pending = self
            .pending
            .remove(&key)
            .ok_or_else(|| format!("no tool call buffered at index {key}"))?;

        let name = pending
            .name
            .ok_or_else(|| format!("tool call at index {key} has no name"))?;
        let id = pending
            .id
            .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));

        let trimmed = pending.arguments.trim();
        let parameters = if trimmed.is_empty() {
            pending.seed.unwrap_or_default()
        } else {
            match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    return Err(format!(
                        "arguments of tool call `{name}` ({id}) must be a JSON object, got {}",
                        json_type_name(&other)
                    ))
                }
                Err(e) => {
                    return Err(format!(
                        "arguments of tool call `{name}` ({id}) are not valid JSON: {e}"
                    ))
                }
            }
        };

        Ok(AssembledToolCall {
            id,
            name,
            parameters,
        })
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fragments_are_joined_before_parsing() {
        let mut asm = ToolCallAssembler::new();
        asm.on_started(0, Some("call_1".into()), Some("get_weather".into()));
        asm.on_partial(0, "{\"lo");
        asm.on_partial(0, "cation\": \"To");
        asm.on_partial(0, "kyo\"}");

        let call = asm.finalize(0).unwrap();
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.parameters.get("location"), Some(&json!("Tokyo")));
        assert!(asm.is_empty());
    }

    #[test]
    fn empty_arguments_fall_back_to_seed_or_empty_object() {
        let mut asm = ToolCallAssembler::new();
        asm.on_started(3, Some("a".into()), Some("noop".into()));
        assert!(asm.finalize(3).unwrap().parameters.is_empty());

        let mut seed = Map::new();
        seed.insert("x".into(), json!(1));
        asm.on_started(4, Some("b".into()), Some("noop".into()));
        asm.on_seed(4, seed.clone());
        assert_eq!(asm.finalize(4).unwrap().parameters, seed);
    }

    #[test]
    fn invalid_or_non_object_arguments_are_rejected() {
        let mut asm = ToolCallAssembler::new();
        asm.on_started(0, Some("a".into()), Some("search".into()));
        asm.on_partial(0, "{\"q\": ");
        let err = asm.finalize(0).unwrap_err();
        assert!(err.contains("not valid JSON"), "{err}");

        asm.on_started(1, Some("b".into()), Some("search".into()));
        asm.on_partial(1, "[1, 2]");
        let err = asm.finalize(1).unwrap_err();
        assert!(err.contains("an array"), "{err}");
    }

    #[test]
    fn missing_name_is_an_error_and_missing_id_is_generated() {
        let mut asm = ToolCallAssembler::new();
        asm.on_partial(0, "{}");
        assert!(asm.finalize(0).unwrap_err().contains("no name"));

        asm.on_started(1, None, Some("search".into()));
        let call = asm.finalize(1).unwrap();
        assert!(call.id.starts_with("call_"));
    }

    #[test]
    fn later_ids_and_names_fill_gaps() {
        let mut asm = ToolCallAssembler::new();
        asm.on_started(0, None, None);
        asm.on_started(0, Some("call_9".into()), Some(String::new()));
        asm.on_started(0, None, Some("lookup".into()));
        assert_eq!(asm.id(0), Some("call_9"));
        assert_eq!(asm.name(0), Some("lookup"));
    }
}
