//! Output formatting

use serde_json::{Map, Value};

/// Output builder: plain text for people, a JSON object with `--json`
pub struct Output {
    json_mode: bool,
    fields: Map<String, Value>,
    lines: Vec<String>,
}

impl Output {
    /// Create a new output builder
    pub fn new(json_mode: bool) -> Self {
        Self {
            json_mode,
            fields: Map::new(),
            lines: Vec::new(),
        }
    }

    /// Add a string field
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a u64 field
    pub fn field_u64(mut self, key: &str, value: u64) -> Self {
        self.fields.insert(key.to_string(), Value::Number(value.into()));
        self
    }

    /// Add a JSON value field
    pub fn field_value(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Append a line of human-readable text
    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.lines.push(text.into());
        self
    }

    /// Render without printing
    pub fn render(&self) -> String {
        if self.json_mode {
            serde_json::to_string_pretty(&Value::Object(self.fields.clone())).unwrap_or_default()
        } else {
            self.lines.join("\n")
        }
    }

    /// Print the output
    pub fn print(self) {
        let rendered = self.render();
        if !rendered.is_empty() {
            println!("{}", rendered);
        }
    }
}

/// Plain rendering of a JSON value: strings unquoted, everything else as JSON
pub fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "(no value)".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_mode_renders_fields() {
        let out = Output::new(true)
            .field("status", "ok")
            .field_u64("nonce", 3)
            .line("ignored in json mode");
        let parsed: Value = serde_json::from_str(&out.render()).unwrap();
        assert_eq!(parsed, json!({ "status": "ok", "nonce": 3 }));
    }

    #[test]
    fn test_text_mode_renders_lines() {
        let out = Output::new(false).field("status", "ok").line("a").line("b");
        assert_eq!(out.render(), "a\nb");
    }

    #[test]
    fn test_plain_values() {
        assert_eq!(plain(&json!("42")), "42");
        assert_eq!(plain(&json!([1, "a"])), "[1,\"a\"]");
        assert_eq!(plain(&Value::Null), "(no value)");
    }
}
