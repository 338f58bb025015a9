use serde_json::{Map, Value};

pub type Entry = Map<String, Value>;

/// A destination translation file: `{ label, folders, entries }`.
///
/// The root object is kept as a raw JSON map so unknown fields and key order survive the
/// rewrite untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationDocument {
    pub root: Map<String, Value>,
    pub trailing_newline: bool,
}

impl TranslationDocument {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let root: Map<String, Value> = serde_json::from_str(text)?;
        Ok(Self {
            root,
            trailing_newline: text.ends_with('\n'),
        })
    }

    /// Two-space indented JSON, with a trailing newline only if the source had one.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(&self.root)?;
        if self.trailing_newline {
            out.push('\n');
        }
        Ok(out)
    }

    pub fn label(&self) -> Option<&str> {
        self.root.get("label").and_then(Value::as_str)
    }

    pub fn set_label(&mut self, label: &str) {
        self.root
            .insert("label".to_string(), Value::String(label.to_string()));
    }

    pub fn entries(&self) -> Option<&Map<String, Value>> {
        self.root.get("entries").and_then(Value::as_object)
    }

    pub fn entries_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.root.get_mut("entries").and_then(Value::as_object_mut)
    }
}

/// Field helpers over a destination entry.
pub trait EntryFields {
    fn str_field(&self, key: &str) -> Option<&str>;
    fn set_str(&mut self, key: &str, value: impl Into<String>);
    /// Removes a field while keeping the order of the remaining ones.
    fn remove_field(&mut self, key: &str);
    fn object(&self, key: &str) -> Option<&Map<String, Value>>;
    fn object_mut(&mut self, key: &str) -> Option<&mut Map<String, Value>>;
}

impl EntryFields for Map<String, Value> {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn set_str(&mut self, key: &str, value: impl Into<String>) {
        self.insert(key.to_string(), Value::String(value.into()));
    }

    fn remove_field(&mut self, key: &str) {
        self.shift_remove(key);
    }

    fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }

    fn object_mut(&mut self, key: &str) -> Option<&mut Map<String, Value>> {
        self.get_mut(key).and_then(Value::as_object_mut)
    }
}

/// The shape of one action slot value.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionValue {
    Missing,
    Plain(String),
    Detailed(Map<String, Value>),
    Opaque(Value),
}

impl ActionValue {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None => ActionValue::Missing,
            Some(Value::String(s)) => ActionValue::Plain(s.clone()),
            Some(Value::Object(map)) => ActionValue::Detailed(map.clone()),
            Some(other) => ActionValue::Opaque(other.clone()),
        }
    }

    pub fn html(&self) -> &str {
        match self {
            ActionValue::Plain(s) => s,
            ActionValue::Detailed(map) => map.str_field("description").unwrap_or(""),
            ActionValue::Missing | ActionValue::Opaque(_) => "",
        }
    }

    /// Stores new html keeping the slot's shape: objects keep their other fields, strings and
    /// empty slots stay strings, anything else becomes `{ description }`.
    pub fn with_html(self, html: String) -> Value {
        match self {
            ActionValue::Detailed(mut map) => {
                map.insert("description".to_string(), Value::String(html));
                Value::Object(map)
            }
            ActionValue::Plain(_) | ActionValue::Missing => Value::String(html),
            ActionValue::Opaque(_) => {
                let mut map = Map::new();
                map.insert("description".to_string(), Value::String(html));
                Value::Object(map)
            }
        }
    }
}

/// The html stored in an action slot, whichever shape it has.
pub fn action_html(actions: &Map<String, Value>, id: &str) -> String {
    ActionValue::from_value(actions.get(id)).html().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_preserves_key_order_and_trailing_newline() {
        let text = "{\n  \"label\": \"Классы\",\n  \"entries\": {\n    \"Zeta\": {},\n    \"Alpha\": {}\n  }\n}\n";
        let doc = TranslationDocument::parse(text).unwrap();
        assert!(doc.trailing_newline);
        assert_eq!(doc.render().unwrap(), text);

        let doc = TranslationDocument::parse(text.trim_end()).unwrap();
        assert!(!doc.render().unwrap().ends_with('\n'));
    }

    #[test]
    fn remove_field_keeps_remaining_order() {
        let mut entry: Entry = serde_json::from_value(json!({"name": "a", "description": "b", "actions": {}}))
            .unwrap();
        entry.remove_field("description");
        let keys: Vec<_> = entry.keys().cloned().collect();
        assert_eq!(keys, vec!["name", "actions"]);
    }

    #[test]
    fn action_shapes_round_trip_through_with_html() {
        let detailed = json!({"name": "Attack", "description": "<p>old</p>"});
        let value = ActionValue::from_value(Some(&detailed));
        assert_eq!(value.html(), "<p>old</p>");
        assert_eq!(
            value.with_html("<p>new</p>".into()),
            json!({"name": "Attack", "description": "<p>new</p>"})
        );

        let plain = ActionValue::from_value(Some(&json!("<p>x</p>")));
        assert_eq!(plain.with_html("<p>y</p>".into()), json!("<p>y</p>"));

        let opaque = ActionValue::from_value(Some(&json!(7)));
        assert_eq!(opaque.html(), "");
        assert_eq!(opaque.with_html("<p>z</p>".into()), json!({"description": "<p>z</p>"}));

        assert_eq!(ActionValue::Missing.with_html("<p>w</p>".into()), json!("<p>w</p>"));
    }
}
