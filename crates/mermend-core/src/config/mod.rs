use crate::{Error, Result};
use serde_json::{Map, Value, json};

/// Rendering-engine configuration as a dotted-path JSON object.
///
/// Keys follow Mermaid's `initialize()` shape (`flowchart.htmlLabels`, `flowchart.curve`, ...)
/// so a configuration captured from a browser integration can be replayed here unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig(Value);

impl Default for RenderConfig {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl RenderConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Parses a JSON object. Anything other than an object is rejected.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        if !value.is_object() {
            return Err(Error::InvalidConfig {
                message: "top-level value must be an object".to_string(),
            });
        }
        Ok(Self(value))
    }

    /// Settings for the first render attempts: strict layout, plain-text labels, straight edges.
    pub fn primary() -> Self {
        Self(json!({
            "startOnLoad": false,
            "theme": "default",
            "fontFamily": "Inter, Arial, sans-serif",
            "securityLevel": "loose",
            "flowchart": {
                "useMaxWidth": true,
                "htmlLabels": false,
                "curve": "linear",
                "nodeSpacing": 50,
                "rankSpacing": 60
            }
        }))
    }

    /// Settings for the simplified fallback attempt: HTML labels allowed, curved edges.
    pub fn permissive() -> Self {
        Self(json!({
            "startOnLoad": false,
            "theme": "default",
            "securityLevel": "loose",
            "logLevel": 0,
            "flowchart": {
                "useMaxWidth": true,
                "htmlLabels": true,
                "curve": "basis"
            }
        }))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn lookup(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.lookup(dotted_path)?.as_str()
    }

    pub fn get_bool(&self, dotted_path: &str) -> Option<bool> {
        self.lookup(dotted_path)?.as_bool()
    }

    pub fn get_f64(&self, dotted_path: &str) -> Option<f64> {
        self.lookup(dotted_path)?.as_f64()
    }

    /// Like [`RenderConfig::get_f64`], but reports a present value of the wrong type.
    pub fn try_get_f64(&self, dotted_path: &str) -> Result<Option<f64>> {
        match self.lookup(dotted_path) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v.as_f64().map(Some).ok_or_else(|| Error::InvalidConfigValue {
                path: dotted_path.to_string(),
                expected: "a number",
            }),
        }
    }

    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        // Configs built through `from_value` may hold a non-object; coerce instead of panicking.
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }

        let Value::Object(ref mut root) = self.0 else {
            return;
        };
        let mut cur: &mut Map<String, Value> = root;
        let mut segments = dotted_path.split('.').peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_none() {
                cur.insert(seg.to_string(), value);
                return;
            }
            let slot = cur.entry(seg).or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Some(next) = slot.as_object_mut() else {
                return;
            };
            cur = next;
        }
    }

    pub fn deep_merge(&mut self, other: &Value) {
        deep_merge_value(&mut self.0, other);
    }

    /// Returns a copy of `self` with `overrides` merged on top.
    pub fn merged(&self, overrides: &RenderConfig) -> Self {
        let mut out = self.clone();
        out.deep_merge(overrides.as_value());
        out
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_where_the_fallback_relaxes_layout() {
        let primary = RenderConfig::primary();
        let permissive = RenderConfig::permissive();
        assert_eq!(primary.get_bool("flowchart.htmlLabels"), Some(false));
        assert_eq!(permissive.get_bool("flowchart.htmlLabels"), Some(true));
        assert_eq!(primary.get_str("flowchart.curve"), Some("linear"));
        assert_eq!(permissive.get_str("flowchart.curve"), Some("basis"));
        assert_eq!(primary.get_f64("flowchart.rankSpacing"), Some(60.0));
        assert_eq!(permissive.get_f64("flowchart.rankSpacing"), None);
    }

    #[test]
    fn merged_overrides_nested_keys_only() {
        let overrides = RenderConfig::from_json_str(r#"{"flowchart":{"curve":"basis"}}"#).unwrap();
        let merged = RenderConfig::primary().merged(&overrides);
        assert_eq!(merged.get_str("flowchart.curve"), Some("basis"));
        assert_eq!(merged.get_f64("flowchart.nodeSpacing"), Some(50.0));
    }

    #[test]
    fn set_value_coerces_non_object_roots() {
        let mut cfg = RenderConfig::from_value(Value::Bool(true));
        cfg.set_value("flowchart.nodeSpacing", json!(10));
        assert_eq!(cfg.get_f64("flowchart.nodeSpacing"), Some(10.0));
    }

    #[test]
    fn rejects_non_object_json_and_mistyped_numbers() {
        assert!(RenderConfig::from_json_str("[1, 2]").is_err());
        let cfg = RenderConfig::from_json_str(r#"{"flowchart":{"nodeSpacing":"wide"}}"#).unwrap();
        assert!(cfg.try_get_f64("flowchart.nodeSpacing").is_err());
        assert_eq!(cfg.try_get_f64("flowchart.rankSpacing").unwrap(), None);
    }
}
