//! Hierarchical key-value documents stored as JSON or TOML.
//!
//! Fields are addressed by dotted paths whose segments may carry an array
//! index, e.g. `targetData.patches.patch[3].relativeCenter.X`.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{LocateError, LocateResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment<'a> {
    key: &'a str,
    index: Option<usize>,
}

fn segments(path: &str) -> impl Iterator<Item = Segment<'_>> {
    path.split('.').map(|part| {
        if let Some(open) = part.find('[') {
            if let Some(inner) = part[open + 1..].strip_suffix(']') {
                if let Ok(index) = inner.parse() {
                    return Segment {
                        key: &part[..open],
                        index: Some(index),
                    };
                }
            }
        }
        Segment { key: part, index: None }
    })
}

/// Numbers arrive as numbers or as numeric strings
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(Self::from_value)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text).map(Self::from_value)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.root)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&self.root)
    }

    /// Load a `.toml` file, or JSON for any other extension
    pub fn load<P: AsRef<Path>>(path: P) -> LocateResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LocateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = if is_toml(path) {
            Self::from_toml_str(&text).map_err(|e| e.to_string())
        } else {
            Self::from_json_str(&text).map_err(|e| e.to_string())
        };
        parsed.map_err(|reason| LocateError::Document {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> LocateResult<()> {
        let path = path.as_ref();
        let text = if is_toml(path) {
            self.to_toml_string().map_err(|e| e.to_string())
        } else {
            self.to_json_string().map_err(|e| e.to_string())
        }
        .map_err(|reason| LocateError::Document {
            path: path.to_path_buf(),
            reason,
        })?;
        std::fs::write(path, text).map_err(|source| LocateError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Value at `path`. Index 0 of a non-array value is the value itself,
    /// so a list with a single entry may be written without brackets.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut node = &self.root;
        for seg in segments(path) {
            node = node.as_object()?.get(seg.key)?;
            if let Some(i) = seg.index {
                node = match node {
                    Value::Array(items) => items.get(i)?,
                    other if i == 0 => other,
                    _ => return None,
                };
            }
        }
        Some(node)
    }

    pub fn number(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(as_number)
    }

    /// Number of entries in the list at `path`; a bare value counts as one
    pub fn count(&self, path: &str) -> usize {
        match self.get(path) {
            Some(Value::Array(items)) => items.len(),
            Some(Value::Null) | None => 0,
            Some(_) => 1,
        }
    }

    /// Write `value` at `path`, creating objects and growing arrays on the way.
    /// Non-container values found in between are replaced.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let mut node = &mut self.root;
        for seg in segments(path) {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            let Some(map) = node.as_object_mut() else {
                return;
            };
            node = map.entry(seg.key).or_insert(Value::Null);
            if let Some(i) = seg.index {
                if !node.is_array() {
                    let first = std::mem::take(node);
                    *node = Value::Array(if first.is_null() { Vec::new() } else { vec![first] });
                }
                let Some(items) = node.as_array_mut() else {
                    return;
                };
                if items.len() <= i {
                    items.resize(i + 1, Value::Object(Map::new()));
                }
                node = &mut items[i];
            }
        }
        *node = value.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn reads_numbers_and_numeric_strings() {
        let doc = Document::from_value(json!({
            "a": {"b": [ {"x": 1.5}, {"x": " 0.25 "} ], "n": "7"}
        }));
        assert_eq!(doc.number("a.b[0].x"), Some(1.5));
        assert_eq!(doc.number("a.b[1].x"), Some(0.25));
        assert_eq!(doc.number("a.n"), Some(7.0));
        assert_eq!(doc.number("a.b[2].x"), None);
        assert_eq!(doc.number("a.missing"), None);
        assert_eq!(doc.count("a.b"), 2);
    }

    #[test]
    fn single_entry_lists_may_omit_brackets() {
        let doc = Document::from_value(json!({"list": {"item": {"v": 3}}}));
        assert_eq!(doc.number("list.item[0].v"), Some(3.0));
        assert_eq!(doc.get("list.item[1]"), None);
        assert_eq!(doc.count("list.item"), 1);
    }

    #[test]
    fn set_creates_containers_and_extends_arrays() {
        let mut doc = Document::new();
        doc.set("out.patch[2].center.X", 40);
        assert_eq!(doc.count("out.patch"), 3);
        assert_eq!(doc.number("out.patch[2].center.X"), Some(40.0));
        assert_eq!(doc.get("out.patch[0]"), Some(&json!({})));
    }

    #[test]
    fn set_keeps_unrelated_fields() {
        let mut doc = Document::from_value(json!({
            "imageData": {"owner": "lab", "patchData": {"patch": [{"name": "A1"}]}}
        }));
        doc.set("imageData.patchData.patch[0].center.Y", 12);
        doc.set("imageData.patchData.patch[1].center.Y", 13);
        assert_eq!(doc.get("imageData.owner"), Some(&json!("lab")));
        assert_eq!(doc.get("imageData.patchData.patch[0].name"), Some(&json!("A1")));
        assert_eq!(doc.number("imageData.patchData.patch[1].center.Y"), Some(13.0));
    }

    #[test]
    fn set_replaces_scalar_placeholders() {
        let mut doc = Document::from_value(json!({"g": {"corner": ""}}));
        doc.set("g.corner[1].X", 5);
        assert_eq!(doc.count("g.corner"), 2);
        assert_eq!(doc.get("g.corner[0]"), Some(&json!("")));
        assert_eq!(doc.number("g.corner[1].X"), Some(5.0));
    }

    #[test]
    fn malformed_index_is_a_plain_key() {
        let mut doc = Document::new();
        doc.set("weird[x]", 1);
        assert_eq!(doc.get("weird[x]"), Some(&json!(1)));
    }

    proptest! {
        #[test]
        fn set_then_read_back(i in 0usize..40, j in 0usize..5, v in -1.0e6f64..1.0e6) {
            let mut doc = Document::new();
            let path = format!("a.list[{}].inner[{}].v", i, j);
            doc.set(&path, v);
            prop_assert_eq!(doc.number(&path), Some(v));
            prop_assert_eq!(doc.count("a.list"), i + 1);
            prop_assert_eq!(doc.count(&format!("a.list[{}].inner", i)), j + 1);
        }
    }

    #[test]
    fn toml_and_json_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = Document::new();
        doc.set("root.items[0].X", 1);
        doc.set("root.items[1].X", 2);
        doc.set("root.label", "chart");
        for name in ["doc.json", "doc.toml"] {
            let path = dir.path().join(name);
            doc.save(&path).unwrap();
            assert_eq!(Document::load(&path).unwrap(), doc);
        }
    }

    #[test]
    fn unparsable_file_is_a_document_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Document::load(&path), Err(LocateError::Document { .. })));
        assert!(matches!(
            Document::load(dir.path().join("absent.json")),
            Err(LocateError::Io { .. })
        ));
    }
}
