use fxhash::FxHashMap;

use crate::player::value::Avm1Value;
use crate::player::ObjectId;

/// A script object: a property map plus an optional prototype link.
/// Arrays are plain objects with a tracked `length`.
#[derive(Debug, Clone, Default)]
pub struct ScriptObject {
    pub properties: FxHashMap<String, Avm1Value>,
    pub prototype: Option<ObjectId>,
    pub is_array: bool,
}

impl ScriptObject {
    pub fn new() -> ScriptObject {
        ScriptObject::default()
    }

    pub fn new_array(length: usize) -> ScriptObject {
        let mut obj = ScriptObject::default();
        obj.is_array = true;
        obj.properties
            .insert("length".to_string(), Avm1Value::Int(length as i32));
        obj
    }

    /// Own-property lookup. Case-insensitive mode falls back to a scan
    /// when the exact key misses, matching old-player name resolution.
    pub fn get_own(&self, name: &str, case_sensitive: bool) -> Option<&Avm1Value> {
        if let Some(value) = self.properties.get(name) {
            return Some(value);
        }
        if !case_sensitive {
            self.properties
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        } else {
            None
        }
    }

    pub fn set(&mut self, name: &str, value: Avm1Value, case_sensitive: bool) {
        if !case_sensitive && !self.properties.contains_key(name) {
            let existing = self
                .properties
                .keys()
                .find(|key| key.eq_ignore_ascii_case(name))
                .cloned();
            if let Some(key) = existing {
                self.properties.insert(key, value);
                self.bump_array_length(name);
                return;
            }
        }
        self.properties.insert(name.to_string(), value);
        self.bump_array_length(name);
    }

    pub fn delete(&mut self, name: &str, case_sensitive: bool) -> bool {
        if self.properties.remove(name).is_some() {
            return true;
        }
        if !case_sensitive {
            let existing = self
                .properties
                .keys()
                .find(|key| key.eq_ignore_ascii_case(name))
                .cloned();
            if let Some(key) = existing {
                self.properties.remove(&key);
                return true;
            }
        }
        false
    }

    /// Setting an index at or past `length` grows an array.
    fn bump_array_length(&mut self, name: &str) {
        if !self.is_array {
            return;
        }
        if let Ok(index) = name.parse::<u32>() {
            let length = match self.properties.get("length") {
                Some(Avm1Value::Int(len)) => *len,
                _ => 0,
            };
            if index as i32 >= length {
                self.properties
                    .insert("length".to_string(), Avm1Value::Int(index as i32 + 1));
            }
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut obj = ScriptObject::new();
        obj.set("Score", Avm1Value::Int(10), false);
        assert_eq!(obj.get_own("score", false), Some(&Avm1Value::Int(10)));
        assert_eq!(obj.get_own("score", true), None);
    }

    #[test]
    fn test_case_insensitive_set_reuses_key() {
        let mut obj = ScriptObject::new();
        obj.set("name", Avm1Value::Str("a".into()), false);
        obj.set("NAME", Avm1Value::Str("b".into()), false);
        assert_eq!(obj.properties.len(), 1);
        assert_eq!(
            obj.get_own("name", true),
            Some(&Avm1Value::Str("b".into()))
        );
    }

    #[test]
    fn test_array_length_tracks_indices() {
        let mut arr = ScriptObject::new_array(0);
        arr.set("0", Avm1Value::Int(1), true);
        arr.set("4", Avm1Value::Int(5), true);
        assert_eq!(arr.get_own("length", true), Some(&Avm1Value::Int(5)));
    }

    #[test]
    fn test_delete() {
        let mut obj = ScriptObject::new();
        obj.set("x", Avm1Value::Int(1), true);
        assert!(obj.delete("X", false));
        assert!(!obj.delete("x", true));
    }
}
