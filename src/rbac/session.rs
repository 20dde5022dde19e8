use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The request-scoped, role-bearing object derived from a credential.
///
/// Serialized flat: `{"role": "admin", "username": "..."}`. Every key other
/// than `role` lands in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub role: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Session {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            data: Map::new(),
        }
    }

    pub fn with_data(role: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            role: role.into(),
            data,
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_flat() {
        let mut session = Session::new("admin");
        session.insert("username", "kurab");

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value, json!({"role": "admin", "username": "kurab"}));
    }

    #[test]
    fn deserialize_requires_role() {
        let missing = serde_json::from_value::<Session>(json!({"username": "kurab"}));
        assert!(missing.is_err());

        let not_a_string = serde_json::from_value::<Session>(json!({"role": 7}));
        assert!(not_a_string.is_err());
    }
}
