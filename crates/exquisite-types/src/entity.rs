//! Entity types

use serde::{Deserialize, Serialize};

/// The single resource served by the API.
///
/// `id` is an opaque identifier. It is unique across the active backend and
/// never changes once the entity exists; only `data` is mutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(alias = "uuid")]
    pub id: String,
    #[serde(default)]
    pub data: String,
}

impl Entity {
    pub fn new(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
        }
    }
}

/// Which storage backend is authoritative for the running service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Postgres table
    Relational,
    /// In-process map, used when no database is configured
    Fallback,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Relational => write!(f, "relational"),
            BackendKind::Fallback => write!(f, "fallback"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_serializes_id_and_data() {
        let entity = Entity::new("5520c7c6-bc87-4c13-a4bd-b682c5a88187", "payload");
        let json = serde_json::to_value(&entity).unwrap();

        assert_eq!(json["id"], "5520c7c6-bc87-4c13-a4bd-b682c5a88187");
        assert_eq!(json["data"], "payload");
    }

    #[test]
    fn test_entity_accepts_uuid_alias() {
        let entity: Entity =
            serde_json::from_str(r#"{"uuid": "abc", "data": "legacy"}"#).unwrap();

        assert_eq!(entity.id, "abc");
        assert_eq!(entity.data, "legacy");
    }

    #[test]
    fn test_missing_data_defaults_to_empty() {
        let entity: Entity = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert!(entity.data.is_empty());
    }

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Relational.to_string(), "relational");
        assert_eq!(BackendKind::Fallback.to_string(), "fallback");
    }
}
