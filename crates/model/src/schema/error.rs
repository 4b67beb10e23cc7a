use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Entity \"{0}\" is not registered")]
    UnknownEntity(String),

    #[error("Entity \"{0}\" is already registered")]
    DuplicateEntity(String),

    #[error("Relation \"{relation}\" is not declared on \"{entity}\"")]
    UnknownRelation { entity: String, relation: String },

    /// The relation points at an entity the registry does not know about.
    #[error("Entity \"{target}\" is not registered for relation \"{entity}.{relation}\"")]
    UnregisteredTarget {
        entity: String,
        relation: String,
        target: String,
    },

    /// A join key was omitted and no default could be derived for it.
    #[error("Relation \"{entity}.{relation}\" has no resolvable {key}")]
    MissingKey {
        entity: String,
        relation: String,
        key: &'static str,
    },

    #[error("Relation \"{entity}.{relation}\" of type {kind} cannot be joined")]
    NotJoinable {
        entity: String,
        relation: String,
        kind: String,
    },

    #[error("Failed to read schema document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid schema document: {0}")]
    Json(#[from] serde_json::Error),
}
