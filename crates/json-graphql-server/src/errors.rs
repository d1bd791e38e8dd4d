use std::path::PathBuf;

/// An error loading or persisting the JSON store file
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Could not read store file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Store file must contain a single top-level JSON object")]
    NotAnObject,

    #[error("Could not write store file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// An error deriving a schema from seed records
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Invalid seeds in collection `{0}`: expected a non-empty array of records with truthy `id` fields")]
    InvalidSeeds(String),

    #[error("Unsupported {kind} value in field `{field}` of collection `{collection}`")]
    UnsupportedFieldType {
        collection: String,
        field: String,
        kind: &'static str,
    },

    #[error("Store has no collections to derive a schema from")]
    EmptyStore,
}

/// An error raised by a generated resolver
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("Unknown collection `{0}`")]
    UnknownCollection(String),

    #[error("Cannot generate an id for empty collection `{0}`")]
    EmptyCollection(String),

    #[error("Cannot generate an id: the last record in `{0}` has a non-integer id")]
    NonIntegerId(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An error in server startup
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to generate schema: {0}")]
    Generator(#[from] GeneratorError),

    #[error("No resolver generated for root field `{0}`")]
    MissingResolver(String),

    #[error("Failed to build executable schema: {0}")]
    Schema(String),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(std::io::Error),
}
