//! Generated resolvers: five CRUD operations per collection, executed
//! against the shared store handle.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::ResolverError;
use crate::store::StoreHandle;

/// One generated resolver, closed over its collection name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolver {
    /// The whole collection, unfiltered.
    All { collection: String },
    /// First record with a matching id, or null.
    ById { collection: String },
    /// Appends a record with a generated id, then persists.
    Create { collection: String },
    /// Shallow-merges into the matching record, then persists.
    Update { collection: String },
    /// Drops matching records, then persists. Resolves to whether the
    /// collection shrank.
    Delete { collection: String },
}

impl Resolver {
    /// Runs the operation with the coerced request arguments. Mutations
    /// rewrite the store file before resolving.
    pub async fn execute(
        &self,
        store: &StoreHandle,
        args: &Map<String, Value>,
    ) -> Result<Value, ResolverError> {
        match self {
            Resolver::All { collection } => store.all(collection).await.map(Value::Array),
            Resolver::ById { collection } => {
                let id = args.get("id").and_then(Value::as_i64);
                store
                    .find(collection, id)
                    .await
                    .map(|row| row.unwrap_or(Value::Null))
            }
            Resolver::Create { collection } => {
                debug!(%collection, "create record");
                store.create(collection, args).await
            }
            Resolver::Update { collection } => {
                debug!(%collection, "update record");
                store
                    .update(collection, args)
                    .await
                    .map(|row| row.unwrap_or(Value::Null))
            }
            Resolver::Delete { collection } => {
                let id = args.get("id").and_then(Value::as_i64);
                debug!(%collection, "delete record");
                store.delete(collection, id).await.map(Value::Bool)
            }
        }
    }

    /// The collection the resolver operates on.
    pub fn collection(&self) -> &str {
        match self {
            Resolver::All { collection }
            | Resolver::ById { collection }
            | Resolver::Create { collection }
            | Resolver::Update { collection }
            | Resolver::Delete { collection } => collection,
        }
    }
}

/// Resolvers keyed by their root field names, in collection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverTable {
    pub query: IndexMap<String, Resolver>,
    pub mutation: IndexMap<String, Resolver>,
}

impl ResolverTable {
    pub fn query_resolver(&self, field: &str) -> Option<&Resolver> {
        self.query.get(field)
    }

    pub fn mutation_resolver(&self, field: &str) -> Option<&Resolver> {
        self.mutation.get(field)
    }
}
