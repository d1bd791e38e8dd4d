//! JSON-file-backed data store.
//!
//! The whole file is held in memory as one JSON object mapping collection
//! names to arrays of flat records. Key order follows the file, and every
//! mutation rewrites the file in full, pretty-printed, so it stays
//! hand-editable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::{ResolverError, StoreError};

/// In-memory image of the store file.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
    data: Map<String, Value>,
}

impl JsonStore {
    /// Builds a store over an already-parsed object, persisting to `path`.
    pub fn new(path: impl Into<PathBuf>, data: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Loads a store from a file holding a single top-level JSON object.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        match serde_json::from_str(&raw)? {
            Value::Object(data) => Ok(Self::new(path, data)),
            _ => Err(StoreError::NotAnObject),
        }
    }

    /// The collections and their records, in file order.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Collection names in file order.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Rewrites the backing file with the current contents, 2-space indented.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let pretty = serde_json::to_string_pretty(&self.data)?;
        tokio::fs::write(&self.path, pretty)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), "store persisted");
        Ok(())
    }

    /// Every record in the collection, in stored order.
    pub fn all(&self, collection: &str) -> Result<Vec<Value>, ResolverError> {
        self.rows(collection).map(|rows| rows.to_vec())
    }

    /// First record with a matching id. A missing argument matches nothing.
    pub fn find(&self, collection: &str, id: Option<i64>) -> Result<Option<Value>, ResolverError> {
        let rows = self.rows(collection)?;
        Ok(id.and_then(|id| rows.iter().find(|row| id_matches(row, id)).cloned()))
    }

    /// Appends a record built from `args` with a generated id. The generated
    /// id replaces any caller-supplied one and sits first in key order.
    pub fn create(
        &mut self,
        collection: &str,
        args: &Map<String, Value>,
    ) -> Result<Value, ResolverError> {
        let rows = self.rows_mut(collection)?;
        let id = next_id(collection, rows)?;
        let mut record = Map::new();
        record.insert("id".to_string(), Value::from(id));
        for (key, value) in args {
            if key != "id" {
                record.insert(key.clone(), value.clone());
            }
        }
        let record = Value::Object(record);
        rows.push(record.clone());
        Ok(record)
    }

    /// Shallow-merges `args` into every record whose id matches `args.id`,
    /// leaving fields absent from `args` untouched. Returns the updated
    /// record, or `None` when nothing matched.
    pub fn update(
        &mut self,
        collection: &str,
        args: &Map<String, Value>,
    ) -> Result<Option<Value>, ResolverError> {
        let rows = self.rows_mut(collection)?;
        let Some(id) = args.get("id").and_then(Value::as_i64) else {
            return Ok(None);
        };
        let mut updated = None;
        for row in rows.iter_mut() {
            if id_matches(row, id) {
                if let Value::Object(record) = row {
                    for (key, value) in args {
                        record.insert(key.clone(), value.clone());
                    }
                }
                updated = Some(row.clone());
            }
        }
        Ok(updated)
    }

    /// Removes every record whose id matches. Returns whether the collection
    /// shrank.
    pub fn delete(&mut self, collection: &str, id: Option<i64>) -> Result<bool, ResolverError> {
        let rows = self.rows_mut(collection)?;
        let old_len = rows.len();
        if let Some(id) = id {
            rows.retain(|row| !id_matches(row, id));
        }
        Ok(rows.len() < old_len)
    }

    fn rows(&self, collection: &str) -> Result<&Vec<Value>, ResolverError> {
        self.data
            .get(collection)
            .and_then(Value::as_array)
            .ok_or_else(|| ResolverError::UnknownCollection(collection.to_string()))
    }

    fn rows_mut(&mut self, collection: &str) -> Result<&mut Vec<Value>, ResolverError> {
        self.data
            .get_mut(collection)
            .and_then(Value::as_array_mut)
            .ok_or_else(|| ResolverError::UnknownCollection(collection.to_string()))
    }
}

/// Shared handle passed to every generated resolver. Queries take the read
/// lock; mutations hold the write lock across the whole mutate-persist step,
/// so overlapping mutations serialize instead of racing on the file.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    inner: Arc<RwLock<JsonStore>>,
}

impl StoreHandle {
    pub fn new(store: JsonStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub async fn all(&self, collection: &str) -> Result<Vec<Value>, ResolverError> {
        self.inner.read().await.all(collection)
    }

    pub async fn find(
        &self,
        collection: &str,
        id: Option<i64>,
    ) -> Result<Option<Value>, ResolverError> {
        self.inner.read().await.find(collection, id)
    }

    pub async fn create(
        &self,
        collection: &str,
        args: &Map<String, Value>,
    ) -> Result<Value, ResolverError> {
        let mut store = self.inner.write().await;
        let record = store.create(collection, args)?;
        store.persist().await?;
        Ok(record)
    }

    pub async fn update(
        &self,
        collection: &str,
        args: &Map<String, Value>,
    ) -> Result<Option<Value>, ResolverError> {
        let mut store = self.inner.write().await;
        let updated = store.update(collection, args)?;
        store.persist().await?;
        Ok(updated)
    }

    pub async fn delete(&self, collection: &str, id: Option<i64>) -> Result<bool, ResolverError> {
        let mut store = self.inner.write().await;
        let removed = store.delete(collection, id)?;
        store.persist().await?;
        Ok(removed)
    }

    /// Snapshot of the current store contents.
    pub async fn snapshot(&self) -> Map<String, Value> {
        self.inner.read().await.data().clone()
    }
}

/// Mirrors JavaScript truthiness for record id checks: `null`, `false`, `0`,
/// and `""` are falsy, everything else is truthy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric equality between a record's stored id and a query argument.
fn id_matches(row: &Value, id: i64) -> bool {
    match row.get("id") {
        Some(Value::Number(n)) => n.as_i64() == Some(id) || n.as_f64() == Some(id as f64),
        _ => false,
    }
}

/// Ids count as integers when their value is whole, even if stored as a
/// float.
fn integer_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        _ => None,
    }
}

/// The id for the next created record: one past the last record's id.
fn next_id(collection: &str, rows: &[Value]) -> Result<i64, ResolverError> {
    let last = rows
        .last()
        .ok_or_else(|| ResolverError::EmptyCollection(collection.to_string()))?;
    last.get("id")
        .and_then(integer_id)
        .map(|id| id + 1)
        .ok_or_else(|| ResolverError::NonIntegerId(collection.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn store_with(data: Value) -> JsonStore {
        let Value::Object(map) = data else {
            panic!("test data must be an object");
        };
        JsonStore::new("unused.json", map)
    }

    fn todos_store() -> JsonStore {
        store_with(json!({
            "todos": [
                { "id": 1, "title": "buy milk", "done": false },
                { "id": 2, "title": "water plants", "done": true }
            ]
        }))
    }

    #[test]
    fn test_load_keeps_collection_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, r#"{"zebras":[{"id":1}],"apes":[{"id":1}]}"#).unwrap();

        let store = JsonStore::load(&path).unwrap();

        assert_eq!(store.collections().collect::<Vec<_>>(), vec!["zebras", "apes"]);
    }

    #[test]
    fn test_load_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let result = JsonStore::load(&path);

        assert!(matches!(result, Err(StoreError::NotAnObject)));
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(JsonStore::load(&path), Err(StoreError::Parse(_))));
    }

    #[test]
    fn test_all_returns_records_in_order() {
        let store = todos_store();

        let rows = store.all("todos").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows.first().unwrap().get("title"), Some(&json!("buy milk")));
    }

    #[test]
    fn test_all_unknown_collection() {
        let store = todos_store();

        assert!(matches!(
            store.all("users"),
            Err(ResolverError::UnknownCollection(_))
        ));
    }

    #[test]
    fn test_find_matches_by_id() {
        let store = todos_store();

        let row = store.find("todos", Some(2)).unwrap().unwrap();

        assert_eq!(row.get("title"), Some(&json!("water plants")));
    }

    #[test]
    fn test_find_misses_unknown_id() {
        let store = todos_store();

        assert_eq!(store.find("todos", Some(42)).unwrap(), None);
    }

    #[test]
    fn test_find_without_id_matches_nothing() {
        let store = todos_store();

        assert_eq!(store.find("todos", None).unwrap(), None);
    }

    #[test]
    fn test_create_appends_with_generated_id() {
        let mut store = todos_store();
        let mut args = Map::new();
        args.insert("title".to_string(), json!("call mom"));
        args.insert("done".to_string(), json!(false));

        let record = store.create("todos", &args).unwrap();

        assert_eq!(record, json!({ "id": 3, "title": "call mom", "done": false }));
        let rows = store.all("todos").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.last().unwrap(), &record);
    }

    #[test]
    fn test_create_generated_id_wins_over_argument() {
        let mut store = todos_store();
        let mut args = Map::new();
        args.insert("id".to_string(), json!(99));
        args.insert("title".to_string(), json!("call mom"));

        let record = store.create("todos", &args).unwrap();

        assert_eq!(record.get("id"), Some(&json!(3)));
        // the generated id also comes first in key order
        let keys: Vec<_> = record.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["id", "title"]);
    }

    #[test]
    fn test_create_on_empty_collection_fails() {
        let mut store = store_with(json!({ "todos": [] }));

        let result = store.create("todos", &Map::new());

        assert!(matches!(result, Err(ResolverError::EmptyCollection(_))));
    }

    #[test]
    fn test_create_with_non_integer_trailing_id_fails() {
        let mut store = store_with(json!({ "todos": [{ "id": "abc" }] }));

        let result = store.create("todos", &Map::new());

        assert!(matches!(result, Err(ResolverError::NonIntegerId(_))));
    }

    #[test]
    fn test_create_accepts_whole_float_trailing_id() {
        let mut store = store_with(json!({ "todos": [{ "id": 2.0 }] }));

        let record = store.create("todos", &Map::new()).unwrap();

        assert_eq!(record.get("id"), Some(&json!(3)));
    }

    #[test]
    fn test_update_merges_preserving_other_fields() {
        let mut store = todos_store();
        let mut args = Map::new();
        args.insert("id".to_string(), json!(1));
        args.insert("done".to_string(), json!(true));

        let updated = store.update("todos", &args).unwrap().unwrap();

        assert_eq!(updated, json!({ "id": 1, "title": "buy milk", "done": true }));
        assert_eq!(store.find("todos", Some(1)).unwrap().unwrap(), updated);
    }

    #[test]
    fn test_update_unknown_id_returns_none() {
        let mut store = todos_store();
        let mut args = Map::new();
        args.insert("id".to_string(), json!(42));
        args.insert("done".to_string(), json!(true));

        assert_eq!(store.update("todos", &args).unwrap(), None);
    }

    #[test]
    fn test_delete_removes_matching_records() {
        let mut store = todos_store();

        assert!(store.delete("todos", Some(1)).unwrap());
        assert_eq!(store.all("todos").unwrap().len(), 1);
        // deleting the same id again removes nothing
        assert!(!store.delete("todos", Some(1)).unwrap());
    }

    #[test]
    fn test_delete_without_id_removes_nothing() {
        let mut store = todos_store();

        assert!(!store.delete("todos", None).unwrap());
        assert_eq!(store.all("todos").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mutations_persist_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(
            &path,
            serde_json::to_string(&json!({ "todos": [{ "id": 1, "title": "buy milk" }] }))
                .unwrap(),
        )
        .unwrap();
        let handle = StoreHandle::new(JsonStore::load(&path).unwrap());

        let mut args = Map::new();
        args.insert("title".to_string(), json!("water plants"));
        handle.create("todos", &args).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let expected = json!({
            "todos": [
                { "id": 1, "title": "buy milk" },
                { "id": 2, "title": "water plants" }
            ]
        });
        assert_eq!(written, serde_json::to_string_pretty(&expected).unwrap());

        // a reload sees the created record
        let reloaded = JsonStore::load(&path).unwrap();
        let row = reloaded.find("todos", Some(2)).unwrap().unwrap();
        assert_eq!(row.get("title"), Some(&json!("water plants")));
    }

    #[tokio::test]
    async fn test_update_and_delete_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(
            &path,
            json!({ "todos": [{ "id": 1, "done": false }, { "id": 2, "done": false }] })
                .to_string(),
        )
        .unwrap();
        let handle = StoreHandle::new(JsonStore::load(&path).unwrap());

        let mut args = Map::new();
        args.insert("id".to_string(), json!(1));
        args.insert("done".to_string(), json!(true));
        handle.update("todos", &args).await.unwrap();
        handle.delete("todos", Some(2)).await.unwrap();

        let reloaded = JsonStore::load(&path).unwrap();
        assert_eq!(
            reloaded.data().get("todos").unwrap(),
            &json!([{ "id": 1, "done": true }])
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_creates_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, json!({ "todos": [{ "id": 1 }] }).to_string()).unwrap();
        let handle = StoreHandle::new(JsonStore::load(&path).unwrap());

        let tasks: Vec<_> = (0..8)
            .map(|n| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    let mut args = Map::new();
                    args.insert("title".to_string(), json!(format!("todo {n}")));
                    handle.create("todos", &args).await.unwrap()
                })
            })
            .collect();
        let mut ids = Vec::new();
        for task in tasks {
            let record = task.await.unwrap();
            ids.push(record.get("id").and_then(Value::as_i64).unwrap());
        }

        // each create saw the previous one's append
        ids.sort_unstable();
        assert_eq!(ids, (2..=9).collect::<Vec<_>>());

        // the in-memory view and the file agree on the final state
        let snapshot = handle.snapshot().await;
        let reloaded = JsonStore::load(&path).unwrap();
        assert_eq!(&snapshot, reloaded.data());
        assert_eq!(reloaded.all("todos").unwrap().len(), 9);
    }

    #[rstest]
    #[case(json!(null), false)]
    #[case(json!(false), false)]
    #[case(json!(0), false)]
    #[case(json!(0.0), false)]
    #[case(json!(""), false)]
    #[case(json!(true), true)]
    #[case(json!(1), true)]
    #[case(json!(-1), true)]
    #[case(json!("abc"), true)]
    #[case(json!([]), true)]
    #[case(json!({}), true)]
    fn test_is_truthy(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(is_truthy(&value), expected);
    }

    #[rstest]
    #[case(json!([{ "id": 1 }, { "id": 7 }]), 8)]
    #[case(json!([{ "id": 90.0 }]), 91)]
    fn test_next_id(#[case] rows: Value, #[case] expected: i64) {
        let rows = rows.as_array().unwrap().clone();
        assert_eq!(next_id("todos", &rows).unwrap(), expected);
    }
}
