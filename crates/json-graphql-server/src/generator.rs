//! Schema generation from seed records.
//!
//! Every collection in the store gets one object type, two query fields,
//! and three mutation fields. The first record of a collection is
//! authoritative for its field set and scalar types; later records are
//! only checked for a truthy `id`.

mod fields;
mod naming;
mod resolvers;

pub use fields::{FieldDef, FieldMode, ScalarType};
pub use resolvers::{Resolver, ResolverTable};

use serde_json::{Map, Value};

use crate::errors::GeneratorError;
use crate::store::{JsonStore, is_truthy};

/// Everything derived from one collection's first record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDescriptor {
    pub collection: String,
    pub type_name: String,
    pub plural_type_name: String,
    pub fields: Vec<FieldDef>,
}

impl CollectionDescriptor {
    /// Root field listing the whole collection: `allUsers`.
    pub fn all_field(&self) -> String {
        format!("all{}", self.plural_type_name)
    }

    /// Root field fetching one record by id: `User`.
    pub fn by_id_field(&self) -> &str {
        &self.type_name
    }

    /// `createUser`
    pub fn create_field(&self) -> String {
        format!("create{}", self.type_name)
    }

    /// `updateUser`
    pub fn update_field(&self) -> String {
        format!("update{}", self.type_name)
    }

    /// `deleteUser`
    pub fn delete_field(&self) -> String {
        format!("delete{}", self.type_name)
    }

    /// The argument list for the given mode: `id: Int, email: String!`.
    pub fn signature(&self, mode: FieldMode) -> String {
        fields::signature(&self.fields, mode)
    }
}

/// Derives SDL text and a resolver table from a loaded store.
///
/// Nothing is cached: each call re-reads the store it borrows, so two
/// calls over the same data produce identical output.
pub struct SchemaGenerator<'a> {
    store: &'a JsonStore,
}

impl<'a> SchemaGenerator<'a> {
    pub fn new(store: &'a JsonStore) -> Self {
        Self { store }
    }

    /// One descriptor per collection, in file order.
    pub fn descriptors(&self) -> Result<Vec<CollectionDescriptor>, GeneratorError> {
        let data = self.store.data();
        if data.is_empty() {
            return Err(GeneratorError::EmptyStore);
        }
        data.iter()
            .map(|(collection, rows)| describe(collection, rows))
            .collect()
    }

    /// The SDL for `Query`, `Mutation`, and one object type per collection.
    pub fn type_defs(&self) -> Result<String, GeneratorError> {
        Ok(render_type_defs(&self.descriptors()?))
    }

    /// Resolvers for every root field named in the SDL.
    pub fn resolvers(&self) -> Result<ResolverTable, GeneratorError> {
        let mut table = ResolverTable::default();
        for descriptor in self.descriptors()? {
            let collection = descriptor.collection.clone();
            table.query.insert(
                descriptor.all_field(),
                Resolver::All {
                    collection: collection.clone(),
                },
            );
            table.query.insert(
                descriptor.by_id_field().to_string(),
                Resolver::ById {
                    collection: collection.clone(),
                },
            );
            table.mutation.insert(
                descriptor.create_field(),
                Resolver::Create {
                    collection: collection.clone(),
                },
            );
            table.mutation.insert(
                descriptor.update_field(),
                Resolver::Update {
                    collection: collection.clone(),
                },
            );
            table.mutation.insert(
                descriptor.delete_field(),
                Resolver::Delete { collection },
            );
        }
        Ok(table)
    }
}

fn describe(collection: &str, rows: &Value) -> Result<CollectionDescriptor, GeneratorError> {
    let first = valid_seeds(collection, rows)?;
    Ok(CollectionDescriptor {
        collection: collection.to_string(),
        type_name: naming::type_name(collection),
        plural_type_name: naming::plural_type_name(collection),
        fields: fields::infer_fields(collection, first)?,
    })
}

/// Seeds are valid when the collection is a non-empty array whose every
/// record has a truthy `id`. Returns the first record.
fn valid_seeds<'v>(
    collection: &str,
    rows: &'v Value,
) -> Result<&'v Map<String, Value>, GeneratorError> {
    let invalid = || GeneratorError::InvalidSeeds(collection.to_string());
    let rows = rows.as_array().ok_or_else(invalid)?;
    if !rows.iter().all(|row| row.get("id").is_some_and(is_truthy)) {
        return Err(invalid());
    }
    rows.first()
        .and_then(Value::as_object)
        .ok_or_else(invalid)
}

fn render_type_defs(descriptors: &[CollectionDescriptor]) -> String {
    let mut sdl = String::from("type Query {\n");
    for d in descriptors {
        sdl.push_str(&format!("  {}: [{}]!\n", d.all_field(), d.type_name));
        sdl.push_str(&format!("  {}(id: Int): {}\n", d.by_id_field(), d.type_name));
    }
    sdl.push_str("}\n\ntype Mutation {\n");
    for d in descriptors {
        sdl.push_str(&format!(
            "  {}({}): {}!\n",
            d.create_field(),
            d.signature(FieldMode::Create),
            d.type_name
        ));
        sdl.push_str(&format!(
            "  {}({}): {}\n",
            d.update_field(),
            d.signature(FieldMode::Update),
            d.type_name
        ));
        sdl.push_str(&format!("  {}(id: Int): Boolean!\n", d.delete_field()));
    }
    sdl.push_str("}\n");
    for d in descriptors {
        sdl.push_str(&format!("\ntype {} {{\n", d.type_name));
        for field in &d.fields {
            let bang = if field.required(FieldMode::Create) { "!" } else { "" };
            sdl.push_str(&format!("  {}: {}{bang}\n", field.name, field.scalar));
        }
        sdl.push_str("}\n");
    }
    sdl
}
