//! Binds the generated descriptors and resolver table to an executable
//! schema.
//!
//! Collection types are only known at runtime, so the schema is assembled
//! dynamically: one object type per collection whose field resolvers read
//! from the parent record, plus root `Query` and `Mutation` objects whose
//! fields delegate to the generated resolvers.

use async_graphql::Value as GqlValue;
use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Object, ResolverContext, Schema, TypeRef,
};
use serde_json::{Map, Value};

use crate::errors::ServerError;
use crate::generator::{CollectionDescriptor, FieldDef, FieldMode, Resolver, ResolverTable};
use crate::store::StoreHandle;

/// Builds the executable schema over a store handle. Every root field is
/// backed by an entry in the resolver table.
pub fn build_schema(
    descriptors: &[CollectionDescriptor],
    table: &ResolverTable,
    store: StoreHandle,
) -> Result<Schema, ServerError> {
    let mut query = Object::new("Query");
    let mut mutation = Object::new("Mutation");
    let mut builder = Schema::build("Query", Some("Mutation"), None);

    for descriptor in descriptors {
        builder = builder.register(record_object(descriptor));
        query = query
            .field(all_field(descriptor, table, &store)?)
            .field(by_id_field(descriptor, table, &store)?);
        mutation = mutation
            .field(create_field(descriptor, table, &store)?)
            .field(update_field(descriptor, table, &store)?)
            .field(delete_field(descriptor, table, &store)?);
    }

    builder
        .register(query)
        .register(mutation)
        .finish()
        .map_err(|err| ServerError::Schema(err.to_string()))
}

/// Object type whose field resolvers read scalars out of a stored record.
fn record_object(descriptor: &CollectionDescriptor) -> Object {
    let mut object = Object::new(descriptor.type_name.clone());
    for field_def in &descriptor.fields {
        let name = field_def.name.clone();
        object = object.field(Field::new(
            field_def.name.clone(),
            scalar_ref(field_def, FieldMode::Create),
            move |ctx| {
                let name = name.clone();
                FieldFuture::new(async move {
                    let record = ctx.parent_value.try_downcast_ref::<Value>()?;
                    match record.get(&name) {
                        None | Some(Value::Null) => Ok(None),
                        Some(value) => {
                            Ok(Some(FieldValue::value(GqlValue::from_json(value.clone())?)))
                        }
                    }
                })
            },
        ));
    }
    object
}

fn all_field(
    descriptor: &CollectionDescriptor,
    table: &ResolverTable,
    store: &StoreHandle,
) -> Result<Field, ServerError> {
    let resolver = query_resolver(table, &descriptor.all_field())?;
    let store = store.clone();
    Ok(Field::new(
        descriptor.all_field(),
        TypeRef::named_list_nn(descriptor.type_name.clone()),
        move |_ctx| {
            let resolver = resolver.clone();
            let store = store.clone();
            FieldFuture::new(async move {
                match resolver.execute(&store, &Map::new()).await? {
                    Value::Array(rows) => Ok(Some(FieldValue::list(
                        rows.into_iter().map(FieldValue::owned_any),
                    ))),
                    _ => Err(shape_error("a list")),
                }
            })
        },
    ))
}

fn by_id_field(
    descriptor: &CollectionDescriptor,
    table: &ResolverTable,
    store: &StoreHandle,
) -> Result<Field, ServerError> {
    let resolver = query_resolver(table, descriptor.by_id_field())?;
    let store = store.clone();
    Ok(Field::new(
        descriptor.by_id_field().to_string(),
        TypeRef::named(descriptor.type_name.clone()),
        move |ctx| {
            let resolver = resolver.clone();
            let store = store.clone();
            FieldFuture::new(async move {
                let args = json_args(&ctx)?;
                record_result(resolver.execute(&store, &args).await?)
            })
        },
    )
    .argument(InputValue::new("id", TypeRef::named(TypeRef::INT))))
}

fn create_field(
    descriptor: &CollectionDescriptor,
    table: &ResolverTable,
    store: &StoreHandle,
) -> Result<Field, ServerError> {
    let resolver = mutation_resolver(table, &descriptor.create_field())?;
    let store = store.clone();
    let mut field = Field::new(
        descriptor.create_field(),
        TypeRef::named_nn(descriptor.type_name.clone()),
        move |ctx| {
            let resolver = resolver.clone();
            let store = store.clone();
            FieldFuture::new(async move {
                let args = json_args(&ctx)?;
                record_result(resolver.execute(&store, &args).await?)
            })
        },
    );
    for field_def in &descriptor.fields {
        field = field.argument(InputValue::new(
            field_def.name.clone(),
            scalar_ref(field_def, FieldMode::Create),
        ));
    }
    Ok(field)
}

fn update_field(
    descriptor: &CollectionDescriptor,
    table: &ResolverTable,
    store: &StoreHandle,
) -> Result<Field, ServerError> {
    let resolver = mutation_resolver(table, &descriptor.update_field())?;
    let store = store.clone();
    let mut field = Field::new(
        descriptor.update_field(),
        TypeRef::named(descriptor.type_name.clone()),
        move |ctx| {
            let resolver = resolver.clone();
            let store = store.clone();
            FieldFuture::new(async move {
                let args = json_args(&ctx)?;
                record_result(resolver.execute(&store, &args).await?)
            })
        },
    );
    for field_def in &descriptor.fields {
        field = field.argument(InputValue::new(
            field_def.name.clone(),
            scalar_ref(field_def, FieldMode::Update),
        ));
    }
    Ok(field)
}

fn delete_field(
    descriptor: &CollectionDescriptor,
    table: &ResolverTable,
    store: &StoreHandle,
) -> Result<Field, ServerError> {
    let resolver = mutation_resolver(table, &descriptor.delete_field())?;
    let store = store.clone();
    Ok(Field::new(
        descriptor.delete_field(),
        TypeRef::named_nn(TypeRef::BOOLEAN),
        move |ctx| {
            let resolver = resolver.clone();
            let store = store.clone();
            FieldFuture::new(async move {
                let args = json_args(&ctx)?;
                match resolver.execute(&store, &args).await? {
                    Value::Bool(removed) => Ok(Some(FieldValue::value(removed))),
                    _ => Err(shape_error("a boolean")),
                }
            })
        },
    )
    .argument(InputValue::new("id", TypeRef::named(TypeRef::INT))))
}

/// Request arguments as plain JSON, in the order the request listed them.
fn json_args(ctx: &ResolverContext<'_>) -> async_graphql::Result<Map<String, Value>> {
    let mut args = Map::new();
    for (name, value) in ctx.args.as_index_map() {
        args.insert(name.to_string(), value.clone().into_json()?);
    }
    Ok(args)
}

fn record_result<'a>(value: Value) -> async_graphql::Result<Option<FieldValue<'a>>> {
    match value {
        Value::Null => Ok(None),
        record @ Value::Object(_) => Ok(Some(FieldValue::owned_any(record))),
        _ => Err(shape_error("a record")),
    }
}

fn shape_error(expected: &str) -> async_graphql::Error {
    async_graphql::Error::new(format!("resolver did not produce {expected}"))
}

fn query_resolver(table: &ResolverTable, field: &str) -> Result<Resolver, ServerError> {
    table
        .query_resolver(field)
        .cloned()
        .ok_or_else(|| ServerError::MissingResolver(field.to_string()))
}

fn mutation_resolver(table: &ResolverTable, field: &str) -> Result<Resolver, ServerError> {
    table
        .mutation_resolver(field)
        .cloned()
        .ok_or_else(|| ServerError::MissingResolver(field.to_string()))
}

fn scalar_ref(field_def: &FieldDef, mode: FieldMode) -> TypeRef {
    let name = field_def.scalar.as_str();
    if field_def.required(mode) {
        TypeRef::named_nn(name)
    } else {
        TypeRef::named(name)
    }
}
