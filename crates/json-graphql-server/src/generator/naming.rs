//! Collection-name to GraphQL-type-name derivation.

use pluralizer::pluralize;

/// Uppercases the first character, leaving the rest unchanged.
pub(crate) fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Singular, capitalized type name for a collection: `users` becomes `User`.
pub(crate) fn type_name(collection: &str) -> String {
    capitalize(&pluralize(collection, 1, false))
}

/// Plural of the singular type name: `users` becomes `Users`, `people`
/// becomes `People`.
pub(crate) fn plural_type_name(collection: &str) -> String {
    pluralize(&type_name(collection), 2, false)
}
