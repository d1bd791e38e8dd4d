pub mod errors;
pub mod generator;
pub mod schema;
pub mod server;
pub mod store;
