pub mod manager;
pub mod models;
pub mod query_builder;
