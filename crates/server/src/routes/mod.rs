pub mod admin;
pub mod connectors;
