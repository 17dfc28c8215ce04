pub mod compatibility;
pub mod connector_ingest;
pub mod database_validator;
pub mod permissions;
pub mod relationship_sync;
