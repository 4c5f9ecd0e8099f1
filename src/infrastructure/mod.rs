pub mod config;
pub mod credential_store;
pub mod error;
pub mod plan_client;
pub mod plan_mapper;
