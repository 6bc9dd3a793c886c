pub mod availability_cache;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod marketplace_client;
pub mod refresh_state_repository;
pub mod storage;
