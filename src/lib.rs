// Library for the binary and integration tests

pub mod aggregator;
pub mod config;
pub mod counter_client;
pub mod models;
pub mod poller;
pub mod rate;
pub mod routes;
pub mod series;
pub mod snapshot_store;
