pub mod aggregator;
pub mod browse;
pub mod config;
pub mod contract;
pub mod controller;
pub mod kv_store;
pub mod logging;
pub mod model;
pub mod notify;
pub mod preferences;
pub mod query_engine;
pub mod recents;
pub mod runtime;
pub mod selection;
pub mod session;
pub mod transfer;
pub mod transport;
