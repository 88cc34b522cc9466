pub mod client;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod poller;
pub mod rest;
pub mod search;
pub mod store;
pub mod validate;
pub mod view;
