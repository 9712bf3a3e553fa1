pub mod applications;
pub mod backend;
pub mod config;
pub mod connectors;
pub mod ingest;
pub mod mime;
pub mod models;
pub mod output;
