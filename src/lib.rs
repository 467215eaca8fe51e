// Library exports for popquery

pub mod config;
pub mod data;
pub mod error;
pub mod ingest;
pub mod projection;
pub mod query;
pub mod service;
pub mod shape;
pub mod store;

pub use config::Config;
pub use error::{IngestionError, NoDataForChart, QueryError, StoreError};
pub use service::{QueryResponse, Service};
pub use shape::ChartKind;
