pub mod app;
pub mod codec;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod repro;
pub mod routes;
pub mod schema;
pub mod value;

// Re-export commonly used items for tests
pub use app::create_app;
pub use errors::{AppError, AppResult};
pub use value::{Row, Value};
