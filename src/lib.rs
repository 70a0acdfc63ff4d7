pub mod classifier;
pub mod config;
pub mod db;
pub mod drafting;
pub mod error;
pub mod import;
pub mod models;
pub mod routes;
pub mod schema;
pub mod state;
pub mod templates;
pub mod utils;

pub use classifier::{classify, Classification, Intent};
pub use drafting::{generate_draft, DraftResult, TemplateLookup};
