//! LLMO brand-presence data: CDN sync into Postgres and the reporting views.

pub mod cdn;
pub mod import;
pub mod models;
pub mod schema;
pub mod sources;

pub use cdn::{CdnClient, DEFAULT_CDN_BASE_URL};
pub use import::{ImportOptions, ImportSummary, sync_site};
pub use sources::{SourceClassifier, SourceType};
