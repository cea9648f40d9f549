//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They are
//! responsible for:
//! - Validating and normalising input
//! - Enforcing uniqueness and delete-protection rules
//! - Translating repository failures into typed [`ServiceError`]s

pub mod category;
pub mod classification;
pub mod error;
pub mod news;
pub mod tag;
pub mod upload;

pub use category::CategoryService;
pub use classification::ClassificationService;
pub use error::{EntityKind, ServiceError};
pub use news::NewsService;
pub use tag::TagService;
pub use upload::{ImageStore, StoredImage, UploadError};
