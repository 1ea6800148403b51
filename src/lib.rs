//! Job application tracking: the record model, status rules, list filtering
//! and the service the command line drives.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod service;
pub mod status;
pub mod store;
pub mod validate;

pub use error::{Error, FieldError, Result, StorageError, ValidationError};
pub use models::{
    Application, ApplicationDraft, ApplicationId, ApplicationInput, ApplicationPatch, TagsInput,
};
pub use service::ApplicationService;
pub use status::{Priority, Status};
pub use store::{MemoryStore, Store};
