//! Reactive table and form client for the inventory API.
//!
//! Controllers own their state and a single event channel; debounce timers
//! and network calls run as spawned tasks that post generation-tagged events
//! back, so late replies can be recognised and dropped.

pub mod api;
pub mod cascade;
pub mod debounce;
pub mod dropdown;
pub mod error;
pub mod field;
pub mod form;
pub mod source;
pub mod store;
pub mod table;
pub mod views;

pub use api::ApiClient;
pub use error::ClientError;
pub use field::{Field, FieldKind, FieldState, FieldValue, Tone};
pub use form::{Form, FormContext, FormEvent};
pub use source::{FeedbackSource, ListPage, RecordSource, TableSource};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use table::{Cell, Column, PageHelper, TableController};
