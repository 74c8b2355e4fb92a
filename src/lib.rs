//! Storage and scheduling core for a spaced-repetition flashcard system.
//!
//! Users keep **notes** (bags of keyed attributes) under a **model**; each
//! model's **templates** turn a note into reviewable **cards**, and a fixed
//! interval ladder decides when each card comes back.
//!
//! | Entity | Owns | Deleted with |
//! |--------|------|--------------|
//! | **Model** | templates, notes | - |
//! | **Template** | cards | its model |
//! | **Note** | attrs, cards | its model |
//! | **Attr** | its index entry | its note |
//! | **Card** | review state | its template or note |
//!
//! # Architecture
//!
//! - **Storage**: SQLite through rusqlite, one connection per [`Session`]
//! - **Transactions**: nestable frames on a session (`BEGIN IMMEDIATE` outside,
//!   savepoints inside); dropping a session rolls back whatever is open
//! - **Search**: an FTS5 index over attribute values, kept in step with every
//!   attribute write inside the same transaction
//! - **Scheduling**: a pure level/interval state machine in [`srs`]
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: Database handle, sessions, schema, and health checks
//! - [`entity`]: Entity types, CRUD, and cascading deletes
//! - [`index`]: Attribute full-text index, tokenizers, and search
//! - [`srs`]: Review outcomes, interval schedule, and quiz statistics

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod index;
pub mod srs;

pub use db::{Database, Session};
pub use error::{Error, Result};
