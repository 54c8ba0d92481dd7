//! # Store
//!
//! SQLite persistence for readings.
//!
//! One `sensor_data` table, one row per consumed message. `SqliteStore`
//! implements the `ReadingStore` contract used by the ingest consumer and the
//! read/CRUD API used by the `query` command:
//!
//! - `list(filter, page)` / `count(filter)`
//! - `get` / `create` / `update` / `delete` by row id

mod model;
mod query;
mod sqlite;

pub use model::{NewReading, StoredReading};
pub use query::{Page, ReadingFilter, DEFAULT_LIMIT, MAX_LIMIT};
pub use sqlite::SqliteStore;
