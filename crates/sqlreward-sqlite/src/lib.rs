//! # sqlreward-sqlite
//!
//! SQLite support for `sqlreward-core`.
//!
//! - [`SqliteDialect`] accepts SQLite's identifier quoting
//!   (`"name"`, `` `name` `` and `[name]`) and its `==` equality
//!   operator. See [SQLite keywords].
//! - [`SqliteConnection`] runs queries over `rusqlite` so that
//!   equivalence can be decided on actual result sets. Only
//!   [read-only statements] are executed; lock waits are bounded
//!   by the [busy timeout].
//!
//! [SQLite keywords]: https://www.sqlite.org/lang_keywords.html
//! [read-only statements]: https://www.sqlite.org/c3ref/stmt_readonly.html
//! [busy timeout]: https://www.sqlite.org/c3ref/busy_timeout.html
//!
//! ## Example
//!
//! ```rust
//! use sqlreward_core::execution::{self, Connection};
//! use sqlreward_sqlite::SqliteConnection;
//!
//! let conn = rusqlite::Connection::open_in_memory().unwrap();
//! conn.execute_batch("CREATE TABLE t (a INTEGER); INSERT INTO t VALUES (1), (2);")
//!     .unwrap();
//! let mut conn = SqliteConnection::new(conn);
//!
//! let outcome = execution::compare(
//!     "SELECT a FROM t ORDER BY a DESC",
//!     "SELECT a FROM t",
//!     &mut conn,
//!     false,
//! );
//! assert!(outcome.matched);
//! assert!(conn.query("DROP TABLE t").is_err());
//! ```

mod connection;
mod dialect;

pub use connection::SqliteConnection;
pub use dialect::SqliteDialect;
