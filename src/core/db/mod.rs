/// Database Module
///
/// This module provides the database access core of sqlscout, organized
/// into focused submodules for separation of concerns.
///
/// ## Architecture
///
/// The database layer is split into four main concerns:
/// - **Connection Management** (`connection.rs`): Path validation, plain and
///   encrypted opens with key-format negotiation, performance pragmas
/// - **Schema Introspection** (`schema.rs`): Live-catalog whitelisting and
///   column/primary-key metadata
/// - **Query Execution** (`query.rs`): Paginated reads, statement
///   classification, and total-count derivation
/// - **Mutations** (`mutation.rs`): Parameterized insert/update/delete/drop
///   primitives keyed on the discovered primary key
///
/// ## Error Handling
///
/// All database operations use the standardized `ScoutError` type for
/// consistent error propagation.
pub mod connection;
pub mod mutation;
pub mod query;
pub mod schema;

pub use connection::*;
pub use mutation::*;
pub use query::*;
pub use schema::*;
