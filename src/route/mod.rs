//! Operation routes
//!
//! Only the read side lives here: resolving route references on the write
//! path, tolerant of replication and visibility lag.

pub mod repository;
pub mod resolver;
pub mod types;

pub use repository::{OperationRouteRepository, PgOperationRouteRepository};
pub use resolver::RouteResolver;
pub use types::{OperationRoute, OperationType};
