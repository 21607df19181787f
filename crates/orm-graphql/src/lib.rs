//! GraphQL adapter for client-side object-relational stores.
//!
//! Given the declarative model definitions of a host store (entities with
//! scalar attributes and typed relations), the adapter derives a query or
//! mutation document for each store action, executes it through a transport,
//! and maps the response back into the store's normalized shape.
//!
//! As an example, given a `user` entity with a `posts` connection, fetching
//! all users sends:
//!
//! ```text
//! query Users {
//!   users {
//!     nodes {
//!       id
//!       name
//!       posts {
//!         nodes {
//!           id
//!           title
//!         }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! and the response is flattened back into `{users: [{id: 1, posts: [...]}]}`
//! with connection wrappers removed, relation keys re-inflected and ids
//! coerced to integers.
//!
//! The host store and the transport are consumed through the [`EntityStore`]
//! and [`GraphqlTransport`] traits; [`HttpTransport`] is a ready-made
//! `reqwest`-backed transport with response caching for queries.

pub mod adapter;
pub mod arguments;
mod error;
pub mod inflect;
pub mod model;
pub mod query;
pub mod store;
pub mod transform;
pub mod transport;

pub use adapter::GraphqlAdapter;
pub use error::Error;
pub use model::{EntitySchema, FieldKind, ModelDescriptor, ModelRegistry};
pub use query::{MutationAction, OperationKind, PreparedOperation, QueryBuilder};
pub use store::EntityStore;
pub use transform::Transformer;
pub use transport::{CachePolicy, GraphqlError, GraphqlTransport, HttpTransport, TransportError};
