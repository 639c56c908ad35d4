//! # grag-store
//!
//! The Graph/Vector Store Provider contract (C3): a single [`GraphStore`]
//! capability set satisfied identically by a server-style backend with a
//! native vector index ([`surreal::SurrealStore`], feature `surreal`) and an
//! embedded backend with no vector index ([`embedded::EmbeddedStore`],
//! feature `embedded`) that falls back to the in-memory cosine scan in
//! [`fallback`].

pub mod error;
pub mod fallback;
pub mod model;
pub mod traits;

#[cfg(feature = "embedded")]
pub mod embedded;

#[cfg(feature = "surreal")]
pub mod surreal;

pub mod prelude {
    pub use crate::error::{Result, StoreError};
    pub use crate::model::{
        DeleteOutcome, ListQuery, NewEntity, NewRelationship, Subgraph, SubgraphQuery,
        VectorSearchParams,
    };
    pub use crate::traits::GraphStore;

    #[cfg(feature = "embedded")]
    pub use crate::embedded::EmbeddedStore;

    #[cfg(feature = "surreal")]
    pub use crate::surreal::SurrealStore;
}

pub use prelude::*;
