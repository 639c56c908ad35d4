//! # grag-context
//!
//! The Context Packer (C9): a deterministic, budget-bounded serializer that
//! turns retrieved documents/entities/relationships into the text payload
//! sent to the LLM as the Ask path's user message. Documents precede
//! entities precede relationships; the whole output never exceeds
//! [`packer::MAX_CONTEXT_CHARS`].

pub mod packer;

pub mod prelude {
    pub use crate::packer::{pack, PackSummary, PackedContext, MAX_CONTEXT_CHARS};
}

pub use prelude::*;
