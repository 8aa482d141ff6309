//! Layout planning errors.
//!
//! All variants are fatal for the type being prepared: the planner never
//! recovers from them internally and never publishes a partial layout.

use thiserror::Error;

/// Fatal error at type-preparation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// A field's declared type is the unresolved sentinel or names no
    /// registered, finalized type.
    #[error("field `{owner}.{field}` has an unresolved type")]
    UnresolvedFieldType { owner: String, field: String },

    /// A value type declares a flattenable instance field of its own
    /// type. There is no terminating indirection: the inline size would
    /// be unbounded.
    #[error("value type `{ty}` cannot flatten a field of its own type (cycle: {chain})")]
    UnterminatedFlatteningCycle { ty: String, chain: String },

    /// Planning was requested for a type the registry has not finalized
    /// (or does not know at all). Preparation must finalize first.
    #[error("type `{ty}` is not registered or not finalized")]
    TypeNotFinalized { ty: String },
}
