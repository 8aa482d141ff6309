//! Field layout planning for the Opal runtime.
//!
//! Given a finalized type descriptor, the [`LayoutPlanner`] decides for
//! every declared field whether its storage is *flattened* (an inline
//! byte range in the owner, never null) or *boxed* (a nullable reference
//! slot), and publishes the result as an immutable [`TypeLayout`].
//!
//! Planning runs once per type at preparation time, before any instance
//! exists. A published layout is shared read-only by every instance; the
//! planner never allocates instances itself.
//!
//! # Flattening rules
//!
//! A field is flattened iff all of the following hold:
//! - the field is declared flattenable (scalars always are),
//! - the field's type has a defined flattened size not exceeding the
//!   configured [`LayoutConfig::max_flat_size`],
//! - the field's type is not currently being laid out (cycle guard), and
//!   the flattening chain is not deeper than
//!   [`LayoutConfig::max_flatten_depth`].
//!
//! Everything else becomes a boxed reference slot. A value type declaring
//! a flattenable instance field of its own type has no terminating
//! indirection at declaration level and is rejected outright.

mod config;
mod error;
mod placement;
mod planner;

pub use config::LayoutConfig;
pub use error::LayoutError;
pub use placement::{FieldPlacement, FieldRef, FieldSlot, LayoutRegion, TypeLayout};
pub use planner::LayoutPlanner;
