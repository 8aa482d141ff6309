//! Instance storage and access enforcement for the Opal runtime.
//!
//! Where `opal_layout` decides *where* a field lives, this crate is the
//! contract over that storage at run time:
//!
//! - a flattened cell is never null: it reads as the type's default value
//!   before any explicit write, and a null write fails before any byte of
//!   the cell changes;
//! - a boxed cell is an ordinary nullable reference slot: null is always
//!   legal, reads return the stored reference verbatim.
//!
//! Every access path — direct field access, access by name, dynamic
//! [`FieldHandle`]s, static fields, and array elements — funnels into the
//! same `cell` read/write functions, so the enforcement point is the cell
//! itself, not any particular call path.
//!
//! Instances are owned values; boxed cells hold [`GcRef`] (`Arc`)
//! references that are immutable once stored. The crate imposes no
//! locking: callers that share a mutable instance across threads
//! synchronize it themselves, exactly as for ordinary field access.

mod array;
mod bits;
mod cell;
mod default;
mod error;
mod handle;
mod heap;
mod instance;
mod value;

pub use array::{ReprKind, ValueArray};
pub use error::{AccessError, AccessResult};
pub use handle::FieldHandle;
pub use heap::Heap;
pub use instance::Instance;
pub use value::{GcRef, Value};
