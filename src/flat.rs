//! The flat projection of an ONLV document.
//!
//! Display and search work on an ordered list of [`FlatItem`]s rather than on
//! the nested tree. The list is derived from the tree and regenerated after
//! every edit; it is never patched.

mod flatten;
mod item;
mod search;

pub use flatten::{Flattener, flatten};
pub use item::{FlatItem, ItemData, ItemKind};
pub use search::search;
