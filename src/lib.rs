//! ONLV bill-of-quantities documents
//!
//! Parses compact position identifiers, projects the nested ONLV tree onto an
//! ordered flat list for display and search, and writes edits made on that
//! list back into the tree.

pub mod domain;
pub use domain::{ChangeDetector, Config, Document, Identifier};

/// The flat, addressable projection of a document.
pub mod flat;
pub use flat::{FlatItem, flatten};

/// Updates and insertions addressed through the flat projection.
pub mod editor;
pub use editor::{PositionAddress, PositionManager};

/// JSON file storage for documents.
pub mod storage;
