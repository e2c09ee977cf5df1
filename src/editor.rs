//! Structural edits of ONLV documents.
//!
//! Positions are addressed by their flat-item id ([`PositionAddress`]); new
//! hierarchy nodes by the numbers of their ancestors.

mod address;
mod extract;
mod manager;

pub use address::{AddressError, PositionAddress};
pub use extract::extract;
pub use manager::{
    InsertError, Insertion, Level, LookupError, MAX_STICHWORT_LEN, NewGroup, NewGrundtext,
    NewPosition, NextStep, PositionManager, PositionUpdate, UpdateError,
};
