//! Reading and writing ONLV JSON files.

mod file;

pub use file::{LoadError, load, save};
