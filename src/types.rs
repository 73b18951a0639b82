pub mod locality;
pub mod reading;

// Re-export types for convenience.
pub use crate::types::locality::{Coordinates, Locality};
pub use crate::types::reading::{LocalityId, Reading};
