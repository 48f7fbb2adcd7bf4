//! Trusted places: geographic points and Wi-Fi networks in which motion is
//! not treated as theft.

mod place;
mod set;

pub use place::{GeoPoint, PlaceKind, TrustedPlace};
pub use set::TrustedPlaceSet;
