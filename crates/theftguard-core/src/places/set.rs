use serde::{Deserialize, Serialize};

use super::place::{GeoPoint, PlaceKind, TrustedPlace};
use crate::error::ValidationError;

/// Ordered collection of trusted places.
///
/// Order is kept for display only; evaluation treats the set as unordered.
/// Every mutation is whole-set: callers persist the full sequence afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustedPlaceSet {
    places: Vec<TrustedPlace>,
}

impl TrustedPlaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrustedPlace> {
        self.places.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrustedPlace> {
        self.places.iter()
    }

    pub fn add(&mut self, place: TrustedPlace) -> usize {
        self.places.push(place);
        self.places.len() - 1
    }

    pub fn rename(&mut self, index: usize, label: &str) -> Result<(), ValidationError> {
        let slot = self.slot_mut(index)?;
        *slot = slot.relabeled(label)?;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<TrustedPlace, ValidationError> {
        self.check_index(index)?;
        Ok(self.places.remove(index))
    }

    /// Entries of one kind, paired with their index in the full set.
    pub fn filter(&self, kind: PlaceKind) -> Vec<(usize, &TrustedPlace)> {
        self.places
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind() == kind)
            .collect()
    }

    pub fn location_points(&self) -> impl Iterator<Item = &GeoPoint> {
        self.places.iter().filter_map(|p| match p {
            TrustedPlace::Location { point, .. } => Some(point),
            TrustedPlace::Wifi { .. } => None,
        })
    }

    pub fn wifi_ssids(&self) -> impl Iterator<Item = &str> {
        self.places.iter().filter_map(|p| match p {
            TrustedPlace::Wifi { ssid, .. } => Some(ssid.as_str()),
            TrustedPlace::Location { .. } => None,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn check_index(&self, index: usize) -> Result<(), ValidationError> {
        if index >= self.places.len() {
            return Err(ValidationError::OutOfBounds {
                collection: "trusted places".into(),
                index,
                len: self.places.len(),
            });
        }
        Ok(())
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut TrustedPlace, ValidationError> {
        self.check_index(index)?;
        Ok(&mut self.places[index])
    }
}

impl From<Vec<TrustedPlace>> for TrustedPlaceSet {
    fn from(places: Vec<TrustedPlace>) -> Self {
        Self { places }
    }
}

impl FromIterator<TrustedPlace> for TrustedPlaceSet {
    fn from_iter<I: IntoIterator<Item = TrustedPlace>>(iter: I) -> Self {
        Self {
            places: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TrustedPlaceSet {
    type Item = &'a TrustedPlace;
    type IntoIter = std::slice::Iter<'a, TrustedPlace>;

    fn into_iter(self) -> Self::IntoIter {
        self.places.iter()
    }
}
