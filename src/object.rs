use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::four_vector::FourVector;

/// Value returned by [PhysicsObject::discriminant] for tags the upstream
/// producer never attached
pub const MISSING_DISCRIMINANT: f64 = -1000.;

/// A reconstructed or generated physics object as delivered by the event
/// source
///
/// Carries the four-momentum components, the catchment area used by the
/// correction lookup, and whatever named float annotations the upstream
/// producers attached (groomed masses, subjettiness, b-tag discriminants).
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct PhysicsObject {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub e: f64,
    #[serde(default)]
    pub area: f64,
    #[serde(default)]
    pub annotations: BTreeMap<String, f64>,
    #[serde(default)]
    pub discriminants: BTreeMap<String, f64>,
}

impl PhysicsObject {
    /// Construct an object with the given momentum components and no
    /// annotations
    pub fn from_momentum(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self {
            px,
            py,
            pz,
            e,
            ..Default::default()
        }
    }

    /// The four-momentum
    pub fn momentum(&self) -> FourVector {
        [self.e, self.px, self.py, self.pz].into()
    }

    /// Look up an upstream float annotation by its exact producer key
    pub fn annotation(&self, key: &str) -> Option<f64> {
        self.annotations.get(key).copied()
    }

    /// Look up a b-tag discriminant by its exact producer key
    ///
    /// Returns [MISSING_DISCRIMINANT] if the key was never attached,
    /// matching the upstream accessor.
    pub fn discriminant(&self, key: &str) -> f64 {
        self.discriminants
            .get(key)
            .copied()
            .unwrap_or(MISSING_DISCRIMINANT)
    }
}

/// A reconstructed primary-vertex candidate
#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Vertex {
    /// Degrees of freedom of the vertex fit
    pub ndof: f64,
    /// Whether the vertex is a fake (beam-spot fallback)
    #[serde(default)]
    pub is_fake: bool,
}

impl Vertex {
    /// Whether this vertex counts towards the pileup vertex multiplicity
    pub fn is_good(&self) -> bool {
        self.ndof > 4. && !self.is_fake
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups() {
        let mut obj = PhysicsObject::from_momentum(3., 4., 0., 5.);
        assert_eq!(f64::from(obj.momentum().pt()), 5.);
        assert_eq!(obj.annotation("ak8PFJetsCHSPrunedMass"), None);
        obj.annotations
            .insert("ak8PFJetsCHSPrunedMass".to_string(), 83.5);
        assert_eq!(obj.annotation("ak8PFJetsCHSPrunedMass"), Some(83.5));
        assert_eq!(
            obj.discriminant("pfCombinedSecondaryVertexV2BJetTags"),
            MISSING_DISCRIMINANT
        );
    }

    #[test]
    fn good_vertices() {
        assert!(Vertex {
            ndof: 5.,
            is_fake: false
        }
        .is_good());
        assert!(!Vertex {
            ndof: 4.,
            is_fake: false
        }
        .is_good());
        assert!(!Vertex {
            ndof: 12.,
            is_fake: true
        }
        .is_good());
    }
}
