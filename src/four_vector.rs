use noisy_float::prelude::*;
use serde::{Deserialize, Serialize};

/// A basic four-vector
///
/// The zero component is the energy component. The remainder are the
/// spatial components, with the third axis along the beam.
#[derive(
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Clone,
    Copy,
    Default,
)]
pub struct FourVector {
    pt: N64,
    p: [N64; 4],
}

impl FourVector {
    /// Construct a new four-vector
    pub fn new() -> Self {
        Self::default()
    }

    /// The spatial norm \sqrt{\sum v_i^2} with i = 1,2,3
    pub fn spatial_norm(&self) -> N64 {
        self.spatial_norm_sq().sqrt()
    }

    /// The square \sum v_i^2 with i = 1,2,3 of the spatial norm
    pub fn spatial_norm_sq(&self) -> N64 {
        self.p.iter().skip(1).map(|e| *e * *e).sum()
    }

    /// The scalar transverse momentum
    pub fn pt(&self) -> N64 {
        self.pt
    }

    /// The azimuthal angle
    pub fn phi(&self) -> N64 {
        self.p[2].atan2(self.p[1])
    }

    /// The pseudorapidity
    ///
    /// Diverges for momenta along the beam axis.
    pub fn eta(&self) -> N64 {
        let p = self.spatial_norm();
        ((p + self.p[3]) / (p - self.p[3])).ln() / 2.
    }

    /// The rapidity
    pub fn rapidity(&self) -> N64 {
        ((self.p[0] + self.p[3]) / (self.p[0] - self.p[3])).ln() / 2.
    }

    fn update_pt(&mut self) {
        self.pt = (self.p[1] * self.p[1] + self.p[2] * self.p[2]).sqrt();
    }

    /// The invariant mass \sqrt{v_0^2 - \sum v_i^2} with i = 1,2,3
    pub fn m(&self) -> N64 {
        self.m_sq().sqrt()
    }

    /// The invariant mass square v_0^2 - \sum v_i^2 with i = 1,2,3
    pub fn m_sq(&self) -> N64 {
        self.p[0] * self.p[0] - self.spatial_norm_sq()
    }
}

impl std::convert::From<[N64; 4]> for FourVector {
    fn from(p: [N64; 4]) -> FourVector {
        let mut res = FourVector {
            p,
            pt: std::default::Default::default(),
        };
        res.update_pt();
        res
    }
}

impl std::convert::From<[f64; 4]> for FourVector {
    fn from(p: [f64; 4]) -> FourVector {
        let p = [n64(p[0]), n64(p[1]), n64(p[2]), n64(p[3])];
        p.into()
    }
}

impl std::ops::Index<usize> for FourVector {
    type Output = N64;

    fn index(&self, i: usize) -> &Self::Output {
        &self.p[i]
    }
}
