use thiserror::Error;

use crate::correction::{
    CorrectionInputs, CorrectionKind, CorrectorBank, CorrectorRegime,
};
use crate::four_vector::FourVector;
use crate::object::PhysicsObject;
use crate::schema::{
    CollectionId, JetAlgo, LeptonKind, Source, JET_VARIABLES,
    LEPTON_VARIABLES,
};
use crate::sink::{SinkError, TabulationSink};
use crate::traits::{Correct, WriteRow};

/// Sentinel written for variables a data source does not provide
pub const SENTINEL: f64 = -1.;

/// Lepton selection threshold
pub const LEPTON_MIN_PT: f64 = 5.;

/// Minimum pt entering the AK8 scalar sum
pub const LARGE_JET_HT_FLOOR: f64 = 150.;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Kinematic {
    Phi,
    Eta,
    Rapidity,
    Px,
    Py,
    Pz,
    Energy,
    Pt,
    Mass,
}

/// Where the value of one per-object variable comes from
#[derive(Clone, Debug, Eq, PartialEq)]
enum VarSource {
    Kinematic(Kinematic),
    /// Upstream annotation, required to be present
    Annotation(String),
    /// B-tag discriminant; a missing key reads as the upstream default
    Discriminant(&'static str),
    Correction(CorrectionKind),
    Sentinel,
}

/// Scalar-sum rule of a jet collection
#[derive(Copy, Clone, Debug, Default, PartialEq)]
struct HtRule {
    floor: Option<f64>,
}

#[derive(Debug, Error)]
pub enum ExtractError<CE> {
    #[error("Object in `{collection}` lacks required annotation `{key}`")]
    MissingAnnotation { collection: String, key: String },
    #[error("Correction lookup failed: {0}")]
    Correction(CE),
    #[error("Tabulation error: {0}")]
    Sink(#[from] SinkError),
}

/// Recipe turning one object collection into buffer appends
///
/// One generic extraction loop covers all collections; what distinguishes
/// a ca12 generator jet from a reconstructed muon is only the configuration
/// record built by [jets](CollectionPlan::jets) or
/// [leptons](CollectionPlan::leptons).
#[derive(Clone, Debug)]
pub struct CollectionPlan {
    id: CollectionId,
    min_pt: f64,
    regime: Option<CorrectorRegime>,
    ht: Option<HtRule>,
    variables: Vec<(String, VarSource)>,
}

impl CollectionPlan {
    /// Extraction recipe for a jet collection
    pub fn jets(algo: JetAlgo, source: Source, min_pt: f64) -> Self {
        let variables = JET_VARIABLES
            .iter()
            .filter(|v| **v != "ht")
            .map(|v| (v.to_string(), jet_var_source(algo, source, v)))
            .collect();
        let floor = match algo {
            JetAlgo::Ak8 => Some(LARGE_JET_HT_FLOOR),
            _ => None,
        };
        Self {
            id: CollectionId::jets(algo, source),
            min_pt,
            regime: Some(CorrectorRegime::for_algo(algo)),
            ht: Some(HtRule { floor }),
            variables,
        }
    }

    /// Extraction recipe for a lepton-like collection
    pub fn leptons(kind: LeptonKind) -> Self {
        let variables = LEPTON_VARIABLES
            .iter()
            .map(|v| (v.to_string(), lepton_var_source(v)))
            .collect();
        Self {
            id: CollectionId::leptons(kind),
            min_pt: LEPTON_MIN_PT,
            regime: None,
            ht: None,
            variables,
        }
    }

    pub fn id(&self) -> &CollectionId {
        &self.id
    }

    /// Extract this collection's variables for one event
    ///
    /// Objects above the selection threshold fill the per-object buffers;
    /// all objects enter the scalar sum subject to the collection's floor.
    /// Returns the number of selected objects.
    pub fn extract<C, W>(
        &self,
        objects: &[PhysicsObject],
        ctx: &EventContext,
        correctors: &mut CorrectorBank<C>,
        sink: &mut TabulationSink<W>,
    ) -> Result<usize, ExtractError<C::Error>>
    where
        C: Correct,
        W: WriteRow,
    {
        let wants_corrections = self
            .variables
            .iter()
            .any(|(_, src)| matches!(src, VarSource::Correction(_)));
        let mut ht = self.ht.map(|_| 0.);
        let mut selected = 0;
        for object in objects {
            let p = object.momentum();
            let pt = f64::from(p.pt());
            if let (Some(sum), Some(rule)) = (ht.as_mut(), self.ht.as_ref()) {
                if rule.floor.map_or(true, |floor| pt > floor) {
                    *sum += pt;
                }
            }
            // both lookups run for every object, selected or not
            let corrections = match (wants_corrections, self.regime) {
                (true, Some(regime)) => {
                    Some(self.corrections(object, &p, regime, ctx, correctors)?)
                }
                _ => None,
            };
            if pt <= self.min_pt {
                continue;
            }
            selected += 1;
            for (variable, source) in &self.variables {
                let value = match source {
                    VarSource::Kinematic(k) => kinematic(object, &p, *k),
                    VarSource::Annotation(key) => {
                        object.annotation(key).ok_or_else(|| {
                            ExtractError::MissingAnnotation {
                                collection: self.id.to_string(),
                                key: key.clone(),
                            }
                        })?
                    }
                    VarSource::Discriminant(key) => object.discriminant(key),
                    VarSource::Correction(kind) => {
                        let Some((energy, mass)) = corrections else {
                            unreachable!(
                                "correction variable in a plan without regime"
                            )
                        };
                        match kind {
                            CorrectionKind::Energy => energy,
                            CorrectionKind::Mass => mass,
                        }
                    }
                    VarSource::Sentinel => SENTINEL,
                };
                sink.append(&self.id, variable, value)?;
            }
        }
        if let Some(sum) = ht {
            sink.append(&self.id, "ht", sum)?;
        }
        Ok(selected)
    }

    fn corrections<C: Correct>(
        &self,
        object: &PhysicsObject,
        p: &FourVector,
        regime: CorrectorRegime,
        ctx: &EventContext,
        correctors: &mut CorrectorBank<C>,
    ) -> Result<(f64, f64), ExtractError<C::Error>> {
        let inputs = CorrectionInputs {
            pt: p.pt().into(),
            eta: p.eta().into(),
            phi: p.phi().into(),
            e: object.e,
            area: object.area,
            rho: ctx.rho,
            npv: ctx.npv,
        };
        let energy = correctors
            .get_mut(CorrectionKind::Energy, regime)
            .correction(&inputs)
            .map_err(ExtractError::Correction)?;
        let mass = correctors
            .get_mut(CorrectionKind::Mass, regime)
            .correction(&inputs)
            .map_err(ExtractError::Correction)?;
        Ok((energy, mass))
    }
}

/// Event-level inputs shared by all correction lookups of one event
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct EventContext {
    pub rho: f64,
    pub npv: f64,
}

/// The standard extraction plans of the jet analysis
///
/// Jets from particle flow and generator truth for all three algorithms,
/// miniAOD jets for ak4 and ak8 only, and the four lepton collections.
/// The registered ca12/maod collection has no plan here; its buffers stay
/// empty in every row.
pub fn standard_plans(jet_min_pt: f64) -> Vec<CollectionPlan> {
    let mut plans = Vec::new();
    for source in [Source::Pf, Source::Gn] {
        for algo in JetAlgo::ALL {
            plans.push(CollectionPlan::jets(algo, source, jet_min_pt));
        }
    }
    for algo in [JetAlgo::Ak4, JetAlgo::Ak8] {
        plans.push(CollectionPlan::jets(algo, Source::Maod, jet_min_pt));
    }
    for kind in LeptonKind::ALL {
        plans.push(CollectionPlan::leptons(kind));
    }
    plans
}

fn kinematic(object: &PhysicsObject, p: &FourVector, k: Kinematic) -> f64 {
    use Kinematic::*;
    match k {
        Phi => p.phi().into(),
        Eta => p.eta().into(),
        Rapidity => p.rapidity().into(),
        Px => object.px,
        Py => object.py,
        Pz => object.pz,
        Energy => object.e,
        Pt => p.pt().into(),
        Mass => p.m().into(),
    }
}

fn jet_var_source(algo: JetAlgo, source: Source, var: &str) -> VarSource {
    use Kinematic::*;
    match var {
        "phi" => VarSource::Kinematic(Phi),
        "eta" => VarSource::Kinematic(Eta),
        "y" => VarSource::Kinematic(Rapidity),
        "px" => VarSource::Kinematic(Px),
        "py" => VarSource::Kinematic(Py),
        "pz" => VarSource::Kinematic(Pz),
        "e" => VarSource::Kinematic(Energy),
        "pt" => VarSource::Kinematic(Pt),
        "M" => VarSource::Kinematic(Mass),
        "m_t" | "m_p" | "m_s" | "m_f" => match source {
            Source::Pf => {
                VarSource::Annotation(groomed_mass_key(algo, var))
            }
            _ => VarSource::Sentinel,
        },
        "tau1" | "tau2" | "tau3" | "tau4" | "tau5" => {
            if source == Source::Pf && algo != JetAlgo::Ak4 {
                VarSource::Annotation(format!(
                    "Njettiness{}CHS:{var}",
                    algo.tag()
                ))
            } else {
                VarSource::Sentinel
            }
        }
        "bd_te" => btag(source, "pfTrackCountingHighEffBJetTags"),
        // sic, this is the key the upstream producer writes
        "bd_tp" => btag(source, "pfTtrackCountingHighPurBJetTags"),
        "bd_csv" => btag(source, "pfCombinedSecondaryVertexV2BJetTags"),
        "bd_cisv" => {
            btag(source, "pfCombinedInclusiveSecondaryVertexV2BJetTags")
        }
        "jec" => match source {
            Source::Pf => VarSource::Correction(CorrectionKind::Energy),
            _ => VarSource::Sentinel,
        },
        "jmc" => match source {
            Source::Pf => VarSource::Correction(CorrectionKind::Mass),
            _ => VarSource::Sentinel,
        },
        _ => unreachable!("unknown jet variable `{var}`"),
    }
}

fn groomed_mass_key(algo: JetAlgo, var: &str) -> String {
    let groom = match var {
        "m_t" => "Trimmed",
        "m_p" => "Pruned",
        "m_s" => "SoftDrop",
        "m_f" => "Filtered",
        _ => unreachable!("unknown groomed mass `{var}`"),
    };
    format!("{algo}PFJetsCHS{groom}Mass")
}

fn btag(source: Source, key: &'static str) -> VarSource {
    match source {
        Source::Maod => VarSource::Discriminant(key),
        _ => VarSource::Sentinel,
    }
}

fn lepton_var_source(var: &str) -> VarSource {
    use Kinematic::*;
    match var {
        "phi" => VarSource::Kinematic(Phi),
        "eta" => VarSource::Kinematic(Eta),
        "y" => VarSource::Kinematic(Rapidity),
        "px" => VarSource::Kinematic(Px),
        "py" => VarSource::Kinematic(Py),
        "pz" => VarSource::Kinematic(Pz),
        "e" => VarSource::Kinematic(Energy),
        "pt" => VarSource::Kinematic(Pt),
        "m" => VarSource::Kinematic(Mass),
        _ => unreachable!("unknown lepton variable `{var}`"),
    }
}
