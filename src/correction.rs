use std::convert::Infallible;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use itertools::Itertools;
use log::debug;
use strum::Display;
use thiserror::Error;

use crate::parsing::header_tokens;
use crate::schema::JetAlgo;
use crate::traits::Correct;

/// Correction levels applied in sequence by the external evaluator
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum CorrectionLevel {
    L1FastJet,
    L2Relative,
    L3Absolute,
    L2L3Residual,
}

/// The two independent lookups per parameter regime
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum CorrectionKind {
    /// Jet energy correction ("jec" column)
    Energy,
    /// Jet mass correction ("jmc" column)
    Mass,
}

/// Parameter regime selected by the jet size
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum CorrectorRegime {
    #[strum(serialize = "AK4")]
    Ak4,
    #[strum(serialize = "AK8")]
    Ak8,
}

impl CorrectorRegime {
    /// The regime covering the given jet size
    ///
    /// Only two parameter sets exist; every large-radius algorithm uses
    /// the AK8 set.
    pub fn for_algo(algo: JetAlgo) -> Self {
        match algo {
            JetAlgo::Ak4 => CorrectorRegime::Ak4,
            JetAlgo::Ak8 | JetAlgo::Ca12 => CorrectorRegime::Ak8,
        }
    }
}

/// All inputs of one correction lookup, passed explicitly
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CorrectionInputs {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub e: f64,
    pub area: f64,
    pub rho: f64,
    pub npv: f64,
}

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("Failed to read correction parameters from {path:?}: {source}")]
    MissingParameters {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed correction parameter file {path:?}")]
    MalformedParameters { path: PathBuf },
}

/// Locations of the correction parameter files for one correction-set
/// version
///
/// File names follow `<version>_<DATA|MC>_<level>_<regime>PFchs.txt`.
/// Residual corrections exist only for real data.
#[derive(Builder, Clone, Debug, Eq, PartialEq)]
pub struct CorrectionSetup {
    /// Versioned correction-set identifier, e.g. "Summer15_25nsV6"
    #[builder(setter(into))]
    version: String,
    /// Whether the input is real data
    is_data: bool,
    /// Directory holding the parameter files
    #[builder(default, setter(into))]
    dir: PathBuf,
}

impl CorrectionSetup {
    pub fn prefix(&self) -> String {
        if self.is_data {
            format!("{}_DATA", self.version)
        } else {
            format!("{}_MC", self.version)
        }
    }

    /// The correction levels read for the given lookup
    pub fn levels(&self, kind: CorrectionKind) -> Vec<CorrectionLevel> {
        use CorrectionLevel::*;
        let mut levels = match kind {
            CorrectionKind::Energy => vec![L1FastJet, L2Relative, L3Absolute],
            CorrectionKind::Mass => vec![L2Relative, L3Absolute],
        };
        if self.is_data {
            levels.push(L2L3Residual);
        }
        levels
    }

    /// The parameter files read for the given lookup, in application order
    pub fn files(
        &self,
        kind: CorrectionKind,
        regime: CorrectorRegime,
    ) -> Vec<PathBuf> {
        let prefix = self.prefix();
        self.levels(kind)
            .into_iter()
            .map(|level| {
                self.dir
                    .join(format!("{prefix}_{level}_{regime}PFchs.txt"))
            })
            .collect()
    }

    /// Check that every parameter file of all four lookups exists and
    /// carries a parseable header
    ///
    /// Run once at startup; any failure aborts the run before the first
    /// event.
    pub fn validate(&self) -> Result<(), CorrectionError> {
        for kind in [CorrectionKind::Energy, CorrectionKind::Mass] {
            for regime in [CorrectorRegime::Ak4, CorrectorRegime::Ak8] {
                let files = self.files(kind, regime);
                debug!(
                    "{kind} correction parameters for {regime}: {}",
                    files.iter().map(|f| f.display()).join(", ")
                );
                for file in &files {
                    validate_parameter_file(file)?;
                }
            }
        }
        Ok(())
    }
}

fn validate_parameter_file(path: &Path) -> Result<(), CorrectionError> {
    let open_err = |source| CorrectionError::MissingParameters {
        path: path.to_owned(),
        source,
    };
    let file = File::open(path).map_err(open_err)?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .map_err(open_err)?;
    match header_tokens(first_line.trim()) {
        Ok(_) => Ok(()),
        Err(_) => Err(CorrectionError::MalformedParameters {
            path: path.to_owned(),
        }),
    }
}

/// Setter/getter protocol of an external factorized-correction evaluator
///
/// Implementations keep internal state between calls. [StatefulCorrector]
/// overwrites every input before each read, so no value can leak from one
/// lookup into the next.
pub trait CorrectorState {
    fn set_jet_pt(&mut self, pt: f64);
    fn set_jet_eta(&mut self, eta: f64);
    fn set_jet_phi(&mut self, phi: f64);
    fn set_jet_e(&mut self, e: f64);
    fn set_jet_area(&mut self, area: f64);
    fn set_rho(&mut self, rho: f64);
    fn set_npv(&mut self, npv: f64);
    fn correction(&mut self) -> f64;
}

/// Pure-function adapter around a [CorrectorState]
#[derive(Copy, Clone, Debug, Default)]
pub struct StatefulCorrector<C> {
    state: C,
}

impl<C> StatefulCorrector<C> {
    pub fn new(state: C) -> Self {
        Self { state }
    }
}

impl<C: CorrectorState> Correct for StatefulCorrector<C> {
    type Error = Infallible;

    fn correction(
        &mut self,
        inputs: &CorrectionInputs,
    ) -> Result<f64, Self::Error> {
        // the full setter sequence runs on every lookup
        self.state.set_jet_pt(inputs.pt);
        self.state.set_jet_eta(inputs.eta);
        self.state.set_jet_phi(inputs.phi);
        self.state.set_jet_e(inputs.e);
        self.state.set_jet_area(inputs.area);
        self.state.set_rho(inputs.rho);
        self.state.set_npv(inputs.npv);
        Ok(self.state.correction())
    }
}

/// Correction factor 1 for every input
///
/// Stand-in evaluator for runs where no calibration tables are wired in.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct UnitCorrection;

impl Correct for UnitCorrection {
    type Error = Infallible;

    fn correction(
        &mut self,
        _inputs: &CorrectionInputs,
    ) -> Result<f64, Self::Error> {
        Ok(1.)
    }
}

/// The four independent correction lookups: energy and mass, for each
/// parameter regime
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CorrectorBank<C> {
    energy_ak4: C,
    mass_ak4: C,
    energy_ak8: C,
    mass_ak8: C,
}

impl<C> CorrectorBank<C> {
    pub fn new(energy_ak4: C, mass_ak4: C, energy_ak8: C, mass_ak8: C) -> Self {
        Self {
            energy_ak4,
            mass_ak4,
            energy_ak8,
            mass_ak8,
        }
    }

    pub fn get_mut(
        &mut self,
        kind: CorrectionKind,
        regime: CorrectorRegime,
    ) -> &mut C {
        use CorrectionKind::*;
        use CorrectorRegime::*;
        match (kind, regime) {
            (Energy, Ak4) => &mut self.energy_ak4,
            (Mass, Ak4) => &mut self.mass_ak4,
            (Energy, Ak8) => &mut self.energy_ak8,
            (Mass, Ak8) => &mut self.mass_ak8,
        }
    }
}

impl<C: Clone> CorrectorBank<C> {
    /// A bank using the same evaluator for all four lookups
    pub fn uniform(corrector: C) -> Self {
        Self::new(
            corrector.clone(),
            corrector.clone(),
            corrector.clone(),
            corrector,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn setup(is_data: bool) -> CorrectionSetup {
        CorrectionSetupBuilder::default()
            .version("Summer15_25nsV6")
            .is_data(is_data)
            .build()
            .unwrap()
    }

    #[test]
    fn file_sets() {
        let data = setup(true);
        let files = data.files(CorrectionKind::Energy, CorrectorRegime::Ak4);
        assert_eq!(files.len(), 4);
        assert_eq!(
            files[0],
            PathBuf::from("Summer15_25nsV6_DATA_L1FastJet_AK4PFchs.txt")
        );
        assert_eq!(
            files[3],
            PathBuf::from("Summer15_25nsV6_DATA_L2L3Residual_AK4PFchs.txt")
        );

        let mc = setup(false);
        let files = mc.files(CorrectionKind::Energy, CorrectorRegime::Ak8);
        assert_eq!(files.len(), 3);
        assert_eq!(
            files[0],
            PathBuf::from("Summer15_25nsV6_MC_L1FastJet_AK8PFchs.txt")
        );

        // the mass correction starts at L2Relative
        let files = mc.files(CorrectionKind::Mass, CorrectorRegime::Ak8);
        assert_eq!(files.len(), 2);
        assert_eq!(
            files[0],
            PathBuf::from("Summer15_25nsV6_MC_L2Relative_AK8PFchs.txt")
        );
    }

    #[test]
    fn validation() {
        let dir = tempfile::tempdir().unwrap();
        let mc = CorrectionSetupBuilder::default()
            .version("Test_V1")
            .is_data(false)
            .dir(dir.path())
            .build()
            .unwrap();

        // nothing there yet
        assert!(matches!(
            mc.validate(),
            Err(CorrectionError::MissingParameters { .. })
        ));

        for kind in [CorrectionKind::Energy, CorrectionKind::Mass] {
            for regime in [CorrectorRegime::Ak4, CorrectorRegime::Ak8] {
                for file in mc.files(kind, regime) {
                    let mut out = File::create(file).unwrap();
                    writeln!(out, "{{1 JetEta 3 JetPt JetA Rho Correction}}")
                        .unwrap();
                    writeln!(out, "-5.4 -5.0 1.0 8.0 1.0").unwrap();
                }
            }
        }
        mc.validate().unwrap();

        // break one header
        let broken = mc.files(CorrectionKind::Mass, CorrectorRegime::Ak8)[0]
            .to_owned();
        std::fs::write(&broken, "not a parameter file\n").unwrap();
        assert!(matches!(
            mc.validate(),
            Err(CorrectionError::MalformedParameters { path }) if path == broken
        ));
    }

    /// Evaluator that folds all of its state into the factor, so any stale
    /// value shows up in the result
    #[derive(Default)]
    struct Recorder {
        pt: f64,
        eta: f64,
        phi: f64,
        e: f64,
        area: f64,
        rho: f64,
        npv: f64,
    }

    impl CorrectorState for Recorder {
        fn set_jet_pt(&mut self, pt: f64) {
            self.pt = pt;
        }
        fn set_jet_eta(&mut self, eta: f64) {
            self.eta = eta;
        }
        fn set_jet_phi(&mut self, phi: f64) {
            self.phi = phi;
        }
        fn set_jet_e(&mut self, e: f64) {
            self.e = e;
        }
        fn set_jet_area(&mut self, area: f64) {
            self.area = area;
        }
        fn set_rho(&mut self, rho: f64) {
            self.rho = rho;
        }
        fn set_npv(&mut self, npv: f64) {
            self.npv = npv;
        }
        fn correction(&mut self) -> f64 {
            self.pt
                + 10. * self.eta
                + 100. * self.phi
                + self.e
                + self.area
                + self.rho
                + self.npv
        }
    }

    #[test]
    fn no_stale_state() {
        let mut corrector = StatefulCorrector::new(Recorder::default());
        let first = CorrectionInputs {
            pt: 200.,
            eta: 1.,
            phi: 2.,
            e: 250.,
            area: 0.5,
            rho: 20.,
            npv: 15.,
        };
        let second = CorrectionInputs {
            pt: 30.,
            ..Default::default()
        };
        let fresh = corrector.correction(&second).unwrap();
        corrector.correction(&first).unwrap();
        // same inputs, same factor, independent of what ran before
        assert_eq!(corrector.correction(&second).unwrap(), fresh);
        assert_eq!(fresh, 30.);
    }
}
