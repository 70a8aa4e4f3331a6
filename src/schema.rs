use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Data source a collection was produced by
#[derive(
    Copy,
    Clone,
    Debug,
    Display,
    EnumString,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Deserialize,
    Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Particle-flow reconstruction
    Pf,
    /// Generator truth
    Gn,
    /// Secondary (miniAOD) reconstruction
    Maod,
}

/// Jet clustering algorithm and size, as encoded in collection names
#[derive(
    Copy,
    Clone,
    Debug,
    Display,
    EnumString,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Deserialize,
    Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JetAlgo {
    /// Anti-kt, R = 0.4
    Ak4,
    /// Anti-kt, R = 0.8
    Ak8,
    /// Cambridge/Aachen, R = 1.2
    Ca12,
}

impl JetAlgo {
    pub const ALL: [JetAlgo; 3] = [JetAlgo::Ak4, JetAlgo::Ak8, JetAlgo::Ca12];

    /// Upper-case form used in upstream annotation keys
    pub fn tag(&self) -> &'static str {
        match self {
            JetAlgo::Ak4 => "AK4",
            JetAlgo::Ak8 => "AK8",
            JetAlgo::Ca12 => "CA12",
        }
    }
}

/// Lepton-like collections, named as in the output columns
#[derive(
    Copy, Clone, Debug, Display, EnumString, Eq, PartialEq, Ord, PartialOrd, Hash,
)]
#[strum(serialize_all = "lowercase")]
pub enum LeptonKind {
    #[strum(serialize = "le")]
    Electron,
    #[strum(serialize = "lm")]
    Muon,
    #[strum(serialize = "lt")]
    Tau,
    #[strum(serialize = "lp")]
    Photon,
}

impl LeptonKind {
    pub const ALL: [LeptonKind; 4] = [
        LeptonKind::Electron,
        LeptonKind::Muon,
        LeptonKind::Tau,
        LeptonKind::Photon,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LeptonKind::Electron => "le",
            LeptonKind::Muon => "lm",
            LeptonKind::Tau => "lt",
            LeptonKind::Photon => "lp",
        }
    }
}

/// Identifier of one object collection: a name ("ak4", "le", ...) plus the
/// data source it comes from
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CollectionId {
    pub name: String,
    pub source: Source,
}

impl CollectionId {
    pub fn new<S: Into<String>>(name: S, source: Source) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    pub fn jets(algo: JetAlgo, source: Source) -> Self {
        Self::new(algo.to_string(), source)
    }

    pub fn leptons(kind: LeptonKind) -> Self {
        Self::new(kind.label(), Source::Pf)
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.source)
    }
}

/// Per-object variables of the jet collections
pub const JET_VARIABLES: [&str; 25] = [
    "phi", "eta", "y", "px", "py", "pz", "e", "pt",
    "M",       // Ungroomed mass
    "m_t",     // Trimmed mass
    "m_p",     // Pruned mass
    "m_s",     // Soft drop mass
    "m_f",     // Filtered mass
    "tau1",    // N-subjettiness 1
    "tau2",    // N-subjettiness 2
    "tau3",    // N-subjettiness 3
    "tau4",    // N-subjettiness 4
    "tau5",    // N-subjettiness 5
    "ht",      // Sum of jet pts; for AK8 only jets with pt > 150
    "bd_te", "bd_tp", "bd_csv", "bd_cisv", "jec", "jmc",
];

/// Per-object variables of the lepton collections
pub const LEPTON_VARIABLES: [&str; 9] =
    ["phi", "eta", "y", "px", "py", "pz", "e", "pt", "m"];

/// Event-level variables, one value per event
pub const EVENT_VARIABLES: [&str; 6] = [
    "pt_hat",
    "sigma",   // Cross section of the event
    "nevent",  // The event number, starting from 1
    "w",       // Event weight
    "rho",     // Pileup density
    "npv",     // Number of good primary vertices
];

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SchemaError {
    #[error("Duplicate schema registration for `{0}`")]
    Duplicate(String),
    #[error("No schema registered for `{0}`")]
    Unknown(String),
}

/// Registry of all (collection, variable list) pairs written to the output
///
/// Filled once during setup and read-only afterwards. Every accumulation
/// buffer and output column is derived from this registry, so a variable
/// that is not registered here cannot appear in the output.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    collections: Vec<(CollectionId, Vec<String>)>,
    event: Vec<String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry used by the standard jet analysis: all jet collections,
    /// all lepton collections, and the event summary
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for algo in JetAlgo::ALL {
            for source in [Source::Pf, Source::Gn, Source::Maod] {
                registry
                    .register(CollectionId::jets(algo, source), &JET_VARIABLES)
                    .unwrap();
            }
        }
        for kind in LeptonKind::ALL {
            registry
                .register(CollectionId::leptons(kind), &LEPTON_VARIABLES)
                .unwrap();
        }
        registry.register_event(&EVENT_VARIABLES).unwrap();
        registry
    }

    /// Register the ordered variable list of an object collection
    ///
    /// Registering the same collection twice is a configuration error.
    pub fn register(
        &mut self,
        id: CollectionId,
        variables: &[&str],
    ) -> Result<(), SchemaError> {
        if self.collections.iter().any(|(known, _)| known == &id) {
            return Err(SchemaError::Duplicate(id.to_string()));
        }
        let variables = variables.iter().map(|v| v.to_string()).collect();
        self.collections.push((id, variables));
        Ok(())
    }

    /// Register the ordered list of event-level variables
    pub fn register_event(
        &mut self,
        variables: &[&str],
    ) -> Result<(), SchemaError> {
        if !self.event.is_empty() {
            return Err(SchemaError::Duplicate("event".to_string()));
        }
        self.event = variables.iter().map(|v| v.to_string()).collect();
        Ok(())
    }

    /// The fixed variable list of the given collection
    pub fn variables_for(
        &self,
        id: &CollectionId,
    ) -> Result<&[String], SchemaError> {
        self.collections
            .iter()
            .find(|(known, _)| known == id)
            .map(|(_, vars)| vars.as_slice())
            .ok_or_else(|| SchemaError::Unknown(id.to_string()))
    }

    /// The fixed list of event-level variables
    pub fn event_variables(&self) -> &[String] {
        &self.event
    }

    /// All registered object collections, in registration order
    pub fn collections(
        &self,
    ) -> impl Iterator<Item = (&CollectionId, &[String])> {
        self.collections
            .iter()
            .map(|(id, vars)| (id, vars.as_slice()))
    }
}
