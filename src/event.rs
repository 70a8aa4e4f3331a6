use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::object::{PhysicsObject, Vertex};
use crate::schema::CollectionId;

const EMPTY_SLICE: &[PhysicsObject] = &[];

/// Builder for [EventRecord]
#[derive(Clone, Debug, Default)]
pub struct EventBuilder {
    record: EventRecord,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object collection
    ///
    /// Objects added for the same collection accumulate in insertion order.
    pub fn add_objects(
        &mut self,
        id: &CollectionId,
        objects: impl IntoIterator<Item = PhysicsObject>,
    ) -> &mut Self {
        self.record
            .collections
            .entry(id.to_string())
            .or_default()
            .extend(objects);
        self
    }

    pub fn add_vertex(&mut self, vertex: Vertex) -> &mut Self {
        self.record.vertices.push(vertex);
        self
    }

    pub fn rho(&mut self, rho: f64) -> &mut Self {
        self.record.rho = rho;
        self
    }

    pub fn pt_hat(&mut self, pt_hat: f64) -> &mut Self {
        self.record.pt_hat = Some(pt_hat);
        self
    }

    pub fn build(self) -> EventRecord {
        self.record
    }
}

impl From<EventBuilder> for EventRecord {
    fn from(b: EventBuilder) -> Self {
        b.build()
    }
}

/// One event as delivered by the event source
///
/// Object collections are keyed by their column prefix (e.g. `ak8_pf`);
/// a collection the source did not supply reads as empty.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct EventRecord {
    #[serde(default)]
    collections: BTreeMap<String, Vec<PhysicsObject>>,
    /// Pileup density
    #[serde(default)]
    pub rho: f64,
    /// Generator binning value, if the generator attached one
    #[serde(default)]
    pub pt_hat: Option<f64>,
    /// Reconstructed primary-vertex candidates
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

impl EventRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// The objects of the given collection, in the order supplied by the
    /// event source
    pub fn objects(&self, id: &CollectionId) -> &[PhysicsObject] {
        self.collections
            .get(&id.to_string())
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_SLICE)
    }

    /// Number of good primary vertices
    pub fn npv(&self) -> usize {
        self.vertices.iter().filter(|v| v.is_good()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{JetAlgo, Source};

    #[test]
    fn missing_collection_reads_empty() {
        let ev = EventRecord::new();
        let id = CollectionId::jets(JetAlgo::Ak8, Source::Pf);
        assert!(ev.objects(&id).is_empty());
    }

    #[test]
    fn vertex_counting() {
        let mut ev = EventBuilder::new();
        ev.add_vertex(Vertex {
            ndof: 10.,
            is_fake: false,
        })
        .add_vertex(Vertex {
            ndof: 2.,
            is_fake: false,
        })
        .add_vertex(Vertex {
            ndof: 10.,
            is_fake: true,
        });
        assert_eq!(ev.build().npv(), 1);
    }

    #[test]
    fn builder_roundtrip() {
        let id = CollectionId::jets(JetAlgo::Ak4, Source::Gn);
        let mut builder = EventBuilder::new();
        builder
            .rho(21.5)
            .pt_hat(470.)
            .add_objects(&id, [PhysicsObject::from_momentum(0., 0., 10., 10.)]);
        let ev = builder.build();
        assert_eq!(ev.rho, 21.5);
        assert_eq!(ev.pt_hat, Some(470.));
        assert_eq!(ev.objects(&id).len(), 1);
    }
}
