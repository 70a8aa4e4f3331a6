use std::convert::TryFrom;

use log::{debug, info, warn};
use thiserror::Error;

use crate::correction::CorrectorBank;
use crate::event::EventRecord;
use crate::extract::{CollectionPlan, EventContext, ExtractError};
use crate::sink::{CommitError, SinkError, TabulationSink};
use crate::traits::{Correct, WriteRow};

/// Input formats the pipeline knows about
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RunMode {
    /// B2G ntuple input; a stub that extracts nothing
    B2gNtuple,
    /// Jet-toolbox object collections
    JetToolbox,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
#[error("Unknown input type: {0}")]
pub struct UnknownRunMode(pub i32);

impl TryFrom<i32> for RunMode {
    type Error = UnknownRunMode;

    fn try_from(in_type: i32) -> Result<Self, Self::Error> {
        match in_type {
            0 => Ok(RunMode::B2gNtuple),
            1 => Ok(RunMode::JetToolbox),
            unknown => Err(UnknownRunMode(unknown)),
        }
    }
}

/// Counters accumulated over one [Ntupler::run]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RunStats {
    pub events_read: u64,
    pub rows_written: u64,
    pub objects_selected: u64,
}

pub struct NtuplerBuilder<R, C, W> {
    pub reader: R,
    pub plans: Vec<CollectionPlan>,
    pub correctors: CorrectorBank<C>,
    pub sink: TabulationSink<W>,
    /// Input type (0: B2G ntuple, 1: jet-toolbox collections)
    pub in_type: i32,
    /// Cross section written to every row
    pub sigma: f64,
    /// Event weight written to every row
    pub weight: f64,
    /// Per-event debug logging
    pub verbose: bool,
}

impl<R, C, W> NtuplerBuilder<R, C, W> {
    pub fn build(self) -> Ntupler<R, C, W> {
        Ntupler {
            reader: self.reader,
            plans: self.plans,
            correctors: self.correctors,
            sink: self.sink,
            in_type: self.in_type,
            sigma: self.sigma,
            weight: self.weight,
            verbose: self.verbose,
            n_event: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError<RE, CE, WE> {
    #[error("Failed to read event: {0}")]
    Read(RE),
    #[error("Extraction failed: {0}")]
    Extract(ExtractError<CE>),
    #[error("Tabulation failed: {0}")]
    Column(SinkError),
    #[error("Failed to write row: {0}")]
    Write(WE),
}

/// The tabulation pipeline
///
/// Drives one full event cycle per input record: clear all buffers,
/// extract every planned collection, commit one row. Events are processed
/// strictly one at a time; a fatal error mid-event aborts the run without
/// committing the partial row.
pub struct Ntupler<R, C, W> {
    reader: R,
    plans: Vec<CollectionPlan>,
    correctors: CorrectorBank<C>,
    sink: TabulationSink<W>,
    in_type: i32,
    sigma: f64,
    weight: f64,
    verbose: bool,
    n_event: u64,
}

impl<R, C, W, RE> Ntupler<R, C, W>
where
    R: Iterator<Item = Result<EventRecord, RE>>,
    C: Correct,
    W: WriteRow,
{
    /// Process all events from the reader
    pub fn run(
        &mut self,
    ) -> Result<RunStats, RunError<RE, C::Error, W::Error>> {
        let mut stats = RunStats::default();
        while let Some(event) = self.reader.next() {
            let event = event.map_err(RunError::Read)?;
            self.n_event += 1;
            stats.events_read += 1;
            match RunMode::try_from(self.in_type) {
                Ok(RunMode::B2gNtuple) => {
                    if self.n_event == 1 {
                        info!("B2G ntuple input is not implemented, skipping all events");
                    }
                }
                Ok(RunMode::JetToolbox) => {
                    if self.verbose {
                        debug!(
                            "Running over jet-toolbox collections for event {}",
                            self.n_event
                        );
                    }
                    stats.objects_selected += self.process_event(&event)?;
                    stats.rows_written += 1;
                }
                Err(UnknownRunMode(unknown)) => warn!(
                    "Unknown input type {unknown}, skipping event {}",
                    self.n_event
                ),
            }
        }
        self.sink.finish().map_err(RunError::Write)?;
        info!(
            "Read {} events, wrote {} rows ({} selected objects)",
            stats.events_read, stats.rows_written, stats.objects_selected
        );
        Ok(stats)
    }

    fn process_event(
        &mut self,
        event: &EventRecord,
    ) -> Result<u64, RunError<RE, C::Error, W::Error>> {
        self.sink.begin_event();

        let ctx = EventContext {
            rho: event.rho,
            npv: event.npv() as f64,
        };
        let event_values = [
            ("sigma", self.sigma),
            ("nevent", self.n_event as f64),
            ("w", self.weight),
            ("pt_hat", event.pt_hat.unwrap_or(-1.)),
            ("rho", ctx.rho),
            ("npv", ctx.npv),
        ];
        for (variable, value) in event_values {
            self.sink
                .append_event(variable, value)
                .map_err(RunError::Column)?;
        }

        let mut selected = 0;
        for plan in &self.plans {
            selected += plan
                .extract(
                    event.objects(plan.id()),
                    &ctx,
                    &mut self.correctors,
                    &mut self.sink,
                )
                .map_err(RunError::Extract)? as u64;
        }

        self.sink.commit_row().map_err(|err| match err {
            CommitError::OutsideEvent => {
                RunError::Column(SinkError::OutsideEvent)
            }
            CommitError::Write(err) => RunError::Write(err),
        })?;
        Ok(selected)
    }

    /// Access the sink, e.g. to inspect the written rows
    pub fn sink(&self) -> &TabulationSink<W> {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    use crate::correction::UnitCorrection;
    use crate::event::EventBuilder;
    use crate::extract::standard_plans;
    use crate::object::{PhysicsObject, Vertex};
    use crate::schema::{CollectionId, JetAlgo, SchemaRegistry, Source};
    use crate::writer::MemoryWriter;

    type TestNtupler = Ntupler<
        std::vec::IntoIter<Result<EventRecord, Infallible>>,
        UnitCorrection,
        MemoryWriter,
    >;

    fn ntupler(in_type: i32, events: Vec<EventRecord>) -> TestNtupler {
        let events: Vec<Result<_, Infallible>> =
            events.into_iter().map(Ok).collect();
        NtuplerBuilder {
            reader: events.into_iter(),
            plans: standard_plans(100.),
            correctors: CorrectorBank::uniform(UnitCorrection),
            sink: TabulationSink::new(
                &SchemaRegistry::standard(),
                MemoryWriter::new(),
            ),
            in_type,
            sigma: 7.6,
            weight: 0.5,
            verbose: false,
        }
        .build()
    }

    fn gn_event(jet_pts: &[f64]) -> EventRecord {
        let mut builder = EventBuilder::new();
        builder.rho(21.).add_vertex(Vertex {
            ndof: 10.,
            is_fake: false,
        });
        builder.add_objects(
            &CollectionId::jets(JetAlgo::Ak8, Source::Gn),
            jet_pts
                .iter()
                .map(|&pt| PhysicsObject::from_momentum(pt, 0., 0., 1.25 * pt)),
        );
        builder.build()
    }

    #[test]
    fn one_row_per_event() {
        let mut ntupler =
            ntupler(1, vec![gn_event(&[200., 50.]), gn_event(&[])]);
        let stats = ntupler.run().unwrap();
        assert_eq!(stats.events_read, 2);
        assert_eq!(stats.rows_written, 2);
        assert_eq!(stats.objects_selected, 1);

        let rows = ntupler.sink().writer().rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["ak8_gn_pt"], vec![200.]);
        assert!(rows[1]["ak8_gn_pt"].is_empty());
        // event variables are length-one cells
        assert_eq!(rows[0]["nevent"], vec![1.]);
        assert_eq!(rows[1]["nevent"], vec![2.]);
        assert_eq!(rows[0]["sigma"], vec![7.6]);
        assert_eq!(rows[0]["w"], vec![0.5]);
        assert_eq!(rows[0]["rho"], vec![21.]);
        assert_eq!(rows[0]["npv"], vec![1.]);
        // no generator binning hint attached
        assert_eq!(rows[0]["pt_hat"], vec![-1.]);
    }

    #[test]
    fn unselected_collections_stay_empty() {
        let mut ntupler = ntupler(1, vec![gn_event(&[200.])]);
        ntupler.run().unwrap();
        let rows = ntupler.sink().writer().rows();
        // registered but never extracted
        assert!(rows[0]["ca12_maod_pt"].is_empty());
        // extracted from an absent input collection
        assert!(rows[0]["lm_pf_pt"].is_empty());
        assert_eq!(rows[0]["ak4_pf_ht"], vec![0.]);
    }

    #[test]
    fn b2g_stub_writes_nothing() {
        let mut ntupler = ntupler(0, vec![gn_event(&[200.]), gn_event(&[])]);
        let stats = ntupler.run().unwrap();
        assert_eq!(stats.events_read, 2);
        assert_eq!(stats.rows_written, 0);
        assert!(ntupler.sink().writer().rows().is_empty());
    }

    #[test]
    fn unknown_mode_skips_events() {
        let mut ntupler = ntupler(7, vec![gn_event(&[200.])]);
        let stats = ntupler.run().unwrap();
        assert_eq!(stats.events_read, 1);
        assert_eq!(stats.rows_written, 0);
        assert!(ntupler.sink().writer().rows().is_empty());
    }

    #[test]
    fn missing_annotation_aborts_without_row() {
        let mut builder = EventBuilder::new();
        builder.add_objects(
            &CollectionId::jets(JetAlgo::Ak8, Source::Pf),
            // no groomed-mass annotations attached
            [PhysicsObject::from_momentum(200., 0., 0., 250.)],
        );
        let mut ntupler = ntupler(1, vec![builder.build()]);
        let err = ntupler.run().unwrap_err();
        assert!(matches!(
            err,
            RunError::Extract(ExtractError::MissingAnnotation { .. })
        ));
        assert!(ntupler.sink().writer().rows().is_empty());
    }

    #[test]
    fn run_modes() {
        assert_eq!(RunMode::try_from(0), Ok(RunMode::B2gNtuple));
        assert_eq!(RunMode::try_from(1), Ok(RunMode::JetToolbox));
        assert_eq!(RunMode::try_from(2), Err(UnknownRunMode(2)));
    }
}
