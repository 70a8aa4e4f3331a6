pub use crate::{
    config::RunConfig,
    correction::{CorrectorBank, StatefulCorrector, UnitCorrection},
    event::{EventBuilder, EventRecord},
    extract::{standard_plans, CollectionPlan},
    reader::CombinedReader,
    schema::SchemaRegistry,
    sink::TabulationSink,
    tabulate::{Ntupler, NtuplerBuilder, RunMode, RunStats},
    writer::{FileWriter, MemoryWriter},
};
