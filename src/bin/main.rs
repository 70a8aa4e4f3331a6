mod opt;

use crate::opt::Opt;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use indicatif::ProgressBar;
use jetuple::correction::CorrectionSetupBuilder;
use jetuple::prelude::*;
use jetuple::{GIT_BRANCH, GIT_REV, VERSION};
use log::{debug, info};

fn main() -> Result<()> {
    let args = argfile::expand_args_from(
        std::env::args_os(),
        argfile::parse_fromfile,
        argfile::PREFIX,
    )
    .with_context(|| "Failed to read argument file")?;
    let opt = Opt::parse_from(args);

    let env = Env::default().filter_or("JETUPLE_LOG", &opt.loglevel);
    env_logger::init_from_env(env);

    if let (Some(rev), Some(branch)) = (GIT_REV, GIT_BRANCH) {
        info!("jetuple {VERSION} rev {rev} ({branch})");
    } else {
        info!("jetuple {VERSION}");
    }
    debug!("settings: {:#?}", opt);

    let cfg = RunConfig::from_yaml_file(&opt.config)?;
    cfg.mode()
        .with_context(|| format!("Invalid run mode in {:?}", opt.config))?;
    debug!("run configuration: {:#?}", cfg);

    let corrections = CorrectionSetupBuilder::default()
        .version(cfg.jec_version.as_str())
        .is_data(cfg.is_data)
        .dir(cfg.jec_dir.clone())
        .build()
        .context("Failed to assemble correction setup")?;
    corrections
        .validate()
        .context("Correction setup failed")?;

    let reader = CombinedReader::from_files(opt.infiles)?;
    let progress = ProgressBar::new_spinner().with_message("events processed");

    let writer = FileWriter::builder()
        .filename(opt.outfile.clone())
        .compression(opt.compression)
        .build();
    let sink = TabulationSink::new(&SchemaRegistry::standard(), writer);

    let mut ntupler = NtuplerBuilder {
        reader: progress.wrap_iter(reader),
        plans: standard_plans(cfg.cut_pt),
        // calibration tables are applied by an external evaluator; without
        // one every correction factor is 1
        correctors: CorrectorBank::uniform(UnitCorrection),
        sink,
        in_type: cfg.in_type,
        sigma: cfg.sigma,
        weight: cfg.weight,
        verbose: cfg.verbose,
    }
    .build();

    let stats = ntupler.run()?;
    progress.finish_and_clear();
    info!("Wrote {} rows to {:?}", stats.rows_written, opt.outfile);
    info!("done");
    Ok(())
}
