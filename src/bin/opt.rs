use std::path::PathBuf;

use clap::Parser;
use jetuple::compression::{parse_compression, Compression};

#[derive(Debug, Parser)]
#[clap(about, author, version)]
pub(crate) struct Opt {
    /// Run configuration file (YAML)
    #[clap(long, short, value_parser)]
    pub(crate) config: PathBuf,

    /// Output file for the events table
    #[clap(long, short, value_parser)]
    pub(crate) outfile: PathBuf,

    #[clap(long, value_parser = parse_compression,
                help = "Compress output file.
Possible settings are 'bzip2', 'gzip', 'zstd', 'lz4'.
Compression levels can be set with algorithm_level e.g. 'zstd_5'.
Maximum levels are 'gzip_9', 'zstd_19', 'lz4_16'.")]
    pub(crate) compression: Option<Compression>,

    /// Verbosity level
    #[clap(
        short,
        long,
        default_value = "Info",
        help = "Verbosity level.
Possible values with increasing amount of output are
'off', 'error', 'warn', 'info', 'debug', 'trace'.\n"
    )]
    pub(crate) loglevel: String,

    /// Input event files
    #[clap(name = "INFILES", value_parser)]
    pub(crate) infiles: Vec<PathBuf>,
}
