use std::io::Write;

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

const GZIP_DEFAULT_LEVEL: u8 = 6;
const LZ4_DEFAULT_LEVEL: u8 = 0;
const ZSTD_DEFAULT_LEVEL: u8 = 0;

/// Compression format
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Compression {
    /// The bzip2 format
    Bzip2,
    /// The gzip format with compression level as associated value
    Gzip(u8),
    /// The lz4 format with compression level as associated value
    Lz4(u8),
    /// The zstd format with compression level as associated value
    Zstd(u8),
}

/// Convert into a writer that compresses to the given format
pub fn compress_writer<'a, W: 'a + Write>(
    writer: W,
    compression: Option<Compression>,
) -> Result<Box<dyn Write + 'a>, std::io::Error> {
    match compression {
        Some(Compression::Bzip2) => {
            let encoder = BzEncoder::new(writer, bzip2::Compression::best());
            Ok(Box::new(encoder))
        }
        Some(Compression::Gzip(lvl)) => {
            let encoder =
                GzEncoder::new(writer, flate2::Compression::new(lvl.into()));
            Ok(Box::new(encoder))
        }
        Some(Compression::Lz4(lvl)) => {
            let encoder = lz4::EncoderBuilder::new()
                .auto_flush(true)
                .level(lvl.into())
                .build(writer)?;
            Ok(Box::new(encoder))
        }
        Some(Compression::Zstd(lvl)) => {
            let encoder = zstd::Encoder::new(writer, lvl.into())?;
            Ok(Box::new(encoder.auto_finish()))
        }
        None => Ok(Box::new(writer)),
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ParseCompressionError {
    #[error("Unknown compression algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("Unsupported compression level `{1}` for algorithm {0}")]
    UnsupportedLevel(String, String),
}

lazy_static! {
    static ref COMPRESSION_RE: Regex =
        Regex::new(r"^(?P<algo>[[:alnum:]]+)(?P<lvl>_\d+)?$").unwrap();
}

/// Parse a compression setting of the form `algo` or `algo_level`
pub fn parse_compression(
    s: &str,
) -> Result<Compression, ParseCompressionError> {
    use Compression::*;
    use ParseCompressionError::*;

    let lower_case = s.to_ascii_lowercase();
    let Some(captures) = COMPRESSION_RE.captures(&lower_case) else {
        return Err(UnknownAlgorithm(s.to_owned()));
    };
    let algo = &captures["algo"];
    let lvl = captures
        .name("lvl")
        .map(|lvl| lvl.as_str()[1..].parse::<u8>());
    let bad_level = || {
        UnsupportedLevel(
            algo.to_owned(),
            captures.name("lvl").map(|m| m.as_str()).unwrap_or_default()
                .to_owned(),
        )
    };
    match algo {
        "bzip2" | "bz2" => match lvl {
            None => Ok(Bzip2),
            Some(_) => Err(bad_level()),
        },
        "gzip" | "gz" => match lvl {
            None => Ok(Gzip(GZIP_DEFAULT_LEVEL)),
            Some(Ok(lvl)) if lvl <= 9 => Ok(Gzip(lvl)),
            Some(_) => Err(bad_level()),
        },
        "lz4" => match lvl {
            None => Ok(Lz4(LZ4_DEFAULT_LEVEL)),
            Some(Ok(lvl)) if lvl <= 16 => Ok(Lz4(lvl)),
            Some(_) => Err(bad_level()),
        },
        "zstd" | "zstandard" => match lvl {
            None => Ok(Zstd(ZSTD_DEFAULT_LEVEL)),
            Some(Ok(lvl)) if lvl <= 19 => Ok(Zstd(lvl)),
            Some(_) => Err(bad_level()),
        },
        _ => Err(UnknownAlgorithm(s.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!(parse_compression("bzip2"), Ok(Compression::Bzip2));
        assert_eq!(
            parse_compression("gzip"),
            Ok(Compression::Gzip(GZIP_DEFAULT_LEVEL))
        );
        assert_eq!(parse_compression("GZ_3"), Ok(Compression::Gzip(3)));
        assert_eq!(parse_compression("zstd_19"), Ok(Compression::Zstd(19)));
        assert!(matches!(
            parse_compression("zstd_99"),
            Err(ParseCompressionError::UnsupportedLevel(..))
        ));
        assert!(matches!(
            parse_compression("brotli"),
            Err(ParseCompressionError::UnknownAlgorithm(_))
        ));
    }
}
