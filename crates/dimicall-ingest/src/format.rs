use crate::error::{IngestError, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

pub const MB: u64 = 1024 * 1024;

/// Only the first line within this many bytes is used to guess the delimiter.
const SNIFF_BYTES: usize = 1024;
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
        }
    }

    /// Picks the most frequent of tab, comma and semicolon on the first line.
    /// Ties and lines with none of them fall back to comma.
    pub fn sniff(sample: &[u8]) -> Self {
        let sample = sample.strip_prefix(UTF8_BOM).unwrap_or(sample);
        let sample = &sample[..sample.len().min(SNIFF_BYTES)];
        let line = sample
            .split(|b| *b == b'\n')
            .next()
            .unwrap_or_default();
        let count = |needle: u8| line.iter().filter(|b| **b == needle).count();
        let counts = [
            (Delimiter::Tab, count(b'\t')),
            (Delimiter::Comma, count(b',')),
            (Delimiter::Semicolon, count(b';')),
        ];
        let best = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
        let leaders: Vec<_> = counts.iter().filter(|(_, n)| *n == best).collect();
        match leaders.as_slice() {
            [(delimiter, n)] if *n > 0 => *delimiter,
            _ => Delimiter::Comma,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Delimited,
    Workbook,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv" | "tsv" | "txt") => Ok(SourceKind::Delimited),
            Some("xlsx" | "xlsm" | "xls" | "ods") => Ok(SourceKind::Workbook),
            _ => Err(IngestError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// How a source is pumped, chosen from its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Strategy {
    /// One pass, one chunk.
    Direct,
    ChunkedSmall { rows: usize },
    /// Fixed chunks with a mandatory pause between them.
    ChunkedLarge {
        rows: usize,
        #[serde(skip)]
        pause: Duration,
    },
}

impl Strategy {
    pub fn chunk_rows(&self) -> Option<usize> {
        match self {
            Strategy::Direct => None,
            Strategy::ChunkedSmall { rows } | Strategy::ChunkedLarge { rows, .. } => Some(*rows),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub max_bytes: u64,
    pub direct_limit_bytes: u64,
    pub large_bytes: u64,
    pub small_chunk_rows: usize,
    pub large_chunk_rows: usize,
    pub pause: Duration,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            max_bytes: 50 * MB,
            direct_limit_bytes: 10 * MB,
            large_bytes: 20 * MB,
            small_chunk_rows: 100,
            large_chunk_rows: 50,
            pause: Duration::from_millis(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub kind: SourceKind,
    pub delimiter: Delimiter,
    pub strategy: Strategy,
    pub size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct FormatDetector {
    limits: SizeLimits,
}

impl FormatDetector {
    pub fn new(limits: SizeLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SizeLimits {
        &self.limits
    }

    /// Fails with `SizeLimitExceeded` above the hard limit.
    pub fn strategy_for(&self, size: u64) -> Result<Strategy> {
        let limits = &self.limits;
        if size > limits.max_bytes {
            return Err(IngestError::SizeLimitExceeded {
                size,
                limit: limits.max_bytes,
            });
        }
        Ok(if size < limits.direct_limit_bytes {
            Strategy::Direct
        } else if size <= limits.large_bytes {
            Strategy::ChunkedSmall {
                rows: limits.small_chunk_rows,
            }
        } else {
            Strategy::ChunkedLarge {
                rows: limits.large_chunk_rows,
                pause: limits.pause,
            }
        })
    }

    /// Checks type and size from metadata before reading any content.
    pub fn inspect_path(&self, path: &Path) -> Result<Detection> {
        let kind = SourceKind::from_path(path)?;
        let size = std::fs::metadata(path)?.len();
        let strategy = self.strategy_for(size)?;
        let delimiter = match kind {
            SourceKind::Delimited => {
                let mut sample = Vec::with_capacity(SNIFF_BYTES + UTF8_BOM.len());
                File::open(path)?
                    .take((SNIFF_BYTES + UTF8_BOM.len()) as u64)
                    .read_to_end(&mut sample)?;
                Delimiter::sniff(&sample)
            }
            SourceKind::Workbook => Delimiter::Comma,
        };
        if size > self.limits.large_bytes {
            tracing::warn!(path = %path.display(), size, "large import; processing in small chunks");
        }
        tracing::debug!(path = %path.display(), ?kind, ?delimiter, ?strategy, "detected source format");
        Ok(Detection {
            kind,
            delimiter,
            strategy,
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Delimiter, FormatDetector, SizeLimits, SourceKind, Strategy, MB};
    use crate::error::IngestError;
    use std::path::Path;
    use std::time::Duration;

    #[test]
    fn sniff_picks_most_frequent_delimiter() {
        assert_eq!(Delimiter::sniff(b"a;b;c\n1,2;3"), Delimiter::Semicolon);
        assert_eq!(Delimiter::sniff(b"a\tb\tc,d\n"), Delimiter::Tab);
        assert_eq!(Delimiter::sniff(b"\xEF\xBB\xBFprenom,nom;tel,email"), Delimiter::Comma);
    }

    #[test]
    fn sniff_defaults_to_comma() {
        assert_eq!(Delimiter::sniff(b""), Delimiter::Comma);
        assert_eq!(Delimiter::sniff(b"single column\n"), Delimiter::Comma);
        assert_eq!(Delimiter::sniff(b"a;b\tc"), Delimiter::Comma);
    }

    #[test]
    fn sniff_only_reads_the_first_line() {
        assert_eq!(Delimiter::sniff(b"a,b\nc;d;e;f;g"), Delimiter::Comma);
        let mut long = vec![b'x'; 2000];
        long.extend_from_slice(b";;;;");
        assert_eq!(Delimiter::sniff(&long), Delimiter::Comma);
    }

    #[test]
    fn strategy_follows_size() {
        let detector = FormatDetector::default();
        assert_eq!(detector.strategy_for(MB).unwrap(), Strategy::Direct);
        assert_eq!(
            detector.strategy_for(15 * MB).unwrap(),
            Strategy::ChunkedSmall { rows: 100 }
        );
        assert_eq!(
            detector.strategy_for(30 * MB).unwrap(),
            Strategy::ChunkedLarge {
                rows: 50,
                pause: Duration::from_millis(5)
            }
        );
    }

    #[test]
    fn oversized_sources_are_rejected() {
        let detector = FormatDetector::new(SizeLimits::default());
        let err = detector.strategy_for(50 * MB + 1).unwrap_err();
        assert!(matches!(
            err,
            IngestError::SizeLimitExceeded { limit, .. } if limit == 50 * MB
        ));
        assert!(detector.strategy_for(50 * MB).is_ok());
    }

    #[test]
    fn source_kind_comes_from_extension() {
        assert_eq!(
            SourceKind::from_path(Path::new("contacts.CSV")).unwrap(),
            SourceKind::Delimited
        );
        assert_eq!(
            SourceKind::from_path(Path::new("contacts.xlsx")).unwrap(),
            SourceKind::Workbook
        );
        assert!(matches!(
            SourceKind::from_path(Path::new("contacts.pdf")),
            Err(IngestError::UnsupportedFormat(_))
        ));
        assert!(SourceKind::from_path(Path::new("contacts")).is_err());
    }
}
