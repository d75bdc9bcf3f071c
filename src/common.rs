use anyhow::Result;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// One matched target within a query result.
///
/// `target_name` on the daemon path is the numeric identifier the daemon
/// carries in the name slot of the hit record, rendered in decimal; on the
/// batch path it is the target-name column verbatim.
#[derive(Debug, Clone)]
pub struct Hit {
    pub target_name: String,
    /// Expected number of false positives at least this good:
    /// `exp(log_pvalue) * Z`. The daemon transmits the log p-value only.
    pub evalue: f64,
    pub score: f64,
    /// Full-sequence bias correction. The daemon does not ship one at hit
    /// level and reports 0.
    pub bias: f64,
    /// Domain-level alignments, in record order.
    pub domains: Vec<Domain>,
}

/// One domain-level alignment within a hit. All coordinates are 1-based and
/// returned exactly as found in the source records.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    pub hmm_from: u32,
    pub hmm_to: u32,
    pub seq_from: u64,
    pub seq_to: u64,
    pub env_from: i32,
    pub env_to: i32,
    pub bitscore: f32,
    pub is_reported: bool,
    pub is_included: bool,
}

/// All reported hits for one submitted query, in emission order. Hits are
/// never re-sorted here; the server/tool ranking is the ranking.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub name: String,
    /// Search wall time in seconds as reported by the daemon. The batch
    /// path has no timing source and always reports 0; queries skipped for
    /// exceeding the length limit report -1.
    pub elapsed: f64,
    pub query_length: u64,
    pub hits: Vec<Hit>,
}

/// A report field coerced once at parse time: numeric if the token parses
/// as a float, otherwise the raw text (`-` placeholders stay text).
#[derive(Debug, Clone, PartialEq)]
pub enum TabField {
    Num(f64),
    Text(String),
}

impl TabField {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<f64>() {
            Ok(v) => TabField::Num(v),
            Err(_) => TabField::Text(raw.trim().to_string()),
        }
    }

    /// Numeric view. Text fields have none, which makes them fail every
    /// threshold comparison.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TabField::Num(v) => Some(*v),
            TabField::Text(_) => None,
        }
    }
}

impl fmt::Display for TabField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabField::Num(v) => write!(f, "{}", v),
            TabField::Text(s) => f.write_str(s),
        }
    }
}

/// Conjunctive hit acceptance thresholds, shared by both backends.
///
/// The two sides are not symmetric: an unset e-value threshold passes every
/// hit, but an unset score threshold fails every hit, so no hits at all are
/// produced unless `score_thr` is supplied. Downstream accounting has come
/// to rely on this; if it is ever changed, both backends and the tests
/// pinning it must change together.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HitFilter {
    /// Keep hits with `evalue <= evalue_thr`. `None` passes everything.
    pub evalue_thr: Option<f64>,
    /// Keep hits with `score >= score_thr`. `None` passes nothing.
    pub score_thr: Option<f64>,
}

impl HitFilter {
    pub fn accepts(&self, evalue: f64, score: f64) -> bool {
        self.accepts_fields(Some(evalue), Some(score))
    }

    /// Variant for parsed report fields, where a non-numeric field (`None`)
    /// fails its comparison.
    pub fn accepts_fields(&self, evalue: Option<f64>, score: Option<f64>) -> bool {
        let evalue_ok = match self.evalue_thr {
            None => true,
            Some(thr) => matches!(evalue, Some(e) if e <= thr),
        };
        let score_ok = match self.score_thr {
            None => false,
            Some(thr) => matches!(score, Some(s) if s >= thr),
        };
        evalue_ok && score_ok
    }
}

/// Query payload kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Sequence,
    Profile,
}

/// Target database flavor, as advertised to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    HmmDb,
    SeqDb,
}

impl DbKind {
    /// Token used in the request header line.
    pub fn wire_name(&self) -> &'static str {
        match self {
            DbKind::HmmDb => "hmmdb",
            DbKind::SeqDb => "seqdb",
        }
    }
}

/// Where the search actually runs: a persistent daemon or a batch tool run
/// over the whole query file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Daemon,
    Disk,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryKind::Sequence => "sequence",
            QueryKind::Profile => "profile",
        })
    }
}

impl fmt::Display for DbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScanMode::Daemon => "daemon",
            ScanMode::Disk => "disk",
        })
    }
}

/// Open the row writer: a file when a path is given, stdout otherwise.
pub fn open_output(out_path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    let stdout = io::stdout();
    let writer: Box<dyn Write> = if let Some(path) = out_path {
        Box::new(BufWriter::new(File::create(path)?))
    } else {
        Box::new(BufWriter::new(stdout.lock()))
    };
    Ok(writer)
}

/// Write one query's hits as tab-separated rows, one row per hit domain:
/// query, target, evalue, score, hmm from/to, seq from/to, domain score.
pub fn write_query_rows<W: Write>(writer: &mut W, result: &QueryResult) -> Result<()> {
    for hit in &result.hits {
        for dom in &hit.domains {
            writeln!(
                writer,
                "{}\t{}\t{:.1e}\t{:.1}\t{}\t{}\t{}\t{}\t{:.1}",
                result.name,
                hit.target_name,
                hit.evalue,
                hit.score,
                dom.hmm_from,
                dom.hmm_to,
                dom.seq_from,
                dom.seq_to,
                dom.bitscore
            )?;
        }
    }
    Ok(())
}
