//! Text formats for sparse tensors, matrices, and K-tensors.
//!
//! All three formats share the same framing: a keyword line (`sptensor`,
//! `matrix` / `facmatrix`, `ktensor`) optionally followed by
//! `indices-start-at-zero` or `indices-start-at-one`; blank lines and
//! lines beginning with `//` are ignored everywhere; a trailing `\r` is
//! stripped from every line. A file whose first token is not a keyword is
//! read as a headerless sptensor: every line is one nonzero, the mode
//! count is inferred from the first line, mode sizes are the per-mode
//! maxima plus one, and the caller's `index_base` supplies the offset.
//!
//! With `gz = true` the same text is routed through a gzip filter.
//!
//! # Examples
//!
//! ```
//! use kruskal_sparse::io;
//! use std::io::Cursor;
//!
//! let text = "sptensor\n2\n3 4\n2\n0 1 2.5\n2 3 -1.0\n";
//! let x = io::import_sptensor_from(Cursor::new(text), 0).unwrap();
//! assert_eq!(x.nnz(), 2);
//! assert_eq!(x.sizes(), &[3, 4]);
//!
//! let mut out = Vec::new();
//! io::export_sptensor_to(&mut out, &x, &io::WriteOptions::default()).unwrap();
//! let back = io::import_sptensor_from(Cursor::new(out), 0).unwrap();
//! assert_eq!(back.nnz(), 2);
//! ```

use crate::coo::SpTensor;
use crate::error::{SparseError, SparseResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use kruskal_core::{FactorMatrix, Ktensor, Real};
use scirs2_core::ndarray_ext::Array1;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Numeric formatting for text export.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Digits after the decimal point.
    pub digits: usize,
    /// Scientific (`%e`-style) rather than fixed notation.
    pub scientific: bool,
    /// Write subscripts one-based with the matching header tag.
    pub one_based: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            digits: 15,
            scientific: true,
            one_based: false,
        }
    }
}

fn fmt_value(v: Real, opts: &WriteOptions) -> String {
    if opts.scientific {
        format!("{:.*e}", opts.digits, v)
    } else {
        format!("{:.*}", opts.digits, v)
    }
}

// ---------------------------------------------------------------------------
// Line-level reading
// ---------------------------------------------------------------------------

/// Content lines of a text stream: comments and blanks skipped, `\r`
/// stripped, line numbers tracked for error reporting.
struct LineSource<R: BufRead> {
    reader: R,
    line_no: usize,
}

impl<R: BufRead> LineSource<R> {
    fn new(reader: R) -> Self {
        Self { reader, line_no: 0 }
    }

    fn next_line(&mut self) -> SparseResult<Option<String>> {
        loop {
            let mut buf = String::new();
            let n = self
                .reader
                .read_line(&mut buf)
                .map_err(|e| SparseError::MalformedInput {
                    line: self.line_no + 1,
                    reason: format!("read error: {}", e),
                })?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            while buf.ends_with('\n') || buf.ends_with('\r') {
                buf.pop();
            }
            let trimmed = buf.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                continue;
            }
            return Ok(Some(buf));
        }
    }

    fn expect_line(&mut self, what: &str) -> SparseResult<String> {
        self.next_line()?.ok_or_else(|| SparseError::MalformedInput {
            line: self.line_no + 1,
            reason: format!("unexpected end of file, expected {}", what),
        })
    }

    fn expect_eof(&mut self) -> SparseResult<()> {
        match self.next_line()? {
            None => Ok(()),
            Some(_) => Err(SparseError::MalformedInput {
                line: self.line_no,
                reason: "unexpected content after end of data".to_string(),
            }),
        }
    }

    fn line(&self) -> usize {
        self.line_no
    }
}

fn tokens(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

fn parse_usize(tok: &str, line: usize, what: &str) -> SparseResult<usize> {
    tok.parse::<usize>().map_err(|_| SparseError::MalformedInput {
        line,
        reason: format!("cannot parse {} from '{}'", what, tok),
    })
}

fn parse_positive(tok: &str, line: usize, what: &str) -> SparseResult<usize> {
    let v = parse_usize(tok, line, what)?;
    if v == 0 {
        return Err(SparseError::MalformedInput {
            line,
            reason: format!("{} must be positive", what),
        });
    }
    Ok(v)
}

fn parse_real(tok: &str, line: usize, what: &str) -> SparseResult<Real> {
    tok.parse::<Real>().map_err(|_| SparseError::MalformedInput {
        line,
        reason: format!("cannot parse {} from '{}'", what, tok),
    })
}

/// Subscript offset from an optional `indices-start-at-*` header tag.
fn parse_index_tag(toks: &[&str], line: usize) -> SparseResult<usize> {
    match toks.get(1).copied() {
        None => Ok(0),
        Some("indices-start-at-zero") => Ok(0),
        Some("indices-start-at-one") => Ok(1),
        Some(other) => Err(SparseError::MalformedInput {
            line,
            reason: format!("unknown header tag '{}'", other),
        }),
    }
}

fn parse_subscript(tok: &str, offset: usize, line: usize, mode: usize) -> SparseResult<usize> {
    let raw = parse_usize(tok, line, "subscript")?;
    if raw < offset {
        return Err(SparseError::MalformedInput {
            line,
            reason: format!(
                "subscript {} for mode {} is below the index base {}",
                raw, mode, offset
            ),
        });
    }
    Ok(raw - offset)
}

fn expect_field_count(toks: &[&str], expected: usize, line: usize) -> SparseResult<()> {
    if toks.len() != expected {
        return Err(SparseError::MalformedInput {
            line,
            reason: format!("expected {} fields, got {}", expected, toks.len()),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Sparse tensor
// ---------------------------------------------------------------------------

/// Read an sptensor from any buffered reader.
///
/// `index_base` applies only to headerless files; headered files carry
/// their offset in the keyword line.
pub fn import_sptensor_from(reader: impl BufRead, index_base: usize) -> SparseResult<SpTensor> {
    let mut src = LineSource::new(reader);
    let first = src.expect_line("sptensor header or data")?;
    let toks = tokens(&first);

    if toks.first().copied() == Some("sptensor") {
        let offset = parse_index_tag(&toks, src.line())?;
        let tensor = read_headered_sptensor(&mut src, offset)?;
        src.expect_eof()?;
        Ok(tensor)
    } else {
        read_headerless_sptensor(&mut src, &first, index_base)
    }
}

fn read_headered_sptensor<R: BufRead>(
    src: &mut LineSource<R>,
    offset: usize,
) -> SparseResult<SpTensor> {
    let line = src.expect_line("number of modes")?;
    let toks = tokens(&line);
    expect_field_count(&toks, 1, src.line())?;
    let nd = parse_positive(toks[0], src.line(), "number of modes")?;

    let line = src.expect_line("mode sizes")?;
    let toks = tokens(&line);
    expect_field_count(&toks, nd, src.line())?;
    let mut sizes = Vec::with_capacity(nd);
    for tok in &toks {
        sizes.push(parse_positive(tok, src.line(), "mode size")?);
    }

    let line = src.expect_line("number of nonzeros")?;
    let toks = tokens(&line);
    expect_field_count(&toks, 1, src.line())?;
    let nnz = parse_usize(toks[0], src.line(), "number of nonzeros")?;

    let mut subs = Vec::with_capacity(nnz * nd);
    let mut vals = Vec::with_capacity(nnz);
    for _ in 0..nnz {
        let line = src.expect_line("nonzero entry")?;
        let toks = tokens(&line);
        expect_field_count(&toks, nd + 1, src.line())?;
        for (d, tok) in toks[..nd].iter().enumerate() {
            subs.push(parse_subscript(tok, offset, src.line(), d)?);
        }
        vals.push(parse_real(toks[nd], src.line(), "value")?);
    }

    SpTensor::new(sizes, subs, vals)
}

fn read_headerless_sptensor<R: BufRead>(
    src: &mut LineSource<R>,
    first: &str,
    offset: usize,
) -> SparseResult<SpTensor> {
    let first_toks = tokens(first);
    if first_toks.len() < 2 {
        return Err(SparseError::MalformedInput {
            line: src.line(),
            reason: "headerless sptensor line needs at least one subscript and a value"
                .to_string(),
        });
    }
    let nd = first_toks.len() - 1;

    let mut subs = Vec::new();
    let mut vals = Vec::new();
    let mut parse_row = |toks: &[&str], line: usize| -> SparseResult<()> {
        expect_field_count(toks, nd + 1, line)?;
        for (d, tok) in toks[..nd].iter().enumerate() {
            subs.push(parse_subscript(tok, offset, line, d)?);
        }
        vals.push(parse_real(toks[nd], line, "value")?);
        Ok(())
    };

    parse_row(&first_toks, src.line())?;
    while let Some(line) = src.next_line()? {
        let toks = tokens(&line);
        parse_row(&toks, src.line())?;
    }

    // Mode sizes are the observed maxima plus one.
    let mut sizes = vec![0usize; nd];
    for row in subs.chunks(nd) {
        for (d, &s) in row.iter().enumerate() {
            sizes[d] = sizes[d].max(s + 1);
        }
    }

    SpTensor::new(sizes, subs, vals)
}

/// Write an sptensor in the headered text format.
pub fn export_sptensor_to(
    w: &mut impl Write,
    x: &SpTensor,
    opts: &WriteOptions,
) -> std::io::Result<()> {
    if opts.one_based {
        writeln!(w, "sptensor indices-start-at-one")?;
    } else {
        writeln!(w, "sptensor")?;
    }
    writeln!(w, "{}", x.ndims())?;
    writeln!(
        w,
        "{}",
        x.sizes()
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    )?;
    writeln!(w, "{}", x.nnz())?;

    let shift = usize::from(opts.one_based);
    for i in 0..x.nnz() {
        for d in 0..x.ndims() {
            write!(w, "{} ", x.subscript(i, d) + shift)?;
        }
        writeln!(w, "{}", fmt_value(x.value(i), opts))?;
    }
    Ok(())
}

pub fn import_sptensor(
    path: impl AsRef<Path>,
    index_base: usize,
    gz: bool,
) -> SparseResult<SpTensor> {
    import_sptensor_from(open_reader(path.as_ref(), gz)?, index_base)
}

pub fn export_sptensor(
    path: impl AsRef<Path>,
    x: &SpTensor,
    opts: &WriteOptions,
    gz: bool,
) -> SparseResult<()> {
    let path = path.as_ref();
    let mut w = create_writer(path, gz)?;
    export_sptensor_to(&mut w, x, opts).map_err(|e| SparseError::IoFailure {
        path: path.to_path_buf(),
        source: e,
    })?;
    w.flush().map_err(|e| SparseError::IoFailure {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Dense matrix
// ---------------------------------------------------------------------------

/// Read one matrix block (keyword line included) from an open source.
/// Used both standalone and for the blocks embedded in a ktensor file.
fn read_matrix_block<R: BufRead>(src: &mut LineSource<R>) -> SparseResult<FactorMatrix> {
    let header = src.expect_line("matrix header")?;
    let toks = tokens(&header);
    match toks.first().copied() {
        Some("matrix") | Some("facmatrix") => {}
        other => {
            return Err(SparseError::MalformedInput {
                line: src.line(),
                reason: format!(
                    "expected 'matrix' or 'facmatrix' keyword, got '{}'",
                    other.unwrap_or("")
                ),
            })
        }
    }
    // An index-base tag on a matrix is informational only; validate and
    // discard.
    let _ = parse_index_tag(&toks, src.line())?;

    let line = src.expect_line("matrix dimension count")?;
    let toks = tokens(&line);
    expect_field_count(&toks, 1, src.line())?;
    let nd = parse_positive(toks[0], src.line(), "dimension count")?;
    if nd != 2 {
        return Err(SparseError::MalformedInput {
            line: src.line(),
            reason: format!("matrix must declare 2 dimensions, got {}", nd),
        });
    }

    let line = src.expect_line("matrix sizes")?;
    let toks = tokens(&line);
    expect_field_count(&toks, 2, src.line())?;
    let nrows = parse_positive(toks[0], src.line(), "row count")?;
    let ncols = parse_positive(toks[1], src.line(), "column count")?;

    let mut values = Vec::with_capacity(nrows * ncols);
    for _ in 0..nrows {
        let line = src.expect_line("matrix row")?;
        let toks = tokens(&line);
        expect_field_count(&toks, ncols, src.line())?;
        for tok in &toks {
            values.push(parse_real(tok, src.line(), "matrix entry")?);
        }
    }

    FactorMatrix::from_vec(values, nrows, ncols).map_err(|e| SparseError::MalformedInput {
        line: src.line(),
        reason: e.to_string(),
    })
}

fn write_matrix_block(
    w: &mut impl Write,
    m: &FactorMatrix,
    opts: &WriteOptions,
) -> std::io::Result<()> {
    writeln!(w, "matrix")?;
    writeln!(w, "2")?;
    writeln!(w, "{} {}", m.nrows(), m.ncols())?;
    for i in 0..m.nrows() {
        let row: Vec<String> = m
            .row_slice(i)
            .iter()
            .map(|&v| fmt_value(v, opts))
            .collect();
        writeln!(w, "{}", row.join(" "))?;
    }
    Ok(())
}

pub fn import_matrix_from(reader: impl BufRead) -> SparseResult<FactorMatrix> {
    let mut src = LineSource::new(reader);
    let m = read_matrix_block(&mut src)?;
    src.expect_eof()?;
    Ok(m)
}

pub fn export_matrix_to(
    w: &mut impl Write,
    m: &FactorMatrix,
    opts: &WriteOptions,
) -> std::io::Result<()> {
    write_matrix_block(w, m, opts)
}

pub fn import_matrix(path: impl AsRef<Path>, gz: bool) -> SparseResult<FactorMatrix> {
    import_matrix_from(open_reader(path.as_ref(), gz)?)
}

pub fn export_matrix(
    path: impl AsRef<Path>,
    m: &FactorMatrix,
    opts: &WriteOptions,
    gz: bool,
) -> SparseResult<()> {
    let path = path.as_ref();
    let mut w = create_writer(path, gz)?;
    export_matrix_to(&mut w, m, opts).map_err(|e| SparseError::IoFailure {
        path: path.to_path_buf(),
        source: e,
    })?;
    w.flush().map_err(|e| SparseError::IoFailure {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// K-tensor
// ---------------------------------------------------------------------------

/// Read a ktensor: header, mode count, sizes, rank, weights, then one
/// embedded matrix block per mode.
pub fn import_ktensor_from(reader: impl BufRead) -> SparseResult<Ktensor> {
    let mut src = LineSource::new(reader);

    let header = src.expect_line("ktensor header")?;
    let toks = tokens(&header);
    if toks.first().copied() != Some("ktensor") {
        return Err(SparseError::MalformedInput {
            line: src.line(),
            reason: format!(
                "expected 'ktensor' keyword, got '{}'",
                toks.first().copied().unwrap_or("")
            ),
        });
    }
    let _ = parse_index_tag(&toks, src.line())?;

    let line = src.expect_line("number of modes")?;
    let toks = tokens(&line);
    expect_field_count(&toks, 1, src.line())?;
    let nd = parse_positive(toks[0], src.line(), "number of modes")?;

    let line = src.expect_line("mode sizes")?;
    let toks = tokens(&line);
    expect_field_count(&toks, nd, src.line())?;
    let mut sizes = Vec::with_capacity(nd);
    for tok in &toks {
        sizes.push(parse_positive(tok, src.line(), "mode size")?);
    }

    let line = src.expect_line("number of components")?;
    let toks = tokens(&line);
    expect_field_count(&toks, 1, src.line())?;
    let nc = parse_positive(toks[0], src.line(), "number of components")?;

    let line = src.expect_line("weights")?;
    let toks = tokens(&line);
    expect_field_count(&toks, nc, src.line())?;
    let mut weights = Vec::with_capacity(nc);
    for tok in &toks {
        let w = parse_real(tok, src.line(), "weight")?;
        if w < 0.0 {
            return Err(SparseError::MalformedInput {
                line: src.line(),
                reason: format!("ktensor weight {} is negative", w),
            });
        }
        weights.push(w);
    }

    let mut factors = Vec::with_capacity(nd);
    for (d, &size) in sizes.iter().enumerate() {
        let factor = read_matrix_block(&mut src)?;
        if factor.nrows() != size || factor.ncols() != nc {
            return Err(SparseError::MalformedInput {
                line: src.line(),
                reason: format!(
                    "factor {} is {}x{}, expected {}x{}",
                    d,
                    factor.nrows(),
                    factor.ncols(),
                    size,
                    nc
                ),
            });
        }
        factors.push(factor);
    }
    src.expect_eof()?;

    Ktensor::from_parts(Array1::from_vec(weights), factors).map_err(|e| {
        SparseError::MalformedInput {
            line: src.line(),
            reason: e.to_string(),
        }
    })
}

pub fn export_ktensor_to(
    w: &mut impl Write,
    k: &Ktensor,
    opts: &WriteOptions,
) -> std::io::Result<()> {
    writeln!(w, "ktensor")?;
    writeln!(w, "{}", k.ndims())?;
    writeln!(
        w,
        "{}",
        k.factors()
            .iter()
            .map(|f| f.nrows().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    )?;
    writeln!(w, "{}", k.ncomponents())?;
    writeln!(
        w,
        "{}",
        k.weights()
            .iter()
            .map(|&v| fmt_value(v, opts))
            .collect::<Vec<_>>()
            .join(" ")
    )?;
    for factor in k.factors() {
        write_matrix_block(w, factor, opts)?;
    }
    Ok(())
}

pub fn import_ktensor(path: impl AsRef<Path>, gz: bool) -> SparseResult<Ktensor> {
    import_ktensor_from(open_reader(path.as_ref(), gz)?)
}

pub fn export_ktensor(
    path: impl AsRef<Path>,
    k: &Ktensor,
    opts: &WriteOptions,
    gz: bool,
) -> SparseResult<()> {
    let path = path.as_ref();
    let mut w = create_writer(path, gz)?;
    export_ktensor_to(&mut w, k, opts).map_err(|e| SparseError::IoFailure {
        path: path.to_path_buf(),
        source: e,
    })?;
    w.flush().map_err(|e| SparseError::IoFailure {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// File plumbing
// ---------------------------------------------------------------------------

fn open_reader(path: &Path, gz: bool) -> SparseResult<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|e| SparseError::IoFailure {
        path: path.to_path_buf(),
        source: e,
    })?;
    if gz {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn create_writer(path: &Path, gz: bool) -> SparseResult<Box<dyn Write>> {
    let file = File::create(path).map_err(|e| SparseError::IoFailure {
        path: path.to_path_buf(),
        source: e,
    })?;
    if gz {
        Ok(Box::new(GzEncoder::new(
            BufWriter::new(file),
            Compression::default(),
        )))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}
