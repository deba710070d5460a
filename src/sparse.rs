//! Sparse matrix utilities.
//!
//! Constraint matrices are assembled as coordinate triplets and converted to
//! compressed sparse column form once, which is what Clarabel consumes.

use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Incremental builder for a sparse matrix with a fixed column count.
///
/// Rows are appended one at a time; entries with a zero value are skipped.
#[derive(Debug, Clone)]
pub struct TripletBuilder {
    ncols: usize,
    nrows: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
}

impl TripletBuilder {
    /// Create an empty builder for matrices with `ncols` columns.
    pub fn new(ncols: usize) -> Self {
        TripletBuilder {
            ncols,
            nrows: 0,
            rows: Vec::new(),
            cols: Vec::new(),
            vals: Vec::new(),
        }
    }

    /// Reserve room for `nnz` additional non-zeros.
    pub fn with_capacity(ncols: usize, nnz: usize) -> Self {
        TripletBuilder {
            ncols,
            nrows: 0,
            rows: Vec::with_capacity(nnz),
            cols: Vec::with_capacity(nnz),
            vals: Vec::with_capacity(nnz),
        }
    }

    /// Append a row given as `(column, value)` pairs.
    pub fn push_row(&mut self, entries: impl IntoIterator<Item = (usize, f64)>) {
        let row = self.nrows;
        for (col, val) in entries {
            debug_assert!(col < self.ncols, "column {} out of range", col);
            if val != 0.0 {
                self.rows.push(row);
                self.cols.push(col);
                self.vals.push(val);
            }
        }
        self.nrows += 1;
    }

    /// Number of rows appended so far.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Finish into a CSC matrix.
    pub fn build(self) -> CscMatrix<f64> {
        csc_from_triplets(self.nrows, self.ncols, self.rows, self.cols, self.vals)
    }
}

/// Create a CSC matrix from triplets (row, col, value).
///
/// Duplicates are summed together.
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
) -> CscMatrix<f64> {
    if rows.is_empty() {
        return CscMatrix::zeros(nrows, ncols);
    }

    let mut coo = CooMatrix::new(nrows, ncols);
    for ((row, col), val) in rows.into_iter().zip(cols).zip(vals) {
        if row < nrows && col < ncols {
            coo.push(row, col, val);
        }
    }

    CscMatrix::from(&coo)
}

/// Stack two CSC matrices with the same column count vertically.
pub fn csc_vstack(top: &CscMatrix<f64>, bottom: &CscMatrix<f64>) -> CscMatrix<f64> {
    let nnz = top.nnz() + bottom.nnz();
    let mut rows = Vec::with_capacity(nnz);
    let mut cols = Vec::with_capacity(nnz);
    let mut vals = Vec::with_capacity(nnz);

    let shifted = bottom
        .triplet_iter()
        .map(|(r, c, v)| (r + top.nrows(), c, v));
    for (r, c, v) in top.triplet_iter().chain(shifted) {
        rows.push(r);
        cols.push(c);
        vals.push(*v);
    }

    csc_from_triplets(
        top.nrows() + bottom.nrows(),
        top.ncols().max(bottom.ncols()),
        rows,
        cols,
        vals,
    )
}

/// Convert CSC to dense matrix.
#[cfg(test)]
pub(crate) fn csc_to_dense(sparse: &CscMatrix<f64>) -> nalgebra::DMatrix<f64> {
    let mut dense = nalgebra::DMatrix::zeros(sparse.nrows(), sparse.ncols());
    for (row, col, val) in sparse.triplet_iter() {
        dense[(row, col)] = *val;
    }
    dense
}
