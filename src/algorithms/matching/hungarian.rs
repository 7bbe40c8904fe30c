//! Rectangular linear assignment solver.
//!
//! Shortest augmenting path form of the Hungarian (Kuhn-Munkres) method with
//! row/column potentials, O(n²·m) for an n×m matrix with n ≤ m. Wider-than-tall
//! and taller-than-wide matrices are both accepted; the smaller side is always
//! fully assigned.

/// Dense row-major cost matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl CostMatrix {
    /// Matrix with every cell set to `fill`.
    pub fn new(rows: usize, cols: usize, fill: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![fill; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    fn transposed(&self) -> Self {
        let mut out = CostMatrix::new(self.cols, self.rows, 0.0);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.set(c, r, self.get(r, c));
            }
        }
        out
    }
}

/// Minimum-cost assignment. Returns the column assigned to each row.
///
/// Every row gets a column when `rows ≤ cols`; otherwise exactly `cols` rows
/// are assigned and the rest are `None`. Costs must be finite.
///
/// # Example
/// ```
/// use pramana::algorithms::matching::hungarian::{CostMatrix, solve};
///
/// let mut costs = CostMatrix::new(2, 2, 0.0);
/// costs.set(0, 0, 4.0);
/// costs.set(0, 1, 1.0);
/// costs.set(1, 0, 2.0);
/// costs.set(1, 1, 8.0);
/// assert_eq!(solve(&costs), vec![Some(1), Some(0)]);
/// ```
pub fn solve(costs: &CostMatrix) -> Vec<Option<usize>> {
    if costs.rows == 0 || costs.cols == 0 {
        return vec![None; costs.rows];
    }

    if costs.rows <= costs.cols {
        return solve_wide(costs);
    }

    // Solve column-to-row and invert
    let by_col = solve_wide(&costs.transposed());
    let mut by_row = vec![None; costs.rows];
    for (col, row) in by_col.into_iter().enumerate() {
        if let Some(row) = row {
            by_row[row] = Some(col);
        }
    }
    by_row
}

/// Total cost of an assignment.
pub fn assignment_cost(costs: &CostMatrix, assignment: &[Option<usize>]) -> f64 {
    assignment
        .iter()
        .enumerate()
        .filter_map(|(r, c)| c.map(|c| costs.get(r, c)))
        .sum()
}

/// Solver for `rows ≤ cols`. Indices are 1-based internally; 0 is the
/// virtual column used to start each augmenting path.
fn solve_wide(costs: &CostMatrix) -> Vec<Option<usize>> {
    let n = costs.rows;
    let m = costs.cols;

    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; m + 1];
    // p[j]: row assigned to column j (0 = none)
    let mut p = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = costs.get(i0 - 1, j - 1) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        // Flip the augmenting path
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![None; n];
    for j in 1..=m {
        if p[j] != 0 {
            assignment[p[j] - 1] = Some(j - 1);
        }
    }
    assignment
}
