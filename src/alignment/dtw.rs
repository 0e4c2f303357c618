use crate::error::AssessmentError;

/// Weight of a diagonal step (symmetric step pattern).
const DIAGONAL_WEIGHT: f64 = 2.0;

/// Dynamic time warping over a precomputed cost matrix (`rows x cols`).
///
/// Symmetric step pattern: diagonal moves pay twice the cell cost, vertical and
/// horizontal moves pay it once. The path is pinned to `(0, 0)` and
/// `(rows - 1, cols - 1)`. Returns the warping path as `(row, col)` pairs in
/// forward order.
pub fn warping_path(cost: &[Vec<f64>]) -> Result<Vec<(usize, usize)>, AssessmentError> {
    let rows = cost.len();
    let cols = cost.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 {
        return Err(AssessmentError::invalid_input("dtw: empty cost matrix"));
    }
    if cost.iter().any(|row| row.len() != cols) {
        return Err(AssessmentError::invalid_input("dtw: ragged cost matrix"));
    }
    if cost.iter().flatten().any(|c| !c.is_finite()) {
        return Err(AssessmentError::invalid_input("dtw: non-finite cost"));
    }

    let mut acc = vec![vec![f64::INFINITY; cols]; rows];
    let mut bp = vec![STEP_NONE; rows * cols];
    acc[0][0] = cost[0][0];
    for i in 0..rows {
        for j in 0..cols {
            if i == 0 && j == 0 {
                continue;
            }
            let (best, step) = best_transition(&acc, cost[i][j], i, j);
            acc[i][j] = best;
            bp[i * cols + j] = step;
        }
    }

    let (mut i, mut j) = (rows - 1, cols - 1);
    let mut path = Vec::with_capacity(rows + cols);
    path.push((i, j));
    while i > 0 || j > 0 {
        match bp[i * cols + j] {
            STEP_DIAGONAL => {
                i -= 1;
                j -= 1;
            }
            STEP_VERTICAL => i -= 1,
            STEP_HORIZONTAL => j -= 1,
            _ => {
                return Err(AssessmentError::invalid_input(format!(
                    "dtw: broken backpointer at ({i}, {j})"
                )))
            }
        }
        path.push((i, j));
    }
    path.reverse();
    Ok(path)
}

const STEP_NONE: u8 = 0;
const STEP_DIAGONAL: u8 = 1;
const STEP_VERTICAL: u8 = 2;
const STEP_HORIZONTAL: u8 = 3;

/// Cheapest way into `(i, j)`; ties prefer diagonal, then vertical, then horizontal.
#[inline(always)]
fn best_transition(acc: &[Vec<f64>], c: f64, i: usize, j: usize) -> (f64, u8) {
    let mut best = f64::INFINITY;
    let mut step = STEP_NONE;

    if i > 0 && j > 0 {
        best = acc[i - 1][j - 1] + DIAGONAL_WEIGHT * c;
        step = STEP_DIAGONAL;
    }
    if i > 0 {
        let cand = acc[i - 1][j] + c;
        if cand < best {
            best = cand;
            step = STEP_VERTICAL;
        }
    }
    if j > 0 {
        let cand = acc[i][j - 1] + c;
        if cand < best {
            best = cand;
            step = STEP_HORIZONTAL;
        }
    }

    (best, step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_cost_matrix_follows_diagonal() {
        let cost = vec![
            vec![0.0, 1.0, 1.0],
            vec![1.0, 0.0, 1.0],
            vec![1.0, 1.0, 0.0],
        ];
        let path = warping_path(&cost).unwrap();
        assert_eq!(path, vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn path_is_pinned_and_monotonic() {
        let cost = vec![
            vec![0.0, 3.0, 2.0, 1.0],
            vec![4.0, 0.0, 5.0, 2.0],
        ];
        let path = warping_path(&cost).unwrap();
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(1, 3)));
        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(b.0 >= a.0 && b.1 >= a.1);
            assert!(b.0 - a.0 <= 1 && b.1 - a.1 <= 1);
            assert_ne!(a, b);
        }
    }

    #[test]
    fn single_row_walks_horizontally() {
        let path = warping_path(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(path, vec![(0, 0), (0, 1), (0, 2)]);
    }

    #[test]
    fn rejects_empty_ragged_and_non_finite_matrices() {
        assert!(warping_path(&[]).is_err());
        assert!(warping_path(&[vec![]]).is_err());
        assert!(warping_path(&[vec![1.0, 2.0], vec![1.0]]).is_err());
        assert!(warping_path(&[vec![f64::NAN]]).is_err());
    }
}
