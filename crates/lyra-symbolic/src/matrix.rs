//! Determinant and inverse of square expression matrices.
//!
//! Both use fraction-based Gaussian elimination. Every intermediate entry is
//! simplified, so pivots are chosen by an exact zero test.

use tracing::debug;

use crate::array::SymArray;
use crate::error::{SymbolicError, SymbolicResult};
use crate::expr::Expr;

fn square_rows(m: &SymArray) -> SymbolicResult<Vec<Vec<Expr>>> {
    let shape = m.shape();
    if shape.len() != 2 || shape[0] != shape[1] {
        return Err(SymbolicError::NotSquare {
            shape: shape.to_vec(),
        });
    }
    let n = shape[0];
    let values = m.to_vec();
    Ok(values.chunks(n.max(1)).take(n).map(<[Expr]>::to_vec).collect())
}

fn pivot_row(rows: &[Vec<Expr>], col: usize) -> Option<usize> {
    (col..rows.len()).find(|&r| !rows[r][col].is_zero())
}

impl SymArray {
    /// Determinant of a square rank-2 array.
    pub fn determinant(&self) -> SymbolicResult<Expr> {
        let mut rows = square_rows(self)?;
        for row in rows.iter_mut() {
            for entry in row.iter_mut() {
                *entry = entry.simplify()?;
            }
        }
        let n = rows.len();
        let mut det = Expr::one();
        for col in 0..n {
            let Some(p) = pivot_row(&rows, col) else {
                return Ok(Expr::zero());
            };
            if p != col {
                rows.swap(p, col);
                det = -det;
            }
            let pivot = rows[col][col].clone();
            det = det * &pivot;
            for r in (col + 1)..n {
                if rows[r][col].is_zero() {
                    continue;
                }
                let factor = &rows[r][col] / &pivot;
                for c in col..n {
                    let updated = &rows[r][c] - &factor * &rows[col][c];
                    rows[r][c] = updated.simplify()?;
                }
            }
        }
        det.simplify()
    }

    /// Inverse of a square rank-2 array.
    pub fn inverse(&self) -> SymbolicResult<SymArray> {
        let mut rows = square_rows(self)?;
        let n = rows.len();
        debug!(dim = n, "inverting matrix");
        for (i, row) in rows.iter_mut().enumerate() {
            for entry in row.iter_mut() {
                *entry = entry.simplify()?;
            }
            row.extend((0..n).map(|j| if i == j { Expr::one() } else { Expr::zero() }));
        }

        for col in 0..n {
            let p = pivot_row(&rows, col).ok_or(SymbolicError::SingularMatrix)?;
            rows.swap(p, col);
            let pivot = rows[col][col].clone();
            if !pivot.is_one() {
                for c in 0..2 * n {
                    let scaled = &rows[col][c] / &pivot;
                    rows[col][c] = scaled.simplify()?;
                }
            }
            for r in 0..n {
                if r == col || rows[r][col].is_zero() {
                    continue;
                }
                let factor = rows[r][col].clone();
                for c in 0..2 * n {
                    if rows[col][c].is_zero() {
                        continue;
                    }
                    let updated = &rows[r][c] - &factor * &rows[col][c];
                    rows[r][c] = updated.simplify()?;
                }
            }
        }

        let values = rows.into_iter().flat_map(|row| row.into_iter().skip(n)).collect();
        SymArray::from_shape_vec(&[n, n], values)
    }

    /// Matrix product of two rank-2 arrays.
    pub fn matmul(&self, other: &SymArray) -> SymbolicResult<SymArray> {
        self.tensor_product(other).contract(&[(1, 2)])
    }

    /// Square matrix with `entries` on the diagonal.
    pub fn diagonal(entries: Vec<Expr>) -> SymArray {
        let n = entries.len();
        SymArray::from_fn(&[n, n], |idx| {
            if idx[0] == idx[1] {
                entries[idx[0]].clone()
            } else {
                Expr::zero()
            }
        })
    }

    /// `n`×`n` identity.
    pub fn identity(n: usize) -> SymArray {
        SymArray::from_fn(&[n, n], |idx| {
            if idx[0] == idx[1] {
                Expr::one()
            } else {
                Expr::zero()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::on_engine_thread;

    fn x() -> Expr {
        Expr::sym("x")
    }

    #[test]
    fn test_numeric_determinant() {
        on_engine_thread(|| {
            let m = SymArray::from_rows(vec![
                vec![Expr::int(1), Expr::int(2)],
                vec![Expr::int(3), Expr::int(4)],
            ])
            .unwrap();
            assert_eq!(m.determinant().unwrap(), Expr::int(-2));
        });
    }

    #[test]
    fn test_symbolic_diagonal_inverse() {
        on_engine_thread(|| {
            let r = Expr::sym("r");
            let m = SymArray::from_rows(vec![
                vec![Expr::one(), Expr::zero()],
                vec![Expr::zero(), r.powi(2)],
            ])
            .unwrap();
            let inv = m.inverse().unwrap();
            assert_eq!(inv[[1, 1]], r.powi(-2));
            assert_eq!(m.determinant().unwrap(), r.powi(2));
            assert_eq!(SymArray::diagonal(vec![Expr::one(), r.powi(2)]), m);
        });
    }

    #[test]
    fn test_inverse_needs_pivoting() {
        on_engine_thread(|| {
            let m = SymArray::from_rows(vec![
                vec![Expr::zero(), x()],
                vec![Expr::one(), Expr::zero()],
            ])
            .unwrap();
            let inv = m.inverse().unwrap();
            let prod = m.matmul(&inv).unwrap().simplify().unwrap();
            assert_eq!(prod, SymArray::identity(2));
            assert_eq!(m.determinant().unwrap(), -x());
        });
    }

    #[test]
    fn test_singular_and_non_square() {
        on_engine_thread(|| {
            let m = SymArray::from_rows(vec![vec![x(), x()], vec![x(), x()]]).unwrap();
            assert_eq!(m.inverse(), Err(SymbolicError::SingularMatrix));
            assert_eq!(m.determinant().unwrap(), Expr::zero());
            let v = SymArray::zeros(&[3]);
            assert!(matches!(v.inverse(), Err(SymbolicError::NotSquare { .. })));
        });
    }
}
