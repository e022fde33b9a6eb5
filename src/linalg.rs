//! Dense complex linear algebra.
//!
//! The matrices handled by this crate are small (D x D with D typically
//! between 2 and 8), so a straightforward Gauss-Jordan inversion is used
//! instead of pulling in a LAPACK binding.

use ndarray::{s, Array2};
use num_complex::Complex64;
use num_traits::{One, Zero};
use thiserror::Error;

/// Complex matrix.
pub type CMatrix = Array2<Complex64>;

/// Pivots smaller than this, relative to the largest entry of the matrix,
/// are treated as zero.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Linear algebra error.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Error)]
pub enum Error {
    /// The matrix is singular or too ill-conditioned to be inverted.
    #[error("matrix is singular or ill-conditioned")]
    Singular,
    /// The matrix is not square.
    #[error("matrix is not square")]
    NotSquare,
}

/// Returns the `dim` x `dim` identity matrix.
pub fn identity(dim: usize) -> CMatrix {
    Array2::from_diag_elem(dim, Complex64::one())
}

/// Returns a diagonal matrix with real entries.
pub fn diag(values: &[f64]) -> CMatrix {
    let mut a = CMatrix::zeros((values.len(), values.len()));
    for (j, &x) in values.iter().enumerate() {
        a[[j, j]] = Complex64::new(x, 0.0);
    }
    a
}

/// Returns the Hermitian conjugate (conjugate transpose) of a matrix.
pub fn adjoint(a: &CMatrix) -> CMatrix {
    a.t().mapv(|x| x.conj())
}

/// Returns the largest absolute value of the entries of `a`.
pub fn max_norm(a: &CMatrix) -> f64 {
    a.iter().map(|x| x.norm()).fold(0.0, f64::max)
}

/// Checks whether `a` is unitary up to a tolerance.
///
/// The check is done on the entries of `a a^H - I`.
pub fn is_unitary(a: &CMatrix, tol: f64) -> bool {
    let (n, m) = a.dim();
    n == m && max_norm(&(a.dot(&adjoint(a)) - identity(n))) < tol
}

/// Inverts a square complex matrix.
///
/// Gauss-Jordan elimination with partial pivoting is performed on the
/// augmented matrix `[A I]`. An error is returned if a pivot is too small
/// compared to the largest entry of `a`.
pub fn invert(a: &CMatrix) -> Result<CMatrix, Error> {
    let (n, m) = a.dim();
    if n != m {
        return Err(Error::NotSquare);
    }
    let scale = max_norm(a);
    if scale == 0.0 || !scale.is_finite() {
        return Err(Error::Singular);
    }
    let threshold = PIVOT_TOLERANCE * scale;

    let mut aug = CMatrix::zeros((n, 2 * n));
    aug.slice_mut(s![.., ..n]).assign(a);
    aug.slice_mut(s![.., n..]).assign(&identity(n));

    // Reduce to upper triangular with ones on diagonal
    for j in 0..n {
        // Largest element in current column
        let (k, pivot) = aug
            .slice(s![j.., j])
            .iter()
            .enumerate()
            .map(|(t, x)| (j + t, x.norm()))
            .fold((j, -1.0), |acc, x| if x.1 > acc.1 { x } else { acc });
        if !(pivot > threshold) {
            return Err(Error::Singular);
        }

        if k != j {
            // Swap rows j and k
            for t in j..2 * n {
                aug.swap([j, t], [k, t]);
            }
        }

        let x = aug[[j, j]];
        for t in j..2 * n {
            aug[[j, t]] /= x;
        }

        // Subtract to rows below to make zeros below diagonal
        for t in (j + 1)..n {
            let x = aug[[t, j]];
            if !x.is_zero() {
                for u in j..2 * n {
                    let y = aug[[j, u]];
                    aug[[t, u]] -= x * y;
                }
            }
        }
    }

    // Reduce to identity
    for j in (0..n).rev() {
        for t in 0..j {
            let x = aug[[t, j]];
            if !x.is_zero() {
                for u in j..2 * n {
                    let y = aug[[j, u]];
                    aug[[t, u]] -= x * y;
                }
            }
        }
    }

    let inv = aug.slice(s![.., n..]).to_owned();
    if inv.iter().any(|x| !x.is_finite()) {
        return Err(Error::Singular);
    }
    Ok(inv)
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::arr2;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn invert_complex() {
        let a = arr2(&[
            [c(2.0, 1.0), c(0.0, -1.0), c(1.0, 0.0)],
            [c(0.5, 0.0), c(3.0, 0.0), c(0.0, 2.0)],
            [c(0.0, 0.0), c(1.0, 1.0), c(4.0, -1.0)],
        ]);
        let inv = invert(&a).unwrap();
        assert!(max_norm(&(a.dot(&inv) - identity(3))) < 1e-12);
        assert!(max_norm(&(inv.dot(&a) - identity(3))) < 1e-12);
    }

    #[test]
    fn invert_needs_pivoting() {
        let a = arr2(&[[c(0.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]]);
        let inv = invert(&a).unwrap();
        assert_eq!(inv, a);
    }

    #[test]
    fn singular() {
        let a = arr2(&[[c(1.0, 0.0), c(2.0, 0.0)], [c(2.0, 0.0), c(4.0, 0.0)]]);
        assert_eq!(invert(&a), Err(Error::Singular));
        let z = CMatrix::zeros((3, 3));
        assert_eq!(invert(&z), Err(Error::Singular));
    }

    #[test]
    fn ill_conditioned() {
        let a = arr2(&[
            [c(1.0, 0.0), c(1.0, 0.0)],
            [c(1.0, 0.0), c(1.0 + 1e-15, 0.0)],
        ]);
        assert_eq!(invert(&a), Err(Error::Singular));
    }

    #[test]
    fn not_square() {
        let a = CMatrix::zeros((2, 3));
        assert_eq!(invert(&a), Err(Error::NotSquare));
    }

    #[test]
    fn unitary() {
        let h = std::f64::consts::FRAC_1_SQRT_2;
        let a = arr2(&[[c(h, 0.0), c(0.0, h)], [c(0.0, h), c(h, 0.0)]]);
        assert!(is_unitary(&a, 1e-12));
        assert!(!is_unitary(&diag(&[1.0, 0.5]), 1e-12));
    }
}
