use core::ops::{Add, Mul, Sub};

use super::{DynMatrix, DynVector};
use crate::traits::Scalar;

impl<T: Scalar> Add for &DynMatrix<T> {
    type Output = DynMatrix<T>;

    fn add(self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(self.nrows(), rhs.nrows(), "matrix dimension mismatch");
        assert_eq!(self.ncols(), rhs.ncols(), "matrix dimension mismatch");
        let mut out = DynMatrix::zeros(self.nrows(), self.ncols());
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                out[(i, j)] = self[(i, j)] + rhs[(i, j)];
            }
        }
        out
    }
}

impl<T: Scalar> Sub for &DynMatrix<T> {
    type Output = DynMatrix<T>;

    fn sub(self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(self.nrows(), rhs.nrows(), "matrix dimension mismatch");
        assert_eq!(self.ncols(), rhs.ncols(), "matrix dimension mismatch");
        let mut out = DynMatrix::zeros(self.nrows(), self.ncols());
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                out[(i, j)] = self[(i, j)] - rhs[(i, j)];
            }
        }
        out
    }
}

impl<T: Scalar> Mul for &DynMatrix<T> {
    type Output = DynMatrix<T>;

    fn mul(self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(self.ncols(), rhs.nrows(), "matrix dimension mismatch");
        let mut out = DynMatrix::zeros(self.nrows(), rhs.ncols());
        for j in 0..rhs.ncols() {
            for k in 0..self.ncols() {
                let r = rhs[(k, j)];
                for i in 0..self.nrows() {
                    out[(i, j)] = out[(i, j)] + self[(i, k)] * r;
                }
            }
        }
        out
    }
}

impl<T: Scalar> Mul<&DynVector<T>> for &DynMatrix<T> {
    type Output = DynVector<T>;

    fn mul(self, rhs: &DynVector<T>) -> DynVector<T> {
        self.mul_vector(rhs)
    }
}
