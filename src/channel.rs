//! Channel matrices.
//!
//! The impairment matrices of a chain are cascaded in propagation order: each
//! matrix pre-multiplies the product of the matrices before it. The full
//! product is the channel matrix of the link, and the product from a given
//! stage to the end (the tail product) is the operator that takes a noise
//! source injected at that stage to the receiver.

use crate::{error::ConfigurationError, linalg::{self, CMatrix}};

/// Channel matrix and tail products of a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMatrices {
    /// Product of all the impairment matrices, `H = M_n ... M_1 M_0`.
    pub h_chain: CMatrix,
    /// Tail products indexed by noise stage.
    ///
    /// `tails[i] = M_n ... M_i` is the product of the impairment matrices
    /// from `i` to the last one. There is one more tail than impairment
    /// matrices: the last tail is the empty product (the identity), which
    /// corresponds to the receiver noise source.
    pub tails: Vec<CMatrix>,
}

impl ChannelMatrices {
    /// Builds the channel matrix and the tail products.
    ///
    /// `impairments` lists the impairment matrices in propagation order. All
    /// of them must have size `dim` x `dim`.
    pub fn build(
        dim: usize,
        impairments: &[CMatrix],
    ) -> Result<ChannelMatrices, ConfigurationError> {
        if impairments.is_empty() {
            return Err(ConfigurationError::EmptyChannel);
        }
        for h in impairments {
            let (n, m) = h.dim();
            if n != dim || m != dim {
                return Err(ConfigurationError::DimensionMismatch {
                    expected: dim,
                    found: if n != dim { n } else { m },
                });
            }
        }
        let mut tails = vec![linalg::identity(dim); impairments.len() + 1];
        for (i, h) in impairments.iter().enumerate().rev() {
            tails[i] = tails[i + 1].dot(h);
        }
        Ok(ChannelMatrices {
            h_chain: tails[0].clone(),
            tails,
        })
    }

    /// Returns the number of dimensions.
    pub fn dim(&self) -> usize {
        self.h_chain.nrows()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::linalg::{diag, max_norm};
    use ndarray::arr2;
    use num_complex::Complex64;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn cascade_order() {
        let a = arr2(&[[c(1.0, 0.0), c(2.0, 0.0)], [c(0.0, 0.0), c(1.0, 0.0)]]);
        let b = arr2(&[[c(0.0, 1.0), c(0.0, 0.0)], [c(3.0, 0.0), c(1.0, 0.0)]]);
        let d = diag(&[2.0, 0.5]);
        let channel = ChannelMatrices::build(2, &[a.clone(), b.clone(), d.clone()]).unwrap();
        assert_eq!(channel.tails.len(), 4);
        assert!(max_norm(&(&channel.h_chain - &d.dot(&b).dot(&a))) < 1e-15);
        assert!(max_norm(&(&channel.tails[1] - &d.dot(&b))) < 1e-15);
        assert_eq!(channel.tails[2], d);
        assert_eq!(channel.tails[3], linalg::identity(2));
        assert_eq!(channel.h_chain, channel.tails[0]);
        assert_eq!(channel.dim(), 2);
    }

    #[test]
    fn single_matrix() {
        let channel = ChannelMatrices::build(3, &[linalg::identity(3)]).unwrap();
        assert_eq!(channel.h_chain, linalg::identity(3));
        assert_eq!(channel.tails, vec![linalg::identity(3); 2]);
    }

    #[test]
    fn malformed() {
        assert_eq!(
            ChannelMatrices::build(2, &[]),
            Err(ConfigurationError::EmptyChannel)
        );
        assert_eq!(
            ChannelMatrices::build(2, &[linalg::identity(2), linalg::identity(4)]),
            Err(ConfigurationError::DimensionMismatch {
                expected: 2,
                found: 4
            })
        );
    }
}
