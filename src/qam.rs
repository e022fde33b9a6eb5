//! QAM bit error rate.
//!
//! This module converts between SNR and BER for Gray-coded M-QAM in an AWGN
//! channel, using the usual closed-form approximation
//!
//! ```text
//! BER = 2 / log2(M) * (1 - 1 / sqrt(M)) * erfc(sqrt(3 SNR / (2 (M - 1))))
//! ```
//!
//! where SNR is the symbol SNR in linear units. For M = 4 this is the exact
//! BER of Gray-coded QPSK.
//!
//! The inverse conversion is done numerically by bisection, which is valid
//! because the BER is strictly decreasing in the SNR.
//!
//! At high SNR the BER falls below the smallest `f64`, so the conversions are
//! also available on the natural logarithm of the BER. The logarithm of
//! `erfc` is computed with its asymptotic expansion for large arguments.
//!
//! # References
//!
//! - QAM BER for AWGN channel: <https://www.etti.unibw.de/labalive/experiment/qam/>

use crate::{
    error::{ConfigurationError, NumericalError},
    units::db2lin,
};
use statrs::function::erf::erfc;
use std::f64::consts::PI;

/// Lower end of the SNR search interval (dB).
const MIN_SNR_DB: f64 = -50.0;
/// Upper end of the SNR search interval (dB).
const MAX_SNR_DB: f64 = 80.0;
/// Width of the bracketing interval at which the bisection stops (dB).
const TOLERANCE_DB: f64 = 1e-10;
/// Maximum number of bisection steps.
const MAX_ITERATIONS: usize = 200;
/// Argument of `erfc` above which its asymptotic expansion is used.
const ERFC_ASYMPTOTIC_THRESHOLD: f64 = 25.0;

/// Gray-coded M-QAM.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Qam {
    order: u32,
    scale: f64,
    argument_scale: f64,
}

impl Qam {
    /// Creates the BER model of M-QAM.
    ///
    /// The modulation order must be a power of two and at least 4.
    pub fn new(order: u32) -> Result<Qam, ConfigurationError> {
        if order < 4 || !order.is_power_of_two() {
            return Err(ConfigurationError::UnsupportedModulation(order));
        }
        let m = f64::from(order);
        Ok(Qam {
            order,
            scale: 2.0 / m.log2() * (1.0 - 1.0 / m.sqrt()),
            argument_scale: 3.0 / (2.0 * (m - 1.0)),
        })
    }

    /// Returns the modulation order.
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Returns the number of bits per symbol.
    pub fn bits_per_symbol(&self) -> u32 {
        self.order.trailing_zeros()
    }

    /// Returns the BER corresponding to an SNR in dB.
    ///
    /// The result underflows to zero at high SNR. Use [`Qam::ln_ber`] when
    /// that matters.
    pub fn ber(&self, snr_db: f64) -> f64 {
        self.scale * erfc(self.erfc_argument(snr_db))
    }

    /// Returns the natural logarithm of the BER corresponding to an SNR in
    /// dB.
    pub fn ln_ber(&self, snr_db: f64) -> f64 {
        self.scale.ln() + ln_erfc(self.erfc_argument(snr_db))
    }

    fn erfc_argument(&self, snr_db: f64) -> f64 {
        (self.argument_scale * db2lin(snr_db)).sqrt()
    }

    /// Returns the largest BER given by the model, which is approached as the
    /// SNR goes to zero.
    pub fn max_ber(&self) -> f64 {
        self.scale
    }

    /// Returns the SNR in dB corresponding to a BER.
    ///
    /// An error is returned if the BER is not in the range covered by the
    /// search interval, or if the bisection does not converge.
    ///
    /// # Examples
    /// ```
    /// # use mmse_penalty::qam::Qam;
    /// let qam = Qam::new(16).unwrap();
    /// let snr_db = qam.snr_db(qam.ber(15.0)).unwrap();
    /// assert!((snr_db - 15.0).abs() < 1e-6);
    /// ```
    pub fn snr_db(&self, ber: f64) -> Result<f64, NumericalError> {
        self.snr_db_in(ber, MIN_SNR_DB, MAX_SNR_DB)
    }

    /// Returns the SNR in dB corresponding to a BER, searching in the interval
    /// `[low_db, high_db]`.
    pub fn snr_db_in(&self, ber: f64, low_db: f64, high_db: f64) -> Result<f64, NumericalError> {
        if !(ber > 0.0) {
            return Err(NumericalError::BerOutOfRange { ber });
        }
        self.snr_db_from_ln_ber_in(ber.ln(), low_db, high_db)
    }

    /// Returns the SNR in dB corresponding to the natural logarithm of a BER.
    ///
    /// # Examples
    /// ```
    /// # use mmse_penalty::qam::Qam;
    /// let qam = Qam::new(4).unwrap();
    /// // The BER at 40 dB is below the smallest f64
    /// assert_eq!(qam.ber(40.0), 0.0);
    /// let snr_db = qam.snr_db_from_ln_ber(qam.ln_ber(40.0)).unwrap();
    /// assert!((snr_db - 40.0).abs() < 1e-6);
    /// ```
    pub fn snr_db_from_ln_ber(&self, ln_ber: f64) -> Result<f64, NumericalError> {
        self.snr_db_from_ln_ber_in(ln_ber, MIN_SNR_DB, MAX_SNR_DB)
    }

    /// Returns the SNR in dB corresponding to the natural logarithm of a BER,
    /// searching in the interval `[low_db, high_db]`.
    pub fn snr_db_from_ln_ber_in(
        &self,
        ln_ber: f64,
        low_db: f64,
        high_db: f64,
    ) -> Result<f64, NumericalError> {
        if !(ln_ber > self.ln_ber(high_db) && ln_ber < self.ln_ber(low_db)) {
            return Err(NumericalError::BerOutOfRange { ber: ln_ber.exp() });
        }
        let mut low = low_db;
        let mut high = high_db;
        for _ in 0..MAX_ITERATIONS {
            if high - low <= TOLERANCE_DB {
                return Ok(0.5 * (low + high));
            }
            let mid = 0.5 * (low + high);
            if self.ln_ber(mid) > ln_ber {
                low = mid;
            } else {
                high = mid;
            }
        }
        Err(NumericalError::BerInversionDidNotConverge {
            iterations: MAX_ITERATIONS,
        })
    }
}

/// Natural logarithm of `erfc(x)` for `x >= 0`.
///
/// For large `x`, `erfc(x) = exp(-x^2) / (x sqrt(pi)) * (1 - 1/(2x^2) + 3/(4x^4) - ...)`.
fn ln_erfc(x: f64) -> f64 {
    if x < ERFC_ASYMPTOTIC_THRESHOLD {
        return erfc(x).ln();
    }
    let y = 1.0 / (2.0 * x * x);
    // 1 - y + 3y^2 - 15y^3 + 105y^4 - 945y^5
    let series = 1.0 - y * (1.0 - 3.0 * y * (1.0 - 5.0 * y * (1.0 - 7.0 * y * (1.0 - 9.0 * y))));
    -x * x - (x * PI.sqrt()).ln() + series.ln()
}

/// Returns the natural logarithm of the mean of `exp(x)` over `values`.
///
/// The largest value is factored out, so the result is accurate even when
/// every `exp(x)` underflows. Returns minus infinity for an empty slice.
pub fn ln_mean_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln() - (values.len() as f64).ln()
}
