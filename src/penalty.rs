//! MMSE SNR penalty.
//!
//! The penalty of a link is the difference between its ASE-limited SNR and
//! the effective SNR seen by an MMSE receiver after the PDL or MDL of the
//! chain. The noise sources are whitened with the covariance
//!
//! ```text
//! S = sum_i w_i T_i T_i^H,
//! ```
//!
//! where `w_i` is the fraction of the total noise power contributed by stage
//! `i` and `T_i` is its tail product. The MMSE error covariance of the
//! whitened channel gives one SNR per dimension. These are converted to BER
//! with the QAM BER curve, the BERs are averaged, and the average BER is
//! converted back to an effective SNR.

use crate::{
    channel::ChannelMatrices,
    component::Chain,
    config::LinkConfig,
    error::{ConfigurationError, NumericalError, Result},
    linalg::{self, CMatrix},
    propagation::propagate,
    qam::{ln_mean_exp, Qam},
    units::lin2db,
};
use ndarray::Array1;
use num_complex::Complex64;
use rand::Rng;

/// Result of a penalty calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct Penalty {
    /// SNR penalty (dB).
    pub penalty_db: f64,
    /// ASE-limited SNR (dB).
    pub snr_ase_db: f64,
    /// Effective SNR after MMSE equalization (dB).
    pub effective_snr_db: f64,
    /// Average BER over all the dimensions.
    ///
    /// This is zero when the BER is below the smallest `f64`. The effective
    /// SNR is still computed in that case.
    pub average_ber: f64,
    /// MMSE SNR of each dimension (dB).
    pub snr_per_dimension_db: Vec<f64>,
    /// BER of each dimension.
    pub ber_per_dimension: Vec<f64>,
    /// Power of each noise source referred to the receiver (W), indexed by
    /// stage.
    pub noise_power: Array1<f64>,
}

/// Computes the MMSE SNR penalty from the noise trace and the channel
/// matrices.
///
/// `noise_power` holds the power of each noise source referred to the
/// receiver, with one entry per tail product.
pub fn compute_penalty(
    noise_power: &Array1<f64>,
    signal_power: f64,
    channel: &ChannelMatrices,
    qam: &Qam,
) -> Result<Penalty> {
    if noise_power.len() != channel.tails.len() {
        return Err(ConfigurationError::StageCountMismatch {
            expected: channel.tails.len(),
            found: noise_power.len(),
        }
        .into());
    }
    let total_noise = noise_power.sum();
    if !(total_noise.is_finite() && total_noise > 0.0) {
        return Err(ConfigurationError::InvalidValue {
            parameter: "total noise power",
            value: total_noise,
        }
        .into());
    }
    if !(signal_power.is_finite() && signal_power > 0.0) {
        return Err(ConfigurationError::InvalidValue {
            parameter: "signal power",
            value: signal_power,
        }
        .into());
    }
    let dim = channel.dim();

    let mut covariance = CMatrix::zeros((dim, dim));
    for (&power, tail) in noise_power.iter().zip(channel.tails.iter()) {
        if power == 0.0 {
            continue;
        }
        let weight = Complex64::new(power / total_noise, 0.0);
        covariance.scaled_add(weight, &tail.dot(&linalg::adjoint(tail)));
    }
    let whitening = linalg::invert(&covariance).map_err(NumericalError::from)?;
    let h_eq = whitening.dot(&channel.h_chain);

    let snr_ase = signal_power / total_noise;
    let mut gram = h_eq.dot(&linalg::adjoint(&h_eq));
    let regularization = Complex64::new(1.0 / snr_ase, 0.0);
    gram.diag_mut().mapv_inplace(|x| x + regularization);
    let error_covariance = linalg::invert(&gram).map_err(NumericalError::from)?;

    let snr_per_dimension_db = error_covariance
        .diag()
        .iter()
        .enumerate()
        .map(|(dimension, e)| {
            let snr = signal_power / e.norm() / total_noise - 1.0;
            if snr.is_finite() && snr > 0.0 {
                Ok(lin2db(snr))
            } else {
                Err(NumericalError::DegenerateDimension { dimension })
            }
        })
        .collect::<std::result::Result<Vec<f64>, _>>()?;
    // The BERs are averaged in the log domain, since they underflow at high
    // SNR.
    let ln_ber_per_dimension: Vec<f64> = snr_per_dimension_db
        .iter()
        .map(|&snr_db| qam.ln_ber(snr_db))
        .collect();
    let ln_average_ber = ln_mean_exp(&ln_ber_per_dimension);
    let effective_snr_db = qam.snr_db_from_ln_ber(ln_average_ber)?;
    let ber_per_dimension: Vec<f64> = ln_ber_per_dimension.iter().map(|x| x.exp()).collect();
    let average_ber = ln_average_ber.exp();
    let snr_ase_db = lin2db(snr_ase);

    tracing::trace!(?snr_per_dimension_db, ?ber_per_dimension, "MMSE per dimension");
    tracing::debug!(
        snr_ase_db,
        effective_snr_db,
        average_ber,
        "computed penalty"
    );

    Ok(Penalty {
        penalty_db: snr_ase_db - effective_snr_db,
        snr_ase_db,
        effective_snr_db,
        average_ber,
        snr_per_dimension_db,
        ber_per_dimension,
        noise_power: noise_power.clone(),
    })
}

/// Estimates the SNR penalty of one realization of a chain.
///
/// The configuration is validated, the chain is propagated drawing new
/// impairment matrices from `rng`, and the penalty of the resulting channel
/// is computed.
///
/// # Examples
/// ```
/// # use mmse_penalty::{component::*, config::LinkConfig, impairment::Angles, penalty::estimate};
/// # use mmse_penalty::rand::{Rng, SeedableRng};
/// let chain = Chain::new(vec![
///     Component::wss(8.0, 0.55),
///     Component::amplifier(15.0, 4.5, 0.1),
///     Component::fiber(16.0, 0.0),
/// ]);
/// let mut rng = Rng::seed_from_u64(0);
/// let chain = chain.with_random_angles(&mut rng);
/// let penalty = estimate(&chain, &LinkConfig::default(), &mut rng)?;
/// assert!(penalty.penalty_db.is_finite());
/// # Ok::<(), mmse_penalty::error::Error>(())
/// ```
pub fn estimate<R: Rng + ?Sized>(
    chain: &Chain,
    config: &LinkConfig,
    rng: &mut R,
) -> Result<Penalty> {
    config.validate()?;
    let qam = config.qam()?;
    let propagation = propagate(chain, config, rng)?;
    let channel = ChannelMatrices::build(config.dimensions, &propagation.impairments)?;
    compute_penalty(
        &propagation.state.noise_power,
        propagation.state.signal_power,
        &channel,
        &qam,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        component::Component,
        error::Error,
        impairment::{Angles, ImpairmentModel},
        rand::{Rng, SeedableRng},
    };

    fn scenario() -> Chain {
        Chain::new(vec![
            Component::wss(8.0, 0.55),
            Component::amplifier(15.0, 4.5, 0.1),
            Component::fiber(16.0, 0.0),
        ])
    }

    fn run(chain: &Chain, config: &LinkConfig, seed: u64) -> Penalty {
        let mut rng = Rng::seed_from_u64(seed);
        let chain = if config.is_polarization() {
            chain.with_random_angles(&mut rng)
        } else {
            chain.clone()
        };
        estimate(&chain, config, &mut rng).unwrap()
    }

    #[test]
    fn end_to_end() {
        let config = LinkConfig::default();
        let a = run(&scenario(), &config, 42);
        let b = run(&scenario(), &config, 42);
        assert!(a.penalty_db.is_finite());
        assert_eq!(a, b);
        assert_eq!(a.noise_power.len(), 5);
        assert_eq!(a.snr_per_dimension_db.len(), 2);
        assert_eq!(a.ber_per_dimension.len(), 2);
        assert!((a.penalty_db - (a.snr_ase_db - a.effective_snr_db)).abs() < 1e-12);
        let mean_ber = 0.5 * (a.ber_per_dimension[0] + a.ber_per_dimension[1]);
        assert!((a.average_ber - mean_ber).abs() <= 1e-12 * mean_ber);
    }

    #[test]
    fn zero_impairment() {
        let config = LinkConfig::default();
        for seed in 0..10 {
            let penalty = run(&scenario().without_impairment(), &config, seed);
            assert!(penalty.penalty_db.abs() < 1e-3, "{}", penalty.penalty_db);
            for &snr_db in &penalty.snr_per_dimension_db {
                assert!((snr_db - penalty.snr_ase_db).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn continuity() {
        let config = LinkConfig::default();
        let chain: Chain = scenario()
            .components()
            .iter()
            .map(|c| c.clone().with_impairment(1e-6))
            .collect();
        for seed in 0..10 {
            let small = run(&chain, &config, seed);
            let zero = run(&chain.without_impairment(), &config, seed);
            assert!((small.penalty_db - zero.penalty_db).abs() < 1e-4);
        }
    }

    #[test]
    fn positive_mean() {
        let config = LinkConfig::default();
        let n = 1000;
        let mean = (0..n)
            .map(|seed| run(&scenario(), &config, seed).penalty_db)
            .sum::<f64>()
            / n as f64;
        assert!(mean > 0.0);
    }

    #[test]
    fn larger_impairment() {
        let config = LinkConfig::default();
        let strong = Chain::new(vec![
            Component::wss(8.0, 3.0),
            Component::amplifier(15.0, 4.5, 0.1),
            Component::fiber(16.0, 0.0),
        ]);
        let n = 200;
        let mean = |chain: &Chain| {
            (0..n).map(|seed| run(chain, &config, seed).penalty_db).sum::<f64>() / n as f64
        };
        assert!(mean(&strong) > mean(&scenario()));
    }

    #[test]
    fn empty_chain() {
        let penalty = run(&Chain::default(), &LinkConfig::default(), 0);
        assert!(penalty.penalty_db.abs() < 1e-6);
        // Transmitter and receiver noise of equal SNR.
        assert!((penalty.snr_ase_db - 17.0).abs() < 1e-9);
    }

    #[test]
    fn modes() {
        for model in [ImpairmentModel::Active, ImpairmentModel::Passive] {
            for dimensions in [4, 6] {
                let config = LinkConfig {
                    dimensions,
                    model,
                    ..LinkConfig::default()
                };
                for seed in 0..5 {
                    let penalty = run(&scenario(), &config, seed);
                    assert_eq!(penalty.snr_per_dimension_db.len(), dimensions);
                    assert!(penalty.penalty_db > 0.0);
                }
            }
        }
    }

    #[test]
    fn singular_covariance() {
        let channel = ChannelMatrices {
            h_chain: linalg::identity(2),
            tails: vec![CMatrix::zeros((2, 2)); 2],
        };
        let qam = Qam::new(16).unwrap();
        assert_eq!(
            compute_penalty(&Array1::from(vec![1e-3, 1e-3]), 1.0, &channel, &qam),
            Err(Error::Numerical(NumericalError::SingularMatrix))
        );
    }

    #[test]
    fn stage_count_mismatch() {
        let channel = ChannelMatrices::build(2, &[linalg::identity(2)]).unwrap();
        let qam = Qam::new(16).unwrap();
        assert_eq!(
            compute_penalty(&Array1::from(vec![1e-3; 3]), 1.0, &channel, &qam),
            Err(Error::Configuration(ConfigurationError::StageCountMismatch {
                expected: 2,
                found: 3
            }))
        );
    }

    #[test]
    fn invalid_configuration() {
        let config = LinkConfig {
            dimensions: 3,
            ..LinkConfig::default()
        };
        assert_eq!(
            estimate(&scenario(), &config, &mut Rng::seed_from_u64(0)),
            Err(Error::Configuration(ConfigurationError::IncompatibleDimension(3)))
        );
        assert!(matches!(
            estimate(&scenario(), &LinkConfig::default(), &mut Rng::seed_from_u64(0)),
            Err(Error::Configuration(ConfigurationError::MissingAngles { stage: 0 }))
        ));
        let chain = Chain::new(vec![Component::wss(1.0, 0.5).with_angles(Angles::new(0.1, 0.2))]);
        assert!(estimate(&chain, &LinkConfig::default(), &mut Rng::seed_from_u64(0)).is_ok());
    }

    #[test]
    fn high_snr() {
        let high = |modulation_order, snr_db, seed| {
            let config = LinkConfig {
                tx_snr_db: snr_db,
                rx_snr_db: snr_db,
                modulation_order,
                ..LinkConfig::default()
            };
            run(&scenario(), &config, seed)
        };
        for seed in 0..5 {
            for (order, snr_db) in [(4, 40.0), (16, 45.0)] {
                let penalty = high(order, snr_db, seed);
                assert!(penalty.penalty_db.is_finite());
                assert!(penalty.effective_snr_db.is_finite());
                if order == 4 {
                    // The BERs underflow, but the effective SNR does not.
                    assert_eq!(penalty.average_ber, 0.0);
                }
                let reference = high(64, snr_db, seed);
                assert!(
                    (penalty.penalty_db - reference.penalty_db).abs() < 0.25,
                    "M = {order}: {} dB, M = 64: {} dB",
                    penalty.penalty_db,
                    reference.penalty_db
                );
            }
        }
    }

    #[test]
    fn degenerate_dimension() {
        // The second dimension carries no signal, so its MMSE SNR is zero.
        let channel = ChannelMatrices {
            h_chain: linalg::diag(&[1.0, 0.0]),
            tails: vec![linalg::identity(2); 2],
        };
        let qam = Qam::new(16).unwrap();
        assert_eq!(
            compute_penalty(&Array1::from(vec![0.5, 0.5]), 1.0, &channel, &qam),
            Err(Error::Numerical(NumericalError::DegenerateDimension {
                dimension: 1
            }))
        );
    }
}
