//! Power and noise propagation along a chain.
//!
//! The chain is traversed once in propagation order. The signal power and
//! the power of every noise source seen so far are scaled by the gain or loss
//! of each component, amplifiers inject their ASE noise, and one impairment
//! matrix is drawn for each component.
//!
//! Noise sources are indexed by stage: stage 0 is the transmitter, stage
//! `i + 1` is the output of component `i` (only amplifiers contribute), and
//! stage `N + 1` is the receiver, where `N` is the number of components.

use crate::{
    component::{Chain, Stage},
    config::LinkConfig,
    error::{ConfigurationError, Result},
    impairment::{self, Frame},
    linalg::{self, CMatrix},
    units::{db2lin, dbm2watt, watt2dbm, PLANCK},
};
use ndarray::Array1;
use rand::Rng;

/// Signal and noise powers after propagation.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationState {
    /// Signal power at the receiver (W).
    pub signal_power: f64,
    /// Power of each noise source referred to the receiver (W), indexed by
    /// stage.
    pub noise_power: Array1<f64>,
}

impl PropagationState {
    /// Returns the total noise power at the receiver (W).
    pub fn total_noise_power(&self) -> f64 {
        self.noise_power.sum()
    }

    /// Returns the ASE-limited SNR in linear units.
    pub fn snr_ase(&self) -> f64 {
        self.signal_power / self.total_noise_power()
    }
}

/// Result of propagating a chain.
#[derive(Debug, Clone)]
pub struct Propagation {
    /// Signal and noise powers at the receiver.
    pub state: PropagationState,
    /// Impairment matrices in propagation order.
    ///
    /// There is one matrix per component followed by the identity matrix of
    /// the receiver.
    pub impairments: Vec<CMatrix>,
}

/// Propagates the signal and noise along a chain.
///
/// Each call draws new impairment matrices from `rng`. For dual-polarization
/// links every component must have its rotation and phase angles. For links
/// with more dimensions the components must not have angles, and the
/// orientation of each impairment is random.
///
/// # Examples
/// ```
/// # use mmse_penalty::{component::*, config::LinkConfig, impairment::Angles};
/// # use mmse_penalty::propagation::propagate;
/// # use mmse_penalty::rand::{Rng, SeedableRng};
/// let chain = Chain::new(vec![
///     Component::fiber(16.0, 0.0).with_angles(Angles::default()),
///     Component::amplifier(16.0, 5.0, 0.3).with_angles(Angles::new(0.4, 1.0)),
/// ]);
/// let mut rng = Rng::seed_from_u64(0);
/// let propagation = propagate(&chain, &LinkConfig::default(), &mut rng)?;
/// assert_eq!(propagation.state.noise_power.len(), 4);
/// assert_eq!(propagation.impairments.len(), 3);
/// # Ok::<(), mmse_penalty::error::Error>(())
/// ```
pub fn propagate<R: Rng + ?Sized>(
    chain: &Chain,
    config: &LinkConfig,
    rng: &mut R,
) -> Result<Propagation> {
    let dim = config.dimensions;
    let mut signal_power = dbm2watt(config.signal_power_dbm);
    let mut noise_power = Array1::zeros(chain.num_stages());
    noise_power[0] = signal_power / db2lin(config.tx_snr_db) / 2.0;
    let mut impairments = Vec::with_capacity(chain.len() + 1);

    for (i, component) in chain.components().iter().enumerate() {
        match component.stage() {
            Stage::Loss { loss_db } => {
                let loss = db2lin(*loss_db);
                signal_power /= loss;
                noise_power /= loss;
            }
            Stage::Amplifier {
                gain_db,
                noise_figure_db,
            } => {
                let gain = db2lin(*gain_db);
                signal_power *= gain;
                noise_power *= gain;
                noise_power[i + 1] = ase_noise_power(
                    gain,
                    db2lin(*noise_figure_db),
                    config.carrier_frequency,
                    config.symbol_rate,
                );
            }
        }

        let frame = match (config.is_polarization(), component.angles()) {
            (true, Some(angles)) => Frame::Rotation(*angles),
            (true, None) => {
                return Err(ConfigurationError::MissingAngles { stage: i }.into());
            }
            (false, None) => Frame::Random,
            (false, Some(_)) => {
                return Err(ConfigurationError::UnexpectedAngles { stage: i }.into());
            }
        };
        impairments.push(impairment::generate(
            dim,
            component.impairment_db(),
            config.model,
            &frame,
            rng,
        )?);

        tracing::debug!(
            stage = i,
            kind = %component.kind(),
            signal_power_dbm = watt2dbm(signal_power),
            "propagated component"
        );
    }

    let last = chain.num_stages() - 1;
    noise_power[last] = signal_power / db2lin(config.rx_snr_db) / 2.0;
    impairments.push(linalg::identity(dim));

    Ok(Propagation {
        state: PropagationState {
            signal_power,
            noise_power,
        },
        impairments,
    })
}

/// Returns the ASE noise power added by an amplifier, `h f Rs (G NF - 1)`.
///
/// The gain and noise figure are in linear units.
pub fn ase_noise_power(
    gain: f64,
    noise_figure: f64,
    carrier_frequency: f64,
    symbol_rate: f64,
) -> f64 {
    PLANCK * carrier_frequency * symbol_rate * (gain * noise_figure - 1.0)
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

    fn config() -> LinkConfig {
        LinkConfig::default()
    }

    #[test]
    fn lossless_chain_keeps_power() {
        let chain: Chain = [
            Component::wss(0.0, 0.5),
            Component::amplifier(0.0, 0.0, 0.3),
            Component::fiber(0.0, 0.0),
            Component::fused_coupler(0.0, 0.1),
            Component::attenuator(0.0, 0.1),
        ]
        .into_iter()
        .collect();
        let chain = chain.with_random_angles(&mut Rng::seed_from_u64(0));
        let propagation = propagate(&chain, &config(), &mut Rng::seed_from_u64(1)).unwrap();
        assert_eq!(propagation.state.signal_power, dbm2watt(3.0));
        assert_eq!(propagation.impairments.len(), 6);
    }

    #[test]
    fn single_amplifier_noise() {
        let (gain_db, nf_db) = (15.0, 4.5);
        let chain = Chain::new(vec![
            Component::amplifier(gain_db, nf_db, 0.1).with_angles(Angles::default())
        ]);
        let config = config();
        let propagation = propagate(&chain, &config, &mut Rng::seed_from_u64(0)).unwrap();
        let expected = PLANCK
            * config.carrier_frequency
            * config.symbol_rate
            * (db2lin(gain_db) * db2lin(nf_db) - 1.0);
        assert_eq!(propagation.state.noise_power[1], expected);
    }

    #[test]
    fn noise_trace() {
        let chain = Chain::new(vec![
            Component::wss(8.0, 0.55),
            Component::amplifier(15.0, 4.5, 0.1),
            Component::fiber(16.0, 0.0),
        ])
        .with_random_angles(&mut Rng::seed_from_u64(0));
        let config = config();
        let propagation = propagate(&chain, &config, &mut Rng::seed_from_u64(1)).unwrap();
        let state = &propagation.state;
        let p0 = dbm2watt(3.0);
        let net = db2lin(15.0 - 8.0 - 16.0);
        assert!((state.signal_power - p0 * net).abs() < 1e-12 * p0);
        let tx = p0 / db2lin(17.0) / 2.0;
        assert!((state.noise_power[0] - tx * net).abs() < 1e-12 * tx);
        let ase = ase_noise_power(db2lin(15.0), db2lin(4.5), 193e12, 92e9) / db2lin(16.0);
        // Only the amplifier (component 1, stage 2) injects noise.
        assert_eq!(state.noise_power[1], 0.0);
        assert!((state.noise_power[2] - ase).abs() < 1e-12 * ase);
        assert_eq!(state.noise_power[3], 0.0);
        let rx = state.signal_power / db2lin(17.0) / 2.0;
        assert!((state.noise_power[4] - rx).abs() < 1e-12 * rx);
        assert_eq!(propagation.impairments.len(), 4);
        assert_eq!(propagation.impairments[3], linalg::identity(2));
    }

    #[test]
    fn empty_chain() {
        let propagation =
            propagate(&Chain::default(), &config(), &mut Rng::seed_from_u64(0)).unwrap();
        assert_eq!(propagation.state.noise_power.len(), 2);
        assert_eq!(propagation.state.noise_power[0], propagation.state.noise_power[1]);
        assert_eq!(propagation.impairments, vec![linalg::identity(2)]);
    }

    #[test]
    fn polarization_requires_angles() {
        let chain = Chain::new(vec![
            Component::wss(8.0, 0.5).with_angles(Angles::default()),
            Component::fiber(16.0, 0.0),
        ]);
        assert_eq!(
            propagate(&chain, &config(), &mut Rng::seed_from_u64(0)).unwrap_err(),
            Error::Configuration(ConfigurationError::MissingAngles { stage: 1 })
        );
    }

    #[test]
    fn modes_reject_angles() {
        let config = LinkConfig {
            dimensions: 4,
            ..config()
        };
        let chain = Chain::new(vec![Component::wss(8.0, 0.5).with_angles(Angles::default())]);
        assert_eq!(
            propagate(&chain, &config, &mut Rng::seed_from_u64(0)).unwrap_err(),
            Error::Configuration(ConfigurationError::UnexpectedAngles { stage: 0 })
        );
    }

    #[test]
    fn modes() {
        let config = LinkConfig {
            dimensions: 6,
            model: ImpairmentModel::Passive,
            ..config()
        };
        let chain = Chain::new(vec![
            Component::wss(8.0, 1.0),
            Component::amplifier(20.0, 5.0, 0.5),
        ]);
        let propagation = propagate(&chain, &config, &mut Rng::seed_from_u64(0)).unwrap();
        assert!(propagation.impairments.iter().all(|h| h.dim() == (6, 6)));
        assert_eq!(propagation.impairments[2], linalg::identity(6));
    }
}
