//! Link configuration.

use crate::{error::ConfigurationError, impairment::ImpairmentModel, qam::Qam};

/// Link parameters.
///
/// These are the scalar parameters of a link that are not attached to any
/// component of the chain. The configuration is passed explicitly to every
/// calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkConfig {
    /// SNR of the transmitter noise source (dB).
    pub tx_snr_db: f64,
    /// SNR of the receiver noise source (dB), referred to the received
    /// signal power.
    pub rx_snr_db: f64,
    /// Signal power at the transmitter output (dBm).
    pub signal_power_dbm: f64,
    /// Symbol rate (Hz).
    pub symbol_rate: f64,
    /// Carrier frequency (Hz).
    pub carrier_frequency: f64,
    /// QAM modulation order.
    pub modulation_order: u32,
    /// Number of dimensions (2 for polarization, number of modes for MDL).
    pub dimensions: usize,
    /// Impairment model.
    pub model: ImpairmentModel,
}

impl Default for LinkConfig {
    fn default() -> LinkConfig {
        LinkConfig {
            tx_snr_db: 17.0,
            rx_snr_db: 17.0,
            signal_power_dbm: 3.0,
            symbol_rate: 92e9,
            carrier_frequency: 193e12,
            modulation_order: 16,
            dimensions: 2,
            model: ImpairmentModel::Active,
        }
    }
}

impl LinkConfig {
    /// Checks that the configuration describes a valid link.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (parameter, value) in [
            ("transmitter SNR", self.tx_snr_db),
            ("receiver SNR", self.rx_snr_db),
            ("signal power", self.signal_power_dbm),
        ] {
            if !value.is_finite() {
                return Err(ConfigurationError::InvalidValue { parameter, value });
            }
        }
        for (parameter, value) in [
            ("symbol rate", self.symbol_rate),
            ("carrier frequency", self.carrier_frequency),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigurationError::InvalidValue { parameter, value });
            }
        }
        if self.dimensions < 2 || self.dimensions % 2 != 0 {
            return Err(ConfigurationError::IncompatibleDimension(self.dimensions));
        }
        self.qam()?;
        Ok(())
    }

    /// Returns the BER model of the modulation.
    pub fn qam(&self) -> Result<Qam, ConfigurationError> {
        Qam::new(self.modulation_order)
    }

    /// Returns `true` for dual-polarization links.
    pub fn is_polarization(&self) -> bool {
        self.dimensions == 2
    }
}
