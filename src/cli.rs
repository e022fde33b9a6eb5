//! `mmse-penalty` CLI application
//!
//! The CLI application is organized in several subcommands. The
//! supported subcommands can be seen by running `mmse-penalty`.
//! See the modules below for examples and more information about
//! how to use each subcommand.
//!
//! Chains are given in the textual format described in
//! [`component`](crate::component). All the subcommands share the link
//! options of [`LinkArgs`].

use crate::{config::LinkConfig, impairment::ImpairmentModel};
use clap::Parser;
use std::error::Error;

pub mod monte_carlo;
pub mod penalty;

/// Trait to run a CLI subcommand
pub trait Run {
    /// Run the CLI subcommand
    fn run(&self) -> Result<(), Box<dyn Error>>;
}

/// CLI arguments.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    name = "mmse-penalty",
    about = "MMSE SNR penalty of PDL/MDL-impaired optical links"
)]
pub enum Args {
    /// penalty subcommand
    Penalty(penalty::Args),
    /// monte-carlo subcommand
    MonteCarlo(monte_carlo::Args),
}

impl Run for Args {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        match self {
            Args::Penalty(x) => x.run(),
            Args::MonteCarlo(x) => x.run(),
        }
    }
}

/// Link options shared by all the subcommands.
#[derive(Debug, Clone, clap::Args)]
pub struct LinkArgs {
    /// Transmitter SNR (dB)
    #[arg(long, default_value_t = 17.0)]
    tx_snr: f64,
    /// Receiver SNR (dB) [default: same as transmitter SNR]
    #[arg(long)]
    rx_snr: Option<f64>,
    /// Transmitter signal power (dBm)
    #[arg(long, default_value_t = 3.0)]
    signal_power: f64,
    /// Symbol rate (Hz)
    #[arg(long, default_value_t = 92e9)]
    symbol_rate: f64,
    /// Carrier frequency (Hz)
    #[arg(long, default_value_t = 193e12)]
    carrier_frequency: f64,
    /// QAM modulation order
    #[arg(long, default_value_t = 16)]
    modulation_order: u32,
    /// Number of dimensions (2 for dual polarization, number of modes for MDL)
    #[arg(long, default_value_t = 2)]
    dimensions: usize,
    /// Impairment model ("active" or "passive")
    #[arg(long, default_value_t = ImpairmentModel::Active)]
    model: ImpairmentModel,
}

impl LinkArgs {
    /// Returns the link configuration given by the options.
    pub fn config(&self) -> LinkConfig {
        LinkConfig {
            tx_snr_db: self.tx_snr,
            rx_snr_db: self.rx_snr.unwrap_or(self.tx_snr),
            signal_power_dbm: self.signal_power,
            symbol_rate: self.symbol_rate,
            carrier_frequency: self.carrier_frequency,
            modulation_order: self.modulation_order,
            dimensions: self.dimensions,
            model: self.model,
        }
    }
}

fn write_link_details<W: std::io::Write>(mut f: W, config: &LinkConfig) -> std::io::Result<()> {
    writeln!(f, "Link:")?;
    writeln!(f, " - Transmitter SNR: {:.2} dB", config.tx_snr_db)?;
    writeln!(f, " - Receiver SNR: {:.2} dB", config.rx_snr_db)?;
    writeln!(f, " - Signal power: {:.2} dBm", config.signal_power_dbm)?;
    writeln!(f, " - Symbol rate: {:.3} GBaud", 1e-9 * config.symbol_rate)?;
    writeln!(f, " - Carrier frequency: {:.3} THz", 1e-12 * config.carrier_frequency)?;
    writeln!(f, " - Modulation: {}-QAM", config.modulation_order)?;
    writeln!(f, " - Dimensions: {}", config.dimensions)?;
    writeln!(f, " - Impairment model: {}", config.model)?;
    Ok(())
}

fn write_chain_details<W: std::io::Write>(
    mut f: W,
    chain: &crate::component::Chain,
) -> std::io::Result<()> {
    use crate::component::Stage;
    writeln!(f, "Chain:")?;
    for (i, c) in chain.components().iter().enumerate() {
        let stage = match c.stage() {
            Stage::Loss { loss_db } => format!("loss {loss_db:.2} dB"),
            Stage::Amplifier {
                gain_db,
                noise_figure_db,
            } => format!("gain {gain_db:.2} dB, NF {noise_figure_db:.2} dB"),
        };
        write!(
            f,
            " {i:3}. {:<5} {stage}, impairment {:.2} dB",
            c.kind().to_string(),
            c.impairment_db()
        )?;
        match c.angles() {
            Some(a) => writeln!(f, ", alpha {:.4}, beta {:.4}", a.rotation, a.phase)?,
            None => writeln!(f)?,
        }
    }
    Ok(())
}
