//! Penalty CLI subcommand.
//!
//! This subcommand computes the SNR penalty of a single realization of the
//! impairments of a chain and prints the intermediate results.
//!
//! # Examples
//!
//! The penalty of a WSS, an amplifier and a fiber span, with random
//! orientations of the PDL, can be computed with
//! ```shell
//! $ mmse-penalty penalty --random-angles --seed 1 \
//!       "wss:loss=8,pdl=0.55; oa:gain=15,nf=4.5,pdl=0.1; fiber:loss=16,pdl=0"
//! ```

use super::{write_chain_details, write_link_details, LinkArgs, Run};
use crate::{
    component::Chain,
    penalty::{estimate, Penalty},
    rand::{Rng, SeedableRng},
    units::watt2dbm,
};
use clap::Parser;
use std::{error::Error, io::Write};

/// Penalty CLI arguments.
#[derive(Debug, Parser)]
#[command(about = "Computes the SNR penalty of one realization")]
pub struct Args {
    /// Chain description (format "wss:loss=8,pdl=0.5; oa:gain=15,nf=4.5")
    chain: String,
    #[command(flatten)]
    pub(super) link: LinkArgs,
    /// Seed for the random number generator
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Use random angles for the components that do not specify them
    #[arg(long)]
    random_angles: bool,
}

impl Run for Args {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        let config = self.link.config();
        config.validate()?;
        let mut rng = Rng::seed_from_u64(self.seed);
        let mut chain: Chain = self.chain.parse()?;
        if self.random_angles && config.is_polarization() {
            chain = chain.with_random_angles(&mut rng);
        }
        let penalty = estimate(&chain, &config, &mut rng)?;
        let mut stdout = std::io::stdout().lock();
        write_link_details(&mut stdout, &config)?;
        write_chain_details(&mut stdout, &chain)?;
        writeln!(stdout)?;
        Self::write_results(&mut stdout, &penalty)?;
        Ok(())
    }
}

impl Args {
    fn write_results<W: Write>(mut f: W, penalty: &Penalty) -> std::io::Result<()> {
        writeln!(f, "Noise sources (referred to receiver):")?;
        let last = penalty.noise_power.len() - 1;
        for (stage, &power) in penalty.noise_power.iter().enumerate() {
            let name = match stage {
                0 => "transmitter".to_string(),
                s if s == last => "receiver".to_string(),
                s => format!("component {}", s - 1),
            };
            if power > 0.0 {
                writeln!(f, " - {name}: {:.3} dBm", watt2dbm(power))?;
            }
        }
        writeln!(f, "Per dimension:")?;
        for (k, (snr, ber)) in penalty
            .snr_per_dimension_db
            .iter()
            .zip(penalty.ber_per_dimension.iter())
            .enumerate()
        {
            writeln!(f, " - {k}: SNR {snr:.4} dB, BER {ber:.3e}")?;
        }
        writeln!(f, "Results:")?;
        writeln!(f, " - ASE SNR: {:.4} dB", penalty.snr_ase_db)?;
        writeln!(f, " - Average BER: {:.3e}", penalty.average_ber)?;
        writeln!(f, " - Effective SNR: {:.4} dB", penalty.effective_snr_db)?;
        writeln!(f, " - Penalty: {:.4} dB", penalty.penalty_db)?;
        Ok(())
    }
}
