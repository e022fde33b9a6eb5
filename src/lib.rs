//! # MMSE penalty
//!
//! `mmse_penalty` estimates the SNR penalty caused by polarization-dependent
//! loss (PDL) or mode-dependent loss (MDL) in coherent optical links with an
//! MMSE receiver.
//!
//! A link is described by a [`Chain`](component::Chain) of optical
//! components and a [`LinkConfig`](config::LinkConfig). The chain is
//! propagated to obtain the signal and noise powers and one random
//! impairment matrix per component. From the cascade of these matrices, the
//! MMSE SNR of each dimension is computed and converted to an effective SNR
//! through the BER of the QAM modulation. The penalty is the difference
//! between the ASE-limited SNR and the effective SNR.
//!
//! It can be used as a Rust library or as a CLI tool. See [`cli`] for
//! documentation about the usage of the CLI tool.
//!
//! # Examples
//! ```
//! # use mmse_penalty::{component::Chain, config::LinkConfig, penalty::estimate};
//! # use mmse_penalty::rand::{Rng, SeedableRng};
//! let chain: Chain = "wss:loss=8,pdl=0.55; oa:gain=15,nf=4.5,pdl=0.1; fiber:loss=16,pdl=0"
//!     .parse()?;
//! let mut rng = Rng::seed_from_u64(0);
//! let chain = chain.with_random_angles(&mut rng);
//! let penalty = estimate(&chain, &LinkConfig::default(), &mut rng)?;
//! assert!(penalty.penalty_db > 0.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

pub mod channel;
pub mod cli;
pub mod component;
pub mod config;
pub mod error;
pub mod impairment;
pub mod linalg;
pub mod monte_carlo;
pub mod penalty;
pub mod propagation;
pub mod qam;
pub mod rand;
pub mod units;
