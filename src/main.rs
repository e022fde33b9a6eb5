use clap::Parser;
use mmse_penalty::cli::{Args, Run};
use std::error::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[termination::display]
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mmse_penalty=warn")),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    Args::parse().run()
}
