//! Monte Carlo CLI subcommand.
//!
//! This subcommand estimates the statistics of the SNR penalty of a chain
//! over many random realizations of its impairments. The realizations are
//! computed in parallel.
//!
//! # Examples
//!
//! The mean penalty of a 4-mode link over 10000 realizations can be computed
//! with
//! ```shell
//! $ mmse-penalty monte-carlo --dimensions 4 --realizations 10000 \
//!       --output-file penalties.txt \
//!       "wss:loss=8,mdl=1; oa:gain=15,nf=4.5,mdl=0.5; fiber:loss=16,mdl=0.1"
//! ```
//!
//! The output file contains one penalty in dB per line, in realization
//! order.

use super::{write_chain_details, write_link_details, LinkArgs, Run};
use crate::{
    component::Chain,
    config::LinkConfig,
    monte_carlo::{MonteCarlo, Report, Reporter, Statistics},
};
use clap::Parser;
use console::Term;
use std::{
    error::Error,
    fs::File,
    io::{BufWriter, Write},
    sync::mpsc::{self, Receiver},
    time::Duration,
};

/// Monte Carlo CLI arguments.
#[derive(Debug, Parser)]
#[command(about = "Estimates the penalty statistics over random realizations")]
pub struct Args {
    /// Chain description (format "wss:loss=8,pdl=0.5; oa:gain=15,nf=4.5")
    chain: String,
    #[command(flatten)]
    pub(super) link: LinkArgs,
    /// Number of realizations
    #[arg(long)]
    realizations: u64,
    /// Seed for the random number generators
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Number of worker threads [default: number of CPUs]
    #[arg(long)]
    threads: Option<usize>,
    /// Output file for the penalty of each realization
    #[arg(long)]
    output_file: Option<String>,
}

impl Run for Args {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        let config = self.link.config();
        config.validate()?;
        let chain: Chain = self.chain.parse()?;
        let mut output_file = if let Some(f) = &self.output_file {
            Some(BufWriter::new(File::create(f)?))
        } else {
            None
        };
        let threads = self.threads.unwrap_or_else(num_cpus::get);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?;

        self.write_details(std::io::stdout(), &config, &chain, threads)?;

        let (report_tx, report_rx) = mpsc::channel();
        let monte_carlo = MonteCarlo {
            chain,
            config,
            realizations: self.realizations,
            seed: self.seed,
            reporter: Some(Reporter {
                tx: report_tx,
                interval: Duration::from_millis(500),
            }),
        };
        let mut progress = Progress::new(report_rx);
        let progress = std::thread::spawn(move || progress.run());
        // The reporter is dropped at the end of the run, so the progress
        // thread finishes even if the run fails.
        let outcome = pool.install(move || monte_carlo.run());
        let progress = progress.join().map_err(|_| "progress thread panicked")?;
        let outcome = outcome?;
        // This block cannot actually be written with the ? operator
        #[allow(clippy::question_mark)]
        if let Err(e) = progress {
            return Err(e);
        }

        if let Some(f) = &mut output_file {
            for penalty_db in &outcome.penalties_db {
                writeln!(f, "{penalty_db}")?;
            }
            f.flush()?;
        }
        Self::write_summary(std::io::stdout(), &outcome.statistics)?;
        Ok(())
    }
}

impl Args {
    fn write_details<W: Write>(
        &self,
        mut f: W,
        config: &LinkConfig,
        chain: &Chain,
        threads: usize,
    ) -> std::io::Result<()> {
        writeln!(f, "MONTE CARLO PARAMETERS")?;
        writeln!(f, "----------------------")?;
        writeln!(f, "Simulation:")?;
        writeln!(f, " - Realizations: {}", self.realizations)?;
        writeln!(f, " - Seed: {}", self.seed)?;
        writeln!(f, " - Threads: {threads}")?;
        write_link_details(&mut f, config)?;
        write_chain_details(&mut f, chain)?;
        writeln!(f)?;
        Ok(())
    }

    fn write_summary<W: Write>(mut f: W, stats: &Statistics) -> std::io::Result<()> {
        writeln!(f)?;
        writeln!(f, "Mean penalty: {:.4} dB", stats.mean_db)?;
        writeln!(f, "Standard deviation: {:.4} dB", stats.std_db)?;
        writeln!(f, "Range: {:.4} dB to {:.4} dB", stats.min_db, stats.max_db)?;
        writeln!(f, "Mean ASE SNR: {:.4} dB", stats.mean_snr_ase_db)?;
        Ok(())
    }
}

#[derive(Debug)]
struct Progress {
    rx: Receiver<Report>,
    term: Term,
}

impl Progress {
    fn new(rx: Receiver<Report>) -> Progress {
        Progress {
            rx,
            term: Term::stdout(),
        }
    }

    fn run(&mut self) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
        ctrlc::set_handler({
            let term = self.term.clone();
            move || {
                let _ = term.write_line("");
                let _ = term.show_cursor();
                std::process::exit(0);
            }
        })?;

        let ret = self.work();
        self.term.show_cursor()?;
        ret
    }

    fn work(&mut self) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
        self.term.set_title("mmse-penalty monte-carlo");
        self.term.hide_cursor()?;
        self.term.write_line(Self::format_header())?;
        let mut first = true;
        // The loop ends when the run finishes or the sender is dropped
        // because the run failed.
        while let Ok(Report::Progress(stats)) = self.rx.recv() {
            if !first {
                self.term.move_cursor_up(1)?;
                self.term.clear_line()?;
            }
            first = false;
            self.term.write_line(&Self::format_progress(&stats))?;
        }
        Ok(())
    }

    fn format_header() -> &'static str {
        "  Realizations |  Mean (dB) |   Std (dB) |   Min (dB) |   Max (dB) | ASE SNR (dB) | Elapsed\n\
         ---------------|------------|------------|------------|------------|--------------|----------"
    }

    fn format_progress(stats: &Statistics) -> String {
        format!(
            "{:14} | {:10.4} | {:10.4} | {:10.4} | {:10.4} | {:12.4} | {}",
            stats.count,
            stats.mean_db,
            stats.std_db,
            stats.min_db,
            stats.max_db,
            stats.mean_snr_ase_db,
            humantime::format_duration(Duration::from_secs(stats.elapsed.as_secs()))
        )
    }
}
