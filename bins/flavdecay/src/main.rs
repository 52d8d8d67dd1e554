//! flavdecay: force flavoured particles in an event file to decay.
//!
//! Reads the primary particles of one event as JSON, runs one relinking
//! pass with the table-driven decay engine, and writes the resulting
//! particle history together with the pass report.

mod settings;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use flavdecay_core::stack::EventStack;
use flavdecay_core::types::{ForceDecayPolicy, Particle};
use flavdecay_engine::TableDecayer;
use flavdecay_relink::{PassReport, Relinker, SpeciesFilter};
use serde::Serialize;
use tracing::{info, warn};

use settings::Settings;

/// Force beauty or charm hadrons to decay and relink the products.
#[derive(Parser, Debug)]
#[command(name = "flavdecay", version, about = "Forced flavour decays for generated events")]
struct Args {
    /// Event file: a JSON array of particles ("-" reads stdin)
    input: PathBuf,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings file (default: <config_dir>/flavdecay/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// User decay table merged over the embedded one
    #[arg(long)]
    decay_table: Option<PathBuf>,

    /// Species to decay (all, beauty, charm)
    #[arg(long)]
    species: Option<SpeciesFilter>,

    /// Decay channels to sample (all, semileptonic, hadronic)
    #[arg(long)]
    force_decay: Option<ForceDecayPolicy>,

    /// Seed of the decay engine
    #[arg(long)]
    seed: Option<u64>,

    /// Engine calls per candidate before giving up (0 = never give up)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Maximum number of particles in the event
    #[arg(long)]
    stack_capacity: Option<usize>,

    /// Fail when a decay could not be sampled
    #[arg(long)]
    strict: bool,

    /// Drop non-retained, non-transported entries before writing
    #[arg(long)]
    compact: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long)]
    log_format: Option<String>,
}

impl Args {
    /// Apply command-line flags over the loaded settings.
    fn merge_into(&self, mut settings: Settings) -> Settings {
        if let Some(species) = self.species {
            settings.species = species;
        }
        if let Some(policy) = self.force_decay {
            settings.force_decay = policy;
        }
        if let Some(path) = &self.decay_table {
            settings.decay_table = Some(path.clone());
        }
        if self.seed.is_some() {
            settings.seed = self.seed;
        }
        if let Some(max_attempts) = self.max_attempts {
            settings.max_attempts = max_attempts;
        }
        if self.stack_capacity.is_some() {
            settings.stack_capacity = self.stack_capacity;
        }
        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            settings.log_format = format.clone();
        }
        settings
    }
}

#[derive(Serialize)]
struct Output<'a> {
    processed_at: DateTime<Utc>,
    n_primary: usize,
    report: &'a PassReport,
    particles: &'a [Particle],
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = args.merge_into(Settings::load(args.config.as_deref())?);

    init_logging(&settings.log_level, &settings.log_format);
    info!("flavdecay v{}", env!("CARGO_PKG_VERSION"));

    let mut stack = read_event(&args.input)?;
    info!(particles = stack.n_primary(), input = %args.input.display(), "event loaded");

    if let Some(capacity) = settings.stack_capacity {
        stack = stack.with_capacity_limit(capacity);
    }
    let engine = match settings.seed {
        Some(seed) => TableDecayer::new(seed),
        None => TableDecayer::from_entropy(),
    };

    let mut relinker = Relinker::with_stack(engine, stack, settings.relinker_config()?);
    relinker.init().context("failed to initialize decay engine")?;
    let report = relinker.generate()?;
    if !report.is_complete() {
        warn!(unresolved = report.unresolved.len(), "some decays could not be sampled");
        if args.strict {
            report.clone().into_result()?;
        }
    }

    let mut stack = relinker.detach_stack().context("particle stack went missing")?;
    if args.compact {
        let before = stack.particles().len();
        stack.compact();
        info!(before, after = stack.particles().len(), "event compacted");
    }

    let output = Output {
        processed_at: Utc::now(),
        n_primary: stack.n_primary(),
        report: &report,
        particles: stack.particles(),
    };
    write_output(args.output.as_deref(), &output)
}

fn read_event(path: &Path) -> Result<EventStack> {
    if path.as_os_str() == "-" {
        return flavdecay_core::read_event(io::stdin().lock()).context("failed to read event from stdin");
    }
    let file = fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    flavdecay_core::read_event(io::BufReader::new(file))
        .with_context(|| format!("failed to read event {}", path.display()))
}

fn write_output(path: Option<&Path>, output: &Output<'_>) -> Result<()> {
    match path {
        Some(path) => {
            let file = fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(io::BufWriter::new(file), output).context("failed to write event")?;
            info!(output = %path.display(), "event written");
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, output).context("failed to write event")?;
            writeln!(lock)?;
        }
    }
    Ok(())
}

/// Initialize the tracing subscriber.
///
/// Supports "text" (human-readable) and "json" output formats. `RUST_LOG`
/// takes precedence over `level_str`. Logs go to stderr so stdout stays
/// free for the event.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let args = Args::parse_from([
            "flavdecay",
            "event.json",
            "--species",
            "charm",
            "--max-attempts",
            "0",
            "--seed",
            "5",
            "--log-format",
            "json",
        ]);
        let settings = args.merge_into(Settings::default());
        assert_eq!(settings.species, SpeciesFilter::Charm);
        assert_eq!(settings.max_attempts, 0);
        assert_eq!(settings.seed, Some(5));
        assert_eq!(settings.log_format, "json");
        assert_eq!(settings.force_decay, ForceDecayPolicy::All);
    }

    #[test]
    fn absent_flags_keep_settings() {
        let args = Args::parse_from(["flavdecay", "-"]);
        let settings = Settings { seed: Some(9), ..Settings::default() };
        assert_eq!(args.merge_into(settings.clone()), settings);
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(Args::try_parse_from(["flavdecay", "e.json", "--force-decay", "radiative"]).is_err());
    }

    #[test]
    fn reads_particle_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"pdg": 511, "status": 1, "momentum": {{"px": 0.0, "py": 0.0, "pz": 1.0, "e": 5.37}},
                 "vertex": [0.0, 0.0, 0.0], "time": 0.0}}]"#
        )
        .unwrap();
        let stack = read_event(file.path()).unwrap();
        assert_eq!(stack.n_primary(), 1);
        assert!(stack.particles()[0].is_undecided());
        assert!(stack.particles()[0].transport);
    }

    #[test]
    fn dangling_mother_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"pdg": 511, "status": 1, "momentum": {{"px": 0.0, "py": 0.0, "pz": 1.0, "e": 5.37}},
                 "vertex": [0.0, 0.0, 0.0], "first_mother": 99}}]"#
        )
        .unwrap();
        let err = read_event(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to read event"));
        assert!(format!("{err:#}").contains("99"));
    }
}
