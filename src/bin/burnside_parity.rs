use orbitcount::burnside::{count_from_cache, BurnsideFormula};
use orbitcount::cache::CycleCache;
use orbitcount::config::EnumerationConfig;
use orbitcount::enumeration::enumerate;
use orbitcount::group::derive;
use orbitcount::sites;
use orbitcount::symmetry::point_group;

use clap::{Parser, ValueEnum};
use csv::Writer;
use std::error::Error;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SiteSet {
    Reduced,
    First,
    Second
}

impl SiteSet {
    fn name(self) -> &'static str {
        match self {
            SiteSet::Reduced => "reduced",
            SiteSet::First => "first",
            SiteSet::Second => "second"
        }
    }
}

/// Compares exact enumeration with both Burnside formulas for every number of
/// marked sites
///
/// Logging verbosity follows RUST_LOG, warnings only by default.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// Reference site set to count over
    #[arg(value_enum, default_value_t = SiteSet::Reduced)]
    site_set: SiteSet,

    /// Also write the table as CSV
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Settings file, defaults apply if absent
    #[arg(short, long, value_name = "PATH", default_value = "orbitcount.toml")]
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(stderr_layer)
        .init();

    let config = if cli.config.exists() {
        EnumerationConfig::from_file(&cli.config)?
    } else {
        EnumerationConfig::default()
    };

    let coordinates = sites::by_name(cli.site_set.name())
        .ok_or_else(|| format!("No coordinates for site set '{}'", cli.site_set.name()))?;
    let group = derive(&point_group::d4h(), &coordinates, &config.tolerance)?;
    group.validate()?;
    let cycles = CycleCache::from_group(&group);
    let n = group.site_count();
    info!(n, order = group.order(), "Derived site permutations");

    let mut writer = match cli.output {
        Some(path) => Some(Writer::from_path(path)?),
        None => None
    };
    if let Some(w) = writer.as_mut() {
        w.write_record(["k", "total", "exact", "burnside", "legacy"])?;
    }

    println!("{:>3} {:>16} {:>14} {:>14} {:>14}", "k", "total", "exact", "burnside", "legacy");
    for k in 0..=n {
        let enumeration = enumerate(n, k, &group, config.enum_max, config.workers)?;
        let exact = enumeration.unique_count()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "-".to_owned());
        let burnside = count_from_cache(&cycles, n, k, BurnsideFormula::CycleLengths)?;
        let legacy = match count_from_cache(&cycles, n, k, BurnsideFormula::LegacyCycleCount) {
            Ok(unique) => unique.to_string(),
            Err(e) => format!("error: {}", e)
        };

        println!("{:>3} {:>16} {:>14} {:>14} {:>14}", k, enumeration.total_combinations, exact, burnside, legacy);
        if let Some(w) = writer.as_mut() {
            let record = [k.to_string(), enumeration.total_combinations.to_string(), exact, burnside.to_string(), legacy];
            w.write_record(&record)?;
        }
    }

    if let Some(mut w) = writer {
        w.flush()?;
    }

    Ok(())
}
