//! worldview: terminal host for worldview-core
//!
//! Loads the country dataset (remote, else the bundled snapshot), opens
//! detail views by typed name and keeps the saved list in the configured
//! backend.
//!
//! Usage examples
//! --------------
//!
//! - List all countries
//!   $ worldview countries
//!
//! - Open a detail view; every run counts one visit
//!   $ worldview show "cote d'ivoire"
//!
//! - Save, unsave, list saved
//!   $ worldview save Canada
//!   $ worldview unsave canada
//!   $ worldview saved
//!
//! - Keep saves on a remote service
//!   $ WORLDVIEW_SAVES_URL=http://localhost:3000 worldview --backend remote saved
//!
//! State (view counts, local saves) lives in `state.json` under the
//! platform data dir unless `--data-dir` says otherwise.
mod args;

use crate::args::{CliArgs, Commands};
use anyhow::{bail, Context};
use clap::Parser;
use std::rc::Rc;
use tokio::task::{spawn_local, LocalSet};
use tracing::{info, warn};
use worldview_core::common::{NO_CAPITAL, NO_POPULATION, NO_REGION};
use worldview_core::{
    Country, DetailResolution, FileStore, KeyValueStore, MemoryStore, Resolution, Session,
    Settings,
};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    setup_tracing(args.verbose);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    LocalSet::new().block_on(&runtime, run(args))
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("worldview_core=debug,worldview_cli=debug")
        } else {
            EnvFilter::new("worldview_core=info,worldview_cli=info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Persistent store for this run. An unusable data dir degrades to memory
/// so browsing still works, just without durable state.
fn open_store(settings: &Settings) -> Rc<dyn KeyValueStore> {
    let opened = settings
        .resolved_data_dir()
        .context("no data directory on this platform; pass --data-dir")
        .and_then(|dir| FileStore::open_in(&dir).map_err(anyhow::Error::from));
    match opened {
        Ok(store) => {
            info!(path = %store.path().display(), "using file store");
            Rc::new(store)
        }
        Err(e) => {
            warn!(error = %e, "persistent state unavailable, keeping it in memory");
            Rc::new(MemoryStore::new())
        }
    }
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    let settings = args.settings();
    settings.validate()?;
    let session = Session::from_settings(&settings, open_store(&settings))?;

    match args.command {
        Commands::Countries => {
            for c in session.load().await {
                println!("{}", card(c));
            }
        }

        Commands::Show { name } => {
            session.load().await;
            let view = match session.open_detail(&name) {
                DetailResolution::Found(view) => view,
                DetailResolution::NotFound | DetailResolution::Pending => {
                    eprintln!("No country named: {name}");
                    return Ok(());
                }
            };
            // setup first, the visit itself once setup is over
            let visit = spawn_local(view.setup().run());
            let saved = view.refresh_saved().await;
            let count = visit.await?.count().or(view.view_count()).unwrap_or(0);

            let c = view.country();
            println!("Country: {}", c.name());
            println!("Capital: {}", c.capital().unwrap_or(NO_CAPITAL));
            println!("Region: {}", c.region().unwrap_or(NO_REGION));
            println!("Population: {}", population_label(c.population()));
            if let Some(flag) = c.flag() {
                println!("Flag: {flag}");
            }
            println!("Viewed: {}", views_label(count));
            println!("Saved: {}", if saved { "yes" } else { "no" });
            view.close();
        }

        Commands::Save { name } => {
            session.load().await;
            let Resolution::Found(country) = session.resolve(&name) else {
                bail!("No country named: {name}");
            };
            let saved = session
                .saves()
                .save(country)
                .await
                .with_context(|| format!("could not save {}", country.name()))?;
            if saved.newly_saved {
                println!("Saved {}", country.name());
            } else {
                println!("{} was already saved", country.name());
            }
        }

        Commands::Unsave { name } => {
            session.load().await;
            // names that left the dataset can still be removed
            let country = session
                .resolve(&name)
                .found()
                .cloned()
                .unwrap_or_else(|| Country::new(name.trim()));
            let removed = session
                .saves()
                .unsave(&country)
                .await
                .with_context(|| format!("could not unsave {}", country.name()))?;
            if removed {
                println!("Removed {}", country.name());
            } else {
                println!("{} was not saved", country.name());
            }
        }

        Commands::Saved => {
            let list = session.saved_list();
            let saved = list.refresh().await;
            if saved.is_empty() {
                println!("No saved countries");
            }
            for c in &saved {
                println!("{}", card(c));
            }
        }
    }
    Ok(())
}

fn card(c: &Country) -> String {
    format!(
        "{} | {} | {} | {}",
        c.name(),
        c.capital().unwrap_or(NO_CAPITAL),
        c.region().unwrap_or(NO_REGION),
        population_label(c.population()),
    )
}

fn views_label(n: u64) -> String {
    if n == 1 {
        "1 time".to_owned()
    } else {
        format!("{n} times")
    }
}

fn population_label(population: Option<u64>) -> String {
    let Some(n) = population else {
        return NO_POPULATION.to_owned();
    };
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_are_pluralized() {
        assert_eq!(views_label(0), "0 times");
        assert_eq!(views_label(1), "1 time");
        assert_eq!(views_label(6), "6 times");
    }

    #[test]
    fn population_is_grouped() {
        assert_eq!(population_label(Some(38_005_238)), "38,005,238");
        assert_eq!(population_label(Some(999)), "999");
        assert_eq!(population_label(None), NO_POPULATION);
    }

    #[test]
    fn placeholder_cards_use_labels() {
        let line = card(&Country::placeholder("Wakanda"));
        assert_eq!(line, "Wakanda | No capital | No region | No data");
    }
}
