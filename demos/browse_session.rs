//! Browsing session walkthrough for worldview-rs
//!
//! This demo runs fully offline:
//! - Loads the dataset (the source always fails, so the bundled snapshot is used)
//! - Resolves typed names, including accent- and case-insensitive ones
//! - Opens a detail view twice and shows the view counter
//! - Saves countries and watches the saved list go stale and refresh

use async_trait::async_trait;
use std::rc::Rc;
use tokio::task::{spawn_local, LocalSet};
use worldview_rs::prelude::*;

struct Offline;

#[async_trait(?Send)]
impl DatasetSource for Offline {
    async fn fetch_all(&self) -> Result<Vec<Country>> {
        Err(Error::Status {
            url: "https://offline.invalid/all".into(),
            status: 503,
        })
    }
}

async fn show(session: &Session, name: &str) {
    match session.open_detail(name) {
        DetailResolution::Found(view) => {
            let visit = spawn_local(view.setup().run());
            let count = visit.await.ok().and_then(|o| o.count()).unwrap_or(0);
            println!(
                "{} (capital: {}) viewed {} time(s)",
                view.country().name(),
                view.country().capital().unwrap_or("none"),
                count
            );
        }
        DetailResolution::NotFound => println!("No country named {name:?}"),
        DetailResolution::Pending => println!("Still loading..."),
    }
}

async fn run() -> Result<()> {
    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let session = Session::new(
        DatasetLoader::new(Offline),
        Rc::clone(&store),
        LocalBackend::new(store),
    );

    println!("--- Example 1: Load ---");
    let collection = session.load().await;
    println!("Loaded {} countries from {:?}", collection.len(), session.origin());
    for (i, c) in collection.iter().take(5).enumerate() {
        println!("{}. {}", i + 1, c.name());
    }
    println!();

    println!("--- Example 2: Detail views ---");
    show(&session, "canada").await;
    show(&session, "CANADA").await;
    show(&session, "cote d'ivoire").await;
    show(&session, "Wakanda").await;
    println!();

    println!("--- Example 3: Saved list ---");
    let list = session.saved_list();
    list.refresh().await;
    for name in ["France", "Canada", "France"] {
        if let Resolution::Found(country) = session.resolve(name) {
            let saved = session.saves().save(country).await?;
            println!("save {name}: newly saved = {}, list stale = {}", saved.newly_saved, list.is_stale());
        }
    }
    for c in list.refresh().await {
        println!("* {}", c.name());
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("worldview_core=info"))
        .init();

    println!("=== worldview-rs browsing session ===\n");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    LocalSet::new().block_on(&runtime, run())
}
