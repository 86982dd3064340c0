use clap::{Parser, Subcommand};
use std::path::PathBuf;
use worldview_core::{BackendKind, Settings};

/// CLI arguments for worldview
#[derive(Debug, Parser)]
#[command(
    name = "worldview",
    version,
    about = "Browse countries, count visits and keep a saved list from the terminal"
)]
pub struct CliArgs {
    /// Base URL of the country dataset service
    #[arg(long, global = true, env = "WORLDVIEW_DATASET_URL")]
    pub dataset_url: Option<String>,

    /// Base URL of the remote save service (needed for --backend remote)
    #[arg(long, global = true, env = "WORLDVIEW_SAVES_URL")]
    pub saves_url: Option<String>,

    /// Where saved countries live: local | remote
    #[arg(long, global = true, env = "WORLDVIEW_BACKEND", default_value = "local")]
    pub backend: BackendKind,

    /// Base URL of the view-count service (default: --saves-url)
    #[arg(long, global = true, env = "WORLDVIEW_COUNTS_URL")]
    pub counts_url: Option<String>,

    /// Where view counts live: local | remote
    #[arg(long, global = true, env = "WORLDVIEW_VIEW_BACKEND", default_value = "local")]
    pub view_backend: BackendKind,

    /// Directory for persistent state (default: platform data dir)
    #[arg(long, global = true, env = "WORLDVIEW_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl CliArgs {
    pub fn settings(&self) -> Settings {
        let mut settings = Settings {
            saves_url: self.saves_url.clone(),
            backend: self.backend,
            counts_url: self.counts_url.clone(),
            view_backend: self.view_backend,
            data_dir: self.data_dir.clone(),
            ..Settings::default()
        };
        if let Some(url) = &self.dataset_url {
            settings.dataset_url = url.clone();
            settings.lookup_url = url.clone();
        }
        settings
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List all countries as cards
    Countries,

    /// Open the detail view of a country (counts a visit)
    Show {
        /// Display name, case and accents ignored (e.g. "cote d'ivoire")
        name: String,
    },

    /// Save a country
    Save { name: String },

    /// Remove a country from the saved list
    Unsave { name: String },

    /// List saved countries
    Saved,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_url_also_serves_lookups() {
        let args = CliArgs::parse_from([
            "worldview",
            "--dataset-url",
            "http://localhost:8080/v3.1",
            "show",
            "Peru",
        ]);
        let s = args.settings();
        assert_eq!(s.lookup_url, "http://localhost:8080/v3.1");
        assert_eq!(s.backend, BackendKind::Local);
        assert!(matches!(args.command, Commands::Show { ref name } if name == "Peru"));
    }

    #[test]
    fn backend_flag_parses() {
        let args = CliArgs::parse_from(["worldview", "--backend", "remote", "saved"]);
        assert_eq!(args.backend, BackendKind::Remote);
        assert!(args.settings().validate().is_err());
    }

    #[test]
    fn remote_view_counts_use_the_saves_service() {
        let args = CliArgs::parse_from([
            "worldview",
            "--view-backend",
            "remote",
            "--saves-url",
            "http://localhost:3000",
            "show",
            "Peru",
        ]);
        let s = args.settings();
        assert_eq!(s.view_backend, BackendKind::Remote);
        assert_eq!(s.backend, BackendKind::Local);
        assert_eq!(s.resolved_counts_url(), Some("http://localhost:3000"));
        assert!(s.validate().is_ok());
    }
}
