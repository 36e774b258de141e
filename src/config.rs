use clap::Parser;

use crate::sync::SyncOptions;

#[derive(Parser, Debug, Clone)]
#[command(name = "jobfeed", about = "Job-feed ingestion and normalization service")]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Run database migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS", default_value = "true")]
    pub run_migrations: bool,

    /// Listen address for the HTTP server
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Application name sent to the ReliefWeb API
    #[arg(long, env = "RELIEFWEB_APPNAME", default_value = "jobfeed")]
    pub reliefweb_appname: String,

    /// Adzuna application id (required for the adzuna source)
    #[arg(long, env = "ADZUNA_APP_ID")]
    pub adzuna_app_id: Option<String>,

    /// Adzuna application key (required for the adzuna source)
    #[arg(long, env = "ADZUNA_APP_KEY")]
    pub adzuna_app_key: Option<String>,

    /// Maximum records retained in the store; older ones are swept
    #[arg(long, env = "MAX_JOBS_IN_DB", default_value = "2000")]
    pub max_jobs_in_db: i64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand given)
    Serve,
    /// Run a single sync pass and print the report
    Sync {
        /// Comma-separated Adzuna country codes, or "all"
        #[arg(long)]
        countries: Option<String>,
    },
}

impl Config {
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            reliefweb_appname: self.reliefweb_appname.clone(),
            adzuna_app_id: self.adzuna_app_id.clone(),
            adzuna_app_key: self.adzuna_app_key.clone(),
            max_jobs_in_db: self.max_jobs_in_db,
        }
    }
}
