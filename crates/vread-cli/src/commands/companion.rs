use chrono::{DateTime, Utc};
use clap::Subcommand;
use vread_core::{Config, Database, ProgressEngine};

use crate::identity;

#[derive(Subcommand)]
pub enum CompanionAction {
    /// Show a companion with its stage and progress
    Show {
        /// User id (defaults to this machine's reader id)
        #[arg(long)]
        user: Option<String>,
    },
    /// Record a validated reading segment
    Validate {
        /// User id (defaults to this machine's reader id)
        #[arg(long)]
        user: Option<String>,
        /// Validation time as RFC 3339 (defaults to now)
        #[arg(long, value_parser = parse_instant)]
        at: Option<DateTime<Utc>>,
    },
    /// List all companions, most recent reader first
    List,
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 timestamp: {e}"))
}

fn engine() -> vread_core::error::Result<ProgressEngine<Database>> {
    let config = Config::load()?;
    let catalog = config.stage_catalog()?;
    Ok(ProgressEngine::new(Database::open()?)
        .with_policy(config.progress)
        .with_catalog(catalog))
}

pub fn run(action: CompanionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CompanionAction::Show { user } => {
            let user = identity::resolve(user)?;
            let status = engine()?.companion_status(&user)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        CompanionAction::Validate { user, at } => {
            let user = identity::resolve(user)?;
            let at = at.unwrap_or_else(Utc::now);
            let result = engine()?.update_progress(&user, at)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        CompanionAction::List => {
            let companions = Database::open()?.list()?;
            println!("{}", serde_json::to_string_pretty(&companions)?);
        }
    }
    Ok(())
}
