use clap::Subcommand;
use vread_core::Config;

#[derive(Subcommand)]
pub enum StagesAction {
    /// List the stage catalog in effect
    List,
    /// Stage and progress for a reading-day count
    Progress {
        /// Total reading days
        days: u32,
    },
}

pub fn run(action: StagesAction) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Config::load_or_default().stage_catalog()?;

    match action {
        StagesAction::List => {
            println!("{}", serde_json::to_string_pretty(catalog.entries())?);
        }
        StagesAction::Progress { days } => {
            let stage = catalog.stage_for_reading_days(days);
            let json = serde_json::json!({
                "days": days,
                "stage": stage,
                "next_stage": catalog.next_stage(stage.id),
                "progress": catalog.progress_to_next_stage(days),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}
