use clap::Subcommand;
use refocus_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the full configuration as JSON
    Show,
    /// Print the config file path
    Path,
    /// Set standard plan durations, in minutes
    SetDurations {
        /// Meditation stage length
        #[arg(long)]
        meditation_min: Option<u64>,
        /// Scored game round length
        #[arg(long)]
        game_min: Option<u64>,
        /// Break stage length
        #[arg(long)]
        break_min: Option<u64>,
    },
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load_or_default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::SetDurations {
            meditation_min,
            game_min,
            break_min,
        } => {
            let mut config = Config::load()?;
            if let Some(min) = meditation_min {
                config.plan.meditation_min = min;
            }
            if let Some(min) = game_min {
                config.plan.game_min = min;
            }
            if let Some(min) = break_min {
                config.plan.break_min = min;
            }
            config.save()?;
            println!("ok");
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
