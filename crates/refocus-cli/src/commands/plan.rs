use clap::Subcommand;
use refocus_core::Config;

#[derive(Subcommand)]
pub enum PlanAction {
    /// Print a game's stage table as JSON
    Show {
        /// Game variant
        #[arg(long, default_value = "money_stack")]
        game: String,
    },
}

pub fn run(action: PlanAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PlanAction::Show { game } => {
            let plan = Config::load_or_default().plan_for(&game);
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
    }
    Ok(())
}
