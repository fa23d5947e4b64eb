//! Plan a week from the command line and print it as JSON, together with the
//! nutritional balance report and the grocery list.
//!
//! Usage: plan-week [--prefs FILE] [--diet veg] [--cuisine punjabi,bengali]
//!                  [--meals breakfast,dinner] [--health diabetes] [--seed N] [--agent]
//!
//! Without --agent the catalog fallback is used, so no network access is needed.
//! --agent reads the chat model settings from the environment (TOGETHER_API_KEY, LLM_*).

use std::sync::Arc;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use rasoi_genie_api::{
    config::LlmSettings,
    models::preference::{MealPreferences, MealSlot},
    planner::{
        catalog::Catalog, fallback::fallback_menu, tools::MenuTools, GeneratedMenu, MenuPlanner,
        FALLBACK_MESSAGE,
    },
};

#[derive(Parser)]
#[command(name = "plan-week", about = "Generate a 7-day Indian meal plan")]
struct Args {
    /// JSON preferences file (same shape as POST /preferences)
    #[arg(long)]
    prefs: Option<std::path::PathBuf>,

    /// veg, non_veg or vegan (overrides the file)
    #[arg(long)]
    diet: Option<String>,

    /// Cuisine ids, comma separated
    #[arg(long, value_delimiter = ',')]
    cuisine: Vec<String>,

    /// Meal slots, comma separated
    #[arg(long, value_delimiter = ',')]
    meals: Vec<String>,

    #[arg(long)]
    cooking_time: Option<String>,

    /// Health condition tags, comma separated
    #[arg(long, value_delimiter = ',')]
    health: Vec<String>,

    /// Seed for a reproducible offline plan (ignored with --agent)
    #[arg(long)]
    seed: Option<u64>,

    /// Use the LLM agent, falling back to the catalog on failure
    #[arg(long)]
    agent: bool,
}

fn load_preferences(args: &Args) -> anyhow::Result<MealPreferences> {
    let mut prefs = match &args.prefs {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => MealPreferences::default(),
    };
    if let Some(diet) = &args.diet {
        prefs.diet_type = diet.parse()?;
    }
    if !args.cuisine.is_empty() {
        prefs.cuisine = args.cuisine.clone();
    }
    if !args.meals.is_empty() {
        prefs.meals = args
            .meals
            .iter()
            .map(|m| m.parse::<MealSlot>())
            .collect::<anyhow::Result<_>>()?;
    }
    if let Some(time) = &args.cooking_time {
        prefs.cooking_time = time.clone();
    }
    if !args.health.is_empty() {
        prefs.health_conditions = args.health.clone();
    }
    Ok(prefs.normalized())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let prefs = load_preferences(&args)?;
    let catalog = Arc::new(Catalog::builtin());

    let generated = match (args.agent, args.seed) {
        (false, Some(seed)) => GeneratedMenu {
            menu: fallback_menu(&catalog, &prefs, &mut StdRng::seed_from_u64(seed)),
            preferences_used: prefs.clone(),
            generated_at: chrono::Utc::now(),
            fallback_used: true,
            message: Some(FALLBACK_MESSAGE.to_string()),
            agent_response: None,
        },
        (use_agent, _) => {
            let planner = if use_agent {
                MenuPlanner::from_settings(&LlmSettings::from_env()?, catalog.clone())?
            } else {
                MenuPlanner::new(catalog.clone())
            };
            if use_agent && !planner.has_agent() {
                tracing::warn!("--agent given but TOGETHER_API_KEY is not set");
            }
            planner.generate_weekly_menu(&prefs).await
        }
    };

    let tools = MenuTools::new(catalog);
    let dishes: Vec<String> = generated.menu.dishes().map(str::to_string).collect();
    let balance = tools.check_nutritional_balance(&dishes, &prefs.health_conditions);
    let grocery = tools.generate_grocery_list(&generated.menu);

    let output = json!({
        "plan": generated,
        "balance": balance,
        "grocery_list": grocery,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
