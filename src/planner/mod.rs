//! Weekly menu planning: an LLM agent path with a deterministic catalog fallback.
//!
//! Every entry point ends with a usable value. When the agent path fails the
//! result is tagged [`PlanResult::FallbackUsed`] with the reason.

pub mod actions;
pub mod agent;
pub mod catalog;
pub mod fallback;
pub mod llm;
pub mod parse;
pub mod prompts;
pub mod tools;
pub mod web;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::LlmSettings;
use crate::models::menu::{Day, MenuGrid};
use crate::models::preference::{MealPreferences, MealSlot};
use crate::services::metrics::{FALLBACKS_COUNTER, MEAL_REGENERATIONS_COUNTER, MENU_GENERATIONS_COUNTER};

use self::actions::Toolbox;
use self::agent::{AgentError, MenuAgent};
use self::catalog::Catalog;
use self::fallback::{fallback_menu, pick_unused, placeholder_dish};
use self::llm::{ChatModel, LlmError, TogetherChat};
use self::parse::{parse_menu, MenuParseError};
use self::tools::MenuTools;
use self::web::{DuckDuckGoSearch, PageSummarizer};

pub const FALLBACK_MESSAGE: &str = "Generated using fallback system";
const MAX_DISH_NAME_CHARS: usize = 80;

#[derive(Debug)]
pub enum PlanResult<T> {
    Success(T),
    FallbackUsed { value: T, reason: FallbackReason },
}

pub type MenuResult = PlanResult<MenuGrid>;

impl<T> PlanResult<T> {
    pub fn value(&self) -> &T {
        match self {
            PlanResult::Success(value) | PlanResult::FallbackUsed { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            PlanResult::Success(value) | PlanResult::FallbackUsed { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PlanResult::FallbackUsed { .. })
    }

    pub fn reason(&self) -> Option<&FallbackReason> {
        match self {
            PlanResult::Success(_) => None,
            PlanResult::FallbackUsed { reason, .. } => Some(reason),
        }
    }

    /// Short provenance label, `agent` or `fallback`.
    pub fn source(&self) -> &'static str {
        if self.is_fallback() {
            "fallback"
        } else {
            "agent"
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FallbackReason {
    #[error("no chat model configured")]
    AgentUnavailable,
    #[error("agent run failed: {0}")]
    Agent(#[from] AgentError),
    #[error("could not read a menu from the agent answer: {0}")]
    Parse(#[from] MenuParseError),
    #[error("model call failed: {0}")]
    Llm(#[from] LlmError),
    #[error("model suggested an unusable dish: {0:?}")]
    RejectedDish(String),
}

impl FallbackReason {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            FallbackReason::AgentUnavailable => "agent_unavailable",
            FallbackReason::Agent(AgentError::IterationLimit(_)) => "iteration_limit",
            FallbackReason::Agent(AgentError::Llm(LlmError::Timeout(_)))
            | FallbackReason::Llm(LlmError::Timeout(_)) => "timeout",
            FallbackReason::Agent(AgentError::Llm(_)) | FallbackReason::Llm(_) => "llm_error",
            FallbackReason::Parse(_) => "parse_error",
            FallbackReason::RejectedDish(_) => "rejected_dish",
        }
    }
}

/// What the API persists and returns for a new weekly plan.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedMenu {
    pub menu: MenuGrid,
    pub preferences_used: MealPreferences,
    pub generated_at: DateTime<Utc>,
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_response: Option<String>,
}

pub struct MenuPlanner {
    tools: MenuTools,
    agent: Option<MenuAgent>,
}

impl MenuPlanner {
    /// Fallback-only planner.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            tools: MenuTools::new(catalog),
            agent: None,
        }
    }

    pub fn with_agent(mut self, agent: MenuAgent) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Wires the hosted model and, when enabled, the web tools. Without an
    /// API key the planner stays fallback-only.
    pub fn from_settings(settings: &LlmSettings, catalog: Arc<Catalog>) -> anyhow::Result<Self> {
        let planner = Self::new(catalog);
        let Some(api_key) = settings.api_key.clone() else {
            info!("No chat model API key set, menus will use the catalog fallback");
            return Ok(planner);
        };

        let model: Arc<dyn ChatModel> = Arc::new(TogetherChat::new(settings, api_key)?);
        let mut toolbox = Toolbox::new(planner.tools.clone(), settings.timeout);
        if settings.web_search {
            toolbox = toolbox
                .with_search(Arc::new(DuckDuckGoSearch::new(settings.timeout)?))
                .with_reader(Arc::new(PageSummarizer::new(model.clone(), settings.timeout)?));
        }

        info!(
            "Menu agent enabled (model {}, max {} iterations, web search {})",
            settings.model, settings.max_iterations, settings.web_search
        );
        let agent = MenuAgent::new(model, toolbox, settings.max_iterations, settings.timeout);
        Ok(planner.with_agent(agent))
    }

    pub fn tools(&self) -> &MenuTools {
        &self.tools
    }

    pub fn has_agent(&self) -> bool {
        self.agent.is_some()
    }

    /// The week grid only, tagged with its provenance.
    pub async fn plan_week(&self, prefs: &MealPreferences) -> MenuResult {
        self.plan(&prefs.clone().normalized()).await.0
    }

    pub async fn generate_weekly_menu(&self, prefs: &MealPreferences) -> GeneratedMenu {
        let prefs = prefs.clone().normalized();
        let (result, agent_response) = self.plan(&prefs).await;
        let fallback_used = result.is_fallback();

        GeneratedMenu {
            menu: result.into_value(),
            preferences_used: prefs,
            generated_at: Utc::now(),
            fallback_used,
            message: fallback_used.then(|| FALLBACK_MESSAGE.to_string()),
            agent_response: if fallback_used { None } else { agent_response },
        }
    }

    async fn plan(&self, prefs: &MealPreferences) -> (MenuResult, Option<String>) {
        let attempt = match &self.agent {
            Some(agent) => self.run_agent(agent, prefs).await,
            None => Err(FallbackReason::AgentUnavailable),
        };

        let (result, answer) = match attempt {
            Ok((menu, answer)) => (PlanResult::Success(menu), Some(answer)),
            Err(reason) => {
                if !matches!(reason, FallbackReason::AgentUnavailable) {
                    warn!("Menu agent failed, using fallback: {}", reason);
                }
                FALLBACKS_COUNTER.with_label_values(&[reason.label()]).inc();
                let value = self.fallback(prefs);
                (PlanResult::FallbackUsed { value, reason }, None)
            }
        };

        MENU_GENERATIONS_COUNTER.with_label_values(&[result.source()]).inc();
        (result, answer)
    }

    async fn run_agent(
        &self,
        agent: &MenuAgent,
        prefs: &MealPreferences,
    ) -> Result<(MenuGrid, String), FallbackReason> {
        let run = agent.run(&prompts::weekly_menu(prefs)).await?;
        let menu = parse_menu(&run.final_answer, &prefs.meals)?;
        Ok((menu, run.final_answer))
    }

    fn fallback(&self, prefs: &MealPreferences) -> MenuGrid {
        fallback_menu(self.tools.catalog(), prefs, &mut rand::thread_rng())
    }

    /// One replacement dish for `(day, slot)`, never equal (case-insensitively)
    /// to any of `slot_dishes`, the dishes that slot already holds this week.
    pub async fn regenerate_one(
        &self,
        prefs: &MealPreferences,
        slot_dishes: &[String],
        day: Day,
        slot: MealSlot,
    ) -> PlanResult<String> {
        let prefs = &prefs.clone().normalized();
        let taken: HashSet<String> = slot_dishes.iter().map(|d| d.trim().to_lowercase()).collect();

        let reason = match &self.agent {
            None => FallbackReason::AgentUnavailable,
            Some(agent) => match agent.ask(prompts::regenerate_meal(prefs, slot_dishes, day, slot)).await {
                Ok(text) => match clean_dish_name(&text) {
                    Some(dish) if !taken.contains(&dish.to_lowercase()) => {
                        MEAL_REGENERATIONS_COUNTER.with_label_values(&["agent"]).inc();
                        return PlanResult::Success(dish);
                    }
                    _ => FallbackReason::RejectedDish(text),
                },
                Err(e) => FallbackReason::Llm(e),
            },
        };

        if !matches!(reason, FallbackReason::AgentUnavailable) {
            warn!("Meal regeneration for {} {} fell back: {}", day, slot, reason);
        }
        FALLBACKS_COUNTER.with_label_values(&[reason.label()]).inc();
        MEAL_REGENERATIONS_COUNTER.with_label_values(&["fallback"]).inc();

        let value = self.fallback_dish(prefs, &taken, slot);
        PlanResult::FallbackUsed { value, reason }
    }

    /// The user's cuisines first, then the rest of the catalog, then numbered placeholders.
    fn fallback_dish(&self, prefs: &MealPreferences, taken: &HashSet<String>, slot: MealSlot) -> String {
        let catalog = self.tools.catalog();
        let mut rng = rand::thread_rng();

        if let Some(dish) = pick_unused(catalog, &prefs.cuisine, slot, prefs.diet_type, taken, &mut rng) {
            return dish;
        }
        let others: Vec<String> = catalog
            .cuisines()
            .iter()
            .filter(|c| !prefs.cuisine.iter().any(|p| p == *c))
            .map(|c| c.to_string())
            .collect();
        if let Some(dish) = pick_unused(catalog, &others, slot, prefs.diet_type, taken, &mut rng) {
            return dish;
        }

        let base = placeholder_dish(slot, prefs.diet_type);
        if !taken.contains(&base.to_lowercase()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base} - variation {n}");
            if !taken.contains(&candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}

const PREAMBLE_OPENERS: [&str; 4] = ["sure", "certainly", "okay", "of course"];
const PREAMBLE_PHRASES: [&str; 6] = [
    "here is",
    "here's",
    "suggest",
    "how about",
    "replacement",
    "instead of",
];

/// A conversational line around the answer rather than a dish name.
fn is_preamble(line: &str) -> bool {
    let lower = line.to_lowercase();
    line.ends_with(':')
        || line.ends_with('!')
        || line.ends_with('?')
        || PREAMBLE_OPENERS.iter().any(|p| lower.starts_with(p))
        || PREAMBLE_PHRASES.iter().any(|p| lower.contains(p))
}

/// First non-empty, non-conversational line with list markers, quotes and a
/// leading label removed.
fn clean_dish_name(text: &str) -> Option<String> {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !is_preamble(l))?;
    let line = line
        .strip_prefix("Final Answer:")
        .or_else(|| line.strip_prefix("Dish:"))
        .unwrap_or(line);
    let dish = line
        .trim_start_matches(|c: char| c == '-' || c == '*' || c == '•' || c.is_ascii_digit() || c == '.')
        .trim()
        .trim_end_matches('.')
        .trim_matches(|c| c == '"' || c == '\'' || c == '*' || c == '`')
        .trim_end_matches('.')
        .trim();

    if dish.is_empty() || dish.chars().count() > MAX_DISH_NAME_CHARS || dish.contains('{') {
        return None;
    }
    Some(dish.to_string())
}
