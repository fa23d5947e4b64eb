//! Typed agent actions: parsed from the model's `Action` / `Action Input`
//! lines, validated, then dispatched to the tools.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::models::menu::MenuGrid;
use crate::services::metrics::AGENT_TOOL_CALLS_COUNTER;

use super::tools::{DishLookup, DishQuery, MenuTools, MAX_DISH_COUNT};
use super::web::{PageReader, WebSearch};

pub const MAX_QUERY_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    GetDishes,
    CheckBalance,
    GroceryList,
    SearchDishes,
    SummarizePage,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::GetDishes,
        ActionKind::CheckBalance,
        ActionKind::GroceryList,
        ActionKind::SearchDishes,
        ActionKind::SummarizePage,
    ];

    /// Actions that need no network access beyond the model itself.
    pub const OFFLINE: [ActionKind; 3] = [
        ActionKind::GetDishes,
        ActionKind::CheckBalance,
        ActionKind::GroceryList,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::GetDishes => "get_dishes_by_criteria",
            ActionKind::CheckBalance => "check_nutritional_balance",
            ActionKind::GroceryList => "generate_grocery_list",
            ActionKind::SearchDishes => "search_for_new_dishes",
            ActionKind::SummarizePage => "summarize_web_content",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ActionKind::GetDishes => {
                "Get dishes from the internal database. Input: {\"cuisine\": [\"punjabi\"], \
\"meal\": \"breakfast|lunch|dinner|snacks\", \"diet\": \"veg|non_veg|vegan\", \"count\": 5}. \
Returns a list of dishes, or a message if none are found."
            }
            ActionKind::CheckBalance => {
                "Score a list of dishes for nutritional balance. Input: {\"dishes\": [\"Dal Tadka\"], \
\"health_conditions\": [\"diabetes\"]}."
            }
            ActionKind::GroceryList => {
                "Generate a grocery list from a complete weekly menu. Input: the full menu JSON \
({\"Monday\": {\"breakfast\": \"...\"}, ...}). Only call this once the menu is complete."
            }
            ActionKind::SearchDishes => {
                "Search the web for Indian dish ideas, recipes or trends. Use it when the internal \
database has too few dishes. Input: {\"query\": \"popular Rajasthani vegetarian dinner dishes\"}."
            }
            ActionKind::SummarizePage => {
                "Summarize a web page to extract dish names and ingredients. Input: {\"url\": \"https://...\"}."
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().trim_matches(|c| c == '`' || c == '\'' || c == '"');
        Self::ALL.into_iter().find(|a| a.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BalanceQuery {
    #[serde(default)]
    pub dishes: Vec<String>,
    #[serde(default, alias = "conditions")]
    pub health_conditions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageQuery {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", content = "input")]
pub enum AgentAction {
    #[serde(rename = "get_dishes_by_criteria")]
    GetDishes(DishQuery),
    #[serde(rename = "check_nutritional_balance")]
    CheckBalance(BalanceQuery),
    #[serde(rename = "generate_grocery_list")]
    GroceryList(MenuGrid),
    #[serde(rename = "search_for_new_dishes")]
    SearchDishes(SearchQuery),
    #[serde(rename = "summarize_web_content")]
    SummarizePage(PageQuery),
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("'{0}' is not a valid tool, try one of the listed tools")]
    Unknown(String),
    #[error("'{0}' is not available right now")]
    Disabled(&'static str),
    #[error("invalid input for {action}: {source}")]
    BadInput {
        action: &'static str,
        source: serde_json::Error,
    },
    #[error("invalid input for {action}: {reason}")]
    Invalid {
        action: &'static str,
        reason: String,
    },
    #[error("{0} timed out after {1:?}")]
    Timeout(&'static str, Duration),
    #[error("{action} failed: {source}")]
    Failed {
        action: &'static str,
        source: anyhow::Error,
    },
}

impl AgentAction {
    /// Builds a typed action from the raw action name and input text.
    ///
    /// Non-JSON input is taken as a bare string, which the web actions accept
    /// as their query or URL.
    pub fn parse(name: &str, input: &str) -> Result<Self, ActionError> {
        let kind = ActionKind::from_name(name).ok_or_else(|| ActionError::Unknown(name.trim().to_string()))?;

        let raw = strip_fences(input);
        let mut value = serde_json::from_str::<Value>(raw)
            .unwrap_or_else(|_| Value::String(raw.trim_matches(|c| c == '"' || c == '\'').to_string()));

        if let Value::String(s) = &value {
            match kind {
                ActionKind::SearchDishes => value = json!({ "query": s }),
                ActionKind::SummarizePage => value = json!({ "url": s }),
                _ => {}
            }
        }

        let action: AgentAction = serde_json::from_value(json!({ "action": kind.name(), "input": value }))
            .map_err(|source| ActionError::BadInput { action: kind.name(), source })?;
        action.validated()
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            AgentAction::GetDishes(_) => ActionKind::GetDishes,
            AgentAction::CheckBalance(_) => ActionKind::CheckBalance,
            AgentAction::GroceryList(_) => ActionKind::GroceryList,
            AgentAction::SearchDishes(_) => ActionKind::SearchDishes,
            AgentAction::SummarizePage(_) => ActionKind::SummarizePage,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Clamps the dish count and rejects inputs no tool could use.
    pub fn validated(self) -> Result<Self, ActionError> {
        let action = self.name();
        let invalid = |reason: &str| ActionError::Invalid { action, reason: reason.to_string() };

        match self {
            AgentAction::GetDishes(mut query) => {
                if query.cuisines.is_empty() {
                    return Err(invalid("at least one cuisine is required"));
                }
                query.count = query.count.clamp(1, MAX_DISH_COUNT);
                Ok(AgentAction::GetDishes(query))
            }
            AgentAction::CheckBalance(query) => {
                if query.dishes.iter().all(|d| d.trim().is_empty()) {
                    return Err(invalid("the dish list is empty"));
                }
                Ok(AgentAction::CheckBalance(query))
            }
            AgentAction::GroceryList(menu) => {
                let slots = menu.slots();
                if slots.is_empty() {
                    return Err(invalid("the menu is empty"));
                }
                menu.check_complete(&slots)
                    .map_err(|e| invalid(&format!("the menu is not complete ({e})")))?;
                Ok(AgentAction::GroceryList(menu))
            }
            AgentAction::SearchDishes(query) => {
                let q = query.query.trim();
                if q.is_empty() {
                    return Err(invalid("the query is empty"));
                }
                if q.chars().count() > MAX_QUERY_CHARS {
                    return Err(invalid("the query is too long"));
                }
                Ok(AgentAction::SearchDishes(SearchQuery { query: q.to_string() }))
            }
            AgentAction::SummarizePage(page) => {
                page_url(&page.url)?;
                Ok(AgentAction::SummarizePage(page))
            }
        }
    }
}

fn page_url(raw: &str) -> Result<Url, ActionError> {
    let action = ActionKind::SummarizePage.name();
    let url = Url::parse(raw.trim()).map_err(|e| ActionError::Invalid {
        action,
        reason: format!("'{raw}' is not a URL ({e})"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ActionError::Invalid {
            action,
            reason: format!("unsupported URL scheme '{other}'"),
        }),
    }
}

/// Drops a surrounding markdown code fence, if any.
fn strip_fences(input: &str) -> &str {
    let trimmed = input.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim()
}

/// The tools an agent run may call, each dispatch bounded by `timeout`.
#[derive(Clone)]
pub struct Toolbox {
    tools: MenuTools,
    search: Option<Arc<dyn WebSearch>>,
    reader: Option<Arc<dyn PageReader>>,
    timeout: Duration,
}

impl Toolbox {
    pub fn new(tools: MenuTools, timeout: Duration) -> Self {
        Self {
            tools,
            search: None,
            reader: None,
            timeout,
        }
    }

    pub fn with_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_reader(mut self, reader: Arc<dyn PageReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn enabled(&self) -> Vec<ActionKind> {
        ActionKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                ActionKind::SearchDishes => self.search.is_some(),
                ActionKind::SummarizePage => self.reader.is_some(),
                _ => true,
            })
            .collect()
    }

    /// Parses, runs, and renders the result (or the error) as observation text.
    pub async fn observe(&self, name: &str, input: &str) -> String {
        let result = match AgentAction::parse(name, input) {
            Ok(action) => self.run(action).await,
            Err(e) => Err(e),
        };

        let label = ActionKind::from_name(name).map(|k| k.name()).unwrap_or("unknown");
        match result {
            Ok(observation) => {
                AGENT_TOOL_CALLS_COUNTER.with_label_values(&[label, "ok"]).inc();
                observation
            }
            Err(e) => {
                debug!("Tool call {} failed: {}", label, e);
                AGENT_TOOL_CALLS_COUNTER.with_label_values(&[label, "error"]).inc();
                format!("Error: {e}")
            }
        }
    }

    pub async fn run(&self, action: AgentAction) -> Result<String, ActionError> {
        let name = action.name();
        debug!("Dispatching tool {}", name);
        tokio::time::timeout(self.timeout, self.dispatch(action))
            .await
            .map_err(|_| ActionError::Timeout(name, self.timeout))?
    }

    async fn dispatch(&self, action: AgentAction) -> Result<String, ActionError> {
        let name = action.name();
        match action {
            AgentAction::GetDishes(query) => Ok(self.lookup(&query).to_string()),
            AgentAction::CheckBalance(query) => {
                let report = self
                    .tools
                    .check_nutritional_balance(&query.dishes, &query.health_conditions);
                Ok(json!(report).to_string())
            }
            AgentAction::GroceryList(menu) => Ok(json!(self.tools.generate_grocery_list(&menu)).to_string()),
            AgentAction::SearchDishes(query) => {
                let search = self.search.as_ref().ok_or(ActionError::Disabled(name))?;
                search
                    .search(&query.query)
                    .await
                    .map_err(|source| ActionError::Failed { action: name, source })
            }
            AgentAction::SummarizePage(page) => {
                let reader = self.reader.as_ref().ok_or(ActionError::Disabled(name))?;
                let url = page_url(&page.url)?;
                reader
                    .summarize(&url)
                    .await
                    .map_err(|source| ActionError::Failed { action: name, source })
            }
        }
    }

    fn lookup(&self, query: &DishQuery) -> DishLookup {
        self.tools.dishes_by_criteria(query, &mut rand::thread_rng())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::models::menu::Day;
    use crate::models::preference::{DietType, MealSlot};
    use crate::planner::catalog::Catalog;

    fn toolbox() -> Toolbox {
        Toolbox::new(MenuTools::new(Arc::new(Catalog::builtin())), Duration::from_secs(5))
    }

    struct SlowSearch;

    #[async_trait]
    impl WebSearch for SlowSearch {
        async fn search(&self, _query: &str) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".into())
        }
    }

    struct EchoSearch;

    #[async_trait]
    impl WebSearch for EchoSearch {
        async fn search(&self, query: &str) -> anyhow::Result<String> {
            Ok(format!("results for {query}"))
        }
    }

    #[test]
    fn parses_structured_dish_query_and_clamps_count() {
        let action = AgentAction::parse(
            "get_dishes_by_criteria",
            r#"{"cuisine": "punjabi", "meal": "dinner", "diet": "non_veg", "count": 99}"#,
        )
        .unwrap();
        let AgentAction::GetDishes(query) = action else {
            panic!("expected a dish query");
        };
        assert_eq!(query.cuisines, vec!["punjabi"]);
        assert_eq!(query.meal, MealSlot::Dinner);
        assert_eq!(query.diet, DietType::NonVeg);
        assert_eq!(query.count, MAX_DISH_COUNT);
    }

    #[test]
    fn bare_strings_become_query_and_url() {
        let action = AgentAction::parse(" Search_For_New_Dishes ", "latest Kerala breakfast dishes").unwrap();
        assert_eq!(
            action,
            AgentAction::SearchDishes(SearchQuery { query: "latest Kerala breakfast dishes".into() })
        );

        let action = AgentAction::parse("summarize_web_content", "\"https://example.com/recipes\"").unwrap();
        assert_eq!(action.kind(), ActionKind::SummarizePage);
    }

    #[test]
    fn rejects_bad_inputs_before_dispatch() {
        assert!(matches!(AgentAction::parse("cook_dinner", "{}"), Err(ActionError::Unknown(_))));
        assert!(matches!(
            AgentAction::parse("get_dishes_by_criteria", "punjabi,dinner,veg,5"),
            Err(ActionError::BadInput { .. })
        ));
        assert!(matches!(
            AgentAction::parse("check_nutritional_balance", r#"{"dishes": []}"#),
            Err(ActionError::Invalid { .. })
        ));
        assert!(matches!(
            AgentAction::parse("summarize_web_content", "file:///etc/passwd"),
            Err(ActionError::Invalid { .. })
        ));
        let long = "dal ".repeat(80);
        assert!(matches!(
            AgentAction::parse("search_for_new_dishes", &long),
            Err(ActionError::Invalid { .. })
        ));
        assert!(matches!(
            AgentAction::parse("generate_grocery_list", r#"{"Monday": {"lunch": "Dal"}}"#),
            Err(ActionError::Invalid { .. })
        ));
    }

    #[test]
    fn grocery_list_accepts_capitalised_slot_keys() {
        let days: Vec<String> = Day::WEEK
            .iter()
            .map(|d| format!(r#""{d}": {{"Breakfast": "Poha", "DINNER": "Dal Tadka"}}"#))
            .collect();
        let input = format!("{{{}}}", days.join(", "));

        let AgentAction::GroceryList(menu) = AgentAction::parse("generate_grocery_list", &input).unwrap() else {
            panic!("expected a grocery list action");
        };
        assert_eq!(menu.get(Day::Sunday, MealSlot::Breakfast), Some("Poha"));
        assert_eq!(menu.get(Day::Sunday, MealSlot::Dinner), Some("Dal Tadka"));
    }

    #[test]
    fn fenced_json_input_is_accepted() {
        let input = "```json\n{\"dishes\": [\"Dal Tadka\"], \"health_conditions\": []}\n```";
        let action = AgentAction::parse("check_nutritional_balance", input).unwrap();
        assert_eq!(action.kind(), ActionKind::CheckBalance);
    }

    #[tokio::test]
    async fn observations_render_results_and_errors() {
        let tools = toolbox();
        let observation = tools
            .observe(
                "get_dishes_by_criteria",
                r#"{"cuisine": ["gujarati"], "meal": "lunch", "diet": "non_veg"}"#,
            )
            .await;
        assert!(observation.starts_with("No dishes found"));

        let observation = tools.observe("search_for_new_dishes", "new dosa recipes").await;
        assert!(observation.starts_with("Error:"));
        assert!(observation.contains("not available"));

        let mut menu = MenuGrid::new();
        for day in Day::WEEK {
            menu.set(day, MealSlot::Lunch, "Dal Tadka + Roti");
        }
        let observation = tools
            .observe("generate_grocery_list", &serde_json::to_string(&menu).unwrap())
            .await;
        assert!(observation.contains("Toor Dal"));
    }

    #[tokio::test]
    async fn web_actions_are_enabled_by_their_backends() {
        let tools = toolbox();
        assert_eq!(tools.enabled(), ActionKind::OFFLINE.to_vec());

        let tools = tools.with_search(Arc::new(EchoSearch));
        assert!(tools.enabled().contains(&ActionKind::SearchDishes));
        let observation = tools
            .observe("search_for_new_dishes", r#"{"query": "vegan thali"}"#)
            .await;
        assert_eq!(observation, "results for vegan thali");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tools_time_out() {
        let tools = toolbox().with_search(Arc::new(SlowSearch));
        let action = AgentAction::SearchDishes(SearchQuery { query: "thali".into() });
        let result = tools.run(action).await;
        assert!(matches!(result, Err(ActionError::Timeout("search_for_new_dishes", _))));
    }
}
