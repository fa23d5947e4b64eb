use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use rasoi_genie_api::models::menu::Day;
use rasoi_genie_api::models::preference::{DietType, MealPreferences, MealSlot};
use rasoi_genie_api::planner::actions::Toolbox;
use rasoi_genie_api::planner::agent::{AgentError, MenuAgent};
use rasoi_genie_api::planner::catalog::Catalog;
use rasoi_genie_api::planner::llm::{ChatModel, ChatRequest, LlmError};
use rasoi_genie_api::planner::tools::MenuTools;
use rasoi_genie_api::planner::{FallbackReason, MenuPlanner, PlanResult};

/// Chat model that replays a fixed script, then fails.
struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }

    fn texts(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, _request: &ChatRequest) -> Result<String, LlmError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}

fn planner_with(model: Arc<dyn ChatModel>) -> MenuPlanner {
    let catalog = Arc::new(Catalog::builtin());
    let toolbox = Toolbox::new(MenuTools::new(catalog.clone()), Duration::from_secs(5));
    let agent = MenuAgent::new(model, toolbox, 6, Duration::from_secs(30));
    MenuPlanner::new(catalog).with_agent(agent)
}

fn prefs() -> MealPreferences {
    MealPreferences {
        diet_type: DietType::Veg,
        cuisine: vec!["north_indian".into()],
        meals: vec![MealSlot::Breakfast, MealSlot::Dinner],
        cooking_time: "30 minutes".into(),
        health_conditions: vec![],
    }
}

fn week_answer() -> String {
    let days: Vec<String> = Day::WEEK
        .iter()
        .enumerate()
        .map(|(i, d)| format!(r#""{d}": {{"breakfast": "Millet Upma {i}", "dinner": "Lauki Kofta {i}", "snacks": "extra"}}"#))
        .collect();
    format!("Final Answer: {{{}}}\nThe week is rich in fibre.", days.join(", "))
}

fn assert_complete(menu: &rasoi_genie_api::models::menu::MenuGrid, slots: &[MealSlot]) {
    menu.check_complete(slots).expect("complete week");
    assert_eq!(menu.days().count(), 7);
}

#[tokio::test]
async fn agent_answer_is_parsed_and_projected_onto_requested_slots() {
    let final_turn = format!(" I now know the final answer\n{}", week_answer());
    let model = ScriptedModel::texts(&[
        " Check the catalog first.\nAction: get_dishes_by_criteria\nAction Input: {\"cuisine\": \"north_indian\", \"meal\": \"breakfast\", \"diet\": \"veg\"}",
        final_turn.as_str(),
    ]);
    let planner = planner_with(model);

    let generated = planner.generate_weekly_menu(&prefs()).await;

    assert!(!generated.fallback_used);
    assert!(generated.message.is_none());
    assert!(generated.agent_response.as_deref().unwrap_or("").contains("fibre"));
    assert_complete(&generated.menu, &[MealSlot::Breakfast, MealSlot::Dinner]);
    assert_eq!(generated.menu.get(Day::Thursday, MealSlot::Dinner), Some("Lauki Kofta 3"));
    assert_eq!(generated.menu.get(Day::Thursday, MealSlot::Snacks), None);
}

#[tokio::test]
async fn unparseable_answer_falls_back_to_the_catalog() {
    let model = ScriptedModel::texts(&["Final Answer: Monday: poha, Tuesday: upma"]);
    let planner = planner_with(model);

    let result = planner.plan_week(&prefs()).await;

    assert!(matches!(result.reason(), Some(FallbackReason::Parse(_))));
    assert_complete(result.value(), &[MealSlot::Breakfast, MealSlot::Dinner]);
}

#[tokio::test]
async fn incomplete_week_falls_back() {
    let model = ScriptedModel::texts(&[r#"Final Answer: {"Monday": {"breakfast": "Poha", "dinner": "Dal"}}"#]);
    let generated = planner_with(model).generate_weekly_menu(&prefs()).await;

    assert!(generated.fallback_used);
    assert_eq!(generated.message.as_deref(), Some("Generated using fallback system"));
    assert_complete(&generated.menu, &[MealSlot::Breakfast, MealSlot::Dinner]);
}

#[tokio::test]
async fn model_errors_and_iteration_cap_fall_back() {
    let model = ScriptedModel::new(vec![Err(LlmError::Api {
        status: 429,
        body: "quota exceeded".into(),
    })]);
    let result = planner_with(model).plan_week(&prefs()).await;
    assert!(matches!(result.reason(), Some(FallbackReason::Agent(AgentError::Llm(_)))));
    assert_eq!(result.reason().map(FallbackReason::label), Some("llm_error"));

    let rambling: Vec<&str> = vec!["Thought: still deciding"; 6];
    let result = planner_with(ScriptedModel::texts(&rambling)).plan_week(&prefs()).await;
    assert!(matches!(
        result.reason(),
        Some(FallbackReason::Agent(AgentError::IterationLimit(6)))
    ));
    assert_complete(result.value(), &[MealSlot::Breakfast, MealSlot::Dinner]);
}

#[tokio::test]
async fn fallback_week_matches_the_catalog_example() {
    let planner = MenuPlanner::new(Arc::new(Catalog::builtin()));
    let prefs = MealPreferences::default();
    let breakfasts: HashSet<&str> = [
        "Aloo Paratha",
        "Chole Bhature",
        "Poha",
        "Upma",
        "Idli Sambhar",
        "Masala Dosa",
    ]
    .into_iter()
    .collect();

    for _ in 0..10 {
        let result = planner.plan_week(&prefs).await;
        assert!(result.is_fallback());
        let menu = result.value();
        assert_complete(menu, &prefs.meals);
        assert!(breakfasts.contains(menu.get(Day::Monday, MealSlot::Breakfast).unwrap()));
    }
}

#[tokio::test]
async fn regeneration_accepts_a_fresh_dish() {
    let model = ScriptedModel::texts(&["\"Besan Chilla\""]);
    let planner = planner_with(model);
    let week = vec!["Poha".to_string(), "Upma".to_string()];

    let result = planner
        .regenerate_one(&prefs(), &week, Day::Tuesday, MealSlot::Breakfast)
        .await;

    assert!(matches!(result, PlanResult::Success(ref d) if d == "Besan Chilla"));
}

#[tokio::test]
async fn regeneration_never_repeats_a_slot_dish() {
    let week: Vec<String> = ["Aloo Paratha", "Chole Bhature", "Poha", "Upma", "Idli Sambhar"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    for reply in ["poha", "  UPMA.  ", ""] {
        let planner = planner_with(ScriptedModel::texts(&[reply]));
        let result = planner
            .regenerate_one(&prefs(), &week, Day::Monday, MealSlot::Breakfast)
            .await;

        assert!(matches!(result.reason(), Some(FallbackReason::RejectedDish(_))));
        let dish = result.into_value();
        assert!(!week.iter().any(|w| w.eq_ignore_ascii_case(&dish)), "{dish} repeats");
        // the only unused north-indian veg breakfast
        assert_eq!(dish, "Masala Dosa");
    }
}

#[tokio::test]
async fn regeneration_skips_a_chatty_preamble() {
    let model = ScriptedModel::texts(&["Sure! Here is a new breakfast idea:\nBesan Chilla"]);
    let week = vec!["Poha".to_string()];

    let result = planner_with(model)
        .regenerate_one(&prefs(), &week, Day::Friday, MealSlot::Breakfast)
        .await;

    assert!(matches!(result, PlanResult::Success(ref d) if d == "Besan Chilla"));
}

#[tokio::test]
async fn plan_week_normalizes_raw_preferences() {
    let planner = MenuPlanner::new(Arc::new(Catalog::builtin()));
    let catalog = Catalog::builtin();

    let no_meals = MealPreferences {
        meals: vec![],
        ..prefs()
    };
    let result = planner.plan_week(&no_meals).await;
    assert_eq!(result.value().days().count(), 7);
    assert_complete(result.value(), &[MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner]);

    let hyphenated = MealPreferences {
        cuisine: vec!["North-Indian".into()],
        ..prefs()
    };
    let result = planner.plan_week(&hyphenated).await;
    let monday = result.value().get(Day::Monday, MealSlot::Breakfast).unwrap();
    assert!(catalog
        .dishes("north_indian", MealSlot::Breakfast, DietType::Veg)
        .contains(&monday));
}
