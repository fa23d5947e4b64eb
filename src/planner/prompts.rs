use crate::models::menu::Day;
use crate::models::preference::{MealPreferences, MealSlot};

use super::actions::ActionKind;

/// System prompt for the reasoning loop. Only the enabled actions are listed.
pub fn agent_system(actions: &[ActionKind]) -> String {
    let tools = actions
        .iter()
        .map(|a| format!("{}: {}", a.name(), a.description()))
        .collect::<Vec<_>>()
        .join("\n");
    let names = actions.iter().map(|a| a.name()).collect::<Vec<_>>().join(", ");
    let web_hint = if actions.contains(&ActionKind::SearchDishes) {
        "2. If the catalog has too few dishes, use 'search_for_new_dishes' with a short, specific query.\n"
    } else {
        "2. If the catalog has too few dishes, use well-known dishes of the requested cuisine.\n"
    };

    format!(
        "You are an expert Indian cuisine meal planner. Your goal is to create balanced, diverse, \
and delicious weekly meal plans.
You MUST use the tools provided. Do not invent your own tools.

You have access to the following tools:
{tools}

Use the following format:
Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{names}]
Action Input: the input to the action, as a single JSON object
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input

Remember:
1. First, try the 'get_dishes_by_criteria' tool.
{web_hint}3. Never write an Observation yourself; wait for it.
4. Once you have a complete 7-day menu, give the Final Answer as a single, valid JSON object."
    )
}

/// The weekly-menu question posed to the agent.
pub fn weekly_menu(prefs: &MealPreferences) -> String {
    let meals: Vec<&str> = prefs.meals.iter().map(MealSlot::as_str).collect();
    let example_day = meals
        .iter()
        .map(|m| format!("\"{m}\": \"dish_name\""))
        .collect::<Vec<_>>()
        .join(", ");
    let cooking_time = if prefs.cooking_time.trim().is_empty() {
        "no limit"
    } else {
        prefs.cooking_time.trim()
    };
    let health = if prefs.health_conditions.is_empty() {
        "none".to_string()
    } else {
        prefs.health_conditions.join(", ")
    };

    format!(
        "Create a 7-day meal plan with the following preferences:
- Diet Type: {diet}
- Cuisines: {cuisines}
- Meals: {meals}
- Cooking Time: {cooking_time}
- Health Conditions: {health}

For each day (Monday to Sunday), suggest one dish for each meal. Treat the cooking time as a \
constraint on the chosen dishes, but do not pass it to any tool.

Ensure:
1. No dish repeats in the entire week.
2. The entire week is nutritionally balanced.
3. The plan suits the diet and health conditions.

Return the menu in this JSON format:
{{
  \"Monday\": {{{example_day}}},
  \"Tuesday\": {{{example_day}}},
  ... for all 7 days
}}

Also provide a brief nutritional analysis after the JSON.",
        diet = prefs.diet_type,
        cuisines = prefs.cuisine.join(", "),
        meals = meals.join(", "),
    )
}

/// A narrow one-dish request; answered directly without tools.
pub fn regenerate_meal(
    prefs: &MealPreferences,
    slot_dishes: &[String],
    day: Day,
    slot: MealSlot,
) -> String {
    format!(
        "Suggest one new {diet} {slot} dish for {day} from these cuisines: {cuisines}.
The {slot} dishes already planned this week are: {current}.
Do not repeat any of them. Reply with the dish name only, nothing else.",
        diet = prefs.diet_type,
        cuisines = prefs.cuisine.join(", "),
        current = slot_dishes.join(", "),
    )
}

pub fn summarize_page(excerpt: &str) -> String {
    format!(
        "Summarize the following web page text in a few lines. List the dish names it mentions \
and their main ingredients.\n\n{excerpt}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::preference::DietType;

    #[test]
    fn system_prompt_lists_only_enabled_actions() {
        let prompt = agent_system(&ActionKind::OFFLINE);
        assert!(prompt.contains("get_dishes_by_criteria"));
        assert!(!prompt.contains("search_for_new_dishes"));

        let prompt = agent_system(&ActionKind::ALL);
        assert!(prompt.contains("summarize_web_content"));
    }

    #[test]
    fn weekly_question_carries_preferences() {
        let prefs = MealPreferences {
            diet_type: DietType::Vegan,
            cuisine: vec!["south_indian".into()],
            meals: vec![MealSlot::Breakfast, MealSlot::Snacks],
            cooking_time: "30 minutes".into(),
            health_conditions: vec!["diabetes".into()],
        };
        let q = weekly_menu(&prefs);
        assert!(q.contains("- Diet Type: vegan"));
        assert!(q.contains("- Meals: breakfast, snacks"));
        assert!(q.contains("- Cooking Time: 30 minutes"));
        assert!(q.contains(r#""breakfast": "dish_name", "snacks": "dish_name""#));
    }
}
