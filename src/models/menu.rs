use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use super::preference::{MealPreferences, MealSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    #[serde(alias = "monday")]
    Monday,
    #[serde(alias = "tuesday")]
    Tuesday,
    #[serde(alias = "wednesday")]
    Wednesday,
    #[serde(alias = "thursday")]
    Thursday,
    #[serde(alias = "friday")]
    Friday,
    #[serde(alias = "saturday")]
    Saturday,
    #[serde(alias = "sunday")]
    Sunday,
}

impl Day {
    pub const WEEK: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }
}

impl std::fmt::Display for Day {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Day {
    type Err = anyhow::Error;

    /// Case-insensitive; accepts full names and three-letter abbreviations.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Day::WEEK
            .into_iter()
            .find(|d| {
                let name = d.as_str().to_lowercase();
                lower == name || (lower.len() == 3 && name.starts_with(&lower))
            })
            .ok_or_else(|| anyhow::anyhow!("Unknown day: {s}"))
    }
}

pub type DayMenu = BTreeMap<MealSlot, String>;

/// Seven days of slot → dish assignments, serialized as
/// `{"Monday": {"breakfast": "Poha", ...}, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuGrid(BTreeMap<Day, DayMenu>);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GridError {
    #[error("menu is missing {0}")]
    MissingDay(Day),
    #[error("{day} has slots {found:?}, expected {expected:?}")]
    SlotMismatch {
        day: Day,
        expected: Vec<MealSlot>,
        found: Vec<MealSlot>,
    },
    #[error("{day} {slot} has no dish")]
    EmptyDish { day: Day, slot: MealSlot },
}

impl MenuGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `day` with no slots if it is not present yet.
    pub fn add_day(&mut self, day: Day) -> &mut DayMenu {
        self.0.entry(day).or_default()
    }

    pub fn set(&mut self, day: Day, slot: MealSlot, dish: impl Into<String>) {
        self.add_day(day).insert(slot, dish.into());
    }

    pub fn get(&self, day: Day, slot: MealSlot) -> Option<&str> {
        self.0.get(&day).and_then(|d| d.get(&slot)).map(String::as_str)
    }

    pub fn day(&self, day: Day) -> Option<&DayMenu> {
        self.0.get(&day)
    }

    pub fn days(&self) -> impl Iterator<Item = (&Day, &DayMenu)> {
        self.0.iter()
    }

    /// Every dish in day/slot order.
    pub fn dishes(&self) -> impl Iterator<Item = &str> {
        self.0.values().flat_map(|d| d.values().map(String::as_str))
    }

    /// The dishes assigned to `slot` across the week.
    pub fn slot_dishes(&self, slot: MealSlot) -> Vec<String> {
        self.0
            .values()
            .filter_map(|d| d.get(&slot).cloned())
            .collect()
    }

    /// Exactly seven days, each holding exactly `slots`, none empty.
    pub fn check_complete(&self, slots: &[MealSlot]) -> Result<(), GridError> {
        let mut expected: Vec<MealSlot> = slots.to_vec();
        expected.sort();
        expected.dedup();

        for day in Day::WEEK {
            let menu = self.0.get(&day).ok_or(GridError::MissingDay(day))?;
            let found: Vec<MealSlot> = menu.keys().copied().collect();
            if found != expected {
                return Err(GridError::SlotMismatch {
                    day,
                    expected: expected.clone(),
                    found,
                });
            }
            if let Some((slot, _)) = menu.iter().find(|(_, dish)| dish.trim().is_empty()) {
                return Err(GridError::EmptyDish { day, slot: *slot });
            }
        }
        Ok(())
    }

    /// Slots present on every day, used when a grid arrives without its preferences.
    pub fn slots(&self) -> Vec<MealSlot> {
        self.0
            .values()
            .next()
            .map(|d| d.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn preview(&self) -> BTreeMap<Day, Vec<String>> {
        self.0
            .iter()
            .map(|(day, meals)| (*day, meals.values().cloned().collect()))
            .collect()
    }
}

/// DB row for `weekly_menus`.
#[derive(Debug, Clone, FromRow)]
pub struct WeeklyMenu {
    pub id: Uuid,
    pub user_id: Uuid,
    pub menu_data: Json<MenuGrid>,
    pub generation_prompt: Json<MealPreferences>,
    pub fallback_used: bool,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Body of POST /regenerate-meal.
#[derive(Debug, Deserialize)]
pub struct RegenerateMealRequest {
    pub menu_id: Uuid,
    pub day: Day,
    pub meal: MealSlot,
}

/// Query params for GET /menu-history.
#[derive(Debug, Deserialize)]
pub struct MenuHistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MenuResponse {
    pub menu: MenuGrid,
    pub preferences_used: MealPreferences,
    pub generated_at: DateTime<Utc>,
    pub menu_id: Uuid,
    pub is_active: bool,
    pub fallback_used: bool,
}

impl From<WeeklyMenu> for MenuResponse {
    fn from(m: WeeklyMenu) -> Self {
        Self {
            menu: m.menu_data.0,
            preferences_used: m.generation_prompt.0,
            generated_at: m.created_at,
            menu_id: m.id,
            is_active: m.is_active,
            fallback_used: m.fallback_used,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MenuHistoryItem {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub is_active: bool,
    pub fallback_used: bool,
    pub menu_preview: BTreeMap<Day, Vec<String>>,
}

impl From<WeeklyMenu> for MenuHistoryItem {
    fn from(m: WeeklyMenu) -> Self {
        Self {
            id: m.id,
            generated_at: m.created_at,
            is_active: m.is_active,
            fallback_used: m.fallback_used,
            menu_preview: m.menu_data.0.preview(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MenuHistoryResponse {
    pub menus: Vec<MenuHistoryItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_grid(slots: &[MealSlot]) -> MenuGrid {
        let mut grid = MenuGrid::new();
        for (i, day) in Day::WEEK.into_iter().enumerate() {
            for slot in slots {
                grid.set(day, *slot, format!("Dish {i} {slot}"));
            }
        }
        grid
    }

    #[test]
    fn serializes_with_day_and_slot_names() {
        let mut grid = MenuGrid::new();
        grid.set(Day::Monday, MealSlot::Breakfast, "Poha");
        let json = serde_json::to_value(&grid).unwrap();
        assert_eq!(json, serde_json::json!({ "Monday": { "breakfast": "Poha" } }));
    }

    #[test]
    fn complete_grid_passes() {
        let slots = [MealSlot::Breakfast, MealSlot::Dinner];
        assert_eq!(full_grid(&slots).check_complete(&slots), Ok(()));
    }

    #[test]
    fn missing_day_and_extra_slot_are_rejected() {
        let slots = [MealSlot::Lunch];
        let mut grid = full_grid(&slots);
        grid.0.remove(&Day::Sunday);
        assert_eq!(grid.check_complete(&slots), Err(GridError::MissingDay(Day::Sunday)));

        let mut grid = full_grid(&slots);
        grid.set(Day::Tuesday, MealSlot::Snacks, "Samosa");
        assert!(matches!(
            grid.check_complete(&slots),
            Err(GridError::SlotMismatch { day: Day::Tuesday, .. })
        ));
    }

    #[test]
    fn blank_dish_is_rejected() {
        let slots = [MealSlot::Lunch];
        let mut grid = full_grid(&slots);
        grid.set(Day::Friday, MealSlot::Lunch, "   ");
        assert_eq!(
            grid.check_complete(&slots),
            Err(GridError::EmptyDish { day: Day::Friday, slot: MealSlot::Lunch })
        );
    }

    #[test]
    fn day_parsing_is_lenient() {
        assert_eq!("monday".parse::<Day>().unwrap(), Day::Monday);
        assert_eq!(" SUN ".parse::<Day>().unwrap(), Day::Sunday);
        assert!("Someday".parse::<Day>().is_err());
    }
}
