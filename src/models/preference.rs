use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Diet a user follows. The wire form is snake_case; the hyphenated form sent by
/// the web client (`non-veg`) is accepted too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietType {
    #[default]
    Veg,
    #[serde(alias = "non-veg", alias = "nonveg")]
    NonVeg,
    Vegan,
}

impl DietType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DietType::Veg => "veg",
            DietType::NonVeg => "non_veg",
            DietType::Vegan => "vegan",
        }
    }
}

impl std::fmt::Display for DietType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DietType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "veg" | "vegetarian" => Ok(DietType::Veg),
            "non_veg" | "nonveg" | "non_vegetarian" => Ok(DietType::NonVeg),
            "vegan" => Ok(DietType::Vegan),
            _ => Err(anyhow::anyhow!("Unknown diet type: {s}")),
        }
    }
}

/// A meal occasion within a day. Serialized lowercase; read case-insensitively
/// through `FromStr`, so `"Breakfast"` and `"snack"` are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
}

impl MealSlot {
    pub const ALL: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Dinner,
        MealSlot::Snacks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
            MealSlot::Snacks => "snacks",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "Breakfast",
            MealSlot::Lunch => "Lunch",
            MealSlot::Dinner => "Dinner",
            MealSlot::Snacks => "Snacks",
        }
    }
}

impl std::fmt::Display for MealSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MealSlot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealSlot::Breakfast),
            "lunch" => Ok(MealSlot::Lunch),
            "dinner" => Ok(MealSlot::Dinner),
            "snacks" | "snack" => Ok(MealSlot::Snacks),
            _ => Err(anyhow::anyhow!("Unknown meal slot: {s}")),
        }
    }
}

impl<'de> Deserialize<'de> for MealSlot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub const DEFAULT_CUISINE: &str = "north_indian";

/// Canonical cuisine identifier: lower-case, words joined by `_`.
pub fn normalize_cuisine(id: &str) -> String {
    id.trim()
        .to_lowercase()
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// What a user wants from a weekly plan. Also the body of POST /preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPreferences {
    #[serde(default)]
    pub diet_type: DietType,
    #[serde(default)]
    pub cuisine: Vec<String>,
    #[serde(default)]
    pub meals: Vec<MealSlot>,
    #[serde(default)]
    pub cooking_time: String,
    #[serde(default)]
    pub health_conditions: Vec<String>,
}

impl Default for MealPreferences {
    fn default() -> Self {
        Self {
            diet_type: DietType::Veg,
            cuisine: vec![DEFAULT_CUISINE.to_string()],
            meals: vec![MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner],
            cooking_time: String::new(),
            health_conditions: Vec::new(),
        }
    }
}

impl MealPreferences {
    /// Canonicalise identifiers, drop duplicates (first occurrence wins) and fill
    /// empty cuisine/meal lists with the defaults.
    pub fn normalized(self) -> Self {
        let mut cuisine: Vec<String> = Vec::new();
        for c in self.cuisine.iter().map(|c| normalize_cuisine(c)) {
            if !c.is_empty() && !cuisine.contains(&c) {
                cuisine.push(c);
            }
        }
        if cuisine.is_empty() {
            cuisine.push(DEFAULT_CUISINE.to_string());
        }

        let mut meals: Vec<MealSlot> = Vec::new();
        for slot in self.meals {
            if !meals.contains(&slot) {
                meals.push(slot);
            }
        }
        if meals.is_empty() {
            meals = MealPreferences::default().meals;
        }

        let mut health_conditions: Vec<String> = Vec::new();
        for tag in self.health_conditions.iter().map(|t| t.trim().to_lowercase()) {
            if !tag.is_empty() && !health_conditions.contains(&tag) {
                health_conditions.push(tag);
            }
        }

        Self {
            diet_type: self.diet_type,
            cuisine,
            meals,
            cooking_time: self.cooking_time.trim().to_string(),
            health_conditions,
        }
    }

    pub fn has_condition(&self, tag: &str) -> bool {
        self.health_conditions
            .iter()
            .any(|c| c.trim().eq_ignore_ascii_case(tag))
    }
}

/// DB row for the `preferences` table. Enums are stored as TEXT.
#[derive(Debug, Clone, FromRow)]
pub struct PreferenceRow {
    pub user_id: Uuid,
    pub diet_type: String,
    pub cuisine: Vec<String>,
    pub meals: Vec<String>,
    pub cooking_time: String,
    pub health_conditions: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<PreferenceRow> for MealPreferences {
    fn from(row: PreferenceRow) -> Self {
        MealPreferences {
            diet_type: row.diet_type.parse().unwrap_or_default(),
            cuisine: row.cuisine,
            meals: row.meals.iter().filter_map(|m| m.parse().ok()).collect(),
            cooking_time: row.cooking_time,
            health_conditions: row.health_conditions,
        }
        .normalized()
    }
}
