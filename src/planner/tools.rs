use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::menu::MenuGrid;
use crate::models::preference::{normalize_cuisine, DietType, MealSlot};

use super::catalog::{Catalog, GroceryCategory};

pub const DEFAULT_DISH_COUNT: usize = 5;
pub const MAX_DISH_COUNT: usize = 20;

/// Arguments of the catalog lookup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DishQuery {
    #[serde(alias = "cuisine", deserialize_with = "one_or_many")]
    pub cuisines: Vec<String>,
    #[serde(alias = "meal_type", alias = "slot")]
    pub meal: MealSlot,
    #[serde(alias = "diet_type")]
    pub diet: DietType,
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    DEFAULT_DISH_COUNT
}

/// Accepts `"punjabi"`, `"punjabi, bengali"` or `["punjabi", "bengali"]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let raw = match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => s.split(',').map(str::to_string).collect(),
        OneOrMany::Many(v) => v,
    };
    Ok(raw
        .iter()
        .map(|c| normalize_cuisine(c))
        .filter(|c| !c.is_empty())
        .collect())
}

/// Result of a catalog lookup. A miss is data, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DishLookup {
    Found(Vec<String>),
    NotFound {
        cuisines: Vec<String>,
        meal: MealSlot,
        diet: DietType,
    },
}

impl fmt::Display for DishLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DishLookup::Found(dishes) => write!(f, "{}", serde_json::json!(dishes)),
            DishLookup::NotFound { cuisines, meal, diet } => write!(
                f,
                "No dishes found in internal database for cuisine(s) {cuisines:?}, meal {meal}, diet {diet}."
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    pub balance_score: u8,
    pub recommendations: Vec<String>,
    pub is_balanced: bool,
}

pub const BALANCED_THRESHOLD: u8 = 75;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroceryList {
    pub vegetables: BTreeSet<String>,
    pub grains_pulses: BTreeSet<String>,
    pub dairy_proteins: BTreeSet<String>,
    pub spices_condiments: BTreeSet<String>,
    pub others: BTreeSet<String>,
}

impl GroceryList {
    fn bucket(&mut self, category: GroceryCategory) -> &mut BTreeSet<String> {
        match category {
            GroceryCategory::Vegetables => &mut self.vegetables,
            GroceryCategory::GrainsPulses => &mut self.grains_pulses,
            GroceryCategory::DairyProteins => &mut self.dairy_proteins,
            GroceryCategory::SpicesCondiments => &mut self.spices_condiments,
            GroceryCategory::Others => &mut self.others,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vegetables.is_empty()
            && self.grains_pulses.is_empty()
            && self.dairy_proteins.is_empty()
            && self.spices_condiments.is_empty()
            && self.others.is_empty()
    }
}

/// Case-insensitive substring match against any keyword.
fn mentions(dish: &str, keywords: &[&str]) -> bool {
    let dish = dish.to_lowercase();
    keywords.iter().any(|k| dish.contains(&k.to_lowercase()))
}

/// Pure heuristics over the catalog.
#[derive(Clone)]
pub struct MenuTools {
    catalog: Arc<Catalog>,
}

impl MenuTools {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Random sample (at most `count`) of the distinct dishes matching any of the cuisines.
    pub fn dishes_by_criteria<R: Rng + ?Sized>(&self, query: &DishQuery, rng: &mut R) -> DishLookup {
        let mut all: Vec<&'static str> = Vec::new();
        for cuisine in &query.cuisines {
            for dish in self.catalog.dishes(cuisine, query.meal, query.diet) {
                if !all.contains(dish) {
                    all.push(*dish);
                }
            }
        }

        if all.is_empty() {
            return DishLookup::NotFound {
                cuisines: query.cuisines.clone(),
                meal: query.meal,
                diet: query.diet,
            };
        }

        let count = query.count.clamp(1, MAX_DISH_COUNT).min(all.len());
        let picked = all
            .choose_multiple(rng, count)
            .map(|d| d.to_string())
            .collect();
        DishLookup::Found(picked)
    }

    /// Four 25-point checks: protein, fiber, variety, and diabetic suitability
    /// (auto-pass without a `diabetes` tag).
    pub fn check_nutritional_balance(
        &self,
        dishes: &[String],
        health_conditions: &[String],
    ) -> BalanceReport {
        let keywords = self.catalog.keywords();
        let mut score = 0u8;
        let mut recommendations = Vec::new();

        let protein = dishes.iter().filter(|d| mentions(d, keywords.high_protein)).count();
        if protein >= 2 {
            score += 25;
        } else {
            recommendations.push("Add more protein sources like Dal, Paneer, or Chicken".to_string());
        }

        let fiber = dishes.iter().filter(|d| mentions(d, keywords.high_fiber)).count();
        if fiber >= 3 {
            score += 25;
        } else {
            recommendations
                .push("Include more vegetables like Bhindi, Palak, or Mixed Vegetables".to_string());
        }

        let distinct: BTreeSet<&str> = dishes.iter().map(String::as_str).collect();
        if distinct.len() == dishes.len() {
            score += 25;
        } else {
            recommendations.push("Ensure variety - avoid repeating similar dishes".to_string());
        }

        let has = |tag: &str| health_conditions.iter().any(|c| c.trim().eq_ignore_ascii_case(tag));

        if has("diabetes") {
            let friendly = dishes
                .iter()
                .filter(|d| mentions(d, keywords.diabetic_friendly))
                .count();
            // friendly >= 60% of dishes
            if friendly * 10 >= dishes.len() * 6 {
                score += 25;
            } else {
                recommendations
                    .push("Choose more diabetic-friendly options like Dal and Vegetables".to_string());
            }
        } else {
            score += 25;
        }

        // Advisory only; never affects the score.
        if has("cholesterol") || has("bp") {
            let low_oil = dishes.iter().filter(|d| mentions(d, keywords.low_oil)).count();
            if low_oil * 3 < dishes.len() {
                recommendations
                    .push("Prefer steamed, boiled or grilled dishes to keep oil low".to_string());
            }
        }

        BalanceReport {
            balance_score: score,
            recommendations,
            is_balanced: score >= BALANCED_THRESHOLD,
        }
    }

    /// Ingredient buckets implied by every dish in the menu.
    pub fn generate_grocery_list(&self, menu: &MenuGrid) -> GroceryList {
        let mut list = GroceryList::default();
        for dish in menu.dishes() {
            for rule in self.catalog.ingredients() {
                if mentions(dish, &[rule.keyword]) {
                    let bucket = list.bucket(rule.category);
                    bucket.extend(rule.items.iter().map(|i| i.to_string()));
                }
            }
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::models::menu::Day;

    fn tools() -> MenuTools {
        MenuTools::new(Arc::new(Catalog::builtin()))
    }

    fn dishes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lookup_samples_distinct_dishes_across_cuisines() {
        let query = DishQuery {
            cuisines: vec!["north_indian".into(), "marathi".into()],
            meal: MealSlot::Breakfast,
            diet: DietType::Vegan,
            count: 20,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let DishLookup::Found(found) = tools().dishes_by_criteria(&query, &mut rng) else {
            panic!("expected dishes");
        };
        // Poha and Upma appear in both cuisines but only once in the result.
        assert_eq!(found.len(), 5);
        let unique: BTreeSet<_> = found.iter().collect();
        assert_eq!(unique.len(), found.len());
    }

    #[test]
    fn lookup_miss_is_reported_as_data() {
        let query = DishQuery {
            cuisines: vec!["gujarati".into()],
            meal: MealSlot::Dinner,
            diet: DietType::NonVeg,
            count: 3,
        };
        let result = tools().dishes_by_criteria(&query, &mut StdRng::seed_from_u64(1));
        assert!(matches!(result, DishLookup::NotFound { .. }));
        assert!(result.to_string().starts_with("No dishes found"));
    }

    #[test]
    fn query_accepts_comma_separated_cuisines() {
        let query: DishQuery = serde_json::from_str(
            r#"{"cuisine": "Punjabi, south-indian", "meal_type": "lunch", "diet_type": "non-veg"}"#,
        )
        .unwrap();
        assert_eq!(query.cuisines, vec!["punjabi", "south_indian"]);
        assert_eq!(query.diet, DietType::NonVeg);
        assert_eq!(query.count, DEFAULT_DISH_COUNT);
    }

    #[test]
    fn full_marks_without_diabetes_tag() {
        let list = dishes(&[
            "Dal Tadka + Roti",
            "Palak Paneer + Roti",
            "Bhindi Masala + Roti",
            "Aloo Gobi + Roti",
        ]);
        let report = tools().check_nutritional_balance(&list, &[]);
        assert_eq!(report.balance_score, 100);
        assert!(report.is_balanced);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn repeats_and_low_fiber_cost_points() {
        let list = dishes(&["Samosa", "Samosa", "Chicken Tikka", "Egg Roll"]);
        let report = tools().check_nutritional_balance(&list, &[]);
        // protein passes, fiber fails, variety fails, diabetes auto-passes
        assert_eq!(report.balance_score, 50);
        assert!(!report.is_balanced);
        assert_eq!(report.recommendations.len(), 2);
    }

    #[test]
    fn diabetes_tag_requires_sixty_percent_friendly() {
        let list = dishes(&[
            "Dal Rice",
            "Upma",
            "Poha",
            "Chana Salad",
            "Gobi Paratha",
        ]);
        // protein and variety pass, fiber fails, 4 of 5 friendly (80%)
        let report = tools().check_nutritional_balance(&list, &dishes(&["diabetes"]));
        assert_eq!(report.balance_score, 75);
        assert!(report.is_balanced);

        let list = dishes(&["Samosa", "Kachori", "Dal Rice", "Pakora", "Jalebi"]);
        let report = tools().check_nutritional_balance(&list, &dishes(&["Diabetes"]));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("diabetic-friendly")));
    }

    #[test]
    fn balanced_iff_score_at_least_threshold() {
        let samples = [
            dishes(&[]),
            dishes(&["Dal Rice", "Chicken Curry", "Palak", "Gobi", "Bhindi"]),
            dishes(&["Samosa", "Samosa"]),
            dishes(&["Dal", "Dal", "Palak", "Gobi", "Bhindi"]),
        ];
        for list in samples {
            for tags in [dishes(&[]), dishes(&["diabetes"])] {
                let report = tools().check_nutritional_balance(&list, &tags);
                assert_eq!(report.is_balanced, report.balance_score >= BALANCED_THRESHOLD);
                assert!(report.balance_score <= 100);
            }
        }
    }

    #[test]
    fn grocery_list_dedupes_and_is_stable() {
        let mut menu = MenuGrid::new();
        menu.set(Day::Monday, MealSlot::Lunch, "Dal Tadka + Roti");
        menu.set(Day::Tuesday, MealSlot::Lunch, "Dal Makhani + Rice");
        menu.set(Day::Wednesday, MealSlot::Lunch, "Aloo Gobi + Roti");

        let tools = tools();
        let first = tools.generate_grocery_list(&menu);
        let second = tools.generate_grocery_list(&menu);
        assert_eq!(first, second);

        let pulses: Vec<_> = first.grains_pulses.iter().map(String::as_str).collect();
        assert_eq!(
            pulses,
            ["Basmati Rice", "Masoor Dal", "Moong Dal", "Toor Dal", "Wheat Flour"]
        );
        assert!(first.vegetables.contains("Potatoes"));
        assert!(first.vegetables.contains("Cauliflower"));
        assert!(first.others.is_empty());
    }
}
