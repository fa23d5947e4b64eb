//! Built-in dish catalog and keyword tables.
//!
//! The data is compiled in and never mutated; a [`Catalog`] is built once at
//! startup and shared behind an `Arc`.

use std::collections::HashMap;

use crate::models::preference::{DietType, MealSlot};

use crate::models::preference::DietType::{NonVeg, Vegan, Veg};
use crate::models::preference::MealSlot::{Breakfast, Dinner, Lunch, Snacks};

/// Dishes for one (cuisine, slot, diet) combination.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub cuisine: &'static str,
    pub slot: MealSlot,
    pub diet: DietType,
    pub dishes: &'static [&'static str],
}

const fn entry(
    cuisine: &'static str,
    slot: MealSlot,
    diet: DietType,
    dishes: &'static [&'static str],
) -> CatalogEntry {
    CatalogEntry { cuisine, slot, diet, dishes }
}

pub const DISHES: &[CatalogEntry] = &[
    // north_indian
    entry("north_indian", Breakfast, Veg, &["Aloo Paratha", "Chole Bhature", "Poha", "Upma", "Idli Sambhar", "Masala Dosa"]),
    entry("north_indian", Breakfast, NonVeg, &["Egg Paratha", "Keema Paratha", "Chicken Sandwich"]),
    entry("north_indian", Breakfast, Vegan, &["Poha", "Upma", "Vegetable Dalia", "Ragi Dosa"]),
    entry("north_indian", Lunch, Veg, &["Dal Tadka + Roti", "Rajma + Rice", "Chole + Rice", "Palak Paneer + Roti", "Bhindi Masala + Roti", "Aloo Gobi + Roti", "Mix Veg + Roti"]),
    entry("north_indian", Lunch, NonVeg, &["Chicken Curry + Rice", "Mutton Curry + Roti", "Fish Curry + Rice"]),
    entry("north_indian", Lunch, Vegan, &["Dal Tadka + Roti", "Chana Masala + Rice", "Vegetable Curry + Roti"]),
    entry("north_indian", Dinner, Veg, &["Paneer Butter Masala + Roti", "Dal Makhani + Rice", "Stuffed Paratha + Raita"]),
    entry("north_indian", Dinner, NonVeg, &["Butter Chicken + Naan", "Lamb Biryani", "Fish Fry + Rice"]),
    entry("north_indian", Dinner, Vegan, &["Mixed Dal + Roti", "Vegetable Biryani", "Stuffed Roti + Pickle"]),
    entry("north_indian", Snacks, Veg, &["Samosa", "Pakora", "Dhokla", "Kachori", "Sandwich"]),
    entry("north_indian", Snacks, NonVeg, &["Chicken Tikka", "Seekh Kebab", "Egg Roll"]),
    entry("north_indian", Snacks, Vegan, &["Bhel Puri", "Roasted Chana", "Fruit Chaat"]),
    // south_indian
    entry("south_indian", Breakfast, Veg, &["Idli Sambhar", "Masala Dosa", "Uttapam", "Rava Upma", "Medu Vada"]),
    entry("south_indian", Breakfast, NonVeg, &["Egg Dosa", "Chicken 65"]),
    entry("south_indian", Breakfast, Vegan, &["Plain Dosa", "Coconut Rice", "Lemon Rice"]),
    entry("south_indian", Lunch, Veg, &["Sambhar Rice", "Rasam Rice", "Curd Rice", "Vegetable Curry + Rice"]),
    entry("south_indian", Lunch, NonVeg, &["Fish Curry + Rice", "Chicken Curry + Rice", "Mutton Biryani"]),
    entry("south_indian", Lunch, Vegan, &["Sambhar Rice", "Tamarind Rice", "Coconut Chutney + Rice"]),
    entry("south_indian", Dinner, Veg, &["Paneer Masala + Rice", "Mixed Vegetable Curry + Rice"]),
    entry("south_indian", Dinner, NonVeg, &["Chicken Biryani", "Fish Fry + Rice"]),
    entry("south_indian", Dinner, Vegan, &["Vegetable Biryani", "Dal Rice"]),
    entry("south_indian", Snacks, Veg, &["Murukku", "Banana Chips", "Coconut Laddu"]),
    entry("south_indian", Snacks, NonVeg, &["Chicken 65", "Fish Fry"]),
    entry("south_indian", Snacks, Vegan, &["Roasted Groundnuts", "Coconut Barfi"]),
    // gujarati (no non-veg tradition in the table)
    entry("gujarati", Breakfast, Veg, &["Dhokla", "Khandvi", "Thepla", "Fafda Jalebi", "Poha"]),
    entry("gujarati", Breakfast, Vegan, &["Plain Thepla", "Dhokla", "Khakhra"]),
    entry("gujarati", Lunch, Veg, &["Dal Dhokli", "Undhiyu", "Gujarati Kadhi + Rice", "Bhindi Shaak + Rotli"]),
    entry("gujarati", Lunch, Vegan, &["Mixed Dal + Rotli", "Vegetable Curry + Rice"]),
    entry("gujarati", Dinner, Veg, &["Gujarati Thali", "Khichdi Kadhi", "Stuffed Paratha"]),
    entry("gujarati", Dinner, Vegan, &["Simple Khichdi", "Vegetable Curry + Rotli"]),
    entry("gujarati", Snacks, Veg, &["Dhokla", "Kachori", "Chakri", "Sev Mamra"]),
    entry("gujarati", Snacks, Vegan, &["Khakhra", "Roasted Chana"]),
    // marathi
    entry("marathi", Breakfast, Veg, &["Poha", "Upma", "Misal Pav", "Sabudana Khichdi", "Thalipeeth"]),
    entry("marathi", Breakfast, NonVeg, &["Chicken Vada Pav", "Egg Curry"]),
    entry("marathi", Breakfast, Vegan, &["Poha", "Upma", "Sabudana Khichdi"]),
    entry("marathi", Lunch, Veg, &["Dal Rice", "Bharleli Vangi", "Alu Vadi", "Zunka Bhakar"]),
    entry("marathi", Lunch, NonVeg, &["Mutton Curry", "Chicken Thali"]),
    entry("marathi", Lunch, Vegan, &["Dal Rice", "Vegetable Curry + Rice"]),
    entry("marathi", Dinner, Veg, &["Puran Poli", "Bhakri + Pitla", "Vegetable Curry + Rice"]),
    entry("marathi", Dinner, NonVeg, &["Chicken Biryani", "Fish Fry"]),
    entry("marathi", Dinner, Vegan, &["Simple Dal + Rice", "Vegetable Curry + Bhakri"]),
    entry("marathi", Snacks, Veg, &["Vada Pav", "Bhel Puri", "Kothimbir Vadi"]),
    entry("marathi", Snacks, NonVeg, &["Chicken Kothimbir Vadi"]),
    entry("marathi", Snacks, Vegan, &["Bhel Puri", "Roasted Chana"]),
    // bengali
    entry("bengali", Breakfast, Veg, &["Luchi Aloo Dum", "Poha", "Cholar Dal + Luchi"]),
    entry("bengali", Breakfast, NonVeg, &["Fish Curry + Rice", "Egg Curry + Luchi"]),
    entry("bengali", Breakfast, Vegan, &["Poha", "Aloo Dum + Rice"]),
    entry("bengali", Lunch, Veg, &["Dal Rice", "Aloo Posto", "Begun Bhaja + Rice"]),
    entry("bengali", Lunch, NonVeg, &["Fish Curry + Rice", "Chicken Curry + Rice", "Prawn Malai Curry"]),
    entry("bengali", Lunch, Vegan, &["Dal Rice", "Aloo Posto + Rice"]),
    entry("bengali", Dinner, Veg, &["Khichuri", "Mixed Vegetable + Rice"]),
    entry("bengali", Dinner, NonVeg, &["Fish Curry + Rice", "Mutton Curry + Rice"]),
    entry("bengali", Dinner, Vegan, &["Simple Khichuri", "Dal Rice"]),
    entry("bengali", Snacks, Veg, &["Jhal Muri", "Beguni", "Ghugni"]),
    entry("bengali", Snacks, NonVeg, &["Fish Fry", "Chicken Cutlet"]),
    entry("bengali", Snacks, Vegan, &["Jhal Muri", "Roasted Chana"]),
    // punjabi
    entry("punjabi", Breakfast, Veg, &["Chole Bhature", "Aloo Paratha", "Sarson da Saag + Makki Roti"]),
    entry("punjabi", Breakfast, NonVeg, &["Keema Paratha", "Egg Paratha"]),
    entry("punjabi", Breakfast, Vegan, &["Plain Paratha", "Sarson da Saag + Makki Roti"]),
    entry("punjabi", Lunch, Veg, &["Dal Makhani + Naan", "Rajma + Rice", "Palak Paneer + Roti"]),
    entry("punjabi", Lunch, NonVeg, &["Butter Chicken + Naan", "Mutton Curry + Rice"]),
    entry("punjabi", Lunch, Vegan, &["Chana Masala + Rice", "Mixed Dal + Roti"]),
    entry("punjabi", Dinner, Veg, &["Paneer Tikka Masala + Naan", "Dal Tadka + Rice"]),
    entry("punjabi", Dinner, NonVeg, &["Chicken Tikka Masala + Naan", "Lamb Curry + Rice"]),
    entry("punjabi", Dinner, Vegan, &["Mixed Vegetable + Roti", "Dal Rice"]),
    entry("punjabi", Snacks, Veg, &["Samosa", "Pakora", "Kulcha"]),
    entry("punjabi", Snacks, NonVeg, &["Chicken Tikka", "Seekh Kebab"]),
    entry("punjabi", Snacks, Vegan, &["Chana Chaat", "Fruit Chaat"]),
];

/// Substring keywords behind the balance heuristic.
#[derive(Debug, Clone, Copy)]
pub struct NutritionKeywords {
    pub high_protein: &'static [&'static str],
    pub high_fiber: &'static [&'static str],
    pub low_oil: &'static [&'static str],
    pub diabetic_friendly: &'static [&'static str],
}

pub const NUTRITION_KEYWORDS: NutritionKeywords = NutritionKeywords {
    high_protein: &["Dal", "Paneer", "Chicken", "Fish", "Egg", "Chana", "Rajma"],
    high_fiber: &["Bhindi", "Palak", "Mixed Veg", "Salad", "Gobi", "Begun"],
    low_oil: &["Steamed", "Boiled", "Grilled", "Idli", "Upma"],
    diabetic_friendly: &["Dal", "Vegetables", "Grilled items", "Salad", "Upma", "Poha"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroceryCategory {
    Vegetables,
    GrainsPulses,
    DairyProteins,
    SpicesCondiments,
    Others,
}

/// A dish keyword and the generic ingredients it implies.
#[derive(Debug, Clone, Copy)]
pub struct IngredientRule {
    pub keyword: &'static str,
    pub category: GroceryCategory,
    pub items: &'static [&'static str],
}

const fn rule(
    keyword: &'static str,
    category: GroceryCategory,
    items: &'static [&'static str],
) -> IngredientRule {
    IngredientRule { keyword, category, items }
}

pub const INGREDIENT_RULES: &[IngredientRule] = &[
    rule("Dal", GroceryCategory::GrainsPulses, &["Toor Dal", "Moong Dal", "Masoor Dal"]),
    rule("Paneer", GroceryCategory::DairyProteins, &["Paneer", "Milk"]),
    rule("Chicken", GroceryCategory::DairyProteins, &["Chicken"]),
    rule("Rice", GroceryCategory::GrainsPulses, &["Basmati Rice"]),
    rule("Roti", GroceryCategory::GrainsPulses, &["Wheat Flour"]),
    rule("Bhindi", GroceryCategory::Vegetables, &["Bhindi (Okra)"]),
    rule("Aloo", GroceryCategory::Vegetables, &["Potatoes"]),
    rule("Palak", GroceryCategory::Vegetables, &["Spinach"]),
    rule("Gobi", GroceryCategory::Vegetables, &["Cauliflower"]),
    rule("Fish", GroceryCategory::DairyProteins, &["Fresh Fish"]),
    rule("Egg", GroceryCategory::DairyProteins, &["Eggs"]),
    rule("Chole", GroceryCategory::GrainsPulses, &["Chickpeas"]),
    rule("Rajma", GroceryCategory::GrainsPulses, &["Kidney Beans"]),
];

pub struct Catalog {
    index: HashMap<&'static str, HashMap<(MealSlot, DietType), &'static [&'static str]>>,
    cuisines: Vec<&'static str>,
    keywords: NutritionKeywords,
    ingredients: &'static [IngredientRule],
}

impl Catalog {
    pub fn new(
        entries: &'static [CatalogEntry],
        keywords: NutritionKeywords,
        ingredients: &'static [IngredientRule],
    ) -> Self {
        let mut index: HashMap<&'static str, HashMap<_, _>> = HashMap::new();
        let mut cuisines: Vec<&'static str> = Vec::new();
        for e in entries {
            index
                .entry(e.cuisine)
                .or_default()
                .insert((e.slot, e.diet), e.dishes);
            if !cuisines.contains(&e.cuisine) {
                cuisines.push(e.cuisine);
            }
        }
        Self { index, cuisines, keywords, ingredients }
    }

    pub fn builtin() -> Self {
        Self::new(DISHES, NUTRITION_KEYWORDS, INGREDIENT_RULES)
    }

    /// Dishes for one combination; empty on a miss.
    pub fn dishes(&self, cuisine: &str, slot: MealSlot, diet: DietType) -> &'static [&'static str] {
        self.index
            .get(cuisine)
            .and_then(|by_slot| by_slot.get(&(slot, diet)))
            .copied()
            .unwrap_or(&[])
    }

    pub fn cuisines(&self) -> &[&'static str] {
        &self.cuisines
    }

    pub fn keywords(&self) -> &NutritionKeywords {
        &self.keywords
    }

    pub fn ingredients(&self) -> &'static [IngredientRule] {
        self.ingredients
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_hits_and_misses() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.dishes("north_indian", Breakfast, Veg).len(), 6);
        assert!(catalog.dishes("gujarati", Lunch, NonVeg).is_empty());
        assert!(catalog.dishes("rajasthani", Lunch, Veg).is_empty());
    }

    #[test]
    fn cuisines_keep_table_order() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.cuisines(),
            ["north_indian", "south_indian", "gujarati", "marathi", "bengali", "punjabi"]
        );
    }
}
