use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::menu::{Day, MenuGrid};
use crate::models::preference::{DietType, MealPreferences, MealSlot};

use super::catalog::Catalog;

/// Cell value used when no cuisine has an unused dish left.
pub fn placeholder_dish(slot: MealSlot, diet: DietType) -> String {
    format!("Simple {} ({})", slot.title(), diet)
}

/// First cuisine (in order) with an unused match wins; a random unused dish from it is returned.
/// `used` holds lower-cased dish names.
pub fn pick_unused<R: Rng + ?Sized>(
    catalog: &Catalog,
    cuisines: &[String],
    slot: MealSlot,
    diet: DietType,
    used: &HashSet<String>,
    rng: &mut R,
) -> Option<String> {
    cuisines.iter().find_map(|cuisine| {
        let available: Vec<&str> = catalog
            .dishes(cuisine, slot, diet)
            .iter()
            .copied()
            .filter(|d| !used.contains(&d.to_lowercase()))
            .collect();
        available.choose(rng).map(|d| d.to_string())
    })
}

/// Builds a complete week from the catalog alone. Catalog dishes never repeat
/// within the week; placeholders may.
pub fn fallback_menu<R: Rng + ?Sized>(
    catalog: &Catalog,
    prefs: &MealPreferences,
    rng: &mut R,
) -> MenuGrid {
    let mut menu = MenuGrid::new();
    let mut used: HashSet<String> = HashSet::new();

    for day in Day::WEEK {
        menu.add_day(day);
        for slot in &prefs.meals {
            let dish = match pick_unused(catalog, &prefs.cuisine, *slot, prefs.diet_type, &used, rng) {
                Some(dish) => {
                    used.insert(dish.to_lowercase());
                    dish
                }
                None => placeholder_dish(*slot, prefs.diet_type),
            };
            menu.set(day, *slot, dish);
        }
    }

    menu
}
