use serde_json::{Map, Value};

use crate::models::menu::{Day, GridError, MenuGrid};
use crate::models::preference::MealSlot;

#[derive(Debug, thiserror::Error)]
pub enum MenuParseError {
    #[error("no JSON object found in the answer")]
    NoJsonObject,
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{day} {slot} is not a dish name")]
    NotADish { day: Day, slot: MealSlot },
    #[error("incomplete menu: {0}")]
    Incomplete(#[from] GridError),
}

/// Returns the first top-level `{...}` span, balancing braces outside of JSON strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses a free-text agent answer into a grid holding exactly `slots` on each day.
///
/// Day and slot keys match case-insensitively. Keys that are neither days nor
/// requested slots (analysis notes, extra meals) are ignored; a wrapping
/// `{"menu": {...}}` object is unwrapped.
pub fn parse_menu(text: &str, slots: &[MealSlot]) -> Result<MenuGrid, MenuParseError> {
    let span = extract_json_object(text).ok_or(MenuParseError::NoJsonObject)?;
    let value: Value = serde_json::from_str(span)?;

    let Value::Object(root) = value else {
        return Err(MenuParseError::NoJsonObject);
    };
    let days = unwrap_menu(root);

    let mut grid = MenuGrid::new();
    for (key, meals) in &days {
        let Ok(day) = key.parse::<Day>() else {
            continue;
        };
        let Value::Object(meals) = meals else {
            continue;
        };
        for slot in slots {
            let dish = meals
                .iter()
                .find(|(k, _)| k.parse::<MealSlot>().ok() == Some(*slot))
                .map(|(_, v)| v);
            match dish {
                Some(Value::String(s)) => grid.set(day, *slot, s.trim()),
                Some(_) => return Err(MenuParseError::NotADish { day, slot: *slot }),
                None => {}
            }
        }
    }

    grid.check_complete(slots)?;
    Ok(grid)
}

fn unwrap_menu(root: Map<String, Value>) -> Map<String, Value> {
    let has_days = root.keys().any(|k| k.parse::<Day>().is_ok());
    if has_days {
        return root;
    }
    let nested = root
        .iter()
        .find(|(k, v)| k.eq_ignore_ascii_case("menu") && v.is_object())
        .map(|(_, v)| v.clone());
    match nested {
        Some(Value::Object(inner)) => inner,
        _ => root,
    }
}
