use sqlx::PgPool;
use uuid::Uuid;

use crate::models::preference::{MealPreferences, PreferenceRow};

pub struct PreferenceService;

impl PreferenceService {
    pub async fn get(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<MealPreferences>> {
        let row = sqlx::query_as::<_, PreferenceRow>(
            r#"SELECT user_id, diet_type, cuisine, meals, cooking_time, health_conditions, updated_at
               FROM preferences
               WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(MealPreferences::from))
    }

    /// Insert or replace the user's single preference record. Returns the normalized form.
    pub async fn upsert(
        pool: &PgPool,
        user_id: Uuid,
        prefs: MealPreferences,
    ) -> anyhow::Result<MealPreferences> {
        let prefs = prefs.normalized();
        let meals: Vec<&str> = prefs.meals.iter().map(|m| m.as_str()).collect();

        let row = sqlx::query_as::<_, PreferenceRow>(
            r#"INSERT INTO preferences (user_id, diet_type, cuisine, meals, cooking_time, health_conditions)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (user_id) DO UPDATE SET
                   diet_type = EXCLUDED.diet_type,
                   cuisine = EXCLUDED.cuisine,
                   meals = EXCLUDED.meals,
                   cooking_time = EXCLUDED.cooking_time,
                   health_conditions = EXCLUDED.health_conditions,
                   updated_at = NOW()
               RETURNING user_id, diet_type, cuisine, meals, cooking_time, health_conditions, updated_at"#,
        )
        .bind(user_id)
        .bind(prefs.diet_type.as_str())
        .bind(&prefs.cuisine)
        .bind(&meals)
        .bind(&prefs.cooking_time)
        .bind(&prefs.health_conditions)
        .fetch_one(pool)
        .await?;

        tracing::debug!("Saved preferences for user {}", user_id);
        Ok(row.into())
    }
}
