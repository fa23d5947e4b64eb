use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{
    menu::{Day, MenuGrid, WeeklyMenu},
    preference::{MealPreferences, MealSlot},
};

const MENU_COLUMNS: &str =
    "id, user_id, menu_data, generation_prompt, fallback_used, created_at, is_active";

pub const DEFAULT_HISTORY_LIMIT: i64 = 10;
pub const MAX_HISTORY_LIMIT: i64 = 50;

/// Clamp a requested history size into 1..=MAX_HISTORY_LIMIT.
pub fn history_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

pub struct MenuService;

impl MenuService {
    /// Store a new menu as the user's only active one. Deactivation and insert share a transaction.
    pub async fn save_active(
        pool: &PgPool,
        user_id: Uuid,
        menu: &MenuGrid,
        preferences_used: &MealPreferences,
        fallback_used: bool,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<WeeklyMenu> {
        let mut tx = pool.begin().await?;
        Self::deactivate_all(&mut tx, user_id).await?;

        let saved = sqlx::query_as::<_, WeeklyMenu>(&format!(
            r#"INSERT INTO weekly_menus (id, user_id, menu_data, generation_prompt, fallback_used, created_at, is_active)
               VALUES ($1, $2, $3, $4, $5, $6, TRUE)
               RETURNING {MENU_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(Json(menu))
        .bind(Json(preferences_used))
        .bind(fallback_used)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(
            "Saved menu {} for user {} (fallback: {})",
            saved.id,
            user_id,
            fallback_used
        );
        Ok(saved)
    }

    pub async fn current(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<WeeklyMenu>> {
        let menu = sqlx::query_as::<_, WeeklyMenu>(&format!(
            "SELECT {MENU_COLUMNS} FROM weekly_menus WHERE user_id = $1 AND is_active = TRUE"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(menu)
    }

    /// A menu owned by `user_id`; another user's menu reads as missing.
    pub async fn find(pool: &PgPool, user_id: Uuid, menu_id: Uuid) -> anyhow::Result<Option<WeeklyMenu>> {
        let menu = sqlx::query_as::<_, WeeklyMenu>(&format!(
            "SELECT {MENU_COLUMNS} FROM weekly_menus WHERE id = $1 AND user_id = $2"
        ))
        .bind(menu_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(menu)
    }

    /// Newest first.
    pub async fn history(pool: &PgPool, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<WeeklyMenu>> {
        let menus = sqlx::query_as::<_, WeeklyMenu>(&format!(
            r#"SELECT {MENU_COLUMNS} FROM weekly_menus
               WHERE user_id = $1
               ORDER BY created_at DESC, id DESC
               LIMIT $2"#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(menus)
    }

    /// Set one cell. The row is locked so concurrent edits of the same menu serialize.
    pub async fn replace_dish(
        pool: &PgPool,
        user_id: Uuid,
        menu_id: Uuid,
        day: Day,
        slot: MealSlot,
        dish: &str,
    ) -> anyhow::Result<Option<WeeklyMenu>> {
        let mut tx = pool.begin().await?;
        let Some(mut menu) = sqlx::query_as::<_, WeeklyMenu>(&format!(
            "SELECT {MENU_COLUMNS} FROM weekly_menus WHERE id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(menu_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        menu.menu_data.0.set(day, slot, dish);
        sqlx::query("UPDATE weekly_menus SET menu_data = $1 WHERE id = $2")
            .bind(&menu.menu_data)
            .bind(menu.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(menu))
    }

    /// Make a stored menu the active one. Returns None when the menu is not the user's.
    pub async fn activate(pool: &PgPool, user_id: Uuid, menu_id: Uuid) -> anyhow::Result<Option<WeeklyMenu>> {
        let mut tx = pool.begin().await?;
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM weekly_menus WHERE id = $1 AND user_id = $2)",
        )
        .bind(menu_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if !owned {
            return Ok(None);
        }

        Self::deactivate_all(&mut tx, user_id).await?;
        let menu = sqlx::query_as::<_, WeeklyMenu>(&format!(
            "UPDATE weekly_menus SET is_active = TRUE WHERE id = $1 RETURNING {MENU_COLUMNS}"
        ))
        .bind(menu_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(menu))
    }

    /// Locks the user's row first so concurrent activations for one user run one
    /// after the other instead of colliding on the one-active-menu index.
    async fn deactivate_all(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("UPDATE weekly_menus SET is_active = FALSE WHERE user_id = $1 AND is_active = TRUE")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
