//! Persistence tests against a real PostgreSQL server.
//!
//! They run only when `TEST_DATABASE_URL` points at a server the tests may create
//! databases on; otherwise each test returns early. Every test works in its own
//! temporary database and drops it afterwards.

use chrono::Utc;
use reqwest::Url;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use uuid::Uuid;

use rasoi_genie_api::db;
use rasoi_genie_api::models::menu::{Day, MenuGrid};
use rasoi_genie_api::models::preference::{MealPreferences, MealSlot};
use rasoi_genie_api::models::user::RegisterRequest;
use rasoi_genie_api::services::auth::{AuthError, AuthService};
use rasoi_genie_api::services::menu::MenuService;

struct TempDb {
    pool: PgPool,
    admin: PgPool,
    name: String,
}

impl TempDb {
    async fn create() -> Option<Self> {
        let base = std::env::var("TEST_DATABASE_URL").ok()?;
        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&base)
            .await
            .expect("connect to TEST_DATABASE_URL");

        let name = format!("rasoi_test_{}", Uuid::new_v4().simple());
        admin
            .execute(format!("CREATE DATABASE {name}").as_str())
            .await
            .expect("create temp database");

        let mut url = Url::parse(&base).expect("valid TEST_DATABASE_URL");
        url.set_path(&format!("/{name}"));
        let pool = db::create_pool(url.as_str()).await.expect("connect to temp database");
        db::run_migrations(&pool).await.expect("migrations");

        Some(Self { pool, admin, name })
    }

    async fn cleanup(self) {
        self.pool.close().await;
        let _ = self
            .admin
            .execute(format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", self.name).as_str())
            .await;
        self.admin.close().await;
    }
}

fn register_request(username: &str, email: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.into(),
        email: email.into(),
        password: "tadka123".into(),
    }
}

fn one_slot_week(dish: &str) -> MenuGrid {
    let mut menu = MenuGrid::new();
    for day in Day::WEEK {
        menu.set(day, MealSlot::Lunch, dish);
    }
    menu
}

#[tokio::test]
async fn concurrent_saves_leave_exactly_one_active_menu() {
    let Some(db) = TempDb::create().await else {
        return;
    };
    let user = AuthService::register(&db.pool, &register_request("meera", "meera@example.com"))
        .await
        .unwrap();
    let user_id = user.id;
    let prefs = MealPreferences::default();

    let saves = (0..4).map(|i| {
        let pool = db.pool.clone();
        let prefs = prefs.clone();
        tokio::spawn(async move {
            MenuService::save_active(&pool, user_id, &one_slot_week(&format!("Dal {i}")), &prefs, true, Utc::now())
                .await
        })
    });
    for save in saves.collect::<Vec<_>>() {
        save.await.unwrap().expect("every save succeeds");
    }

    let active: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM weekly_menus WHERE user_id = $1 AND is_active")
            .bind(user_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(active, 1);
    assert_eq!(MenuService::history(&db.pool, user_id, 10).await.unwrap().len(), 4);

    db.cleanup().await;
}

#[tokio::test]
async fn racing_registrations_report_the_duplicate() {
    let Some(db) = TempDb::create().await else {
        return;
    };

    let first = register_request("ravi", "ravi@example.com");
    let second = register_request("ravi", "ravi2@example.com");
    let (a, b) = tokio::join!(
        AuthService::register(&db.pool, &first),
        AuthService::register(&db.pool, &second),
    );

    let errors: Vec<anyhow::Error> = [a.err(), b.err()].into_iter().flatten().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].downcast_ref::<AuthError>(), Some(&AuthError::UsernameTaken));

    db.cleanup().await;
}
