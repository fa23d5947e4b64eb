use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge, register_gauge_vec, CounterVec, Gauge, GaugeVec};
use sqlx::PgPool;
use tracing::{info, warn};

lazy_static! {
    // ── Event counters (increment on each event) ────────────────────────────
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by status",
        &["status"]
    ).unwrap();

    pub static ref MENU_GENERATIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_menu_generations_total",
        "Weekly menus generated, by provenance (agent or fallback)",
        &["source"]
    ).unwrap();

    pub static ref FALLBACKS_COUNTER: CounterVec = register_counter_vec!(
        "api_planner_fallbacks_total",
        "Planner fallbacks by reason",
        &["reason"]
    ).unwrap();

    pub static ref AGENT_TOOL_CALLS_COUNTER: CounterVec = register_counter_vec!(
        "api_agent_tool_calls_total",
        "Agent tool calls by action and outcome",
        &["action", "outcome"]
    ).unwrap();

    pub static ref MEAL_REGENERATIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_meal_regenerations_total",
        "Single-meal regenerations by provenance",
        &["source"]
    ).unwrap();

    // ── Business metrics ────────────────────────────────────────────────────
    pub static ref USERS_GAUGE: Gauge = register_gauge!(
        "rasoi_users_total",
        "Registered users"
    ).unwrap();

    pub static ref MENUS_GAUGE: GaugeVec = register_gauge_vec!(
        "rasoi_menus_total",
        "Stored weekly menus by state (active or archived)",
        &["state"]
    ).unwrap();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        if let Err(e) = collect(&pool).await {
            warn!("Metrics: initial collection failed: {}", e);
        }
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
        }
    });
}

async fn collect(pool: &PgPool) -> anyhow::Result<()> {
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM users")
        .fetch_one(pool)
        .await?;
    USERS_GAUGE.set(users as f64);

    let menus: Vec<(bool, i64)> = sqlx::query_as(
        "SELECT is_active, COUNT(*)::BIGINT FROM weekly_menus GROUP BY is_active",
    )
    .fetch_all(pool)
    .await?;

    MENUS_GAUGE.with_label_values(&["active"]).set(0.0);
    MENUS_GAUGE.with_label_values(&["archived"]).set(0.0);
    for (is_active, count) in menus {
        let state = if is_active { "active" } else { "archived" };
        MENUS_GAUGE.with_label_values(&[state]).set(count as f64);
    }

    info!("Metrics: collected ({} users)", users);
    Ok(())
}
