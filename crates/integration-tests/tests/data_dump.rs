//! Whole-database export and import.

use chrono::Utc;
use rich_habits_integration_tests::test_database_url;
use rich_habits_server::db::dump::{self, DataDump, DumpError, TABLES, TableDump};
use rich_habits_server::db::permissions::PermissionRepository;
use rich_habits_server::db::{MIGRATOR, create_pool};
use sqlx::PgPool;
use uuid::Uuid;
use serde_json::json;

#[test]
fn test_tables_are_in_dependency_order() {
    let position = |name: &str| TABLES.iter().position(|t| *t == name);

    assert!(position("users") < position("leads"));
    assert!(position("organizations") < position("contacts"));
    assert!(position("orders") < position("order_line_items"));
    assert!(position("orders") < position("design_jobs"));
    assert!(position("manufacturing") < position("manufacturing_updates"));
    assert_eq!(TABLES.last(), Some(&"status_remap_log"));
}

#[test]
fn test_dump_survives_json() {
    let dump = DataDump {
        exported_at: Utc::now(),
        tables: vec![TableDump {
            name: "users".to_string(),
            rows: vec![json!({"id": 1, "email": "ann@example.com", "role": "admin"})],
        }],
    };

    let text = serde_json::to_string(&dump).expect("serialize");
    let parsed: DataDump = serde_json::from_str(&text).expect("parse");

    assert_eq!(parsed, dump);
    assert_eq!(parsed.row_counts(), vec![("users", 1)]);
}

#[test]
fn test_duplicate_table_is_rejected() {
    let table = TableDump {
        name: "leads".to_string(),
        rows: vec![],
    };
    let dump = DataDump {
        exported_at: Utc::now(),
        tables: vec![table.clone(), table],
    };

    assert!(matches!(dump.validate(), Err(DumpError::DuplicateTable(name)) if name == "leads"));
}

async fn seed_business_rows(pool: &PgPool) {
    let suffix = Uuid::new_v4().simple().to_string();
    let user_id: i32 = sqlx::query_scalar(
        "INSERT INTO users (email, name, role) VALUES ($1, 'Sam', 'sales') RETURNING id",
    )
    .bind(format!("sam-{suffix}@example.com"))
    .fetch_one(pool)
    .await
    .expect("insert user");
    let organization_id: i32 =
        sqlx::query_scalar("INSERT INTO organizations (name) VALUES ('Westside HS') RETURNING id")
            .fetch_one(pool)
            .await
            .expect("insert organization");
    let lead_id: i32 = sqlx::query_scalar(
        "INSERT INTO leads (organization_id, owner_user_id, stage) \
         VALUES ($1, $2, 'hot_lead') RETURNING id",
    )
    .bind(organization_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
    .expect("insert lead");
    sqlx::query(
        "INSERT INTO orders (order_code, organization_id, lead_id, salesperson_id) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(format!("RH-{suffix}"))
    .bind(organization_id)
    .bind(lead_id)
    .bind(user_id)
    .execute(pool)
    .await
    .expect("insert order");
}

#[tokio::test]
#[ignore = "Requires RH_TEST_DATABASE_URL pointing at a disposable database"]
async fn test_export_import_preserves_row_counts() {
    let Some(url) = test_database_url() else {
        return;
    };
    let pool = create_pool(&url).await.expect("connect");
    MIGRATOR.run(&pool).await.expect("migrate");
    PermissionRepository::new(&pool)
        .seed_static()
        .await
        .expect("seed permissions");
    seed_business_rows(&pool).await;

    let exported = dump::export(&pool).await.expect("export");
    let counts = exported.row_counts();
    for table in [
        "roles",
        "resources",
        "role_permissions",
        "users",
        "organizations",
        "leads",
        "orders",
    ] {
        let rows = counts.iter().find(|(name, _)| *name == table).map(|(_, n)| *n);
        assert!(rows.is_some_and(|n| n > 0), "{table} was exported empty");
    }

    let imported = dump::import(&pool, &exported).await.expect("import");
    for (table, rows) in &counts {
        let inserted = imported
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, n)| *n);
        assert_eq!(inserted, u64::try_from(*rows).ok(), "{table}");
    }

    let reexported = dump::export(&pool).await.expect("re-export");
    assert_eq!(reexported.row_counts(), counts);
}
