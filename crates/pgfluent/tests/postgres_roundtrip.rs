//! Round trips against a live PostgreSQL server.
//!
//! Each test skips when `DATABASE_URL` is not set.

use pgfluent::prelude::*;
use tokio_postgres::NoTls;

const CREATE_MEMBERS: &str = "CREATE TEMPORARY TABLE members (
    id BIGSERIAL PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT,
    visits INT NOT NULL DEFAULT 0,
    balance NUMERIC(10, 2) NOT NULL DEFAULT 0
)";

fn database_url(test: &str) -> Option<String> {
    dotenvy::dotenv().ok();
    match std::env::var("DATABASE_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            None
        }
    }
}

async fn open(url: String) -> DbResult<Database<tokio_postgres::Client>> {
    let db = pgfluent::connect(&DatabaseConfig::new().with_url(url)).await?;
    db.client().batch_execute(CREATE_MEMBERS).await?;
    Ok(db)
}

#[tokio::test]
async fn inserted_rows_are_visible() -> DbResult<()> {
    let Some(url) = database_url("inserted_rows_are_visible") else {
        return Ok(());
    };
    let db = open(url).await?;

    let keys = db
        .table("members")
        .insert_many([
            record! { "email" => "alice@example.com", "name" => "Alice" },
            record! { "email" => "bob@example.com", "name" => "Bob" },
        ])
        .await?;
    assert_eq!(keys.len(), 2);

    let alice: Option<Record> = db.table("members").find(keys[0].clone()).await?;
    let alice = alice.expect("inserted row");
    assert_eq!(alice["name"], Value::from("Alice"));
    assert_eq!(alice["visits"], Value::Int(0));

    let names: Vec<String> = db.table("members").pluck("name").await?;
    assert_eq!(names.len(), 2);
    assert_eq!(db.table("members").count("*").await?, 2);
    Ok(())
}

#[tokio::test]
async fn numeric_columns_store_exact_values() -> DbResult<()> {
    let Some(url) = database_url("numeric_columns_store_exact_values") else {
        return Ok(());
    };
    let db = open(url).await?;

    db.table("members")
        .insert_many([
            record! { "email" => "int@example.com", "balance" => 5 },
            record! { "email" => "text@example.com", "balance" => "12.50" },
            record! { "email" => "float@example.com", "balance" => 0.25 },
        ])
        .await?;

    let rows: Vec<Record> = db
        .table("members")
        .select(["email", "balance"])
        .where_eq("balance", 5)
        .get()
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["email"], Value::from("int@example.com"));
    assert_eq!(rows[0]["balance"], Value::from("5.00"));

    let balance: Option<Value> = db
        .table("members")
        .where_eq("email", "text@example.com")
        .value("balance")
        .await?;
    assert_eq!(balance, Some(Value::from("12.50")));

    let err = db
        .table("members")
        .where_eq("balance", true)
        .delete()
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Query(_)));
    assert_eq!(db.table("members").count("*").await?, 3);
    Ok(())
}

#[tokio::test]
async fn failing_row_rolls_back_the_whole_batch() -> DbResult<()> {
    let Some(url) = database_url("failing_row_rolls_back_the_whole_batch") else {
        return Ok(());
    };
    let db = open(url).await?;

    let err = db
        .table("members")
        .insert_many([
            record! { "email" => "a@example.com" },
            record! { "email" => "b@example.com" },
            record! { "email" => "a@example.com" },
        ])
        .await
        .unwrap_err();

    assert!(err.is_unique_violation());
    assert_eq!(err.completed_rows(), Some(2));
    assert_eq!(db.table("members").count("*").await?, 0);

    let failed = db.queries().into_iter().filter(|e| e.error.is_some()).count();
    assert_eq!(failed, 1);
    Ok(())
}

#[tokio::test]
async fn update_increment_and_delete() -> DbResult<()> {
    let Some(url) = database_url("update_increment_and_delete") else {
        return Ok(());
    };
    let db = open(url).await?;

    db.table("members")
        .insert(record! { "email" => "carol@example.com", "name" => "carol" })
        .await?;

    let updated = db
        .table("members")
        .where_eq("email", "carol@example.com")
        .update(record! { "name" => "Carol" })
        .await?;
    assert_eq!(updated, 1);

    db.table("members")
        .where_eq("email", "carol@example.com")
        .increment("visits", 3, Record::new())
        .await?;
    db.table("members")
        .where_eq("email", "carol@example.com")
        .decrement("visits", 1, Record::new())
        .await?;

    let visits: Option<i32> = db
        .table("members")
        .where_eq("email", "carol@example.com")
        .value("visits")
        .await?;
    assert_eq!(visits, Some(2));

    let name: Option<Option<String>> = db
        .table("members")
        .where_eq("email", "carol@example.com")
        .value("name")
        .await?;
    assert_eq!(name, Some(Some("Carol".to_string())));

    let deleted = db.table("members").where_literal("1=1").delete().await?;
    assert_eq!(deleted, 1);
    Ok(())
}

#[tokio::test]
async fn upsert_updates_by_key() -> DbResult<()> {
    let Some(url) = database_url("upsert_updates_by_key") else {
        return Ok(());
    };
    let db = open(url).await?;

    db.table("members")
        .insert_many([
            record! { "email" => "d@example.com", "name" => "d" },
            record! { "email" => "e@example.com", "name" => "e" },
        ])
        .await?;

    let affected = db
        .table("members")
        .upsert(
            [
                record! { "email" => "d@example.com", "name" => "Dee" },
                record! { "email" => "e@example.com", "name" => "Eve" },
                record! { "email" => "missing@example.com", "name" => "nobody" },
            ],
            &["email"],
            None,
        )
        .await?;
    assert_eq!(affected, 2);

    let names: std::collections::BTreeMap<String, String> =
        db.table("members").pluck_keyed("name", "email").await?;
    assert_eq!(names.get("d@example.com").map(String::as_str), Some("Dee"));
    assert_eq!(names.get("e@example.com").map(String::as_str), Some("Eve"));
    Ok(())
}

#[tokio::test]
async fn batches_nest_as_savepoints_inside_a_transaction() -> DbResult<()> {
    let Some(url) = database_url("batches_nest_as_savepoints_inside_a_transaction") else {
        return Ok(());
    };

    let (mut client, connection) = tokio_postgres::connect(&url, NoTls).await?;
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client.batch_execute(CREATE_MEMBERS).await?;

    let tx = client.transaction().await?;
    let db = Database::new(tx, DatabaseConfig::new());

    db.table("members")
        .insert(record! { "email" => "kept@example.com" })
        .await?;
    let err = db
        .table("members")
        .insert_many([
            record! { "email" => "new@example.com" },
            record! { "email" => "kept@example.com" },
        ])
        .await
        .unwrap_err();
    assert_eq!(err.completed_rows(), Some(1));

    let emails: Vec<String> = db.table("members").pluck("email").await?;
    assert_eq!(emails, ["kept@example.com"]);

    db.into_inner().commit().await?;
    Ok(())
}
