//! Integration tests against a real MySQL server.
//!
//! Set TEST_MYSQL_HOST to run them; TEST_MYSQL_PORT, TEST_MYSQL_USER,
//! TEST_MYSQL_PASSWORD and TEST_MYSQL_DATABASE default to 3306, root, root
//! and test.
//! Example: TEST_MYSQL_HOST=127.0.0.1 TEST_MYSQL_PASSWORD=secret cargo test --test mysql_live_test

use mysql_mcp_server::ActionDispatcher;
use mysql_mcp_server::db::{MySqlConnector, SessionRegistry};
use mysql_mcp_server::models::{ConnectionConfig, Request, Response};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

fn live_config() -> Option<ConnectionConfig> {
    let host = match std::env::var("TEST_MYSQL_HOST") {
        Ok(host) => host,
        Err(_) => {
            eprintln!("Skipping test: TEST_MYSQL_HOST not set");
            return None;
        }
    };
    let port = std::env::var("TEST_MYSQL_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3306);
    let user = std::env::var("TEST_MYSQL_USER").unwrap_or_else(|_| "root".to_string());
    let password = std::env::var("TEST_MYSQL_PASSWORD").unwrap_or_else(|_| "root".to_string());
    let database = std::env::var("TEST_MYSQL_DATABASE").unwrap_or_else(|_| "test".to_string());

    Some(
        ConnectionConfig::new(host, user, password)
            .with_port(port)
            .with_database(database),
    )
}

fn live_dispatcher() -> ActionDispatcher<MySqlConnector> {
    let registry = Arc::new(SessionRegistry::new(MySqlConnector::default()));
    ActionDispatcher::new(registry)
}

async fn run(
    dispatcher: &ActionDispatcher<MySqlConnector>,
    config: &ConnectionConfig,
    session_id: Option<&str>,
    sql: &str,
) -> Response {
    let mut request = Request::new(config.clone(), "execute_query").with_parameter("query", sql);
    if let Some(id) = session_id {
        request = request.with_session(id);
    }
    dispatcher.handle(request).await
}

async fn open_session(dispatcher: &ActionDispatcher<MySqlConnector>, config: &ConnectionConfig) -> String {
    let response = dispatcher
        .handle(Request::new(config.clone(), "test_connection"))
        .await;
    assert!(response.success, "test_connection failed: {:?}", response.error);
    let data = response.data.unwrap();
    assert_eq!(data["connected"], true);
    assert!(data["server_version"].as_str().is_some());
    data["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_live_select_and_types() {
    let Some(config) = live_config() else { return };
    let dispatcher = live_dispatcher();

    let response = dispatcher
        .handle(
            Request::new(config.clone(), "execute_query")
                .with_parameter(
                    "query",
                    "SELECT 1 AS x, CAST(2.50 AS DECIMAL(5,2)) AS price, NULL AS nothing, ? AS echoed",
                )
                .with_parameter("params", json!(["héllo"])),
        )
        .await;

    assert!(response.success, "{:?}", response.error);
    let row = &response.data.unwrap()[0];
    assert_eq!(row["x"], 1);
    assert_eq!(row["price"], "2.50");
    assert_eq!(row["nothing"], JsonValue::Null);
    assert_eq!(row["echoed"], "héllo");
    assert_eq!(dispatcher.registry().count().await, 0);
}

#[tokio::test]
async fn test_live_syntax_error_code() {
    let Some(config) = live_config() else { return };
    let dispatcher = live_dispatcher();

    let response = run(&dispatcher, &config, None, "SELEC 1").await;
    assert_eq!(response.error_code(), Some("MYSQL-1064"));
    assert!(response.metadata.is_some());
}

#[tokio::test]
async fn test_live_rollback_discards_insert() {
    let Some(config) = live_config() else { return };
    let dispatcher = live_dispatcher();
    let session = open_session(&dispatcher, &config).await;

    let created = run(
        &dispatcher,
        &config,
        Some(&session),
        "CREATE TABLE IF NOT EXISTS live_tx_test (id INT PRIMARY KEY, name VARCHAR(100))",
    )
    .await;
    assert!(created.success, "{:?}", created.error);
    let _ = run(&dispatcher, &config, Some(&session), "DELETE FROM live_tx_test").await;

    let begin = dispatcher
        .handle(
            Request::new(config.clone(), "transaction")
                .with_session(&session)
                .with_parameter("operation", "begin")
                .with_parameter("isolation_level", "READ COMMITTED"),
        )
        .await;
    assert!(begin.success, "{:?}", begin.error);

    let status = dispatcher
        .handle(Request::new(config.clone(), "get_transaction_status").with_session(&session))
        .await;
    let status = status.data.unwrap();
    assert_eq!(status["in_transaction"], true);

    let insert = run(
        &dispatcher,
        &config,
        Some(&session),
        "INSERT INTO live_tx_test (id, name) VALUES (1, 'kept?')",
    )
    .await;
    assert_eq!(insert.data, Some(json!(1)));

    let rollback = dispatcher
        .handle(
            Request::new(config.clone(), "transaction")
                .with_session(&session)
                .with_parameter("operation", "rollback"),
        )
        .await;
    assert!(rollback.success, "{:?}", rollback.error);

    // A different connection must not see the row
    let check = run(&dispatcher, &config, None, "SELECT COUNT(*) AS n FROM live_tx_test").await;
    assert_eq!(check.data.unwrap()[0]["n"], 0);

    let _ = run(&dispatcher, &config, Some(&session), "DROP TABLE live_tx_test").await;
    dispatcher.registry().close_all().await;
}

#[tokio::test]
async fn test_live_schema_and_relationships() {
    let Some(config) = live_config() else { return };
    let dispatcher = live_dispatcher();
    let session = open_session(&dispatcher, &config).await;

    for sql in [
        "DROP TABLE IF EXISTS live_rel_orders",
        "DROP TABLE IF EXISTS live_rel_customers",
        "CREATE TABLE live_rel_customers (id INT PRIMARY KEY, name VARCHAR(50))",
        "CREATE TABLE live_rel_orders (id INT PRIMARY KEY, customer_id INT, \
         live_rel_customers_id INT, \
         CONSTRAINT fk_live_customer FOREIGN KEY (customer_id) REFERENCES live_rel_customers(id))",
    ] {
        let response = run(&dispatcher, &config, Some(&session), sql).await;
        assert!(response.success, "{}: {:?}", sql, response.error);
    }

    let tables = json!(["live_rel_customers", "live_rel_orders"]);

    let schema = dispatcher
        .handle(
            Request::new(config.clone(), "get_schema")
                .with_session(&session)
                .with_parameter("detail_level", "complete")
                .with_parameter("tables", tables.clone()),
        )
        .await;
    assert!(schema.success, "{:?}", schema.error);
    let schema = schema.data.unwrap();
    assert_eq!(schema["tables"].as_object().unwrap().len(), 2);
    let orders = &schema["tables"]["live_rel_orders"];
    assert_eq!(orders["columns"].as_array().unwrap().len(), 3);
    assert_eq!(orders["foreign_keys"][0]["name"], "fk_live_customer");
    assert!(
        orders["create_statement"]
            .as_str()
            .unwrap()
            .contains("CREATE TABLE")
    );

    let relationships = dispatcher
        .handle(
            Request::new(config.clone(), "find_relationships")
                .with_session(&session)
                .with_parameter("tables", tables),
        )
        .await;
    assert!(relationships.success, "{:?}", relationships.error);
    let data = relationships.data.unwrap();
    assert_eq!(data["explicit"].as_array().unwrap().len(), 1);

    // customer_id is covered by the foreign key, so only the unconstrained column is inferred
    let implicit = data["implicit"].as_array().unwrap();
    assert_eq!(implicit.len(), 1);
    assert_eq!(implicit[0]["source_column"], "live_rel_customers_id");
    assert_eq!(implicit[0]["target_table"], "live_rel_customers");

    for sql in [
        "DROP TABLE IF EXISTS live_rel_orders",
        "DROP TABLE IF EXISTS live_rel_customers",
    ] {
        let _ = run(&dispatcher, &config, Some(&session), sql).await;
    }
    dispatcher.registry().close_all().await;
}
