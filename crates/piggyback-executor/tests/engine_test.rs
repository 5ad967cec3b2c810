//! Engine tests over CSV tables

use piggyback_common::StatsConfig;
use piggyback_executor::{ExecutionEngine, Value};
use piggyback_stats::{CollectingSink, NullObserver, PiggybackSession};
use std::path::Path;
use tempfile::TempDir;

fn write_csv(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn engine(dir: &TempDir) -> ExecutionEngine {
    let orders = write_csv(
        dir.path(),
        "orders.csv",
        "order_id,customer,amount,region\n\
         1,ann,10.50,north\n\
         2,bob,3.25,south\n\
         3,ann,10.5,north\n\
         4,cid,,east\n\
         5,bob,7.00,south\n",
    );
    let engine = ExecutionEngine::default();
    engine.register_csv("orders", &orders).unwrap();
    engine
}

#[test]
fn test_csv_query() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let result = engine
        .execute_sql(
            "SELECT order_id, customer FROM orders WHERE region = 'south' ORDER BY order_id DESC",
            &mut NullObserver,
        )
        .unwrap();
    assert_eq!(result.columns, vec!["order_id", "customer"]);
    let ids: Vec<Value> = result.rows.iter().map(|r| r.get(0).clone()).collect();
    assert_eq!(ids, vec![Value::Int(5), Value::Int(2)]);
}

#[test]
fn test_csv_statistics() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let sink = CollectingSink::new();
    let mut session = PiggybackSession::new(StatsConfig::default(), Box::new(sink.clone()));
    let result = engine
        .execute_sql("SELECT customer, amount, region FROM orders", &mut session)
        .unwrap();
    assert_eq!(result.num_rows(), 5);

    let report = sink.last().unwrap();
    // 10.50 and 10.5 are one value; the empty amount is null.
    assert_eq!(report.column("amount").unwrap().distinct_count, Some(3));
    assert!(!report.column("amount").unwrap().is_numeric);
    assert_eq!(report.column("customer").unwrap().distinct_count, Some(3));
    // Bounds are tracked for integer columns only.
    assert_eq!(report.column("region").unwrap().min, None);
    assert!(report.has_dependency("customer", "region"));
    assert!(!report.has_dependency("customer", "amount"));
}

#[test]
fn test_statistics_do_not_change_rows() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let sql = "SELECT customer, COUNT(*) AS n FROM orders WHERE order_id > 1 GROUP BY customer";

    let plain = engine.execute_sql(sql, &mut NullObserver).unwrap();
    let mut session = PiggybackSession::new(
        StatsConfig::default().with_max_tracked_values(2),
        Box::new(CollectingSink::new()),
    );
    let profiled = engine.execute_sql(sql, &mut session).unwrap();
    assert_eq!(plain, profiled);
}

#[test]
fn test_missing_csv() {
    let engine = ExecutionEngine::default();
    assert!(engine.register_csv("nope", "/definitely/not/here.csv").is_err());
}
