use super::*;
use parser::parse_sql;
use pretty_assertions::assert_eq;

fn run(engine: &mut Engine, sql: &str) -> RecordBatch {
    let stmt = parse_sql(sql).unwrap().remove(0);
    let plan = planner::plan(stmt, engine.catalog()).unwrap();
    engine.execute(plan).unwrap()
}

fn fresh_engine() -> Engine {
    let mut engine = Engine::new(16, 4);
    run(&mut engine, "CREATE TABLE users (id INT, name TEXT, age INT)");
    engine
}

#[test]
fn create_table_registers_schema() {
    let engine = fresh_engine();
    let table = engine.catalog().table("users").unwrap();
    assert_eq!(table.columns.len(), 3);
}

#[test]
fn insert_then_seq_scan_round_trips() {
    let mut engine = fresh_engine();
    run(&mut engine, "INSERT INTO users VALUES (1, 'Ada', 30)");
    run(&mut engine, "INSERT INTO users VALUES (2, 'Bo', 40)");

    let batch = run(&mut engine, "SELECT * FROM users");
    assert_eq!(batch.rows.len(), 2);
    assert_eq!(batch.rows[0].values, vec![Value::Int(1), Value::Text("Ada".into()), Value::Int(30)]);
}

#[test]
fn seq_scan_applies_where_predicate() {
    let mut engine = fresh_engine();
    run(&mut engine, "INSERT INTO users VALUES (1, 'Ada', 30)");
    run(&mut engine, "INSERT INTO users VALUES (2, 'Bo', 40)");

    let batch = run(&mut engine, "SELECT * FROM users WHERE age > 35");
    assert_eq!(batch.rows.len(), 1);
    assert_eq!(batch.rows[0].values[1], Value::Text("Bo".into()));
}

#[test]
fn projection_returns_only_requested_columns() {
    let mut engine = fresh_engine();
    run(&mut engine, "INSERT INTO users VALUES (1, 'Ada', 30)");

    let batch = run(&mut engine, "SELECT name FROM users");
    assert_eq!(batch.columns, vec!["name".to_string()]);
    assert_eq!(batch.rows[0].values, vec![Value::Text("Ada".into())]);
}

#[test]
fn index_scan_finds_the_right_row() {
    let mut engine = fresh_engine();
    run(&mut engine, "CREATE INDEX idx_id ON users (id)");
    run(&mut engine, "INSERT INTO users VALUES (1, 'Ada', 30)");
    run(&mut engine, "INSERT INTO users VALUES (2, 'Bo', 40)");
    run(&mut engine, "INSERT INTO users VALUES (3, 'Cy', 50)");

    let batch = run(&mut engine, "SELECT * FROM users WHERE id = 2");
    assert_eq!(batch.rows.len(), 1);
    assert_eq!(batch.rows[0].values[1], Value::Text("Bo".into()));
}

#[test]
fn index_created_after_inserts_backfills_existing_rows() {
    let mut engine = fresh_engine();
    run(&mut engine, "INSERT INTO users VALUES (1, 'Ada', 30)");
    run(&mut engine, "INSERT INTO users VALUES (2, 'Bo', 40)");
    run(&mut engine, "CREATE INDEX idx_id ON users (id)");

    let batch = run(&mut engine, "SELECT * FROM users WHERE id = 1");
    assert_eq!(batch.rows.len(), 1);
}

#[test]
fn range_scan_uses_the_index_for_bounded_queries() {
    let mut engine = fresh_engine();
    run(&mut engine, "CREATE INDEX idx_id ON users (id)");
    for i in 1..=10 {
        run(&mut engine, &format!("INSERT INTO users VALUES ({i}, 'n{i}', {i})"));
    }
    let batch = run(&mut engine, "SELECT * FROM users WHERE id >= 3 AND id <= 5");
    assert_eq!(batch.rows.len(), 3);
}

#[test]
fn update_replaces_the_row_and_its_index_entry() {
    let mut engine = fresh_engine();
    run(&mut engine, "CREATE INDEX idx_id ON users (id)");
    run(&mut engine, "INSERT INTO users VALUES (1, 'Ada', 30)");

    run(&mut engine, "UPDATE users SET age = 31 WHERE id = 1");

    let batch = run(&mut engine, "SELECT * FROM users WHERE id = 1");
    assert_eq!(batch.rows.len(), 1);
    assert_eq!(batch.rows[0].values[2], Value::Int(31));
}

#[test]
fn delete_removes_the_row_and_its_index_entry() {
    let mut engine = fresh_engine();
    run(&mut engine, "CREATE INDEX idx_id ON users (id)");
    run(&mut engine, "INSERT INTO users VALUES (1, 'Ada', 30)");
    run(&mut engine, "INSERT INTO users VALUES (2, 'Bo', 40)");

    run(&mut engine, "DELETE FROM users WHERE id = 1");

    let remaining = run(&mut engine, "SELECT * FROM users");
    assert_eq!(remaining.rows.len(), 1);
    let by_index = run(&mut engine, "SELECT * FROM users WHERE id = 1");
    assert_eq!(by_index.rows.len(), 0);
}

#[test]
fn create_index_rejects_text_columns() {
    let mut engine = fresh_engine();
    let stmt = parse_sql("CREATE INDEX idx_name ON users (name)").unwrap().remove(0);
    let plan = planner::plan(stmt, engine.catalog()).unwrap();
    assert!(engine.execute(plan).is_err());
}
