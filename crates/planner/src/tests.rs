use super::*;
use catalog::{Catalog, Column};
use parser::parse_sql;
use types::SqlType;

fn catalog_with_users() -> Catalog {
    let mut catalog = Catalog::new(16, 4);
    catalog
        .create_table(
            "users",
            vec![
                Column::new("id", SqlType::Int),
                Column::new("name", SqlType::Text),
            ],
        )
        .unwrap();
    catalog
}

fn plan_one(sql: &str, catalog: &Catalog) -> Plan {
    let stmt = parse_sql(sql).unwrap().remove(0);
    plan(stmt, catalog).unwrap()
}

#[test]
fn create_table_passes_through() {
    let catalog = Catalog::new(16, 4);
    match plan_one("CREATE TABLE t (a INT)", &catalog) {
        Plan::CreateTable { name, columns } => {
            assert_eq!(name, "t");
            assert_eq!(columns.len(), 1);
        }
        other => panic!("expected CreateTable, got {other:?}"),
    }
}

#[test]
fn select_without_index_is_a_seq_scan() {
    let catalog = catalog_with_users();
    match plan_one("SELECT * FROM users WHERE id = 1", &catalog) {
        Plan::SeqScan { table, predicates, .. } => {
            assert_eq!(table, "users");
            assert_eq!(predicates.len(), 1);
        }
        other => panic!("expected SeqScan, got {other:?}"),
    }
}

#[test]
fn select_with_equality_on_indexed_column_is_an_index_scan() {
    let mut catalog = catalog_with_users();
    catalog.create_index("users", "id", None).unwrap();
    match plan_one("SELECT * FROM users WHERE id = 7", &catalog) {
        Plan::IndexScan {
            table,
            column,
            key,
            remaining_predicates,
            ..
        } => {
            assert_eq!(table, "users");
            assert_eq!(column, "id");
            assert_eq!(key, IndexKey::Eq(7));
            assert!(remaining_predicates.is_empty());
        }
        other => panic!("expected IndexScan, got {other:?}"),
    }
}

#[test]
fn extra_predicates_beyond_the_index_key_become_a_post_filter() {
    let mut catalog = catalog_with_users();
    catalog.create_index("users", "id", None).unwrap();
    match plan_one(
        "SELECT * FROM users WHERE id = 7 AND name = 'Ada'",
        &catalog,
    ) {
        Plan::IndexScan {
            key,
            remaining_predicates,
            ..
        } => {
            assert_eq!(key, IndexKey::Eq(7));
            assert_eq!(remaining_predicates.len(), 1);
            assert_eq!(remaining_predicates[0].column, "name");
        }
        other => panic!("expected IndexScan, got {other:?}"),
    }
}

#[test]
fn bounds_on_an_indexed_column_become_a_range_scan() {
    let mut catalog = catalog_with_users();
    catalog.create_index("users", "id", None).unwrap();
    match plan_one("SELECT * FROM users WHERE id >= 10 AND id <= 20", &catalog) {
        Plan::IndexScan { key, remaining_predicates, .. } => {
            assert_eq!(key, IndexKey::Range(10, 20));
            assert!(remaining_predicates.is_empty());
        }
        other => panic!("expected IndexScan, got {other:?}"),
    }
}

#[test]
fn strict_bounds_keep_the_boundary_predicates_as_a_post_filter() {
    let mut catalog = catalog_with_users();
    catalog.create_index("users", "id", None).unwrap();
    match plan_one("SELECT * FROM users WHERE id > 5 AND id < 10", &catalog) {
        Plan::IndexScan { key, remaining_predicates, .. } => {
            // range_scan is inclusive, so both strict bounds must survive
            // as a post-filter to exclude id == 5 and id == 10.
            assert_eq!(key, IndexKey::Range(5, 10));
            assert_eq!(remaining_predicates.len(), 2);
            assert!(remaining_predicates.iter().all(|p| p.column == "id"));
        }
        other => panic!("expected IndexScan, got {other:?}"),
    }
}

#[test]
fn mixed_strict_and_inclusive_bound_keeps_only_the_strict_one() {
    let mut catalog = catalog_with_users();
    catalog.create_index("users", "id", None).unwrap();
    match plan_one("SELECT * FROM users WHERE id > 5 AND id <= 10", &catalog) {
        Plan::IndexScan { key, remaining_predicates, .. } => {
            assert_eq!(key, IndexKey::Range(5, 10));
            assert_eq!(remaining_predicates.len(), 1);
            assert_eq!(remaining_predicates[0].op, ComparisonOp::Gt);
        }
        other => panic!("expected IndexScan, got {other:?}"),
    }
}

#[test]
fn single_sided_bound_falls_back_to_equality_or_seq_scan() {
    let mut catalog = catalog_with_users();
    catalog.create_index("users", "id", None).unwrap();
    match plan_one("SELECT * FROM users WHERE id > 10", &catalog) {
        Plan::SeqScan { predicates, .. } => assert_eq!(predicates.len(), 1),
        other => panic!("expected SeqScan, got {other:?}"),
    }
}

#[test]
fn update_and_delete_carry_predicates_through_unchanged() {
    let catalog = catalog_with_users();
    match plan_one("UPDATE users SET name = 'Bo' WHERE id = 1", &catalog) {
        Plan::Update { assignments, predicates, .. } => {
            assert_eq!(assignments.len(), 1);
            assert_eq!(predicates.len(), 1);
        }
        other => panic!("expected Update, got {other:?}"),
    }
    match plan_one("DELETE FROM users WHERE id = 1", &catalog) {
        Plan::Delete { predicates, .. } => assert_eq!(predicates.len(), 1),
        other => panic!("expected Delete, got {other:?}"),
    }
}

#[test]
fn create_index_passes_through() {
    let catalog = catalog_with_users();
    match plan_one("CREATE INDEX idx_id ON users (id)", &catalog) {
        Plan::CreateIndex { name, table, column } => {
            assert_eq!(name, "idx_id");
            assert_eq!(table, "users");
            assert_eq!(column, "id");
        }
        other => panic!("expected CreateIndex, got {other:?}"),
    }
}
