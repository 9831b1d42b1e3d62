//! Executes a [`planner::Plan`] against the live storage handles a
//! [`Catalog`] owns.
//!
//! Rows are encoded to heap-file bytes with `serde_json` — `types::Value`
//! already derives `Serialize`/`Deserialize`, and the catalog has no other
//! need for a binary codec. A table's heap rows are immutable once written:
//! `UPDATE` deletes the old tombstone and inserts a fresh row, matching the
//! heap file's append-only contract.

#[cfg(test)]
mod tests;

use catalog::{Catalog, Column, TableMeta};
use common::{DbError, DbResult, RecordBatch, RecordId, Row};
use parser::{ColumnDef, ComparisonOp, Predicate, SelectItem};
use planner::{IndexKey, Plan};
use tracing::info;
use types::{SqlType, Value};

/// Owns the catalog and drives storage operations on its behalf.
pub struct Engine {
    catalog: Catalog,
}

impl Engine {
    pub fn new(default_buffer_pool_pages: usize, default_btree_order: usize) -> Self {
        Self {
            catalog: Catalog::new(default_buffer_pool_pages, default_btree_order),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn execute(&mut self, plan: Plan) -> DbResult<RecordBatch> {
        match plan {
            Plan::CreateTable { name, columns } => self.execute_create_table(name, columns),
            Plan::CreateIndex { table, column, .. } => self.execute_create_index(table, column),
            Plan::Insert { table, values } => self.execute_insert(table, values),
            Plan::SeqScan { table, columns, predicates } => {
                self.execute_seq_scan(table, columns, predicates)
            }
            Plan::IndexScan {
                table,
                columns,
                column,
                key,
                remaining_predicates,
            } => self.execute_index_scan(table, columns, column, key, remaining_predicates),
            Plan::Update { table, assignments, predicates } => {
                self.execute_update(table, assignments, predicates)
            }
            Plan::Delete { table, predicates } => self.execute_delete(table, predicates),
        }
    }

    fn execute_create_table(&mut self, name: String, columns: Vec<ColumnDef>) -> DbResult<RecordBatch> {
        let columns = columns
            .into_iter()
            .map(|c| Ok(Column::new(c.name, parse_sql_type(&c.ty)?)))
            .collect::<DbResult<Vec<_>>>()?;
        self.catalog.create_table(&name, columns)?;
        Ok(empty_batch())
    }

    fn execute_create_index(&mut self, table: String, column: String) -> DbResult<RecordBatch> {
        self.catalog.create_index(&table, &column, None)?;
        let meta = self.catalog.table_mut(&table)?;
        let col_idx = meta
            .column_index(&column)
            .ok_or_else(|| DbError::Catalog(format!("unknown column '{column}'")))?;
        let rows = meta.heap.seq_scan()?;
        let index = meta
            .index_mut(&column)
            .expect("create_index above just registered this column");
        for record in rows {
            let values = decode_row(&record.bytes)?;
            let key = as_i32(&values[col_idx])?;
            index.tree.insert(key, record.rid)?;
        }
        Ok(empty_batch())
    }

    fn execute_insert(&mut self, table: String, values: Vec<Value>) -> DbResult<RecordBatch> {
        let meta = self.catalog.table_mut(&table)?;
        if values.len() != meta.columns.len() {
            return Err(DbError::Executor(format!(
                "table '{table}' has {} columns, {} values given",
                meta.columns.len(),
                values.len()
            )));
        }
        let rid = meta.heap.insert(&encode_row(&values))?;
        insert_into_indexes(meta, &values, rid)?;
        info!(table, "inserted row");
        Ok(empty_batch())
    }

    fn execute_seq_scan(
        &mut self,
        table: String,
        columns: Vec<SelectItem>,
        predicates: Vec<Predicate>,
    ) -> DbResult<RecordBatch> {
        let meta = self.catalog.table_mut(&table)?;
        let mut rows = Vec::new();
        for record in meta.heap.seq_scan()? {
            let values = decode_row(&record.bytes)?;
            if matches_all(meta, &values, &predicates)? {
                rows.push(Row::new(values).with_rid(record.rid));
            }
        }
        project(meta, &columns, rows)
    }

    fn execute_index_scan(
        &mut self,
        table: String,
        columns: Vec<SelectItem>,
        column: String,
        key: IndexKey,
        remaining_predicates: Vec<Predicate>,
    ) -> DbResult<RecordBatch> {
        let meta = self.catalog.table_mut(&table)?;
        let index = meta
            .index_mut(&column)
            .ok_or_else(|| DbError::Catalog(format!("column '{column}' is not indexed")))?;
        let rids = match key {
            IndexKey::Eq(k) => index.tree.search(k)?.into_iter().collect::<Vec<_>>(),
            IndexKey::Range(lo, hi) => index.tree.range_scan(lo, hi)?,
        };
        let mut rows = Vec::new();
        for rid in rids {
            let record = meta.heap.read(rid)?;
            if record.is_empty() {
                continue;
            }
            let values = decode_row(&record.bytes)?;
            if matches_all(meta, &values, &remaining_predicates)? {
                rows.push(Row::new(values).with_rid(rid));
            }
        }
        project(meta, &columns, rows)
    }

    fn execute_update(
        &mut self,
        table: String,
        assignments: Vec<(String, Value)>,
        predicates: Vec<Predicate>,
    ) -> DbResult<RecordBatch> {
        let meta = self.catalog.table_mut(&table)?;
        let matches = matching_rids(meta, &predicates)?;
        let mut updated = 0i64;
        for (rid, old_values) in matches {
            let mut new_values = old_values.clone();
            for (column, literal) in &assignments {
                let idx = meta
                    .column_index(column)
                    .ok_or_else(|| DbError::Executor(format!("unknown column '{column}'")))?;
                new_values[idx] = literal.clone();
            }
            meta.heap.delete(rid)?;
            remove_from_indexes(meta, &old_values, rid)?;
            let new_rid = meta.heap.insert(&encode_row(&new_values))?;
            insert_into_indexes(meta, &new_values, new_rid)?;
            updated += 1;
        }
        Ok(count_batch(updated))
    }

    fn execute_delete(&mut self, table: String, predicates: Vec<Predicate>) -> DbResult<RecordBatch> {
        let meta = self.catalog.table_mut(&table)?;
        let matches = matching_rids(meta, &predicates)?;
        let mut deleted = 0i64;
        for (rid, old_values) in matches {
            meta.heap.delete(rid)?;
            remove_from_indexes(meta, &old_values, rid)?;
            deleted += 1;
        }
        Ok(count_batch(deleted))
    }
}

fn matching_rids(meta: &mut TableMeta, predicates: &[Predicate]) -> DbResult<Vec<(RecordId, Vec<Value>)>> {
    let mut matches = Vec::new();
    for record in meta.heap.seq_scan()? {
        let values = decode_row(&record.bytes)?;
        if matches_all(meta, &values, predicates)? {
            matches.push((record.rid, values));
        }
    }
    Ok(matches)
}

fn insert_into_indexes(meta: &mut TableMeta, values: &[Value], rid: RecordId) -> DbResult<()> {
    let indexed: Vec<String> = meta.indexed_columns().map(str::to_string).collect();
    for column in indexed {
        let idx = meta.column_index(&column).expect("indexed column exists");
        let key = as_i32(&values[idx])?;
        meta.index_mut(&column)
            .expect("just looked up")
            .tree
            .insert(key, rid)?;
    }
    Ok(())
}

fn remove_from_indexes(meta: &mut TableMeta, values: &[Value], _rid: RecordId) -> DbResult<()> {
    let indexed: Vec<String> = meta.indexed_columns().map(str::to_string).collect();
    for column in indexed {
        let idx = meta.column_index(&column).expect("indexed column exists");
        let key = as_i32(&values[idx])?;
        meta.index_mut(&column).expect("just looked up").tree.delete(key)?;
    }
    Ok(())
}

fn matches_all(meta: &TableMeta, values: &[Value], predicates: &[Predicate]) -> DbResult<bool> {
    for p in predicates {
        let idx = meta
            .column_index(&p.column)
            .ok_or_else(|| DbError::Executor(format!("unknown column '{}'", p.column)))?;
        if !eval_predicate(&values[idx], p)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn eval_predicate(actual: &Value, predicate: &Predicate) -> DbResult<bool> {
    use ComparisonOp::*;
    let literal = &predicate.literal;
    match predicate.op {
        Eq => Ok(actual.eq_same_type(literal).unwrap_or(false)),
        Ne => Ok(!actual.eq_same_type(literal).unwrap_or(false)),
        Lt => Ok(actual.cmp_same_type(literal).is_some_and(|o| o.is_lt())),
        Le => Ok(actual.cmp_same_type(literal).is_some_and(|o| o.is_le())),
        Gt => Ok(actual.cmp_same_type(literal).is_some_and(|o| o.is_gt())),
        Ge => Ok(actual.cmp_same_type(literal).is_some_and(|o| o.is_ge())),
    }
}

fn project(meta: &TableMeta, columns: &[SelectItem], rows: Vec<Row>) -> DbResult<RecordBatch> {
    let all_names: Vec<String> = meta.columns.iter().map(|c| c.name.clone()).collect();
    if columns.iter().any(|c| matches!(c, SelectItem::Wildcard)) {
        return Ok(RecordBatch { columns: all_names, rows });
    }
    let mut indices = Vec::with_capacity(columns.len());
    let mut names = Vec::with_capacity(columns.len());
    for item in columns {
        let SelectItem::Column(name) = item else { unreachable!("wildcard handled above") };
        let idx = meta
            .column_index(name)
            .ok_or_else(|| DbError::Executor(format!("unknown column '{name}'")))?;
        indices.push(idx);
        names.push(name.clone());
    }
    let projected = rows
        .into_iter()
        .map(|row| {
            let rid = row.rid();
            let values = indices.iter().map(|&i| row.values[i].clone()).collect();
            let mut out = Row::new(values);
            if let Some(rid) = rid {
                out = out.with_rid(rid);
            }
            out
        })
        .collect();
    Ok(RecordBatch { columns: names, rows: projected })
}

fn encode_row(values: &[Value]) -> Vec<u8> {
    serde_json::to_vec(values).expect("Value serialization cannot fail")
}

fn decode_row(bytes: &[u8]) -> DbResult<Vec<Value>> {
    serde_json::from_slice(bytes)
        .map_err(|e| DbError::Storage(format!("corrupt row encoding: {e}")))
}

fn as_i32(value: &Value) -> DbResult<i32> {
    match value {
        Value::Int(n) => i32::try_from(*n)
            .map_err(|_| DbError::Executor(format!("index key {n} out of i32 range"))),
        other => Err(DbError::Executor(format!(
            "indexed column must hold an INT value, found {other:?}"
        ))),
    }
}

fn parse_sql_type(ty: &str) -> DbResult<SqlType> {
    match ty.to_uppercase().as_str() {
        "INT" | "INTEGER" => Ok(SqlType::Int),
        "TEXT" | "VARCHAR" | "STRING" => Ok(SqlType::Text),
        "BOOL" | "BOOLEAN" => Ok(SqlType::Bool),
        other => Err(DbError::Executor(format!("unsupported column type '{other}'"))),
    }
}

fn empty_batch() -> RecordBatch {
    RecordBatch { columns: Vec::new(), rows: Vec::new() }
}

fn count_batch(count: i64) -> RecordBatch {
    RecordBatch {
        columns: vec!["count".to_string()],
        rows: vec![Row::new(vec![Value::Int(count)])],
    }
}
