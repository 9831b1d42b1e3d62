//! Query planner: turns a parsed [`Statement`] plus a [`Catalog`] reference
//! into a [`Plan`] the engine executes directly against heap files and
//! B+Tree indexes.
//!
//! `SELECT` is the only statement with more than one physical shape: if the
//! predicate list carries an equality predicate on an indexed column, the
//! plan becomes an `IndexScan`; a pair of `>=`/`<=`-style bounds on the same
//! indexed column becomes a `RangeScan`. Everything else falls back to a
//! `SeqScan`. `UPDATE`/`DELETE` always drive off a scan of matching rows —
//! this B+Tree doesn't support pushing arbitrary predicates past a single
//! equality or range.

#[cfg(test)]
mod tests;

use catalog::Catalog;
use common::DbResult;
use parser::{ColumnDef, ComparisonOp, Predicate, SelectItem, Statement};
use types::Value;

/// An access method the engine can execute directly.
#[derive(Clone, Debug, PartialEq)]
pub enum Plan {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
    },
    CreateIndex {
        name: String,
        table: String,
        column: String,
    },
    Insert {
        table: String,
        values: Vec<Value>,
    },
    SeqScan {
        table: String,
        columns: Vec<SelectItem>,
        predicates: Vec<Predicate>,
    },
    IndexScan {
        table: String,
        columns: Vec<SelectItem>,
        column: String,
        key: IndexKey,
        remaining_predicates: Vec<Predicate>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Value)>,
        predicates: Vec<Predicate>,
    },
    Delete {
        table: String,
        predicates: Vec<Predicate>,
    },
}

/// The key an `IndexScan` drives the B+Tree with.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexKey {
    Eq(i32),
    Range(i32, i32),
}

/// Plan a statement against the current catalog state. Table/column
/// existence is not checked here — the engine surfaces those errors when it
/// actually touches storage, the same as the original system this was
/// modeled on.
pub fn plan(stmt: Statement, catalog: &Catalog) -> DbResult<Plan> {
    match stmt {
        Statement::CreateTable { name, columns } => Ok(Plan::CreateTable { name, columns }),
        Statement::CreateIndex { name, table, column } => {
            Ok(Plan::CreateIndex { name, table, column })
        }
        Statement::Insert { table, values } => Ok(Plan::Insert { table, values }),
        Statement::Select {
            table,
            columns,
            predicates,
        } => plan_select(table, columns, predicates, catalog),
        Statement::Update {
            table,
            assignments,
            predicates,
        } => Ok(Plan::Update {
            table,
            assignments,
            predicates,
        }),
        Statement::Delete { table, predicates } => Ok(Plan::Delete { table, predicates }),
    }
}

fn plan_select(
    table: String,
    columns: Vec<SelectItem>,
    predicates: Vec<Predicate>,
    catalog: &Catalog,
) -> DbResult<Plan> {
    let indexed = |column: &str| {
        catalog
            .table(&table)
            .ok()
            .is_some_and(|meta| meta.index(column).is_some())
    };

    if let Some((column, low, high, rest)) = find_range_predicate(&predicates, indexed) {
        return Ok(Plan::IndexScan {
            table,
            columns,
            column,
            key: IndexKey::Range(low, high),
            remaining_predicates: rest,
        });
    }

    if let Some((column, key, rest)) = find_equality_predicate(&predicates, indexed) {
        return Ok(Plan::IndexScan {
            table,
            columns,
            column,
            key: IndexKey::Eq(key),
            remaining_predicates: rest,
        });
    }

    Ok(Plan::SeqScan {
        table,
        columns,
        predicates,
    })
}

/// An equality predicate whose column is indexed, plus every other
/// predicate carried forward as a post-filter.
fn find_equality_predicate(
    predicates: &[Predicate],
    indexed: impl Fn(&str) -> bool,
) -> Option<(String, i32, Vec<Predicate>)> {
    let pos = predicates
        .iter()
        .position(|p| p.op == ComparisonOp::Eq && indexed(&p.column))?;
    let key = as_i32(&predicates[pos].literal)?;
    let mut rest = predicates.to_vec();
    let hit = rest.remove(pos);
    Some((hit.column, key, rest))
}

/// A lower bound (`>`/`>=`) and upper bound (`<`/`<=`) on the same indexed
/// column; every other predicate is carried forward as a post-filter. The
/// B+Tree's `range_scan` is inclusive on both ends, so a strict (`>`/`<`)
/// bound is used to size the scan but is *also* kept in the post-filter
/// list — otherwise a strict `WHERE id > 5 AND id < 10` would wrongly admit
/// `id == 5`/`id == 10` through the inclusive scan.
fn find_range_predicate(
    predicates: &[Predicate],
    indexed: impl Fn(&str) -> bool,
) -> Option<(String, i32, i32, Vec<Predicate>)> {
    for (lower_pos, p) in predicates.iter().enumerate() {
        if !indexed(&p.column) {
            continue;
        }
        let is_lower = matches!(p.op, ComparisonOp::Ge | ComparisonOp::Gt);
        if !is_lower {
            continue;
        }
        let Some(upper_pos) = predicates.iter().position(|q| {
            q.column == p.column && matches!(q.op, ComparisonOp::Le | ComparisonOp::Lt)
        }) else {
            continue;
        };
        let upper = &predicates[upper_pos];
        let (Some(low), Some(high)) = (as_i32(&p.literal), as_i32(&upper.literal)) else {
            continue;
        };
        let lower_strict = p.op == ComparisonOp::Gt;
        let upper_strict = upper.op == ComparisonOp::Lt;
        let column = p.column.clone();

        let rest = predicates
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                (*i != lower_pos || lower_strict) && (*i != upper_pos || upper_strict)
            })
            .map(|(_, q)| q.clone())
            .collect();

        return Some((column, low, high, rest));
    }
    None
}

fn as_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Int(n) => i32::try_from(*n).ok(),
        _ => None,
    }
}
