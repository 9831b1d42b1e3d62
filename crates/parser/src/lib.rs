//! SQL text to [`Statement`] mapping.
//!
//! Lexing and parsing is delegated to `sqlparser`; this module maps the
//! subset of its AST the planner needs onto a smaller internal `Statement`.
//! `WHERE` clauses are restricted to `AND`-joined binary comparisons of the
//! form `column <op> literal` — no `OR`, no nested boolean expressions, no
//! column-to-column comparisons.

mod ast;

pub use ast::*;

use common::{DbError, DbResult};
use sqlparser::ast as sqlast;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser as SqlParser;
use types::Value;

/// Parse SQL text into the internal AST statements.
pub fn parse_sql(sql: &str) -> DbResult<Vec<Statement>> {
    let dialect = GenericDialect {};
    let stmts = SqlParser::parse_sql(&dialect, sql)
        .map_err(|e| DbError::Parser(format!("SQL parse error: {e}")))?;

    stmts.into_iter().map(map_statement).collect()
}

fn map_statement(stmt: sqlast::Statement) -> DbResult<Statement> {
    use sqlast::Statement as SqlStatement;

    match stmt {
        SqlStatement::CreateTable { name, columns, .. } => {
            let table = normalize_object_name(&name)?;
            let mapped_columns = columns
                .into_iter()
                .map(|col| ColumnDef {
                    name: normalize_ident_owned(col.name),
                    ty: col.data_type.to_string().to_uppercase(),
                })
                .collect();
            Ok(Statement::CreateTable {
                name: table,
                columns: mapped_columns,
            })
        }
        SqlStatement::CreateIndex {
            name,
            table_name,
            columns,
            ..
        } => {
            let index_name = name
                .ok_or_else(|| DbError::Parser("index name required".into()))
                .map(|n| normalize_object_name(&n))??;
            let table = normalize_object_name(&table_name)?;
            let column = map_index_column(columns.first())?;
            Ok(Statement::CreateIndex {
                name: index_name,
                table,
                column,
            })
        }
        SqlStatement::Insert {
            table_name, source, ..
        } => {
            let table = normalize_object_name(&table_name)?;
            let source = source.ok_or_else(|| DbError::Parser("INSERT source missing".into()))?;
            let values = extract_values(*source)?;
            Ok(Statement::Insert { table, values })
        }
        SqlStatement::Query(query) => map_select(*query),
        SqlStatement::Update {
            table,
            assignments,
            selection,
            ..
        } => {
            let table = table_name_from_with_joins(&table)?;
            let assignments = assignments
                .into_iter()
                .map(|assign| {
                    let ident = assign
                        .id
                        .last()
                        .ok_or_else(|| DbError::Parser("invalid assignment target".into()))?;
                    Ok((normalize_ident(ident), map_value_expr(assign.value)?))
                })
                .collect::<DbResult<Vec<_>>>()?;
            let predicates = selection.map(map_where).transpose()?.unwrap_or_default();
            Ok(Statement::Update {
                table,
                assignments,
                predicates,
            })
        }
        SqlStatement::Delete {
            from, selection, ..
        } => {
            if from.is_empty() {
                return Err(DbError::Parser("DELETE requires FROM source".into()));
            }
            if from.len() > 1 {
                return Err(DbError::Parser("multi-table DELETE not supported".into()));
            }
            let table = table_name_from_with_joins(&from[0])?;
            let predicates = selection.map(map_where).transpose()?.unwrap_or_default();
            Ok(Statement::Delete { table, predicates })
        }
        other => Err(DbError::Parser(format!("unsupported statement: {other}"))),
    }
}

fn map_select(query: sqlast::Query) -> DbResult<Statement> {
    use sqlast::SetExpr;

    let select = match *query.body {
        SetExpr::Select(select) => select,
        SetExpr::Values(_) => {
            return Err(DbError::Parser("standalone VALUES not supported".into()))
        }
        _ => return Err(DbError::Parser("SET operations not supported".into())),
    };

    let sqlast::Select {
        projection,
        from,
        selection,
        ..
    } = *select;

    if from.is_empty() {
        return Err(DbError::Parser("SELECT requires FROM clause".into()));
    }
    if from.len() > 1 {
        return Err(DbError::Parser("joins not supported".into()));
    }
    let table = table_name_from_with_joins(&from[0])?;
    let columns = projection
        .into_iter()
        .map(map_select_item)
        .collect::<DbResult<Vec<_>>>()?;
    let predicates = selection.map(map_where).transpose()?.unwrap_or_default();

    Ok(Statement::Select {
        table,
        columns,
        predicates,
    })
}

fn extract_values(query: sqlast::Query) -> DbResult<Vec<Value>> {
    match *query.body {
        sqlast::SetExpr::Values(values) => {
            let mut rows = values.rows.into_iter();
            let row = rows
                .next()
                .ok_or_else(|| DbError::Parser("INSERT requires at least one row".into()))?;
            if rows.next().is_some() {
                return Err(DbError::Parser("multi-row INSERT not supported".into()));
            }
            row.into_iter().map(map_value_expr).collect()
        }
        _ => Err(DbError::Parser("INSERT expects VALUES list".into())),
    }
}

fn map_select_item(item: sqlast::SelectItem) -> DbResult<SelectItem> {
    match item {
        sqlast::SelectItem::Wildcard(options) => {
            ensure_plain_wildcard(&options)?;
            Ok(SelectItem::Wildcard)
        }
        sqlast::SelectItem::QualifiedWildcard(_, _) => {
            Err(DbError::Parser("qualified wildcard not supported".into()))
        }
        sqlast::SelectItem::UnnamedExpr(expr) => match expr {
            sqlast::Expr::Identifier(ident) => Ok(SelectItem::Column(normalize_ident_owned(ident))),
            sqlast::Expr::CompoundIdentifier(parts) => {
                let ident = parts
                    .last()
                    .ok_or_else(|| DbError::Parser("invalid identifier".into()))?;
                Ok(SelectItem::Column(normalize_ident(ident)))
            }
            other => Err(DbError::Parser(format!(
                "unsupported select item: {other:?}"
            ))),
        },
        sqlast::SelectItem::ExprWithAlias { .. } => {
            Err(DbError::Parser("select aliases not supported".into()))
        }
    }
}

/// Walk a top-level `AND` chain, collecting each leaf into a [`Predicate`].
/// Anything that isn't `column <op> literal` joined by `AND` is rejected.
fn map_where(expr: sqlast::Expr) -> DbResult<Vec<Predicate>> {
    let mut predicates = Vec::new();
    collect_and_chain(expr, &mut predicates)?;
    Ok(predicates)
}

fn collect_and_chain(expr: sqlast::Expr, out: &mut Vec<Predicate>) -> DbResult<()> {
    match expr {
        sqlast::Expr::BinaryOp {
            left,
            op: sqlast::BinaryOperator::And,
            right,
        } => {
            collect_and_chain(*left, out)?;
            collect_and_chain(*right, out)
        }
        sqlast::Expr::Nested(inner) => collect_and_chain(*inner, out),
        sqlast::Expr::BinaryOp { left, op, right } => {
            out.push(map_comparison(*left, op, *right)?);
            Ok(())
        }
        other => Err(DbError::Parser(format!(
            "unsupported WHERE clause: {other:?}"
        ))),
    }
}

fn map_comparison(
    left: sqlast::Expr,
    op: sqlast::BinaryOperator,
    right: sqlast::Expr,
) -> DbResult<Predicate> {
    let (column, literal) = match (left, right) {
        (ident, sqlast::Expr::Value(v)) if is_column_ref(&ident) => {
            (column_name(ident)?, map_value_expr(v)?)
        }
        (sqlast::Expr::Value(v), ident) if is_column_ref(&ident) => {
            (column_name(ident)?, map_value_expr(v)?)
        }
        _ => {
            return Err(DbError::Parser(
                "WHERE comparisons must be of the form column <op> literal".into(),
            ))
        }
    };
    Ok(Predicate {
        column,
        op: map_comparison_op(op)?,
        literal,
    })
}

fn is_column_ref(expr: &sqlast::Expr) -> bool {
    matches!(
        expr,
        sqlast::Expr::Identifier(_) | sqlast::Expr::CompoundIdentifier(_)
    )
}

fn column_name(expr: sqlast::Expr) -> DbResult<String> {
    match expr {
        sqlast::Expr::Identifier(ident) => Ok(normalize_ident_owned(ident)),
        sqlast::Expr::CompoundIdentifier(mut parts) => parts
            .pop()
            .map(normalize_ident_owned)
            .ok_or_else(|| DbError::Parser("invalid identifier".into())),
        _ => unreachable!("caller already checked is_column_ref"),
    }
}

fn map_comparison_op(op: sqlast::BinaryOperator) -> DbResult<ComparisonOp> {
    use sqlast::BinaryOperator as SqlBinary;

    Ok(match op {
        SqlBinary::Eq => ComparisonOp::Eq,
        SqlBinary::NotEq => ComparisonOp::Ne,
        SqlBinary::Lt => ComparisonOp::Lt,
        SqlBinary::LtEq => ComparisonOp::Le,
        SqlBinary::Gt => ComparisonOp::Gt,
        SqlBinary::GtEq => ComparisonOp::Ge,
        other => {
            return Err(DbError::Parser(format!(
                "unsupported comparison operator: {other:?}"
            )))
        }
    })
}

fn map_value_expr(expr: sqlast::Expr) -> DbResult<Value> {
    match expr {
        sqlast::Expr::Value(v) => map_value(v),
        sqlast::Expr::UnaryOp {
            op: sqlast::UnaryOperator::Minus,
            expr,
        } => match map_value_expr(*expr)? {
            Value::Int(n) => Ok(Value::Int(-n)),
            other => Err(DbError::Parser(format!("cannot negate {other:?}"))),
        },
        other => Err(DbError::Parser(format!("unsupported literal: {other:?}"))),
    }
}

fn map_value(value: sqlast::Value) -> DbResult<Value> {
    use sqlast::Value as SqlValue;

    match value {
        SqlValue::Number(num, _) => {
            let parsed = num
                .parse::<i64>()
                .map_err(|_| DbError::Parser(format!("invalid int literal: {num}")))?;
            Ok(Value::Int(parsed))
        }
        SqlValue::SingleQuotedString(s) => Ok(Value::Text(s)),
        SqlValue::Boolean(b) => Ok(Value::Bool(b)),
        SqlValue::Null => Ok(Value::Null),
        other => Err(DbError::Parser(format!("unsupported literal: {other:?}"))),
    }
}

fn normalize_ident(ident: &sqlast::Ident) -> String {
    ident.value.to_lowercase()
}

fn normalize_ident_owned(ident: sqlast::Ident) -> String {
    ident.value.to_lowercase()
}

fn normalize_object_name(name: &sqlast::ObjectName) -> DbResult<String> {
    name.0
        .first()
        .map(|ident| ident.value.to_lowercase())
        .ok_or_else(|| DbError::Parser("invalid object name".into()))
}

fn table_name_from_with_joins(table: &sqlast::TableWithJoins) -> DbResult<String> {
    if !table.joins.is_empty() {
        return Err(DbError::Parser("joins not supported".into()));
    }
    match &table.relation {
        sqlast::TableFactor::Table { name, .. } => normalize_object_name(name),
        _ => Err(DbError::Parser("unsupported table factor".into())),
    }
}

fn map_index_column(column: Option<&sqlast::OrderByExpr>) -> DbResult<String> {
    let column = column.ok_or_else(|| DbError::Parser("index column required".into()))?;
    match &column.expr {
        sqlast::Expr::Identifier(ident) => Ok(normalize_ident(ident)),
        sqlast::Expr::CompoundIdentifier(idents) => idents
            .last()
            .map(normalize_ident)
            .ok_or_else(|| DbError::Parser("invalid identifier".into())),
        other => Err(DbError::Parser(format!(
            "unsupported index column: {other:?}"
        ))),
    }
}

fn ensure_plain_wildcard(options: &sqlast::WildcardAdditionalOptions) -> DbResult<()> {
    let has_options = options.opt_exclude.is_some()
        || options.opt_except.is_some()
        || options.opt_rename.is_some()
        || options.opt_replace.is_some();
    if has_options {
        Err(DbError::Parser("wildcard options not supported".into()))
    } else {
        Ok(())
    }
}
