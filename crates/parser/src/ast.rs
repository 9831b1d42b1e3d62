use types::Value;

/// The statements the planner understands. `WHERE` clauses are restricted to
/// `AND`-joined binary comparisons, so they are carried as a flat
/// `Vec<Predicate>` rather than a general expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
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
    Select {
        table: String,
        columns: Vec<SelectItem>,
        predicates: Vec<Predicate>,
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

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Column(String),
}

/// `column <op> literal`, one conjunct of an `AND`-joined `WHERE` clause.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: ComparisonOp,
    pub literal: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
