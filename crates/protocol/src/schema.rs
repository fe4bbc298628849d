//! Table descriptors returned by [`crate::Handler::fetch`].
//!
//! These describe what a connector exposes: tables, their columns and types,
//! and which filter operators the connector can evaluate itself (so the
//! planner can push them down). How Stargate stores or renders catalogs is
//! outside this crate.

use serde::{Deserialize, Serialize};

use crate::types::Type;

/// A named group of tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub uid: u64,
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub hidden: bool,
}

/// A table exposed by the connector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub catalog: String,
    /// Rows carry no fixed column set.
    #[serde(default)]
    pub schemaless: bool,
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Table-level operators (limit, order, joins).
    #[serde(default)]
    pub operators: Vec<Operator>,
}

impl Table {
    /// Creates a table with no columns in `catalog.schema.name`.
    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            catalog: catalog.into(),
            ..Self::default()
        }
    }

    /// Appends a column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Appends a table-level operator.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operators.push(operator);
        self
    }

    /// Dotted `catalog.schema.name`, skipping empty qualifiers.
    pub fn qualified_name(&self) -> String {
        [self.catalog.as_str(), self.schema.as_str(), self.name.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// A column of a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub nullable: bool,
    /// Filter operators the connector evaluates on this column.
    #[serde(default)]
    pub operators: Vec<Operator>,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: impl Into<Type>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            required: false,
            indexed: false,
            nullable: false,
            operators: Vec::new(),
        }
    }

    /// Queries must constrain this column.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operators.push(operator);
        self
    }
}

/// A pushdown capability: one statement and the comparison shapes supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub statement: Statement,
    #[serde(default)]
    pub comparison_types: Vec<ComparisonType>,
    /// The planner must push this operator down (e.g. an API that cannot
    /// list without a filter).
    #[serde(default)]
    pub required: bool,
}

impl Operator {
    pub fn new(statement: Statement) -> Self {
        Self {
            statement,
            comparison_types: Vec::new(),
            required: false,
        }
    }

    pub fn comparing(mut self, comparison: ComparisonType) -> Self {
        self.comparison_types.push(comparison);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Operand shapes of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonType {
    /// `column <op> constant`
    VariableConstant = 1,
    /// `column <op> column`
    VariableVariable = 2,
}

/// Statements and operators a connector may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    Where = 1,
    Limit = 2,
    Offset = 3,
    Order = 4,
    LeftJoin = 5,
    RightJoin = 6,
    InnerJoin = 7,
    OuterJoin = 8,
    Equal = 9,
    NotEqual = 10,
    In = 11,
    NotIn = 12,
    GreaterThan = 13,
    GreaterOrEqualThan = 14,
    LessThan = 15,
    LessOrEqualThan = 16,
    Like = 17,
    NotLike = 18,
    ILike = 19,
    NotILike = 20,
    RegMatch = 21,
    NotRegMatch = 22,
    RegIMatch = 23,
    NotRegIMatch = 24,
    IsDistinctFrom = 25,
    IsNotDistinctFrom = 26,
    Any = 27,
    All = 28,
    Binary = 29,
}

impl Statement {
    /// Numeric code of the statement on the wire.
    pub const fn code(self) -> i32 {
        self as i32
    }
}
