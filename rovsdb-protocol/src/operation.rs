//! Transaction operations and their typed results.
//!
//! Requests carry a discriminated union of operations (the `op` member
//! selects the kind); replies carry result objects with no discriminator at
//! all, so results are decoded structurally by which member is present.

use crate::error::ProtocolError;
use crate::value::{Atom, Row, Value};
use serde::{Serialize, Serializer};
use serde_json::Value as Json;
use uuid::Uuid;

/// Comparison function of a condition clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Function {
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "includes")]
    Includes,
    #[serde(rename = "excludes")]
    Excludes,
}

/// A `[column, function, value]` clause.
///
/// An operation's `where` array ANDs its clauses; an empty array matches
/// every row.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub function: Function,
    pub value: Value,
}

impl Condition {
    pub fn new(
        column: impl Into<String>,
        function: Function,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            column: column.into(),
            function,
            value: value.into(),
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.column, &self.function, &self.value).serialize(serializer)
    }
}

/// In-place arithmetic or collection edit applied by a mutate operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mutator {
    #[serde(rename = "+=")]
    Add,
    #[serde(rename = "-=")]
    Subtract,
    #[serde(rename = "*=")]
    Multiply,
    #[serde(rename = "/=")]
    Divide,
    #[serde(rename = "%=")]
    Remainder,
    #[serde(rename = "insert")]
    Insert,
    #[serde(rename = "delete")]
    Delete,
}

/// A `[column, mutator, value]` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub column: String,
    pub mutator: Mutator,
    pub value: Value,
}

impl Mutation {
    pub fn new(
        column: impl Into<String>,
        mutator: Mutator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            column: column.into(),
            mutator,
            value: value.into(),
        }
    }
}

impl Serialize for Mutation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.column, &self.mutator, &self.value).serialize(serializer)
    }
}

/// Predicate of a wait operation: the selected rows must equal (or must
/// not equal) the expected rows before the transaction may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WaitUntil {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

/// One element of a transact request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    Insert {
        table: String,
        row: Row,
        /// Names the new row so later operations in the same transaction
        /// can reference it via a named-uuid atom.
        #[serde(rename = "uuid-name", skip_serializing_if = "Option::is_none")]
        uuid_name: Option<String>,
    },
    Select {
        table: String,
        #[serde(rename = "where")]
        clauses: Vec<Condition>,
        /// Restricts the returned rows to these columns; `None` returns all.
        #[serde(skip_serializing_if = "Option::is_none")]
        columns: Option<Vec<String>>,
    },
    Update {
        table: String,
        #[serde(rename = "where")]
        clauses: Vec<Condition>,
        row: Row,
    },
    Mutate {
        table: String,
        #[serde(rename = "where")]
        clauses: Vec<Condition>,
        mutations: Vec<Mutation>,
    },
    Delete {
        table: String,
        #[serde(rename = "where")]
        clauses: Vec<Condition>,
    },
    Wait {
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
        table: String,
        #[serde(rename = "where")]
        clauses: Vec<Condition>,
        columns: Vec<String>,
        until: WaitUntil,
        rows: Vec<Row>,
    },
    Commit {
        durable: bool,
    },
    Abort,
    Comment {
        comment: String,
    },
    Assert {
        lock: String,
    },
}

impl Operation {
    pub fn insert(table: impl Into<String>, row: Row) -> Self {
        Operation::Insert {
            table: table.into(),
            row,
            uuid_name: None,
        }
    }

    pub fn insert_named(
        table: impl Into<String>,
        row: Row,
        uuid_name: impl Into<String>,
    ) -> Self {
        Operation::Insert {
            table: table.into(),
            row,
            uuid_name: Some(uuid_name.into()),
        }
    }

    pub fn select(table: impl Into<String>, clauses: Vec<Condition>) -> Self {
        Operation::Select {
            table: table.into(),
            clauses,
            columns: None,
        }
    }

    pub fn update(table: impl Into<String>, clauses: Vec<Condition>, row: Row) -> Self {
        Operation::Update {
            table: table.into(),
            clauses,
            row,
        }
    }

    pub fn mutate(
        table: impl Into<String>,
        clauses: Vec<Condition>,
        mutations: Vec<Mutation>,
    ) -> Self {
        Operation::Mutate {
            table: table.into(),
            clauses,
            mutations,
        }
    }

    pub fn delete(table: impl Into<String>, clauses: Vec<Condition>) -> Self {
        Operation::Delete {
            table: table.into(),
            clauses,
        }
    }

    pub fn commit(durable: bool) -> Self {
        Operation::Commit { durable }
    }

    pub fn comment(comment: impl Into<String>) -> Self {
        Operation::Comment {
            comment: comment.into(),
        }
    }

    pub fn assert_lock(lock: impl Into<String>) -> Self {
        Operation::Assert { lock: lock.into() }
    }

    /// The wire name of this operation, for diagnostics.
    pub fn op_name(&self) -> &'static str {
        match self {
            Operation::Insert { .. } => "insert",
            Operation::Select { .. } => "select",
            Operation::Update { .. } => "update",
            Operation::Mutate { .. } => "mutate",
            Operation::Delete { .. } => "delete",
            Operation::Wait { .. } => "wait",
            Operation::Commit { .. } => "commit",
            Operation::Abort => "abort",
            Operation::Comment { .. } => "comment",
            Operation::Assert { .. } => "assert",
        }
    }
}

/// The per-operation element of a transact reply.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    /// An insert succeeded; carries the real UUID assigned to the new row.
    Insert { uuid: Uuid },
    /// A select succeeded; carries the matching rows.
    Select { rows: Vec<Row> },
    /// An update, mutate, or delete succeeded; carries the affected count.
    Update { count: u64 },
    /// An operation with no payload succeeded, or the operation was never
    /// attempted because an earlier one failed.
    Empty,
    /// The operation (or the transaction as a whole) failed.
    Error {
        error: String,
        details: Option<String>,
    },
}

impl OperationResult {
    /// Decodes one result object by member presence, probing in a fixed
    /// order: `rows`, then `count`, then `uuid`, then `error`, then the
    /// empty object.
    ///
    /// JSON `null` also decodes as [`OperationResult::Empty`]: servers pad
    /// the reply of a failed transaction with nulls for the operations
    /// they never attempted.
    pub fn from_json(json: &Json) -> Result<Self, ProtocolError> {
        if json.is_null() {
            return Ok(OperationResult::Empty);
        }
        let obj = json.as_object().ok_or_else(|| {
            ProtocolError::InvalidResult(format!("not an object: {json}"))
        })?;
        if let Some(rows) = obj.get("rows") {
            let rows = rows
                .as_array()
                .ok_or_else(|| {
                    ProtocolError::InvalidResult(format!("rows is not an array: {rows}"))
                })?
                .iter()
                .map(Row::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ProtocolError::InvalidResult(e.to_string()))?;
            return Ok(OperationResult::Select { rows });
        }
        if let Some(count) = obj.get("count") {
            let count = count.as_u64().ok_or_else(|| {
                ProtocolError::InvalidResult(format!(
                    "count is not an unsigned integer: {count}"
                ))
            })?;
            return Ok(OperationResult::Update { count });
        }
        if let Some(uuid) = obj.get("uuid") {
            match Atom::from_json(uuid) {
                Ok(Atom::Uuid(uuid)) => return Ok(OperationResult::Insert { uuid }),
                _ => {
                    return Err(ProtocolError::InvalidResult(format!(
                        "uuid is not a uuid atom: {uuid}"
                    )))
                }
            }
        }
        if let Some(error) = obj.get("error") {
            let error = error
                .as_str()
                .ok_or_else(|| {
                    ProtocolError::InvalidResult(format!(
                        "error is not a string: {error}"
                    ))
                })?
                .to_string();
            let details = obj.get("details").and_then(Json::as_str).map(String::from);
            return Ok(OperationResult::Error { error, details });
        }
        if obj.is_empty() {
            return Ok(OperationResult::Empty);
        }
        Err(ProtocolError::InvalidResult(format!(
            "unrecognized result shape: {json}"
        )))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, OperationResult::Error { .. })
    }
}

/// Decodes a transact reply positionally: `results[i]` answers the i-th
/// operation of the request.
///
/// Servers may append extra elements past the operation count to describe
/// a failure of the transaction as a whole; those decode too and land at
/// the tail of the returned vector.
pub fn decode_transact_reply(
    results: &Json,
    operations: usize,
) -> Result<Vec<OperationResult>, ProtocolError> {
    let items = results.as_array().ok_or_else(|| {
        ProtocolError::InvalidResult(format!("transact reply is not an array: {results}"))
    })?;
    if items.len() < operations {
        return Err(ProtocolError::InvalidResult(format!(
            "{} results for {} operations",
            items.len(),
            operations
        )));
    }
    items.iter().map(OperationResult::from_json).collect()
}
