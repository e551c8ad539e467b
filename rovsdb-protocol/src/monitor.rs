//! Monitor and lock wire types.

use crate::value::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Selects which kinds of change a monitor reports for one table.
///
/// Members left unset fall back to the server default, which is to report
/// that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MonitorSelect {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modify: Option<bool>,
}

/// Per-table monitor parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MonitorRequest {
    /// Columns to report; `None` reports every column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<MonitorSelect>,
}

impl MonitorRequest {
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_select(mut self, select: MonitorSelect) -> Self {
        self.select = Some(select);
        self
    }
}

/// The table-name → request map sent with a monitor call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct MonitorRequests(pub BTreeMap<String, MonitorRequest>);

impl MonitorRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: impl Into<String>, request: MonitorRequest) -> Self {
        self.0.insert(table.into(), request);
        self
    }
}

/// One row's change within an update notification.
///
/// `old` alone is a delete, `new` alone is an insert (or an initial row),
/// both together are a modify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RowUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Row>,
    #[serde(rename = "new", skip_serializing_if = "Option::is_none")]
    pub new_row: Option<Row>,
}

impl RowUpdate {
    pub fn is_insert(&self) -> bool {
        self.old.is_none() && self.new_row.is_some()
    }

    pub fn is_delete(&self) -> bool {
        self.old.is_some() && self.new_row.is_none()
    }

    pub fn is_modify(&self) -> bool {
        self.old.is_some() && self.new_row.is_some()
    }
}

/// Changes to one table, keyed by row UUID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct TableUpdate(pub BTreeMap<Uuid, RowUpdate>);

/// Changes across tables, keyed by table name. This is both the reply to a
/// monitor call (the initial snapshot) and the payload of each subsequent
/// update notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct TableUpdates(pub BTreeMap<String, TableUpdate>);

impl TableUpdates {
    pub fn table(&self, name: &str) -> Option<&TableUpdate> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Reply to the lock and steal calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockResult {
    pub locked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_monitor_request_omits_unset_members() {
        let request = MonitorRequest::default();
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({}));

        let request = MonitorRequest::default()
            .with_columns(vec!["name".to_string()])
            .with_select(MonitorSelect {
                initial: Some(false),
                ..Default::default()
            });
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"columns": ["name"], "select": {"initial": false}})
        );
    }

    #[test]
    fn test_monitor_requests_encode_transparently() {
        let requests =
            MonitorRequests::new().with_table("Bridge", MonitorRequest::default());
        assert_eq!(
            serde_json::to_value(&requests).unwrap(),
            json!({"Bridge": {}})
        );
    }

    #[test]
    fn test_table_updates_decode() {
        let updates: TableUpdates = serde_json::from_value(json!({
            "Bridge": {
                "36bef046-7da7-43a5-905a-c17899216fcb": {
                    "new": {"name": "br0"}
                },
                "f9bf38ba-8fd0-466e-9dc8-7f0d47e2f446": {
                    "old": {"name": "br1"},
                    "new": {"name": "br1-renamed"}
                },
            }
        }))
        .unwrap();

        let bridge = updates.table("Bridge").unwrap();
        assert_eq!(bridge.0.len(), 2);

        let inserted = Uuid::parse_str("36bef046-7da7-43a5-905a-c17899216fcb").unwrap();
        assert!(bridge.0[&inserted].is_insert());

        let modified = Uuid::parse_str("f9bf38ba-8fd0-466e-9dc8-7f0d47e2f446").unwrap();
        assert!(bridge.0[&modified].is_modify());
        assert!(!bridge.0[&modified].is_delete());
    }

    #[test]
    fn test_lock_result_decode() {
        let result: LockResult = serde_json::from_value(json!({"locked": true})).unwrap();
        assert!(result.locked);
    }
}
