use crate::records::{Record, RecordFields};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A field overwrite for an existing row, matched by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    /// Identity of the row to overwrite
    pub id: i64,

    /// Full normalized field set; the store replaces all four columns
    pub data: RecordFields,
}

/// The three disjoint operation lists produced by diffing two snapshots
///
/// Dispatch order is fixed: every update, then every insert, then every
/// delete. Updates and inserts keep the row order of the current snapshot;
/// deletes keep the row order of the original snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcilePlan {
    pub updates: Vec<RecordUpdate>,
    pub inserts: Vec<RecordFields>,
    pub deletes: Vec<i64>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty() && self.deletes.is_empty()
    }
}

/// Compute the operations that converge `original` onto `current`
///
/// Rows are matched by id. A row of `current` with no id, or with an id the
/// original snapshot never held, is an insert. A matched row is an update
/// exactly when any tracked field differs after normalization. An id of
/// `original` that no row of `current` carries is a delete.
///
/// The diff is only meaningful against the most recent snapshot; staleness
/// is not detected here or anywhere else.
pub fn diff(original: &[Record], current: &[Record]) -> ReconcilePlan {
    let before: HashMap<i64, &Record> = original
        .iter()
        .filter_map(|row| row.id.map(|id| (id, row)))
        .collect();
    let current_ids: HashSet<i64> = current.iter().filter_map(|row| row.id).collect();

    let mut plan = ReconcilePlan::default();

    for row in current {
        let matched = row.id.and_then(|id| before.get(&id).map(|prev| (id, *prev)));
        match matched {
            Some((id, prev)) => {
                let after = row.fields.normalized();
                if prev.fields.normalized() != after {
                    plan.updates.push(RecordUpdate { id, data: after });
                }
            }
            // No id, or an id the snapshot never held: both are inserts.
            None => plan.inserts.push(row.fields.normalized()),
        }
    }

    for row in original {
        if let Some(id) = row.id {
            if !current_ids.contains(&id) {
                plan.deletes.push(id);
            }
        }
    }

    plan
}

/// Receiver of reconciliation operations
///
/// The server-side store implements this directly; the browser client speaks
/// the same protocol over the HTTP endpoints (`PUT /data/{id}`,
/// `POST /data`, `DELETE /data/{id}`).
pub trait RecordSink {
    fn apply_update(&self, id: i64, data: &RecordFields) -> Result<(), String>;
    fn apply_insert(&self, data: &RecordFields) -> Result<i64, String>;
    fn apply_delete(&self, id: i64) -> Result<(), String>;
}

/// Operations applied by a (possibly aborted) dispatch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub updated: usize,

    /// Ids the sink assigned to the dispatched inserts, in dispatch order
    pub inserted: Vec<i64>,

    pub deleted: usize,
}

/// A dispatch aborted partway through
///
/// Everything recorded in `applied` stayed applied; there is no rollback.
/// The remaining operations of the plan were never attempted.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchError {
    pub message: String,
    pub applied: DispatchReport,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reconciliation aborted: {}", self.message)
    }
}

impl std::error::Error for DispatchError {}

/// Dispatch a plan against a sink, one operation per call
///
/// Order is updates, then inserts, then deletes. The first failure aborts
/// the remaining batch; completed operations are left applied.
pub fn dispatch<S: RecordSink>(
    plan: &ReconcilePlan,
    sink: &S,
) -> Result<DispatchReport, DispatchError> {
    let mut report = DispatchReport::default();

    for update in &plan.updates {
        if let Err(message) = sink.apply_update(update.id, &update.data) {
            return Err(DispatchError {
                message,
                applied: report,
            });
        }
        report.updated += 1;
    }

    for fields in &plan.inserts {
        match sink.apply_insert(fields) {
            Ok(id) => report.inserted.push(id),
            Err(message) => {
                return Err(DispatchError {
                    message,
                    applied: report,
                });
            }
        }
    }

    for &id in &plan.deletes {
        if let Err(message) = sink.apply_delete(id) {
            return Err(DispatchError {
                message,
                applied: report,
            });
        }
        report.deleted += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn fields(name: &str, age: Option<i64>, email: &str, department: &str) -> RecordFields {
        RecordFields {
            name: name.to_string(),
            age,
            email: email.to_string(),
            department: department.to_string(),
        }
    }

    fn row(id: Option<i64>, name: &str, age: Option<i64>) -> Record {
        Record {
            id,
            fields: fields(name, age, &format!("{}@example.com", name.to_lowercase()), "Engineering"),
        }
    }

    #[test]
    fn changed_field_yields_single_update() {
        let original = vec![row(Some(1), "A", Some(30))];
        let mut current = original.clone();
        current[0].fields.name = "B".to_string();

        let plan = diff(&original, &current);
        assert_eq!(plan.inserts, vec![]);
        assert_eq!(plan.deletes, Vec::<i64>::new());
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].id, 1);
        assert_eq!(plan.updates[0].data.name, "B");
        assert_eq!(plan.updates[0].data.age, Some(30));
    }

    #[test]
    fn removed_row_yields_delete() {
        let original = vec![row(Some(1), "A", Some(30))];
        let plan = diff(&original, &[]);
        assert!(plan.updates.is_empty());
        assert!(plan.inserts.is_empty());
        assert_eq!(plan.deletes, vec![1]);
    }

    #[test]
    fn row_without_id_is_always_an_insert() {
        let plan = diff(&[], &[row(None, "X", None)]);
        assert!(plan.updates.is_empty());
        assert!(plan.deletes.is_empty());
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].name, "X");
    }

    #[test]
    fn unknown_id_is_treated_as_insert() {
        let original = vec![row(Some(1), "A", Some(30))];
        let current = vec![row(Some(1), "A", Some(30)), row(Some(99), "Ghost", None)];

        let plan = diff(&original, &current);
        assert!(plan.updates.is_empty());
        assert!(plan.deletes.is_empty());
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].name, "Ghost");
    }

    #[test]
    fn identical_snapshots_yield_empty_plan() {
        let original = vec![row(Some(1), "A", Some(30)), row(Some(2), "B", None)];
        let plan = diff(&original, &original.clone());
        assert!(plan.is_empty());
    }

    #[test]
    fn whitespace_differences_do_not_count_as_updates() {
        let original = vec![row(Some(1), "A", Some(30))];
        let mut current = original.clone();
        current[0].fields.name = "  A ".to_string();

        assert!(diff(&original, &current).is_empty());
    }

    #[test]
    fn deletes_are_complete_and_disjoint_from_current() {
        let original = vec![
            row(Some(1), "A", Some(30)),
            row(Some(2), "B", Some(28)),
            row(Some(3), "C", Some(45)),
            row(None, "Pending", None),
        ];
        let current = vec![row(Some(2), "B", Some(28)), row(None, "New", None)];

        let plan = diff(&original, &current);
        let current_ids: HashSet<i64> = current.iter().filter_map(|r| r.id).collect();
        let original_ids: HashSet<i64> = original.iter().filter_map(|r| r.id).collect();

        for id in &plan.deletes {
            assert!(original_ids.contains(id));
            assert!(!current_ids.contains(id));
        }
        // Completeness: every vanished id is in the delete list.
        for id in original_ids {
            if !current_ids.contains(&id) {
                assert!(plan.deletes.contains(&id));
            }
        }
        assert_eq!(plan.deletes, vec![1, 3]);
    }

    /// Sink that records the order of every call and fails on request
    struct ScriptedSink {
        calls: RefCell<Vec<String>>,
        fail_on: Option<String>,
        next_id: RefCell<i64>,
    }

    impl ScriptedSink {
        fn new(fail_on: Option<&str>) -> Self {
            ScriptedSink {
                calls: RefCell::new(Vec::new()),
                fail_on: fail_on.map(|s| s.to_string()),
                next_id: RefCell::new(100),
            }
        }

        fn record(&self, call: String) -> Result<(), String> {
            if self.fail_on.as_deref() == Some(call.as_str()) {
                return Err(format!("scripted failure at {call}"));
            }
            self.calls.borrow_mut().push(call);
            Ok(())
        }
    }

    impl RecordSink for ScriptedSink {
        fn apply_update(&self, id: i64, _data: &RecordFields) -> Result<(), String> {
            self.record(format!("update {id}"))
        }

        fn apply_insert(&self, data: &RecordFields) -> Result<i64, String> {
            self.record(format!("insert {}", data.name))?;
            let mut next = self.next_id.borrow_mut();
            *next += 1;
            Ok(*next)
        }

        fn apply_delete(&self, id: i64) -> Result<(), String> {
            self.record(format!("delete {id}"))
        }
    }

    fn mixed_plan() -> ReconcilePlan {
        ReconcilePlan {
            updates: vec![
                RecordUpdate {
                    id: 1,
                    data: fields("A", Some(31), "a@example.com", "Engineering"),
                },
                RecordUpdate {
                    id: 2,
                    data: fields("B", None, "b@example.com", "Design"),
                },
            ],
            inserts: vec![fields("New", None, "new@example.com", "Sales")],
            deletes: vec![3, 4],
        }
    }

    #[test]
    fn dispatch_runs_updates_then_inserts_then_deletes() {
        let sink = ScriptedSink::new(None);
        let report = dispatch(&mixed_plan(), &sink).unwrap();

        assert_eq!(
            *sink.calls.borrow(),
            vec!["update 1", "update 2", "insert New", "delete 3", "delete 4"]
        );
        assert_eq!(report.updated, 2);
        assert_eq!(report.inserted, vec![101]);
        assert_eq!(report.deleted, 2);
    }

    #[test]
    fn dispatch_aborts_on_first_failure_and_keeps_earlier_operations() {
        let sink = ScriptedSink::new(Some("delete 3"));
        let err = dispatch(&mixed_plan(), &sink).unwrap_err();

        // Updates and inserts went through, the second delete was never tried.
        assert_eq!(
            *sink.calls.borrow(),
            vec!["update 1", "update 2", "insert New"]
        );
        assert_eq!(err.applied.updated, 2);
        assert_eq!(err.applied.inserted, vec![101]);
        assert_eq!(err.applied.deleted, 0);
        assert!(err.message.contains("delete 3"));
    }

    #[test]
    fn dispatch_abort_during_updates_skips_inserts_and_deletes() {
        let sink = ScriptedSink::new(Some("update 2"));
        let err = dispatch(&mixed_plan(), &sink).unwrap_err();

        assert_eq!(*sink.calls.borrow(), vec!["update 1"]);
        assert_eq!(err.applied.updated, 1);
        assert!(err.applied.inserted.is_empty());
    }
}
