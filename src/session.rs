//! Form session state machine.
//!
//! A [`FormSession`] owns one form document and drives the edit → resolve →
//! validate → render cycle. Every change recomputes the effective schema and
//! the error list from scratch.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::path::FieldPath;
use crate::resolver;
use crate::schema::document::to_json_schema;
use crate::schema::{ArrayNode, SchemaNode};
use crate::validator::{self, ValidationError};
use crate::value::{DataValue, PathError};

/// Called with the final document when a submission is accepted
pub type AcceptHook = Arc<dyn Fn(&DataValue) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Editing,
    Submitting,
    Accepted,
    Cancelled,
}

impl SessionState {
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Accepted | SessionState::Cancelled)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Editing => "editing",
            SessionState::Submitting => "submitting",
            SessionState::Accepted => "accepted",
            SessionState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("session is {0} and accepts no further changes")]
    Closed(SessionState),

    #[error("{path} is not a repeating group")]
    NotARepeatingGroup { path: FieldPath },

    #[error("cannot {operation} entries of {path}")]
    GroupOperationNotAllowed {
        path: FieldPath,
        operation: &'static str,
    },

    #[error("unknown form tab: {0}")]
    UnknownTab(String),
}

/// What the rendering layer needs after a change
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub effective_schema: SchemaNode,
    pub errors: Vec<ValidationError>,
}

impl Snapshot {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// `{ effectiveSchema, errors }` with the schema rendered as JSON Schema
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "effectiveSchema": to_json_schema(&self.effective_schema),
            "errors": self.errors,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Accepted(DataValue),
    Rejected(Vec<ValidationError>),
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted(_))
    }
}

/// One editing session over a single form.
pub struct FormSession {
    schema: SchemaNode,
    data: DataValue,
    state: SessionState,
    snapshot: Snapshot,
    on_accept: Option<AcceptHook>,
}

impl fmt::Debug for FormSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSession")
            .field("data", &self.data)
            .field("state", &self.state)
            .field("errors", &self.snapshot.errors.len())
            .finish_non_exhaustive()
    }
}

impl FormSession {
    /// Open a session on an empty document.
    pub fn new(schema: SchemaNode) -> Self {
        let data = schema.empty_value();
        Self::with_data(schema, data)
    }

    /// Open a session on existing data, e.g. a saved draft.
    pub fn with_data(schema: SchemaNode, data: DataValue) -> Self {
        let snapshot = compute(&schema, &data);
        Self {
            schema,
            data,
            state: SessionState::Editing,
            snapshot,
            on_accept: None,
        }
    }

    pub fn on_accept(mut self, hook: AcceptHook) -> Self {
        self.on_accept = Some(hook);
        self
    }

    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    pub fn data(&self) -> &DataValue {
        &self.data
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Effective schema of the field at `path` for the current data.
    pub fn effective_schema_at(&self, path: &FieldPath) -> Option<SchemaNode> {
        resolver::effective_at(&self.schema, &self.data, path)
    }

    /// Replace the value at `path`.
    pub fn edit(&mut self, path: &FieldPath, value: DataValue) -> Result<Snapshot, SessionError> {
        self.ensure_open()?;
        debug!("Editing {}", path);
        let data = self.data.with_value_at(path, value)?;
        Ok(self.commit(data))
    }

    /// Validate the whole document and accept it when clean.
    pub fn submit(&mut self) -> Result<SubmitOutcome, SessionError> {
        self.ensure_open()?;
        self.state = SessionState::Submitting;

        let errors = validator::validate_document(&self.schema, &self.data);
        if errors.is_empty() {
            self.state = SessionState::Accepted;
            info!("Form submission accepted");
            if let Some(hook) = &self.on_accept {
                hook(&self.data);
            }
            return Ok(SubmitOutcome::Accepted(self.data.clone()));
        }

        info!("Form submission rejected with {} errors", errors.len());
        self.state = SessionState::Editing;
        self.snapshot.errors = errors.clone();
        Ok(SubmitOutcome::Rejected(errors))
    }

    /// Discard all input. The session cannot be reused afterwards.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.data = self.schema.empty_value();
        self.snapshot = compute(&self.schema, &self.data);
        self.state = SessionState::Cancelled;
        info!("Form session cancelled");
        Ok(())
    }

    /// Append an empty entry to the repeating group at `path`.
    pub fn add_item(&mut self, path: &FieldPath) -> Result<Snapshot, SessionError> {
        self.ensure_open()?;
        let group = self.group_at(path)?;
        if !group.options().addable {
            return Err(SessionError::GroupOperationNotAllowed {
                path: path.clone(),
                operation: "add",
            });
        }

        let entry = group.items().empty_value();
        let data = self.data.with_array_at(path, |items| {
            items.push(entry);
            Ok(())
        })?;
        debug!("Added entry to {}", path);
        Ok(self.commit(data))
    }

    /// Remove entry `index` of the repeating group at `path`.
    pub fn remove_item(&mut self, path: &FieldPath, index: usize) -> Result<Snapshot, SessionError> {
        self.ensure_open()?;
        let group = self.group_at(path)?;
        if !group.options().removable {
            return Err(SessionError::GroupOperationNotAllowed {
                path: path.clone(),
                operation: "remove",
            });
        }

        let data = self.data.with_array_at(path, |items| {
            check_index(path, index, items.len())?;
            items.remove(index);
            Ok(())
        })?;
        debug!("Removed entry {} from {}", index, path);
        Ok(self.commit(data))
    }

    /// Move entry `from` of the repeating group at `path` to position `to`.
    pub fn move_item(&mut self, path: &FieldPath, from: usize, to: usize) -> Result<Snapshot, SessionError> {
        self.ensure_open()?;
        let group = self.group_at(path)?;
        if !group.options().orderable {
            return Err(SessionError::GroupOperationNotAllowed {
                path: path.clone(),
                operation: "reorder",
            });
        }

        let data = self.data.with_array_at(path, |items| {
            check_index(path, from, items.len())?;
            check_index(path, to, items.len())?;
            let entry = items.remove(from);
            items.insert(to, entry);
            Ok(())
        })?;
        debug!("Moved entry {} to {} in {}", from, to, path);
        Ok(self.commit(data))
    }

    /// Apply a recorded event; submissions report their outcome.
    pub fn apply(&mut self, event: &SessionEvent) -> Result<Option<SubmitOutcome>, SessionError> {
        match event {
            SessionEvent::Edit { path, value } => {
                self.edit(&FieldPath::parse(path)?, value.clone())?;
            }
            SessionEvent::AddItem { path } => {
                self.add_item(&FieldPath::parse(path)?)?;
            }
            SessionEvent::RemoveItem { path, index } => {
                self.remove_item(&FieldPath::parse(path)?, *index)?;
            }
            SessionEvent::MoveItem { path, from, to } => {
                self.move_item(&FieldPath::parse(path)?, *from, *to)?;
            }
            SessionEvent::Submit => return self.submit().map(Some),
            SessionEvent::Cancel => self.cancel()?,
        }
        Ok(None)
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.state.is_closed() {
            return Err(SessionError::Closed(self.state));
        }
        Ok(())
    }

    fn group_at(&self, path: &FieldPath) -> Result<ArrayNode, SessionError> {
        match self.effective_schema_at(path) {
            Some(SchemaNode::Array(array)) => Ok(array),
            _ => Err(SessionError::NotARepeatingGroup { path: path.clone() }),
        }
    }

    fn commit(&mut self, data: DataValue) -> Snapshot {
        self.data = data;
        self.state = SessionState::Editing;
        self.snapshot = compute(&self.schema, &self.data);
        self.snapshot.clone()
    }
}

fn compute(schema: &SchemaNode, data: &DataValue) -> Snapshot {
    let effective_schema = resolver::effective_schema(schema, data);
    let errors = validator::validate_document(schema, data);
    debug!("Recomputed form: {} errors", errors.len());
    Snapshot {
        effective_schema,
        errors,
    }
}

fn check_index(path: &FieldPath, index: usize, len: usize) -> Result<(), PathError> {
    if index >= len {
        return Err(PathError::IndexOutOfRange {
            path: path.clone(),
            index,
            len,
        });
    }
    Ok(())
}

/// A recorded user action, as read from an event log
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SessionEvent {
    Edit {
        #[serde(default)]
        path: String,
        #[serde(default)]
        value: DataValue,
    },
    AddItem {
        path: String,
    },
    RemoveItem {
        path: String,
        index: usize,
    },
    MoveItem {
        path: String,
        from: usize,
        to: usize,
    },
    Submit,
    Cancel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DependencyBuilder, GroupOptions, ObjectBuilder, Predicate};
    use crate::validator::ErrorKind;
    use serde_json::json;
    use std::sync::Mutex;

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn schema() -> SchemaNode {
        ObjectBuilder::new()
            .property("score", SchemaNode::number())
            .property("name", SchemaNode::string())
            .property(
                "members",
                SchemaNode::array(ObjectBuilder::new().property("name", SchemaNode::string()).required(["name"]))
                    .min_items(1),
            )
            .property(
                "fixed",
                SchemaNode::array(SchemaNode::string()).options(GroupOptions {
                    addable: false,
                    removable: false,
                    orderable: false,
                }),
            )
            .required(["name"])
            .dependency(
                DependencyBuilder::on("score")
                    .branch(Predicate::at_least(10.0), ObjectBuilder::new())
                    .branch(Predicate::at_most(9.0), ObjectBuilder::new().required(["members"])),
            )
            .build()
            .unwrap()
            .into()
    }

    fn kinds(errors: &[ValidationError]) -> Vec<(String, ErrorKind)> {
        errors.iter().map(|e| (e.field_path.to_string(), e.kind)).collect()
    }

    #[test]
    fn test_new_session_starts_editing_on_empty_object() {
        let session = FormSession::new(schema());
        assert_eq!(session.state(), SessionState::Editing);
        assert_eq!(session.data(), &DataValue::empty_object());
        assert_eq!(kinds(&session.snapshot().errors), vec![("name".to_string(), ErrorKind::MissingRequired)]);
    }

    #[test]
    fn test_edit_switches_branch() {
        let mut session = FormSession::new(schema());
        let snapshot = session.edit(&path("score"), DataValue::from(5.0)).unwrap();
        assert!(snapshot.effective_schema.is_required("members"));

        let snapshot = session.edit(&path("score"), DataValue::from(50.0)).unwrap();
        assert!(!snapshot.effective_schema.is_required("members"));
    }

    #[test]
    fn test_edit_round_trip_restores_snapshot() {
        let mut session = FormSession::new(schema());
        let before = session.edit(&path("score"), DataValue::from(20.0)).unwrap();
        session.edit(&path("score"), DataValue::from(3.0)).unwrap();
        let after = session.edit(&path("score"), DataValue::from(20.0)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_edit_through_primitive_is_session_error() {
        let mut session = FormSession::new(schema());
        session.edit(&path("name"), "x".into()).unwrap();
        let err = session.edit(&path("name.first"), "y".into()).unwrap_err();
        assert!(matches!(err, SessionError::Path(PathError::NotAnObject { .. })));
        assert_eq!(session.data().get("name"), Some(&DataValue::from("x")));
    }

    #[test]
    fn test_group_operations() {
        let mut session = FormSession::new(schema());
        session.add_item(&path("members")).unwrap();
        session.edit(&path("members[0].name"), "a".into()).unwrap();
        session.add_item(&path("members")).unwrap();
        session.edit(&path("members[1].name"), "b".into()).unwrap();

        session.move_item(&path("members"), 1, 0).unwrap();
        assert_eq!(session.data().get_path(&path("members[0].name")), Some(&DataValue::from("b")));

        let snapshot = session.remove_item(&path("members"), 0).unwrap();
        assert!(snapshot.errors.iter().all(|e| e.field_path.to_string() != "members"));
        assert_eq!(session.data().get_path(&path("members[0].name")), Some(&DataValue::from("a")));
    }

    #[test]
    fn test_remove_below_min_items_reports_too_few() {
        let mut session = FormSession::new(schema());
        session.add_item(&path("members")).unwrap();
        let snapshot = session.remove_item(&path("members"), 0).unwrap();
        assert!(kinds(&snapshot.errors).contains(&("members".to_string(), ErrorKind::TooFewItems)));
    }

    #[test]
    fn test_group_misuse() {
        let mut session = FormSession::new(schema());
        assert!(matches!(
            session.add_item(&path("name")),
            Err(SessionError::NotARepeatingGroup { .. })
        ));
        assert!(matches!(
            session.remove_item(&path("members"), 3),
            Err(SessionError::Path(PathError::IndexOutOfRange { index: 3, len: 0, .. }))
        ));
        assert!(matches!(
            session.add_item(&path("fixed")),
            Err(SessionError::GroupOperationNotAllowed { operation: "add", .. })
        ));
    }

    #[test]
    fn test_submit_rejected_keeps_data_and_is_idempotent() {
        let mut session = FormSession::new(schema());
        session.edit(&path("score"), DataValue::from(3.0)).unwrap();

        let first = session.submit().unwrap();
        let second = session.submit().unwrap();
        assert!(!first.is_accepted());
        assert_eq!(first, second);
        assert_eq!(session.state(), SessionState::Editing);
        assert_eq!(session.data().get("score"), Some(&DataValue::from(3.0)));
    }

    #[test]
    fn test_submit_accepted_calls_hook_and_closes() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let mut session = FormSession::new(schema()).on_accept(Arc::new(move |data: &DataValue| {
            *sink.lock().unwrap() = Some(data.clone());
        }));
        session.edit(&path("name"), "Asha".into()).unwrap();

        let outcome = session.submit().unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(session.state(), SessionState::Accepted);
        assert_eq!(seen.lock().unwrap().as_ref(), Some(session.data()));
        assert!(matches!(
            session.edit(&path("name"), "x".into()),
            Err(SessionError::Closed(SessionState::Accepted))
        ));
    }

    #[test]
    fn test_cancel_discards_and_is_terminal() {
        let mut session = FormSession::new(schema());
        session.edit(&path("name"), "Asha".into()).unwrap();
        session.cancel().unwrap();

        assert_eq!(session.state(), SessionState::Cancelled);
        assert_eq!(session.data(), &DataValue::empty_object());
        assert!(matches!(session.submit(), Err(SessionError::Closed(SessionState::Cancelled))));
        assert!(session.cancel().is_err());
    }

    #[test]
    fn test_apply_events() {
        let events: Vec<SessionEvent> = serde_json::from_value(json!([
            {"op": "edit", "path": "name", "value": "Asha"},
            {"op": "add_item", "path": "members"},
            {"op": "edit", "path": "members[0].name", "value": "Ravi"},
            {"op": "submit"}
        ]))
        .unwrap();

        let mut session = FormSession::new(schema());
        let outcomes: Vec<_> = events.iter().map(|e| session.apply(e).unwrap()).collect();
        assert!(outcomes[..3].iter().all(Option::is_none));
        assert!(matches!(outcomes[3], Some(SubmitOutcome::Accepted(_))));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let session = FormSession::new(schema());
        let json = session.snapshot().to_json();
        assert_eq!(json["effectiveSchema"]["type"], "object");
        assert_eq!(json["errors"][0]["kind"], "missing_required");
    }
}
