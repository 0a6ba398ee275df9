//! # Loanform - conditional form schemas
//!
//! Loanform drives schema-described forms whose required fields and nested
//! sections change with the answers already given, such as the two tabs of a
//! business loan application.
//!
//! ## Features
//!
//! - **Schema model**: typed form schemas built through validating builders or
//!   parsed from JSON Schema documents with `dependencies`/`oneOf`
//! - **Branch resolution**: exactly one branch per conditional, merged into the
//!   effective schema of the enclosing object
//! - **Validation**: every field-level error collected in one pass
//! - **Sessions**: edit/submit/cancel plus add, remove and reorder of repeating
//!   groups
//! - **Tabs**: built-in business and loan forms plus tabs loaded from configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loanform::forms::FormCatalog;
//! use loanform::path::FieldPath;
//! use loanform::value::DataValue;
//!
//! fn main() -> anyhow::Result<()> {
//!     let catalog = FormCatalog::builtin()?;
//!     let mut session = catalog.get("loan").expect("built-in tab").open();
//!
//!     let snapshot = session.edit(&FieldPath::parse("creditScore")?, DataValue::from(650.0))?;
//!     assert!(snapshot.effective_schema.is_required("guarantors"));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Schema**: node types, builders and the JSON Schema dialect
//! - **Resolver / Validator**: pure functions over a schema and a document
//! - **Session / Forms**: the stateful edit cycle and the tab strip
//! - **Config / CLI**: settings, tab discovery and the `loanform` binary

pub mod cli;
pub mod commands;
pub mod config;
pub mod forms;
pub mod path;
pub mod resolver;
pub mod schema;
pub mod session;
pub mod validator;
pub mod value;

pub use path::{FieldPath, PathSegment};
pub use schema::{SchemaError, SchemaNode};
pub use session::{FormSession, SessionError, Snapshot, SubmitOutcome};
pub use validator::{ErrorKind, ValidationError};
pub use value::DataValue;
