//! Reconciliation of pushed entity events into live collections.
//!
//! A [`ReconciliationBinder`] attaches one listener per event stream of an
//! entity type and applies a merge rule to the matching target
//! collection:
//! - created: prepend unless the key is already present
//! - updated: shallow-merge into the matching item unless deep-equal
//! - deleted: remove the matching item if present
//!
//! Every rule writes by replacing the whole snapshot, and every no-op
//! branch is silent apart from logging, so duplicated delivery never
//! changes a collection twice or notifies twice.
//!
//! # Example
//!
//! ```ignore
//! let roles = Collection::new();
//! binder.bind(
//!     "role",
//!     &["created", "updated", "deleted"],
//!     FieldShape::new("role_id"),
//!     Targets::shared(&roles),
//! )?;
//!
//! for snapshot in roles.changes() {
//!     render(&snapshot);
//! }
//! ```

mod binder;
mod collection;
mod rules;
mod shape;

pub use binder::{NotifyPolicy, ReconciliationBinder, Targets};
pub use collection::{Collection, Snapshot};
pub use rules::{apply_created, apply_deleted, apply_updated, NoChange, Reconciled};
pub use shape::{unwrap_entity, EntityShape, FieldShape};
