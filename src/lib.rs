//! Scoped value snapshots with automatic rollback.
//!
//! `snapguard` tracks the state of shared values over a lexical scope and
//! restores it when the scope ends, unless the caller accepts the changes.
//! Values live in [`Slot`]s, cheap shared handles to a single cell, and a
//! [`Scope`] snapshots each tracked slot at registration time:
//!
//! - [`Scope::track`] snapshots by cloning and compares with `PartialEq`
//! - [`Scope::track_restorable`] snapshots through the [`Restorable`]
//!   protocol for types that define their own captured state
//! - [`Scope::is_changed`] and [`Scope::diff`] inspect a target mid-scope
//! - [`Scope::accept`] lets one target keep its value, [`Scope::commit`]
//!   keeps them all, and [`Scope::exit`] (or dropping the scope) restores
//!   the rest
//!
//! Rollback runs on every exit path, including early returns and panics,
//! because the scope restores its targets on drop. Change detection is by
//! value equality: reassigning an equal value does not count as a change,
//! and unchanged targets are never written to.
//!
//! # Example
//!
//! ```
//! use snapguard::{Scope, ScopeResult, Slot};
//!
//! fn main() -> ScopeResult<()> {
//!     let listing = Slot::new(vec!["a.txt".to_string()]);
//!     let cursor = Slot::new(0usize);
//!
//!     let mut scope = Scope::named("preview");
//!     scope.track("listing", &listing)?;
//!     scope.track("cursor", &cursor)?;
//!
//!     listing.borrow_mut().push("b.txt".to_string());
//!     cursor.set(1);
//!
//!     assert!(scope.is_changed("listing")?);
//!     scope.accept("cursor")?;
//!     scope.exit()?;
//!
//!     assert_eq!(listing.get(), vec!["a.txt".to_string()]);
//!     assert_eq!(cursor.get(), 1);
//!     Ok(())
//! }
//! ```
//!
//! Scopes and slots stay on one thread: a [`Slot`] is not `Send`, so a
//! scope cannot race the code it guards.

mod error;
mod restore;
mod scope;
mod slot;

pub use error::{FailedRestore, ScopeError, ScopeResult};
pub use restore::Restorable;
pub use scope::{scoped, Scope};
pub use slot::Slot;
