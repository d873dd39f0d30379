//! Tenant isolation and role permissions.
//!
//! - `guard` - Pure tenant-equality predicate applied before anything else
//! - `role` - Role hierarchy, permissions and the acting context

pub mod guard;
pub mod role;

#[cfg(test)]
mod guard_props;

pub use guard::{Access, DenialReason, authorize, ensure_access};
pub use role::{ActingContext, Permission, Role};
