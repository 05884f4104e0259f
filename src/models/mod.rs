//! Database entity models.

pub mod access_request;
pub mod audit_log;
pub mod group;
pub mod permission;
pub mod role;
pub mod tool;
pub mod user;

/// Overlay an optional patch value onto a field.
///
/// Patch structs of optional fields use this instead of assembling UPDATE
/// column lists dynamically: the current row is fetched, patched, and written
/// back in full.
pub(crate) fn merge<T>(field: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *field = v;
    }
}
