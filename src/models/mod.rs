//! The `models` module holds the local side of a record: its fields and what
//! changed about them, its identity, and the handle that ties them together.

pub mod acl;
pub mod dirty;
pub mod field_store;
pub mod identity;
pub mod pointer;
pub mod record;
pub mod validate;
