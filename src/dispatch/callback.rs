//! Completion plumbing for the non-blocking calling conventions.
//!
//! Every operation resolves to one `RResult<T>`. The conventions only differ
//! in how that result gets handed back, so the conversions live here.

use crate::error::{RError, RResult};
use crate::models::record::Record;

/// An object that wants to hear about the outcome of an operation. This is the
/// typed version of "call method X on object Y when you're done": implement it
/// on whatever owns the follow-up logic and hand the dispatcher an `Arc` of it.
///
/// `result` is `true`/`false` for saves and deletes, and the refreshed record
/// (or None) for refreshes. `error` is None on success.
pub trait ResultTarget<R>: Send + Sync + 'static {
    fn callback_with_result(&self, result: R, error: Option<RError>);
}

/// Flatten a boolean-style operation result into (succeeded, error)
pub fn bool_result(res: RResult<()>) -> (bool, Option<RError>) {
    match res {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e)),
    }
}

/// Flatten a refresh result into (record, error)
pub fn record_result(res: RResult<Record>) -> (Option<Record>, Option<RError>) {
    match res {
        Ok(x) => (Some(x), None),
        Err(e) => (None, Some(e)),
    }
}
