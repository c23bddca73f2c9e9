use ::std::error::Error;
use ::std::convert::From;

use ::futures::future::BoxFuture;

quick_error! {
    #[derive(Debug)]
    /// recsync's main error object.
    pub enum RError {
        Boxed(err: Box<dyn Error + Send + Sync>) {
            description(err.description())
            display("error: {}", err)
        }
        Msg(str: String) {
            description(str)
            display("error: {}", str)
        }
        /// Transport failure or timeout. The caller may retry, we never do.
        Network(str: String) {
            description(str)
            display("network error: {}", str)
        }
        /// Malformed class name, empty/reserved key, bad server data
        Validation(str: String) {
            description(str)
            display("validation error: {}", str)
        }
        /// The operation needs an objectId and the record doesn't have one
        NotSaved(str: String) {
            description(str)
            display("not saved: {}", str)
        }
        /// Contradictory identity assignment, busy record, deleted record
        InvalidState(str: String) {
            description(str)
            display("invalid state: {}", str)
        }
        CircularReference(str: String) {
            description(str)
            display("circular reference: {}", str)
        }
        /// Aggregated failure of a batch save. Each entry holds the index of
        /// the failed record in the batch and the error it got.
        Batch(failed: usize, total: usize, errors: Vec<(usize, RError)>) {
            description("batch save failed")
            display("batch save: {} of {} records failed", failed, total)
        }
    }
}

impl RError {
    /// Whether or not re-running the same operation might succeed. Only
    /// transport failures qualify.
    pub fn is_retryable(&self) -> bool {
        match *self {
            RError::Network(..) => true,
            _ => false,
        }
    }
}

/// converts non-RError errors to RError, via the From trait.
#[macro_export]
macro_rules! toterr {
    ($e:expr) => (
        {
            let err: $crate::error::RError = From::from($e);
            err
        }
    )
}

/// A macro to make it easy to create From impls for RError
macro_rules! from_err {
    ($t:ty) => (
        impl From<$t> for RError {
            fn from(err: $t) -> RError {
                RError::Boxed(Box::new(err))
            }
        }
    )
}

from_err!(::std::io::Error);
from_err!(::serde_json::Error);
from_err!(::serde_yaml::Error);

pub type RResult<T> = Result<T, RError>;
pub type RFuture<T> = BoxFuture<'static, RResult<T>>;
