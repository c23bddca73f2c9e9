use ::time;

#[macro_use]
pub mod macros;
pub mod json;
pub mod logger;
pub mod thredder;

/// Millisecond timestamps are what we store for createdAt/updatedAt
pub type Timestamp = i64;

/// Get the current unix time in milliseconds
pub fn now() -> Timestamp {
    let now = time::get_time();
    (now.sec * 1000) + ((now.nsec as i64) / 1000000)
}
