//! recsync keeps local copies of schema-less backend records and moves them
//! to and from the server: save, delete, refresh, and saving whole groups of
//! records that point at each other.
//!
//! A quick tour:
//!
//! - `Record` is one object: a class name, an id once it's been saved, and a
//!   bag of JSON fields (some of which can point at other records).
//! - `Remote` is the backend. Implement it for your transport, or use
//!   `MemoryRemote` for tests.
//! - `Dispatcher` runs operations on records against a `Remote`, either
//!   blocking or in the background with a callback.

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;

#[macro_use]
pub mod util;
#[macro_use]
pub mod error;
pub mod config;
pub mod models;
pub mod remote;
pub mod dispatch;

use crate::util::json::{self, Value};

pub use crate::dispatch::Dispatcher;
pub use crate::dispatch::callback::ResultTarget;
pub use crate::error::{RError, RFuture, RResult};
pub use crate::models::acl::Acl;
pub use crate::models::pointer::Pointer;
pub use crate::models::record::{OpKind, Record};
pub use crate::remote::{FetchResponse, Remote, SaveRequest, SaveResponse};
pub use crate::remote::memory::MemoryRemote;

/// Init config and logging. Takes a JSON object that gets merged over the
/// loaded config (pass "{}" if you have nothing to add).
pub fn init(config_str: &str) -> RResult<()> {
    let runtime_config: Value = match json::parse(config_str) {
        Ok(x) => x,
        Err(e) => {
            println!("recsync::init() -- problem parsing runtime config: {}", e);
            json::obj()
        }
    };
    config::merge(&runtime_config)?;
    match util::logger::setup_logger() {
        Ok(_) => {}
        Err(e) => {
            println!("recsync::init() -- problem setting up logging: {}", e);
            return Err(e);
        }
    }
    debug!("recsync::init() -- config loaded, logging is up");
    Ok(())
}
