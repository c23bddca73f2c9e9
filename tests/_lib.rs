extern crate futures;
extern crate recsync;
#[macro_use]
extern crate serde_json;

use ::std::sync::{Arc, Condvar, Mutex};
use ::std::thread;

use recsync::{Dispatcher, FetchResponse, MemoryRemote, RResult, Remote, SaveRequest, SaveResponse};

/// Set up logging/config and a dispatcher over a fresh in-memory remote
#[allow(dead_code)]
pub fn setup() -> (Arc<MemoryRemote>, Dispatcher) {
    recsync::init(r#"{"loglevel":"warn"}"#).unwrap();
    let remote = Arc::new(MemoryRemote::new());
    let dispatch = Dispatcher::new(remote.clone()).unwrap();
    (remote, dispatch)
}

/// A remote whose saves park until the test lets them through, so we can
/// poke at records while their save is in flight.
#[allow(dead_code)]
pub struct GatedRemote {
    pub inner: MemoryRemote,
    /// (open, number of saves parked at the gate)
    state: Mutex<(bool, usize)>,
    cond: Condvar,
}

#[allow(dead_code)]
impl GatedRemote {
    pub fn new() -> GatedRemote {
        GatedRemote {
            inner: MemoryRemote::new(),
            state: Mutex::new((true, 0)),
            cond: Condvar::new(),
        }
    }

    pub fn close(&self) {
        self.state.lock().unwrap().0 = false;
    }

    pub fn open(&self) {
        self.state.lock().unwrap().0 = true;
        self.cond.notify_all();
    }

    /// Block until `count` saves are parked at the gate
    pub fn wait_for_parked(&self, count: usize) {
        let mut state = self.state.lock().unwrap();
        while state.1 < count {
            state = self.cond.wait(state).unwrap();
        }
    }
}

impl Remote for GatedRemote {
    fn create_or_update(&self, req: &SaveRequest) -> RResult<SaveResponse> {
        {
            let mut state = self.state.lock().unwrap();
            state.1 += 1;
            self.cond.notify_all();
            while !state.0 {
                state = self.cond.wait(state).unwrap();
            }
            state.1 -= 1;
        }
        self.inner.create_or_update(req)
    }

    fn delete(&self, class_name: &str, object_id: &str) -> RResult<()> {
        self.inner.delete(class_name, object_id)
    }

    fn fetch(&self, class_name: &str, object_id: &str) -> RResult<FetchResponse> {
        self.inner.fetch(class_name, object_id)
    }
}

#[allow(dead_code)]
pub fn gated_setup() -> (Arc<GatedRemote>, Dispatcher) {
    recsync::init(r#"{"loglevel":"warn"}"#).unwrap();
    let remote = Arc::new(GatedRemote::new());
    let dispatch = Dispatcher::new(remote.clone()).unwrap();
    (remote, dispatch)
}
