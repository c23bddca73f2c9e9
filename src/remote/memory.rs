//! An in-memory backend. Good for tests, demos and running offline. It behaves
//! like a (very small) real server: it hands out ids and timestamps, applies
//! field deletions, and can be told to fall off the network.

use ::std::collections::HashMap;
use ::std::sync::{Mutex, RwLock};
use ::std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{RError, RResult};
use crate::models::acl::Acl;
use crate::remote::{FetchResponse, Remote, SaveRequest, SaveResponse};
use crate::util::{self, Timestamp};
use crate::util::json::{Map, Value};

/// How many of each call the remote has seen (including failed ones)
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CallStats {
    pub saves: usize,
    pub deletes: usize,
    pub fetches: usize,
    pub batches: usize,
}

struct Stored {
    fields: Map<String, Value>,
    acl: Option<Acl>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Stored {
    fn to_value(&self, object_id: &str) -> Value {
        let mut data = self.fields.clone();
        data.insert(String::from("objectId"), json!(object_id));
        data.insert(String::from("createdAt"), json!(self.created_at));
        data.insert(String::from("updatedAt"), json!(self.updated_at));
        if let Some(ref acl) = self.acl {
            data.insert(String::from("ACL"), acl.as_value().clone());
        }
        Value::Object(data)
    }
}

pub struct MemoryRemote {
    objects: RwLock<HashMap<(String, String), Stored>>,
    counter: Mutex<u32>,
    stats: Mutex<CallStats>,
    offline: AtomicBool,
    /// Saves of these classes fail with a network error
    failing_classes: RwLock<Vec<String>>,
}

impl MemoryRemote {
    pub fn new() -> MemoryRemote {
        MemoryRemote {
            objects: RwLock::new(HashMap::new()),
            counter: Mutex::new(0),
            stats: Mutex::new(Default::default()),
            offline: AtomicBool::new(false),
            failing_classes: RwLock::new(Vec::new()),
        }
    }

    /// Pull the plug (or plug it back in). Offline, every call fails with
    /// `RError::Network`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make saves of the given class fail with a network error
    pub fn fail_class(&self, class_name: &str) {
        lockw!(self.failing_classes).push(String::from(class_name));
    }

    pub fn stats(&self) -> CallStats {
        lock!(self.stats).clone()
    }

    /// Look at what the server holds for an object, in server-result form
    /// (what `Record::from_result` eats).
    pub fn peek(&self, class_name: &str, object_id: &str) -> Option<Value> {
        let objects = lockr!(self.objects);
        objects.get(&key(class_name, object_id)).map(|x| x.to_value(object_id))
    }

    pub fn count(&self, class_name: &str) -> usize {
        lockr!(self.objects).keys().filter(|k| k.0 == class_name).count()
    }

    /// Change a field server-side, as if another client saved it
    pub fn poke(&self, class_name: &str, object_id: &str, field: &str, value: Value) -> RResult<()> {
        let now = self.next_timestamp();
        let mut objects = lockw!(self.objects);
        let stored = match objects.get_mut(&key(class_name, object_id)) {
            Some(x) => x,
            None => return Err(not_found(class_name, object_id)),
        };
        stored.fields.insert(String::from(field), value);
        stored.updated_at = now.max(stored.updated_at + 1);
        Ok(())
    }

    /// Put an object straight into the server, returning its new id
    pub fn seed(&self, class_name: &str, fields: Map<String, Value>) -> String {
        let object_id = self.next_id();
        let now = self.next_timestamp();
        lockw!(self.objects).insert(key(class_name, &object_id), Stored {
            fields: fields,
            acl: None,
            created_at: now,
            updated_at: now,
        });
        object_id
    }

    /// Same idea as the client ids we hand out elsewhere: millisecond
    /// timestamp plus a rolling counter, all hex.
    fn next_id(&self) -> String {
        let mut counter = lock!(self.counter);
        let count = *counter;
        *counter += 1;
        format!("{:012x}{:04x}", util::now(), count & 65535)
    }

    fn next_timestamp(&self) -> Timestamp {
        util::now()
    }

    fn check_online(&self) -> RResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RError::Network(String::from("MemoryRemote: offline")));
        }
        Ok(())
    }
}

fn key(class_name: &str, object_id: &str) -> (String, String) {
    (String::from(class_name), String::from(object_id))
}

fn not_found(class_name: &str, object_id: &str) -> RError {
    RError::Msg(format!("MemoryRemote: {}({}) not found", class_name, object_id))
}

impl Remote for MemoryRemote {
    fn create_or_update(&self, req: &SaveRequest) -> RResult<SaveResponse> {
        lock!(self.stats).saves += 1;
        self.check_online()?;
        if lockr!(self.failing_classes).contains(&req.class_name) {
            return Err(RError::Network(format!("MemoryRemote: saves of {} are failing", req.class_name)));
        }
        let now = self.next_timestamp();
        match req.object_id {
            None => {
                let object_id = self.next_id();
                let mut fields = req.fields.clone();
                for deleted in &req.deleted_keys {
                    fields.remove(deleted);
                }
                lockw!(self.objects).insert(key(&req.class_name, &object_id), Stored {
                    fields: fields,
                    acl: req.acl.clone(),
                    created_at: now,
                    updated_at: now,
                });
                Ok(SaveResponse {
                    object_id: object_id,
                    created_at: now,
                    updated_at: now,
                })
            }
            Some(ref object_id) => {
                let mut objects = lockw!(self.objects);
                let stored = match objects.get_mut(&key(&req.class_name, object_id)) {
                    Some(x) => x,
                    None => return Err(not_found(&req.class_name, object_id)),
                };
                for (field, val) in &req.fields {
                    stored.fields.insert(field.clone(), val.clone());
                }
                for deleted in &req.deleted_keys {
                    stored.fields.remove(deleted);
                }
                if req.acl.is_some() {
                    stored.acl = req.acl.clone();
                }
                stored.updated_at = now.max(stored.updated_at + 1);
                Ok(SaveResponse {
                    object_id: object_id.clone(),
                    created_at: stored.created_at,
                    updated_at: stored.updated_at,
                })
            }
        }
    }

    fn delete(&self, class_name: &str, object_id: &str) -> RResult<()> {
        lock!(self.stats).deletes += 1;
        self.check_online()?;
        match lockw!(self.objects).remove(&key(class_name, object_id)) {
            Some(_) => Ok(()),
            None => Err(not_found(class_name, object_id)),
        }
    }

    fn fetch(&self, class_name: &str, object_id: &str) -> RResult<FetchResponse> {
        lock!(self.stats).fetches += 1;
        self.check_online()?;
        let objects = lockr!(self.objects);
        match objects.get(&key(class_name, object_id)) {
            Some(stored) => Ok(FetchResponse {
                fields: stored.fields.clone(),
                created_at: stored.created_at,
                updated_at: stored.updated_at,
                acl: stored.acl.clone(),
            }),
            None => Err(not_found(class_name, object_id)),
        }
    }

    fn batch_create_or_update(&self, reqs: &[SaveRequest]) -> RResult<Vec<RResult<SaveResponse>>> {
        lock!(self.stats).batches += 1;
        self.check_online()?;
        Ok(reqs.iter().map(|req| self.create_or_update(req)).collect())
    }
}
