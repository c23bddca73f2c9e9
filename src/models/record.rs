//! The `Record` is the local copy of one backend object. It's a cheap, clonable
//! handle: clones share the same underlying state, which is what lets one
//! record point at another and lets the dispatcher work on a record from a
//! background thread.
//!
//! Locking order is always `store` then `identity`, and `op` only ever nests
//! `identity`. Nothing takes another lock while holding `identity`, so records
//! pointing at each other (even in cycles) can't deadlock.

use ::std::fmt;
use ::std::sync::{Arc, Mutex, RwLock};

use crate::error::{RError, RResult};
use crate::models::acl::Acl;
use crate::models::field_store::{FieldSnapshot, FieldStore};
use crate::models::identity::Identity;
use crate::models::pointer::Pointer;
use crate::remote::{FetchResponse, SaveRequest, SaveResponse};
use crate::util::Timestamp;
use crate::util::json::{self, DeserializeOwned, Map, Serialize, Value};

/// The kinds of network operation a record can have in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Save,
    Delete,
    Refresh,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            OpKind::Save => "save",
            OpKind::Delete => "delete",
            OpKind::Refresh => "refresh",
        };
        write!(f, "{}", name)
    }
}

#[derive(Default)]
struct OpState {
    in_flight: Option<OpKind>,
    deleted: bool,
}

struct RecordInner {
    store: RwLock<FieldStore>,
    identity: RwLock<Identity>,
    op: Mutex<OpState>,
}

/// A save request frozen at dispatch time, plus what we need to commit it.
pub struct SaveSnapshot {
    pub request: SaveRequest,
    pub(crate) fields: FieldSnapshot,
}

/// Marks a record as busy with an operation. Dropping it frees the record up
/// again, however the operation ended.
pub struct OpGuard {
    record: Record,
    kind: OpKind,
}

impl OpGuard {
    pub fn record(&self) -> &Record {
        &self.record
    }
}

impl Drop for OpGuard {
    fn drop(&mut self) {
        trace!("record: {} -- {} finished", self.record.describe(), self.kind);
        let mut guard = lock!(self.record.inner.op);
        guard.in_flight = None;
    }
}

#[derive(Clone)]
pub struct Record {
    inner: Arc<RecordInner>,
}

impl Record {
    fn from_parts(identity: Identity, store: FieldStore) -> Record {
        Record {
            inner: Arc::new(RecordInner {
                store: RwLock::new(store),
                identity: RwLock::new(identity),
                op: Mutex::new(Default::default()),
            }),
        }
    }

    /// Create a new, never-saved record of the given class.
    pub fn new(class_name: &str) -> RResult<Record> {
        Ok(Record::from_parts(Identity::new(class_name)?, FieldStore::new()))
    }

    /// Build a clean record from a fetch of the object at `pointer`
    pub(crate) fn from_fetch(pointer: &Pointer, res: FetchResponse) -> RResult<Record> {
        let FetchResponse { fields, created_at, updated_at, acl } = res;
        let mut identity = Identity::existing(&pointer.class_name, &pointer.object_id)?;
        identity.apply_fetch(created_at, updated_at, acl);
        Ok(Record::from_parts(identity, FieldStore::from_fields(fields)?))
    }

    /// Rebuild a record from a full server result: `objectId`, `createdAt`,
    /// `updatedAt` (defaults to createdAt), `ACL` (optional) and the fields.
    /// The result is clean.
    pub fn from_result(class_name: &str, result: &Value) -> RResult<Record> {
        let data: Map<String, Value> = match *result {
            Value::Object(ref x) => x.clone(),
            _ => return Err(RError::Validation(format!("{}: server result is not an object", class_name))),
        };
        let object_id: String = match json::get_opt(&["objectId"], result) {
            Some(x) => x,
            None => return Err(RError::Validation(format!("{}: server result is missing objectId", class_name))),
        };
        let created_at: Timestamp = match json::get_opt(&["createdAt"], result) {
            Some(x) => x,
            None => return Err(RError::Validation(format!("{}: server result is missing createdAt", class_name))),
        };
        let updated_at: Timestamp = json::get_opt(&["updatedAt"], result).unwrap_or(created_at);
        let acl: Option<Acl> = json::get_opt(&["ACL"], result);

        let mut identity = Identity::existing(class_name, &object_id)?;
        identity.apply_fetch(created_at, updated_at, acl);
        let store = FieldStore::from_fields(data)?;
        Ok(Record::from_parts(identity, store))
    }

    /// Whether two handles point at the same record
    pub fn same(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Identifies the shared state behind this handle (same value for all
    /// clones)
    pub(crate) fn addr(&self) -> usize {
        &*self.inner as *const RecordInner as usize
    }

    pub fn class_name(&self) -> String {
        String::from(lockr!(self.inner.identity).class_name())
    }

    pub fn object_id(&self) -> Option<String> {
        lockr!(self.inner.identity).object_id().cloned()
    }

    pub fn created_at(&self) -> Option<Timestamp> {
        lockr!(self.inner.identity).created_at()
    }

    pub fn updated_at(&self) -> Option<Timestamp> {
        lockr!(self.inner.identity).updated_at()
    }

    pub fn acl(&self) -> Option<Acl> {
        lockr!(self.inner.identity).acl().cloned()
    }

    /// Set (or clear) the ACL. It goes out with the next save.
    pub fn set_acl(&self, acl: Option<Acl>) {
        let mut store = lockw!(self.inner.store);
        let mut identity = lockw!(self.inner.identity);
        identity.set_acl(acl);
        store.tracker_mut().touch_acl();
    }

    /// This record's address. Fails with `NotSaved` until it has an id.
    pub fn pointer(&self) -> RResult<Pointer> {
        lockr!(self.inner.identity).pointer()
    }

    /// Set a field value
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> RResult<()> {
        let val = json::to_val(value)?;
        lockw!(self.inner.store).set(key, val)
    }

    /// Point a field at another record
    pub fn set_reference(&self, key: &str, target: &Record) -> RResult<()> {
        lockw!(self.inner.store).set_reference(key, target)
    }

    /// Grab a field, converted to whatever type you want. Missing keys (and
    /// values that don't convert) give None.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let val = self.get_value(key)?;
        json::from_val(val).ok()
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        lockr!(self.inner.store).get(key)
    }

    /// The record a key points at, if it was set with `set_reference`
    pub fn get_reference(&self, key: &str) -> Option<Record> {
        lockr!(self.inner.store).get_reference(key)
    }

    /// Where a key points, whether it's a local reference (once its target is
    /// saved) or a pointer that came from the server. Load the target with
    /// `Dispatcher::try_fetch`.
    pub fn get_pointer(&self, key: &str) -> Option<Pointer> {
        lockr!(self.inner.store).get_pointer(key)
    }

    /// Unset a field. The server drops it on the next save.
    pub fn remove(&self, key: &str) {
        lockw!(self.inner.store).remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        lockr!(self.inner.store).contains(key)
    }

    pub fn keys(&self) -> Vec<String> {
        lockr!(self.inner.store).keys()
    }

    pub fn pending_removals(&self) -> Vec<String> {
        lockr!(self.inner.store).pending_removals()
    }

    /// Every record this one points at
    pub fn references(&self) -> Vec<Record> {
        lockr!(self.inner.store).references()
    }

    /// Whether this record has anything the server hasn't seen. Records that
    /// have never been saved are always dirty.
    pub fn is_dirty(&self) -> bool {
        let store = lockr!(self.inner.store);
        let identity = lockr!(self.inner.identity);
        identity.object_id().is_none() || store.has_changes()
    }

    /// Whether a delete of this record went through. Deleted records can't be
    /// saved or refreshed again.
    pub fn is_deleted(&self) -> bool {
        lock!(self.inner.op).deleted
    }

    /// What's currently in flight for this record, if anything
    pub fn in_flight(&self) -> Option<OpKind> {
        lock!(self.inner.op).in_flight
    }

    /// Claim this record for an operation. Only one operation (of any kind)
    /// runs per record at a time, and nothing runs on a deleted record.
    pub(crate) fn begin(&self, kind: OpKind) -> RResult<OpGuard> {
        let mut guard = lock!(self.inner.op);
        if guard.deleted {
            return Err(RError::InvalidState(format!("{}: cannot {} a deleted record", self.describe(), kind)));
        }
        if let Some(busy) = guard.in_flight {
            return Err(RError::InvalidState(format!("{}: cannot {} while a {} is in flight", self.describe(), kind, busy)));
        }
        guard.in_flight = Some(kind);
        Ok(OpGuard {
            record: self.clone(),
            kind: kind,
        })
    }

    pub(crate) fn mark_deleted(&self) {
        lock!(self.inner.op).deleted = true;
    }

    /// Freeze what a save of this record would send right now
    pub(crate) fn snapshot(&self) -> RResult<SaveSnapshot> {
        let store = lockr!(self.inner.store);
        let fields = store.snapshot()?;
        let identity = lockr!(self.inner.identity);
        let request = SaveRequest {
            class_name: String::from(identity.class_name()),
            object_id: identity.object_id().cloned(),
            fields: fields.fields.clone(),
            deleted_keys: fields.deleted_keys.clone(),
            acl: identity.acl().cloned(),
        };
        Ok(SaveSnapshot {
            request: request,
            fields: fields,
        })
    }

    /// A save built from `snapshot` went through. Local state only changes if
    /// the response agrees with who we are.
    pub(crate) fn apply_save(&self, snapshot: &SaveSnapshot, res: &SaveResponse) -> RResult<()> {
        let mut store = lockw!(self.inner.store);
        let mut identity = lockw!(self.inner.identity);
        identity.apply_save_result(&res.object_id, res.created_at, res.updated_at)?;
        store.commit(&snapshot.fields);
        Ok(())
    }

    /// The server's copy replaces ours: fields, references, timestamps, ACL.
    pub(crate) fn apply_fetch(&self, res: FetchResponse) -> RResult<()> {
        let FetchResponse { fields, created_at, updated_at, acl } = res;
        let fresh = FieldStore::from_fields(fields)?;
        let mut store = lockw!(self.inner.store);
        let mut identity = lockw!(self.inner.identity);
        store.replace(fresh);
        identity.apply_fetch(created_at, updated_at, acl);
        Ok(())
    }

    /// "Note(abc123)" or "Note(new)", for logs and errors
    pub fn describe(&self) -> String {
        let identity = lockr!(self.inner.identity);
        match identity.object_id() {
            Some(id) => format!("{}({})", identity.class_name(), id),
            None => format!("{}(new)", identity.class_name()),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Record<{}>", self.describe())
    }
}
