//! The field store holds a record's values, the keys waiting to be deleted on
//! the server, and the references to other records.
//!
//! A key lives in exactly one of `fields` or `pending_removals`. Reference keys
//! live in `fields` too (holding the pointer's inline form) and additionally
//! in `references`, which holds the target record itself so we can render the
//! pointer with whatever id the target has by the time we save.
//!
//! Only records set locally with `set_reference` live in `references`. Pointer
//! values that come from the server (or are set as plain values) stay plain
//! pointer JSON; `get_pointer` reads either kind.

use ::std::collections::{BTreeMap, BTreeSet};

use crate::error::{RError, RResult};
use crate::models::dirty::DirtyTracker;
use crate::models::pointer::{self, Pointer};
use crate::models::record::Record;
use crate::models::validate;
use crate::util::json::{Map, Value};

/// What a save sends for the fields of a record, frozen at dispatch time.
#[derive(Debug, Clone)]
pub struct FieldSnapshot {
    pub fields: Map<String, Value>,
    pub deleted_keys: Vec<String>,
    /// The tracker generation this snapshot was built from
    pub generation: u64,
}

#[derive(Default)]
pub struct FieldStore {
    fields: Map<String, Value>,
    references: BTreeMap<String, Record>,
    pending_removals: BTreeSet<String>,
    tracker: DirtyTracker,
}

impl FieldStore {
    pub fn new() -> FieldStore {
        Default::default()
    }

    /// Load a store from already-saved (server) data. Nothing is dirty.
    pub fn from_fields(fields: Map<String, Value>) -> RResult<FieldStore> {
        let mut store = FieldStore::new();
        for (key, val) in fields {
            if validate::RESERVED_KEYS.contains(&key.as_str()) { continue; }
            validate::field_key(&key)?;
            store.fields.insert(key, val);
        }
        Ok(store)
    }

    /// Set a value into the store. This replaces any reference the key held.
    pub fn set(&mut self, key: &str, value: Value) -> RResult<()> {
        validate::field_key(key)?;
        self.references.remove(key);
        self.fields.insert(String::from(key), value);
        self.pending_removals.remove(key);
        self.tracker.touch(key);
        Ok(())
    }

    /// Point a key at another record, saved or not.
    pub fn set_reference(&mut self, key: &str, target: &Record) -> RResult<()> {
        validate::field_key(key)?;
        let inline = pointer::inline(&target.class_name(), target.object_id().as_ref());
        self.fields.insert(String::from(key), inline);
        self.references.insert(String::from(key), target.clone());
        self.pending_removals.remove(key);
        self.tracker.touch(key);
        Ok(())
    }

    /// Grab a value. Reference keys give the pointer's current inline form.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.references.get(key) {
            Some(target) => Some(pointer::inline(&target.class_name(), target.object_id().as_ref())),
            None => self.fields.get(key).cloned(),
        }
    }

    /// The record a key points at, if it was set with `set_reference`
    pub fn get_reference(&self, key: &str) -> Option<Record> {
        self.references.get(key).cloned()
    }

    /// The address a key points at, for both local references (once their
    /// target is saved) and pointer values loaded from the server.
    pub fn get_pointer(&self, key: &str) -> Option<Pointer> {
        match self.references.get(key) {
            Some(target) => target.pointer().ok(),
            None => Pointer::from_value(self.fields.get(key)?),
        }
    }

    /// Unset a key. It gets deleted server-side on the next save. Removing a
    /// key we don't have does nothing.
    pub fn remove(&mut self, key: &str) {
        if self.fields.remove(key).is_none() { return; }
        self.references.remove(key);
        self.pending_removals.insert(String::from(key));
        self.tracker.touch(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn pending_removals(&self) -> Vec<String> {
        self.pending_removals.iter().cloned().collect()
    }

    /// All records this store points at
    pub fn references(&self) -> Vec<Record> {
        self.references.values().cloned().collect()
    }

    pub fn tracker(&self) -> &DirtyTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut DirtyTracker {
        &mut self.tracker
    }

    /// Whether we hold changes the server hasn't seen
    pub fn has_changes(&self) -> bool {
        self.tracker.has_changes() || !self.pending_removals.is_empty()
    }

    /// Freeze the current fields for a save. Every reference target has to
    /// have an id by now or there's nothing to point at.
    pub fn snapshot(&self) -> RResult<FieldSnapshot> {
        let mut fields = self.fields.clone();
        for (key, target) in &self.references {
            let id = match target.object_id() {
                Some(x) => x,
                None => return Err(RError::NotSaved(format!("field {:?} references an unsaved {} record", key, target.class_name()))),
            };
            fields.insert(key.clone(), pointer::inline(&target.class_name(), Some(&id)));
        }
        Ok(FieldSnapshot {
            fields: fields,
            deleted_keys: self.pending_removals(),
            generation: self.tracker.generation(),
        })
    }

    /// A save built from `snapshot` succeeded. Keys touched after the
    /// snapshot was taken stay dirty (and stay pending removal if that's what
    /// happened to them).
    pub fn commit(&mut self, snapshot: &FieldSnapshot) {
        self.tracker.commit(snapshot.generation);
        let tracker = &self.tracker;
        self.pending_removals.retain(|key| tracker.is_changed(key));
        debug_assert!(self.check().is_ok());
    }

    /// Swap our contents for the server's. Local edits are gone after this.
    pub fn replace(&mut self, other: FieldStore) {
        self.fields = other.fields;
        self.references = other.references;
        self.pending_removals.clear();
        self.tracker.reset();
        debug_assert!(self.check().is_ok());
    }

    /// Checks the key invariant: nothing is both present and pending removal,
    /// and every reference key also has an inline value.
    pub fn check(&self) -> RResult<()> {
        if let Some(key) = self.pending_removals.iter().find(|k| self.fields.contains_key(k.as_str())) {
            return Err(RError::InvalidState(format!("key {:?} is both set and pending removal", key)));
        }
        if let Some(key) = self.references.keys().find(|k| !self.fields.contains_key(k.as_str())) {
            return Err(RError::InvalidState(format!("reference {:?} has no inline value", key)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pointer::Pointer;

    #[test]
    fn set_get_remove() {
        let mut store = FieldStore::new();
        assert!(!store.has_changes());
        store.set("title", json!("x")).unwrap();
        assert_eq!(store.get("title"), Some(json!("x")));
        assert!(store.has_changes());

        store.remove("title");
        assert_eq!(store.get("title"), None);
        assert_eq!(store.pending_removals(), vec![String::from("title")]);
        store.check().unwrap();

        // setting again takes it back out of the removal list
        store.set("title", json!("y")).unwrap();
        assert_eq!(store.pending_removals().len(), 0);
        store.check().unwrap();
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut store = FieldStore::new();
        store.remove("nothing");
        assert!(!store.has_changes());
        assert_eq!(store.pending_removals().len(), 0);
    }

    #[test]
    fn bad_keys() {
        let mut store = FieldStore::new();
        assert!(store.set("", json!(1)).is_err());
        assert!(store.set("objectId", json!("lol")).is_err());
        assert!(!store.has_changes());
    }

    #[test]
    fn keeps_insertion_order() {
        let mut store = FieldStore::new();
        store.set("zebra", json!(1)).unwrap();
        store.set("apple", json!(2)).unwrap();
        store.set("mango", json!(3)).unwrap();
        assert_eq!(store.keys(), vec!["zebra", "apple", "mango"]);
    }

    #[test]
    fn commit_keeps_changes_after_snapshot() {
        let mut store = FieldStore::new();
        store.set("title", json!("x")).unwrap();
        store.set("gone", json!(true)).unwrap();
        store.remove("gone");
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.deleted_keys, vec![String::from("gone")]);

        store.set("body", json!("later")).unwrap();
        store.commit(&snapshot);
        assert!(store.has_changes());
        assert!(store.tracker().is_changed("body"));
        assert!(!store.tracker().is_changed("title"));
        assert_eq!(store.pending_removals().len(), 0);
    }

    #[test]
    fn removal_after_snapshot_stays_pending() {
        let mut store = FieldStore::new();
        store.set("title", json!("x")).unwrap();
        let snapshot = store.snapshot().unwrap();
        store.remove("title");
        store.commit(&snapshot);
        assert_eq!(store.pending_removals(), vec![String::from("title")]);
        assert!(store.has_changes());
    }

    #[test]
    fn references() {
        let mut store = FieldStore::new();
        let target = Record::new("Author").unwrap();
        store.set_reference("author", &target).unwrap();
        assert_eq!(store.get("author"), Some(pointer::inline("Author", None)));
        match store.snapshot() {
            Err(RError::NotSaved(_)) => (),
            _ => panic!("expected NotSaved for an unsaved reference"),
        }

        let saved = Record::from_result("Author", &json!({"objectId": "a1", "createdAt": 1})).unwrap();
        store.set_reference("author", &saved).unwrap();
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.fields.get("author"), Some(&Pointer::new("Author", "a1").to_value()));
        assert!(store.get_reference("author").unwrap().same(&saved));
        assert_eq!(store.get_pointer("author"), Some(Pointer::new("Author", "a1")));

        store.remove("author");
        assert!(store.get_reference("author").is_none());
        store.check().unwrap();
    }

    #[test]
    fn server_pointers_stay_pointers() {
        let mut fields = Map::new();
        fields.insert(String::from("title"), json!("hi"));
        fields.insert(String::from("author"), Pointer::new("Author", "a1").to_value());
        fields.insert(String::from("objectId"), json!("skipme"));
        let store = FieldStore::from_fields(fields).unwrap();
        assert!(!store.has_changes());
        assert!(!store.contains("objectId"));
        assert!(store.get_reference("author").is_none());
        assert!(store.references().is_empty());
        assert_eq!(store.get_pointer("author"), Some(Pointer::new("Author", "a1")));
        assert_eq!(store.get_pointer("title"), None);
        store.check().unwrap();
    }

    #[test]
    fn setting_a_value_drops_the_reference() {
        let mut store = FieldStore::new();
        let target = Record::new("Author").unwrap();
        store.set_reference("author", &target).unwrap();
        store.set("author", Pointer::new("Author", "a2").to_value()).unwrap();
        assert!(store.get_reference("author").is_none());
        assert_eq!(store.get_pointer("author"), Some(Pointer::new("Author", "a2")));
        // a plain pointer value can always be sent
        assert!(store.snapshot().is_ok());
    }
}
