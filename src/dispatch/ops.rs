//! The single execution path for save/delete/refresh. Each operation comes in
//! two halves:
//!
//! - `prepare_*` runs on the caller's thread. It checks local preconditions,
//!   claims the record, and freezes whatever the request needs. Anything that
//!   fails here fails before the network is touched.
//! - `run_*` runs on a worker. It talks to the remote and applies the result
//!   back onto the record. The record's `OpGuard` is dropped when `run_*`
//!   returns, so the record is free again before anyone hears about the
//!   outcome.

use crate::error::{RError, RResult};
use crate::models::pointer::Pointer;
use crate::models::record::{OpGuard, OpKind, Record, SaveSnapshot};
use crate::remote::Remote;

/// What a save needs once it's been prepared
pub enum PreparedSave {
    /// Nothing to send. The save succeeds without a network call.
    Clean,
    Send(OpGuard, SaveSnapshot),
}

/// A prepared delete/refresh: the claimed record and its id
pub struct PreparedTarget {
    pub guard: OpGuard,
    pub class_name: String,
    pub object_id: String,
}

pub fn prepare_save(record: &Record) -> RResult<PreparedSave> {
    let guard = record.begin(OpKind::Save)?;
    if !record.is_dirty() {
        debug!("dispatch::prepare_save() -- {} is clean, skipping the network", record.describe());
        return Ok(PreparedSave::Clean);
    }
    let snapshot = record.snapshot()?;
    Ok(PreparedSave::Send(guard, snapshot))
}

pub fn run_save(remote: &dyn Remote, guard: OpGuard, snapshot: SaveSnapshot) -> RResult<()> {
    let record = guard.record();
    info!("dispatch::run_save() -- {} ({} fields, {} deletions)", record.describe(), snapshot.request.fields.len(), snapshot.request.deleted_keys.len());
    let res = match remote.create_or_update(&snapshot.request) {
        Ok(x) => x,
        Err(e) => {
            warn!("dispatch::run_save() -- {}: {}", record.describe(), e);
            return Err(e);
        }
    };
    record.apply_save(&snapshot, &res)?;
    debug!("dispatch::run_save() -- {} saved, dirty: {}", record.describe(), record.is_dirty());
    Ok(())
}

/// Delete and refresh both need a record that exists server-side
fn prepare_target(record: &Record, kind: OpKind) -> RResult<PreparedTarget> {
    let guard = record.begin(kind)?;
    let object_id = match record.object_id() {
        Some(x) => x,
        None => return Err(RError::NotSaved(format!("cannot {} {}: it has never been saved", kind, record.describe()))),
    };
    Ok(PreparedTarget {
        guard: guard,
        class_name: record.class_name(),
        object_id: object_id,
    })
}

pub fn prepare_delete(record: &Record) -> RResult<PreparedTarget> {
    prepare_target(record, OpKind::Delete)
}

pub fn run_delete(remote: &dyn Remote, target: PreparedTarget) -> RResult<()> {
    let PreparedTarget { guard, class_name, object_id } = target;
    info!("dispatch::run_delete() -- {}({})", class_name, object_id);
    match remote.delete(&class_name, &object_id) {
        Ok(_) => {
            guard.record().mark_deleted();
            Ok(())
        }
        Err(e) => {
            warn!("dispatch::run_delete() -- {}({}): {}", class_name, object_id, e);
            Err(e)
        }
    }
}

pub fn prepare_refresh(record: &Record) -> RResult<PreparedTarget> {
    prepare_target(record, OpKind::Refresh)
}

pub fn run_refresh(remote: &dyn Remote, target: PreparedTarget) -> RResult<Record> {
    let PreparedTarget { guard, class_name, object_id } = target;
    info!("dispatch::run_refresh() -- {}({})", class_name, object_id);
    let res = match remote.fetch(&class_name, &object_id) {
        Ok(x) => x,
        Err(e) => {
            warn!("dispatch::run_refresh() -- {}({}): {}", class_name, object_id, e);
            return Err(e);
        }
    };
    let record = guard.record().clone();
    record.apply_fetch(res)?;
    Ok(record)
}

/// Load the object a pointer points at as a new, clean record. Nothing local
/// is claimed, so there's no prepare half.
pub fn run_fetch(remote: &dyn Remote, pointer: &Pointer) -> RResult<Record> {
    info!("dispatch::run_fetch() -- {}({})", pointer.class_name, pointer.object_id);
    let res = match remote.fetch(&pointer.class_name, &pointer.object_id) {
        Ok(x) => x,
        Err(e) => {
            warn!("dispatch::run_fetch() -- {}({}): {}", pointer.class_name, pointer.object_id, e);
            return Err(e);
        }
    };
    Record::from_fetch(pointer, res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::MemoryRemote;

    #[test]
    fn save_then_clean() {
        let remote = MemoryRemote::new();
        let note = Record::new("Note").unwrap();
        note.set("title", &"x").unwrap();
        match prepare_save(&note).unwrap() {
            PreparedSave::Send(guard, snapshot) => {
                assert_eq!(note.in_flight(), Some(OpKind::Save));
                run_save(&remote, guard, snapshot).unwrap();
            }
            PreparedSave::Clean => panic!("new records are never clean"),
        }
        assert_eq!(note.in_flight(), None);
        assert!(!note.is_dirty());
        match prepare_save(&note).unwrap() {
            PreparedSave::Clean => (),
            PreparedSave::Send(..) => panic!("clean record should skip the network"),
        }
        assert_eq!(note.in_flight(), None);
        assert_eq!(remote.stats().saves, 1);
    }

    #[test]
    fn failed_save_changes_nothing() {
        let remote = MemoryRemote::new();
        remote.set_offline(true);
        let note = Record::new("Note").unwrap();
        note.set("title", &"x").unwrap();
        match prepare_save(&note).unwrap() {
            PreparedSave::Send(guard, snapshot) => assert!(run_save(&remote, guard, snapshot).is_err()),
            PreparedSave::Clean => panic!("new records are never clean"),
        }
        assert!(note.is_dirty());
        assert_eq!(note.object_id(), None);
        assert_eq!(note.in_flight(), None);
    }

    #[test]
    fn fetch_builds_full_records() {
        let remote = MemoryRemote::new();
        let mut fields = crate::util::json::Map::new();
        fields.insert(String::from("title"), json!("seeded"));
        let id = remote.seed("Note", fields);
        let note = run_fetch(&remote, &Pointer::new(String::from("Note"), id.clone())).unwrap();
        assert_eq!(note.object_id(), Some(id));
        assert!(note.created_at().is_some());
        assert!(!note.is_dirty());
        assert!(run_fetch(&remote, &Pointer::new("Note", "nope")).is_err());
    }

    #[test]
    fn targets_need_ids() {
        let note = Record::new("Note").unwrap();
        match prepare_delete(&note) {
            Err(RError::NotSaved(_)) => (),
            _ => panic!("expected NotSaved"),
        }
        match prepare_refresh(&note) {
            Err(RError::NotSaved(_)) => (),
            _ => panic!("expected NotSaved"),
        }
        // the failed prepare doesn't leave the record claimed
        assert_eq!(note.in_flight(), None);
    }
}
