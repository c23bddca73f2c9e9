//! The dispatcher runs record operations against a remote. Every operation
//! (save, delete, refresh, save_all) has exactly one implementation, in `ops`
//! and `batch`: a prepare half that checks and claims the record, and a run
//! half that talks to the remote. The public calling conventions are thin
//! wrappers that only decide which thread the run half goes on and how the
//! outcome gets back:
//!
//! - `save()` blocks and returns whether it worked
//! - `save_with_error()` blocks and fills in the error on failure
//! - `save_in_background_with_target()` runs in the background and calls a
//!   `ResultTarget` when done
//! - `save_in_background_with_callback()` runs in the background and calls a
//!   closure when done
//!
//! plus `try_save()` (blocking, `RResult`), `save_async()` (the future itself)
//! and `save_in_background()` (no completion at all).
//!
//! Blocking calls run the operation right on the caller's thread, so they're
//! fine to make from inside a completion. Background network calls run on the
//! `work` pool. Background completions all run on the `deliver` pool, which
//! has exactly one thread, so callbacks never race each other. A record is
//! released (its operation is no longer in flight) before its completion runs,
//! so a callback is free to start the next operation on the same record.
//!
//! The background methods return `Err` only for local problems (a record
//! that's busy, deleted, or never saved). In that case nothing was sent and the
//! callback will never run. After `Ok(())` the callback runs exactly once.

pub mod batch;
pub mod callback;
pub mod ops;

use ::std::panic::{self, AssertUnwindSafe};
use ::std::sync::Arc;

use ::futures::future::{self, FutureExt};

use crate::config;
use crate::dispatch::callback::ResultTarget;
use crate::dispatch::ops::PreparedSave;
use crate::error::{RError, RFuture, RResult};
use crate::models::pointer::Pointer;
use crate::models::record::Record;
use crate::remote::Remote;
use crate::util::thredder::Thredder;

pub struct Dispatcher {
    remote: Arc<dyn Remote>,
    /// Runs network i/o
    work: Thredder,
    /// Runs completions, one at a time
    deliver: Thredder,
    batch_max: usize,
}

/// A future that fails right away
fn failed<T: Send + 'static>(err: RError) -> RFuture<T> {
    future::ready(Err(err)).boxed()
}

/// Turn "couldn't start" into a future that fails right away
fn flatten<T: Send + 'static>(started: RResult<RFuture<T>>) -> RFuture<T> {
    match started {
        Ok(x) => x,
        Err(e) => failed(e),
    }
}

/// Write a blocking call's error into the caller's slot
fn report(res: RResult<()>, error: &mut Option<RError>) -> bool {
    match res {
        Ok(_) => {
            *error = None;
            true
        }
        Err(e) => {
            *error = Some(e);
            false
        }
    }
}

impl Dispatcher {
    /// Create a dispatcher for the given remote. Worker count and batch size
    /// come from the `dispatch.workers` and `batch.max_size` config keys.
    pub fn new(remote: Arc<dyn Remote>) -> RResult<Dispatcher> {
        let workers: u32 = match config::get_opt(&["dispatch", "workers"]) {
            Some(0) | None => num_cpus::get() as u32,
            Some(x) => x,
        };
        let batch_max: usize = match config::get_opt(&["batch", "max_size"]) {
            Some(0) | None => 50,
            Some(x) => x,
        };
        debug!("dispatch::new() -- {} workers, batches of {}", workers, batch_max);
        Ok(Dispatcher {
            remote: remote,
            work: Thredder::new("recsync-work", workers)?,
            deliver: Thredder::new("recsync-deliver", 1)?,
            batch_max: batch_max,
        })
    }

    pub fn remote(&self) -> &Arc<dyn Remote> {
        &self.remote
    }

    // -------------------------------------------------------------------------
    // single execution path. `*_here` runs an operation on the calling thread,
    // `start_*` runs it on the work pool. Both are made of the same `ops`.
    // -------------------------------------------------------------------------

    fn save_here(&self, record: &Record) -> RResult<()> {
        match ops::prepare_save(record)? {
            PreparedSave::Clean => Ok(()),
            PreparedSave::Send(guard, snapshot) => ops::run_save(&*self.remote, guard, snapshot),
        }
    }

    fn delete_here(&self, record: &Record) -> RResult<()> {
        let target = ops::prepare_delete(record)?;
        ops::run_delete(&*self.remote, target)
    }

    fn refresh_here(&self, record: &Record) -> RResult<Record> {
        let target = ops::prepare_refresh(record)?;
        ops::run_refresh(&*self.remote, target)
    }

    fn save_all_here(&self, records: &[Record]) -> RResult<()> {
        if records.is_empty() { return Ok(()); }
        let plan = batch::plan(records)?;
        info!("dispatch::save_all() -- {} records in {} waves", plan.len(), plan.waves().len());
        batch::run(&*self.remote, plan, self.batch_max)
    }

    fn start_save(&self, record: &Record) -> RResult<RFuture<()>> {
        match ops::prepare_save(record)? {
            PreparedSave::Clean => Ok(future::ready(Ok(())).boxed()),
            PreparedSave::Send(guard, snapshot) => {
                let remote = self.remote.clone();
                Ok(self.work.run_async(move || ops::run_save(&*remote, guard, snapshot)))
            }
        }
    }

    fn start_delete(&self, record: &Record) -> RResult<RFuture<()>> {
        let target = ops::prepare_delete(record)?;
        let remote = self.remote.clone();
        Ok(self.work.run_async(move || ops::run_delete(&*remote, target)))
    }

    fn start_refresh(&self, record: &Record) -> RResult<RFuture<Record>> {
        let target = ops::prepare_refresh(record)?;
        let remote = self.remote.clone();
        Ok(self.work.run_async(move || ops::run_refresh(&*remote, target)))
    }

    fn start_save_all(&self, records: &[Record]) -> RResult<RFuture<()>> {
        if records.is_empty() {
            return Ok(future::ready(Ok(())).boxed());
        }
        let plan = batch::plan(records)?;
        info!("dispatch::save_all() -- {} records in {} waves", plan.len(), plan.waves().len());
        let remote = self.remote.clone();
        let max_size = self.batch_max;
        Ok(self.work.run_async(move || batch::run(&*remote, plan, max_size)))
    }

    /// Run `finish` with the outcome of `fut` on the delivery thread
    fn deliver<T, F>(&self, fut: RFuture<T>, finish: F)
        where T: Send + 'static,
              F: FnOnce(RResult<T>) + Send + 'static
    {
        self.deliver.spawn_future(async move {
            let res = fut.await;
            if panic::catch_unwind(AssertUnwindSafe(move || finish(res))).is_err() {
                error!("dispatch::deliver() -- completion panicked");
            }
        });
    }

    /// Fire and forget, but tell the log about failures
    fn deliver_quietly(&self, what: &'static str, fut: RFuture<()>) {
        self.deliver(fut, move |res| {
            if let Err(e) = res {
                warn!("dispatch::{}() -- background operation failed: {}", what, e);
            }
        });
    }

    // -------------------------------------------------------------------------
    // save
    // -------------------------------------------------------------------------

    /// Save a record, blocking until the server answers.
    pub fn try_save(&self, record: &Record) -> RResult<()> {
        self.save_here(record)
    }

    /// Save a record, blocking. Failures are logged.
    pub fn save(&self, record: &Record) -> bool {
        match self.try_save(record) {
            Ok(_) => true,
            Err(e) => {
                warn!("dispatch::save() -- {}: {}", record.describe(), e);
                false
            }
        }
    }

    pub fn save_with_error(&self, record: &Record, error: &mut Option<RError>) -> bool {
        report(self.try_save(record), error)
    }

    pub fn save_async(&self, record: &Record) -> RFuture<()> {
        flatten(self.start_save(record))
    }

    pub fn save_in_background(&self, record: &Record) -> RResult<()> {
        let fut = self.start_save(record)?;
        self.deliver_quietly("save_in_background", fut);
        Ok(())
    }

    pub fn save_in_background_with_target<T>(&self, record: &Record, target: Arc<T>) -> RResult<()>
        where T: ResultTarget<bool>
    {
        let fut = self.start_save(record)?;
        self.deliver(fut, move |res| {
            let (ok, err) = callback::bool_result(res);
            target.callback_with_result(ok, err);
        });
        Ok(())
    }

    pub fn save_in_background_with_callback<F>(&self, record: &Record, cb: F) -> RResult<()>
        where F: FnOnce(bool, Option<RError>) + Send + 'static
    {
        let fut = self.start_save(record)?;
        self.deliver(fut, move |res| {
            let (ok, err) = callback::bool_result(res);
            cb(ok, err);
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // delete
    // -------------------------------------------------------------------------

    /// Delete a record from the server, blocking. Records that were never
    /// saved fail with `NotSaved` without touching the network.
    pub fn try_delete(&self, record: &Record) -> RResult<()> {
        self.delete_here(record)
    }

    pub fn delete(&self, record: &Record) -> bool {
        match self.try_delete(record) {
            Ok(_) => true,
            Err(e) => {
                warn!("dispatch::delete() -- {}: {}", record.describe(), e);
                false
            }
        }
    }

    pub fn delete_with_error(&self, record: &Record, error: &mut Option<RError>) -> bool {
        report(self.try_delete(record), error)
    }

    pub fn delete_async(&self, record: &Record) -> RFuture<()> {
        flatten(self.start_delete(record))
    }

    pub fn delete_in_background(&self, record: &Record) -> RResult<()> {
        let fut = self.start_delete(record)?;
        self.deliver_quietly("delete_in_background", fut);
        Ok(())
    }

    pub fn delete_in_background_with_target<T>(&self, record: &Record, target: Arc<T>) -> RResult<()>
        where T: ResultTarget<bool>
    {
        let fut = self.start_delete(record)?;
        self.deliver(fut, move |res| {
            let (ok, err) = callback::bool_result(res);
            target.callback_with_result(ok, err);
        });
        Ok(())
    }

    pub fn delete_in_background_with_callback<F>(&self, record: &Record, cb: F) -> RResult<()>
        where F: FnOnce(bool, Option<RError>) + Send + 'static
    {
        let fut = self.start_delete(record)?;
        self.deliver(fut, move |res| {
            let (ok, err) = callback::bool_result(res);
            cb(ok, err);
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // refresh
    // -------------------------------------------------------------------------

    /// Replace a record's local state with the server's copy, blocking. Any
    /// unsaved local edits are thrown away.
    pub fn try_refresh(&self, record: &Record) -> RResult<Record> {
        self.refresh_here(record)
    }

    pub fn refresh(&self, record: &Record) -> bool {
        match self.try_refresh(record) {
            Ok(_) => true,
            Err(e) => {
                warn!("dispatch::refresh() -- {}: {}", record.describe(), e);
                false
            }
        }
    }

    pub fn refresh_with_error(&self, record: &Record, error: &mut Option<RError>) -> bool {
        report(self.try_refresh(record).map(|_| ()), error)
    }

    pub fn refresh_async(&self, record: &Record) -> RFuture<Record> {
        flatten(self.start_refresh(record))
    }

    pub fn refresh_in_background_with_target<T>(&self, record: &Record, target: Arc<T>) -> RResult<()>
        where T: ResultTarget<Option<Record>>
    {
        let fut = self.start_refresh(record)?;
        self.deliver(fut, move |res| {
            let (rec, err) = callback::record_result(res);
            target.callback_with_result(rec, err);
        });
        Ok(())
    }

    pub fn refresh_in_background_with_callback<F>(&self, record: &Record, cb: F) -> RResult<()>
        where F: FnOnce(Option<Record>, Option<RError>) + Send + 'static
    {
        let fut = self.start_refresh(record)?;
        self.deliver(fut, move |res| {
            let (rec, err) = callback::record_result(res);
            cb(rec, err);
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // fetch
    // -------------------------------------------------------------------------

    /// Load the object a pointer points at (say, one read from a field with
    /// `Record::get_pointer`) as a new, clean record. Blocks.
    pub fn try_fetch(&self, pointer: &Pointer) -> RResult<Record> {
        ops::run_fetch(&*self.remote, pointer)
    }

    pub fn fetch_async(&self, pointer: &Pointer) -> RFuture<Record> {
        let remote = self.remote.clone();
        let pointer = pointer.clone();
        self.work.run_async(move || ops::run_fetch(&*remote, &pointer))
    }

    // -------------------------------------------------------------------------
    // save_all
    // -------------------------------------------------------------------------

    /// Save a group of records as one operation, blocking. Unsaved records
    /// that are referenced get saved before the records pointing at them
    /// (and are saved even if they aren't in `records`). If some records fail
    /// the rest still save, and the error is an `RError::Batch` listing the
    /// failures.
    pub fn try_save_all(&self, records: &[Record]) -> RResult<()> {
        self.save_all_here(records)
    }

    pub fn save_all(&self, records: &[Record]) -> bool {
        match self.try_save_all(records) {
            Ok(_) => true,
            Err(e) => {
                warn!("dispatch::save_all() -- {}", e);
                false
            }
        }
    }

    pub fn save_all_with_error(&self, records: &[Record], error: &mut Option<RError>) -> bool {
        report(self.try_save_all(records), error)
    }

    pub fn save_all_async(&self, records: &[Record]) -> RFuture<()> {
        flatten(self.start_save_all(records))
    }

    pub fn save_all_in_background(&self, records: &[Record]) -> RResult<()> {
        let fut = self.start_save_all(records)?;
        self.deliver_quietly("save_all_in_background", fut);
        Ok(())
    }

    pub fn save_all_in_background_with_target<T>(&self, records: &[Record], target: Arc<T>) -> RResult<()>
        where T: ResultTarget<bool>
    {
        let fut = self.start_save_all(records)?;
        self.deliver(fut, move |res| {
            let (ok, err) = callback::bool_result(res);
            target.callback_with_result(ok, err);
        });
        Ok(())
    }

    pub fn save_all_in_background_with_callback<F>(&self, records: &[Record], cb: F) -> RResult<()>
        where F: FnOnce(bool, Option<RError>) + Send + 'static
    {
        let fut = self.start_save_all(records)?;
        self.deliver(fut, move |res| {
            let (ok, err) = callback::bool_result(res);
            cb(ok, err);
        });
        Ok(())
    }
}
