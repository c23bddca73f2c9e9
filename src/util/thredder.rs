//! Thredder is a wrapper around a cpu thread pooling implementation. It works
//! using futures: hand it a blocking closure and get back a future that
//! resolves when a pool thread has run it.

use ::std::marker::Send;

use ::futures::{Future, FutureExt};
use ::futures::channel::oneshot;
use ::futures::executor::ThreadPool;

use crate::error::{RError, RResult, RFuture};

/// Stores state information for a thread we've spawned.
pub struct Thredder {
    /// Our Thredder's name
    pub name: String,
    /// Stores the thread pooler for this Thredder
    pool: ThreadPool,
}

impl Thredder {
    /// Create a new thredder
    pub fn new(name: &str, workers: u32) -> RResult<Thredder> {
        let workers = if workers == 0 { 1 } else { workers };
        let pool = ThreadPool::builder()
            .pool_size(workers as usize)
            .name_prefix(format!("{}-", name))
            .create()?;
        Ok(Thredder {
            name: String::from(name),
            pool: pool,
        })
    }

    /// Run an operation on this pool, returning the Future to be waited on at
    /// a later time. The operation runs to completion whether or not anyone
    /// ever polls the returned future.
    pub fn run_async<F, T>(&self, run: F) -> RFuture<T>
        where T: Send + 'static,
              F: FnOnce() -> RResult<T> + Send + 'static
    {
        let (tx, rx) = oneshot::channel::<RResult<T>>();
        let name = self.name.clone();
        self.pool.spawn_ok(async move {
            if tx.send(run()).is_err() {
                trace!("Thredder({}).run_async() -- receiver went away", name);
            }
        });
        let name = self.name.clone();
        rx.map(move |res| {
            match res {
                Ok(x) => x,
                Err(_) => Err(RError::Msg(format!("Thredder({}).run_async() -- worker dropped the operation", name))),
            }
        }).boxed()
    }

    /// Drive a future to completion on this pool, ignoring its output
    pub fn spawn_future<F>(&self, future: F)
        where F: Future<Output = ()> + Send + 'static
    {
        self.pool.spawn_ok(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::futures::executor;
    use ::std::sync::mpsc;
    use ::std::thread;

    #[test]
    fn runs_async() {
        let work = Thredder::new("test-work", 2).unwrap();
        assert_eq!(executor::block_on(work.run_async(|| Ok(2 + 2))).unwrap(), 4);
        let fut = work.run_async(|| -> RResult<String> { Err(RError::Msg(String::from("nope"))) });
        assert!(executor::block_on(fut).is_err());
    }

    #[test]
    fn spawned_futures_run_on_named_threads() {
        let deliver = Thredder::new("test-deliver", 1).unwrap();
        let (tx, rx) = mpsc::channel();
        deliver.spawn_future(async move {
            let name = thread::current().name().map(|x| String::from(x));
            tx.send(name).unwrap();
        });
        let name = rx.recv().unwrap().unwrap();
        assert!(name.starts_with("test-deliver-"));
    }
}
