//! Saving a bunch of records as one operation.
//!
//! Records can point at records that don't have ids yet, and a pointer can't
//! be sent until its target has one. So before anything goes out we:
//!
//! 1. pull any unsaved reference targets into the batch (even if the caller
//!    didn't list them),
//! 2. sort the batch into waves, where every record in a wave only depends on
//!    records from earlier waves (stable, so input order is kept within a
//!    wave). A cycle among unsaved records fails the whole batch up front.
//!
//! Each wave goes out via the remote's batch call, chunked to
//! `batch.max_size`. If a record fails, records depending on it are skipped,
//! everything else still saves, and one aggregated error comes back.

use ::std::collections::HashMap;

use crate::error::{RError, RResult};
use crate::models::record::{OpGuard, OpKind, Record, SaveSnapshot};
use crate::remote::{Remote, SaveRequest};

/// A batch that passed its local checks and has every record claimed.
pub struct BatchPlan {
    /// Caller's records first (deduped), then any pulled-in targets
    records: Vec<Record>,
    /// records[i] can't be sent until every records[j] in deps[i] is saved
    deps: Vec<Vec<usize>>,
    waves: Vec<Vec<usize>>,
    /// Held until the plan is dropped
    _guards: Vec<OpGuard>,
}

impl BatchPlan {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn waves(&self) -> &Vec<Vec<usize>> {
        &self.waves
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Pending,
    Saved,
    Failed,
}

/// Collect the records in the batch and who depends on whom
fn collect(input: &[Record]) -> (Vec<Record>, Vec<Vec<usize>>) {
    let mut records: Vec<Record> = Vec::with_capacity(input.len());
    let mut index: HashMap<usize, usize> = HashMap::new();
    for rec in input {
        if index.contains_key(&rec.addr()) { continue; }
        index.insert(rec.addr(), records.len());
        records.push(rec.clone());
    }

    let mut deps: Vec<Vec<usize>> = Vec::with_capacity(records.len());
    let mut i = 0;
    // records grows as we pull in targets, so no iterator here
    while i < records.len() {
        let mut mine: Vec<usize> = Vec::new();
        for target in records[i].references() {
            if target.object_id().is_some() { continue; }
            let idx = match index.get(&target.addr()) {
                Some(x) => *x,
                None => {
                    debug!("dispatch::batch::collect() -- pulling in unsaved {} referenced by {}", target.describe(), records[i].describe());
                    let idx = records.len();
                    index.insert(target.addr(), idx);
                    records.push(target);
                    idx
                }
            };
            if !mine.contains(&idx) { mine.push(idx); }
        }
        deps.push(mine);
        i += 1;
    }
    (records, deps)
}

/// Kahn's algorithm, one wave at a time
fn order(records: &[Record], deps: &[Vec<usize>]) -> RResult<Vec<Vec<usize>>> {
    let mut placed = vec![false; records.len()];
    let mut waves: Vec<Vec<usize>> = Vec::new();
    let mut remaining = records.len();
    while remaining > 0 {
        let wave: Vec<usize> = (0..records.len())
            .filter(|i| !placed[*i])
            .filter(|i| deps[*i].iter().all(|d| placed[*d]))
            .collect();
        if wave.is_empty() {
            let stuck: Vec<String> = (0..records.len())
                .filter(|i| !placed[*i])
                .map(|i| records[i].describe())
                .collect();
            return Err(RError::CircularReference(format!("unsaved records reference each other: {}", stuck.join(", "))));
        }
        for i in &wave {
            placed[*i] = true;
        }
        remaining -= wave.len();
        waves.push(wave);
    }
    Ok(waves)
}

/// Run the local half of a batch save: dependency ordering, cycle detection,
/// and claiming every record. Nothing touches the network here.
pub fn plan(input: &[Record]) -> RResult<BatchPlan> {
    let (records, deps) = collect(input);
    let waves = order(&records, &deps)?;
    let mut guards: Vec<OpGuard> = Vec::with_capacity(records.len());
    for rec in &records {
        // any failure drops the guards we already took
        guards.push(rec.begin(OpKind::Save)?);
    }
    Ok(BatchPlan {
        records: records,
        deps: deps,
        waves: waves,
        _guards: guards,
    })
}

/// Make a copy of an error for every record a single failure applies to
fn echo(err: &RError) -> RError {
    match *err {
        RError::Network(ref x) => RError::Network(x.clone()),
        RError::Validation(ref x) => RError::Validation(x.clone()),
        RError::NotSaved(ref x) => RError::NotSaved(x.clone()),
        RError::InvalidState(ref x) => RError::InvalidState(x.clone()),
        RError::CircularReference(ref x) => RError::CircularReference(x.clone()),
        RError::Msg(ref x) => RError::Msg(x.clone()),
        RError::Boxed(_) | RError::Batch(..) => RError::Msg(format!("{}", err)),
    }
}

/// Send one chunk of a wave and record what happened to each record in it
fn send_chunk(remote: &dyn Remote, plan: &BatchPlan, chunk: Vec<(usize, SaveSnapshot)>, outcomes: &mut Vec<Outcome>, errors: &mut Vec<(usize, RError)>) {
    let reqs: Vec<SaveRequest> = chunk.iter().map(|x| x.1.request.clone()).collect();
    info!("dispatch::batch::send_chunk() -- sending {} records", reqs.len());
    let results = match remote.batch_create_or_update(&reqs) {
        Ok(x) => x,
        Err(e) => {
            warn!("dispatch::batch::send_chunk() -- batch call failed: {}", e);
            for (idx, _) in chunk {
                outcomes[idx] = Outcome::Failed;
                errors.push((idx, echo(&e)));
            }
            return;
        }
    };
    let mut results = results.into_iter();
    for (idx, snapshot) in chunk {
        let record = &plan.records[idx];
        let res = match results.next() {
            Some(x) => x,
            None => Err(RError::Msg(String::from("remote returned fewer batch results than requests"))),
        };
        match res.and_then(|x| record.apply_save(&snapshot, &x)) {
            Ok(_) => outcomes[idx] = Outcome::Saved,
            Err(e) => {
                warn!("dispatch::batch::send_chunk() -- {}: {}", record.describe(), e);
                outcomes[idx] = Outcome::Failed;
                errors.push((idx, e));
            }
        }
    }
}

/// Run the network half of a batch save. Consumes the plan, so every record is
/// released when this returns.
pub fn run(remote: &dyn Remote, plan: BatchPlan, max_size: usize) -> RResult<()> {
    let max_size = if max_size == 0 { 1 } else { max_size };
    let total = plan.len();
    let mut outcomes = vec![Outcome::Pending; total];
    let mut errors: Vec<(usize, RError)> = Vec::new();

    for wave in plan.waves() {
        let mut sendable: Vec<(usize, SaveSnapshot)> = Vec::with_capacity(wave.len());
        for idx in wave {
            let idx = *idx;
            let record = &plan.records[idx];
            if let Some(dep) = plan.deps[idx].iter().find(|d| outcomes[**d] != Outcome::Saved) {
                outcomes[idx] = Outcome::Failed;
                errors.push((idx, RError::NotSaved(format!("{} skipped: the {} it references failed to save", record.describe(), plan.records[*dep].describe()))));
                continue;
            }
            if !record.is_dirty() {
                outcomes[idx] = Outcome::Saved;
                continue;
            }
            // snapshots are taken per wave so pointers pick up the ids the
            // previous waves just got
            match record.snapshot() {
                Ok(snapshot) => sendable.push((idx, snapshot)),
                Err(e) => {
                    outcomes[idx] = Outcome::Failed;
                    errors.push((idx, e));
                }
            }
        }
        while !sendable.is_empty() {
            let rest = if sendable.len() > max_size { sendable.split_off(max_size) } else { Vec::new() };
            send_chunk(remote, &plan, sendable, &mut outcomes, &mut errors);
            sendable = rest;
        }
    }

    let failed = errors.len();
    info!("dispatch::batch::run() -- {} records, {} failed", total, failed);
    if failed > 0 {
        errors.sort_by_key(|x| x.0);
        return Err(RError::Batch(failed, total, errors));
    }
    Ok(())
}
