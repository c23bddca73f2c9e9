include!("./_lib.rs");

#[cfg(test)]
mod tests {
    use super::*;

    use ::std::sync::mpsc;

    use recsync::{RError, Record};

    fn named(class_name: &str, name: &str) -> Record {
        let rec = Record::new(class_name).unwrap();
        rec.set("name", &name).unwrap();
        rec
    }

    #[test]
    fn referenced_records_save_first() {
        let (remote, dispatch) = setup();
        let a = named("Note", "a");
        let b = named("Author", "b");
        a.set_reference("author", &b).unwrap();

        assert!(dispatch.save_all(&[a.clone(), b.clone()]));
        assert!(!a.is_dirty() && !b.is_dirty());
        let server = remote.peek("Note", &a.object_id().unwrap()).unwrap();
        assert_eq!(server["author"]["objectId"], json!(b.object_id().unwrap()));
        // one wave per dependency level
        assert_eq!(remote.stats().batches, 2);
    }

    #[test]
    fn unlisted_targets_come_along() {
        let (remote, dispatch) = setup();
        let a = named("Note", "a");
        let b = named("Author", "b");
        let c = named("Avatar", "c");
        a.set_reference("author", &b).unwrap();
        b.set_reference("avatar", &c).unwrap();

        dispatch.try_save_all(&[a.clone()]).unwrap();
        assert!(c.object_id().is_some());
        assert_eq!(remote.count("Author"), 1);
        assert_eq!(remote.count("Avatar"), 1);
        let server = remote.peek("Author", &b.object_id().unwrap()).unwrap();
        assert_eq!(server["avatar"]["objectId"], json!(c.object_id().unwrap()));
    }

    #[test]
    fn cycles_fail_up_front() {
        let (remote, dispatch) = setup();
        let a = named("Note", "a");
        let b = named("Note", "b");
        a.set_reference("other", &b).unwrap();
        b.set_reference("other", &a).unwrap();

        let mut err = None;
        assert!(!dispatch.save_all_with_error(&[a.clone(), b.clone()], &mut err));
        match err {
            Some(RError::CircularReference(_)) => (),
            _ => panic!("expected CircularReference"),
        }
        assert_eq!(remote.stats(), Default::default());
        assert!(a.is_dirty() && b.is_dirty());
        assert_eq!(a.in_flight(), None);

        // saving one side first breaks the cycle
        b.remove("other");
        assert!(dispatch.save(&b));
        assert!(dispatch.save_all(&[a.clone(), b.clone()]));
        // the rest of b's cycle can go in now that both have ids
        b.set_reference("other", &a).unwrap();
        assert!(dispatch.save(&b));
    }

    #[test]
    fn partial_failure() {
        let (remote, dispatch) = setup();
        remote.fail_class("Author");
        let a = named("Note", "depends on a failure");
        let b = named("Author", "fails");
        let c = named("Note", "independent");
        a.set_reference("author", &b).unwrap();

        match dispatch.try_save_all(&[a.clone(), b.clone(), c.clone()]) {
            Err(RError::Batch(failed, total, errors)) => {
                assert_eq!((failed, total), (2, 3));
                let idx: Vec<usize> = errors.iter().map(|x| x.0).collect();
                assert_eq!(idx, vec![0, 1]);
            }
            _ => panic!("expected a batch error"),
        }
        assert!(a.is_dirty() && a.object_id().is_none());
        assert!(b.is_dirty() && b.object_id().is_none());
        assert!(!c.is_dirty());
        assert_eq!(remote.count("Note"), 1);
        // a's request never went out
        assert_eq!(remote.stats().saves, 2);
    }

    #[test]
    fn clean_and_saved_records_cost_nothing() {
        let (remote, dispatch) = setup();
        let a = named("Note", "a");
        let b = named("Note", "b");
        assert!(dispatch.save_all(&[a.clone(), b.clone()]));
        let before = remote.stats();
        assert!(dispatch.save_all(&[a.clone(), b.clone()]));
        assert!(dispatch.save_all(&[]));
        assert_eq!(remote.stats(), before);
    }

    #[test]
    fn big_batches_get_chunked() {
        recsync::init(r#"{"batch":{"max_size":50}}"#).unwrap();
        let (remote, dispatch) = setup();
        let records: Vec<Record> = (0..120).map(|i| named("Note", &format!("{}", i))).collect();
        assert!(dispatch.save_all(&records));
        assert_eq!(remote.count("Note"), 120);
        assert_eq!(remote.stats().batches, 3);
    }

    #[test]
    fn background_batches() {
        let (remote, dispatch) = setup();
        let a = named("Note", "a");
        let b = named("Author", "b");
        a.set_reference("author", &b).unwrap();

        let (tx, rx) = mpsc::channel();
        dispatch.save_all_in_background_with_callback(&[a.clone()], move |ok, err| {
            tx.send((ok, err.is_none())).unwrap();
        }).unwrap();
        assert_eq!(rx.recv().unwrap(), (true, true));
        assert!(!a.is_dirty() && !b.is_dirty());

        let c = named("Note", "c");
        futures::executor::block_on(dispatch.save_all_async(&[c.clone()])).unwrap();
        assert_eq!(remote.count("Note"), 2);

        // busy records are refused before anything is sent
        let d = named("Note", "d");
        let (tx, rx) = mpsc::channel();
        dispatch.save_all_in_background_with_callback(&[d.clone()], move |ok, _| tx.send(ok).unwrap()).unwrap();
        match dispatch.save_all_in_background(&[d.clone()]) {
            Err(RError::InvalidState(_)) | Ok(_) => (),
            Err(e) => panic!("unexpected error: {}", e),
        }
        assert!(rx.recv().unwrap());
    }
}
