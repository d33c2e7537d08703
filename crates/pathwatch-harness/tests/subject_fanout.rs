//! `PathSubject` over the reference graph.

use std::cell::RefCell;
use std::rc::Rc;

use pathwatch::{Listener, PathSubject, SubjectConfig};
use pathwatch_harness::{Complex, Holder, Owner, deep_path};

type Log = Rc<RefCell<Vec<Option<i32>>>>;

fn recorder() -> (Listener<i32>, Log) {
    let log: Log = Rc::default();
    let l = Rc::clone(&log);
    (Rc::new(move |v| l.borrow_mut().push(v)), log)
}

#[test]
fn listeners_see_null_tolerant_values() {
    let owner = Owner::populated(1);
    let subject = PathSubject::new(owner.clone(), deep_path()).unwrap();
    let (listener, log) = recorder();
    subject.add(&listener);

    owner.complex().unwrap().set_value(None);
    owner.complex().unwrap().set_value(Some(Holder::populated(4)));
    owner.int_property().unwrap().set_value(5);
    assert_eq!(*log.borrow(), vec![None, Some(4), Some(5)]);
}

#[test]
fn same_listener_added_twice_is_notified_once() {
    let owner = Owner::populated(1);
    let subject = PathSubject::new(owner.clone(), deep_path()).unwrap();
    let (listener, log) = recorder();
    assert!(subject.add(&listener));
    assert!(!subject.add(&Rc::clone(&listener)));

    owner.int_property().unwrap().set_value(2);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn removal_sends_exactly_one_final_notification() {
    let owner = Owner::populated(1);
    let subject = PathSubject::new(owner.clone(), deep_path()).unwrap();
    let (listener, log) = recorder();
    subject.add(&listener);

    assert!(subject.remove(&listener));
    assert_eq!(*log.borrow(), vec![Some(1)]);

    owner.int_property().unwrap().set_value(2);
    owner.set_complex(Some(Complex::populated(3)));
    assert_eq!(*log.borrow(), vec![Some(1)]);
}

#[test]
fn dispose_flushes_then_silences() {
    let owner = Owner::populated(7);
    let subject = PathSubject::new(owner.clone(), deep_path()).unwrap();
    let (a, log_a) = recorder();
    let (b, log_b) = recorder();
    subject.add(&a);
    subject.add(&b);

    subject.dispose();
    assert_eq!(*log_a.borrow(), vec![Some(7)]);
    assert_eq!(*log_b.borrow(), vec![Some(7)]);
    assert_eq!(owner.listener_count(), 0);

    owner.int_property().unwrap().set_value(8);
    assert_eq!(log_a.borrow().len(), 1);
}

#[test]
fn dispose_without_flush() {
    let owner = Owner::populated(7);
    let subject = PathSubject::with_config(
        owner.clone(),
        deep_path(),
        SubjectConfig::default().with_flush_on_dispose(false),
    )
    .unwrap();
    let (a, log) = recorder();
    subject.add(&a);
    subject.dispose();
    assert!(log.borrow().is_empty());
    assert_eq!(subject.listener_count(), 0);
}

#[test]
fn subject_current_matches_graph() {
    let owner = Owner::empty();
    let subject = PathSubject::new(owner.clone(), deep_path()).unwrap();
    assert_eq!(subject.current(), None);
    owner.set_complex(Some(Complex::populated(12)));
    assert_eq!(subject.current(), owner.leaf_value());
    assert_eq!(subject.key(), "owner.Complex.Value.IntProperty.Value");
}
