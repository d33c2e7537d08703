//! End-to-end observer behavior over the reference graph.

use std::cell::RefCell;
use std::rc::Rc;

use pathwatch::{Handle, ObservationSet, PathError, PathObserver, PropertyPath};
use pathwatch_harness::{Complex, Counter, Holder, IntProperty, Owner, deep_path, holder_path};

fn deep() -> PropertyPath {
    deep_path().into_path()
}

fn observe(owner: &Rc<Owner>, counter: &Counter) -> PathObserver {
    PathObserver::new(owner.clone(), deep(), counter.callback()).unwrap()
}

#[test]
fn terminal_change_fires_exactly_once() {
    let owner = Owner::populated(0);
    let counter = Counter::new();
    let _observer = observe(&owner, &counter);

    owner.int_property().unwrap().set_value(1);
    assert_eq!(counter.get(), 1);

    // Same value: nothing raised, nothing fired.
    owner.int_property().unwrap().set_value(1);
    assert_eq!(counter.get(), 1);
}

#[test]
fn two_level_path_fires_once_per_change() {
    let owner = Owner::populated(0);
    let counter = Counter::new();
    let _observer =
        PathObserver::new(owner.clone(), holder_path().into_path(), counter.callback()).unwrap();

    owner.complex().unwrap().set_value(Some(Holder::populated(1)));
    assert_eq!(counter.get(), 1);
}

#[test]
fn replacing_intermediate_moves_subscription() {
    let owner = Owner::populated(0);
    let counter = Counter::new();
    let observer = observe(&owner, &counter);

    let old_complex = owner.complex().unwrap();
    let old_leaf = owner.int_property().unwrap();
    owner.set_complex(Some(Complex::populated(5)));
    assert_eq!(counter.get(), 1);

    // The old subtree is fully detached.
    assert_eq!(old_complex.listener_count(), 0);
    assert_eq!(old_leaf.listener_count(), 0);
    old_leaf.set_value(99);
    old_complex.set_value(None);
    assert_eq!(counter.get(), 1);

    // The new subtree is live.
    assert_eq!(observer.attached_nodes(), 4);
    owner.int_property().unwrap().set_value(6);
    assert_eq!(counter.get(), 2);
}

#[test]
fn unobservable_root_fails_before_subscribing() {
    struct Plain;
    impl pathwatch::Model for Plain {
        fn notifiable(&self) -> Option<&dyn pathwatch::Notifiable> {
            None
        }
    }

    let counter = Counter::new();
    let err = PathObserver::new(Rc::new(Plain), deep(), counter.callback()).unwrap_err();
    assert!(matches!(err, PathError::RootNotObservable { .. }));
}

#[test]
fn duplicate_registration_fires_once() {
    let owner = Owner::populated(0);
    let counter = Counter::new();
    let mut set = ObservationSet::new(counter.callback());
    assert!(set.observe(owner.clone(), deep()).unwrap());
    assert!(!set.observe(owner.clone(), deep()).unwrap());
    assert_eq!(owner.listener_count(), 1);

    owner.int_property().unwrap().set_value(3);
    assert_eq!(counter.get(), 1);
}

#[test]
fn dispose_tears_down_whole_chain() {
    let owner = Owner::populated(0);
    let counter = Counter::new();
    let observer = observe(&owner, &counter);
    let complex = owner.complex().unwrap();
    let holder = complex.value().unwrap();
    let leaf = holder.int_property().unwrap();

    observer.dispose();
    for count in [
        owner.listener_count(),
        complex.listener_count(),
        holder.listener_count(),
        leaf.listener_count(),
    ] {
        assert_eq!(count, 0);
    }

    leaf.set_value(1);
    holder.set_int_property(Some(IntProperty::new(2)));
    complex.set_value(None);
    owner.set_complex(None);
    owner.refresh();
    assert_eq!(counter.get(), 0);
}

/// Nulling `Complex.Value` is itself an accepted change of an observed
/// property, so it fires once. Nothing fires from the detached subtree and
/// no error is raised.
#[test]
fn null_intermediate_then_repopulate() {
    let owner = Owner::populated(0);
    let counter = Counter::new();
    let observer = observe(&owner, &counter);
    let complex = owner.complex().unwrap();

    complex.set_value(None);
    assert_eq!(counter.get(), 1);
    assert_eq!(observer.attached_nodes(), 2);
    assert_eq!(owner.leaf_value(), None);

    complex.set_value(Some(Holder::populated(10)));
    assert_eq!(counter.get(), 2);
    assert_eq!(observer.attached_nodes(), 4);

    owner.int_property().unwrap().set_value(11);
    assert_eq!(counter.get(), 3);
}

#[test]
fn unrelated_root_property_is_ignored() {
    let owner = Owner::populated(0);
    let counter = Counter::new();
    let _observer = observe(&owner, &counter);
    owner.set_title("renamed");
    assert_eq!(owner.title(), "renamed");
    assert_eq!(counter.get(), 0);

    owner.refresh();
    assert_eq!(counter.get(), 1);
}

#[test]
fn explicit_owners_share_one_callback() {
    let a = Owner::populated(0);
    let b = Owner::empty();
    let counter = Counter::new();
    let observer =
        PathObserver::with_owners([a.clone() as Handle, b.clone() as Handle], deep(), counter.callback())
            .unwrap();
    assert_eq!(observer.attached_nodes(), 5);

    a.int_property().unwrap().set_value(1);
    b.set_complex(Some(Complex::populated(0)));
    b.int_property().unwrap().set_value(2);
    assert_eq!(counter.get(), 3);
}

#[test]
fn callback_disposing_its_own_observer_stops_rewalk() {
    let owner = Owner::populated(0);
    let slot: Rc<RefCell<Option<Rc<PathObserver>>>> = Rc::default();
    let s = Rc::clone(&slot);
    let observer = Rc::new(
        PathObserver::new(owner.clone(), deep(), move || {
            if let Some(observer) = s.borrow().as_ref() {
                observer.dispose();
            }
        })
        .unwrap(),
    );
    *slot.borrow_mut() = Some(Rc::clone(&observer));

    owner.set_complex(Some(Complex::populated(1)));
    assert!(observer.is_disposed());
    assert_eq!(observer.attached_nodes(), 0);
    assert_eq!(owner.complex().unwrap().listener_count(), 0);
    slot.borrow_mut().take();
}

#[test]
fn callback_may_mutate_graph_reentrantly() {
    let owner = Owner::populated(0);
    let counter = Counter::new();
    let inner = counter.callback();
    let o = Rc::downgrade(&owner);
    let _observer = PathObserver::new(owner.clone(), deep(), move || {
        inner();
        // Bounce the terminal value back to 0 once.
        if let Some(owner) = o.upgrade() {
            if let Some(leaf) = owner.int_property() {
                leaf.set_value(0);
            }
        }
    })
    .unwrap();

    owner.int_property().unwrap().set_value(5);
    // 5 fires, the nested reset to 0 fires, the second reset is a no-op.
    assert_eq!(counter.get(), 2);
    assert_eq!(owner.leaf_value(), Some(0));
}

#[test]
fn dropped_observer_leaves_no_listeners() {
    let owner = Owner::populated(0);
    let leaf = owner.int_property().unwrap();
    {
        let _observer = observe(&owner, &Counter::new());
        assert_eq!(leaf.listener_count(), 1);
    }
    assert_eq!(owner.listener_count(), 0);
    assert_eq!(leaf.listener_count(), 0);
}
