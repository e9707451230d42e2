use crate::action::{Action, Reducer};
use crate::policy::StructuralEquality;
use crate::update_queue::{EagerState, UpdateQueue};
use std::rc::Rc;

fn queue(initial: i32) -> UpdateQueue<i32> {
    UpdateQueue::new(initial, Rc::new(StructuralEquality))
}

fn replaced(queue: &UpdateQueue<i32>) -> Vec<String> {
    queue
        .iter()
        .map(|update| match update.action() {
            Action::Replace(value) => value.to_string(),
            Action::Apply(_) => "fn".to_string(),
        })
        .collect()
}

#[test]
fn empty_queue_has_no_pending_update() {
    let queue = queue(0);
    assert!(queue.is_empty());
    assert_eq!(queue.len(), 0);
    assert_eq!(queue.pending(), None);
    assert_eq!(queue.head(), None);
    assert_eq!(queue.iter().count(), 0);
}

#[test]
fn single_update_points_at_itself() {
    let mut queue = queue(0);
    let id = queue.enqueue(Action::Replace(1));
    assert_eq!(queue.pending(), Some(id));
    assert_eq!(queue.head(), Some(id));
    assert_eq!(queue.get(id).expect("update").next(), id);
}

#[test]
fn enqueue_splices_behind_the_tail() {
    let mut queue = queue(0);
    let first = queue.enqueue(Action::Replace(1));
    let second = queue.enqueue(Action::Replace(2));
    let third = queue.enqueue(Action::Replace(3));

    assert_eq!(queue.pending(), Some(third));
    assert_eq!(queue.head(), Some(first));
    assert_eq!(queue.get(first).expect("first").next(), second);
    assert_eq!(queue.get(second).expect("second").next(), third);
    assert_eq!(queue.get(third).expect("third").next(), first);
    assert_eq!(replaced(&queue), vec!["1", "2", "3"]);
    assert_eq!(queue.len(), 3);
}

#[test]
fn consume_through_keeps_later_updates() {
    let mut queue = queue(0);
    queue.enqueue(Action::Replace(1));
    let through = queue.enqueue(Action::Replace(2));
    let later = queue.enqueue(Action::Replace(3));
    let newest = queue.enqueue(Action::Replace(4));

    assert_eq!(queue.consume_through(through), 2);
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.head(), Some(later));
    assert_eq!(queue.pending(), Some(newest));
    assert_eq!(queue.get(newest).expect("tail").next(), later);
    assert_eq!(replaced(&queue), vec!["3", "4"]);

    // Freed slots are reused and the ring stays intact.
    queue.enqueue(Action::Replace(5));
    assert_eq!(replaced(&queue), vec!["3", "4", "5"]);
}

#[test]
fn consume_through_tail_empties_the_queue() {
    let mut queue = queue(0);
    queue.enqueue(Action::Replace(1));
    let tail = queue.enqueue(Action::Replace(2));

    assert_eq!(queue.consume_through(tail), 2);
    assert!(queue.is_empty());
    assert_eq!(queue.len(), 0);
    assert_eq!(queue.consume_through(tail), 0);
}

#[test]
fn snapshot_folds_oldest_first() {
    let mut queue = queue(0);
    queue.enqueue(Action::apply(|n: &i32| n + 1));
    queue.enqueue(Action::apply(|n: &i32| n + 1));
    queue.enqueue(Action::Replace(5));
    let tail = queue.enqueue(Action::apply(|n: &i32| n + 1));

    let pending = queue.snapshot();
    assert_eq!(pending.through(), Some(tail));
    assert_eq!(pending.resolve(&0, Reducer::Basic), 6);
}

#[test]
fn snapshot_of_empty_queue_returns_base() {
    let queue = queue(3);
    let pending = queue.snapshot();
    assert_eq!(pending.through(), None);
    assert_eq!(pending.resolve(&3, Reducer::Basic), 3);
}

#[test]
fn lone_eager_update_reuses_cached_state() {
    let mut queue = queue(0);
    let id = queue.enqueue_with_eager(
        Action::apply(|_: &i32| -> i32 { panic!("eager result should be reused") }),
        Some(EagerState {
            state: 42,
            reducer: Reducer::Basic,
        }),
    );
    let update = queue.get(id).expect("update queued");
    assert_eq!(update.eager_reducer(), Some(Reducer::Basic));
    assert_eq!(update.eager_state(), Some(&42));
    assert_eq!(queue.snapshot().resolve(&0, Reducer::Basic), 42);
}

#[test]
fn plain_enqueue_carries_no_eager_state() {
    let mut queue = queue(0);
    let id = queue.enqueue(Action::Replace(3));
    let update = queue.get(id).expect("update queued");
    assert_eq!(update.eager_reducer(), None);
    assert_eq!(update.eager_state(), None);
}

#[test]
fn eager_state_is_ignored_when_other_updates_precede_it() {
    let mut queue = queue(0);
    queue.enqueue(Action::apply(|n: &i32| n + 10));
    queue.enqueue_with_eager(
        Action::apply(|n: &i32| n * 2),
        Some(EagerState {
            state: 0,
            reducer: Reducer::Basic,
        }),
    );
    assert_eq!(queue.snapshot().resolve(&1, Reducer::Basic), 22);
}

#[test]
fn detach_drops_pending_updates() {
    let mut queue = queue(0);
    queue.enqueue(Action::Replace(1));
    queue.detach();
    assert!(queue.is_detached());
    assert!(queue.is_empty());
}

#[test]
fn last_rendered_bookkeeping() {
    let mut queue = queue(7);
    assert_eq!(*queue.last_rendered_state(), 7);
    assert_eq!(queue.last_rendered_reducer(), Reducer::Basic);
    queue.set_last_rendered_state(9);
    queue.set_last_rendered_reducer(Reducer::Basic);
    assert_eq!(*queue.last_rendered_state(), 9);
}
