use std::cell::RefCell;
use std::rc::Rc;

use filament_core::{
    ChangeArgs, ObjectId, ObservableVec, Splice, Subscriber, apply_splices, diff,
};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Push(u8),
    Pop,
    Insert(usize, u8),
    Remove(usize),
    Set(usize, u8),
    Reverse,
    Sort,
    Clear,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..8).prop_map(Op::Push),
        1 => Just(Op::Pop),
        3 => (0usize..16, 0u8..8).prop_map(|(i, v)| Op::Insert(i, v)),
        3 => (0usize..16).prop_map(Op::Remove),
        2 => (0usize..16, 0u8..8).prop_map(|(i, v)| Op::Set(i, v)),
        1 => Just(Op::Reverse),
        1 => Just(Op::Sort),
        1 => Just(Op::Clear),
    ]
}

fn apply_op(items: &ObservableVec<u8>, op: &Op) {
    let len = items.with(|v| v.len());
    match *op {
        Op::Push(v) => items.push(v),
        Op::Pop => {
            items.pop();
        }
        Op::Insert(i, v) => items.insert(i % (len + 1), v),
        Op::Remove(i) => {
            items.remove(i % (len + 1));
        }
        Op::Set(i, v) => {
            items.set(i % (len + 1), v);
        }
        Op::Reverse => items.reverse(),
        Op::Sort => items.sort_by(|a, b| a.cmp(b)),
        Op::Clear => items.clear(),
    }
}

struct Capture {
    batches: RefCell<Vec<Vec<Splice<u8>>>>,
}

impl Subscriber for Capture {
    fn handle_change(&self, _source: ObjectId, args: ChangeArgs<'_>) {
        if let ChangeArgs::Splices(any) = args
            && let Some(splices) = any.downcast_ref::<Vec<Splice<u8>>>()
        {
            self.batches.borrow_mut().push(splices.clone());
        }
    }
}

proptest! {
    /// Replaying the diff of two sequences over the first yields the second.
    #[test]
    fn diff_round_trips(
        old in prop::collection::vec(0u8..6, 0..24),
        new in prop::collection::vec(0u8..6, 0..24),
    ) {
        let splices = diff(&old, &new);
        prop_assert_eq!(apply_splices(&old, &splices, &new), new);
    }

    /// Splices come ordered, non-overlapping and never empty.
    #[test]
    fn diff_is_ordered_and_tight(
        old in prop::collection::vec(0u8..6, 0..24),
        new in prop::collection::vec(0u8..6, 0..24),
    ) {
        let splices = diff(&old, &new);
        for splice in &splices {
            prop_assert!(splice.added_count > 0 || !splice.removed.is_empty());
        }
        for pair in splices.windows(2) {
            prop_assert!(pair[0].index + pair[0].added_count < pair[1].index + 1);
        }
    }

    /// Whatever mutations happen between flushes, the single batch delivered
    /// transforms the old contents into the new ones.
    #[test]
    fn observable_vec_batches_round_trip(
        initial in prop::collection::vec(0u8..8, 0..12),
        ops in prop::collection::vec(arb_op(), 0..12),
    ) {
        let items = ObservableVec::from(initial.clone());
        let capture = Rc::new(Capture { batches: RefCell::new(Vec::new()) });
        let subscriber: Rc<dyn Subscriber> = capture.clone();
        items.subscribe(&subscriber);

        for op in &ops {
            apply_op(&items, op);
        }
        items.flush();

        let after = items.to_vec();
        let batches = capture.batches.borrow();
        prop_assert!(batches.len() <= 1);
        let splices = batches.first().cloned().unwrap_or_default();
        prop_assert_eq!(apply_splices(&initial, &splices, &after), after);
    }
}
