#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{is_tracking, merge_splice};
    use std::cell::{Cell, RefCell};
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(ObjectId, String)>>,
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl Subscriber for Recorder {
        fn handle_change(&self, source: ObjectId, args: ChangeArgs<'_>) {
            let label = match args {
                ChangeArgs::Property(name) => name.to_string(),
                ChangeArgs::Binding => "binding".to_string(),
                ChangeArgs::Splices(_) => "splices".to_string(),
            };
            self.calls.borrow_mut().push((source, label));
        }
    }

    fn recorder() -> (Rc<Recorder>, Rc<dyn Subscriber>) {
        let rec = Rc::new(Recorder::default());
        let sub: Rc<dyn Subscriber> = rec.clone();
        (rec, sub)
    }

    struct SpliceLog<T> {
        batches: RefCell<Vec<Vec<Splice<T>>>>,
    }

    impl<T: Clone + 'static> Subscriber for SpliceLog<T> {
        fn handle_change(&self, _source: ObjectId, args: ChangeArgs<'_>) {
            if let ChangeArgs::Splices(any) = args
                && let Some(splices) = any.downcast_ref::<Vec<Splice<T>>>()
            {
                self.batches.borrow_mut().push(splices.clone());
            }
        }
    }

    fn splice_log<T: Clone + 'static>() -> (Rc<SpliceLog<T>>, Rc<dyn Subscriber>) {
        let log = Rc::new(SpliceLog {
            batches: RefCell::new(Vec::new()),
        });
        let sub: Rc<dyn Subscriber> = log.clone();
        (log, sub)
    }

    struct Address {
        state: ObservableState,
        city: Observed<String>,
    }

    impl Observable for Address {
        fn observable_state(&self) -> &ObservableState {
            &self.state
        }
    }

    impl Address {
        const CITY: Accessor<Address, String> = accessor!(Address, city: String);

        fn new(city: &str) -> Rc<Self> {
            Rc::new(Self {
                state: ObservableState::new(),
                city: Observed::new(city.to_string()),
            })
        }

        fn city(&self) -> String {
            Self::CITY.get(self)
        }

        fn set_city(&self, city: &str) {
            Self::CITY.set(self, city.to_string());
        }
    }

    struct Person {
        state: ObservableState,
        name: Observed<String>,
        age: Observed<u32>,
        address: Observed<Rc<Address>>,
        renames: Cell<u32>,
    }

    impl Observable for Person {
        fn observable_state(&self) -> &ObservableState {
            &self.state
        }
    }

    impl Person {
        const NAME: Accessor<Person, String> = accessor!(Person, name: String, changed = |p, _, _| {
            p.renames.set(p.renames.get() + 1)
        });
        const AGE: Accessor<Person, u32> = accessor!(Person, age: u32);
        const ADDRESS: Accessor<Person, Rc<Address>> = accessor!(Person, address: Rc<Address>);
        const LABEL: ComputedAccessor<Person, String> = ComputedAccessor::<Person, String>::new("label", |p| {
            if p.age() >= 18 {
                p.name()
            } else {
                "minor".to_string()
            }
        })
        .volatile();

        fn new(name: &str, age: u32, city: &str) -> Rc<Self> {
            Rc::new(Self {
                state: ObservableState::new(),
                name: Observed::new(name.to_string()),
                age: Observed::new(age),
                address: Observed::new(Address::new(city)),
                renames: Cell::new(0),
            })
        }

        fn name(&self) -> String {
            Self::NAME.get(self)
        }

        fn set_name(&self, name: &str) {
            Self::NAME.set(self, name.to_string());
        }

        fn age(&self) -> u32 {
            Self::AGE.get(self)
        }

        fn set_age(&self, age: u32) {
            Self::AGE.set(self, age);
        }

        fn address(&self) -> Rc<Address> {
            Self::ADDRESS.get(self)
        }

        fn set_address(&self, address: Rc<Address>) {
            Self::ADDRESS.set(self, address);
        }
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::default()
    }

    // Notification core

    #[test]
    fn test_subscriber_set_upgrades_on_third_subscriber() {
        let owner = Box::new(0u8);
        let set = SubscriberSet::new(ObjectId::of(&*owner as *const u8));
        let (a, sa) = recorder();
        let (b, sb) = recorder();
        let (c, sc) = recorder();

        set.subscribe(&sa);
        set.subscribe(&sb);
        assert!(!set.is_spillover());
        set.notify(ChangeArgs::Binding);
        assert_eq!((a.count(), b.count(), c.count()), (1, 1, 0));

        set.subscribe(&sc);
        assert!(set.is_spillover());
        assert_eq!(set.len(), 3);
        set.notify(ChangeArgs::Binding);
        assert_eq!((a.count(), b.count(), c.count()), (2, 2, 1));

        set.unsubscribe(&sb);
        assert!(set.is_spillover());
        set.notify(ChangeArgs::Binding);
        assert_eq!((a.count(), b.count(), c.count()), (3, 2, 2));
    }

    #[test]
    fn test_subscribe_and_unsubscribe_are_idempotent() {
        let owner = Box::new(0u8);
        let set = SubscriberSet::new(ObjectId::of(&*owner as *const u8));
        let (a, sa) = recorder();

        set.subscribe(&sa);
        set.subscribe(&sa);
        assert_eq!(set.len(), 1);
        set.notify(ChangeArgs::Binding);
        assert_eq!(a.count(), 1);

        set.unsubscribe(&sa);
        set.unsubscribe(&sa);
        assert!(set.is_empty());
        assert!(!set.has(&sa));
    }

    #[test]
    fn test_dropped_subscriber_is_skipped() {
        let owner = Box::new(0u8);
        let set = SubscriberSet::new(ObjectId::of(&*owner as *const u8));
        let (a, sa) = recorder();
        {
            let (_b, sb) = recorder();
            set.subscribe(&sb);
            assert_eq!(set.len(), 1);
        }
        assert!(set.is_empty());

        // The dead inline slot is reused.
        set.subscribe(&sa);
        assert!(!set.is_spillover());
        set.notify(ChangeArgs::Binding);
        assert_eq!(a.count(), 1);
    }

    #[test]
    fn test_property_notifier_targets_one_property() {
        let person = Person::new("Ada", 36, "London");
        let notifier = person.notifier();
        let (name_rec, name_sub) = recorder();
        let (all_rec, all_sub) = recorder();
        notifier.subscribe(&name_sub, Some("name"));
        notifier.subscribe(&all_sub, None);
        assert!(notifier.has(&name_sub, Some("name")));
        assert!(!notifier.has(&name_sub, Some("age")));

        person.set_age(37);
        assert_eq!(name_rec.count(), 0);
        assert_eq!(all_rec.count(), 1);

        person.set_name("Grace");
        assert_eq!(name_rec.count(), 1);
        assert_eq!(all_rec.count(), 2);
        assert_eq!(name_rec.calls.borrow()[0].0, Observable::object_id(&*person));
        assert_eq!(name_rec.calls.borrow()[0].1, "name");
    }

    // Observable properties

    #[test]
    fn test_setter_ignores_identical_values() {
        let person = Person::new("Ada", 36, "London");
        let (rec, sub) = recorder();
        person.notifier().subscribe(&sub, None);

        person.set_name("Ada");
        assert_eq!(rec.count(), 0);
        assert_eq!(person.renames.get(), 0);

        person.set_name("Grace");
        assert_eq!(rec.count(), 1);
        assert_eq!(person.renames.get(), 1);
    }

    #[test]
    fn test_with_may_write_the_field_it_reads() {
        let person = Person::new("Ada", 36, "London");
        let len = Person::NAME.with(&person, |name| {
            person.set_name(&format!("{name} Lovelace"));
            name.len()
        });
        assert_eq!(len, 3);
        assert_eq!(person.name(), "Ada Lovelace");
    }

    #[test]
    fn test_shared_handles_compare_by_pointer() {
        let person = Person::new("Ada", 36, "London");
        let (rec, sub) = recorder();
        person.notifier().subscribe(&sub, Some("address"));

        person.set_address(person.address());
        assert_eq!(rec.count(), 0);

        // Equal contents, different object.
        person.set_address(Address::new("London"));
        assert_eq!(rec.count(), 1);
    }

    #[test]
    fn test_unregistered_type_is_an_error() {
        struct Unregistered;
        let err = accessors::<Unregistered>().unwrap_err();
        assert!(matches!(err, FilamentError::UnknownType(name) if name.contains("Unregistered")));
    }

    #[test]
    fn test_accessors_are_inherited_and_cache_is_invalidated() {
        struct Base {
            state: ObservableState,
            id: Observed<u32>,
        }
        impl Observable for Base {
            fn observable_state(&self) -> &ObservableState {
                &self.state
            }
        }
        struct Derived {
            state: ObservableState,
            id: Observed<u32>,
            title: Observed<String>,
        }
        impl Observable for Derived {
            fn observable_state(&self) -> &ObservableState {
                &self.state
            }
        }

        const BASE_ID: Accessor<Base, u32> = accessor!(Base, id: u32);
        const DERIVED_ID: Accessor<Derived, u32> =
            accessor!(Derived, id: u32, changed = |_, _, _| {});
        const TITLE: Accessor<Derived, String> = accessor!(Derived, title: String);

        define_property(&BASE_ID);
        extend::<Derived, Base>();
        define_property(&TITLE);

        let names: Vec<_> = accessors::<Derived>().unwrap().iter().map(|a| a.name).collect();
        assert_eq!(names, ["id", "title"]);
        assert!(!accessors::<Derived>().unwrap()[0].has_changed_callback);

        // Override by name after the first resolution.
        define_property(&DERIVED_ID);
        let resolved = accessors::<Derived>().unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(resolved[0].has_changed_callback);
        assert_eq!(accessors::<Base>().unwrap().len(), 1);

    }

    // Binding observer

    #[test]
    fn test_binding_notifies_once_per_flush_with_final_value() {
        let person = Person::new("Ada", 36, "London");
        let observer = BindingObserver::new(Binding::new(|p: &Person, _| p.name()));
        let (rec, sub) = recorder();
        observer.subscribe(&sub);

        assert_eq!(observer.observe(&person, &ctx()), "Ada");
        person.set_name("Grace");
        person.set_name("Lin");
        person.set_name("Mae");
        assert_eq!(rec.count(), 0, "writes never notify synchronously");

        process_updates();
        assert_eq!(rec.count(), 1);
        assert_eq!(rec.calls.borrow()[0], (observer.id(), "binding".to_string()));
        assert_eq!(observer.observe(&person, &ctx()), "Mae");

        person.set_name("Ada");
        process_updates();
        assert_eq!(rec.count(), 2);
    }

    #[test]
    fn test_constant_binding_never_notifies() {
        let person = Person::new("Ada", 36, "London");
        let observer = BindingObserver::new(Binding::new(|_: &Person, _| 42));
        let (rec, sub) = recorder();
        observer.subscribe(&sub);

        assert_eq!(observer.observe(&person, &ctx()), 42);
        assert_eq!(observer.dependency_count(), 0);
        person.set_name("Grace");
        process_updates();
        assert_eq!(rec.count(), 0);
    }

    #[test]
    fn test_stable_binding_keeps_its_dependencies() {
        let person = Person::new("Ada", 36, "London");
        let observer = BindingObserver::new(Binding::new(|p: &Person, _| {
            format!("{} ({})", p.name(), p.age())
        }));

        observer.observe(&person, &ctx());
        assert_eq!(observer.dependency_count(), 2);
        assert!(!observer.flags().contains(ObserverFlags::NEEDS_REFRESH));

        observer.observe(&person, &ctx());
        assert_eq!(observer.dependency_count(), 2);
    }

    #[test]
    fn test_property_chain_refreshes_dependencies() {
        let person = Person::new("Ada", 36, "London");
        let old_address = person.address();
        let observer = BindingObserver::new(Binding::new(|p: &Person, _| p.address().city()));
        let (rec, sub) = recorder();
        observer.subscribe(&sub);

        assert_eq!(observer.observe(&person, &ctx()), "London");
        assert!(observer.flags().contains(ObserverFlags::NEEDS_REFRESH));

        person.set_address(Address::new("Paris"));
        process_updates();
        assert_eq!(rec.count(), 1);
        assert_eq!(observer.observe(&person, &ctx()), "Paris");

        old_address.set_city("Berlin");
        process_updates();
        assert_eq!(rec.count(), 1, "the detached address is no longer observed");

        person.address().set_city("Rome");
        process_updates();
        assert_eq!(rec.count(), 2);
        assert_eq!(observer.observe(&person, &ctx()), "Rome");
    }

    #[test]
    fn test_volatile_binding_rediscovers_dependencies() {
        let person = Person::new("Ada", 12, "London");
        let observer = BindingObserver::new(Binding::volatile(|p: &Person, _| {
            if p.age() >= 18 { p.name() } else { String::new() }
        }));
        let (rec, sub) = recorder();
        observer.subscribe(&sub);

        assert_eq!(observer.observe(&person, &ctx()), "");
        assert!(observer.flags().contains(ObserverFlags::NEEDS_REFRESH));

        person.set_name("Grace");
        process_updates();
        assert_eq!(rec.count(), 0, "name was not read");

        person.set_age(30);
        process_updates();
        assert_eq!(rec.count(), 1);
        assert_eq!(observer.observe(&person, &ctx()), "Grace");

        person.set_name("Lin");
        process_updates();
        assert_eq!(rec.count(), 2);
    }

    #[test]
    fn test_volatile_computed_marks_reader_for_refresh() {
        let person = Person::new("Ada", 12, "London");
        let observer = BindingObserver::new(Binding::new(|p: &Person, _| Person::LABEL.get(p)));

        assert_eq!(observer.observe(&person, &ctx()), "minor");
        assert!(observer.flags().contains(ObserverFlags::NEEDS_REFRESH));
        assert!(Person::LABEL.info().volatile);
    }

    #[test]
    fn test_nested_observer_reads_are_not_leaked() {
        let person = Person::new("Ada", 36, "London");
        let inner = Rc::new(BindingObserver::new(Binding::new(|p: &Person, _| p.name())));
        let outer = {
            let inner = inner.clone();
            BindingObserver::new(Binding::volatile(move |p: &Person, c| inner.observe(p, c)))
        };

        outer.observe(&person, &ctx());
        assert_eq!(inner.dependency_count(), 1);
        assert_eq!(outer.dependency_count(), 0);

        // The inner observer no longer refreshes and installs no collector.
        outer.observe(&person, &ctx());
        assert_eq!(outer.dependency_count(), 0);
    }

    #[test]
    fn test_untracked_reads_are_ignored() {
        let person = Person::new("Ada", 36, "London");
        let observer = BindingObserver::new(Binding::new(|p: &Person, _| untracked(|| p.name())));
        observer.observe(&person, &ctx());
        assert_eq!(observer.dependency_count(), 0);
    }

    #[test]
    fn test_panicking_binding_restores_collector() {
        let person = Person::new("Ada", 36, "London");
        let observer = BindingObserver::new(Binding::new(|p: &Person, _| -> String {
            p.name();
            panic!("binding failed")
        }));

        let result = catch_unwind(AssertUnwindSafe(|| observer.observe(&person, &ctx())));
        assert!(result.is_err());
        assert!(!is_tracking());
    }

    #[test]
    fn test_disconnect_stops_notifications() {
        let person = Person::new("Ada", 36, "London");
        let observer = BindingObserver::new(Binding::new(|p: &Person, _| p.name()));
        let (rec, sub) = recorder();
        observer.subscribe(&sub);
        observer.observe(&person, &ctx());

        observer.disconnect();
        observer.disconnect();
        person.set_name("Grace");
        process_updates();
        assert_eq!(rec.count(), 0);
        assert!(observer.flags().contains(ObserverFlags::NEEDS_REFRESH));

        assert_eq!(observer.observe(&person, &ctx()), "Grace");
        person.set_name("Lin");
        process_updates();
        assert_eq!(rec.count(), 1);
    }

    #[test]
    fn test_context_position_is_observable() {
        let context = ExecutionContext::new();
        context.update_position(2, 3);
        assert!(context.is_last());
        assert!(context.is_even());
        assert!(!context.is_in_middle());

        let observer =
            BindingObserver::new(Binding::new(|_: &(), c: &ExecutionContext| c.index()));
        let (rec, sub) = recorder();
        observer.subscribe(&sub);
        assert_eq!(observer.observe(&(), &context), 2);

        context.update_position(1, 3);
        process_updates();
        assert_eq!(rec.count(), 1);
        assert!(context.is_in_middle());
    }

    #[test]
    fn test_context_exposes_parent_and_event() {
        let parent = Person::new("Ada", 36, "London");
        let context = ExecutionContext::child(parent.clone(), Rc::new(ExecutionContext::new()));
        assert_eq!(context.parent::<Person>().map(|p| p.name()), Some("Ada".to_string()));
        assert!(context.parent::<Address>().is_none());

        assert!(context.event::<String>().is_none());
        let seen = with_event(Rc::new("click".to_string()), || context.event::<String>());
        assert_eq!(seen.as_deref().map(String::as_str), Some("click"));
        assert!(context.event::<String>().is_none());
    }

    // Update scheduler

    #[test]
    fn test_tasks_run_in_order_including_reentrant_ones() {
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            queue_update(move || {
                log.borrow_mut().push(i);
                if i == 0 {
                    let log = log.clone();
                    queue_update(move || log.borrow_mut().push(10));
                }
            });
        }
        assert!(has_pending_updates());
        process_updates();
        assert_eq!(*log.borrow(), [0, 1, 2, 10]);
        assert!(!has_pending_updates());
    }

    #[test]
    fn test_queue_compacts_large_passes() {
        let count = Rc::new(Cell::new(0usize));
        {
            let count = count.clone();
            queue_update(move || {
                for _ in 0..2500 {
                    let count = count.clone();
                    queue_update(move || count.set(count.get() + 1));
                }
            });
        }
        for _ in 0..1500 {
            let count = count.clone();
            queue_update(move || count.set(count.get() + 1));
        }
        process_updates();
        assert_eq!(count.get(), 4000);
        assert!(!has_pending_updates());
    }

    #[test]
    fn test_panicking_task_aborts_the_pass() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let log = log.clone();
            queue_update(move || log.borrow_mut().push(1));
        }
        queue_update(|| panic!("task failed"));
        {
            let log = log.clone();
            queue_update(move || log.borrow_mut().push(3));
        }

        let result = catch_unwind(process_updates);
        assert!(result.is_err());
        assert_eq!(*log.borrow(), [1]);
        assert!(has_pending_updates());

        process_updates();
        assert_eq!(*log.borrow(), [1, 3]);
        assert!(!has_pending_updates());
    }

    #[test]
    fn test_observers_recover_after_an_aborted_pass() {
        struct FailOnce {
            armed: Cell<bool>,
        }
        impl Subscriber for FailOnce {
            fn handle_change(&self, _source: ObjectId, _args: ChangeArgs<'_>) {
                if self.armed.replace(false) {
                    panic!("subscriber failed");
                }
            }
        }

        let failing_person = Person::new("Ada", 36, "London");
        let failing = BindingObserver::new(Binding::new(|p: &Person, _| p.name()));
        let fail_once: Rc<dyn Subscriber> = Rc::new(FailOnce {
            armed: Cell::new(true),
        });
        failing.subscribe(&fail_once);

        let person = Person::new("Grace", 40, "Paris");
        let healthy = BindingObserver::new(Binding::new(|p: &Person, _| p.name()));
        let (rec, sub) = recorder();
        healthy.subscribe(&sub);

        let items = ObservableVec::from(vec![1]);
        let (log, vec_sub) = splice_log::<i32>();
        items.subscribe(&vec_sub);

        failing.observe(&failing_person, &ctx());
        healthy.observe(&person, &ctx());
        failing_person.set_name("Lin");
        person.set_name("Mae");
        items.push(2);

        assert!(catch_unwind(process_updates).is_err());
        assert_eq!(rec.count(), 0);
        assert!(log.batches.borrow().is_empty());

        process_updates();
        assert_eq!(rec.count(), 1);
        assert_eq!(log.batches.borrow().len(), 1);
        assert!(healthy.flags().contains(ObserverFlags::NEEDS_QUEUE));

        assert_eq!(healthy.observe(&person, &ctx()), "Mae");
        person.set_name("Ada");
        items.push(3);
        process_updates();
        assert_eq!(rec.count(), 2);
        assert_eq!(log.batches.borrow().len(), 2);
        assert_eq!(items.to_vec(), [1, 2, 3]);
    }

    #[test]
    fn test_frame_host_is_asked_once_per_batch() {
        #[derive(Default)]
        struct CountingHost {
            frames: Cell<u32>,
        }
        impl FrameHost for CountingHost {
            fn request_frame(&self) {
                self.frames.set(self.frames.get() + 1);
            }
        }

        let host = Rc::new(CountingHost::default());
        set_frame_host(host.clone()).unwrap();
        assert_eq!(
            set_frame_host(Rc::new(CountingHost::default())),
            Err(FilamentError::AlreadyConfigured("frame host"))
        );

        queue_update(|| {});
        queue_update(|| {});
        assert_eq!(host.frames.get(), 1);
        process_updates();
        queue_update(|| {});
        assert_eq!(host.frames.get(), 2);
        process_updates();
    }

    #[test]
    fn test_next_update_resolves_after_flush() {
        let ran = Rc::new(Cell::new(false));
        {
            let ran = ran.clone();
            queue_update(move || ran.set(true));
        }
        let next = next_update();
        process_updates();
        pollster::block_on(next);
        assert!(ran.get());
    }

    // Splices

    #[test]
    fn test_diff_single_replacement() {
        let splices = diff(&["a", "b", "c", "d"], &["a", "x", "c", "d"]);
        assert_eq!(splices, vec![Splice::new(1, vec!["b"], 1)]);
    }

    #[test]
    fn test_diff_trims_prefix_and_suffix() {
        let splices = diff(&[1, 2, 3, 4, 5], &[1, 2, 99, 4, 5]);
        assert_eq!(splices, vec![Splice::new(2, vec![3], 1)]);
    }

    #[test]
    fn test_diff_pure_insert_and_remove() {
        assert_eq!(diff(&[1, 2], &[1, 7, 8, 2]), vec![Splice::new(1, vec![], 2)]);
        assert_eq!(diff(&[1, 7, 8, 2], &[1, 2]), vec![Splice::new(1, vec![7, 8], 0)]);
        assert!(diff(&[1, 2, 3], &[1, 2, 3]).is_empty());
        assert!(diff::<i32>(&[], &[]).is_empty());
    }

    #[test]
    fn test_diff_prefers_delete_over_add_on_ties() {
        let old = ["a", "b"];
        let new = ["b", "a"];
        let splices = diff(&old, &new);
        assert_eq!(
            splices,
            vec![Splice::new(0, vec![], 1), Splice::new(2, vec!["b"], 0)]
        );
        assert_eq!(apply_splices(&old, &splices, &new), new);
    }

    #[test]
    fn test_diff_uses_identity_for_shared_handles() {
        let a = Rc::new("a".to_string());
        let b = Rc::new("b".to_string());
        let a2 = Rc::new("a".to_string());
        let splices = diff(&[a.clone(), b.clone()], &[a2, b]);
        assert_eq!(splices.len(), 1);
        assert_eq!(splices[0].index, 0);
        assert!(Rc::ptr_eq(&splices[0].removed[0], &a));
    }

    #[test]
    fn test_project_merges_records() {
        // [a, b, c] -> push(d) -> remove(1) -> [a, c, d]
        let records = vec![Splice::new(3, vec![], 1), Splice::new(1, vec!["b"], 0)];
        let current = ["a", "c", "d"];
        let splices = project_splices(&current, records);
        assert_eq!(
            splices,
            vec![Splice::new(1, vec!["b"], 0), Splice::new(2, vec![], 1)]
        );
        assert_eq!(apply_splices(&["a", "b", "c"], &splices, &current), current);
    }

    #[test]
    fn test_merge_cancels_push_then_pop() {
        let mut merged = Vec::new();
        merge_splice_records(&mut merged, &[Splice::new(2, vec![], 1), Splice::new(2, vec!["x"], 0)]);
        assert!(merged.is_empty());
    }

    fn merge_splice_records(merged: &mut Vec<Splice<&'static str>>, records: &[Splice<&'static str>]) {
        for record in records {
            merge_splice(merged, record.index, record.removed.clone(), record.added_count);
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_splice_serializes() {
        let splice = Splice::new(1, vec!["b".to_string()], 1);
        let json = serde_json::to_string(&splice).unwrap();
        assert_eq!(json, r#"{"index":1,"removed":["b"],"added_count":1}"#);
        let back: Splice<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, splice);
    }

    // Observable vec

    #[test]
    fn test_vec_batches_mutations_into_one_notification() {
        let items = ObservableVec::from(vec!["a", "b", "c"]);
        let (log, sub) = splice_log::<&'static str>();
        items.subscribe(&sub);

        items.push("d");
        items.remove(1);
        assert!(log.batches.borrow().is_empty());
        process_updates();

        let batches = log.batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0],
            vec![Splice::new(1, vec!["b"], 0), Splice::new(2, vec![], 1)]
        );
        assert_eq!(items.to_vec(), ["a", "c", "d"]);
    }

    #[test]
    fn test_vec_with_may_mutate_the_vec() {
        let items = ObservableVec::from(vec![1, 2]);
        let total = items.with(|current| {
            items.extend(current.to_vec());
            current.iter().sum::<i32>()
        });
        assert_eq!(total, 3);
        assert_eq!(items.to_vec(), [1, 2, 1, 2]);
    }

    #[test]
    fn test_vec_drops_changes_that_cancel_out() {
        let items = ObservableVec::from(vec!["a", "b"]);
        let (log, sub) = splice_log::<&'static str>();
        items.subscribe(&sub);

        items.push("x");
        items.pop();
        items.set(0, "a");
        process_updates();
        assert!(log.batches.borrow().is_empty());
    }

    #[test]
    fn test_vec_reorder_reports_full_diff() {
        let items = ObservableVec::from(vec![1, 2, 3]);
        let before = items.to_vec();
        let (log, sub) = splice_log::<i32>();
        items.subscribe(&sub);

        items.push(4);
        items.reverse();
        items.unshift(0);
        process_updates();

        let after = items.to_vec();
        assert_eq!(after, [0, 4, 3, 2, 1]);
        let batches = log.batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(apply_splices(&before, &batches[0], &after), after);
    }

    #[test]
    fn test_vec_subscribe_flushes_pending_changes() {
        let items = ObservableVec::from(vec![1]);
        items.push(2);
        assert!(items.has_pending_changes());

        let (log, sub) = splice_log::<i32>();
        items.subscribe(&sub);
        assert!(!items.has_pending_changes());
        process_updates();
        assert!(log.batches.borrow().is_empty());
    }

    #[test]
    fn test_vec_length_is_tracked() {
        let items: ObservableVec<&'static str> = ObservableVec::new();
        let observer = BindingObserver::new(Binding::new(|v: &ObservableVec<&'static str>, _| v.len()));
        let (rec, sub) = recorder();
        observer.subscribe(&sub);
        assert_eq!(observer.observe(&items, &ctx()), 0);

        items.push("a");
        process_updates();
        assert_eq!(rec.count(), 1);
        assert_eq!(observer.observe(&items, &ctx()), 1);

        items.set(0, "b");
        process_updates();
        assert_eq!(rec.count(), 1, "same length, no length notification");
    }
}
