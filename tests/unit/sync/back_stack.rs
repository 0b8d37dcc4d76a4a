use super::*;
use crate::core::graph::ObjectGraph;
use crate::navigation::Forwarder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn setup() -> (NavigationManager, BackStack) {
    let manager = NavigationManager::new(Arc::new(ObjectGraph::new()));
    let stack = BackStack::attach(&manager);
    (manager, stack)
}

fn go(manager: &NavigationManager, id: &str) {
    manager.navigate("test").to(id, Forwarder::new());
}

fn model_ids_root_first(manager: &NavigationManager) -> Vec<Option<String>> {
    let mut ids = manager.history_ids();
    ids.reverse();
    ids
}

fn stack_ids(stack: &BackStack) -> Vec<Option<String>> {
    stack
        .ids()
        .into_iter()
        .map(|id| id.map(str::to_string))
        .collect()
}

#[test]
fn forward_pushes_one_entry_each() {
    let (manager, mut stack) = setup();
    for id in ["A", "B", "C"] {
        go(&manager, id);
    }
    assert_eq!(
        stack.pump(),
        vec![Transition::Pushed { popped: 0 }; 3]
    );
    assert_eq!(stack.ids(), vec![Some("A"), Some("B"), Some("C")]);
    assert_eq!(stack_ids(&stack), model_ids_root_first(&manager));
}

#[test]
fn clear_to_pops_entries_above_target() {
    let (manager, mut stack) = setup();
    for id in ["A", "B", "C"] {
        go(&manager, id);
    }
    manager
        .navigate("test")
        .to("D", Forwarder::new().clear_to("A"));
    let transitions = stack.pump();
    assert_eq!(transitions.last(), Some(&Transition::Pushed { popped: 2 }));
    assert_eq!(stack.ids(), vec![Some("A"), Some("D")]);
}

#[test]
fn clear_all_leaves_single_entry() {
    let (manager, mut stack) = setup();
    go(&manager, "A");
    go(&manager, "B");
    manager
        .navigate("test")
        .to("C", Forwarder::new().clear_all());
    stack.pump();
    assert_eq!(stack.ids(), vec![Some("C")]);
}

#[test]
fn back_pops_interim_entries_together() {
    let (manager, mut stack) = setup();
    go(&manager, "A");
    manager
        .navigate("test")
        .to("B", Forwarder::new().interim(true));
    go(&manager, "C");
    manager.navigate("test").back();

    let transitions = stack.pump();
    assert_eq!(transitions.last(), Some(&Transition::Popped { count: 2 }));
    assert_eq!(stack.ids(), vec![Some("A")]);
    assert!(!stack.top().unwrap().interim);
}

#[test]
fn fast_rewind_pops_to_target() {
    let (manager, mut stack) = setup();
    for id in ["A", "B", "C", "D", "E"] {
        go(&manager, id);
    }
    manager.navigate("test").back_to(Some("B"));
    assert_eq!(stack.pump().last(), Some(&Transition::Popped { count: 3 }));
    assert_eq!(stack.ids(), vec![Some("A"), Some("B")]);

    manager.navigate("test").back_to(None);
    assert_eq!(stack.pump(), vec![Transition::Popped { count: 1 }]);
    assert_eq!(stack.ids(), vec![Some("A")]);
}

#[test]
fn last_back_exits() {
    let (manager, mut stack) = setup();
    go(&manager, "A");
    manager.navigate("test").back();
    assert_eq!(
        stack.pump(),
        vec![
            Transition::Pushed { popped: 0 },
            Transition::Popped { count: 1 },
            Transition::Exited,
        ]
    );
    assert!(stack.is_empty());
    assert!(stack.is_exited());

    go(&manager, "B");
    stack.pump();
    assert!(!stack.is_exited());
    assert_eq!(stack.ids(), vec![Some("B")]);
}

#[test]
fn paused_stack_lags_until_resume() {
    let (manager, mut stack) = setup();
    go(&manager, "A");
    stack.pump();

    stack.pause();
    assert!(!stack.is_committable());
    go(&manager, "B");
    go(&manager, "C");
    manager.navigate("test").back();
    assert_eq!(stack.pump(), vec![Transition::Deferred; 3]);
    assert_eq!(stack.pending_len(), 3);
    assert_eq!(stack.ids(), vec![Some("A")]);
    assert_eq!(model_ids_root_first(&manager).len(), 2);

    let applied = stack.resume();
    assert_eq!(
        applied,
        vec![
            Transition::Pushed { popped: 0 },
            Transition::Pushed { popped: 0 },
            Transition::Popped { count: 1 },
        ]
    );
    assert_eq!(stack.pending_len(), 0);
    assert_eq!(stack_ids(&stack), model_ids_root_first(&manager));
}

#[test]
fn navigators_settle_when_applied() {
    let graph = Arc::new(ObjectGraph::new());
    let manager = NavigationManager::new(graph);
    let mut stack = BackStack::attach(&manager);
    let settled = Arc::new(AtomicUsize::new(0));

    stack.pause();
    let s = Arc::clone(&settled);
    let event = manager
        .navigate("test")
        .on_settled(move || {
            s.fetch_add(1, Ordering::SeqCst);
        })
        .to("A", Forwarder::new())
        .unwrap();
    stack.pump();
    assert!(!event.navigator().unwrap().is_settled());
    assert_eq!(settled.load(Ordering::SeqCst), 0);

    stack.resume();
    assert!(event.navigator().unwrap().is_settled());
    assert_eq!(settled.load(Ordering::SeqCst), 1);
}

#[test]
fn attach_and_from_model_start_from_current_history() {
    let manager = NavigationManager::new(Arc::new(ObjectGraph::new()));
    manager.restore_model(NavigationModel::from_location_ids([Some("C"), Some("B"), Some("A")]));

    let restored = BackStack::from_model(&manager.model());
    assert_eq!(restored.ids(), vec![Some("A"), Some("B"), Some("C")]);

    let mut stack = BackStack::attach(&manager);
    manager.navigate("test").back();
    assert_eq!(stack.pump(), vec![Transition::Popped { count: 1 }]);
    assert_eq!(stack.ids(), vec![Some("A"), Some("B")]);
}

#[test]
fn out_of_sync_stack_is_rebuilt() {
    let manager = NavigationManager::new(Arc::new(ObjectGraph::new()));
    go(&manager, "A");
    go(&manager, "B");
    // a stack that missed the first event
    let mut stack = BackStack::new();
    let mut rx = manager.receiver();
    go(&manager, "C");
    for event in rx.drain() {
        stack.handle(event);
    }
    assert_eq!(stack.ids(), vec![Some("A"), Some("B"), Some("C")]);
}

#[test]
fn detached_stack_pumps_nothing() {
    let mut stack = BackStack::new();
    assert!(stack.pump().is_empty());
    assert!(stack.is_empty());
    assert!(stack.top().is_none());
}
