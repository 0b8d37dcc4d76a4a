use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

fn manager() -> NavigationManager {
    NavigationManager::new(Arc::new(ObjectGraph::new()))
}

fn go(manager: &NavigationManager, id: &str) -> Option<NavigationEvent> {
    manager.navigate("test").to(id, Forwarder::new())
}

fn ids(manager: &NavigationManager) -> Vec<Option<String>> {
    manager.history_ids()
}

fn some(ids: &[&str]) -> Vec<Option<String>> {
    ids.iter().map(|id| Some(id.to_string())).collect()
}

#[test]
fn forward_pushes_and_links_last_location() {
    let manager = manager();
    let first = go(&manager, "A").unwrap();
    let forward = first.as_forward().unwrap();
    assert!(forward.last_location.is_none());
    assert_eq!(forward.current_location.id(), Some("A"));
    assert!(!forward.clear_top);

    let second = go(&manager, "B").unwrap();
    let forward = second.as_forward().unwrap();
    assert_eq!(forward.last_location.as_ref().and_then(Location::id), Some("A"));
    assert!(Location::ptr_eq(
        forward.current_location.previous().unwrap(),
        forward.last_location.as_ref().unwrap()
    ));
    assert_eq!(ids(&manager), some(&["B", "A"]));
}

#[test]
fn forward_to_current_location_is_skipped() {
    let manager = manager();
    go(&manager, "A");
    let mut rx = manager.receiver();
    assert!(go(&manager, "A").is_none());
    assert_eq!(ids(&manager), some(&["A"]));
    assert!(rx.drain().is_empty());
}

#[test]
fn clear_to_drops_locations_above_target() {
    let manager = manager();
    go(&manager, "A");
    go(&manager, "B");

    let event = manager
        .navigate("test")
        .to("C", Forwarder::new().clear_to("A"))
        .unwrap();
    let forward = event.as_forward().unwrap();
    assert!(forward.clear_top);
    assert_eq!(forward.last_location.as_ref().and_then(Location::id), Some("B"));
    assert_eq!(
        forward.cleared_top_to_location.as_ref().and_then(Location::id),
        Some("A")
    );
    assert_eq!(ids(&manager), some(&["C", "A"]));

    let back = manager.navigate("test").back().unwrap();
    assert_eq!(back.current_location().and_then(Location::id), Some("A"));

    let mut rx = manager.receiver();
    let exit = manager.navigate("test").back().unwrap();
    assert!(exit.as_back().unwrap().current_location.is_none());
    let posted = rx.drain();
    assert_eq!(posted.len(), 2);
    assert!(posted[0].as_back().is_some());
    assert!(posted[1].is_app_exit());
    assert!(manager.current_location().is_none());
}

#[test]
fn clear_to_same_location_still_navigates() {
    let manager = manager();
    go(&manager, "A");
    go(&manager, "B");
    let event = manager
        .navigate("test")
        .to("B", Forwarder::new().clear_to("B"))
        .unwrap();
    assert!(event.as_forward().unwrap().clear_top);
    assert_eq!(ids(&manager), some(&["B", "B", "A"]));
}

#[test]
fn clear_to_unknown_location_is_plain_push() {
    let manager = manager();
    go(&manager, "A");
    let event = manager
        .navigate("test")
        .to("B", Forwarder::new().clear_to("Z"))
        .unwrap();
    let forward = event.as_forward().unwrap();
    assert!(!forward.clear_top);
    assert!(forward.cleared_top_to_location.is_none());
    assert_eq!(ids(&manager), some(&["B", "A"]));
}

#[test]
fn clear_all_makes_new_root() {
    let manager = manager();
    go(&manager, "A");
    go(&manager, "B");
    let event = manager
        .navigate("test")
        .to("C", Forwarder::new().clear_all())
        .unwrap();
    let forward = event.as_forward().unwrap();
    assert!(forward.clear_top);
    assert!(forward.cleared_top_to_location.is_none());
    assert!(forward.current_location.is_root());
    assert_eq!(ids(&manager), some(&["C"]));
}

#[test]
fn forwarder_last_clear_option_wins() {
    let forwarder = Forwarder::new().clear_all().clear_to("A");
    assert!(!forwarder.is_clear_all());
    assert_eq!(forwarder.clear_to_location_id(), Some("A"));

    let forwarder = Forwarder::new().clear_to("A").clear_all().interim(true);
    assert!(forwarder.is_clear_all());
    assert!(forwarder.clear_to_location_id().is_none());
    assert!(forwarder.is_interim());
}

#[test]
fn back_skips_interim_locations() {
    let manager = manager();
    go(&manager, "A");
    manager
        .navigate("test")
        .to("B", Forwarder::new().interim(true));
    manager
        .navigate("test")
        .to("C", Forwarder::new().interim(true));
    go(&manager, "D");

    let event = manager.navigate("test").back().unwrap();
    let back = event.as_back().unwrap();
    assert_eq!(back.last_location.id(), Some("D"));
    assert_eq!(back.current_location.as_ref().and_then(Location::id), Some("A"));
    assert!(!back.fast_rewind);
    assert_eq!(ids(&manager), some(&["A"]));
}

#[test]
fn back_from_interim_only_history_exits() {
    let manager = manager();
    manager
        .navigate("test")
        .to("A", Forwarder::new().interim(true));
    go(&manager, "B");

    let mut rx = manager.receiver();
    manager.navigate("test").back();
    let posted = rx.drain();
    assert_eq!(posted.len(), 2);
    assert!(posted[1].is_app_exit());
}

#[test]
fn back_without_history_does_nothing() {
    let manager = manager();
    let mut rx = manager.receiver();
    assert!(manager.navigate("test").back().is_none());
    assert!(manager.navigate("test").back_to(None).is_none());
    assert!(rx.drain().is_empty());
}

#[test]
fn back_to_root() {
    let manager = manager();
    for id in ["A", "B", "C", "D"] {
        go(&manager, id);
    }
    let event = manager.navigate("test").back_to(None).unwrap();
    let back = event.as_back().unwrap();
    assert!(back.fast_rewind);
    assert_eq!(back.last_location.id(), Some("D"));
    assert_eq!(ids(&manager), some(&["A"]));
}

#[test]
fn back_to_at_root_is_noop() {
    let manager = manager();
    go(&manager, "A");
    assert!(manager.navigate("test").back_to(None).is_none());
    assert!(manager.navigate("test").back_to(Some("A")).is_none());
    assert_eq!(ids(&manager), some(&["A"]));
}

#[test]
fn back_to_nearest_matching_ancestor() {
    let manager = manager();
    for id in ["A", "B", "A", "C", "D"] {
        go(&manager, id);
    }
    let event = manager.navigate("test").back_to(Some("A")).unwrap();
    assert!(event.as_back().unwrap().fast_rewind);
    assert_eq!(ids(&manager), some(&["A", "B", "A"]));
}

#[test]
fn back_to_ignores_current_location() {
    let manager = manager();
    for id in ["A", "B", "C"] {
        go(&manager, id);
    }
    assert!(manager.navigate("test").back_to(Some("C")).is_none());
    assert!(manager.navigate("test").back_to(Some("Z")).is_none());
    assert_eq!(ids(&manager), some(&["C", "B", "A"]));
}

#[test]
fn back_to_interim_target_is_allowed() {
    let manager = manager();
    go(&manager, "A");
    manager
        .navigate("test")
        .to("B", Forwarder::new().interim(true));
    go(&manager, "C");
    manager.navigate("test").back_to(Some("B"));
    let current = manager.current_location().unwrap();
    assert_eq!(current.id(), Some("B"));
    assert!(current.is_interim());
}

struct Detail {
    title: Mutex<String>,
    disposed: Arc<AtomicUsize>,
}

impl Service for Detail {
    fn name(&self) -> &'static str {
        "Detail"
    }

    fn on_disposed(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

fn graph_with_detail() -> (Arc<ObjectGraph>, Arc<AtomicUsize>) {
    let graph = Arc::new(ObjectGraph::new());
    let disposed = Arc::new(AtomicUsize::new(0));
    let d = Arc::clone(&disposed);
    graph
        .register(move |_| {
            Ok(Detail {
                title: Mutex::new(String::new()),
                disposed: Arc::clone(&d),
            })
        })
        .unwrap();
    (graph, disposed)
}

#[test]
fn with_holds_reference_until_settled() {
    let (graph, disposed) = graph_with_detail();
    let manager = NavigationManager::new(Arc::clone(&graph));

    let event = manager
        .navigate("list")
        .with::<Detail, _>(None, |detail| {
            *detail.title.lock().unwrap() = "item 7".to_string();
        })
        .unwrap()
        .to("detail", Forwarder::new())
        .unwrap();
    assert_eq!(graph.reference_count::<Detail>(None), 1);

    // the destination view picks up the prepared instance
    let detail = graph.reference::<Detail>(None).unwrap();
    assert_eq!(*detail.title.lock().unwrap(), "item 7");

    let handle = event.navigator().unwrap();
    assert!(!handle.is_settled());
    assert!(handle.destroy());
    assert!(handle.is_settled());
    assert!(!handle.destroy());
    assert_eq!(graph.reference_count::<Detail>(None), 1);
    assert_eq!(disposed.load(Ordering::SeqCst), 0);

    graph.dereference(&detail, None).unwrap();
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[test]
fn settle_callback_runs_once_before_release() {
    let (graph, _) = graph_with_detail();
    let manager = NavigationManager::new(Arc::clone(&graph));
    let calls = Arc::new(AtomicUsize::new(0));
    let seen_count = Arc::new(AtomicUsize::new(usize::MAX));

    let c = Arc::clone(&calls);
    let s = Arc::clone(&seen_count);
    let g = Arc::clone(&graph);
    let event = manager
        .navigate("test")
        .with::<Detail, _>(None, |_| {})
        .unwrap()
        .on_settled(move || {
            c.fetch_add(1, Ordering::SeqCst);
            s.store(g.reference_count::<Detail>(None), Ordering::SeqCst);
        })
        .to("A", Forwarder::new())
        .unwrap();

    let copy = event.clone();
    event.navigator().unwrap().destroy();
    copy.navigator().unwrap().destroy();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(seen_count.load(Ordering::SeqCst), 1);
    assert_eq!(graph.reference_count::<Detail>(None), 0);
}

#[test]
fn skipped_navigation_releases_without_settling() {
    let (graph, disposed) = graph_with_detail();
    let manager = NavigationManager::new(Arc::clone(&graph));
    go(&manager, "A");

    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let event = manager
        .navigate("test")
        .with::<Detail, _>(None, |_| {})
        .unwrap()
        .on_settled(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .to("A", Forwarder::new());

    assert!(event.is_none());
    assert_eq!(graph.reference_count::<Detail>(None), 0);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn with_missing_provider_fails() {
    let manager = manager();
    let result = manager.navigate("test").with::<Detail, _>(None, |_| {});
    assert!(matches!(
        result,
        Err(NavigationError::Graph(GraphError::MissingProvider(_)))
    ));
}

#[test]
fn events_carry_sender_and_distinct_navigators() {
    let manager = manager();
    let first = manager.navigate("home").to("A", Forwarder::new()).unwrap();
    let second = manager.navigate("list").to("B", Forwarder::new()).unwrap();
    assert_eq!(first.sender(), "home");
    assert_eq!(second.sender(), "list");
    assert_ne!(
        first.navigator().unwrap().id(),
        second.navigator().unwrap().id()
    );
}

#[test]
fn panicking_prepare_releases_reference() {
    let (graph, disposed) = graph_with_detail();
    let manager = NavigationManager::new(Arc::clone(&graph));

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = manager
            .navigate("test")
            .with::<Detail, _>(None, |_| panic!("prepare failed"));
    }));
    assert!(result.is_err());
    assert_eq!(graph.reference_count::<Detail>(None), 0);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[test]
fn history_never_revisits_a_node() {
    let manager = manager();
    go(&manager, "A");
    go(&manager, "B");
    manager
        .navigate("test")
        .to("C", Forwarder::new().interim(true));
    go(&manager, "A");
    manager
        .navigate("test")
        .to("D", Forwarder::new().clear_to("B"));
    manager.navigate("test").back();
    go(&manager, "B");
    go(&manager, "E");
    manager
        .navigate("test")
        .to("F", Forwarder::new().clear_to("Z"));
    manager.navigate("test").back_to(Some("B"));
    go(&manager, "G");

    let current = manager.current_location().unwrap();
    let chain: Vec<&Location> = current.ancestors().collect();
    assert_eq!(chain.len(), current.depth());
    for (i, a) in chain.iter().enumerate() {
        for b in &chain[i + 1..] {
            assert!(!Location::ptr_eq(a, b));
        }
    }
    assert!(chain.last().unwrap().is_root());
    assert_eq!(ids(&manager), some(&["G", "B", "A"]));
}
