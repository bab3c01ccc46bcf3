//! Integration tests for batch lifecycle, fault isolation and persistence.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;
use ticketin_models::{Customer, EventId, EventInfo, Vendor};
use ticketin_persistence::{PersistenceError, TicketStore};
use ticketin_pool::{EventItem, PoolSnapshot, Ticket};
use ticketin_runtime::{
    EventCatalog, NoopPersistence, ReleaseOutcome, RuntimeError, SetupError, SimulationConfig,
    SimulationController, SimulationEvent, TicketPersistence, TicketService, WorkerId,
};

fn fast_config() -> SimulationConfig {
    SimulationConfig::new()
        .with_rate_unit(Duration::from_millis(20))
        .with_join_timeout(Duration::from_secs(5))
}

fn controller_with(
    events: &[EventItem],
    persistence: Arc<dyn TicketPersistence>,
) -> SimulationController {
    controller_with_config(events, persistence, fast_config())
}

fn controller_with_config(
    events: &[EventItem],
    persistence: Arc<dyn TicketPersistence>,
    config: SimulationConfig,
) -> SimulationController {
    let catalog = EventCatalog::new();
    for event in events {
        catalog.insert(event.clone());
    }
    let service = Arc::new(TicketService::new(
        Arc::new(catalog),
        persistence,
        config.event_capacity,
    ));
    SimulationController::new(service, config)
}

fn vendor(name: &str, rate: u32) -> Vendor {
    Vendor::new(name, format!("{}@example.com", name), rate)
}

fn customer(name: &str, rate: u32) -> Customer {
    Customer::new(name, format!("{}@example.com", name), rate)
}

async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Fails every write.
struct BrokenDisk;

fn disk_full(path: String) -> PersistenceError {
    PersistenceError::Io {
        action: "write",
        path: path.into(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
    }
}

impl TicketPersistence for BrokenDisk {
    fn persist_ticket(&self, ticket: &Ticket) -> Result<(), PersistenceError> {
        Err(disk_full(format!("tickets/{}", ticket.id())))
    }

    fn persist_pool(&self, snapshot: &PoolSnapshot) -> Result<(), PersistenceError> {
        Err(disk_full(format!("pools/{}", snapshot.event_id)))
    }
}

/// Panics when asked to persist a ticket of one particular event.
struct PanicsOn {
    event_id: EventId,
    writes: AtomicUsize,
}

impl TicketPersistence for PanicsOn {
    fn persist_ticket(&self, ticket: &Ticket) -> Result<(), PersistenceError> {
        if ticket.event_id() == &self.event_id {
            panic!("disk on fire");
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn persist_pool(&self, _snapshot: &PoolSnapshot) -> Result<(), PersistenceError> {
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_lifecycle_counts_workers() {
    let vendors = vec![vendor("acme", 5), vendor("globex", 3)];
    let customers = vec![customer("ada", 4), customer("bob", 2), customer("cy", 1)];
    let events = vec![
        EventItem::with_pool(EventInfo::new("Gig", vendors[0].id.clone(), 3)),
        EventItem::with_pool(EventInfo::new("Expo", vendors[1].id.clone(), 2)),
    ];
    let controller = controller_with(&events, Arc::new(NoopPersistence));

    let mut handle = controller.start(&vendors, &customers, &events).unwrap();
    assert_eq!(handle.active_worker_count(), 5);
    assert_eq!(controller.active_worker_count(), 5);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let report = handle.stop().await.unwrap();

    assert_eq!(controller.active_worker_count(), 0);
    assert_eq!(report.summaries.len(), 5);
    assert!(report.faults.is_empty());

    for event in &events {
        let snapshot = event.pool().unwrap().snapshot().unwrap();
        assert!(snapshot.is_conserved());
        assert!(snapshot.available_count <= snapshot.max_pool_size);
    }

    let released: usize = events
        .iter()
        .map(|e| e.pool().unwrap().snapshot().unwrap().total_released)
        .sum();
    assert_eq!(report.tickets_released(), released as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_is_idempotent() {
    let vendors = vec![vendor("acme", 5)];
    let customers = vec![customer("ada", 5)];
    let events = vec![EventItem::with_pool(EventInfo::new(
        "Gig",
        vendors[0].id.clone(),
        2,
    ))];
    let controller = controller_with(&events, Arc::new(NoopPersistence));

    let mut handle = controller.start(&vendors, &customers, &events).unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    let first = handle.stop().await.unwrap();
    let sold = events[0].pool().unwrap().sold_count().unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let second = handle.stop().await.unwrap();

    assert!(handle.is_stopped());
    assert_eq!(first.stopped_at, second.stopped_at);
    assert_eq!(first.summaries, second.summaries);
    assert_eq!(events[0].pool().unwrap().sold_count().unwrap(), sold);
    assert_eq!(controller.active_worker_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_controller_holds_one_batch() {
    let vendors = vec![vendor("acme", 2)];
    let customers = vec![customer("ada", 2)];
    let events = vec![EventItem::with_pool(EventInfo::new(
        "Gig",
        vendors[0].id.clone(),
        2,
    ))];
    let controller = controller_with(&events, Arc::new(NoopPersistence));

    assert!(controller.stop_simulation().await.unwrap().is_none());

    controller
        .start_simulation(&vendors, &customers, &events)
        .await
        .unwrap();
    assert!(controller.is_running().await);

    let again = controller.start_simulation(&vendors, &customers, &events).await;
    assert!(matches!(again, Err(RuntimeError::AlreadyRunning)));
    assert_eq!(controller.active_worker_count(), 2);

    let report = controller.stop_simulation().await.unwrap();
    assert!(report.is_some());
    assert!(!controller.is_running().await);
    assert_eq!(controller.active_worker_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stragglers_are_aborted_and_joined() {
    let vendors = vec![vendor("acme", 1)];
    let customers = vec![customer("ada", 1)];
    let events = vec![EventItem::with_pool(EventInfo::new(
        "Gig",
        vendors[0].id.clone(),
        2,
    ))];
    // Both workers are still in their first 30s sleep when stop gives up.
    let config = SimulationConfig::new()
        .with_rate_unit(Duration::from_secs(30))
        .with_join_timeout(Duration::from_millis(50));
    let controller = controller_with_config(&events, Arc::new(NoopPersistence), config);

    let mut handle = controller.start(&vendors, &customers, &events).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    let first = handle.stop().await;
    let Err(RuntimeError::Stragglers { workers, report }) = first else {
        panic!("expected stragglers");
    };
    assert_eq!(workers.len(), 2);
    assert!(report.summaries.is_empty());
    assert_eq!(handle.active_worker_count(), 0);
    assert_eq!(controller.active_worker_count(), 0);

    let second = handle.stop().await;
    assert!(matches!(
        second,
        Err(RuntimeError::Stragglers { workers: again, .. }) if again == workers
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fault_survives_straggler_stop() {
    let doomed = vendor("doomed", 1000);
    let buyer = customer("ada", 1);
    let cursed = EventItem::with_pool(EventInfo::new("Cursed", doomed.id.clone(), 5));
    let events = vec![cursed.clone()];

    let persistence = Arc::new(PanicsOn {
        event_id: cursed.id().clone(),
        writes: AtomicUsize::new(0),
    });
    // The vendor faults on its first release; the customer sleeps a full second.
    let config = SimulationConfig::new()
        .with_rate_unit(Duration::from_secs(1))
        .with_join_timeout(Duration::from_millis(100));
    let controller = controller_with_config(&events, persistence, config);

    let mut handle = controller.start(&[doomed], &[buyer.clone()], &events).unwrap();
    assert!(wait_until(|| controller.active_worker_count() == 1).await);

    let outcome = handle.stop().await;
    let Err(RuntimeError::Stragglers { workers, report }) = outcome else {
        panic!("expected stragglers");
    };
    assert_eq!(workers, vec![WorkerId::Customer(buyer.id.clone())]);
    assert_eq!(report.faults.len(), 1);
    assert!(report.faults[0].reason.contains("disk on fire"));
    assert_eq!(controller.active_worker_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_start_waits_for_draining_batch() {
    let vendors = vec![vendor("acme", 1)];
    let customers = vec![customer("ada", 1)];
    let events = vec![EventItem::with_pool(EventInfo::new(
        "Gig",
        vendors[0].id.clone(),
        2,
    ))];
    let config = SimulationConfig::new()
        .with_rate_unit(Duration::from_millis(300))
        .with_join_timeout(Duration::from_secs(5));
    let controller = Arc::new(controller_with_config(
        &events,
        Arc::new(NoopPersistence),
        config,
    ));

    controller
        .start_simulation(&vendors, &customers, &events)
        .await
        .unwrap();

    let stopping = Arc::clone(&controller);
    let stop_task = tokio::spawn(async move { stopping.stop_simulation().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    controller
        .start_simulation(&vendors, &customers, &events)
        .await
        .unwrap();
    // Only the new batch is live; the old one was fully joined first.
    assert_eq!(controller.active_worker_count(), 2);

    let first = stop_task.await.unwrap().unwrap();
    assert!(first.is_some());

    let second = controller.stop_simulation().await.unwrap();
    assert!(second.is_some());
    assert_eq!(controller.active_worker_count(), 0);
}

#[tokio::test]
async fn test_setup_errors() {
    let vendors = vec![vendor("acme", 1)];
    let customers = vec![customer("ada", 1)];
    let pooled = EventItem::with_pool(EventInfo::new("Gig", vendors[0].id.clone(), 1));
    let bare = EventItem::new(EventInfo::new("Draft", vendors[0].id.clone(), 1));
    let controller = controller_with(&[pooled.clone()], Arc::new(NoopPersistence));

    let err = controller.start(&[], &customers, &[pooled.clone()]).err();
    assert!(matches!(err, Some(RuntimeError::Setup(SetupError::NoVendors))));

    let err = controller.start(&vendors, &[], &[pooled.clone()]).err();
    assert!(matches!(err, Some(RuntimeError::Setup(SetupError::NoCustomers))));

    let err = controller.start(&vendors, &customers, &[]).err();
    assert!(matches!(err, Some(RuntimeError::Setup(SetupError::NoEvents))));

    let err = controller
        .start(&vendors, &[customer("idle", 0)], &[pooled.clone()])
        .err();
    assert!(matches!(
        err,
        Some(RuntimeError::Setup(SetupError::InvalidRate { rate: 0, .. }))
    ));

    let err = controller.start(&vendors, &customers, &[pooled, bare.clone()]).err();
    assert!(matches!(
        err,
        Some(RuntimeError::Setup(SetupError::MissingPool(id))) if &id == bare.id()
    ));

    assert_eq!(controller.active_worker_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panicking_worker_is_isolated() {
    let steady = vendor("steady", 5);
    let doomed = vendor("doomed", 5);
    let buyer = customer("ada", 5);

    // The customer is bound round-robin to the first event, the safe one.
    let safe = EventItem::with_pool(EventInfo::new("Safe", steady.id.clone(), 5));
    let cursed = EventItem::with_pool(EventInfo::new("Cursed", doomed.id.clone(), 5));
    let events = vec![safe.clone(), cursed.clone()];

    let persistence = Arc::new(PanicsOn {
        event_id: cursed.id().clone(),
        writes: AtomicUsize::new(0),
    });
    let controller = controller_with(&events, persistence.clone());
    let mut faults = controller.subscribe();

    let mut handle = controller
        .start(&[steady, doomed], &[buyer], &events)
        .unwrap();

    assert!(wait_until(|| controller.active_worker_count() == 2).await);

    let mut saw_fault = false;
    loop {
        match faults.try_recv() {
            Ok(event) => saw_fault |= event.is_fault(),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    assert!(saw_fault);

    let writes_after_fault = persistence.writes.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(persistence.writes.load(Ordering::SeqCst) > writes_after_fault);

    let report = handle.stop().await.unwrap();
    assert_eq!(report.faults.len(), 1);
    assert!(report.faults[0].reason.contains("disk on fire"));
    assert_eq!(report.summaries.len(), 2);

    // The release itself happened before the hook panicked.
    assert_eq!(cursed.pool().unwrap().available_count().unwrap(), 1);

}

#[tokio::test]
async fn test_persistence_failure_keeps_pool_state() {
    let acme = vendor("acme", 1);
    let event = EventItem::with_pool(EventInfo::new("Gig", acme.id.clone(), 2));
    let catalog = EventCatalog::new();
    catalog.insert(event.clone());
    let service = TicketService::new(Arc::new(catalog), Arc::new(BrokenDisk), 16);

    let outcome = service.release_tickets(&acme, event.id()).unwrap();
    assert!(matches!(outcome, ReleaseOutcome::Released(_)));
    assert_eq!(event.pool().unwrap().available_count().unwrap(), 1);

    let ada = customer("ada", 1);
    let outcome = service.purchase_ticket(&ada, event.id()).unwrap();
    assert!(outcome.is_purchased());
    assert_eq!(event.pool().unwrap().sold_count().unwrap(), 1);
}

#[tokio::test]
async fn test_single_shot_errors() {
    let acme = vendor("acme", 1);
    let bare = EventItem::new(EventInfo::new("Draft", acme.id.clone(), 2));
    let catalog = EventCatalog::new();
    catalog.insert(bare.clone());
    let service = TicketService::new(Arc::new(catalog), Arc::new(NoopPersistence), 16);

    let result = service.release_tickets(&acme, &EventId::new());
    assert!(matches!(result, Err(RuntimeError::EventNotFound(_))));

    let result = service.release_tickets(&acme, bare.id());
    assert!(matches!(
        result,
        Err(RuntimeError::Setup(SetupError::MissingPool(_)))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ticket_store_mirrors_batch() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(TicketStore::new(dir.path()));

    let vendors = vec![vendor("acme", 5)];
    let customers = vec![customer("ada", 2)];
    let events = vec![EventItem::with_pool(EventInfo::new(
        "Gig",
        vendors[0].id.clone(),
        4,
    ))];
    let controller = controller_with(&events, store.clone());

    let mut handle = controller.start(&vendors, &customers, &events).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.stop().await.unwrap();

    let live = events[0].pool().unwrap().snapshot().unwrap();
    let stored = store.load_pool(events[0].id()).unwrap().unwrap();
    assert_eq!(stored.version, live.version);
    assert_eq!(stored.available_count, live.available_count);

    let tickets = store.list_tickets(events[0].id()).unwrap();
    assert_eq!(tickets.len(), live.total_released);
    assert_eq!(
        tickets.iter().filter(|t| !t.is_available()).count(),
        live.total_sold
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_events_are_broadcast() {
    let vendors = vec![vendor("acme", 5)];
    let customers = vec![customer("ada", 5)];
    let events = vec![EventItem::with_pool(EventInfo::new(
        "Gig",
        vendors[0].id.clone(),
        2,
    ))];
    let controller = controller_with(&events, Arc::new(NoopPersistence));
    let mut rx = controller.subscribe();

    let mut handle = controller.start(&vendors, &customers, &events).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.stop().await.unwrap();

    let mut started = 0;
    let mut stopped = 0;
    let mut released = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            SimulationEvent::WorkerStarted { .. } => started += 1,
            SimulationEvent::WorkerStopped { .. } => stopped += 1,
            SimulationEvent::TicketReleased { .. } => released += 1,
            _ => {}
        }
    }
    assert_eq!(started, 2);
    assert_eq!(stopped, 2);
    assert!(released > 0);
}
