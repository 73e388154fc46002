//! End-to-end scheduling scenarios driven one cycle at a time.

mod common;

use common::*;
use serde_json::{json, Map};
use tasker_cluster::messaging::TaskDataStore;
use tasker_cluster::orchestration::{
    CycleOutcome, Distribution, EnqueueOutcome, QueueTransitions, TaskProcessor,
};
use tasker_cluster::models::TaskRequest;
use tasker_cluster::state_machine::TaskState;

fn processor(cluster: &TestCluster, node: usize) -> TaskProcessor {
    TaskProcessor::new(0, cluster.node(node).clone())
}

async fn drain(processor: &TaskProcessor) -> Vec<CycleOutcome> {
    let mut outcomes = Vec::new();
    loop {
        let outcome = processor.process_once().await.unwrap();
        if outcome == CycleOutcome::Idle {
            return outcomes;
        }
        outcomes.push(outcome);
    }
}

#[tokio::test]
async fn test_non_periodic_enqueued_twice_lands_twice_in_global() {
    let cluster = single_node();
    let node = cluster.node(0);

    let first = node.enqueue_named("ping", None, Map::new(), true).await.unwrap();
    let second = node.enqueue_named("ping", None, Map::new(), true).await.unwrap();

    let first_id = first.task_id().unwrap().to_string();
    let second_id = second.task_id().unwrap().to_string();
    assert_ne!(first_id, second_id);
    assert_eq!(
        cluster.store.list_contents(node.queues().global()),
        vec![first_id, second_id]
    );
}

#[tokio::test]
async fn test_periodic_any_rejected_until_retired() {
    let cluster = single_node();
    let node = cluster.node(0);
    let worker = processor(&cluster, 0);

    let first = node
        .enqueue_named("heartbeat", None, Map::new(), true)
        .await
        .unwrap();
    let first_id = first.task_id().unwrap().to_string();

    let second = node
        .enqueue_named("heartbeat", None, Map::new(), true)
        .await
        .unwrap();
    assert_eq!(
        second,
        EnqueueOutcome::SkippedPeriodic {
            existing_id: first_id.clone()
        }
    );

    // global -> local, still outstanding
    worker.process_once().await.unwrap();
    let blocked = node
        .enqueue_named("heartbeat", None, Map::new(), true)
        .await
        .unwrap();
    assert!(!blocked.is_enqueued());

    // local -> run -> retired
    assert_eq!(
        worker.process_once().await.unwrap(),
        CycleOutcome::Executed {
            task_id: first_id,
            ok: true
        }
    );
    assert_eq!(cluster.counter.count("heartbeat"), 1);

    let third = node
        .enqueue_named("heartbeat", None, Map::new(), true)
        .await
        .unwrap();
    assert!(third.is_enqueued());
}

#[tokio::test]
async fn test_periodic_any_blocked_by_delayed_and_processing_instances() {
    let cluster = single_node();
    let node = cluster.node(0);

    let delayed = node
        .enqueue_named("heartbeat", Some(START_MS + 60_000), Map::new(), true)
        .await
        .unwrap();
    assert_eq!(delayed.task().unwrap().queue, node.queues().delayed());
    assert!(!node
        .enqueue_named("heartbeat", None, Map::new(), true)
        .await
        .unwrap()
        .is_enqueued());

    // simulate a claim into processing by another worker
    cluster.clock.advance_ms(60_000);
    processor(&cluster, 0).process_once().await.unwrap();
    QueueTransitions::new(node)
        .claim(node.queues().global())
        .await
        .unwrap();
    assert_eq!(
        cluster.queues_holding(delayed.task_id().unwrap()),
        vec![node.queues().processing().to_string()]
    );
    assert!(!node
        .enqueue_named("heartbeat", None, Map::new(), true)
        .await
        .unwrap()
        .is_enqueued());
}

#[tokio::test]
async fn test_delayed_task_promoted_once_run_at_elapses() {
    let cluster = single_node();
    let node = cluster.node(0);
    let worker = processor(&cluster, 0);

    let outcome = node
        .enqueue_named("ping", Some(START_MS + 60_000), Map::new(), true)
        .await
        .unwrap();
    let id = outcome.task_id().unwrap().to_string();

    assert_eq!(cluster.queues_holding(&id), vec![node.queues().delayed().to_string()]);
    let record = cluster
        .store
        .hash_get(node.queues().data(), &id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record["queue"], node.queues().delayed());
    assert_eq!(record["state"], "delayed");

    // not yet due: the ring keeps it
    for _ in 0..3 {
        assert_eq!(
            worker.process_once().await.unwrap(),
            CycleOutcome::Requeued { task_id: id.clone() }
        );
    }

    cluster.clock.advance_ms(60_001);
    assert_eq!(
        worker.process_once().await.unwrap(),
        CycleOutcome::Promoted { task_id: id.clone() }
    );
    assert_eq!(cluster.queues_holding(&id), vec![node.queues().global().to_string()]);

    let tasks = node.all_tasks(Some("ping")).await.unwrap();
    let promoted = &tasks[&id];
    assert_eq!(promoted.queue, node.queues().global());
    assert_eq!(promoted.state, TaskState::Pending);

    let outcomes = drain(&worker).await;
    assert_eq!(outcomes.len(), 2);
    assert_eq!(cluster.counter.count("ping"), 1);
    assert_eq!(cluster.record_count(), 0);
}

#[tokio::test]
async fn test_delayed_ring_promotes_only_due_tasks() {
    let cluster = single_node();
    let node = cluster.node(0);
    let worker = processor(&cluster, 0);

    let late = node
        .enqueue_named("ping", Some(START_MS + 120_000), Map::new(), true)
        .await
        .unwrap();
    let soon = node
        .enqueue_named("ping", Some(START_MS + 10_000), Map::new(), true)
        .await
        .unwrap();

    cluster.clock.advance_ms(10_000);
    assert_eq!(
        worker.process_once().await.unwrap(),
        CycleOutcome::Requeued {
            task_id: late.task_id().unwrap().to_string()
        }
    );
    assert_eq!(
        worker.process_once().await.unwrap(),
        CycleOutcome::Promoted {
            task_id: soon.task_id().unwrap().to_string()
        }
    );
    assert_eq!(
        cluster.store.list_contents(node.queues().delayed()),
        vec![late.task_id().unwrap().to_string()]
    );
}

#[tokio::test]
async fn test_broadcast_fan_out_completeness() {
    let cluster = TestCluster::new(&["node-a", "node-b", "node-c"]);
    let origin = cluster.node(0);

    let outcome = origin
        .enqueue_named("flush", None, Map::new(), true)
        .await
        .unwrap();
    let original_id = outcome.task_id().unwrap().to_string();

    let cycle = processor(&cluster, 0).process_once().await.unwrap();
    let CycleOutcome::Distributed {
        task_id,
        distribution: Distribution::FannedOut { copies },
    } = cycle
    else {
        panic!("expected a fan-out, got {cycle:?}");
    };
    assert_eq!(task_id, original_id);
    assert_eq!(copies.len(), 2);

    // original fully retired
    assert!(cluster.queues_holding(&original_id).is_empty());
    assert!(cluster
        .store
        .hash_get(origin.queues().data(), &original_id)
        .await
        .unwrap()
        .is_none());

    // one record per copy, each in a distinct peer's local queue
    assert_eq!(cluster.record_count(), 2);
    for (copy, node_index) in copies.iter().zip([1usize, 2]) {
        let peer = cluster.node(node_index);
        assert_eq!(copy.peer_id, peer.node_id());
        assert_eq!(
            cluster.queues_holding(&copy.task_id),
            vec![peer.queues().local().to_string()]
        );
    }

    // each peer runs its own copy; the origin never gets one
    assert!(drain(&processor(&cluster, 0)).await.is_empty());
    assert_eq!(drain(&processor(&cluster, 1)).await.len(), 1);
    assert_eq!(drain(&processor(&cluster, 2)).await.len(), 1);
    assert_eq!(cluster.counter.count("flush"), 2);
    assert_eq!(cluster.record_count(), 0);
}

#[tokio::test]
async fn test_broadcast_periodic_blocked_only_while_in_global() {
    let cluster = TestCluster::new(&["node-a", "node-b"]);
    let origin = cluster.node(0);

    let first = origin.enqueue_named("sync", None, Map::new(), true).await.unwrap();
    assert!(first.is_enqueued());
    assert!(!origin
        .enqueue_named("sync", None, Map::new(), true)
        .await
        .unwrap()
        .is_enqueued());

    // fanned out: the copy in node-b's local queue does not block a new cycle
    processor(&cluster, 0).process_once().await.unwrap();
    assert_eq!(
        cluster.store.list_contents(cluster.node(1).queues().local()).len(),
        1
    );
    assert!(origin
        .enqueue_named("sync", None, Map::new(), true)
        .await
        .unwrap()
        .is_enqueued());
}

#[tokio::test]
async fn test_global_branch_claims_from_global_queue() {
    let cluster = TestCluster::new(&["node-a", "node-b"]);
    let node_a = cluster.node(0);
    let node_b = cluster.node(1);

    // work sits only in global and in another node's local queue
    let global = node_a.enqueue_named("ping", None, Map::new(), true).await.unwrap();
    let foreign = node_b
        .enqueue(
            node_b.create_task(TaskRequest::new("ping")).unwrap(),
            Some(node_b.queues().local()),
        )
        .await
        .unwrap();

    let cycle = processor(&cluster, 0).process_once().await.unwrap();
    assert!(matches!(
        &cycle,
        CycleOutcome::Distributed { task_id, .. } if task_id == global.task_id().unwrap()
    ));
    assert!(cluster.store.list_contents(node_a.queues().global()).is_empty());
    assert_eq!(
        cluster.queues_holding(foreign.task_id().unwrap()),
        vec![node_b.queues().local().to_string()]
    );
}

#[tokio::test]
async fn test_local_queue_takes_priority_over_global() {
    let cluster = single_node();
    let node = cluster.node(0);

    node.enqueue_named("ping", None, Map::new(), true).await.unwrap();
    let local = node
        .enqueue(
            node.create_task(TaskRequest::new("ping")).unwrap(),
            Some(node.queues().local()),
        )
        .await
        .unwrap();

    assert_eq!(
        processor(&cluster, 0).process_once().await.unwrap(),
        CycleOutcome::Executed {
            task_id: local.task_id().unwrap().to_string(),
            ok: true
        }
    );
}

#[tokio::test]
async fn test_retirement_after_success_and_failure() {
    let cluster = single_node();
    let node = cluster.node(0);
    let worker = processor(&cluster, 0);

    let mut ids = Vec::new();
    for name in ["ping", "explode", "panics"] {
        let task = node
            .create_task(TaskRequest::new(name).with_param("attempt", json!(1)))
            .unwrap();
        let outcome = node.enqueue(task, Some(node.queues().local())).await.unwrap();
        ids.push(outcome.task_id().unwrap().to_string());
    }

    let outcomes = drain(&worker).await;
    let oks: Vec<bool> = outcomes
        .iter()
        .map(|outcome| match outcome {
            CycleOutcome::Executed { ok, .. } => *ok,
            other => panic!("unexpected outcome {other:?}"),
        })
        .collect();
    assert_eq!(oks, vec![true, false, false]);

    for id in &ids {
        assert!(cluster.queues_holding(id).is_empty());
    }
    assert_eq!(cluster.record_count(), 0);

    let reported: Vec<String> = cluster
        .reporter
        .task_errors()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(reported, vec!["explode", "panics"]);
    assert!(cluster.reporter.loop_errors().is_empty());
}
