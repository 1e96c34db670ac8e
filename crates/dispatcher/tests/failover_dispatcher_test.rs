use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use taskrelay_core::{
    errors::TransportError,
    models::{DispatchRequest, Host, TargetCategory},
    DispatchError,
};
use taskrelay_dispatcher::{
    BoundedRetrySender, FailoverDispatcher, PreferredFirstStrategy, RetryPolicy,
};
use taskrelay_testing_utils::{
    host_set, worker_host, CommandBuilder, MockNodeResolver, RecordingDelay, ScriptedTransport,
};

struct Fixture {
    resolver: Arc<MockNodeResolver>,
    transport: Arc<ScriptedTransport>,
    delay: Arc<RecordingDelay>,
    dispatcher: FailoverDispatcher,
}

fn fixture(resolver: MockNodeResolver, max_retries: u32) -> Fixture {
    let resolver = Arc::new(resolver);
    let transport = Arc::new(ScriptedTransport::new());
    let delay = Arc::new(RecordingDelay::new());
    let sender = Arc::new(BoundedRetrySender::new(
        transport.clone(),
        delay.clone(),
        RetryPolicy::new(max_retries, Duration::from_millis(100)),
    ));
    let dispatcher = FailoverDispatcher::new(
        resolver.clone(),
        Arc::new(PreferredFirstStrategy::new()),
        sender,
    );

    Fixture {
        resolver,
        transport,
        delay,
        dispatcher,
    }
}

#[tokio::test]
async fn test_first_host_success_is_cheap() {
    let (a, b) = (worker_host(1), worker_host(2));
    let f = fixture(
        MockNodeResolver::new().with_group("default", host_set(&[a.clone(), b.clone()])),
        3,
    );

    let request = DispatchRequest::node_pool("default", CommandBuilder::new().build()).unwrap();
    let outcome = f.dispatcher.dispatch(&request).await.unwrap();

    assert_eq!(outcome.succeeded_host, a);
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(outcome.total_attempts(), 1);
    assert_eq!(f.transport.attempted_hosts(), vec![a]);
    assert!(f.delay.waits().is_empty());
    assert_eq!(f.resolver.calls(), 1);
}

#[tokio::test]
async fn test_k_failures_then_success_stays_on_one_host() {
    let (a, b, c) = (worker_host(1), worker_host(2), worker_host(3));
    let f = fixture(
        MockNodeResolver::new().with_group("default", host_set(&[a.clone(), b.clone(), c.clone()])),
        3,
    );
    f.transport.fail_times(&b, 2);

    let request = DispatchRequest::node_pool("default", CommandBuilder::new().build())
        .unwrap()
        .with_preferred_host(b.clone());
    let outcome = f.dispatcher.dispatch(&request).await.unwrap();

    assert_eq!(outcome.succeeded_host, b);
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(outcome.attempts[0].attempts, 3);
    assert!(outcome.attempts[0].is_success());
    assert_eq!(f.transport.distinct_hosts(), vec![b]);
    assert_eq!(f.delay.waits().len(), 2);
}

#[tokio::test]
async fn test_all_hosts_failing_exhausts_in_candidate_order() {
    let hosts = vec![worker_host(3), worker_host(1), worker_host(2)];
    let f = fixture(
        MockNodeResolver::new().with_group("etl", host_set(&hosts)),
        3,
    );
    for host in &hosts {
        f.transport.fail_always(host);
    }

    let request = DispatchRequest::node_pool("etl", CommandBuilder::new().build()).unwrap();
    let err = f.dispatcher.dispatch(&request).await.unwrap_err();

    let attempts = match &err {
        DispatchError::DispatchExhausted { attempts } => attempts,
        other => panic!("unexpected error: {other:?}"),
    };
    let tried: Vec<Host> = attempts.iter().map(|a| a.host.clone()).collect();
    assert_eq!(tried, vec![worker_host(1), worker_host(2), worker_host(3)]);
    for attempt in attempts {
        assert_eq!(attempt.attempts, 4);
        assert!(matches!(
            attempt.last_error,
            Some(TransportError::Connection(_))
        ));
    }
    assert_eq!(f.transport.total_attempts(), 12);
    assert_eq!(f.transport.distinct_hosts(), tried);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_pinned_host_never_consults_resolver() {
    let pinned = worker_host(9);
    let f = fixture(
        MockNodeResolver::new().with_group("default", host_set(&[worker_host(1), worker_host(2)])),
        3,
    );

    let request = DispatchRequest::pinned_host(pinned.clone(), CommandBuilder::new().build());
    assert_eq!(request.target_category(), TargetCategory::PinnedHost);
    let outcome = f.dispatcher.dispatch(&request).await.unwrap();

    assert_eq!(outcome.succeeded_host, pinned);
    assert_eq!(f.resolver.calls(), 0);
    assert_eq!(f.transport.distinct_hosts(), vec![pinned]);
}

#[tokio::test]
async fn test_pinned_host_failure_does_not_fail_over() {
    let pinned = worker_host(9);
    let f = fixture(
        MockNodeResolver::new().with_group("default", host_set(&[worker_host(1)])),
        1,
    );
    f.transport.fail_always(&pinned);

    let request = DispatchRequest::pinned_host(pinned.clone(), CommandBuilder::new().build());
    let err = f.dispatcher.dispatch(&request).await.unwrap_err();

    assert_eq!(err.attempts().len(), 1);
    assert_eq!(err.attempts()[0].host, pinned);
    assert_eq!(err.attempts()[0].attempts, 2);
    assert_eq!(f.transport.distinct_hosts(), vec![pinned]);
    assert_eq!(f.resolver.calls(), 0);
}

#[tokio::test]
async fn test_empty_candidates_exhaust_without_attempts() {
    let f = fixture(MockNodeResolver::new(), 3);

    let request = DispatchRequest::node_pool("missing", CommandBuilder::new().build()).unwrap();
    let err = f.dispatcher.dispatch(&request).await.unwrap_err();

    assert!(matches!(err, DispatchError::DispatchExhausted { ref attempts } if attempts.is_empty()));
    assert_eq!(f.transport.total_attempts(), 0);
    assert_eq!(f.resolver.calls(), 1);
}

#[tokio::test]
async fn test_preferred_b_fails_and_c_succeeds() {
    let (a, b, c) = (
        Host::new("A", 1234),
        Host::new("B", 1234),
        Host::new("C", 1234),
    );
    let f = fixture(
        MockNodeResolver::new().with_group("default", host_set(&[a.clone(), b.clone(), c.clone()])),
        3,
    );
    f.transport.fail_always(&b);
    f.transport.fail_always(&a);
    f.transport.succeed_always(&c);

    let request = DispatchRequest::node_pool("default", CommandBuilder::new().build())
        .unwrap()
        .with_preferred_host(b.clone());
    let outcome = f.dispatcher.dispatch(&request).await.unwrap();

    // 非优先节点按地址升序：[B, A, C]
    assert_eq!(outcome.succeeded_host, c);
    assert_eq!(f.transport.distinct_hosts(), vec![b.clone(), a.clone(), c.clone()]);
    assert_eq!(outcome.attempts.len(), 3);
    assert_eq!(outcome.attempts[0].host, b);
    assert_eq!(outcome.attempts[0].attempts, 4);
    assert_eq!(outcome.attempts[1].host, a);
    assert_eq!(outcome.attempts[2], taskrelay_core::HostAttempt::succeeded(c, 1));
}

#[tokio::test]
async fn test_second_host_succeeds_when_preferred_fails() {
    let (a, b) = (Host::new("A", 1234), Host::new("B", 1234));
    let f = fixture(
        MockNodeResolver::new().with_group("default", host_set(&[a.clone(), b.clone()])),
        3,
    );
    f.transport.fail_always(&b);

    let request = DispatchRequest::node_pool("default", CommandBuilder::new().build())
        .unwrap()
        .with_preferred_host(b.clone());
    let outcome = f.dispatcher.dispatch(&request).await.unwrap();

    assert_eq!(outcome.succeeded_host, a);
    assert!(outcome.failed_over());
    assert_eq!(outcome.hosts_tried(), 2);
    assert_eq!(outcome.total_attempts(), 5);
    assert_eq!(f.delay.waits(), vec![Duration::from_millis(100); 3]);
}

#[tokio::test]
async fn test_default_group_used_when_group_missing() {
    let a = worker_host(1);
    let f = fixture(
        MockNodeResolver::new().with_group("default", host_set(&[a.clone()])),
        3,
    );

    let request = DispatchRequest::new(
        TargetCategory::NodePool,
        None,
        CommandBuilder::new().build(),
        None,
    )
    .unwrap();
    let outcome = f.dispatcher.dispatch(&request).await.unwrap();
    assert_eq!(outcome.succeeded_host, a);
}

#[tokio::test]
async fn test_registry_failure_is_returned_before_any_send() {
    let f = fixture(MockNodeResolver::new(), 3);
    f.resolver.fail_with("registry session expired");

    let request = DispatchRequest::node_pool("default", CommandBuilder::new().build())
        .unwrap()
        .with_preferred_host(worker_host(1));
    let err = f.dispatcher.dispatch(&request).await.unwrap_err();

    assert!(matches!(err, DispatchError::Registry(_)));
    assert_eq!(f.transport.total_attempts(), 0);
}

#[tokio::test]
async fn test_concurrent_dispatches_do_not_share_state() {
    let hosts: Vec<Host> = (1..=3).map(worker_host).collect();
    let f = Arc::new(fixture(
        MockNodeResolver::new().with_group("default", host_set(&hosts)),
        0,
    ));
    f.transport.fail_always(&worker_host(1));

    let calls = (0..16).map(|_| {
        let f = f.clone();
        async move {
            let request =
                DispatchRequest::node_pool("default", CommandBuilder::new().build()).unwrap();
            f.dispatcher.dispatch(&request).await
        }
    });
    let outcomes = futures::future::join_all(calls).await;

    for outcome in outcomes {
        let outcome = outcome.unwrap();
        assert_eq!(outcome.succeeded_host, worker_host(2));
        assert_eq!(outcome.attempts.len(), 2);
    }
    let ids: HashSet<String> = f.transport.sent_command_ids().into_iter().collect();
    assert_eq!(ids.len(), 16);
    assert_eq!(f.transport.total_attempts(), 32);
}
