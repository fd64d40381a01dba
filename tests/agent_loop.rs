//! Agent loop integration tests
//!
//! Drives agents with scripted providers and checks what lands in the log.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cohort::capability::{builtin, CapabilitySet, CapabilitySpec, FieldSpec};
use cohort::core::{Answer, ChatTurn, CohortError, Role};
use cohort::llm::ScriptedProvider;
use cohort::{Agent, Outcome};
use tokio_test::{assert_err, assert_ok};

/// Capability counting its calls and echoing its input
fn counting_echo(calls: Arc<AtomicUsize>) -> CapabilitySpec {
    assert_ok!(CapabilitySpec::builder()
        .with_id("echo")
        .with_name("Echo")
        .with_description("Returns its input unchanged")
        .with_field(FieldSpec::string("text", "Text to return"))
        .with_fn(move |args| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(args.to_string())
        })
        .build())
}

fn agent(provider: Arc<ScriptedProvider>, capabilities: CapabilitySet, max_retries: usize) -> Agent {
    assert_ok!(Agent::builder("Iara")
        .provider(provider, "scripted-model")
        .capabilities(capabilities)
        .max_retries(max_retries)
        .build())
}

fn system_observations(log: &[ChatTurn]) -> Vec<&str> {
    log.iter()
        .skip(1)
        .filter(|t| t.role == Role::System)
        .map(|t| t.content.as_str())
        .collect()
}

#[tokio::test]
async fn test_n_invocations_produce_n_system_turns() {
    const N: usize = 4;
    let mut script = ScriptedProvider::new();
    for i in 0..N {
        script = script.then(Answer::invoke("echo", format!(r#"{{"text":"{}"}}"#, i)));
    }
    let provider = Arc::new(script.then(Answer::text("finished")));
    let mut agent = agent(provider.clone(), assert_ok!(builtin::builtin_set()), N);

    let outcome = agent.solve("count to four", None).await;
    assert!(outcome.is_done());

    let observations = system_observations(agent.log());
    assert_eq!(observations.len(), N);
    for (i, turn) in observations.iter().enumerate() {
        assert_eq!(*turn, format!(r#"[echo] said: {{"text":"{}"}}"#, i));
    }
    assert_eq!(provider.request_count(), N + 1);
}

#[tokio::test]
async fn test_budget_smaller_than_invocations_exhausts() {
    let provider = Arc::new(ScriptedProvider::repeating(Answer::invoke("echo", "{}")));
    let mut agent = agent(provider.clone(), assert_ok!(builtin::builtin_set()), 2);

    let outcome = agent.solve("loop forever", None).await;
    match outcome {
        Outcome::Exhausted(last) => assert!(last.is_invocation()),
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(provider.request_count(), 3);

    let last = agent.log().last().unwrap();
    assert_eq!(last.role, Role::System);
    assert!(last.content.contains("loop forever"));
}

#[tokio::test]
async fn test_unknown_capability_fails_without_another_iteration() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .then(Answer::invoke("teleport", "{}"))
            .then(Answer::text("never reached")),
    );
    let mut agent = agent(provider.clone(), assert_ok!(builtin::builtin_set()), 10);

    let outcome = agent.solve("go somewhere", None).await;
    assert!(matches!(
        outcome.error(),
        Some(CohortError::CapabilityNotFound(id)) if id == "teleport"
    ));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_provider_failure_is_not_retried() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .then_fail("connection refused")
            .then(Answer::text("too late")),
    );
    let mut agent = agent(provider.clone(), CapabilitySet::default(), 10);

    let err = assert_err!(agent.solve("hello", None).await.into_result());
    assert!(err.is_provider_failure());
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_echo_end_to_end() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut set = CapabilitySet::new("test");
    assert_ok!(set.register(counting_echo(Arc::clone(&calls))));

    let provider = Arc::new(
        ScriptedProvider::new()
            .then(Answer::invoke("echo", r#"{"text":"x"}"#))
            .then(Answer::text("done")),
    );
    let mut agent = agent(provider, set, 10);

    let answer = assert_ok!(agent.solve("x", None).await.into_result());
    assert_eq!(answer.text_or_empty(), "done");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
