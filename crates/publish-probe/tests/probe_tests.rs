//! End-to-end tests for the publish probe against stub channels.

use std::path::PathBuf;

use probe_common::{DeliveryMode, MessageProperties, ResponseCode};
use publish_probe::{MessageSource, Outcome, ProbeConfig, ProbeError, ProbeState, PublishProbe};
use test_utils::fixtures::{AWKWARD_PAYLOADS, EXCHANGE, PING, ROUTING_KEY, STUB_ERROR};
use test_utils::{
    message_dir, message_file, numbered_messages, numbered_payload, CountingFileServer,
    StubChannel, StubSession,
};

fn ping_config(iterations: u32) -> ProbeConfig {
    ProbeConfig {
        iterations,
        ..ProbeConfig::text(EXCHANGE, ROUTING_KEY, PING)
    }
}

fn counting_probe() -> PublishProbe<CountingFileServer> {
    PublishProbe::with_file_server("probe", CountingFileServer::new())
}

// ============================================================================
// Content resolution
// ============================================================================

#[test]
fn test_text_source_returned_verbatim() {
    let mut probe = counting_probe();
    for payload in AWKWARD_PAYLOADS {
        let config = ProbeConfig::text(EXCHANGE, ROUTING_KEY, payload);
        assert_eq!(probe.resolve_content(&config).unwrap(), payload);
    }
    assert_eq!(probe.content().files().read_count(), 0);
}

#[test]
fn test_file_source_second_call_is_cache_hit() {
    let (_dir, path) = message_file("order.json", "{\"id\":1}");
    let config = ProbeConfig {
        message_source: MessageSource::File,
        file_path: path.clone(),
        ..ProbeConfig::default()
    };

    let mut probe = counting_probe();
    let first = probe.resolve_content(&config).unwrap();
    let second = probe.resolve_content(&config).unwrap();

    assert_eq!(first, "{\"id\":1}");
    assert_eq!(first, second);
    assert_eq!(probe.content().files().reads_of(&path), 1);
    assert_eq!(probe.content().cache().stats().hits, 1);
}

#[test]
fn test_missing_file_retried_every_call() {
    let dir = message_dir(&[]);
    let path = dir.path().join("missing.txt");
    let config = ProbeConfig {
        message_source: MessageSource::File,
        file_path: path.clone(),
        ..ProbeConfig::default()
    };

    let mut probe = counting_probe();
    for _ in 0..3 {
        let err = probe.resolve_content(&config).unwrap_err();
        assert!(matches!(err, ProbeError::ContentResolution { .. }));
    }
    assert_eq!(probe.content().files().reads_of(&path), 3);
    assert!(probe.content().cache().is_empty());
}

#[test]
fn test_relative_and_absolute_paths_cached_separately() {
    let (dir, path) = message_file("a.txt", "alpha");
    let dotted: PathBuf = dir.path().join(".").join("a.txt");

    let mut probe = counting_probe();
    for file_path in [path.clone(), dotted.clone()] {
        let config = ProbeConfig {
            message_source: MessageSource::File,
            file_path,
            ..ProbeConfig::default()
        };
        assert_eq!(probe.resolve_content(&config).unwrap(), "alpha");
    }
    assert_eq!(probe.content().cache().len(), 2);
}

#[test]
fn test_random_source_only_picks_txt_and_is_not_cached() {
    let dir = numbered_messages(4);
    std::fs::write(dir.path().join("ignored.json"), "nope").unwrap();
    let config = ProbeConfig {
        message_source: MessageSource::RandomFileInDirectory,
        random_directory: dir.path().to_path_buf(),
        ..ProbeConfig::default()
    };

    let expected: Vec<String> = (0..4).map(numbered_payload).collect();
    let mut probe = counting_probe();
    for _ in 0..20 {
        let body = probe.resolve_content(&config).unwrap();
        assert!(expected.contains(&body), "unexpected body {body}");
    }
    assert_eq!(probe.content().files().pick_count(), 20);
    assert_eq!(probe.content().files().read_count(), 20);
    assert!(probe.content().cache().is_empty());
}

// ============================================================================
// Publish cycle
// ============================================================================

#[test]
fn test_ping_scenario_succeeds() {
    let mut session = StubSession::new();
    let mut probe = PublishProbe::new("ping");

    let result = probe.run_invocation(&mut session, &ping_config(3));

    assert!(result.success);
    assert_eq!(result.response_code, ResponseCode::Ok);
    assert_eq!(result.response_message, "OK");
    assert_eq!(result.sampler_data.as_deref(), Some(PING));
    assert_eq!(result.messages_published, 3);
    assert_eq!(result.bytes_published, 12);
    assert!(result.is_timed());

    let calls = &session.channel.publish_calls;
    assert_eq!(calls.len(), 3);
    for call in calls {
        assert_eq!(call.exchange, EXCHANGE);
        assert_eq!(call.routing_key, ROUTING_KEY);
        assert_eq!(call.body, PING.as_bytes());
        assert_eq!(call.properties.delivery_mode.map(|m| m.as_u8()), Some(1));
        assert_eq!(call.properties, calls[0].properties);
    }
    assert_eq!(session.channel.commit_calls, 0);
    assert_eq!(probe.state(), ProbeState::Completed(Outcome::Success));
}

#[test]
fn test_failure_on_second_publish() {
    let mut session =
        StubSession::with_channel(StubChannel::new().fail_on_publish(2, STUB_ERROR));
    let mut probe = PublishProbe::new("ping");

    let result = probe.run_invocation(&mut session, &ping_config(3));

    assert!(!result.success);
    assert_eq!(result.response_code, ResponseCode::PublishFailure);
    assert!(result.response_message.contains(STUB_ERROR));
    assert_eq!(session.channel.publish_count(), 2);
    assert_eq!(result.messages_published, 1);
    assert!(result.is_timed());
    assert_eq!(probe.state(), ProbeState::Completed(Outcome::Failure));
}

#[test]
fn test_zero_iterations_still_succeeds() {
    let mut session = StubSession::new();
    let mut probe = PublishProbe::new("ping");

    let result = probe.run_invocation(&mut session, &ping_config(0));

    assert!(result.success);
    assert_eq!(session.channel.publish_count(), 0);
}

#[test]
fn test_exact_publish_count() {
    for n in [1u32, 2, 7, 50] {
        let mut session = StubSession::new();
        let mut probe = PublishProbe::new("count");
        let result = probe.run_invocation(&mut session, &ping_config(n));
        assert!(result.success);
        assert_eq!(session.channel.publish_count(), n as usize);
    }
}

#[test]
fn test_delivery_mode_follows_persistent_flag() {
    for persistent in [true, false] {
        let mut session = StubSession::new();
        let mut probe = PublishProbe::new("durable");
        let config = ProbeConfig {
            persistent,
            ..ping_config(1)
        };

        assert!(probe.run_invocation(&mut session, &config).success);
        let mode = session.channel.publish_calls[0].properties.delivery_mode;
        assert_eq!(mode, Some(DeliveryMode::from_persistent(persistent)));
        assert_eq!(mode.map(|m| m.as_u8()), Some(if persistent { 2 } else { 1 }));
    }
}

#[test]
fn test_session_base_properties_are_inherited() {
    let base = MessageProperties::default()
        .with_content_type("text/plain")
        .with_header("x-run", "42")
        .with_correlation_id("overridden");
    let mut session = StubSession::new().with_base_properties(base);
    let mut probe = PublishProbe::new("props");
    let config = ProbeConfig {
        correlation_id: "c-1".to_string(),
        reply_to_queue: "replies".to_string(),
        message_type: "ping".to_string(),
        ..ping_config(1)
    };

    assert!(probe.run_invocation(&mut session, &config).success);
    let props = &session.channel.publish_calls[0].properties;
    assert_eq!(props.content_type.as_deref(), Some("text/plain"));
    assert_eq!(props.headers.get("x-run").map(String::as_str), Some("42"));
    assert_eq!(props.correlation_id.as_deref(), Some("c-1"));
    assert_eq!(props.reply_to.as_deref(), Some("replies"));
    assert_eq!(props.message_type.as_deref(), Some("ping"));
}

// ============================================================================
// Transactions
// ============================================================================

#[test]
fn test_transaction_commits_once_after_publishes() {
    let mut session = StubSession::new();
    let mut probe = PublishProbe::new("tx");
    let config = ProbeConfig {
        use_transaction: true,
        ..ping_config(4)
    };

    assert!(probe.run_invocation(&mut session, &config).success);
    assert_eq!(session.channel.publish_count(), 4);
    assert_eq!(session.channel.commit_calls, 1);
    assert_eq!(session.channel.transaction_mode_calls, 1);

    // Transaction mode is entered once per channel, commit happens every time.
    assert!(probe.run_invocation(&mut session, &config).success);
    assert_eq!(session.channel.commit_calls, 2);
    assert_eq!(session.channel.transaction_mode_calls, 1);
}

#[test]
fn test_no_commit_after_failed_publish() {
    let mut session =
        StubSession::with_channel(StubChannel::new().fail_on_publish(3, STUB_ERROR));
    let mut probe = PublishProbe::new("tx");
    let config = ProbeConfig {
        use_transaction: true,
        ..ping_config(5)
    };

    let result = probe.run_invocation(&mut session, &config);
    assert!(!result.success);
    assert_eq!(session.channel.commit_calls, 0);
}

#[test]
fn test_failed_transaction_discards_channel() {
    let mut session =
        StubSession::with_channel(StubChannel::new().fail_on_publish(2, STUB_ERROR));
    let mut probe = PublishProbe::new("tx");
    let config = ProbeConfig {
        use_transaction: true,
        ..ping_config(3)
    };

    assert!(!probe.run_invocation(&mut session, &config).success);
    assert_eq!(session.cleanup_calls, 1);
    assert!(!session.is_open());

    let result = probe.run_invocation(&mut session, &config);
    assert!(result.success);
    assert_eq!(session.channel.transaction_mode_calls, 2);
    assert_eq!(session.channel.commit_calls, 1);
}

#[test]
fn test_failed_publish_without_transaction_keeps_channel() {
    let mut session =
        StubSession::with_channel(StubChannel::new().fail_on_publish(1, STUB_ERROR));
    let mut probe = PublishProbe::new("plain");

    assert!(!probe.run_invocation(&mut session, &ping_config(1)).success);
    assert_eq!(session.cleanup_calls, 0);
    assert!(session.is_open());
}

#[test]
fn test_commit_failure_reported() {
    let mut session = StubSession::with_channel(StubChannel::new().fail_commit("tx rolled back"));
    let mut probe = PublishProbe::new("tx");
    let config = ProbeConfig {
        use_transaction: true,
        ..ping_config(2)
    };

    let result = probe.run_invocation(&mut session, &config);
    assert!(!result.success);
    assert_eq!(result.response_code, ResponseCode::PublishFailure);
    assert!(result.response_message.contains("tx rolled back"));
    assert_eq!(session.channel.publish_count(), 2);
}

#[test]
fn test_transaction_mode_failure_is_setup_failure() {
    let mut session =
        StubSession::with_channel(StubChannel::new().fail_transaction_mode("tx.select refused"));
    let mut probe = PublishProbe::new("tx");
    let config = ProbeConfig {
        use_transaction: true,
        ..ping_config(2)
    };

    let result = probe.run_invocation(&mut session, &config);
    assert!(!result.success);
    assert_eq!(result.response_code, ResponseCode::SetupFailure);
    assert!(!result.is_timed());
    assert_eq!(session.channel.publish_count(), 0);
}

// ============================================================================
// Failures before publishing
// ============================================================================

#[test]
fn test_setup_failure_is_untimed() {
    let mut session = StubSession::new().failing_init("connection refused");
    let mut probe = PublishProbe::new("setup");

    let result = probe.run_invocation(&mut session, &ping_config(3));

    assert!(!result.success);
    assert_eq!(result.response_code, ResponseCode::SetupFailure);
    assert!(result.response_message.contains("connection refused"));
    assert!(!result.is_timed());
    assert!(result.started_at.is_none());
    assert_eq!(session.channel.publish_count(), 0);
    assert_eq!(session.cleanup_calls, 1);
    assert_eq!(probe.state(), ProbeState::Uninitialized);
}

#[test]
fn test_empty_random_directory_fails_before_publish() {
    let dir = message_dir(&[]);
    let mut session = StubSession::new();
    let mut probe = PublishProbe::new("random");
    let config = ProbeConfig {
        message_source: MessageSource::RandomFileInDirectory,
        random_directory: dir.path().to_path_buf(),
        ..ping_config(3)
    };

    let result = probe.run_invocation(&mut session, &config);

    assert!(!result.success);
    assert_eq!(result.response_code, ResponseCode::PublishFailure);
    assert_eq!(session.channel.publish_count(), 0);
    assert!(result.sampler_data.is_none());
}

#[test]
fn test_failed_invocation_does_not_poison_the_next() {
    let dir = message_dir(&[]);
    let path = dir.path().join("late.txt");
    let mut session = StubSession::new();
    let mut probe = PublishProbe::new("late");
    let config = ProbeConfig {
        message_source: MessageSource::File,
        file_path: path.clone(),
        ..ping_config(1)
    };

    assert!(!probe.run_invocation(&mut session, &config).success);

    std::fs::write(&path, "arrived").unwrap();
    let result = probe.run_invocation(&mut session, &config);
    assert!(result.success);
    assert_eq!(result.sampler_data.as_deref(), Some("arrived"));
    assert_eq!(session.channel.publish_calls[0].body, b"arrived");
}

// ============================================================================
// Interruption
// ============================================================================

#[test]
fn test_interrupt_tears_down_session() {
    let mut session = StubSession::new();
    let mut probe = PublishProbe::new("interrupt");

    assert!(probe.run_invocation(&mut session, &ping_config(1)).success);
    assert!(session.is_open());

    assert!(probe.interrupt(&mut session));
    assert!(!session.is_open());
    assert_eq!(session.cleanup_calls, 1);
    assert_eq!(probe.state(), ProbeState::Uninitialized);

    assert!(probe.run_invocation(&mut session, &ping_config(1)).success);
    assert!(session.is_open());
}

#[test]
fn test_raised_handle_reinitializes_at_next_invocation() {
    let mut session = StubSession::new();
    let mut probe = PublishProbe::new("interrupt");
    let config = ProbeConfig {
        use_transaction: true,
        ..ping_config(1)
    };

    assert!(probe.run_invocation(&mut session, &config).success);
    probe.interrupt_handle().interrupt();
    assert_eq!(session.cleanup_calls, 0);

    assert!(probe.run_invocation(&mut session, &config).success);
    assert_eq!(session.cleanup_calls, 1);
    // A fresh channel enters transaction mode again.
    assert_eq!(session.channel.transaction_mode_calls, 2);
    assert!(!probe.interrupt_handle().is_raised());
}
