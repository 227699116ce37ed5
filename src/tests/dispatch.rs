// src/tests/dispatch.rs
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tempfile::tempdir;

use crate::ambient::AmbientContext;
use crate::config_loader::PipelineConfig;
use crate::destination::Destination;
use crate::dispatcher::Logger;
use crate::pipeline::LogPipeline;
use crate::record::LogLevel;
use crate::sanitizer::MASKED_SENTINEL;
use crate::tests::test_utils::StubDestination;

struct FixedAmbient;

impl AmbientContext for FixedAmbient {
    fn session_user(&self) -> Option<String> {
        Some("user-9".into())
    }
    fn location(&self) -> Option<String> {
        Some("/teams".into())
    }
    fn client_agent(&self) -> Option<String> {
        None
    }
}

#[test]
fn log_returns_before_slow_delivery_completes() {
    let slow = Arc::new(StubDestination::slow(
        LogLevel::Trace,
        Duration::from_millis(300),
    ));
    let logger = Logger::new(vec![slow.clone()]);

    let start = Instant::now();
    logger.info("quick return", None);
    assert!(
        start.elapsed() < Duration::from_millis(150),
        "dispatch blocked the caller"
    );

    logger.flush_all(false);
    assert_eq!(slow.count(), 1);
}

#[test]
fn failing_destination_never_starves_its_sibling() {
    let broken = Arc::new(StubDestination::new(LogLevel::Trace));
    broken.fail.store(true, Ordering::SeqCst);
    let healthy = Arc::new(StubDestination::new(LogLevel::Trace));

    let logger = Logger::new(vec![broken.clone(), healthy.clone()]);
    logger.warn("still flowing", None);
    logger.flush_all(false);

    assert_eq!(broken.count(), 0);
    assert_eq!(healthy.count(), 1);
}

#[test]
fn min_level_gate_drops_records_before_delivery() {
    let sink = Arc::new(StubDestination::new(LogLevel::Warn));
    let logger = Logger::new(vec![sink.clone()]);

    logger.debug("too quiet", None);
    logger.info("still too quiet", None);
    logger.warn("loud enough", None);
    logger.flush_all(false);

    let delivered = sink.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].message, "loud enough");
}

#[test]
fn disabled_destination_receives_nothing() {
    let sink = Arc::new(StubDestination::new(LogLevel::Trace));
    let logger = Logger::new(vec![sink.clone()]);

    sink.set_enabled(false);
    logger.fatal("into the void", None);
    logger.flush_all(false);
    assert_eq!(sink.count(), 0);

    sink.set_enabled(true);
    logger.fatal("heard this time", None);
    logger.flush_all(false);
    assert_eq!(sink.count(), 1);
}

#[test]
fn error_id_present_only_for_urgent_levels() {
    let sink = Arc::new(StubDestination::new(LogLevel::Trace));
    let logger = Logger::new(vec![sink.clone()]);

    logger.info("plain", None);
    logger.error("broken", None);
    logger.fatal("very broken", None);
    logger.flush_all(false);

    let delivered = sink.delivered.lock().unwrap();
    assert!(delivered[0].error_id.is_none());
    let error_id = delivered[1].error_id.clone().expect("error gets an id");
    let fatal_id = delivered[2].error_id.clone().expect("fatal gets an id");
    assert!(error_id.starts_with("err-"));
    assert_ne!(error_id, fatal_id);
}

#[test]
fn message_and_context_are_sanitized_before_fanout() {
    let sink = Arc::new(StubDestination::new(LogLevel::Trace));
    let logger = Logger::new(vec![sink.clone()]);

    logger.info(
        "signup from jane.doe@example.com",
        Some(json!({ "password": "abc123", "note": "ok" })),
    );
    logger.flush_all(false);

    let delivered = sink.delivered.lock().unwrap();
    assert_eq!(delivered[0].message, "signup from j***@example.com");
    assert_eq!(
        delivered[0].context,
        Some(json!({ "password": MASKED_SENTINEL, "note": "ok" }))
    );
}

#[test]
fn ambient_fields_are_stamped_best_effort() {
    let sink = Arc::new(StubDestination::new(LogLevel::Trace));
    let logger = Logger::with_ambient(vec![sink.clone()], Arc::new(FixedAmbient));

    logger.info("with ambient", None);
    logger.flush_all(false);

    let delivered = sink.delivered.lock().unwrap();
    assert_eq!(delivered[0].session_user.as_deref(), Some("user-9"));
    assert_eq!(delivered[0].location.as_deref(), Some("/teams"));
    assert_eq!(delivered[0].client_agent, None);
}

struct PanickyAmbient;

impl AmbientContext for PanickyAmbient {
    fn session_user(&self) -> Option<String> {
        panic!("ambient store unavailable")
    }
    fn location(&self) -> Option<String> {
        Some("/still/works".into())
    }
    fn client_agent(&self) -> Option<String> {
        None
    }
}

#[test]
fn panicking_ambient_provider_reads_as_field_absent() {
    let sink = Arc::new(StubDestination::new(LogLevel::Trace));
    let logger = Logger::with_ambient(vec![sink.clone()], Arc::new(PanickyAmbient));

    logger.info("survives ambient failure", None);
    logger.flush_all(false);

    let delivered = sink.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].session_user, None);
    assert_eq!(delivered[0].location.as_deref(), Some("/still/works"));
}

#[test]
fn records_reach_a_destination_in_call_order() {
    let sink = Arc::new(StubDestination::new(LogLevel::Trace));
    let logger = Logger::new(vec![sink.clone()]);

    for i in 0..5 {
        logger.info(&format!("m{}", i), None);
    }
    logger.flush_all(false);

    let delivered = sink.delivered.lock().unwrap();
    let messages: Vec<&str> = delivered.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages, vec!["m0", "m1", "m2", "m3", "m4"]);
}

#[test]
fn pipeline_roundtrip_through_the_durable_store() {
    let dir = tempdir().expect("failed to create temp dir");
    let config = PipelineConfig {
        data_dir: Some(dir.path().to_string_lossy().into_owned()),
        ..PipelineConfig::default()
    };

    let pipeline = LogPipeline::new(config).expect("pipeline should build");
    pipeline.logger().info("stored for diagnostics", None);
    pipeline.logger().flush_all(false);

    let stored = pipeline.stored_logs();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].message, "stored for diagnostics");

    pipeline.clear_stored();
    assert!(pipeline.stored_logs().is_empty());
    pipeline.shutdown();
}
