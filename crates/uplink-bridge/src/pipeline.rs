//! Two-phase interception pipeline.
//!
//! Phase 1 runs the override handlers registered for a raw event name as a
//! middleware chain: each handler receives the mutable payload and a
//! [`Next`] continuation, and either delegates (possibly after mutating the
//! payload) or short-circuits with its own events. The innermost stage of
//! the chain is the default normalizer.
//!
//! Phase 2 runs the enrichers: each sees the finalized payload and the
//! primary events, and may only append derived events.
//!
//! Failures are isolated per callback: a failing handler is treated as if
//! it had delegated unchanged, a failing enricher is skipped, and every
//! failure is surfaced to the caller for conversion into an `error` event.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;
use uplink_protocol::{BridgeError, BridgeResult, UIEvent};

/// Override stage for one raw event name.
///
/// Implemented for any
/// `Fn(&str, &mut Map<String, Value>, Next<'_>) -> BridgeResult<Vec<UIEvent>>`.
pub trait OverrideHandler: Send + Sync {
    fn handle(
        &self,
        name: &str,
        payload: &mut Map<String, Value>,
        next: Next<'_>,
    ) -> BridgeResult<Vec<UIEvent>>;
}

impl<F> OverrideHandler for F
where
    F: Fn(&str, &mut Map<String, Value>, Next<'_>) -> BridgeResult<Vec<UIEvent>> + Send + Sync,
{
    fn handle(
        &self,
        name: &str,
        payload: &mut Map<String, Value>,
        next: Next<'_>,
    ) -> BridgeResult<Vec<UIEvent>> {
        self(name, payload, next)
    }
}

/// Enrichment stage: appends derived events after the primary result is
/// final. Cannot suppress or mutate the primary events.
///
/// Implemented for any
/// `Fn(&str, &Map<String, Value>, &[UIEvent]) -> BridgeResult<Vec<UIEvent>>`.
pub trait Enricher: Send + Sync {
    fn enrich(
        &self,
        name: &str,
        payload: &Map<String, Value>,
        primary: &[UIEvent],
    ) -> BridgeResult<Vec<UIEvent>>;
}

impl<F> Enricher for F
where
    F: Fn(&str, &Map<String, Value>, &[UIEvent]) -> BridgeResult<Vec<UIEvent>> + Send + Sync,
{
    fn enrich(
        &self,
        name: &str,
        payload: &Map<String, Value>,
        primary: &[UIEvent],
    ) -> BridgeResult<Vec<UIEvent>> {
        self(name, payload, primary)
    }
}

type DefaultFn<'a> = &'a (dyn Fn(&str, &Map<String, Value>) -> Vec<UIEvent> + 'a);

struct ChainShared<'a> {
    default: DefaultFn<'a>,
    failures: RefCell<Vec<BridgeError>>,
    /// Result of each chain suffix that already ran, keyed by suffix
    /// length. A suffix runs at most once: the default normalizer has
    /// correlation side effects that must not repeat when a handler
    /// delegates twice or fails after delegating.
    memo: RefCell<HashMap<usize, Vec<UIEvent>>>,
}

/// Continuation handed to an override handler: the rest of the chain plus
/// the default normalizer.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    rest: &'a [Arc<dyn OverrideHandler>],
    shared: &'a ChainShared<'a>,
}

impl Next<'_> {
    /// Run the remaining handlers and the default for (`name`, `payload`).
    pub fn run(self, name: &str, payload: &mut Map<String, Value>) -> Vec<UIEvent> {
        let suffix = self.rest.len();
        if let Some(cached) = self.shared.memo.borrow().get(&suffix) {
            return cached.clone();
        }
        let events = match self.rest.split_first() {
            None => (self.shared.default)(name, payload),
            Some((head, tail)) => {
                let next = Next {
                    rest: tail,
                    shared: self.shared,
                };
                match head.handle(name, payload, next) {
                    Ok(events) => events,
                    Err(error) => {
                        warn!(event = name, %error, "override handler failed");
                        self.shared.failures.borrow_mut().push(error);
                        next.run(name, payload)
                    }
                }
            }
        };
        self.shared.memo.borrow_mut().insert(suffix, events.clone());
        events
    }
}

pub(crate) struct PipelineOutput {
    /// Primary events followed by enricher-derived events, in final
    /// emission order.
    pub events: Vec<UIEvent>,
    /// Isolated callback failures, for conversion into `error` events.
    pub failures: Vec<BridgeError>,
}

pub(crate) fn run(
    handlers: &[Arc<dyn OverrideHandler>],
    enrichers: &[Arc<dyn Enricher>],
    default: DefaultFn<'_>,
    name: &str,
    payload: &mut Map<String, Value>,
) -> PipelineOutput {
    let shared = ChainShared {
        default,
        failures: RefCell::new(Vec::new()),
        memo: RefCell::new(HashMap::new()),
    };
    let primary = Next {
        rest: handlers,
        shared: &shared,
    }
    .run(name, payload);
    let mut failures = shared.failures.into_inner();

    let mut events = primary.clone();
    for enricher in enrichers {
        match enricher.enrich(name, payload, &primary) {
            Ok(derived) => events.extend(derived),
            Err(error) => {
                warn!(event = name, %error, "enricher failed");
                failures.push(error);
            }
        }
    }

    PipelineOutput { events, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uplink_protocol::BridgeError;

    fn default_one(name: &str, payload: &Map<String, Value>) -> Vec<UIEvent> {
        vec![UIEvent::new(format!("default:{name}"), payload.clone())]
    }

    fn as_handlers(
        handlers: Vec<Arc<dyn OverrideHandler>>,
    ) -> Vec<Arc<dyn OverrideHandler>> {
        handlers
    }

    #[test]
    fn no_handlers_runs_the_default() {
        let mut payload = Map::new();
        let output = run(&[], &[], &default_one, "tool:pre", &mut payload);
        assert_eq!(output.events.len(), 1);
        assert_eq!(output.events[0].event_type, "default:tool:pre");
        assert!(output.failures.is_empty());
    }

    #[test]
    fn handler_can_mutate_payload_and_delegate() {
        let handlers = as_handlers(vec![Arc::new(
            |name: &str, payload: &mut Map<String, Value>, next: Next<'_>| {
                payload.insert("badge".to_owned(), json!("fast"));
                Ok(next.run(name, payload))
            },
        )]);
        let mut payload = Map::new();
        let output = run(&handlers, &[], &default_one, "tool:post", &mut payload);
        assert_eq!(output.events[0].data["badge"], "fast");
    }

    #[test]
    fn handler_can_short_circuit_the_default() {
        let handlers = as_handlers(vec![Arc::new(
            |_name: &str, _payload: &mut Map<String, Value>, _next: Next<'_>| {
                Ok(vec![UIEvent::new("replaced", Map::new())])
            },
        )]);
        let mut payload = Map::new();
        let output = run(&handlers, &[], &default_one, "tool:post", &mut payload);
        assert_eq!(output.events.len(), 1);
        assert_eq!(output.events[0].event_type, "replaced");
    }

    #[test]
    fn chained_handlers_consume_each_others_output() {
        let first: Arc<dyn OverrideHandler> = Arc::new(
            |name: &str, payload: &mut Map<String, Value>, next: Next<'_>| {
                payload.insert("first".to_owned(), json!(true));
                Ok(next.run(name, payload))
            },
        );
        let second: Arc<dyn OverrideHandler> = Arc::new(
            |name: &str, payload: &mut Map<String, Value>, next: Next<'_>| {
                payload.insert("second".to_owned(), json!(true));
                Ok(next.run(name, payload))
            },
        );
        let mut payload = Map::new();
        let output = run(
            &[first, second],
            &[],
            &default_one,
            "tool:post",
            &mut payload,
        );
        assert_eq!(output.events[0].data["first"], true);
        assert_eq!(output.events[0].data["second"], true);
    }

    #[test]
    fn failing_handler_is_skipped_and_reported() {
        let failing: Arc<dyn OverrideHandler> = Arc::new(
            |_name: &str, _payload: &mut Map<String, Value>, _next: Next<'_>| {
                Err(BridgeError::Handler {
                    event: "tool:post".to_owned(),
                    message: "boom".to_owned(),
                })
            },
        );
        let mut payload = Map::new();
        let output = run(&[failing], &[], &default_one, "tool:post", &mut payload);
        // The default still produced the primary event.
        assert_eq!(output.events.len(), 1);
        assert_eq!(output.events[0].event_type, "default:tool:post");
        assert_eq!(output.failures.len(), 1);
    }

    #[test]
    fn handler_failing_after_delegation_keeps_the_delegated_result_once() {
        let failing_late: Arc<dyn OverrideHandler> = Arc::new(
            |name: &str, payload: &mut Map<String, Value>, next: Next<'_>| {
                let _ = next.run(name, payload);
                Err(BridgeError::Handler {
                    event: name.to_owned(),
                    message: "late".to_owned(),
                })
            },
        );
        let mut payload = Map::new();
        let output = run(&[failing_late], &[], &default_one, "tool:pre", &mut payload);
        // The default ran exactly once despite delegation plus recovery.
        assert_eq!(output.events.len(), 1);
        assert_eq!(output.failures.len(), 1);
    }

    #[test]
    fn enrichers_append_in_registration_order() {
        let first: Arc<dyn Enricher> = Arc::new(
            |_name: &str, _payload: &Map<String, Value>, _primary: &[UIEvent]| {
                Ok(vec![UIEvent::new("derived:first", Map::new())])
            },
        );
        let second: Arc<dyn Enricher> = Arc::new(
            |_name: &str, _payload: &Map<String, Value>, primary: &[UIEvent]| {
                assert_eq!(primary.len(), 1);
                Ok(vec![UIEvent::new("derived:second", Map::new())])
            },
        );
        let mut payload = Map::new();
        let output = run(
            &[],
            &[first, second],
            &default_one,
            "tool:post",
            &mut payload,
        );
        let types: Vec<_> = output
            .events
            .iter()
            .map(|event| event.event_type.as_str())
            .collect();
        assert_eq!(
            types,
            vec!["default:tool:post", "derived:first", "derived:second"]
        );
    }

    #[test]
    fn failing_enricher_cannot_suppress_the_primary() {
        let failing: Arc<dyn Enricher> = Arc::new(
            |name: &str, _payload: &Map<String, Value>, _primary: &[UIEvent]| {
                Err(BridgeError::Enricher {
                    event: name.to_owned(),
                    message: "always".to_owned(),
                })
            },
        );
        let ok: Arc<dyn Enricher> = Arc::new(
            |_name: &str, _payload: &Map<String, Value>, _primary: &[UIEvent]| {
                Ok(vec![UIEvent::new("derived", Map::new())])
            },
        );
        let mut payload = Map::new();
        let output = run(&[], &[failing, ok], &default_one, "x", &mut payload);
        // Primary survives, later enricher still ran, failure reported.
        assert_eq!(output.events.len(), 2);
        assert_eq!(output.events[0].event_type, "default:x");
        assert_eq!(output.events[1].event_type, "derived");
        assert_eq!(output.failures.len(), 1);
    }
}
