//! Routes agent events to the active run's stream coordinator.

use std::sync::Arc;

use tokio_stream::{Stream, StreamExt};

use crate::agent::AgentEvent;
use crate::bridge::SessionRunRegistry;
use crate::channels::TypingManager;

use super::StreamCoordinatorRegistry;

pub struct EventRouter {
    registry: Arc<SessionRunRegistry>,
    coordinators: Arc<StreamCoordinatorRegistry>,
    typing: Arc<TypingManager>,
}

impl EventRouter {
    pub fn new(
        registry: Arc<SessionRunRegistry>,
        coordinators: Arc<StreamCoordinatorRegistry>,
        typing: Arc<TypingManager>,
    ) -> Self {
        Self {
            registry,
            coordinators,
            typing,
        }
    }

    /// Drain the event stream until it ends. Events for sessions without an
    /// active run are dropped, except idle which still stops typing.
    pub async fn run<S>(&self, mut events: S)
    where
        S: Stream<Item = AgentEvent> + Unpin,
    {
        while let Some(event) = events.next().await {
            self.route(event).await;
        }
        tracing::debug!("agent event stream ended");
    }

    pub async fn route(&self, event: AgentEvent) {
        match event {
            AgentEvent::MessageUpdated {
                session_id,
                message_id,
                role,
            } => {
                let Some(run) = self.registry.get(&session_id) else {
                    return;
                };
                self.coordinators
                    .get(run.channel)
                    .on_message_updated(&session_id, &message_id, role)
                    .await;
            }
            AgentEvent::MessagePartUpdated { part, delta } => {
                let Some(run) = self.registry.get(&part.session_id) else {
                    return;
                };
                self.coordinators
                    .get(run.channel)
                    .on_message_part_updated(&part, delta.as_deref())
                    .await;
            }
            AgentEvent::MessagePartDelta {
                session_id,
                message_id,
                part_id,
                delta,
            } => {
                let Some(run) = self.registry.get(&session_id) else {
                    return;
                };
                self.coordinators
                    .get(run.channel)
                    .on_message_part_delta(&session_id, &message_id, &part_id, &delta)
                    .await;
            }
            AgentEvent::SessionIdle { session_id } => {
                let Some(run) = self.registry.get(&session_id) else {
                    self.typing.stop(&session_id).await;
                    return;
                };
                self.coordinators
                    .get(run.channel)
                    .on_session_idle(&session_id)
                    .await;
                self.typing.stop(&session_id).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::agent::{MessageRole, PartSnapshot};
    use crate::channels::{AdapterMap, ChannelName};
    use crate::stream::StreamCoordinator;

    #[derive(Default)]
    struct SpyCoordinator {
        seen: Mutex<Vec<String>>,
    }

    impl SpyCoordinator {
        fn record(&self, what: &str) {
            self.seen.lock().unwrap().push(what.to_string());
        }
    }

    #[async_trait]
    impl StreamCoordinator for SpyCoordinator {
        async fn on_message_updated(&self, _: &str, _: &str, _: MessageRole) {
            self.record("updated");
        }

        async fn on_message_part_updated(&self, _: &PartSnapshot, _: Option<&str>) {
            self.record("part");
        }

        async fn on_message_part_delta(&self, _: &str, _: &str, _: &str, _: &str) {
            self.record("delta");
        }

        async fn on_session_idle(&self, _: &str) {
            self.record("idle");
        }

        async fn finalize_reply(&self, _: &str, _: &str, _: &str) -> bool {
            false
        }

        async fn has_streamed_message(&self, _: &str) -> bool {
            false
        }

        async fn clear_session(&self, _: &str) {}
    }

    fn router_with_spy() -> (EventRouter, Arc<SessionRunRegistry>, Arc<SpyCoordinator>) {
        let spy = Arc::new(SpyCoordinator::default());
        let mut coordinators = StreamCoordinatorRegistry::new();
        coordinators.register(ChannelName::Telegram, spy.clone());
        let registry = Arc::new(SessionRunRegistry::new());
        let adapters: Arc<AdapterMap> = Arc::new(HashMap::new());
        let router = EventRouter::new(
            registry.clone(),
            Arc::new(coordinators),
            Arc::new(TypingManager::new(adapters)),
        );
        (router, registry, spy)
    }

    #[tokio::test]
    async fn test_events_reach_active_runs_coordinator() {
        let (router, registry, spy) = router_with_spy();
        registry.begin("s1", ChannelName::Telegram, "peer-1");

        router
            .route(AgentEvent::MessageUpdated {
                session_id: "s1".to_string(),
                message_id: "m1".to_string(),
                role: MessageRole::Assistant,
            })
            .await;
        router
            .route(AgentEvent::SessionIdle {
                session_id: "s1".to_string(),
            })
            .await;

        assert_eq!(
            spy.seen.lock().unwrap().clone(),
            vec!["updated".to_string(), "idle".to_string()]
        );
    }

    #[tokio::test]
    async fn test_events_for_unknown_sessions_are_dropped() {
        let (router, _registry, spy) = router_with_spy();
        router
            .route(AgentEvent::MessagePartDelta {
                session_id: "ghost".to_string(),
                message_id: "m1".to_string(),
                part_id: "p1".to_string(),
                delta: "text".to_string(),
            })
            .await;
        assert!(spy.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_drains_stream_in_order() {
        let (router, registry, spy) = router_with_spy();
        registry.begin("s1", ChannelName::Telegram, "peer-1");

        let events = tokio_stream::iter(vec![
            AgentEvent::MessagePartDelta {
                session_id: "s1".to_string(),
                message_id: "m1".to_string(),
                part_id: "p1".to_string(),
                delta: "a".to_string(),
            },
            AgentEvent::SessionIdle {
                session_id: "s1".to_string(),
            },
        ]);
        router.run(events).await;

        assert_eq!(
            spy.seen.lock().unwrap().clone(),
            vec!["delta".to_string(), "idle".to_string()]
        );
    }
}
