//! Bridge core: access control, session binding, the run registry, and the
//! inbound pipeline that ties them together.
//!
//! [`Bridge`] is the composition root. Embedders register their wire
//! adapters and agent runtime, then feed inbound messages and agent events:
//!
//! ```text
//! adapter.on_message ──> bridge.handle_inbound(..)
//! agent event stream ──> bridge.run_events(..)
//! ```

mod access;
mod binding;
mod commands;
mod execution;
mod pipeline;
mod registry;

use std::collections::HashMap;
use std::sync::Arc;

use tokio_stream::Stream;

use crate::agent::{AgentEvent, AgentRuntime, ModelStore};
use crate::channels::{
    Adapter, AdapterMap, InboundMessage, OutboundDispatcher, TypingManager,
};
use crate::config::Config;
use crate::error::Result;
use crate::store::{BridgeStore, MemoryStore};
use crate::stream::{
    EditStreamCoordinator, EventRouter, Scheduler, StreamCoordinatorRegistry, TokioScheduler,
};

pub use access::{
    AccessControlService, DENIED_MESSAGE, DENIED_WHATSAPP_MESSAGE, PAIRING_QUEUE_FULL_MESSAGE,
    PAIRING_QUEUE_LIMIT, PAIRING_TTL_SECS,
};
pub use binding::{ResolvedSession, SessionBindingService};
pub use commands::InboundCommandService;
pub use execution::{RunExecutionService, RunInput};
pub use pipeline::InboundPipeline;
pub use registry::{RunState, SessionRunRegistry};

/// Fully wired bridge instance.
pub struct Bridge {
    config: Arc<Config>,
    adapters: Arc<AdapterMap>,
    store: Arc<dyn BridgeStore>,
    registry: Arc<SessionRunRegistry>,
    typing: Arc<TypingManager>,
    pipeline: Arc<InboundPipeline>,
    router: Arc<EventRouter>,
}

impl Bridge {
    pub fn builder(config: Config, agent: Arc<dyn AgentRuntime>) -> BridgeBuilder {
        BridgeBuilder {
            config: Arc::new(config),
            store: Arc::new(MemoryStore::new()),
            agent,
            adapters: HashMap::new(),
            scheduler: Arc::new(TokioScheduler),
        }
    }

    /// Seed the allowlist from config and start every registered adapter.
    ///
    /// A channel that fails to start is logged and skipped; the remaining
    /// channels come up regardless.
    pub async fn start(&self) -> Result<()> {
        for (channel, keys) in &self.config.allowlist {
            for key in keys {
                self.store.allow(*channel, key).await?;
            }
        }

        for (channel, adapter) in self.adapters.iter() {
            match adapter.start().await {
                Ok(()) => tracing::info!(channel = %channel, "channel started"),
                Err(error) => {
                    tracing::error!(channel = %channel, %error, "channel failed to start");
                }
            }
        }
        if self.adapters.is_empty() {
            tracing::warn!("no channel adapters registered, bridge is idle");
        }
        tracing::info!(channels = self.adapters.len(), "bridge started");
        Ok(())
    }

    pub async fn shutdown(&self) {
        for (channel, adapter) in self.adapters.iter() {
            if let Err(error) = adapter.stop().await {
                tracing::warn!(channel = %channel, %error, "channel failed to stop");
            }
        }
        self.typing.stop_all().await;
    }

    /// Feed one inbound message through the pipeline.
    pub async fn handle_inbound(&self, message: InboundMessage) -> Result<()> {
        self.pipeline.handle_inbound(message).await
    }

    /// Inbound handling that waits for the resulting run to finish.
    pub async fn dispatch_inbound(&self, message: InboundMessage) -> Result<()> {
        self.pipeline.dispatch_inbound(message).await
    }

    /// Drain an agent event stream into the stream coordinators.
    pub async fn run_events<S>(&self, events: S)
    where
        S: Stream<Item = AgentEvent> + Unpin,
    {
        self.router.run(events).await;
    }

    pub fn store(&self) -> Arc<dyn BridgeStore> {
        Arc::clone(&self.store)
    }

    pub fn registry(&self) -> Arc<SessionRunRegistry> {
        Arc::clone(&self.registry)
    }
}

pub struct BridgeBuilder {
    config: Arc<Config>,
    store: Arc<dyn BridgeStore>,
    agent: Arc<dyn AgentRuntime>,
    adapters: AdapterMap,
    scheduler: Arc<dyn Scheduler>,
}

impl BridgeBuilder {
    /// Replace the default in-memory store.
    pub fn store(mut self, store: Arc<dyn BridgeStore>) -> Self {
        self.store = store;
        self
    }

    /// Register a wire adapter under its channel name.
    pub fn adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapters.insert(adapter.name(), adapter);
        self
    }

    /// Override the flush scheduler. Tests use this to drive debounced
    /// flushes without real time.
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn build(self) -> Bridge {
        let adapters = Arc::new(self.adapters);
        let outbound = Arc::new(OutboundDispatcher::new(Arc::clone(&adapters)));
        let typing = Arc::new(TypingManager::new(Arc::clone(&adapters)));
        let registry = Arc::new(SessionRunRegistry::new());
        let models = Arc::new(ModelStore::new());

        let mut coordinators = StreamCoordinatorRegistry::new();
        for (channel, adapter) in adapters.iter() {
            if adapter.capabilities().progress {
                coordinators.register(
                    *channel,
                    Arc::new(EditStreamCoordinator::new(
                        *channel,
                        Arc::clone(&adapters),
                        Arc::clone(&registry),
                        self.config.flush_ms,
                        Arc::clone(&self.scheduler),
                    )),
                );
            }
        }
        let coordinators = Arc::new(coordinators);

        let access = Arc::new(AccessControlService::new(
            Arc::clone(&self.config),
            Arc::clone(&self.store),
            Arc::clone(&outbound),
        ));
        let commands = Arc::new(InboundCommandService::new(
            Arc::clone(&self.config),
            Arc::clone(&self.store),
            Arc::clone(&models),
            Arc::clone(&outbound),
        ));
        let binding = Arc::new(SessionBindingService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.agent),
        ));
        let execution = Arc::new(RunExecutionService::new(
            Arc::clone(&self.config),
            models,
            Arc::clone(&self.agent),
            Arc::clone(&registry),
            Arc::clone(&coordinators),
            Arc::clone(&typing),
            Arc::clone(&outbound),
        ));
        let pipeline = Arc::new(InboundPipeline::new(
            outbound,
            Arc::clone(&self.store),
            Arc::clone(&registry),
            access,
            commands,
            binding,
            execution,
        ));
        let router = Arc::new(EventRouter::new(
            Arc::clone(&registry),
            coordinators,
            Arc::clone(&typing),
        ));

        Bridge {
            config: self.config,
            adapters,
            store: self.store,
            registry,
            typing,
            pipeline,
            router,
        }
    }
}
