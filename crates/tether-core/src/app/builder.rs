//! EngineBuilder - engine の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 設定値は build() 時に検証（ゼロの lease_timeout などを起動時に弾く）
//! - TaskStore / WorkerRegistry が未設定なら BuildError
//! - Clock / EventSink / Decider は省略可（SystemClock / TracingEventSink / RetryBudgetDecider）

use std::sync::Arc;

use crate::config::{ConfigError, EngineConfig, WorkerConfig};
use crate::domain::{Decider, RetryBudgetDecider, WorkerId};
use crate::impls::{InMemoryTaskStore, InMemoryWorkerRegistry, TracingEventSink};
use crate::ports::{Clock, EventSink, IdGenerator, SystemClock, TaskStore, UlidGenerator, WorkerRegistry};

use super::fleet::FleetRegistry;
use super::gateway::WorkerGateway;
use super::janitor::Janitor;
use super::queue_service::QueueService;
use super::worker_loop::{TaskProcessor, WorkerLoop};

/// BuildError は engine 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("no task store configured")]
    MissingTaskStore,

    #[error("no worker registry configured")]
    MissingWorkerRegistry,
}

/// EngineBuilder は Engine を構築
///
/// # 使用例
/// ```ignore
/// let engine = EngineBuilder::new()
///     .task_store(store.clone())
///     .worker_registry(store)
///     .config(EngineConfig::default().with_max_retries(3))
///     .build()?;
/// ```
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn TaskStore>>,
    registry: Option<Arc<dyn WorkerRegistry>>,
    clock: Option<Arc<dyn Clock>>,
    events: Option<Arc<dyn EventSink>>,
    decider: Option<Arc<dyn Decider>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// In-process stores (tests, demo).
    pub fn in_memory() -> Self {
        Self::new()
            .task_store(Arc::new(InMemoryTaskStore::new()))
            .worker_registry(Arc::new(InMemoryWorkerRegistry::new()))
    }

    /// One SQLite file backing both the task store and the registry.
    #[cfg(feature = "sqlite")]
    pub fn sqlite(store: crate::impls::SqliteStore) -> Self {
        let store = Arc::new(store);
        Self::new()
            .task_store(store.clone())
            .worker_registry(store)
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn worker_registry(mut self, registry: Arc<dyn WorkerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Replaces the retry-budget policy built from `max_retries`.
    pub fn decider(mut self, decider: Arc<dyn Decider>) -> Self {
        self.decider = Some(decider);
        self
    }

    pub fn build(self) -> Result<Engine, BuildError> {
        self.config.validate()?;
        let store = self.store.ok_or(BuildError::MissingTaskStore)?;
        let registry = self.registry.ok_or(BuildError::MissingWorkerRegistry)?;

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        let events: Arc<dyn EventSink> = self.events.unwrap_or_else(|| Arc::new(TracingEventSink));
        let decider: Arc<dyn Decider> = self
            .decider
            .unwrap_or_else(|| Arc::new(RetryBudgetDecider::new(self.config.max_retries)));

        let queue = Arc::new(QueueService::new(
            store,
            Arc::clone(&clock),
            Arc::clone(&ids),
            events,
            decider,
            self.config.lease_timeout,
        ));
        let fleet = Arc::new(FleetRegistry::new(registry, Arc::clone(&clock), ids));

        Ok(Engine {
            config: self.config,
            clock,
            queue,
            fleet,
        })
    }
}

/// Engine は構築済みのサービス一式
pub struct Engine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    queue: Arc<QueueService>,
    fleet: Arc<FleetRegistry>,
}

impl Engine {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Producer / operator interface.
    pub fn queue(&self) -> &Arc<QueueService> {
        &self.queue
    }

    pub fn fleet(&self) -> &Arc<FleetRegistry> {
        &self.fleet
    }

    /// Authenticated worker interface.
    pub fn gateway(&self) -> WorkerGateway {
        WorkerGateway::new(Arc::clone(&self.queue), Arc::clone(&self.fleet))
    }

    pub fn janitor(&self) -> Janitor {
        Janitor::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.clock),
            self.config.sweep_interval,
            self.config.error_backoff,
        )
    }

    pub fn worker_loop(
        &self,
        worker_id: WorkerId,
        processor: Arc<dyn TaskProcessor>,
        config: WorkerConfig,
    ) -> WorkerLoop {
        WorkerLoop::new(self.gateway(), processor, worker_id, config)
    }
}
