use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use super::{state::RunState, supervisor::Supervisor};
use crate::{
    config::Config,
    events::Bus,
    hardware::Hardware,
    services::{DeviceCache, Service},
    strategy::Resolver,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Supervisor`] with optional collaborators.
pub struct SupervisorBuilder {
    cfg: Config,
    hardware: Arc<dyn Hardware>,
    cache: Arc<dyn DeviceCache>,
    resolver: Arc<dyn Resolver>,
    register: Option<Arc<dyn Service>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the required collaborators.
    pub fn new(
        cfg: Config,
        hardware: Arc<dyn Hardware>,
        cache: Arc<dyn DeviceCache>,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        Self {
            cfg,
            hardware,
            cache,
            resolver,
            register: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the device register, started after the cache and stopped before it.
    pub fn with_register(mut self, register: Arc<dyn Service>) -> Self {
        self.register = Some(register);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor and starts its subscriber workers.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Supervisor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let stop = CancellationToken::new();
        let listener = Supervisor::subscriber_listener(&bus, subs, stop.clone());
        let (state, _) = watch::channel(RunState::Initializing);

        Supervisor {
            cfg: self.cfg,
            bus,
            hardware: self.hardware,
            cache: self.cache,
            register: self.register,
            resolver: self.resolver,
            state,
            listener: Mutex::new(Some(listener)),
            stop,
        }
    }
}
