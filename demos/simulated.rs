//! # Example: simulated
//!
//! Runs the supervisor against simulated hardware, a simulated device cache and
//! simulated plugin endpoints.
//!
//! Shows how to:
//! - Parse [`CliArgs`] and apply per-node overrides.
//! - Register strategy builders in a [`StrategyTable`].
//! - Attach the built-in [`LogWriter`] through `tracing-subscriber`.
//!
//! ## Flow
//! ```text
//! CliArgs ──► Config ──► Supervisor::run()
//!     ├─► SimHardware.init()
//!     ├─► SimCache.start()
//!     ├─► StrategyTable.resolve("none" | "single" | "mixed")
//!     ├─► SimPlugin.start()   (the first registration of "vgpu-memory" fails)
//!     └─► touch <plugin-dir>/kubelet.sock  ─► restart
//!         kill -HUP                        ─► restart
//!         Ctrl-C                           ─► drain and exit
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example simulated -- --plugin-dir /tmp/device-plugins --mig-strategy single
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vgpu_supervisor::{
    CliArgs, Device, DeviceCache, DeviceSettings, Hardware, HardwareError, LogWriter,
    MigStrategy, NodeOverrides, Plugin, PluginError, PluginRef, PluginSet, ResolveError,
    Service, StrategyTable, Subscribe, Supervisor,
};

/// Pretends to load the device-access library.
struct SimHardware;

impl Hardware for SimHardware {
    fn init(&self) -> Result<(), HardwareError> {
        tracing::info!("simulated driver loaded");
        Ok(())
    }

    fn shutdown(&self) -> Result<(), HardwareError> {
        Ok(())
    }
}

/// Fixed set of physical devices, "refreshed" in the background.
struct SimCache {
    devices: Vec<Device>,
    running: AtomicBool,
}

#[async_trait]
impl Service for SimCache {
    fn name(&self) -> &str {
        "device-cache"
    }

    async fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl DeviceCache for SimCache {
    fn devices(&self) -> Vec<Device> {
        self.devices.clone()
    }
}

/// Endpoint whose first `flaky` registrations fail.
struct SimPlugin {
    name: String,
    devices: Vec<Device>,
    flaky: AtomicUsize,
}

impl SimPlugin {
    fn arc(name: &str, devices: Vec<Device>, flaky: usize) -> PluginRef {
        Arc::new(Self {
            name: name.to_string(),
            devices,
            flaky: AtomicUsize::new(flaky),
        })
    }
}

#[async_trait]
impl Plugin for SimPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn devices(&self) -> Vec<Device> {
        self.devices.clone()
    }

    async fn start(&self) -> Result<(), PluginError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let flaky = self
            .flaky
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if flaky {
            return Err(PluginError::registration("connection refused"));
        }
        Ok(())
    }

    async fn stop(&self) {}
}

/// Virtual slots: `split_count` per physical device.
fn slots(settings: &DeviceSettings, cache: &dyn DeviceCache) -> Vec<Device> {
    cache
        .devices()
        .iter()
        .flat_map(|d| (0..settings.split_count).map(move |i| Device::new(format!("{}-{i}", d.id))))
        .collect()
}

fn strategies() -> StrategyTable {
    let memory = Arc::new(AtomicUsize::new(1));
    let (single, mixed) = (Arc::clone(&memory), memory);

    StrategyTable::new()
        .with(MigStrategy::None, |settings, cache| {
            Ok(PluginSet::new(vec![SimPlugin::arc(
                "volcano.sh/vgpu-number",
                slots(settings, cache),
                0,
            )]))
        })
        .with(MigStrategy::Single, move |settings, cache| {
            let flaky = single.swap(0, Ordering::SeqCst);
            Ok(PluginSet::new(vec![
                SimPlugin::arc("volcano.sh/vgpu-number", slots(settings, cache), 0),
                SimPlugin::arc("volcano.sh/vgpu-memory", slots(settings, cache), flaky),
                SimPlugin::arc("volcano.sh/vgpu-cores", Vec::new(), 0),
            ]))
        })
        .with(MigStrategy::Mixed, move |settings, cache| {
            if settings.split_count == 0 {
                return Err(ResolveError::Build {
                    strategy: MigStrategy::Mixed.as_str().to_string(),
                    error: "split count must be positive".to_string(),
                });
            }
            let flaky = mixed.swap(0, Ordering::SeqCst);
            let plugins = cache
                .devices()
                .into_iter()
                .enumerate()
                .map(|(i, d)| {
                    SimPlugin::arc(
                        &format!("volcano.sh/mig-{i}"),
                        vec![d],
                        if i == 0 { flaky } else { 0 },
                    )
                })
                .collect();
            Ok(PluginSet::new(plugins))
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = CliArgs::parse();
    let overrides_path = args.node_config.clone();
    let mut cfg = args.into_config();

    if let Some(path) = overrides_path {
        if let Some(overrides) = NodeOverrides::load(&path)? {
            if cfg.apply_node_overrides(&overrides) {
                tracing::info!(node = %cfg.device.node_name, "applied node overrides");
            }
        }
    }

    std::fs::create_dir_all(&cfg.plugin_dir)
        .with_context(|| format!("creating {}", cfg.plugin_dir.display()))?;

    let cache = SimCache {
        devices: (0..2).map(|i| Device::new(format!("GPU-{i}"))).collect(),
        running: AtomicBool::new(false),
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let sup = Supervisor::builder(
        cfg,
        Arc::new(SimHardware),
        Arc::new(cache),
        Arc::new(strategies()),
    )
    .with_subscribers(subs)
    .build();

    sup.run().await?;
    Ok(())
}
