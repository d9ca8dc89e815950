use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time;

use super::{RunState, Supervisor};
use crate::{
    config::{Config, DeviceSettings, NodeConfig, NodeOverrides},
    error::{HardwareError, PluginError, ResolveError, RuntimeError, WatchError},
    events::{Event, EventKind},
    hardware::Hardware,
    plugins::{Device, Plugin, PluginSet},
    policies::BackoffPolicy,
    services::{DeviceCache, Service},
    strategy::{Resolver, StrategyName},
    subscribers::Subscribe,
    watch::{FsEvent, FsOp, FsWatcher, Signal, SignalWatcher},
};

type Journal = Arc<Mutex<Vec<String>>>;

fn note(journal: &Journal, entry: impl Into<String>) {
    journal.lock().unwrap().push(entry.into());
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

struct MockPlugin {
    name: String,
    devices: usize,
    failures: AtomicUsize,
    hangs: AtomicUsize,
    journal: Journal,
}

impl MockPlugin {
    fn new(name: &str, devices: usize, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            devices,
            failures: AtomicUsize::new(0),
            hangs: AtomicUsize::new(0),
            journal: Arc::clone(journal),
        }
    }

    /// The next `n` starts fail.
    fn failing(self, n: usize) -> Self {
        self.failures.store(n, Ordering::SeqCst);
        self
    }

    /// The next `n` starts never return.
    fn hanging(self, n: usize) -> Self {
        self.hangs.store(n, Ordering::SeqCst);
        self
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl Plugin for MockPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn devices(&self) -> Vec<Device> {
        (0..self.devices)
            .map(|i| Device::new(format!("{}-{i}", self.name)))
            .collect()
    }

    async fn start(&self) -> Result<(), PluginError> {
        note(&self.journal, format!("start:{}", self.name));
        if take_one(&self.hangs) {
            std::future::pending::<()>().await;
        }
        if take_one(&self.failures) {
            return Err(PluginError::registration("connection refused"));
        }
        Ok(())
    }

    async fn stop(&self) {
        note(&self.journal, format!("stop:{}", self.name));
    }
}

struct MockResolver {
    plugins: Vec<Arc<MockPlugin>>,
    broken: bool,
    journal: Journal,
    splits: Arc<Mutex<Vec<u32>>>,
}

impl Resolver for MockResolver {
    fn resolve(
        &self,
        strategy: &StrategyName,
        settings: &DeviceSettings,
        _cache: &dyn DeviceCache,
    ) -> Result<PluginSet, ResolveError> {
        note(&self.journal, "resolve");
        self.splits.lock().unwrap().push(settings.split_count);
        if self.broken {
            return Err(ResolveError::UnknownStrategy {
                name: strategy.as_str().to_string(),
            });
        }
        Ok(self
            .plugins
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn Plugin>)
            .collect())
    }
}

struct MockService {
    name: &'static str,
    journal: Journal,
}

#[async_trait]
impl Service for MockService {
    fn name(&self) -> &str {
        self.name
    }

    async fn start(&self) {
        note(&self.journal, format!("{}:start", self.name));
    }

    async fn stop(&self) {
        note(&self.journal, format!("{}:stop", self.name));
    }
}

impl DeviceCache for MockService {
    fn devices(&self) -> Vec<Device> {
        Vec::new()
    }
}

struct MockHardware {
    broken: bool,
    journal: Journal,
}

impl Hardware for MockHardware {
    fn init(&self) -> Result<(), HardwareError> {
        note(&self.journal, "hw:init");
        if self.broken {
            return Err(HardwareError::new("ERROR_LIBRARY_NOT_FOUND"));
        }
        Ok(())
    }

    fn shutdown(&self) -> Result<(), HardwareError> {
        note(&self.journal, "hw:shutdown");
        Ok(())
    }
}

/// Records the kind of every event it is handed.
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<EventKind>>,
}

impl Recorder {
    fn count(&self, kind: EventKind) -> usize {
        self.seen.lock().unwrap().iter().filter(|k| **k == kind).count()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.seen.lock().unwrap().push(event.kind);
    }
    fn name(&self) -> &'static str {
        "recorder"
    }
}

struct Exploding;

#[async_trait]
impl Subscribe for Exploding {
    async fn on_event(&self, _event: &Event) {
        panic!("boom");
    }
    fn name(&self) -> &'static str {
        "exploding"
    }
}

struct Harness {
    journal: Journal,
    splits: Arc<Mutex<Vec<u32>>>,
    events: broadcast::Receiver<Event>,
    fs_tx: mpsc::UnboundedSender<FsEvent>,
    err_tx: mpsc::UnboundedSender<WatchError>,
    sig_tx: mpsc::UnboundedSender<Signal>,
    socket: PathBuf,
    state: tokio::sync::watch::Receiver<RunState>,
    run: JoinHandle<Result<(), RuntimeError>>,
}

fn test_config() -> Config {
    Config {
        plugin_dir: PathBuf::from("/plugins"),
        restart_backoff: BackoffPolicy::immediate(),
        ..Config::default()
    }
}

fn harness(
    cfg: Config,
    plugins: impl FnOnce(&Journal) -> Vec<MockPlugin>,
    broken_resolver: bool,
    broken_hardware: bool,
) -> Harness {
    harness_with(cfg, plugins, broken_resolver, broken_hardware, Vec::new())
}

/// Builds a supervisor over the mock collaborators.
fn supervisor(
    cfg: Config,
    plugins: impl FnOnce(&Journal) -> Vec<MockPlugin>,
    broken_resolver: bool,
    broken_hardware: bool,
    subs: Vec<Arc<dyn Subscribe>>,
) -> (Supervisor, Journal, Arc<Mutex<Vec<u32>>>) {
    let journal: Journal = Arc::default();
    let splits: Arc<Mutex<Vec<u32>>> = Arc::default();
    let resolver = MockResolver {
        plugins: plugins(&journal).into_iter().map(Arc::new).collect(),
        broken: broken_resolver,
        journal: Arc::clone(&journal),
        splits: Arc::clone(&splits),
    };
    let hardware = MockHardware {
        broken: broken_hardware,
        journal: Arc::clone(&journal),
    };
    let cache = MockService {
        name: "cache",
        journal: Arc::clone(&journal),
    };
    let register = MockService {
        name: "register",
        journal: Arc::clone(&journal),
    };

    let sup = Supervisor::builder(cfg, Arc::new(hardware), Arc::new(cache), Arc::new(resolver))
        .with_register(Arc::new(register))
        .with_subscribers(subs)
        .build();
    (sup, journal, splits)
}

fn harness_with(
    cfg: Config,
    plugins: impl FnOnce(&Journal) -> Vec<MockPlugin>,
    broken_resolver: bool,
    broken_hardware: bool,
    subs: Vec<Arc<dyn Subscribe>>,
) -> Harness {
    let socket = cfg.agent_socket_path();
    let dir = cfg.plugin_dir.clone();
    let (sup, journal, splits) =
        supervisor(cfg, plugins, broken_resolver, broken_hardware, subs);

    let (fs_tx, fs_rx) = mpsc::unbounded_channel();
    let (err_tx, err_rx) = mpsc::unbounded_channel();
    let (sig_tx, sig_rx) = mpsc::unbounded_channel();
    let fs = FsWatcher::from_channels(dir, fs_rx, err_rx);
    let signals = SignalWatcher::from_channel(sig_rx);

    let events = sup.subscribe();
    let state = sup.state();
    let run = tokio::spawn(async move { sup.run_with(fs, signals).await });

    Harness {
        journal,
        splits,
        events,
        fs_tx,
        err_tx,
        sig_tx,
        socket,
        state,
        run,
    }
}

async fn serving(events: &mut broadcast::Receiver<Event>, cycle: u64) {
    loop {
        match events.recv().await {
            Ok(e)
                if e.kind == EventKind::StateChanged
                    && e.state == Some(RunState::Serving)
                    && e.cycle == Some(cycle) =>
            {
                return
            }
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
        }
    }
}

impl Harness {
    async fn wait_for(&mut self, pred: impl Fn(&Event) -> bool) -> Event {
        loop {
            match self.events.recv().await {
                Ok(ev) if pred(&ev) => return ev,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    }

    /// Events published so far that no `wait_for` consumed.
    fn drain_events(&mut self) -> Vec<Event> {
        let mut out = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(ev) => out.push(ev),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return out,
            }
        }
    }

    async fn serving(&mut self, cycle: u64) {
        serving(&mut self.events, cycle).await;
    }

    fn signal(&self, sig: Signal) {
        self.sig_tx.send(sig).unwrap();
    }

    fn fs(&self, path: PathBuf, op: FsOp) {
        self.fs_tx.send(FsEvent { path, op }).unwrap();
    }

    async fn terminate(self) -> (Result<(), RuntimeError>, Vec<String>) {
        self.signal(Signal::Terminate);
        self.finish().await
    }

    async fn finish(self) -> (Result<(), RuntimeError>, Vec<String>) {
        let res = self.run.await.unwrap();
        (res, entries(&self.journal))
    }
}

fn expected(steps: &[&str]) -> Vec<String> {
    steps.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn skips_plugins_without_devices_and_tears_down_in_order() {
    let mut h = harness(
        test_config(),
        |j| {
            vec![
                MockPlugin::new("a", 2, j),
                MockPlugin::new("b", 0, j),
                MockPlugin::new("c", 1, j),
            ]
        },
        false,
        false,
    );
    h.serving(1).await;
    let state = h.state.clone();

    let (res, journal) = h.terminate().await;
    assert!(res.is_ok());
    assert_eq!(
        journal,
        expected(&[
            "hw:init",
            "cache:start",
            "register:start",
            "resolve",
            "start:a",
            "start:c",
            "stop:a",
            "stop:b",
            "stop:c",
            "register:stop",
            "cache:stop",
            "hw:shutdown",
        ])
    );
    assert_eq!(*state.borrow(), RunState::Draining);
}

#[tokio::test]
async fn first_failure_abandons_the_pass_and_restarts() {
    let mut h = harness(
        test_config(),
        |j| {
            vec![
                MockPlugin::new("a", 1, j),
                MockPlugin::new("b", 1, j).failing(1),
                MockPlugin::new("c", 1, j),
            ]
        },
        false,
        false,
    );
    h.serving(2).await;

    let (res, journal) = h.terminate().await;
    assert!(res.is_ok());
    assert_eq!(
        journal,
        expected(&[
            "hw:init",
            "cache:start",
            "register:start",
            "resolve",
            "start:a",
            "start:b",
            "stop:a",
            "stop:b",
            "stop:c",
            "resolve",
            "start:a",
            "start:b",
            "start:c",
            "stop:a",
            "stop:b",
            "stop:c",
            "register:stop",
            "cache:stop",
            "hw:shutdown",
        ])
    );
}

#[tokio::test]
async fn unrelated_fs_events_and_watch_errors_do_not_restart() {
    let mut h = harness(
        test_config(),
        |j| vec![MockPlugin::new("a", 1, j)],
        false,
        false,
    );
    h.serving(1).await;

    h.fs(h.socket.clone(), FsOp::Write);
    h.fs(h.socket.clone(), FsOp::Remove);
    h.fs(PathBuf::from("/plugins/other.sock"), FsOp::Create);
    h.err_tx
        .send(WatchError(notify::Error::generic("queue overflow")))
        .unwrap();

    let ev = h.wait_for(|e| e.kind == EventKind::WatchError).await;
    assert_eq!(ev.reason.as_deref(), Some("inotify: queue overflow"));

    let (res, journal) = h.terminate().await;
    assert!(res.is_ok());
    assert_eq!(journal.iter().filter(|e| *e == "resolve").count(), 1);
}

#[tokio::test]
async fn reload_and_agent_restart_produce_the_same_cycle() {
    async fn restart_with(trigger: impl FnOnce(&Harness)) -> Vec<String> {
        let mut h = harness(
            test_config(),
            |j| vec![MockPlugin::new("a", 1, j), MockPlugin::new("b", 1, j)],
            false,
            false,
        );
        h.serving(1).await;
        trigger(&h);
        h.serving(2).await;
        let (res, journal) = h.terminate().await;
        assert!(res.is_ok());
        journal
    }

    let reload = restart_with(|h| h.signal(Signal::Hangup)).await;
    let agent = restart_with(|h| h.fs(h.socket.clone(), FsOp::Create)).await;

    assert_eq!(reload, agent);
    assert_eq!(reload.iter().filter(|e| *e == "resolve").count(), 2);
}

#[tokio::test]
async fn resolver_error_is_fatal_and_releases_hardware_once() {
    let mut cfg = test_config();
    cfg.strategy = StrategyName::new("triple");
    let h = harness(cfg, |_| Vec::new(), true, false);

    let (res, journal) = h.finish().await;
    assert!(matches!(res, Err(RuntimeError::Resolve(_))));
    assert_eq!(
        journal,
        expected(&[
            "hw:init",
            "cache:start",
            "register:start",
            "resolve",
            "register:stop",
            "cache:stop",
            "hw:shutdown",
        ])
    );
}

#[tokio::test]
async fn init_failure_fails_fast() {
    let mut h = harness(test_config(), |_| Vec::new(), false, true);

    let ev = h.wait_for(|e| e.kind == EventKind::HardwareInitFailed).await;
    assert_eq!(ev.reason.as_deref(), Some("ERROR_LIBRARY_NOT_FOUND"));

    let (res, journal) = h.finish().await;
    assert!(matches!(res, Err(RuntimeError::HardwareInit(_))));
    assert_eq!(journal, expected(&["hw:init"]));
}

#[tokio::test(start_paused = true)]
async fn init_failure_without_fail_fast_blocks() {
    let mut cfg = test_config();
    cfg.fail_on_init_error = false;
    let mut h = harness(cfg, |_| Vec::new(), false, true);

    h.wait_for(|e| e.kind == EventKind::HardwareInitFailed).await;
    time::sleep(Duration::from_secs(3600)).await;

    assert!(!h.run.is_finished());
    assert_eq!(entries(&h.journal), expected(&["hw:init"]));
    h.run.abort();
}

#[tokio::test(start_paused = true)]
async fn failing_cycles_back_off() {
    let mut cfg = test_config();
    cfg.restart_backoff = BackoffPolicy {
        first: Duration::from_millis(100),
        max: Duration::from_secs(30),
        factor: 2.0,
    };
    let mut h = harness(
        cfg,
        |j| vec![MockPlugin::new("a", 1, j).failing(2)],
        false,
        false,
    );

    let first = h.wait_for(|e| e.kind == EventKind::RestartDelayed).await;
    assert_eq!((first.cycle, first.delay_ms), (Some(1), Some(100)));
    let second = h.wait_for(|e| e.kind == EventKind::RestartDelayed).await;
    assert_eq!((second.cycle, second.delay_ms), (Some(2), Some(200)));

    h.wait_for(|e| e.kind == EventKind::PluginStarted && e.cycle == Some(3))
        .await;
    h.serving(3).await;

    let (res, journal) = h.terminate().await;
    assert!(res.is_ok());
    assert_eq!(journal.iter().filter(|e| *e == "start:a").count(), 3);
}

#[tokio::test(start_paused = true)]
async fn hung_start_times_out_and_restarts() {
    let mut cfg = test_config();
    cfg.start_timeout = Duration::from_millis(50);
    let mut h = harness(
        cfg,
        |j| vec![MockPlugin::new("a", 1, j).hanging(1)],
        false,
        false,
    );

    let timed_out = h.wait_for(|e| e.kind == EventKind::StartTimedOut).await;
    assert_eq!(timed_out.plugin.as_deref(), Some("a"));
    assert_eq!(timed_out.timeout_ms, Some(50));

    let failed = h.wait_for(|e| e.kind == EventKind::PluginStartFailed).await;
    assert_eq!(failed.cycle, Some(1));

    h.wait_for(|e| e.kind == EventKind::PluginStarted).await;
    h.serving(2).await;

    let (res, _) = h.terminate().await;
    assert!(res.is_ok());
}

#[tokio::test(start_paused = true)]
async fn fatal_signal_interrupts_pending_backoff() {
    let mut cfg = test_config();
    cfg.restart_backoff = BackoffPolicy {
        first: Duration::from_secs(3600),
        max: Duration::from_secs(3600),
        factor: 1.0,
    };
    let mut h = harness(
        cfg,
        |j| vec![MockPlugin::new("a", 1, j).failing(usize::MAX)],
        false,
        false,
    );
    h.serving(1).await;

    h.signal(Signal::Interrupt);
    let (res, journal) = time::timeout(Duration::from_secs(1), h.finish())
        .await
        .expect("drained before backoff elapsed");

    assert!(res.is_ok());
    assert_eq!(journal.iter().filter(|e| *e == "resolve").count(), 1);
}

#[tokio::test]
async fn empty_plugin_set_keeps_serving() {
    let mut h = harness(test_config(), |_| Vec::new(), false, false);

    let ev = h.wait_for(|e| e.kind == EventKind::NoDevices).await;
    assert_eq!(ev.cycle, Some(1));
    h.serving(1).await;

    let (res, journal) = h.terminate().await;
    assert!(res.is_ok());
    assert_eq!(
        journal,
        expected(&[
            "hw:init",
            "cache:start",
            "register:start",
            "resolve",
            "register:stop",
            "cache:stop",
            "hw:shutdown",
        ])
    );
}

#[tokio::test]
async fn nothing_restarts_after_a_fatal_signal() {
    let mut h = harness(
        test_config(),
        |j| vec![MockPlugin::new("a", 1, j)],
        false,
        false,
    );
    h.serving(1).await;

    h.signal(Signal::Terminate);
    h.signal(Signal::Hangup);
    h.fs(h.socket.clone(), FsOp::Create);
    let res = (&mut h.run).await.unwrap();
    assert!(res.is_ok());

    let kinds: Vec<EventKind> = h.drain_events().iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&EventKind::ShutdownRequested));
    assert!(!kinds.contains(&EventKind::ReloadRequested));
    assert!(!kinds.contains(&EventKind::AgentRestartDetected));
    assert_eq!(entries(&h.journal).iter().filter(|e| *e == "resolve").count(), 1);
}

#[tokio::test]
async fn subscribers_have_seen_teardown_when_run_returns() {
    let rec = Arc::new(Recorder::default());
    let mut h = harness_with(
        test_config(),
        |j| vec![MockPlugin::new("a", 1, j)],
        false,
        false,
        vec![rec.clone()],
    );
    h.serving(1).await;

    let (res, _) = h.terminate().await;
    assert!(res.is_ok());
    assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
    assert_eq!(rec.count(EventKind::PluginStopped), 1);
    assert_eq!(rec.count(EventKind::HardwareShutdown), 1);
}

#[tokio::test]
async fn subscribers_have_seen_init_failure_when_run_fails_fast() {
    let rec = Arc::new(Recorder::default());
    let h = harness_with(
        test_config(),
        |_| Vec::new(),
        false,
        true,
        vec![rec.clone()],
    );

    let (res, _) = h.finish().await;
    assert!(matches!(res, Err(RuntimeError::HardwareInit(_))));
    assert_eq!(rec.count(EventKind::HardwareInitFailed), 1);
}

#[tokio::test]
async fn panicking_subscriber_reports_once_per_event() {
    let rec = Arc::new(Recorder::default());
    let mut h = harness_with(
        test_config(),
        |j| vec![MockPlugin::new("a", 1, j)],
        false,
        false,
        vec![Arc::new(Exploding), rec.clone()],
    );
    h.wait_for(|e| e.kind == EventKind::SubscriberPanicked).await;
    h.serving(1).await;

    let (res, _) = h.terminate().await;
    assert!(res.is_ok());

    let seen = rec.seen.lock().unwrap().clone();
    let panics = seen
        .iter()
        .filter(|k| **k == EventKind::SubscriberPanicked)
        .count();
    let triggering = seen
        .iter()
        .filter(|k| !matches!(k, EventKind::SubscriberPanicked | EventKind::SubscriberOverflow))
        .count();
    assert!(panics >= 1);
    assert!(panics <= triggering, "{panics} panic reports for {triggering} events");
}

#[tokio::test]
async fn resolver_sees_device_settings_after_node_overrides() {
    let mut cfg = test_config();
    cfg.device.node_name = "node-a".to_string();
    let overrides = NodeOverrides {
        nodes: vec![NodeConfig {
            name: "node-a".to_string(),
            device_memory_scaling: None,
            device_split_count: Some(4),
            mig_strategy: None,
        }],
    };
    assert!(cfg.apply_node_overrides(&overrides));

    let mut h = harness(cfg, |j| vec![MockPlugin::new("a", 1, j)], false, false);
    h.serving(1).await;
    h.signal(Signal::Hangup);
    h.serving(2).await;

    let splits = Arc::clone(&h.splits);
    let (res, _) = h.terminate().await;
    assert!(res.is_ok());
    assert_eq!(*splits.lock().unwrap(), vec![4, 4]);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn run_restarts_when_the_agent_socket_appears() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config {
        plugin_dir: dir.path().to_path_buf(),
        ..test_config()
    };
    let socket = cfg.agent_socket_path();
    let (sup, journal, _) = supervisor(
        cfg,
        |j| vec![MockPlugin::new("a", 1, j)],
        false,
        false,
        Vec::new(),
    );
    let mut events = sup.subscribe();
    let run = tokio::spawn(async move { sup.run().await });

    time::timeout(Duration::from_secs(5), serving(&mut events, 1))
        .await
        .expect("first cycle serving");
    std::fs::write(&socket, b"").unwrap();
    time::timeout(Duration::from_secs(5), serving(&mut events, 2))
        .await
        .expect("agent socket creation restarts the set");

    assert_eq!(entries(&journal).iter().filter(|e| *e == "resolve").count(), 2);
    run.abort();
}
