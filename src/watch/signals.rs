//! # OS signal watcher.
//!
//! [`SignalWatcher`] registers listeners for a fixed list of [`Signal`]s and forwards
//! every delivery, once per occurrence, into a single channel. Nothing is masked or
//! coalesced here; the consumer decides what each signal means.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGHUP` reload
//! - `SIGINT`, `SIGTERM`, `SIGQUIT` terminate
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`], reported as [`Signal::Interrupt`]

use std::fmt;

use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Signals understood by the supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `SIGHUP`: restart every plugin.
    Hangup,
    /// `SIGINT`: drain and exit.
    Interrupt,
    /// `SIGTERM`: drain and exit.
    Terminate,
    /// `SIGQUIT`: drain and exit.
    Quit,
}

impl Signal {
    /// The set watched by default: hang-up, interrupt, terminate, quit.
    pub const WATCHED: [Signal; 4] = [
        Signal::Hangup,
        Signal::Interrupt,
        Signal::Terminate,
        Signal::Quit,
    ];

    /// `true` for the signal that requests a restart instead of an exit.
    pub fn is_reload(&self) -> bool {
        matches!(self, Signal::Hangup)
    }

    #[cfg(unix)]
    fn kind(&self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;
        match self {
            Signal::Hangup => SignalKind::hangup(),
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Quit => SignalKind::quit(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signal::Hangup => "SIGHUP",
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Quit => "SIGQUIT",
        })
    }
}

/// Single-consumer channel of OS signals.
///
/// The forwarding task stops when the watcher is dropped.
pub struct SignalWatcher {
    rx: mpsc::UnboundedReceiver<Signal>,
    _stop: Option<DropGuard>,
}

impl SignalWatcher {
    /// Registers listeners for `signals` and starts forwarding them.
    ///
    /// Must be called inside a tokio runtime. Fails if any listener cannot be registered.
    #[cfg(unix)]
    pub fn new(signals: &[Signal]) -> std::io::Result<Self> {
        use futures::stream::{self, StreamExt};
        use tokio::signal::unix::signal;

        let mut streams = Vec::with_capacity(signals.len());
        for &sig in signals {
            let mut listener = signal(sig.kind())?;
            streams.push(
                stream::poll_fn(move |cx| listener.poll_recv(cx).map(|r| r.map(|()| sig))).boxed(),
            );
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let stop = token.clone();

        tokio::spawn(async move {
            let mut merged = stream::select_all(streams);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    next = merged.next() => match next {
                        Some(sig) if tx.send(sig).is_ok() => {}
                        _ => break,
                    },
                }
            }
        });

        Ok(Self {
            rx,
            _stop: Some(token.drop_guard()),
        })
    }

    /// Registers a Ctrl-C listener; every other requested signal is ignored.
    #[cfg(not(unix))]
    pub fn new(signals: &[Signal]) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let stop = token.clone();
        let wants_interrupt = signals.contains(&Signal::Interrupt);

        tokio::spawn(async move {
            while wants_interrupt {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    res = tokio::signal::ctrl_c() => {
                        if res.is_err() || tx.send(Signal::Interrupt).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            rx,
            _stop: Some(token.drop_guard()),
        })
    }

    /// Wraps an existing channel (no OS listeners).
    pub fn from_channel(rx: mpsc::UnboundedReceiver<Signal>) -> Self {
        Self { rx, _stop: None }
    }

    /// Receives the next signal; `None` once the source is gone.
    pub async fn recv(&mut self) -> Option<Signal> {
        self.rx.recv().await
    }
}
