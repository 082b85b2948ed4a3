// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Transformer lifecycle.
//!
//! [`Shutdown`] owns the transformer handle and closes it exactly once, on
//! whichever of normal exit, interrupt or an uncaught panic comes first.
//! [`install_signal_handlers`] is the only place listeners are registered.

use crate::transformer::Transformer;
use parking_lot::Mutex;
use std::cell::Cell;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;

thread_local! {
    static CONTAINED: Cell<bool> = const { Cell::new(false) };
}

/// Run `f`, catching any panic it raises.
///
/// The uncaught-error listener ignores panics raised inside `f`, since the
/// caller turns them into an ordinary error.
pub(crate) fn contain_panic<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    let outer = CONTAINED.replace(true);
    let result = std::panic::catch_unwind(AssertUnwindSafe(f));
    CONTAINED.set(outer);
    result
}

fn panic_is_contained() -> bool {
    CONTAINED.try_with(Cell::get).unwrap_or(false)
}

/// What ended the loader's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// Normal exit
    Exit,
    /// Interrupt signal (Ctrl-C / SIGINT)
    Interrupt,
    /// Uncaught error (panic)
    UncaughtError,
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShutdownTrigger::Exit => "exit",
            ShutdownTrigger::Interrupt => "interrupt",
            ShutdownTrigger::UncaughtError => "uncaught error",
        };
        f.write_str(name)
    }
}

/// Owner of the transformer handle and its one-time cleanup.
pub struct Shutdown {
    transformer: Arc<dyn Transformer>,
    fired: Mutex<Option<ShutdownTrigger>>,
    released: watch::Sender<Option<ShutdownTrigger>>,
}

impl Shutdown {
    /// Take ownership of a transformer handle
    pub fn new(transformer: Arc<dyn Transformer>) -> Arc<Self> {
        Arc::new(Self {
            transformer,
            fired: Mutex::new(None),
            released: watch::Sender::new(None),
        })
    }

    /// Get the transformer handle
    pub fn transformer(&self) -> Arc<dyn Transformer> {
        Arc::clone(&self.transformer)
    }

    /// The trigger that performed cleanup, if any
    pub fn fired(&self) -> Option<ShutdownTrigger> {
        *self.fired.lock()
    }

    /// Claim the cleanup for `trigger`. Only the first claim succeeds.
    fn claim(&self, trigger: ShutdownTrigger) -> bool {
        let mut fired = self.fired.lock();
        if let Some(previous) = *fired {
            tracing::trace!(%trigger, %previous, "transformer already released");
            return false;
        }
        *fired = Some(trigger);
        true
    }

    /// Release the transformer. Returns `true` if this call did the cleanup.
    pub async fn run(&self, trigger: ShutdownTrigger) -> bool {
        if !self.claim(trigger) {
            return false;
        }

        tracing::debug!(%trigger, "releasing transformer");
        if let Err(e) = self.transformer.close().await {
            tracing::warn!(%trigger, error = %e, "failed to close transformer");
        }
        self.released.send_replace(Some(trigger));
        true
    }

    /// Release the transformer from a synchronous context such as a panic
    /// hook or a destructor. Returns `true` if this call did the cleanup.
    ///
    /// The close future is driven on the calling thread, so it must not
    /// depend on the runtime that thread may belong to.
    pub fn fire(&self, trigger: ShutdownTrigger) -> bool {
        if !self.claim(trigger) {
            return false;
        }

        tracing::debug!(%trigger, "releasing transformer");
        if let Err(e) = futures::executor::block_on(self.transformer.close()) {
            tracing::warn!(%trigger, error = %e, "failed to close transformer");
        }
        self.released.send_replace(Some(trigger));
        true
    }

    /// Wait until the transformer has been released by any trigger
    pub async fn released(&self) {
        let mut released = self.released.subscribe();
        // The sender lives in `self`, so the wait cannot see it dropped.
        let _ = released.wait_for(Option::is_some).await;
    }
}

impl Drop for Shutdown {
    fn drop(&mut self) {
        self.fire(ShutdownTrigger::Exit);
    }
}

/// Registered termination listeners.
///
/// Dropping this stops the interrupt listener. The panic hook stays
/// installed for the rest of the process but only holds a weak reference.
pub struct ShutdownListeners {
    interrupt: JoinHandle<()>,
}

impl ShutdownListeners {
    /// Stop listening for interrupts
    pub fn abort(&self) {
        self.interrupt.abort();
    }
}

impl Drop for ShutdownListeners {
    fn drop(&mut self) {
        self.interrupt.abort();
    }
}

/// Register the interrupt and uncaught-error listeners for `shutdown`.
///
/// Must be called from within a tokio runtime. Normal exit is covered by
/// [`Shutdown::run`] or by dropping the last reference to `shutdown`.
/// Panics that a transform raises are reported as transform errors and do
/// not count as uncaught.
pub fn install_signal_handlers(shutdown: &Arc<Shutdown>) -> ShutdownListeners {
    let on_panic: Weak<Shutdown> = Arc::downgrade(shutdown);
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if !panic_is_contained() {
            if let Some(shutdown) = on_panic.upgrade() {
                shutdown.fire(ShutdownTrigger::UncaughtError);
            }
        }
        previous(info);
    }));

    let on_interrupt = Arc::downgrade(shutdown);
    let interrupt = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                if let Some(shutdown) = on_interrupt.upgrade() {
                    shutdown.run(ShutdownTrigger::Interrupt).await;
                }
            }
            Err(e) => tracing::warn!(error = %e, "unable to listen for interrupt signal"),
        }
    });

    ShutdownListeners { interrupt }
}
