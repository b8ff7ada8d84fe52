//! Single/double click disambiguation
//!
//! A click is held for the delay window. A second click at the same x inside
//! the window fires the double-click handler; otherwise the window timer
//! fires the single-click handler. Every armed timer carries the generation
//! of the click that armed it, so a stale timer never fires for a newer
//! click.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub type ClickHandler = Arc<dyn Fn(f64) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickState {
    NoPendingClick,
    PendingClick {
        x: f64,
        at: Instant,
        generation: u64,
    },
    DoubleClickFired {
        x: f64,
    },
    SingleClickFired {
        x: f64,
    },
}

struct Inner {
    state: ClickState,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

pub struct ClickDisambiguator {
    delay: Duration,
    inner: Mutex<Inner>,
    on_single: ClickHandler,
    on_double: ClickHandler,
}

impl ClickDisambiguator {
    pub fn new(delay: Duration, on_single: ClickHandler, on_double: ClickHandler) -> Arc<Self> {
        Arc::new(Self {
            delay,
            inner: Mutex::new(Inner {
                state: ClickState::NoPendingClick,
                generation: 0,
                timer: None,
            }),
            on_single,
            on_double,
        })
    }

    /// Feed one click at x-axis value `x`.
    pub fn handle_click(self: &Arc<Self>, x: f64) {
        let now = Instant::now();
        let mut flushed = None;

        {
            let mut inner = self.inner.lock();
            if let ClickState::PendingClick { x: pending_x, at, .. } = inner.state {
                if pending_x == x && now.duration_since(at) < self.delay {
                    if let Some(timer) = inner.timer.take() {
                        timer.abort();
                    }
                    inner.state = ClickState::DoubleClickFired { x };
                    drop(inner);
                    log::debug!("ClickDisambiguator - double click at {x}");
                    (self.on_double)(x);
                    return;
                }
                // Superseded: a click elsewhere, or the window elapsed before
                // the timer ran. The pending click still counts once.
                if let Some(timer) = inner.timer.take() {
                    timer.abort();
                }
                flushed = Some(pending_x);
            }

            inner.generation += 1;
            let generation = inner.generation;
            inner.state = ClickState::PendingClick {
                x,
                at: now,
                generation,
            };
            inner.timer = self.arm_timer(generation);
        }

        if let Some(pending_x) = flushed {
            log::debug!("ClickDisambiguator - click at {pending_x} superseded, processed as single");
            (self.on_single)(pending_x);
        }
    }

    /// Drop any pending click without firing it.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock();
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.state = ClickState::NoPendingClick;
    }

    pub fn state(&self) -> ClickState {
        self.inner.lock().state
    }

    fn arm_timer(self: &Arc<Self>, generation: u64) -> Option<JoinHandle<()>> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                log::warn!("ClickDisambiguator - no runtime for the click timer, click dropped");
                return None;
            }
        };

        let this = Arc::downgrade(self);
        let delay = self.delay;
        Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(this) = this.upgrade() {
                this.fire_single(generation);
            }
        }))
    }

    fn fire_single(&self, generation: u64) {
        let x = {
            let mut inner = self.inner.lock();
            match inner.state {
                ClickState::PendingClick {
                    x,
                    generation: pending,
                    ..
                } if pending == generation => {
                    inner.state = ClickState::SingleClickFired { x };
                    inner.timer = None;
                    x
                }
                _ => return,
            }
        };
        log::debug!("ClickDisambiguator - single click at {x}");
        (self.on_single)(x);
    }
}
