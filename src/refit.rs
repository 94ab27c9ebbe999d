//! Debounced refit requests.
//!
//! Several things can invalidate the current scale: the container changing
//! size, the displayed text changing, and the terminal window being resized.
//! They all funnel into [`RefitScheduler::request`], which applies the
//! debounce window of the requesting [`RefitSource`]. A burst of requests from
//! one source produces a single [`RefitMsg`] that is still current when it
//! arrives; the others are recognised as stale by their tag.

use bubbletea_rs::{tick as bubbletea_tick, Cmd, Msg};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

static LAST_ID: AtomicI64 = AtomicI64::new(0);

fn next_id() -> i64 {
    LAST_ID.fetch_add(1, Ordering::SeqCst) + 1
}

/// What asked for a refit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefitSource {
    /// The container box changed size. Handled immediately.
    ContainerResize,
    /// The displayed text changed. Debounced by 30 ms.
    ContentChange,
    /// The terminal window changed size. Debounced by 80 ms.
    WindowResize,
}

impl RefitSource {
    /// Debounce window for this source; `None` means refit right away.
    pub fn debounce(self) -> Option<Duration> {
        match self {
            Self::ContainerResize => None,
            Self::ContentChange => Some(Duration::from_millis(30)),
            Self::WindowResize => Some(Duration::from_millis(80)),
        }
    }

    fn index(self) -> usize {
        match self {
            Self::ContainerResize => 0,
            Self::ContentChange => 1,
            Self::WindowResize => 2,
        }
    }
}

/// Delivered when a debounce window closes.
#[derive(Debug, Clone)]
pub struct RefitMsg {
    /// Identifier of the scheduler that produced this message.
    pub id: i64,
    /// Source whose window closed.
    pub source: RefitSource,
    tag: u64,
}

/// Outcome of a refit request.
pub enum Refit {
    /// Refit now.
    Now,
    /// Refit when this command's [`RefitMsg`] comes back and is accepted.
    Later(Cmd),
}

impl std::fmt::Debug for Refit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Now => f.write_str("Now"),
            Self::Later(_) => f.write_str("Later(..)"),
        }
    }
}

/// Per-source debounce bookkeeping.
#[derive(Debug, Clone)]
pub struct RefitScheduler {
    id: i64,
    tags: [u64; 3],
}

impl RefitScheduler {
    /// Creates a scheduler with its own identifier.
    pub fn new() -> Self {
        Self {
            id: next_id(),
            tags: [0; 3],
        }
    }

    /// Identifier carried by every [`RefitMsg`] this scheduler emits.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Registers a refit request from `source`.
    ///
    /// Each debounced request supersedes the previous one from the same source.
    pub fn request(&mut self, source: RefitSource) -> Refit {
        let Some(delay) = source.debounce() else {
            return Refit::Now;
        };
        let slot = &mut self.tags[source.index()];
        *slot += 1;
        let (id, tag) = (self.id, *slot);
        Refit::Later(bubbletea_tick(delay, move |_| {
            Box::new(RefitMsg { id, source, tag }) as Msg
        }))
    }

    /// Whether `msg` is the latest request from its source.
    pub fn accept(&self, msg: &RefitMsg) -> bool {
        msg.id == self.id && msg.tag == self.tags[msg.source.index()]
    }
}

impl Default for RefitScheduler {
    fn default() -> Self {
        Self::new()
    }
}
