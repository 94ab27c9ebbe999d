#![warn(missing_docs)]

//! # scene-countdown
//!
//! A terminal countdown overlay for streaming setups. It counts down from a
//! configured duration, scales its block-glyph rendering to fill the terminal
//! (or a fixed box inside it), and when it reaches zero runs an action on a
//! [Streamer.bot](https://streamer.bot) instance over its WebSocket API,
//! typically to switch scenes.
//!
//! ## Overview
//!
//! The overlay is a [bubbletea-rs](https://github.com/whit3rabbit/bubbletea-rs)
//! program. All state lives in [`OverlayController`], which follows the Elm
//! Architecture with `init()`, `update()` and `view()`; timers, debounced
//! refits and remote calls are commands whose messages come back through
//! `update()`.
//!
//! ## Components
//!
//! - [`countdown`]: the `Idle → Running → Fired` engine with cancellable ticks
//! - [`fit`]: scale computation with padding, a maximum scale and bounded retry
//! - [`glyphs`]: the scalable half-block font
//! - [`refit`]: per-source debouncing of refit requests
//! - [`action`]: action lookup and invocation behind the [`ActionClient`] trait
//! - [`streamerbot`]: the Streamer.bot WebSocket client
//! - [`overlay`]: the Bubble Tea model tying it all together
//! - [`config`], [`logging`], [`error`]: startup plumbing for the binary
//!
//! ## Driving the overlay
//!
//! ```rust
//! use scene_countdown::prelude::*;
//!
//! let settings = OverlaySettings {
//!     duration_ms: 90_000,
//!     target: ActionTarget::from_parts(None, Some("Switch to Main")),
//!     ..OverlaySettings::default()
//! };
//! let mut overlay = OverlayController::new(settings, ActionInvoker::disconnected());
//!
//! let _cmd = overlay.start_countdown();
//! assert_eq!(overlay.display(), "01:30:000");
//!
//! overlay.stop_countdown();
//! assert_eq!(overlay.remaining_ms(), 90_000);
//! ```

pub mod action;
pub mod config;
pub mod countdown;
pub mod error;
pub mod fit;
pub mod glyphs;
pub mod key;
pub mod logging;
pub mod overlay;
pub mod refit;
pub mod streamerbot;

pub use action::{ActionClient, ActionError, ActionInvoker, ActionOutcome, ActionTarget};
pub use config::{Config, ConfigError, ContainerSize};
pub use countdown::{format_ms, Model as Countdown, Phase};
pub use error::{Error, Result};
pub use fit::{BoxSize, FitConfig, FitError, FitRetry, TextFitter, TextMeasure};
pub use glyphs::BlockFont;
pub use overlay::{install, LaunchContext, OverlayController, OverlaySettings};
pub use refit::{RefitScheduler, RefitSource};
pub use streamerbot::{ClientError, ClientOptions, StreamerbotClient};

/// Prelude module for convenient imports.
///
/// ```rust
/// use scene_countdown::prelude::*;
///
/// assert_eq!(format_ms(61_234), "01:01:234");
/// ```
pub mod prelude {
    pub use crate::action::{ActionClient, ActionError, ActionInvoker, ActionTarget};
    pub use crate::countdown::{format_ms, Phase};
    pub use crate::fit::{BoxSize, FitConfig};
    pub use crate::overlay::{OverlayController, OverlaySettings};
}
