//! The countdown overlay as a Bubble Tea model.
//!
//! [`OverlayController`] owns every piece of mutable overlay state: the
//! countdown engine, the fitted scale, the displayed text and the container
//! geometry. It is only changed from [`OverlayController::update`], so there
//! are no locks. When the countdown fires, the configured action is invoked
//! through an async command and the display is cleared whatever the outcome.
//!
//! Bubble Tea constructs the model through an argument-less `init()`, so the
//! binary hands over its resolved settings and invoker with [`install`] before
//! the program starts.

use bubbletea_rs::{tick as bubbletea_tick, Cmd, KeyMsg, Model as BubbleTeaModel, Msg};
use lipgloss_extras::prelude::*;
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};
use unicode_width::UnicodeWidthStr;

use crate::{
    action::{ActionError, ActionInvoker, ActionOutcome, ActionTarget},
    config::{ContainerSize, DEFAULT_COLOR},
    countdown::{self, format_ms, FiredMsg},
    fit::{BoxSize, FitConfig, FitError, FitRetry, TextFitter},
    glyphs::BlockFont,
    key::OverlayKeyMap,
    refit::{Refit, RefitMsg, RefitScheduler, RefitSource},
};

/// Everything the overlay needs to know at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySettings {
    /// Fit parameters.
    pub fit: FitConfig,
    /// Countdown length.
    pub duration_ms: u64,
    /// Tick interval.
    pub tick_ms: u64,
    /// Action to run at zero.
    pub target: Option<ActionTarget>,
    /// Glyph font.
    pub font: BlockFont,
    /// Foreground colour.
    pub color: String,
    /// Fixed container size; `None` follows the terminal window.
    pub container: Option<ContainerSize>,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            fit: FitConfig::default(),
            duration_ms: 5 * 60_000,
            tick_ms: 1,
            target: None,
            font: BlockFont::default(),
            color: DEFAULT_COLOR.to_string(),
            container: None,
        }
    }
}

/// Settings and invoker handed from the binary to [`OverlayController::init`].
#[derive(Debug, Clone, Default)]
pub struct LaunchContext {
    /// Resolved settings.
    pub settings: OverlaySettings,
    /// Invoker, connected or not.
    pub invoker: ActionInvoker,
}

static LAUNCH: OnceCell<LaunchContext> = OnceCell::new();

/// Stores the launch context for the next [`OverlayController::init`].
///
/// Returns `false` if a context was already installed; the first one is kept.
pub fn install(context: LaunchContext) -> bool {
    LAUNCH.set(context).is_ok()
}

/// Result of an action invocation, delivered back to the model.
#[derive(Debug, Clone)]
pub struct ActionResultMsg {
    /// What the invoker reported.
    pub result: Result<ActionOutcome, ActionError>,
}

/// Next attempt of a fit that found the layout not ready.
#[derive(Debug, Clone)]
pub struct FitRetryMsg {
    /// Identifier of the overlay that scheduled the retry.
    pub id: i64,
    tag: u64,
}

/// Combines optional commands into at most one.
fn combine(cmds: Vec<Option<Cmd>>) -> Option<Cmd> {
    let mut cmds: Vec<Cmd> = cmds.into_iter().flatten().collect();
    match cmds.len() {
        0 => None,
        1 => cmds.pop(),
        _ => Some(bubbletea_rs::batch(cmds)),
    }
}

/// The overlay model.
#[derive(Debug)]
pub struct OverlayController {
    settings: OverlaySettings,
    countdown: countdown::Model,
    fitter: TextFitter<BlockFont>,
    invoker: ActionInvoker,
    refit: RefitScheduler,
    keymap: OverlayKeyMap,
    style: Style,
    display: String,
    scale: Option<f64>,
    window: BoxSize,
    container: BoxSize,
    fit_retry: FitRetry,
    retry_tag: u64,
}

impl OverlayController {
    /// Creates an idle overlay. Nothing is scheduled until
    /// [`start_countdown`](Self::start_countdown) or [`ensure_fit`](Self::ensure_fit).
    pub fn new(settings: OverlaySettings, invoker: ActionInvoker) -> Self {
        let countdown = countdown::new(settings.duration_ms, settings.tick_ms);
        let fitter = TextFitter::new(settings.font, settings.fit);
        let style = Style::new().foreground(Color::from(settings.color.as_str()));
        let container = settings
            .container
            .map(|c| BoxSize::new(f64::from(c.width), f64::from(c.height)))
            .unwrap_or_default();

        Self {
            settings,
            countdown,
            fitter,
            invoker,
            refit: RefitScheduler::new(),
            keymap: OverlayKeyMap::default(),
            style,
            display: String::new(),
            scale: None,
            window: BoxSize::default(),
            container,
            fit_retry: FitRetry::new(),
            retry_tag: 0,
        }
    }

    /// Text currently shown; empty before the first tick and after firing.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Scale of the last successful fit.
    pub fn scale(&self) -> Option<f64> {
        self.scale
    }

    /// Size of the box the countdown is fitted into.
    pub fn container(&self) -> BoxSize {
        self.container
    }

    /// Remaining time of the current run.
    pub fn remaining_ms(&self) -> u64 {
        self.countdown.remaining_ms()
    }

    /// Configured countdown length.
    pub fn duration_ms(&self) -> u64 {
        self.countdown.duration_ms()
    }

    /// Whether the countdown is counting.
    pub fn running(&self) -> bool {
        self.countdown.running()
    }

    /// Starts the countdown from its full duration. Does nothing while it is
    /// already running.
    pub fn start_countdown(&mut self) -> Option<Cmd> {
        if self.countdown.running() {
            return None;
        }
        let cmd = self.countdown.start(self.countdown.duration_ms());
        combine(vec![Some(cmd), self.sync_display()])
    }

    /// Stops the countdown, leaving the last value on screen. Idempotent.
    pub fn stop_countdown(&mut self) {
        self.countdown.stop();
    }

    /// Stops and starts again from the full duration.
    pub fn restart_countdown(&mut self) -> Option<Cmd> {
        let cmd = self.countdown.restart();
        combine(vec![Some(cmd), self.sync_display()])
    }

    /// Invokes the configured action now. The countdown keeps running.
    pub fn trigger_switch(&self) -> Cmd {
        let invoker = self.invoker.clone();
        let target = self.settings.target.clone();
        Box::pin(async move {
            let result = invoker.invoke(target.as_ref()).await;
            Some(Box::new(ActionResultMsg { result }) as Msg)
        })
    }

    /// Pins the container to `width` x `height` cells (clamped to the window)
    /// and refits right away.
    pub fn set_container(&mut self, width: u16, height: u16) -> Option<Cmd> {
        self.settings.container = Some(ContainerSize { width, height });
        self.apply_geometry();
        self.request_refit(RefitSource::ContainerResize)
    }

    fn handle_window_size(&mut self, width: u16, height: u16) -> Option<Cmd> {
        self.window = BoxSize::new(f64::from(width), f64::from(height));
        let before = self.container;
        self.apply_geometry();

        let immediate = if self.container != before {
            self.request_refit(RefitSource::ContainerResize)
        } else {
            None
        };
        combine(vec![immediate, self.request_refit(RefitSource::WindowResize)])
    }

    fn apply_geometry(&mut self) {
        self.container = match self.settings.container {
            Some(fixed) => {
                let mut size = BoxSize::new(f64::from(fixed.width), f64::from(fixed.height));
                if !self.window.is_degenerate() {
                    size.width = size.width.min(self.window.width);
                    size.height = size.height.min(self.window.height);
                }
                size
            }
            None => self.window,
        };
    }

    /// Asks for a refit on behalf of `source`, honouring its debounce window.
    pub fn request_refit(&mut self, source: RefitSource) -> Option<Cmd> {
        match self.refit.request(source) {
            Refit::Now => {
                self.refit_now();
                None
            }
            Refit::Later(cmd) => Some(cmd),
        }
    }

    /// Fits the current display once. Returns whether the layout was ready.
    pub fn refit_now(&mut self) -> bool {
        self.try_fit().is_ok()
    }

    fn try_fit(&mut self) -> Result<f64, FitError> {
        let scale = self
            .fitter
            .compute_scale(self.display.trim(), self.container)?;
        self.scale = Some(scale);
        Ok(scale)
    }

    /// Fits the current display, retrying on a fixed backoff while the layout
    /// is not ready. Starting a new loop abandons the previous one.
    pub fn ensure_fit(&mut self) -> Option<Cmd> {
        self.fit_retry = FitRetry::new();
        self.retry_tag += 1;
        self.attempt_fit()
    }

    fn attempt_fit(&mut self) -> Option<Cmd> {
        let err = self.try_fit().err()?;
        let attempts = self.fit_retry.attempts() + 1;
        match self.fit_retry.record_failure() {
            Some(delay) => {
                debug!(attempts, error = %err, "layout not ready, retrying fit");
                let (id, tag) = (self.refit.id(), self.retry_tag);
                Some(bubbletea_tick(delay, move |_| {
                    Box::new(FitRetryMsg { id, tag }) as Msg
                }))
            }
            None => {
                debug!(attempts, "layout never became ready, giving up on fit");
                None
            }
        }
    }

    /// Replaces the displayed text.
    ///
    /// Clearing goes through [`ensure_fit`](Self::ensure_fit). A value is
    /// fitted immediately; if the layout is not ready yet the content change
    /// is handed to the debounced refit instead.
    pub fn set_display(&mut self, text: impl Into<String>) -> Option<Cmd> {
        let text = text.into();
        if text == self.display {
            return None;
        }
        self.display = text;

        if self.display.is_empty() {
            return self.ensure_fit();
        }
        match self.try_fit() {
            Ok(_) => None,
            Err(err) => {
                debug!(error = %err, "fit deferred");
                self.request_refit(RefitSource::ContentChange)
            }
        }
    }

    fn sync_display(&mut self) -> Option<Cmd> {
        match self.countdown.phase() {
            countdown::Phase::Running => self.set_display(format_ms(self.countdown.remaining_ms())),
            countdown::Phase::Fired => self.set_display(""),
            countdown::Phase::Idle => None,
        }
    }

    fn handle_key(&mut self, key: &KeyMsg) -> Option<Cmd> {
        let keymap = &self.keymap;
        if keymap.quit.matches(key) || keymap.force_quit.matches(key) {
            Some(bubbletea_rs::quit())
        } else if keymap.start.matches(key) {
            self.start_countdown()
        } else if keymap.stop.matches(key) {
            self.stop_countdown();
            None
        } else if keymap.restart.matches(key) {
            self.restart_countdown()
        } else if keymap.trigger.matches(key) {
            Some(self.trigger_switch())
        } else {
            None
        }
    }

    fn handle_action_result(&mut self, msg: &ActionResultMsg) -> Option<Cmd> {
        match &msg.result {
            Ok(outcome) => info!(action_id = %outcome.action_id, "action invoked"),
            Err(err) => warn!(error = %err, "action invocation failed"),
        }
        self.set_display("")
    }

    /// Renders the display text as glyphs, centred in the container.
    fn render(&self) -> String {
        let Some(scale) = self.scale else {
            return String::new();
        };
        let lines = self.settings.font.render(self.display.trim(), scale);
        if lines.is_empty() {
            return String::new();
        }

        let area_w = self.container.width.max(0.0) as usize;
        let area_h = self.container.height.max(0.0) as usize;
        let top = area_h.saturating_sub(lines.len()) / 2;

        let mut out: Vec<String> = vec![String::new(); top];
        for line in &lines {
            let left = area_w.saturating_sub(line.width()) / 2;
            out.push(format!("{}{}", " ".repeat(left), self.style.render(line)));
        }
        out.join("\n")
    }
}

impl BubbleTeaModel for OverlayController {
    fn init() -> (Self, Option<Cmd>) {
        let context = LAUNCH.get().cloned().unwrap_or_else(|| LaunchContext {
            settings: OverlaySettings::default(),
            invoker: ActionInvoker::disconnected(),
        });
        let mut overlay = Self::new(context.settings, context.invoker);
        let fit = overlay.ensure_fit();
        let start = overlay.start_countdown();
        let cmd = combine(vec![fit, start]);
        (overlay, cmd)
    }

    fn update(&mut self, msg: Msg) -> Option<Cmd> {
        if let Some(key) = msg.downcast_ref::<KeyMsg>() {
            return self.handle_key(key);
        }
        if let Some(size) = msg.downcast_ref::<bubbletea_rs::WindowSizeMsg>() {
            return self.handle_window_size(size.width, size.height);
        }
        if let Some(fired) = msg.downcast_ref::<FiredMsg>() {
            if !self.countdown.complete(fired) {
                return None;
            }
            info!(duration_ms = self.countdown.duration_ms(), "countdown finished");
            return combine(vec![self.set_display(""), Some(self.trigger_switch())]);
        }
        if let Some(result) = msg.downcast_ref::<ActionResultMsg>() {
            return self.handle_action_result(result);
        }
        if let Some(refit) = msg.downcast_ref::<RefitMsg>() {
            if self.refit.accept(refit) {
                self.refit_now();
            }
            return None;
        }
        if let Some(retry) = msg.downcast_ref::<FitRetryMsg>() {
            if retry.id == self.refit.id() && retry.tag == self.retry_tag {
                return self.attempt_fit();
            }
            return None;
        }

        let next = self.countdown.update(&msg);
        combine(vec![next, self.sync_display()])
    }

    fn view(&self) -> String {
        self.render()
    }
}
