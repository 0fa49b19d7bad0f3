/// Runtime adjustments by single keystrokes: calibration range and brush style
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures_util::{Stream, StreamExt};
use log::{debug, info};
use std::io;
use tokio::sync::watch;

use crate::display::{CanvasSize, StatusLine};
use crate::error::PainterError;
use crate::models::{Brush, SignalRange};

/// Narrowest allowed gap between the far and near bound when narrowing by key
pub const MIN_RANGE_SPAN: i32 = 5;

/// Owner of the current calibration range. Readers subscribe to changes.
#[derive(Debug)]
pub struct RangeControl {
    tx: watch::Sender<SignalRange>,
}

impl RangeControl {
    pub fn new(initial: SignalRange) -> Result<Self, PainterError> {
        initial.validate()?;
        let (tx, _) = watch::channel(initial);
        Ok(RangeControl { tx })
    }

    pub fn subscribe(&self) -> watch::Receiver<SignalRange> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> SignalRange {
        *self.tx.borrow()
    }

    /// Replace the range. An invalid range is rejected and the previous one kept.
    pub fn set_signal_range(&self, range: SignalRange) -> Result<(), PainterError> {
        range.validate()?;
        self.tx.send_replace(range);
        Ok(())
    }

    /// Move the far bound one step further out, stepping over the near bound
    ///
    /// Returns `None` once the far bound reaches the largest valid magnitude.
    pub fn widen_far_bound(&self) -> Option<SignalRange> {
        let mut range = self.current();
        range.far_bound = range.far_bound.saturating_add(1);
        if range.far_bound == range.near_bound {
            range.far_bound = range.far_bound.saturating_add(1);
        }
        self.set_signal_range(range).ok()?;
        Some(range)
    }

    /// Move the far bound one step in while it stays more than `MIN_RANGE_SPAN` from the near bound
    pub fn narrow_far_bound(&self) -> Option<SignalRange> {
        let mut range = self.current();
        if range.far_bound <= range.near_bound.saturating_add(MIN_RANGE_SPAN) {
            return None;
        }
        range.far_bound -= 1;
        self.set_signal_range(range).ok()?;
        Some(range)
    }

    /// Move the near bound by `delta`, keeping the previous range if the result is invalid
    pub fn shift_near_bound(&self, delta: i32) -> Result<SignalRange, PainterError> {
        let mut range = self.current();
        range.near_bound = range.near_bound.saturating_add(delta);
        self.set_signal_range(range)?;
        Ok(range)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    WidenRange,
    NarrowRange,
    ShiftNearBound(i32),
    NextBrush,
    PreviousBrush,
    Help,
    Quit,
}

impl Command {
    /// Key bindings; key releases and unbound keys map to nothing
    pub fn from_key(key: &KeyEvent) -> Option<Command> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        // Raw mode delivers Ctrl+C as a key instead of a signal
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') | KeyCode::Char('d') => Some(Command::Quit),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Down | KeyCode::Char('+') => Some(Command::WidenRange),
            KeyCode::Up | KeyCode::Char('-') => Some(Command::NarrowRange),
            KeyCode::Char('[') => Some(Command::ShiftNearBound(-1)),
            KeyCode::Char(']') => Some(Command::ShiftNearBound(1)),
            KeyCode::Right | KeyCode::Char('n') => Some(Command::NextBrush),
            KeyCode::Left | KeyCode::Char('p') => Some(Command::PreviousBrush),
            KeyCode::Char('h') | KeyCode::Char('?') => Some(Command::Help),
            KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
            _ => None,
        }
    }
}

const HELP: &str = "Down/+ widen, Up/- narrow, [ ] near bound, Right/n Left/p brush, q quit";

pub struct Controls {
    pub range: RangeControl,
    brush: watch::Sender<Brush>,
    canvas: watch::Sender<CanvasSize>,
    status: StatusLine,
}

impl Controls {
    pub fn new(
        range: RangeControl,
        brush: Brush,
        canvas: CanvasSize,
        status: StatusLine,
    ) -> Self {
        let (brush, _) = watch::channel(brush);
        let (canvas, _) = watch::channel(canvas);
        Controls {
            range,
            brush,
            canvas,
            status,
        }
    }

    pub fn subscribe_brush(&self) -> watch::Receiver<Brush> {
        self.brush.subscribe()
    }

    pub fn subscribe_canvas(&self) -> watch::Receiver<CanvasSize> {
        self.canvas.subscribe()
    }

    /// Apply a command and return the message shown to the user
    pub fn apply(&self, command: Command) -> String {
        match command {
            Command::WidenRange => match self.range.widen_far_bound() {
                Some(range) => format!("Minimum RSSI: -{}", range.far_bound),
                None => "Minimum RSSI cannot be decreased further.".to_string(),
            },
            Command::NarrowRange => match self.range.narrow_far_bound() {
                Some(range) => format!("Minimum RSSI: -{}", range.far_bound),
                None => "Minimum RSSI cannot be increased further.".to_string(),
            },
            Command::ShiftNearBound(delta) => match self.range.shift_near_bound(delta) {
                Ok(range) => format!(
                    "Range: near -{} dBm, far -{} dBm",
                    range.near_bound, range.far_bound
                ),
                Err(e) => format!("{}. Keeping the previous range", e),
            },
            Command::NextBrush => {
                self.brush.send_modify(|brush| *brush = brush.next());
                format!("Brush: {}", self.brush.borrow().name())
            }
            Command::PreviousBrush => {
                self.brush.send_modify(|brush| *brush = brush.previous());
                format!("Brush: {}", self.brush.borrow().name())
            }
            Command::Help => HELP.to_string(),
            Command::Quit => "Stopping".to_string(),
        }
    }
}

/// Apply terminal key events until the user quits or the event stream ends
///
/// # Arguments
/// * `controls` - Range, brush and status owners the keys act on
/// * `events` - Terminal events, normally `crossterm::event::EventStream`
///
/// # Returns
/// Ok once the user asked to quit or the terminal closed, or the read error
pub async fn run_key_controls<E>(controls: &Controls, mut events: E) -> io::Result<()>
where
    E: Stream<Item = io::Result<Event>> + Unpin,
{
    controls.status.set(HELP);

    while let Some(event) = events.next().await {
        match event? {
            Event::Key(key) => match Command::from_key(&key) {
                Some(Command::Quit) => {
                    info!("Quit requested from the keyboard");
                    return Ok(());
                }
                Some(command) => {
                    let reply = controls.apply(command);
                    info!("{}", reply);
                    controls.status.set(reply);
                }
                None => debug!("Unbound key {:?}", key.code),
            },
            Event::Resize(columns, rows) => {
                debug!("Terminal resized to {}x{}", columns, rows);
                controls.canvas.send_replace(CanvasSize { columns, rows });
            }
            _ => {}
        }
    }

    Ok(())
}
