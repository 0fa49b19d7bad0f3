/// Full-screen terminal canvas painted with the current signal colour
use crossterm::cursor::{self, MoveTo};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use log::{debug, warn};
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::watch;

use crate::models::{Brush, ColorValue};
use crate::sampler::ColorDisplay;

const PAINT_CELL: char = '█';
const STATUS_COLOR: Color = Color::DarkGrey;
/// The bottom row carries command replies and link state, never paint
const STATUS_ROWS: u16 = 1;

/// Terminal size in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub columns: u16,
    pub rows: u16,
}

impl CanvasSize {
    const FALLBACK: CanvasSize = CanvasSize {
        columns: 80,
        rows: 24,
    };

    /// Current size of the controlling terminal, 80x24 if it cannot be queried
    pub fn of_terminal() -> CanvasSize {
        match terminal::size() {
            Ok((columns, rows)) => CanvasSize { columns, rows },
            Err(e) => {
                warn!("Could not query the terminal size, assuming 80x24: {}", e);
                CanvasSize::FALLBACK
            }
        }
    }
}

/// One line of text shown under the painting
#[derive(Debug, Clone)]
pub struct StatusLine(Arc<watch::Sender<String>>);

impl StatusLine {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(String::new());
        StatusLine(Arc::new(tx))
    }

    pub fn set(&self, text: impl Into<String>) {
        self.0.send_replace(text.into());
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.0.subscribe()
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        StatusLine::new()
    }
}

/// Raw mode on the alternate screen for as long as the guard lives
///
/// Raw mode stops keystrokes from echoing onto the painting and delivers them
/// one at a time. Dropping the guard gives the terminal back as it was.
pub struct ImmersiveTerminal {
    _private: (),
}

impl ImmersiveTerminal {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = ImmersiveTerminal { _private: () };
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Color::Black),
            Clear(ClearType::All)
        )?;
        debug!("Entered immersive mode");
        Ok(guard)
    }
}

impl Drop for ImmersiveTerminal {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), ResetColor, cursor::Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Cells covered by `brush` on a canvas of `columns` x `rows`, row-major
///
/// Terminal cells are roughly twice as tall as wide, so horizontal distances
/// are halved when testing whether a cell lies inside a circle.
pub fn brush_mask(brush: Brush, columns: u16, rows: u16) -> Vec<Vec<bool>> {
    let (cols, rows_f) = (f32::from(columns), f32::from(rows));
    let center_x = cols / 2.0;
    let inside = |col: u16, row: u16, cx: f32, cy: f32, radius: f32| {
        let dx = (f32::from(col) + 0.5 - cx) / 2.0;
        let dy = f32::from(row) + 0.5 - cy;
        dx * dx + dy * dy <= radius * radius
    };
    // Five evenly spaced centres down the middle column
    let stacked = |col: u16, row: u16, radius: f32| {
        (1..=5).any(|i| inside(col, row, center_x, rows_f * i as f32 / 6.0, radius))
    };

    (0..rows)
        .map(|row| {
            (0..columns)
                .map(|col| match brush {
                    Brush::Dots => stacked(col, row, (rows_f / 20.0).max(0.5)),
                    Brush::Circles => stacked(col, row, (rows_f / 13.0).max(0.8)),
                    Brush::Spot => inside(col, row, center_x, rows_f / 2.0, rows_f / 3.0),
                    Brush::Bar => {
                        let band = (rows_f / 10.0).max(0.5);
                        (f32::from(row) + 0.5 - rows_f / 2.0).abs() <= band
                    }
                })
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    color: ColorValue,
    brush: Brush,
    size: CanvasSize,
    status: String,
}

/// Paints every accepted colour with the selected brush
///
/// Brush, canvas size and status text are followed through watch channels.
/// A frame is only written when one of them or the colour changed.
pub struct TerminalDisplay<W: Write> {
    out: W,
    brush: watch::Receiver<Brush>,
    size: watch::Receiver<CanvasSize>,
    status: watch::Receiver<String>,
    last_frame: Option<Frame>,
    write_failed: bool,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(
        out: W,
        brush: watch::Receiver<Brush>,
        size: watch::Receiver<CanvasSize>,
        status: watch::Receiver<String>,
    ) -> Self {
        TerminalDisplay {
            out,
            brush,
            size,
            status,
            last_frame: None,
            write_failed: false,
        }
    }

    #[cfg(test)]
    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Redraw with the last painted colour, picking up a new status or size
    pub fn refresh(&mut self) {
        let color = self
            .last_frame
            .as_ref()
            .map(|frame| frame.color)
            .unwrap_or_default();
        self.paint(color);
    }

    fn paint(&mut self, color: ColorValue) {
        let frame = Frame {
            color,
            brush: *self.brush.borrow_and_update(),
            size: *self.size.borrow_and_update(),
            status: self.status.borrow_and_update().clone(),
        };
        if self.last_frame.as_ref() == Some(&frame) {
            return;
        }

        match self.render(&frame) {
            Ok(()) => {
                self.last_frame = Some(frame);
                self.write_failed = false;
            }
            Err(e) => {
                if !self.write_failed {
                    warn!("Failed to paint {}: {}", color, e);
                }
                self.write_failed = true;
            }
        }
    }

    fn render(&mut self, frame: &Frame) -> io::Result<()> {
        let CanvasSize { columns, rows } = frame.size;
        let painted_rows = rows.saturating_sub(STATUS_ROWS);

        let resized = self.last_frame.as_ref().map(|last| last.size) != Some(frame.size);
        if resized {
            queue!(self.out, Clear(ClearType::All))?;
        }

        let ColorValue { red, green, blue } = frame.color;
        queue!(
            self.out,
            SetForegroundColor(Color::Rgb {
                r: red,
                g: green,
                b: blue
            })
        )?;
        let mask = brush_mask(frame.brush, columns, painted_rows);
        for (row, cells) in (0u16..).zip(&mask) {
            let line: String = cells
                .iter()
                .map(|&painted| if painted { PAINT_CELL } else { ' ' })
                .collect();
            queue!(self.out, MoveTo(0, row), Print(line))?;
        }

        let status: String = frame.status.chars().take(usize::from(columns)).collect();
        queue!(
            self.out,
            MoveTo(0, painted_rows),
            Clear(ClearType::CurrentLine),
            SetForegroundColor(STATUS_COLOR),
            Print(status)
        )?;
        self.out.flush()
    }
}

impl<W: Write + Send + 'static> ColorDisplay for TerminalDisplay<W> {
    fn on_color_computed(&mut self, color: ColorValue) {
        self.paint(color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canvas {
        display: TerminalDisplay<Vec<u8>>,
        brush: watch::Sender<Brush>,
        size: watch::Sender<CanvasSize>,
        status: StatusLine,
    }

    fn canvas(brush: Brush, columns: u16, rows: u16) -> Canvas {
        let (brush_tx, brush_rx) = watch::channel(brush);
        let (size_tx, size_rx) = watch::channel(CanvasSize { columns, rows });
        let status = StatusLine::new();
        Canvas {
            display: TerminalDisplay::new(Vec::new(), brush_rx, size_rx, status.subscribe()),
            brush: brush_tx,
            size: size_tx,
            status,
        }
    }

    fn written(canvas: &Canvas) -> usize {
        canvas.display.writer().len()
    }

    #[test]
    fn every_brush_paints_something() {
        for brush in [Brush::Dots, Brush::Circles, Brush::Spot, Brush::Bar] {
            let mask = brush_mask(brush, 80, 24);
            assert_eq!(mask.len(), 24);
            assert!(mask.iter().all(|row| row.len() == 80));
            assert!(mask.iter().flatten().any(|&cell| cell), "{:?} is empty", brush);
        }
    }

    #[test]
    fn bar_spans_the_full_width() {
        let mask = brush_mask(Brush::Bar, 40, 20);
        assert!(mask[10].iter().all(|&cell| cell));
        assert!(mask[0].iter().all(|&cell| !cell));
    }

    #[test]
    fn dots_leave_the_edges_dark() {
        let mask = brush_mask(Brush::Dots, 80, 24);
        assert!(mask.iter().all(|row| !row[0] && !row[79]));
    }

    #[test]
    fn canvas_paints_in_true_color() {
        let mut canvas = canvas(Brush::Spot, 20, 10);
        canvas.display.on_color_computed(ColorValue::new(255, 0, 0));

        let out = String::from_utf8(canvas.display.writer().clone()).unwrap();
        assert!(out.contains("\x1b[38;2;255;0;0m"));
        assert!(out.contains(PAINT_CELL));
    }

    #[test]
    fn status_sits_on_the_bottom_row_and_is_cut_to_width() {
        let mut canvas = canvas(Brush::Bar, 10, 5);
        canvas.status.set("Minimum RSSI cannot be increased further.");
        canvas.display.on_color_computed(ColorValue::new(0, 0, 255));

        let out = String::from_utf8(canvas.display.writer().clone()).unwrap();
        // MoveTo is 1-based on the wire: row 4 of 0..5 is the fifth line
        let status_at = out.find("\x1b[5;1H").unwrap();
        assert!(out[status_at..].contains("Minimum RS"));
        assert!(!out.contains("Minimum RSS"));
        // Paint stops above the status row
        assert!(!out[status_at..].contains(PAINT_CELL));
    }

    #[test]
    fn unchanged_frames_are_not_redrawn() {
        let mut canvas = canvas(Brush::Dots, 20, 10);
        let color = ColorValue::new(0, 254, 1);

        canvas.display.on_color_computed(color);
        let after_first = written(&canvas);
        canvas.display.on_color_computed(color);
        assert_eq!(written(&canvas), after_first);

        canvas.brush.send(Brush::Bar).unwrap();
        canvas.display.on_color_computed(color);
        let after_brush = written(&canvas);
        assert!(after_brush > after_first);

        canvas.status.set("Brush: bar");
        canvas.display.on_color_computed(color);
        assert!(written(&canvas) > after_brush);
    }

    #[test]
    fn resize_clears_and_repaints_at_the_new_size() {
        let mut canvas = canvas(Brush::Bar, 20, 10);
        let color = ColorValue::new(1, 254, 0);
        canvas.display.on_color_computed(color);
        let after_first = written(&canvas);

        canvas
            .size
            .send(CanvasSize {
                columns: 30,
                rows: 12,
            })
            .unwrap();
        canvas.display.on_color_computed(color);

        let out = String::from_utf8(canvas.display.writer()[after_first..].to_vec()).unwrap();
        assert!(out.starts_with("\x1b[2J"));
        assert!(out.contains(&PAINT_CELL.to_string().repeat(30)));
    }

    #[test]
    fn refresh_repaints_the_last_color_with_new_status() {
        let mut canvas = canvas(Brush::Spot, 20, 10);
        canvas.display.on_color_computed(ColorValue::new(255, 0, 0));
        let after_first = written(&canvas);

        canvas.status.set("Connection lost, reconnecting");
        canvas.display.refresh();

        let out = String::from_utf8(canvas.display.writer()[after_first..].to_vec()).unwrap();
        assert!(out.contains("\x1b[38;2;255;0;0m"));
        assert!(out.contains("Connection lost, reconnecting"));
    }
}
