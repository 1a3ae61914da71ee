//! Interactive mode: a raw-mode line editor that searches as you type.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};

use crate::controller::{Phase, SearchController};

const PROMPT: &str = "username> ";

/// Longest the loop sleeps without checking for finished lookups.
const IDLE_TICK: Duration = Duration::from_millis(50);

/// What a key press asks the event loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// The text changed.
    Edited,
    /// Search now.
    Submit,
    /// Leave interactive mode.
    Quit,
    /// Nothing to do.
    Ignored,
}

/// Single-line text input with a cursor (byte offset, always on a char
/// boundary).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TextInput {
    text: String,
    cursor: usize,
}

impl TextInput {
    /// Input pre-filled with `text`, cursor at the end.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.len(),
        }
    }

    /// Current text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Apply a key press.
    pub fn handle_key(&mut self, key: KeyEvent) -> KeyAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => KeyAction::Quit,
            KeyCode::Char('c' | 'd') if ctrl => KeyAction::Quit,
            KeyCode::Char('u') if ctrl => {
                if self.text.is_empty() {
                    return KeyAction::Ignored;
                }
                self.text.clear();
                self.cursor = 0;
                KeyAction::Edited
            }
            KeyCode::Char(_) if ctrl => KeyAction::Ignored,
            KeyCode::Char(c) => {
                self.text.insert(self.cursor, c);
                self.cursor += c.len_utf8();
                KeyAction::Edited
            }
            KeyCode::Backspace => match self.prev_boundary() {
                Some(prev) => {
                    self.text.drain(prev..self.cursor);
                    self.cursor = prev;
                    KeyAction::Edited
                }
                None => KeyAction::Ignored,
            },
            KeyCode::Delete => match self.next_boundary() {
                Some(next) => {
                    self.text.drain(self.cursor..next);
                    KeyAction::Edited
                }
                None => KeyAction::Ignored,
            },
            KeyCode::Left => {
                if let Some(prev) = self.prev_boundary() {
                    self.cursor = prev;
                }
                KeyAction::Ignored
            }
            KeyCode::Right => {
                if let Some(next) = self.next_boundary() {
                    self.cursor = next;
                }
                KeyAction::Ignored
            }
            KeyCode::Home => {
                self.cursor = 0;
                KeyAction::Ignored
            }
            KeyCode::End => {
                self.cursor = self.text.len();
                KeyAction::Ignored
            }
            KeyCode::Enter => KeyAction::Submit,
            _ => KeyAction::Ignored,
        }
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.text[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.text[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    fn cursor_column(&self) -> usize {
        self.text[..self.cursor].chars().count()
    }
}

/// The lines making up one frame: prompt, status, then the results.
#[must_use]
pub fn screen_lines(controller: &SearchController, input: &TextInput) -> Vec<String> {
    let status = match (controller.notice(), controller.phase()) {
        (Some(notice), _) => notice.to_string(),
        (None, Phase::InFlight) => "searching...".to_string(),
        (None, _) => String::new(),
    };
    let mut lines = vec![format!("{PROMPT}{}", crate::render::escape(input.text())), status];
    lines.extend(controller.display().to_string().lines().map(str::to_string));
    lines
}

/// Run the interactive search until the user quits.
///
/// # Errors
///
/// Returns any terminal I/O error; the terminal is restored either way.
pub fn run(controller: &mut SearchController) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let result = run_loop(&mut stdout, controller);
    restore(&mut stdout, result, disable_raw_mode)
}

/// Leave raw mode and the alternate screen. Both steps run even if one
/// fails; the loop's own error wins over teardown errors.
fn restore(
    out: &mut impl Write,
    result: io::Result<()>,
    leave_raw_mode: impl FnOnce() -> io::Result<()>,
) -> io::Result<()> {
    let raw = leave_raw_mode();
    let screen = execute!(out, LeaveAlternateScreen);
    result.and(raw).and(screen)
}

fn run_loop(out: &mut impl Write, controller: &mut SearchController) -> io::Result<()> {
    let mut input = TextInput::new(controller.input());
    draw(out, controller, &input)?;

    loop {
        let timeout = controller
            .next_wakeup()
            .map_or(IDLE_TICK, |at| at.saturating_duration_since(Instant::now()))
            .min(IDLE_TICK);

        let mut dirty = false;
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    match input.handle_key(key) {
                        KeyAction::Quit => return Ok(()),
                        KeyAction::Edited => controller.on_input(input.text(), Instant::now()),
                        KeyAction::Submit => controller.submit(),
                        KeyAction::Ignored => {}
                    }
                    dirty = true;
                }
                Event::Resize(..) => dirty = true,
                _ => {}
            }
        }

        dirty |= controller.poll(Instant::now());
        if dirty {
            draw(out, controller, &input)?;
        }
    }
}

fn draw(out: &mut impl Write, controller: &SearchController, input: &TextInput) -> io::Result<()> {
    for (row, line) in screen_lines(controller, input).iter().enumerate() {
        let row = u16::try_from(row).unwrap_or(u16::MAX);
        queue!(out, MoveTo(0, row), Clear(ClearType::CurrentLine), Print(line))?;
    }
    queue!(out, Print("\r\n"), Clear(ClearType::FromCursorDown))?;

    let column = PROMPT.len() + input.cursor_column();
    queue!(out, MoveTo(u16::try_from(column).unwrap_or(u16::MAX), 0))?;
    out.flush()
}
