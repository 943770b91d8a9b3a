use std::io::{self, Write};

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use crossterm::{
    cursor,
    event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{Clear, ClearType},
};
use folio_core::{Command, FitMode, RenderImage};
use png::{BitDepth, ColorType, Encoder};

/// Base64 payload bytes per kitty graphics escape.
const CHUNK_SIZE: usize = 4096;

pub struct KittyRenderer<W: Write> {
    writer: W,
    image_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawParams {
    pub columns: u32,
    pub rows: u32,
}

impl DrawParams {
    pub fn clamped(columns: u32, rows: u32) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }
}

impl<W: Write> KittyRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            image_id: 1,
        }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Transmits and places `image`, replacing the previous page image.
    pub fn draw(&mut self, image: &RenderImage, params: DrawParams) -> Result<()> {
        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer, image.width, image.height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&image.pixels)?;
        writer.finish()?;

        let encoded = BASE64.encode(&buffer);
        let mut chunks = encoded.as_bytes().chunks(CHUNK_SIZE).peekable();
        let mut first = true;

        while let Some(chunk) = chunks.next() {
            let more = u8::from(chunks.peek().is_some());
            if first {
                write!(
                    self.writer,
                    "\u{1b}_Ga=T,f=100,C=1,q=2,i={},c={},r={},z=-1,m={}",
                    self.image_id, params.columns, params.rows, more
                )?;
                first = false;
            } else {
                write!(self.writer, "\u{1b}_Gm={},q=2", more)?;
            }
            self.writer.write_all(b";")?;
            self.writer.write_all(chunk)?;
            write!(self.writer, "\u{1b}\\")?;
        }

        self.writer.flush()?;
        Ok(())
    }

    pub fn delete_images(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}_Ga=d,d=A,q=2\u{1b}\\")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn begin_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026h")?;
        Ok(())
    }

    /// The terminal presents everything buffered since `begin_sync_update`.
    pub fn end_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026l")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<()> {
        crossterm::execute!(
            &mut self.writer,
            Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Command(Command),
    BeginSearch,
    SearchQueryChanged { query: String },
    SearchSubmit { query: String },
    SearchCancel,
    Resize,
    Quit,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Search,
}

/// Turns terminal events into viewer commands, vi-style with count prefixes.
#[derive(Debug)]
pub struct EventMapper {
    pending_count: Option<usize>,
    pending_digits: String,
    mode: InputMode,
    search_buffer: String,
    zoom_step: f32,
}

impl Default for EventMapper {
    fn default() -> Self {
        Self {
            pending_count: None,
            pending_digits: String::new(),
            mode: InputMode::Normal,
            search_buffer: String::new(),
            zoom_step: Self::DEFAULT_ZOOM_STEP,
        }
    }
}

impl EventMapper {
    pub const DEFAULT_ZOOM_STEP: f32 = 1.1;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zoom_step(mut self, zoom_step: f32) -> Self {
        if zoom_step.is_finite() && zoom_step > 1.0 {
            self.zoom_step = zoom_step;
        }
        self
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        if self.mode != mode {
            self.reset_count();
            self.search_buffer.clear();
            self.mode = mode;
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn map_event(&mut self, event: Event) -> UiEvent {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => match self.mode {
                InputMode::Normal => self.map_key_normal(key),
                InputMode::Search => self.map_key_search(key),
            },
            Event::Resize(..) => UiEvent::Resize,
            _ => UiEvent::None,
        }
    }

    fn map_key_normal(&mut self, key: KeyEvent) -> UiEvent {
        let KeyEvent {
            code, modifiers, ..
        } = key;
        let shifted = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
        match (code, modifiers) {
            (KeyCode::Char(c), KeyModifiers::NONE) if c.is_ascii_digit() => {
                if let Some(digit) = c.to_digit(10) {
                    self.push_digit(digit as usize);
                }
                UiEvent::None
            }
            (KeyCode::Char('c'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                self.reset_count();
                UiEvent::Quit
            }
            (KeyCode::Char('j'), KeyModifiers::NONE)
            | (KeyCode::Char(' '), KeyModifiers::NONE)
            | (KeyCode::Down, KeyModifiers::NONE)
            | (KeyCode::PageDown, _) => {
                let count = self.take_count();
                UiEvent::Command(Command::NextPage { count })
            }
            (KeyCode::Char('k'), KeyModifiers::NONE)
            | (KeyCode::Up, KeyModifiers::NONE)
            | (KeyCode::PageUp, _) => {
                let count = self.take_count();
                UiEvent::Command(Command::PrevPage { count })
            }
            (KeyCode::Char('g'), KeyModifiers::NONE) | (KeyCode::Home, _) => {
                match self.take_explicit_count() {
                    Some(page) => UiEvent::Command(Command::GotoPage { page }),
                    None => UiEvent::Command(Command::FirstPage),
                }
            }
            (KeyCode::Char('G'), _) if shifted => match self.take_explicit_count() {
                Some(page) => UiEvent::Command(Command::GotoPage { page }),
                None => UiEvent::Command(Command::LastPage),
            },
            (KeyCode::End, _) => {
                self.reset_count();
                UiEvent::Command(Command::LastPage)
            }
            (KeyCode::Char('+'), _) => {
                self.reset_count();
                UiEvent::Command(Command::ZoomBy {
                    factor: self.zoom_step,
                })
            }
            (KeyCode::Char('-'), _) => {
                self.reset_count();
                UiEvent::Command(Command::ZoomBy {
                    factor: 1.0 / self.zoom_step,
                })
            }
            (KeyCode::Char('='), _) => {
                self.reset_count();
                UiEvent::Command(Command::SetZoom { zoom: 1.0 })
            }
            (KeyCode::Char('r'), KeyModifiers::NONE) => {
                self.reset_count();
                UiEvent::Command(Command::Rotate)
            }
            (KeyCode::Char('w'), KeyModifiers::NONE) => self.fit(FitMode::Width),
            (KeyCode::Char('p'), KeyModifiers::NONE) => self.fit(FitMode::Page),
            (KeyCode::Char('a'), KeyModifiers::NONE) => self.fit(FitMode::Actual),
            (KeyCode::Char('t'), KeyModifiers::NONE) => {
                self.reset_count();
                UiEvent::Command(Command::CycleTheme)
            }
            (KeyCode::Char('c'), KeyModifiers::NONE) => {
                self.reset_count();
                UiEvent::Command(Command::ToggleCaseSensitive)
            }
            (KeyCode::Char('/'), KeyModifiers::NONE) => {
                self.set_mode(InputMode::Search);
                UiEvent::BeginSearch
            }
            (KeyCode::Char('n'), KeyModifiers::NONE) => {
                let count = self.take_count();
                UiEvent::Command(Command::NextMatch { count })
            }
            (KeyCode::Char('N'), _) if shifted => {
                let count = self.take_count();
                UiEvent::Command(Command::PrevMatch { count })
            }
            (KeyCode::Esc, _) => {
                self.reset_count();
                UiEvent::Command(Command::ClearSearch)
            }
            (KeyCode::Char('q'), _) => {
                self.reset_count();
                UiEvent::Quit
            }
            _ => {
                self.reset_count();
                UiEvent::None
            }
        }
    }

    fn map_key_search(&mut self, key: KeyEvent) -> UiEvent {
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => {
                self.set_mode(InputMode::Normal);
                UiEvent::SearchCancel
            }
            (KeyCode::Enter, _) => {
                let query = std::mem::take(&mut self.search_buffer);
                self.set_mode(InputMode::Normal);
                UiEvent::SearchSubmit { query }
            }
            (KeyCode::Backspace, _) => {
                self.search_buffer.pop();
                UiEvent::SearchQueryChanged {
                    query: self.search_buffer.clone(),
                }
            }
            (KeyCode::Char(c), mods) if mods.is_empty() || mods == KeyModifiers::SHIFT => {
                self.search_buffer.push(c);
                UiEvent::SearchQueryChanged {
                    query: self.search_buffer.clone(),
                }
            }
            _ => UiEvent::None,
        }
    }

    fn fit(&mut self, mode: FitMode) -> UiEvent {
        self.reset_count();
        UiEvent::Command(Command::SetFitMode { mode })
    }

    fn push_digit(&mut self, digit: usize) {
        let current = self.pending_count.unwrap_or(0);
        self.pending_count = Some(current.saturating_mul(10).saturating_add(digit));
        if let Some(c) = char::from_digit(digit as u32, 10) {
            self.pending_digits.push(c);
        }
    }

    fn take_count(&mut self) -> usize {
        self.take_explicit_count().unwrap_or(1)
    }

    fn take_explicit_count(&mut self) -> Option<usize> {
        self.pending_digits.clear();
        self.pending_count.take().filter(|&count| count > 0)
    }

    fn reset_count(&mut self) {
        self.pending_count = None;
        self.pending_digits.clear();
    }

    /// Partially typed input for the status line: a count prefix or the
    /// search prompt.
    pub fn pending_input(&self) -> Option<String> {
        match self.mode {
            InputMode::Search => Some(format!("/{}", self.search_buffer)),
            InputMode::Normal if !self.pending_digits.is_empty() => {
                Some(self.pending_digits.clone())
            }
            InputMode::Normal => None,
        }
    }
}

pub fn write_status_line<W: Write>(writer: &mut W, label: &str, width: usize) -> io::Result<()> {
    let visible: String = label.chars().take(width).collect();
    write!(writer, "{}", visible)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key_event(code: KeyCode) -> Event {
        key_event_with_modifiers(code, KeyModifiers::NONE)
    }

    fn key_event_with_modifiers(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_digits(mapper: &mut EventMapper, digits: &str) {
        for c in digits.chars() {
            assert_eq!(mapper.map_event(key_event(KeyCode::Char(c))), UiEvent::None);
        }
    }

    #[test]
    fn kitty_draw_emits_chunked_protocol() {
        let mut renderer = KittyRenderer::new(Vec::new());
        let mut seed = 0x2545_f491_u32;
        let pixels = (0..128 * 128 * 4)
            .map(|_| {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (seed >> 24) as u8
            })
            .collect();
        let image = RenderImage {
            width: 128,
            height: 128,
            pixels,
        };

        renderer.draw(&image, DrawParams::clamped(10, 0)).unwrap();
        let output = String::from_utf8(renderer.writer).unwrap();
        assert!(output.starts_with("\u{1b}_Ga=T,f=100"));
        assert!(output.contains(",c=10,r=1,"));
        assert!(output.ends_with("\u{1b}\\"));
        let escapes = output.matches("\u{1b}_G").count();
        assert!(escapes > 1, "expected a chunked transfer");
        assert_eq!(output.matches("m=0").count(), 1);
    }

    #[test]
    fn numeric_prefix_repeats_page_moves() {
        let mut mapper = EventMapper::new();
        type_digits(&mut mapper, "12");
        assert_eq!(mapper.pending_input().as_deref(), Some("12"));

        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('j'))),
            UiEvent::Command(Command::NextPage { count: 12 })
        );
        assert!(mapper.pending_input().is_none());
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('k'))),
            UiEvent::Command(Command::PrevPage { count: 1 })
        );
    }

    #[test]
    fn prefix_is_dropped_by_unrelated_keys() {
        let mut mapper = EventMapper::new();
        type_digits(&mut mapper, "4");
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('r'))),
            UiEvent::Command(Command::Rotate)
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Down)),
            UiEvent::Command(Command::NextPage { count: 1 })
        );
    }

    #[test]
    fn g_and_shift_g_jump_to_ends_or_counted_page() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('g'))),
            UiEvent::Command(Command::FirstPage)
        );
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('G'),
                KeyModifiers::SHIFT
            )),
            UiEvent::Command(Command::LastPage)
        );

        type_digits(&mut mapper, "7");
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('G'),
                KeyModifiers::SHIFT
            )),
            UiEvent::Command(Command::GotoPage { page: 7 })
        );
        type_digits(&mut mapper, "3");
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('g'))),
            UiEvent::Command(Command::GotoPage { page: 3 })
        );
    }

    #[test]
    fn zoom_keys_use_configured_step() {
        let mut mapper = EventMapper::new().with_zoom_step(1.25);
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('+'))),
            UiEvent::Command(Command::ZoomBy { factor: 1.25 })
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('-'))),
            UiEvent::Command(Command::ZoomBy { factor: 0.8 })
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('='))),
            UiEvent::Command(Command::SetZoom { zoom: 1.0 })
        );
    }

    #[test]
    fn invalid_zoom_step_keeps_default() {
        let mut mapper = EventMapper::new().with_zoom_step(0.5);
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('+'))),
            UiEvent::Command(Command::ZoomBy {
                factor: EventMapper::DEFAULT_ZOOM_STEP
            })
        );
    }

    #[test]
    fn letter_shortcuts_map_to_view_commands() {
        let mut mapper = EventMapper::new();
        let cases = [
            ('w', Command::SetFitMode { mode: FitMode::Width }),
            ('p', Command::SetFitMode { mode: FitMode::Page }),
            ('a', Command::SetFitMode { mode: FitMode::Actual }),
            ('t', Command::CycleTheme),
            ('c', Command::ToggleCaseSensitive),
        ];
        for (key, command) in cases {
            assert_eq!(
                mapper.map_event(key_event(KeyCode::Char(key))),
                UiEvent::Command(command)
            );
        }
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('q'))), UiEvent::Quit);
    }

    #[test]
    fn n_and_shift_n_step_through_matches() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('n'))),
            UiEvent::Command(Command::NextMatch { count: 1 })
        );
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('N'),
                KeyModifiers::SHIFT
            )),
            UiEvent::Command(Command::PrevMatch { count: 1 })
        );
        type_digits(&mut mapper, "3");
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('n'))),
            UiEvent::Command(Command::NextMatch { count: 3 })
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Esc)),
            UiEvent::Command(Command::ClearSearch)
        );
    }

    #[test]
    fn slash_enters_search_mode_and_collects_query() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('/'))),
            UiEvent::BeginSearch
        );
        assert_eq!(mapper.mode(), InputMode::Search);
        assert_eq!(mapper.pending_input().as_deref(), Some("/"));

        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('f'))),
            UiEvent::SearchQueryChanged {
                query: "f".to_owned()
            }
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Backspace)),
            UiEvent::SearchQueryChanged {
                query: String::new()
            }
        );
        for c in "Fox".chars() {
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char(c),
                if c.is_uppercase() {
                    KeyModifiers::SHIFT
                } else {
                    KeyModifiers::NONE
                },
            ));
        }
        assert_eq!(mapper.pending_input().as_deref(), Some("/Fox"));

        assert_eq!(
            mapper.map_event(key_event(KeyCode::Enter)),
            UiEvent::SearchSubmit {
                query: "Fox".to_owned()
            }
        );
        assert_eq!(mapper.mode(), InputMode::Normal);
        assert!(mapper.pending_input().is_none());
    }

    #[test]
    fn escape_cancels_search_input() {
        let mut mapper = EventMapper::new();
        mapper.map_event(key_event(KeyCode::Char('/')));
        mapper.map_event(key_event(KeyCode::Char('x')));
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Esc)),
            UiEvent::SearchCancel
        );
        assert_eq!(mapper.mode(), InputMode::Normal);
        mapper.map_event(key_event(KeyCode::Char('/')));
        assert_eq!(mapper.pending_input().as_deref(), Some("/"));
    }

    #[test]
    fn resize_and_release_events() {
        let mut mapper = EventMapper::new();
        assert_eq!(mapper.map_event(Event::Resize(80, 24)), UiEvent::Resize);
        let release = Event::Key(KeyEvent {
            code: KeyCode::Char('j'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(mapper.map_event(release), UiEvent::None);
    }

    #[test]
    fn status_line_is_truncated_to_width() {
        let mut out = Vec::new();
        write_status_line(&mut out, "page 1/10 | 100%", 9).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "page 1/10");
    }
}
