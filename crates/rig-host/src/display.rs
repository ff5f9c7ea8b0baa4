//! Status displays the telemetry loop can render to.
//!
//! The variant is picked at runtime from configuration and handed around as
//! `Box<dyn StatusDisplay>`.

use anyhow::{bail, Result};
use log::{debug, info, warn};

use crate::config::DisplayKind;

const TARGET: &str = "telemetry";

/// Text pages on a 128x64 panel.
pub const PAGE_COUNT: usize = 8;

/// Characters per page with a 6 pixel wide font.
pub const PAGE_WIDTH: usize = 21;

/// Minimal text display: whole-page writes addressed by page number.
pub trait StatusDisplay: Send {
    fn init(&mut self) -> Result<()>;

    fn clear(&mut self) -> Result<()>;

    fn set_contrast(&mut self, level: u8) -> Result<()>;

    /// Replace the contents of `page` with `text`.
    fn write_text(&mut self, page: u8, text: &str) -> Result<()>;
}

impl<D: StatusDisplay + ?Sized> StatusDisplay for Box<D> {
    fn init(&mut self) -> Result<()> {
        (**self).init()
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }

    fn set_contrast(&mut self, level: u8) -> Result<()> {
        (**self).set_contrast(level)
    }

    fn write_text(&mut self, page: u8, text: &str) -> Result<()> {
        (**self).write_text(page, text)
    }
}

/// Writes every line to the log.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn init(&mut self) -> Result<()> {
        info!(target: TARGET, "status output on log");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_contrast(&mut self, _level: u8) -> Result<()> {
        Ok(())
    }

    fn write_text(&mut self, page: u8, text: &str) -> Result<()> {
        info!(target: TARGET, "[{}] {}", page, text);
        Ok(())
    }
}

/// In-memory text panel with the OLED's geometry.
#[derive(Debug, Default)]
pub struct TextPanel {
    pages: [String; PAGE_COUNT],
    contrast: u8,
    ready: bool,
}

impl TextPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, page: usize) -> &str {
        self.pages.get(page).map_or("", String::as_str)
    }

    pub fn contrast(&self) -> u8 {
        self.contrast
    }

    /// Non-empty pages, top to bottom.
    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.pages.iter().map(String::as_str).filter(|p| !p.is_empty())
    }
}

impl StatusDisplay for TextPanel {
    fn init(&mut self) -> Result<()> {
        self.ready = true;
        self.pages.iter_mut().for_each(String::clear);
        debug!(target: TARGET, "panel ready: {} pages x {} chars", PAGE_COUNT, PAGE_WIDTH);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if !self.ready {
            bail!("panel not initialized");
        }
        self.pages.iter_mut().for_each(String::clear);
        Ok(())
    }

    fn set_contrast(&mut self, level: u8) -> Result<()> {
        if !self.ready {
            bail!("panel not initialized");
        }
        self.contrast = level;
        Ok(())
    }

    fn write_text(&mut self, page: u8, text: &str) -> Result<()> {
        if !self.ready {
            bail!("panel not initialized");
        }
        let Some(slot) = self.pages.get_mut(page as usize) else {
            bail!("page {} out of range (0..{})", page, PAGE_COUNT);
        };
        // Anything past the right edge is dropped, as on the glass.
        *slot = text.chars().take(PAGE_WIDTH).collect();
        debug!(target: TARGET, "page {}: {}", page, slot);
        Ok(())
    }
}

/// Build the display for `kind`. A panel needs something to have answered
/// at an OLED address during the sweep; otherwise the log is used.
pub fn open_display(kind: DisplayKind, panel_detected: bool) -> Box<dyn StatusDisplay> {
    match kind {
        DisplayKind::Log => Box::new(LogDisplay),
        DisplayKind::Panel if panel_detected => Box::new(TextPanel::new()),
        DisplayKind::Panel => {
            warn!(target: TARGET, "no panel found on the bus, status goes to the log");
            Box::new(LogDisplay)
        }
    }
}
