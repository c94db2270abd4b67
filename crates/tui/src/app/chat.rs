use pink_core::Role;
use textwrap::{wrap, Options};
use unicode_width::UnicodeWidthStr;

use crate::strings::{PREFIX_ASSISTANT, PREFIX_USER, THINKING};

use super::App;

#[derive(Clone, Debug)]
pub struct WrappedMsg {
    pub role: Role,
    pub lines: Vec<String>,
}

pub fn prefix_for(role: Role) -> &'static str {
    match role {
        Role::User => PREFIX_USER,
        Role::Assistant => PREFIX_ASSISTANT,
    }
}

impl App {
    /// Rewraps committed turns when the width or turn count changes; the
    /// pending tail (preview or placeholder) is rewrapped every call.
    pub fn ensure_chat_wrapped(&mut self, width: u16) {
        let width = width.max(1);
        let turns = self.session.conversation().turns();
        if self.chat_wrap_width != width || self.chat_cache.len() != turns.len() {
            self.chat_cache = turns
                .iter()
                .map(|t| wrap_message(t.role, &t.content, width))
                .collect();
            self.chat_wrap_width = width;
        }
        self.chat_tail = self
            .pending_tail()
            .map(|text| wrap_message(Role::Assistant, text, width));
        self.chat_total_lines = self.chat_cache.iter().map(|w| w.lines.len()).sum::<usize>()
            + self.chat_tail.as_ref().map(|w| w.lines.len()).unwrap_or(0);
    }

    /// Text shown after the last turn while a reply is outstanding.
    pub fn pending_tail(&self) -> Option<&str> {
        if !self.session.is_busy() {
            return None;
        }
        Some(
            self.preview
                .as_deref()
                .filter(|p| !p.is_empty())
                .unwrap_or(THINKING),
        )
    }

    /// Returns `(viewport, max_scroll, start_offset, total)` and clamps the
    /// scroll position. `chat_scroll` counts lines up from the bottom.
    pub fn compute_chat_layout(&mut self, inner_height: u16) -> (usize, usize, usize, usize) {
        let viewport = inner_height as usize;
        let total = self.chat_total_lines;
        let max_scroll = total.saturating_sub(viewport);
        if self.stick_to_bottom {
            self.chat_scroll = 0;
        }
        if self.chat_scroll as usize > max_scroll {
            self.chat_scroll = max_scroll.min(u16::MAX as usize) as u16;
        }
        let start_offset = max_scroll - self.chat_scroll as usize;
        (viewport, max_scroll, start_offset, total)
    }

    /// Positive deltas scroll toward older lines.
    pub fn scroll_chat(&mut self, delta: i32) {
        if delta >= 0 {
            self.chat_scroll = self.chat_scroll.saturating_add(delta as u16);
            if delta > 0 {
                self.stick_to_bottom = false;
            }
        } else {
            self.chat_scroll = self.chat_scroll.saturating_sub(delta.unsigned_abs() as u16);
        }
        if self.chat_scroll == 0 {
            self.stick_to_bottom = true;
        }
    }
}

fn wrap_message(role: Role, content: &str, width: u16) -> WrappedMsg {
    let prefix = prefix_for(role);
    let full = format!("{}{}", prefix, content);
    let indent = " ".repeat(UnicodeWidthStr::width(prefix));
    let opts = Options::new(width as usize).subsequent_indent(&indent);
    let lines = wrap(&full, opts)
        .into_iter()
        .map(|c| c.into_owned())
        .collect::<Vec<_>>();
    WrappedMsg { role, lines }
}
