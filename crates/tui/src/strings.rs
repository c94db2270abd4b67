// Centralized UI strings and labels.

use unicode_width::UnicodeWidthStr;

// Role prefixes; color applied in UI
pub const PREFIX_USER: &str = "| ";
pub const PREFIX_ASSISTANT: &str = "> ";

pub const INPUT_HINT: &str = "What's on your mind? 💭  Enter to send / Shift+Enter for newline";
pub const THINKING: &str = "✨ Thinking...";

pub const TITLE_MODELS: &str = " 🎀 Models 🎀 ";
pub const TITLE_CHAT: &str = " ✨ PINK AI · your pinky AI companion ✨ ";
pub const TITLE_INPUT: &str = " Input ";
pub const TITLE_HELP: &str = " Help / Shortcuts ";
pub const TITLE_PARAMS: &str = " Parameters ";

pub const GATED_NOTE: &str =
    "🎀 Quick note! You'll need access to use this model. Visit huggingface.co/meta-llama to get started! 💝";
pub const BUSY_NOTE: &str = "✨ Still thinking... wait for the reply before sending again.";
pub const CLEARED_NOTE: &str = "Chat cleared 🗑️";
pub const WORKER_STOPPED: &str = "generation worker stopped unexpectedly";

pub const STICK_BOTTOM: &str = "Bottom";

pub fn build_stick_label(scroll: u16) -> String {
    if scroll == 0 {
        STICK_BOTTOM.to_string()
    } else {
        format!("+{} lines", scroll)
    }
}

/// Status bar text, compacted to `max_width` by dropping trailing segments.
/// - model: selected display label
/// - knobs: pre-formatted parameter summary, e.g. "T:0.1 P:0.95"
#[allow(clippy::too_many_arguments)]
pub fn build_status_line(
    stick: &str,
    focus: &str,
    line_disp: u16,
    col_disp: u16,
    model: &str,
    knobs: &str,
    busy: bool,
    max_width: u16,
) -> String {
    let mut segments: Vec<String> = Vec::new();
    // Model first for narrow terminals
    segments.push(format!("[HF][{}]", model));
    if busy {
        segments.push(THINKING.to_string());
    }
    segments.push(format!("[{}][{}] L{} C{}", stick, focus, line_disp, col_disp));
    if !knobs.is_empty() {
        segments.push(knobs.to_string());
    }
    let hints: [&str; 6] = [
        "Enter: send; Shift+Enter: newline",
        "Tab: focus",
        "Ctrl+L: clear",
        "F2: models; F6: params",
        "PgUp/PgDn: scroll",
        "F1: help",
    ];
    for h in hints {
        segments.push(h.to_string());
    }

    let sep = "  |  ";
    let mut out = String::new();
    let mut used = 0usize;
    for (i, seg) in segments.iter().enumerate() {
        let segw = UnicodeWidthStr::width(seg.as_str());
        let addw = segw + if i == 0 { 0 } else { UnicodeWidthStr::width(sep) };
        if used + addw > max_width as usize {
            break;
        }
        if i > 0 {
            out.push_str(sep);
            used += UnicodeWidthStr::width(sep);
        }
        out.push_str(seg);
        used += segw;
    }
    out
}

pub fn help_lines() -> &'static [&'static str] {
    &[
        "Basic",
        "  Enter: Send    Shift+Enter: Newline    Esc/Ctrl-C: Quit",
        "  Ctrl+L: Clear chat    Tab: Cycle focus (input / models / parameters)",
        "Input Editing",
        "  Arrow: Move cursor    Backspace/Delete: Delete prev/next char",
        "  Home/End or Ctrl+A/E: Line start/end",
        "  Ctrl+Arrow: Word move    Ctrl+W: Delete prev word    Ctrl+U/K: Kill to line start/end",
        "Chat Scrolling",
        "  Mouse wheel: Scroll    PgUp/PgDn: Page    Ctrl+Up/Down: Fine scroll",
        "  Ctrl+Home/End: Top/bottom",
        "Models (F2 show/hide)",
        "  Up/Down: Choose model    Left/Right: Switch category    Mouse click: Choose",
        "Parameters (F6 show/hide)",
        "  Up/Down: Choose knob    Left/Right or -/+: Adjust    Space: Toggle sampling",
        "Help",
        "  F1: Open/close this panel",
    ]
}
