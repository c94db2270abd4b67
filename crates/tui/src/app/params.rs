use crossterm::event::{KeyCode, KeyEvent};
use pink_core::params::LengthBounds;
use pink_core::Param;
use tracing::debug;

use super::App;

impl App {
    pub fn selected_param(&self) -> Param {
        Param::ALL[self.params_cursor.min(Param::ALL.len() - 1)]
    }

    /// One-line knob summary for the status bar.
    pub fn knob_summary(&self) -> String {
        let p = self.session.params();
        format!(
            "S:{} T:{} P:{} K:{} Len:{} Rep:{}",
            p.display(Param::Sample),
            p.display(Param::Temperature),
            p.display(Param::TopP),
            p.display(Param::TopK),
            p.effective_max_new_tokens(self.model()),
            p.display(Param::RepetitionPenalty),
        )
    }

    /// Range hint for the selected knob.
    pub fn param_hint(&self) -> String {
        use pink_core::params::{REPETITION_PENALTY, TEMPERATURE, TOP_K, TOP_P};
        match self.selected_param() {
            Param::Sample => "Space: toggle".to_string(),
            Param::Temperature => format!(
                "{}..{} step {}",
                TEMPERATURE.min, TEMPERATURE.max, TEMPERATURE.step
            ),
            Param::TopP => format!("{}..{} step {}", TOP_P.min, TOP_P.max, TOP_P.step),
            Param::TopK => format!("{}..{} step {}", TOP_K.min, TOP_K.max, TOP_K.step),
            Param::MaxNewTokens => {
                let b = LengthBounds::for_entry(self.model());
                format!("{}..{} step {}", b.min, b.max, b.step)
            }
            Param::RepetitionPenalty => format!(
                "{}..{} step {}",
                REPETITION_PENALTY.min, REPETITION_PENALTY.max, REPETITION_PENALTY.step
            ),
        }
    }

    fn adjust(&mut self, steps: i32) {
        let param = self.selected_param();
        self.session.nudge(param, steps);
        debug!(
            target: "tui",
            "param {} -> {}",
            param.label(),
            self.session.params().display(param)
        );
    }

    pub(super) fn on_params_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.params_cursor = self.params_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.params_cursor = (self.params_cursor + 1).min(Param::ALL.len() - 1)
            }
            KeyCode::Left | KeyCode::Char('-') => self.adjust(-1),
            KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => self.adjust(1),
            KeyCode::Char(' ') => {
                self.session.nudge(Param::Sample, 1);
            }
            _ => {}
        }
    }
}
