use crossterm::event::{KeyCode, KeyEvent};
use pink_core::ModelEntry;
use tracing::info;

use super::App;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SidebarRow<'a> {
    Category(&'a str),
    Model(&'a ModelEntry),
}

impl App {
    pub fn current_category(&self) -> &'static str {
        let registry: &'static _ = self.registry;
        registry
            .categories()
            .get(self.category)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Category headers followed by their models, in registry order.
    pub fn sidebar_rows(&self) -> Vec<SidebarRow<'static>> {
        let registry = self.registry;
        let mut rows = Vec::new();
        for cat in registry.categories() {
            rows.push(SidebarRow::Category(cat.as_str()));
            for e in registry.entries().iter().filter(|e| e.category == *cat) {
                rows.push(SidebarRow::Model(e));
            }
        }
        rows
    }

    pub fn selected_row(&self) -> Option<usize> {
        let label = &self.model().label;
        self.sidebar_rows()
            .iter()
            .position(|r| matches!(r, SidebarRow::Model(e) if e.label == *label))
    }

    pub fn choose_model(&mut self, entry: &ModelEntry) {
        if entry.label == self.model().label {
            return;
        }
        info!(
            target: "tui",
            "model selected: {} ({}) gated={}",
            entry.label,
            entry.backend_id,
            entry.is_gated()
        );
        if let Some(i) = self
            .registry
            .categories()
            .iter()
            .position(|c| *c == entry.category)
        {
            self.category = i;
        }
        self.session.select_model(entry.clone());
        self.notice = None;
        self.ensure_sidebar_visible();
    }

    fn step_model(&mut self, delta: i32) {
        let registry = self.registry;
        let labels = registry.labels(self.current_category());
        if labels.is_empty() {
            return;
        }
        let pos = labels
            .iter()
            .position(|l| *l == self.model().label)
            .unwrap_or(0) as i32;
        let next = (pos + delta).clamp(0, labels.len() as i32 - 1) as usize;
        if let Some(entry) = registry.entry(labels[next]) {
            self.choose_model(entry);
        }
    }

    /// Moves to the neighbouring category and selects the current label if it
    /// lives there, otherwise that category's first model.
    pub fn switch_category(&mut self, delta: i32) {
        let registry = self.registry;
        let n = registry.categories().len() as i32;
        if n == 0 {
            return;
        }
        self.category = (self.category as i32 + delta).rem_euclid(n) as usize;
        let label = self.model().label.clone();
        if let Some(entry) = registry.select(self.current_category(), &label) {
            self.choose_model(entry);
        }
    }

    /// `row` is relative to the first visible line inside the border.
    pub fn sidebar_click(&mut self, row: usize) {
        let idx = self.sidebar_scroll as usize + row;
        match self.sidebar_rows().get(idx).copied() {
            Some(SidebarRow::Model(entry)) => self.choose_model(entry),
            Some(SidebarRow::Category(cat)) => {
                if let Some(i) = self.registry.categories().iter().position(|c| c == cat) {
                    self.switch_category(i as i32 - self.category as i32);
                }
            }
            None => {}
        }
    }

    pub fn sidebar_inner_height(&self) -> u16 {
        self.sidebar_area
            .map(|a| a.height.saturating_sub(2))
            .unwrap_or(0)
    }

    pub fn sidebar_max_scroll(&self) -> u16 {
        let total = self.sidebar_rows().len() as u16;
        total.saturating_sub(self.sidebar_inner_height())
    }

    pub fn ensure_sidebar_visible(&mut self) {
        let h = self.sidebar_inner_height();
        if h == 0 {
            return;
        }
        let Some(sel) = self.selected_row() else {
            return;
        };
        let sel = sel as u16;
        if sel < self.sidebar_scroll {
            self.sidebar_scroll = sel;
        } else if sel >= self.sidebar_scroll + h {
            self.sidebar_scroll = sel + 1 - h;
        }
    }

    pub(super) fn on_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.step_model(-1),
            KeyCode::Down => self.step_model(1),
            KeyCode::Left => self.switch_category(-1),
            KeyCode::Right => self.switch_category(1),
            KeyCode::Home => self.step_model(i32::MIN / 2),
            KeyCode::End => self.step_model(i32::MAX / 2),
            _ => {}
        }
    }
}
