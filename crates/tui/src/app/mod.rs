use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use once_cell::sync::Lazy;
use pink_core::dispatch::error_message;
use pink_core::{
    ApiToken, ChatSession, ConfigError, Dispatcher, GenerateError, ModelEntry, ModelRegistry,
    PendingReply, PromptBuilder, SessionError, Turn,
};
use providers::hf::{HfClient, HfConfig};
use ratatui::layout::Rect;
use tracing::{error, info, warn};

use crate::strings::{BUSY_NOTE, CLEARED_NOTE, GATED_NOTE, WORKER_STOPPED};

pub mod chat;
pub mod input;
pub mod params;
pub mod sidebar;

pub use chat::WrappedMsg;
use input::InputBuffer;

pub static REGISTRY: Lazy<ModelRegistry> = Lazy::new(ModelRegistry::builtin);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Input,
    Sidebar,
    Params,
}

impl Focus {
    pub fn label(&self) -> &'static str {
        match self {
            Focus::Input => "Input",
            Focus::Sidebar => "Models",
            Focus::Params => "Params",
        }
    }
}

/// Messages from the generation worker thread.
#[derive(Debug)]
pub enum LlmEvent {
    Delta(String),
    Done(Turn),
}

pub struct App {
    pub session: ChatSession,
    pub registry: &'static ModelRegistry,
    /// Index into `registry.categories()` browsed by the sidebar.
    pub category: usize,
    pub input: InputBuffer,
    pub focus: Focus,
    pub params_cursor: usize,
    /// Streamed text of the reply in flight. Never part of the conversation.
    pub preview: Option<String>,
    pub notice: Option<String>,
    pub llm_rx: Option<Receiver<LlmEvent>>,
    pub should_quit: bool,
    pub show_sidebar: bool,
    pub show_help: bool,
    pub show_params: bool,
    pub dirty: bool,
    pub chat_area: Option<Rect>,
    pub sidebar_area: Option<Rect>,
    pub sidebar_scroll: u16,
    pub chat_scroll: u16,
    pub stick_to_bottom: bool,
    pub chat_viewport: u16,
    pub chat_wrap_width: u16,
    pub chat_cache: Vec<WrappedMsg>,
    pub chat_tail: Option<WrappedMsg>,
    pub chat_total_lines: usize,
    pub input_visible_lines: u16,
    pub input_max_lines: u16,
}

impl App {
    pub fn new() -> Self {
        match HfConfig::from_env_and_file() {
            Ok(cfg) => Self::with_config(Some(&cfg)),
            Err(e) => {
                warn!(target: "tui", "config unavailable at startup: {:#}", e);
                let mut app = Self::with_config(None);
                app.notice = Some(format!("config: {:#}", e));
                app
            }
        }
    }

    pub fn with_config(cfg: Option<&HfConfig>) -> Self {
        let registry: &'static ModelRegistry = &REGISTRY;
        let entry = cfg
            .and_then(|c| match (&c.default_category, &c.default_model) {
                (Some(cat), model) => registry.select(cat, model.as_deref().unwrap_or("")),
                (None, Some(model)) => registry.entry(model),
                (None, None) => None,
            })
            .unwrap_or_else(|| registry.default_entry())
            .clone();
        let prompt = match cfg.and_then(|c| c.system_prompt.clone()) {
            Some(system) => PromptBuilder::with_system(system),
            None => PromptBuilder::new(),
        };
        let category = registry
            .categories()
            .iter()
            .position(|c| *c == entry.category)
            .unwrap_or(0);
        info!(target: "tui", "initial model={} category={}", entry.label, entry.category);
        Self {
            session: ChatSession::with_prompt(entry, prompt),
            registry,
            category,
            input: InputBuffer::default(),
            focus: Focus::Input,
            params_cursor: 0,
            preview: None,
            notice: None,
            llm_rx: None,
            should_quit: false,
            show_sidebar: true,
            show_help: false,
            show_params: false,
            dirty: true,
            chat_area: None,
            sidebar_area: None,
            sidebar_scroll: 0,
            chat_scroll: 0,
            stick_to_bottom: true,
            chat_viewport: 0,
            chat_wrap_width: 0,
            chat_cache: Vec::new(),
            chat_tail: None,
            chat_total_lines: 0,
            input_visible_lines: 1,
            input_max_lines: 6,
        }
    }

    pub fn model(&self) -> &ModelEntry {
        self.session.model()
    }

    /// Persistent note for the selected model, shown under the chat.
    pub fn model_note(&self) -> Option<&'static str> {
        self.model().is_gated().then_some(GATED_NOTE)
    }

    pub fn insert_text(&mut self, s: &str) {
        if matches!(self.focus, Focus::Input) {
            self.input.insert_text(s);
        }
    }

    /// Reads credentials fresh for each send so a token added while the UI
    /// is open is picked up.
    pub fn submit(&mut self) {
        if self.input.text.trim().is_empty() {
            return;
        }
        if self.session.is_busy() {
            self.notice = Some(BUSY_NOTE.to_string());
            return;
        }
        match HfConfig::from_env_and_file() {
            Ok(cfg) => self.submit_with(cfg),
            Err(e) => {
                error!(target: "tui", "submit config error: {:#}", e);
                self.notice = Some(format!("config: {:#}", e));
            }
        }
    }

    pub fn submit_with(&mut self, cfg: HfConfig) {
        let Some(token) = cfg.api_token.clone() else {
            warn!(target: "tui", "submit refused: no api token configured");
            self.notice = Some(ConfigError::MissingCredential.to_string());
            return;
        };
        let text = self.input.text.clone();
        let pending = match self.session.prepare(&text) {
            Ok(p) => p,
            Err(SessionError::Busy) => {
                self.notice = Some(BUSY_NOTE.to_string());
                return;
            }
            Err(e) => {
                self.notice = Some(e.to_string());
                return;
            }
        };
        info!(
            target: "tui",
            "submit: model={} stream={} input_len={}",
            pending.entry.label,
            cfg.stream,
            text.len()
        );
        self.input.take();
        self.notice = None;
        self.preview = None;
        let (tx, rx) = mpsc::channel::<LlmEvent>();
        self.llm_rx = Some(rx);
        std::thread::spawn(move || run_worker(cfg, token, pending, tx));
        self.stick_to_bottom = true;
        self.chat_scroll = 0;
        self.dirty = true;
    }

    pub fn clear_chat(&mut self) {
        match self.session.clear() {
            Ok(()) => {
                info!(target: "tui", "chat cleared");
                self.chat_wrap_width = 0;
                self.chat_scroll = 0;
                self.stick_to_bottom = true;
                self.notice = Some(CLEARED_NOTE.to_string());
            }
            Err(_) => self.notice = Some(BUSY_NOTE.to_string()),
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.dirty = true;

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?')) {
                self.show_help = false;
            }
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => {
                self.should_quit = true;
                return;
            }
            KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('l') if ctrl => {
                self.clear_chat();
                return;
            }
            KeyCode::F(1) => {
                self.show_help = true;
                return;
            }
            KeyCode::F(2) => {
                self.show_sidebar = !self.show_sidebar;
                if !self.show_sidebar && self.focus == Focus::Sidebar {
                    self.focus = Focus::Input;
                }
                return;
            }
            KeyCode::F(6) => {
                self.show_params = !self.show_params;
                if !self.show_params && self.focus == Focus::Params {
                    self.focus = Focus::Input;
                }
                return;
            }
            KeyCode::Tab => {
                self.cycle_focus();
                return;
            }
            KeyCode::PageUp => {
                self.scroll_chat(self.chat_viewport.max(1) as i32);
                return;
            }
            KeyCode::PageDown => {
                self.scroll_chat(-(self.chat_viewport.max(1) as i32));
                return;
            }
            KeyCode::Up if ctrl => {
                self.scroll_chat(1);
                return;
            }
            KeyCode::Down if ctrl => {
                self.scroll_chat(-1);
                return;
            }
            KeyCode::Home if ctrl => {
                self.chat_scroll = u16::MAX;
                self.stick_to_bottom = false;
                return;
            }
            KeyCode::End if ctrl => {
                self.chat_scroll = 0;
                self.stick_to_bottom = true;
                return;
            }
            _ => {}
        }

        match self.focus {
            Focus::Input => self.on_input_key(key),
            Focus::Sidebar => self.on_sidebar_key(key),
            Focus::Params => self.on_params_key(key),
        }
    }

    fn cycle_focus(&mut self) {
        let mut order = vec![Focus::Input];
        if self.show_sidebar {
            order.push(Focus::Sidebar);
        }
        if self.show_params {
            order.push(Focus::Params);
        }
        self.focus = match order.iter().position(|f| *f == self.focus) {
            Some(pos) => order[(pos + 1) % order.len()],
            None => Focus::Input,
        };
    }

    fn on_input_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.input.insert_text("\n");
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => self.input.delete_left(),
            KeyCode::Delete => self.input.delete_right(),
            KeyCode::Char('w') if ctrl => self.input.delete_prev_word(),
            KeyCode::Char('u') if ctrl => self.input.kill_to_line_start(),
            KeyCode::Char('k') if ctrl => self.input.kill_to_line_end(),
            KeyCode::Char('a') if ctrl => self.input.move_line_start(),
            KeyCode::Char('e') if ctrl => self.input.move_line_end(),
            KeyCode::Char(_) if ctrl => {}
            KeyCode::Char(ch) => {
                let mut buf = [0u8; 4];
                self.input.insert_text(ch.encode_utf8(&mut buf));
            }
            KeyCode::Left if ctrl => self.input.move_word_left(),
            KeyCode::Right if ctrl => self.input.move_word_right(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_line_start(),
            KeyCode::End => self.input.move_line_end(),
            _ => {}
        }
    }

    /// Drains worker events. A `Done` completes the session; a worker that
    /// vanished without one completes it with an error turn so the session
    /// never stays busy.
    pub fn on_tick(&mut self) {
        let Some(rx) = &self.llm_rx else {
            return;
        };
        let mut finished = None;
        for _ in 0..64 {
            match rx.try_recv() {
                Ok(LlmEvent::Delta(t)) => {
                    self.preview.get_or_insert_with(String::new).push_str(&t);
                    self.dirty = true;
                }
                Ok(LlmEvent::Done(turn)) => {
                    finished = Some(turn);
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    error!(target: "tui", "generation worker disconnected without a reply");
                    finished = Some(Turn::assistant(error_message(&GenerateError::Other(
                        WORKER_STOPPED.to_string(),
                    ))));
                    break;
                }
            }
        }
        if let Some(turn) = finished {
            self.llm_rx = None;
            self.preview = None;
            self.session.complete(turn);
            if self.stick_to_bottom {
                self.chat_scroll = 0;
            }
            self.dirty = true;
        }
    }
}

fn run_worker(cfg: HfConfig, token: ApiToken, pending: PendingReply, tx: Sender<LlmEvent>) {
    let turn = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(generate(cfg, token, pending, &tx)),
        Err(e) => {
            error!(target: "tui", "worker runtime error: {}", e);
            Turn::assistant(error_message(&GenerateError::Other(format!("runtime: {}", e))))
        }
    };
    let _ = tx.send(LlmEvent::Done(turn));
}

async fn generate(
    cfg: HfConfig,
    token: ApiToken,
    pending: PendingReply,
    tx: &Sender<LlmEvent>,
) -> Turn {
    let stream = cfg.stream;
    let client = match HfClient::new(cfg) {
        Ok(c) => c,
        Err(e) => {
            error!(target: "tui", "client build error: {:#}", e);
            return Turn::assistant(error_message(&GenerateError::Other(format!(
                "client: {}",
                e
            ))));
        }
    };
    let dispatcher = Dispatcher::new(client, Some(token));
    let PendingReply { entry, request } = pending;
    let outcome = if stream {
        dispatcher
            .dispatch_streaming(&entry, request, |t| {
                let _ = tx.send(LlmEvent::Delta(t.to_string()));
            })
            .await
    } else {
        dispatcher.dispatch(&entry, &request).await
    };
    outcome.unwrap_or_else(|e| Turn::assistant(e.to_string()))
}
