use std::time::{Duration, Instant};

use crossterm::event::{self, Event, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{backend::Backend, layout::Rect, Terminal};
use tracing::info;

use crate::{
    app::{App, Focus},
    ui,
};

pub fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    let mut last_draw = Instant::now();
    let heartbeat = Duration::from_millis(500);
    loop {
        if app.dirty || last_draw.elapsed() >= heartbeat {
            terminal.draw(|f| ui::draw(f, app))?;
            app.dirty = false;
            last_draw = Instant::now();
        }
        if matches!(app.focus, Focus::Input) && !app.show_help {
            let _ = terminal.show_cursor();
        } else {
            let _ = terminal.hide_cursor();
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => app.on_key(key),
                Event::Paste(s) => {
                    app.insert_text(&s);
                    app.dirty = true;
                }
                Event::Resize(_, _) => app.dirty = true,
                Event::Mouse(me) => on_mouse(app, me),
                _ => {}
            }
        }

        app.on_tick();

        if app.should_quit {
            info!(target: "tui", "quit");
            break;
        }
    }
    Ok(())
}

fn contains(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
}

fn on_mouse(app: &mut App, me: MouseEvent) {
    if app.show_help {
        return;
    }
    let (x, y) = (me.column, me.row);
    if app.chat_area.is_some_and(|a| contains(a, x, y)) {
        match me.kind {
            MouseEventKind::ScrollUp => app.scroll_chat(3),
            MouseEventKind::ScrollDown => app.scroll_chat(-3),
            _ => return,
        }
        app.dirty = true;
        return;
    }
    if let Some(area) = app.sidebar_area.filter(|a| contains(*a, x, y)) {
        match me.kind {
            MouseEventKind::ScrollUp => {
                app.sidebar_scroll = app.sidebar_scroll.saturating_sub(1);
            }
            MouseEventKind::ScrollDown => {
                app.sidebar_scroll = (app.sidebar_scroll + 1).min(app.sidebar_max_scroll());
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if y > area.y && y + 1 < area.y + area.height {
                    app.focus = Focus::Sidebar;
                    app.sidebar_click((y - (area.y + 1)) as usize);
                }
            }
            _ => return,
        }
        app.dirty = true;
    }
}
