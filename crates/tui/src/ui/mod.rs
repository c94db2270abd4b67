use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
    },
    Frame,
};
use pink_core::{Param, Role};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::sidebar::SidebarRow;
use crate::app::{chat::prefix_for, App, Focus};
use crate::strings::{
    build_status_line, build_stick_label, help_lines, INPUT_HINT, TITLE_CHAT, TITLE_HELP,
    TITLE_INPUT, TITLE_MODELS, TITLE_PARAMS,
};
use crate::theme::THEME;

pub fn draw(f: &mut Frame, app: &mut App) {
    let mut constraints: Vec<Constraint> = Vec::new();
    if app.show_sidebar {
        constraints.push(Constraint::Length(30));
    }
    constraints.push(Constraint::Min(20));
    if app.show_params {
        constraints.push(Constraint::Length(30));
    }
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(f.area());
    let mut idx = 0usize;
    if app.show_sidebar {
        app.sidebar_area = Some(chunks[idx]);
        draw_sidebar(f, chunks[idx], app);
        idx += 1;
    } else {
        app.sidebar_area = None;
    }
    draw_main(f, chunks[idx], app);
    idx += 1;
    if app.show_params {
        draw_params(f, chunks[idx], app);
    }
    if app.show_help {
        draw_help(f, f.area());
    }
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(THEME.border_focus)
    } else {
        Style::default().fg(THEME.border_inactive)
    }
}

fn title_span(text: &str) -> Span<'_> {
    Span::styled(
        text,
        Style::default().fg(THEME.title).add_modifier(Modifier::BOLD),
    )
}

fn draw_sidebar(f: &mut Frame, area: Rect, app: &App) {
    let focused = matches!(app.focus, Focus::Sidebar);
    let block = Block::default()
        .title(title_span(TITLE_MODELS))
        .borders(Borders::ALL)
        .border_style(border_style(focused));
    let rows = app.sidebar_rows();
    let inner_h = area.height.saturating_sub(2) as usize;
    let start = app.sidebar_scroll as usize;
    let current = &app.model().label;
    let mut lines: Vec<Line> = Vec::new();
    for row in rows.iter().skip(start).take(inner_h) {
        match row {
            SidebarRow::Category(cat) => {
                let style = if *cat == app.current_category() {
                    Style::default()
                        .fg(THEME.category)
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                } else {
                    Style::default().fg(THEME.category).add_modifier(Modifier::BOLD)
                };
                lines.push(Line::from(Span::styled(cat.to_string(), style)));
            }
            SidebarRow::Model(e) => {
                let selected = e.label == *current;
                let prefix = if selected { " > " } else { "   " };
                let lock = if e.is_gated() { " 🔒" } else { "" };
                let style = match (selected, focused) {
                    (true, true) => Style::default()
                        .fg(THEME.selected_fg)
                        .bg(THEME.selected_bg)
                        .add_modifier(Modifier::BOLD),
                    (true, false) => Style::default()
                        .fg(THEME.border_focus)
                        .add_modifier(Modifier::BOLD),
                    _ => Style::default(),
                };
                lines.push(Line::from(Span::styled(
                    format!("{}{}{}", prefix, e.label, lock),
                    style,
                )));
            }
        }
    }
    f.render_widget(Paragraph::new(lines).block(block), area);

    let inner = inner_rect(area);
    if rows.len() > inner.height as usize {
        let mut sb_state = ScrollbarState::new(rows.len()).position(start);
        let sb = Scrollbar::default().orientation(ScrollbarOrientation::VerticalRight);
        f.render_stateful_widget(sb, inner, &mut sb_state);
    }
}

fn draw_main(f: &mut Frame, area: Rect, app: &mut App) {
    let inner_width = area.width.saturating_sub(2);
    let input_total_lines = measure_total_lines(&app.input.text, inner_width).max(1) as u16;
    let target_lines = input_total_lines.min(app.input_max_lines);
    let current = app.input_visible_lines.max(1);
    app.input_visible_lines = if current < target_lines {
        current + 1
    } else if current > target_lines {
        current - 1
    } else {
        current
    };
    let input_height = app.input_visible_lines + 2;

    let note = app.notice.clone().or_else(|| app.model_note().map(str::to_string));
    let note_height = match &note {
        Some(text) => measure_total_lines(text, area.width).clamp(1, 3) as u16,
        None => 0,
    };

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(note_height),
            Constraint::Length(1),
            Constraint::Length(input_height),
        ])
        .split(area);

    app.chat_area = Some(main_chunks[0]);
    draw_chat(f, main_chunks[0], app);
    if let Some(text) = note {
        let para = Paragraph::new(text)
            .style(Style::default().fg(THEME.note))
            .wrap(Wrap { trim: false });
        f.render_widget(para, main_chunks[1]);
    }
    draw_status(f, main_chunks[2], app, inner_width);
    draw_input(f, main_chunks[3], app, inner_width);
}

fn draw_chat(f: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default()
        .title(title_span(TITLE_CHAT))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(THEME.chat_border));

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    app.ensure_chat_wrapped(inner_width);
    let (viewport, _max_scroll, start_offset, total) = app.compute_chat_layout(inner_height);
    app.chat_viewport = viewport as u16;

    let all = app.chat_cache.iter().chain(app.chat_tail.iter());
    let mut vis_lines: Vec<Line> = Vec::new();
    let mut skip = start_offset;
    'outer: for (msg_idx, cached) in all.enumerate() {
        let is_tail = msg_idx >= app.chat_cache.len();
        let prefix = prefix_for(cached.role);
        let header_style = match cached.role {
            Role::User => Style::default().fg(THEME.user).add_modifier(Modifier::BOLD),
            Role::Assistant => Style::default()
                .fg(THEME.assistant)
                .add_modifier(Modifier::BOLD),
        };
        let body_style = if is_tail {
            Style::default().add_modifier(Modifier::ITALIC)
        } else {
            Style::default()
        };
        for (i, line) in cached.lines.iter().enumerate() {
            if skip > 0 {
                skip -= 1;
                continue;
            }
            if vis_lines.len() >= viewport {
                break 'outer;
            }
            if i == 0 && line.starts_with(prefix) {
                let (head, rest) = line.split_at(prefix.len());
                vis_lines.push(Line::from(vec![
                    Span::styled(head.to_string(), header_style),
                    Span::styled(rest.to_string(), body_style),
                ]));
            } else {
                vis_lines.push(Line::from(Span::styled(line.clone(), body_style)));
            }
        }
    }

    f.render_widget(Paragraph::new(vis_lines).block(block), area);

    let inner = inner_rect(area);
    if total > inner.height as usize {
        let mut sb_state = ScrollbarState::new(total).position(start_offset);
        let sb = Scrollbar::default().orientation(ScrollbarOrientation::VerticalRight);
        f.render_stateful_widget(sb, inner, &mut sb_state);
    }
}

fn draw_input(f: &mut Frame, area: Rect, app: &App, inner_width: u16) {
    let focused = matches!(app.focus, Focus::Input);
    let block = Block::default()
        .title(TITLE_INPUT)
        .borders(Borders::ALL)
        .border_style(border_style(focused));
    let graphemes: Vec<&str> = app.input.text.graphemes(true).collect();
    let upto = app.input.cursor.min(graphemes.len());
    let (line_idx, col_width) = measure_prefix_line_col(&graphemes, upto, inner_width);
    let offset_y = line_idx.saturating_sub(app.input_visible_lines.saturating_sub(1));

    let para = if app.input.is_empty() {
        let hint = Line::from(Span::styled(
            INPUT_HINT,
            Style::default().fg(Color::DarkGray),
        ));
        Paragraph::new(hint).block(block).wrap(Wrap { trim: false })
    } else {
        Paragraph::new(app.input.text.clone())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((offset_y, 0))
    };
    f.render_widget(para, area);

    if focused {
        let cursor_x = area.x + 1 + col_width;
        let cursor_y = area.y + 1 + line_idx.saturating_sub(offset_y);
        f.set_cursor_position(Position::new(cursor_x, cursor_y));
    }
}

fn draw_status(f: &mut Frame, area: Rect, app: &App, inner_width: u16) {
    let stick = build_stick_label(app.chat_scroll);
    let graphemes: Vec<&str> = app.input.text.graphemes(true).collect();
    let upto = app.input.cursor.min(graphemes.len());
    let (line_idx, col_width) = measure_prefix_line_col(&graphemes, upto, inner_width);
    let tips = build_status_line(
        &stick,
        app.focus.label(),
        line_idx + 1,
        col_width + 1,
        &app.model().label,
        &app.knob_summary(),
        app.session.is_busy(),
        area.width,
    );
    let para = Paragraph::new(Line::from(Span::styled(
        tips,
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(para, area);
}

fn draw_params(f: &mut Frame, area: Rect, app: &App) {
    let focused = matches!(app.focus, Focus::Params);
    let block = Block::default()
        .title(title_span(TITLE_PARAMS))
        .borders(Borders::ALL)
        .border_style(border_style(focused));
    let params = app.session.params();
    let selected = app.selected_param();
    let mut lines: Vec<Line> = Vec::new();
    for p in Param::ALL {
        let is_sel = p == selected;
        let style = match (is_sel, focused) {
            (true, true) => Style::default()
                .fg(THEME.selected_fg)
                .bg(THEME.selected_bg)
                .add_modifier(Modifier::BOLD),
            (true, false) => Style::default()
                .fg(THEME.border_focus)
                .add_modifier(Modifier::BOLD),
            _ => Style::default(),
        };
        let prefix = if is_sel { "> " } else { "  " };
        lines.push(Line::from(Span::styled(
            format!("{}{}: {}", prefix, p.label(), params.display(p)),
            style,
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        app.param_hint(),
        Style::default().fg(Color::DarkGray),
    )));
    if app.model().is_lightweight() {
        lines.push(Line::from(Span::styled(
            "Length capped at 512 for this model",
            Style::default().fg(THEME.note),
        )));
    }
    let para = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(para, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect(70, 70, area);
    let block = Block::default()
        .title(title_span(TITLE_HELP))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(THEME.border_focus));
    let lines = help_lines()
        .iter()
        .map(|s| Line::from(*s))
        .collect::<Vec<Line>>();
    let para = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, popup_area);
    f.render_widget(para, popup_area);
}

fn inner_rect(area: Rect) -> Rect {
    Rect {
        x: area.x.saturating_add(1),
        y: area.y.saturating_add(1),
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1]);
    horiz[1]
}

fn measure_total_lines(s: &str, width: u16) -> usize {
    let graphemes: Vec<&str> = s.graphemes(true).collect();
    measure_prefix_line_col(&graphemes, graphemes.len(), width).0 as usize + 1
}

/// Cursor line and column after the first `upto` graphemes, wrapping at
/// `width` display columns.
fn measure_prefix_line_col(graphemes: &[&str], upto: usize, width: u16) -> (u16, u16) {
    if width == 0 {
        return (0, 0);
    }
    let mut line = 0usize;
    let mut col = 0usize;
    for g in graphemes.iter().take(upto) {
        if *g == "\n" {
            line += 1;
            col = 0;
            continue;
        }
        let w = UnicodeWidthStr::width(*g);
        if col + w > width as usize {
            line += 1;
            col = 0;
        }
        col += w;
    }
    (line as u16, col as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn wrap_basic_ascii() {
        let s = "abcdef";
        let g: Vec<&str> = s.graphemes(true).collect();
        assert_eq!(measure_total_lines(s, 5), 2);
        assert_eq!(measure_prefix_line_col(&g, 5, 5), (0, 5));
        assert_eq!(measure_prefix_line_col(&g, 6, 5), (1, 1));
    }

    #[test]
    fn wrap_with_newline_and_wide_chars() {
        let s = "ab\ncdef";
        let g: Vec<&str> = s.graphemes(true).collect();
        assert_eq!(measure_total_lines(s, 80), 2);
        assert_eq!(measure_prefix_line_col(&g, 5, 80), (1, 2));

        let wide = "🌸🌸🌸";
        let g: Vec<&str> = wide.graphemes(true).collect();
        assert_eq!(measure_prefix_line_col(&g, 2, 4), (0, 4));
        assert_eq!(measure_prefix_line_col(&g, 3, 4), (1, 2));
    }

    #[test]
    fn renders_greeting_models_and_gated_note() {
        let mut app = App::with_config(None);
        let backend = TestBackend::new(120, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Mistral Mixtral-8x7B"));
        assert!(text.contains("How can I help you today"));
        assert!(app.chat_area.is_some());

        let gated = app.registry.entry("Llama 2 (7B)").unwrap();
        app.choose_model(gated);
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("huggingface.co/meta-llama"));
    }
}
