use ratatui::style::Color;

pub struct Theme {
    pub border_focus: Color,
    pub border_inactive: Color,
    pub chat_border: Color,
    pub title: Color,
    pub user: Color,
    pub assistant: Color,
    pub category: Color,
    pub note: Color,
    pub selected_fg: Color,
    pub selected_bg: Color,
}

pub const THEME: Theme = Theme {
    border_focus: Color::Rgb(255, 105, 180),
    border_inactive: Color::DarkGray,
    chat_border: Color::Rgb(255, 182, 193),
    title: Color::Rgb(255, 20, 147),
    user: Color::Rgb(255, 105, 180),
    assistant: Color::Rgb(255, 20, 147),
    category: Color::Rgb(255, 192, 203),
    note: Color::Rgb(255, 160, 200),
    selected_fg: Color::Black,
    selected_bg: Color::Rgb(255, 105, 180),
};
