//! Notices appear in the top-right corner until they expire.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::auth::NoticeLevel;

const NOTICE_WIDTH: u16 = 44;
const NOTICE_HEIGHT: u16 = 4;

fn level_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Info => Color::Cyan,
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Error => Color::Red,
    }
}

/// Render the queued notices stacked from the top-right corner.
pub fn render_notices(f: &mut Frame, app: &App, area: Rect) {
    let width = NOTICE_WIDTH.min(area.width);
    let x = area.x + area.width.saturating_sub(width + 1);

    for (i, timed) in app.notices.iter().enumerate() {
        let y = area.y + 1 + i as u16 * NOTICE_HEIGHT;
        if y + NOTICE_HEIGHT > area.y + area.height {
            break;
        }
        let rect = Rect::new(x, y, width, NOTICE_HEIGHT);
        let color = level_color(timed.notice.level);

        let body = Paragraph::new(vec![
            Line::from(Span::styled(
                timed.notice.title.as_str(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
            Line::from(timed.notice.description.as_str()),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
        .wrap(Wrap { trim: true });

        f.render_widget(Clear, rect);
        f.render_widget(body, rect);
    }
}
