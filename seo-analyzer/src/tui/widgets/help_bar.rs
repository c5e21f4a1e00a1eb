// Help bar: key hints for the current input mode.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::ViewState;

const EDITING_HINTS: &str = " Enter:Analyze | Esc:Stop editing | Backspace:Delete | Ctrl+C:Quit";
const NORMAL_HINTS: &str = " /:URL | r:Rerun | s:Rescore | p:Perf summary | x:Cancel | Tab:Focus | \
                            j/k:Move | Enter:Toggle | e/c:Expand/Collapse | q:Quit";

pub fn hints(state: &ViewState) -> &'static str {
    if state.editing {
        EDITING_HINTS
    } else {
        NORMAL_HINTS
    }
}

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        hints(state),
        Style::default().fg(Color::White).add_modifier(Modifier::DIM),
    )))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}
