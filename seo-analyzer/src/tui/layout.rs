// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | URL Input (3 rows)                                |
// +------------+------------+------------+-----------+
// | SEO score  | Perf score | Recalc     | Traffic   |  (5 rows)
// +------------+------------+------------+-----------+
// | Narrative (60%)          | Sections accordion (40%)|
// +--------------------------+------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each dashboard zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    pub status_bar: Rect,
    pub url_input: Rect,
    /// Row of score and traffic cards; split further by the cards widget.
    pub score_cards: Rect,
    /// Report, performance report and summary text.
    pub narrative: Rect,
    /// Collapsible report sections.
    pub sections: Rect,
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Length(3), // url input
            Constraint::Length(5), // score cards
            Constraint::Min(6),    // narrative + sections
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(vertical[3]);

    AppLayout {
        status_bar: vertical[0],
        url_input: vertical[1],
        score_cards: vertical[2],
        narrative: body[0],
        sections: body[1],
        help_bar: vertical[4],
    }
}

/// Split the cards row into `count` equal columns.
pub fn card_columns(area: Rect, count: usize) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let constraints = vec![Constraint::Ratio(1, count as u32); count];
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area)
        .to_vec()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_area() -> Rect {
        Rect::new(0, 0, 160, 50)
    }

    #[test]
    fn layout_all_rects_nonzero() {
        let layout = build_layout(test_area());
        let rects = [
            ("status_bar", layout.status_bar),
            ("url_input", layout.url_input),
            ("score_cards", layout.score_cards),
            ("narrative", layout.narrative),
            ("sections", layout.sections),
            ("help_bar", layout.help_bar),
        ];
        for (name, rect) in &rects {
            assert!(
                rect.width > 0 && rect.height > 0,
                "{} has zero area: {:?}",
                name,
                rect
            );
        }
    }

    #[test]
    fn fixed_rows_have_fixed_heights() {
        let layout = build_layout(test_area());
        assert_eq!(layout.status_bar.height, 1);
        assert_eq!(layout.url_input.height, 3);
        assert_eq!(layout.score_cards.height, 5);
        assert_eq!(layout.help_bar.height, 1);
        assert_eq!(layout.help_bar.y, 49);
    }

    #[test]
    fn body_fills_remaining_rows() {
        let layout = build_layout(test_area());
        assert_eq!(layout.narrative.y, 9);
        assert_eq!(layout.narrative.height, 40);
        assert_eq!(layout.sections.height, 40);
    }

    #[test]
    fn narrative_is_wider_than_sections() {
        let layout = build_layout(test_area());
        assert_eq!(layout.narrative.width, 96);
        assert_eq!(layout.sections.width, 64);
        assert_eq!(layout.sections.x, layout.narrative.x + layout.narrative.width);
    }

    #[test]
    fn card_columns_split_evenly() {
        let cols = card_columns(Rect::new(0, 0, 120, 5), 4);
        assert_eq!(cols.len(), 4);
        assert!(cols.iter().all(|c| c.width == 30 && c.height == 5));
        assert!(card_columns(Rect::new(0, 0, 120, 5), 0).is_empty());
    }

    #[test]
    fn small_terminal_does_not_panic() {
        let layout = build_layout(Rect::new(0, 0, 20, 8));
        assert_eq!(layout.status_bar.height, 1);
    }
}
