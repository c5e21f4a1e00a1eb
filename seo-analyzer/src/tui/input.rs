// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages for the app loop,
// or into local ViewState changes (URL editing, focus, scrolling, accordion).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::{Focus, Notice, ViewState};
use crate::protocol::UserCommand;

/// Lines moved by PageUp/PageDown in the narrative panel.
const PAGE_SIZE: u16 = 10;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app loop, `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Windows reports both press and release.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.editing {
        return handle_editing(key_event, view_state);
    }

    match key_event.code {
        KeyCode::Char('/') | KeyCode::Char('u') => {
            view_state.editing = true;
            None
        }

        KeyCode::Char('r') => Some(UserCommand::Rerun),
        KeyCode::Char('s') => Some(UserCommand::RecalculateScore),
        KeyCode::Char('p') => Some(UserCommand::SummarizePerformance),
        KeyCode::Char('x') => Some(UserCommand::Cancel),
        KeyCode::Char('q') => Some(UserCommand::Quit),

        KeyCode::Tab | KeyCode::BackTab => {
            view_state.focus = view_state.focus.toggle();
            None
        }

        KeyCode::Up | KeyCode::Char('k') => {
            match view_state.focus {
                Focus::Narrative => scroll_narrative(view_state, -1),
                Focus::Sections => view_state.select_prev(),
            }
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            match view_state.focus {
                Focus::Narrative => scroll_narrative(view_state, 1),
                Focus::Sections => view_state.select_next(),
            }
            None
        }
        KeyCode::PageUp => {
            scroll_narrative(view_state, -i32::from(PAGE_SIZE));
            None
        }
        KeyCode::PageDown => {
            scroll_narrative(view_state, i32::from(PAGE_SIZE));
            None
        }

        KeyCode::Enter | KeyCode::Char(' ') => {
            if view_state.focus == Focus::Sections {
                view_state.toggle_selected();
            }
            None
        }
        KeyCode::Char('e') => {
            view_state.expand_all();
            None
        }
        KeyCode::Char('c') => {
            view_state.collapse_all();
            None
        }

        _ => None,
    }
}

/// Keys while the URL field has focus. Enter submits a non-empty URL;
/// validation happens in the app.
fn handle_editing(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            view_state.editing = false;
            None
        }
        KeyCode::Enter => {
            let url = view_state.url_input.trim().to_string();
            if url.is_empty() {
                view_state.notice = Some(Notice::Error("Enter a URL to analyze.".into()));
                return None;
            }
            view_state.editing = false;
            Some(UserCommand::Analyze { url })
        }
        KeyCode::Backspace => {
            view_state.url_input.pop();
            None
        }
        KeyCode::Char(c) if !key_event.modifiers.contains(KeyModifiers::CONTROL) => {
            view_state.url_input.push(c);
            None
        }
        _ => None,
    }
}

fn scroll_narrative(view_state: &mut ViewState, delta: i32) {
    let next = i32::from(view_state.narrative_scroll) + delta;
    view_state.narrative_scroll = next.clamp(0, i32::from(u16::MAX)) as u16;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seo::report::SectionKind;
    use crate::tui::test_support::state_with_report;
    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctrl_key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn type_str(state: &mut ViewState, text: &str) {
        for c in text.chars() {
            assert!(handle_key(key(KeyCode::Char(c)), state).is_none());
        }
    }

    // -- URL editing --

    #[test]
    fn slash_and_u_enter_editing() {
        let mut state = ViewState::default();
        assert!(handle_key(key(KeyCode::Char('/')), &mut state).is_none());
        assert!(state.editing);

        let mut state = ViewState::default();
        handle_key(key(KeyCode::Char('u')), &mut state);
        assert!(state.editing);
    }

    #[test]
    fn typing_then_enter_submits_trimmed_url() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Char('/')), &mut state);
        type_str(&mut state, " https://shop.example ");
        let cmd = handle_key(key(KeyCode::Enter), &mut state);
        assert_eq!(
            cmd,
            Some(UserCommand::Analyze { url: "https://shop.example".into() })
        );
        assert!(!state.editing);
    }

    #[test]
    fn command_letters_are_text_while_editing() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Char('u')), &mut state);
        type_str(&mut state, "qrsx");
        assert_eq!(state.url_input, "qrsx");
        assert!(state.editing);
    }

    #[test]
    fn backspace_deletes_and_esc_leaves_editing() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Char('/')), &mut state);
        type_str(&mut state, "abc");
        handle_key(key(KeyCode::Backspace), &mut state);
        assert_eq!(state.url_input, "ab");

        assert!(handle_key(key(KeyCode::Esc), &mut state).is_none());
        assert!(!state.editing);
        assert_eq!(state.url_input, "ab");
    }

    #[test]
    fn empty_url_is_not_submitted() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Char('/')), &mut state);
        type_str(&mut state, "   ");
        assert!(handle_key(key(KeyCode::Enter), &mut state).is_none());
        assert!(state.editing);
        assert!(matches!(state.notice, Some(Notice::Error(_))));
    }

    // -- Commands --

    #[test]
    fn command_keys_map_to_commands() {
        let mut state = ViewState::default();
        assert_eq!(handle_key(key(KeyCode::Char('r')), &mut state), Some(UserCommand::Rerun));
        assert_eq!(
            handle_key(key(KeyCode::Char('s')), &mut state),
            Some(UserCommand::RecalculateScore)
        );
        assert_eq!(
            handle_key(key(KeyCode::Char('p')), &mut state),
            Some(UserCommand::SummarizePerformance)
        );
        assert_eq!(handle_key(key(KeyCode::Char('x')), &mut state), Some(UserCommand::Cancel));
        assert_eq!(handle_key(key(KeyCode::Char('q')), &mut state), Some(UserCommand::Quit));
    }

    #[test]
    fn ctrl_c_quits_even_while_editing() {
        let mut state = ViewState::default();
        state.editing = true;
        assert_eq!(
            handle_key(ctrl_key(KeyCode::Char('c')), &mut state),
            Some(UserCommand::Quit)
        );
    }

    #[test]
    fn release_events_are_ignored() {
        let mut state = ViewState::default();
        let mut event = key(KeyCode::Char('q'));
        event.kind = KeyEventKind::Release;
        assert!(handle_key(event, &mut state).is_none());
    }

    // -- Focus, scrolling, accordion --

    #[test]
    fn tab_toggles_focus() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Tab), &mut state);
        assert_eq!(state.focus, Focus::Sections);
        handle_key(key(KeyCode::Tab), &mut state);
        assert_eq!(state.focus, Focus::Narrative);
    }

    #[test]
    fn arrows_scroll_narrative_without_underflow() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Up), &mut state);
        assert_eq!(state.narrative_scroll, 0);
        handle_key(key(KeyCode::Char('j')), &mut state);
        handle_key(key(KeyCode::Down), &mut state);
        assert_eq!(state.narrative_scroll, 2);
        handle_key(key(KeyCode::PageDown), &mut state);
        assert_eq!(state.narrative_scroll, 12);
        handle_key(key(KeyCode::PageUp), &mut state);
        handle_key(key(KeyCode::PageUp), &mut state);
        assert_eq!(state.narrative_scroll, 0);
    }

    #[test]
    fn arrows_move_selection_when_sections_focused() {
        let mut state = state_with_report();
        state.focus = Focus::Sections;
        handle_key(key(KeyCode::Down), &mut state);
        assert_eq!(state.selected, 1);
        // Two sections: stays on the last one.
        handle_key(key(KeyCode::Char('j')), &mut state);
        assert_eq!(state.selected, 1);
        handle_key(key(KeyCode::Char('k')), &mut state);
        assert_eq!(state.selected, 0);
        assert_eq!(state.narrative_scroll, 0);
    }

    #[test]
    fn enter_and_space_toggle_selected_section() {
        let mut state = state_with_report();
        state.focus = Focus::Sections;
        handle_key(key(KeyCode::Enter), &mut state);
        assert!(state.expanded.contains(&SectionKind::Recommendations));
        handle_key(key(KeyCode::Char(' ')), &mut state);
        assert!(state.expanded.is_empty());
    }

    #[test]
    fn enter_in_narrative_does_not_toggle() {
        let mut state = state_with_report();
        handle_key(key(KeyCode::Enter), &mut state);
        assert!(state.expanded.is_empty());
    }

    #[test]
    fn expand_and_collapse_all() {
        let mut state = state_with_report();
        handle_key(key(KeyCode::Char('e')), &mut state);
        assert_eq!(state.expanded.len(), state.sections().len());
        handle_key(key(KeyCode::Char('c')), &mut state);
        assert!(state.expanded.is_empty());
    }
}
