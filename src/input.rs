use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    DismissError,
    SelectPrev,
    SelectNext,
    OpenNode,
    ToggleFollow,
    Refresh,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    ScrollToTop,
    ScrollToBottom,
    None,
}

/// Captures the UI state needed to interpret a key press.
#[derive(Debug, Clone, Default)]
pub struct InputContext {
    pub has_error: bool,
    /// A topology fetch is in flight.
    pub pending: bool,
}

pub fn map_key(key: KeyEvent, ctx: &InputContext) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }

    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Esc => {
            if ctx.has_error {
                Action::DismissError
            } else {
                Action::Quit
            }
        }
        KeyCode::Left | KeyCode::Char('h') => Action::SelectPrev,
        KeyCode::Right | KeyCode::Char('l') => Action::SelectNext,
        KeyCode::Enter => Action::OpenNode,
        KeyCode::Char('f') => Action::ToggleFollow,
        KeyCode::Char('r') if !ctx.pending => Action::Refresh,
        KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
        KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Char('g') | KeyCode::Home => Action::ScrollToTop,
        KeyCode::Char('G') | KeyCode::End => Action::ScrollToBottom,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctx() -> InputContext {
        InputContext::default()
    }

    #[test]
    fn quit_keys() {
        assert_eq!(map_key(press(KeyCode::Char('q')), &ctx()), Action::Quit);
        assert_eq!(map_key(press(KeyCode::Esc), &ctx()), Action::Quit);
        let ctrl_c = KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..press(KeyCode::Char('c'))
        };
        assert_eq!(map_key(ctrl_c, &ctx()), Action::Quit);
    }

    #[test]
    fn esc_dismisses_error_first() {
        let ctx = InputContext {
            has_error: true,
            ..Default::default()
        };
        assert_eq!(map_key(press(KeyCode::Esc), &ctx), Action::DismissError);
    }

    #[test]
    fn node_selection() {
        assert_eq!(map_key(press(KeyCode::Char('h')), &ctx()), Action::SelectPrev);
        assert_eq!(map_key(press(KeyCode::Left), &ctx()), Action::SelectPrev);
        assert_eq!(map_key(press(KeyCode::Char('l')), &ctx()), Action::SelectNext);
        assert_eq!(map_key(press(KeyCode::Right), &ctx()), Action::SelectNext);
        assert_eq!(map_key(press(KeyCode::Enter), &ctx()), Action::OpenNode);
    }

    #[test]
    fn follow_toggle() {
        assert_eq!(map_key(press(KeyCode::Char('f')), &ctx()), Action::ToggleFollow);
    }

    #[test]
    fn refresh_blocked_while_pending() {
        assert_eq!(map_key(press(KeyCode::Char('r')), &ctx()), Action::Refresh);
        let pending = InputContext {
            pending: true,
            ..Default::default()
        };
        assert_eq!(map_key(press(KeyCode::Char('r')), &pending), Action::None);
    }

    #[test]
    fn scrolling() {
        assert_eq!(map_key(press(KeyCode::Char('j')), &ctx()), Action::ScrollDown);
        assert_eq!(map_key(press(KeyCode::Up), &ctx()), Action::ScrollUp);
        assert_eq!(map_key(press(KeyCode::PageDown), &ctx()), Action::PageDown);
        assert_eq!(map_key(press(KeyCode::PageUp), &ctx()), Action::PageUp);
        assert_eq!(map_key(press(KeyCode::Char('g')), &ctx()), Action::ScrollToTop);
        assert_eq!(map_key(press(KeyCode::Char('G')), &ctx()), Action::ScrollToBottom);
    }

    #[test]
    fn release_is_ignored() {
        let release = KeyEvent {
            kind: KeyEventKind::Release,
            ..press(KeyCode::Char('q'))
        };
        assert_eq!(map_key(release, &ctx()), Action::None);
    }

    #[test]
    fn unknown_key() {
        assert_eq!(map_key(press(KeyCode::Char('z')), &ctx()), Action::None);
    }
}
