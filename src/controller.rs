use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode};
use tracing::trace;

use crate::domain::{CvaConfig, CvaError, Message};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &CvaConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, CvaError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    // While the command line is active, keys go to the
                    // inputter untranslated.
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Right => Some(Message::MoveRight),
            KeyCode::Char('n') => Some(Message::PageNext),
            KeyCode::Char('N') => Some(Message::PagePrev),
            KeyCode::PageDown => Some(Message::PageNext),
            KeyCode::PageUp => Some(Message::PagePrev),
            KeyCode::Char('g') => Some(Message::PageFirst),
            KeyCode::Char('G') => Some(Message::PageLast),
            KeyCode::Char(':') => Some(Message::GotoPage),
            KeyCode::Char('/') => Some(Message::FilterAll),
            KeyCode::Char('f') => Some(Message::FilterInColumn),
            KeyCode::Char(c @ '1'..='9') => {
                Some(Message::ToggleColumn(c as usize - '1' as usize))
            }
            KeyCode::Char('a') => Some(Message::ToggleAllColumns),
            KeyCode::Char('r') => Some(Message::Refetch),
            KeyCode::Char('m') => Some(Message::MarkPaid),
            KeyCode::Char('y') => Some(Message::CopyCell),
            KeyCode::Char('Y') => Some(Message::CopyRow),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyEvent, KeyModifiers};

    fn map(c: KeyCode) -> Option<Message> {
        let controller = Controller::new(&CvaConfig::default());
        controller.handle_key(KeyEvent::new(c, KeyModifiers::NONE))
    }

    #[test]
    fn digit_keys_toggle_columns_zero_based() {
        assert!(matches!(map(KeyCode::Char('1')), Some(Message::ToggleColumn(0))));
        assert!(matches!(map(KeyCode::Char('9')), Some(Message::ToggleColumn(8))));
    }

    #[test]
    fn unmapped_keys_produce_nothing() {
        assert!(map(KeyCode::Char('z')).is_none());
    }

    #[test]
    fn quit_and_paging() {
        assert!(matches!(map(KeyCode::Char('q')), Some(Message::Quit)));
        assert!(matches!(map(KeyCode::Char('n')), Some(Message::PageNext)));
        assert!(matches!(map(KeyCode::Char('N')), Some(Message::PagePrev)));
    }
}
