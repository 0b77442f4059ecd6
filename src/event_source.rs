use anyhow::Result;
pub use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::VecDeque;
use std::time::Duration;

/// Where the viewer gets its input from
pub trait EventSource {
    /// Wait up to `timeout` for an event to become available
    fn poll(&mut self, timeout: Duration) -> Result<bool>;

    fn read(&mut self) -> Result<Event>;
}

/// Terminal input via crossterm
pub struct KeyboardEventSource;

impl EventSource for KeyboardEventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool> {
        Ok(crossterm::event::poll(timeout)?)
    }

    fn read(&mut self) -> Result<Event> {
        Ok(crossterm::event::read()?)
    }
}

/// Replays a fixed list of events, then reports quit (`q`) forever
#[derive(Default)]
pub struct ScriptedEventSource {
    events: VecDeque<Event>,
}

impl ScriptedEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: events.into(),
        }
    }

    pub fn key(code: KeyCode) -> Event {
        Self::key_with(code, KeyModifiers::empty())
    }

    pub fn key_with(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    pub fn char_key(c: char) -> Event {
        Self::key(KeyCode::Char(c))
    }

    /// One key press per character of `text`
    pub fn typed(text: &str) -> Vec<Event> {
        text.chars().map(Self::char_key).collect()
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl EventSource for ScriptedEventSource {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(true)
    }

    fn read(&mut self) -> Result<Event> {
        Ok(self
            .events
            .pop_front()
            .unwrap_or_else(|| Self::char_key('q')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_in_order_then_quits() {
        let mut events = ScriptedEventSource::typed("gj");
        events.push(ScriptedEventSource::key(KeyCode::Enter));
        let mut source = ScriptedEventSource::new(events);

        assert!(source.poll(Duration::ZERO).unwrap());
        let codes: Vec<_> = (0..4)
            .map(|_| match source.read().unwrap() {
                Event::Key(key) => key.code,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();

        assert_eq!(
            codes,
            vec![
                KeyCode::Char('g'),
                KeyCode::Char('j'),
                KeyCode::Enter,
                KeyCode::Char('q')
            ]
        );
        assert_eq!(source.remaining(), 0);
    }
}
