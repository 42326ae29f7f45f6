use super::message::Message;

/// The ordered message history of one engine run.
///
/// Messages can only be appended. Nothing is ever removed or rewritten, so the
/// history sent on turn `n + 1` always starts with the history sent on turn `n`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(initial: Vec<Message>) -> Self {
        Self { messages: initial }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
