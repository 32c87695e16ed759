use crate::client::Source;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub sources: Vec<Source>,
    /// Set only on the placeholder shown while a reply is pending.
    pub loading: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        ChatMessage {
            sender: Sender::User,
            text: text.into(),
            sources: Vec::new(),
            loading: false,
        }
    }

    pub fn assistant(text: impl Into<String>, sources: Vec<Source>) -> Self {
        ChatMessage {
            sender: Sender::Assistant,
            text: text.into(),
            sources,
            loading: false,
        }
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        ChatMessage {
            loading: true,
            ..ChatMessage::assistant(text, Vec::new())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Welcome,
    Message(ChatMessage),
}

impl Entry {
    fn is_placeholder(&self) -> bool {
        matches!(self, Entry::Message(m) if m.loading)
    }
}

/// The transcript. Holds at most one loading placeholder, always last.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    entries: Vec<Entry>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// A fresh transcript showing only the welcome panel.
    pub fn new() -> Self {
        Conversation {
            entries: vec![Entry::Welcome],
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Message(m) => Some(m),
            Entry::Welcome => None,
        })
    }

    pub fn is_loading(&self) -> bool {
        self.entries.iter().any(Entry::is_placeholder)
    }

    pub fn push(&mut self, message: ChatMessage) {
        if message.loading {
            self.retract_placeholder();
        }
        self.entries.push(Entry::Message(message));
    }

    pub fn remove_last(&mut self) -> Option<Entry> {
        self.entries.pop()
    }

    /// Removes the last entry only if it is the loading placeholder.
    pub fn retract_placeholder(&mut self) -> bool {
        if self.entries.last().is_some_and(Entry::is_placeholder) {
            self.remove_last();
            true
        } else {
            false
        }
    }

    pub fn remove_welcome(&mut self) {
        self.entries.retain(|e| !matches!(e, Entry::Welcome));
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.entries.push(Entry::Welcome);
    }
}
