//! State machine behind the chat window.
//!
//! The controller never touches the network or the widget tree. Each event
//! handler mutates the transcript and input state, then returns the
//! [`Effect`]s the application shell must carry out.

use crate::client::ChatReply;
use crate::conversation::{ChatMessage, Conversation};
use crate::error::ChatError;

pub const LOADING_TEXT: &str = "Analyzing legal documents...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FocusInput,
    ScrollToEnd,
    SendChat(String),
    SendClear,
}

#[derive(Debug, Default)]
pub struct ChatController {
    conversation: Conversation,
    input: String,
    input_disabled: bool,
}

impl ChatController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_enabled(&self) -> bool {
        !self.input_disabled
    }

    pub fn set_input(&mut self, value: String) {
        if !self.input_disabled {
            self.input = value;
        }
    }

    pub fn submit(&mut self) -> Vec<Effect> {
        if self.input_disabled {
            return Vec::new();
        }

        let message = self.input.trim().to_string();
        if message.is_empty() {
            return vec![Effect::FocusInput];
        }

        self.conversation.remove_welcome();
        self.conversation.push(ChatMessage::user(message.clone()));
        self.input.clear();
        self.input_disabled = true;
        self.conversation.push(ChatMessage::placeholder(LOADING_TEXT));
        tracing::debug!(chars = message.chars().count(), "message submitted");

        vec![Effect::ScrollToEnd, Effect::SendChat(message)]
    }

    /// Swaps the placeholder for the reply, or for an error message.
    pub fn complete(&mut self, result: Result<ChatReply, ChatError>) -> Vec<Effect> {
        self.conversation.retract_placeholder();

        let message = match result {
            Ok(reply) => ChatMessage::assistant(reply.text, reply.sources),
            Err(err) => {
                tracing::warn!(error = %err, "chat request failed");
                ChatMessage::assistant(format!("Error: {}", err), Vec::new())
            }
        };
        self.conversation.push(message);
        self.input_disabled = false;

        vec![Effect::ScrollToEnd, Effect::FocusInput]
    }

    pub fn clear(&self) -> Vec<Effect> {
        vec![Effect::SendClear]
    }

    /// The transcript is reset whatever the server said.
    pub fn clear_completed(&mut self, result: Result<(), ChatError>) -> Vec<Effect> {
        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to clear conversation");
        }
        self.conversation.reset();
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Source;
    use crate::conversation::{Entry, Sender};

    fn submitted(text: &str) -> (ChatController, Vec<Effect>) {
        let mut controller = ChatController::new();
        controller.set_input(text.to_string());
        let effects = controller.submit();
        (controller, effects)
    }

    #[test]
    fn test_blank_submit_is_noop() {
        for input in ["", "   ", "\n\t "] {
            let (controller, effects) = submitted(input);
            assert_eq!(effects, vec![Effect::FocusInput]);
            assert_eq!(controller.conversation().entries(), &[Entry::Welcome]);
            assert!(controller.input_enabled());
        }
    }

    #[test]
    fn test_submit_appends_user_and_placeholder() {
        let (controller, effects) = submitted("  What about packaging?  ");

        assert_eq!(
            effects,
            vec![
                Effect::ScrollToEnd,
                Effect::SendChat("What about packaging?".to_string())
            ]
        );
        assert_eq!(
            controller.conversation().entries(),
            &[
                Entry::Message(ChatMessage::user("What about packaging?")),
                Entry::Message(ChatMessage::placeholder(LOADING_TEXT)),
            ]
        );
        assert_eq!(controller.input(), "");
        assert!(!controller.input_enabled());
    }

    #[test]
    fn test_submit_while_pending_is_ignored() {
        let (mut controller, _) = submitted("first");
        controller.set_input("second".to_string());

        assert!(controller.submit().is_empty());
        assert_eq!(controller.input(), "");
        assert_eq!(controller.conversation().len(), 2);
    }

    #[test]
    fn test_success_replaces_placeholder() {
        let (mut controller, _) = submitted("hello");
        let sources = vec![Source {
            title: Some("Act 2020".to_string()),
            ..Source::default()
        }];

        let effects = controller.complete(Ok(ChatReply {
            text: "**Hi**".to_string(),
            sources: sources.clone(),
        }));

        assert_eq!(effects, vec![Effect::ScrollToEnd, Effect::FocusInput]);
        assert!(controller.input_enabled());
        assert!(!controller.conversation().is_loading());

        let messages: Vec<_> = controller.conversation().messages().collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1], &ChatMessage::assistant("**Hi**", sources));
    }

    #[test]
    fn test_service_failure_shows_error() {
        let (mut controller, _) = submitted("hello");
        controller.complete(Err(ChatError::Service("db down".to_string())));

        let messages: Vec<_> = controller.conversation().messages().collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, "Error: db down");
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert!(!messages[1].loading);
        assert!(controller.input_enabled());
    }

    #[test]
    fn test_transport_failure_shows_error() {
        let (mut controller, _) = submitted("hello");
        controller.complete(Err(ChatError::Transport("connection refused".to_string())));

        let last = controller.conversation().last().unwrap();
        assert_eq!(
            last,
            &Entry::Message(ChatMessage::assistant("Error: connection refused", Vec::new()))
        );
    }

    #[test]
    fn test_clear_always_resets() {
        for result in [Ok(()), Err(ChatError::Transport("offline".to_string()))] {
            let (mut controller, _) = submitted("hello");
            controller.complete(Ok(ChatReply::default()));

            assert_eq!(controller.clear(), vec![Effect::SendClear]);
            controller.clear_completed(result);
            assert_eq!(controller.conversation().entries(), &[Entry::Welcome]);
        }
    }

    #[test]
    fn test_reply_after_clear_keeps_welcome() {
        let (mut controller, _) = submitted("hello");
        controller.clear_completed(Ok(()));
        controller.complete(Ok(ChatReply {
            text: "late".to_string(),
            sources: Vec::new(),
        }));

        let entries = controller.conversation().entries();
        assert_eq!(entries[0], Entry::Welcome);
        assert_eq!(entries.len(), 2);
        assert!(controller.input_enabled());
    }
}
