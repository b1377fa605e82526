use crate::models::{Message, Role, Turn};

/// Flattens the session into the ordered message list the endpoint expects:
/// one system message, the prior turns in original order, then the new user
/// message. A turn side that is absent or empty contributes no message, so
/// an unanswered question or an assistant-initiated greeting never produces
/// an empty entry.
pub fn build_messages(system_message: &str, history: &[Turn], new_message: &str) -> Vec<Message> {
    let mut messages = vec![Message::new(Role::System, system_message)];
    for turn in history {
        if let Some(user) = turn.user.as_deref().filter(|s| !s.is_empty()) {
            messages.push(Message::new(Role::User, user));
        }
        if let Some(assistant) = turn.assistant.as_deref().filter(|s| !s.is_empty()) {
            messages.push(Message::new(Role::Assistant, assistant));
        }
    }
    messages.push(Message::new(Role::User, new_message));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_is_system_then_user() {
        let messages = build_messages("Be terse.", &[], "2+2?");
        assert_eq!(
            messages,
            vec![
                Message::new(Role::System, "Be terse."),
                Message::new(Role::User, "2+2?"),
            ]
        );
    }

    #[test]
    fn skips_absent_and_empty_turn_fields() {
        let history = vec![
            Turn::new("hi", "hello"),
            Turn {
                user: None,
                assistant: Some("follow-up-only".into()),
            },
            Turn {
                user: Some("q2".into()),
                assistant: None,
            },
        ];
        let messages = build_messages("S", &history, "end");
        assert_eq!(
            messages,
            vec![
                Message::new(Role::System, "S"),
                Message::new(Role::User, "hi"),
                Message::new(Role::Assistant, "hello"),
                Message::new(Role::Assistant, "follow-up-only"),
                Message::new(Role::User, "q2"),
                Message::new(Role::User, "end"),
            ]
        );
    }

    #[test]
    fn empty_string_fields_behave_like_absent_ones() {
        let history = vec![Turn {
            user: Some(String::new()),
            assistant: Some(String::new()),
        }];
        let messages = build_messages("S", &history, "go");
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn preserves_history_order() {
        let history = vec![Turn::new("a", "b"), Turn::new("c", "d")];
        let messages = build_messages("S", &history, "e");
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["S", "a", "b", "c", "d", "e"]);
    }

    #[test]
    fn message_content_is_not_validated() {
        let messages = build_messages("S", &[], "");
        assert_eq!(messages.last().unwrap().content, "");
        assert_eq!(messages.last().unwrap().role, Role::User);
    }
}
