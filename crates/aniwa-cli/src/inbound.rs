//! Inbound traffic: recognizing prefixed commands in chat messages.
//!
//! Command handlers live outside this binary; here a command is only
//! recognized and logged.

use aniwa_core::config::BotConfig;
use aniwa_core::types::WebMessage;

/// A prefixed command found in a message.
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    /// Command name, lowercased, without the prefix.
    pub command: String,
    pub args: Vec<String>,
    pub chat_id: String,
    pub sender: String,
    pub from_owner: bool,
}

/// Parse `"<prefix><command> args..."`. Own messages and plain chat yield `None`.
pub fn parse_invocation(msg: &WebMessage, bot: &BotConfig) -> Option<Invocation> {
    if msg.key.from_me || bot.prefix.is_empty() {
        return None;
    }

    let body = msg.text()?.trim_start().strip_prefix(bot.prefix.as_str())?;
    let mut words = body.split_whitespace();
    let command = words.next()?.to_lowercase();
    let sender = msg.sender()?.to_string();

    Some(Invocation {
        command,
        args: words.map(str::to_string).collect(),
        chat_id: msg.chat_id().unwrap_or(&sender).to_string(),
        from_owner: bot.is_owner(&sender),
        sender,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aniwa_core::types::MessageKey;
    use serde_json::json;

    fn message(text: &str, participant: Option<&str>) -> WebMessage {
        WebMessage {
            key: MessageKey {
                remote_jid: Some("1203630@g.us".into()),
                from_me: false,
                id: Some("ABC".into()),
                participant: participant.map(str::to_string),
            },
            message: Some(json!({ "conversation": text })),
            ..Default::default()
        }
    }

    fn bot() -> BotConfig {
        BotConfig {
            owner: vec!["15550001111".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_command_with_args() {
        let msg = message("!Subscribe Kaiju No. 8", Some("15550002222@s.whatsapp.net"));
        let inv = parse_invocation(&msg, &bot()).unwrap();
        assert_eq!(inv.command, "subscribe");
        assert_eq!(inv.args, vec!["Kaiju", "No.", "8"]);
        assert_eq!(inv.chat_id, "1203630@g.us");
        assert_eq!(inv.sender, "15550002222@s.whatsapp.net");
        assert!(!inv.from_owner);
    }

    #[test]
    fn test_owner_detection() {
        let msg = message("!reset", Some("15550001111@s.whatsapp.net"));
        assert!(parse_invocation(&msg, &bot()).unwrap().from_owner);
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert!(parse_invocation(&message("hello", None), &bot()).is_none());
        assert!(parse_invocation(&message("!", None), &bot()).is_none());
    }

    #[test]
    fn test_own_messages_ignored() {
        let mut msg = message("!help", None);
        msg.key.from_me = true;
        assert!(parse_invocation(&msg, &bot()).is_none());
    }

    #[test]
    fn test_extended_text_body() {
        let mut msg = message("", None);
        msg.message = Some(json!({ "extendedTextMessage": { "text": "!today" } }));
        let inv = parse_invocation(&msg, &bot()).unwrap();
        assert_eq!(inv.command, "today");
        assert_eq!(inv.sender, "1203630@g.us");
    }
}
