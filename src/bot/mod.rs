//! Bot runtime: turns one inbound chat message into replies.
//!
//! Flow per message: parse → (`/start`, `/help`, `!output` answered directly)
//! or dispatch to a lookup → render by the chat's preference → send.
//! Lookup and delivery failures become a visible reply in the chat and a
//! `warn` line in the log.

pub mod polling;

use std::sync::Arc;

use crate::command::{dispatch, parse_command, Command, HELP_TEXT, START_TEXT};
use crate::lookup::liveness::LivenessProbe;
use crate::lookup::records::RecordResolver;
use crate::lookup::registration::RegistrationSource;
use crate::lookup::Lookups;
use crate::preferences::PreferenceStore;
use crate::render::{Rendered, Renderer};
use crate::telegram::{Message, Messenger};

pub use polling::run_polling;

/// Reply sent for one message, before rendering.
#[derive(Debug)]
pub enum Reply {
    /// Always sent inline (help texts, preference confirmations).
    Direct(String),
    /// Lookup output, rendered according to the chat's preference.
    Lookup(crate::Result<String>),
}

/// The chat bot: lookups, per-chat preferences, a renderer and an outbound messenger.
pub struct ScoutBot<R, W, P, M> {
    lookups: Lookups<R, W, P>,
    preferences: Arc<PreferenceStore>,
    renderer: Renderer,
    messenger: M,
}

impl<R, W, P, M> ScoutBot<R, W, P, M>
where
    R: RecordResolver,
    W: RegistrationSource,
    P: LivenessProbe,
    M: Messenger,
{
    pub fn new(
        lookups: Lookups<R, W, P>,
        preferences: Arc<PreferenceStore>,
        renderer: Renderer,
        messenger: M,
    ) -> Self {
        Self {
            lookups,
            preferences,
            renderer,
            messenger,
        }
    }

    pub fn messenger(&self) -> &M {
        &self.messenger
    }

    pub fn preferences(&self) -> &Arc<PreferenceStore> {
        &self.preferences
    }

    /// Work out the reply for a message text without sending anything.
    pub async fn reply_for(&self, chat_id: i64, text: &str) -> Reply {
        let command = parse_command(text);
        match command {
            Command::Start => Reply::Direct(START_TEXT.to_string()),
            Command::Help => Reply::Direct(HELP_TEXT.to_string()),
            Command::SetOutput => {
                Reply::Direct(self.preferences.set_preference(chat_id, text).await)
            }
            _ => Reply::Lookup(dispatch(&command, &self.lookups).await),
        }
    }

    /// Handle one inbound message end to end.
    ///
    /// Messages without text are ignored. Returns `Err` only when even the
    /// failure notice could not be delivered.
    pub async fn handle_message(&self, message: &Message) -> crate::Result<()> {
        let Some(text) = message.text.as_deref() else {
            tracing::debug!(message_id = %message.message_id, "ignoring non-text message");
            return Ok(());
        };
        let chat_id = message.chat.id;
        let reply_to = Some(message.message_id);

        let user = message.from.as_ref();
        tracing::info!(
            chat_id = %chat_id,
            user_id = ?user.map(|u| u.id),
            username = ?user.and_then(|u| u.username.as_deref()),
            text = %text,
            "message received"
        );

        match self.reply_for(chat_id, text).await {
            Reply::Direct(reply) => self.send_inline(chat_id, reply_to, &reply).await,
            Reply::Lookup(Ok(result)) => {
                if let Err(e) = self.deliver(chat_id, reply_to, &result).await {
                    tracing::warn!(chat_id = %chat_id, error = %e, "failed to deliver result");
                    let notice = format!("Could not deliver the result: {}", e);
                    self.send_inline(chat_id, reply_to, &notice).await?;
                }
                Ok(())
            }
            Reply::Lookup(Err(e)) => {
                tracing::warn!(chat_id = %chat_id, text = %text, error = %e, "lookup failed");
                self.send_inline(chat_id, reply_to, &format!("Lookup failed: {}", e))
                    .await
            }
        }
    }

    /// Render a lookup result by the chat's preference and send it.
    async fn deliver(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        result: &str,
    ) -> crate::Result<()> {
        let format = self.preferences.get_preference(chat_id).await;
        match self.renderer.render(result, format)? {
            Rendered::Inline(chunks) => {
                for chunk in chunks {
                    self.messenger.send_text(chat_id, reply_to, &chunk).await?;
                }
                Ok(())
            }
            Rendered::File(artifact) => {
                let contents = artifact.contents().await?;
                self.messenger
                    .send_document(chat_id, reply_to, artifact.file_name(), contents)
                    .await
                // artifact dropped here; temp file removed
            }
        }
    }

    async fn send_inline(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        text: &str,
    ) -> crate::Result<()> {
        for chunk in crate::render::split_message(text, crate::render::MESSAGE_LIMIT) {
            self.messenger.send_text(chat_id, reply_to, &chunk).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ScoutError;
    use crate::lookup::records::RecordKind;
    use crate::telegram::{Chat, User};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Everything a `RecordingMessenger` was asked to send.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Sent {
        Text {
            chat_id: i64,
            reply_to: Option<i64>,
            text: String,
        },
        Document {
            chat_id: i64,
            file_name: String,
            contents: String,
        },
    }

    #[derive(Default)]
    pub(crate) struct RecordingMessenger {
        pub(crate) sent: Mutex<Vec<Sent>>,
        pub(crate) fail_documents: bool,
    }

    impl RecordingMessenger {
        pub(crate) fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Messenger for RecordingMessenger {
        async fn send_text(
            &self,
            chat_id: i64,
            reply_to: Option<i64>,
            text: &str,
        ) -> crate::Result<()> {
            self.sent.lock().unwrap().push(Sent::Text {
                chat_id,
                reply_to,
                text: text.to_string(),
            });
            Ok(())
        }

        async fn send_document(
            &self,
            chat_id: i64,
            _reply_to: Option<i64>,
            file_name: &str,
            contents: Vec<u8>,
        ) -> crate::Result<()> {
            if self.fail_documents {
                return Err(ScoutError::TelegramApi(
                    "sendDocument".to_string(),
                    "Request Entity Too Large".to_string(),
                ));
            }
            // Yield so concurrent handlers interleave
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.sent.lock().unwrap().push(Sent::Document {
                chat_id,
                file_name: file_name.to_string(),
                contents: String::from_utf8(contents).unwrap(),
            });
            Ok(())
        }
    }

    pub(crate) struct FakeRecords;
    pub(crate) struct FakeWhois;
    pub(crate) struct FakeProbe;

    impl RecordResolver for FakeRecords {
        async fn resolve(&self, domain: &str, kind: RecordKind) -> crate::Result<Vec<String>> {
            match (domain, kind) {
                ("example.com", RecordKind::A) => Ok(vec!["93.184.216.34".to_string()]),
                ("example.org", RecordKind::A) => Ok(vec!["198.51.100.7".to_string()]),
                _ => Ok(vec![]),
            }
        }
    }

    impl RegistrationSource for FakeWhois {
        async fn whois(&self, domain: &str) -> crate::Result<String> {
            Err(ScoutError::WhoisTimeout(format!("whois.nic.{}", domain)))
        }
    }

    impl LivenessProbe for FakeProbe {
        async fn get_status(&self, _url: &str) -> crate::Result<u16> {
            Ok(200)
        }
    }

    type TestBot = ScoutBot<FakeRecords, FakeWhois, FakeProbe, RecordingMessenger>;

    fn bot_with(messenger: RecordingMessenger, renderer: Renderer) -> TestBot {
        ScoutBot::new(
            Lookups {
                records: FakeRecords,
                registration: FakeWhois,
                liveness: FakeProbe,
            },
            Arc::new(PreferenceStore::new()),
            renderer,
            messenger,
        )
    }

    fn message(chat_id: i64, message_id: i64, text: &str) -> Message {
        Message {
            message_id,
            chat: Chat { id: chat_id },
            from: None,
            text: Some(text.to_string()),
        }
    }

    fn texts(sent: &[Sent]) -> Vec<&str> {
        sent.iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_inline_dns_reply() {
        let bot = bot_with(RecordingMessenger::default(), Renderer::default());
        bot.handle_message(&message(1, 10, "!dns example.com")).await.unwrap();
        assert_eq!(
            bot.messenger().sent(),
            vec![Sent::Text {
                chat_id: 1,
                reply_to: Some(10),
                text: "A: 93.184.216.34".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_start_and_help() {
        let bot = bot_with(RecordingMessenger::default(), Renderer::default());
        bot.handle_message(&message(1, 1, "/start")).await.unwrap();
        bot.handle_message(&message(1, 2, "/help")).await.unwrap();
        let sent = bot.messenger().sent();
        let texts = texts(&sent);
        assert_eq!(texts[0], START_TEXT);
        assert!(texts[1].contains("!status domainhere"));
    }

    #[tokio::test]
    async fn test_unrecognized_message() {
        let bot = bot_with(RecordingMessenger::default(), Renderer::default());
        bot.handle_message(&message(1, 1, "hello")).await.unwrap();
        assert_eq!(
            texts(&bot.messenger().sent()),
            vec!["No command recognized or invalid format."]
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_is_reported() {
        let bot = bot_with(RecordingMessenger::default(), Renderer::default());
        bot.handle_message(&message(1, 1, "!whois example.com")).await.unwrap();
        assert_eq!(
            texts(&bot.messenger().sent()),
            vec!["Lookup failed: WHOIS query to 'whois.nic.example.com' timed out"]
        );
    }

    #[tokio::test]
    async fn test_message_with_sender_is_answered() {
        let bot = bot_with(RecordingMessenger::default(), Renderer::default());
        let mut msg = message(3, 4, "!status example.com");
        msg.from = Some(User {
            id: 55,
            username: Some("sam".to_string()),
        });
        bot.handle_message(&msg).await.unwrap();
        assert_eq!(
            texts(&bot.messenger().sent()),
            vec!["Server is online and functioning."]
        );
    }

    #[tokio::test]
    async fn test_non_text_message_ignored() {
        let bot = bot_with(RecordingMessenger::default(), Renderer::default());
        let mut msg = message(1, 1, "");
        msg.text = None;
        bot.handle_message(&msg).await.unwrap();
        assert!(bot.messenger().sent().is_empty());
    }

    #[tokio::test]
    async fn test_json_preference_sends_document() {
        let dir = tempfile::tempdir().unwrap();
        let bot = bot_with(
            RecordingMessenger::default(),
            Renderer::new(Some(dir.path().to_path_buf())),
        );
        bot.handle_message(&message(5, 1, "!output json")).await.unwrap();
        bot.handle_message(&message(5, 2, "!status example.com")).await.unwrap();

        let sent = bot.messenger().sent();
        assert_eq!(texts(&sent), vec!["JSON saved as your preferred output."]);
        assert_eq!(
            sent[1],
            Sent::Document {
                chat_id: 5,
                file_name: "info.json".to_string(),
                contents: "{\n    \"response\": \"Server is online and functioning.\"\n}"
                    .to_string(),
            }
        );
        // Temp file cleaned up after sending
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_document_send_cleans_up_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = RecordingMessenger {
            fail_documents: true,
            ..RecordingMessenger::default()
        };
        let bot = bot_with(messenger, Renderer::new(Some(dir.path().to_path_buf())));
        bot.handle_message(&message(5, 1, "!output txt")).await.unwrap();
        bot.handle_message(&message(5, 2, "!dns example.com")).await.unwrap();

        let sent = bot.messenger().sent();
        assert_eq!(
            texts(&sent)[1],
            "Could not deliver the result: Telegram API error in sendDocument: Request Entity Too Large"
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_output_keeps_preference() {
        let bot = bot_with(RecordingMessenger::default(), Renderer::default());
        bot.handle_message(&message(9, 1, "!output txt")).await.unwrap();
        bot.handle_message(&message(9, 2, "!output xml")).await.unwrap();
        assert_eq!(
            texts(&bot.messenger().sent()),
            vec!["TXT saved as your preferred output.", "Using messages by default."]
        );
        assert_eq!(
            bot.preferences().get_preference(9).await,
            crate::preferences::OutputFormat::Txt
        );
    }

    #[tokio::test]
    async fn test_concurrent_file_requests_do_not_mix() {
        let dir = tempfile::tempdir().unwrap();
        let bot = bot_with(
            RecordingMessenger::default(),
            Renderer::new(Some(dir.path().to_path_buf())),
        );
        bot.handle_message(&message(1, 1, "!output txt")).await.unwrap();
        bot.handle_message(&message(2, 1, "!output txt")).await.unwrap();

        let first = message(1, 2, "!dns example.com");
        let second = message(2, 2, "!dns example.org");
        let (a, b) = tokio::join!(bot.handle_message(&first), bot.handle_message(&second));
        a.unwrap();
        b.unwrap();

        let documents: Vec<Sent> = bot
            .messenger()
            .sent()
            .into_iter()
            .filter(|s| matches!(s, Sent::Document { .. }))
            .collect();
        assert_eq!(documents.len(), 2);
        for doc in documents {
            match doc {
                Sent::Document {
                    chat_id: 1,
                    file_name,
                    contents,
                } => {
                    assert_eq!(file_name, "info.txt");
                    assert_eq!(contents, "A: 93.184.216.34");
                }
                Sent::Document {
                    chat_id: 2,
                    contents,
                    ..
                } => assert_eq!(contents, "A: 198.51.100.7"),
                other => panic!("unexpected send {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_reply_for_without_sending() {
        let bot = bot_with(RecordingMessenger::default(), Renderer::default());
        match bot.reply_for(1, "!dns nowhere.invalid").await {
            Reply::Lookup(Ok(text)) => assert_eq!(text, "No information available."),
            other => panic!("unexpected reply {:?}", other),
        }
        assert!(bot.messenger().sent().is_empty());
    }
}
