//! Long-polling loop for `domain-scout run`.
//!
//! Updates are fetched with `getUpdates` and handled one at a time in arrival
//! order. The offset advances past every update received, handled or not, so
//! a message that fails is never redelivered. A failed poll is logged and the
//! loop waits `poll_interval` before polling again. Cancellation is checked
//! between polls; a message already being handled is allowed to finish.

use tokio_util::sync::CancellationToken;

use crate::bot::ScoutBot;
use crate::config::BotConfig;
use crate::lookup::liveness::LivenessProbe;
use crate::lookup::records::RecordResolver;
use crate::lookup::registration::RegistrationSource;
use crate::telegram::{Messenger, UpdateSource};

/// Poll for updates and feed them to `bot` until `cancel` fires.
pub async fn run_polling<R, W, P, M>(
    bot: &ScoutBot<R, W, P, M>,
    config: &BotConfig,
    cancel: CancellationToken,
) -> crate::Result<()>
where
    R: RecordResolver,
    W: RegistrationSource,
    P: LivenessProbe,
    M: Messenger + UpdateSource,
{
    let mut offset: Option<i64> = None;
    tracing::info!(
        poll_timeout_secs = config.poll_timeout_secs,
        "bot is online and awaiting messages"
    );

    loop {
        let polled = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("polling cancelled");
                return Ok(());
            }
            result = bot.messenger().get_updates(offset, config.poll_timeout_secs) => result,
        };

        let updates = match polled {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!(error = %e, "getUpdates failed, waiting before next poll");
                tokio::select! {
                    _ = tokio::time::sleep(config.poll_interval()) => {}
                    _ = cancel.cancelled() => {
                        tracing::info!("polling cancelled");
                        return Ok(());
                    }
                }
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(message) = update.message.as_ref() else {
                continue;
            };
            if let Err(e) = bot.handle_message(message).await {
                tracing::error!(
                    update_id = %update.update_id,
                    chat_id = %message.chat.id,
                    error = %e,
                    "update caused error"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::tests::{FakeProbe, FakeRecords, FakeWhois, RecordingMessenger, Sent};
    use crate::error::ScoutError;
    use crate::lookup::Lookups;
    use crate::preferences::PreferenceStore;
    use crate::render::Renderer;
    use crate::telegram::{Chat, Message, Update};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Serves scripted poll results, then cancels the loop once the script runs out.
    struct ScriptedUpdates {
        script: Mutex<VecDeque<crate::Result<Vec<Update>>>>,
        offsets: Mutex<Vec<Option<i64>>>,
        cancel: CancellationToken,
        messenger: RecordingMessenger,
    }

    impl UpdateSource for ScriptedUpdates {
        async fn get_updates(
            &self,
            offset: Option<i64>,
            _timeout_secs: u64,
        ) -> crate::Result<Vec<Update>> {
            self.offsets.lock().unwrap().push(offset);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(result) => result,
                None => {
                    self.cancel.cancel();
                    Ok(Vec::new())
                }
            }
        }
    }

    impl Messenger for ScriptedUpdates {
        async fn send_text(
            &self,
            chat_id: i64,
            reply_to: Option<i64>,
            text: &str,
        ) -> crate::Result<()> {
            self.messenger.send_text(chat_id, reply_to, text).await
        }

        async fn send_document(
            &self,
            chat_id: i64,
            reply_to: Option<i64>,
            file_name: &str,
            contents: Vec<u8>,
        ) -> crate::Result<()> {
            self.messenger
                .send_document(chat_id, reply_to, file_name, contents)
                .await
        }
    }

    fn text_update(update_id: i64, chat_id: i64, text: &str) -> Update {
        Update {
            update_id,
            message: Some(Message {
                message_id: update_id * 10,
                chat: Chat { id: chat_id },
                from: None,
                text: Some(text.to_string()),
            }),
        }
    }

    fn fast_config() -> BotConfig {
        BotConfig {
            poll_interval_secs: 0,
            ..BotConfig::default()
        }
    }

    #[tokio::test]
    async fn test_polling_handles_updates_in_order_and_advances_offset() {
        let cancel = CancellationToken::new();
        let source = ScriptedUpdates {
            script: Mutex::new(VecDeque::from(vec![
                Ok(vec![
                    text_update(100, 1, "/start"),
                    Update {
                        update_id: 101,
                        message: None,
                    },
                ]),
                Err(ScoutError::TelegramApi(
                    "getUpdates".to_string(),
                    "Bad Gateway".to_string(),
                )),
                Ok(vec![text_update(102, 1, "!dns example.com")]),
            ])),
            offsets: Mutex::new(Vec::new()),
            cancel: cancel.clone(),
            messenger: RecordingMessenger::default(),
        };
        let bot = ScoutBot::new(
            Lookups {
                records: FakeRecords,
                registration: FakeWhois,
                liveness: FakeProbe,
            },
            Arc::new(PreferenceStore::new()),
            Renderer::default(),
            source,
        );

        run_polling(&bot, &fast_config(), cancel).await.unwrap();

        let source = bot.messenger();
        assert_eq!(
            *source.offsets.lock().unwrap(),
            vec![None, Some(102), Some(102), Some(103)]
        );
        let texts: Vec<String> = source
            .messenger
            .sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                "Welcome to the multifunctioning Domain Tool".to_string(),
                "A: 93.184.216.34".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_polling_stops_when_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = ScriptedUpdates {
            script: Mutex::new(VecDeque::new()),
            offsets: Mutex::new(Vec::new()),
            cancel: cancel.clone(),
            messenger: RecordingMessenger::default(),
        };
        let bot = ScoutBot::new(
            Lookups {
                records: FakeRecords,
                registration: FakeWhois,
                liveness: FakeProbe,
            },
            Arc::new(PreferenceStore::new()),
            Renderer::default(),
            source,
        );

        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            run_polling(&bot, &fast_config(), cancel),
        )
        .await
        .expect("loop should exit promptly")
        .unwrap();
    }
}
