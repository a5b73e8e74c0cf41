//! Telegram Bot API front end: long polling, inline keyboards, and one
//! worker task per user so each user's messages are handled in order.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use log::{debug, info, warn};
use netpilot::session::Connector;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;

use super::engine::{Conversation, Keyboard, Reply, UserId};
use super::flow::Event;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Pause after a failed poll before trying again.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// How often idle users and their workers are looked for.
const FORGET_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// One update reduced to what the engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Incoming {
    chat_id: i64,
    message_id: i64,
    callback_id: Option<String>,
    event: Event,
}

impl Update {
    fn into_incoming(self) -> Option<(UserId, Incoming)> {
        if let Some(query) = self.callback_query {
            let message = query.message?;
            return Some((
                query.from.id,
                Incoming {
                    chat_id: message.chat.id,
                    message_id: message.message_id,
                    callback_id: Some(query.id),
                    event: Event::Button(query.data?),
                },
            ));
        }

        let message = self.message?;
        let user = message.from.as_ref()?.id;
        let event = Event::from_text(message.text.as_deref()?)?;
        Some((
            user,
            Incoming {
                chat_id: message.chat.id,
                message_id: message.message_id,
                callback_id: None,
                event,
            },
        ))
    }
}

#[derive(Debug, Serialize)]
struct InlineButton<'a> {
    text: &'a str,
    callback_data: &'a str,
}

fn reply_markup(keyboard: &Keyboard) -> serde_json::Value {
    let rows: Vec<Vec<InlineButton<'_>>> = keyboard
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| InlineButton {
                    text: &b.text,
                    callback_data: &b.data,
                })
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

/// Thin client over the Bot API methods the bot uses.
#[derive(Clone)]
pub struct BotApi {
    client: reqwest::Client,
    api_url: String,
    token: Arc<SecretString>,
}

impl BotApi {
    pub fn new(token: SecretString, api_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: Arc::new(token),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> anyhow::Result<T> {
        let url = format!("{}/bot{}/{}", self.api_url, self.token.expose_secret(), method);
        let response: ApiResponse<T> = self
            .client
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("{method} request failed"))?
            .json()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("{method} returned an unreadable body"))?;

        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => bail!(
                "{method} failed: {}",
                description.as_deref().unwrap_or("no description")
            ),
        }
    }

    pub async fn get_updates(&self, offset: i64, poll_timeout: Duration) -> anyhow::Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": poll_timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        self.call("getUpdates", &body, poll_timeout + Duration::from_secs(10))
            .await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str, keyboard: &Keyboard) -> anyhow::Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if !keyboard.is_empty() {
            body["reply_markup"] = reply_markup(keyboard);
        }

        if let Err(e) = self
            .call::<serde_json::Value>("sendMessage", &body, Duration::from_secs(30))
            .await
        {
            // Device output can break Markdown entities; resend as plain text.
            debug!("sendMessage with Markdown failed ({}), retrying as plain text", e);
            if let Some(fields) = body.as_object_mut() {
                fields.remove("parse_mode");
            }
            self.call::<serde_json::Value>("sendMessage", &body, Duration::from_secs(30))
                .await?;
        }
        Ok(())
    }

    pub async fn answer_callback(&self, callback_id: &str) -> anyhow::Result<()> {
        let body = json!({ "callback_query_id": callback_id });
        self.call::<bool>("answerCallbackQuery", &body, Duration::from_secs(10))
            .await?;
        Ok(())
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> anyhow::Result<()> {
        let body = json!({ "chat_id": chat_id, "message_id": message_id });
        self.call::<bool>("deleteMessage", &body, Duration::from_secs(10))
            .await?;
        Ok(())
    }
}

/// The bot: polls for updates and hands them to per-user workers.
pub struct TelegramBot<C: Connector> {
    api: BotApi,
    conversation: Arc<Conversation<C>>,
    poll_timeout: Duration,
    idle_timeout: Duration,
    workers: HashMap<UserId, mpsc::UnboundedSender<Incoming>>,
}

impl<C: Connector> TelegramBot<C> {
    /// Users without sessions are forgotten, and their workers stopped,
    /// once they have been quiet for `idle_timeout`.
    pub fn new(
        api: BotApi,
        conversation: Arc<Conversation<C>>,
        poll_timeout: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            api,
            conversation,
            poll_timeout,
            idle_timeout,
            workers: HashMap::new(),
        }
    }

    /// Poll until `shutdown` resolves.
    pub async fn run(mut self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        tokio::pin!(shutdown);
        let mut offset = 0;
        let mut last_forget = Instant::now();
        info!("Telegram bot polling for updates");

        loop {
            if last_forget.elapsed() >= FORGET_INTERVAL {
                self.forget_idle_users().await;
                last_forget = Instant::now();
            }

            let updates = tokio::select! {
                _ = &mut shutdown => break,
                updates = self.api.get_updates(offset, self.poll_timeout) => updates,
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some((user, incoming)) = update.into_incoming() {
                            self.dispatch(user, incoming);
                        }
                    }
                }
                Err(e) => {
                    warn!("polling failed: {:#}", e);
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(RETRY_DELAY) => {}
                    }
                }
            }
        }

        info!("Telegram bot stopping");
        self.workers.clear();
        self.conversation.shutdown().await;
        Ok(())
    }

    /// Drop idle users; a worker ends once its queue is drained and its
    /// sender is gone.
    async fn forget_idle_users(&mut self) {
        for user in self.conversation.forget_idle(self.idle_timeout).await {
            self.workers.remove(&user);
        }
    }

    fn dispatch(&mut self, user: UserId, incoming: Incoming) {
        let incoming = match self.workers.get(&user) {
            Some(worker) => match worker.send(incoming) {
                Ok(()) => return,
                Err(mpsc::error::SendError(incoming)) => incoming,
            },
            None => incoming,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(worker(
            user,
            rx,
            self.api.clone(),
            Arc::clone(&self.conversation),
        ));
        // The receiver was just created, so this cannot fail.
        let _ = tx.send(incoming);
        self.workers.insert(user, tx);
    }
}

async fn worker<C: Connector>(
    user: UserId,
    mut rx: mpsc::UnboundedReceiver<Incoming>,
    api: BotApi,
    conversation: Arc<Conversation<C>>,
) {
    debug!("worker for user {} started", user);
    while let Some(incoming) = rx.recv().await {
        if let Some(callback_id) = &incoming.callback_id {
            if let Err(e) = api.answer_callback(callback_id).await {
                debug!("answerCallbackQuery: {:#}", e);
            }
        }

        for reply in conversation.handle(user, incoming.event).await {
            let sent = match &reply {
                Reply::Message { text, keyboard } => {
                    api.send_message(incoming.chat_id, text, keyboard).await
                }
                Reply::DeleteIncoming => api.delete_message(incoming.chat_id, incoming.message_id).await,
            };
            if let Err(e) = sent {
                warn!("user {}: reply not delivered: {:#}", user, e);
            }
        }
    }
    debug!("worker for user {} stopped", user);
}

#[cfg(test)]
mod tests {
    use axum::extract::{Path, State};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::Mutex;
    use tokio_test::assert_ok;

    use netpilot::session::SessionManager;

    use super::*;
    use crate::chat::engine::Button;
    use crate::chat::flow::Command;
    use crate::testing::FakeConnector;

    #[test]
    fn test_text_update() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 10,
            "message": {
                "message_id": 5,
                "chat": {"id": 77, "type": "private"},
                "from": {"id": 42, "is_bot": false, "first_name": "A"},
                "text": "/start"
            }
        }))
        .unwrap();

        let (user, incoming) = update.into_incoming().unwrap();
        assert_eq!(user, 42);
        assert_eq!(incoming.chat_id, 77);
        assert_eq!(incoming.message_id, 5);
        assert_eq!(incoming.event, Event::Command(Command::Start));
    }

    #[test]
    fn test_callback_update() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 11,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 42, "is_bot": false, "first_name": "A"},
                "message": {"message_id": 6, "chat": {"id": 77, "type": "private"}},
                "chat_instance": "x",
                "data": "connect"
            }
        }))
        .unwrap();

        let (user, incoming) = update.into_incoming().unwrap();
        assert_eq!(user, 42);
        assert_eq!(incoming.callback_id.as_deref(), Some("cb1"));
        assert_eq!(incoming.event, Event::Button("connect".into()));
    }

    #[test]
    fn test_ignored_updates() {
        // Photos, unknown commands and edited messages carry nothing to handle.
        for update in [
            json!({"update_id": 1, "message": {"message_id": 1, "chat": {"id": 1}, "from": {"id": 1}}}),
            json!({"update_id": 2, "message": {"message_id": 2, "chat": {"id": 1}, "from": {"id": 1}, "text": "/reboot"}}),
            json!({"update_id": 3, "edited_message": {"message_id": 3, "chat": {"id": 1}}}),
        ] {
            let update: Update = serde_json::from_value(update).unwrap();
            assert!(update.into_incoming().is_none());
        }
    }

    #[test]
    fn test_keyboard_markup() {
        let keyboard = vec![
            vec![Button::new("✅ Execute", "execute"), Button::new("❌ Cancel", "cancel")],
            vec![Button::new("↩️ Back to Main Menu", "main_menu")],
        ];
        assert_eq!(
            reply_markup(&keyboard),
            json!({"inline_keyboard": [
                [{"text": "✅ Execute", "callback_data": "execute"},
                 {"text": "❌ Cancel", "callback_data": "cancel"}],
                [{"text": "↩️ Back to Main Menu", "callback_data": "main_menu"}]
            ]})
        );
    }

    type Calls = Arc<Mutex<Vec<(String, serde_json::Value)>>>;

    async fn fake_api(calls: Calls) -> String {
        async fn method(
            State(calls): State<Calls>,
            Path((_token, method)): Path<(String, String)>,
            Json(body): Json<serde_json::Value>,
        ) -> Json<serde_json::Value> {
            let markdown = body.get("parse_mode").is_some();
            let unbalanced = body["text"].as_str().is_some_and(|t| t.contains('_'));
            calls.lock().unwrap().push((method, body));
            if markdown && unbalanced {
                return Json(json!({"ok": false, "description": "Bad Request: can't parse entities"}));
            }
            Json(json!({"ok": true, "result": true}))
        }

        let app = Router::new()
            .route("/:token/:method", post(method))
            .with_state(calls);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_send_message_falls_back_to_plain_text() {
        let calls = Calls::default();
        let api = BotApi::new(SecretString::from("123:abc"), fake_api(Arc::clone(&calls)).await).unwrap();

        assert_ok!(
            api.send_message(7, "GigabitEthernet0/1 admin_down", &Vec::new())
                .await
        );

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "sendMessage");
        assert_eq!(calls[0].1["parse_mode"], "Markdown");
        assert!(calls[1].1.get("parse_mode").is_none());
        assert!(calls[1].1.get("reply_markup").is_none());
    }

    #[tokio::test]
    async fn test_api_error_description() {
        let calls = Calls::default();
        let api = BotApi::new(SecretString::from("123:abc"), fake_api(calls).await).unwrap();

        // The plain resend succeeds.
        assert_ok!(api.send_message(7, "a_b", &Vec::new()).await);

        let err = api
            .call::<bool>(
                "sendMessage",
                &json!({"text": "x_y", "parse_mode": "Markdown"}),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "sendMessage failed: Bad Request: can't parse entities");
    }

    #[tokio::test]
    async fn test_idle_user_worker_is_stopped() {
        let calls = Calls::default();
        let api = BotApi::new(SecretString::from("123:abc"), fake_api(Arc::clone(&calls)).await).unwrap();
        let sessions = Arc::new(SessionManager::new(FakeConnector::default()));
        let conversation = Arc::new(Conversation::new(sessions));
        let mut bot = TelegramBot::new(
            api,
            Arc::clone(&conversation),
            Duration::from_secs(1),
            Duration::ZERO,
        );

        bot.dispatch(
            42,
            Incoming {
                chat_id: 77,
                message_id: 5,
                callback_id: None,
                event: Event::Command(Command::Start),
            },
        );
        let worker = bot.workers[&42].downgrade();

        // Welcome and menu.
        tokio::time::timeout(Duration::from_secs(5), async {
            while calls.lock().unwrap().len() < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(conversation.user_count().await, 1);

        bot.forget_idle_users().await;
        assert!(bot.workers.is_empty());
        assert!(worker.upgrade().is_none());
        assert_eq!(conversation.user_count().await, 0);
    }
}
