//! Runs the transition table against per-user state and the session
//! manager.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use netpilot::driver::DEFAULT_PLATFORM;
use netpilot::error::{ErrorKind, ErrorReport};
use netpilot::session::{
    CONFIG_BLOCK, Connector, DEFAULT_SSH_PORT, DeviceCredentials, DeviceSlot, SessionKey,
    SessionManager, SessionSummary,
};
use netpilot::template::Fields;
use secrecy::SecretString;
use tokio::sync::Mutex;

use super::flow::{self, Action, Answer, Command, Event, State, Wizard, WizardId};

pub type UserId = i64;

/// One inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

pub type Keyboard = Vec<Vec<Button>>;

/// Something the front end should do in response to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A Markdown message, optionally with an inline keyboard.
    Message { text: String, keyboard: Keyboard },
    /// Delete the user's message (it carried a secret).
    DeleteIncoming,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Message {
            text: text.into(),
            keyboard: Vec::new(),
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Reply::Message {
            text: text.into(),
            keyboard,
        }
    }
}

const WELCOME: &str = "🌐 *Welcome to Network Automation Bot!*\n\n\
I can help you configure Cisco network devices (routers and switches).\n\
Let's start by connecting to a device.";

const HELP: &str = "🌐 *Network Automation Bot Help*\n\n\
*Available Commands:*\n\
/start - Start the bot\n\
/help - Show this help message\n\
/cancel - Cancel current operation\n\n\
*Features:*\n\
• Connect to multiple devices (Router & Switch)\n\
• Switch between connected devices\n\
• Configure interface IP addresses\n\
• Configure VLANs (Switch only)\n\
• Configure DHCP (Router only)\n\
• View interface status\n\
• Interactive button-based navigation\n\n\
*Security Notes:*\n\
• Passwords are deleted after receipt\n\
• Sessions are temporary\n\
• Use in secure environments only\n\n\
*Default Switch IP:* 192.168.122.6";

const STATUS_COMMAND: &str = "show ip interface brief";

fn back_to_menu() -> Keyboard {
    vec![vec![Button::new("↩️ Back to Main Menu", "main_menu")]]
}

fn title(slot: DeviceSlot) -> &'static str {
    match slot {
        DeviceSlot::Router => "Router",
        DeviceSlot::Switch => "Switch",
        DeviceSlot::Adhoc => "Device",
    }
}

fn other(slot: DeviceSlot) -> DeviceSlot {
    match slot {
        DeviceSlot::Router => DeviceSlot::Switch,
        _ => DeviceSlot::Router,
    }
}

/// Conversation state of one chat user. Login secrets sit in `secrets` only
/// between their prompt and the connect attempt.
#[derive(Default)]
struct UserState {
    state: State,
    connecting: Option<DeviceSlot>,
    current: Option<DeviceSlot>,
    draft: Fields,
    secrets: HashMap<&'static str, SecretString>,
    last_event: Option<Instant>,
}

impl UserState {
    fn clear_draft(&mut self) {
        self.draft.clear();
        self.secrets.clear();
        self.connecting = None;
    }
}

/// The chat front end's engine, independent of any chat service.
pub struct Conversation<C: Connector> {
    sessions: Arc<SessionManager<C>>,
    users: Mutex<HashMap<UserId, Arc<Mutex<UserState>>>>,
}

impl<C: Connector> Conversation<C> {
    pub fn new(sessions: Arc<SessionManager<C>>) -> Self {
        Self {
            sessions,
            users: Mutex::new(HashMap::new()),
        }
    }

    fn key(user: UserId, slot: DeviceSlot) -> SessionKey {
        SessionKey::new(user.to_string(), slot)
    }

    /// Handle one event. Events of one user are processed one at a time;
    /// different users proceed independently.
    pub async fn handle(&self, user: UserId, event: Event) -> Vec<Reply> {
        let cell = {
            let mut users = self.users.lock().await;
            Arc::clone(users.entry(user).or_default())
        };
        let mut user_state = cell.lock().await;
        user_state.last_event = Some(Instant::now());

        let mut out = Vec::new();
        let Some((next, action)) = flow::transition(user_state.state, &event) else {
            debug!("user {}: unhandled event in {:?}", user, user_state.state);
            if matches!(event, Event::Text(_)) && user_state.state == State::MainMenu {
                out.push(Reply::text("Please use the menu buttons below."));
                out.push(self.menu(user, &mut user_state).await);
            }
            return out;
        };

        let next = next.resolve(user_state.state);
        let target = self
            .perform(user, &mut user_state, action, &event, &mut out)
            .await;
        user_state.state = target.unwrap_or(next);
        out
    }

    /// Run `action`. Returns a state overriding the table's.
    async fn perform(
        &self,
        user: UserId,
        us: &mut UserState,
        action: Action,
        event: &Event,
        out: &mut Vec<Reply>,
    ) -> Option<State> {
        match action {
            Action::Welcome => {
                us.clear_draft();
                out.push(Reply::text(WELCOME));
                out.push(self.menu(user, us).await);
                None
            }
            Action::Help => {
                out.push(Reply::text(HELP));
                None
            }
            Action::Cancel => {
                us.clear_draft();
                out.push(Reply::text("Operation cancelled."));
                out.push(self.menu(user, us).await);
                None
            }
            Action::ShowMenu => {
                out.push(self.menu(user, us).await);
                None
            }
            Action::ChooseSlot => self.choose_slot(user, us, out).await,
            Action::BeginConnect(slot) => {
                us.clear_draft();
                us.connecting = Some(slot);
                let first = &Wizard::get(WizardId::Connect).fields[0];
                out.push(Reply::text(format!(
                    "Connecting to *{}*\n\n{}",
                    title(slot),
                    first.prompt_for(Some(slot))
                )));
                None
            }
            Action::ChooseDevice => self.choose_device(user, us, out).await,
            Action::Select(slot) => {
                match self.sessions.info(&Self::key(user, slot)).await {
                    Some(summary) if summary.connected => {
                        us.current = Some(slot);
                        out.push(Reply::text(format!(
                            "✅ Switched to *{}* ({})",
                            title(slot),
                            summary.device.host
                        )));
                    }
                    _ => out.push(Reply::text(format!("❌ The {} is not connected.", title(slot).to_lowercase()))),
                }
                out.push(self.menu(user, us).await);
                None
            }
            Action::BeginWizard(id) => self.begin_wizard(user, us, id, out).await,
            Action::ShowStatus => {
                self.show_status(user, us, out).await;
                None
            }
            Action::Disconnect => {
                self.disconnect(user, us, out).await;
                None
            }
            Action::AcceptField => match event {
                Event::Text(text) => self.accept_field(user, us, text, out).await,
                _ => None,
            },
            Action::Apply => {
                self.apply(user, us, out).await;
                None
            }
            Action::CancelConfig => {
                us.clear_draft();
                out.push(Reply::with_keyboard("❌ Configuration cancelled.", back_to_menu()));
                None
            }
        }
    }

    async fn summaries(&self, user: UserId) -> [(DeviceSlot, Option<SessionSummary>); 2] {
        let mut found = [(DeviceSlot::Router, None), (DeviceSlot::Switch, None)];
        for (slot, summary) in found.iter_mut() {
            *summary = self
                .sessions
                .info(&Self::key(user, *slot))
                .await
                .filter(|s| s.connected);
        }
        found
    }

    /// The main menu for the current connection status. Drops a current
    /// device that has gone away.
    async fn menu(&self, user: UserId, us: &mut UserState) -> Reply {
        let summaries = self.summaries(user).await;
        let connected = |slot: DeviceSlot| {
            summaries
                .iter()
                .find(|(s, _)| *s == slot)
                .and_then(|(_, summary)| summary.as_ref())
        };

        if let Some(current) = us.current {
            if connected(current).is_none() {
                let fallback = other(current);
                us.current = connected(fallback).map(|_| fallback);
            }
        }

        let router = connected(DeviceSlot::Router);
        let switch = connected(DeviceSlot::Switch);
        let mut keyboard: Keyboard = Vec::new();

        if router.is_none() && switch.is_none() {
            keyboard.push(vec![Button::new("🔌 Connect to Device", "connect")]);
            return Reply::with_keyboard(
                "Please connect to a device to start.\n\nWhat would you like to do?",
                keyboard,
            );
        }

        let mut lines = Vec::new();
        if let Some(summary) = router {
            lines.push(format!("Router: ✅ {}", summary.device.host));
        }
        if let Some(summary) = switch {
            lines.push(format!("Switch: ✅ {}", summary.device.host));
        }
        if let Some(current) = us.current {
            lines.push(format!("\n📍 Current: {}", title(current)));
        }

        if router.is_none() || switch.is_none() {
            keyboard.push(vec![Button::new("🔌 Connect Another Device", "connect")]);
        }
        if let Some(current) = us.current {
            let offered: Vec<&Wizard> = flow::WIZARDS
                .iter()
                .filter(|w| w.offered_for(current))
                .collect();
            for wizard in offered.iter().filter(|w| w.slot.is_none()) {
                keyboard.push(vec![Button::new(wizard.menu_label, wizard.button.unwrap_or_default())]);
            }
            keyboard.push(vec![Button::new("📊 Show Interface Status", "show_status")]);
            for wizard in offered.iter().filter(|w| w.slot.is_some()) {
                keyboard.push(vec![Button::new(wizard.menu_label, wizard.button.unwrap_or_default())]);
            }
        }
        if (router.is_some() && switch.is_some()) || us.current.is_some() {
            keyboard.push(vec![Button::new("🔄 Change Device", "change_device")]);
        }
        keyboard.push(vec![Button::new("🔌 Disconnect Current Device", "disconnect")]);

        Reply::with_keyboard(
            format!("{}\n\nWhat would you like to do?", lines.join("\n")),
            keyboard,
        )
    }

    async fn choose_slot(&self, user: UserId, us: &mut UserState, out: &mut Vec<Reply>) -> Option<State> {
        let mut keyboard: Keyboard = Vec::new();
        for (slot, summary) in self.summaries(user).await {
            if summary.is_none() {
                let label = match slot {
                    DeviceSlot::Router => "🌐 Router",
                    _ => "🔧 Switch",
                };
                keyboard.push(vec![Button::new(label, format!("device_{slot}"))]);
            }
        }
        if keyboard.is_empty() {
            out.push(Reply::text("Both devices are already connected."));
            out.push(self.menu(user, us).await);
            return Some(State::MainMenu);
        }
        keyboard.push(vec![Button::new("❌ Cancel", "main_menu")]);
        out.push(Reply::with_keyboard(
            "Which type of device would you like to connect to?",
            keyboard,
        ));
        None
    }

    async fn choose_device(&self, user: UserId, us: &mut UserState, out: &mut Vec<Reply>) -> Option<State> {
        let summaries = self.summaries(user).await;
        let mut keyboard: Keyboard = Vec::new();
        let mut current_info = String::new();

        for (slot, summary) in &summaries {
            let Some(summary) = summary else { continue };
            if us.current == Some(*slot) {
                current_info = format!(
                    "Currently connected to: *{} ({})*\n\n",
                    title(*slot),
                    summary.device.host
                );
            } else {
                let icon = if *slot == DeviceSlot::Router { "🌐" } else { "🔧" };
                keyboard.push(vec![Button::new(
                    format!("{icon} {} ({})", title(*slot), summary.device.host),
                    format!("select_{slot}"),
                )]);
            }
        }
        keyboard.push(vec![Button::new("❌ Cancel", "main_menu")]);
        out.push(Reply::with_keyboard(
            format!("{current_info}Select a device to switch to:"),
            keyboard,
        ));
        None
    }

    async fn begin_wizard(
        &self,
        user: UserId,
        us: &mut UserState,
        id: WizardId,
        out: &mut Vec<Reply>,
    ) -> Option<State> {
        let wizard = Wizard::get(id);
        let Some(current) = us.current else {
            out.push(Reply::text("❌ Please select a device first!"));
            out.push(self.menu(user, us).await);
            return Some(State::MainMenu);
        };
        if !wizard.offered_for(current) {
            out.push(Reply::text(wizard.unavailable));
            out.push(self.menu(user, us).await);
            return Some(State::MainMenu);
        }

        us.clear_draft();
        let host = self
            .sessions
            .info(&Self::key(user, current))
            .await
            .map(|s| s.device.host)
            .unwrap_or_default();
        out.push(Reply::text(format!(
            "{} *{} on {}*\nDevice: {}\n\n{}",
            wizard.icon,
            wizard.title,
            title(current),
            host,
            wizard.fields[0].prompt_for(Some(current))
        )));
        None
    }

    async fn accept_field(
        &self,
        user: UserId,
        us: &mut UserState,
        text: &str,
        out: &mut Vec<Reply>,
    ) -> Option<State> {
        let State::Field { wizard: id, step } = us.state else {
            return None;
        };
        let wizard = Wizard::get(id);
        let field = wizard.fields.get(step)?;
        let slot = us.connecting.or(us.current);

        let answer = field.accept(text, slot);
        if field.secret && !matches!(answer, Ok(Answer::Skipped)) {
            out.push(Reply::DeleteIncoming);
        }

        let echo = match answer {
            Err(message) => {
                out.push(Reply::text(message));
                return None;
            }
            Ok(Answer::Skipped) => String::new(),
            Ok(Answer::Value(value)) if field.secret => {
                us.secrets.insert(field.key, SecretString::from(value));
                format!("{} received and deleted for security.\n\n", field.label)
            }
            Ok(Answer::Value(value)) => {
                let echo = format!("{}: `{}`\n\n", field.label, value);
                us.draft.insert(field.key.to_string(), value);
                echo
            }
        };

        if let Some(next) = wizard.fields.get(step + 1) {
            out.push(Reply::text(format!("{echo}{}", next.prompt_for(slot))));
            return Some(State::Field {
                wizard: id,
                step: step + 1,
            });
        }

        if id == WizardId::Connect {
            self.connect(user, us, out).await;
            return Some(State::MainMenu);
        }
        self.confirm(user, us, wizard, out).await
    }

    async fn connect(&self, user: UserId, us: &mut UserState, out: &mut Vec<Reply>) {
        let slot = us.connecting.take().unwrap_or(DeviceSlot::Router);
        let credentials = DeviceCredentials {
            host: us.draft.remove("host").unwrap_or_default(),
            username: us.draft.remove("username").unwrap_or_default(),
            password: us
                .secrets
                .remove("password")
                .unwrap_or_else(|| SecretString::from("")),
            port: DEFAULT_SSH_PORT,
            secret: us.secrets.remove("secret"),
            device_type: DEFAULT_PLATFORM.to_string(),
        };
        us.clear_draft();

        out.push(Reply::text(format!("🔄 Connecting to {}...", slot)));
        match self.sessions.connect(Self::key(user, slot), credentials).await {
            Ok(summary) => {
                info!("user {}: {} connected ({})", user, slot, summary.device);
                if us.current.is_none() {
                    us.current = Some(slot);
                }
                out.push(Reply::text(format!(
                    "✅ *Successfully connected to {}!*\n\nDevice prompt: `{}`\n{}",
                    slot, summary.prompt, summary.enable_status
                )));
            }
            Err(e) => {
                let report = ErrorReport::from(&e);
                let message = match report.kind {
                    ErrorKind::Timeout => {
                        "❌ Connection timeout. Please check the device IP and try again.".to_string()
                    }
                    ErrorKind::AuthenticationFailed => {
                        "❌ Authentication failed. Please check credentials and try again.".to_string()
                    }
                    _ => format!("❌ Connection error: {}", report.message),
                };
                out.push(Reply::text(message));
            }
        }
        out.push(self.menu(user, us).await);
    }

    async fn confirm(
        &self,
        user: UserId,
        us: &mut UserState,
        wizard: &Wizard,
        out: &mut Vec<Reply>,
    ) -> Option<State> {
        let commands = match wizard.build.map(|build| build(&us.draft)) {
            Some(Ok(commands)) => commands,
            Some(Err(e)) => {
                out.push(Reply::text(format!("❌ {e}")));
                us.clear_draft();
                out.push(self.menu(user, us).await);
                return Some(State::MainMenu);
            }
            None => return Some(State::MainMenu),
        };

        let mut summary = format!("📋 *{} Summary*\n\n", wizard.title);
        for field in wizard.fields {
            if let Some(value) = us.draft.get(field.key) {
                summary.push_str(&format!("{}: `{}`\n", field.label, value));
            }
        }
        summary.push_str("\n*Commands to be executed:*\n```\n");
        summary.push_str(&commands.join("\n"));
        summary.push_str("\n```");

        out.push(Reply::with_keyboard(
            summary,
            vec![vec![
                Button::new("✅ Execute", "execute"),
                Button::new("❌ Cancel", "cancel"),
            ]],
        ));
        Some(State::Confirm(wizard.id))
    }

    async fn apply(&self, user: UserId, us: &mut UserState, out: &mut Vec<Reply>) {
        let State::Confirm(id) = us.state else { return };
        let wizard = Wizard::get(id);
        let draft = std::mem::take(&mut us.draft);
        us.clear_draft();

        let (Some(current), Some(build)) = (us.current, wizard.build) else {
            out.push(Reply::with_keyboard("❌ Please select a device first!", back_to_menu()));
            return;
        };
        let commands = match build(&draft) {
            Ok(commands) => commands,
            Err(e) => {
                out.push(Reply::with_keyboard(format!("❌ {e}"), back_to_menu()));
                return;
            }
        };

        out.push(Reply::text(format!("🔄 Executing {}...", wizard.title.to_lowercase())));
        let outcome = self
            .sessions
            .apply_config(&Self::key(user, current), &commands, true)
            .await;

        let text = match outcome {
            Ok(result) => match result.errors.iter().find(|e| e.command == CONFIG_BLOCK) {
                Some(failure) => format!("❌ {} failed: {}", wizard.title, failure.message),
                None => {
                    let mut text = format!(
                        "✅ *{} completed successfully!*\n\n*Output:*\n```\n{}\n```\n\n*Save Result:*\n```\n{}\n```",
                        wizard.title,
                        result.config_output.as_deref().unwrap_or_default(),
                        result.save_output.as_deref().unwrap_or_default(),
                    );
                    for error in &result.errors {
                        text.push_str(&format!("\n⚠️ `{}`: {}", error.command, error.message));
                    }
                    for warning in &result.warnings {
                        text.push_str(&format!("\n⚠️ {warning}"));
                    }
                    text
                }
            },
            Err(e) => format!("❌ {} failed: {}", wizard.title, ErrorReport::from(&e)),
        };
        out.push(Reply::with_keyboard(text, back_to_menu()));
    }

    async fn show_status(&self, user: UserId, us: &mut UserState, out: &mut Vec<Reply>) {
        let Some(current) = us.current else {
            out.push(Reply::text("❌ Please select a device first!"));
            out.push(self.menu(user, us).await);
            return;
        };
        let key = Self::key(user, current);
        let host = self
            .sessions
            .info(&key)
            .await
            .map(|s| s.device.host)
            .unwrap_or_default();

        out.push(Reply::text("🔄 Getting interface status..."));
        let text = match self.sessions.run_show(&key, STATUS_COMMAND).await {
            Ok(output) => format!(
                "📊 *Interface Status - {} ({})*\n\n```\n{}\n```",
                title(current),
                host,
                output
            ),
            Err(e) => format!("❌ Failed to get status: {}", ErrorReport::from(&e)),
        };
        out.push(Reply::with_keyboard(text, back_to_menu()));
    }

    async fn disconnect(&self, user: UserId, us: &mut UserState, out: &mut Vec<Reply>) {
        let Some(current) = us.current else {
            out.push(Reply::text("❌ No device selected to disconnect!"));
            out.push(self.menu(user, us).await);
            return;
        };
        let key = Self::key(user, current);
        let host = self
            .sessions
            .info(&key)
            .await
            .map(|s| s.device.host)
            .unwrap_or_default();
        self.sessions.disconnect(&key).await;

        let fallback = other(current);
        let text = if self.sessions.is_connected(&Self::key(user, fallback)).await {
            us.current = Some(fallback);
            format!("✅ Disconnected from {current} ({host}).\n\nSwitched to {fallback}.")
        } else {
            us.current = None;
            format!(
                "✅ Disconnected from {current} ({host}).\n\nYou'll need to connect to a device to continue."
            )
        };
        out.push(Reply::text(text));
        out.push(self.menu(user, us).await);
    }

    /// Forget users with no registered session whose last event is at least
    /// `max_idle` old. A user with an event in progress is kept. Returns the
    /// forgotten users; their next event starts from a fresh state.
    pub async fn forget_idle(&self, max_idle: Duration) -> Vec<UserId> {
        let now = Instant::now();
        let idle = |state: &UserState| {
            state
                .last_event
                .map_or(true, |at| now.duration_since(at) >= max_idle)
        };

        let candidates: Vec<UserId> = {
            let users = self.users.lock().await;
            users
                .iter()
                .filter(|(_, cell)| cell.try_lock().is_ok_and(|state| idle(&state)))
                .map(|(user, _)| *user)
                .collect()
        };

        let mut unused = Vec::new();
        for user in candidates {
            let mut registered = false;
            for slot in [DeviceSlot::Router, DeviceSlot::Switch] {
                registered |= self.sessions.info(&Self::key(user, slot)).await.is_some();
            }
            if !registered {
                unused.push(user);
            }
        }

        // Events take a handle on the user's cell under the same lock, so a
        // cell nobody else holds has no event in progress.
        let mut users = self.users.lock().await;
        unused.retain(|user| {
            let forget = users.get(user).is_some_and(|cell| {
                Arc::strong_count(cell) == 1 && cell.try_lock().is_ok_and(|state| idle(&state))
            });
            if forget {
                users.remove(user);
            }
            forget
        });
        if !unused.is_empty() {
            debug!("forgot {} idle chat users", unused.len());
        }
        unused
    }

    /// Users with conversation state.
    pub async fn user_count(&self) -> usize {
        self.users.lock().await.len()
    }

    /// Close every session of every user.
    pub async fn shutdown(&self) {
        self.sessions.shutdown().await;
        self.users.lock().await.clear();
    }
}

impl From<Command> for Event {
    fn from(command: Command) -> Self {
        Event::Command(command)
    }
}
