//! The conversation as data: states, events, the transition table and the
//! wizard definitions whose fields become table rows.
//!
//! Adding a configuration wizard means adding a [`Wizard`] to [`WIZARDS`];
//! its menu button, field steps and confirmation rows follow from it.

use netpilot::error::ValidationError;
use netpilot::session::DeviceSlot;
use netpilot::template::{ConfigBuilder, DhcpPoolConfig, Fields, InterfaceConfig, VlanConfig};
use netpilot::validate::{is_valid_ipv4, parse_ipv4_list, parse_vlan_id};

/// Used when the switch address prompt is left blank.
pub const DEFAULT_SWITCH_IP: &str = "192.168.122.6";

/// Slash commands understood in every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Cancel,
}

impl Command {
    /// Parse `/start`, `/help@SomeBot`, ...
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        match name {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "cancel" => Some(Command::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Command(Command),
    /// Inline keyboard callback data.
    Button(String),
    Text(String),
}

impl Event {
    /// Classify an incoming text message.
    pub fn from_text(text: &str) -> Option<Self> {
        if text.trim_start().starts_with('/') {
            Command::parse(text).map(Event::Command)
        } else {
            Some(Event::Text(text.to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardId {
    Connect,
    Interface,
    Vlan,
    Dhcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    MainMenu,
    ChooseSlot,
    SelectDevice,
    /// Waiting for field `step` of a wizard.
    Field { wizard: WizardId, step: usize },
    /// Showing the generated commands, waiting for execute or cancel.
    Confirm(WizardId),
}

/// What the engine does when a row fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Welcome,
    Help,
    Cancel,
    ShowMenu,
    ChooseSlot,
    BeginConnect(DeviceSlot),
    ChooseDevice,
    Select(DeviceSlot),
    BeginWizard(WizardId),
    ShowStatus,
    Disconnect,
    AcceptField,
    Apply,
    CancelConfig,
}

/// State after a row fires, unless the action decides otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Stay,
    Goto(State),
    /// First field of a wizard.
    Wizard(WizardId),
}

impl Next {
    pub fn resolve(self, current: State) -> State {
        match self {
            Next::Stay => current,
            Next::Goto(state) => state,
            Next::Wizard(wizard) => State::Field { wizard, step: 0 },
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum When {
    Any,
    In(State),
    AnyField,
    AnyConfirm,
}

impl When {
    fn matches(self, state: State) -> bool {
        match self {
            When::Any => true,
            When::In(s) => s == state,
            When::AnyField => matches!(state, State::Field { .. }),
            When::AnyConfirm => matches!(state, State::Confirm(_)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum On {
    Command(Command),
    Button(&'static str),
    Text,
}

impl On {
    fn matches(self, event: &Event) -> bool {
        match (self, event) {
            (On::Command(c), Event::Command(e)) => c == *e,
            (On::Button(b), Event::Button(data)) => b == data,
            (On::Text, Event::Text(_)) => true,
            _ => false,
        }
    }
}

struct Rule {
    when: When,
    on: On,
    next: Next,
    action: Action,
}

const fn rule(when: When, on: On, next: Next, action: Action) -> Rule {
    Rule {
        when,
        on,
        next,
        action,
    }
}

const MAIN: When = When::In(State::MainMenu);
const TO_MAIN: Next = Next::Goto(State::MainMenu);

static RULES: &[Rule] = &[
    rule(When::Any, On::Command(Command::Start), TO_MAIN, Action::Welcome),
    rule(When::Any, On::Command(Command::Help), Next::Stay, Action::Help),
    rule(When::Any, On::Command(Command::Cancel), TO_MAIN, Action::Cancel),
    rule(When::Any, On::Button("main_menu"), TO_MAIN, Action::ShowMenu),
    rule(MAIN, On::Button("connect"), Next::Goto(State::ChooseSlot), Action::ChooseSlot),
    rule(MAIN, On::Button("show_status"), TO_MAIN, Action::ShowStatus),
    rule(MAIN, On::Button("disconnect"), TO_MAIN, Action::Disconnect),
    rule(MAIN, On::Button("change_device"), Next::Goto(State::SelectDevice), Action::ChooseDevice),
    rule(
        When::In(State::ChooseSlot),
        On::Button("device_router"),
        Next::Wizard(WizardId::Connect),
        Action::BeginConnect(DeviceSlot::Router),
    ),
    rule(
        When::In(State::ChooseSlot),
        On::Button("device_switch"),
        Next::Wizard(WizardId::Connect),
        Action::BeginConnect(DeviceSlot::Switch),
    ),
    rule(
        When::In(State::SelectDevice),
        On::Button("select_router"),
        TO_MAIN,
        Action::Select(DeviceSlot::Router),
    ),
    rule(
        When::In(State::SelectDevice),
        On::Button("select_switch"),
        TO_MAIN,
        Action::Select(DeviceSlot::Switch),
    ),
    rule(When::AnyField, On::Text, Next::Stay, Action::AcceptField),
    rule(When::AnyConfirm, On::Button("execute"), TO_MAIN, Action::Apply),
    rule(When::AnyConfirm, On::Button("cancel"), TO_MAIN, Action::CancelConfig),
];

/// Look up the row for `event` in `state`. Wizard menu buttons are rows
/// derived from [`WIZARDS`].
pub fn transition(state: State, event: &Event) -> Option<(Next, Action)> {
    if let Some(rule) = RULES
        .iter()
        .find(|r| r.when.matches(state) && r.on.matches(event))
    {
        return Some((rule.next, rule.action));
    }

    match (state, event) {
        (State::MainMenu, Event::Button(data)) => WIZARDS
            .iter()
            .find(|w| w.button == Some(data.as_str()))
            .map(|w| (Next::Wizard(w.id), Action::BeginWizard(w.id))),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Ipv4,
    /// Comma-separated addresses.
    Ipv4List,
    VlanId,
    /// Device address; blank means [`DEFAULT_SWITCH_IP`] for the switch slot.
    HostWithDefault,
}

#[derive(Debug)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub prompt: &'static str,
    pub kind: FieldKind,
    /// `skip` leaves the field out.
    pub optional: bool,
    /// Kept as a secret and the user's message is deleted.
    pub secret: bool,
    /// Re-prompt for invalid input; `{value}` is replaced with the offending
    /// entry.
    pub invalid: &'static str,
}

const fn field(key: &'static str, label: &'static str, prompt: &'static str) -> FieldSpec {
    FieldSpec {
        key,
        label,
        prompt,
        kind: FieldKind::Text,
        optional: false,
        secret: false,
        invalid: "❌ This field cannot be empty. Please try again:",
    }
}

impl FieldSpec {
    const fn kind(mut self, kind: FieldKind, invalid: &'static str) -> Self {
        self.kind = kind;
        self.invalid = invalid;
        self
    }

    const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    const fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// The question asked for this field.
    pub fn prompt_for(&self, slot: Option<DeviceSlot>) -> String {
        match (self.kind, slot) {
            (FieldKind::HostWithDefault, Some(DeviceSlot::Switch)) => {
                format!("{} (Default: {DEFAULT_SWITCH_IP}):", self.prompt)
            }
            (FieldKind::HostWithDefault, _) => format!("{}:", self.prompt),
            _ => self.prompt.to_string(),
        }
    }

    /// Validate one answer.
    pub fn accept(&self, input: &str, slot: Option<DeviceSlot>) -> Result<Answer, String> {
        let value = input.trim();

        if self.kind == FieldKind::HostWithDefault
            && slot == Some(DeviceSlot::Switch)
            && (value.is_empty() || value.eq_ignore_ascii_case("default"))
        {
            return Ok(Answer::Value(DEFAULT_SWITCH_IP.to_string()));
        }
        if self.optional && value.eq_ignore_ascii_case("skip") {
            return Ok(Answer::Skipped);
        }

        let valid = match self.kind {
            FieldKind::Text => !value.is_empty(),
            FieldKind::Ipv4 | FieldKind::HostWithDefault => is_valid_ipv4(value),
            FieldKind::VlanId => parse_vlan_id(value).is_ok(),
            FieldKind::Ipv4List => match parse_ipv4_list(value) {
                Ok(list) => !list.is_empty(),
                Err(ValidationError::InvalidIpv4(bad)) => {
                    return Err(self.invalid.replace("{value}", &bad));
                }
                Err(_) => false,
            },
        };
        if valid {
            Ok(Answer::Value(value.to_string()))
        } else {
            Err(self.invalid.replace("{value}", value))
        }
    }
}

/// A validated field answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Value(String),
    Skipped,
}

/// Builds the configuration script from the collected fields.
pub type BuildFn = fn(&Fields) -> Result<Vec<String>, ValidationError>;

/// A linear sequence of field prompts.
#[derive(Debug)]
pub struct Wizard {
    pub id: WizardId,
    pub icon: &'static str,
    pub title: &'static str,
    /// Callback data of the main menu button; `None` for wizards started
    /// elsewhere.
    pub button: Option<&'static str>,
    pub menu_label: &'static str,
    /// The wizard is offered only for this slot.
    pub slot: Option<DeviceSlot>,
    pub unavailable: &'static str,
    pub fields: &'static [FieldSpec],
    pub build: Option<BuildFn>,
}

impl Wizard {
    pub fn get(id: WizardId) -> &'static Wizard {
        WIZARDS
            .iter()
            .find(|w| w.id == id)
            .unwrap_or(&WIZARDS[0])
    }

    /// Offered when `slot` is the current device.
    pub fn offered_for(&self, slot: DeviceSlot) -> bool {
        self.button.is_some() && self.slot.is_none_or(|s| s == slot)
    }
}

fn build_interface(fields: &Fields) -> Result<Vec<String>, ValidationError> {
    Ok(InterfaceConfig::from_fields(fields)?.commands())
}

fn build_vlan(fields: &Fields) -> Result<Vec<String>, ValidationError> {
    Ok(VlanConfig::from_fields(fields)?.commands())
}

fn build_dhcp(fields: &Fields) -> Result<Vec<String>, ValidationError> {
    Ok(DhcpPoolConfig::from_fields(fields)?.commands())
}

const INVALID_IP: &str = "❌ Invalid IP address format. Please enter a valid IP address:";

pub static WIZARDS: &[Wizard] = &[
    Wizard {
        id: WizardId::Connect,
        icon: "🔌",
        title: "Connection",
        button: None,
        menu_label: "🔌 Connect to Device",
        slot: None,
        unavailable: "",
        fields: &[
            field("host", "IP Address", "Please enter the *device IP address*")
                .kind(FieldKind::HostWithDefault, INVALID_IP),
            field("username", "Username", "Now, please enter the *username*:"),
            field(
                "password",
                "Password",
                "Please enter the *password*:\n_(Your password will not be stored)_",
            )
            .secret(),
            field(
                "secret",
                "Enable password",
                "Do you need an *enable password*?\nReply with the enable password or type 'skip' to continue:",
            )
            .secret()
            .optional(),
        ],
        build: None,
    },
    Wizard {
        id: WizardId::Interface,
        icon: "⚙️",
        title: "Interface Configuration",
        button: Some("configure_interface"),
        menu_label: "⚙️ Configure Interface",
        slot: None,
        unavailable: "",
        fields: &[
            field(
                "interface",
                "Interface",
                "Please enter the *interface name*:\nExamples: GigabitEthernet0/1, FastEthernet0/0",
            ),
            field("ip_address", "IP Address", "Please enter the *IP address* for this interface:")
                .kind(FieldKind::Ipv4, INVALID_IP),
            field("subnet_mask", "Subnet Mask", "Please enter the *subnet mask*:\nExample: 255.255.255.0")
                .kind(
                    FieldKind::Ipv4,
                    "❌ Invalid subnet mask format. Please enter a valid subnet mask:",
                ),
            field(
                "description",
                "Description",
                "Please enter an *interface description* (or type 'skip'):",
            )
            .optional(),
        ],
        build: Some(build_interface),
    },
    Wizard {
        id: WizardId::Vlan,
        icon: "🔧",
        title: "VLAN Configuration",
        button: Some("configure_vlan"),
        menu_label: "🔧 Configure VLAN",
        slot: Some(DeviceSlot::Switch),
        unavailable: "❌ VLAN configuration is only available for switches!",
        fields: &[
            field("vlan_id", "VLAN ID", "Please enter the *VLAN ID* (1-4094):").kind(
                FieldKind::VlanId,
                "❌ Invalid VLAN ID. Please enter a number between 1 and 4094:",
            ),
            field("vlan_name", "VLAN Name", "Please enter a *VLAN name* (or type 'skip'):").optional(),
            field(
                "vlan_ports",
                "Ports",
                "Please enter the *ports to assign* to this VLAN:\n\
                 Format: interface range (e.g., 'Fa0/1-5' or 'Gi0/1,Gi0/3')\n\
                 Or type 'skip' to create VLAN without assigning ports:",
            )
            .optional(),
        ],
        build: Some(build_vlan),
    },
    Wizard {
        id: WizardId::Dhcp,
        icon: "📡",
        title: "DHCP Configuration",
        button: Some("configure_dhcp"),
        menu_label: "📡 Configure DHCP",
        slot: Some(DeviceSlot::Router),
        unavailable: "❌ DHCP configuration is only available for routers!",
        fields: &[
            field("pool_name", "Pool Name", "Please enter the *DHCP pool name*:"),
            field(
                "network",
                "Network",
                "Please enter the *network address* for DHCP:\nExample: 192.168.1.0",
            )
            .kind(
                FieldKind::Ipv4,
                "❌ Invalid network address. Please enter a valid IP address:",
            ),
            field("mask", "Subnet Mask", "Please enter the *subnet mask*:\nExample: 255.255.255.0")
                .kind(
                    FieldKind::Ipv4,
                    "❌ Invalid subnet mask. Please enter a valid subnet mask:",
                ),
            field("default_router", "Default Router", "Please enter the *default gateway/router IP*:")
                .kind(
                    FieldKind::Ipv4,
                    "❌ Invalid IP address. Please enter a valid default router IP:",
                ),
            field(
                "dns_servers",
                "DNS Servers",
                "Please enter *DNS server IPs* (comma-separated) or type 'skip':\nExample: 8.8.8.8, 8.8.4.4",
            )
            .kind(
                FieldKind::Ipv4List,
                "❌ Invalid DNS IP: {value}. Please enter valid IP addresses:",
            )
            .optional(),
        ],
        build: Some(build_dhcp),
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn button(data: &str) -> Event {
        Event::Button(data.to_string())
    }

    #[test]
    fn test_commands_work_everywhere() {
        let states = [
            State::MainMenu,
            State::ChooseSlot,
            State::Field {
                wizard: WizardId::Dhcp,
                step: 3,
            },
            State::Confirm(WizardId::Vlan),
        ];
        for state in states {
            assert_eq!(
                transition(state, &Event::Command(Command::Start)),
                Some((TO_MAIN, Action::Welcome))
            );
            assert_eq!(
                transition(state, &Event::Command(Command::Cancel)).map(|(_, a)| a),
                Some(Action::Cancel)
            );
        }
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/help@NetBot"), Some(Command::Help));
        assert_eq!(Command::parse("/reboot"), None);
        assert_eq!(Event::from_text("/reboot"), None);
        assert_eq!(
            Event::from_text("10.0.0.1"),
            Some(Event::Text("10.0.0.1".into()))
        );
    }

    #[test]
    fn test_buttons_depend_on_state() {
        assert_eq!(
            transition(State::MainMenu, &button("connect")),
            Some((Next::Goto(State::ChooseSlot), Action::ChooseSlot))
        );
        assert_eq!(transition(State::ChooseSlot, &button("connect")), None);
        assert_eq!(transition(State::MainMenu, &button("execute")), None);
        assert_eq!(
            transition(State::Confirm(WizardId::Interface), &button("execute")),
            Some((TO_MAIN, Action::Apply))
        );
        assert_eq!(transition(State::MainMenu, &Event::Text("hi".into())), None);
    }

    #[test]
    fn test_wizard_rows_come_from_definitions() {
        for wizard in WIZARDS.iter().filter(|w| w.button.is_some()) {
            let event = button(wizard.button.unwrap());
            assert_eq!(
                transition(State::MainMenu, &event),
                Some((Next::Wizard(wizard.id), Action::BeginWizard(wizard.id)))
            );
        }
        assert_eq!(
            Next::Wizard(WizardId::Vlan).resolve(State::MainMenu),
            State::Field {
                wizard: WizardId::Vlan,
                step: 0
            }
        );
    }

    #[test]
    fn test_wizards_offered_per_slot() {
        let vlan = Wizard::get(WizardId::Vlan);
        assert!(vlan.offered_for(DeviceSlot::Switch));
        assert!(!vlan.offered_for(DeviceSlot::Router));
        assert!(Wizard::get(WizardId::Dhcp).offered_for(DeviceSlot::Router));
        assert!(Wizard::get(WizardId::Interface).offered_for(DeviceSlot::Switch));
        assert!(!Wizard::get(WizardId::Connect).offered_for(DeviceSlot::Router));
    }

    #[test]
    fn test_field_validation() {
        let host = &Wizard::get(WizardId::Connect).fields[0];
        assert_eq!(
            host.accept("", Some(DeviceSlot::Switch)),
            Ok(Answer::Value(DEFAULT_SWITCH_IP.into()))
        );
        assert_eq!(host.accept("", Some(DeviceSlot::Router)), Err(INVALID_IP.into()));
        assert_eq!(host.accept("192.168.1.300", Some(DeviceSlot::Router)), Err(INVALID_IP.into()));
        assert_eq!(
            host.accept(" 10.0.0.1 ", Some(DeviceSlot::Router)),
            Ok(Answer::Value("10.0.0.1".into()))
        );

        let vlan_id = &Wizard::get(WizardId::Vlan).fields[0];
        assert!(vlan_id.accept("4095", None).is_err());
        assert!(vlan_id.accept("skip", None).is_err());
        assert_eq!(vlan_id.accept("10", None), Ok(Answer::Value("10".into())));

        let vlan_name = &Wizard::get(WizardId::Vlan).fields[1];
        assert_eq!(vlan_name.accept("SKIP", None), Ok(Answer::Skipped));

        let dns = &Wizard::get(WizardId::Dhcp).fields[4];
        assert_eq!(
            dns.accept("8.8.8.8, 8.8.4", None),
            Err("❌ Invalid DNS IP: 8.8.4. Please enter valid IP addresses:".into())
        );
        assert_eq!(dns.accept("skip", None), Ok(Answer::Skipped));
    }

    #[test]
    fn test_switch_prompt_mentions_default() {
        let host = &Wizard::get(WizardId::Connect).fields[0];
        assert_eq!(
            host.prompt_for(Some(DeviceSlot::Switch)),
            "Please enter the *device IP address* (Default: 192.168.122.6):"
        );
        assert_eq!(
            host.prompt_for(Some(DeviceSlot::Router)),
            "Please enter the *device IP address*:"
        );
    }

    #[test]
    fn test_wizard_fields_feed_builders() {
        let sample = |kind: FieldKind| match kind {
            FieldKind::Text => "Gi0/1",
            FieldKind::Ipv4 | FieldKind::HostWithDefault => "10.0.0.1",
            FieldKind::Ipv4List => "8.8.8.8, 8.8.4.4",
            FieldKind::VlanId => "10",
        };
        for wizard in WIZARDS {
            let Some(build) = wizard.build else { continue };
            let fields: Fields = wizard
                .fields
                .iter()
                .map(|f| (f.key.to_string(), sample(f.kind).to_string()))
                .collect();
            let commands = build(&fields).unwrap();
            assert_eq!(commands.first().map(String::as_str), Some("configure terminal"));
            assert_eq!(commands.last().map(String::as_str), Some("write memory"));
        }
    }
}
