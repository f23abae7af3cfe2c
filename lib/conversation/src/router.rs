//! Inbound message routing.
//!
//! A contact message is matched against an ordered list of rules; the first
//! rule that matches decides the replies and the state transition:
//!
//! 1. `silenced`: a human has the conversation, say nothing
//! 2. `intake_received`: the whole body is the consultation request
//! 3. `greeting`: a greeting or navigation word, answer with the menu
//! 4. `menu_selection`: a bare option number
//! 5. `fallback`: anything else
//!
//! The order is part of the contract: a flow in progress beats global
//! triggers, which beat menu shortcuts.

use crate::catalog::{self, MenuOption, ReplyStep};
use crate::state::ConversationState;
use frontdesk_core::ContactId;
use frontdesk_transport::MessagingClient;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(oi|olá|ola|bom dia|boa tarde|boa noite|menu|voltar|ajuda|iniciar)$")
        .expect("greeting pattern is valid")
});

/// Trims and lowercases a message body for matching.
#[must_use]
pub fn normalize(body: &str) -> String {
    body.trim().to_lowercase()
}

/// The rule that handled an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundRule {
    Silenced,
    IntakeReceived,
    Greeting,
    MenuSelection(MenuOption),
    Fallback,
}

impl InboundRule {
    /// Stable rule identifier for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Silenced => "silenced",
            Self::IntakeReceived => "intake_received",
            Self::Greeting => "greeting",
            Self::MenuSelection(_) => "menu_selection",
            Self::Fallback => "fallback",
        }
    }
}

/// What happens to the contact's state once the replies are out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Keep,
    Enter(ConversationState),
    Reset,
}

impl Transition {
    /// The state the contact ends up in, given where it started.
    #[must_use]
    pub fn apply(self, current: ConversationState) -> ConversationState {
        match self {
            Self::Keep => current,
            Self::Enter(next) => next,
            Self::Reset => ConversationState::Idle,
        }
    }
}

/// The router's decision for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedReply {
    pub rule: InboundRule,
    pub replies: Vec<ReplyStep>,
    pub transition: Transition,
}

struct RuleInput<'a> {
    state: ConversationState,
    body: &'a str,
}

type RuleMatcher = fn(&RuleInput<'_>) -> Option<InboundRule>;

const RULES: [RuleMatcher; 5] = [
    match_silenced,
    match_intake,
    match_greeting,
    match_menu_selection,
    match_fallback,
];

fn match_silenced(input: &RuleInput<'_>) -> Option<InboundRule> {
    input.state.is_silenced().then_some(InboundRule::Silenced)
}

fn match_intake(input: &RuleInput<'_>) -> Option<InboundRule> {
    (input.state == ConversationState::AwaitingIntakeData).then_some(InboundRule::IntakeReceived)
}

fn match_greeting(input: &RuleInput<'_>) -> Option<InboundRule> {
    GREETING.is_match(input.body).then_some(InboundRule::Greeting)
}

fn match_menu_selection(input: &RuleInput<'_>) -> Option<InboundRule> {
    MenuOption::from_selection(input.body).map(InboundRule::MenuSelection)
}

fn match_fallback(_input: &RuleInput<'_>) -> Option<InboundRule> {
    Some(InboundRule::Fallback)
}

/// Routes contact messages.
#[derive(Debug, Clone)]
pub struct InboundRouter {
    fallback_display_name: String,
}

impl InboundRouter {
    /// Creates a router that greets nameless contacts as `fallback_display_name`.
    #[must_use]
    pub fn new(fallback_display_name: impl Into<String>) -> Self {
        Self {
            fallback_display_name: fallback_display_name.into(),
        }
    }

    /// Picks the rule for a normalized body given the contact's state.
    #[must_use]
    pub fn classify(state: ConversationState, normalized_body: &str) -> InboundRule {
        let input = RuleInput {
            state,
            body: normalized_body,
        };
        RULES
            .iter()
            .find_map(|rule| rule(&input))
            .unwrap_or(InboundRule::Fallback)
    }

    /// Decides the replies and transition for a raw message body.
    ///
    /// The display name is only fetched for the greeting rule.
    pub async fn route<C: MessagingClient + ?Sized>(
        &self,
        state: ConversationState,
        contact: &ContactId,
        raw_body: &str,
        client: &C,
    ) -> RoutedReply {
        let rule = Self::classify(state, &normalize(raw_body));
        debug!(contact = %contact, rule = rule.name(), state = %state, "inbound rule matched");

        let (replies, transition) = match rule {
            InboundRule::Silenced => (Vec::new(), Transition::Keep),
            InboundRule::IntakeReceived => {
                (catalog::intake_acknowledgment(raw_body), Transition::Reset)
            }
            InboundRule::Greeting => {
                let name = self.first_name(contact, client).await;
                (catalog::welcome(&name), Transition::Reset)
            }
            InboundRule::MenuSelection(option) => {
                (catalog::option_replies(option), selection_transition(option))
            }
            InboundRule::Fallback => (catalog::fallback(), Transition::Keep),
        };

        RoutedReply {
            rule,
            replies,
            transition,
        }
    }

    async fn first_name<C: MessagingClient + ?Sized>(&self, contact: &ContactId, client: &C) -> String {
        let display_name = match client.display_name(contact).await {
            Ok(name) => name,
            Err(e) => {
                warn!(contact = %contact, error = %e, "display name lookup failed");
                None
            }
        };

        display_name
            .as_deref()
            .and_then(|name| name.split_whitespace().next())
            .unwrap_or(self.fallback_display_name.as_str())
            .to_string()
    }
}

impl Default for InboundRouter {
    fn default() -> Self {
        Self::new("Tutor(a)")
    }
}

fn selection_transition(option: MenuOption) -> Transition {
    match option {
        MenuOption::ScheduleConsultation => Transition::Enter(ConversationState::AwaitingIntakeData),
        MenuOption::TalkToAttendant | MenuOption::Emergency => {
            Transition::Enter(ConversationState::AwaitingHuman)
        }
        MenuOption::Vaccines | MenuOption::Exams | MenuOption::LocationAndHours => Transition::Keep,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontdesk_transport::RecordingClient;

    const IDLE: ConversationState = ConversationState::Idle;
    const INTAKE: ConversationState = ConversationState::AwaitingIntakeData;
    const HUMAN: ConversationState = ConversationState::AwaitingHuman;

    fn classify_raw(state: ConversationState, body: &str) -> InboundRule {
        InboundRouter::classify(state, &normalize(body))
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  Bom Dia \n"), "bom dia");
        assert_eq!(normalize("OLÁ"), "olá");
    }

    #[test]
    fn greeting_matches_whole_body_case_insensitively() {
        for body in ["menu", "Menu", "MENU", " oi ", "Olá", "ola", "Boa Noite", "iniciar"] {
            assert_eq!(classify_raw(IDLE, body), InboundRule::Greeting, "{body:?}");
        }
        for body in ["menu now", "oi tudo bem", "bomdia", "menus"] {
            assert_eq!(classify_raw(IDLE, body), InboundRule::Fallback, "{body:?}");
        }
    }

    #[test]
    fn menu_selection_requires_bare_digit() {
        assert_eq!(
            classify_raw(IDLE, " 1 "),
            InboundRule::MenuSelection(MenuOption::ScheduleConsultation)
        );
        assert_eq!(classify_raw(IDLE, "1x"), InboundRule::Fallback);
        assert_eq!(classify_raw(IDLE, "1."), InboundRule::Fallback);
        assert_eq!(classify_raw(IDLE, "7"), InboundRule::Fallback);
    }

    #[test]
    fn silence_beats_every_other_rule() {
        for body in ["menu", "1", "5", "anything", ""] {
            assert_eq!(classify_raw(HUMAN, body), InboundRule::Silenced);
        }
    }

    #[test]
    fn intake_swallows_greetings_and_numbers() {
        for body in ["oi", "menu", "3", "Rex, dog, checkup, Friday"] {
            assert_eq!(classify_raw(INTAKE, body), InboundRule::IntakeReceived);
        }
    }

    #[test]
    fn transitions_apply_to_current_state() {
        assert_eq!(Transition::Keep.apply(INTAKE), INTAKE);
        assert_eq!(Transition::Reset.apply(HUMAN), IDLE);
        assert_eq!(Transition::Enter(HUMAN).apply(IDLE), HUMAN);
    }

    #[test]
    fn selections_set_expected_states() {
        let expected = [
            (MenuOption::ScheduleConsultation, INTAKE),
            (MenuOption::Vaccines, IDLE),
            (MenuOption::Exams, IDLE),
            (MenuOption::LocationAndHours, IDLE),
            (MenuOption::TalkToAttendant, HUMAN),
            (MenuOption::Emergency, HUMAN),
        ];
        for (option, state) in expected {
            assert_eq!(selection_transition(option).apply(IDLE), state, "{option}");
        }
    }

    #[tokio::test]
    async fn greeting_uses_first_token_of_display_name() {
        let client = RecordingClient::new();
        let contact = ContactId::new("1@c.us");
        client.set_display_name("1@c.us", "Maria Souza Lima");

        let routed = InboundRouter::default()
            .route(IDLE, &contact, "Oi", &client)
            .await;

        assert_eq!(routed.rule, InboundRule::Greeting);
        assert_eq!(routed.transition, Transition::Reset);
        assert!(routed.replies[0].text.starts_with("Olá Maria 👋"));
        assert_eq!(routed.replies[1].text, catalog::menu_text());
    }

    #[tokio::test]
    async fn greeting_falls_back_for_missing_or_blank_name() {
        let client = RecordingClient::new();
        let nameless = ContactId::new("1@c.us");
        let blank = ContactId::new("2@c.us");
        client.set_display_name("2@c.us", "   ");
        let router = InboundRouter::new("Tutor(a)");

        let first = router.route(IDLE, &nameless, "menu", &client).await;
        let second = router.route(IDLE, &blank, "menu", &client).await;

        assert!(first.replies[0].text.starts_with("Olá Tutor(a) 👋"));
        assert!(second.replies[0].text.starts_with("Olá Tutor(a) 👋"));
    }

    #[tokio::test]
    async fn intake_echoes_raw_body() {
        let client = RecordingClient::new();
        let routed = InboundRouter::default()
            .route(INTAKE, &ContactId::new("1@c.us"), "  Rex, Dog  ", &client)
            .await;

        assert_eq!(routed.transition, Transition::Reset);
        assert_eq!(routed.replies[2].text, "Recebemos: \"  Rex, Dog  \"");
    }

    #[tokio::test]
    async fn silenced_produces_no_replies() {
        let client = RecordingClient::new();
        let routed = InboundRouter::default()
            .route(HUMAN, &ContactId::new("1@c.us"), "menu", &client)
            .await;

        assert!(routed.replies.is_empty());
        assert_eq!(routed.transition, Transition::Keep);
    }
}
