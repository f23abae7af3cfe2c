//! Fixed reply texts.
//!
//! Every message the desk can send lives here, grouped into the sequences
//! each rule emits. Texts are WhatsApp-formatted (`*bold*`).

use serde::{Deserialize, Serialize};
use std::fmt;

const CLINIC_ADDRESS: &str = "Av. Joaquim Aires, 2301 - Centro, Porto Nacional - TO";
const MENU_DELAY_MS: u64 = 2000;
const SHORT_DELAY_MS: u64 = 1500;

/// How a single reply is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StepDelivery {
    /// Show the typing indicator, wait, then send. `None` uses the configured delay.
    Typing { delay_ms: Option<u64> },
    /// Send immediately, right after the previous step.
    Plain,
}

/// One outbound message in a reply sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyStep {
    pub text: String,
    pub delivery: StepDelivery,
}

impl ReplyStep {
    /// A typing-simulated reply at the default pace.
    #[must_use]
    pub fn typed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            delivery: StepDelivery::Typing { delay_ms: None },
        }
    }

    /// A typing-simulated reply with its own delay.
    #[must_use]
    pub fn typed_for(text: impl Into<String>, delay_ms: u64) -> Self {
        Self {
            text: text.into(),
            delivery: StepDelivery::Typing {
                delay_ms: Some(delay_ms),
            },
        }
    }

    /// An immediate reply without typing indicator.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            delivery: StepDelivery::Plain,
        }
    }
}

/// The numbered menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuOption {
    ScheduleConsultation,
    Vaccines,
    Exams,
    LocationAndHours,
    TalkToAttendant,
    Emergency,
}

impl MenuOption {
    pub const ALL: [Self; 6] = [
        Self::ScheduleConsultation,
        Self::Vaccines,
        Self::Exams,
        Self::LocationAndHours,
        Self::TalkToAttendant,
        Self::Emergency,
    ];

    /// Parses a normalized message body. Only the bare digits `1` to `6` match.
    #[must_use]
    pub fn from_selection(body: &str) -> Option<Self> {
        match body {
            "1" => Some(Self::ScheduleConsultation),
            "2" => Some(Self::Vaccines),
            "3" => Some(Self::Exams),
            "4" => Some(Self::LocationAndHours),
            "5" => Some(Self::TalkToAttendant),
            "6" => Some(Self::Emergency),
            _ => None,
        }
    }

    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::ScheduleConsultation => 1,
            Self::Vaccines => 2,
            Self::Exams => 3,
            Self::LocationAndHours => 4,
            Self::TalkToAttendant => 5,
            Self::Emergency => 6,
        }
    }

    /// Label as shown in the menu.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::ScheduleConsultation => "📅 Agendar Consulta",
            Self::Vaccines => "💉 Informações sobre Vacinas",
            Self::Exams => "🔬 Informações sobre Exames",
            Self::LocationAndHours => "📍 Localização e Horários",
            Self::TalkToAttendant => "👩‍⚕️ Falar com Atendente",
            Self::Emergency => "🚨 Emergência",
        }
    }
}

impl fmt::Display for MenuOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Greeting addressed to `first_name`, followed by the menu.
#[must_use]
pub fn welcome(first_name: &str) -> Vec<ReplyStep> {
    vec![
        ReplyStep::typed(format!(
            "Olá {first_name} 👋 Sou o assistente virtual da VetClin 👩‍⚕️."
        )),
        ReplyStep::typed_for(menu_text(), MENU_DELAY_MS),
    ]
}

/// The numbered menu.
#[must_use]
pub fn menu_text() -> String {
    let mut text =
        String::from("Como posso ajudá-lo hoje? Digite o número da opção desejada:");
    for option in MenuOption::ALL {
        text.push_str(&format!("\n*{} - {}*", option.number(), option.label()));
    }
    text
}

/// Reply sequence for a menu selection.
#[must_use]
pub fn option_replies(option: MenuOption) -> Vec<ReplyStep> {
    match option {
        MenuOption::ScheduleConsultation => vec![
            ReplyStep::typed("Ok, vamos agendar uma consulta. 😊"),
            ReplyStep::plain(
                "1️⃣ Nome do tutor\n2️⃣ Nome e espécie do pet\n3️⃣ Motivo da consulta\n4️⃣ Melhor dia e horário",
            ),
            ReplyStep::typed_for(
                "Envie todas as informações em uma única mensagem.",
                SHORT_DELAY_MS,
            ),
        ],
        MenuOption::Vaccines => vec![
            ReplyStep::typed(
                "💉 *Vacinas Disponíveis*:\n\n🐶 *Cães*\n• Polivalente: R$60–70\n• Antirrábica: R$30\n• Gripe Canina: R$90\n\n🐱 *Gatos*\n• Feline 1: R$100\n• Feline + FELV: R$150\n\n⚠️ Reforço FELV exige teste prévio.",
            ),
            ReplyStep::typed("Digite *1* para agendar vacinação ou *Menu* para voltar."),
        ],
        MenuOption::Exams => vec![
            ReplyStep::typed(
                "🔬 *Exames disponíveis*: Hemograma, bioquímicos, raio-x, ultrassom, endoscopia, testes rápidos e muito mais.",
            ),
            ReplyStep::typed(
                "Exames são realizados mediante consulta veterinária ou pedido profissional.",
            ),
            ReplyStep::typed("Digite *1* para agendar consulta ou *Menu* para voltar."),
        ],
        MenuOption::LocationAndHours => vec![
            ReplyStep::typed(format!(
                "🏥 *VetClin*\n{CLINIC_ADDRESS}\n📍 https://share.google/KtFwbdJXQ8AVloaJD"
            )),
            ReplyStep::plain("🕐 Horário: Seg–Sex 8h–18h | Sáb 8h–12h\n🚨 Emergências 24h"),
            ReplyStep::typed("Digite *Menu* para voltar."),
        ],
        MenuOption::TalkToAttendant => vec![ReplyStep::typed(
            "👩‍⚕️ Transferindo para um atendente humano. Aguarde um instante...",
        )],
        MenuOption::Emergency => vec![
            ReplyStep::typed("🚨 *EMERGÊNCIA* 🚨\nLigue agora: (63) 99114-0858"),
            ReplyStep::plain(format!("📍 Endereço:\n{CLINIC_ADDRESS}")),
        ],
    }
}

/// Acknowledgment of the consultation details, echoing them verbatim.
#[must_use]
pub fn intake_acknowledgment(received: &str) -> Vec<ReplyStep> {
    vec![
        ReplyStep::typed("Obrigado pelas informações! 👍"),
        ReplyStep::typed("Nossa equipe vai confirmar seu agendamento em breve."),
        ReplyStep::typed(format!("Recebemos: \"{received}\"")),
    ]
}

/// Reply for input no rule recognized.
#[must_use]
pub fn fallback() -> Vec<ReplyStep> {
    vec![
        ReplyStep::typed("Desculpe, não entendi. 🤔"),
        ReplyStep::typed("Digite *Menu* para ver as opções disponíveis."),
    ]
}

/// Sent when the operator takes over: first the contact-facing notice, then
/// the confirmation meant for the operator.
#[must_use]
pub fn takeover() -> Vec<ReplyStep> {
    vec![
        ReplyStep::typed_for(
            "👩‍⚕️ Um atendente assumiu a conversa agora e irá te responder em instantes.",
            SHORT_DELAY_MS,
        ),
        ReplyStep::plain("✅ Bot silenciado. Use *!bot_reativar* ao finalizar."),
    ]
}

/// Sent when the operator hands the contact back to the bot.
#[must_use]
pub fn handback() -> Vec<ReplyStep> {
    vec![ReplyStep::typed_for(
        "🤖 Olá! A conversa com a recepção foi finalizada. Digite *Menu* para ver as opções novamente.",
        MENU_DELAY_MS,
    )]
}

/// Operator-facing notice for `!bot_reativar` on a contact the bot was not silenced for.
#[must_use]
pub fn not_deactivated() -> Vec<ReplyStep> {
    vec![ReplyStep::plain(
        "❌ O bot não estava desativado para esse cliente.",
    )]
}
