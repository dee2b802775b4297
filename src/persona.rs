//! Persona table and upstream prompt assembly.
//!
//! Modes form a closed set; a caller-supplied mode string that matches
//! nothing degrades to [`ChatMode::Standard`] on purpose, since mode is
//! untrusted input and must not be a crash vector.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatMode {
    Standard,
    Thinking,
    Search,
    Maps,
    Fast,
}

impl ChatMode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "thinking" => Self::Thinking,
            "search" => Self::Search,
            "maps" => Self::Maps,
            "fast" => Self::Fast,
            _ => Self::Standard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Thinking => "thinking",
            Self::Search => "search",
            Self::Maps => "maps",
            Self::Fast => "fast",
        }
    }

    pub fn persona(&self) -> &'static Persona {
        match self {
            Self::Standard => &STANDARD,
            Self::Thinking => &THINKING,
            Self::Search => &SEARCH,
            Self::Maps => &MAPS,
            Self::Fast => &FAST,
        }
    }
}

/// A system-instruction profile plus its sampling temperature. Static,
/// process-wide, never user-mutable.
pub struct Persona {
    pub instruction: &'static str,
    pub temperature: f32,
}

// Precision-oriented personas sample low; the aesthetic default and the
// trend scout sample high.
const LOW_TEMPERATURE: f32 = 0.2;
const HIGH_TEMPERATURE: f32 = 0.8;

static STANDARD: Persona = Persona {
    instruction: "You are GAYA, a high-end aesthetic concierge. You speak in poetic, flowing prose (no lists). You focus on \"vibes,\" emotions, and sensory details. If a user asks for a trip, describe the *feeling* of the air, the texture of the sheets, and the mood of the light. Be mysterious and alluring.",
    temperature: HIGH_TEMPERATURE,
};

static THINKING: Persona = Persona {
    instruction: "You are DEEP, a logistical super-intelligence. You solve complex travel constraints. You are precise, analytical, and structured. Use bullet points and percentages. Anticipate problems (traffic, weather, conflicts) before the user asks. Your goal is optimization and feasibility.",
    temperature: LOW_TEMPERATURE,
};

static SEARCH: Persona = Persona {
    instruction: "You are WEB, the ultimate insider. You know what is \"cool\" right now. You ignore tourist traps and focus on underground events, pop-ups, and social signals. You speak like a trendsetter: short, punchy, and \"in the know.\"",
    temperature: HIGH_TEMPERATURE,
};

static MAPS: Persona = Persona {
    instruction: "You are MAPS, a spatial curator. You describe the world in terms of \"routes\" and \"proximity.\" Do not give generic addresses; give directions based on landmarks and \"scenic value.\" Suggest walking paths that maximize beauty.",
    temperature: LOW_TEMPERATURE,
};

static FAST: Persona = Persona {
    instruction: "You are FAST, a silent butler. You are purely transactional. Do not chat. Do not explain. Just confirm actions. Use extremely brief phrases like \"Confirmed,\" \"Booked,\" \"Car dispatched.\" Your goal is zero friction.",
    temperature: LOW_TEMPERATURE,
};

#[derive(Clone, Debug, Serialize)]
pub struct UpstreamPayload {
    pub prompt: PromptBlock,
    pub temperature: f32,
    pub candidate_count: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PromptBlock {
    pub context: String,
    pub examples: Vec<serde_json::Value>,
    pub messages: Vec<PromptMessage>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PromptMessage {
    pub content: String,
}

/// Builds the upstream request: persona instruction as context, then one
/// message block carrying the labeled history and user request sections.
pub fn assemble(mode: ChatMode, sanitized_message: &str, history: &[String]) -> UpstreamPayload {
    let persona = mode.persona();
    let context = history.join("\n");
    let content = format!("[Conversation History]:\n{context}\n\n[User Request]: {sanitized_message}");
    UpstreamPayload {
        prompt: PromptBlock {
            context: persona.instruction.to_string(),
            examples: Vec::new(),
            messages: vec![PromptMessage { content }],
        },
        temperature: persona.temperature,
        candidate_count: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_mode_degrades_to_standard() {
        assert_eq!(ChatMode::parse("bogus"), ChatMode::Standard);
        assert_eq!(ChatMode::parse(""), ChatMode::Standard);
        assert_eq!(ChatMode::parse(" thinking "), ChatMode::Thinking);
    }

    #[test]
    fn temperature_is_fixed_per_mode() {
        assert_eq!(ChatMode::Standard.persona().temperature, 0.8);
        assert_eq!(ChatMode::Search.persona().temperature, 0.8);
        assert_eq!(ChatMode::Thinking.persona().temperature, 0.2);
        assert_eq!(ChatMode::Maps.persona().temperature, 0.2);
        assert_eq!(ChatMode::Fast.persona().temperature, 0.2);
    }

    #[test]
    fn assemble_embeds_sections_in_order() {
        let history = vec!["turn one".to_string(), "turn two".to_string()];
        let payload = assemble(ChatMode::Thinking, "plan a weekend", &history);
        assert_eq!(payload.candidate_count, 1);
        assert_eq!(payload.temperature, 0.2);
        assert!(payload.prompt.context.starts_with("You are DEEP"));
        assert!(payload.prompt.examples.is_empty());

        let content = &payload.prompt.messages[0].content;
        assert_eq!(
            content,
            "[Conversation History]:\nturn one\nturn two\n\n[User Request]: plan a weekend"
        );
    }

    #[test]
    fn assemble_serializes_to_expected_wire_shape() {
        let payload = assemble(ChatMode::Standard, "hi", &[]);
        let value = serde_json::to_value(&payload).expect("serializes");
        assert!(value["prompt"]["context"].as_str().is_some());
        assert_eq!(value["prompt"]["examples"], serde_json::json!([]));
        assert_eq!(value["candidate_count"], 1);
        assert!(
            value["prompt"]["messages"][0]["content"]
                .as_str()
                .expect("content string")
                .ends_with("[User Request]: hi")
        );
    }
}
