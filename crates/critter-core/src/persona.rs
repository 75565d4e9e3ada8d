//! Built-in therapist personas.
//!
//! One descriptor per character drives everything persona-specific: the
//! directory listing, the intro line, the reply table and the voice settings.
//! Lion and Fox appear in the directory but have no chat table yet.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

use crate::reply::{Category, ReplyRule, ReplySelector};

/// Delay before a canned reply is shown, so the bot appears to think.
pub const DEFAULT_REPLY_DELAY_MS: u64 = 600;

/// How a persona speaks its replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VoiceOutput {
    /// Text only.
    None,
    /// Local speech synthesis only.
    Local,
    /// Hosted synthesis with the given voice, local synthesis as fallback.
    Hosted { voice_id: &'static str },
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RuleSpec {
    pub category: Category,
    pub pattern: &'static str,
    pub reply: &'static str,
}

/// Reply table and conversation settings for a chat-capable persona.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChatTable {
    pub intro: &'static str,
    pub rules: &'static [RuleSpec],
    pub fallback: &'static str,
    pub reply_delay_ms: u64,
    pub voice_output: VoiceOutput,
    pub voice_input: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Persona {
    pub slug: &'static str,
    pub name: &'static str,
    pub emoji: &'static str,
    pub title: &'static str,
    pub personality: &'static str,
    pub therapy: &'static str,
    pub specialty: &'static str,
    pub signature: &'static str,
    pub chat: Option<ChatTable>,
}

/// Directory entry, as listed by `GET /api/personas`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaSummary {
    pub slug: &'static str,
    pub name: &'static str,
    pub emoji: &'static str,
    pub title: &'static str,
    pub chat_available: bool,
}

impl Persona {
    pub fn summary(&self) -> PersonaSummary {
        PersonaSummary {
            slug: self.slug,
            name: self.name,
            emoji: self.emoji,
            title: self.title,
            chat_available: self.chat.is_some(),
        }
    }

    /// Compiled selector for this persona, `None` if it has no chat table.
    pub fn selector(&self) -> Option<&'static ReplySelector> {
        SELECTORS.get(self.slug)
    }

    /// Session identifier tag, e.g. `panda`.
    pub fn tag(&self) -> &'static str {
        self.slug
    }
}

const GREETING: &str = "hello|hi|hey";
const GRATITUDE: &str = "thank";

pub static PERSONAS: &[Persona] = &[
    Persona {
        slug: "panda",
        name: "Panda",
        emoji: "🐼",
        title: "The Stoic Listener",
        personality: "Calm, grounded, serene",
        therapy: "Quiet, supportive presence who lets you speak freely and only offers deep, reflective feedback",
        specialty: "Overthinking, emotional burnout, inner peace",
        signature: "Stillness reveals what noise hides.",
        chat: Some(ChatTable {
            intro: "Hello, I'm Panda. Stillness reveals what noise hides. How can I help you today?",
            rules: &[
                RuleSpec {
                    category: Category::Greeting,
                    pattern: GREETING,
                    reply: "Hello. I'm here to listen.",
                },
                RuleSpec {
                    category: Category::Distress,
                    pattern: "sad|tired|burnout|overwhelmed",
                    reply: "Take a deep breath. Sometimes, stillness is the best answer.",
                },
                RuleSpec {
                    category: Category::Gratitude,
                    pattern: GRATITUDE,
                    reply: "You're welcome. Remember, peace is within.",
                },
            ],
            fallback: "I'm listening. Share as much as you wish.",
            reply_delay_ms: DEFAULT_REPLY_DELAY_MS,
            voice_output: VoiceOutput::Hosted {
                voice_id: "NOpBlnGInO9m6vDvFkFC",
            },
            voice_input: true,
        }),
    },
    Persona {
        slug: "lion",
        name: "Lion",
        emoji: "🦁",
        title: "The Proud Motivator",
        personality: "Bold, assertive, dignified",
        therapy: "Direct and empowering; encourages you to own your voice and stand tall",
        specialty: "Self-confidence, imposter syndrome, leadership stress",
        signature: "Remember who you are.",
        chat: None,
    },
    Persona {
        slug: "cat",
        name: "Cat",
        emoji: "🐱",
        title: "The Relaxed Realist",
        personality: "Chill, slightly aloof, emotionally intelligent",
        therapy: "Casual and nonjudgmental; helps you relax and not take life too seriously",
        specialty: "Social anxiety, perfectionism, burnout from overworking",
        signature: "You don't need to have it all together, just land on your feet.",
        chat: Some(ChatTable {
            intro: "Hey, I'm Cat. You don't need to have it all together. What's on your mind?",
            rules: &[
                RuleSpec {
                    category: Category::Greeting,
                    pattern: GREETING,
                    reply: "What's up? No need to be formal.",
                },
                RuleSpec {
                    category: Category::Distress,
                    pattern: "anxious|stressed|worried",
                    reply: "Just relax. It's not that serious. Let's talk it out.",
                },
                RuleSpec {
                    category: Category::Gratitude,
                    pattern: GRATITUDE,
                    reply: "No problem. Glad I could help.",
                },
            ],
            fallback: "I'm listening. Take your time.",
            reply_delay_ms: DEFAULT_REPLY_DELAY_MS,
            voice_output: VoiceOutput::Local,
            voice_input: true,
        }),
    },
    Persona {
        slug: "fox",
        name: "Fox",
        emoji: "🦊",
        title: "The Clever Strategist",
        personality: "Witty, smart, adaptable",
        therapy: "Creative solutions and perspective shifts; always finds a workaround",
        specialty: "Decision-making stress, masking emotions, self-sabotage",
        signature: "There's always a clever way forward.",
        chat: None,
    },
    Persona {
        slug: "elephant",
        name: "Elephant",
        emoji: "🐘",
        title: "The Gentle Healer",
        personality: "Wise, empathetic, deeply thoughtful",
        therapy: "Uses stories, metaphors, and long-term perspective to heal emotional wounds",
        specialty: "Grief, trauma, long-term emotional pain",
        signature: "Even the heaviest memories can be carried with grace.",
        chat: Some(ChatTable {
            intro: "Hello, I'm Elephant. Even the heaviest memories can be carried with grace. What would you like to share?",
            rules: &[
                RuleSpec {
                    category: Category::Greeting,
                    pattern: GREETING,
                    reply: "Greetings. I am here to listen with patience.",
                },
                RuleSpec {
                    category: Category::Distress,
                    pattern: "sad|grief|pain",
                    reply: "It is okay to feel that way. These things take time. We will get through it together.",
                },
                RuleSpec {
                    category: Category::Gratitude,
                    pattern: GRATITUDE,
                    reply: "You are most welcome. Remember your strength.",
                },
            ],
            fallback: "I understand. Please, continue when you are ready.",
            reply_delay_ms: DEFAULT_REPLY_DELAY_MS,
            voice_output: VoiceOutput::None,
            voice_input: false,
        }),
    },
];

// Built-in patterns are literals; a failure here is a programming error.
static SELECTORS: LazyLock<HashMap<&'static str, ReplySelector>> = LazyLock::new(|| {
    PERSONAS
        .iter()
        .filter_map(|p| {
            let table = p.chat?;
            let rules: Vec<ReplyRule> = table
                .rules
                .iter()
                .map(|r| ReplyRule::new(r.category, r.pattern, r.reply))
                .collect();
            let selector = ReplySelector::new(&rules, table.fallback).unwrap();
            Some((p.slug, selector))
        })
        .collect()
});

/// All personas in directory order.
pub fn all() -> &'static [Persona] {
    PERSONAS
}

/// Look up a persona by slug or display name, ignoring case and surrounding
/// whitespace.
pub fn find(name: &str) -> Option<&'static Persona> {
    let wanted = name.trim();
    PERSONAS
        .iter()
        .find(|p| p.slug.eq_ignore_ascii_case(wanted) || p.name.eq_ignore_ascii_case(wanted))
}
