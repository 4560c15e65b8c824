//! Reply personalities and their Hinglish prompt templates.
//!
//! Every template carries exactly one `{context}` and one `{question}`
//! placeholder. Rendering substitutes both in one pass, so braces inside the
//! retrieved documents or the user's question are copied through verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

const FUNNY: &str = "
You are a funny, sarcastic friend.
You MUST reply in Hinglish (Hindi + English mixed, written in English letters).
Your tone is playful, dark-funny, and relatable.
Never be cruel, abusive, or encouraging harm.

Rules:
- Use Hinglish naturally (jaise real friends baat karte hain)
- Add light sarcasm and humor 😏
- Be emotionally supportive ❤️
- No pure Hindi, no pure English — MIX THEM

CONTEXT:
{context}

QUESTION:
{question}

Reply in Hinglish, funny and sarcastic:
";

const SAVAGE: &str = "
You are a brutally honest but caring friend.
Reply ONLY in Hinglish (Roman Hindi + English).
Use savage humor but stay supportive.
No insults, no negativity.

CONTEXT:
{context}

QUESTION:
{question}

Reply in Hinglish with savage but caring humor:
";

const GENTLE: &str = "
You are a calm, emotionally supportive friend.
Reply ONLY in Hinglish (simple, soft tone).
No sarcasm, no roasting.

CONTEXT:
{context}

QUESTION:
{question}

Reply in gentle Hinglish:
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Personality {
    Funny,
    Savage,
    Gentle,
}

impl Personality {
    pub const ALL: [Personality; 3] = [Personality::Funny, Personality::Savage, Personality::Gentle];

    pub fn name(self) -> &'static str {
        match self {
            Personality::Funny => "Funny",
            Personality::Savage => "Savage",
            Personality::Gentle => "Gentle",
        }
    }

    /// Label shown in the UI.
    pub fn label(self) -> &'static str {
        match self {
            Personality::Funny => "Funny 😁",
            Personality::Savage => "Savage 😈",
            Personality::Gentle => "Gentle 💙",
        }
    }

    pub fn template(self) -> &'static str {
        match self {
            Personality::Funny => FUNNY,
            Personality::Savage => SAVAGE,
            Personality::Gentle => GENTLE,
        }
    }

    pub fn render(self, context: &str, question: &str) -> String {
        fill_template(self.template(), context, question)
    }
}

/// Template for a personality name or UI label.
pub fn select(label: &str) -> Result<&'static str, Error> {
    label.parse::<Personality>().map(Personality::template)
}

fn fill_template(template: &str, context: &str, question: &str) -> String {
    const CONTEXT: &str = "{context}";
    const QUESTION: &str = "{question}";
    let mut out = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        if let Some(after) = tail.strip_prefix(CONTEXT) {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(QUESTION) {
            out.push_str(question);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Personality {
    type Err = Error;

    /// Accepts the variant name or the full UI label, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Personality::ALL
            .into_iter()
            .find(|p| trimmed.eq_ignore_ascii_case(p.name()) || trimmed.eq_ignore_ascii_case(p.label()))
            .ok_or_else(|| Error::UnknownPersonality(s.to_string()))
    }
}

impl TryFrom<String> for Personality {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Personality> for String {
    fn from(p: Personality) -> Self {
        p.name().to_string()
    }
}
