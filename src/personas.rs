//! Voice personas: the static catalog and the trigger-based selector.
//!
//! Selection is deterministic. Trigger hits are counted per persona and
//! ties resolve by catalog declaration order, with the default persona
//! winning any tie it is part of.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifier for a catalog persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaKey {
    /// Institutional tone, data-driven, risk-aware.
    ProfessionalAnalyst,
    /// Fun, short, meme-aware, light slang.
    CasualDegen,
    /// Academic, fact-only, asks clarifying questions.
    NeutralResearcher,
}

impl Default for PersonaKey {
    fn default() -> Self {
        Self::NeutralResearcher
    }
}

impl std::fmt::Display for PersonaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProfessionalAnalyst => write!(f, "professional_analyst"),
            Self::CasualDegen => write!(f, "casual_degen"),
            Self::NeutralResearcher => write!(f, "neutral_researcher"),
        }
    }
}

impl std::str::FromStr for PersonaKey {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "professional_analyst" => Ok(Self::ProfessionalAnalyst),
            "casual_degen" => Ok(Self::CasualDegen),
            "neutral_researcher" => Ok(Self::NeutralResearcher),
            _ => Err(format!("Unknown persona: {}", s)),
        }
    }
}

/// One catalog entry: voice instruction plus the trigger terms that pull
/// posts toward this persona.
#[derive(Debug, Clone)]
pub struct PersonaProfile {
    pub key: PersonaKey,
    pub display_name: &'static str,
    /// System instruction for model-drafted replies.
    pub voice_prompt: &'static str,
    /// Lower-case trigger terms, matched as substrings.
    pub triggers: &'static [&'static str],
}

/// The immutable persona catalog. Declaration order is the tie-break
/// order for selection.
#[derive(Debug, Clone)]
pub struct PersonaCatalog {
    profiles: Vec<PersonaProfile>,
    default_key: PersonaKey,
}

impl PersonaCatalog {
    /// The standard three-persona catalog.
    pub fn standard() -> Self {
        Self {
            profiles: vec![
                PersonaProfile {
                    key: PersonaKey::ProfessionalAnalyst,
                    display_name: "Professional Analyst",
                    voice_prompt: "You are a Professional Analyst on Crypto Twitter. \
                        Use institutional tone, data-driven logic, and risk-aware framing. \
                        Never use hype language.",
                    triggers: &["etf", "institution", "macro", "liquidity", "risk", "volatility"],
                },
                PersonaProfile {
                    key: PersonaKey::CasualDegen,
                    display_name: "Casual Degen",
                    voice_prompt: "You are a Casual Degen on Crypto Twitter. \
                        Keep responses fun, short, meme-aware with light crypto slang. \
                        Never give financial advice.",
                    triggers: &["gm", "wen", "moon", "meme", "degen", "ape", "pump"],
                },
                PersonaProfile {
                    key: PersonaKey::NeutralResearcher,
                    display_name: "Neutral Researcher",
                    voice_prompt: "You are a Neutral Researcher. \
                        Write in an academic, fact-only tone, avoid price speculation, \
                        and ask clarifying questions when useful.",
                    triggers: &["study", "data", "paper", "metrics", "method", "evidence"],
                },
            ],
            default_key: PersonaKey::NeutralResearcher,
        }
    }

    /// The fallback persona for posts that trip no triggers.
    pub fn default_key(&self) -> PersonaKey {
        self.default_key
    }

    /// All profiles in declaration order.
    pub fn profiles(&self) -> &[PersonaProfile] {
        &self.profiles
    }

    /// Look up a profile by key. The catalog always contains every key.
    pub fn profile(&self, key: PersonaKey) -> &PersonaProfile {
        self.profiles
            .iter()
            .find(|p| p.key == key)
            .unwrap_or(&self.profiles[0])
    }

    /// Pick the persona for a post.
    ///
    /// An override must name a known persona and is returned unchanged.
    /// Otherwise trigger hits are counted per persona over the lower-cased
    /// text; the default persona wins any tie at the maximum (including
    /// the all-zero case), and remaining ties resolve by catalog order.
    pub fn select(
        &self,
        text: &str,
        override_key: Option<&str>,
    ) -> Result<PersonaKey, ValidationError> {
        if let Some(raw) = override_key {
            return raw
                .parse::<PersonaKey>()
                .map_err(|_| ValidationError::UnknownPersona {
                    name: raw.to_string(),
                });
        }

        let lowered = text.to_lowercase();
        let scores: Vec<(PersonaKey, usize)> = self
            .profiles
            .iter()
            .map(|p| (p.key, trigger_hits(&lowered, p.triggers)))
            .collect();

        let max = scores.iter().map(|(_, n)| *n).max().unwrap_or(0);

        if scores
            .iter()
            .any(|(key, n)| *key == self.default_key && *n == max)
        {
            return Ok(self.default_key);
        }

        let winner = scores
            .iter()
            .find(|(_, n)| *n == max)
            .map(|(key, _)| *key)
            .unwrap_or(self.default_key);
        Ok(winner)
    }
}

impl Default for PersonaCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Count how many trigger terms appear in the (already lower-cased) text.
/// Each term counts once no matter how often it occurs.
fn trigger_hits(lowered: &str, triggers: &[&str]) -> usize {
    triggers.iter().filter(|t| lowered.contains(**t)).count()
}
