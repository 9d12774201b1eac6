//! Keyword-based health assistant.
//!
//! Entries are checked in order: emergencies, then symptoms, then greetings.
//! Anything else gets a general fallback. Every reply ends with a disclaimer.

use async_trait::async_trait;

use super::{ChatError, ChatResponder};

pub const DISCLAIMER: &str = "This information is not a substitute for professional medical advice. \
Please consult a qualified healthcare provider for diagnosis and treatment.";

const EMERGENCY_REPLY: &str = "This sounds like it could be a medical emergency. \
Call your local emergency number (such as 911 or 112) or go to the nearest emergency room right away.";

const GREETING_REPLY: &str = "Hello! I am MediBot, your health assistant. \
Tell me about a symptom or ask a health question and I will do my best to help.";

const FALLBACK_REPLY: &str = "I can help with common symptoms such as fever, headache, cough, \
stomach upset, sleep problems and stress. Could you describe what you are experiencing in more detail?";

const EMERGENCY_KEYWORDS: &[&str] = &[
    "chest pain",
    "heart attack",
    "can't breathe",
    "cannot breathe",
    "difficulty breathing",
    "stroke",
    "unconscious",
    "severe bleeding",
    "seizure",
    "suicide",
    "overdose",
];

const GREETINGS: &[&str] = &["hello", "hi", "hey", "greetings", "namaste"];

struct Topic {
    keywords: &'static [&'static str],
    reply: &'static str,
}

const TOPICS: &[Topic] = &[
    Topic {
        keywords: &["fever", "temperature"],
        reply: "For a fever: rest, drink plenty of fluids and consider paracetamol or ibuprofen \
as directed on the label. See a doctor if it goes above 39.4°C (103°F) or lasts more than three days.",
    },
    Topic {
        keywords: &["headache", "migraine"],
        reply: "For a headache: rest in a quiet, dark room, stay hydrated and try an over-the-counter \
pain reliever. Seek care for a sudden severe headache or one with vision changes or a stiff neck.",
    },
    Topic {
        keywords: &["cough", "sore throat", "cold", "flu"],
        reply: "For a cough or cold: rest, drink warm fluids, try honey with warm water and use a \
humidifier. See a doctor if symptoms last more than ten days or you have trouble breathing.",
    },
    Topic {
        keywords: &["stomach", "nausea", "vomit", "diarrhea", "diarrhoea"],
        reply: "For stomach upset: sip clear fluids or oral rehydration solution and eat bland food. \
Seek care if you cannot keep fluids down, see blood, or symptoms last more than two days.",
    },
    Topic {
        keywords: &["back pain", "joint", "muscle"],
        reply: "For muscle or joint pain: rest the area, apply ice for the first 48 hours and heat \
after that, and stretch gently. See a doctor if pain follows an injury or does not improve in a week.",
    },
    Topic {
        keywords: &["allergy", "allergic", "rash", "itch"],
        reply: "For allergies or a mild rash: avoid the trigger and consider an antihistamine. \
Get emergency help if you notice swelling of the face or throat.",
    },
    Topic {
        keywords: &["sleep", "insomnia", "tired", "fatigue"],
        reply: "For sleep problems: keep a regular schedule, avoid caffeine late in the day and \
screens before bed. Persistent fatigue is worth discussing with your doctor.",
    },
    Topic {
        keywords: &["stress", "anxiety", "anxious", "depress"],
        reply: "For stress or anxiety: try slow breathing, regular exercise and talking with someone \
you trust. If these feelings persist or affect daily life, please reach out to a mental health professional.",
    },
    Topic {
        keywords: &["blood pressure", "hypertension"],
        reply: "To support healthy blood pressure: reduce salt, stay active, limit alcohol and take \
prescribed medication regularly. Check your readings and share them with your doctor.",
    },
    Topic {
        keywords: &["diabetes", "blood sugar", "glucose"],
        reply: "For blood sugar management: follow your meal plan, monitor glucose as advised and \
stay active. Contact your doctor if readings are consistently out of your target range.",
    },
];

const LIMITED_ACCESS_KEYWORDS: &[&str] = &[
    "appointment",
    "book",
    "hospital",
    "doctor",
    "clinic",
    "find",
    "nearby",
    "location",
];

const LIMITED_SYMPTOM_KEYWORDS: &[&str] = &[
    "symptom", "pain", "fever", "headache", "cough", "cold", "feel", "sick", "hurt", "ache",
];

const LIMITED_ACCESS_REPLY: &str = "To book appointments or find nearby hospitals, please login \
or sign up for full access to our services.";

const LIMITED_SYMPTOM_REPLY: &str = "High-level health tips:\n\
- Stay hydrated and drink plenty of water\n\
- Get adequate rest (7-8 hours)\n\
- Maintain a balanced diet\n\
- Practice good hygiene\n\
- Monitor your symptoms\n\n\
For detailed consultation and personalized advice, please login or sign up.";

const LIMITED_GENERAL_REPLY: &str = "I can provide basic health information in limited mode. \
For detailed consultations, personalized advice, appointment booking and finding nearby hospitals, \
please login or sign up.";

/// Reply for users who are not logged in. Nothing is stored.
pub fn limited_reply(message: &str) -> &'static str {
    let text = message.to_lowercase();
    if LIMITED_ACCESS_KEYWORDS.iter().any(|k| text.contains(k)) {
        LIMITED_ACCESS_REPLY
    } else if LIMITED_SYMPTOM_KEYWORDS.iter().any(|k| text.contains(k)) {
        LIMITED_SYMPTOM_REPLY
    } else {
        LIMITED_GENERAL_REPLY
    }
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect()
}

/// Phrases match as substrings; single keywords match word prefixes
fn mentions(text: &str, words: &[&str], keyword: &str) -> bool {
    if keyword.contains(' ') {
        text.contains(keyword)
    } else {
        words.iter().any(|w| w.starts_with(keyword))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleResponder;

impl RuleResponder {
    pub fn reply(&self, message: &str) -> String {
        let text = message.to_lowercase();
        let words = words(&text);

        let body = if EMERGENCY_KEYWORDS.iter().any(|k| mentions(&text, &words, k)) {
            EMERGENCY_REPLY
        } else if let Some(topic) = TOPICS
            .iter()
            .find(|t| t.keywords.iter().any(|k| mentions(&text, &words, k)))
        {
            topic.reply
        } else if words.iter().any(|w| GREETINGS.contains(w)) {
            GREETING_REPLY
        } else {
            FALLBACK_REPLY
        };

        format!("{body}\n\n{DISCLAIMER}")
    }
}

#[async_trait]
impl ChatResponder for RuleResponder {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn respond(&self, message: &str) -> Result<String, ChatError> {
        Ok(self.reply(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emergency_takes_priority_over_symptoms() {
        let reply = RuleResponder.reply("I have chest pain and a fever");
        assert!(reply.starts_with(EMERGENCY_REPLY));
    }

    #[test]
    fn test_symptom_topic_matched_by_prefix() {
        let reply = RuleResponder.reply("Bad headaches since Monday");
        assert!(reply.contains("quiet, dark room"));
        assert!(reply.ends_with(DISCLAIMER));
    }

    #[test]
    fn test_greeting_requires_whole_word() {
        assert!(RuleResponder.reply("hi there").starts_with(GREETING_REPLY));
        // "this" must not be read as a greeting
        assert!(RuleResponder.reply("what is this").starts_with(FALLBACK_REPLY));
    }

    #[test]
    fn test_limited_reply_routes_by_intent() {
        assert_eq!(limited_reply("Book an appointment"), LIMITED_ACCESS_REPLY);
        assert_eq!(limited_reply("I feel sick"), LIMITED_SYMPTOM_REPLY);
        assert_eq!(limited_reply("what is vitamin D"), LIMITED_GENERAL_REPLY);
    }
}
