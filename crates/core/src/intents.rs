//! Fixed-keyword intent matching for messages addressed to the bot.

use serde::{Deserialize, Serialize};

/// How an inbound message was directed at the bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressingContext {
    DirectMessage,
    DirectMention,
    Mention,
    /// Channel chatter that does not mention the bot. Never triggers an intent,
    /// but still answers an open dialogue question.
    Ambient,
}

impl AddressingContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectMessage => "direct_message",
            Self::DirectMention => "direct_mention",
            Self::Mention => "mention",
            Self::Ambient => "ambient",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Help,
    FoodRequest,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Help => "help",
            Self::FoodRequest => "food_request",
        }
    }
}

const ADDRESSED: &[AddressingContext] = &[
    AddressingContext::DirectMessage,
    AddressingContext::DirectMention,
    AddressingContext::Mention,
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerRule {
    pub intent: Intent,
    pub phrases: Vec<String>,
    pub contexts: Vec<AddressingContext>,
}

impl TriggerRule {
    pub fn new(intent: Intent, phrases: &[&str], contexts: &[AddressingContext]) -> Self {
        Self {
            intent,
            phrases: phrases.iter().map(|phrase| (*phrase).to_owned()).collect(),
            contexts: contexts.to_vec(),
        }
    }

    fn matches(&self, text: &str, context: AddressingContext) -> bool {
        self.contexts.contains(&context) && self.phrases.iter().any(|phrase| phrase == text)
    }
}

/// Rules are evaluated in registration order; the first match wins.
#[derive(Clone, Debug, Default)]
pub struct TriggerMatcher {
    rules: Vec<TriggerRule>,
}

impl TriggerMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rule: TriggerRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Case-sensitive exact match of the trimmed text against each rule's
    /// phrase set. No substring or fuzzy matching.
    pub fn match_intent(&self, text: &str, context: AddressingContext) -> Option<Intent> {
        let text = text.trim();
        self.rules.iter().find(|rule| rule.matches(text, context)).map(|rule| rule.intent)
    }

    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }
}

pub fn default_matcher() -> TriggerMatcher {
    let mut matcher = TriggerMatcher::new();
    matcher
        .register(TriggerRule::new(Intent::Greeting, &["hello", "hi", "howdy"], ADDRESSED))
        .register(TriggerRule::new(Intent::Help, &["help!!!", "help me", "help"], ADDRESSED))
        .register(TriggerRule::new(
            Intent::FoodRequest,
            &["food", "hungry", "famished", "starving"],
            ADDRESSED,
        ));
    matcher
}

#[cfg(test)]
mod tests {
    use super::{default_matcher, AddressingContext, Intent, TriggerMatcher, TriggerRule};

    const ADDRESSED: [AddressingContext; 3] = [
        AddressingContext::DirectMessage,
        AddressingContext::DirectMention,
        AddressingContext::Mention,
    ];

    #[test]
    fn greeting_phrases_match_in_every_addressed_context() {
        let matcher = default_matcher();
        for text in ["hello", "hi", "howdy"] {
            for context in ADDRESSED {
                assert_eq!(
                    matcher.match_intent(text, context),
                    Some(Intent::Greeting),
                    "`{text}` in {context:?}"
                );
            }
        }
    }

    #[test]
    fn matching_is_case_sensitive_and_exact() {
        let matcher = default_matcher();
        assert_eq!(matcher.match_intent("Hello", AddressingContext::DirectMessage), None);
        assert_eq!(matcher.match_intent("HI", AddressingContext::DirectMessage), None);
        assert_eq!(matcher.match_intent("hello there", AddressingContext::DirectMessage), None);
        assert_eq!(matcher.match_intent("oh hi", AddressingContext::DirectMessage), None);
        assert_eq!(matcher.match_intent("foodie", AddressingContext::DirectMessage), None);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_before_matching() {
        let matcher = default_matcher();
        assert_eq!(
            matcher.match_intent("  hungry \n", AddressingContext::DirectMention),
            Some(Intent::FoodRequest)
        );
        assert_eq!(matcher.match_intent("help  me", AddressingContext::DirectMention), None);
    }

    #[test]
    fn ambient_messages_never_trigger() {
        let matcher = default_matcher();
        assert_eq!(matcher.match_intent("food", AddressingContext::Ambient), None);
        assert_eq!(matcher.match_intent("hello", AddressingContext::Ambient), None);
    }

    #[test]
    fn help_and_food_phrases_resolve_to_their_intents() {
        let matcher = default_matcher();
        for text in ["help!!!", "help me", "help"] {
            assert_eq!(
                matcher.match_intent(text, AddressingContext::Mention),
                Some(Intent::Help)
            );
        }
        for text in ["food", "hungry", "famished", "starving"] {
            assert_eq!(
                matcher.match_intent(text, AddressingContext::DirectMessage),
                Some(Intent::FoodRequest)
            );
        }
    }

    #[test]
    fn first_registered_rule_wins_on_overlap() {
        let mut matcher = TriggerMatcher::new();
        matcher
            .register(TriggerRule::new(Intent::Help, &["hi"], &ADDRESSED))
            .register(TriggerRule::new(Intent::Greeting, &["hi"], &ADDRESSED));

        assert_eq!(matcher.match_intent("hi", AddressingContext::DirectMessage), Some(Intent::Help));
    }

    #[test]
    fn rule_only_fires_in_registered_contexts() {
        let mut matcher = TriggerMatcher::new();
        matcher.register(TriggerRule::new(
            Intent::Greeting,
            &["hello"],
            &[AddressingContext::DirectMessage],
        ));

        assert_eq!(
            matcher.match_intent("hello", AddressingContext::DirectMessage),
            Some(Intent::Greeting)
        );
        assert_eq!(matcher.match_intent("hello", AddressingContext::Mention), None);
    }

    #[test]
    fn default_matcher_registers_in_priority_order() {
        let matcher = default_matcher();
        let order: Vec<Intent> = matcher.rules().iter().map(|rule| rule.intent).collect();
        assert_eq!(order, vec![Intent::Greeting, Intent::Help, Intent::FoodRequest]);
    }

    #[test]
    fn log_labels_match_serialised_names() {
        for intent in [Intent::Greeting, Intent::Help, Intent::FoodRequest] {
            assert_eq!(serde_json::to_value(intent).expect("serialize"), intent.as_str());
        }
        for context in [
            AddressingContext::DirectMessage,
            AddressingContext::DirectMention,
            AddressingContext::Mention,
            AddressingContext::Ambient,
        ] {
            assert_eq!(serde_json::to_value(context).expect("serialize"), context.as_str());
        }
    }
}
