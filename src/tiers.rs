//! Account tiers and the feature bundles advertised to the assistant.
//!
//! Tiers are advisory. The resolved bundle only shapes the system directive that is
//! appended to a conversation; no request is refused because a feature is missing.

use crate::llm::models::LlmMessage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account classification selecting a feature bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
    Organization,
}

const FREE_FEATURES: &[&str] = &["Basic analytics", "Engagement charts", "Forecast previews"];

const PREMIUM_FEATURES: &[&str] = &[
    "Predictive ROI analytics",
    "Customer Lifetime Value (CLTV) modeling",
    "Competitor benchmarking",
    "AI marketing recommendations",
];

const ORGANIZATION_FEATURES: &[&str] = &[
    "Multi-team dashboards",
    "API access for integrations",
    "Multi-channel auto-optimization",
    "Ad fraud detection",
    "Compliance & audit logs",
];

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Premium, Tier::Organization];

    /// Resolve a tier label. Matching ignores case and surrounding whitespace;
    /// missing or unrecognised labels resolve to [`Tier::Free`].
    pub fn resolve(label: Option<&str>) -> Tier {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("premium") => Tier::Premium,
            Some("organization") => Tier::Organization,
            _ => Tier::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
            Tier::Organization => "organization",
        }
    }

    /// The feature bundle for this tier, in display order.
    pub fn features(&self) -> &'static [&'static str] {
        match self {
            Tier::Free => FREE_FEATURES,
            Tier::Premium => PREMIUM_FEATURES,
            Tier::Organization => ORGANIZATION_FEATURES,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the system directive describing the assistant persona and the tier's features.
pub fn build_directive(tier: Tier) -> LlmMessage {
    LlmMessage::system(format!(
        "You are SmartGrowth AI, a marketing SaaS assistant.\n\
         The active tier is: {}.\n\
         Available features: {}.\n\
         Always give insights relevant to business growth, marketing ROI, customer engagement, and campaign optimization.",
        tier,
        tier.features().join(", ")
    ))
}

/// Copy the conversation and append the tier directive as its final message.
///
/// The caller's slice is left untouched and existing system messages are kept as they
/// are, so the result is always exactly one message longer than the input.
pub fn with_directive(messages: &[LlmMessage], tier: Tier) -> Vec<LlmMessage> {
    let mut augmented = Vec::with_capacity(messages.len() + 1);
    augmented.extend_from_slice(messages);
    augmented.push(build_directive(tier));
    augmented
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::MessageRole;

    #[test]
    fn test_every_tier_has_features() {
        for tier in Tier::ALL {
            assert!(!tier.features().is_empty(), "{} has no features", tier);
        }
    }

    #[test]
    fn test_resolve_known_tiers() {
        assert_eq!(Tier::resolve(Some("free")), Tier::Free);
        assert_eq!(Tier::resolve(Some("premium")), Tier::Premium);
        assert_eq!(Tier::resolve(Some("organization")), Tier::Organization);
    }

    #[test]
    fn test_resolve_ignores_case_and_whitespace() {
        assert_eq!(Tier::resolve(Some("PREMIUM")), Tier::Premium);
        assert_eq!(Tier::resolve(Some("  Organization ")), Tier::Organization);
    }

    #[test]
    fn test_resolve_defaults_to_free() {
        assert_eq!(Tier::resolve(None), Tier::Free);
        assert_eq!(Tier::resolve(Some("")), Tier::Free);
        assert_eq!(Tier::resolve(Some("enterprise")), Tier::Free);
        assert_eq!(Tier::resolve(Some("gold")).features(), Tier::default().features());
    }

    #[test]
    fn test_directive_mentions_tier_and_features() {
        let directive = build_directive(Tier::Premium);

        assert_eq!(directive.role, MessageRole::System);
        assert!(directive.content.contains("The active tier is: premium."));
        assert!(directive.content.contains(
            "Predictive ROI analytics, Customer Lifetime Value (CLTV) modeling, \
             Competitor benchmarking, AI marketing recommendations"
        ));
        assert!(directive.content.contains("SmartGrowth AI"));
    }

    #[test]
    fn test_with_directive_appends_exactly_one() {
        let original = vec![
            LlmMessage::system("Existing instructions"),
            LlmMessage::user("How are my campaigns doing?"),
            LlmMessage::assistant("Facebook outperforms Google Ads."),
        ];

        let augmented = with_directive(&original, Tier::Free);

        assert_eq!(augmented.len(), original.len() + 1);
        assert_eq!(&augmented[..original.len()], original.as_slice());
        assert_eq!(augmented.last().unwrap(), &build_directive(Tier::Free));
        assert_eq!(original.len(), 3);
    }

    #[test]
    fn test_with_directive_on_empty_conversation() {
        let augmented = with_directive(&[], Tier::Organization);

        assert_eq!(augmented.len(), 1);
        assert_eq!(augmented[0].role, MessageRole::System);
    }

    #[test]
    fn test_with_directive_preserves_existing_system_messages() {
        let original = vec![LlmMessage::system("a"), LlmMessage::system("b")];
        let augmented = with_directive(&original, Tier::Free);

        let system_count = augmented.iter().filter(|m| m.role == MessageRole::System).count();
        assert_eq!(system_count, 3);
        assert_eq!(augmented[0].content, "a");
        assert_eq!(augmented[1].content, "b");
    }
}
