//! # Feedback taxonomy
//! Closed set of categories a feedback item can talk about. Each category is
//! bound to a fixed keyword list; matching is done on whole tokens (or short
//! token phrases) after lower-casing, so "hot" never matches "photo".

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Venue,
    Food,
    Program,
    Organization,
    ValueForMoney,
    Community,
    Atmosphere,
}

impl Category {
    /// Fixed order; also the order of category slots in the feature vector.
    pub const ALL: [Category; 7] = [
        Category::Venue,
        Category::Food,
        Category::Program,
        Category::Organization,
        Category::ValueForMoney,
        Category::Community,
        Category::Atmosphere,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Venue => "venue",
            Category::Food => "food",
            Category::Program => "program",
            Category::Organization => "organization",
            Category::ValueForMoney => "value_for_money",
            Category::Community => "community",
            Category::Atmosphere => "atmosphere",
        }
    }

    /// Position in [`Category::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Category::Venue => &[
                "venue", "location", "space", "room", "hall", "seating", "seats",
                "crowded", "parking", "accessible", "spacious", "comfortable",
                "uncomfortable", "cramped",
            ],
            Category::Food => &[
                "food", "snacks", "catering", "meal", "meals", "lunch", "dinner",
                "drinks", "refreshments", "delicious", "tasty", "coffee", "halal",
                "hungry",
            ],
            Category::Program => &[
                "program", "content", "speaker", "speakers", "presentation",
                "presentations", "talks", "workshop", "workshops", "activities",
                "agenda", "session", "sessions", "performances", "informative",
                "engaging", "boring",
            ],
            Category::Organization => &[
                "organized", "organization", "disorganized", "registration",
                "check in", "schedule", "planning", "coordination", "chaotic",
                "confusing", "smooth", "smoothly", "staff", "volunteers",
                "organizers", "queue", "queues", "on time", "punctual", "delayed",
            ],
            Category::ValueForMoney => &[
                "price", "prices", "ticket", "tickets", "cost", "expensive",
                "cheap", "affordable", "worth", "value", "overpriced", "money",
                "refund",
            ],
            Category::Community => &[
                "welcoming", "inclusive", "friendly", "community", "networking",
                "people", "belonging", "social", "friends",
            ],
            Category::Atmosphere => &[
                "atmosphere", "energy", "vibe", "vibes", "music", "decorations",
                "festive", "lively",
            ],
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keywords pre-padded with spaces so a substring test on a padded token
/// string is a whole-token (or whole-phrase) test.
static PADDED_KEYWORDS: Lazy<Vec<Vec<String>>> = Lazy::new(|| {
    Category::ALL
        .iter()
        .map(|c| c.keywords().iter().map(|k| format!(" {k} ")).collect())
        .collect()
});

/// Categories matched by an already tokenized, lower-cased item.
pub fn categories_for_tokens(tokens: &[String]) -> Vec<Category> {
    let padded = format!(" {} ", tokens.join(" "));
    Category::ALL
        .iter()
        .copied()
        .filter(|c| {
            PADDED_KEYWORDS[c.index()]
                .iter()
                .any(|k| padded.contains(k.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(|t| t.to_ascii_lowercase()).collect()
    }

    #[test]
    fn index_matches_all_order() {
        for (i, c) in Category::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn whole_token_matching_only() {
        // "photos" must not match anything via "hot"/"food"-style substrings
        assert!(categories_for_tokens(&toks("lots of photos taken")).is_empty());
        assert_eq!(
            categories_for_tokens(&toks("the food was tasty")),
            vec![Category::Food]
        );
    }

    #[test]
    fn possessive_counts_as_the_keyword() {
        let cats = categories_for_tokens(&crate::sentiment::tokenize("The food's quality was great"));
        assert_eq!(cats, vec![Category::Food]);
    }

    #[test]
    fn phrases_and_multiple_categories() {
        let cats = categories_for_tokens(&toks("started on time and the venue was spacious"));
        assert_eq!(cats, vec![Category::Venue, Category::Organization]);
    }

    #[test]
    fn serializes_snake_case() {
        let s = serde_json::to_string(&Category::ValueForMoney).unwrap();
        assert_eq!(s, "\"value_for_money\"");
    }

    #[test]
    fn keywords_are_unique_across_categories() {
        let mut seen = std::collections::HashSet::new();
        for c in Category::ALL {
            for k in c.keywords() {
                assert!(seen.insert(*k), "keyword '{k}' appears in more than one category");
            }
        }
    }
}
