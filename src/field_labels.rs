//! Literal custom-field labels the shop's order forms have used over time.
//!
//! Every list is ordered: the first label present in a payload wins.

/// Canonical label the description is normalised under.
pub const DESCRIPTION: &str = "Beschrijf";

/// Labels that carry the customer's free-text description.
pub const DESCRIPTION_LABELS: &[&str] = &[
    DESCRIPTION,
    "Persoonlijk verhaal",
    "Toelichting",
    "Vertel ons over de persoon",
    "Vertel ons iets over de ontvanger",
    "Vertel ons jullie verhaal",
    "Vertel ons meer",
    "Vertel iets over de persoon",
    "Vertel over jullie samen",
    "Vertel het verhaal",
    "Wat moet er in het lied?",
    "Wat wil je dat we weten?",
    "Beschrijving",
];

/// Substrings that mark a label as description-like when none of
/// [`DESCRIPTION_LABELS`] is present. Matched case-insensitively.
pub const DESCRIPTION_KEYWORDS: &[&str] = &[
    "opmerking",
    "notitie",
    "wens",
    "idee",
    "verhaal",
    "vertel",
    "beschrijf",
];

/// Labels that carry the name of the song's recipient.
pub const RECIPIENT_NAME_LABELS: &[&str] = &[
    "Voornaam",
    "Voor wie is dit lied?",
    "Voor wie is het lied?",
    "Voor wie is het lied bedoeld?",
    "Naam ontvanger",
    "Naam van de ontvanger",
    "Naam van de persoon",
    "Wie is de ontvanger?",
    "Naam",
];

pub const LAST_NAME_LABELS: &[&str] = &["Achternaam", "Van"];

pub const THEME: &str = "Thema";
pub const OCCASION: &str = "Gelegenheid";
pub const TONE: &str = "Toon";

/// Labels read, in order, for the order's free-text theme.
pub const THEME_LABELS: &[&str] = &[THEME, OCCASION, "Onderwerp"];

pub const TONE_LABELS: &[&str] = &[TONE, "Gewenste toon", "Sfeer"];

pub const STRUCTURE_LABELS: &[&str] = &["Structuur", "Opbouw", "Songstructuur"];

pub const DEADLINE_LABELS: &[&str] = &["Deadline", "Wanneer nodig", "Leverdatum"];

/// Words that look like a name after "voor"/"aan" but never are one.
pub const NAME_STOP_WORDS: &[&str] = &["het", "de", "een", "mijn", "zijn", "haar"];

/// Theme strings that mean "no theme given".
pub const THEME_PLACEHOLDERS: &[&str] = &["", "-", "Onbekend"];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_unique(table: &[&str]) {
        let mut seen = HashSet::new();
        for label in table {
            assert!(seen.insert(*label), "duplicate label: {}", label);
        }
    }

    #[test]
    fn test_tables_have_no_duplicates() {
        assert_unique(DESCRIPTION_LABELS);
        assert_unique(DESCRIPTION_KEYWORDS);
        assert_unique(RECIPIENT_NAME_LABELS);
        assert_unique(LAST_NAME_LABELS);
        assert_unique(THEME_LABELS);
        assert_unique(TONE_LABELS);
        assert_unique(STRUCTURE_LABELS);
        assert_unique(DEADLINE_LABELS);
    }

    #[test]
    fn test_canonical_labels_lead_their_tables() {
        assert_eq!(DESCRIPTION_LABELS[0], DESCRIPTION);
        assert_eq!(RECIPIENT_NAME_LABELS[0], "Voornaam");
        assert_eq!(THEME_LABELS[0], THEME);
        assert_eq!(TONE_LABELS[0], TONE);
    }

    #[test]
    fn test_keywords_are_lowercase() {
        for keyword in DESCRIPTION_KEYWORDS.iter().chain(NAME_STOP_WORDS) {
            assert_eq!(*keyword, keyword.to_lowercase());
        }
    }
}
