//! Fixed U.S. state name to postal abbreviation lookup used by the
//! choropleth view.

const STATE_ABBREVIATIONS: [(&str, &str); 50] = [
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
];

/// Two-letter abbreviation for a full state name. Exact, case-sensitive
/// match; anything else (including "Not Entered") has no abbreviation.
pub fn abbreviation(state_name: &str) -> Option<&'static str> {
    STATE_ABBREVIATIONS
        .iter()
        .find(|(name, _)| *name == state_name)
        .map(|(_, abbr)| *abbr)
}

pub fn all() -> impl Iterator<Item = (&'static str, &'static str)> {
    STATE_ABBREVIATIONS.iter().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_known_states() {
        assert_eq!(abbreviation("Wyoming"), Some("WY"));
        assert_eq!(abbreviation("New Hampshire"), Some("NH"));
        assert_eq!(abbreviation("California"), Some("CA"));
    }

    #[test]
    fn test_unknown_states() {
        assert_eq!(abbreviation("Atlantis"), None);
        assert_eq!(abbreviation("wyoming"), None);
        assert_eq!(abbreviation(crate::types::NOT_ENTERED), None);
    }

    #[test]
    fn test_table_has_fifty_unique_entries() {
        let names: HashSet<_> = all().map(|(n, _)| n).collect();
        let abbrs: HashSet<_> = all().map(|(_, a)| a).collect();
        assert_eq!(names.len(), 50);
        assert_eq!(abbrs.len(), 50);
    }
}
