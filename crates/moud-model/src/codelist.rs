//! Fixed demographic codelists.
//!
//! The snapshot exports carry demographics as short numeric codes. Each
//! codelist maps codes to canonical labels for one field; the list of
//! stratifiers below is the full set of demographic dimensions used for
//! subgroup breakdowns. Codes outside a list map to an explicit unmapped
//! category, never dropped, so denominators stay honest.

use std::fmt;

/// Code-to-label table for one demographic field.
#[derive(Debug, Clone, Copy)]
pub struct Codelist {
    /// Primary column name in the exports.
    pub field: &'static str,
    /// Alternate column names seen in some snapshots.
    pub aliases: &'static [&'static str],
    entries: &'static [(&'static str, &'static str)],
}

impl Codelist {
    pub fn label_for(&self, code: &str) -> Option<&'static str> {
        let code = code.trim();
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == code)
            .map(|(_, label)| *label)
    }

    /// Labels in canonical order, for stable breakdown output.
    pub fn labels(&self) -> impl Iterator<Item = &'static str> {
        self.entries.iter().map(|(_, label)| *label)
    }

    pub fn matches_column(&self, column: &str) -> bool {
        self.field.eq_ignore_ascii_case(column)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(column))
    }
}

pub const SEX: Codelist = Codelist {
    field: "sex",
    aliases: &[],
    entries: &[("1", "Male"), ("2", "Female")],
};

pub const AGE_BRACKET: Codelist = Codelist {
    field: "agecat",
    aliases: &[],
    entries: &[
        ("1", "18-25"),
        ("2", "26-35"),
        ("3", "36-45"),
        ("4", "46-55"),
        ("5", "56-65"),
        ("6", "65+"),
    ],
};

pub const RACE_ETHNICITY: Codelist = Codelist {
    field: "raceth",
    aliases: &[],
    entries: &[
        ("1", "White"),
        ("2", "Black/African American"),
        ("3", "Hispanic/Latino"),
        ("4", "Asian"),
        ("5", "Native American"),
        ("6", "Mixed Race"),
        ("7", "Other"),
    ],
};

pub const EDUCATION: Codelist = Codelist {
    field: "educat",
    aliases: &["education"],
    entries: &[
        ("1", "Less than High School"),
        ("2", "High School/GED"),
        ("3", "Some College"),
        ("4", "College Graduate"),
        ("5", "Graduate Degree"),
        ("6", "Post-Graduate"),
    ],
};

pub const EMPLOYMENT: Codelist = Codelist {
    field: "employed",
    aliases: &[],
    entries: &[
        ("1", "Full-time"),
        ("2", "Part-time"),
        ("3", "Unemployed"),
        ("4", "Disabled"),
        ("5", "Retired"),
        ("6", "Student"),
    ],
};

/// Demographic stratifiers, in artifact order.
pub const STRATIFIERS: [&Codelist; 5] =
    [&SEX, &AGE_BRACKET, &RACE_ETHNICITY, &EDUCATION, &EMPLOYMENT];

/// Find the codelist responsible for a column, if any.
pub fn codelist_for(column: &str) -> Option<&'static Codelist> {
    STRATIFIERS
        .into_iter()
        .find(|codelist| codelist.matches_column(column))
}

/// Result of encoding one raw demographic code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedCategory {
    Mapped(&'static str),
    Unmapped(String),
}

impl EncodedCategory {
    pub fn label(&self) -> String {
        match self {
            EncodedCategory::Mapped(label) => (*label).to_string(),
            EncodedCategory::Unmapped(code) => format!("Unmapped ({code})"),
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, EncodedCategory::Mapped(_))
    }
}

impl fmt::Display for EncodedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sex_codes() {
        assert_eq!(SEX.label_for("1"), Some("Male"));
        assert_eq!(SEX.label_for("2"), Some("Female"));
        assert_eq!(SEX.label_for("3"), None);
    }

    #[test]
    fn education_alias_matches() {
        assert!(EDUCATION.matches_column("educat"));
        assert!(EDUCATION.matches_column("education"));
        assert!(EDUCATION.matches_column("EDUCATION"));
        assert!(!EDUCATION.matches_column("employed"));
    }

    #[test]
    fn codelist_lookup_by_column() {
        assert_eq!(codelist_for("agecat").map(|c| c.field), Some("agecat"));
        assert_eq!(codelist_for("education").map(|c| c.field), Some("educat"));
        assert!(codelist_for("opuse30").is_none());
    }

    #[test]
    fn unmapped_label_keeps_the_code() {
        let category = EncodedCategory::Unmapped("9".to_string());
        assert_eq!(category.label(), "Unmapped (9)");
        assert!(!category.is_mapped());
    }
}
