//! Derivation of the human readable collection identifier.
//!
//! The identifier is `{section}-{courseCode}-{year}-{department code}`. It's
//! deterministic so that submitting the same course section twice in one year
//! is detected as a duplicate.

use regex::Regex;

lazy_static! {
    static ref BRACKETED: Regex = Regex::new(r"[(\[{]\s*([^()\[\]{}]*?)\s*[)\]}]")
        .expect("bracketed department code pattern is valid");
}

/// Short department code: the first non-empty bracketed token, otherwise the first word.
pub fn department_code(department: &str) -> &str {
    let department = department.trim();

    let bracketed = BRACKETED
        .captures_iter(department)
        .filter_map(|it| it.get(1))
        .map(|it| it.as_str())
        .find(|it| !it.is_empty());

    match bracketed {
        Some(code) => code,
        None => department.split_whitespace().next().unwrap_or(department),
    }
}

pub fn clean_section(section: &str) -> String {
    section.chars().filter(char::is_ascii_alphanumeric).collect()
}

pub fn derive_username(section: &str, course_code: &str, department: &str, year: i32) -> String {
    format!(
        "{}-{}-{}-{}",
        clean_section(section),
        course_code.trim(),
        year,
        department_code(department)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracketed_code_is_extracted() {
        assert_eq!(
            derive_username("A1", "CS101", "Computer Science (CSE)", 2024),
            "A1-CS101-2024-CSE"
        );
        assert_eq!(department_code("Electrical [ EEE ] Engineering"), "EEE");
        assert_eq!(department_code("Business {BBA}"), "BBA");
    }

    #[test]
    fn first_word_is_used_without_brackets() {
        assert_eq!(department_code("  Mathematics and Physics "), "Mathematics");
        assert_eq!(department_code("Empty () brackets"), "Empty");
    }

    #[test]
    fn single_word_department_degrades_to_whole_string() {
        assert_eq!(department_code("  Pharmacy\t"), "Pharmacy");
    }

    #[test]
    fn section_loses_punctuation_and_spaces() {
        assert_eq!(clean_section("Sec. A-1 (morning)"), "SecA1morning");
        assert_eq!(
            derive_username("B 2", " MAT201 ", "Mathematics (MAT)", 2025),
            "B2-MAT201-2025-MAT"
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_username("C3", "PHY110", "Physics (PHY)", 2026);
        let b = derive_username("C3", "PHY110", "Physics (PHY)", 2026);
        assert_eq!(a, b);
        assert_ne!(a, derive_username("C3", "PHY110", "Physics (PHY)", 2027));
    }
}
