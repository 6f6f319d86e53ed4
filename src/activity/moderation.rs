//! Keysmash detection for throwaway submissions.

use super::session::Session;
use super::student::Student;

/// A response is keysmash when it is a single word that is shorter than four
/// characters or has no vowel. Multi-word and empty responses never are.
pub fn is_keysmash(text: Option<&str>) -> bool {
    let Some(text) = text else {
        return false;
    };

    let mut words = text.split_whitespace();
    let (Some(word), None) = (words.next(), words.next()) else {
        return false;
    };

    let word = word.to_lowercase();
    let has_vowel = word.chars().any(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'));
    let very_short = word.chars().count() < 4;

    !has_vowel || very_short
}

/// Drop keysmash students from `session`, returning the removed records.
pub fn remove_keysmash(session: &mut Session) -> Vec<Student> {
    let (removed, kept): (Vec<Student>, Vec<Student>) = std::mem::take(&mut session.students)
        .into_iter()
        .partition(|s| is_keysmash(s.response.as_deref()));
    session.students = kept;
    removed
}
