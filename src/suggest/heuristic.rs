use crate::core::model::Paragraph;

const SENTENCE_END: [char; 3] = ['.', '?', '!'];
const BULLETS: [char; 7] = ['-', '\u{2022}', '\u{2023}', '\u{25E6}', '\u{2043}', '\u{2219}', '*'];
const SHORT_ITEM_CHARS: usize = 100;

/// Whether `second` reads as a continuation of `first`.
///
/// Either `first` stops without terminal punctuation and `second` opens with
/// a lowercase letter, or both are short bulleted items.
pub fn looks_fragmented(first: &str, second: &str) -> bool {
    let (a, b) = (first.trim(), second.trim());

    let unterminated = !a.ends_with(&SENTENCE_END[..]);
    let continues_lowercase = b.chars().next().is_some_and(char::is_lowercase);
    if unterminated && continues_lowercase {
        return true;
    }

    first.chars().count() < SHORT_ITEM_CHARS
        && second.chars().count() < SHORT_ITEM_CHARS
        && a.starts_with(&BULLETS[..])
        && b.starts_with(&BULLETS[..])
}

/// Groups of adjacent sibling paragraphs that look like one split block.
///
/// Only neighbours in display order sharing parent and level are compared;
/// overlapping pairs chain into a single group.
pub fn suggest_merges(paragraphs: &[Paragraph]) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = Vec::new();
    for pair in paragraphs.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        if current.parent() != next.parent() || current.level != next.level {
            continue;
        }
        if !looks_fragmented(&current.content, &next.content) {
            continue;
        }
        match groups.last_mut() {
            Some(group) if group.last() == Some(&current.id) => group.push(next.id.clone()),
            _ => groups.push(vec![current.id.clone(), next.id.clone()]),
        }
    }
    groups
}
