use crate::core::model::Paragraph;
use crate::edit::EditError;

/// Rewrites one paragraph's content, returning the new list and the previous
/// content for the audit trail.
pub fn edit_content(paragraphs: &[Paragraph], id: &str, content: &str) -> Result<(Vec<Paragraph>, String), EditError> {
    let old = paragraphs
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.content.clone())
        .ok_or_else(|| EditError::UnknownParagraph(id.to_string()))?;

    let next = paragraphs
        .iter()
        .map(|p| {
            if p.id == id {
                Paragraph {
                    content: content.to_string(),
                    ..p.clone()
                }
            } else {
                p.clone()
            }
        })
        .collect();
    Ok((next, old))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_only_the_target_content() {
        let paragraphs = vec![Paragraph::new("a", None, "old"), Paragraph::new("b", Some("a"), "keep")];
        let (next, old) = edit_content(&paragraphs, "a", "new").unwrap();
        assert_eq!(old, "old");
        assert_eq!(next[0].content, "new");
        assert_eq!(next[1], paragraphs[1]);
    }

    #[test]
    fn unknown_paragraph_is_an_error() {
        let err = edit_content(&[], "ghost", "x").unwrap_err();
        assert_eq!(err, EditError::UnknownParagraph("ghost".into()));
    }
}
