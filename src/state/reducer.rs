use std::sync::Arc;

use tracing::debug;

use crate::edit::merge::gather_in_display_order;
use crate::edit::{edit_content, merge, unmerge, EditError, IdSource, MergeContent, MergeOutcome, SourceIndex};
use crate::suggest::SuggestionGroups;
use crate::tree::normalize;

use super::{Action, DocumentState, HistoryEntry, MergeReview};

const CONCAT_PREFIX: &str = "merged";
const ASSISTED_PREFIX: &str = "ai-merged";
const WAITING_FOR_SERVER: &str = "Waiting for server...";

/// Computes the snapshot that follows `state` under `action`.
///
/// `state` is never modified. Actions that do not apply (a merge naming fewer
/// than two present paragraphs, a reply to a review that was already closed)
/// return an equal snapshot with the same revision. Rejected actions return
/// the error and leave producing a snapshot to the caller.
pub fn reduce(state: &DocumentState, action: Action, ids: &mut dyn IdSource) -> Result<DocumentState, EditError> {
    let kind = action.kind();
    let mut next = state.clone();
    if apply(&mut next, action, ids)? {
        next.revision = state.revision + 1;
        Ok(next)
    } else {
        debug!(action = kind, revision = state.revision, "action had no effect");
        Ok(state.clone())
    }
}

/// Where unmerge finds the records a merged paragraph replaced: the frozen
/// snapshot first, then every paragraph a recorded merge created.
pub fn source_index(state: &DocumentState) -> SourceIndex<'_> {
    SourceIndex::new(&state.initial_paragraphs).with_created(
        state
            .history
            .iter()
            .filter_map(HistoryEntry::created_paragraph),
    )
}

fn apply(state: &mut DocumentState, action: Action, ids: &mut dyn IdSource) -> Result<bool, EditError> {
    match action {
        Action::Load {
            document,
            paragraphs,
            page_dimensions,
            suggestions,
            initial,
            history,
        } => {
            let paragraphs = normalize(&paragraphs);
            let initial = match initial {
                Some(initial) => normalize(&initial),
                None => paragraphs.clone(),
            };
            *state = DocumentState {
                document: Some(document),
                initial_paragraphs: Arc::from(initial),
                suggestions: SuggestionGroups::sanitized(suggestions, &paragraphs),
                paragraphs,
                page_dimensions,
                history,
                ..DocumentState::default()
            };
        }
        Action::StartProcessing(document) => {
            *state = DocumentState {
                document: Some(document),
                loading: true,
                loading_message: WAITING_FOR_SERVER.to_string(),
                ..DocumentState::default()
            };
        }
        Action::SetLoading(message) => {
            state.loading = true;
            state.loading_message = message;
            state.error = None;
        }
        Action::ClearLoading => {
            state.loading = false;
            state.loading_message.clear();
        }
        Action::Fail(message) => {
            state.error = Some(message);
            state.loading = false;
            state.loading_message.clear();
        }
        Action::ClearError => state.error = None,

        Action::Select(mut selection) => {
            selection.retain_present(&state.paragraphs);
            state.selection = selection;
        }
        Action::ToggleSelection(id) => {
            if state.paragraph(&id).is_none() {
                return Err(EditError::UnknownParagraph(id));
            }
            state.selection.toggle(&id);
        }
        Action::ClearSelection => state.selection.clear(),
        Action::SelectSuggestion(index) => {
            let group = state
                .suggestions
                .get(index)
                .ok_or(EditError::UnknownSuggestion(index))?;
            state.selection = group.iter().cloned().collect();
        }
        Action::SetSuggestions(groups) => {
            state.suggestions = SuggestionGroups::sanitized(groups, &state.paragraphs);
        }

        Action::EditContent { id, content } => {
            // Recorded even when the text is unchanged.
            let (paragraphs, old_content) = edit_content(&state.paragraphs, &id, &content)?;
            state.paragraphs = paragraphs;
            state.history.push(HistoryEntry::Edit {
                id,
                old_content,
                new_content: content,
            });
        }
        Action::ConcatMerge(selected) => {
            if gather_in_display_order(&state.paragraphs, &selected).len() < 2 {
                return Ok(false);
            }
            let new_id = ids.next_id(CONCAT_PREFIX);
            let Some(MergeOutcome { paragraphs, merged }) =
                merge(&state.paragraphs, &selected, new_id, MergeContent::Concat)
            else {
                return Ok(false);
            };
            state.paragraphs = paragraphs;
            state.history.push(HistoryEntry::ConcatMerge {
                ids: merged.source_ids.clone(),
                new_paragraph: merged,
            });
            after_structural_change(state);
        }
        Action::Unmerge(id) => {
            let outcome = unmerge(&state.paragraphs, &id, &source_index(state))?;
            state.paragraphs = outcome.paragraphs;
            state.history.push(HistoryEntry::Unmerge {
                id,
                restored_ids: outcome.restored_ids,
            });
            after_structural_change(state);
        }

        Action::OpenMergeReview { mode, instructions } => {
            let candidates: Vec<_> = state
                .selection
                .in_display_order(&state.paragraphs)
                .into_iter()
                .cloned()
                .collect();
            if candidates.len() < 2 {
                return Err(EditError::TooFewParagraphs);
            }
            state.review = Some(MergeReview {
                mode,
                candidates,
                instructions,
                suggestion: None,
                ticket: state.revision + 1,
            });
            state.error = None;
        }
        Action::MergeSuggestionReady { ticket, result } => match state.review.as_mut() {
            Some(review) if review.ticket == ticket => {
                review.suggestion = Some(result);
                state.loading = false;
                state.loading_message.clear();
            }
            _ => {
                debug!(ticket, "stale merge suggestion dropped");
                return Ok(false);
            }
        },
        Action::MergeSuggestionFailed { ticket, message } => {
            if !state.review.as_ref().is_some_and(|review| review.ticket == ticket) {
                debug!(ticket, "stale merge failure dropped");
                return Ok(false);
            }
            state.review = None;
            state.error = Some(message);
            state.loading = false;
            state.loading_message.clear();
        }
        Action::ConfirmMerge {
            result,
            prompt,
            custom_instructions,
        } => {
            let review = state.review.take().ok_or(EditError::NoPendingReview)?;
            state.loading = false;
            state.loading_message.clear();
            let selected = review.candidate_ids();
            if gather_in_display_order(&state.paragraphs, &selected).len() < 2 {
                debug!("reviewed paragraphs no longer present, merge dropped");
                return Ok(true);
            }
            let new_id = ids.next_id(ASSISTED_PREFIX);
            if let Some(MergeOutcome { paragraphs, merged }) =
                merge(&state.paragraphs, &selected, new_id, MergeContent::Assisted(result))
            {
                state.paragraphs = paragraphs;
                state.history.push(HistoryEntry::AiMerge {
                    ids: merged.source_ids.clone(),
                    new_paragraph: merged,
                    prompt,
                    custom_instructions,
                });
                after_structural_change(state);
            }
        }
        Action::CloseMergeReview => {
            state.review = None;
            state.loading = false;
            state.loading_message.clear();
        }

        Action::SaveStarted => {
            state.saving = true;
            state.error = None;
        }
        Action::SaveSucceeded => state.saving = false,
        Action::SaveFailed(message) => {
            state.saving = false;
            state.error = Some(message);
        }

        Action::Reset => *state = DocumentState::default(),
    }
    Ok(true)
}

fn after_structural_change(state: &mut DocumentState) {
    state.selection.clear();
    state.suggestions.retain_present(&state.paragraphs);
}
