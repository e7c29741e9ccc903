//! Version-checked edits of relationship arrays (likes, followers).
//!
//! Each attempt reads the document, applies one set operation to the array
//! and writes it back conditioned on the revision it read. A concurrent
//! writer makes the write fail with a precondition error and the edit is
//! retried on a fresh read, so no member is ever lost.

use serde_json::json;
use tracing::{debug, warn};

use snapgram_shared::constants::RELATIONSHIP_RETRY_LIMIT;
use snapgram_shared::Document;

use super::{fields, Api};
use crate::error::{ApiError, ApiResult, RemoteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetEdit {
    Add,
    Remove,
}

impl SetEdit {
    /// Apply to `members`. Returns `false` when the set is already in the
    /// requested state.
    fn apply(self, members: &mut Vec<String>, member: &str) -> bool {
        let present = members.iter().any(|m| m == member);
        match (self, present) {
            (SetEdit::Add, false) => {
                members.push(member.to_string());
                true
            }
            (SetEdit::Remove, true) => {
                members.retain(|m| m != member);
                true
            }
            _ => false,
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            SetEdit::Add => SetEdit::Remove,
            SetEdit::Remove => SetEdit::Add,
        }
    }
}

/// Outcome of [`Api::edit_relation`].
#[derive(Debug)]
pub(crate) struct RelationEdit {
    pub doc: Document,
    /// `false` when the set was already in the requested state and nothing
    /// was written.
    pub changed: bool,
}

impl Api {
    pub(crate) async fn edit_relation(
        &self,
        collection: &str,
        id: &str,
        attribute: &str,
        member: &str,
        edit: SetEdit,
    ) -> ApiResult<RelationEdit> {
        for attempt in 1..=RELATIONSHIP_RETRY_LIMIT {
            let doc = self.remote.get_document(collection, id).await?;
            let mut members: Vec<String> = doc.ref_list(attribute)?;

            if !edit.apply(&mut members, member) {
                return Ok(RelationEdit { doc, changed: false });
            }

            let revision = doc.revision();
            match self
                .remote
                .update_document(
                    collection,
                    id,
                    fields([(attribute, json!(members))]),
                    Some(&revision),
                )
                .await
            {
                Ok(updated) => {
                    return Ok(RelationEdit {
                        doc: updated,
                        changed: true,
                    })
                }
                Err(RemoteError::PreconditionFailed) => {
                    debug!(collection, id, attribute, attempt, "Concurrent write, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(collection, id, attribute, "Relationship edit kept conflicting");
        Err(ApiError::Contended {
            collection: collection.to_string(),
            id: id.to_string(),
            attempts: RELATIONSHIP_RETRY_LIMIT,
        })
    }
}
