//! The sibling Drive-API script for comments.
//!
//! Comments do not travel through `batchUpdate`; the reconciler emits a
//! separate op list for them. The expressible changes are adding a
//! reply and resolving a thread; everything else is refused.

use crate::error::{ReconcileError, Result};
use extrasuite_docs_types::Comment;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CommentOp {
    AddReply { comment_id: String, content: String },
    Resolve { comment_id: String },
}

pub(crate) fn reconcile_comments(base: &[Comment], desired: &[Comment]) -> Result<Vec<CommentOp>> {
    let mut ops = Vec::new();
    for want in desired {
        let Some(have) = base.iter().find(|c| c.comment_id == want.comment_id) else {
            return Err(ReconcileError::unsupported(
                "new anchored comments cannot be created",
            ));
        };
        if want.content != have.content || want.quoted_text != have.quoted_text {
            return Err(ReconcileError::unsupported(format!(
                "comment {} cannot be edited",
                want.comment_id
            )));
        }
        if have.resolved && !want.resolved {
            return Err(ReconcileError::unsupported(format!(
                "comment {} cannot be reopened",
                want.comment_id
            )));
        }
        if want.replies.len() < have.replies.len() {
            return Err(ReconcileError::unsupported(format!(
                "replies on comment {} cannot be removed",
                want.comment_id
            )));
        }
        for (w, h) in want.replies.iter().zip(&have.replies) {
            if w.content != h.content {
                return Err(ReconcileError::unsupported(format!(
                    "reply on comment {} cannot be edited",
                    want.comment_id
                )));
            }
        }
        for new_reply in &want.replies[have.replies.len()..] {
            ops.push(CommentOp::AddReply {
                comment_id: want.comment_id.clone(),
                content: new_reply.content.clone(),
            });
        }
        if want.resolved && !have.resolved {
            ops.push(CommentOp::Resolve {
                comment_id: want.comment_id.clone(),
            });
        }
    }
    for have in base {
        if !desired.iter().any(|c| c.comment_id == have.comment_id) {
            return Err(ReconcileError::unsupported(format!(
                "comment {} cannot be deleted",
                have.comment_id
            )));
        }
    }
    Ok(ops)
}
