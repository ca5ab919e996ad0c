//! Anchored comments and their replies.
//!
//! Comments live on the Drive API, not in `batchUpdate`, so the
//! reconciler emits a separate script for them. The model here is the
//! small slice the tool can actually manipulate: replying and resolving.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    pub comment_id: String,
    pub author: String,
    pub content: String,
    /// The anchored text at comment-creation time, as Drive reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_text: Option<String>,
    pub resolved: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<CommentReply>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentReply {
    pub reply_id: String,
    pub author: String,
    pub content: String,
}
