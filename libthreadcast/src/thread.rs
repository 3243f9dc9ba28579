//! Publish plans for multi-part bundles
//!
//! A plan is an ordered list of steps. Each step after the first replies to
//! whatever id the previous step receives at publish time, so the plan
//! stores a positional reference rather than a concrete id.

use crate::content::ContentBundle;
use crate::error::{ContentError, Result};
use crate::types::{MediaFile, PostId};

/// Reply linkage of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyTarget {
    /// Start of a new thread
    Root,
    /// Reply to an item published by an earlier run
    Existing(PostId),
    /// Reply to the id returned for the preceding step
    Previous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPost {
    pub name: String,
    pub text: String,
    pub media: Vec<MediaFile>,
    pub reply_to: ReplyTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPlan {
    pub bundle: String,
    pub steps: Vec<PlannedPost>,
}

impl PublishPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Turn a step's reply target into a concrete id.
    ///
    /// `published` holds the ids returned so far, in plan order.
    pub fn resolve_reply(&self, step: usize, published: &[PostId]) -> Option<PostId> {
        match self.steps.get(step)?.reply_to {
            ReplyTarget::Root => None,
            ReplyTarget::Existing(id) => Some(id),
            ReplyTarget::Previous => step.checked_sub(1).and_then(|prev| published.get(prev).copied()),
        }
    }
}

/// Build the plan for a bundle.
///
/// Parts are ordered by their key; `continue_from` makes the first step a
/// reply to an earlier item instead of a new root.
///
/// # Errors
///
/// Returns `ContentError::MalformedBundle` if the bundle has no parts.
pub fn build(bundle: &ContentBundle, continue_from: Option<PostId>) -> Result<PublishPlan> {
    if bundle.parts.is_empty() {
        return Err(ContentError::MalformedBundle {
            bundle: bundle.name.clone(),
            reason: "bundle has no parts".to_string(),
        }
        .into());
    }

    let mut parts: Vec<_> = bundle.parts.iter().collect();
    parts.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.name.cmp(&b.name)));

    let steps = parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| {
            let mut media = part.media.clone();
            media.sort_by_key(|m| m.file_name());

            let reply_to = match (i, continue_from) {
                (0, Some(id)) => ReplyTarget::Existing(id),
                (0, None) => ReplyTarget::Root,
                _ => ReplyTarget::Previous,
            };

            PlannedPost {
                name: part.name.clone(),
                text: part.text.clone(),
                media,
                reply_to,
            }
        })
        .collect();

    Ok(PublishPlan {
        bundle: bundle.name.clone(),
        steps,
    })
}
