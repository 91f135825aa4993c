//! Edit drafts
//!
//! A draft is a detached copy of a target's configuration. Nothing reaches
//! the registry until the draft is committed; dropping it cancels the edit.

use crate::target::{TargetConfig, TargetId};

/// Pending edit of an existing target, or a target yet to be added
#[derive(Debug, Clone, PartialEq)]
pub struct EditDraft {
    target: Option<TargetId>,
    pub config: TargetConfig,
}

impl EditDraft {
    pub(crate) fn edit(target: TargetId, config: TargetConfig) -> Self {
        Self {
            target: Some(target),
            config,
        }
    }

    pub(crate) fn create(config: TargetConfig) -> Self {
        Self {
            target: None,
            config,
        }
    }

    /// Target being edited, `None` for a new target
    pub fn target(&self) -> Option<TargetId> {
        self.target
    }

    pub fn is_new(&self) -> bool {
        self.target.is_none()
    }
}
