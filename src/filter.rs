//! Modification filters.
//!
//! Filters post-process the merged modification list. Both built-in
//! filters fail closed: an action filter with an empty whitelist rejects
//! everything, and a comment filter never matches a missing comment.

use regex::Regex;

use crate::modification::Modification;

/// Accept/reject predicate over a single modification.
pub trait ModificationFilter: Send + Sync {
    fn accept(&self, modification: &Modification) -> bool;
}

/// Whitelist on the normalized action keyword.
pub struct ActionFilter {
    actions: Vec<String>,
}

impl ActionFilter {
    pub fn new(actions: Vec<String>) -> Self {
        Self { actions }
    }
}

impl ModificationFilter for ActionFilter {
    fn accept(&self, modification: &Modification) -> bool {
        self.actions.iter().any(|a| a == &modification.action)
    }
}

/// Regex match on the comment.
pub struct CommentFilter {
    pattern: Regex,
}

impl CommentFilter {
    pub fn new(pattern: Regex) -> Self {
        Self { pattern }
    }
}

impl ModificationFilter for CommentFilter {
    fn accept(&self, modification: &Modification) -> bool {
        match &modification.comment {
            Some(comment) => self.pattern.is_match(comment),
            None => false,
        }
    }
}

/// Keep only the modifications every filter accepts.
pub fn apply(
    filters: &[Box<dyn ModificationFilter>],
    modifications: Vec<Modification>,
) -> Vec<Modification> {
    if filters.is_empty() {
        return modifications;
    }
    modifications
        .into_iter()
        .filter(|m| filters.iter().all(|f| f.accept(m)))
        .collect()
}
