//! Search results advertised by backends.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::SessionHandle;

/// Attribute key under which the match tag is advertised.
pub const ATTR_MATCH_TAG: &str = "match_tag";

/// One advertised session as returned from a search.
///
/// Produced by the backend, read-only to the orchestrator and forwarded to
/// consumers as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSearchResult {
    pub handle: SessionHandle,
    pub owner: String,
    pub player_count: u16,
    pub max_public_slots: u16,
    pub attributes: BTreeMap<String, String>,
}

impl SessionSearchResult {
    pub fn new(handle: SessionHandle, owner: impl Into<String>, max_public_slots: u16) -> Self {
        Self {
            handle,
            owner: owner.into(),
            player_count: 0,
            max_public_slots,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Advertised match tag, if the host published one.
    pub fn match_tag(&self) -> Option<&str> {
        self.attributes.get(ATTR_MATCH_TAG).map(String::as_str)
    }

    pub fn open_slots(&self) -> u16 {
        self.max_public_slots.saturating_sub(self.player_count)
    }
}

/// Picks the first result advertising the given match tag.
pub fn select_by_tag<'a>(
    results: &'a [SessionSearchResult],
    tag: &str,
) -> Option<&'a SessionSearchResult> {
    results.iter().find(|result| result.match_tag() == Some(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_tag(id: u64, tag: &str) -> SessionSearchResult {
        SessionSearchResult::new(SessionHandle::new(id), "host", 4)
            .with_attribute(ATTR_MATCH_TAG, tag)
    }

    #[test]
    fn selects_first_matching_tag() {
        let results = vec![
            result_with_tag(1, "Coop"),
            result_with_tag(2, "Deathmatch"),
            result_with_tag(3, "Race"),
        ];
        let selected = select_by_tag(&results, "Deathmatch").unwrap();
        assert_eq!(selected.handle, SessionHandle::new(2));
        assert!(select_by_tag(&results, "CaptureTheFlag").is_none());
    }

    #[test]
    fn match_tag_absent_when_not_advertised() {
        let result = SessionSearchResult::new(SessionHandle::new(7), "host", 2);
        assert_eq!(result.match_tag(), None);
        assert_eq!(result.open_slots(), 2);
    }
}
