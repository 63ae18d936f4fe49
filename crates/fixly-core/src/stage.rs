//! Stage names for the repair journey.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, IntoStaticStr};

/// A named phase of a session's data.
///
/// Stages may arrive in any order and each may be supplied multiple
/// times; merging is last-write-wins per stage. The set is closed: the
/// remote store is a flat keyspace and stage names never become storage
/// hierarchy.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StageName {
    /// The user's initial description of the broken item.
    Submission,
    /// Generated diagnostic candidates.
    Diagnostics,
    /// The issue the user confirmed out of the diagnostics.
    IssueConfirmation,
    /// The generated repair guide.
    RepairGuide,
    /// User interactions recorded during the journey.
    Interactions,
    /// Derived analytics for the session.
    Analytics,
}

impl StageName {
    /// Returns the stage name as a static string.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn snake_case_forms() {
        assert_eq!(StageName::IssueConfirmation.as_str(), "issue_confirmation");
        assert_eq!(StageName::RepairGuide.as_str(), "repair_guide");
    }

    #[test]
    fn serde_matches_strum() {
        for stage in StageName::iter() {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
    }
}
