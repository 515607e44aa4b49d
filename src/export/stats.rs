use serde::{Deserialize, Serialize};

use crate::models::Backlog;

/// Item counts per entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogStats {
    pub total_epics: usize,
    pub total_features: usize,
    pub total_user_stories: usize,
    pub total_bugs: usize,
    pub total_tasks: usize,
    pub total_sub_bugs: usize,
}

impl BacklogStats {
    pub fn from_backlog(backlog: &Backlog) -> Self {
        let mut stats = Self {
            total_epics: backlog.epics.len(),
            ..Self::default()
        };

        for feature in backlog.epics.iter().flat_map(|e| &e.features) {
            stats.total_features += 1;
            stats.total_user_stories += feature.user_stories.len();
            stats.total_bugs += feature.bugs.len();

            for story in &feature.user_stories {
                stats.total_tasks += story.tasks.len();
                stats.total_sub_bugs += story.sub_bugs.len();
            }
            for bug in &feature.bugs {
                stats.total_tasks += bug.tasks.len();
                stats.total_sub_bugs += bug.sub_bugs.len();
            }
        }

        stats
    }

    pub fn total_items(&self) -> usize {
        self.total_epics
            + self.total_features
            + self.total_user_stories
            + self.total_bugs
            + self.total_tasks
            + self.total_sub_bugs
    }
}
