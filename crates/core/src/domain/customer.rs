use serde::{Deserialize, Serialize};

use crate::coaching::CoachingAsset;
use crate::domain::task::Task;

/// Structured data captured from the conversation, one group of fields per task.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerRecord {
    // B1
    pub photos: Vec<String>,
    pub location: String,

    // E4a / E4b
    pub business_type: String,
    pub what_they_love: String,
    pub vision: String,
    pub goal: String,

    // B4
    pub daily_customers: u64,
    pub daily_sales: u64,
    pub weekly_sales: Option<u64>,
    pub expenses: String,

    // E6
    pub challenge: String,
    pub created_asset: Option<CoachingAsset>,

    // Produced by the photo collaborator, carried as-is.
    pub photo_income_note: Option<String>,

    // L3
    pub loan_uses: Vec<String>,

    pub completed_tasks: CompletedTasks,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
}

impl CustomerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_photos(&self) -> bool {
        !self.photos.is_empty()
    }

    pub fn has_location(&self) -> bool {
        !self.location.trim().is_empty()
    }

    /// Appends photo references, skipping ones already held. Returns how many were added.
    pub fn add_photos<I>(&mut self, photos: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.photos.len();
        for photo in photos {
            if !self.photos.contains(&photo) {
                self.photos.push(photo);
            }
        }
        self.photos.len() - before
    }

    pub fn progress(&self) -> TaskProgress {
        let total = Task::ALL.len();
        let completed = self.completed_tasks.len().min(total);
        let percentage = u8::try_from(completed * 100 / total).unwrap_or(100).min(100);
        TaskProgress { completed, total, percentage }
    }
}

/// Set of completed tasks. Insertion order is kept for display; logic only checks membership.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletedTasks(Vec<Task>);

impl CompletedTasks {
    pub fn contains(&self, task: Task) -> bool {
        self.0.contains(&task)
    }

    /// Returns `false` when the task was already present.
    pub fn insert(&mut self, task: Task) -> bool {
        if self.contains(task) {
            return false;
        }
        self.0.push(task);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.0.iter()
    }

    pub fn tags(&self) -> Vec<&'static str> {
        self.0.iter().map(Task::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{CompletedTasks, CustomerRecord};
    use crate::domain::task::Task;

    #[test]
    fn completed_tasks_behave_as_an_ordered_set() {
        let mut completed = CompletedTasks::default();
        assert!(completed.insert(Task::E4a));
        assert!(completed.insert(Task::B1));
        assert!(!completed.insert(Task::E4a));

        assert_eq!(completed.len(), 2);
        assert_eq!(completed.tags(), vec!["E4a", "B1"]);
        assert!(completed.contains(Task::B1));
        assert!(!completed.contains(Task::Offer));
    }

    #[test]
    fn add_photos_skips_duplicates() {
        let mut record = CustomerRecord::new();
        let added = record.add_photos(vec!["inside.jpg".to_string(), "outside.jpg".to_string()]);
        let again = record.add_photos(vec!["inside.jpg".to_string()]);

        assert_eq!(added, 2);
        assert_eq!(again, 0);
        assert_eq!(record.photos, vec!["inside.jpg", "outside.jpg"]);
    }

    #[test]
    fn progress_is_relative_to_the_full_path() {
        let mut record = CustomerRecord::new();
        assert_eq!(record.progress().percentage, 0);

        for task in [Task::B1, Task::E4a] {
            record.completed_tasks.insert(task);
        }
        let progress = record.progress();
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.total, 8);
        assert_eq!(progress.percentage, 25);

        for task in Task::ALL {
            record.completed_tasks.insert(task);
        }
        assert_eq!(record.progress().percentage, 100);
    }

    #[test]
    fn record_restores_from_sparse_json() {
        let record: CustomerRecord =
            serde_json::from_str(r#"{"location":"Gikomba","completed_tasks":["B1"]}"#)
                .expect("sparse record");

        assert_eq!(record.location, "Gikomba");
        assert!(record.completed_tasks.contains(Task::B1));
        assert!(record.loan_uses.is_empty());
        assert_eq!(record.weekly_sales, None);
    }
}
