use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Priority, Task, TaskStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub todo: i64,
    #[serde(rename = "in-progress")]
    pub in_progress: i64,
    pub review: i64,
    pub done: i64,
}

impl StatusCounts {
    fn bump(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Todo => self.todo += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Review => self.review += 1,
            TaskStatus::Done => self.done += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
    pub urgent: i64,
}

impl PriorityCounts {
    fn bump(&mut self, priority: Priority) {
        match priority {
            Priority::Low => self.low += 1,
            Priority::Medium => self.medium += 1,
            Priority::High => self.high += 1,
            Priority::Urgent => self.urgent += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_tasks: i64,
    pub by_status: StatusCounts,
    pub by_priority: PriorityCounts,
    pub overdue: i64,
    pub completed_last_7_days: i64,
    pub assigned_to_me: i64,
    /// Share of tasks that are done, 0.0 when there are none.
    pub completion_rate: f64,
    pub total_documents: i64,
    pub starred_documents: i64,
}

impl DashboardStats {
    pub fn from_tasks<'a, I>(tasks: I, viewer: Uuid, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let today: NaiveDate = now.date_naive();
        let week_ago = now - Duration::days(7);
        let mut stats = Self::default();

        for task in tasks {
            stats.total_tasks += 1;
            stats.by_status.bump(task.status);
            stats.by_priority.bump(task.priority);

            if !task.status.is_done() && task.due_date.is_some_and(|due| due < today) {
                stats.overdue += 1;
            }
            if task.completed_at.is_some_and(|at| at >= week_ago) {
                stats.completed_last_7_days += 1;
            }
            if task.assignee_id == Some(viewer) {
                stats.assigned_to_me += 1;
            }
        }

        if stats.total_tasks > 0 {
            stats.completion_rate = stats.by_status.done as f64 / stats.total_tasks as f64;
        }
        stats
    }

    pub fn with_documents(mut self, total: i64, starred: i64) -> Self {
        self.total_documents = total;
        self.starred_documents = starred;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus, priority: Priority) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            workspace_id: Uuid::nil(),
            project_id: None,
            title: "t".into(),
            description: None,
            status,
            priority,
            assignee_id: None,
            created_by: Uuid::nil(),
            due_date: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    #[test]
    fn empty_dashboard_is_zeroed() {
        let stats = DashboardStats::from_tasks(Vec::<Task>::new().iter(), Uuid::new_v4(), Utc::now());
        assert_eq!(stats, DashboardStats::default());
        assert_eq!(stats.completion_rate, 0.0);
    }

    #[test]
    fn counts_status_priority_and_ownership() {
        let me = Uuid::new_v4();
        let now = Utc::now();
        let yesterday = now.date_naive() - Duration::days(1);

        let mut overdue = task(TaskStatus::InProgress, Priority::Urgent);
        overdue.due_date = Some(yesterday);
        overdue.assignee_id = Some(me);

        let mut late_but_done = task(TaskStatus::Done, Priority::Low);
        late_but_done.due_date = Some(yesterday);
        late_but_done.completed_at = Some(now - Duration::days(1));

        let mut old_done = task(TaskStatus::Done, Priority::Low);
        old_done.completed_at = Some(now - Duration::days(30));

        let fresh = task(TaskStatus::Todo, Priority::Medium);

        let tasks = vec![overdue, late_but_done, old_done, fresh];
        let stats = DashboardStats::from_tasks(&tasks, me, now).with_documents(5, 2);

        assert_eq!(stats.total_tasks, 4);
        assert_eq!(
            stats.by_status,
            StatusCounts { todo: 1, in_progress: 1, review: 0, done: 2 }
        );
        assert_eq!(
            stats.by_priority,
            PriorityCounts { low: 2, medium: 1, high: 0, urgent: 1 }
        );
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.completed_last_7_days, 1);
        assert_eq!(stats.assigned_to_me, 1);
        assert_eq!(stats.completion_rate, 0.5);
        assert_eq!(stats.total_documents, 5);
        assert_eq!(stats.starred_documents, 2);
    }
}
