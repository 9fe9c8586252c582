use crate::bitbucket::{PullRequestRef, Task};
use crate::review::JoinedComments;

/// Outcome of one task resolution, at the same index as the task it came from.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// The task as fetched, before resolution
    pub task: Task,
    /// Updated task on success, error text on failure
    pub result: Result<Task, String>,
}

/// Everything fetch-and-resolve gathered for one pull request.
#[derive(Debug, Clone)]
pub struct ReviewReport {
    pub pr: PullRequestRef,
    /// Number of tasks fetched, across all comments
    pub task_count: usize,
    pub joined: JoinedComments,
    /// One entry per task that was UNRESOLVED when fetched
    pub resolutions: Vec<TaskOutcome>,
}

impl ReviewReport {
    pub fn resolved_count(&self) -> usize {
        self.resolutions.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.resolutions.iter().filter(|o| o.result.is_err()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::tests::task;
    use crate::bitbucket::types::TaskState;

    #[test]
    fn test_outcome_counts() {
        let report = ReviewReport {
            pr: PullRequestRef::new("acme", "widgets", 1),
            task_count: 2,
            joined: JoinedComments {
                comments: vec![],
                standalone_tasks: vec![],
            },
            resolutions: vec![
                TaskOutcome {
                    task: task(1, 1, TaskState::Unresolved),
                    result: Ok(task(1, 1, TaskState::Resolved)),
                },
                TaskOutcome {
                    task: task(2, 1, TaskState::Unresolved),
                    result: Err("Bitbucket API 500: Internal Server Error".to_string()),
                },
            ],
        };
        assert_eq!(report.resolved_count(), 1);
        assert_eq!(report.failed_count(), 1);
    }
}
