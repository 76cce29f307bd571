//! Local task list. Nothing here talks to a provider.

use qifa_shared::error::require_text;
use qifa_shared::schedule::infer_due_date_iso;
use qifa_shared::seed::{available_templates, find_template, TaskTemplate};
use qifa_shared::{
    advice, new_id, Priority, SmartAdvice, Task, TaskCategory, TaskPatch, TaskStatus, ValidationError,
};

use crate::error::{AppError, Result};
use crate::store::AppStore;

impl AppStore {
    /// Add a TODO task with MEDIUM priority at the top of the list. An empty
    /// `due_date` means no deadline.
    pub fn add_task(&mut self, title: &str, category: TaskCategory, due_date: &str) -> Result<Task> {
        let title = require_text(title, ValidationError::EmptyTitle)?;
        let due_date = Some(due_date.trim()).filter(|d| !d.is_empty()).map(str::to_string);

        let task = Task {
            id: new_id(),
            title: title.to_string(),
            category,
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_date,
        };
        self.state.tasks.insert(0, task.clone());
        self.persist();
        Ok(task)
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<&Task> {
        if let Some(title) = &patch.title {
            require_text(title, ValidationError::EmptyTitle)?;
        }
        let pos = self.task_position(id)?;
        self.state.tasks[pos].apply(patch);
        self.persist();
        Ok(&self.state.tasks[pos])
    }

    /// Flip between TODO and DONE; returns the new status.
    pub fn toggle_task(&mut self, id: &str) -> Result<TaskStatus> {
        let pos = self.task_position(id)?;
        let task = &mut self.state.tasks[pos];
        task.status = if task.is_done() {
            TaskStatus::Todo
        } else {
            TaskStatus::Done
        };
        let status = task.status;
        self.persist();
        Ok(status)
    }

    pub fn delete_task(&mut self, id: &str) -> Result<()> {
        let pos = self.task_position(id)?;
        self.state.tasks.remove(pos);
        self.persist();
        Ok(())
    }

    /// Percentage of DONE tasks, rounded, overall or for one category.
    pub fn progress(&self, category: Option<TaskCategory>) -> u8 {
        let (total, done) = self
            .state
            .tasks
            .iter()
            .filter(|t| category.map_or(true, |c| t.category == c))
            .fold((0usize, 0usize), |(total, done), t| (total + 1, done + usize::from(t.is_done())));
        if total == 0 {
            return 0;
        }
        ((done as f64 / total as f64) * 100.0).round() as u8
    }

    /// Catalog tasks for `category` not yet on the list.
    pub fn available_recommendations(&self, category: TaskCategory) -> Vec<&'static TaskTemplate> {
        available_templates(category, &self.state.tasks)
    }

    /// Copy a catalog task onto the list with an inferred deadline.
    pub fn accept_recommendation(&mut self, template_id: &str) -> Result<Task> {
        let template =
            find_template(template_id).ok_or_else(|| AppError::NotFound(format!("recommendation {template_id}")))?;
        let due = infer_due_date_iso(
            template.title,
            template.category,
            &self.state.user.start_date,
            self.today(),
        );
        tracing::debug!(template = template.id, due = %due, "accepting recommendation");

        let task = template.to_task(new_id(), Some(due));
        self.state.tasks.insert(0, task.clone());
        self.persist();
        Ok(task)
    }

    /// Profile-tailored advice for the current user.
    pub fn smart_advice(&self, scope: advice::AdviceScope) -> Option<SmartAdvice> {
        advice::recommend(&self.state.user, scope)
    }

    fn task_position(&self, id: &str) -> Result<usize> {
        self.state
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| AppError::NotFound(format!("task {id}")))
    }
}
