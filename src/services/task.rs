//! Task service
//!
//! Tasks are private: every operation checks that the caller owns the task
//! or is an admin. Listing is scoped to the caller's own tasks unless the
//! caller is an admin.

use crate::db::repositories::{TaskRepository, TASK_SORT_FIELDS};
use crate::models::{
    ChecklistItem, CreateChecklistItemInput, CreateTaskInput, ListParams, PagedResult, Task, TaskFilter,
    UpdateChecklistItemInput, UpdateTaskInput, User,
};
use crate::services::content::{optional_text, parse_sort, patch_optional, patch_required, require_text, ContentServiceError};
use chrono::Utc;
use std::sync::Arc;

const ITEM_TEXT_REQUIRED: &str = "Please add checklist item text";

pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        mut filter: TaskFilter,
        sort: Option<&str>,
        params: &ListParams,
        user: &User,
    ) -> Result<PagedResult<Task>, ContentServiceError> {
        let sort = parse_sort(sort, TASK_SORT_FIELDS)?;
        filter.user_id = if user.is_admin() { None } else { Some(user.id) };
        Ok(self.repo.list(&filter, &sort, params).await?)
    }

    /// Load a task the caller may touch
    pub async fn get(&self, id: i64, user: &User) -> Result<Task, ContentServiceError> {
        let task = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ContentServiceError::not_found("Task", id))?;

        if !user.can_manage(task.user_id) {
            return Err(ContentServiceError::Forbidden(format!(
                "User {} is not authorized to access this task",
                user.id
            )));
        }
        Ok(task)
    }

    pub async fn create(&self, input: CreateTaskInput, user: &User) -> Result<Task, ContentServiceError> {
        let now = Utc::now();
        let mut checklist = Vec::with_capacity(input.checklist.len());
        for item in input.checklist {
            checklist.push(ChecklistItem {
                id: 0,
                task_id: 0,
                text: require_text(&item.text, ITEM_TEXT_REQUIRED)?,
                done: item.done,
                created_at: now,
            });
        }

        let task = Task {
            id: 0,
            user_id: user.id,
            title: require_text(&input.title, "Please add a title")?,
            description: optional_text(input.description),
            priority: input.priority.unwrap_or_default(),
            status: input.status.unwrap_or_default(),
            due_date: input.due_date,
            checklist,
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&task).await?;
        tracing::info!(task_id = created.id, user_id = user.id, "task created");
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: UpdateTaskInput, user: &User) -> Result<Task, ContentServiceError> {
        let mut task = self.get(id, user).await?;

        patch_required(&mut task.title, input.title, "Please add a title")?;
        patch_optional(&mut task.description, input.description);
        if let Some(priority) = input.priority {
            task.priority = priority;
        }
        if let Some(status) = input.status {
            task.status = status;
        }
        if let Some(due_date) = input.due_date {
            task.due_date = due_date;
        }

        Ok(self.repo.update(&task).await?)
    }

    pub async fn delete(&self, id: i64, user: &User) -> Result<(), ContentServiceError> {
        let task = self.get(id, user).await?;
        self.repo.delete(task.id).await?;
        tracing::info!(task_id = id, user_id = user.id, "task deleted");
        Ok(())
    }

    pub async fn add_item(&self, id: i64, input: CreateChecklistItemInput, user: &User) -> Result<Task, ContentServiceError> {
        let task = self.get(id, user).await?;
        self.repo
            .add_item(&ChecklistItem {
                id: 0,
                task_id: task.id,
                text: require_text(&input.text, ITEM_TEXT_REQUIRED)?,
                done: input.done,
                created_at: Utc::now(),
            })
            .await?;
        self.get(task.id, user).await
    }

    pub async fn update_item(
        &self,
        id: i64,
        item_id: i64,
        input: UpdateChecklistItemInput,
        user: &User,
    ) -> Result<Task, ContentServiceError> {
        let task = self.get(id, user).await?;
        let mut item = self
            .repo
            .get_item(task.id, item_id)
            .await?
            .ok_or_else(|| ContentServiceError::not_found("Checklist item", item_id))?;

        patch_required(&mut item.text, input.text, ITEM_TEXT_REQUIRED)?;
        if let Some(done) = input.done {
            item.done = done;
        }

        self.repo.update_item(&item).await?;
        self.get(task.id, user).await
    }

    pub async fn delete_item(&self, id: i64, item_id: i64, user: &User) -> Result<Task, ContentServiceError> {
        let task = self.get(id, user).await?;
        if !self.repo.delete_item(task.id, item_id).await? {
            return Err(ContentServiceError::not_found("Checklist item", item_id));
        }
        self.get(task.id, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxTaskRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{TaskPriority, TaskStatus, UserRole};

    struct Fixture {
        service: TaskService,
        owner: User,
        other: User,
        admin: User,
    }

    async fn setup_test_service() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let mut created = Vec::new();
        for (name, role) in [("owner", UserRole::User), ("other", UserRole::User), ("admin", UserRole::Admin)] {
            created.push(
                users
                    .create(&User::new(name.into(), format!("{}@example.com", name), "h".into(), role))
                    .await
                    .unwrap(),
            );
        }
        let admin = created.pop().unwrap();
        let other = created.pop().unwrap();
        let owner = created.pop().unwrap();

        Fixture {
            service: TaskService::new(SqlxTaskRepository::boxed(pool)),
            owner,
            other,
            admin,
        }
    }

    fn input(title: &str) -> CreateTaskInput {
        CreateTaskInput {
            title: title.into(),
            priority: Some(TaskPriority::High),
            checklist: vec![CreateChecklistItemInput { text: "first".into(), done: false }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_with_checklist() {
        let Fixture { service, owner, .. } = setup_test_service().await;
        let task = service.create(input("Write docs"), &owner).await.unwrap();

        assert_eq!(task.user_id, owner.id);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.checklist.len(), 1);

        let mut bad = input("x");
        bad.checklist.push(CreateChecklistItemInput { text: " ".into(), done: false });
        assert!(matches!(service.create(bad, &owner).await, Err(ContentServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_owner_scoping() {
        let Fixture { service, owner, other, admin } = setup_test_service().await;
        let task = service.create(input("Mine"), &owner).await.unwrap();
        service.create(input("Theirs"), &other).await.unwrap();

        let mine = service.list(TaskFilter::default(), None, &ListParams::default(), &owner).await.unwrap();
        assert_eq!(mine.total, 1);
        assert_eq!(mine.items[0].title, "Mine");

        let all = service.list(TaskFilter::default(), None, &ListParams::default(), &admin).await.unwrap();
        assert_eq!(all.total, 2);

        assert!(matches!(service.get(task.id, &other).await, Err(ContentServiceError::Forbidden(_))));
        assert!(matches!(
            service.delete(task.id, &other).await,
            Err(ContentServiceError::Forbidden(_))
        ));
        assert!(service.get(task.id, &admin).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_task() {
        let Fixture { service, owner, .. } = setup_test_service().await;
        let task = service.create(input("Draft"), &owner).await.unwrap();

        let updated = service
            .update(
                task.id,
                UpdateTaskInput { status: Some(TaskStatus::Done), ..Default::default() },
                &owner,
            )
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.priority, TaskPriority::High);
        assert_eq!(updated.checklist.len(), 1);
    }

    #[tokio::test]
    async fn test_due_date_can_be_cleared() {
        use chrono::TimeZone;

        let Fixture { service, owner, .. } = setup_test_service().await;
        let task = service.create(input("Dated"), &owner).await.unwrap();
        let due = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let task = service
            .update(task.id, UpdateTaskInput { due_date: Some(Some(due)), ..Default::default() }, &owner)
            .await
            .unwrap();
        assert_eq!(task.due_date, Some(due));

        // untouched when the field is absent
        let task = service
            .update(task.id, UpdateTaskInput { title: Some("Renamed".into()), ..Default::default() }, &owner)
            .await
            .unwrap();
        assert_eq!(task.due_date, Some(due));

        let task = service
            .update(task.id, UpdateTaskInput { due_date: Some(None), ..Default::default() }, &owner)
            .await
            .unwrap();
        assert_eq!(task.due_date, None);
        assert_eq!(service.get(task.id, &owner).await.unwrap().due_date, None);
    }

    #[tokio::test]
    async fn test_checklist_items() {
        let Fixture { service, owner, other, .. } = setup_test_service().await;
        let task = service.create(input("List"), &owner).await.unwrap();

        let task = service
            .add_item(task.id, CreateChecklistItemInput { text: "second".into(), done: false }, &owner)
            .await
            .unwrap();
        assert_eq!(task.checklist.len(), 2);
        let second = task.checklist[1].id;

        let task = service
            .update_item(task.id, second, UpdateChecklistItemInput { text: None, done: Some(true) }, &owner)
            .await
            .unwrap();
        assert!(task.checklist[1].done);
        assert_eq!(task.checklist[1].text, "second");

        assert!(matches!(
            service.delete_item(task.id, second, &other).await,
            Err(ContentServiceError::Forbidden(_))
        ));

        let task = service.delete_item(task.id, second, &owner).await.unwrap();
        assert_eq!(task.checklist.len(), 1);
        assert!(matches!(
            service.delete_item(task.id, second, &owner).await,
            Err(ContentServiceError::NotFound(_))
        ));
    }
}
