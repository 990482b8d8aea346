//! Project service
//!
//! All reads and writes are scoped to the principal's effective team by
//! query filter; the capability gate only answers "may this principal do
//! this kind of thing at all".

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::json;
use taskdeck_db::entities::bot::Capability;
use taskdeck_db::entities::{prelude::*, project};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::principal::Principal;
use crate::{activity, authz, integrity};

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
}

/// Changes applicable to a project
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<project::ProjectStatus>,
}

fn team_scope(principal: &Principal) -> Result<Uuid> {
    principal
        .effective_team_id()
        .ok_or_else(|| Error::validation("principal does not belong to a team"))
}

/// Fetch a project within the principal's team or fail with not-found.
pub async fn get_project(
    db: &DatabaseConnection,
    principal: &Principal,
    project_id: Uuid,
) -> Result<project::Model> {
    authz::require(principal, Capability::Read)?;
    let team_id = team_scope(principal)?;

    Project::find_by_id(project_id)
        .filter(project::Column::TeamId.eq(team_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("project", project_id))
}

/// Projects in the principal's team, newest first.
pub async fn list_projects(
    db: &DatabaseConnection,
    principal: &Principal,
) -> Result<Vec<project::Model>> {
    authz::require(principal, Capability::Read)?;
    let team_id = team_scope(principal)?;

    let projects = Project::find()
        .filter(project::Column::TeamId.eq(team_id))
        .order_by_desc(project::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(projects)
}

/// Create a project owned by the acting principal, scoped to its team.
pub async fn create_project(
    db: &DatabaseConnection,
    principal: &Principal,
    input: NewProject,
) -> Result<project::Model> {
    authz::require(principal, Capability::CreateProjects)?;
    let team_id = team_scope(principal)?;

    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::validation("project name must not be empty"));
    }

    let now = Utc::now();
    let created = project::ActiveModel {
        id: Set(Uuid::new_v4()),
        team_id: Set(team_id),
        name: Set(name.to_string()),
        description: Set(input.description),
        status: Set(project::ProjectStatus::Active),
        owner_id: Set(Some(principal.id())),
        created_by: Set(principal.id()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    activity::record(
        db,
        Some(principal),
        "project_created",
        "project",
        &created.id.to_string(),
        Some(&created.name),
        None,
    )
    .await?;

    Ok(created)
}

/// Update a project's plain fields or archive it. No dedicated project
/// capability exists, so bots need `admin` here.
pub async fn update_project(
    db: &DatabaseConnection,
    principal: &Principal,
    project_id: Uuid,
    changes: ProjectChanges,
) -> Result<project::Model> {
    authz::require(principal, Capability::Admin)?;
    let existing = get_project(db, principal, project_id).await?;

    let old_status = existing.status.clone();
    let mut details = serde_json::Map::new();

    let mut active: project::ActiveModel = existing.into();

    if let Some(name) = changes.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("project name must not be empty"));
        }
        details.insert("name".into(), json!(name));
        active.name = Set(name);
    }
    if let Some(description) = changes.description {
        active.description = Set(description);
    }
    if let Some(status) = changes.status {
        if status != old_status {
            details.insert("oldStatus".into(), json!(old_status));
            details.insert("newStatus".into(), json!(status));
        }
        active.status = Set(status);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await?;

    activity::record(
        db,
        Some(principal),
        "project_updated",
        "project",
        &updated.id.to_string(),
        Some(&updated.name),
        Some(json!({ "changes": details })),
    )
    .await?;

    Ok(updated)
}

/// Cascade-delete a project via the integrity engine.
pub async fn delete_project(
    db: &DatabaseConnection,
    principal: &Principal,
    project_id: Uuid,
) -> Result<integrity::ProjectDeletion> {
    authz::require(principal, Capability::Admin)?;
    let project = get_project(db, principal, project_id).await?;

    integrity::delete_project(db, Some(principal), &project).await
}
