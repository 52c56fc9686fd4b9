use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::models::{ChatMessage, Company, Membership, Project, ProjectInvite, Task, User};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Users
    create_indexes(
        db,
        User::COLLECTION,
        vec![
            index_unique(bson::doc! { "email": 1 }),
            index_unique(bson::doc! { "username": 1 }),
            index(bson::doc! { "company_id": 1 }),
        ],
    )
    .await?;

    // Companies
    create_indexes(
        db,
        Company::COLLECTION,
        vec![
            index_unique(bson::doc! { "name": 1 }),
            index(bson::doc! { "owner_id": 1 }),
        ],
    )
    .await?;

    // Projects
    create_indexes(
        db,
        Project::COLLECTION,
        vec![
            index_unique(bson::doc! { "company_id": 1, "name": 1 }),
            index(bson::doc! { "company_id": 1, "archived": 1 }),
        ],
    )
    .await?;

    // Memberships: one row per (user, project)
    create_indexes(
        db,
        Membership::COLLECTION,
        vec![
            index_unique(bson::doc! { "user_id": 1, "project_id": 1 }),
            index(bson::doc! { "company_id": 1, "user_id": 1, "role": 1 }),
            index(bson::doc! { "project_id": 1, "role": 1 }),
        ],
    )
    .await?;

    // Project invites: only one pending invite per (project, invitee)
    create_indexes(
        db,
        ProjectInvite::COLLECTION,
        vec![
            index_unique_partial(
                bson::doc! { "project_id": 1, "invitee_id": 1 },
                bson::doc! { "status": "pending" },
            ),
            index(bson::doc! { "invitee_id": 1, "status": 1 }),
        ],
    )
    .await?;

    // Tasks
    create_indexes(
        db,
        Task::COLLECTION,
        vec![
            index(bson::doc! { "status": 1, "due_date": 1 }),
            index(bson::doc! { "project_id": 1, "assigned_to": 1 }),
        ],
    )
    .await?;

    // Chat messages
    create_indexes(
        db,
        ChatMessage::COLLECTION,
        vec![index(bson::doc! { "room": 1, "created_at": 1 })],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn index_unique_partial(keys: bson::Document, filter: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(filter)
                .build(),
        )
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
