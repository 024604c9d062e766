mod common;

use anyhow::Result;
use filmnexus::store::files::{self, FileUpdate};
use filmnexus::store::{members, StoreError, FILES_LIMIT};

#[tokio::test]
async fn create_rejects_invalid_urls() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };
    let cache = common::cache();

    let user = common::signup(&pool, "furl").await?;
    let project = common::make_project(&pool, &user, "Uploads").await?;

    let bad = files::create_file(&pool, &cache, user.id, project.id, "cut.mp4", "not a url").await;
    assert!(matches!(bad, Err(StoreError::Validation(_))));

    let file = files::create_file(
        &pool,
        &cache,
        user.id,
        project.id,
        "cut.mp4",
        "https://cdn.example.com/cut.mp4",
    )
    .await?;
    assert_eq!(file.name, "cut.mp4");
    Ok(())
}

#[tokio::test]
async fn windowed_reads_match_the_message_contract() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };
    let cache = common::cache();

    let user = common::signup(&pool, "fwin").await?;
    let project = common::make_project(&pool, &user, "Reels").await?;
    for i in 0..18 {
        files::create_file(
            &pool,
            &cache,
            user.id,
            project.id,
            &format!("reel{}.mov", i),
            &format!("https://cdn.example.com/reel{}.mov", i),
        )
        .await?;
    }

    let first = files::get_files_by_project_id(&pool, &cache, project.id, 0).await?;
    assert_eq!(first.total_count, 18);
    assert_eq!(first.files.len() as i64, FILES_LIMIT);
    assert_eq!(first.files[0].name, "reel0.mov");

    let second = files::get_files_by_project_id(&pool, &cache, project.id, FILES_LIMIT).await?;
    assert_eq!(second.files.len(), 3);
    Ok(())
}

#[tokio::test]
async fn update_is_creator_or_admin() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };
    let cache = common::cache();

    let admin = common::signup(&pool, "fuadm").await?;
    let uploader = common::signup(&pool, "fuup").await?;
    let other = common::signup(&pool, "fuother").await?;
    let project = common::make_project(&pool, &admin, "Edits").await?;
    members::create_member(&pool, &cache, project.id, uploader.id, "Editor", false).await?;
    members::create_member(&pool, &cache, project.id, other.id, "Viewer", false).await?;

    let file = files::create_file(
        &pool,
        &cache,
        uploader.id,
        project.id,
        "rough.mov",
        "https://cdn.example.com/rough.mov",
    )
    .await?;

    let denied = files::update_file(
        &pool,
        &cache,
        file.id,
        other.id,
        FileUpdate {
            name: Some("stolen.mov".to_string()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(denied, Err(StoreError::AccessDenied)));

    let renamed = files::update_file(
        &pool,
        &cache,
        file.id,
        uploader.id,
        FileUpdate {
            name: Some("final.mov".to_string()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(renamed.name, "final.mov");

    let by_admin = files::update_file(
        &pool,
        &cache,
        file.id,
        admin.id,
        FileUpdate {
            name: Some("locked.mov".to_string()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(by_admin.name, "locked.mov");

    let empty = files::update_file(&pool, &cache, file.id, admin.id, FileUpdate::default()).await;
    assert!(matches!(empty, Err(StoreError::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn delete_returns_the_row_for_storage_cleanup() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };
    let cache = common::cache();

    let user = common::signup(&pool, "fdel").await?;
    let project = common::make_project(&pool, &user, "Trash").await?;
    let file = files::create_file(
        &pool,
        &cache,
        user.id,
        project.id,
        "scrap.mov",
        "https://cdn.example.com/scrap.mov",
    )
    .await?;

    let deleted = files::delete_file_by_id(&pool, &cache, file.id, user.id).await?;
    assert_eq!(deleted.url, "https://cdn.example.com/scrap.mov");

    let gone = files::delete_file_by_id(&pool, &cache, file.id, user.id).await;
    assert!(matches!(gone, Err(StoreError::NotFound("File"))));
    Ok(())
}
