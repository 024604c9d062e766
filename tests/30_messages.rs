mod common;

use anyhow::Result;
use filmnexus::store::users;
use filmnexus::store::{members, messages, StoreError, MESSAGES_LIMIT};

#[tokio::test]
async fn windowed_reads_page_oldest_first() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };
    let cache = common::cache();

    let user = common::signup(&pool, "mwin").await?;
    let project = common::make_project(&pool, &user, "Dailies").await?;
    for i in 0..20 {
        messages::create_message(&pool, &cache, user.id, project.id, &format!("take {}", i))
            .await?;
    }

    let first = messages::get_messages_by_project_id(&pool, &cache, project.id, 0).await?;
    assert_eq!(first.total_count, 20);
    assert_eq!(first.messages.len() as i64, MESSAGES_LIMIT);
    assert_eq!(first.messages[0].text, "take 0");

    let second =
        messages::get_messages_by_project_id(&pool, &cache, project.id, MESSAGES_LIMIT).await?;
    assert_eq!(second.messages.len(), 5);
    assert_eq!(second.messages[0].text, "take 15");
    assert_eq!(second.offset, MESSAGES_LIMIT);
    Ok(())
}

#[tokio::test]
async fn cached_window_is_invalidated_by_writes() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };
    let cache = common::cache();

    let user = common::signup(&pool, "mcache").await?;
    let project = common::make_project(&pool, &user, "Notes").await?;
    messages::create_message(&pool, &cache, user.id, project.id, "first").await?;

    // Prime the cache, then write and read again: the new row must appear.
    let before = messages::get_messages_by_project_id(&pool, &cache, project.id, 0).await?;
    assert_eq!(before.total_count, 1);

    messages::create_message(&pool, &cache, user.id, project.id, "second").await?;
    let after = messages::get_messages_by_project_id(&pool, &cache, project.id, 0).await?;
    assert_eq!(after.total_count, 2);
    assert_eq!(after.messages[1].text, "second");
    Ok(())
}

#[tokio::test]
async fn deletion_is_creator_or_admin() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };
    let cache = common::cache();

    let admin = common::signup(&pool, "msgadm").await?;
    let author = common::signup(&pool, "msgauth").await?;
    let other = common::signup(&pool, "msgother").await?;
    let project = common::make_project(&pool, &admin, "Thread").await?;
    members::create_member(&pool, &cache, project.id, author.id, "Writer", false).await?;
    members::create_member(&pool, &cache, project.id, other.id, "Reader", false).await?;

    let mine = messages::create_message(&pool, &cache, author.id, project.id, "mine").await?;
    let theirs = messages::create_message(&pool, &cache, author.id, project.id, "theirs").await?;

    let denied = messages::delete_message_by_id(&pool, &cache, mine.id, other.id).await;
    assert!(matches!(denied, Err(StoreError::AccessDenied)));

    messages::delete_message_by_id(&pool, &cache, mine.id, author.id).await?;
    messages::delete_message_by_id(&pool, &cache, theirs.id, admin.id).await?;

    let gone = messages::delete_message_by_id(&pool, &cache, mine.id, author.id).await;
    assert!(matches!(gone, Err(StoreError::NotFound("Message"))));
    Ok(())
}

#[tokio::test]
async fn bulk_delete_is_admin_only() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };
    let cache = common::cache();

    let admin = common::signup(&pool, "mbadm").await?;
    let plain = common::signup(&pool, "mbplain").await?;
    let project = common::make_project(&pool, &admin, "Purge").await?;
    members::create_member(&pool, &cache, project.id, plain.id, "Crew", false).await?;
    messages::create_message(&pool, &cache, plain.id, project.id, "one").await?;
    messages::create_message(&pool, &cache, admin.id, project.id, "two").await?;

    let denied = messages::delete_messages_by_project_id(&pool, &cache, project.id, plain.id).await;
    assert!(matches!(denied, Err(StoreError::AccessDenied)));

    let deleted =
        messages::delete_messages_by_project_id(&pool, &cache, project.id, admin.id).await?;
    assert_eq!(deleted.len(), 2);

    // Nothing left: a repeat succeeds with an empty result.
    let again =
        messages::delete_messages_by_project_id(&pool, &cache, project.id, admin.id).await?;
    assert!(again.is_empty());
    Ok(())
}

#[tokio::test]
async fn deleting_a_user_keeps_authored_rows() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };
    let cache = common::cache();

    let admin = common::signup(&pool, "dgadm").await?;
    let author = common::signup(&pool, "dgauth").await?;
    let project = common::make_project(&pool, &admin, "Archive").await?;
    members::create_member(&pool, &cache, project.id, author.id, "Writer", false).await?;
    messages::create_message(&pool, &cache, author.id, project.id, "posterity").await?;

    users::delete_user(&pool, &cache, author.id, common::PASSWORD).await?;

    let window = messages::get_messages_by_project_id(&pool, &cache, project.id, 0).await?;
    assert_eq!(window.total_count, 1);
    assert_eq!(window.messages[0].creator_id, author.id);
    assert!(window.messages[0].creator.is_none());
    Ok(())
}
