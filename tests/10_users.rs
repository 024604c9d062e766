mod common;

use anyhow::Result;
use filmnexus::store::users::{self, UserUpdate};
use filmnexus::store::StoreError;

#[tokio::test]
async fn signup_then_login() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };

    let name = common::username("login");
    let created = users::create_user(&pool, &name, common::PASSWORD, "Ada", "Lovelace").await?;
    assert_eq!(created.username, name);
    assert_eq!(created.first_name, "Ada");

    let verified = users::verify_credentials(&pool, &name, common::PASSWORD).await?;
    assert_eq!(verified.id, created.id);

    let wrong = users::verify_credentials(&pool, &name, "wrongpw1").await;
    assert!(matches!(wrong, Err(StoreError::IncorrectPassword)));
    Ok(())
}

#[tokio::test]
async fn password_never_serialized() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };

    let user = common::signup(&pool, "sanitize").await?;
    let json = serde_json::to_value(&user)?;
    assert!(json.get("password").is_none(), "body: {}", json);
    Ok(())
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };

    let name = common::username("dup");
    users::create_user(&pool, &name, common::PASSWORD, "A", "B").await?;
    let err = users::create_user(&pool, &name, common::PASSWORD, "C", "D")
        .await
        .unwrap_err();
    match err {
        StoreError::Conflict(msg) => assert_eq!(msg, "User already exists"),
        other => panic!("expected conflict, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn update_requires_current_password_and_a_field() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };

    let user = common::signup(&pool, "upd").await?;

    let empty = users::update_user(&pool, user.id, common::PASSWORD, UserUpdate::default()).await;
    match empty {
        Err(StoreError::Validation(e)) => {
            assert_eq!(e.to_string(), "At least one update is required")
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    let bad_password = users::update_user(
        &pool,
        user.id,
        "wrongpw1",
        UserUpdate {
            first_name: Some("Grace".to_string()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(bad_password, Err(StoreError::IncorrectPassword)));

    let updated = users::update_user(
        &pool,
        user.id,
        common::PASSWORD,
        UserUpdate {
            first_name: Some("Grace".to_string()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(updated.first_name, "Grace");
    Ok(())
}

#[tokio::test]
async fn password_rotation_takes_effect() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };

    let user = common::signup(&pool, "rot").await?;
    users::update_user(
        &pool,
        user.id,
        common::PASSWORD,
        UserUpdate {
            password: Some("newpw456".to_string()),
            ..Default::default()
        },
    )
    .await?;

    assert!(matches!(
        users::verify_credentials(&pool, &user.username, common::PASSWORD).await,
        Err(StoreError::IncorrectPassword)
    ));
    users::verify_credentials(&pool, &user.username, "newpw456").await?;
    Ok(())
}

#[tokio::test]
async fn upsert_links_and_refreshes() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };

    let name = common::username("link");
    let first = users::upsert_user(&pool, &name, "Orson", "Welles").await?;
    let second = users::upsert_user(&pool, &name, "George", "Welles").await?;
    assert_eq!(first.id, second.id);
    assert_eq!(second.first_name, "George");
    Ok(())
}

#[tokio::test]
async fn linked_accounts_cannot_password_login() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };

    // Identity-linked accounts carry an empty hash; a password login
    // against one must read as wrong credentials, not an internal error.
    let name = common::username("nopw");
    users::upsert_user(&pool, &name, "Agnes", "Varda").await?;

    let attempt = users::verify_credentials(&pool, &name, common::PASSWORD).await;
    assert!(matches!(attempt, Err(StoreError::IncorrectPassword)));

    let update = users::update_user(
        &pool,
        users::get_user_by_username(&pool, &name).await?.unwrap().id,
        common::PASSWORD,
        UserUpdate {
            first_name: Some("A".to_string()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(update, Err(StoreError::IncorrectPassword)));
    Ok(())
}

#[tokio::test]
async fn delete_requires_credentials_and_removes_memberships() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };
    let cache = common::cache();

    let user = common::signup(&pool, "del").await?;
    let project = common::make_project(&pool, &user, "Short Film").await?;

    assert!(matches!(
        users::delete_user(&pool, &cache, user.id, "wrongpw1").await,
        Err(StoreError::IncorrectPassword)
    ));

    users::delete_user(&pool, &cache, user.id, common::PASSWORD).await?;
    assert!(users::get_user_by_id(&pool, user.id).await?.is_none());

    let members: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM project_members WHERE user_id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await?;
    assert_eq!(members, 0);

    // The project row itself survives with a dangling creator id.
    let survives: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE id = $1")
        .bind(project.id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(survives, 1);
    Ok(())
}

#[tokio::test]
async fn search_excludes_members_and_requester() -> Result<()> {
    let Some(pool) = common::try_pool().await else {
        return Ok(());
    };
    let cache = common::cache();

    let admin = common::signup(&pool, "sadmin").await?;
    let member = common::signup(&pool, "smember").await?;
    let outsider = common::signup(&pool, "soutside").await?;
    let project = common::make_project(&pool, &admin, "Casting").await?;
    filmnexus::store::members::create_member(
        &pool,
        &cache,
        project.id,
        member.id,
        "Editor",
        false,
    )
    .await?;

    let page = users::search_users(
        &pool,
        &cache,
        project.id,
        admin.id,
        Some(&outsider.username),
        1,
    )
    .await?;
    assert_eq!(page.total_count, 1);
    assert_eq!(page.users[0].id, outsider.id);

    let members_hidden = users::search_users(
        &pool,
        &cache,
        project.id,
        admin.id,
        Some(&member.username),
        1,
    )
    .await?;
    assert_eq!(members_hidden.total_count, 0);
    Ok(())
}
