//! Branch context and active branch selection integration tests.

mod common;

use common::{
    seed_branch, seed_group, seed_membership, spawn_app, token_for, unique_user_id,
};
use expense_service::models::Role;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn members_see_branch_details_and_roster() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Louveteaux").await;

    let member = unique_user_id("member");
    seed_membership(&app.pool, &member, branch_id, Role::Member).await;
    seed_membership(&app.pool, &admin, branch_id, Role::Admin).await;

    let token = token_for(&member, "member@example.org");

    let response = app.get(&format!("/branches/{}", branch_id), &token).await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Louveteaux");
    assert_eq!(body["group_name"], "La Guillotiere");

    let response = app
        .get(&format!("/branches/{}/members", branch_id), &token)
        .await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn non_members_cannot_inspect_a_branch() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Scouts").await;

    let token = token_for(&unique_user_id("stranger"), "stranger@example.org");

    let response = app.get(&format!("/branches/{}", branch_id), &token).await;
    assert_eq!(response.status(), 403);

    let response = app
        .get(&format!("/branches/{}/members", branch_id), &token)
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn active_branch_selection_round_trips() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let louveteaux = seed_branch(&app.pool, group.id, "Louveteaux").await;
    let scouts = seed_branch(&app.pool, group.id, "Scouts").await;

    let user = unique_user_id("user");
    seed_membership(&app.pool, &user, louveteaux, Role::Member).await;
    seed_membership(&app.pool, &user, scouts, Role::Member).await;

    let token = token_for(&user, "user@example.org");

    // No selection yet
    let response = app.get("/user/branches", &token).await;
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["branches"].as_array().unwrap().len(), 2);
    assert!(body["active_branch_id"].is_null());

    // Select, then switch; the upsert keeps a single session row
    for branch in [louveteaux, scouts] {
        let response = app
            .put_json(
                "/user/active-branch",
                &token,
                &json!({
                    "branch_id": branch,
                    "device_info": { "platform": "test" }
                }),
            )
            .await;
        assert_eq!(response.status(), 204);
    }

    let response = app.get("/user/branches", &token).await;
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["active_branch_id"], scouts.to_string());

    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM user_sessions WHERE user_id = $1")
            .bind(&user)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(count.0, 1);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn selecting_a_foreign_branch_is_denied() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Scouts").await;

    let token = token_for(&unique_user_id("stranger"), "stranger@example.org");
    let response = app
        .put_json(
            "/user/active-branch",
            &token,
            &json!({ "branch_id": branch_id }),
        )
        .await;
    assert_eq!(response.status(), 403);

    // Unknown branch id behaves the same way
    let response = app
        .put_json(
            "/user/active-branch",
            &token,
            &json!({ "branch_id": Uuid::new_v4() }),
        )
        .await;
    assert_eq!(response.status(), 403);
}
