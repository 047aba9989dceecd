//! Unit email proposal integration tests.

mod common;

use common::{
    seed_branch, seed_group, seed_membership, spawn_app, token_for, unique_user_id,
};
use expense_service::models::Role;
use serde_json::json;

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn members_propose_a_unit_email() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Louveteaux").await;

    let member = unique_user_id("member");
    seed_membership(&app.pool, &member, branch_id, Role::Member).await;

    let token = token_for(&member, "member@example.org");
    let response = app
        .post_json(
            &format!("/branches/{}/proposals", branch_id),
            &token,
            &json!({ "email": "louveteaux@example.org" }),
        )
        .await;

    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "proposed");
    assert_eq!(body["email"], "louveteaux@example.org");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn one_open_proposal_per_branch() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Scouts").await;

    let member = unique_user_id("member");
    seed_membership(&app.pool, &member, branch_id, Role::Member).await;

    let token = token_for(&member, "member@example.org");
    let path = format!("/branches/{}/proposals", branch_id);

    let first = app
        .post_json(&path, &token, &json!({ "email": "scouts@example.org" }))
        .await;
    assert_eq!(first.status(), 201);

    let second = app
        .post_json(&path, &token, &json!({ "email": "scouts2@example.org" }))
        .await;
    assert_eq!(second.status(), 409);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn invalid_email_is_rejected() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Scouts").await;

    let member = unique_user_id("member");
    seed_membership(&app.pool, &member, branch_id, Role::Member).await;

    let token = token_for(&member, "member@example.org");
    let response = app
        .post_json(
            &format!("/branches/{}/proposals", branch_id),
            &token,
            &json!({ "email": "not-an-email" }),
        )
        .await;

    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn non_members_cannot_propose() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Scouts").await;

    let token = token_for(&unique_user_id("stranger"), "stranger@example.org");
    let response = app
        .post_json(
            &format!("/branches/{}/proposals", branch_id),
            &token,
            &json!({ "email": "scouts@example.org" }),
        )
        .await;

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn branch_admins_validate_proposals() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Louveteaux").await;
    seed_membership(&app.pool, &admin, branch_id, Role::Admin).await;

    let member = unique_user_id("member");
    seed_membership(&app.pool, &member, branch_id, Role::Member).await;

    let member_token = token_for(&member, "member@example.org");
    let response = app
        .post_json(
            &format!("/branches/{}/proposals", branch_id),
            &member_token,
            &json!({ "email": "louveteaux@example.org" }),
        )
        .await;
    let proposal: serde_json::Value = response.json().await.unwrap();
    let proposal_id = proposal["id"].as_str().unwrap();

    // The admin sees it in the cross-branch listing
    let admin_token = token_for(&admin, "admin@example.org");
    let response = app.get("/admin/proposals", &admin_token).await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["proposals"].as_array().unwrap().len(), 1);

    // Validate it
    let response = app
        .put_json(
            &format!("/admin/proposals/{}", proposal_id),
            &admin_token,
            &json!({ "action": "validate" }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let decided: serde_json::Value = response.json().await.unwrap();
    assert_eq!(decided["status"], "validated");
    assert_eq!(decided["validated_by"], admin);

    // Deciding again conflicts
    let response = app
        .put_json(
            &format!("/admin/proposals/{}", proposal_id),
            &admin_token,
            &json!({ "action": "refuse" }),
        )
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn refusing_allows_a_new_proposal() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Scouts").await;
    seed_membership(&app.pool, &admin, branch_id, Role::Admin).await;

    let admin_token = token_for(&admin, "admin@example.org");
    let path = format!("/branches/{}/proposals", branch_id);

    let response = app
        .post_json(&path, &admin_token, &json!({ "email": "first@example.org" }))
        .await;
    let proposal: serde_json::Value = response.json().await.unwrap();
    let proposal_id = proposal["id"].as_str().unwrap();

    let response = app
        .put_json(
            &format!("/admin/proposals/{}", proposal_id),
            &admin_token,
            &json!({ "action": "refuse" }),
        )
        .await;
    assert_eq!(response.status(), 200);

    // The slot is free again
    let response = app
        .post_json(
            &path,
            &admin_token,
            &json!({ "email": "second@example.org" }),
        )
        .await;
    assert_eq!(response.status(), 201);

    // Both proposals appear in the branch history
    let response = app.get(&path, &admin_token).await;
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["proposals"].as_array().unwrap().len(), 2);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn members_cannot_decide_proposals() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Scouts").await;

    let member = unique_user_id("member");
    seed_membership(&app.pool, &member, branch_id, Role::Member).await;

    let member_token = token_for(&member, "member@example.org");
    let response = app
        .post_json(
            &format!("/branches/{}/proposals", branch_id),
            &member_token,
            &json!({ "email": "scouts@example.org" }),
        )
        .await;
    let proposal: serde_json::Value = response.json().await.unwrap();
    let proposal_id = proposal["id"].as_str().unwrap();

    let response = app
        .put_json(
            &format!("/admin/proposals/{}", proposal_id),
            &member_token,
            &json!({ "action": "validate" }),
        )
        .await;

    assert_eq!(response.status(), 403);
}
