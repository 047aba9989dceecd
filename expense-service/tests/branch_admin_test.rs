//! Group administration integration tests: group info, pending request
//! listing and branch management.

mod common;

use common::{
    seed_branch, seed_group, seed_membership, spawn_app, token_for, unique_user_id,
};
use expense_service::models::Role;
use serde_json::json;

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn admins_see_their_group() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Scouts").await;
    seed_membership(&app.pool, &admin, branch_id, Role::Admin).await;

    let token = token_for(&admin, "admin@example.org");
    let response = app.get("/admin/group", &token).await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["id"], group.id.to_string());
    assert_eq!(body["name"], "La Guillotiere");
    assert_eq!(body["slug"], group.slug);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn non_admins_are_denied() {
    let app = spawn_app().await;

    let member = unique_user_id("member");
    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Scouts").await;
    seed_membership(&app.pool, &member, branch_id, Role::Member).await;

    let token = token_for(&member, "member@example.org");

    for path in ["/admin/group", "/admin/pending-requests", "/admin/branches"] {
        let response = app.get(path, &token).await;
        assert_eq!(response.status(), 403, "expected 403 on {}", path);
    }
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn pending_requests_are_listed_for_the_group() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Louveteaux").await;
    seed_membership(&app.pool, &admin, branch_id, Role::Admin).await;

    let user_token = token_for(&unique_user_id("user"), "newcomer@example.org");
    app.post_json(
        "/access/requests",
        &user_token,
        &json!({ "group_code": group.slug }),
    )
    .await;

    let admin_token = token_for(&admin, "admin@example.org");
    let response = app.get("/admin/pending-requests", &admin_token).await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let requests = body["requests"].as_array().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["email"], "newcomer@example.org");
    assert_eq!(requests[0]["branch_name"], "Louveteaux");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn branches_are_listed_with_member_counts() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let scouts = seed_branch(&app.pool, group.id, "Scouts").await;
    seed_branch(&app.pool, group.id, "Louveteaux").await;
    seed_membership(&app.pool, &admin, scouts, Role::Admin).await;
    seed_membership(&app.pool, &unique_user_id("m1"), scouts, Role::Member).await;
    seed_membership(&app.pool, &unique_user_id("m2"), scouts, Role::Member).await;

    let token = token_for(&admin, "admin@example.org");
    let response = app.get("/admin/branches", &token).await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let branches = body["branches"].as_array().unwrap();
    assert_eq!(branches.len(), 2);

    let scouts_row = branches
        .iter()
        .find(|b| b["name"] == "Scouts")
        .expect("Scouts branch listed");
    assert_eq!(scouts_row["member_count"], 3);

    let louveteaux_row = branches.iter().find(|b| b["name"] == "Louveteaux").unwrap();
    assert_eq!(louveteaux_row["member_count"], 0);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn admins_create_and_update_branches() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let seed = seed_branch(&app.pool, group.id, "Scouts").await;
    seed_membership(&app.pool, &admin, seed, Role::Admin).await;

    let token = token_for(&admin, "admin@example.org");

    let response = app
        .post_json("/admin/branches", &token, &json!({ "name": "Farfadets" }))
        .await;
    assert_eq!(response.status(), 201);
    let created: serde_json::Value = response.json().await.unwrap();
    assert_eq!(created["name"], "Farfadets");
    assert_eq!(created["member_count"], 0);

    let branch_id = created["id"].as_str().unwrap();

    // Rename and deactivate
    let response = app
        .patch_json(
            &format!("/admin/branches/{}", branch_id),
            &token,
            &json!({ "name": "Compagnons", "is_active": false }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated["name"], "Compagnons");
    assert_eq!(updated["is_active"], false);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn updating_a_branch_of_another_group_is_denied() {
    let app = spawn_app().await;

    // Admin of group A
    let admin_a = unique_user_id("admin-a");
    let group_a = seed_group(&app.pool, "Group A", &admin_a).await;
    let branch_a = seed_branch(&app.pool, group_a.id, "Scouts").await;
    seed_membership(&app.pool, &admin_a, branch_a, Role::Admin).await;

    // Branch in group B
    let admin_b = unique_user_id("admin-b");
    let group_b = seed_group(&app.pool, "Group B", &admin_b).await;
    let branch_b = seed_branch(&app.pool, group_b.id, "Guides").await;

    let token = token_for(&admin_a, "admin-a@example.org");
    let response = app
        .patch_json(
            &format!("/admin/branches/{}", branch_b),
            &token,
            &json!({ "name": "Hijacked" }),
        )
        .await;

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn empty_branch_update_is_a_bad_request() {
    let app = spawn_app().await;

    let admin = unique_user_id("admin");
    let group = seed_group(&app.pool, "La Guillotiere", &admin).await;
    let branch_id = seed_branch(&app.pool, group.id, "Scouts").await;
    seed_membership(&app.pool, &admin, branch_id, Role::Admin).await;

    let token = token_for(&admin, "admin@example.org");
    let response = app
        .patch_json(&format!("/admin/branches/{}", branch_id), &token, &json!({}))
        .await;

    assert_eq!(response.status(), 400);
}
