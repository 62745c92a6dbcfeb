mod common;

use serde_json::json;
use spacecat::api::handle_request;

use common::{ADMIN_KEY, TestApp, body, event, status, user_event};

#[tokio::test]
async fn test_invite_and_list_trial_users() {
    let t = TestApp::new();
    let org = t.organization("acme").await;
    let invite = format!("/organizations/{}/trial-user-invite", org.id);

    let response = handle_request(
        &t.app,
        &user_event("POST", &invite, &[&org.id], Some(json!({ "emailId": "Jane@Acme.com" }))),
    )
    .await;
    assert_eq!(status(&response), 201);
    let user = body(&response);
    assert_eq!(user["emailId"], "jane@acme.com");
    assert_eq!(user["status"], "INVITED");

    let response = handle_request(
        &t.app,
        &user_event("POST", &invite, &[&org.id], Some(json!({ "emailId": "jane@acme.com" }))),
    )
    .await;
    assert_eq!(status(&response), 409);

    let list = format!("/organizations/{}/trial-users", org.id);
    let response = handle_request(&t.app, &user_event("GET", &list, &[&org.id], None)).await;
    assert_eq!(status(&response), 200);
    assert_eq!(body(&response).as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_trial_user_validation() {
    let t = TestApp::new();
    let org = t.organization("acme").await;

    let response = handle_request(
        &t.app,
        &event("GET", "/organizations/not-a-uuid/trial-users", Some(ADMIN_KEY), None),
    )
    .await;
    assert_eq!(status(&response), 400);
    assert_eq!(body(&response)["message"], "Organization ID required");

    let response = handle_request(
        &t.app,
        &event(
            "GET",
            "/organizations/3c1e2d4f-5a6b-4c7d-8e9f-0a1b2c3d4e5f/trial-users",
            Some(ADMIN_KEY),
            None,
        ),
    )
    .await;
    assert_eq!(status(&response), 404);

    let invite = format!("/organizations/{}/trial-user-invite", org.id);
    let response = handle_request(
        &t.app,
        &event("POST", &invite, Some(ADMIN_KEY), Some(json!({ "emailId": "not-an-email" }))),
    )
    .await;
    assert_eq!(status(&response), 400);
    assert_eq!(body(&response)["message"], "Valid email address is required");
}

#[tokio::test]
async fn test_trial_users_require_organization_membership() {
    let t = TestApp::new();
    let org = t.organization("acme").await;
    let other = t.organization("globex").await;

    let list = format!("/organizations/{}/trial-users", org.id);
    let response = handle_request(&t.app, &user_event("GET", &list, &[&other.id], None)).await;
    assert_eq!(status(&response), 403);
}
