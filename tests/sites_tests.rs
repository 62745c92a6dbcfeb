mod common;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use spacecat::api::handle_request;
use spacecat::aws::s3::scrape_result_key;

use common::{ADMIN_KEY, SCRAPER_BUCKET, TestApp, body, event, event_with_query, status, user_event};

#[tokio::test]
async fn test_missing_api_key_is_unauthorized() {
    let t = TestApp::new();
    let response = handle_request(&t.app, &event("GET", "/sites", None, None)).await;
    assert_eq!(status(&response), 401);
    assert_eq!(body(&response)["message"], "Unauthorized");

    let response = handle_request(&t.app, &event("GET", "/sites", Some("nope"), None)).await;
    assert_eq!(status(&response), 401);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let t = TestApp::new();
    let response = handle_request(&t.app, &event("GET", "/nothing/here", Some(ADMIN_KEY), None)).await;
    assert_eq!(status(&response), 404);
}

#[tokio::test]
async fn test_create_site_normalizes_and_rejects_duplicates() {
    let t = TestApp::new();
    let request = json!({ "baseURL": "https://WWW.Example.com/", "deliveryType": "aem_cs" });

    let response =
        handle_request(&t.app, &event("POST", "/sites", Some(ADMIN_KEY), Some(request.clone()))).await;
    assert_eq!(status(&response), 201);
    let site = body(&response);
    assert_eq!(site["baseURL"], "https://www.example.com");
    assert_eq!(site["deliveryType"], "aem_cs");
    assert_eq!(site["isLive"], false);

    let response =
        handle_request(&t.app, &event("POST", "/sites", Some(ADMIN_KEY), Some(request))).await;
    assert_eq!(status(&response), 409);
}

#[tokio::test]
async fn test_create_site_validation() {
    let t = TestApp::new();

    let response =
        handle_request(&t.app, &event("POST", "/sites", Some(ADMIN_KEY), Some(json!({})))).await;
    assert_eq!(status(&response), 400);
    assert_eq!(body(&response)["message"], "Base URL required");

    let response = handle_request(
        &t.app,
        &event("POST", "/sites", Some(ADMIN_KEY), Some(json!({ "baseURL": "ftp://example.com" }))),
    )
    .await;
    assert_eq!(body(&response)["message"], "Invalid URL format");

    let response = handle_request(
        &t.app,
        &event(
            "POST",
            "/sites",
            Some(ADMIN_KEY),
            Some(json!({ "baseURL": "https://example.com", "deliveryType": "wordpress" })),
        ),
    )
    .await;
    assert_eq!(status(&response), 400);

    let response = handle_request(
        &t.app,
        &event(
            "POST",
            "/sites",
            Some(ADMIN_KEY),
            Some(json!({
                "baseURL": "https://example.com",
                "organizationId": "0b0f5e2e-6a0f-4c8e-9f0e-7d5f3c2a1b00"
            })),
        ),
    )
    .await;
    assert_eq!(status(&response), 404);
    assert_eq!(body(&response)["message"], "Organization not found");
}

#[tokio::test]
async fn test_create_site_requires_admin() {
    let t = TestApp::new();
    let response = handle_request(
        &t.app,
        &user_event("POST", "/sites", &[], Some(json!({ "baseURL": "https://example.com" }))),
    )
    .await;
    assert_eq!(status(&response), 403);
}

#[tokio::test]
async fn test_user_key_is_scoped_to_organizations() {
    let t = TestApp::new();
    let org = t.organization("acme").await;
    let other = t.organization("globex").await;
    let site = t.site("https://acme.com", Some(&org.id)).await;
    let orphan = t.site("https://orphan.com", None).await;

    let path = format!("/sites/{}", site.id);
    let response = handle_request(&t.app, &user_event("GET", &path, &[&org.id], None)).await;
    assert_eq!(status(&response), 200);
    assert_eq!(body(&response)["id"], site.id);

    let response = handle_request(&t.app, &user_event("GET", &path, &[&other.id], None)).await;
    assert_eq!(status(&response), 403);

    let path = format!("/sites/{}", orphan.id);
    let response = handle_request(&t.app, &user_event("GET", &path, &[&org.id], None)).await;
    assert_eq!(status(&response), 403);

    let response = handle_request(&t.app, &user_event("GET", "/sites", &[&org.id], None)).await;
    assert_eq!(status(&response), 403);
}

#[tokio::test]
async fn test_get_site_by_id_errors() {
    let t = TestApp::new();
    let response = handle_request(&t.app, &event("GET", "/sites/not-a-uuid", Some(ADMIN_KEY), None)).await;
    assert_eq!(status(&response), 400);
    assert_eq!(body(&response)["message"], "Site ID required");

    let response = handle_request(
        &t.app,
        &event("GET", "/sites/7f1d3e6c-2c57-4b8e-8d8f-1c9f2a3b4c5d", Some(ADMIN_KEY), None),
    )
    .await;
    assert_eq!(status(&response), 404);
    assert_eq!(body(&response)["message"], "Site not found");
}

#[tokio::test]
async fn test_get_site_by_base64_base_url() {
    let t = TestApp::new();
    let site = t.site("https://www.example.com", None).await;

    let encoded = STANDARD.encode("https://www.example.com/");
    let path = format!("/sites/by-base-url/{}", encoded.replace('=', "%3D"));
    let response = handle_request(&t.app, &event("GET", &path, Some(ADMIN_KEY), None)).await;
    assert_eq!(status(&response), 200);
    assert_eq!(body(&response)["id"], site.id);

    let response = handle_request(
        &t.app,
        &event("GET", "/sites/by-base-url/%%%", Some(ADMIN_KEY), None),
    )
    .await;
    assert_eq!(status(&response), 400);
}

#[tokio::test]
async fn test_list_sites_by_delivery_type() {
    let t = TestApp::new();
    t.site("https://a.com", None).await;
    t.site("https://b.com", None).await;

    let response = handle_request(
        &t.app,
        &event("GET", "/sites/by-delivery-type/aem_edge", Some(ADMIN_KEY), None),
    )
    .await;
    assert_eq!(status(&response), 200);
    assert_eq!(body(&response).as_array().unwrap().len(), 2);

    let response = handle_request(
        &t.app,
        &event("GET", "/sites/by-delivery-type/aem_cs", Some(ADMIN_KEY), None),
    )
    .await;
    assert_eq!(body(&response).as_array().unwrap().len(), 0);

    let response = handle_request(
        &t.app,
        &event("GET", "/sites/by-delivery-type/unknown", Some(ADMIN_KEY), None),
    )
    .await;
    assert_eq!(status(&response), 400);
}

#[tokio::test]
async fn test_update_site() {
    let t = TestApp::new();
    let org = t.organization("acme").await;
    let other = t.organization("globex").await;
    let site = t.site("https://acme.com", Some(&org.id)).await;
    let path = format!("/sites/{}", site.id);

    let response = handle_request(
        &t.app,
        &user_event(
            "PATCH",
            &path,
            &[&org.id],
            Some(json!({ "name": "Acme", "gitHubURL": "https://github.com/acme/site" })),
        ),
    )
    .await;
    assert_eq!(status(&response), 200);
    let updated = body(&response);
    assert_eq!(updated["name"], "Acme");
    assert_eq!(updated["gitHubURL"], "https://github.com/acme/site");

    let response = handle_request(
        &t.app,
        &user_event("PATCH", &path, &[&org.id], Some(json!({ "name": "Acme" }))),
    )
    .await;
    assert_eq!(status(&response), 400);
    assert_eq!(body(&response)["message"], "No updates provided");

    let response = handle_request(
        &t.app,
        &user_event("PATCH", &path, &[&org.id], Some(json!({ "organizationId": other.id }))),
    )
    .await;
    assert_eq!(status(&response), 403);

    let response = handle_request(
        &t.app,
        &event("PATCH", &path, Some(ADMIN_KEY), Some(json!({ "organizationId": other.id }))),
    )
    .await;
    assert_eq!(status(&response), 200);
    assert_eq!(body(&response)["organizationId"], other.id);
}

#[tokio::test]
async fn test_remove_site() {
    let t = TestApp::new();
    let site = t.site("https://gone.com", None).await;
    let path = format!("/sites/{}", site.id);

    let response = handle_request(&t.app, &event("DELETE", &path, Some(ADMIN_KEY), None)).await;
    assert_eq!(status(&response), 204);

    let response = handle_request(&t.app, &event("GET", &path, Some(ADMIN_KEY), None)).await;
    assert_eq!(status(&response), 404);
}

#[tokio::test]
async fn test_scraped_content() {
    let t = TestApp::new();
    let site = t.site("https://acme.com", None).await;
    t.store.insert(
        SCRAPER_BUCKET,
        &scrape_result_key(&site.id, "/products/"),
        br#"{"title":"Products"}"#,
    );
    let path = format!("/sites/{}/scraped-content", site.id);

    let response = handle_request(
        &t.app,
        &event_with_query("GET", &path, Some(ADMIN_KEY), &[("path", "/products")]),
    )
    .await;
    assert_eq!(status(&response), 200);
    assert_eq!(body(&response)["content"]["title"], "Products");

    let response = handle_request(
        &t.app,
        &event_with_query("GET", &path, Some(ADMIN_KEY), &[("path", "/missing")]),
    )
    .await;
    assert_eq!(status(&response), 404);
    assert_eq!(body(&response)["message"], "Scraped content not found");
}
