mod common;

use common::{ACCESS_TOKEN, EMAIL, USER_ID, client_for, identity};
use neatify_staff::error::NeatifyError;
use neatify_staff::staff::{BookingId, StaffBookings, StaffProfile, StaffProfiles};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bearer() -> String {
    format!("Bearer {ACCESS_TOKEN}")
}

#[tokio::test]
async fn assigned_bookings_filter_by_staff_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("assigned_staff_email", format!("eq.{EMAIL}").as_str()))
        .and(query_param("select", "*"))
        .and(header("authorization", bearer().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 11,
                "customer_name": "Grace Hopper",
                "full_address": "1 Navy Yard",
                "services": [{"title": "End of tenancy", "duration": "4 hrs"}],
                "booking_date": "2026-10-21",
                "booking_time": "10:30",
                "assigned_staff_email": EMAIL,
                "is_viewed": false
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let bookings = StaffBookings::new(client_for(&server))
        .assigned(&identity())
        .await
        .expect("bookings fetch failed");

    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].id, BookingId::Int(11));
    assert_eq!(bookings[0].customer_name.as_deref(), Some("Grace Hopper"));
    assert_eq!(bookings[0].services()[0].duration_label(), "4 hrs");
}

#[tokio::test]
async fn unviewed_count_reads_content_range() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("is_viewed", "eq.false"))
        .and(query_param("assigned_staff_email", format!("eq.{EMAIL}").as_str()))
        .and(header("prefer", "count=exact"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-range", "0-2/3"))
        .expect(1)
        .mount(&server)
        .await;

    let count = StaffBookings::new(client_for(&server))
        .unviewed_count(&identity())
        .await
        .expect("count failed");

    assert_eq!(count, 3);
}

#[tokio::test]
async fn unviewed_count_without_header_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = StaffBookings::new(client_for(&server))
        .unviewed_count(&identity())
        .await
        .unwrap_err();

    assert!(matches!(err, NeatifyError::MissingCount));
}

#[tokio::test]
async fn mark_viewed_patches_only_own_booking() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", "eq.11"))
        .and(query_param("assigned_staff_email", format!("eq.{EMAIL}").as_str()))
        .and(body_json(json!({ "is_viewed": true })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    StaffBookings::new(client_for(&server))
        .mark_viewed(&identity(), &BookingId::Int(11))
        .await
        .expect("mark viewed failed");
}

#[tokio::test]
async fn missing_profile_row_reads_as_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/staff_profile"))
        .and(query_param("id", format!("eq.{USER_ID}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let profile = StaffProfiles::new(client_for(&server), "avatars")
        .load(&identity())
        .await
        .expect("profile load failed");

    assert_eq!(profile, StaffProfile::default());
}

#[tokio::test]
async fn update_profile_sends_name_and_phone() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/staff_profile"))
        .and(query_param("id", format!("eq.{USER_ID}").as_str()))
        .and(body_json(json!({ "full_name": "Ada Lovelace", "phone": "0700" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    StaffProfiles::new(client_for(&server), "avatars")
        .update(&identity(), "Ada Lovelace", "0700")
        .await
        .expect("profile update failed");
}

#[tokio::test]
async fn avatar_upload_stores_public_url_on_profile() {
    let server = MockServer::start().await;
    let object_path = format!("/storage/v1/object/avatars/{USER_ID}.jpg");
    Mock::given(method("POST"))
        .and(path(object_path.as_str()))
        .and(header("x-upsert", "true"))
        .and(header("content-type", "image/jpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "avatars/x.jpg" })))
        .expect(1)
        .mount(&server)
        .await;

    let public_url = format!(
        "{}/storage/v1/object/public/avatars/{USER_ID}.jpg",
        server.uri()
    );
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/staff_profile"))
        .and(body_json(json!({ "avatar_url": public_url })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let url = StaffProfiles::new(client_for(&server), "avatars")
        .upload_avatar(&identity(), vec![0xFF, 0xD8, 0xFF])
        .await
        .expect("avatar upload failed");

    assert_eq!(url.as_str(), public_url);
}

#[tokio::test]
async fn row_level_security_rejection_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "JWT expired" })))
        .expect(1)
        .mount(&server)
        .await;

    let err = StaffBookings::new(client_for(&server))
        .assigned(&identity())
        .await
        .unwrap_err();

    match err {
        NeatifyError::Api { status, message } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "JWT expired");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn bookings_read_retries_after_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "upstream down" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 5 }])))
        .mount(&server)
        .await;

    let bookings = StaffBookings::new(client_for(&server))
        .assigned(&identity())
        .await
        .expect("bookings fetch should recover");

    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].id, BookingId::Int(5));
    let requests = server.received_requests().await.expect("request recording on");
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn mark_viewed_is_not_retried_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = StaffBookings::new(client_for(&server))
        .mark_viewed(&identity(), &BookingId::Int(11))
        .await
        .unwrap_err();

    assert!(matches!(err, NeatifyError::Api { status, .. } if status.as_u16() == 503));
}
