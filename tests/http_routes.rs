mod common;

use chunked_file_storage::db::MetadataStore;
use chunked_file_storage::routers::make_routes;
use serde_json::Value;
use uuid::Uuid;
use warp::http::StatusCode;

use common::{memory_service, pattern};

const BOUNDARY: &str = "----chunkedstoretestboundary";

fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, field, filename
        )
            .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(field: &str, filename: &str, data: &[u8]) -> warp::test::RequestBuilder {
    warp::test::request()
        .method("POST")
        .path("/upload")
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(multipart_body(field, filename, data))
}

#[tokio::test]
async fn upload_list_and_download_over_http() {
    let (_, service) = memory_service(16);
    let routes = make_routes(service, 10 << 20);
    let data = pattern(100, 4);

    let res = upload_request("file", "notes.txt", &data).reply(&routes).await;
    assert_eq!(res.status(), StatusCode::OK);
    let file_id = Uuid::parse_str(std::str::from_utf8(res.body()).unwrap()).unwrap();

    let res = warp::test::request().path("/getFiles").reply(&routes).await;
    assert_eq!(res.status(), StatusCode::OK);
    let listing = std::str::from_utf8(res.body()).unwrap().to_string();
    assert_eq!(listing.lines().count(), 1);
    assert!(listing.starts_with(&format!("File ID: {}, Filename: notes.txt, Chunks: 7, Uploaded: ", file_id)));

    let res = warp::test::request()
        .path(&format!("/download?id={}", file_id))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-disposition"],
        "attachment; filename=\"notes.txt\""
    );
    assert_eq!(&res.body()[..], &data[..]);
}

#[tokio::test]
async fn json_listing_carries_record_fields() {
    let (_, service) = memory_service(16);
    let routes = make_routes(service, 10 << 20);
    upload_request("file", "a.bin", &pattern(40, 1)).reply(&routes).await;

    let res = warp::test::request().path("/files").reply(&routes).await;
    assert_eq!(res.status(), StatusCode::OK);
    let json: Value = serde_json::from_slice(res.body()).unwrap();
    let files = json.as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["filename"], "a.bin");
    assert_eq!(files[0]["total_chunks"], 3);
    assert_eq!(files[0]["ready"], true);
}

#[tokio::test]
async fn download_requires_a_valid_known_id() {
    let (_, service) = memory_service(16);
    let routes = make_routes(service, 10 << 20);

    let res = warp::test::request().path("/download").reply(&routes).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = warp::test::request().path("/download?id=not-a-uuid").reply(&routes).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = warp::test::request()
        .path(&format!("/download?id={}", Uuid::new_v4()))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(!res.body().is_empty());
}

#[tokio::test]
async fn upload_without_file_field_is_a_bad_request() {
    let (store, service) = memory_service(16);
    let routes = make_routes(service, 10 << 20);

    let res = upload_request("attachment", "a.bin", b"hello").reply(&routes).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert!(store.list_metadata().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_uploads_are_rejected() {
    let (_, service) = memory_service(16);
    let routes = make_routes(service, 32);

    // within the body allowance but over the file limit
    let res = upload_request("file", "big.bin", &pattern(33, 0)).reply(&routes).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    // over the body allowance as a whole
    let res = upload_request("file", "huge.bin", &pattern(128 * 1024, 0)).reply(&routes).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let res = upload_request("file", "ok.bin", &pattern(32, 0)).reply(&routes).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn delete_route_removes_files() {
    let (_, service) = memory_service(16);
    let routes = make_routes(service, 10 << 20);
    let res = upload_request("file", "tmp.bin", &pattern(20, 2)).reply(&routes).await;
    let file_id = std::str::from_utf8(res.body()).unwrap().to_string();

    let res = warp::test::request()
        .method("DELETE")
        .path(&format!("/files/{}", file_id))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = warp::test::request()
        .method("DELETE")
        .path(&format!("/files/{}", file_id))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = warp::test::request().path("/getFiles").reply(&routes).await;
    assert!(res.body().is_empty());
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (_, service) = memory_service(16);
    let routes = make_routes(service, 10 << 20);
    let res = warp::test::request().path("/nowhere").reply(&routes).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
