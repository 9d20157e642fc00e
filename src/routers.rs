use std::collections::HashMap;
use std::convert::Infallible;

use uuid::Uuid;
use warp::Filter;

use crate::handlers;
use crate::services::FileService;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

pub fn make_routes(
    service: FileService,
    max_upload_bytes: u64,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    let service_filter = warp::any().map(move || service.clone());
    let body_limit = max_upload_bytes + MULTIPART_OVERHEAD;

    let upload = warp::path("upload")
        .and(warp::path::end())
        .and(warp::post())
        .and(service_filter.clone())
        .and(warp::any().map(move || max_upload_bytes))
        .and(warp::body::content_length_limit(body_limit))
        .and(warp::multipart::form().max_length(body_limit))
        .and_then(handlers::upload_file);

    let list = warp::path("getFiles")
        .and(warp::path::end())
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(handlers::list_files);

    let list_json = warp::path("files")
        .and(warp::path::end())
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(handlers::list_files_json);

    let download = warp::path("download")
        .and(warp::path::end())
        .and(warp::get())
        .and(service_filter.clone())
        .and(warp::query::<HashMap<String, String>>())
        .and_then(handlers::download_file);

    let delete = warp::path("files")
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(service_filter)
        .and_then(handlers::delete_file);

    upload
        .or(list)
        .or(list_json)
        .or(download)
        .or(delete)
        .recover(handlers::handle_rejection)
}
