use std::collections::HashMap;
use std::convert::Infallible;
use std::io;

use bytes::{BufMut, Bytes};
use futures::TryStreamExt;
use log::{error, warn};
use uuid::Uuid;
use warp::http::{header, Response, StatusCode};
use warp::hyper::Body;
use warp::multipart::FormData;
use warp::reject::Rejection;
use warp::Reply;

use crate::error::{Error, Result};
use crate::services::FileService;

/// Name of the multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

/// `POST /upload`: stores the `file` part and answers with its id.
pub async fn upload_file(service: FileService, max_upload_bytes: u64, form: FormData) -> Result<warp::reply::Response, Infallible> {
    let result = async {
        let (filename, data) = read_file_part(form, max_upload_bytes).await?;
        service.upload_bytes(&filename, Bytes::from(data)).await
    }
        .await;

    Ok(match result {
        Ok(file_id) => plain_text(StatusCode::OK, file_id.to_string()),
        Err(e) => error_response(&e),
    })
}

/// `GET /getFiles`: one line per published file.
pub async fn list_files(service: FileService) -> Result<warp::reply::Response, Infallible> {
    Ok(match service.list_files().await {
        Ok(records) => {
            let body: String = records
                .iter()
                .map(|r| format!("{}\n", r.summary_line()))
                .collect();
            plain_text(StatusCode::OK, body)
        }
        Err(e) => error_response(&e),
    })
}

/// `GET /files`: the listing as JSON.
pub async fn list_files_json(service: FileService) -> Result<warp::reply::Response, Infallible> {
    Ok(match service.list_files().await {
        Ok(records) => warp::reply::json(&records).into_response(),
        Err(e) => error_response(&e),
    })
}

/// `GET /download?id=<uuid>`: the reassembled file as an attachment.
pub async fn download_file(service: FileService, query: HashMap<String, String>) -> Result<warp::reply::Response, Infallible> {
    let file_id = match parse_file_id(query.get("id").map(String::as_str)) {
        Ok(id) => id,
        Err(e) => return Ok(error_response(&e)),
    };

    let file = match service.download(file_id).await {
        Ok(file) => file,
        Err(e) => return Ok(error_response(&e)),
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_DISPOSITION, content_disposition(&file.record.filename))
        .body(Body::from(file.data));

    Ok(response.unwrap_or_else(|e| {
        error!("Failed to build download response for {}: {}", file_id, e);
        plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Error sending file".to_string())
    }))
}

/// `DELETE /files/<uuid>`.
pub async fn delete_file(file_id: Uuid, service: FileService) -> Result<warp::reply::Response, Infallible> {
    Ok(match service.delete_file(file_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    })
}

/// Maps filter rejections (bad routes, oversized bodies, malformed forms)
/// to plain-text responses.
pub async fn handle_rejection(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "File too large")
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length is required")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string")
    } else if err.find::<warp::reject::MissingHeader>().is_some()
        || err.find::<warp::reject::InvalidHeader>().is_some()
        || err.find::<warp::reject::UnsupportedMediaType>().is_some()
    {
        (StatusCode::BAD_REQUEST, "Error retrieving file")
    } else {
        error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };
    Ok(plain_text(status, message.to_string()))
}

pub fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::Input(_) => StatusCode::BAD_REQUEST,
        Error::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Store(_) | Error::Read(_) | Error::IncompleteFile { .. } | Error::PartialUpload { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(e: &Error) -> warp::reply::Response {
    if e.is_client_error() {
        warn!("Request rejected: {}", e);
    } else {
        error!("Request failed: {}", e);
    }
    plain_text(status_for(e), e.to_string())
}

fn plain_text(status: StatusCode, body: String) -> warp::reply::Response {
    warp::reply::with_status(body, status).into_response()
}

fn parse_file_id(raw: Option<&str>) -> Result<Uuid> {
    match raw.map(str::trim) {
        None | Some("") => Err(Error::Input("File ID is required".to_string())),
        Some(raw) => Uuid::parse_str(raw).map_err(|_| Error::Input(format!("invalid file id {:?}", raw))),
    }
}

async fn read_file_part(form: FormData, max_upload_bytes: u64) -> Result<(String, Vec<u8>)> {
    let mut parts = Box::pin(form);
    while let Some(part) = parts
        .try_next()
        .await
        .map_err(|e| Error::Input(format!("malformed multipart body: {}", e)))?
    {
        if part.name() != FILE_FIELD {
            continue;
        }
        let filename = part
            .filename()
            .map(str::to_owned)
            .ok_or_else(|| Error::Input("file part has no filename".to_string()))?;

        let mut stream = Box::pin(part.stream());
        let mut data = Vec::new();
        while let Some(buf) = stream.try_next().await.map_err(|e| Error::Read(io::Error::other(e)))? {
            data.put(buf);
            if data.len() as u64 > max_upload_bytes {
                return Err(Error::TooLarge { limit: max_upload_bytes });
            }
        }
        return Ok((filename, data));
    }
    Err(Error::Input("Error retrieving file".to_string()))
}

/// `attachment; filename="…"` with quotes and backslashes escaped and
/// anything outside printable ASCII replaced.
pub fn content_disposition(filename: &str) -> String {
    let mut escaped = String::with_capacity(filename.len());
    for c in filename.chars() {
        match c {
            '"' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            ' '..='~' => escaped.push(c),
            _ => escaped.push('_'),
        }
    }
    format!("attachment; filename=\"{}\"", escaped)
}
