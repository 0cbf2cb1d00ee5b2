use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use fsgate_backend::traits::RemoteFs;
use fsgate_common::error::GatewayError;
use fsgate_common::time::http_date;
use fsgate_common::types::{FileInfo, Identity};
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tracing::{error, warn};

use crate::content_type::guess_content_type;
use crate::error::HttpError;
use crate::listing::{self, Markers, SortColumn, SortDirection};
use crate::path::{convert_invalid_char, join, parent_dir, split_target};
use crate::permissions::{can_execute, can_read};
use crate::range::{resolve, weak_etag, DeliveryPlan};
use crate::render::{render_listing, PageIncludes};
use crate::stream::{stream_plan, COPY_BUFFER_SIZE, MIME_BOUNDARY};

/// Site-level knobs resolved once at startup.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Served instead of the listing when present in a directory.
    pub index_file: String,
    /// Listing header marker; excluded from the listing itself.
    pub header_file: Option<String>,
    /// Listing readme marker; stays in the listing.
    pub readme_file: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            index_file: "index.html".to_string(),
            header_file: None,
            readme_file: None,
        }
    }
}

/// Shared per-process state: the backend handle and identity are built
/// before the server starts accepting requests and are read-only from
/// then on.
#[derive(Clone)]
pub struct AppState {
    pub fs: Arc<dyn RemoteFs>,
    pub identity: Identity,
    pub config: SiteConfig,
}

/// Why a file target could not be served. Callers fold most variants
/// into NOT_FOUND so responses never reveal whether a denied path
/// exists.
#[derive(Debug, Error)]
pub enum CheckFileError {
    #[error("does not exist")]
    NotFound,
    #[error("backend connection failed: {0}")]
    Connection(String),
    #[error("stat failed: {0}")]
    Stat(String),
    #[error("is a directory")]
    IsDirectory,
    #[error("read permission denied")]
    PermissionDenied,
}

/// Existence, stat, kind and permission checks for one file target.
/// `backend_path` has already had invalid characters converted.
pub async fn check_file(
    fs: &dyn RemoteFs,
    identity: &Identity,
    backend_path: &str,
) -> Result<FileInfo, CheckFileError> {
    match fs.exists(backend_path).await {
        Ok(true) => {}
        Ok(false) => return Err(CheckFileError::NotFound),
        Err(err) => return Err(CheckFileError::Connection(err.to_string())),
    }

    let info = match fs.stat(backend_path).await {
        Ok(info) => info,
        Err(err) => return Err(CheckFileError::Stat(err.to_string())),
    };

    if info.is_dir {
        warn!(path = backend_path, "target is a directory");
        return Err(CheckFileError::IsDirectory);
    }
    if !can_read(&info, identity) {
        warn!(path = backend_path, "read denied");
        return Err(CheckFileError::PermissionDenied);
    }
    Ok(info)
}

fn map_check_error(target: &str, err: CheckFileError) -> GatewayError {
    match err {
        // "exists but unreadable" must look identical to "absent".
        CheckFileError::NotFound
        | CheckFileError::IsDirectory
        | CheckFileError::PermissionDenied => GatewayError::NotFound(target.to_string()),
        CheckFileError::Connection(message) => GatewayError::BackendUnavailable(message),
        CheckFileError::Stat(message) => GatewayError::Internal(message),
    }
}

/// Single entry point for GET, HEAD and POST (treated as GET). A
/// trailing slash selects the directory flow, anything else the file
/// flow.
pub async fn serve(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    path: Option<Path<String>>,
) -> Result<Response, HttpError> {
    let raw = path.map(|Path(inner)| inner).unwrap_or_default();
    let target = format!("/{raw}");
    let want_body = method != Method::HEAD;

    if target.ends_with('/') {
        serve_dir(&state, &target, &params, want_body).await
    } else {
        serve_file(&state, &target, &headers, want_body).await
    }
}

async fn serve_dir(
    state: &AppState,
    target: &str,
    params: &HashMap<String, String>,
    want_body: bool,
) -> Result<Response, HttpError> {
    let backend_dir = convert_invalid_char(target);

    // A directory index short-circuits the listing entirely.
    let index_path = convert_invalid_char(&join(target, &state.config.index_file));
    if let Ok(info) = check_file(state.fs.as_ref(), &state.identity, &index_path).await {
        return serve_index(state, &index_path, &info, want_body);
    }

    let info = state.fs.stat(&backend_dir).await.map_err(HttpError)?;
    if !info.is_dir {
        warn!(path = %backend_dir, "not a directory");
        return Err(GatewayError::NotFound(target.to_string()).into());
    }
    if !can_execute(&info, &state.identity) {
        warn!(path = %backend_dir, "list denied");
        return Err(GatewayError::NotFound(target.to_string()).into());
    }

    let children = state.fs.list(&backend_dir).await.map_err(HttpError)?;
    let markers = Markers {
        header: state.config.header_file.clone(),
        readme: state.config.readme_file.clone(),
    };
    let mut listing = listing::collect(&children, &state.identity, &markers);

    let order = params.get("O").map(String::as_str).unwrap_or("");
    if let Some(column) = params.get("C").and_then(|c| SortColumn::from_param(c)) {
        let direction = SortDirection::from_param(order);
        listing::sort_entries(&mut listing.dirs, column, direction);
        listing::sort_entries(&mut listing.files, column, direction);
    }

    let mut includes = PageIncludes::default();
    if listing.layout.header_present {
        if let Some(name) = &state.config.header_file {
            let content = read_include(state, target, name).await?;
            includes.header = Some(content);
        }
    }
    if listing.layout.readme_present {
        if let Some(name) = &state.config.readme_file {
            let content = read_include(state, target, name).await?;
            includes.readme = Some(content);
        }
    }

    let next_order = SortDirection::from_param(order).flipped_param();
    let page = render_listing(
        target,
        parent_dir(target).as_deref(),
        &listing,
        next_order,
        &includes,
    );

    let mut response = Response::new(if want_body {
        Body::from(page.clone())
    } else {
        Body::empty()
    });
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=UTF-8"),
    );
    headers.insert(header::CONTENT_LENGTH, header_value(&page.len().to_string())?);
    Ok(response)
}

fn serve_index(
    state: &AppState,
    backend_path: &str,
    info: &FileInfo,
    want_body: bool,
) -> Result<Response, HttpError> {
    let body = if want_body {
        streamed_body(state, backend_path.to_string(), "text/html".to_string(), DeliveryPlan::Full)
    } else {
        Body::empty()
    };
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=UTF-8"),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static(""));
    headers.insert(header::CONTENT_LENGTH, header_value(&info.size.to_string())?);
    Ok(response)
}

async fn serve_file(
    state: &AppState,
    target: &str,
    headers: &HeaderMap,
    want_body: bool,
) -> Result<Response, HttpError> {
    let backend_path = convert_invalid_char(target);
    let (_, name) = split_target(target);

    let info = check_file(state.fs.as_ref(), &state.identity, &backend_path)
        .await
        .map_err(|err| HttpError(map_check_error(target, err)))?;

    let content_type = guess_content_type(name);
    let if_range = headers.get(header::IF_RANGE).and_then(|v| v.to_str().ok());
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let plan = resolve(if_range, range, &info);

    if plan == DeliveryPlan::Unsatisfiable {
        return Err(GatewayError::RangeNotSatisfiable {
            length: info.size as u64,
        }
        .into());
    }

    let mut response = Response::new(Body::empty());
    {
        let headers = response.headers_mut();
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(header::ETAG, header_value(&weak_etag(&info))?);
        headers.insert(header::LAST_MODIFIED, header_value(&http_date(&info.modified))?);

        match &plan {
            DeliveryPlan::Full => {
                headers.insert(header::CONTENT_TYPE, header_value(content_type)?);
                headers.insert(header::CONTENT_LENGTH, header_value(&info.size.to_string())?);
            }
            DeliveryPlan::Single(r) => {
                headers.insert(header::CONTENT_TYPE, header_value(content_type)?);
                headers.insert(
                    header::CONTENT_RANGE,
                    header_value(&format!("bytes {}-{}/{}", r.start, r.end, r.total))?,
                );
                headers.insert(header::CONTENT_LENGTH, header_value(&r.len().to_string())?);
            }
            DeliveryPlan::Multi(_) => {
                // Part sizes are unknown without pre-rendering the
                // framing, so no Content-Length here.
                headers.insert(
                    header::CONTENT_TYPE,
                    header_value(&format!("multipart/byteranges; boundary={MIME_BOUNDARY}"))?,
                );
            }
            DeliveryPlan::Unsatisfiable => unreachable!(),
        }
    }

    *response.status_mut() = match plan {
        DeliveryPlan::Full => StatusCode::OK,
        _ => StatusCode::PARTIAL_CONTENT,
    };

    if want_body {
        *response.body_mut() = streamed_body(state, backend_path, content_type.to_string(), plan);
    }
    Ok(response)
}

/// Bridge the streamer onto an axum body. The copy task owns the write
/// half of a duplex pipe; when the client goes away the read half is
/// dropped, writes start failing, and the streamer winds down quietly.
fn streamed_body(state: &AppState, path: String, content_type: String, plan: DeliveryPlan) -> Body {
    let (write_half, read_half) = tokio::io::duplex(COPY_BUFFER_SIZE * 8);
    let fs = Arc::clone(&state.fs);
    tokio::spawn(async move {
        let mut sink = write_half;
        if let Err(err) = stream_plan(fs.as_ref(), &path, &content_type, &plan, &mut sink).await {
            error!(path, error = %err, "transfer failed");
        }
    });
    Body::from_stream(ReaderStream::new(read_half))
}

/// Fetch an include file the listing already saw. The marker was
/// present moments ago, so any failure here is the gateway's problem,
/// not a missing page.
async fn read_include(state: &AppState, target: &str, name: &str) -> Result<String, HttpError> {
    let path = convert_invalid_char(&join(target, name));
    let content = read_all(state.fs.as_ref(), &path).await.map_err(|err| {
        HttpError(GatewayError::Internal(format!(
            "include {path} unreadable: {err}"
        )))
    })?;
    Ok(String::from_utf8_lossy(&content).into_owned())
}

async fn read_all(fs: &dyn RemoteFs, path: &str) -> fsgate_common::Result<Vec<u8>> {
    let mut reader = fs.open(path).await?;
    let mut chunk = vec![0_u8; COPY_BUFFER_SIZE];
    let mut out = Vec::new();
    loop {
        let read = reader.read_chunk(&mut chunk).await?;
        if read == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&chunk[..read]);
    }
}

fn header_value(value: &str) -> Result<HeaderValue, HttpError> {
    HeaderValue::from_str(value)
        .map_err(|err| HttpError(GatewayError::Internal(format!("invalid header value: {err}"))))
}
