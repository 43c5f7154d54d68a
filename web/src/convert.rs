//! Conversions between `http` types and the adapter's request/response shapes.

use crate::error::ServeError;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use http_body_util::LengthLimitError;
use std::error::Error;
use vellox_core::RawHeaders;
use vellox_runtime::{Request, Response};

/// Read an inbound request fully and describe it for the adapter.
///
/// # Errors
///
/// Returns a `413` [`ServeError`] if the body exceeds `body_limit`, or a
/// `400` if it cannot be read.
pub async fn request_from_http(
    request: http::Request<Body>,
    body_limit: usize,
) -> Result<Request, ServeError> {
    let (parts, body) = request.into_parts();

    let body = to_bytes(body, body_limit).await.map_err(|err| {
        if exceeds_limit(&err) {
            ServeError::payload_too_large(body_limit)
        } else {
            ServeError::bad_request("Failed to read request body").with_source(err)
        }
    })?;

    let headers: RawHeaders = parts
        .headers
        .iter()
        .map(|(name, value)| (name.as_str().as_bytes().to_vec(), value.as_bytes().to_vec()))
        .collect();

    Ok(Request::new(parts.method.as_str(), parts.uri.path())
        .with_query_string(parts.uri.query().unwrap_or_default())
        .with_headers(headers)
        .with_body(body.to_vec()))
}

fn exceeds_limit(err: &(dyn Error + 'static)) -> bool {
    std::iter::successors(Some(err), |err: &&(dyn Error + 'static)| (*err).source()).any(|err| err.is::<LengthLimitError>())
}

/// Build the outbound HTTP response, decoding base64 bodies back to bytes.
///
/// # Errors
///
/// Returns a `500` [`ServeError`] if the application produced a status code,
/// header or body that HTTP cannot carry.
pub fn response_to_http(response: &Response) -> Result<axum::response::Response, ServeError> {
    let status = StatusCode::from_u16(response.status).map_err(|err| {
        ServeError::internal("Application sent an invalid status code").with_source(err)
    })?;

    let body = response.body_bytes().map_err(|err| {
        ServeError::internal("Response body could not be decoded").with_source(err)
    })?;

    let mut out = axum::response::Response::new(Body::from(body));
    *out.status_mut() = status;

    for (name, value) in &response.headers {
        let name = HeaderName::from_bytes(name).map_err(|err| {
            ServeError::internal("Application sent an invalid header name").with_source(err)
        })?;
        let value = HeaderValue::from_bytes(value).map_err(|err| {
            ServeError::internal("Application sent an invalid header value").with_source(err)
        })?;
        out.headers_mut().append(name, value);
    }

    Ok(out)
}
