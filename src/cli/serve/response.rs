//! HTTP response handlers.
//!
//! `HEAD` requests go through the same handlers: tiny_http drops the body
//! and keeps the headers (including `Content-Length`).

use std::io::Cursor;
use std::path::Path;

use anyhow::{Result, anyhow};
use tiny_http::{Header, Request, Response, StatusCode};

use super::path::{DataRequest, source_map_url};
use crate::embed::{CLIENT_JS, ClientVars};
use crate::store::{Delta, Version};
use crate::utils::date::DateTimeUtc;
use crate::utils::mime::{self, types};

/// Redirect a "latest" lookup to the pinned version.
pub fn respond_redirect(request: Request, location: &str) -> Result<()> {
    let response = Response::empty(StatusCode(302))
        .with_header(header("Location", location)?)
        .with_header(header("Cache-Control", "no-cache")?);
    request.respond(response)?;
    Ok(())
}

/// Serve one version's payload (or auxiliary payload) for a pinned lookup.
///
/// A source map request for a version without one is a 404.
pub fn respond_version(request: Request, version: &Version, lookup: &DataRequest) -> Result<()> {
    let (body, content_type) = if lookup.map {
        match version.map() {
            Some(map) => (map, types::JSON),
            None => return respond_not_found(request),
        }
    } else {
        (version.data(), mime::from_path(Path::new(&lookup.name)))
    };

    let last_modified = DateTimeUtc::from_system_time(version.created()).to_rfc2822();
    if header_value(&request, "If-Modified-Since").is_some_and(|since| since == last_modified) {
        let response = Response::empty(StatusCode(304))
            .with_header(header("Last-Modified", &last_modified)?)
            .with_header(header("Cache-Control", "max-age=3600")?);
        request.respond(response)?;
        return Ok(());
    }

    let mut response = Response::from_data(body.to_vec())
        .with_header(header("Content-Type", content_type)?)
        .with_header(header("Cache-Control", "max-age=3600")?)
        .with_header(header("Last-Modified", &last_modified)?);
    if !lookup.map && version.map().is_some() {
        let url = source_map_url(&lookup.name, version.stamp().as_str());
        response = response.with_header(header("SourceMap", &url)?);
    }

    request.respond(response)?;
    Ok(())
}

/// Current stamp of every artifact.
pub fn respond_manifest(request: Request, manifest: &Delta) -> Result<()> {
    let body = serde_json::to_vec(manifest)?;
    let response = Response::from_data(body)
        .with_header(header("Content-Type", types::JSON)?)
        .with_header(header("Cache-Control", "no-cache")?);
    request.respond(response)?;
    Ok(())
}

/// Subscriber script pointed at the bound WebSocket port.
pub fn respond_client_js(request: Request, ws_port: u16) -> Result<()> {
    let body = CLIENT_JS.render(&ClientVars { ws_port });
    let response = Response::from_string(body)
        .with_header(header("Content-Type", types::JAVASCRIPT)?)
        .with_header(header("Cache-Control", "no-cache")?);
    request.respond(response)?;
    Ok(())
}

pub fn respond_not_found(request: Request) -> Result<()> {
    send_plain(request, 404, "404 Not Found")
}

pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    let response = plain(405, "405 Method Not Allowed")?.with_header(header("Allow", "GET, HEAD")?);
    request.respond(response)?;
    Ok(())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_plain(request, 503, "503 Service Unavailable")
}

fn send_plain(request: Request, status: u16, body: &str) -> Result<()> {
    request.respond(plain(status, body)?)?;
    Ok(())
}

fn plain(status: u16, body: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    Ok(Response::from_string(body)
        .with_status_code(StatusCode(status))
        .with_header(header("Content-Type", types::PLAIN)?))
}

fn header_value<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

fn header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes())
        .map_err(|()| anyhow!("invalid header {key}: {value}"))
}
