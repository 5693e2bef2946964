//! Request URL to route resolution.
//!
//! ```text
//! /data/game.js               -> Data { name: "/game.js", map: false, stamp: None }
//! /data/game.js.map?t=<stamp> -> Data { name: "/game.js", map: true,  stamp: Some(..) }
//! /manifest                   -> Manifest
//! /livestamp.js               -> Client
//! ```

use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::actor::messages::validate_name;
use crate::embed::CLIENT_JS_PATH;

const DATA_PREFIX: &str = "/data";
const MAP_SUFFIX: &str = ".map";

/// A point lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
    /// Artifact name, slash-rooted.
    pub name: String,
    /// Whether the auxiliary payload (`<name>.map`) was requested.
    pub map: bool,
    /// Exact version, or `None` for "latest".
    pub stamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Data(DataRequest),
    Manifest,
    /// The embedded subscriber script.
    Client,
    NotFound,
}

impl Route {
    /// Resolve a raw request URL (path plus optional query).
    pub fn parse(url: &str) -> Self {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let Ok(path) = percent_decode_str(path).decode_utf8() else {
            return Self::NotFound;
        };

        if path == "/manifest" {
            return Self::Manifest;
        }
        if path == CLIENT_JS_PATH {
            return Self::Client;
        }

        let Some(name) = path.strip_prefix(DATA_PREFIX) else {
            return Self::NotFound;
        };
        let (name, map) = match name.strip_suffix(MAP_SUFFIX) {
            Some(name) => (name, true),
            None => (name, false),
        };
        if validate_name(name).is_err() {
            return Self::NotFound;
        }

        let stamp = form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "t")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());

        Self::Data(DataRequest {
            name: name.to_owned(),
            map,
            stamp,
        })
    }
}

impl DataRequest {
    /// Path of this request as the client addressed it, without query.
    pub fn path(&self) -> String {
        let suffix = if self.map { MAP_SUFFIX } else { "" };
        format!("{DATA_PREFIX}{}{suffix}", self.name)
    }

    /// The same request pinned to `stamp`.
    pub fn location(&self, stamp: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("t", stamp)
            .finish();
        format!("{}?{query}", self.path())
    }
}

/// Relative URL of the auxiliary payload of `name` at `stamp`, as sent in
/// the `SourceMap` header.
pub fn source_map_url(name: &str, stamp: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("t", stamp)
        .finish();
    format!("{base}{MAP_SUFFIX}?{query}")
}
