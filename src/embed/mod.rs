//! Embedded client assets.
//!
//! ```ignore
//! use embed::{CLIENT_JS, ClientVars};
//!
//! let js = CLIENT_JS.render(&ClientVars { ws_port: 35729 });
//! ```

use std::marker::PhantomData;

/// Trait for template variable sets
pub trait TemplateVars {
    fn apply(&self, content: &str) -> String;
}

/// Template with typed variable injection
#[derive(Debug, Clone, Copy)]
pub struct Template<V> {
    content: &'static str,
    _marker: PhantomData<V>,
}

impl<V> Template<V> {
    pub const fn new(content: &'static str) -> Self {
        Self {
            content,
            _marker: PhantomData,
        }
    }
}

impl<V: TemplateVars> Template<V> {
    pub fn render(&self, vars: &V) -> String {
        vars.apply(self.content)
    }
}

/// Variables for client.js.
pub struct ClientVars {
    pub ws_port: u16,
}

impl TemplateVars for ClientVars {
    fn apply(&self, content: &str) -> String {
        content.replace("__LIVESTAMP_WS_PORT__", &self.ws_port.to_string())
    }
}

/// URL the client script is served at.
pub const CLIENT_JS_PATH: &str = "/livestamp.js";

/// Subscriber script with WebSocket port injection.
pub const CLIENT_JS: Template<ClientVars> = Template::new(include_str!("client.js"));
