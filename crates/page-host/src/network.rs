//! Network surface: fetch-style calls, request-object (XHR-style) calls, resource timing.

use std::sync::Arc;

use futures::future::BoxFuture;
use playguard_core_types::CapabilitySlot;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::HostError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Method carried by a request object passed as the first argument.
    #[serde(default)]
    pub method: Option<String>,
    /// Method from the init dictionary; wins over `method`.
    #[serde(default)]
    pub init_method: Option<String>,
    #[serde(default)]
    pub body: Option<Vec<u8>>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_init_method(mut self, method: impl Into<String>) -> Self {
        self.init_method = Some(method.into());
        self
    }

    pub fn effective_method(&self) -> String {
        self.init_method
            .clone()
            .or_else(|| self.method.clone())
            .unwrap_or_else(|| "GET".to_string())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Basic,
    Cors,
    Default,
    Error,
    Opaque,
    OpaqueRedirect,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Cors => "cors",
            Self::Default => "default",
            Self::Error => "error",
            Self::Opaque => "opaque",
            Self::OpaqueRedirect => "opaqueredirect",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
    pub status: u16,
    pub ok: bool,
    #[serde(default)]
    pub kind: ResponseType,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            ok: (200..=299).contains(&status),
            kind: ResponseType::Basic,
            body: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type FetchFuture = BoxFuture<'static, Result<FetchResponse, FetchError>>;
pub type FetchFn = Arc<dyn Fn(FetchRequest) -> FetchFuture + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XhrRequest {
    pub method: String,
    pub url: String,
}

impl XhrRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
        }
    }
}

/// Final state of a request-object call, delivered on load-end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XhrOutcome {
    pub status: u16,
    pub failed: bool,
}

pub type XhrCompletion = Box<dyn FnOnce(XhrOutcome) + Send>;
pub type XhrSendFn = Arc<dyn Fn(XhrRequest, XhrCompletion) -> Result<(), HostError> + Send + Sync>;

/// One resource-timing record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub name: String,
    pub initiator_type: String,
    pub duration_ms: f64,
    pub transfer_size: u64,
    pub encoded_body_size: u64,
}

pub type ResourceCallback = Arc<dyn Fn(&[ResourceEntry]) + Send + Sync>;

/// The page's outgoing-call entry points.
#[derive(Debug, Default)]
pub struct NetworkSurface {
    pub fetch: CapabilitySlot<FetchFn>,
    pub xhr_send: CapabilitySlot<XhrSendFn>,
}

impl NetworkSurface {
    pub fn new(fetch: Option<FetchFn>, xhr_send: Option<XhrSendFn>) -> Self {
        Self {
            fetch: CapabilitySlot::from_option(fetch),
            xhr_send: CapabilitySlot::from_option(xhr_send),
        }
    }

    /// Page-side call path: whatever currently sits in the fetch slot handles the request.
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let Some(fetch) = self.fetch.get() else {
            return Err(FetchError::new("fetch is not available"));
        };
        fetch(request).await
    }

    pub fn send_xhr(&self, request: XhrRequest, completion: XhrCompletion) -> Result<(), HostError> {
        let send = self
            .xhr_send
            .get()
            .ok_or(HostError::EntryPointMissing("XMLHttpRequest.send"))?;
        send(request, completion)
    }
}
