//! Request/response payloads a transport carries to and from the service
//!
//! Both enums are externally tagged: the variant name in snake_case is the
//! single key of the JSON object (`{"format": {...}}`), unit variants are
//! bare strings (`"ping"`).

use super::{DebugSnapshot, FailureKind, FormatRequest, FormatResult, FormatService};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Acknowledgement sent for a flush
pub const FLUSH_ACK: &str = "success";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Request {
    Format {
        cwd: PathBuf,
        args: Vec<String>,
        #[serde(default)]
        client_env: BTreeMap<String, String>,
        source_text: String,
    },
    FlushCache,
    DebugInfo {
        cwd: PathBuf,
        #[serde(default)]
        args: Vec<String>,
    },
    Ping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Formatted { text: String },
    Failed { kind: FailureKind, message: String },
    Ok { message: String },
    DebugInfo { snapshot: DebugSnapshot },
    Pong,
}

impl From<FormatResult> for Response {
    fn from(result: FormatResult) -> Self {
        match result {
            FormatResult::Formatted { text } => Self::Formatted { text },
            FormatResult::Failed { kind, message } => Self::Failed { kind, message },
        }
    }
}

impl FormatService {
    /// Route one request to the matching operation
    pub async fn dispatch(&self, request: Request) -> Response {
        match request {
            Request::Format {
                cwd,
                args,
                client_env,
                source_text,
            } => self
                .handle_format(FormatRequest {
                    cwd,
                    args,
                    client_env,
                    source_text,
                })
                .await
                .into(),
            Request::FlushCache => {
                self.flush_cache();
                Response::Ok {
                    message: FLUSH_ACK.to_string(),
                }
            }
            Request::DebugInfo { cwd, args } => Response::DebugInfo {
                snapshot: self.debug_info(&cwd, &args).await,
            },
            Request::Ping => Response::Pong,
        }
    }
}
