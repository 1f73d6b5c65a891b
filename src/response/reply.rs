// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Acknowledgements of writes and RAPI commands.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, ParseError};

/// Reply of a configuration write, such as `{"msg": "done"}`.
///
/// # Examples
///
/// ```
/// use openevse_lib::response::CommandReply;
/// use serde_json::json;
///
/// let reply = CommandReply::from_value(&json!({"msg": "no change"})).unwrap();
/// assert!(reply.is_applied());
///
/// let reply = CommandReply::from_value(&json!({"msg": "failed"})).unwrap();
/// assert!(!reply.is_applied());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandReply {
    #[serde(default)]
    msg: Option<String>,
}

impl CommandReply {
    /// Parses a reply body.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the body is not a JSON object.
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        if !value.is_object() {
            return Err(ParseError::UnexpectedFormat(format!(
                "expected a JSON object, got {value}"
            )));
        }
        Self::deserialize(value).map_err(ParseError::Json)
    }

    /// Returns the message, if any.
    #[must_use]
    pub fn msg(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    /// Returns `true` if the charger reported `done` or `no change`.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self.msg(), Some("done" | "no change"))
    }

    /// Turns a negative acknowledgement into [`Error::CommandRejected`].
    ///
    /// # Errors
    ///
    /// Returns `Error::CommandRejected` unless [`is_applied`](Self::is_applied).
    pub fn into_result(self) -> Result<Self, Error> {
        if self.is_applied() {
            Ok(self)
        } else {
            Err(Error::CommandRejected(
                self.msg.unwrap_or_else(|| "no message".to_string()),
            ))
        }
    }
}

/// Reply of a RAPI command, such as `{"cmd": "$GS", "ret": "$OK 3 1234"}`.
///
/// # Examples
///
/// ```
/// use openevse_lib::response::RapiReply;
/// use serde_json::json;
///
/// let reply = RapiReply::from_value(&json!({"cmd": "$SC 16 N", "ret": "$OK^20"})).unwrap();
/// assert!(reply.is_ok());
/// assert_eq!(reply.ret(), "$OK^20");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RapiReply {
    cmd: String,
    ret: String,
}

impl RapiReply {
    /// Parses a reply body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandRejected`] with the charger's `msg` if the reply
    /// has no `ret`, and [`Error::Parse`] if it is otherwise malformed.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        if value.get("ret").is_none() {
            let msg = value
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(Error::CommandRejected(msg));
        }
        Self::deserialize(value).map_err(|e| Error::Parse(ParseError::Json(e)))
    }

    /// Returns the command as the charger echoed it.
    #[must_use]
    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    /// Returns the raw response line.
    #[must_use]
    pub fn ret(&self) -> &str {
        &self.ret
    }

    /// Returns `true` if the controller answered `$OK`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.ret.starts_with("$OK")
    }
}
