// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reusable transport session and its ownership tag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::Client;

use crate::error::TransportError;

/// A pooled HTTP client shared by every request of one or more chargers.
///
/// `reqwest::Client` already pools connections; `Session` adds an explicit
/// closed flag so ownership rules can be enforced. Once closed, every request
/// issued through the session fails with [`TransportError::SessionClosed`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use openevse_lib::Charger;
/// use openevse_lib::protocol::Session;
///
/// # async fn example() -> openevse_lib::Result<()> {
/// let session = Arc::new(Session::new()?);
///
/// // Both chargers borrow the same session and will never close it
/// let garage = Charger::http("garage.local").with_session(Arc::clone(&session)).build()?;
/// let driveway = Charger::http("driveway.local").with_session(Arc::clone(&session)).build()?;
///
/// garage.update().await?;
/// driveway.update().await?;
///
/// garage.close().await;
/// driveway.close().await;
/// assert!(!session.is_closed());
///
/// session.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Session {
    client: Client,
    closed: AtomicBool,
}

impl Session {
    /// Creates a session with a default `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder().build().map_err(TransportError::Http)?;
        Ok(Self::with_client(client))
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the underlying client if the session is still open.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::SessionClosed`] once the session is closed.
    pub fn client(&self) -> Result<&Client, TransportError> {
        if self.is_closed() {
            return Err(TransportError::SessionClosed);
        }
        Ok(&self.client)
    }

    /// Closes the session. Closing twice is a no-op.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Transport session closed");
        }
    }

    /// Returns whether the session has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// A session tagged with who is responsible for closing it.
///
/// Not `Clone`: exactly one handle exists per charger, so an owned session is
/// released at most once.
#[derive(Debug)]
pub enum SessionHandle {
    /// Created by this crate; closed on release.
    Owned(Arc<Session>),
    /// Supplied by the application; never closed by this crate.
    Borrowed(Arc<Session>),
}

impl SessionHandle {
    /// Creates a fresh owned session.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn owned() -> Result<Self, TransportError> {
        Ok(Self::Owned(Arc::new(Session::new()?)))
    }

    /// Returns the session regardless of ownership.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        match self {
            Self::Owned(session) | Self::Borrowed(session) => session,
        }
    }

    /// Returns `true` if this crate owns the session.
    #[must_use]
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Releases the handle: closes an owned session, leaves a borrowed one open.
    pub fn release(&self) {
        match self {
            Self::Owned(session) => session.close(),
            Self::Borrowed(_) => {
                tracing::debug!("Leaving externally supplied session open");
            }
        }
    }
}
