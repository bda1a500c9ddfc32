use std::ops::{Deref, DerefMut};

use log::info;

use super::session::Session;
use super::types::ConnectionParameters;
use crate::error_handling::types::SessionError;

/// A session that is connected for as long as this value lives.
///
/// Suites that share one target connection create it once, run their checks
/// through `Deref`, and get the disconnect on drop even when a test panics.
pub struct ConnectedSession {
    session: Session,
}

impl ConnectedSession {
    pub fn establish(
        mut session: Session,
        params: &ConnectionParameters,
    ) -> Result<Self, SessionError> {
        info!("Setting up T32 session");
        session.establish(params)?;
        Ok(Self { session })
    }

    /// Disconnects now instead of at drop.
    pub fn close(mut self) {
        self.session.disconnect();
    }
}

impl Deref for ConnectedSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl DerefMut for ConnectedSession {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}

impl Drop for ConnectedSession {
    fn drop(&mut self) {
        if self.session.is_connected() {
            info!("Tearing down T32 session");
            self.session.disconnect();
        }
    }
}
