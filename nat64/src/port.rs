// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

use std::fmt::{Display, Formatter};

/// Error raised when building a [`NatPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum NatPortError {
    /// Port zero cannot be assigned to a binding.
    #[error("port 0 is not usable")]
    ZeroPort,
}

/// A NAT-assignable transport port (or ICMP echo identifier slot).
///
/// Only zero is rejected: static sessions may legitimately map privileged
/// ports, so no lower bound beyond the wire format is imposed here. Pool
/// policy lives in [`crate::PortAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NatPort(u16);

impl NatPort {
    /// Validate a raw port value.
    ///
    /// # Errors
    ///
    /// Returns [`NatPortError::ZeroPort`] for port zero.
    pub fn new_checked(port: u16) -> Result<NatPort, NatPortError> {
        if port == 0 {
            return Err(NatPortError::ZeroPort);
        }
        Ok(Self(port))
    }

    /// The raw port value.
    #[must_use]
    pub fn as_u16(self) -> u16 {
        self.0
    }
}

impl Display for NatPort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
