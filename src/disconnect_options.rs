// disconnect_options.rs
//
// This file is part of the secure MQTT publisher.
//

/*******************************************************************************
 * Copyright (c) 2017-2023 Frank Pagliughi <fpagliughi@mindspring.com>
 *
 * All rights reserved. This program and the accompanying materials
 * are made available under the terms of the Eclipse Public License v2.0
 * and Eclipse Distribution License v1.0 which accompany this distribution.
 *
 * The Eclipse Public License is available at
 *    http://www.eclipse.org/legal/epl-v20.html
 * and the Eclipse Distribution License is available at
 *   http://www.eclipse.org/org/documents/edl-v10.php.
 *
 * Contributors:
 *    Frank Pagliughi - initial implementation and documentation
 *******************************************************************************/

#![deny(missing_docs)]

//! Disconnect options.
//! This contains the structures to define the options for disconnecting from
//! the MQTT broker/server.

use std::time::Duration;

/// The collection of options for disconnecting from the client.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectOptions {
    timeout: Duration,
}

impl DisconnectOptions {
    /// Create a new `DisconnectOptions`
    pub fn new() -> DisconnectOptions {
        DisconnectOptions::default()
    }

    /// Gets the time allowed for in-flight messages to complete before
    /// the session is closed.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/////////////////////////////////////////////////////////////////////////////
//                              Builder
/////////////////////////////////////////////////////////////////////////////

/// Builder to create the options for disconnecting from an MQTT server.
#[derive(Default)]
pub struct DisconnectOptionsBuilder {
    opts: DisconnectOptions,
}

impl DisconnectOptionsBuilder {
    /// Create a new `DisconnectOptionsBuilder`
    pub fn new() -> DisconnectOptionsBuilder {
        DisconnectOptionsBuilder::default()
    }

    /// Sets the time interval to allow the disconnect to complete.
    /// This specifies the time to allow in-flight messages to complete.
    ///
    /// # Arguments
    ///
    /// `timeout` The time interval to allow the disconnect to
    ///           complete. This has a resolution of milliseconds.
    pub fn timeout(&mut self, timeout: Duration) -> &mut DisconnectOptionsBuilder {
        self.opts.timeout = Duration::from_millis(timeout.as_millis() as u64);
        self
    }

    /// Finalize the builder to create the disconnect options.
    pub fn finalize(&self) -> DisconnectOptions {
        self.opts
    }
}

/////////////////////////////////////////////////////////////////////////////
//                              Unit Tests
/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let opts = DisconnectOptions::new();
        assert_eq!(Duration::ZERO, opts.timeout());
    }

    #[test]
    fn test_timeout() {
        let opts = DisconnectOptionsBuilder::new()
            .timeout(Duration::from_micros(1_500_700))
            .finalize();
        assert_eq!(Duration::from_millis(1500), opts.timeout());
    }
}
