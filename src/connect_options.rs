// connect_options.rs
//
// The set of options for connecting to an MQTT broker.
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

//! Connect options.
//! This contains the structures to define the options for connecting to the
//! MQTT broker/server.

use std::time::Duration;

use crate::{message::Message, ssl_options::SslOptions, will_options::WillOptions};

/// The default keep alive interval.
pub const DFLT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(60);

/// The default time allowed for the connection to complete.
pub const DFLT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// The default maximum number of in-flight messages.
pub const DFLT_MAX_INFLIGHT: u16 = 10;

/////////////////////////////////////////////////////////////////////////////
// Connections

/// The collection of options for connecting to a broker.
/// This can be constructed using a
/// [ConnectOptionsBuilder](struct.ConnectOptionsBuilder.html).
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    keep_alive_interval: Duration,
    clean_session: bool,
    max_inflight: u16,
    connect_timeout: Duration,
    user_name: Option<String>,
    password: Option<String>,
    will: Option<WillOptions>,
    ssl: Option<SslOptions>,
}

impl ConnectOptions {
    /// Creates a new, default set of connect options.
    pub fn new() -> ConnectOptions {
        ConnectOptions::default()
    }

    /// Gets the keep alive interval.
    pub fn keep_alive_interval(&self) -> Duration {
        self.keep_alive_interval
    }

    /// Gets the "clean session" setting in the options.
    pub fn clean_session(&self) -> bool {
        self.clean_session
    }

    /// This sets the "clean session" behavior for connecting to the server.
    /// When set to true, this directs the server to throw away any state
    /// related to the client, as determined by the client identifier.
    /// When set to false, the server keeps the state information and
    /// resumes the previous session.
    pub fn set_clean_session(&mut self, clean: bool) {
        self.clean_session = clean;
    }

    /// Gets the maximum number of messages that can be in-flight at once.
    pub fn max_inflight(&self) -> u16 {
        self.max_inflight
    }

    /// Gets the time allowed for the connection to complete.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Gets the user name, if any.
    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    /// Gets the password, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Gets the Last Will and Testament, if any.
    pub fn will_options(&self) -> Option<&WillOptions> {
        self.will.as_ref()
    }

    /// Gets the SSL options, if any.
    pub fn ssl_options(&self) -> Option<&SslOptions> {
        self.ssl.as_ref()
    }
}

impl Default for ConnectOptions {
    fn default() -> ConnectOptions {
        ConnectOptions {
            keep_alive_interval: DFLT_KEEP_ALIVE_INTERVAL,
            clean_session: true,
            max_inflight: DFLT_MAX_INFLIGHT,
            connect_timeout: DFLT_CONNECT_TIMEOUT,
            user_name: None,
            password: None,
            will: None,
            ssl: None,
        }
    }
}

/////////////////////////////////////////////////////////////////////////////
//                              Builder
/////////////////////////////////////////////////////////////////////////////

/// Builder to create the options to connect to the MQTT server.
#[derive(Default)]
pub struct ConnectOptionsBuilder {
    opts: ConnectOptions,
}

// Durations here have a resolution of seconds, and can't be zero.
fn whole_secs(dur: Duration) -> Duration {
    Duration::from_secs(dur.as_secs().max(1))
}

impl ConnectOptionsBuilder {
    /// Creates a new `ConnectOptionsBuilder`
    pub fn new() -> ConnectOptionsBuilder {
        ConnectOptionsBuilder::default()
    }

    /// Sets the keep alive interval for the client session.
    ///
    /// # Arguments
    ///
    /// `keep_alive_interval` The maximum time that should pass without
    ///                       communication between the client and server.
    ///                       This has a resolution in seconds.
    pub fn keep_alive_interval(&mut self, keep_alive_interval: Duration) -> &mut ConnectOptionsBuilder {
        self.opts.keep_alive_interval = whole_secs(keep_alive_interval);
        self
    }

    /// Sets the 'clean session' flag to send to the broker.
    ///
    /// # Arguments
    ///
    /// `clean` Whether the broker should remove any previously-stored
    ///         information for this client.
    pub fn clean_session(&mut self, clean: bool) -> &mut ConnectOptionsBuilder {
        self.opts.clean_session = clean;
        self
    }

    /// Sets the maximum number of in-flight messages that can be
    /// simultaneously handled by this client.
    ///
    /// # Arguments
    ///
    /// `max_inflight` The maximum number of messages that can be in-flight
    ///                at any given time with this client.
    pub fn max_inflight(&mut self, max_inflight: u16) -> &mut ConnectOptionsBuilder {
        self.opts.max_inflight = max_inflight.max(1);
        self
    }

    /// Sets the LWT options for the connection.
    pub fn will_options(&mut self, will: WillOptions) -> &mut ConnectOptionsBuilder {
        self.opts.will = Some(will);
        self
    }

    /// Sets the LWT message for the connection.
    ///
    /// # Arguments
    ///
    /// `will` The message that the server publishes if the connection is
    ///        lost unexpectedly.
    pub fn will_message(&mut self, will: Message) -> &mut ConnectOptionsBuilder {
        self.opts.will = Some(WillOptions::from(will));
        self
    }

    /// Sets the SSL options for the connection.
    ///
    /// # Arguments
    ///
    /// `ssl` The SSL options for the connection.
    pub fn ssl_options(&mut self, ssl: SslOptions) -> &mut ConnectOptionsBuilder {
        self.opts.ssl = Some(ssl);
        self
    }

    /// Sets the user name for authentication with the broker.
    /// This works with the password.
    pub fn user_name<S>(&mut self, user_name: S) -> &mut ConnectOptionsBuilder
    where
        S: Into<String>,
    {
        self.opts.user_name = Some(user_name.into());
        self
    }

    /// Sets the password for authentication with the broker.
    /// This works with the user name.
    pub fn password<S>(&mut self, password: S) -> &mut ConnectOptionsBuilder
    where
        S: Into<String>,
    {
        self.opts.password = Some(password.into());
        self
    }

    /// Sets the time interval to allow the connect to complete.
    ///
    /// # Arguments
    ///
    /// `timeout` The time interval to allow the connect to
    ///           complete. This has a resolution of seconds.
    pub fn connect_timeout(&mut self, timeout: Duration) -> &mut ConnectOptionsBuilder {
        self.opts.connect_timeout = whole_secs(timeout);
        self
    }

    /// Finalize the builder to create the connect options.
    pub fn finalize(&self) -> ConnectOptions {
        self.opts.clone()
    }
}

/////////////////////////////////////////////////////////////////////////////
//                              Unit Tests
/////////////////////////////////////////////////////////////////////////////
