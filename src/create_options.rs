// create_options.rs
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

use crate::errors::{Error, Result};

/// The default capacity of the request channel to the network event loop.
pub const DFLT_EVENT_LOOP_CAPACITY: usize = 10;

/// The options for creating an MQTT client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    /// The address of the broker, as `protocol://host:port`
    pub server_uri: String,
    /// The client identifier sent to the broker
    pub client_id: String,
    /// The number of requests that can be queued for the event loop
    pub event_loop_capacity: usize,
}

impl CreateOptions {
    /// Creates default create options.
    pub fn new() -> CreateOptions {
        CreateOptions::default()
    }
}

impl Default for CreateOptions {
    fn default() -> CreateOptions {
        CreateOptions {
            server_uri: String::new(),
            client_id: String::new(),
            event_loop_capacity: DFLT_EVENT_LOOP_CAPACITY,
        }
    }
}

impl<'a> From<&'a str> for CreateOptions {
    fn from(server_uri: &'a str) -> Self {
        CreateOptions {
            server_uri: server_uri.to_string(),
            ..CreateOptions::default()
        }
    }
}

impl<'a, 'b> From<(&'a str, &'b str)> for CreateOptions {
    fn from((server_uri, client_id): (&'a str, &'b str)) -> Self {
        CreateOptions {
            server_uri: server_uri.to_string(),
            client_id: client_id.to_string(),
            ..CreateOptions::default()
        }
    }
}

/////////////////////////////////////////////////////////////////////////////
//                              Server URI
/////////////////////////////////////////////////////////////////////////////

/// The parts of a broker address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServerUri {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl ServerUri {
    /// Parses a URI of the form `protocol://host:port`.
    ///
    /// The protocol is one of `tcp` or `mqtt` for plain sockets, or `ssl`
    /// or `mqtts` for secure ones. When the port is missing, the standard
    /// port for the protocol is used.
    pub fn parse(uri: &str) -> Result<ServerUri> {
        let (scheme, addr) = uri.split_once("://").ok_or(Error::BadProtocol)?;

        let (secure, dflt_port) = match scheme.to_ascii_lowercase().as_str() {
            "tcp" | "mqtt" => (false, 1883),
            "ssl" | "mqtts" => (true, 8883),
            _ => return Err(Error::BadProtocol),
        };

        let addr = addr.trim_end_matches('/');

        let (host, port) = match addr.rsplit_once(':') {
            // An IPv6 literal without a port, like "[::1]"
            Some((host, _)) if host.starts_with('[') && !host.ends_with(']') => (addr, dflt_port),
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| Error::GeneralString(format!("Bad port in server URI: {}", uri)))?;
                (host, port)
            }
            None => (addr, dflt_port),
        };

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(Error::GeneralString(format!("No host in server URI: {}", uri)));
        }

        Ok(ServerUri {
            host: host.to_string(),
            port,
            secure,
        })
    }
}

/////////////////////////////////////////////////////////////////////////////
//                              Builder
/////////////////////////////////////////////////////////////////////////////

/// Builder to create the client creation options.
#[derive(Default)]
pub struct CreateOptionsBuilder {
    opts: CreateOptions,
}

impl CreateOptionsBuilder {
    /// Creates a new builder with default options.
    pub fn new() -> CreateOptionsBuilder {
        CreateOptionsBuilder::default()
    }

    /// Sets the address for the MQTT broker/server.
    ///
    /// # Arguments
    ///
    /// `server_uri` The address of the MQTT broker. It takes the form
    ///              <i>protocol://host:port</i>, where <i>protocol</i> must
    ///              be <i>tcp</i>, <i>mqtt</i>, <i>ssl</i> or <i>mqtts</i>.
    pub fn server_uri<S>(mut self, server_uri: S) -> CreateOptionsBuilder
    where
        S: Into<String>,
    {
        self.opts.server_uri = server_uri.into();
        self
    }

    /// Sets the client identifier for connection to the broker.
    pub fn client_id<S>(mut self, client_id: S) -> CreateOptionsBuilder
    where
        S: Into<String>,
    {
        self.opts.client_id = client_id.into();
        self
    }

    /// Sets the number of requests that can be queued for the network
    /// event loop before new requests are refused.
    pub fn event_loop_capacity(mut self, n: usize) -> CreateOptionsBuilder {
        self.opts.event_loop_capacity = n.max(1);
        self
    }

    /// Finalize the builder to create the options.
    pub fn finalize(self) -> CreateOptions {
        self.opts
    }
}

/////////////////////////////////////////////////////////////////////////////
//                              Unit Tests
/////////////////////////////////////////////////////////////////////////////
