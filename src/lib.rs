// lib.rs
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

//! A secure MQTT publisher.
//!
//! This connects to an MQTT broker over SSL/TLS with a last will and
//! testament, publishes a message, and disconnects. The client API
//! follows the token-based style of the Paho MQTT libraries: each request
//! returns a `Token` that can be waited on or used as a future, while the
//! network traffic is handled on a separate thread.

#[macro_use]
extern crate log;

pub use crate::{
    async_client::*,   //{AsyncClient, ConnectionState}
    callback::*,       //{Callback}
    client::*,         //{MqttClient}
    connect_options::*, //{ConnectOptions, ConnectOptionsBuilder}
    create_options::*, //{CreateOptions, CreateOptionsBuilder}
    disconnect_options::*, //{DisconnectOptions, DisconnectOptionsBuilder}
    errors::*,         //{Error, Result, ConnectReturnCode}
    message::*,        //{Message, MessageBuilder}
    ssl_options::*,    //{SslOptions, SslOptionsBuilder}
    token::*,          //{Token, DeliveryToken}
    will_options::*,   //{WillOptions}
};

/// The asynchronous client
pub mod async_client;
/// Callbacks for asynchronous client events
pub mod callback;
/// The client interface used by the publisher
pub mod client;
/// Options for connecting to the broker
pub mod connect_options;
/// Options for creating a client
pub mod create_options;
/// Options for disconnecting from the broker
pub mod disconnect_options;
/// The crate errors
pub mod errors;
/// The MQTT message
pub mod message;
/// Options for SSL/TLS connections
pub mod ssl_options;
/// The publisher
pub mod ssl_publish;
/// Tokens to track asynchronous operations
pub mod token;
/// The last will and testament
pub mod will_options;
