// client.rs
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

//! The client interface used by the publisher.
//!
//! This is the set of operations needed to run a connect, publish,
//! disconnect sequence. The `AsyncClient` implements it, but it can be
//! implemented by anything that can hand back tokens for those requests.

use std::sync::Arc;

use crate::{
    async_client::AsyncClient,
    callback::Callback,
    connect_options::ConnectOptions,
    disconnect_options::DisconnectOptions,
    message::Message,
    token::{DeliveryToken, Token},
};

/// An MQTT client that reports the outcome of each request with a token.
pub trait MqttClient {
    /// Registers the callback for asynchronous events.
    fn set_callback(&mut self, cb: Arc<dyn Callback>);

    /// Starts connecting to the broker.
    fn connect(&self, opts: ConnectOptions) -> Token;

    /// Starts publishing a message.
    fn publish(&self, msg: Message) -> DeliveryToken;

    /// Starts disconnecting from the broker.
    fn disconnect(&self, opts: Option<DisconnectOptions>) -> Token;
}

impl MqttClient for AsyncClient {
    fn set_callback(&mut self, cb: Arc<dyn Callback>) {
        AsyncClient::set_callback(self, cb)
    }

    fn connect(&self, opts: ConnectOptions) -> Token {
        AsyncClient::connect(self, opts)
    }

    fn publish(&self, msg: Message) -> DeliveryToken {
        AsyncClient::publish(self, msg)
    }

    fn disconnect(&self, opts: Option<DisconnectOptions>) -> Token {
        AsyncClient::disconnect(self, opts)
    }
}
