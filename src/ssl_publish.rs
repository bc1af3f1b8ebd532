// ssl_publish.rs
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

//! The secure publisher.
//!
//! This connects to a broker over SSL/TLS, registering a last will and
//! testament, publishes a single message, and then disconnects.
//!
//! It uses the trust store and client certificate from the Paho C test
//! suite (paho.mqtt.c/test/ssl), and assumes there are copies of them in
//! the current directory.

use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::{
    callback::Callback,
    client::MqttClient,
    connect_options::{ConnectOptions, ConnectOptionsBuilder},
    errors::{Error, Result},
    message::Message,
    ssl_options::SslOptionsBuilder,
    token::DeliveryToken,
};

/// The default broker address.
pub const DFLT_SERVER_URI: &str = "mqtts://localhost:18884";
/// The default client identifier.
pub const DFLT_CLIENT_ID: &str = "ssl_publish_cpp";

/// The file with the CA certificates that the broker's certificate is
/// checked against.
pub const TRUST_STORE: &str = "test-root-ca.crt";
/// The file with the client certificate and private key.
pub const KEY_STORE: &str = "client.pem";

/// The default user name.
pub const USER_NAME: &str = "testuser";
/// The default password.
pub const PASSWORD: &str = "testpassword";

/// The topic of the last will and testament.
pub const LWT_TOPIC: &str = "events/disconnect";
/// The payload of the last will and testament.
pub const LWT_PAYLOAD: &str = "Last will and testament.";

/// The default topic for the message.
pub const TOPIC: &str = "hello";
/// The default message payload.
pub const PAYLOAD: &str = "Hello secure C++ world!";

/// The quality of service for the message and the LWT.
pub const QOS: i32 = 1;

/// How long to wait for the message to be delivered.
pub const TIMEOUT: Duration = Duration::from_secs(10);

// Where to find the stores, if they're missing.
const TRUST_STORE_SOURCE: &str = "paho.mqtt.c/test/ssl/test-root-ca.crt";
const KEY_STORE_SOURCE: &str = "paho.mqtt.c/test/ssl/client.pem";

/////////////////////////////////////////////////////////////////////////////
// Configuration

/// The settings for one run of the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    /// The address of the broker
    pub server_uri: String,
    /// The client identifier
    pub client_id: String,
    /// Path to the CA certificates
    pub trust_store: PathBuf,
    /// Path to the client certificate and key
    pub key_store: PathBuf,
    pub user_name: String,
    pub password: String,
    pub lwt_topic: String,
    pub lwt_payload: String,
    pub topic: String,
    pub payload: String,
    pub qos: i32,
    /// How long to wait for the publish to complete
    pub timeout: Duration,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            server_uri: DFLT_SERVER_URI.to_string(),
            client_id: DFLT_CLIENT_ID.to_string(),
            trust_store: PathBuf::from(TRUST_STORE),
            key_store: PathBuf::from(KEY_STORE),
            user_name: USER_NAME.to_string(),
            password: PASSWORD.to_string(),
            lwt_topic: LWT_TOPIC.to_string(),
            lwt_payload: LWT_PAYLOAD.to_string(),
            topic: TOPIC.to_string(),
            payload: PAYLOAD.to_string(),
            qos: QOS,
            timeout: TIMEOUT,
        }
    }
}

impl PublishConfig {
    /// The last will and testament, published by the broker if the
    /// connection is lost unexpectedly.
    pub fn will_message(&self) -> Message {
        Message::new_retained(self.lwt_topic.as_str(), self.lwt_payload.as_str(), self.qos)
    }

    /// The message to publish.
    pub fn message(&self) -> Message {
        Message::new(self.topic.as_str(), self.payload.as_str(), self.qos)
    }

    /// The options to connect with: credentials, the stores, and the LWT.
    /// SSL errors are reported on stderr.
    pub fn connect_options(&self) -> ConnectOptions {
        let ssl_opts = SslOptionsBuilder::new()
            .trust_store(&self.trust_store)
            .key_store(&self.key_store)
            .error_handler(|msg| eprintln!("SSL Error: {}", msg))
            .finalize();

        ConnectOptionsBuilder::new()
            .user_name(self.user_name.as_str())
            .password(self.password.as_str())
            .will_message(self.will_message())
            .ssl_options(ssl_opts)
            .finalize()
    }
}

/// Makes sure the trust store and key store files exist.
/// The trust store is checked first.
pub fn check_stores(cfg: &PublishConfig) -> Result<()> {
    if !cfg.trust_store.exists() {
        return Err(Error::TrustStoreMissing(cfg.trust_store.clone()));
    }
    if !cfg.key_store.exists() {
        return Err(Error::KeyStoreMissing(cfg.key_store.clone()));
    }
    Ok(())
}

/// Gets where to get a copy of a missing store, if that was the error.
pub fn store_source(err: &Error) -> Option<&'static str> {
    match err {
        Error::TrustStoreMissing(_) => Some(TRUST_STORE_SOURCE),
        Error::KeyStoreMissing(_) => Some(KEY_STORE_SOURCE),
        _ => None,
    }
}

/////////////////////////////////////////////////////////////////////////////
// Callback

/// Reports the asynchronous client events on the console.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleCallback;

impl Callback for ConsoleCallback {
    fn connection_lost(&self, cause: &str) {
        println!("\nConnection lost");
        if !cause.is_empty() {
            println!("\tcause: {}", cause);
        }
    }

    fn delivery_complete(&self, tok: &DeliveryToken) {
        println!("\tDelivery complete for token: {}", tok.message_id());
    }
}

/////////////////////////////////////////////////////////////////////////////
// Publisher

/// Runs the publisher: connect, publish one message, and disconnect.
///
/// The stores are checked before anything else. The client is only
/// created, with `create`, once they are known to exist.
///
/// A failure to connect or to publish ends the run with that error. If
/// the publish doesn't complete within the configured timeout, that's
/// reported and the client still disconnects.
pub fn run<C, F>(cfg: &PublishConfig, create: F) -> Result<()>
where
    C: MqttClient,
    F: FnOnce(&PublishConfig) -> Result<C>,
{
    check_stores(cfg)?;

    println!("Initializing for server '{}'...", cfg.server_uri);
    let mut cli = create(cfg)?;
    cli.set_callback(Arc::new(ConsoleCallback));

    let conn_opts = cfg.connect_options();
    println!("  ...OK");

    println!("\nConnecting...");
    let tok = cli.connect(conn_opts);
    println!("Waiting for the connection...");
    tok.wait()?;
    println!("  ...OK");

    println!("\nSending message...");
    match cli.publish(cfg.message()).wait_for(cfg.timeout) {
        Ok(()) => println!("  ...OK"),
        Err(Error::Timeout) => {
            warn!("Timed out waiting for the message to be delivered");
            println!("  ...timed out");
        }
        Err(err) => return Err(err),
    }

    println!("\nDisconnecting...");
    cli.disconnect(None).wait()?;
    println!("  ...OK");

    Ok(())
}

/////////////////////////////////////////////////////////////////////////////
//                              Unit Tests
/////////////////////////////////////////////////////////////////////////////
