// main.rs
//
// This is the command-line front end of the secure MQTT publisher.
//
//! It connects to an MQTT broker over SSL/TLS, registering a last will and
//! testament, publishes a single message, and then disconnects.
//!
//! The sample demonstrates:
//!  - Connecting to an MQTT server/broker securely
//!  - Setting SSL/TLS options
//!  - Last will and testament
//!  - Publishing messages
//!  - Using asynchronous tokens
//!
//! We use the trust store and client certificate from the Paho C test
//! suite (paho.mqtt.c/test/ssl), and assume there are copies of them in
//! the current directory.
//!

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

use std::{path::PathBuf, process, time::Duration};

use clap::Parser;
use mqtt_ssl_publish::{
    self as mqtt,
    ssl_publish::{self, PublishConfig},
};

/// Publishes a message to an MQTT broker over a secure connection.
#[derive(Parser, Debug)]
#[command(name = "ssl_publish", version)]
struct Args {
    /// The address of the broker
    #[arg(default_value = ssl_publish::DFLT_SERVER_URI)]
    server_uri: String,

    /// The client identifier
    #[arg(default_value = ssl_publish::DFLT_CLIENT_ID)]
    client_id: String,

    /// The file with the CA certificates to trust
    #[arg(long, default_value = ssl_publish::TRUST_STORE)]
    trust_store: PathBuf,

    /// The file with the client certificate and private key
    #[arg(long, default_value = ssl_publish::KEY_STORE)]
    key_store: PathBuf,

    /// The user name for the broker
    #[arg(short, long, default_value = ssl_publish::USER_NAME)]
    user: String,

    /// The password for the broker
    #[arg(short, long, default_value = ssl_publish::PASSWORD)]
    password: String,

    /// The topic to publish to
    #[arg(short, long, default_value = ssl_publish::TOPIC)]
    topic: String,

    /// Seconds to wait for the message to be delivered
    #[arg(long, default_value_t = ssl_publish::TIMEOUT.as_secs())]
    timeout: u64,
}

impl From<Args> for PublishConfig {
    fn from(args: Args) -> Self {
        PublishConfig {
            server_uri: args.server_uri,
            client_id: args.client_id,
            trust_store: args.trust_store,
            key_store: args.key_store,
            user_name: args.user,
            password: args.password,
            topic: args.topic,
            timeout: Duration::from_secs(args.timeout),
            ..PublishConfig::default()
        }
    }
}

fn main() {
    // Initialize the logger from the environment
    env_logger::init();

    let cfg = PublishConfig::from(Args::parse());

    let res = ssl_publish::run(&cfg, |cfg| {
        mqtt::AsyncClient::new((cfg.server_uri.as_str(), cfg.client_id.as_str()))
    });

    if let Err(err) = res {
        eprintln!("{}", err);
        if let Some(source) = ssl_publish::store_source(&err) {
            eprintln!("  Get a copy from \"{}\"", source);
        }
        process::exit(1);
    }
}
