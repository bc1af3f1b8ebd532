// will_options.rs
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

//! Last Will and Testament (LWT) options.
//!

use std::borrow::Cow;

use rumqttc::LastWill;

use crate::{
    errors::{Error, Result},
    message::{self, Message},
};

/// The options for the Last Will and Testament (LWT).
/// This defines a message that is registered with the the server at the time
/// of connection. Then if the connection is lost unexpectedly, the message
/// is published by the server.
///
/// Users are encouraged to just create a `Message` object and use it when
/// building `ConnectOptions`:
/// ```
/// use mqtt_ssl_publish as mqtt;
///
/// let lwt = mqtt::Message::new("lwt", "disconnected", 1);
/// let opts = mqtt::ConnectOptionsBuilder::new().will_message(lwt).finalize();
/// assert!(opts.will_options().is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WillOptions {
    topic: String,
    payload: Vec<u8>,
    qos: i32,
    retained: bool,
}

impl WillOptions {
    /// Creates a new WillOptions message.
    ///
    /// # Arguments
    ///
    /// * `topic` The topic on which the LWT message is to be published.
    /// * `payload` The binary payload of the LWT message
    /// * `qos` The quality of service for message delivery (0, 1, or 2)
    pub fn new<S, V>(topic: S, payload: V, qos: i32) -> WillOptions
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        WillOptions {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            retained: false,
        }
    }

    /// Creates a new WillOptions message with the 'retain' flag set.
    pub fn new_retained<S, V>(topic: S, payload: V, qos: i32) -> WillOptions
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        WillOptions {
            retained: true,
            ..WillOptions::new(topic, payload, qos)
        }
    }

    /// Gets the topic string for the LWT
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Gets the payload of the LWT
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Gets the payload of the message as a string.
    pub fn payload_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Returns the Quality of Service (QOS) for the message.
    pub fn qos(&self) -> i32 {
        self.qos
    }

    /// Gets the 'retained' flag for the message.
    pub fn retained(&self) -> bool {
        self.retained
    }

    // Builds the will that is sent to the broker in the CONNECT packet.
    pub(crate) fn to_last_will(&self) -> Result<LastWill> {
        if self.topic.is_empty() {
            return Err(Error::ZeroLenWillTopic);
        }
        let qos = message::qos_level(self.qos)?;
        Ok(LastWill::new(
            self.topic.clone(),
            self.payload.clone(),
            qos,
            self.retained,
        ))
    }
}

impl From<Message> for WillOptions {
    /// Create `WillOptions` from a `Message`
    fn from(msg: Message) -> Self {
        WillOptions {
            topic: msg.topic().to_string(),
            payload: msg.payload().to_vec(),
            qos: msg.qos(),
            retained: msg.retained(),
        }
    }
}

/////////////////////////////////////////////////////////////////////////////
//                              Unit Tests
/////////////////////////////////////////////////////////////////////////////
