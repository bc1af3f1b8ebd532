// message.rs
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

use std::{borrow::Cow, fmt};

use rumqttc::QoS;

use crate::errors::{Error, Result};

/// A `Message` represents all the information passed in an MQTT PUBLISH
/// packet.
/// This is the primary data transfer mechanism.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    topic: String,
    payload: Vec<u8>,
    qos: i32,
    retained: bool,
}

impl Message {
    /// Creates a new message.
    ///
    /// # Arguments
    ///
    /// * `topic` The topic on which the message is published.
    /// * `payload` The binary payload of the message
    /// * `qos` The quality of service for message delivery (0, 1, or 2)
    pub fn new<S, V>(topic: S, payload: V, qos: i32) -> Message
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        Message {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            retained: false,
        }
    }

    /// Creates a new message that will be retained by the broker.
    /// This creates a message with the 'retained' flag set.
    ///
    /// # Arguments
    ///
    /// * `topic` The topic on which the message is published.
    /// * `payload` The binary payload of the message
    /// * `qos` The quality of service for message delivery (0, 1, or 2)
    pub fn new_retained<S, V>(topic: S, payload: V, qos: i32) -> Message
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        Message {
            retained: true,
            ..Message::new(topic, payload, qos)
        }
    }

    /// Gets the topic for the message.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Gets the payload of the message.
    /// This returns the payload as a slice.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Gets the payload of the message as a string.
    ///
    /// This utilizes the "lossy" style of conversion from the std library.
    /// If the contents of the payload are not valid UTF-8, the result will
    /// contain the replacement character.
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
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.topic, self.payload_str())
    }
}

impl<'a, 'b> From<(&'a str, &'b [u8])> for Message {
    fn from((topic, payload): (&'a str, &'b [u8])) -> Self {
        Message::new(topic, payload, 0)
    }
}

impl<'a, 'b> From<(&'a str, &'b [u8], i32, bool)> for Message {
    fn from((topic, payload, qos, retained): (&'a str, &'b [u8], i32, bool)) -> Self {
        Message {
            retained,
            ..Message::new(topic, payload, qos)
        }
    }
}

/// Converts an integer QoS level to the network library's representation.
pub(crate) fn qos_level(qos: i32) -> Result<QoS> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        _ => Err(Error::BadQos),
    }
}

/////////////////////////////////////////////////////////////////////////////

/// Builder to create a new Message
#[derive(Debug, Default)]
pub struct MessageBuilder {
    topic: String,
    payload: Vec<u8>,
    qos: i32,
    retained: bool,
}

impl MessageBuilder {
    /// Create a new message builder.
    pub fn new() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// Sets the topic for the message
    ///
    /// # Arguments
    ///
    /// `topic` The topic on which the message should be published.
    pub fn topic<S>(mut self, topic: S) -> MessageBuilder
    where
        S: Into<String>,
    {
        self.topic = topic.into();
        self
    }

    /// Sets the payload for the message
    ///
    /// # Arguments
    ///
    /// `payload` The binary payload of the message
    pub fn payload<V>(mut self, payload: V) -> MessageBuilder
    where
        V: Into<Vec<u8>>,
    {
        self.payload = payload.into();
        self
    }

    /// Sets the Quality of Service for the message.
    ///
    /// # Arguments
    ///
    /// `qos` The quality of service for the message.
    pub fn qos(mut self, qos: i32) -> MessageBuilder {
        self.qos = qos;
        self
    }

    /// Sets whether or not the published message should be retained by the
    /// broker.
    ///
    /// # Arguments
    ///
    /// `retained` Set true if the message should be retained by the broker,
    ///            false if not.
    pub fn retained(mut self, retained: bool) -> MessageBuilder {
        self.retained = retained;
        self
    }

    /// Finalize the builder to create the message.
    pub fn finalize(self) -> Message {
        Message {
            topic: self.topic,
            payload: self.payload,
            qos: self.qos,
            retained: self.retained,
        }
    }
}

/////////////////////////////////////////////////////////////////////////////
//                              Unit Tests
/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    const TOPIC: &str = "test";
    const PAYLOAD: &[u8] = b"Hello world";
    const QOS: i32 = 2;
    const RETAINED: bool = true;

    #[test]
    fn test_new() {
        let msg = Message::new(TOPIC, PAYLOAD, QOS);

        assert_eq!(TOPIC, msg.topic());
        assert_eq!(PAYLOAD, msg.payload());
        assert_eq!(QOS, msg.qos());
        assert!(!msg.retained());
    }

    #[test]
    fn test_new_retained() {
        let msg = Message::new_retained(TOPIC, PAYLOAD, QOS);

        assert_eq!(TOPIC, msg.topic());
        assert_eq!(PAYLOAD, msg.payload());
        assert_eq!(QOS, msg.qos());
        assert!(msg.retained());
    }

    #[test]
    fn test_from_tuple() {
        let msg = Message::from((TOPIC, PAYLOAD, QOS, RETAINED));

        assert_eq!(TOPIC, msg.topic());
        assert_eq!(PAYLOAD, msg.payload());
        assert_eq!(QOS, msg.qos());
        assert!(msg.retained());

        let msg = Message::from((TOPIC, PAYLOAD));
        assert_eq!(0, msg.qos());
        assert!(!msg.retained());
    }

    #[test]
    fn test_builder_default() {
        let msg = MessageBuilder::new().finalize();

        assert_eq!("", msg.topic());
        assert_eq!(&[] as &[u8], msg.payload());
        assert_eq!(0, msg.qos());
        assert!(!msg.retained());
    }

    #[test]
    fn test_builder() {
        let msg = MessageBuilder::new()
            .topic(TOPIC)
            .payload(PAYLOAD)
            .qos(QOS)
            .retained(RETAINED)
            .finalize();

        assert_eq!(Message::from((TOPIC, PAYLOAD, QOS, RETAINED)), msg);
    }

    #[test]
    fn test_payload_str() {
        let msg = Message::new(TOPIC, "Hello secure world!", 1);
        assert_eq!("Hello secure world!", msg.payload_str());
        assert_eq!("test: Hello secure world!", msg.to_string());
    }

    #[test]
    fn test_qos_level() {
        assert_eq!(QoS::AtMostOnce, qos_level(0).unwrap());
        assert_eq!(QoS::AtLeastOnce, qos_level(1).unwrap());
        assert_eq!(QoS::ExactlyOnce, qos_level(2).unwrap());
        assert!(matches!(qos_level(3), Err(Error::BadQos)));
        assert!(matches!(qos_level(-1), Err(Error::BadQos)));
    }
}
