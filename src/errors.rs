// errors.rs
//
// Error and Result types for the secure MQTT publisher.
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

use std::{fmt, io, path::PathBuf, result};
use thiserror::Error;

/// Connect Return Code
///
/// This is the 2nd byte of the variable header of the CONNACK packet
/// which indicates whether the server accepted the connection, and if not,
/// contains some information about why it rejected the request.
///
/// These are defined in MQTT v3.x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectReturnCode {
    /// The connection was accepted.
    Accepted = 0,
    /// The Server does not support the level of the MQTT protocol
    /// requested by the Client.
    UnacceptableProtocolVersion = 1,
    /// The Client identifier is correct UTF-8 but not allowed by the Server
    IdentifierRejected = 2,
    /// The Network Connection has been made but the MQTT service
    /// is unavailable
    ServerUnavailable = 3,
    /// The data in the user name or password is malformed
    BadUserNameOrPassword = 4,
    /// The Client is not authorized to connect
    NotAuthorized = 5,
}

impl fmt::Display for ConnectReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ConnectReturnCode::*;
        let msg = match *self {
            Accepted => "Accepted",
            UnacceptableProtocolVersion => "Unacceptable Protocol Version",
            IdentifierRejected => "Client Identifier Rejected",
            ServerUnavailable => "Server Unavailable",
            BadUserNameOrPassword => "Bad User Name or Password",
            NotAuthorized => "Not Authorized",
        };
        write!(f, "{}", msg)
    }
}

impl TryFrom<u8> for ConnectReturnCode {
    type Error = Error;

    fn try_from(rc: u8) -> Result<Self> {
        use ConnectReturnCode::*;
        match rc {
            0 => Ok(Accepted),
            1 => Ok(UnacceptableProtocolVersion),
            2 => Ok(IdentifierRejected),
            3 => Ok(ServerUnavailable),
            4 => Ok(BadUserNameOrPassword),
            5 => Ok(NotAuthorized),
            _ => Err(Error::Failure),
        }
    }
}

impl From<rumqttc::ConnectReturnCode> for ConnectReturnCode {
    fn from(code: rumqttc::ConnectReturnCode) -> Self {
        use rumqttc::ConnectReturnCode as Rc;
        match code {
            Rc::Success => ConnectReturnCode::Accepted,
            Rc::RefusedProtocolVersion => ConnectReturnCode::UnacceptableProtocolVersion,
            Rc::BadClientId => ConnectReturnCode::IdentifierRejected,
            Rc::ServiceUnavailable => ConnectReturnCode::ServerUnavailable,
            Rc::BadUserNamePassword => ConnectReturnCode::BadUserNameOrPassword,
            Rc::NotAuthorized => ConnectReturnCode::NotAuthorized,
        }
    }
}

/// The errors from an MQTT operation.
#[derive(Error, Debug)]
pub enum Error {
    /// A generic error code indicating the failure of an MQTT client operation.
    #[error("General failure")]
    Failure,
    /// The client is disconnected.
    #[error("Client disconnected")]
    Disconnected,
    /// An invaid QoS value was used (not 0, 1, or 2)
    #[error("Bad QoS")]
    BadQos,
    /// Messages can not be published to an empty topic.
    #[error("Zero length topic")]
    ZeroLenTopic,
    /// The LWT topic can not be zero length
    #[error("Zero length Will Topic")]
    ZeroLenWillTopic,
    /// A bad URL protocol/schema was requested.
    /// Only `tcp`, `mqtt`, `ssl` and `mqtts` are understood.
    #[error("Bad protocol")]
    BadProtocol,
    /// Connect or disconnect command ignored because the client is not in
    /// a state where the command can be carried out.
    #[error("Command Ignored")]
    CommandIgnored,
    /// The TCP connection timed out
    #[error("TCP connect timeout")]
    TcpConnectTimeout,
    /// An MQTT v3 connect return (failure) code
    #[error("CONNACK return code: {0}")]
    ConnectReturn(ConnectReturnCode),
    /// The TLS layer failed to set up or validate the secure session.
    #[error("TCP/TLS connect failure: {0}")]
    Tls(String),
    /// A request could not be queued for the network event loop.
    #[error("Client request failed: {0}")]
    Client(#[from] rumqttc::ClientError),
    /// An low-level I/O error
    #[error("I/O failed: {0}")]
    Io(#[from] io::Error),
    /// A timeout, particularly from a synchronous operation.
    #[error("Timeout")]
    Timeout,
    /// The certificate authority file used to verify the server is missing.
    #[error("The trust store file does not exist: {}", .0.display())]
    TrustStoreMissing(PathBuf),
    /// The client certificate file is missing.
    #[error("The key store file does not exist: {}", .0.display())]
    KeyStoreMissing(PathBuf),
    /// A general error with description
    #[error("{0}")]
    General(&'static str),
    /// A general error with description
    #[error("{0}")]
    GeneralString(String),
}

impl From<rumqttc::ConnectionError> for Error {
    /// Maps a failure reported by the network event loop.
    fn from(err: rumqttc::ConnectionError) -> Self {
        use rumqttc::ConnectionError as Ce;
        match err {
            Ce::ConnectionRefused(code) => Error::ConnectReturn(code.into()),
            Ce::Tls(err) => Error::Tls(err.to_string()),
            Ce::Io(err) => Error::Io(err),
            Ce::NetworkTimeout => Error::TcpConnectTimeout,
            err => Error::GeneralString(err.to_string()),
        }
    }
}

impl From<&'static str> for Error {
    /// Create a general error from a string.
    fn from(descr: &'static str) -> Error {
        Error::General(descr)
    }
}

impl From<String> for Error {
    /// Create a general error from a string.
    fn from(descr: String) -> Error {
        Error::GeneralString(descr)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(e) => e,
            Error::Timeout => io::Error::new(io::ErrorKind::TimedOut, err),
            Error::TrustStoreMissing(_) | Error::KeyStoreMissing(_) => {
                io::Error::new(io::ErrorKind::NotFound, err)
            }
            _ => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}

/// The result type for MQTT operations.
pub type Result<T> = result::Result<T, Error>;

/////////////////////////////////////////////////////////////////////////////
