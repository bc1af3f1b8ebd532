// async_client.rs
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

//! The Asynchronous client module.
//!
//! This presents an asynchronous API that uses Token objects that
//! implement the Futures trait.
//!
//! Asynchronous operations return a `Token` that is a type of future. It
//! can be used to determine if an operation has completed, block and wait
//! for the operation to complete, and obtain the final result.
//! For example, you can start a connection, do something else, and then
//! wait for the connection to complete.
//!
//! The network traffic is handled by an event loop that runs on a
//! dedicated thread owned by the client. That thread completes the tokens
//! and invokes the client callbacks.
//!
//! ```no_run
//! use mqtt_ssl_publish as mqtt;
//!
//! let cli = mqtt::AsyncClient::new("tcp://localhost:1883").unwrap();
//!
//! // Start an async operation and get the token for it.
//! let tok = cli.connect(mqtt::ConnectOptions::new());
//!
//! // ...do something else...
//!
//! // Wait for the async operation to complete.
//! tok.wait().unwrap();
//! ```

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use rumqttc::{Event, EventLoop, MqttOptions, Outgoing, Packet, Transport};
use tokio::runtime::{Builder, Handle, Runtime};

use crate::{
    callback::Callback,
    connect_options::ConnectOptions,
    create_options::{CreateOptions, ServerUri},
    disconnect_options::{DisconnectOptions, DisconnectOptionsBuilder},
    errors::{Error, Result},
    message::{self, Message},
    ssl_options::SslOptions,
    token::{DeliveryToken, Token},
};

// How often a pending disconnect checks whether in-flight messages finished.
const INFLIGHT_POLL_INTERVAL: Duration = Duration::from_millis(10);

// Locks a mutex, recovering the data if another thread panicked with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/////////////////////////////////////////////////////////////////////////////
// Session

/// The state of the client's connection to the broker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session. This is the initial and final state.
    #[default]
    Disconnected,
    /// A connect was requested and the CONNACK is pending.
    Connecting,
    /// The broker accepted the connection.
    Connected,
    /// A disconnect was requested and is in progress.
    Disconnecting,
}

// The session data shared between the client and its network event loop.
#[derive(Default)]
struct Session {
    state: ConnectionState,
    // Sends requests to the event loop while there is a session
    requests: Option<rumqttc::AsyncClient>,
    connect_tok: Option<Token>,
    disconnect_tok: Option<Token>,
    // Delivery tokens for messages not yet sent, in request order
    queued: VecDeque<DeliveryToken>,
    // QoS 1 & 2 delivery tokens waiting for the final ack, by packet ID
    inflight: HashMap<u16, DeliveryToken>,
}

impl Session {
    fn has_pending(&self) -> bool {
        !self.queued.is_empty() || !self.inflight.is_empty()
    }

    // Ends the session, failing any deliveries that didn't complete.
    // Returns the state the session was in.
    fn close(&mut self) -> ConnectionState {
        let prev = self.state;
        self.state = ConnectionState::Disconnected;
        self.requests = None;

        let pending = self
            .queued
            .drain(..)
            .chain(self.inflight.drain().map(|(_, tok)| tok));

        for tok in pending {
            tok.on_complete(Err(Error::Disconnected));
        }
        prev
    }
}

type CallbackHandle = Arc<Mutex<Option<Arc<dyn Callback>>>>;

// What the event loop needs to report back to the client.
// Tokens are signaled and callbacks invoked without holding the session
// lock, so that user code can call back into the client.
struct LoopContext {
    session: Arc<Mutex<Session>>,
    callback: CallbackHandle,
    ssl: Option<SslOptions>,
}

impl LoopContext {
    fn callback(&self) -> Option<Arc<dyn Callback>> {
        lock(&self.callback).clone()
    }

    fn on_connected(&self) {
        debug!("Connected");
        let tok = {
            let mut session = lock(&self.session);
            session.state = ConnectionState::Connected;
            session.connect_tok.take()
        };
        if let Some(tok) = tok {
            tok.on_complete(Ok(()));
        }
    }

    fn on_connect_failure(&self, err: Error) {
        warn!("Connection failed: {}", err);
        if let (Error::Tls(msg), Some(ssl)) = (&err, &self.ssl) {
            ssl.on_error(msg);
        }

        let tok = {
            let mut session = lock(&self.session);
            session.close();
            session.connect_tok.take()
        };
        if let Some(tok) = tok {
            tok.on_complete(Err(err));
        }
    }

    // The event loop wrote a PUBLISH packet. Requests are handled in order,
    // so it belongs to the oldest queued token.
    fn on_publish_sent(&self, pkid: u16) {
        let done = {
            let mut session = lock(&self.session);
            let tok = match session.queued.pop_front() {
                Some(tok) => tok,
                None => {
                    warn!("Sent PUBLISH {} with no pending delivery token", pkid);
                    return;
                }
            };
            tok.set_msgid(pkid);

            if tok.message().map_or(0, Message::qos) == 0 {
                Some(tok)
            }
            else {
                trace!("Waiting for ack of PUBLISH {}", pkid);
                session.inflight.insert(pkid, tok);
                None
            }
        };

        if let Some(tok) = done {
            self.on_delivered(tok);
        }
    }

    fn on_ack(&self, pkid: u16) {
        let tok = lock(&self.session).inflight.remove(&pkid);
        match tok {
            Some(tok) => self.on_delivered(tok),
            None => warn!("Ack for unknown packet ID: {}", pkid),
        }
    }

    fn on_delivered(&self, tok: DeliveryToken) {
        if let Some(cb) = self.callback() {
            trace!("Invoking delivery complete callback");
            cb.delivery_complete(&tok);
        }
        tok.on_complete(Ok(()));
    }

    fn on_disconnected(&self) {
        debug!("Disconnected");
        let tok = {
            let mut session = lock(&self.session);
            session.close();
            session.disconnect_tok.take()
        };
        if let Some(tok) = tok {
            tok.on_complete(Ok(()));
        }
    }

    fn on_connection_lost(&self, cause: String) {
        let (prev, tok) = {
            let mut session = lock(&self.session);
            (session.close(), session.disconnect_tok.take())
        };

        match prev {
            // Going down anyway
            ConnectionState::Disconnecting => {
                debug!("Connection closed while disconnecting: {}", cause);
                if let Some(tok) = tok {
                    tok.on_complete(Ok(()));
                }
            }
            _ => {
                warn!("Connection lost: {}", cause);
                if let Some(cb) = self.callback() {
                    trace!("Invoking connection lost callback");
                    cb.connection_lost(&cause);
                }
            }
        }
    }
}

// Polls the event loop until the broker answers the CONNECT.
async fn establish_connection(event_loop: &mut EventLoop) -> Result<()> {
    loop {
        match event_loop.poll().await {
            // A refused CONNACK comes back as an error
            Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
            Ok(event) => trace!("Connecting: {:?}", event),
            Err(err) => return Err(err.into()),
        }
    }
}

// The network event loop for one session.
// This runs until the session ends. There is no automatic reconnect.
async fn run_event_loop(mut event_loop: EventLoop, ctx: LoopContext, connect_timeout: Duration) {
    let res = tokio::time::timeout(connect_timeout, establish_connection(&mut event_loop)).await;

    match res {
        Ok(Ok(())) => ctx.on_connected(),
        Ok(Err(err)) => return ctx.on_connect_failure(err),
        Err(_) => return ctx.on_connect_failure(Error::Timeout),
    }

    loop {
        match event_loop.poll().await {
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => ctx.on_publish_sent(pkid),
            Ok(Event::Incoming(Packet::PubAck(ack))) => ctx.on_ack(ack.pkid),
            Ok(Event::Incoming(Packet::PubComp(comp))) => ctx.on_ack(comp.pkid),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                ctx.on_disconnected();
                break;
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                ctx.on_connection_lost("Received disconnect".to_string());
                break;
            }
            Ok(event) => trace!("Event: {:?}", event),
            Err(err) => {
                ctx.on_connection_lost(err.to_string());
                break;
            }
        }
    }
    debug!("Event loop terminated");
}

/////////////////////////////////////////////////////////////////////////////
// AsyncClient

// The shared client data.
struct InnerAsyncClient {
    // The options the client was created with
    opts: CreateOptions,
    // The parsed server URI
    uri: ServerUri,
    // The runtime for the network event loop. Only taken on drop.
    rt: Option<Runtime>,
    // A handle to spawn work on the runtime
    handle: Handle,
    session: Arc<Mutex<Session>>,
    callback: CallbackHandle,
}

impl Drop for InnerAsyncClient {
    /// Stops the network thread, abandoning any session in progress.
    fn drop(&mut self) {
        if let Some(rt) = self.rt.take() {
            debug!("Shutting down the client network thread");
            rt.shutdown_background();
        }
    }
}

/// An asynchronous MQTT connection client.
///
/// Cloning the client creates another handle to the same connection.
#[derive(Clone)]
pub struct AsyncClient {
    inner: Arc<InnerAsyncClient>,
}

impl AsyncClient {
    /// Creates a new MQTT client which can connect to an MQTT broker.
    ///
    /// This doesn't connect. It validates the server URI and starts the
    /// thread that will handle the network traffic.
    ///
    /// # Arguments
    ///
    /// `opts` The create options for the client.
    ///
    pub fn new<T>(opts: T) -> Result<AsyncClient>
    where
        T: Into<CreateOptions>,
    {
        let opts = opts.into();
        let uri = ServerUri::parse(&opts.server_uri)?;

        let rt = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("mqtt-event-loop")
            .enable_all()
            .build()?;
        let handle = rt.handle().clone();

        debug!("Created client '{}' for '{}'", opts.client_id, opts.server_uri);

        Ok(AsyncClient {
            inner: Arc::new(InnerAsyncClient {
                opts,
                uri,
                rt: Some(rt),
                handle,
                session: Arc::new(Mutex::new(Session::default())),
                callback: Arc::new(Mutex::new(None)),
            }),
        })
    }

    /// Gets the URI of the server this client connects to.
    pub fn server_uri(&self) -> &str {
        &self.inner.opts.server_uri
    }

    /// Gets the client identifier.
    pub fn client_id(&self) -> &str {
        &self.inner.opts.client_id
    }

    /// Gets the current state of the connection.
    pub fn state(&self) -> ConnectionState {
        lock(&self.inner.session).state
    }

    /// Determines if this client is currently connected to an MQTT broker.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Sets the callback for asynchronous events, like the loss of the
    /// connection. This replaces any previous callback.
    ///
    /// The callback is invoked from the client's network thread.
    pub fn set_callback(&mut self, cb: Arc<dyn Callback>) {
        *lock(&self.inner.callback) = Some(cb);
    }

    // Creates the session options for the network library.
    fn mqtt_options(&self, opts: &ConnectOptions) -> Result<MqttOptions> {
        let client_id = self.client_id();

        if client_id.is_empty() || client_id.starts_with(' ') {
            return Err(Error::General("Invalid client ID"));
        }

        let uri = &self.inner.uri;
        let mut mqtt_opts = MqttOptions::new(client_id, uri.host.clone(), uri.port);

        mqtt_opts
            .set_keep_alive(opts.keep_alive_interval())
            .set_clean_session(opts.clean_session())
            .set_inflight(opts.max_inflight());

        if let Some(user_name) = opts.user_name() {
            mqtt_opts.set_credentials(user_name, opts.password().unwrap_or_default());
        }

        if let Some(will) = opts.will_options() {
            mqtt_opts.set_last_will(will.to_last_will()?);
        }

        match (uri.secure, opts.ssl_options()) {
            (true, Some(ssl)) => {
                mqtt_opts.set_transport(Transport::Tls(ssl.tls_configuration()?));
            }
            (true, None) => {
                return Err(Error::General(
                    "SSL options are required for a secure connection",
                ));
            }
            (false, Some(_)) => debug!("Ignoring SSL options for a plain connection"),
            (false, None) => {}
        }

        Ok(mqtt_opts)
    }

    /// Connects to an MQTT broker using the specified connect options.
    ///
    /// The token completes when the broker accepts or refuses the
    /// connection, or the connect timeout elapses. The connection is only
    /// tried once.
    ///
    /// # Arguments
    ///
    /// * `opts` The connect options. `None` uses the defaults.
    ///
    pub fn connect<T>(&self, opt_opts: T) -> Token
    where
        T: Into<Option<ConnectOptions>>,
    {
        let opts = opt_opts.into().unwrap_or_default();
        debug!("Connecting to '{}'", self.server_uri());
        debug!("Connect options: {:?}", opts);

        let mut session = lock(&self.inner.session);

        if session.state != ConnectionState::Disconnected {
            warn!("Connect ignored. The client is {:?}", session.state);
            return Token::from_error(Error::CommandIgnored);
        }

        let mqtt_opts = match self.mqtt_options(&opts) {
            Ok(mqtt_opts) => mqtt_opts,
            Err(err) => {
                warn!("Bad connect options: {}", err);
                return Token::from_error(err);
            }
        };

        let _guard = self.inner.handle.enter();
        let (requests, mut event_loop) =
            rumqttc::AsyncClient::new(mqtt_opts, self.inner.opts.event_loop_capacity);

        // The network library's own limit must outlast the connect timeout,
        // so that the connect token fails with our timeout.
        event_loop
            .network_options
            .set_connection_timeout(opts.connect_timeout().as_secs() + 1);

        let tok = Token::new();
        session.state = ConnectionState::Connecting;
        session.requests = Some(requests);
        session.connect_tok = Some(tok.clone());
        drop(session);

        let ctx = LoopContext {
            session: Arc::clone(&self.inner.session),
            callback: Arc::clone(&self.inner.callback),
            ssl: opts.ssl_options().cloned(),
        };

        self.inner
            .handle
            .spawn(run_event_loop(event_loop, ctx, opts.connect_timeout()));
        tok
    }

    /// Publishes a message to an MQTT broker
    ///
    /// A QoS 0 token completes when the message is written to the
    /// network; QoS 1 and 2 tokens complete when the broker acknowledges
    /// the message.
    ///
    /// # Arguments
    ///
    /// * `msg` The message to publish.
    ///
    pub fn publish(&self, msg: Message) -> DeliveryToken {
        debug!("Publish: {}", msg);

        if msg.topic().is_empty() {
            return Token::from_error(Error::ZeroLenTopic);
        }

        let qos = match message::qos_level(msg.qos()) {
            Ok(qos) => qos,
            Err(err) => return Token::from_error(err),
        };

        // The lock is held until the token is queued, so the event loop
        // can't report the packet before the token is there to receive it.
        let mut session = lock(&self.inner.session);

        let requests = match (session.state, session.requests.as_ref()) {
            (ConnectionState::Connected, Some(requests)) => requests.clone(),
            (state, _) => {
                debug!("Can't publish. The client is {:?}", state);
                return Token::from_error(Error::Disconnected);
            }
        };

        if let Err(err) = requests.try_publish(msg.topic(), qos, msg.retained(), msg.payload()) {
            warn!("Publish request failed: {}", err);
            return Token::from_error(err.into());
        }

        let tok = DeliveryToken::from_message(msg);
        session.queued.push_back(tok.clone());
        tok
    }

    /// Disconnects from the MQTT broker.
    ///
    /// # Arguments
    ///
    /// `opt_opts` Optional disconnect options. Specifying `None` will use
    ///            default of immediate (zero timeout) disconnect.
    ///
    pub fn disconnect<T>(&self, opt_opts: T) -> Token
    where
        T: Into<Option<DisconnectOptions>>,
    {
        let opts = opt_opts.into().unwrap_or_default();
        let mut session = lock(&self.inner.session);

        let requests = match (session.state, session.requests.as_ref()) {
            (ConnectionState::Connected, Some(requests)) => requests.clone(),
            (state, _) => {
                debug!("Can't disconnect. The client is {:?}", state);
                return Token::from_error(Error::Disconnected);
            }
        };

        debug!("Disconnecting");
        let tok = Token::new();
        session.state = ConnectionState::Disconnecting;
        session.disconnect_tok = Some(tok.clone());
        drop(session);

        let session = Arc::clone(&self.inner.session);
        let deadline = Instant::now() + opts.timeout();

        self.inner.handle.spawn(async move {
            // Give in-flight messages a chance to complete
            loop {
                let pending = lock(&session).has_pending();
                if !pending || Instant::now() >= deadline {
                    break;
                }
                tokio::time::sleep(INFLIGHT_POLL_INTERVAL).await;
            }

            if let Err(err) = requests.disconnect().await {
                // The event loop is gone, so there's no session left
                warn!("Disconnect request failed: {}", err);
                let tok = {
                    let mut session = lock(&session);
                    session.close();
                    session.disconnect_tok.take()
                };
                if let Some(tok) = tok {
                    tok.on_complete(Err(err.into()));
                }
            }
        });

        tok
    }

    /// Disconnect from the MQTT broker with a timeout.
    /// This will delay the disconnect for up to the specified timeout to
    /// allow in-flight messages to complete.
    /// This is the same as calling disconnect with options specifying a
    /// timeout.
    ///
    /// # Arguments
    ///
    /// `timeout` The amount of time to wait for the disconnect. This has
    ///           a resolution in milliseconds.
    ///
    pub fn disconnect_after(&self, timeout: Duration) -> Token {
        let disconn_opts = DisconnectOptionsBuilder::new().timeout(timeout).finalize();
        self.disconnect(disconn_opts)
    }
}

/////////////////////////////////////////////////////////////////////////////
//                              Unit Tests
/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_options::ConnectOptionsBuilder, ssl_options::SslOptionsBuilder};
    use std::{
        env, fs,
        io::{self, Read, Write},
        net::{TcpListener, TcpStream},
        sync::atomic::{AtomicUsize, Ordering},
        thread,
    };

    const TIMEOUT: Duration = Duration::from_secs(5);

    // MQTT control packet types
    const CONNECT: u8 = 1;
    const PUBLISH: u8 = 3;
    const DISCONNECT: u8 = 14;

    const CONNACK_ACCEPTED: [u8; 4] = [0x20, 0x02, 0x00, 0x00];
    const CONNACK_NOT_AUTHORIZED: [u8; 4] = [0x20, 0x02, 0x00, 0x05];

    // A self-signed CA, only used to get the TLS handshake started.
    const TEST_CA: &str = "-----BEGIN CERTIFICATE-----
MIIBhTCCASugAwIBAgIUMvmQ7gau0KwL3I9uBFqCyBLBhNcwCgYIKoZIzj0EAwIw
FzEVMBMGA1UEAwwMVGVzdCBSb290IENBMCAXDTI2MTAxOTAwNTIzN1oYDzIxMjYw
OTI1MDA1MjM3WjAXMRUwEwYDVQQDDAxUZXN0IFJvb3QgQ0EwWTATBgcqhkjOPQIB
BggqhkjOPQMBBwNCAAQUxp420zkpvrzwuvGGXquUDt8ER7mXREY3h78G2/MVYWP1
wx8ZLkZXN2BEeq0xMuwQ95tyzFL5uWgwWAZtVZVpo1MwUTAdBgNVHQ4EFgQUWn90
GSM0DDE+hGNOK+B6gZhfmi0wHwYDVR0jBBgwFoAUWn90GSM0DDE+hGNOK+B6gZhf
mi0wDwYDVR0TAQH/BAUwAwEB/zAKBggqhkjOPQQDAgNIADBFAiEA768XoyQA1dMW
2IFAaPudXp5NcZgXN6u0YarF/WXxpAUCIFBtL4giEfIjB2R4o+tMJCNSBaZz0vY7
hF1K1lfwCOoW
-----END CERTIFICATE-----
";

    // Reads one MQTT packet, returning its type and body.
    fn read_packet(stream: &mut TcpStream) -> io::Result<(u8, Vec<u8>)> {
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte)?;
        let typ = byte[0] >> 4;

        let (mut len, mut mult) = (0usize, 1usize);
        loop {
            stream.read_exact(&mut byte)?;
            len += (byte[0] & 0x7F) as usize * mult;
            if byte[0] & 0x80 == 0 {
                break;
            }
            mult *= 128;
        }

        let mut body = vec![0u8; len];
        stream.read_exact(&mut body)?;
        Ok((typ, body))
    }

    // A broker that accepts one client and runs the given script with it.
    fn fake_broker<F>(script: F) -> (u16, thread::JoinHandle<io::Result<Vec<u8>>>)
    where
        F: FnOnce(&mut TcpStream) -> io::Result<Vec<u8>> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let thr = thread::spawn(move || {
            let (mut stream, _) = listener.accept()?;
            script(&mut stream)
        });
        (port, thr)
    }

    fn client_for(port: u16) -> AsyncClient {
        let uri = format!("tcp://127.0.0.1:{}", port);
        AsyncClient::new((uri.as_str(), "async_client_test")).unwrap()
    }

    #[derive(Default)]
    struct TestCallback {
        lost: Mutex<Vec<String>>,
        delivered: Mutex<Vec<u16>>,
    }

    impl Callback for TestCallback {
        fn connection_lost(&self, cause: &str) {
            lock(&self.lost).push(cause.to_string());
        }

        fn delivery_complete(&self, tok: &DeliveryToken) {
            lock(&self.delivered).push(tok.message_id());
        }
    }

    #[test]
    fn test_create_bad_protocol() {
        let res = AsyncClient::new("http://localhost:1883");
        assert!(matches!(res, Err(Error::BadProtocol)));
    }

    #[test]
    fn test_create() {
        let cli = AsyncClient::new(("mqtts://localhost:18884", "ssl_publish")).unwrap();
        assert_eq!("mqtts://localhost:18884", cli.server_uri());
        assert_eq!("ssl_publish", cli.client_id());
        assert_eq!(ConnectionState::Disconnected, cli.state());
        assert!(!cli.is_connected());
    }

    #[test]
    fn test_ops_when_disconnected() {
        let cli = AsyncClient::new("tcp://localhost:1883").unwrap();

        let res = cli.publish(Message::new("hello", "Hi", 1)).wait();
        assert!(matches!(res, Err(Error::Disconnected)));

        let res = cli.disconnect(None).wait();
        assert!(matches!(res, Err(Error::Disconnected)));
    }

    #[test]
    fn test_publish_bad_message() {
        let cli = AsyncClient::new("tcp://localhost:1883").unwrap();

        let res = cli.publish(Message::new("", "Hi", 1)).wait();
        assert!(matches!(res, Err(Error::ZeroLenTopic)));

        let res = cli.publish(Message::new("hello", "Hi", 5)).wait();
        assert!(matches!(res, Err(Error::BadQos)));
    }

    #[test]
    fn test_secure_connect_requires_ssl_options() {
        let cli = AsyncClient::new(("mqtts://localhost:18884", "cli")).unwrap();
        let res = cli.connect(None).wait();
        assert!(matches!(res, Err(Error::General(_))));
        assert_eq!(ConnectionState::Disconnected, cli.state());
    }

    #[test]
    fn test_connect_missing_trust_store() {
        let cli = AsyncClient::new(("mqtts://localhost:18884", "cli")).unwrap();
        let ssl = SslOptionsBuilder::new()
            .trust_store("/no/such/dir/test-root-ca.crt")
            .finalize();
        let opts = ConnectOptionsBuilder::new().ssl_options(ssl).finalize();

        let res = cli.connect(opts).wait();
        assert!(matches!(res, Err(Error::Io(_))));
    }

    #[test]
    fn test_connect_bad_will() {
        let cli = AsyncClient::new(("tcp://localhost:1883", "cli")).unwrap();
        let opts = ConnectOptionsBuilder::new()
            .will_message(Message::new("events/disconnect", "bye", 7))
            .finalize();

        let res = cli.connect(opts).wait();
        assert!(matches!(res, Err(Error::BadQos)));
    }

    #[test]
    fn test_connect_requires_client_id() {
        let cli = AsyncClient::new("tcp://localhost:1883").unwrap();
        let res = cli.connect(None).wait();
        assert!(matches!(res, Err(Error::General(_))));

        let cli = AsyncClient::new(("tcp://localhost:1883", " cli")).unwrap();
        let res = cli.connect(None).wait();
        assert!(matches!(res, Err(Error::General(_))));
    }

    #[test]
    fn test_connect_publish_disconnect() {
        let (port, broker) = fake_broker(|stream| {
            let mut seen = Vec::new();

            let (typ, _) = read_packet(stream)?;
            seen.push(typ);
            stream.write_all(&CONNACK_ACCEPTED)?;

            let (typ, body) = read_packet(stream)?;
            seen.push(typ);
            let topic_len = u16::from_be_bytes([body[0], body[1]]) as usize;
            let pkid = &body[2 + topic_len..4 + topic_len];
            stream.write_all(&[0x40, 0x02, pkid[0], pkid[1]])?;

            let (typ, _) = read_packet(stream)?;
            seen.push(typ);
            Ok(seen)
        });

        let mut cli = client_for(port);
        let cb = Arc::new(TestCallback::default());
        cli.set_callback(cb.clone());

        cli.connect(None).wait_for(TIMEOUT).unwrap();
        assert!(cli.is_connected());

        // Only one connect at a time
        let res = cli.connect(None).wait();
        assert!(matches!(res, Err(Error::CommandIgnored)));

        let tok = cli.publish(Message::new("hello", "Hello secure world!", 1));
        tok.clone().wait_for(TIMEOUT).unwrap();
        assert_eq!(1, tok.message_id());
        assert_eq!(vec![1], *lock(&cb.delivered));

        cli.disconnect(None).wait_for(TIMEOUT).unwrap();
        assert_eq!(ConnectionState::Disconnected, cli.state());
        assert!(lock(&cb.lost).is_empty());

        let seen = broker.join().unwrap().unwrap();
        assert_eq!(vec![CONNECT, PUBLISH, DISCONNECT], seen);
    }

    #[test]
    fn test_connect_refused() {
        let (port, broker) = fake_broker(|stream| {
            let (typ, _) = read_packet(stream)?;
            stream.write_all(&CONNACK_NOT_AUTHORIZED)?;
            Ok(vec![typ])
        });

        let cli = client_for(port);
        let res = cli.connect(None).wait_for(TIMEOUT);

        assert!(matches!(
            res,
            Err(Error::ConnectReturn(crate::ConnectReturnCode::NotAuthorized))
        ));
        assert_eq!(ConnectionState::Disconnected, cli.state());
        assert_eq!(vec![CONNECT], broker.join().unwrap().unwrap());
    }

    #[test]
    fn test_connection_lost() {
        let (port, broker) = fake_broker(|stream| {
            let (typ, _) = read_packet(stream)?;
            stream.write_all(&CONNACK_ACCEPTED)?;
            // Dropping the stream closes the connection
            Ok(vec![typ])
        });

        let mut cli = client_for(port);
        let cb = Arc::new(TestCallback::default());
        cli.set_callback(cb.clone());

        cli.connect(None).wait_for(TIMEOUT).unwrap();
        broker.join().unwrap().unwrap();

        let start = Instant::now();
        while lock(&cb.lost).is_empty() && start.elapsed() < TIMEOUT {
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(1, lock(&cb.lost).len());
        assert_eq!(ConnectionState::Disconnected, cli.state());

        let res = cli.publish(Message::new("hello", "Hi", 1)).wait();
        assert!(matches!(res, Err(Error::Disconnected)));
    }

    // The broker takes longer to answer than the network library's
    // default limit, but well within the connect timeout.
    #[test]
    fn test_slow_connack_within_connect_timeout() {
        let (port, broker) = fake_broker(|stream| {
            let (typ, _) = read_packet(stream)?;
            thread::sleep(Duration::from_secs(7));
            stream.write_all(&CONNACK_ACCEPTED)?;
            Ok(vec![typ])
        });

        let cli = client_for(port);
        let opts = ConnectOptionsBuilder::new()
            .connect_timeout(Duration::from_secs(30))
            .finalize();

        cli.connect(opts).wait_for(Duration::from_secs(20)).unwrap();
        assert!(cli.is_connected());
        assert_eq!(vec![CONNECT], broker.join().unwrap().unwrap());
    }

    #[test]
    fn test_connect_timeout() {
        let (port, broker) = fake_broker(|stream| {
            let (typ, _) = read_packet(stream)?;
            // Never answer
            thread::sleep(Duration::from_secs(3));
            Ok(vec![typ])
        });

        let cli = client_for(port);
        let opts = ConnectOptionsBuilder::new()
            .connect_timeout(Duration::from_secs(1))
            .finalize();

        let start = Instant::now();
        let res = cli.connect(opts).wait_for(TIMEOUT);

        assert!(matches!(res, Err(Error::Timeout)));
        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(ConnectionState::Disconnected, cli.state());
        broker.join().unwrap().unwrap();
    }

    // A handshake failure goes to the SSL error handler and fails the
    // connect token.
    #[test]
    fn test_tls_failure_reported_to_handler() {
        let (port, broker) = fake_broker(|stream| {
            let mut hello = [0u8; 512];
            let n = stream.read(&mut hello)?;
            stream.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n")?;
            let _ = stream.read_to_end(&mut Vec::new());
            Ok(vec![n.min(1) as u8])
        });

        let ca = env::temp_dir().join(format!("async_client_{}_ca.crt", std::process::id()));
        fs::write(&ca, TEST_CA).unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let handler_count = Arc::clone(&count);

        let ssl = SslOptionsBuilder::new()
            .trust_store(&ca)
            .error_handler(move |_msg| {
                handler_count.fetch_add(1, Ordering::SeqCst);
            })
            .finalize();
        let opts = ConnectOptionsBuilder::new().ssl_options(ssl).finalize();

        let uri = format!("mqtts://127.0.0.1:{}", port);
        let cli = AsyncClient::new((uri.as_str(), "async_client_test")).unwrap();
        let res = cli.connect(opts).wait_for(TIMEOUT);

        assert!(matches!(res, Err(Error::Tls(_))));
        assert_eq!(1, count.load(Ordering::SeqCst));
        assert_eq!(ConnectionState::Disconnected, cli.state());

        // The client got as far as sending its hello
        drop(cli);
        assert_eq!(vec![1], broker.join().unwrap().unwrap());
        let _ = fs::remove_file(ca);
    }
}
