// ssl_options.rs
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

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use rumqttc::TlsConfiguration;

use crate::errors::{Error, Result};

/// Handler for errors reported by the TLS layer.
pub type SslErrorHandler = dyn Fn(&str) + Send + Sync + 'static;

/// The options for SSL socket connections to the broker.
///
/// All of the certificate and key files are expected in PEM format.
/// The files are not read until the client connects.
#[derive(Clone, Default)]
pub struct SslOptions {
    trust_store: Option<PathBuf>,
    key_store: Option<PathBuf>,
    private_key: Option<PathBuf>,
    alpn_protos: Vec<String>,
    error_handler: Option<Arc<SslErrorHandler>>,
}

impl SslOptions {
    /// Creates a new set of default SSL options
    pub fn new() -> Self {
        Self::default()
    }

    /// The file of trusted CA certificates used to verify the server.
    pub fn trust_store(&self) -> Option<&Path> {
        self.trust_store.as_deref()
    }

    /// The file containing the client's certificate chain. This may also
    /// contain the client's private key.
    pub fn key_store(&self) -> Option<&Path> {
        self.key_store.as_deref()
    }

    /// The file containing the client's private key, if it is not
    /// included in the key store.
    pub fn private_key(&self) -> Option<&Path> {
        self.private_key.as_deref()
    }

    /// The ALPN protocols offered during the handshake.
    pub fn alpn_protos(&self) -> &[String] {
        &self.alpn_protos
    }

    /// Whether an error handler was registered.
    pub fn has_error_handler(&self) -> bool {
        self.error_handler.is_some()
    }

    // Reports a TLS failure to the application's handler, if any.
    pub(crate) fn on_error(&self, msg: &str) {
        if let Some(ref handler) = self.error_handler {
            trace!("Invoking SSL error handler");
            handler(msg);
        }
    }

    /// Reads the certificate files and creates the TLS configuration for
    /// the network transport.
    pub(crate) fn tls_configuration(&self) -> Result<TlsConfiguration> {
        let trust_store = self
            .trust_store
            .as_ref()
            .ok_or(Error::General("No trust store in the SSL options"))?;

        debug!("Loading trust store: {}", trust_store.display());
        let ca = fs::read(trust_store)?;

        let client_auth = match self.key_store {
            Some(ref key_store) => {
                debug!("Loading key store: {}", key_store.display());
                let certs = fs::read(key_store)?;
                let key = match self.private_key {
                    Some(ref private_key) => fs::read(private_key)?,
                    None => certs.clone(),
                };
                Some((certs, key))
            }
            None => None,
        };

        let alpn = if self.alpn_protos.is_empty() {
            None
        }
        else {
            Some(
                self.alpn_protos
                    .iter()
                    .map(|proto| proto.as_bytes().to_vec())
                    .collect(),
            )
        };

        Ok(TlsConfiguration::Simple {
            ca,
            alpn,
            client_auth,
        })
    }
}

impl fmt::Debug for SslOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SslOptions")
            .field("trust_store", &self.trust_store)
            .field("key_store", &self.key_store)
            .field("private_key", &self.private_key)
            .field("alpn_protos", &self.alpn_protos)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

/////////////////////////////////////////////////////////////////////////////
//                              Builder
/////////////////////////////////////////////////////////////////////////////

/// Builder to create SSL Options.
#[derive(Default)]
pub struct SslOptionsBuilder {
    opts: SslOptions,
}

impl SslOptionsBuilder {
    /// Creates a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the PEM file of trusted CA certificates.
    pub fn trust_store<P>(&mut self, trust_store: P) -> &mut Self
    where
        P: Into<PathBuf>,
    {
        self.opts.trust_store = Some(trust_store.into());
        self
    }

    /// Sets the PEM file with the client certificate chain, and optionally
    /// the client's private key.
    pub fn key_store<P>(&mut self, key_store: P) -> &mut Self
    where
        P: Into<PathBuf>,
    {
        self.opts.key_store = Some(key_store.into());
        self
    }

    /// Sets the PEM file with the client's private key, when it is kept
    /// apart from the key store.
    pub fn private_key<P>(&mut self, private_key: P) -> &mut Self
    where
        P: Into<PathBuf>,
    {
        self.opts.private_key = Some(private_key.into());
        self
    }

    /// Sets the list of ALPN protocols to offer to the server.
    pub fn alpn_protos<T>(&mut self, protos: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        self.opts.alpn_protos = protos.iter().map(|p| p.as_ref().to_string()).collect();
        self
    }

    /// Sets a handler to receive TLS error messages.
    pub fn error_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.opts.error_handler = Some(Arc::new(handler));
        self
    }

    /// Finalize the builder to create the SSL options.
    pub fn finalize(&self) -> SslOptions {
        self.opts.clone()
    }
}

/////////////////////////////////////////////////////////////////////////////
//                              Unit Tests
/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        env,
        sync::atomic::{AtomicUsize, Ordering},
    };

    const TRUST_STORE: &str = "some_file.crt";
    const KEY_STORE: &str = "some_file.pem";

    // Writes a scratch file in the temp dir, unique to the test.
    fn scratch_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = env::temp_dir().join(format!("ssl_opts_{}_{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_new() {
        let opts = SslOptions::new();
        assert!(opts.trust_store().is_none());
        assert!(opts.key_store().is_none());
        assert!(opts.private_key().is_none());
        assert!(opts.alpn_protos().is_empty());
        assert!(!opts.has_error_handler());
    }

    #[test]
    fn test_builder_stores() {
        let opts = SslOptionsBuilder::new()
            .trust_store(TRUST_STORE)
            .key_store(KEY_STORE)
            .finalize();

        assert_eq!(Some(Path::new(TRUST_STORE)), opts.trust_store());
        assert_eq!(Some(Path::new(KEY_STORE)), opts.key_store());
    }

    #[test]
    fn test_error_handler() {
        static COUNT: AtomicUsize = AtomicUsize::new(0);

        let opts = SslOptionsBuilder::new()
            .error_handler(|_msg| {
                COUNT.fetch_add(1, Ordering::SeqCst);
            })
            .finalize();

        // The clone shares the same handler
        let opts2 = opts.clone();
        opts.on_error("bad certificate");
        opts2.on_error("bad certificate");
        assert_eq!(2, COUNT.load(Ordering::SeqCst));
    }

    #[test]
    fn test_tls_config_requires_trust_store() {
        let res = SslOptions::new().tls_configuration();
        assert!(matches!(res, Err(Error::General(_))));
    }

    #[test]
    fn test_tls_config_missing_file() {
        let res = SslOptionsBuilder::new()
            .trust_store("/no/such/dir/test-root-ca.crt")
            .finalize()
            .tls_configuration();
        assert!(matches!(res, Err(Error::Io(_))));
    }

    #[test]
    fn test_tls_config_from_files() {
        let ca = scratch_file("ca.crt", b"CA");
        let ks = scratch_file("client.pem", b"CERT+KEY");
        let key = scratch_file("client.key", b"KEY");

        let opts = SslOptionsBuilder::new()
            .trust_store(&ca)
            .key_store(&ks)
            .alpn_protos(&["mqtt"])
            .finalize();

        match opts.tls_configuration().unwrap() {
            TlsConfiguration::Simple { ca, alpn, client_auth } => {
                assert_eq!(b"CA".to_vec(), ca);
                assert_eq!(Some(vec![b"mqtt".to_vec()]), alpn);
                assert_eq!(Some((b"CERT+KEY".to_vec(), b"CERT+KEY".to_vec())), client_auth);
            }
            _ => panic!("unexpected TLS configuration"),
        }

        let opts = SslOptionsBuilder::new()
            .trust_store(&ca)
            .key_store(&ks)
            .private_key(&key)
            .finalize();

        match opts.tls_configuration().unwrap() {
            TlsConfiguration::Simple { client_auth, alpn, .. } => {
                assert_eq!(None, alpn);
                assert_eq!(Some((b"CERT+KEY".to_vec(), b"KEY".to_vec())), client_auth);
            }
            _ => panic!("unexpected TLS configuration"),
        }

        for path in [ca, ks, key] {
            let _ = fs::remove_file(path);
        }
    }
}
