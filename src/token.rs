// token.rs
//
// This file is part of the secure MQTT publisher.
//

/*******************************************************************************
 * Copyright (c) 2018-2023 Frank Pagliughi <fpagliughi@mindspring.com>
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

//! The Token module.
//!
//! Asynchronous operations return a `Token` that is a type of future. It
//! can be used to determine if an operation has completed, block and wait
//! for the operation to complete, and obtain the final result.
//! For example, you can start a connection, do something else, and then
//! wait for the connection to complete.
//!
//! The Token object implements the Future trait, and thus can be used and
//! combined with any other Rust futures.
//!

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll, Waker},
    time::Duration,
};

use futures::{
    executor::block_on,
    future::{self, Either},
};
use futures_timer::Delay;

use crate::{
    errors::{Error, Result},
    message::Message,
};

/////////////////////////////////////////////////////////////////////////////
// Token

/// The result data for the token.
/// This is the guarded elements in the token which are updated by the
/// network event loop when the operation completes.
#[derive(Debug, Default)]
pub(crate) struct TokenData {
    /// Whether the async action has completed
    complete: bool,
    /// The MQTT Message ID
    msg_id: u16,
    /// Whether the action failed
    failed: bool,
    /// The error, until it is handed to the waiter
    err: Option<Error>,
    /// The waker for the future task
    waker: Option<Waker>,
}

impl TokenData {
    /// Creates token data for a specific message
    fn from_message_id(msg_id: u16) -> TokenData {
        TokenData {
            msg_id,
            ..TokenData::default()
        }
    }

    /// Creates token data that is already signaled with an error.
    fn from_error(err: Error) -> TokenData {
        TokenData {
            complete: true,
            failed: true,
            err: Some(err),
            ..TokenData::default()
        }
    }
}

/////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Default)]
pub(crate) struct TokenInner {
    // Mutex guards: (done, err, msgid, waker)
    lock: Mutex<TokenData>,
    // The message (valid only for "delivery" tokens)
    msg: Option<Message>,
}

impl TokenInner {
    fn data(&self) -> MutexGuard<'_, TokenData> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/////////////////////////////////////////////////////////////////////////////

/// A `Token` is a mechanism for tracking the progress of an asynchronous
/// operation.
#[derive(Debug, Clone, Default)]
pub struct Token {
    pub(crate) inner: Arc<TokenInner>,
}

impl Token {
    /// Creates a new, unsignaled Token.
    pub fn new() -> Token {
        Token::default()
    }

    /// Creates a new, un-signaled delivery Token.
    /// This is a token which tracks delivery of a message.
    pub fn from_message(msg: Message) -> Token {
        Token {
            inner: Arc::new(TokenInner {
                lock: Mutex::new(TokenData::from_message_id(0)),
                msg: Some(msg),
            }),
        }
    }

    /// Creates a new Token signaled with an error.
    pub fn from_error(err: Error) -> Token {
        Token {
            inner: Arc::new(TokenInner {
                lock: Mutex::new(TokenData::from_error(err)),
                msg: None,
            }),
        }
    }

    /// Creates a new Token that is already signaled with success.
    pub fn from_success() -> Token {
        let tok = Token::new();
        tok.on_complete(Ok(()));
        tok
    }

    /// Called by the network event loop to signal the completion of the
    /// operation. Any task waiting on the token is woken.
    pub(crate) fn on_complete(&self, res: Result<()>) {
        let mut data = self.inner.data();
        if data.complete {
            trace!("Token already complete");
            return;
        }

        match res {
            Ok(()) => debug!("Token completed: msg id {}", data.msg_id),
            Err(err) => {
                debug!("Token failed: msg id {}: {}", data.msg_id, err);
                data.failed = true;
                data.err = Some(err);
            }
        }
        data.complete = true;

        // If this is none, it means that no one is waiting on
        // the future yet, so we don't need to kick it.
        if let Some(waker) = data.waker.take() {
            waker.wake();
        }
    }

    /// Sets the message ID for the token
    pub(crate) fn set_msgid(&self, msg_id: u16) {
        self.inner.data().msg_id = msg_id;
    }

    /// Gets the MQTT packet identifier assigned to the operation.
    /// This is zero until a QoS 1 or 2 message is sent.
    pub fn message_id(&self) -> u16 {
        self.inner.data().msg_id
    }

    /// Gets the message associated with a delivery token.
    pub fn message(&self) -> Option<&Message> {
        self.inner.msg.as_ref()
    }

    /// Determines whether the operation has completed, successfully or not.
    pub fn is_complete(&self) -> bool {
        self.inner.data().complete
    }

    /// Checks the token for completion without blocking.
    /// Returns `None` if the operation is still pending.
    pub fn try_wait(&mut self) -> Option<Result<()>> {
        let mut data = self.inner.data();
        if data.complete {
            Some(Self::outcome(&mut data))
        }
        else {
            None
        }
    }

    /// Blocks the caller until the asynchronous operation completes.
    pub fn wait(self) -> Result<()> {
        block_on(self)
    }

    /// Blocks the caller a limited amount of time waiting for the
    /// asynchronous operation to complete.
    ///
    /// If the time elapses, `Error::Timeout` is returned. The operation
    /// itself is not cancelled and may still complete later.
    pub fn wait_for(self, dur: Duration) -> Result<()> {
        block_on(async move {
            match future::select(self, Delay::new(dur)).await {
                Either::Left((res, _)) => res,
                Either::Right(_) => Err(Error::Timeout),
            }
        })
    }

    // The result for a completed token.
    // The error can only be moved out once. Later checks get a generic
    // failure.
    fn outcome(data: &mut TokenData) -> Result<()> {
        match data.err.take() {
            Some(err) => Err(err),
            None if data.failed => Err(Error::Failure),
            None => Ok(()),
        }
    }
}

impl Future for Token {
    type Output = Result<()>;

    /// Poll the token to see if the request has completed yet.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut data = self.inner.data();

        if !data.complete {
            data.waker = Some(cx.waker().clone());
            Poll::Pending
        }
        else {
            Poll::Ready(Self::outcome(&mut data))
        }
    }
}

/// `Token` specificly for a message delivery operation.
pub type DeliveryToken = Token;

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_new() {
        let tok = Token::new();
        assert!(!tok.is_complete());
        assert!(tok.message().is_none());
    }

    #[test]
    fn test_from_message() {
        const MSG_ID: u16 = 42;
        let msg = Message::new("hello", "Hi there", 1);

        let tok = Token::from_message(msg);
        assert!(!tok.is_complete());
        assert_eq!(0, tok.message_id());

        tok.set_msgid(MSG_ID);
        assert_eq!(MSG_ID, tok.message_id());
        assert_eq!("hello", tok.message().unwrap().topic());
    }

    // Created from an error, should be complete with that error.
    #[test]
    fn test_from_error() {
        let tok = Token::from_error(Error::Disconnected);
        assert!(tok.is_complete());
        assert!(matches!(tok.wait(), Err(Error::Disconnected)));
    }

    #[test]
    fn test_from_success() {
        let tok = Token::from_success();
        assert!(tok.is_complete());
        assert!(tok.wait().is_ok());
    }

    #[test]
    fn test_try_wait() {
        let mut tok = Token::new();
        assert!(tok.try_wait().is_none());

        tok.on_complete(Err(Error::BadQos));
        assert!(matches!(tok.try_wait(), Some(Err(Error::BadQos))));
        // The error is only delivered once
        assert!(matches!(tok.try_wait(), Some(Err(Error::Failure))));
    }

    // Only the first completion counts.
    #[test]
    fn test_complete_once() {
        let tok = Token::new();
        tok.on_complete(Ok(()));
        tok.on_complete(Err(Error::Disconnected));
        assert!(tok.wait().is_ok());
    }

    // Completion from another thread wakes the waiter.
    #[test]
    fn test_wait_completed_from_thread() {
        let tok = Token::new();
        let tok2 = tok.clone();

        let thr = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            tok2.on_complete(Ok(()));
        });

        assert!(tok.wait().is_ok());
        thr.join().unwrap();
    }

    #[test]
    fn test_wait_for_timeout() {
        let tok = Token::new();
        let res = tok.clone().wait_for(Duration::from_millis(20));
        assert!(matches!(res, Err(Error::Timeout)));

        // The timeout doesn't cancel the operation
        assert!(!tok.is_complete());
        tok.on_complete(Ok(()));
        assert!(tok.wait_for(Duration::from_millis(20)).is_ok());
    }

    // Cloned tokens should share the same inner data.
    #[test]
    fn test_token_clones() {
        let tok1 = Token::new();
        let tok2 = tok1.clone();
        assert!(Arc::ptr_eq(&tok1.inner, &tok2.inner));

        tok1.on_complete(Ok(()));
        assert!(tok2.is_complete());
    }
}
