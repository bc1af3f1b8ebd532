// callback.rs
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

//! Client callbacks.
//!
//! Events that are not the result of a specific request, such as the loss
//! of the connection, are reported through a `Callback` registered with
//! the client. These are invoked from the client's network thread, so
//! implementations should return quickly.

use crate::token::DeliveryToken;

/// Receives asynchronous notifications from a client.
///
/// Both operations default to doing nothing, so an implementation only
/// needs to provide the ones it cares about.
pub trait Callback: Send + Sync {
    /// Called when the connection to the broker is lost unexpectedly.
    ///
    /// `cause` describes the failure. It may be empty.
    fn connection_lost(&self, cause: &str) {
        let _ = cause;
    }

    /// Called when the delivery of a published message has completed.
    /// For QoS 1 and 2 this is when the broker acknowledged the message.
    fn delivery_complete(&self, tok: &DeliveryToken) {
        let _ = tok;
    }
}
