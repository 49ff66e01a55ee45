// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hookcast: desktop agent that turns relayed webhooks into toasts and
//! clipboard text.

pub mod address;
pub mod config;
pub mod connection;
pub mod control;
pub mod delivery;
pub mod desktop;
pub mod error;
pub mod instance;
pub mod logging;
pub mod notification;
pub mod spawn;
pub mod startup;
pub mod test_support;
pub mod transport;
