// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// The `config` module provides layered configuration loading
pub mod config;

/// The `error` module provides the crate's error type
pub mod error;
