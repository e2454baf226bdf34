// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for the Stratus server: pool construction and schema
//! bootstrap. Domain repositories live next to their domain crates and
//! take a [`sqlx::SqlitePool`] by value.

pub mod error;
pub mod pool;
pub mod schema;

pub use error::{DbError, Result};
pub use pool::create_pool;
pub use schema::init_schema;
