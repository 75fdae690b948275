// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Notification delivery: single engines and worker pools.

pub mod engine;
pub mod identifier;
pub mod listener;
pub mod outcome;
pub mod pool;

pub use engine::{EngineState, EngineStats, SendReport, TransmissionEngine};
pub use identifier::MessageIdGenerator;
pub use listener::{LoggingListener, ProgressListener, RestartReason};
pub use outcome::PushOutcome;
pub use pool::{split_into_groups, PoolMode, PushMessage, WorkerPool, WorkerSnapshot};
