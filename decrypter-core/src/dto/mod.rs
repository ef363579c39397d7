//! Data Transfer Objects for the solver service
//!
//! Wire shapes of `POST /solve` and `GET /tasks/{task_id}`. The service
//! always answers with cumulative state, so a snapshot replaces whatever the
//! caller held before; a delta-based service would need a different merge.

pub mod task;
