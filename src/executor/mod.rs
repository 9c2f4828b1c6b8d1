// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Parallel execution and collection engine.

mod coordinator;
mod error;
mod merge;
mod naming;
mod outcome;
mod request;
mod stream;

pub mod interrupt;
pub mod remote;
pub mod summary;

// Re-export public types
pub use coordinator::{
    drain, substitute_host, Coordinator, RunContext, RunStatus, TargetPhase, TargetSlot,
};
pub use error::ExecError;
pub use interrupt::{ctrl_c_signals, Confirm, InterruptHandler, InterruptReport, StdinConfirm};
pub use merge::merge;
pub use naming::{unique_remote_name, REMOTE_NAME_PREFIX};
pub use outcome::{RunOutcome, SetupStage};
pub use remote::{ExecutionChannels, RemoteExecutor, TransportConfig, SAFE_REMOTE_DIR};
pub use request::{join_commands, profile_prefix, CopySpec, Request, RunPlan};
pub use stream::{collect_chunks, stream_to_channels, CHUNK_SIZE};
pub use summary::{Report, ReportMode, Summary, SummaryGroup};
