//! DZ archive engine
//!
//! Sits on top of the `dz-format` codec layer and provides everything
//! between the raw tables and a finished extract or a finished archive:
//!
//! - the resolved in-memory model binding user files, chunks and
//!   directories together ([`model`]),
//! - the volume I/O ports abstracting a main file plus split volumes
//!   behind logical reads and writes ([`ports`], with in-memory
//!   implementations in [`memory`]),
//! - the parallel unpack and pack pipelines ([`unpack`], [`pack`]),
//! - progress observation and cooperative cancellation ([`progress`],
//!   [`cancel`]),
//! - the manifest document emitted on unpack and consumed on pack
//!   ([`manifest`]).
//!
//! The engine itself never touches the filesystem and never prints;
//! concrete storage and UI plug in through the ports.

pub mod cancel;
pub mod error;
pub mod manifest;
pub mod memory;
pub mod model;
pub mod pack;
pub mod paths;
pub mod ports;
pub mod progress;
pub mod types;
pub mod unpack;
pub mod volume;

pub use cancel::CancelToken;
pub use error::{CorruptKind, Error, Result};
pub use manifest::{ArchiveInfo, ChunkRecord, FileRecord, Manifest};
pub use model::ArchiveModel;
pub use pack::pack;
pub use ports::{PackOptions, PackSink, PackSource, UnpackOptions, UnpackSink, UnpackSource};
pub use progress::{NoopProgress, Progress};
pub use types::{ChunkConsumer, ChunkPlan, ResolvedFile};
pub use unpack::unpack;
