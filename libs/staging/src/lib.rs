//! Preparing device exports for batch loading: archive extraction, path
//! conventions, re-shaping into combined CSVs, cost estimates and transfer.

pub mod archive;
pub mod batch;
pub mod csv;
pub mod error;
pub mod estimate;
pub mod layout;
pub mod transfer;

pub use archive::{extraction_root, remove_unzipped, unzip_walk};
pub use batch::{BatchConfig, BatchWriter, StageReport, PENDING_DIR};
pub use error::StagingError;
pub use estimate::{count_rows, WriteCostModel};
pub use layout::{extract_ids_from_path, extract_month, filter_streams, stream_of, StreamSelection};
pub use transfer::{dir_size, package, send, TransferReport};
