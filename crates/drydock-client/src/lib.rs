//! Client half of drydock: talk to the receiving server and drive a deploy.
//!
//! # Sync pipeline
//!
//! ```text
//! drydock deploy -f deploy.yml <service>
//!   1. Read descriptor   ── first image reference (fatal)
//!   2. Build             ── docker build -t <image> <context> (fatal)
//!   3. Save              ── docker save -o <tmp.tar> (fatal, tmp always removed)
//!   4. Upload image      ── POST /image (fatal)
//!   5. Local digest      ── SHA-256 of deploy.yml (fatal)
//!   6. Remote digest     ── GET /hash (non-fatal, failure means "changed")
//!   7. Upload descriptor ── POST /deploy-file, only if digests differ (fatal)
//!   8. Deploy            ── POST /deploy (fatal)
//! ```
//!
//! The image is always re-sent; only the descriptor upload is skipped when
//! nothing changed.

pub mod pipeline;
pub mod transfer;

pub use pipeline::{SyncError, SyncOutcome, SyncPipeline, SyncRequest};
pub use transfer::{Remote, TransferClient, TransferError};
