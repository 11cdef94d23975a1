pub mod client;
pub mod ticket;
pub mod uploader;

pub use client::{StudioBackend, StudioClient};
pub use ticket::{AssetStatus, ProcessingStatus, UploadTicket};
pub use uploader::{UploadPhase, UploadProgress, Uploader};
