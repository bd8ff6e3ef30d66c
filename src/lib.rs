pub mod capture;
pub mod config;
pub mod decode;
pub mod error;
pub mod link;
pub mod output;
pub mod preamble;
pub mod siglent;
pub mod table;
pub mod types;

pub use capture::{CaptureOrchestrator, CaptureRequest};
pub use decode::{decode_samples, VoltageSeries};
pub use error::CaptureError;
pub use link::InstrumentLink;
pub use output::write_csv;
pub use preamble::{decode_preamble, ByteWidth, ChannelDescriptor, PREAMBLE_LEN};
pub use siglent::{ConnectionConfig, SiglentClient, SiglentClientBuilder, SCPI_PORT};
pub use table::CaptureTable;
pub use types::{Channel, CHANNEL_SLOTS};
