//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements   | Connects to                    |
//! |---------------|--------------|--------------------------------|
//! | `clock`       | Clock        | host wall clock / manual clock |
//! | `config_file` | ConfigPort   | JSON file on disk              |
//! | `sinks`       | Subscriber   | byte streams, tokio channels   |
//! | `log_sink`    | Subscriber   | `log` output                   |

pub mod clock;
pub mod config_file;
pub mod log_sink;
pub mod sinks;

pub use clock::{ManualClock, SystemClock};
pub use config_file::JsonFileConfig;
pub use log_sink::LogSink;
pub use sinks::{ChannelSink, Framing, WriterSink};
