pub mod messaging;

pub use messaging::{run_writer, ClientStream, ConnectionDriver, FrameSink};
