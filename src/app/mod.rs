//! Application-Layer: Befehle, Sitzung, Datei-I/O.

pub mod command;
pub mod command_log;
pub mod file_io;
pub mod session;

pub use command::{JobFile, MapCommand};
pub use command_log::{CommandLog, ExecutedCommand};
pub use session::{CommandOutcome, MapSession, SessionReport};
