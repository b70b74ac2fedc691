pub mod discover;
pub mod file;
pub mod reader;
pub mod timestamp;

pub use discover::{discover_files, discover_source, SourceFile};
pub use file::{instance_id_from_file_name, process_file, FileContext, FileStats};
pub use reader::{LineReader, RawLine, ReaderError};
