// src/lib.rs

pub mod archive;
pub mod config;
pub mod decode;
pub mod error;
pub mod layout;
pub mod model;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod sink;
pub mod table;
pub mod validate;

pub use config::{Config, SourceConfig};
pub use error::{ArchiveError, ParseError, RecordError, TransformError};
pub use model::{Category, Instrument, InstrumentType, MemberClass, MemberFirm, SectorCode, ThemeCode};
pub use parse::{MasterParser, RawRecord};
