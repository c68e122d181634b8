mod document;
mod markdown;

pub use document::{
    ExportDocument, ExportMessage, ExportThread, clean_text, format_timestamp,
};
pub use markdown::render;
