//! Defensive HTML-to-text normalization for untrusted mail content.
//!
//! The document parser walks raw bytes with a hand-written state
//! machine, builds a tag tree with balance repair, emits normalized
//! plain text plus an exception list, extracts image/block/color
//! metadata, and correlates anchor targets with their displayed text to
//! flag phishing. Work is bounded structurally (tag cap, linear scans);
//! hostile input degrades to diagnostic flags, never an error or panic.

pub mod colors;
pub mod document;
pub mod entities;
pub mod tags;
pub mod tree;
pub mod types;

mod extract;
mod phishing;
mod tag_parser;

pub use crate::colors::{Color, parse_color};
pub use crate::document::{
    DEFAULT_MAX_TAGS, HtmlDocument, ParserConfig, doc_flags, process_part, process_part_full,
};
pub use crate::entities::{decode_entities, decode_entities_in_place};
pub use crate::tags::{TagId, tag_by_name, tag_id_by_name, tag_name_by_id};
pub use crate::tree::TagTree;
pub use crate::types::{
    BlockRecord, Component, ComponentKind, ExceptionKind, Extra, HtmlTag, ImageRecord, NodeId,
    ProcessException, UrlRef,
};
