//! Shared data model for parsed documents.

use crate::colors::Color;
use crate::tags::TagId;

/// Stable arena index of a tree node.
pub type NodeId = u32;

/// Attribute kinds the parser materializes.
///
/// This is a fixed allowlist conditioned on tag identity; everything else
/// is parsed for positioning but discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentKind {
    /// `href` on any tag, `src` on any tag.
    Href,
    /// `width` on `<img>`.
    Width,
    /// `height` on `<img>`.
    Height,
    /// `style` on `<img>` and block-level tags.
    Style,
    /// `color` on block-level tags.
    Color,
    /// `bgcolor` on block-level tags.
    Bgcolor,
    /// `class` on block-level tags.
    Class,
}

/// One materialized attribute; the value is entity-decoded.
#[derive(Clone, Debug)]
pub struct Component {
    pub kind: ComponentKind,
    pub value: Vec<u8>,
}

/// `<img>` metadata extracted from attributes and inline style.
#[derive(Clone, Debug, Default)]
pub struct ImageRecord {
    pub src: Option<String>,
    /// `cid:` source, i.e. an attachment referenced from the body.
    pub embedded: bool,
    pub width: u32,
    pub height: u32,
}

/// Visual metadata for a block-level tag.
#[derive(Clone, Debug)]
pub struct BlockRecord {
    pub font_color: Color,
    pub background_color: Color,
    pub style: Option<Vec<u8>>,
    pub class: Option<String>,
    pub visible: bool,
}

impl Default for BlockRecord {
    fn default() -> Self {
        BlockRecord {
            font_color: Color::INVALID,
            background_color: Color::INVALID,
            style: None,
            class: None,
            visible: true,
        }
    }
}

/// Reference to a registered URL: which shared table, and the slot in it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UrlRef {
    pub mailto: bool,
    pub index: usize,
}

/// Per-tag extra payload, chosen by tag identity.
#[derive(Clone, Debug, Default)]
pub enum Extra {
    #[default]
    None,
    Image(ImageRecord),
    Block(BlockRecord),
    Url(UrlRef),
}

/// One parsed tag instance.
///
/// `id` is `None` for unknown or broken tags (excluded from the tree).
/// `flags` carries the definition's content-model bits plus runtime
/// `FL_*` bits.
#[derive(Clone, Debug, Default)]
pub struct HtmlTag {
    pub id: Option<TagId>,
    pub name: Vec<u8>,
    pub flags: u32,
    pub components: Vec<Component>,
    pub content_length: usize,
    pub extra: Extra,
}

impl HtmlTag {
    /// First `Href` component with a non-empty value, if any.
    pub fn href(&self) -> Option<&[u8]> {
        self.components
            .iter()
            .find(|c| c.kind == ComponentKind::Href && !c.value.is_empty())
            .map(|c| c.value.as_slice())
    }
}

/// Region of the normalized text that downstream tokenization must treat
/// specially.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExceptionKind {
    Newline,
    Url,
}

/// Exceptions are ordered by `pos` when handed downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessException {
    pub pos: usize,
    pub len: usize,
    pub kind: ExceptionKind,
}
