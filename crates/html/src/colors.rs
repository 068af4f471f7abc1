//! Color values and the color mini-grammar.
//!
//! Exactly three source forms parse: `#` followed by up to six hex
//! digits, `rgb(`/`rgba(` with comma-separated unsigned integers, and a
//! case-insensitive named color. Anything else leaves the color invalid;
//! callers treat an invalid color as "absence of the derived fact" and
//! fall back to inheritance or defaults.

use std::cmp::Ordering;
use std::sync::OnceLock;

/// An RGBA color; `valid == false` means unset.
///
/// Alpha defaults to opaque for every parsed form; `rgba()` alpha is
/// parsed positionally but discarded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color {
    pub valid: bool,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: u8,
}

impl Color {
    pub const INVALID: Color = Color {
        valid: false,
        r: 0,
        g: 0,
        b: 0,
        alpha: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color {
            valid: true,
            r,
            g,
            b,
            alpha: 255,
        }
    }

    /// Opaque black, the terminal font-color fallback.
    pub const fn black() -> Color {
        Color::rgb(0, 0, 0)
    }

    /// Packed `0xRRGGBB` view of the channels.
    pub fn value(&self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    fn from_packed(value: u32) -> Color {
        Color {
            valid: true,
            r: (value >> 16) as u8,
            g: (value >> 8) as u8,
            b: value as u8,
            alpha: 255,
        }
    }
}

struct NamedColor {
    name: &'static str,
    rgb: (u8, u8, u8),
}

macro_rules! named {
    ($name:literal, $r:literal, $g:literal, $b:literal) => {
        NamedColor {
            name: $name,
            rgb: ($r, $g, $b),
        }
    };
}

static NAMED_COLORS: &[NamedColor] = &[
    named!("aliceblue", 240, 248, 255),
    named!("antiquewhite", 250, 235, 215),
    named!("aqua", 0, 255, 255),
    named!("aquamarine", 127, 255, 212),
    named!("azure", 240, 255, 255),
    named!("beige", 245, 245, 220),
    named!("bisque", 255, 228, 196),
    named!("black", 0, 0, 0),
    named!("blanchedalmond", 255, 235, 205),
    named!("blue", 0, 0, 255),
    named!("blueviolet", 138, 43, 226),
    named!("brown", 165, 42, 42),
    named!("burlywood", 222, 184, 135),
    named!("cadetblue", 95, 158, 160),
    named!("chartreuse", 127, 255, 0),
    named!("chocolate", 210, 105, 30),
    named!("coral", 255, 127, 80),
    named!("cornflowerblue", 100, 149, 237),
    named!("cornsilk", 255, 248, 220),
    named!("crimson", 220, 20, 60),
    named!("cyan", 0, 255, 255),
    named!("darkblue", 0, 0, 139),
    named!("darkcyan", 0, 139, 139),
    named!("darkgoldenrod", 184, 134, 11),
    named!("darkgray", 169, 169, 169),
    named!("darkgreen", 0, 100, 0),
    named!("darkgrey", 169, 169, 169),
    named!("darkkhaki", 189, 183, 107),
    named!("darkmagenta", 139, 0, 139),
    named!("darkolivegreen", 85, 107, 47),
    named!("darkorange", 255, 140, 0),
    named!("darkorchid", 153, 50, 204),
    named!("darkred", 139, 0, 0),
    named!("darksalmon", 233, 150, 122),
    named!("darkseagreen", 143, 188, 143),
    named!("darkslateblue", 72, 61, 139),
    named!("darkslategray", 47, 79, 79),
    named!("darkslategrey", 47, 79, 79),
    named!("darkturquoise", 0, 206, 209),
    named!("darkviolet", 148, 0, 211),
    named!("deeppink", 255, 20, 147),
    named!("deepskyblue", 0, 191, 255),
    named!("dimgray", 105, 105, 105),
    named!("dimgrey", 105, 105, 105),
    named!("dodgerblue", 30, 144, 255),
    named!("firebrick", 178, 34, 34),
    named!("floralwhite", 255, 250, 240),
    named!("forestgreen", 34, 139, 34),
    named!("fuchsia", 255, 0, 255),
    named!("gainsboro", 220, 220, 220),
    named!("ghostwhite", 248, 248, 255),
    named!("gold", 255, 215, 0),
    named!("goldenrod", 218, 165, 32),
    named!("gray", 128, 128, 128),
    named!("green", 0, 128, 0),
    named!("greenyellow", 173, 255, 47),
    named!("grey", 128, 128, 128),
    named!("honeydew", 240, 255, 240),
    named!("hotpink", 255, 105, 180),
    named!("indianred", 205, 92, 92),
    named!("indigo", 75, 0, 130),
    named!("ivory", 255, 255, 240),
    named!("khaki", 240, 230, 140),
    named!("lavender", 230, 230, 250),
    named!("lavenderblush", 255, 240, 245),
    named!("lawngreen", 124, 252, 0),
    named!("lemonchiffon", 255, 250, 205),
    named!("lightblue", 173, 216, 230),
    named!("lightcoral", 240, 128, 128),
    named!("lightcyan", 224, 255, 255),
    named!("lightgoldenrodyellow", 250, 250, 210),
    named!("lightgray", 211, 211, 211),
    named!("lightgreen", 144, 238, 144),
    named!("lightgrey", 211, 211, 211),
    named!("lightpink", 255, 182, 193),
    named!("lightsalmon", 255, 160, 122),
    named!("lightseagreen", 32, 178, 170),
    named!("lightskyblue", 135, 206, 250),
    named!("lightslategray", 119, 136, 153),
    named!("lightslategrey", 119, 136, 153),
    named!("lightsteelblue", 176, 196, 222),
    named!("lightyellow", 255, 255, 224),
    named!("lime", 0, 255, 0),
    named!("limegreen", 50, 205, 50),
    named!("linen", 250, 240, 230),
    named!("magenta", 255, 0, 255),
    named!("maroon", 128, 0, 0),
    named!("mediumaquamarine", 102, 205, 170),
    named!("mediumblue", 0, 0, 205),
    named!("mediumorchid", 186, 85, 211),
    named!("mediumpurple", 147, 112, 219),
    named!("mediumseagreen", 60, 179, 113),
    named!("mediumslateblue", 123, 104, 238),
    named!("mediumspringgreen", 0, 250, 154),
    named!("mediumturquoise", 72, 209, 204),
    named!("mediumvioletred", 199, 21, 133),
    named!("midnightblue", 25, 25, 112),
    named!("mintcream", 245, 255, 250),
    named!("mistyrose", 255, 228, 225),
    named!("moccasin", 255, 228, 181),
    named!("navajowhite", 255, 222, 173),
    named!("navy", 0, 0, 128),
    named!("oldlace", 253, 245, 230),
    named!("olive", 128, 128, 0),
    named!("olivedrab", 107, 142, 35),
    named!("orange", 255, 165, 0),
    named!("orangered", 255, 69, 0),
    named!("orchid", 218, 112, 214),
    named!("palegoldenrod", 238, 232, 170),
    named!("palegreen", 152, 251, 152),
    named!("paleturquoise", 175, 238, 238),
    named!("palevioletred", 219, 112, 147),
    named!("papayawhip", 255, 239, 213),
    named!("peachpuff", 255, 218, 185),
    named!("peru", 205, 133, 63),
    named!("pink", 255, 192, 203),
    named!("plum", 221, 160, 221),
    named!("powderblue", 176, 224, 230),
    named!("purple", 128, 0, 128),
    named!("red", 255, 0, 0),
    named!("rosybrown", 188, 143, 143),
    named!("royalblue", 65, 105, 225),
    named!("saddlebrown", 139, 69, 19),
    named!("salmon", 250, 128, 114),
    named!("sandybrown", 244, 164, 96),
    named!("seagreen", 46, 139, 87),
    named!("seashell", 255, 245, 238),
    named!("sienna", 160, 82, 45),
    named!("silver", 192, 192, 192),
    named!("skyblue", 135, 206, 235),
    named!("slateblue", 106, 90, 205),
    named!("slategray", 112, 128, 144),
    named!("slategrey", 112, 128, 144),
    named!("snow", 255, 250, 250),
    named!("springgreen", 0, 255, 127),
    named!("steelblue", 70, 130, 180),
    named!("tan", 210, 180, 140),
    named!("teal", 0, 128, 128),
    named!("thistle", 216, 191, 216),
    named!("tomato", 255, 99, 71),
    named!("turquoise", 64, 224, 208),
    named!("violet", 238, 130, 238),
    named!("wheat", 245, 222, 179),
    named!("white", 255, 255, 255),
    named!("whitesmoke", 245, 245, 245),
    named!("yellow", 255, 255, 0),
    named!("yellowgreen", 154, 205, 50),
];

fn name_order(a: &[u8], b: &[u8]) -> Ordering {
    a.iter()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.iter().map(|c| c.to_ascii_lowercase()))
}

fn colors_by_name() -> &'static [&'static NamedColor] {
    static BY_NAME: OnceLock<Vec<&'static NamedColor>> = OnceLock::new();
    BY_NAME.get_or_init(|| {
        let mut colors: Vec<&NamedColor> = NAMED_COLORS.iter().collect();
        colors.sort_by(|a, b| name_order(a.name.as_bytes(), b.name.as_bytes()));
        colors
    })
}

fn named_color(name: &[u8]) -> Option<Color> {
    let colors = colors_by_name();
    colors
        .binary_search_by(|c| name_order(c.name.as_bytes(), name))
        .ok()
        .map(|i| {
            let (r, g, b) = colors[i].rgb;
            Color::rgb(r, g, b)
        })
}

/// Parse one color value.
///
/// Accepted forms: `#rrggbb` (up to six hex digits, leading digits of a
/// truncated window, no range validation), `rgb(r,g,b)` / `rgba(r,g,b,a)`
/// (arbitrary interior whitespace, alpha discarded), or a named color.
/// Everything else yields [`Color::INVALID`].
pub fn parse_color(input: &[u8]) -> Color {
    if input.is_empty() {
        return Color::INVALID;
    }

    if input[0] == b'#' {
        // Hex: parse the leading hex digits of a window capped at six
        // bytes, strtoul-style; zero digits still parse as zero.
        let window = &input[1..input.len().min(7)];
        let mut value: u32 = 0;
        for &byte in window {
            match (byte as char).to_digit(16) {
                Some(d) => value = (value << 4) | d,
                None => break,
            }
        }
        return Color::from_packed(value);
    }

    if input.len() > 4 && input[..3].eq_ignore_ascii_case(b"rgb") {
        return parse_rgb(input);
    }

    named_color(input).unwrap_or(Color::INVALID)
}

/// `rgb(` / `rgba(` state machine; any unexpected byte aborts and leaves
/// the color invalid.
fn parse_rgb(input: &[u8]) -> Color {
    enum State {
        Obrace,
        Num1,
        Num2,
        Num3,
        SkipSpaces,
    }

    let mut p = 3;
    if input.get(p) == Some(&b'a') {
        p += 1;
    }

    let mut state = State::SkipSpaces;
    let mut next_state = State::Obrace;
    let mut component_start = p;
    // Set once trailing whitespace ends a number, before its delimiter.
    let mut component_end: Option<usize> = None;
    let mut channels = [0u32; 3];
    let mut channel = 0usize;

    fn component(input: &[u8], start: usize, end: usize) -> Option<u32> {
        if start == end {
            return None;
        }
        let mut value: u32 = 0;
        for &byte in &input[start..end] {
            let digit = (byte as char).to_digit(10)?;
            value = value.saturating_mul(10).saturating_add(digit);
        }
        Some(value)
    }

    let len = input.len();
    while p <= len {
        let byte = input.get(p).copied();
        match state {
            State::Obrace => match byte {
                Some(b'(') => {
                    p += 1;
                    state = State::SkipSpaces;
                    next_state = State::Num1;
                }
                Some(b) if b.is_ascii_whitespace() => {
                    state = State::SkipSpaces;
                    next_state = State::Obrace;
                }
                _ => return Color::INVALID,
            },
            State::Num1 | State::Num2 => match byte {
                Some(b',') => {
                    let end = component_end.take().unwrap_or(p);
                    let Some(value) = component(input, component_start, end) else {
                        return Color::INVALID;
                    };
                    channels[channel] = value;
                    channel += 1;
                    p += 1;
                    next_state = if matches!(state, State::Num1) {
                        State::Num2
                    } else {
                        State::Num3
                    };
                    state = State::SkipSpaces;
                }
                Some(b) if b.is_ascii_digit() => {
                    if component_end.is_some() {
                        return Color::INVALID;
                    }
                    p += 1;
                }
                Some(b) if b.is_ascii_whitespace() => {
                    component_end.get_or_insert(p);
                    p += 1;
                }
                _ => return Color::INVALID,
            },
            State::Num3 => match byte {
                // The third channel closes on ',' (an rgba alpha follows,
                // parsed positionally and discarded), ')' or end of input.
                Some(b',') | Some(b')') | None => {
                    let end = component_end.take().unwrap_or(p);
                    let Some(value) = component(input, component_start, end) else {
                        return Color::INVALID;
                    };
                    channels[channel] = value;
                    return Color::rgb(channels[0] as u8, channels[1] as u8, channels[2] as u8);
                }
                Some(b) if b.is_ascii_digit() => {
                    if component_end.is_some() {
                        return Color::INVALID;
                    }
                    p += 1;
                }
                Some(b) if b.is_ascii_whitespace() => {
                    component_end.get_or_insert(p);
                    p += 1;
                }
                _ => return Color::INVALID,
            },
            State::SkipSpaces => match byte {
                Some(b) if b.is_ascii_whitespace() => p += 1,
                None => return Color::INVALID,
                Some(_) => {
                    component_start = p;
                    component_end = None;
                    state = std::mem::replace(&mut next_state, State::Obrace);
                }
            },
        }
    }

    Color::INVALID
}
