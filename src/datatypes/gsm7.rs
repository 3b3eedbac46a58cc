// ABOUTME: GSM 03.38 default alphabet with its extension table and 7-bit septet packing
// ABOUTME: Classifies text for the 7-bit path and converts between characters, septets and packed octets

/// Escape septet introducing a character from the extension table
pub const ESCAPE: u8 = 0x1B;

/// GSM 03.38 default alphabet, indexed by septet value. Position 0x1B is the
/// escape code and never matches a character.
const BASIC: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{1B}', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à', //
];

/// Extension table entries reachable through `ESCAPE`
const EXTENSION: [(u8, char); 10] = [
    (0x0A, '\u{0C}'),
    (0x14, '^'),
    (0x28, '{'),
    (0x29, '}'),
    (0x2F, '\\'),
    (0x3C, '['),
    (0x3D, '~'),
    (0x3E, ']'),
    (0x40, '|'),
    (0x65, '€'),
];

/// Septet sequence for one character: one septet from the basic table or an
/// escape pair from the extension table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Septets {
    Basic(u8),
    Extended(u8),
}

impl Septets {
    /// Number of septets this character occupies
    pub fn len(&self) -> usize {
        match self {
            Septets::Basic(_) => 1,
            Septets::Extended(_) => 2,
        }
    }

    pub fn push_to(&self, out: &mut Vec<u8>) {
        match *self {
            Septets::Basic(code) => out.push(code),
            Septets::Extended(code) => {
                out.push(ESCAPE);
                out.push(code);
            }
        }
    }
}

/// Look up a character in the default alphabet, then the extension table
pub fn septets_for(c: char) -> Option<Septets> {
    if c == '\u{1B}' {
        return None;
    }
    if let Some(code) = BASIC.iter().position(|&b| b == c) {
        return Some(Septets::Basic(code as u8));
    }
    EXTENSION
        .iter()
        .find(|(_, ext)| *ext == c)
        .map(|(code, _)| Septets::Extended(*code))
}

/// True when every character of `text` is representable in 7-bit
pub fn is_encodable(text: &str) -> bool {
    text.chars().all(|c| septets_for(c).is_some())
}

/// Convert text to unpacked septets, or `None` if a character is not in the alphabet
pub fn to_septets(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        septets_for(c)?.push_to(&mut out);
    }
    Some(out)
}

/// Convert unpacked septets back to text. An escape followed by a code with
/// no extension entry falls back to the basic table; a trailing escape is dropped.
pub fn from_septets(septets: &[u8]) -> String {
    let mut text = String::with_capacity(septets.len());
    let mut iter = septets.iter().map(|s| s & 0x7F);
    while let Some(septet) = iter.next() {
        if septet == ESCAPE {
            let Some(code) = iter.next() else { break };
            match EXTENSION.iter().find(|(ext, _)| *ext == code) {
                Some((_, c)) => text.push(*c),
                None => text.push(BASIC[code as usize]),
            }
        } else {
            text.push(BASIC[septet as usize]);
        }
    }
    text
}

/// Pack septets into octets, LSB first, starting after `fill_bits` zero bits
/// (used to align text after a user data header)
pub fn pack(septets: &[u8], fill_bits: usize) -> Vec<u8> {
    let total_bits = fill_bits + septets.len() * 7;
    let mut out = vec![0u8; total_bits.div_ceil(8)];
    for (i, &septet) in septets.iter().enumerate() {
        let septet = u16::from(septet & 0x7F);
        let bit = fill_bits + i * 7;
        let (index, shift) = (bit / 8, bit % 8);
        out[index] |= (septet << shift) as u8;
        if shift > 1 {
            out[index + 1] |= (septet >> (8 - shift)) as u8;
        }
    }
    out
}

/// Septets occupied by a user data header of `header_octets` octets (UDHL
/// included), and the fill bits needed to start the text on a septet boundary
pub fn header_alignment(header_octets: usize) -> (usize, usize) {
    let bits = header_octets * 8;
    let septets = bits.div_ceil(7);
    (septets, septets * 7 - bits)
}

/// Unpack `count` septets from octets, skipping `fill_bits` leading bits.
/// Returns `None` if the octets are too short.
pub fn unpack(octets: &[u8], fill_bits: usize, count: usize) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let bit = fill_bits + i * 7;
        let (index, shift) = (bit / 8, bit % 8);
        let mut value = u16::from(*octets.get(index)?) >> shift;
        if shift > 1 {
            value |= u16::from(*octets.get(index + 1)?) << (8 - shift);
        }
        out.push((value & 0x7F) as u8);
    }
    Some(out)
}
