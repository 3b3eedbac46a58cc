// ABOUTME: Strongly-typed 3GPP 23.038 data coding scheme with alphabet and message class
// ABOUTME: Rejects compressed and reserved coding groups instead of guessing an alphabet

use crate::codec::DecodeError;
use std::fmt;

/// Character alphabet selected by the data coding scheme
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Alphabet {
    /// GSM 7-bit default alphabet, septets packed across octets
    #[default]
    Gsm7,
    /// 8-bit data
    EightBit,
    /// UCS-2, big-endian 16-bit code units
    Ucs2,
}

impl Alphabet {
    /// Units (septets, octets or UCS2 code units) that fit a part without a header
    pub fn single_part_capacity(&self) -> usize {
        match self {
            Alphabet::Gsm7 => 160,
            Alphabet::EightBit => 140,
            Alphabet::Ucs2 => 70,
        }
    }

    /// Units that fit a part carrying the 6-octet concatenation header
    pub fn concatenated_capacity(&self) -> usize {
        match self {
            Alphabet::Gsm7 => 153,
            Alphabet::EightBit => 134,
            Alphabet::Ucs2 => 67,
        }
    }

    /// Returns the character set name for this alphabet
    pub fn charset_name(&self) -> &'static str {
        match self {
            Alphabet::Gsm7 => "GSM 7-bit Default",
            Alphabet::EightBit => "8-bit Data",
            Alphabet::Ucs2 => "UCS-2",
        }
    }
}

/// Message class for SMS delivery
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MessageClass {
    /// Class 0, displayed immediately and not stored
    Flash,
    /// Class 1, mobile equipment specific
    MobileEquipment,
    /// Class 2, SIM specific
    SimSpecific,
    /// Class 3, terminal equipment specific
    TerminalEquipment,
}

impl MessageClass {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => MessageClass::Flash,
            1 => MessageClass::MobileEquipment,
            2 => MessageClass::SimSpecific,
            _ => MessageClass::TerminalEquipment,
        }
    }

    /// Returns a human-readable description of the message class
    pub fn description(&self) -> &'static str {
        match self {
            MessageClass::Flash => "Flash SMS (immediate display)",
            MessageClass::MobileEquipment => "Mobile Equipment specific",
            MessageClass::SimSpecific => "SIM card storage",
            MessageClass::TerminalEquipment => "Terminal Equipment specific",
        }
    }
}

/// A decoded TP-DCS octet
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DataCoding {
    alphabet: Alphabet,
    message_class: Option<MessageClass>,
    raw: u8,
}

impl DataCoding {
    /// General data coding, default alphabet, no class
    pub const GSM7: DataCoding = DataCoding {
        alphabet: Alphabet::Gsm7,
        message_class: None,
        raw: 0x00,
    };

    /// General data coding, UCS2, no class
    pub const UCS2: DataCoding = DataCoding {
        alphabet: Alphabet::Ucs2,
        message_class: None,
        raw: 0x08,
    };

    /// Data coding used for outbound messages in the given alphabet
    pub fn for_alphabet(alphabet: Alphabet) -> Self {
        match alphabet {
            Alphabet::Gsm7 => Self::GSM7,
            Alphabet::Ucs2 => Self::UCS2,
            Alphabet::EightBit => DataCoding {
                alphabet,
                message_class: None,
                raw: 0x04,
            },
        }
    }

    /// Classifies a raw TP-DCS octet
    pub fn from_byte(value: u8) -> Result<Self, DecodeError> {
        let (alphabet, message_class) = match value >> 4 {
            // General data coding (00xx) and automatic deletion (01xx) groups
            0x0..=0x7 => {
                if value & 0x20 != 0 {
                    // compressed text
                    return Err(DecodeError::UnrecognizedDcs(value));
                }
                let alphabet = match (value >> 2) & 0x03 {
                    0 => Alphabet::Gsm7,
                    1 => Alphabet::EightBit,
                    2 => Alphabet::Ucs2,
                    _ => return Err(DecodeError::UnrecognizedDcs(value)),
                };
                let class = (value & 0x10 != 0).then(|| MessageClass::from_bits(value));
                (alphabet, class)
            }
            // Message waiting indication: discard / store
            0xC | 0xD => (Alphabet::Gsm7, None),
            0xE => (Alphabet::Ucs2, None),
            // Data coding / message class
            0xF => {
                let alphabet = if value & 0x04 != 0 {
                    Alphabet::EightBit
                } else {
                    Alphabet::Gsm7
                };
                (alphabet, Some(MessageClass::from_bits(value)))
            }
            _ => return Err(DecodeError::UnrecognizedDcs(value)),
        };

        Ok(DataCoding {
            alphabet,
            message_class,
            raw: value,
        })
    }

    /// Returns the raw u8 value for the wire
    pub fn to_byte(&self) -> u8 {
        self.raw
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    /// Returns the message class if this coding scheme includes one
    pub fn message_class(&self) -> Option<MessageClass> {
        self.message_class
    }
}

impl Default for DataCoding {
    fn default() -> Self {
        Self::GSM7
    }
}

impl fmt::Display for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.alphabet.charset_name())?;
        if let Some(class) = self.message_class {
            write!(f, " ({})", class.description())?;
        }
        Ok(())
    }
}

impl From<DataCoding> for u8 {
    fn from(data_coding: DataCoding) -> Self {
        data_coding.to_byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_group() {
        assert_eq!(DataCoding::from_byte(0x00).unwrap(), DataCoding::GSM7);
        assert_eq!(DataCoding::from_byte(0x08).unwrap(), DataCoding::UCS2);
        assert_eq!(
            DataCoding::from_byte(0x04).unwrap().alphabet(),
            Alphabet::EightBit
        );
    }

    #[test]
    fn test_general_group_with_class() {
        let dcs = DataCoding::from_byte(0x18).unwrap();
        assert_eq!(dcs.alphabet(), Alphabet::Ucs2);
        assert_eq!(dcs.message_class(), Some(MessageClass::Flash));

        let dcs = DataCoding::from_byte(0x12).unwrap();
        assert_eq!(dcs.alphabet(), Alphabet::Gsm7);
        assert_eq!(dcs.message_class(), Some(MessageClass::SimSpecific));
    }

    #[test]
    fn test_automatic_deletion_group() {
        assert_eq!(
            DataCoding::from_byte(0x48).unwrap().alphabet(),
            Alphabet::Ucs2
        );
    }

    #[test]
    fn test_message_waiting_and_class_groups() {
        assert_eq!(
            DataCoding::from_byte(0xC0).unwrap().alphabet(),
            Alphabet::Gsm7
        );
        assert_eq!(
            DataCoding::from_byte(0xE8).unwrap().alphabet(),
            Alphabet::Ucs2
        );
        let dcs = DataCoding::from_byte(0xF1).unwrap();
        assert_eq!(dcs.alphabet(), Alphabet::Gsm7);
        assert_eq!(dcs.message_class(), Some(MessageClass::MobileEquipment));
        assert_eq!(
            DataCoding::from_byte(0xF6).unwrap().alphabet(),
            Alphabet::EightBit
        );
    }

    #[test]
    fn test_rejected_values() {
        // compressed
        assert_eq!(
            DataCoding::from_byte(0x20),
            Err(DecodeError::UnrecognizedDcs(0x20))
        );
        // reserved alphabet
        assert_eq!(
            DataCoding::from_byte(0x0C),
            Err(DecodeError::UnrecognizedDcs(0x0C))
        );
        // reserved coding groups
        assert_eq!(
            DataCoding::from_byte(0x80),
            Err(DecodeError::UnrecognizedDcs(0x80))
        );
        assert_eq!(
            DataCoding::from_byte(0xB5),
            Err(DecodeError::UnrecognizedDcs(0xB5))
        );
    }

    #[test]
    fn test_capacities() {
        assert_eq!(Alphabet::Gsm7.single_part_capacity(), 160);
        assert_eq!(Alphabet::Gsm7.concatenated_capacity(), 153);
        assert_eq!(Alphabet::Ucs2.single_part_capacity(), 70);
        assert_eq!(Alphabet::Ucs2.concatenated_capacity(), 67);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", DataCoding::GSM7), "GSM 7-bit Default");
        assert_eq!(
            format!("{}", DataCoding::from_byte(0x18).unwrap()),
            "UCS-2 (Flash SMS (immediate display))"
        );
    }
}
