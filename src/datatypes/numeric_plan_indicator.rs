// ABOUTME: Numbering plan field of a 3GPP type-of-address octet (bits 3-0)
// ABOUTME: Parsed leniently so reserved plans decode as unknown

use num_enum::TryFromPrimitive;

/// Numbering plan identification, the low nibble of a type-of-address octet
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum NumericPlanIndicator {
    #[default]
    Unknown = 0b0000,
    Isdn = 0b0001,
    Data = 0b0011,
    Telex = 0b0100,
    ServiceCentreSpecific = 0b0101,
    ServiceCentreSpecific2 = 0b0110,
    National = 0b1000,
    Private = 0b1001,
    Ermes = 0b1010,
}

impl NumericPlanIndicator {
    pub fn from_type_of_address(octet: u8) -> Self {
        Self::try_from(octet & 0x0F).unwrap_or_default()
    }
}
