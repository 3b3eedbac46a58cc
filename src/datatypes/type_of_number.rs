// ABOUTME: Type-of-number field of a 3GPP type-of-address octet (bits 6-4)
// ABOUTME: Decides whether a number is shown with a leading '+' or decoded as alphanumeric text

use num_enum::TryFromPrimitive;

#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum TypeOfNumber {
    #[default]
    Unknown = 0b000,
    International = 0b001,
    National = 0b010,
    NetworkSpecific = 0b011,
    SubscriberNumber = 0b100,
    Alphanumeric = 0b101,
    Abbreviated = 0b110,
}

impl TypeOfNumber {
    /// Extract the type of number from a type-of-address octet.
    /// The reserved value `0b111` is treated as unknown.
    pub fn from_type_of_address(octet: u8) -> Self {
        Self::try_from((octet >> 4) & 0x07).unwrap_or_default()
    }
}
