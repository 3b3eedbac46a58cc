mod address;
mod data_coding;
pub mod datetime;
pub mod gsm7;
mod numeric_plan_indicator;
mod type_of_number;
mod udh;

pub use address::PhoneNumber;
pub use data_coding::{Alphabet, DataCoding, MessageClass};
pub use datetime::{decode_scts, encode_scts};
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use type_of_number::TypeOfNumber;
pub use udh::{Concatenation, InformationElement, UserDataHeader};
