pub mod typed_value;

pub use typed_value::{coerce, coerce_deserialize, coerce_with, PropertyType};
