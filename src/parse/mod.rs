pub mod catalog_parser;
pub mod catalog_serializer;
pub mod keyword_parser;
pub mod keyword_serializer;

pub use catalog_parser::{parse_catalog, parse_category};
pub use catalog_serializer::{serialize_catalog, serialize_category};
pub use keyword_parser::{normalize_keyword_value, normalize_keywords};
pub use keyword_serializer::{keyword_to_value, keywords_to_value};
