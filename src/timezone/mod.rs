pub mod ordering;
pub mod resolver;

pub use ordering::{
    SortDirection, TimeZoneOrderingEngine, TimeZoneRecord, ZoneView, Zoned, UNKNOWN_ZONE,
    ZONE_PAIRS,
};
pub use resolver::{abbreviation_at, parse_zone, TimeZoneResolver, FALLBACK_ZONE};
