use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Zone used when a postal code cannot be resolved.
///
/// Unresolvable codes are treated as Eastern. This is a product decision carried
/// over from the lead list, not a guess about any particular code.
pub const FALLBACK_ZONE: Tz = chrono_tz::America::New_York;

/// Three-digit ZIP prefix ranges, checked in order. Anything unmatched is Eastern.
const PREFIX_TABLE: &[(u16, u16, Tz)] = &[
    (995, 999, chrono_tz::America::Anchorage),
    (967, 968, chrono_tz::Pacific::Honolulu),
    // CA
    (900, 961, chrono_tz::America::Los_Angeles),
    // OR, WA
    (970, 986, chrono_tz::America::Los_Angeles),
    // NV
    (889, 898, chrono_tz::America::Los_Angeles),
    // CO
    (800, 816, chrono_tz::America::Denver),
    // WY, ID, MT
    (820, 838, chrono_tz::America::Denver),
    // UT
    (840, 847, chrono_tz::America::Denver),
    // AZ, NM (Arizona grouped with Mountain)
    (850, 865, chrono_tz::America::Denver),
    (875, 884, chrono_tz::America::Denver),
    // Upper Midwest, IL, MO, KS, NE, LA, OK, TX, AR
    (500, 658, chrono_tz::America::Chicago),
    (660, 693, chrono_tz::America::Chicago),
    (700, 799, chrono_tz::America::Chicago),
];

/// Maps postal codes to IANA zones. Never fails: bad input lands on `fallback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeZoneResolver {
    fallback: Tz,
}

impl Default for TimeZoneResolver {
    fn default() -> Self {
        Self {
            fallback: FALLBACK_ZONE,
        }
    }
}

impl TimeZoneResolver {
    pub fn with_fallback(fallback: Tz) -> Self {
        Self { fallback }
    }

    /// Build from a configured zone name; an unknown name keeps the default fallback.
    pub fn from_zone_name(name: &str) -> Self {
        parse_zone(name).map(Self::with_fallback).unwrap_or_default()
    }

    pub fn fallback(&self) -> Tz {
        self.fallback
    }

    pub fn zone_for_postal_code(&self, postal_code: &str) -> Tz {
        let Some(prefix) = zip_prefix(postal_code) else {
            return self.fallback;
        };

        PREFIX_TABLE
            .iter()
            .find(|(low, high, _)| (*low..=*high).contains(&prefix))
            .map(|(_, _, zone)| *zone)
            .unwrap_or(chrono_tz::America::New_York)
    }

    /// Prefer an explicit zone name when it parses, else go through the postal code.
    pub fn zone_for(&self, explicit: Option<&str>, postal_code: Option<&str>) -> Tz {
        explicit
            .and_then(parse_zone)
            .unwrap_or_else(|| self.zone_for_postal_code(postal_code.unwrap_or_default()))
    }
}

fn zip_prefix(postal_code: &str) -> Option<u16> {
    let trimmed = postal_code.trim();
    let prefix = trimmed.get(..3)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

pub fn parse_zone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Short display abbreviation for `zone` at `at`, e.g. `EDT` in July and `EST` in
/// January. Derived from the offset in effect, so it is DST-correct by construction.
pub fn abbreviation_at(zone: Tz, at: DateTime<Utc>) -> String {
    let local = zone.from_utc_datetime(&at.naive_utc());
    local
        .format("%Z")
        .to_string()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}
