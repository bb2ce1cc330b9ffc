use serde::{Deserialize, Serialize};

/// A disposition the user can pick, with the accent color it paints the card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispositionOption {
    pub name: String,
    pub color: String,
}

/// Disposition names and their colors. Owned by the wider app; the inspector only reads.
pub trait DispositionPalette {
    /// Color for `name`, or the default color for names the palette does not know.
    fn color_for(&self, name: &str) -> String;

    /// Every selectable disposition in display order.
    fn options(&self) -> Vec<DispositionOption>;

    fn default_color(&self) -> String;
}

pub const DEFAULT_DISPOSITION_COLOR: &str = "#FFFFFF";

const STANDARD_DISPOSITIONS: &[(&str, &str)] = &[
    ("Positive Contact", "#38A169"),
    ("Negative Contact", "#E53E3E"),
    ("Employer Coverage", "#2196F3"),
    ("Brokie", "#FF9800"),
    ("Buy Or Die", "#9C27B0"),
    ("Unhealthy/Referred", "#795548"),
    ("Foreign", "#607D8B"),
    ("Quoted", "#00BCD4"),
    ("SOLD", "#84CC16"),
    ("Appointment", "#FFC107"),
    ("No Contact", "#805AD5"),
    ("Invalid/Disconnected", "#E91E63"),
    ("Hung Up", "#9E9E9E"),
    ("Ghosted", "#E6F0F5"),
];

/// The palette the lead list ships with.
#[derive(Debug, Clone, Default)]
pub struct StandardPalette;

impl DispositionPalette for StandardPalette {
    fn color_for(&self, name: &str) -> String {
        STANDARD_DISPOSITIONS
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, color)| (*color).to_string())
            .unwrap_or_else(|| self.default_color())
    }

    fn options(&self) -> Vec<DispositionOption> {
        STANDARD_DISPOSITIONS
            .iter()
            .map(|(name, color)| DispositionOption {
                name: (*name).to_string(),
                color: (*color).to_string(),
            })
            .collect()
    }

    fn default_color(&self) -> String {
        DEFAULT_DISPOSITION_COLOR.to_string()
    }
}

/// Light accents need dark text on top of them.
pub fn is_light_color(color: &str) -> bool {
    color.eq_ignore_ascii_case("#FFFFFF") || color.eq_ignore_ascii_case("#E6F0F5")
}
