//! Forward migrations applied to every config snapshot on read.
//!
//! Each step fills in something older snapshots lack and reports whether it
//! changed anything. Steps must be idempotent; they run on every read.

use std::collections::BTreeMap;

use crate::models::{SectionSetting, SiteConfig};

/// A named, idempotent upgrade step.
pub struct Migration {
    pub name: &'static str,
    pub apply: fn(&mut SiteConfig) -> bool,
}

/// All steps, in the order they run.
pub const MIGRATIONS: &[Migration] = &[Migration {
    name: "default-section-settings",
    apply: add_default_section_settings,
}];

/// Sections in their original fixed layout, with their original color scheme.
pub const DEFAULT_SECTION_LAYOUT: &[(&str, &str)] = &[
    ("hero", "dark"),
    ("about", "light"),
    ("wineMenu", "cream"),
    ("foodPartner", "light"),
    ("events", "dark"),
    ("faq", "cream"),
    ("location", "light"),
];

/// Bring a snapshot up to the current shape.
pub fn ensure_current_shape(mut config: SiteConfig) -> SiteConfig {
    for migration in MIGRATIONS {
        if (migration.apply)(&mut config) {
            tracing::debug!(migration = migration.name, "Applied config migration");
        }
    }
    config
}

/// The section settings every snapshot had before they became editable.
pub fn default_section_settings() -> BTreeMap<String, SectionSetting> {
    DEFAULT_SECTION_LAYOUT
        .iter()
        .enumerate()
        .map(|(order, (section, scheme))| {
            (
                section.to_string(),
                SectionSetting {
                    enabled: true,
                    order: order as u32,
                    color_scheme: Some(scheme.to_string()),
                    ..Default::default()
                },
            )
        })
        .collect()
}

fn add_default_section_settings(config: &mut SiteConfig) -> bool {
    if config.section_settings.is_some() {
        return false;
    }
    config.section_settings = Some(default_section_settings());
    true
}
