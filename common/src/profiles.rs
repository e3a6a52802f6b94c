use serde::Serialize;

/// Reserved profile id meaning "operator-defined range in effect".
pub const CUSTOM_PROFILE_ID: u8 = 38;
pub const DEFAULT_PROFILE_ID: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IncubationBand {
    pub temp_min_f: f64,
    pub temp_max_f: f64,
    pub hum_min: f64,
    pub hum_max: f64,
    pub total_days: u16,
    pub turns_per_day: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Profile {
    pub id: u8,
    pub name: &'static str,
    /// `None` for the custom profile, whose band comes from the operator.
    pub incubation: Option<IncubationBand>,
}

const fn preset(
    id: u8,
    name: &'static str,
    temp_min_f: f64,
    temp_max_f: f64,
    hum_min: f64,
    hum_max: f64,
    total_days: u16,
    turns_per_day: u8,
) -> Profile {
    Profile {
        id,
        name,
        incubation: Some(IncubationBand {
            temp_min_f,
            temp_max_f,
            hum_min,
            hum_max,
            total_days,
            turns_per_day,
        }),
    }
}

static PROFILES: [Profile; 39] = [
    preset(0, "Chicken", 98.0, 100.5, 45.0, 55.0, 21, 4),
    preset(1, "Cockatiel", 99.5, 100.0, 45.0, 55.0, 18, 4),
    preset(2, "Cormorant", 99.0, 99.5, 50.0, 60.0, 28, 3),
    preset(3, "Crane", 99.0, 99.5, 50.0, 60.0, 30, 3),
    preset(4, "Duck", 99.5, 100.0, 50.0, 60.0, 28, 4),
    preset(5, "Duck Muscovy", 99.0, 99.5, 50.0, 60.0, 35, 4),
    preset(6, "Eagle", 99.0, 99.5, 45.0, 55.0, 35, 3),
    preset(7, "Emu", 96.5, 97.5, 40.0, 50.0, 50, 3),
    preset(8, "Falcon", 99.0, 99.5, 45.0, 55.0, 32, 3),
    preset(9, "Flamingo", 99.0, 99.5, 50.0, 60.0, 28, 3),
    preset(10, "Goose", 99.0, 99.5, 50.0, 60.0, 30, 4),
    preset(11, "Grouse", 99.5, 100.0, 45.0, 55.0, 24, 4),
    preset(12, "Guinea Fowl", 99.5, 100.0, 45.0, 55.0, 26, 4),
    preset(13, "Hawk", 99.0, 99.5, 45.0, 55.0, 32, 3),
    preset(14, "Heron", 99.0, 99.5, 50.0, 60.0, 28, 3),
    preset(15, "Hummingbird", 99.5, 100.0, 45.0, 55.0, 14, 4),
    preset(16, "Large Parrots", 99.0, 99.5, 45.0, 55.0, 26, 4),
    preset(17, "Lovebird", 99.5, 100.0, 45.0, 55.0, 23, 4),
    preset(18, "Ostrich", 96.0, 97.0, 40.0, 50.0, 42, 3),
    preset(19, "Owl", 99.0, 99.5, 45.0, 55.0, 30, 3),
    preset(20, "Parakeet", 99.5, 100.0, 45.0, 55.0, 18, 4),
    preset(21, "Parrots", 99.5, 100.0, 45.0, 55.0, 26, 4),
    preset(22, "Partridge", 99.5, 100.0, 45.0, 55.0, 24, 4),
    preset(23, "Peacock", 99.5, 100.0, 45.0, 55.0, 28, 4),
    preset(24, "Pelican", 99.0, 99.5, 50.0, 60.0, 30, 3),
    preset(25, "Penguin", 98.5, 99.5, 50.0, 60.0, 35, 3),
    preset(26, "Pheasant", 99.5, 100.0, 45.0, 55.0, 24, 4),
    preset(27, "Pigeon", 99.5, 100.0, 45.0, 55.0, 18, 4),
    preset(28, "Quail", 99.5, 100.5, 45.0, 55.0, 17, 4),
    preset(29, "Rail", 99.0, 99.5, 50.0, 60.0, 20, 3),
    preset(30, "Rhea", 97.0, 98.0, 40.0, 50.0, 40, 3),
    preset(31, "Seabirds", 99.0, 99.5, 50.0, 60.0, 28, 3),
    preset(32, "Songbirds", 99.5, 100.0, 45.0, 55.0, 14, 4),
    preset(33, "Stork", 99.0, 99.5, 50.0, 60.0, 30, 3),
    preset(34, "Swan", 99.0, 99.5, 50.0, 60.0, 35, 4),
    preset(35, "Toucan", 99.0, 99.5, 45.0, 55.0, 18, 4),
    preset(36, "Turkey", 99.0, 100.0, 50.0, 60.0, 28, 4),
    preset(37, "Vulture", 99.0, 99.5, 45.0, 55.0, 42, 3),
    Profile {
        id: CUSTOM_PROFILE_ID,
        name: "Custom",
        incubation: None,
    },
];

pub fn all_profiles() -> &'static [Profile] {
    &PROFILES
}

pub fn profile_by_id(id: u8) -> Option<&'static Profile> {
    PROFILES.iter().find(|profile| profile.id == id)
}

pub fn is_custom(id: u8) -> bool {
    id == CUSTOM_PROFILE_ID
}
