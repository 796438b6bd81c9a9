//! The fixed category list and its threshold table.

use serde::{Serialize, Serializer};
use std::fmt;

/// Number of categories a trip can be labelled with.
pub const CATEGORY_COUNT: usize = 11;

/// A qualitative label a trip may receive.
///
/// Declaration order is the iteration order used by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Quick,
    Reliable,
    Cheap,
    Comfortable,
    DoorToDoor,
    EnvironmentallyFriendly,
    Short,
    Multitasking,
    Social,
    Panoramic,
    Healthy,
}

impl Category {
    pub const ALL: [Category; CATEGORY_COUNT] = [
        Category::Quick,
        Category::Reliable,
        Category::Cheap,
        Category::Comfortable,
        Category::DoorToDoor,
        Category::EnvironmentallyFriendly,
        Category::Short,
        Category::Multitasking,
        Category::Social,
        Category::Panoramic,
        Category::Healthy,
    ];

    /// Name used on the wire and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Category::Quick => "Quick",
            Category::Reliable => "Reliable",
            Category::Cheap => "Cheap",
            Category::Comfortable => "Comfortable",
            Category::DoorToDoor => "Door-to-door",
            // published spelling, clients match on it
            Category::EnvironmentallyFriendly => "Envirnmentally friendly",
            Category::Short => "Short",
            Category::Multitasking => "Multitasking",
            Category::Social => "Social",
            Category::Panoramic => "Panoramic",
            Category::Healthy => "Healthy",
        }
    }

    /// Minimum feature score (inclusive) a trip needs to receive this category.
    ///
    /// | Category                | Threshold |
    /// |-------------------------|-----------|
    /// | Quick                   | 0.390     |
    /// | Reliable                | 0.520     |
    /// | Cheap                   | 0.580     |
    /// | Comfortable             | 0.380     |
    /// | Door-to-door            | 0.330     |
    /// | Envirnmentally friendly | 0.410     |
    /// | Short                   | 0.750     |
    /// | Multitasking            | 0.380     |
    /// | Social                  | 0.320     |
    /// | Panoramic               | 0.540     |
    /// | Healthy                 | 0.630     |
    pub fn threshold(&self) -> f64 {
        match self {
            Category::Quick => 0.390,
            Category::Reliable => 0.520,
            Category::Cheap => 0.580,
            Category::Comfortable => 0.380,
            Category::DoorToDoor => 0.330,
            Category::EnvironmentallyFriendly => 0.410,
            Category::Short => 0.750,
            Category::Multitasking => 0.380,
            Category::Social => 0.320,
            Category::Panoramic => 0.540,
            Category::Healthy => 0.630,
        }
    }

    /// Position in [`Category::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Looks a category up by its wire name.
    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
