use serde::{Deserialize, Serialize};

/// One of the nine building models a house slot can hold, ordered by height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildingVariant {
    OneStory,
    OneStoryB,
    TwoStory,
    TwoStoryB,
    ThreeStory,
    ThreeStoryB,
    FourStory,
    FourStoryB,
    SixStory,
}

/// Lower bounds of buckets 1..=8; bucket 0 starts at 0.0.
const NOISE_BOUNDS: [f64; 8] = [
    1.0 / 9.0,
    2.0 / 9.0,
    3.0 / 9.0,
    4.0 / 9.0,
    5.0 / 9.0,
    6.0 / 9.0,
    7.0 / 9.0,
    8.0 / 9.0,
];

impl BuildingVariant {
    pub const ALL: [BuildingVariant; 9] = [
        BuildingVariant::OneStory,
        BuildingVariant::OneStoryB,
        BuildingVariant::TwoStory,
        BuildingVariant::TwoStoryB,
        BuildingVariant::ThreeStory,
        BuildingVariant::ThreeStoryB,
        BuildingVariant::FourStory,
        BuildingVariant::FourStoryB,
        BuildingVariant::SixStory,
    ];

    /// Pick the variant for a normalized noise value.
    ///
    /// Buckets are `[k/9, (k+1)/9)`; anything at or above `8/9` lands in the
    /// last bucket.
    pub fn from_noise(value: f64) -> Self {
        Self::ALL[NOISE_BOUNDS.partition_point(|bound| *bound <= value)]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn stories(self) -> u32 {
        match self {
            Self::OneStory | Self::OneStoryB => 1,
            Self::TwoStory | Self::TwoStoryB => 2,
            Self::ThreeStory | Self::ThreeStoryB => 3,
            Self::FourStory | Self::FourStoryB => 4,
            Self::SixStory => 6,
        }
    }

    /// Model file stem.
    pub fn asset_name(self) -> &'static str {
        match self {
            Self::OneStory => "1Story",
            Self::OneStoryB => "1StoryB",
            Self::TwoStory => "2Story",
            Self::TwoStoryB => "2StoryB",
            Self::ThreeStory => "3Story",
            Self::ThreeStoryB => "3StoryB",
            Self::FourStory => "4Story",
            Self::FourStoryB => "4StoryB",
            Self::SixStory => "6Story",
        }
    }
}

impl std::fmt::Display for BuildingVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.asset_name())
    }
}
