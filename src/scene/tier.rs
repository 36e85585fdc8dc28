use glam::Vec3;

/// Color as a function of the band value that selected the tier.
pub type ColorRamp = fn(f32) -> Vec3;

/// One row of the tier table.
#[derive(Debug, Clone, Copy)]
pub struct Tier {
    pub name: &'static str,
    /// Exclusive upper bound of the values this tier accepts.
    pub upper: f32,
    pub color: ColorRamp,
    /// Children made active while this tier is selected.
    pub child_count: usize,
}

/// Values below this are silence: zero height, calm color, no children.
pub const SILENCE_THRESHOLD: f32 = 0.01;

/// Largest `child_count` in [`TIERS`]; the size of a full child pool.
pub const MAX_CHILDREN: usize = 20;

/// Evaluated top to bottom, first tier whose `upper` exceeds the value wins.
///
/// "cool" and "surge" share a color ramp and differ only in child count.
pub const TIERS: [Tier; 5] = [
    Tier {
        name: "calm",
        upper: SILENCE_THRESHOLD,
        color: calm,
        child_count: 0,
    },
    Tier {
        name: "warm",
        upper: 0.3,
        color: warm,
        child_count: 2,
    },
    Tier {
        name: "cool",
        upper: 0.5,
        color: cool,
        child_count: 8,
    },
    Tier {
        name: "surge",
        upper: 0.6,
        color: cool,
        child_count: 14,
    },
    Tier {
        name: "hot",
        upper: f32::INFINITY,
        color: hot,
        child_count: MAX_CHILDREN,
    },
];

fn calm(_value: f32) -> Vec3 {
    Vec3::new(0.2, 0.1, 0.8)
}

fn warm(value: f32) -> Vec3 {
    Vec3::new(value * 4.0, 0.1, 1.0)
}

fn cool(value: f32) -> Vec3 {
    Vec3::new(0.4 * value * 1.2, value * 2.0, 1.0)
}

fn hot(value: f32) -> Vec3 {
    Vec3::new(0.7 * value, 0.3 * value, 0.0)
}

/// Tier for a band value. NaN is treated as silence.
pub fn tier_for(value: f32) -> &'static Tier {
    if value.is_nan() {
        return &TIERS[0];
    }
    TIERS
        .iter()
        .find(|tier| value < tier.upper)
        .unwrap_or(&TIERS[TIERS.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(tier_for(-1.0).name, "calm");
        assert_eq!(tier_for(0.0).name, "calm");
        assert_eq!(tier_for(0.0099).name, "calm");
        assert_eq!(tier_for(0.01).name, "warm");
        assert_eq!(tier_for(0.2999).name, "warm");
        assert_eq!(tier_for(0.3).name, "cool");
        assert_eq!(tier_for(0.5).name, "surge");
        assert_eq!(tier_for(0.6).name, "hot");
        assert_eq!(tier_for(f32::INFINITY).name, "hot");
        assert_eq!(tier_for(f32::NAN).name, "calm");
    }

    #[test]
    fn test_thresholds_ascend() {
        assert!(TIERS.windows(2).all(|pair| pair[0].upper < pair[1].upper));
    }

    #[test]
    fn test_max_children_matches_table() {
        let largest = TIERS.iter().map(|tier| tier.child_count).max();
        assert_eq!(largest, Some(MAX_CHILDREN));
    }

    #[test]
    fn test_middle_tiers_share_color_ramp() {
        let cool_tier = tier_for(0.4);
        let surge_tier = tier_for(0.55);
        assert_eq!((cool_tier.color)(0.45), (surge_tier.color)(0.45));
        assert_ne!(cool_tier.child_count, surge_tier.child_count);
    }
}
