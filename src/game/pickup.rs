//! Pickups and the distance-weighted choice of what each spot holds
//!
//! Near the center of the map pickups lean towards weapons and armor; near
//! the edges health becomes the most likely kind.

use rand::Rng;
use serde::Serialize;

use super::geometry::Location;

/// Weapons a player can own. Stats live client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Weapon {
    Sword,
    Shotgun,
    Pistol,
    Blaster,
    Crossbow,
    Rifle,
    Boomerang,
    Lightsaber,
    Spear,
    BanHammer,
    BeeSwarm,
}

impl Weapon {
    /// Every player starts with this one
    pub const DEFAULT: Weapon = Weapon::Sword;

    /// Weapons that can appear as pickups
    pub const PICKUPS: [Weapon; 10] = [
        Weapon::Shotgun,
        Weapon::Pistol,
        Weapon::Blaster,
        Weapon::Crossbow,
        Weapon::Rifle,
        Weapon::Boomerang,
        Weapon::Lightsaber,
        Weapon::Spear,
        Weapon::BanHammer,
        Weapon::BeeSwarm,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupKind {
    Health,
    Armor,
    Weapon,
}

/// What a pickup spot grants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pickup {
    Health(u32),
    Armor(u32),
    Weapon(Weapon),
}

impl Pickup {
    pub fn type_name(&self) -> &'static str {
        match self {
            Pickup::Health(_) => "Health",
            Pickup::Armor(_) => "Armor",
            Pickup::Weapon(_) => "Weapon",
        }
    }

    /// Health or armor granted; zero for weapons
    pub fn amount(&self) -> u32 {
        match self {
            Pickup::Health(n) | Pickup::Armor(n) => *n,
            Pickup::Weapon(_) => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickupSpot {
    pub location: Location,
    pub pickup: Pickup,
    pub available: bool,
}

impl PickupSpot {
    pub fn new(location: Location, pickup: Pickup) -> Self {
        Self {
            location,
            pickup,
            available: true,
        }
    }
}

const MIN_AMOUNT: f64 = 10.0;
const MAX_AMOUNT: f64 = 50.0;
const AMOUNT_STEP: f64 = 5.0;

/// Normalized (health, armor, weapon) probabilities for a spot at
/// `ratio` = distance from center / half the short map extent.
pub fn kind_probabilities(ratio: f64) -> [f64; 3] {
    let ratio = ratio.clamp(0.0, 1.0);
    let health = 50.0 * ratio;
    let armor = 50.0 - 25.0 * ratio;
    let weapon = 50.0 - 10.0 * ratio;
    let total = health + armor + weapon;
    [health / total, armor / total, weapon / total]
}

/// Pick a kind from a uniform `draw` in `[0, 1)` against the cumulative
/// distribution, in health, armor, weapon order.
pub fn choose_kind(ratio: f64, draw: f64) -> PickupKind {
    let [health, armor, _] = kind_probabilities(ratio);
    if draw < health {
        PickupKind::Health
    } else if draw < health + armor {
        PickupKind::Armor
    } else {
        PickupKind::Weapon
    }
}

/// Health/armor magnitude: larger further from the center, in steps of 5
pub fn pickup_amount(dist: f64, range: f64) -> u32 {
    let scale = if range > 0.0 {
        (dist / range).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let raw = MIN_AMOUNT + (MAX_AMOUNT - MIN_AMOUNT) * scale;
    ((raw / AMOUNT_STEP).round() * AMOUNT_STEP) as u32
}

/// Roll the contents of a spot `dist` meters from the map center
pub fn roll_pickup<R: Rng + ?Sized>(rng: &mut R, dist: f64, half_range: f64) -> Pickup {
    let ratio = if half_range > 0.0 { dist / half_range } else { 0.0 };
    match choose_kind(ratio, rng.gen::<f64>()) {
        PickupKind::Health => Pickup::Health(pickup_amount(dist, half_range * 2.0)),
        PickupKind::Armor => Pickup::Armor(pickup_amount(dist, half_range * 2.0)),
        PickupKind::Weapon => {
            Pickup::Weapon(Weapon::PICKUPS[rng.gen_range(0..Weapon::PICKUPS.len())])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn probabilities_sum_to_one() {
        for ratio in [0.0, 0.25, 0.5, 0.9, 1.0, 3.0] {
            let p = kind_probabilities(ratio);
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
            assert!(p.iter().all(|&x| x >= 0.0));
        }
    }

    #[test]
    fn center_has_no_health_and_most_weapons() {
        let [health, armor, weapon] = kind_probabilities(0.0);
        assert_eq!(health, 0.0);
        assert!(weapon >= armor);
        assert!(weapon > kind_probabilities(1.0)[2]);
    }

    #[test]
    fn edge_favours_health() {
        let [health, armor, weapon] = kind_probabilities(1.0);
        assert!(health > armor && health > weapon);
        assert!(health > kind_probabilities(0.5)[0]);
    }

    #[test]
    fn draws_map_to_cumulative_buckets() {
        // ratio 1.0 → health 50/115, armor 25/115, weapon 40/115
        assert_eq!(choose_kind(1.0, 0.0), PickupKind::Health);
        assert_eq!(choose_kind(1.0, 0.43), PickupKind::Health);
        assert_eq!(choose_kind(1.0, 0.5), PickupKind::Armor);
        assert_eq!(choose_kind(1.0, 0.9), PickupKind::Weapon);
        assert_eq!(choose_kind(0.0, 0.1), PickupKind::Armor);
    }

    #[test]
    fn fixed_seed_fixed_pickup() {
        let a = roll_pickup(&mut ChaCha8Rng::seed_from_u64(11), 20.0, 50.0);
        let b = roll_pickup(&mut ChaCha8Rng::seed_from_u64(11), 20.0, 50.0);
        assert_eq!(a, b);
    }

    #[test]
    fn weapon_pickups_never_grant_the_default() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..500 {
            if let Pickup::Weapon(w) = roll_pickup(&mut rng, 0.0, 50.0) {
                assert_ne!(w, Weapon::DEFAULT);
            }
        }
    }

    #[test]
    fn amounts_scale_with_distance_in_steps_of_five() {
        assert_eq!(pickup_amount(0.0, 100.0), 10);
        assert_eq!(pickup_amount(50.0, 100.0), 30);
        assert_eq!(pickup_amount(500.0, 100.0), 50);
        assert_eq!(pickup_amount(12.0, 100.0) % 5, 0);
    }
}
