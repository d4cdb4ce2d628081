//! Synthetic lift ticket generator
//!
//! Produces records shaped exactly like the production feed. The resort list
//! is an explicit constructor parameter rather than process-wide state, and
//! the RNG is seedable so tests are deterministic.

use crate::ticket::{Address, EmergencyContact, LiftTicket};
use chrono::{Datelike, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

/// Resorts honored by the synthetic feed
pub const DEFAULT_RESORTS: &[&str] = &[
    "Vail",
    "Beaver Creek",
    "Breckenridge",
    "Keystone",
    "Crested Butte",
    "Park City",
    "Heavenly",
    "Northstar",
    "Kirkwood",
    "Whistler Blackcomb",
    "Perisher",
    "Falls Creek",
    "Hotham",
    "Stowe",
    "Mount Snow",
    "Okemo",
    "Hunter Mountain",
    "Mount Sunapee",
    "Attitash",
    "Wildcat",
    "Crotched",
    "Stevens Pass",
    "Liberty",
    "Roundtop",
    "Whitetail",
    "Jack Frost",
    "Big Boulder",
    "Alpine Valley",
    "Boston Mills",
    "Brandywine",
    "Mad River",
    "Hidden Valley",
    "Snow Creek",
    "Wilmot",
    "Afton Alps",
    "Mt. Brighton",
    "Paoli Peaks",
];

const FIRST_NAMES: &[&str] = &[
    "Avery", "Dana", "Jordan", "Casey", "Riley", "Morgan", "Quinn", "Harper", "Rowan", "Sawyer",
    "Elliot", "Marley", "Noel", "Reese", "Skylar", "Tatum",
];

const LAST_NAMES: &[&str] = &[
    "Whitcomb", "Okafor", "Silva", "Lindgren", "Moreau", "Takahashi", "Vasquez", "Bergstrom",
    "Caruso", "Delgado", "Eriksen", "Fontaine", "Guzman", "Halverson",
];

const STREET_NAMES: &[&str] = &[
    "Larkspur Ln", "Powder Ridge Rd", "Summit Ave", "Timberline Dr", "Aspen Ct", "Mogul Way",
    "Glade St", "Cornice Cir",
];

const CITIES: &[&str] = &[
    "Golden", "Stowe", "Truckee", "Bozeman", "Bend", "Ogden", "Leadville", "Frisco", "Ludlow",
    "Govy",
];

const STATES: &[&str] = &[
    "CO", "VT", "CA", "MT", "OR", "UT", "NH", "WA", "PA", "MN", "MI", "WI", "OH", "NY",
];

const EMAIL_DOMAINS: &[&str] = &["example.com", "example.net", "example.org"];

/// Probability that an optional field is absent
const ABSENT_PROBABILITY: f64 = 0.2;

/// Seedable generator of synthetic lift tickets
pub struct TicketGenerator {
    resorts: Vec<String>,
    rng: StdRng,
}

impl TicketGenerator {
    /// Create a generator over the given resort set, seeded from entropy
    pub fn new(resorts: &[&str]) -> Self {
        Self::with_rng(resorts, StdRng::from_entropy())
    }

    /// Create a deterministic generator for tests
    pub fn with_seed(resorts: &[&str], seed: u64) -> Self {
        Self::with_rng(resorts, StdRng::seed_from_u64(seed))
    }

    fn with_rng(resorts: &[&str], rng: StdRng) -> Self {
        Self {
            resorts: resorts.iter().map(|s| (*s).to_string()).collect(),
            rng,
        }
    }

    /// Generate one ticket
    pub fn generate(&mut self) -> LiftTicket {
        let purchase_time = Utc::now();
        let name = self.person_name();
        LiftTicket {
            txid: Uuid::new_v4().to_string(),
            rfid: self.rfid(),
            resort: self
                .resorts
                .choose(&mut self.rng)
                .cloned()
                .unwrap_or_default(),
            purchase_time,
            expiration_time: season_end(purchase_time.date_naive()),
            days: self.rng.gen_range(1..=7),
            name: name.clone(),
            address: self.maybe(Self::address),
            phone: self.maybe(Self::phone_number),
            email: self.maybe(|g| g.email(&name)),
            emergency_contact: self.maybe(|g| EmergencyContact {
                name: g.person_name(),
                phone: g.phone_number(),
            }),
        }
    }

    /// 96-bit RFID tag id as `0x`-prefixed fixed-width hex
    fn rfid(&mut self) -> String {
        let bits = self.rng.gen::<u128>() & ((1u128 << 96) - 1);
        format!("0x{bits:024x}")
    }

    fn person_name(&mut self) -> String {
        format!(
            "{} {}",
            FIRST_NAMES.choose(&mut self.rng).unwrap(),
            LAST_NAMES.choose(&mut self.rng).unwrap()
        )
    }

    fn phone_number(&mut self) -> String {
        format!(
            "{:03}-{:03}-{:04}",
            self.rng.gen_range(200..1000),
            self.rng.gen_range(200..1000),
            self.rng.gen_range(0..10000)
        )
    }

    fn email(&mut self, name: &str) -> String {
        let local = name.to_lowercase().replace(' ', ".");
        format!("{local}@{}", EMAIL_DOMAINS.choose(&mut self.rng).unwrap())
    }

    fn address(&mut self) -> Address {
        Address {
            street_address: format!(
                "{} {}",
                self.rng.gen_range(1..5000),
                STREET_NAMES.choose(&mut self.rng).unwrap()
            ),
            city: (*CITIES.choose(&mut self.rng).unwrap()).to_string(),
            state: (*STATES.choose(&mut self.rng).unwrap()).to_string(),
            postalcode: format!("{:05}", self.rng.gen_range(501..99951)),
        }
    }

    fn maybe<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> Option<T> {
        if self.rng.gen_bool(ABSENT_PROBABILITY) {
            None
        } else {
            Some(f(self))
        }
    }
}

/// End of the ski season containing `purchase`: the following June 1st.
pub fn season_end(purchase: NaiveDate) -> NaiveDate {
    let year = if purchase.month() < 6 {
        purchase.year()
    } else {
        purchase.year() + 1
    };
    NaiveDate::from_ymd_opt(year, 6, 1).unwrap()
}
