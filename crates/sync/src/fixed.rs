use std::f64::consts::PI;
use std::sync::OnceLock;

pub type Fixed = i32;
pub type Angle = u32;

pub const FRACBITS: u32 = 16;
pub const FRACUNIT: Fixed = 1 << FRACBITS;

pub const ANG45: Angle = 0x2000_0000;
pub const ANG90: Angle = 0x4000_0000;
pub const ANG180: Angle = 0x8000_0000;

pub const FINEANGLES: usize = 8192;
pub const FINEMASK: usize = FINEANGLES - 1;
pub const ANGLETOFINESHIFT: u32 = 19;

// sin(i * 2pi / 64) scaled to 8 map units
pub const FLOAT_BOB_OFFSETS: [Fixed; 64] = [
    0, 51389, 102284, 152193, 200636, 247148, 291279, 332605, 370728, 405280, 435930, 462381,
    484379, 501712, 514214, 521763, 524287, 521763, 514214, 501712, 484379, 462381, 435930,
    405280, 370728, 332605, 291279, 247148, 200636, 152193, 102284, 51389, 0, -51389, -102284,
    -152193, -200636, -247148, -291279, -332605, -370728, -405280, -435930, -462381, -484379,
    -501712, -514214, -521763, -524288, -521763, -514214, -501712, -484379, -462381, -435930,
    -405280, -370728, -332605, -291279, -247148, -200636, -152193, -102284, -51389,
];

pub const fn from_int(value: i32) -> Fixed {
    value << FRACBITS
}

pub const fn to_int(value: Fixed) -> i32 {
    value >> FRACBITS
}

pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    ((a as i64 * b as i64) >> FRACBITS) as Fixed
}

pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if (a.unsigned_abs() >> 14) >= b.unsigned_abs() {
        if (a ^ b) < 0 { i32::MIN } else { i32::MAX }
    } else {
        (((a as i64) << FRACBITS) / b as i64) as Fixed
    }
}

fn fine_table() -> &'static [Fixed] {
    static TABLE: OnceLock<Vec<Fixed>> = OnceLock::new();
    TABLE.get_or_init(|| {
        // Sine table with a quarter-turn overlap so cosine can index past the end.
        (0..FINEANGLES * 5 / 4)
            .map(|i| {
                let radians = (i as f64 + 0.5) * 2.0 * PI / FINEANGLES as f64;
                (radians.sin() * FRACUNIT as f64).round() as Fixed
            })
            .collect()
    })
}

pub fn fine_index(angle: Angle) -> usize {
    (angle >> ANGLETOFINESHIFT) as usize & FINEMASK
}

pub fn fine_sine(angle: Angle) -> Fixed {
    fine_table()[fine_index(angle)]
}

pub fn fine_cosine(angle: Angle) -> Fixed {
    fine_table()[fine_index(angle) + FINEANGLES / 4]
}
