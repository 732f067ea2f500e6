//! Integer trigonometry and distance helpers
//!
//! Angles are bytes: 256 steps per turn, 0 pointing along +x and 64 along +y.
//! The sine table is built at compile time from Bhaskara's rational
//! approximation in pure integer arithmetic, so no platform libm is involved.

/// Fixed-point one for table values
pub const TRIG_ONE: i32 = 4096;

const HALF_TURN: i64 = 128;

const fn build_sin_table() -> [i32; 256] {
    let mut table = [0i32; 256];
    let mut i = 0;
    while i < 256 {
        let t = (i as i64) % HALF_TURN;
        let p = t * (HALF_TURN - t);
        // 4t(H - t) / (5H^2/4 - t(H - t))
        let denom = 5 * HALF_TURN * HALF_TURN / 4 - p;
        let s = (TRIG_ONE as i64) * 4 * p / denom;
        table[i] = if i < 128 { s as i32 } else { -(s as i32) };
        i += 1;
    }
    table
}

static SIN_TABLE: [i32; 256] = build_sin_table();

/// Sine of a byte angle, scaled by [`TRIG_ONE`]
pub fn sin(angle: u8) -> i32 {
    SIN_TABLE[angle as usize]
}

/// Cosine of a byte angle, scaled by [`TRIG_ONE`]
pub fn cos(angle: u8) -> i32 {
    SIN_TABLE[angle.wrapping_add(64) as usize]
}

/// Vector of the given length pointing at `angle`
pub fn polar(angle: u8, length: i32) -> (i32, i32) {
    (
        (cos(angle) as i64 * length as i64 / TRIG_ONE as i64) as i32,
        (sin(angle) as i64 * length as i64 / TRIG_ONE as i64) as i32,
    )
}

/// Floor of the square root
pub fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Squared distance between two points
pub fn dist_sq(ax: i32, ay: i32, bx: i32, by: i32) -> i64 {
    let dx = (ax - bx) as i64;
    let dy = (ay - by) as i64;
    dx * dx + dy * dy
}

/// Integer length of a vector
pub fn length(dx: i32, dy: i32) -> i32 {
    isqrt(dist_sq(dx, dy, 0, 0) as u64) as i32
}

/// Byte angle closest to the direction `(dx, dy)`
///
/// Picks the table direction with the largest dot product. Zero vectors map
/// to angle 0.
pub fn angle_of(dx: i32, dy: i32) -> u8 {
    let mut best = 0u8;
    let mut best_dot = i64::MIN;
    for a in 0..=255u8 {
        let dot = cos(a) as i64 * dx as i64 + sin(a) as i64 * dy as i64;
        if dot > best_dot {
            best_dot = dot;
            best = a;
        }
    }
    best
}
