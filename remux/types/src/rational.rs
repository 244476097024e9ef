/*!
    Rational time bases and timestamp rescaling.
*/

/**
    A rational number used as a time base.

    A time base of `1/90000` means one timestamp tick lasts 1/90000 of a
    second. Time bases attached to streams and packets must be valid
    (positive numerator and denominator).
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    /// Numerator.
    pub num: i32,
    /// Denominator.
    pub den: i32,
}

impl Rational {
    /**
        Create a new rational.
    */
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /**
        Returns true if this is a usable time base (both terms positive).
    */
    pub const fn is_valid(self) -> bool {
        self.num > 0 && self.den > 0
    }

    /**
        Returns the inverse rational (ticks per second for a time base).
    */
    pub const fn inverse(self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }

    /**
        Returns the rational as a float.
    */
    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl std::fmt::Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/**
    Rescale a timestamp from one time base to another.

    Rounds to the nearest destination tick (half away from zero) and
    saturates at `i64::MIN`/`i64::MAX` instead of wrapping when the
    destination base is much finer than the source. The sentinel values
    `i64::MIN` and `i64::MAX` pass through unchanged, so a
    no-timestamp marker survives rescaling.

    Both time bases must be valid. Deterministic and side-effect free:
    the monotonicity of a timestamp sequence is preserved because the
    mapping is non-decreasing.
*/
pub fn rescale_ts(ts: i64, from: Rational, to: Rational) -> i64 {
    if ts == i64::MIN || ts == i64::MAX {
        return ts;
    }
    scale_rounded(ts, from, to)
}

/**
    Rescale a duration from one time base to another.

    Same proportional scaling as [`rescale_ts`] but without the sentinel
    passthrough: a duration of `i64::MAX` ticks is not meaningful and is
    simply saturated.
*/
pub fn rescale_dur(dur: i64, from: Rational, to: Rational) -> i64 {
    scale_rounded(dur, from, to)
}

fn scale_rounded(ts: i64, from: Rational, to: Rational) -> i64 {
    debug_assert!(from.is_valid() && to.is_valid());

    if from == to {
        return ts;
    }

    // ts * (from.num / from.den) / (to.num / to.den)
    // = ts * from.num * to.den / (from.den * to.num)
    //
    // The product of an i64 and two i32s fits in an i128, so the
    // intermediate never overflows; only the final result can exceed
    // the i64 domain and is clamped.
    let num = from.num as i128 * to.den as i128;
    let den = from.den as i128 * to.num as i128;

    let scaled = ts as i128 * num;
    let half = den / 2;
    let rounded = if scaled >= 0 {
        (scaled + half) / den
    } else {
        (scaled - half) / den
    };

    rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    const MPEG_TB: Rational = Rational::new(1, 90000);
    const MILLIS_TB: Rational = Rational::new(1, 1000);

    #[test]
    fn rational_validity() {
        assert!(Rational::new(1, 1000).is_valid());
        assert!(!Rational::new(0, 1000).is_valid());
        assert!(!Rational::new(1, 0).is_valid());
        assert!(!Rational::new(-1, 1000).is_valid());
    }

    #[test]
    fn rational_inverse() {
        assert_eq!(Rational::new(1, 44100).inverse(), Rational::new(44100, 1));
    }

    #[test]
    fn identity_rescale() {
        assert_eq!(rescale_ts(12345, MILLIS_TB, MILLIS_TB), 12345);
    }

    #[test]
    fn mpeg_to_millis() {
        // 3000 ticks of 1/90000 is 33.3ms; nearest millisecond tick is 33.
        assert_eq!(rescale_ts(0, MPEG_TB, MILLIS_TB), 0);
        assert_eq!(rescale_ts(3000, MPEG_TB, MILLIS_TB), 33);
    }

    #[test]
    fn rounds_to_nearest() {
        // 135 ticks of 1/90000 is 1.5ms: half rounds away from zero.
        assert_eq!(rescale_ts(135, MPEG_TB, MILLIS_TB), 2);
        assert_eq!(rescale_ts(-135, MPEG_TB, MILLIS_TB), -2);
        assert_eq!(rescale_ts(134, MPEG_TB, MILLIS_TB), 1);
    }

    #[test]
    fn sentinel_passes_through() {
        assert_eq!(rescale_ts(i64::MIN, MILLIS_TB, MPEG_TB), i64::MIN);
        assert_eq!(rescale_ts(i64::MAX, MILLIS_TB, MPEG_TB), i64::MAX);
    }

    #[test]
    fn saturates_instead_of_wrapping() {
        // Scaling a near-max timestamp into a 90x finer base overflows
        // the i64 domain and must clamp, not wrap.
        let big = i64::MAX - 1;
        assert_eq!(rescale_ts(big, MILLIS_TB, MPEG_TB), i64::MAX);
        let small = i64::MIN + 1;
        assert_eq!(rescale_ts(small, MILLIS_TB, MPEG_TB), i64::MIN);
    }

    #[test]
    fn round_trip_within_one_tick() {
        let bases = [
            (Rational::new(1, 90000), Rational::new(1, 1000)),
            (Rational::new(1, 1000), Rational::new(1, 44100)),
            (Rational::new(1001, 30000), Rational::new(1, 25)),
        ];
        for (a, b) in bases {
            for ts in [0i64, 1, 17, 3000, 123_456_789, -42] {
                let there = rescale_ts(ts, a, b);
                let back = rescale_ts(there, b, a);
                // One tick of base `b` expressed in base `a`, plus one
                // for the rounding on the way back.
                let tick = rescale_dur(1, b, a).abs().max(1);
                assert!(
                    (back - ts).abs() <= tick,
                    "{ts} -> {there} -> {back} exceeds {tick} ticks ({a} <-> {b})"
                );
            }
        }
    }

    #[test]
    fn monotone_input_stays_monotone() {
        let input = [0i64, 1, 2, 2, 3, 500, 501, 3000, 90000];
        let mut last = i64::MIN + 1;
        for ts in input {
            let out = rescale_ts(ts, MPEG_TB, MILLIS_TB);
            assert!(out >= last, "rescaled sequence decreased at {ts}");
            last = out;
        }
    }

    #[test]
    fn duration_scaling() {
        // One AAC frame (1024 samples at 44.1kHz) is about 23ms.
        assert_eq!(
            rescale_dur(1024, Rational::new(1, 44100), MILLIS_TB),
            23
        );
    }
}
