// src/stamp.rs
use builtin_interfaces::msg::Time as TimeMsg;
use rclrs::Clock;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Current time of `clock` as a message stamp.
pub fn now(clock: &Clock) -> TimeMsg {
    from_nanos(clock.now().nsec)
}

/// Split a nanosecond count into `sec` / `nanosec`, keeping `nanosec` in `[0, 1e9)`.
pub fn from_nanos(nsec: i64) -> TimeMsg {
    TimeMsg {
        sec: nsec.div_euclid(NANOS_PER_SEC) as i32,
        nanosec: nsec.rem_euclid(NANOS_PER_SEC) as u32,
    }
}
