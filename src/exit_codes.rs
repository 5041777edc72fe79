//! Exit code constants for the lockstore CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: Data error (stored content unparseable, content not serializable)
//! - 3: Write or filesystem failure
//! - 4: Contention (cross-process lock or in-process queue)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Data error: the stored document or the supplied content is not valid JSON.
pub const DATA_ERROR: i32 = 2;

/// Write failure after retries, or any other filesystem error.
pub const IO_FAILURE: i32 = 3;

/// The cross-process lock or the in-process queue could not be entered in time.
pub const LOCK_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, DATA_ERROR, IO_FAILURE, LOCK_FAILURE];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn lock_failure_keeps_code_four() {
        assert_eq!(LOCK_FAILURE, 4);
    }
}
