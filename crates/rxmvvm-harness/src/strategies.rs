//! Proptest strategies for reactive scripts.

use proptest::prelude::*;

/// One step against a property under test.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Write a value.
    Set(i32),
    /// Acquire a suppress token.
    Suppress,
    /// Release the most recent suppress token, if any.
    Unsuppress,
    /// Acquire a delay token.
    Delay,
    /// Release the most recent delay token, if any.
    Undelay,
    /// Attach a new observer.
    Subscribe,
}

/// One step against a command under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOp {
    /// Push a value on the caller-supplied gate.
    Gate(bool),
    /// Subscribe to `execute()`.
    Execute,
    /// Let one pending execution finish successfully.
    Succeed,
    /// Let one pending execution fail.
    Fail,
}

/// Generate arbitrary property operations, weighted toward writes.
pub fn arb_write_op() -> impl Strategy<Value = WriteOp> {
    prop_oneof![
        6 => any::<i32>().prop_map(WriteOp::Set),
        1 => Just(WriteOp::Suppress),
        1 => Just(WriteOp::Unsuppress),
        1 => Just(WriteOp::Delay),
        1 => Just(WriteOp::Undelay),
        1 => Just(WriteOp::Subscribe),
    ]
}

/// Generate scripts of property operations.
pub fn arb_write_script() -> impl Strategy<Value = Vec<WriteOp>> {
    prop::collection::vec(arb_write_op(), 0..64)
}

/// Generate arbitrary command operations.
pub fn arb_command_op() -> impl Strategy<Value = CommandOp> {
    prop_oneof![
        any::<bool>().prop_map(CommandOp::Gate),
        Just(CommandOp::Execute),
        Just(CommandOp::Succeed),
        Just(CommandOp::Fail),
    ]
}

/// Generate scripts of command operations.
pub fn arb_command_script() -> impl Strategy<Value = Vec<CommandOp>> {
    prop::collection::vec(arb_command_op(), 0..48)
}

/// Generate progress reports, including out-of-range ones.
pub fn arb_progress_script() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-0.5f32..1.5f32, 0..32)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn write_scripts_are_bounded(script in arb_write_script()) {
            prop_assert!(script.len() < 64);
        }

        #[test]
        fn progress_reports_stay_in_generator_range(script in arb_progress_script()) {
            for value in script {
                prop_assert!((-0.5..1.5).contains(&value));
            }
        }
    }
}
