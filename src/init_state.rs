//! Types that track the initialization state of peripherals at compile time
//!
//! The HAL API uses these types as type parameters. Methods that require a
//! peripheral to be in a specific state are only available when the type
//! parameter matches, so misuse becomes a compile-time error.

/// Indicates that a peripheral is enabled
///
/// The type parameter is used by some peripherals to track additional state,
/// like an enabled clock the peripheral depends on.
pub struct Enabled<T = ()>(pub T);

/// Indicates that a peripheral is disabled
pub struct Disabled;
