/// Router Module Index
///
/// Routes are split by access level so the authentication layer is applied once per module,
/// never per handler.

/// Routes open to anonymous callers. Read endpoints still personalize their output when a
/// valid credential is present.
pub mod public;

/// Routes behind the `AuthUser` middleware.
pub mod authenticated;
