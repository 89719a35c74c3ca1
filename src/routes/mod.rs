/// Router Module Index
///
/// Splits routing by access level so session gating is applied explicitly at
/// the router layer instead of inside individual handlers.

/// Routes open to every client. Page responses are still filtered per viewer
/// by composition access control.
pub mod public;

/// Routes that require a resolved session.
pub mod authenticated;
