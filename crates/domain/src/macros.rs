//! Display/FromStr for keyword enums
//!
//! Configuration values such as the log format arrive as free text from
//! environment variables and config files. This macro maps each variant to
//! one canonical keyword (used by `Display`) plus any number of accepted
//! aliases (used by `FromStr`, case-insensitive).
//!
//! # Example
//!
//! ```rust
//! use curlkit_domain::impl_keyword_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Verbosity {
//!     Quiet,
//!     Loud,
//! }
//!
//! impl_keyword_conversions!(Verbosity {
//!     Quiet => "quiet" | "silent",
//!     Loud => "loud",
//! });
//!
//! assert_eq!("SILENT".parse::<Verbosity>(), Ok(Verbosity::Quiet));
//! assert_eq!(Verbosity::Loud.to_string(), "loud");
//! ```

/// Implements Display and FromStr for a keyword enum
#[macro_export]
macro_rules! impl_keyword_conversions {
    ($enum_name:ident { $($variant:ident => $canonical:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($canonical),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($canonical $(| $alias)* => Ok(Self::$variant),)+
                    _ => Err(format!("invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
