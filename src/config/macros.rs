//! `config_struct!`: one declaration per config section
//!
//! Each field carries its default inline, so a section's shape and its
//! fallback values live on the same line and cannot drift apart.

/// Declare a config section whose missing keys fall back to inline defaults
///
/// ```ignore
/// config_struct! {
///     /// Limits for the supporters listing
///     pub struct ListingConfig {
///         default_page_size: u64 = 20,
///         max_page_size: u64 = 100,
///     }
/// }
///
/// let listing: ListingConfig = toml::from_str("max_page_size = 50")?;
/// assert_eq!(listing.default_page_size, 20);
/// ```
///
/// Fields are always `pub`. The section derives `Debug`, `Clone` and both
/// serde traits, and is tagged `#[serde(default)]` so a partial TOML table
/// deserializes with the remaining fields taken from `Default`.
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
