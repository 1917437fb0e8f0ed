//! Macros for defining domain value types.

/// Defines a UUID-based identifier of an entity.
///
/// Identifiers are [UUIDv7], so ordering them by value orders the entities
/// by their creation time.
///
/// [UUIDv7]: https://datatracker.ietf.org/doc/html/rfc9562#section-5.7
macro_rules! define_id {
    (
        #[doc = $doc:literal]
        $name:ident
    ) => {
        #[doc = $doc]
        #[derive(
            Clone,
            Copy,
            Debug,
            ::serde::Deserialize,
            ::derive_more::Display,
            Eq,
            ::derive_more::From,
            ::derive_more::FromStr,
            Hash,
            ::derive_more::Into,
            Ord,
            PartialEq,
            PartialOrd,
            ::serde::Serialize,
        )]
        #[cfg_attr(
            feature = "postgres",
            derive(::postgres_types::ToSql, ::postgres_types::FromSql),
            postgres(transparent)
        )]
        pub struct $name(::uuid::Uuid);

        impl $name {
            /// Generates a new time-ordered identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(::uuid::Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

/// Defines a validated string newtype.
///
/// The provided `check` function decides whether a string is a valid value.
macro_rules! define_text {
    (
        #[doc = $doc:literal]
        $name:ident,
        check = $check:expr $(,)?
    ) => {
        #[doc = $doc]
        #[derive(
            ::derive_more::AsRef,
            Clone,
            Debug,
            ::derive_more::Display,
            Eq,
            Hash,
            ::derive_more::Into,
            PartialEq,
        )]
        #[as_ref(str, String)]
        #[cfg_attr(
            feature = "postgres",
            derive(::postgres_types::ToSql, ::postgres_types::FromSql),
            postgres(transparent)
        )]
        pub struct $name(String);

        impl $name {
            #[doc = concat!(
                "Creates a new [`", stringify!($name), "`] if the given ",
                "`value` is valid.",
            )]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let value = value.into();
                let check: fn(&str) -> bool = $check;
                check(&value).then_some(Self(value))
            }

            #[doc = concat!(
                "Creates a new [`", stringify!($name), "`] without ",
                "validation.\n\n# Safety\n\nThe caller must ensure that the ",
                "given `value` matches the format.",
            )]
            #[expect(unsafe_code, reason = "bypass")]
            #[must_use]
            pub unsafe fn new_unchecked(value: impl Into<String>) -> Self {
                Self(value.into())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = &'static str;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s).ok_or(concat!("invalid `", stringify!($name), "`"))
            }
        }
    };
}

/// Checks whether the given `s` is non-empty, has no surrounding whitespace
/// and is at most `max` characters long.
pub(crate) fn is_trimmed_within(s: &str, max: usize) -> bool {
    !s.is_empty() && s.trim() == s && s.chars().count() <= max
}
