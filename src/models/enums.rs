use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate a numeric-coded enum with as_u8 + TryFrom<u8> pattern.
///
/// Values travel as plain integers both on the wire and in SQLite columns.
macro_rules! code_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "u8", try_from = "u8")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_u8(self) -> u8 {
                match self {
                    $(Self::$variant => $code),+
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value.as_u8()
            }
        }

        impl TryFrom<u8> for $name {
            type Error = DatabaseError;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: code.to_string(),
                    }),
                }
            }
        }
    };
}

code_enum!(
    /// Unit the level value is expressed in.
    GlucoseLevelType {
        MilliMolesPerLiter = 1,
        MilliGramsPerDeciLiter = 2,
    }
);

code_enum!(
    /// Body fluid the sample was taken from.
    SpecimenSource {
        Unknown = 0,
        InterstitialFluid = 1,
        CapillaryBlood = 2,
        Plasma = 3,
        Serum = 4,
        Tears = 5,
        WholeBlood = 6,
    }
);

code_enum!(
    /// Meal the measurement is associated with.
    MealType {
        Unknown = 0,
        Breakfast = 1,
        Lunch = 2,
        Dinner = 3,
        Snack = 4,
    }
);

code_enum!(
    /// Timing of the measurement relative to a meal.
    RelationToMeal {
        Unknown = 0,
        General = 1,
        Fasting = 2,
        BeforeMeal = 3,
        AfterMeal = 4,
    }
);
