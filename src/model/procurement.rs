use crate::error::AppError;
use crate::service::validate_choice;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// How an item is obtained. Parts are `Purchase` or `Make`; assemblies may also be `Hybrid`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcurementType {
    #[default]
    Purchase,
    Make,
    Hybrid,
}

impl ProcurementType {
    pub const ALL: [&'static str; 3] = ["Purchase", "Make", "Hybrid"];

    pub fn as_str(self) -> &'static str {
        match self {
            ProcurementType::Purchase => "Purchase",
            ProcurementType::Make => "Make",
            ProcurementType::Hybrid => "Hybrid",
        }
    }

    /// Never fails: missing or unknown values become `Purchase`, with a warning.
    pub fn coerce(field: &str, raw: Option<&str>) -> Self {
        let chosen = validate_choice(field, raw, &Self::ALL, Self::Purchase.as_str());
        chosen.parse().unwrap_or_default()
    }

    /// One-level rollup over the children's cached types.
    ///
    /// Exactly `{Make}` is `Make`; `Make` with anything else is `Hybrid`.
    /// Everything else, including no children or a lone `Hybrid` child, is `Purchase`.
    pub fn rollup<I>(children: I) -> Self
    where
        I: IntoIterator<Item = ProcurementType>,
    {
        let seen: HashSet<ProcurementType> = children.into_iter().collect();
        if !seen.contains(&ProcurementType::Make) {
            return ProcurementType::Purchase;
        }
        if seen.len() == 1 {
            ProcurementType::Make
        } else {
            ProcurementType::Hybrid
        }
    }
}

impl FromStr for ProcurementType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Purchase" => Ok(ProcurementType::Purchase),
            "Make" => Ok(ProcurementType::Make),
            "Hybrid" => Ok(ProcurementType::Hybrid),
            other => Err(AppError::Validation(format!(
                "procurement type must be one of Purchase, Make, Hybrid (got '{}')",
                other
            ))),
        }
    }
}

impl fmt::Display for ProcurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link discriminator: what the child of an assembly is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Part,
    Assembly,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Part => "Part",
            EntityKind::Assembly => "Assembly",
        }
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Part" => Ok(EntityKind::Part),
            "Assembly" => Ok(EntityKind::Assembly),
            other => Err(AppError::Validation(format!("unknown entity type '{}'", other))),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ProcurementType::*;
    use super::*;

    #[test]
    fn rollup_table() {
        assert_eq!(ProcurementType::rollup([]), Purchase);
        assert_eq!(ProcurementType::rollup([Purchase, Purchase]), Purchase);
        assert_eq!(ProcurementType::rollup([Make]), Make);
        assert_eq!(ProcurementType::rollup([Make, Make]), Make);
        assert_eq!(ProcurementType::rollup([Make, Purchase]), Hybrid);
        assert_eq!(ProcurementType::rollup([Purchase, Make]), Hybrid);
    }

    #[test]
    fn hybrid_children_only_count_next_to_make() {
        assert_eq!(ProcurementType::rollup([Hybrid]), Purchase);
        assert_eq!(ProcurementType::rollup([Purchase, Hybrid]), Purchase);
        assert_eq!(ProcurementType::rollup([Make, Hybrid]), Hybrid);
    }

    #[test]
    fn coercion_is_soft() {
        assert_eq!(ProcurementType::coerce("ProcurementType", Some("Make")), Make);
        assert_eq!(ProcurementType::coerce("ProcurementType", Some("make")), Purchase);
        assert_eq!(ProcurementType::coerce("ProcurementType", None), Purchase);
    }

    #[test]
    fn strict_parse_rejects_unknown() {
        assert!("Buy".parse::<ProcurementType>().is_err());
        assert_eq!("Hybrid".parse::<ProcurementType>().unwrap(), Hybrid);
        assert_eq!("Assembly".parse::<EntityKind>().unwrap(), EntityKind::Assembly);
    }
}
