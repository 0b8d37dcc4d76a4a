//! 导航模型：持有当前 Location
//!
//! 持久化时把链表压平成 id 序列（当前 -> 根），恢复时倒序重建。

use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::location::Location;

#[derive(Debug, Clone, Default)]
pub struct NavigationModel {
    current: Option<Location>,
}

/// One flattened history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: Option<CompactString>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub interim: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl NavigationModel {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn with_current(current: Location) -> Self {
        Self {
            current: Some(current),
        }
    }

    pub fn current_location(&self) -> Option<&Location> {
        self.current.as_ref()
    }

    /// Replaces the pointer. Chain integrity is the caller's business.
    pub fn set_current_location(&mut self, location: Option<Location>) {
        self.current = location;
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Ids walking from the current location to the root.
    pub fn location_ids(&self) -> Vec<Option<String>> {
        self.current
            .as_ref()
            .map(|loc| {
                loc.ancestors()
                    .map(|l| l.id().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rebuilds a model from ids ordered current -> root.
    pub fn from_location_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        I::IntoIter: DoubleEndedIterator,
        S: AsRef<str>,
    {
        let mut current: Option<Location> = None;
        for id in ids.into_iter().rev() {
            let id = id.as_ref().map(|s| AsRef::<str>::as_ref(s));
            current = Some(Location::new(id, current, false));
        }
        Self { current }
    }

    pub fn records(&self) -> Vec<LocationRecord> {
        self.current
            .as_ref()
            .map(|loc| {
                loc.ancestors()
                    .map(|l| LocationRecord {
                        id: l.id().map(CompactString::from),
                        interim: l.is_interim(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn from_records(records: &[LocationRecord]) -> Self {
        let mut current: Option<Location> = None;
        for record in records.iter().rev() {
            current = Some(Location::new(record.id.as_deref(), current, record.interim));
        }
        Self { current }
    }
}

impl Serialize for NavigationModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NavigationModel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = Vec::<LocationRecord>::deserialize(deserializer)?;
        Ok(Self::from_records(&records))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/navigation.rs"]
mod tests;
