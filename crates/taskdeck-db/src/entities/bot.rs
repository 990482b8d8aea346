//! Bot entity: programmatic agents authenticating with `bot_<hex>` tokens

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// A named permission a bot may hold.
///
/// Closed enumeration: unknown capability names fail at construction time
/// rather than silently granting nothing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read any record in the bot's scope
    Read,
    /// Create projects
    CreateProjects,
    /// Create tasks
    CreateTasks,
    /// Update tasks and answer subtasks
    UpdateTasks,
    /// Delete tasks
    DeleteTasks,
    /// Every capability, current and future
    Admin,
}

impl Capability {
    /// All concrete capabilities (excluding the `Admin` wildcard).
    pub const CONCRETE: [Capability; 5] = [
        Capability::Read,
        Capability::CreateProjects,
        Capability::CreateTasks,
        Capability::UpdateTasks,
        Capability::DeleteTasks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::CreateProjects => "create_projects",
            Capability::CreateTasks => "create_tasks",
            Capability::UpdateTasks => "update_tasks",
            Capability::DeleteTasks => "delete_tasks",
            Capability::Admin => "admin",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Capability::Read),
            "create_projects" => Ok(Capability::CreateProjects),
            "create_tasks" => Ok(Capability::CreateTasks),
            "update_tasks" => Ok(Capability::UpdateTasks),
            "delete_tasks" => Ok(Capability::DeleteTasks),
            "admin" => Ok(Capability::Admin),
            other => Err(format!("unknown capability '{other}'")),
        }
    }
}

/// A bot's permission set, persisted as a JSON array of capability names.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, FromJsonQueryResult,
)]
pub struct PermissionSet(pub BTreeSet<Capability>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full set: `admin` plus every concrete capability.
    pub fn all() -> Self {
        let mut set: BTreeSet<Capability> = Capability::CONCRETE.into_iter().collect();
        set.insert(Capability::Admin);
        Self(set)
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Whether the set grants a capability: `admin` grants everything.
    pub fn allows(&self, capability: Capability) -> bool {
        self.contains(Capability::Admin) || self.contains(capability)
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0.insert(capability);
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bots")]
pub struct Model {
    /// Bot UUID (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Bot name (unique)
    #[sea_orm(unique)]
    pub username: String,

    /// API token, literally `bot_` + random hex; matched exactly at auth
    #[sea_orm(unique)]
    pub api_token: String,

    /// Owning human; a bot always has exactly one
    pub owner_id: Uuid,

    /// Granted capabilities
    #[sea_orm(column_type = "Json")]
    pub permissions: PermissionSet,

    /// Whether the bot may authenticate
    pub is_active: bool,

    /// Best-effort usage marker; never written on the authentication path
    pub last_used_at: Option<ChronoDateTimeUtc>,

    /// When the bot was created
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Bot belongs to its owning user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Owner,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_roundtrips_through_names() {
        for cap in Capability::CONCRETE {
            assert_eq!(cap.as_str().parse::<Capability>().unwrap(), cap);
        }
        assert_eq!("admin".parse::<Capability>().unwrap(), Capability::Admin);
    }

    #[test]
    fn unknown_capability_is_rejected() {
        assert!("launch_missiles".parse::<Capability>().is_err());
        assert!("".parse::<Capability>().is_err());
    }

    #[test]
    fn admin_allows_everything() {
        let set: PermissionSet = [Capability::Admin].into_iter().collect();
        for cap in Capability::CONCRETE {
            assert!(set.allows(cap));
        }
    }

    #[test]
    fn concrete_grant_is_exact() {
        let set: PermissionSet = [Capability::Read, Capability::CreateTasks]
            .into_iter()
            .collect();
        assert!(set.allows(Capability::Read));
        assert!(set.allows(Capability::CreateTasks));
        assert!(!set.allows(Capability::DeleteTasks));
        assert!(!set.allows(Capability::Admin));
    }

    #[test]
    fn permission_set_serializes_as_name_array() {
        let set: PermissionSet = [Capability::Read, Capability::UpdateTasks]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&set).expect("serialize");
        assert_eq!(json, r#"["read","update_tasks"]"#);

        let parsed: PermissionSet = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, set);
    }
}
