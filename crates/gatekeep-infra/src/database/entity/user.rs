//! User entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(column_name = "password")]
    pub password_hash: Vec<u8>,
    pub created_at: DateTimeWithTimeZone,
    pub is_active: bool,
    pub role_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::role::Entity",
        from = "Column::RoleId",
        to = "super::role::Column::Id"
    )]
    Role,
    #[sea_orm(has_many = "super::post::Entity")]
    Post,
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Assemble the domain user from this row and its joined role.
    pub fn into_domain(self, role: super::role::Model) -> gatekeep_core::domain::User {
        gatekeep_core::domain::User {
            id: self.id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            is_active: self.is_active,
            created_at: self.created_at.into(),
            role: role.into(),
        }
    }
}
