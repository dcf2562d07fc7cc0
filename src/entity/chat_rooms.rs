use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "chat_rooms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub student_id: Uuid,
    pub tutor_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub last_message_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.student_id == user_id || self.tutor_id == user_id
    }

    /// The participant on the other side of `user_id`.
    pub fn counterpart(&self, user_id: Uuid) -> Uuid {
        if user_id == self.student_id {
            self.tutor_id
        } else {
            self.student_id
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::messages::Entity")]
    Messages,
}

impl Related<super::messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
