use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tutors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub title: Option<String>,
    pub hourly_rate: Option<f64>,
    pub years_of_experience: Option<i32>,
    pub profile_picture_url: Option<String>,
    pub average_rating: f64,
    pub total_reviews: i32,
    /// Bumped on every rating change; writers compare it before updating.
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(has_many = "super::bookings::Entity")]
    Bookings,
    #[sea_orm(has_many = "super::reviews::Entity")]
    Reviews,
    #[sea_orm(has_many = "super::tutor_schedules::Entity")]
    TutorSchedules,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::bookings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl Related<super::reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl Related<super::tutor_schedules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TutorSchedules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
