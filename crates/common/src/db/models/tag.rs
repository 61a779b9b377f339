//! Tag entity: a subject field, keyed by its name

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tag")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub tag_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::thesis_proposal_tag::Entity")]
    ThesisProposalTags,
}

impl Related<super::thesis_proposal_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ThesisProposalTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
